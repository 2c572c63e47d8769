//! ChatService – Nachrichten senden und Zustellung je Mitglied bestimmen

use std::sync::Arc;

use tracing::debug;

use parley_core::types::{ConversationId, MessageId, UserId};
use parley_db::{
    models::{KonversationRecord, MitgliedschaftRecord, NeueNachricht},
    ConversationRepository, MessageRepository,
};

use crate::{
    error::{ChatError, ChatResult},
    types::{Benutzer, ChatNachricht, Empfaenger, Versand, Zustellung},
};

/// Maximale Groesse eines Nachrichteninhalts (64 KiB)
pub const MAX_INHALT_BYTES: usize = 64 * 1024;

/// ChatService verwaltet Nachrichten und `listening`-Flags
pub struct ChatService<R> {
    repo: Arc<R>,
}

impl<R: ConversationRepository + MessageRepository> ChatService<R> {
    /// Erstellt einen neuen ChatService
    pub fn neu(repo: Arc<R>) -> Arc<Self> {
        Arc::new(Self { repo })
    }

    /// Nachricht in einer Konversation senden
    ///
    /// Reihenfolge der Pruefungen: Konversation existiert, Verfasser ist
    /// Teilnehmer, Inhalt ist gueltig. Erst danach wird gespeichert.
    pub async fn nachricht_senden(
        &self,
        author_id: UserId,
        conversation_id: ConversationId,
        content: &str,
    ) -> ChatResult<Versand> {
        self.konversation_laden(conversation_id).await?;

        let mitglieder = self.repo.mitgliedschaften(conversation_id.inner()).await?;
        let author = mitglieder
            .iter()
            .find(|m| m.user_id == author_id.inner())
            .map(|m| Benutzer {
                id: author_id,
                username: m.username.clone(),
            })
            .ok_or_else(|| kein_teilnehmer(author_id, conversation_id))?;

        if content.is_empty() {
            return Err(ChatError::UngueltigeEingabe(
                "Nachrichteninhalt darf nicht leer sein".into(),
            ));
        }

        if content.len() > MAX_INHALT_BYTES {
            return Err(ChatError::UngueltigeEingabe(format!(
                "Nachricht zu lang: {} Bytes (Maximum: {MAX_INHALT_BYTES})",
                content.len()
            )));
        }

        let record = self
            .repo
            .create_message(NeueNachricht {
                conversation_id: conversation_id.inner(),
                author_id: author_id.inner(),
                content,
            })
            .await?;

        let empfaenger = mitglieder.iter().map(empfaenger_fuer).collect::<Vec<_>>();
        debug!(
            conversation_id = %conversation_id,
            author_id = %author_id,
            empfaenger = empfaenger.len(),
            "Nachricht gespeichert"
        );

        Ok(Versand {
            nachricht: ChatNachricht {
                id: MessageId(record.id),
                conversation_id,
                author,
                content: record.content,
                created_at: record.created_at,
            },
            empfaenger,
        })
    }

    /// Volle Zustellung fuer eine Konversation aktivieren (`join_conversation`)
    pub async fn zuhoeren(&self, user_id: UserId, conversation_id: ConversationId) -> ChatResult<()> {
        self.konversation_laden(conversation_id).await?;

        let gesetzt = self
            .repo
            .zuhoeren_setzen(conversation_id.inner(), user_id.inner(), true)
            .await?;
        if !gesetzt {
            return Err(kein_teilnehmer(user_id, conversation_id));
        }

        debug!(conversation_id = %conversation_id, user_id = %user_id, "Zuhoeren aktiviert");
        Ok(())
    }

    /// Prueft eine Schluessel-Anfrage und liefert den Admin als Ziel
    pub async fn schluessel_anfrage_pruefen(
        &self,
        anfragender: UserId,
        conversation_id: ConversationId,
    ) -> ChatResult<UserId> {
        let konversation = self.konversation_laden(conversation_id).await?;
        self.teilnehmer_pruefen(anfragender, conversation_id).await?;
        Ok(UserId(konversation.admin_id))
    }

    /// Prueft eine Schluessel-Antwort vor dem Weiterleiten
    ///
    /// Nur der Admin darf antworten, und nur an einen Teilnehmer.
    pub async fn schluessel_antwort_pruefen(
        &self,
        absender: UserId,
        conversation_id: ConversationId,
        ziel: UserId,
    ) -> ChatResult<()> {
        let konversation = self.konversation_laden(conversation_id).await?;
        if konversation.admin_id != absender.inner() {
            return Err(ChatError::KeineBerechtigung(format!(
                "{absender} ist nicht Admin von {conversation_id}"
            )));
        }
        self.teilnehmer_pruefen(ziel, conversation_id).await
    }

    async fn konversation_laden(
        &self,
        conversation_id: ConversationId,
    ) -> ChatResult<KonversationRecord> {
        self.repo
            .get_conversation(conversation_id.inner())
            .await?
            .ok_or_else(|| ChatError::KonversationNichtGefunden(conversation_id.to_string()))
    }

    async fn teilnehmer_pruefen(
        &self,
        user_id: UserId,
        conversation_id: ConversationId,
    ) -> ChatResult<()> {
        self.repo
            .get_membership(conversation_id.inner(), user_id.inner())
            .await?
            .map(|_| ())
            .ok_or_else(|| kein_teilnehmer(user_id, conversation_id))
    }
}

fn kein_teilnehmer(user_id: UserId, conversation_id: ConversationId) -> ChatError {
    ChatError::KeineBerechtigung(format!("{user_id} ist kein Teilnehmer von {conversation_id}"))
}

fn empfaenger_fuer(m: &MitgliedschaftRecord) -> Empfaenger {
    Empfaenger {
        user_id: UserId(m.user_id),
        zustellung: if m.is_listening {
            Zustellung::Voll
        } else {
            Zustellung::Benachrichtigung
        },
    }
}
