//! BeziehungService – Freundschaftsanfragen und Gruppen
//!
//! Eine Einladung ist idempotent: solange eine Anfrage offen ist, liefert
//! jede weitere Einladung dieselbe Anfrage zurueck. Beim Annehmen entsteht
//! atomar eine Direkt-Konversation, deren Admin der Annehmende ist.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info, warn};

use parley_core::types::{FriendRequestId, UserId};
use parley_db::{
    models::{AnfrageStatus, BenutzerRecord, FreundschaftsanfrageRecord, NeueKonversation},
    ConversationRepository, DbError, FriendRequestRepository, UserRepository,
};

use crate::{
    error::{ChatError, ChatResult},
    types::{Antwort, Benutzer, Einladung, KonversationInfo, NeueGruppe},
};

/// Maximale Laenge eines Gruppentitels in Zeichen
const MAX_TITEL_LAENGE: usize = 128;

pub struct BeziehungService<R> {
    repo: Arc<R>,
}

impl<R> BeziehungService<R>
where
    R: UserRepository + FriendRequestRepository + ConversationRepository,
{
    pub fn neu(repo: Arc<R>) -> Arc<Self> {
        Arc::new(Self { repo })
    }

    // -----------------------------------------------------------------------
    // Einladungen
    // -----------------------------------------------------------------------

    /// Freundschaftsanfrage an `ziel` senden
    ///
    /// `None` wenn beide bereits befreundet sind. Ansonsten die (neue oder
    /// bereits offene) Anfrage, die dem Ziel gemeldet werden soll.
    pub async fn einladen(&self, absender_id: UserId, ziel: UserId) -> ChatResult<Option<Einladung>> {
        if absender_id == ziel {
            return Err(ChatError::UngueltigeEingabe(
                "Einladung an sich selbst nicht moeglich".into(),
            ));
        }

        let absender = self.benutzer_laden(absender_id).await?;
        self.benutzer_laden(ziel).await?;

        if self.repo.sind_befreundet(absender_id.inner(), ziel.inner()).await? {
            debug!(absender = %absender_id, ziel = %ziel, "Bereits befreundet, keine Anfrage");
            return Ok(None);
        }

        let (anfrage, neu) = self
            .repo
            .create_friend_request(absender_id.inner(), ziel.inner())
            .await?;

        if neu {
            info!(anfrage_id = %anfrage.id, absender = %absender_id, ziel = %ziel, "Freundschaftsanfrage erstellt");
        } else {
            debug!(anfrage_id = %anfrage.id, "Offene Anfrage erneut gemeldet");
        }

        Ok(Some(einladung_aus(anfrage, absender.into(), neu)))
    }

    /// Alle offenen Anfragen an `user_id`, aelteste zuerst
    ///
    /// Wird nach der Anmeldung verwendet, um verpasste Einladungen
    /// nachzuliefern.
    pub async fn offene_einladungen(&self, user_id: UserId) -> ChatResult<Vec<Einladung>> {
        let anfragen = self.repo.offene_anfragen(user_id.inner()).await?;
        let mut einladungen = Vec::with_capacity(anfragen.len());

        for anfrage in anfragen {
            let absender = self.benutzer_laden(UserId(anfrage.sender_id)).await?;
            einladungen.push(einladung_aus(anfrage, absender.into(), false));
        }

        Ok(einladungen)
    }

    /// Eine Freundschaftsanfrage annehmen oder ablehnen
    ///
    /// Nur das Ziel der Anfrage darf antworten. Eine nicht mehr offene
    /// Anfrage ergibt `BereitsBeantwortet`, auch wenn zwei Antworten
    /// gleichzeitig eintreffen.
    pub async fn antworten(
        &self,
        antwortender_id: UserId,
        anfrage_id: FriendRequestId,
        annehmen: bool,
    ) -> ChatResult<Antwort> {
        let anfrage = self
            .repo
            .get_friend_request(anfrage_id.inner())
            .await?
            .ok_or_else(|| ChatError::AnfrageNichtGefunden(anfrage_id.to_string()))?;

        if anfrage.receiver_id != antwortender_id.inner() {
            return Err(ChatError::KeineBerechtigung(format!(
                "{antwortender_id} ist nicht Empfaenger von {anfrage_id}"
            )));
        }

        if anfrage.status != AnfrageStatus::Pending {
            return Err(bereits_beantwortet(anfrage_id));
        }

        let antwortender = self.benutzer_laden(antwortender_id).await?;
        let absender_id = UserId(anfrage.sender_id);

        let konversation = if annehmen {
            let absender = self.benutzer_laden(absender_id).await?;
            let titel = format!("{}, {}", absender.username, antwortender.username);
            let (_, konversation) = self
                .repo
                .anfrage_annehmen(anfrage_id.inner(), &titel)
                .await?
                .ok_or_else(|| bereits_beantwortet(anfrage_id))?;
            match &konversation {
                Some(k) => info!(
                    anfrage_id = %anfrage_id,
                    conversation_id = %k.id,
                    "Freundschaftsanfrage angenommen"
                ),
                None => info!(
                    anfrage_id = %anfrage_id,
                    "Freundschaftsanfrage angenommen, bereits befreundet"
                ),
            }
            konversation.map(KonversationInfo::from)
        } else {
            self.repo
                .anfrage_ablehnen(anfrage_id.inner())
                .await?
                .ok_or_else(|| bereits_beantwortet(anfrage_id))?;
            info!(anfrage_id = %anfrage_id, "Freundschaftsanfrage abgelehnt");
            None
        };

        Ok(Antwort {
            anfrage_id,
            absender_id,
            antwortender: antwortender.into(),
            angenommen: annehmen,
            konversation,
        })
    }

    // -----------------------------------------------------------------------
    // Gruppen
    // -----------------------------------------------------------------------

    /// Gruppenkonversation mit `admin_id` als Admin anlegen
    ///
    /// Mitglieder die nicht hinzugefuegt werden koennen (unbekannt o.ae.)
    /// werden mit einer Warnung uebersprungen.
    /// Doppelte Eintrage und der Admin selbst werden uebersprungen.
    pub async fn gruppe_erstellen(
        &self,
        titel: &str,
        admin_id: UserId,
        mitglieder: &[UserId],
    ) -> ChatResult<NeueGruppe> {
        let titel = titel.trim();
        if titel.is_empty() {
            return Err(ChatError::UngueltigeEingabe(
                "Gruppentitel darf nicht leer sein".into(),
            ));
        }
        if titel.chars().count() > MAX_TITEL_LAENGE {
            return Err(ChatError::UngueltigeEingabe(format!(
                "Gruppentitel zu lang (Maximum: {MAX_TITEL_LAENGE} Zeichen)"
            )));
        }

        let admin = self.benutzer_laden(admin_id).await?;

        let konversation = self
            .repo
            .create_conversation(NeueKonversation {
                title: titel,
                admin_id: admin_id.inner(),
                is_direct: false,
            })
            .await?;

        let mut gesehen = HashSet::from([admin_id]);
        let mut hinzugefuegt = Vec::new();
        let mut fehlgeschlagen = 0usize;

        for &mitglied in mitglieder {
            if !gesehen.insert(mitglied) {
                continue;
            }

            match self.repo.add_participant(konversation.id, mitglied.inner()).await {
                Ok(_) => hinzugefuegt.push(mitglied),
                Err(DbError::NichtGefunden(grund)) => {
                    warn!(
                        conversation_id = %konversation.id,
                        user_id = %mitglied,
                        "Mitglied nicht gefunden: {grund}"
                    );
                    fehlgeschlagen += 1;
                }
                Err(e) => {
                    warn!(
                        conversation_id = %konversation.id,
                        user_id = %mitglied,
                        "Mitglied konnte nicht hinzugefuegt werden: {e}"
                    );
                    fehlgeschlagen += 1;
                }
            }
        }

        info!(
            conversation_id = %konversation.id,
            admin_id = %admin_id,
            mitglieder = hinzugefuegt.len(),
            fehlgeschlagen,
            "Gruppe erstellt"
        );

        Ok(NeueGruppe {
            konversation: konversation.into(),
            admin: admin.into(),
            hinzugefuegt,
        })
    }

    async fn benutzer_laden(&self, user_id: UserId) -> ChatResult<BenutzerRecord> {
        self.repo
            .get_by_id(user_id.inner())
            .await?
            .ok_or_else(|| ChatError::BenutzerNichtGefunden(user_id.to_string()))
    }
}

fn bereits_beantwortet(anfrage_id: FriendRequestId) -> ChatError {
    ChatError::BereitsBeantwortet(anfrage_id.to_string())
}

fn einladung_aus(anfrage: FreundschaftsanfrageRecord, absender: Benutzer, neu: bool) -> Einladung {
    Einladung {
        anfrage_id: FriendRequestId(anfrage.id),
        absender,
        ziel: UserId(anfrage.receiver_id),
        zeitpunkt: anfrage.created_at,
        neu,
    }
}
