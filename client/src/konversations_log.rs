//! Nachrichtenverlauf je Konversation
//!
//! Der Verlauf ist nach Konversations-ID geordnet, nicht nach Titel: zwei
//! Gruppen mit gleichem Namen vermischen sich nicht.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parley_core::types::{ConversationId, UserId};

/// Inhalt eines Eintrags
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inhalt {
    /// Entschluesselt oder ohne Schluessel im Klartext gesendet
    Klartext(String),
    /// Konnte nicht entschluesselt werden; Rohdaten bleiben erhalten
    Unlesbar(String),
}

/// Eine empfangene Nachricht
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEintrag {
    pub author_id: UserId,
    pub author: String,
    pub zeitpunkt: DateTime<Utc>,
    pub inhalt: Inhalt,
}

#[derive(Debug, Default)]
struct Konversation {
    titel: Option<String>,
    eintraege: Vec<LogEintrag>,
    ungelesen: usize,
}

/// Verlauf aller bekannten Konversationen
#[derive(Debug, Default)]
pub struct KonversationsLog {
    konversationen: HashMap<ConversationId, Konversation>,
}

impl KonversationsLog {
    pub fn neu() -> Self {
        Self::default()
    }

    pub fn titel_setzen(&mut self, conversation_id: ConversationId, titel: impl Into<String>) {
        self.konversationen.entry(conversation_id).or_default().titel = Some(titel.into());
    }

    pub fn titel(&self, conversation_id: ConversationId) -> Option<&str> {
        self.konversationen
            .get(&conversation_id)
            .and_then(|k| k.titel.as_deref())
    }

    /// Haengt einen Eintrag an; Reihenfolge = Empfangsreihenfolge
    pub fn anhaengen(&mut self, conversation_id: ConversationId, eintrag: LogEintrag) {
        self.konversationen
            .entry(conversation_id)
            .or_default()
            .eintraege
            .push(eintrag);
    }

    pub fn eintraege(&self, conversation_id: ConversationId) -> &[LogEintrag] {
        self.konversationen
            .get(&conversation_id)
            .map(|k| k.eintraege.as_slice())
            .unwrap_or_default()
    }

    /// Zaehlt eine Benachrichtigung ohne Inhalt
    pub fn ungelesen_erhoehen(&mut self, conversation_id: ConversationId) {
        self.konversationen.entry(conversation_id).or_default().ungelesen += 1;
    }

    pub fn ungelesen(&self, conversation_id: ConversationId) -> usize {
        self.konversationen
            .get(&conversation_id)
            .map(|k| k.ungelesen)
            .unwrap_or(0)
    }

    pub fn als_gelesen_markieren(&mut self, conversation_id: ConversationId) {
        if let Some(k) = self.konversationen.get_mut(&conversation_id) {
            k.ungelesen = 0;
        }
    }

    /// Alle bekannten Konversationen (ungeordnet)
    pub fn konversationen(&self) -> impl Iterator<Item = ConversationId> + '_ {
        self.konversationen.keys().copied()
    }
}
