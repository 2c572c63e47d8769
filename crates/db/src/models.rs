//! Datenbankmodelle fuer parley
//!
//! Diese Typen repraesentieren Datensaetze aus der Datenbank.
//! Sie sind von den Domain-Typen getrennt und dienen als reine Datenuebertragungsobjekte.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Benutzer
// ---------------------------------------------------------------------------

/// Benutzer-Datensatz aus der Datenbank
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BenutzerRecord {
    pub id: Uuid,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

/// Daten zum Erstellen eines neuen Benutzers
#[derive(Debug, Clone)]
pub struct NeuerBenutzer<'a> {
    pub username: &'a str,
}

/// Gespeichertes Bearer-Token (nur der Hash)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenRecord {
    pub token_hash: String,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Konversationen
// ---------------------------------------------------------------------------

/// Konversations-Datensatz (Direktchat oder Gruppe)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KonversationRecord {
    pub id: Uuid,
    pub title: String,
    pub admin_id: Uuid,
    pub is_direct: bool,
    pub created_at: DateTime<Utc>,
}

/// Daten zum Erstellen einer Konversation
#[derive(Debug, Clone)]
pub struct NeueKonversation<'a> {
    pub title: &'a str,
    pub admin_id: Uuid,
    pub is_direct: bool,
}

/// Mitgliedschaft eines Benutzers in einer Konversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MitgliedschaftRecord {
    pub conversation_id: Uuid,
    pub user_id: Uuid,
    /// Anzeigename des Mitglieds (aus `users` gejoint)
    pub username: String,
    /// `true` = volle Zustellung, `false` = nur Benachrichtigung
    pub is_listening: bool,
    pub joined_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Nachrichten
// ---------------------------------------------------------------------------

/// Nachrichten-Datensatz; der Inhalt ist fuer den Server undurchsichtig
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NachrichtRecord {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub author_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Daten zum Erstellen einer Nachricht
#[derive(Debug, Clone)]
pub struct NeueNachricht<'a> {
    pub conversation_id: Uuid,
    pub author_id: Uuid,
    pub content: &'a str,
}

// ---------------------------------------------------------------------------
// Freundschaftsanfragen
// ---------------------------------------------------------------------------

/// Zustand einer Freundschaftsanfrage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnfrageStatus {
    Pending,
    Accepted,
    Rejected,
}

impl AnfrageStatus {
    pub fn als_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
        }
    }
}

impl std::str::FromStr for AnfrageStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "accepted" => Ok(Self::Accepted),
            "rejected" => Ok(Self::Rejected),
            other => Err(format!("Unbekannter Anfrage-Status: {other}")),
        }
    }
}

/// Freundschaftsanfrage-Datensatz
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreundschaftsanfrageRecord {
    pub id: Uuid,
    pub sender_id: Uuid,
    /// Ziel der Anfrage (besitzt die Benachrichtigung)
    pub receiver_id: Uuid,
    pub status: AnfrageStatus,
    pub created_at: DateTime<Utc>,
    pub responded_at: Option<DateTime<Utc>>,
}
