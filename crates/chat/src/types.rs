//! Oeffentliche Typen fuer den Chat-Service

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use parley_core::types::{ConversationId, FriendRequestId, MessageId, UserId};
use parley_db::models::{BenutzerRecord, KonversationRecord};

/// Benutzer mit Anzeigename
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Benutzer {
    pub id: UserId,
    pub username: String,
}

impl From<BenutzerRecord> for Benutzer {
    fn from(r: BenutzerRecord) -> Self {
        Self {
            id: UserId(r.id),
            username: r.username,
        }
    }
}

/// Eine gespeicherte Nachricht (Domain-Typ, nicht DB-Record)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatNachricht {
    pub id: MessageId,
    pub conversation_id: ConversationId,
    pub author: Benutzer,
    /// Fuer den Server undurchsichtig
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Art der Zustellung an ein Mitglied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Zustellung {
    /// Mitglied hoert zu: volle Nachricht
    Voll,
    /// Mitglied hoert nicht zu: nur Hinweis ohne Inhalt
    Benachrichtigung,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Empfaenger {
    pub user_id: UserId,
    pub zustellung: Zustellung,
}

/// Ergebnis von `nachricht_senden`: Nachricht plus Zustellplan
///
/// Der Plan enthaelt jeden Teilnehmer genau einmal, den Verfasser
/// eingeschlossen.
#[derive(Debug, Clone)]
pub struct Versand {
    pub nachricht: ChatNachricht,
    pub empfaenger: Vec<Empfaenger>,
}

/// Kerndaten einer Konversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KonversationInfo {
    pub id: ConversationId,
    pub title: String,
    pub admin_id: UserId,
    pub is_direct: bool,
}

impl From<KonversationRecord> for KonversationInfo {
    fn from(r: KonversationRecord) -> Self {
        Self {
            id: ConversationId(r.id),
            title: r.title,
            admin_id: UserId(r.admin_id),
            is_direct: r.is_direct,
        }
    }
}

/// Offene Freundschaftsanfrage, wie sie dem Ziel gemeldet wird
#[derive(Debug, Clone)]
pub struct Einladung {
    pub anfrage_id: FriendRequestId,
    pub absender: Benutzer,
    pub ziel: UserId,
    pub zeitpunkt: DateTime<Utc>,
    /// `false` wenn eine bereits offene Anfrage erneut gemeldet wird
    pub neu: bool,
}

/// Ergebnis einer beantworteten Freundschaftsanfrage
#[derive(Debug, Clone)]
pub struct Antwort {
    pub anfrage_id: FriendRequestId,
    /// Urspruenglicher Absender der Anfrage
    pub absender_id: UserId,
    pub antwortender: Benutzer,
    pub angenommen: bool,
    /// Neue Direkt-Konversation; Admin ist der Antwortende
    ///
    /// `None` bei Ablehnung und wenn beide schon befreundet waren.
    pub konversation: Option<KonversationInfo>,
}

/// Ergebnis von `gruppe_erstellen`
#[derive(Debug, Clone)]
pub struct NeueGruppe {
    pub konversation: KonversationInfo,
    pub admin: Benutzer,
    /// Erfolgreich hinzugefuegte Mitglieder in Eingabereihenfolge
    pub hinzugefuegt: Vec<UserId>,
}
