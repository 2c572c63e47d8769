//! Repository-Trait-Definitionen
//!
//! Das Repository-Pattern entkoppelt die Geschaeftslogik von der konkreten
//! Datenbank-Implementierung. Die Dienste in `parley-chat` und `parley-auth`
//! sind generisch ueber diese Traits und werden in Tests mit einer
//! In-Memory-SQLite betrieben.

use uuid::Uuid;

use crate::error::DbError;
use crate::models::{
    BenutzerRecord, FreundschaftsanfrageRecord, KonversationRecord, MitgliedschaftRecord,
    NachrichtRecord, NeueKonversation, NeueNachricht, NeuerBenutzer, TokenRecord,
};

pub type DbResult<T> = Result<T, DbError>;

/// Konfiguration fuer die Datenbankverbindung
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Verbindungs-URL (z.B. "sqlite://parley.db")
    pub url: String,
    /// Maximale Anzahl gleichzeitiger Verbindungen im Pool
    pub max_verbindungen: u32,
    /// Ob WAL-Modus aktiviert werden soll
    pub sqlite_wal: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://parley.db".into(),
            max_verbindungen: 5,
            sqlite_wal: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Benutzer
// ---------------------------------------------------------------------------

#[allow(async_fn_in_trait)]
pub trait UserRepository: Send + Sync {
    /// Legt einen Benutzer an; doppelter Name ergibt `DbError::Eindeutigkeit`
    async fn create(&self, data: NeuerBenutzer<'_>) -> DbResult<BenutzerRecord>;
    async fn get_by_id(&self, id: Uuid) -> DbResult<Option<BenutzerRecord>>;
    async fn get_by_name(&self, username: &str) -> DbResult<Option<BenutzerRecord>>;
    /// Prueft ob zwischen `a` und `b` eine Freundschaft besteht
    async fn sind_befreundet(&self, a: Uuid, b: Uuid) -> DbResult<bool>;
}

// ---------------------------------------------------------------------------
// Tokens
// ---------------------------------------------------------------------------

#[allow(async_fn_in_trait)]
pub trait TokenRepository: Send + Sync {
    async fn token_speichern(&self, user_id: Uuid, token_hash: &str) -> DbResult<TokenRecord>;
    /// Loest einen Token-Hash zu genau einem Benutzer auf
    async fn benutzer_fuer_token(&self, token_hash: &str) -> DbResult<Option<BenutzerRecord>>;
}

// ---------------------------------------------------------------------------
// Konversationen
// ---------------------------------------------------------------------------

#[allow(async_fn_in_trait)]
pub trait ConversationRepository: Send + Sync {
    /// Legt eine Konversation an und fuegt den Admin als Teilnehmer hinzu
    async fn create_conversation(&self, data: NeueKonversation<'_>)
        -> DbResult<KonversationRecord>;
    async fn get_conversation(&self, id: Uuid) -> DbResult<Option<KonversationRecord>>;
    /// Fuegt einen Teilnehmer mit `listening = false` hinzu
    ///
    /// Gibt `true` zurueck wenn die Mitgliedschaft neu ist. Ein unbekannter
    /// Benutzer oder eine unbekannte Konversation ergibt `NichtGefunden`.
    async fn add_participant(&self, conversation_id: Uuid, user_id: Uuid) -> DbResult<bool>;
    async fn get_membership(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
    ) -> DbResult<Option<MitgliedschaftRecord>>;
    /// Alle Mitgliedschaften einer Konversation (inkl. Anzeigename)
    async fn mitgliedschaften(&self, conversation_id: Uuid) -> DbResult<Vec<MitgliedschaftRecord>>;
    /// Setzt das `listening`-Flag; `false` wenn keine Mitgliedschaft existiert
    async fn zuhoeren_setzen(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
        listening: bool,
    ) -> DbResult<bool>;
}

// ---------------------------------------------------------------------------
// Nachrichten
// ---------------------------------------------------------------------------

#[allow(async_fn_in_trait)]
pub trait MessageRepository: Send + Sync {
    async fn create_message(&self, data: NeueNachricht<'_>) -> DbResult<NachrichtRecord>;
}

// ---------------------------------------------------------------------------
// Freundschaftsanfragen
// ---------------------------------------------------------------------------

#[allow(async_fn_in_trait)]
pub trait FriendRequestRepository: Send + Sync {
    /// Legt eine offene Anfrage an oder laedt die bereits offene
    ///
    /// Gibt `(anfrage, neu_erstellt)` zurueck. Hoechstens eine offene Anfrage
    /// je (Absender, Empfaenger) existiert, auch bei gleichzeitigen Aufrufen.
    async fn create_friend_request(
        &self,
        sender_id: Uuid,
        receiver_id: Uuid,
    ) -> DbResult<(FreundschaftsanfrageRecord, bool)>;
    async fn get_friend_request(&self, id: Uuid) -> DbResult<Option<FreundschaftsanfrageRecord>>;
    /// Nimmt eine offene Anfrage atomar an
    ///
    /// Setzt den Status, legt die Freundschaft an und erstellt eine
    /// Direkt-Konversation mit dem Empfaenger als Admin und beiden als
    /// Teilnehmern. `None` wenn die Anfrage nicht (mehr) offen ist.
    ///
    /// Sind beide bereits befreundet, wird nur der Status gesetzt und keine
    /// Konversation erstellt.
    async fn anfrage_annehmen(
        &self,
        id: Uuid,
        titel: &str,
    ) -> DbResult<Option<(FreundschaftsanfrageRecord, Option<KonversationRecord>)>>;
    /// Lehnt eine offene Anfrage ab; `None` wenn sie nicht (mehr) offen ist
    async fn anfrage_ablehnen(&self, id: Uuid) -> DbResult<Option<FreundschaftsanfrageRecord>>;
    /// Offene Anfragen an den Benutzer, aelteste zuerst
    async fn offene_anfragen(&self, receiver_id: Uuid) -> DbResult<Vec<FreundschaftsanfrageRecord>>;
}

/// Buendelt alle Repositories die der Server benoetigt
pub trait ParleyRepository:
    UserRepository
    + TokenRepository
    + ConversationRepository
    + MessageRepository
    + FriendRequestRepository
    + 'static
{
}

impl<T> ParleyRepository for T where
    T: UserRepository
        + TokenRepository
        + ConversationRepository
        + MessageRepository
        + FriendRequestRepository
        + 'static
{
}
