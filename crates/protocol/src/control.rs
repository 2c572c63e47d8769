//! Control-Protokoll (TCP)
//!
//! Definiert alle Ereignisse die ueber die TCP-Verbindung zwischen Client
//! und Server ausgetauscht werden.
//!
//! ## Design
//! - Umschlag mit `request_id: u32` fuer die Zuordnung von Fehlerantworten
//! - Vom Server gepushte Ereignisse tragen `request_id = 0`
//! - Tagged Enums (`"type"`-Feld) fuer typsichere Ereignisarten, damit
//!   neue Arten am Dispatch-Punkt nicht stillschweigend ignoriert werden
//! - Schluesselmaterial (`dh_key`, `rsa_key`) ist Base64 und fuer den
//!   Server undurchsichtig

use chrono::{DateTime, Utc};
use parley_core::types::{ConversationId, FriendRequestId, UserId};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Fehler-Codes
// ---------------------------------------------------------------------------

/// Standardisierte Fehler-Codes fuer Error-Antworten
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    InternalError,
    InvalidRequest,
    /// Credential fehlt oder ungueltig – Verbindung wird getrennt
    Unauthorized,
    NotFound,
    /// Akteur ist kein Teilnehmer der Konversation
    Forbidden,
    /// Anfrage bereits beantwortet
    Conflict,
}

/// Standardisierte Fehler-Antwort
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: ErrorCode,
    pub message: String,
}

// ---------------------------------------------------------------------------
// Client -> Server
// ---------------------------------------------------------------------------

/// Erstes Frame jeder Verbindung
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticateRequest {
    /// Bearer-Token des Benutzers
    pub token: String,
}

/// Nachricht in eine Konversation senden
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRequest {
    pub conversation_id: ConversationId,
    /// Bereits verschluesselter Inhalt (fuer den Server undurchsichtig)
    pub content: String,
}

/// Volle Zustellung fuer eine Konversation aktivieren
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinConversationRequest {
    pub conversation_id: ConversationId,
}

/// Schluessel-Anfrage eines Mitglieds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyRequest {
    pub conversation_id: ConversationId,
    /// Oeffentlicher DH-Wert des Anfragenden (Base64)
    pub dh_key: String,
}

/// Herkunft des transportierten Schluessels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyFlag {
    /// Der Admin hielt den Schluessel bereits
    Existing,
    /// Der Admin musste den Schluessel bei der Anfrage erst erzeugen
    Generated,
}

/// Schluessel-Antwort des Admins
///
/// Wird vom Server unveraendert an `user_id` weitergeleitet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyResponse {
    pub conversation_id: ConversationId,
    /// Empfaenger (der urspruengliche Anfragende)
    pub user_id: UserId,
    /// Oeffentlicher DH-Wert des Admins (Base64)
    pub dh_key: String,
    /// Mit dem DH-Geheimnis verschluesselter Konversations-Schluessel (Base64)
    pub rsa_key: String,
    pub flag: KeyFlag,
}

/// Freundschaftsanfrage senden
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InviteFriendRequest {
    pub friend_id: UserId,
}

/// Freundschaftsanfrage beantworten
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FriendResponseRequest {
    pub id: FriendRequestId,
    pub response: bool,
}

/// Gruppen-Konversation anlegen
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateGroupRequest {
    pub title: String,
    pub admin_id: UserId,
    pub users_ids: Vec<UserId>,
}

/// Alle Ereignisse vom Client an den Server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    Authenticate(AuthenticateRequest),
    Message(MessageRequest),
    JoinConversation(JoinConversationRequest),
    KeyRequest(KeyRequest),
    KeyResponse(KeyResponse),
    InviteFriend(InviteFriendRequest),
    ResponseFriendReq(FriendResponseRequest),
    CreateGroup(CreateGroupRequest),
    Ping(PingMessage),
    Pong(PongMessage),
}

// ---------------------------------------------------------------------------
// Server -> Client
// ---------------------------------------------------------------------------

/// Bestaetigung der Authentifizierung
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticatedInfo {
    pub user_id: UserId,
    pub username: String,
}

/// Verfasser einer zugestellten Nachricht
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorInfo {
    pub id: UserId,
    pub username: String,
}

/// Volle Zustellung einer Nachricht (Mitglied hoert zu)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMessage {
    pub conversation_id: ConversationId,
    pub author: AuthorInfo,
    pub timestamp: DateTime<Utc>,
    pub content: String,
}

/// Leichtgewichtige Benachrichtigung ohne Inhalt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewNotification {
    pub conversation_id: ConversationId,
}

/// An den Admin weitergeleitete Schluessel-Anfrage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyRequestNotify {
    pub conversation_id: ConversationId,
    pub dh_key: String,
    /// Der anfragende Benutzer
    pub user_id: UserId,
}

/// Eingegangene Freundschaftsanfrage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FriendRequestNotify {
    /// Name des Absenders
    pub sender: String,
    pub request_id: FriendRequestId,
    pub timestamp: DateTime<Utc>,
}

/// Antwort auf eine eigene Freundschaftsanfrage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FriendResponseNotify {
    /// Name des Antwortenden
    pub sender: String,
    pub response: bool,
    /// Neue Direkt-Konversation (nur bei Annahme)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<ConversationId>,
}

/// Eine neue Konversation, deren Admin der Empfaenger ist
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewConversation {
    pub conversation_id: ConversationId,
}

/// Hinweis an ein neues Gruppenmitglied
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateGroupNotify {
    pub title: String,
    /// Name des Admins
    pub admin: String,
    pub conversation_id: ConversationId,
}

/// Alle Ereignisse vom Server an den Client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    Authenticated(AuthenticatedInfo),
    NewMessage(NewMessage),
    NewNotification(NewNotification),
    KeyRequest(KeyRequestNotify),
    KeyResponse(KeyResponse),
    FriendRequest(FriendRequestNotify),
    #[serde(rename = "response_f_request")]
    ResponseFRequest(FriendResponseNotify),
    NewConversation(NewConversation),
    CreateGroupNotify(CreateGroupNotify),
    Error(ErrorResponse),
    Ping(PingMessage),
    Pong(PongMessage),
}

// ---------------------------------------------------------------------------
// Keepalive
// ---------------------------------------------------------------------------

/// Ping (Client -> Server oder Server -> Client)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PingMessage {
    /// Unix-Timestamp in Millisekunden fuer RTT-Messung
    pub timestamp_ms: u64,
}

/// Pong-Antwort (spiegelt Timestamp zurueck)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PongMessage {
    pub echo_timestamp_ms: u64,
    pub timestamp_ms: u64,
}

/// Aktueller Unix-Timestamp in Millisekunden
pub fn jetzt_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

// ---------------------------------------------------------------------------
// Umschlaege
// ---------------------------------------------------------------------------

/// Frame vom Client an den Server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientMessage {
    /// Vom Client vergebene ID, wird in Fehlerantworten gespiegelt
    pub request_id: u32,
    pub event: ClientEvent,
}

impl ClientMessage {
    pub fn new(request_id: u32, event: ClientEvent) -> Self {
        Self { request_id, event }
    }

    /// Erstellt eine Pong-Antwort auf einen Server-Ping
    pub fn pong(request_id: u32, echo_timestamp_ms: u64) -> Self {
        Self::new(
            request_id,
            ClientEvent::Pong(PongMessage {
                echo_timestamp_ms,
                timestamp_ms: jetzt_ms(),
            }),
        )
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

/// Frame vom Server an den Client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerMessage {
    /// Gespiegelte Request-ID oder 0 fuer gepushte Ereignisse
    pub request_id: u32,
    pub event: ServerEvent,
}

impl ServerMessage {
    pub fn new(request_id: u32, event: ServerEvent) -> Self {
        Self { request_id, event }
    }

    /// Vom Server initiiertes Ereignis (ohne Request-Bezug)
    pub fn push(event: ServerEvent) -> Self {
        Self::new(0, event)
    }

    /// Erstellt eine Fehler-Antwort
    pub fn error(request_id: u32, code: ErrorCode, message: impl Into<String>) -> Self {
        Self::new(
            request_id,
            ServerEvent::Error(ErrorResponse {
                code,
                message: message.into(),
            }),
        )
    }

    /// Erstellt eine Ping-Nachricht
    pub fn ping(request_id: u32) -> Self {
        Self::new(
            request_id,
            ServerEvent::Ping(PingMessage {
                timestamp_ms: jetzt_ms(),
            }),
        )
    }

    /// Erstellt eine Pong-Antwort
    pub fn pong(request_id: u32, echo_timestamp_ms: u64) -> Self {
        Self::new(
            request_id,
            ServerEvent::Pong(PongMessage {
                echo_timestamp_ms,
                timestamp_ms: jetzt_ms(),
            }),
        )
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
