//! Fehlertypen fuer den Signaling-Service

use parley_auth::AuthError;
use parley_chat::ChatError;
use parley_db::DbError;
use parley_protocol::{ErrorCode, ServerMessage};
use thiserror::Error;

/// Fehlertyp fuer den Signaling-Service
#[derive(Debug, Error)]
pub enum SignalingError {
    /// Authentifizierungsfehler
    #[error("Authentifizierungsfehler: {0}")]
    Auth(#[from] AuthError),

    /// Fehler aus der Chat-Domain (NotFound, Forbidden, Conflict, ...)
    #[error(transparent)]
    Chat(#[from] ChatError),

    /// Protokollfehler (unerwartetes Ereignis, falscher Zustand)
    #[error("Protokollfehler: {0}")]
    Protokoll(String),

    /// Berechtigung verweigert
    #[error("Berechtigung verweigert: {0}")]
    ZugriffVerweigert(String),
}

impl SignalingError {
    /// Erstellt einen Protokollfehler
    pub fn protokoll(msg: impl Into<String>) -> Self {
        Self::Protokoll(msg.into())
    }

    /// Fehler-Code fuer die Antwort an den Ausloeser
    pub fn fehler_code(&self) -> ErrorCode {
        match self {
            Self::Auth(e) if e.ist_abgelehnt() => ErrorCode::Unauthorized,
            Self::Auth(_) => ErrorCode::InternalError,
            Self::Chat(e) => chat_fehler_code(e),
            Self::Protokoll(_) => ErrorCode::InvalidRequest,
            Self::ZugriffVerweigert(_) => ErrorCode::Forbidden,
        }
    }

    /// Baut die Fehler-Antwort fuer `request_id`
    ///
    /// Speicherfehler werden nicht im Detail an den Client weitergegeben.
    pub fn als_antwort(&self, request_id: u32) -> ServerMessage {
        let code = self.fehler_code();
        let nachricht = match code {
            ErrorCode::InternalError => "Interner Serverfehler".to_string(),
            _ => self.to_string(),
        };
        ServerMessage::error(request_id, code, nachricht)
    }
}

fn chat_fehler_code(e: &ChatError) -> ErrorCode {
    match e {
        ChatError::KeineBerechtigung(_) => ErrorCode::Forbidden,
        ChatError::BereitsBeantwortet(_) => ErrorCode::Conflict,
        ChatError::UngueltigeEingabe(_) => ErrorCode::InvalidRequest,
        ChatError::DatenbankFehler(DbError::UngueltigeDaten(_)) => ErrorCode::InvalidRequest,
        e if e.ist_nicht_gefunden() => ErrorCode::NotFound,
        _ => ErrorCode::InternalError,
    }
}

/// Result-Typ fuer den Signaling-Service
pub type SignalingResult<T> = Result<T, SignalingError>;
