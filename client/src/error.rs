//! Fehlertypen fuer den Client

use parley_crypto::CryptoError;
use parley_protocol::ErrorCode;
use thiserror::Error;

/// Fehler die im Client auftreten koennen
#[derive(Debug, Error)]
pub enum ClientError {
    /// TCP-Verbindung fehlgeschlagen oder abgebrochen
    #[error("IO-Fehler: {0}")]
    Io(#[from] std::io::Error),

    /// Server hat mit einem Fehler geantwortet
    #[error("Server-Fehler ({code:?}): {message}")]
    Server { code: ErrorCode, message: String },

    /// Unerwartete Antwort vom Server
    #[error("Unerwartete Antwort: {0}")]
    UnerwarteteAntwort(String),

    /// Server hat die Verbindung geschlossen
    #[error("Verbindung vom Server getrennt")]
    VerbindungGetrennt,

    #[error("Krypto-Fehler: {0}")]
    Krypto(#[from] CryptoError),

    /// Gespeicherte Zugangsdaten sind nicht lesbar
    #[error("Zugangsdaten ungueltig: {0}")]
    Zugangsdaten(#[from] serde_json::Error),
}

pub type ClientResult<T> = Result<T, ClientError>;
