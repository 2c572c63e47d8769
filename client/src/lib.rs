//! parley-client – Client-Seite des parley-Protokolls
//!
//! Alles was ein Client braucht, ohne Oberflaeche:
//! - `ServerVerbindung`: gerahmte TCP-Verbindung, beantwortet Server-Pings
//! - `ClientSession`: verarbeitet Server-Ereignisse, fuehrt den
//!   Schluesselaustausch und den Nachrichtenverlauf
//! - `KonversationsLog`: Verlauf je Konversations-ID
//! - `SecretStore`: Zugangsdaten mit explizitem Lebenszyklus
//!
//! # Beispiel
//!
//! ```no_run
//! use parley_client::{ClientSession, ServerVerbindung};
//!
//! # async fn beispiel() -> parley_client::ClientResult<()> {
//! let mut verbindung = ServerVerbindung::verbinden("127.0.0.1:7700").await?;
//! let info = verbindung.authentifizieren("mein-token").await?;
//! let mut sitzung = ClientSession::neu(info.user_id, info.username);
//!
//! loop {
//!     let nachricht = verbindung.empfangen().await?;
//!     let antworten = sitzung.ereignis_verarbeiten(nachricht.event);
//!     verbindung.alle_senden(antworten).await?;
//! }
//! # }
//! ```

pub mod error;
pub mod konversations_log;
pub mod secret_store;
pub mod session;
pub mod verbindung;

// Bequeme Re-Exporte
pub use error::{ClientError, ClientResult};
pub use konversations_log::{Inhalt, KonversationsLog, LogEintrag};
pub use secret_store::{SecretStore, Zugangsdaten};
pub use session::{ClientSession, OffeneEinladung};
pub use verbindung::ServerVerbindung;
