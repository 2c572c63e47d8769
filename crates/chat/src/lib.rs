//! parley-chat – Nachrichten-Relay und Beziehungen
//!
//! Dieses Crate implementiert die Domain-Logik hinter den Chat-Ereignissen:
//! - ChatService: Nachricht senden (mit Zustellplan je Mitglied), Zuhoeren
//!   aktivieren, Pruefungen fuer das Weiterleiten von Schluessel-Ereignissen
//! - BeziehungService: Freundschaftsanfragen, Antworten, Gruppen
//!
//! Die Dienste fuehren selbst keine Netzwerk-I/O aus. Sie liefern, wer was
//! bekommen soll; das Verteilen uebernimmt `parley-signaling`.
//!
//! # Beispiel
//!
//! ```no_run
//! use std::sync::Arc;
//! use parley_chat::{BeziehungService, ChatService};
//! use parley_db::SqliteDb;
//!
//! # async fn beispiel() -> Result<(), Box<dyn std::error::Error>> {
//! let db = Arc::new(SqliteDb::in_memory().await?);
//! let chat = ChatService::neu(db.clone());
//! let beziehungen = BeziehungService::neu(db);
//! # Ok(())
//! # }
//! ```

pub mod beziehungen;
pub mod error;
pub mod service;
pub mod types;


// Bequeme Re-Exporte
pub use beziehungen::BeziehungService;
pub use error::{ChatError, ChatResult};
pub use service::{ChatService, MAX_INHALT_BYTES};
pub use types::{
    Antwort, Benutzer, ChatNachricht, Einladung, Empfaenger, KonversationInfo, NeueGruppe,
    Versand, Zustellung,
};
