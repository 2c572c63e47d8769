//! parley-db – Beziehungsspeicher
//!
//! Dieses Crate stellt das Repository-Pattern bereit: Traits fuer Benutzer,
//! Tokens, Konversationen, Nachrichten und Freundschaftsanfragen sowie eine
//! SQLite-Implementierung mit eingebetteten Migrationen.
//!
//! Der Speicher ist die einzige Quelle der Wahrheit fuer Teilnehmer und
//! `listening`-Flags. Konkurrierende Schreibzugriffe (z.B. zwei gleichzeitige
//! Einladungen fuer dasselbe Paar) werden ueber Transaktionen und
//! Compare-and-Set-Updates serialisiert.

pub mod error;
pub mod models;
pub mod repository;
pub mod sqlite;

pub use error::DbError;
pub use repository::{
    ConversationRepository, DatabaseConfig, DbResult, FriendRequestRepository,
    MessageRepository, ParleyRepository, TokenRepository, UserRepository,
};
pub use sqlite::SqliteDb;
