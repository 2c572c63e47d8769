//! Fehlertypen fuer den Auth-Service

use thiserror::Error;

/// Alle moeglichen Fehler im Auth-Service
#[derive(Debug, Error)]
pub enum AuthError {
    // --- Authentifizierung ---
    #[error("Token fehlt")]
    TokenFehlt,

    #[error("Token ungueltig")]
    TokenUngueltig,

    // --- Benutzerverwaltung ---
    #[error("Benutzername bereits vergeben: {0}")]
    BenutzernameVergeben(String),

    #[error("Benutzer nicht gefunden: {0}")]
    BenutzerNichtGefunden(String),

    // --- Datenbank ---
    #[error("Datenbankfehler: {0}")]
    Datenbank(#[from] parley_db::DbError),
}

impl AuthError {
    /// `true` wenn der Fehler eine abgelehnte Anmeldung ist
    /// (im Gegensatz zu einem Speicherfehler)
    pub fn ist_abgelehnt(&self) -> bool {
        matches!(self, Self::TokenFehlt | Self::TokenUngueltig)
    }
}

/// Result-Alias fuer den Auth-Service
pub type AuthResult<T> = Result<T, AuthError>;
