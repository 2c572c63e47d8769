//! Fehlertypen fuer das Chat-Crate

use thiserror::Error;

/// Chat-Fehlertypen
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Konversation nicht gefunden: {0}")]
    KonversationNichtGefunden(String),

    #[error("Benutzer nicht gefunden: {0}")]
    BenutzerNichtGefunden(String),

    #[error("Freundschaftsanfrage nicht gefunden: {0}")]
    AnfrageNichtGefunden(String),

    #[error("Keine Berechtigung: {0}")]
    KeineBerechtigung(String),

    #[error("Anfrage bereits beantwortet: {0}")]
    BereitsBeantwortet(String),

    #[error("Ungueltige Eingabe: {0}")]
    UngueltigeEingabe(String),

    #[error("Datenbank-Fehler: {0}")]
    DatenbankFehler(#[from] parley_db::DbError),
}

impl ChatError {
    /// `true` fuer alle "nicht gefunden"-Varianten
    pub fn ist_nicht_gefunden(&self) -> bool {
        matches!(
            self,
            Self::KonversationNichtGefunden(_)
                | Self::BenutzerNichtGefunden(_)
                | Self::AnfrageNichtGefunden(_)
                | Self::DatenbankFehler(parley_db::DbError::NichtGefunden(_))
        )
    }
}

pub type ChatResult<T> = Result<T, ChatError>;
