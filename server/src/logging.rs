//! Logging-Initialisierung
//!
//! `PARLEY_LOG_LEVEL` und `PARLEY_LOG_FORMAT` ueberschreiben die Werte aus
//! der Konfiguration; `RUST_LOG` hat als Filter Vorrang vor beidem.

use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LoggingEinstellungen;

/// Ausgabeformat der Log-Zeilen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl LogFormat {
    /// Unbekannte Werte fallen auf `Text` zurueck
    pub fn parsen(wert: &str) -> Self {
        if wert.eq_ignore_ascii_case("json") {
            Self::Json
        } else {
            Self::Text
        }
    }
}

/// Wirksames Level und Format nach Umgebungsvariablen
pub fn aufloesen(
    config: &LoggingEinstellungen,
    level_env: Option<String>,
    format_env: Option<String>,
) -> (String, LogFormat) {
    let level = level_env
        .filter(|l| !l.trim().is_empty())
        .unwrap_or_else(|| config.level.clone());
    let format = format_env.unwrap_or_else(|| config.format.clone());
    (level, LogFormat::parsen(&format))
}

/// Initialisiert tracing-subscriber mit dem konfigurierten Level und Format
pub fn initialisieren(config: &LoggingEinstellungen) {
    let (level, format) = aufloesen(
        config,
        std::env::var("PARLEY_LOG_LEVEL").ok(),
        std::env::var("PARLEY_LOG_FORMAT").ok(),
    );

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&level));

    match format {
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        LogFormat::Text => {
            fmt().with_env_filter(filter).with_target(true).init();
        }
    }
}
