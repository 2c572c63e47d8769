//! Zugangsdaten-Speicher
//!
//! Eine JSON-Datei mit Benutzername, Token und Serveradresse. Laden,
//! Speichern und Loeschen sind explizite Schritte; nichts wird beim
//! Beenden automatisch geschrieben. Unter Unix ist die Datei nur fuer den
//! Eigentuemer lesbar.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ClientResult;

/// Gespeicherte Zugangsdaten
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zugangsdaten {
    pub username: String,
    pub token: String,
    pub server_adresse: String,
}

impl std::fmt::Debug for Zugangsdaten {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Zugangsdaten")
            .field("username", &self.username)
            .field("token", &"[REDACTED]")
            .field("server_adresse", &self.server_adresse)
            .finish()
    }
}

/// Dateibasierter Speicher fuer genau einen Satz Zugangsdaten
#[derive(Debug, Clone)]
pub struct SecretStore {
    pfad: PathBuf,
}

impl SecretStore {
    pub fn neu(pfad: impl Into<PathBuf>) -> Self {
        Self { pfad: pfad.into() }
    }

    pub fn pfad(&self) -> &Path {
        &self.pfad
    }

    /// `None` wenn noch nichts gespeichert wurde
    pub fn laden(&self) -> ClientResult<Option<Zugangsdaten>> {
        let inhalt = match fs::read_to_string(&self.pfad) {
            Ok(inhalt) => inhalt,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_str(&inhalt)?))
    }

    /// Schreibt atomar ueber eine temporaere Datei
    pub fn speichern(&self, daten: &Zugangsdaten) -> ClientResult<()> {
        if let Some(verzeichnis) = self.pfad.parent() {
            if !verzeichnis.as_os_str().is_empty() {
                fs::create_dir_all(verzeichnis)?;
            }
        }

        let json = serde_json::to_vec_pretty(daten)?;
        let temp = self.pfad.with_extension("tmp");
        {
            let mut datei = nur_eigentuemer().open(&temp)?;
            datei.write_all(&json)?;
            datei.sync_all()?;
        }
        fs::rename(&temp, &self.pfad)?;

        tracing::debug!(pfad = %self.pfad.display(), "Zugangsdaten gespeichert");
        Ok(())
    }

    /// Gibt `true` zurueck wenn eine Datei entfernt wurde
    pub fn loeschen(&self) -> ClientResult<bool> {
        match fs::remove_file(&self.pfad) {
            Ok(()) => {
                tracing::debug!(pfad = %self.pfad.display(), "Zugangsdaten geloescht");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

fn nur_eigentuemer() -> fs::OpenOptions {
    let mut optionen = fs::OpenOptions::new();
    optionen.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        optionen.mode(0o600);
    }
    optionen
}
