//! parley Server – Einstiegspunkt
//!
//! Laedt die Konfiguration, initialisiert das Logging und startet den Server.
//!
//! ```text
//! parley-server                          Server starten
//! parley-server benutzer-anlegen <name>  Benutzer anlegen, Token ausgeben
//! ```

use anyhow::{bail, Result};
use parley_server::{config::ServerConfig, logging, Server};

#[tokio::main]
async fn main() -> Result<()> {
    // Konfigurationsdatei-Pfad aus Umgebungsvariable oder Standard
    let config_pfad = std::env::var("PARLEY_CONFIG").unwrap_or_else(|_| "config.toml".into());

    // Konfiguration laden (Standardwerte falls Datei fehlt)
    let config = ServerConfig::laden(&config_pfad)?;

    logging::initialisieren(&config.logging);

    let args: Vec<String> = std::env::args().skip(1).collect();
    let server = Server::neu(config);

    match args.as_slice() {
        [] => {
            tracing::info!(
                version = env!("CARGO_PKG_VERSION"),
                config = %config_pfad,
                "parley Server wird initialisiert"
            );
            server.starten().await
        }
        [kommando, name] if kommando == "benutzer-anlegen" => {
            let (identitaet, token) = server.benutzer_anlegen(name).await?;
            println!("user_id: {}", identitaet.user_id.inner());
            println!("token:   {token}");
            Ok(())
        }
        _ => bail!("Aufruf: parley-server [benutzer-anlegen <name>]"),
    }
}
