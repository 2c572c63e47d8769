//! parley-server – Bibliotheks-Root
//!
//! Deklariert alle Server-Module und stellt den oeffentlichen Einstiegspunkt
//! fuer Integrationstests bereit.

pub mod config;
pub mod logging;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use config::ServerConfig;
use parley_auth::{AuthService, Identitaet};
use parley_db::SqliteDb;
use parley_signaling::{SignalingServer, SignalingState};
use tokio::sync::watch;

/// Haelt den laufenden Server-Zustand zusammen
pub struct Server {
    pub config: ServerConfig,
}

impl Server {
    /// Erstellt einen neuen Server aus der gegebenen Konfiguration
    pub fn neu(config: ServerConfig) -> Self {
        Self { config }
    }

    /// Oeffnet die Datenbank und fuehrt Migrationen aus
    pub async fn datenbank_oeffnen(&self) -> Result<Arc<SqliteDb>> {
        let db = SqliteDb::oeffnen(&self.config.datenbank_config())
            .await
            .with_context(|| format!("Datenbank '{}' nicht oeffenbar", self.config.datenbank.url))?;
        Ok(Arc::new(db))
    }

    /// Bindet den Signaling-Server auf `adresse` ueber der gegebenen Datenbank
    pub async fn signaling_binden(
        &self,
        db: Arc<SqliteDb>,
        adresse: SocketAddr,
    ) -> Result<SignalingServer<SqliteDb>> {
        let state = SignalingState::neu(self.config.signaling_config(), db);
        SignalingServer::binden(state, adresse)
            .await
            .with_context(|| format!("TCP-Listener auf {adresse} nicht bindbar"))
    }

    /// Legt einen Benutzer an und stellt ein erstes Token aus
    pub async fn benutzer_anlegen(&self, name: &str) -> Result<(Identitaet, String)> {
        let db = self.datenbank_oeffnen().await?;
        let auth = AuthService::neu(db);
        let ergebnis = auth
            .benutzer_anlegen(name)
            .await
            .with_context(|| format!("Benutzer '{name}' nicht anlegbar"))?;
        Ok(ergebnis)
    }

    /// Startet den Server und laeuft bis zum Shutdown-Signal
    ///
    /// Reihenfolge:
    /// 1. Datenbankverbindung herstellen
    /// 2. TCP-Listener binden
    /// 3. Verbindungen in einer `LocalSet` annehmen
    /// 4. Auf Ctrl-C warten
    pub async fn starten(self) -> Result<()> {
        let adresse: SocketAddr = self
            .config
            .tcp_bind_adresse()
            .parse()
            .with_context(|| format!("Ungueltige Bind-Adresse '{}'", self.config.tcp_bind_adresse()))?;

        tracing::info!(
            server_name = %self.config.server.name,
            tcp = %adresse,
            max_clients = self.config.server.max_clients,
            "Server startet"
        );

        let db = self.datenbank_oeffnen().await?;
        let signaling = self.signaling_binden(db, adresse).await?;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => tracing::info!("Shutdown-Signal empfangen, Server wird beendet"),
                Err(e) => tracing::error!(fehler = %e, "Signal-Handler fehlgeschlagen"),
            }
            let _ = shutdown_tx.send(true);
        });

        tracing::info!("Server laeuft. Warte auf Shutdown-Signal (Ctrl-C)...");
        signaling.starten(shutdown_rx).await?;
        Ok(())
    }
}
