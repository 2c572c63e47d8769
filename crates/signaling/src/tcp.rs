//! TCP-Listener – Bindet Socket, akzeptiert Verbindungen
//!
//! Der `SignalingServer` bindet einen TCP-Socket und startet fuer jede
//! eingehende Verbindung einen eigenen Task mit einer `ClientConnection`.
//!
//! ## Concurrency-Modell
//! Da die Repository-Traits async fn ohne Send-Garantie verwenden
//! (async_fn_in_trait), laufen alle Verbindungs-Tasks in einer
//! `tokio::task::LocalSet` auf einem single-threaded Executor.

use parley_db::ParleyRepository;
use parley_protocol::{ErrorCode, ServerMessage};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::LocalSet;

use crate::connection::ClientConnection;
use crate::server_state::SignalingState;

/// TCP-Signaling-Server
///
/// Jede Verbindung wird als lokaler Task in der `LocalSet` ausgefuehrt.
pub struct SignalingServer<R: ParleyRepository> {
    state: Arc<SignalingState<R>>,
    listener: TcpListener,
}

impl<R: ParleyRepository> SignalingServer<R> {
    /// Bindet den Socket
    ///
    /// Port 0 waehlt einen freien Port; die tatsaechliche Adresse liefert
    /// `local_addr()`.
    pub async fn binden(state: Arc<SignalingState<R>>, bind_addr: SocketAddr) -> std::io::Result<Self> {
        let listener = TcpListener::bind(bind_addr).await?;
        Ok(Self { state, listener })
    }

    /// Gibt die gebundene Adresse zurueck
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Akzeptiert Verbindungen in einer eigenen `LocalSet`
    ///
    /// Laeuft bis `shutdown_rx` ein `true`-Signal empfaengt.
    pub async fn starten(self, shutdown_rx: watch::Receiver<bool>) -> std::io::Result<()> {
        let local = LocalSet::new();
        local.run_until(self.accept_loop(shutdown_rx)).await
    }

    /// Accept-Loop; muss innerhalb einer `LocalSet` laufen
    ///
    /// Fuer Aufrufer die bereits eine `LocalSet` betreiben (z.B. Tests).
    pub async fn accept_loop(self, mut shutdown_rx: watch::Receiver<bool>) -> std::io::Result<()> {
        tracing::info!(adresse = %self.local_addr()?, "TCP Signaling-Server gestartet");

        loop {
            tokio::select! {
                // Neue eingehende Verbindung
                result = self.listener.accept() => {
                    match result {
                        Ok((stream, peer_addr)) => self.annehmen(stream, peer_addr, &shutdown_rx),
                        Err(e) => {
                            tracing::error!(fehler = %e, "TCP-Accept-Fehler");
                            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
                        }
                    }
                }

                // Shutdown-Signal
                Ok(()) = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        tracing::info!("Signaling-Server: Shutdown-Signal empfangen");
                        break;
                    }
                }
            }
        }

        tracing::info!(
            uptime_sek = self.state.uptime_sek(),
            "TCP Signaling-Server gestoppt"
        );
        Ok(())
    }

    fn annehmen(&self, stream: TcpStream, peer_addr: SocketAddr, shutdown_rx: &watch::Receiver<bool>) {
        if !self.state.verbindung_reservieren() {
            tracing::warn!(
                peer = %peer_addr,
                max = self.state.config.max_clients,
                "Server voll – Verbindung abgelehnt"
            );
            tokio::task::spawn_local(server_voll(stream));
            return;
        }

        tracing::debug!(peer = %peer_addr, "Verbindung akzeptiert");

        let verbindung = ClientConnection::neu(Arc::clone(&self.state), peer_addr);
        let shutdown_rx = shutdown_rx.clone();

        // Lokaler Task – kein Send erforderlich
        tokio::task::spawn_local(async move {
            verbindung.verarbeiten(stream, shutdown_rx).await;
        });
    }
}

/// Meldet einer abgewiesenen Verbindung den Grund und schliesst sie
async fn server_voll(stream: TcpStream) {
    use futures_util::SinkExt;
    use parley_protocol::ServerCodec;
    use tokio_util::codec::Framed;

    let mut framed = Framed::new(stream, ServerCodec::new());
    let _ = framed
        .send(ServerMessage::error(0, ErrorCode::InternalError, "Server ist voll"))
        .await;
}
