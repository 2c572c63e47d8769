//! Client-Connection – Verwaltet eine einzelne TCP-Verbindung
//!
//! Jede TCP-Verbindung bekommt eine `ClientConnection` in einem eigenen
//! lokalen Task.
//!
//! ## Ablauf
//! ```text
//! Verbunden --authenticate{token}--> Authentifiziert --EOF/Timeout--> Getrennt
//!     |
//!     +-- falsches Token / anderes Ereignis / Frist abgelaufen
//!         --> error{UNAUTHORIZED}, Verbindung wird geschlossen
//! ```
//!
//! Erst nach erfolgreicher Anmeldung tritt die Verbindung der Gruppe ihres
//! Benutzers im Router bei. `authenticated` geht erst nach dem Beitritt
//! raus, gefolgt von offenen Einladungen. Es gibt keine Ersatz-Identitaet.
//!
//! ## Keepalive
//! - Server sendet alle `keepalive_sek` einen Ping
//! - Ohne eingehendes Frame innerhalb von `verbindungs_timeout_sek` wird
//!   die Verbindung getrennt

use futures_util::{SinkExt, StreamExt};
use parley_auth::Identitaet;
use parley_core::types::ConnectionId;
use parley_db::ParleyRepository;
use parley_protocol::control::AuthenticatedInfo;
use parley_protocol::{ClientEvent, ErrorCode, ServerCodec, ServerEvent, ServerMessage};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio_util::codec::Framed;

use crate::broadcast::ClientSender;
use crate::dispatcher::{DispatcherContext, MessageDispatcher};
use crate::error::SignalingError;
use crate::handlers::beziehung_handler;
use crate::server_state::SignalingState;

type ServerFramed = Framed<TcpStream, ServerCodec>;

// ---------------------------------------------------------------------------
// ClientConnection
// ---------------------------------------------------------------------------

/// Verarbeitet eine einzelne TCP-Verbindung
///
/// Liest Frames via `FrameCodec`, dispatcht an `MessageDispatcher` und
/// schreibt Antworten sowie Router-Ereignisse zurueck.
pub struct ClientConnection<R: ParleyRepository> {
    state: Arc<SignalingState<R>>,
    peer_addr: SocketAddr,
}

impl<R: ParleyRepository> ClientConnection<R> {
    /// Erstellt eine neue ClientConnection
    pub fn neu(state: Arc<SignalingState<R>>, peer_addr: SocketAddr) -> Self {
        Self { state, peer_addr }
    }

    /// Startet die Verbindungs-Verarbeitung
    ///
    /// Laeuft bis die Verbindung getrennt wird oder ein Shutdown-Signal
    /// eingeht. Der reservierte Verbindungsplatz wird am Ende freigegeben.
    pub async fn verarbeiten(self, stream: TcpStream, shutdown_rx: watch::Receiver<bool>) {
        let peer_addr = self.peer_addr;
        tracing::info!(peer = %peer_addr, "Neue Verbindung");

        let codec = ServerCodec::with_max_size(self.state.config.max_frame_groesse);
        let mut framed = Framed::new(stream, codec);

        if let Some((identitaet, request_id)) = self.anmelden(&mut framed).await {
            self.sitzung(framed, identitaet, request_id, shutdown_rx).await;
        }

        self.state.verbindung_freigeben();
        tracing::info!(peer = %peer_addr, "Verbindungs-Task beendet");
    }

    // -----------------------------------------------------------------------
    // Anmeldung
    // -----------------------------------------------------------------------

    /// Erwartet `authenticate` als erstes Frame
    ///
    /// Liefert die Identitaet und die Request-ID des `authenticate`-Frames.
    /// Bestaetigt wird erst in [`Self::sitzung`], nach dem Beitritt zum Router.
    ///
    /// Gibt `None` zurueck wenn die Verbindung geschlossen werden soll. Die
    /// Fehlerantwort wurde dann bereits gesendet.
    async fn anmelden(&self, framed: &mut ServerFramed) -> Option<(Identitaet, u32)> {
        let peer_addr = self.peer_addr;
        let frist = Duration::from_secs(self.state.config.auth_timeout_sek);

        let erstes = match tokio::time::timeout(frist, framed.next()).await {
            Ok(Some(Ok(nachricht))) => nachricht,
            Ok(Some(Err(e))) => {
                tracing::warn!(peer = %peer_addr, fehler = %e, "Frame-Lesefehler vor Anmeldung");
                return None;
            }
            Ok(None) => {
                tracing::debug!(peer = %peer_addr, "Verbindung vor Anmeldung geschlossen");
                return None;
            }
            Err(_) => {
                tracing::warn!(peer = %peer_addr, "Authentifizierungs-Timeout");
                abweisen(framed, 0, ErrorCode::Unauthorized, "Authentifizierungs-Timeout").await;
                return None;
            }
        };

        let request_id = erstes.request_id;
        let ClientEvent::Authenticate(req) = erstes.event else {
            tracing::warn!(peer = %peer_addr, "Erstes Frame ist keine Authentifizierung");
            abweisen(
                framed,
                request_id,
                ErrorCode::Unauthorized,
                "Authentifizierung erforderlich",
            )
            .await;
            return None;
        };

        match self.state.auth_service.authentifizieren(&req.token).await {
            Ok(identitaet) => {
                tracing::info!(
                    peer = %peer_addr,
                    user_id = %identitaet.user_id,
                    "Verbindung authentifiziert"
                );
                Some((identitaet, request_id))
            }
            Err(e) => {
                tracing::warn!(peer = %peer_addr, fehler = %e, "Authentifizierung abgelehnt");
                let code = SignalingError::from(e).fehler_code();
                abweisen(framed, request_id, code, "Authentifizierung fehlgeschlagen").await;
                None
            }
        }
    }

    // -----------------------------------------------------------------------
    // Sitzung
    // -----------------------------------------------------------------------

    async fn sitzung(
        &self,
        mut framed: ServerFramed,
        identitaet: Identitaet,
        auth_request_id: u32,
        mut shutdown_rx: watch::Receiver<bool>,
    ) {
        let peer_addr = self.peer_addr;
        let keepalive_intervall = Duration::from_secs(self.state.config.keepalive_sek);
        let timeout_dauer = Duration::from_secs(self.state.config.verbindungs_timeout_sek);

        // Ausgehende Queue (Router -> TCP)
        let (sender, mut sende_rx) = ClientSender::neu(identitaet.user_id);
        let connection_id: ConnectionId = sender.connection_id;
        self.state.router.beitreten(sender);

        let ctx = DispatcherContext {
            peer_addr,
            connection_id,
            user_id: identitaet.user_id,
            username: identitaet.username,
        };
        let dispatcher = MessageDispatcher::neu(Arc::clone(&self.state));

        // Verpasste Einladungen nachliefern, direkt nach der Bestaetigung
        let einladungen = match beziehung_handler::offene_einladungen(ctx.user_id, &self.state).await {
            Ok(einladungen) => einladungen,
            Err(e) => {
                tracing::warn!(user_id = %ctx.user_id, fehler = %e, "Offene Einladungen nicht ladbar");
                Vec::new()
            }
        };

        let bestaetigung = ServerMessage::new(
            auth_request_id,
            ServerEvent::Authenticated(AuthenticatedInfo {
                user_id: ctx.user_id,
                username: ctx.username.clone(),
            }),
        );
        for nachricht in std::iter::once(bestaetigung).chain(einladungen) {
            if let Err(e) = framed.send(nachricht).await {
                tracing::warn!(peer = %peer_addr, fehler = %e, "Senden fehlgeschlagen");
                self.state.router.verlassen(&ctx.user_id, &connection_id);
                return;
            }
        }

        let mut letzter_empfang = Instant::now();
        let mut naechster_ping = Instant::now() + keepalive_intervall;
        let mut ping_request_id: u32 = 0;

        loop {
            let jetzt = Instant::now();

            if jetzt.duration_since(letzter_empfang) > timeout_dauer {
                tracing::warn!(peer = %peer_addr, user_id = %ctx.user_id, "Verbindungs-Timeout");
                break;
            }

            let ping_verzoegerung = naechster_ping.saturating_duration_since(jetzt);

            tokio::select! {
                // Eingehendes Ereignis vom Client
                frame = framed.next() => {
                    match frame {
                        Some(Ok(nachricht)) => {
                            letzter_empfang = Instant::now();
                            tracing::trace!(
                                peer = %peer_addr,
                                request_id = nachricht.request_id,
                                "Ereignis empfangen"
                            );

                            if let Some(antwort) = dispatcher.dispatch(nachricht, &ctx).await {
                                if let Err(e) = framed.send(antwort).await {
                                    tracing::warn!(peer = %peer_addr, fehler = %e, "Senden fehlgeschlagen");
                                    break;
                                }
                            }
                        }
                        Some(Err(e)) => {
                            tracing::warn!(peer = %peer_addr, fehler = %e, "Frame-Lesefehler");
                            break;
                        }
                        None => {
                            tracing::info!(peer = %peer_addr, "Verbindung vom Client getrennt");
                            break;
                        }
                    }
                }

                // Ausgehendes Ereignis aus dem Router
                Some(ausgehend) = sende_rx.recv() => {
                    if let Err(e) = framed.send(ausgehend).await {
                        tracing::warn!(peer = %peer_addr, fehler = %e, "Router-Senden fehlgeschlagen");
                        break;
                    }
                }

                // Keepalive-Ping
                _ = tokio::time::sleep(ping_verzoegerung) => {
                    ping_request_id = ping_request_id.wrapping_add(1);
                    if let Err(e) = framed.send(ServerMessage::ping(ping_request_id)).await {
                        tracing::warn!(peer = %peer_addr, fehler = %e, "Ping-Senden fehlgeschlagen");
                        break;
                    }
                    naechster_ping = Instant::now() + keepalive_intervall;
                }

                // Shutdown-Signal
                Ok(()) = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        tracing::info!(peer = %peer_addr, "Shutdown-Signal – Verbindung wird getrennt");
                        let abschied = ServerMessage::error(
                            0,
                            ErrorCode::InternalError,
                            "Server wird heruntergefahren",
                        );
                        let _ = framed.send(abschied).await;
                        break;
                    }
                }
            }
        }

        self.state.router.verlassen(&ctx.user_id, &connection_id);
    }
}

/// Sendet eine Fehlerantwort vor dem Schliessen; Sendefehler sind egal
async fn abweisen(framed: &mut ServerFramed, request_id: u32, code: ErrorCode, text: &str) {
    let _ = framed.send(ServerMessage::error(request_id, code, text)).await;
}
