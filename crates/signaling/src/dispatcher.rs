//! Message-Dispatcher – Routet Client-Ereignisse an die richtigen Handler
//!
//! Der Dispatcher sieht nur authentifizierte Verbindungen; die Anmeldung
//! erledigt `ClientConnection` vor dem ersten Dispatch. Das `match` ueber
//! `ClientEvent` ist erschoepfend, damit eine neue Ereignisart hier nicht
//! stillschweigend verloren geht.
//!
//! Fehler eines Handlers werden als `error`-Ereignis nur an den Ausloeser
//! gesendet. Fan-out laeuft ausschliesslich ueber den Gruppen-Router.

use parley_core::types::{ConnectionId, UserId};
use parley_db::ParleyRepository;
use parley_protocol::{ClientEvent, ClientMessage, ErrorCode, ServerMessage};
use std::net::SocketAddr;
use std::sync::Arc;

use crate::error::{SignalingError, SignalingResult};
use crate::handlers::{beziehung_handler, chat_handler, schluessel_handler};
use crate::server_state::SignalingState;

/// Dispatcher-Kontext – Informationen ueber die aktuelle Verbindung
#[derive(Debug, Clone)]
pub struct DispatcherContext {
    pub peer_addr: SocketAddr,
    pub connection_id: ConnectionId,
    /// Authentifizierter Benutzer dieser Verbindung
    pub user_id: UserId,
    pub username: String,
}

/// Zentraler Message-Dispatcher
pub struct MessageDispatcher<R: ParleyRepository> {
    state: Arc<SignalingState<R>>,
}

impl<R: ParleyRepository> MessageDispatcher<R> {
    /// Erstellt einen neuen Dispatcher
    pub fn neu(state: Arc<SignalingState<R>>) -> Self {
        Self { state }
    }

    /// Verarbeitet ein eingehendes Ereignis
    ///
    /// Gibt die direkte Antwort an den Ausloeser zurueck (Fehler, Pong) oder
    /// `None` wenn nichts direkt zu senden ist.
    pub async fn dispatch(
        &self,
        message: ClientMessage,
        ctx: &DispatcherContext,
    ) -> Option<ServerMessage> {
        let request_id = message.request_id;
        let user_id = ctx.user_id;

        let ergebnis = match message.event {
            // -------------------------------------------------------------------
            // Chat
            // -------------------------------------------------------------------
            ClientEvent::Message(req) => {
                chat_handler::handle_message(req, user_id, &self.state).await
            }

            ClientEvent::JoinConversation(req) => {
                chat_handler::handle_join(req, user_id, &self.state).await
            }

            // -------------------------------------------------------------------
            // Schluesselaustausch
            // -------------------------------------------------------------------
            ClientEvent::KeyRequest(req) => {
                schluessel_handler::handle_key_request(req, user_id, &self.state).await
            }

            ClientEvent::KeyResponse(resp) => {
                schluessel_handler::handle_key_response(resp, user_id, &self.state).await
            }

            // -------------------------------------------------------------------
            // Beziehungen
            // -------------------------------------------------------------------
            ClientEvent::InviteFriend(req) => {
                beziehung_handler::handle_invite(req, user_id, &self.state).await
            }

            ClientEvent::ResponseFriendReq(req) => {
                beziehung_handler::handle_response(req, user_id, &self.state).await
            }

            ClientEvent::CreateGroup(req) => {
                beziehung_handler::handle_create_group(req, user_id, &self.state).await
            }

            // -------------------------------------------------------------------
            // Keepalive
            // -------------------------------------------------------------------
            ClientEvent::Ping(ping) => {
                return Some(ServerMessage::pong(request_id, ping.timestamp_ms));
            }

            ClientEvent::Pong(_) => {
                tracing::trace!(connection_id = %ctx.connection_id, "Pong empfangen");
                return None;
            }

            // -------------------------------------------------------------------
            // Anmeldung nur als erstes Frame
            // -------------------------------------------------------------------
            ClientEvent::Authenticate(_) => {
                return Some(ServerMessage::error(
                    request_id,
                    ErrorCode::InvalidRequest,
                    "Verbindung ist bereits authentifiziert",
                ));
            }
        };

        self.fehler_antwort(request_id, ctx, ergebnis)
    }

    fn fehler_antwort(
        &self,
        request_id: u32,
        ctx: &DispatcherContext,
        ergebnis: SignalingResult<()>,
    ) -> Option<ServerMessage> {
        let fehler = ergebnis.err()?;

        match (&fehler, fehler.fehler_code()) {
            (_, ErrorCode::InternalError) => tracing::error!(
                user_id = %ctx.user_id,
                request_id,
                fehler = %fehler,
                "Ereignis abgebrochen"
            ),
            (SignalingError::Protokoll(_), _) => tracing::debug!(
                user_id = %ctx.user_id,
                request_id,
                fehler = %fehler,
                "Protokollfehler"
            ),
            _ => tracing::warn!(
                user_id = %ctx.user_id,
                request_id,
                fehler = %fehler,
                "Ereignis abgelehnt"
            ),
        }

        Some(fehler.als_antwort(request_id))
    }
}
