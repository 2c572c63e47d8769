//! Schluessel-Handler – Relay fuer den Schluesselaustausch
//!
//! Der Server liest `dh_key` und `rsa_key` nie. Er prueft nur, wer an wen
//! weiterleiten darf, und stellt an genau eine Gruppe zu.

use parley_core::types::UserId;
use parley_db::ParleyRepository;
use parley_protocol::control::{KeyRequest, KeyRequestNotify, KeyResponse};
use parley_protocol::{ServerEvent, ServerMessage};
use std::sync::Arc;

use crate::error::{SignalingError, SignalingResult};
use crate::server_state::SignalingState;

/// Leitet eine Schluessel-Anfrage an den Admin der Konversation weiter
pub async fn handle_key_request<R: ParleyRepository>(
    request: KeyRequest,
    user_id: UserId,
    state: &Arc<SignalingState<R>>,
) -> SignalingResult<()> {
    if request.dh_key.is_empty() {
        return Err(SignalingError::protokoll("dh_key fehlt"));
    }

    let admin = state
        .chat_service
        .schluessel_anfrage_pruefen(user_id, request.conversation_id)
        .await?;

    let erreicht = state.router.publish(
        &admin,
        ServerMessage::push(ServerEvent::KeyRequest(KeyRequestNotify {
            conversation_id: request.conversation_id,
            dh_key: request.dh_key,
            user_id,
        })),
    );

    if erreicht == 0 {
        // Kein Postfach: der Anfragende muss spaeter erneut anfragen
        tracing::debug!(
            conversation_id = %request.conversation_id,
            admin = %admin,
            "Admin nicht verbunden – Schluessel-Anfrage verworfen"
        );
    }
    Ok(())
}

/// Leitet eine Schluessel-Antwort unveraendert an den Anfragenden weiter
pub async fn handle_key_response<R: ParleyRepository>(
    response: KeyResponse,
    user_id: UserId,
    state: &Arc<SignalingState<R>>,
) -> SignalingResult<()> {
    if response.dh_key.is_empty() || response.rsa_key.is_empty() {
        return Err(SignalingError::protokoll("dh_key oder rsa_key fehlt"));
    }

    state
        .chat_service
        .schluessel_antwort_pruefen(user_id, response.conversation_id, response.user_id)
        .await?;

    let ziel = response.user_id;
    let conversation_id = response.conversation_id;
    let erreicht = state
        .router
        .publish(&ziel, ServerMessage::push(ServerEvent::KeyResponse(response)));

    tracing::debug!(
        conversation_id = %conversation_id,
        ziel = %ziel,
        verbindungen = erreicht,
        "Schluessel-Antwort weitergeleitet"
    );
    Ok(())
}
