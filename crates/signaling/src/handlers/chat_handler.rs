//! Chat-Handler – Nachrichten senden und Zuhoeren aktivieren
//!
//! Routet Nachrichten ueber den ChatService und verteilt sie je nach
//! `listening`-Flag als `new_message` oder `new_notification`.

use parley_chat::{Versand, Zustellung};
use parley_core::types::UserId;
use parley_db::ParleyRepository;
use parley_protocol::control::{
    AuthorInfo, JoinConversationRequest, MessageRequest, NewMessage, NewNotification,
};
use parley_protocol::{ServerEvent, ServerMessage};
use std::sync::Arc;

use crate::error::SignalingResult;
use crate::server_state::SignalingState;

/// Verarbeitet ein `message`-Ereignis
pub async fn handle_message<R: ParleyRepository>(
    request: MessageRequest,
    user_id: UserId,
    state: &Arc<SignalingState<R>>,
) -> SignalingResult<()> {
    let versand = state
        .chat_service
        .nachricht_senden(user_id, request.conversation_id, &request.content)
        .await?;

    let erreicht = verteilen(&versand, state);

    tracing::debug!(
        user_id = %user_id,
        conversation_id = %request.conversation_id,
        message_id = %versand.nachricht.id,
        mitglieder = versand.empfaenger.len(),
        verbindungen = erreicht,
        "Nachricht verteilt"
    );
    Ok(())
}

/// Verarbeitet ein `join_conversation`-Ereignis
pub async fn handle_join<R: ParleyRepository>(
    request: JoinConversationRequest,
    user_id: UserId,
    state: &Arc<SignalingState<R>>,
) -> SignalingResult<()> {
    state
        .chat_service
        .zuhoeren(user_id, request.conversation_id)
        .await?;
    Ok(())
}

/// Sendet jedem Teilnehmer die passende Variante; Rueckgabe: erreichte Verbindungen
fn verteilen<R: ParleyRepository>(versand: &Versand, state: &SignalingState<R>) -> usize {
    let nachricht = &versand.nachricht;

    let voll = ServerMessage::push(ServerEvent::NewMessage(NewMessage {
        conversation_id: nachricht.conversation_id,
        author: AuthorInfo {
            id: nachricht.author.id,
            username: nachricht.author.username.clone(),
        },
        timestamp: nachricht.created_at,
        content: nachricht.content.clone(),
    }));
    let hinweis = ServerMessage::push(ServerEvent::NewNotification(NewNotification {
        conversation_id: nachricht.conversation_id,
    }));

    versand
        .empfaenger
        .iter()
        .map(|e| {
            let ereignis = match e.zustellung {
                Zustellung::Voll => voll.clone(),
                Zustellung::Benachrichtigung => hinweis.clone(),
            };
            state.router.publish(&e.user_id, ereignis)
        })
        .sum()
}
