//! Beziehungs-Handler – Einladungen, Antworten, Gruppen

use parley_chat::Einladung;
use parley_core::types::{ConversationId, UserId};
use parley_db::ParleyRepository;
use parley_protocol::control::{
    CreateGroupNotify, CreateGroupRequest, FriendRequestNotify, FriendResponseNotify,
    FriendResponseRequest, InviteFriendRequest, NewConversation,
};
use parley_protocol::{ServerEvent, ServerMessage};
use std::sync::Arc;

use crate::error::{SignalingError, SignalingResult};
use crate::server_state::SignalingState;

/// Verarbeitet `invite_friend`
///
/// Bereits befreundet: nichts wird gesendet.
pub async fn handle_invite<R: ParleyRepository>(
    request: InviteFriendRequest,
    user_id: UserId,
    state: &Arc<SignalingState<R>>,
) -> SignalingResult<()> {
    let Some(einladung) = state
        .beziehungen
        .einladen(user_id, request.friend_id)
        .await?
    else {
        return Ok(());
    };

    state
        .router
        .publish(&einladung.ziel, einladung_ereignis(&einladung));
    Ok(())
}

/// Verarbeitet `response_friend_req`
pub async fn handle_response<R: ParleyRepository>(
    request: FriendResponseRequest,
    user_id: UserId,
    state: &Arc<SignalingState<R>>,
) -> SignalingResult<()> {
    let antwort = state
        .beziehungen
        .antworten(user_id, request.id, request.response)
        .await?;

    // Der Admin (= Antwortende) erfaehrt zuerst von der neuen Konversation
    if let Some(konversation) = &antwort.konversation {
        state.router.publish(
            &konversation.admin_id,
            neue_konversation_ereignis(konversation.id),
        );
    }

    state.router.publish(
        &antwort.absender_id,
        ServerMessage::push(ServerEvent::ResponseFRequest(FriendResponseNotify {
            sender: antwort.antwortender.username.clone(),
            response: antwort.angenommen,
            conversation_id: antwort.konversation.as_ref().map(|k| k.id),
        })),
    );
    Ok(())
}

/// Verarbeitet `create_group`
///
/// Nur fuer sich selbst: `admin_id` muss der Absender sein.
pub async fn handle_create_group<R: ParleyRepository>(
    request: CreateGroupRequest,
    user_id: UserId,
    state: &Arc<SignalingState<R>>,
) -> SignalingResult<()> {
    if request.admin_id != user_id {
        return Err(SignalingError::ZugriffVerweigert(
            "Gruppen koennen nur mit sich selbst als Admin erstellt werden".into(),
        ));
    }

    let gruppe = state
        .beziehungen
        .gruppe_erstellen(&request.title, request.admin_id, &request.users_ids)
        .await?;
    let conversation_id = gruppe.konversation.id;

    state
        .router
        .publish(&gruppe.admin.id, neue_konversation_ereignis(conversation_id));

    let hinweis = ServerMessage::push(ServerEvent::CreateGroupNotify(CreateGroupNotify {
        title: gruppe.konversation.title.clone(),
        admin: gruppe.admin.username.clone(),
        conversation_id,
    }));
    for mitglied in &gruppe.hinzugefuegt {
        state.router.publish(mitglied, hinweis.clone());
    }

    Ok(())
}

/// Offene Einladungen als `friend_request`-Ereignisse fuer eine neue Verbindung
pub async fn offene_einladungen<R: ParleyRepository>(
    user_id: UserId,
    state: &Arc<SignalingState<R>>,
) -> SignalingResult<Vec<ServerMessage>> {
    let einladungen = state.beziehungen.offene_einladungen(user_id).await?;
    Ok(einladungen.iter().map(einladung_ereignis).collect())
}

fn einladung_ereignis(einladung: &Einladung) -> ServerMessage {
    ServerMessage::push(ServerEvent::FriendRequest(FriendRequestNotify {
        sender: einladung.absender.username.clone(),
        request_id: einladung.anfrage_id,
        timestamp: einladung.zeitpunkt,
    }))
}

fn neue_konversation_ereignis(conversation_id: ConversationId) -> ServerMessage {
    ServerMessage::push(ServerEvent::NewConversation(NewConversation { conversation_id }))
}
