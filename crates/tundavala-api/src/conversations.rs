use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use tundavala_types::api::{Claims, CreateConversationRequest, SendMessageRequest};
use tundavala_types::events::GatewayEvent;
use tundavala_types::models::{Conversation, Message, Role};

use crate::auth::AppState;
use crate::blocking;
use crate::error::ApiError;
use crate::middleware::require_role;

const MAX_MESSAGE_LEN: usize = 2000;

#[derive(Debug, Deserialize)]
pub struct MessageQuery {
    #[serde(default = "default_limit")]
    pub limit: u32,
    /// Cursor-based pagination — pass the timestamp of the oldest message
    /// from the previous page to fetch older history.
    pub before: Option<chrono::DateTime<chrono::Utc>>,
}

fn default_limit() -> u32 {
    50
}

/// First contact: reuse the existing (tourist, guide) conversation when there
/// is one, otherwise create it with an empty last message and a zero counter.
pub async fn create_conversation(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateConversationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    // Conversations are tourist-initiated; guides reply within existing ones
    require_role(&claims, Role::Tourist)?;

    let guide_id = req.guide_id;
    let app = state.clone();
    if let Some(existing) =
        blocking(move || app.db.find_conversation_between(claims.sub, guide_id)).await?
    {
        return Ok((StatusCode::OK, Json(existing)));
    }

    let app = state.clone();
    let (guide, me) = blocking(move || {
        Ok((app.db.get_guide(guide_id)?, app.db.get_user_by_id(claims.sub)?))
    })
    .await?;
    let guide = guide.ok_or(ApiError::NotFound("guide not found"))?;
    let me = me.ok_or(ApiError::Unauthorized)?;

    let conversation = Conversation {
        id: Uuid::new_v4(),
        tourist_id: me.id,
        tourist_name: me.name,
        tourist_photo_url: me.photo_url,
        guide_id: guide.id,
        guide_name: guide.name,
        guide_photo_url: guide.photo_url,
        last_message: String::new(),
        last_message_at: None,
        unread_count: 0,
        created_at: Utc::now(),
    };
    let app = state.clone();
    let stored = conversation.clone();
    blocking(move || app.db.create_conversation(&stored)).await?;

    Ok((StatusCode::CREATED, Json(conversation)))
}

pub async fn list_conversations(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let app = state.clone();
    let conversations =
        blocking(move || app.db.list_conversations_for_user(claims.sub)).await?;
    Ok(Json(conversations))
}

pub async fn get_messages(
    State(state): State<AppState>,
    Path(conversation_id): Path<Uuid>,
    Query(query): Query<MessageQuery>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let app = state.clone();
    let conversation = blocking(move || app.db.get_conversation(conversation_id))
        .await?
        .ok_or(ApiError::NotFound("conversation not found"))?;
    if !conversation.has_participant(claims.sub) {
        return Err(ApiError::Forbidden);
    }

    let app = state.clone();
    let limit = query.limit.min(200);
    let before = query.before;
    let messages =
        blocking(move || app.db.get_messages(conversation_id, limit, before)).await?;

    Ok(Json(messages))
}

/// Store the message and bump the conversation's inbox state in one commit,
/// then fan the update out: the message to conversation subscribers, the
/// refreshed inbox entry to both participants.
pub async fn send_message(
    State(state): State<AppState>,
    Path(conversation_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let content = req.content.trim().to_string();
    if content.is_empty() {
        return Err(ApiError::Validation("message is empty".to_string()));
    }
    if content.len() > MAX_MESSAGE_LEN {
        return Err(ApiError::Validation("message is too long".to_string()));
    }

    let app = state.clone();
    let conversation = blocking(move || app.db.get_conversation(conversation_id))
        .await?
        .ok_or(ApiError::NotFound("conversation not found"))?;
    if !conversation.has_participant(claims.sub) {
        return Err(ApiError::Forbidden);
    }
    let receiver_id = if claims.sub == conversation.tourist_id {
        conversation.guide_id
    } else {
        conversation.tourist_id
    };

    let app = state.clone();
    let sender_photo_url = blocking(move || app.db.get_user_by_id(claims.sub))
        .await?
        .and_then(|u| u.photo_url);

    let message = Message {
        id: Uuid::new_v4(),
        conversation_id,
        sender_id: claims.sub,
        sender_name: claims.name.clone(),
        sender_photo_url,
        receiver_id,
        content,
        is_read: false,
        created_at: Utc::now(),
    };

    let app = state.clone();
    let stored = message.clone();
    let updated = blocking(move || app.db.send_message(&stored)).await?;

    state.dispatcher.broadcast(GatewayEvent::MessageCreate {
        id: message.id,
        conversation_id,
        sender_id: message.sender_id,
        sender_name: message.sender_name.clone(),
        receiver_id,
        content: message.content.clone(),
        timestamp: message.created_at,
    });
    for participant in [updated.tourist_id, updated.guide_id] {
        state
            .dispatcher
            .send_to_user(
                participant,
                GatewayEvent::ConversationUpdate {
                    conversation: updated.clone(),
                },
            )
            .await;
    }

    Ok((StatusCode::CREATED, Json(message)))
}

/// Reader catches up: flip everything addressed to them and zero the counter.
pub async fn mark_read(
    State(state): State<AppState>,
    Path(conversation_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let app = state.clone();
    let (_, updated) =
        blocking(move || app.db.mark_messages_read(conversation_id, claims.sub)).await?;

    state
        .dispatcher
        .send_to_user(
            claims.sub,
            GatewayEvent::ConversationUpdate {
                conversation: updated.clone(),
            },
        )
        .await;

    Ok(Json(updated))
}
