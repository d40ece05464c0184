use std::sync::Arc;
use chrono::{DateTime, Utc};
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use teloxide::types::{Chat, ChatJoinRequest, MessageKind, MessageOrigin, User};
use tracing::{error, info, warn};

use crate::core::AppState;
use crate::database::JoinRequestRepository;
use crate::model::{ChatRecord, MessageEdit, NewChatMessage, NewJoinRequest, UserRecord};
use crate::moderation::is_fresh_account_id;

/// Update routing tree: join requests, edits, then new group messages.
/// Everything else falls through to the dispatcher's default handler.
pub fn schema() -> UpdateHandler<teloxide::RequestError> {
    dptree::entry()
        .branch(Update::filter_chat_join_request().endpoint(on_chat_join_request))
        .branch(
            Update::filter_edited_message()
                .filter(|msg: Message| is_group_chat(&msg.chat) && msg.from.is_some())
                .endpoint(on_edited_message),
        )
        .branch(
            Update::filter_message()
                .filter(|msg: Message| is_group_chat(&msg.chat) && msg.from.is_some())
                .endpoint(on_new_message),
        )
}

async fn on_new_message(msg: Message, state: Arc<AppState>) -> Result<(), teloxide::RequestError> {
    match capture_message(&msg, &state, false).await {
        Ok(()) => info!(
            "Saved message {} from {} in chat {} ({})",
            msg.id.0,
            msg.from.as_ref().map(|user| user.id.0).unwrap_or_default(),
            msg.chat.id.0,
            msg.chat.title().unwrap_or("No title"),
        ),
        Err(err) => error!("Failed to save message {}: {err}", msg.id.0),
    }
    Ok(())
}

async fn on_edited_message(msg: Message, state: Arc<AppState>) -> Result<(), teloxide::RequestError> {
    match capture_message(&msg, &state, true).await {
        Ok(()) => info!("Updated edited message {} in chat {}", msg.id.0, msg.chat.id.0),
        Err(err) => error!("Failed to update message {}: {err}", msg.id.0),
    }
    Ok(())
}

/// Stores join requests for the moderated chat so the cleanup pass can work
/// through them later.
async fn on_chat_join_request(
    request: ChatJoinRequest,
    state: Arc<AppState>,
) -> Result<(), teloxide::RequestError> {
    let Some(moderated_chat_id) = state.env.moderated_chat_id else {
        warn!("MODERATED_CHAT_ID is not set; ignoring join request");
        return Ok(());
    };
    if request.chat.id.0 != moderated_chat_id {
        return Ok(());
    }

    if let Err(err) = store_join_request(&request, &state).await {
        error!(
            "Failed to save join request: chat_id={} user_id={} err={err}",
            request.chat.id.0, request.from.id.0
        );
    }
    Ok(())
}

async fn store_join_request(request: &ChatJoinRequest, state: &Arc<AppState>) -> Result<(), sqlx::Error> {
    let user = &request.from;
    let user_id = user.id.0.cast_signed();

    // Upsert the referenced rows first so the FK constraints hold.
    state.chat_log.save_user(&user_record(user)).await?;
    state.chat_log.save_chat(&chat_record(&request.chat)).await?;

    let id = state
        .join_requests
        .upsert_pending(&NewJoinRequest {
            user_id,
            chat_id: request.chat.id.0,
            username: user.username.clone(),
            first_name: Some(user.first_name.clone()),
            bio: request.bio.clone(),
            request_date: request.date,
        })
        .await?;

    info!(
        "Saved join request {id}: chat_id={} user_id={user_id} fresh={}",
        request.chat.id.0,
        is_fresh_account_id(user_id, state.env.fresh_account_id_threshold),
    );
    Ok(())
}

async fn capture_message(msg: &Message, state: &Arc<AppState>, is_edit: bool) -> Result<(), sqlx::Error> {
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };

    state.chat_log.save_user(&user_record(user)).await?;
    state.chat_log.save_chat(&chat_record(&msg.chat)).await?;

    let raw_message = serde_json::to_value(msg).unwrap_or_default();

    if is_edit {
        state
            .chat_log
            .apply_edit(&MessageEdit {
                chat_id: msg.chat.id.0,
                message_id: i64::from(msg.id.0),
                text: msg.text().map(ToString::to_string),
                caption: msg.caption().map(ToString::to_string),
                edited_at: edit_timestamp(msg),
                raw_message,
            })
            .await
    } else {
        state
            .chat_log
            .insert_message(&NewChatMessage {
                message_id: i64::from(msg.id.0),
                chat_id: msg.chat.id.0,
                user_id: user.id.0.cast_signed(),
                message_type: detect_message_type(msg).to_string(),
                text: msg.text().map(ToString::to_string),
                caption: msg.caption().map(ToString::to_string),
                reply_to_message_id: msg.reply_to_message().map(|reply| i64::from(reply.id.0)),
                forward_from_chat_id: forward_source_chat_id(msg),
                sent_at: msg.date,
                raw_message,
            })
            .await
    }
}

fn user_record(user: &User) -> UserRecord {
    UserRecord {
        id: user.id.0.cast_signed(),
        is_bot: user.is_bot,
        first_name: Some(user.first_name.clone()),
        last_name: user.last_name.clone(),
        username: user.username.clone(),
        language_code: user.language_code.clone(),
        is_premium: user.is_premium,
    }
}

fn chat_record(chat: &Chat) -> ChatRecord {
    ChatRecord {
        id: chat.id.0,
        chat_type: chat_type_name(chat).to_string(),
        title: chat.title().map(ToString::to_string),
        username: chat.username().map(ToString::to_string),
    }
}

fn is_group_chat(chat: &Chat) -> bool {
    chat.is_group() || chat.is_supergroup()
}

fn chat_type_name(chat: &Chat) -> &'static str {
    if chat.is_group() {
        "group"
    } else if chat.is_supergroup() {
        "supergroup"
    } else if chat.is_channel() {
        "channel"
    } else if chat.is_private() {
        "private"
    } else {
        "other"
    }
}

fn detect_message_type(msg: &Message) -> &'static str {
    if msg.text().is_some() {
        "text"
    } else if msg.photo().is_some() {
        "photo"
    } else if msg.video().is_some() {
        "video"
    } else if msg.audio().is_some() {
        "audio"
    } else if msg.voice().is_some() {
        "voice"
    } else if msg.video_note().is_some() {
        "video_note"
    } else if msg.document().is_some() {
        "document"
    } else if msg.sticker().is_some() {
        "sticker"
    } else if msg.animation().is_some() {
        "animation"
    } else if msg.poll().is_some() {
        "poll"
    } else if msg.location().is_some() {
        "location"
    } else if msg.contact().is_some() {
        "contact"
    } else if msg.dice().is_some() {
        "dice"
    } else {
        "other"
    }
}

fn edit_timestamp(msg: &Message) -> Option<DateTime<Utc>> {
    match &msg.kind {
        MessageKind::Common(common) => common.edit_date,
        _ => None,
    }
}

/// Source chat for messages forwarded on behalf of a chat or out of a
/// channel; user-origin forwards carry no chat id.
fn forward_source_chat_id(msg: &Message) -> Option<i64> {
    let origin = match &msg.kind {
        MessageKind::Common(common) => common.forward_origin.as_ref()?,
        _ => return None,
    };
    match origin {
        MessageOrigin::Chat { sender_chat, .. } => Some(sender_chat.id.0),
        MessageOrigin::Channel { chat, .. } => Some(chat.id.0),
        _ => None,
    }
}
