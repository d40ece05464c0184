use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

/// Sender of a captured message, upserted on every sighting.
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub id: i64,
    pub is_bot: bool,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub language_code: Option<String>,
    pub is_premium: bool,
}

/// Chat a message or join request originated from.
#[derive(Debug, Clone)]
pub struct ChatRecord {
    pub id: i64,
    pub chat_type: String,
    pub title: Option<String>,
    pub username: Option<String>,
}

/// A freshly captured group message, ready for insertion.
#[derive(Debug, Clone)]
pub struct NewChatMessage {
    pub message_id: i64,
    pub chat_id: i64,
    pub user_id: i64,
    pub message_type: String,
    pub text: Option<String>,
    pub caption: Option<String>,
    pub reply_to_message_id: Option<i64>,
    pub forward_from_chat_id: Option<i64>,
    pub sent_at: DateTime<Utc>,
    pub raw_message: serde_json::Value,
}

/// An edit to an already captured message.
#[derive(Debug, Clone)]
pub struct MessageEdit {
    pub chat_id: i64,
    pub message_id: i64,
    pub text: Option<String>,
    pub caption: Option<String>,
    pub edited_at: Option<DateTime<Utc>>,
    pub raw_message: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ChatRow {
    pub id: i64,
    #[serde(rename = "type")]
    pub chat_type: String,
    pub title: Option<String>,
    pub username: Option<String>,
    pub first_seen_at: DateTime<Utc>,
    pub last_updated_at: DateTime<Utc>,
}

/// Flat row for message listings; joined author columns are aliased.
#[derive(Debug, Clone, FromRow)]
pub struct ChatMessageRecord {
    pub message_id: i64,
    pub message_type: String,
    pub text: Option<String>,
    pub caption: Option<String>,
    pub sent_at: DateTime<Utc>,
    pub edited_at: Option<DateTime<Utc>>,
    pub reply_to_message_id: Option<i64>,
    pub user_id: Option<i64>,
    pub user_first_name: Option<String>,
    pub user_last_name: Option<String>,
    pub user_username: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageAuthorDTO {
    pub id: i64,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,
}

/// Wire shape of a listed message: the author is nested, absent when the
/// sender row was deleted.
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessageDTO {
    pub message_id: i64,
    pub message_type: String,
    pub text: Option<String>,
    pub caption: Option<String>,
    pub sent_at: DateTime<Utc>,
    pub edited_at: Option<DateTime<Utc>>,
    pub reply_to_message_id: Option<i64>,
    pub user: Option<MessageAuthorDTO>,
}

impl From<ChatMessageRecord> for ChatMessageDTO {
    fn from(record: ChatMessageRecord) -> Self {
        let user = record.user_id.map(|id| MessageAuthorDTO {
            id,
            first_name: record.user_first_name,
            last_name: record.user_last_name,
            username: record.user_username,
        });
        ChatMessageDTO {
            message_id: record.message_id,
            message_type: record.message_type,
            text: record.text,
            caption: record.caption,
            sent_at: record.sent_at,
            edited_at: record.edited_at,
            reply_to_message_id: record.reply_to_message_id,
            user,
        }
    }
}

/// One message line fed into the AI prompt builders.
#[derive(Debug, Clone, FromRow)]
pub struct ConversationLine {
    pub text: String,
    pub author: String,
    pub sent_at: DateTime<Utc>,
    pub message_type: String,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct UserListRow {
    pub id: i64,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub is_bot: bool,
    pub is_premium: bool,
    pub language_code: Option<String>,
    pub first_seen_at: DateTime<Utc>,
    pub message_count: i64,
}
