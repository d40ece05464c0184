use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::FromRow;

/// Service-wide counters for the admin overview.
#[derive(Debug, Clone, Serialize)]
pub struct GlobalStats {
    pub total_chats: i64,
    pub total_users: i64,
    pub total_messages: i64,
    pub messages_today: i64,
    pub messages_by_type: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ChatStatsRow {
    pub id: i64,
    #[serde(rename = "type")]
    pub chat_type: String,
    pub title: Option<String>,
    pub username: Option<String>,
    pub message_count: i64,
    pub user_count: i64,
    pub last_message_at: Option<DateTime<Utc>>,
}

/// Aggregate row behind the dashboard endpoint. `top_users` is the
/// database-side `json_agg` of the week's most active posters.
#[derive(Debug, Clone, FromRow)]
pub struct DashboardChatRow {
    pub id: i64,
    pub title: Option<String>,
    pub total_messages: i64,
    pub today_messages: i64,
    pub last_message_text: Option<String>,
    pub last_message_author: Option<String>,
    pub last_message_at: Option<DateTime<Utc>>,
    pub top_users: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub count: i64,
}
