use std::sync::Arc;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::core::AppState;
use crate::database::JoinRequestRepository;
use crate::errors::AppError;
use crate::model::{
    ChatMessageDTO, ChatStatsRow, GlobalStats, JoinRequestDetails, UserListRow,
};
use crate::services::{
    AnalyticsResponse, AnalyticsService, StrategyResponse, StrategyService, SummaryResponse,
    SummaryService,
};

const JOIN_REQUEST_STATUSES: &[&str] = &["pending", "declined", "expired"];

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    database: &'static str,
    timestamp: String,
}

pub async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<HealthResponse>) {
    match state.stats.health_probe().await {
        Ok(()) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "healthy",
                database: "connected",
                timestamp: Utc::now().to_rfc3339(),
            }),
        ),
        Err(err) => {
            error!("Health check failed: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(HealthResponse {
                    status: "unhealthy",
                    database: "disconnected",
                    timestamp: Utc::now().to_rfc3339(),
                }),
            )
        }
    }
}

pub async fn get_stats(State(state): State<Arc<AppState>>) -> Result<Json<GlobalStats>, AppError> {
    let stats = state.stats.global_stats().await?;
    Ok(Json(stats))
}

pub async fn get_chats(State(state): State<Arc<AppState>>) -> Result<Json<Vec<ChatStatsRow>>, AppError> {
    let chats = state.stats.chats_with_stats().await?;
    Ok(Json(chats))
}

#[derive(Deserialize)]
pub struct MessagesQueryParams {
    #[serde(default = "default_list_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
    #[serde(rename = "type")]
    pub message_type: Option<String>,
}

fn default_list_limit() -> i64 {
    100
}

pub async fn get_chat_messages(
    State(state): State<Arc<AppState>>,
    Path(chat_id): Path<i64>,
    Query(params): Query<MessagesQueryParams>,
) -> Result<Json<Vec<ChatMessageDTO>>, AppError> {
    let messages = state
        .chat_log
        .list_messages(chat_id, params.message_type.as_deref(), params.limit, params.offset)
        .await?;
    Ok(Json(messages.into_iter().map(ChatMessageDTO::from).collect()))
}

#[derive(Deserialize)]
pub struct DailyQueryParams {
    pub date: Option<String>,
}

#[derive(Serialize)]
pub struct DailyMessagesResponse {
    pub chat_id: i64,
    pub date: String,
    pub timezone: String,
    pub count: usize,
    pub messages: Vec<ChatMessageDTO>,
}

pub async fn get_chat_messages_daily(
    State(state): State<Arc<AppState>>,
    Path(chat_id): Path<i64>,
    Query(params): Query<DailyQueryParams>,
) -> Result<Json<DailyMessagesResponse>, AppError> {
    let Some(date) = params.date else {
        return Err(AppError::ValidationError(
            "date parameter required (YYYY-MM-DD)".to_string(),
        ));
    };
    if chrono::NaiveDate::parse_from_str(&date, "%Y-%m-%d").is_err() {
        return Err(AppError::ValidationError("invalid date format".to_string()));
    }

    let timezone = state.env.display_timezone.clone();
    let messages = state
        .chat_log
        .list_messages_for_day(chat_id, &date, &timezone)
        .await?;
    let messages: Vec<ChatMessageDTO> = messages.into_iter().map(ChatMessageDTO::from).collect();

    Ok(Json(DailyMessagesResponse {
        chat_id,
        date,
        timezone,
        count: messages.len(),
        messages,
    }))
}

#[derive(Serialize)]
pub struct DashboardLastMessage {
    pub text: String,
    pub author: Option<String>,
    pub sent_at: Option<chrono::DateTime<Utc>>,
}

#[derive(Serialize)]
pub struct DashboardChatDTO {
    pub id: i64,
    pub title: String,
    pub total_messages: i64,
    pub today_messages: i64,
    pub last_message: Option<DashboardLastMessage>,
    pub top_users_week: serde_json::Value,
}

#[derive(Serialize)]
pub struct DashboardResponse {
    pub chats: Vec<DashboardChatDTO>,
    pub has_openrouter: bool,
}

pub async fn get_dashboard(State(state): State<Arc<AppState>>) -> Result<Json<DashboardResponse>, AppError> {
    let rows = state.stats.dashboard_data().await?;

    let chats = rows
        .into_iter()
        .map(|row| {
            let last_message = row.last_message_text.map(|text| DashboardLastMessage {
                text: text.chars().take(100).collect(),
                author: row.last_message_author,
                sent_at: row.last_message_at,
            });
            DashboardChatDTO {
                id: row.id,
                title: row.title.unwrap_or_else(|| format!("Chat {}", row.id)),
                total_messages: row.total_messages,
                today_messages: row.today_messages,
                last_message,
                top_users_week: row.top_users,
            }
        })
        .collect();

    Ok(Json(DashboardResponse {
        chats,
        has_openrouter: state.env.has_openrouter(),
    }))
}

#[derive(Deserialize)]
pub struct PageQueryParams {
    #[serde(default = "default_list_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

pub async fn get_users(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PageQueryParams>,
) -> Result<Json<Vec<UserListRow>>, AppError> {
    let users = state.chat_log.list_users(params.limit, params.offset).await?;
    Ok(Json(users))
}

pub async fn generate_chat_summary(
    State(state): State<Arc<AppState>>,
    Path(chat_id): Path<i64>,
) -> Result<(StatusCode, Json<SummaryResponse>), AppError> {
    let Some(client) = state.summarizer.clone() else {
        return Err(AppError::Unavailable("OpenRouter API is not configured".to_string()));
    };

    let result = SummaryService::generate_chat_summary(state, &client, chat_id).await?;
    let status = if result.success { StatusCode::OK } else { StatusCode::BAD_REQUEST };
    Ok((status, Json(result)))
}

#[derive(Deserialize)]
pub struct StrategyQueryParams {
    pub period: Option<String>,
}

pub async fn generate_chat_strategy(
    State(state): State<Arc<AppState>>,
    Path(chat_id): Path<i64>,
    Query(params): Query<StrategyQueryParams>,
) -> Result<(StatusCode, Json<StrategyResponse>), AppError> {
    let Some(client) = state.summarizer.clone() else {
        return Err(AppError::Unavailable("OpenRouter API is not configured".to_string()));
    };

    let period = params.period.unwrap_or_else(|| "week".to_string());
    let result = StrategyService::generate_content_strategy(state, &client, chat_id, &period).await?;
    let status = if result.success { StatusCode::OK } else { StatusCode::BAD_REQUEST };
    Ok((status, Json(result)))
}

pub async fn get_chat_analytics(
    State(state): State<Arc<AppState>>,
    Path(chat_id): Path<i64>,
) -> Result<(StatusCode, Json<AnalyticsResponse>), AppError> {
    let client = state.summarizer.clone();
    let result = AnalyticsService::generate_chat_analytics(state, client.as_ref(), chat_id).await?;
    let status = if result.success { StatusCode::OK } else { StatusCode::BAD_REQUEST };
    Ok((status, Json(result)))
}

#[derive(Deserialize)]
pub struct JoinRequestQueryParams {
    pub status: Option<String>,
    #[serde(default = "default_list_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

pub async fn get_join_requests(
    State(state): State<Arc<AppState>>,
    Path(chat_id): Path<i64>,
    Query(params): Query<JoinRequestQueryParams>,
) -> Result<Json<Vec<JoinRequestDetails>>, AppError> {
    if let Some(status) = params.status.as_deref() {
        if !JOIN_REQUEST_STATUSES.contains(&status) {
            return Err(AppError::ValidationError(format!("unknown status '{status}'")));
        }
    }

    let requests = state
        .join_requests
        .list_for_chat(chat_id, params.status.as_deref(), params.limit, params.offset)
        .await?;
    Ok(Json(requests))
}

#[derive(Serialize)]
pub struct CleanOutcome {
    pub declined: usize,
    pub processed: usize,
}

/// Manual trigger for one cleanup pass; shares the pass guard with the
/// scheduled runs, so a colliding trigger reports (0, 0).
pub async fn trigger_join_request_cleanup(
    State(state): State<Arc<AppState>>,
) -> Result<Json<CleanOutcome>, AppError> {
    let Some(cleaner) = state.cleaner.clone() else {
        return Err(AppError::Unavailable(
            "Join request moderation is not configured".to_string(),
        ));
    };

    let report = cleaner.clean_pending_requests().await?;
    Ok(Json(CleanOutcome {
        declined: report.declined,
        processed: report.processed,
    }))
}
