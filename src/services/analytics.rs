use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use chrono::{Duration as ChronoDuration, NaiveDate, Utc};
use serde::Serialize;
use tracing::info;

use crate::core::AppState;
use crate::errors::AppError;
use crate::model::DailyCount;
use crate::services::OpenRouterClient;

const ANALYTICS_SYSTEM_PROMPT: &str = "Ты — аналитик активности чата. Даёшь краткие, фактические комментарии по статистике сообщений.";

const ANALYTICS_DAYS: i64 = 7;
const ANALYTICS_MAX_TOKENS: u32 = 150;
const ANALYTICS_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Serialize)]
pub struct AnalyticsResponse {
    pub success: bool,
    pub error: Option<String>,
    pub chat_type: Option<String>,
    pub period: Option<String>,
    pub daily_messages: Vec<DailyCount>,
    pub total: i64,
    pub average: f64,
    pub ai_comment: Option<String>,
}

impl AnalyticsResponse {
    fn failed(error: &str) -> Self {
        AnalyticsResponse {
            success: false,
            error: Some(error.to_string()),
            chat_type: None,
            period: None,
            daily_messages: Vec::new(),
            total: 0,
            average: 0.0,
            ai_comment: None,
        }
    }
}

pub struct AnalyticsService;

impl AnalyticsService {

    /// Last week's message counts per day, with an optional AI remark when a
    /// completion client is configured and there is anything to remark on.
    pub async fn generate_chat_analytics(
        state: Arc<AppState>,
        client: Option<&OpenRouterClient>,
        chat_id: i64,
    ) -> Result<AnalyticsResponse, AppError> {
        let Some(chat) = state.chat_log.get_chat(chat_id).await? else {
            return Ok(AnalyticsResponse::failed("Чат не найден"));
        };

        let counts = state
            .chat_log
            .daily_message_counts(chat_id, ANALYTICS_DAYS as i32, &state.env.display_timezone)
            .await?;
        let daily_messages = fill_missing_days(&counts, ANALYTICS_DAYS);

        let total: i64 = daily_messages.iter().map(|day| day.count).sum();
        let average = total as f64 / ANALYTICS_DAYS as f64;
        let period = format!(
            "{} — {}",
            daily_messages[0].date,
            daily_messages[daily_messages.len() - 1].date
        );

        if total == 0 {
            return Ok(AnalyticsResponse {
                success: true,
                error: None,
                chat_type: Some(chat.chat_type),
                period: Some(period),
                daily_messages,
                total,
                average,
                ai_comment: None,
            });
        }

        let ai_comment = match client {
            Some(client) => {
                let daily_data = daily_messages
                    .iter()
                    .map(|day| format!("{}: {}", day.date, day.count))
                    .collect::<Vec<_>>()
                    .join(", ");
                let chat_type_ru = if chat.chat_type == "channel" { "канал" } else { "группа" };
                let prompt = format!(
                    "Дай краткий комментарий (2-3 предложения) по статистике сообщений за неделю.\n\n\
                     Тип чата: {chat_type_ru}\n\
                     Период: {period}\n\
                     Данные по дням: {daily_data}\n\
                     Всего сообщений: {total}\n\
                     Среднее в день: {average:.1}\n\n\
                     Укажи:\n\
                     - Где пики и спады активности\n\
                     - Возможные причины (день недели, выходные и т.д.)\n\n\
                     Будь лаконичен, максимум 50 слов.",
                );
                info!("Generating analytics for chat {chat_id}");
                client
                    .generate_completion(&prompt, ANALYTICS_SYSTEM_PROMPT, ANALYTICS_MAX_TOKENS, ANALYTICS_TIMEOUT)
                    .await
            }
            None => None,
        };

        let error = if ai_comment.is_none() {
            Some("Не удалось получить AI-комментарий".to_string())
        } else {
            None
        };

        Ok(AnalyticsResponse {
            success: true,
            error,
            chat_type: Some(chat.chat_type),
            period: Some(period),
            daily_messages,
            total,
            average,
            ai_comment,
        })
    }
}

/// Zero-fills days the count query skipped, anchored on today so the chart
/// always spans the full window.
fn fill_missing_days(counts: &[DailyCount], days: i64) -> Vec<DailyCount> {
    let existing: HashMap<NaiveDate, i64> = counts.iter().map(|day| (day.date, day.count)).collect();
    let today = Utc::now().date_naive();
    let start = today - ChronoDuration::days(days - 1);

    (0..days)
        .map(|offset| {
            let date = start + ChronoDuration::days(offset);
            DailyCount {
                date,
                count: existing.get(&date).copied().unwrap_or(0),
            }
        })
        .collect()
}
