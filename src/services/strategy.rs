use std::sync::Arc;
use std::time::Duration;
use serde::Serialize;
use tracing::info;

use crate::core::AppState;
use crate::errors::AppError;
use crate::model::ConversationLine;
use crate::services::OpenRouterClient;

const STRATEGY_SYSTEM_PROMPT: &str = "Ты — контент-стратег. Анализируешь сообщения из чатов и каналов, даёшь практичные рекомендации по контенту на русском языке.";

const STRATEGY_MESSAGE_LIMIT: i64 = 500;
const STRATEGY_MAX_TOKENS: u32 = 800;
const STRATEGY_TIMEOUT: Duration = Duration::from_secs(45);

#[derive(Debug, Serialize)]
pub struct StrategyResponse {
    pub success: bool,
    pub error: Option<String>,
    pub chat_type: Option<String>,
    pub period: Option<String>,
    pub date_range: Option<String>,
    pub messages_analyzed: usize,
    pub report: Option<String>,
}

impl StrategyResponse {
    fn failed(error: &str) -> Self {
        StrategyResponse {
            success: false,
            error: Some(error.to_string()),
            chat_type: None,
            period: None,
            date_range: None,
            messages_analyzed: 0,
            report: None,
        }
    }
}

pub struct StrategyService;

impl StrategyService {

    /// Content-strategy report over the last week or month of one chat.
    pub async fn generate_content_strategy(
        state: Arc<AppState>,
        client: &OpenRouterClient,
        chat_id: i64,
        period: &str,
    ) -> Result<StrategyResponse, AppError> {
        let days = match period {
            "week" => 7,
            "month" => 30,
            _ => {
                return Ok(StrategyResponse::failed(
                    "Неверный период. Используйте 'week' или 'month'",
                ));
            }
        };
        let period_ru = if period == "week" { "неделю" } else { "месяц" };

        let Some(chat) = state.chat_log.get_chat(chat_id).await? else {
            return Ok(StrategyResponse::failed("Чат не найден"));
        };

        // Newest first from the store; reversed below for the prompt.
        let messages = state
            .chat_log
            .conversation_for_period(chat_id, days, STRATEGY_MESSAGE_LIMIT)
            .await?;
        if messages.is_empty() {
            let error = if period == "week" {
                "Нет сообщений за последнюю неделю"
            } else {
                "Нет сообщений за последний месяц"
            };
            return Ok(StrategyResponse::failed(error));
        }

        let chat_type_ru = if chat.chat_type == "channel" { "канала" } else { "группы" };
        let chat_title = chat.title.unwrap_or_else(|| format!("Chat {chat_id}"));

        let date_from = messages[messages.len() - 1].sent_at;
        let date_to = messages[0].sent_at;
        let date_range = format!(
            "{} — {}",
            date_from.format("%d.%m.%Y"),
            date_to.format("%d.%m.%Y")
        );

        let chronological: Vec<ConversationLine> = messages.iter().rev().cloned().collect();
        let prompt = format!(
            "Проанализируй сообщения из {chat_type_ru} за {period_ru}.\n\n\
             Название: {chat_title}\n\
             Тип: {chat_type_ru}\n\
             Период: {date_range}\n\
             Сообщений проанализировано: {count}\n\n\
             Сообщения:\n{messages}\n\n\
             Дай отчёт на русском:\n\n\
             ## Что зашло\n\
             - Какие темы вызвали больше активности/реакций (2-3 пункта)\n\n\
             ## Рекомендации\n\
             - Что автору стоит делать больше/меньше (2-3 совета)\n\n\
             ## Идеи для постов\n\
             - 3 конкретные идеи на основе интересов аудитории\n\n\
             Максимум 300 слов.",
            chat_type_ru = chat_type_ru,
            period_ru = period_ru,
            chat_title = chat_title,
            date_range = date_range,
            count = messages.len(),
            messages = format_messages_for_strategy(&chronological),
        );

        info!(
            "Generating strategy for chat {chat_id}, period={period}, {} messages",
            messages.len()
        );
        let report = client
            .generate_completion(&prompt, STRATEGY_SYSTEM_PROMPT, STRATEGY_MAX_TOKENS, STRATEGY_TIMEOUT)
            .await;

        Ok(match report {
            Some(report) => StrategyResponse {
                success: true,
                error: None,
                chat_type: Some(chat.chat_type),
                period: Some(period.to_string()),
                date_range: Some(date_range),
                messages_analyzed: messages.len(),
                report: Some(report),
            },
            None => StrategyResponse {
                success: false,
                error: Some("Не удалось сгенерировать отчёт. Попробуйте позже.".to_string()),
                chat_type: Some(chat.chat_type),
                period: Some(period.to_string()),
                date_range: Some(date_range),
                messages_analyzed: messages.len(),
                report: None,
            },
        })
    }
}

/// Like the summary formatting, with the media kind prefixed for non-text
/// messages.
fn format_messages_for_strategy(messages: &[ConversationLine]) -> String {
    messages
        .iter()
        .map(|message| {
            let time = message.sent_at.format("%d.%m %H:%M");
            let text: String = message.text.chars().take(300).collect();
            if message.message_type == "text" {
                format!("[{}] @{}: {}", time, message.author, text)
            } else {
                format!("[{}] @{}: [{}] {}", time, message.author, message.message_type, text)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn media_messages_are_tagged_with_their_kind() {
        let messages = vec![
            ConversationLine {
                text: "caption".to_string(),
                author: "alice".to_string(),
                sent_at: Utc.with_ymd_and_hms(2025, 6, 2, 12, 30, 0).unwrap(),
                message_type: "photo".to_string(),
            },
            ConversationLine {
                text: "plain".to_string(),
                author: "bob".to_string(),
                sent_at: Utc.with_ymd_and_hms(2025, 6, 2, 12, 31, 0).unwrap(),
                message_type: "text".to_string(),
            },
        ];
        let formatted = format_messages_for_strategy(&messages);
        assert_eq!(
            formatted,
            "[02.06 12:30] @alice: [photo] caption\n[02.06 12:31] @bob: plain"
        );
    }
}
