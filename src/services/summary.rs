use std::sync::Arc;
use std::time::Duration;
use serde::Serialize;
use tracing::info;

use crate::core::AppState;
use crate::errors::AppError;
use crate::model::ConversationLine;
use crate::services::OpenRouterClient;

const SUMMARY_SYSTEM_PROMPT: &str = "Ты — аналитик чатов. Анализируй сообщения из групповых чатов и создавай краткие, информативные саммари на русском языке.";

const SUMMARY_MESSAGE_LIMIT: i64 = 500;
const SUMMARY_MAX_TOKENS: u32 = 500;
const SUMMARY_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub success: bool,
    pub error: Option<String>,
    pub summary: Option<String>,
    pub messages_count: usize,
    pub period: Option<String>,
}

impl SummaryResponse {
    fn failed(error: &str) -> Self {
        SummaryResponse {
            success: false,
            error: Some(error.to_string()),
            summary: None,
            messages_count: 0,
            period: None,
        }
    }
}

pub struct SummaryService;

impl SummaryService {

    /// Summary of the last 24 hours of one chat. Missing chats, empty
    /// windows and generation failures are reported in-band via
    /// `success: false`.
    pub async fn generate_chat_summary(
        state: Arc<AppState>,
        client: &OpenRouterClient,
        chat_id: i64,
    ) -> Result<SummaryResponse, AppError> {
        let Some(chat) = state.chat_log.get_chat(chat_id).await? else {
            return Ok(SummaryResponse::failed("Чат не найден"));
        };

        let messages = state
            .chat_log
            .recent_conversation(chat_id, SUMMARY_MESSAGE_LIMIT)
            .await?;
        if messages.is_empty() {
            return Ok(SummaryResponse::failed("Нет сообщений за последние 24 часа"));
        }

        let date_from = messages[0].sent_at;
        let date_to = messages[messages.len() - 1].sent_at;
        let period = format!(
            "{} — {}",
            date_from.format("%d.%m.%Y %H:%M"),
            date_to.format("%d.%m.%Y %H:%M")
        );

        let chat_title = chat.title.unwrap_or_else(|| format!("Chat {chat_id}"));
        let prompt = format!(
            "Проанализируй сообщения из группового чата за последние сутки.\n\n\
             Чат: {chat_title}\n\
             Период: {date_from} — {date_to}\n\
             Сообщений: {count}\n\n\
             Сообщения:\n{messages}\n\n\
             Дай краткое саммари на русском языке:\n\
             1. Основные темы обсуждения (2-3 пункта)\n\
             2. Ключевые решения или договорённости (если есть)\n\
             3. Важные вопросы без ответа (если есть)\n\n\
             Будь лаконичен, максимум 200 слов.",
            chat_title = chat_title,
            date_from = date_from.format("%d.%m.%Y %H:%M"),
            date_to = date_to.format("%d.%m.%Y %H:%M"),
            count = messages.len(),
            messages = format_messages_for_prompt(&messages),
        );

        info!("Generating summary for chat {chat_id}, {} messages", messages.len());
        let summary = client
            .generate_completion(&prompt, SUMMARY_SYSTEM_PROMPT, SUMMARY_MAX_TOKENS, SUMMARY_TIMEOUT)
            .await;

        Ok(match summary {
            Some(summary) => SummaryResponse {
                success: true,
                error: None,
                summary: Some(summary),
                messages_count: messages.len(),
                period: Some(period),
            },
            None => SummaryResponse {
                success: false,
                error: Some("Не удалось сгенерировать саммари. Попробуйте позже.".to_string()),
                summary: None,
                messages_count: messages.len(),
                period: Some(period),
            },
        })
    }
}

/// One `[HH:MM] @author: text` line per message, long texts clipped.
fn format_messages_for_prompt(messages: &[ConversationLine]) -> String {
    messages
        .iter()
        .map(|message| {
            let text: String = message.text.chars().take(500).collect();
            format!("[{}] @{}: {}", message.sent_at.format("%H:%M"), message.author, text)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn line(text: &str, author: &str, hour: u32, minute: u32) -> ConversationLine {
        ConversationLine {
            text: text.to_string(),
            author: author.to_string(),
            sent_at: Utc.with_ymd_and_hms(2025, 6, 1, hour, minute, 0).unwrap(),
            message_type: "text".to_string(),
        }
    }

    #[test]
    fn prompt_lines_carry_time_author_and_text() {
        let formatted = format_messages_for_prompt(&[
            line("hello", "alice", 9, 5),
            line("world", "bob", 9, 6),
        ]);
        assert_eq!(formatted, "[09:05] @alice: hello\n[09:06] @bob: world");
    }

    #[test]
    fn long_messages_are_clipped_without_splitting_chars() {
        let long = "я".repeat(600);
        let formatted = format_messages_for_prompt(&[line(&long, "alice", 10, 0)]);
        let text_part = formatted.split(": ").nth(1).unwrap();
        assert_eq!(text_part.chars().count(), 500);
    }
}
