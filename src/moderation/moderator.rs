use std::fmt;
use std::fmt::{Display, Formatter};
use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{ChatId, UserId};

/// Failure of one decline call. `kind` is a coarse label for the audit log;
/// `message` carries the platform's text, which the phrase classifier
/// inspects.
#[derive(Debug, Clone)]
pub struct DeclineError {
    pub kind: &'static str,
    pub message: String,
}

impl Display for DeclineError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for DeclineError {}

/// The platform operation the cleanup pass drives. A trait so tests can
/// script outcomes and count calls.
#[async_trait]
pub trait ChatModerator: Send + Sync {
    async fn decline_join_request(&self, chat_id: i64, user_id: i64) -> Result<(), DeclineError>;
}

/// Bot API backed implementation.
#[derive(Clone)]
pub struct TelegramModerator {
    bot: Bot,
}

impl TelegramModerator {
    pub fn new(bot: Bot) -> Self {
        TelegramModerator { bot }
    }
}

#[async_trait]
impl ChatModerator for TelegramModerator {
    async fn decline_join_request(&self, chat_id: i64, user_id: i64) -> Result<(), DeclineError> {
        self.bot
            .decline_chat_join_request(ChatId(chat_id), UserId(user_id as u64))
            .await
            .map(|_| ())
            .map_err(|err| {
                let kind = match &err {
                    teloxide::RequestError::Api(_) => "ApiError",
                    teloxide::RequestError::Network(_) => "NetworkError",
                    _ => "RequestError",
                };
                DeclineError {
                    kind,
                    message: err.to_string(),
                }
            })
    }
}
