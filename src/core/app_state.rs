use std::sync::Arc;
use crate::core::AppConfig;
use crate::database::{ChatLogDatabase, JoinRequestDatabase, StatsDatabase};
use crate::moderation::JoinRequestCleaner;
use crate::services::OpenRouterClient;

/// Shared handles for the admin API and the bot dispatcher.
#[derive(Clone)]
pub struct AppState {
    pub env: AppConfig,
    pub chat_log: ChatLogDatabase,
    pub join_requests: JoinRequestDatabase,
    pub stats: StatsDatabase,
    /// Present only when an OpenRouter key is configured.
    pub summarizer: Option<OpenRouterClient>,
    /// Present only when a moderated chat is configured.
    pub cleaner: Option<Arc<JoinRequestCleaner>>,
}
