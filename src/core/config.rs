use std::env;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

fn default_http_port() -> u16 {
    8000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_openrouter_model() -> String {
    "openai/gpt-4o-mini".to_string()
}

fn default_fresh_account_id_threshold() -> i64 {
    7_000_000_000
}

fn default_clean_interval_sec() -> u64 {
    60
}

fn default_clean_batch_limit() -> i64 {
    100
}

fn default_declined_requests_log_path() -> String {
    "logs/declined_requests.log".to_string()
}

fn default_display_timezone() -> String {
    "Europe/Moscow".to_string()
}

fn default_db_init() -> bool {
    true
}

/// Application settings, loaded from optional config files layered under
/// environment variables. Only the bot token and the database URL are
/// mandatory.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub telegram_token: String,
    pub database_url: String,

    #[serde(default = "default_http_port")]
    pub http_port: u16,
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Optional basic auth for the admin API; open when either is unset.
    #[serde(default)]
    pub admin_username: Option<String>,
    #[serde(default)]
    pub admin_password: Option<String>,

    #[serde(default)]
    pub openrouter_api_key: Option<String>,
    #[serde(default = "default_openrouter_model")]
    pub openrouter_model: String,

    /// The one chat whose join requests are auto-moderated. Cleanup is
    /// disabled entirely when unset.
    #[serde(default)]
    pub moderated_chat_id: Option<i64>,

    #[serde(default = "default_fresh_account_id_threshold")]
    pub fresh_account_id_threshold: i64,
    #[serde(default = "default_clean_interval_sec")]
    pub join_request_clean_interval_sec: u64,
    #[serde(default = "default_clean_batch_limit")]
    pub join_request_clean_batch_limit: i64,
    #[serde(default = "default_declined_requests_log_path")]
    pub declined_requests_log_path: String,

    /// Timezone used for calendar-day boundaries in listings and counts.
    #[serde(default = "default_display_timezone")]
    pub display_timezone: String,

    /// Apply the idempotent schema DDL at startup.
    #[serde(default = "default_db_init")]
    pub db_init: bool,
}

impl AppConfig {
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());
        let config = Config::builder()
            .add_source(File::with_name("default.config").required(false))
            .add_source(File::with_name(&format!("{run_mode}.config")).required(false))
            .add_source(Environment::default().ignore_empty(true))
            .build()?;
        config.try_deserialize()
    }

    pub fn has_admin_auth(&self) -> bool {
        self.admin_username.is_some() && self.admin_password.is_some()
    }

    pub fn has_openrouter(&self) -> bool {
        self.openrouter_api_key
            .as_deref()
            .is_some_and(|key| !key.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_config() -> AppConfig {
        AppConfig {
            telegram_token: "dummy".to_string(),
            database_url: "postgres://localhost/test".to_string(),
            http_port: default_http_port(),
            log_level: default_log_level(),
            admin_username: None,
            admin_password: None,
            openrouter_api_key: None,
            openrouter_model: default_openrouter_model(),
            moderated_chat_id: None,
            fresh_account_id_threshold: default_fresh_account_id_threshold(),
            join_request_clean_interval_sec: default_clean_interval_sec(),
            join_request_clean_batch_limit: default_clean_batch_limit(),
            declined_requests_log_path: default_declined_requests_log_path(),
            display_timezone: default_display_timezone(),
            db_init: default_db_init(),
        }
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = minimal_config();
        assert_eq!(config.http_port, 8000);
        assert_eq!(config.fresh_account_id_threshold, 7_000_000_000);
        assert_eq!(config.join_request_clean_interval_sec, 60);
        assert_eq!(config.join_request_clean_batch_limit, 100);
        assert_eq!(config.declined_requests_log_path, "logs/declined_requests.log");
        assert_eq!(config.display_timezone, "Europe/Moscow");
        assert!(config.db_init);
    }

    #[test]
    fn admin_auth_needs_both_credentials() {
        let mut config = minimal_config();
        assert!(!config.has_admin_auth());

        config.admin_username = Some("admin".to_string());
        assert!(!config.has_admin_auth());

        config.admin_password = Some("secret".to_string());
        assert!(config.has_admin_auth());
    }

    #[test]
    fn openrouter_requires_non_empty_key() {
        let mut config = minimal_config();
        assert!(!config.has_openrouter());

        config.openrouter_api_key = Some(String::new());
        assert!(!config.has_openrouter());

        config.openrouter_api_key = Some("sk-or-123".to_string());
        assert!(config.has_openrouter());
    }
}
