mod audit;
mod cleaner;
mod freshness;
mod moderator;

pub use audit::{sanitize_one_line, AuditLog, AuditRecord};
pub use cleaner::{run_periodic_cleanup, CleanError, CleanReport, CleanerSettings, JoinRequestCleaner};
pub use freshness::{is_fresh_account_id, is_resolved_join_request_error};
pub use moderator::{ChatModerator, DeclineError, TelegramModerator};
