use std::error::Error;
use std::fmt;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::database::JoinRequestRepository;
use crate::model::JoinRequestStatus;
use super::audit::{AuditLog, AuditRecord};
use super::freshness::is_resolved_join_request_error;
use super::moderator::ChatModerator;

/// Knobs for the cleanup pass, resolved from configuration once at startup.
#[derive(Debug, Clone)]
pub struct CleanerSettings {
    pub chat_id: i64,
    pub fresh_account_threshold: i64,
    pub batch_limit: i64,
    pub log_path: PathBuf,
}

/// Outcome of one pass: how many requests were looked at and how many of
/// them were actually declined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanReport {
    pub declined: usize,
    pub processed: usize,
}

/// Only store and audit-log failures abort a pass; decline-call failures are
/// folded into per-request outcomes.
pub enum CleanError {
    Store(sqlx::Error),
    AuditLog(std::io::Error),
}

impl fmt::Debug for CleanError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Store(err) => write!(f, "Store: {}", err),
            Self::AuditLog(err) => write!(f, "AuditLog: {}", err),
        }
    }
}

impl Display for CleanError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            CleanError::Store(err) => write!(f, "store error during cleanup pass: {}", err),
            CleanError::AuditLog(err) => write!(f, "audit log error during cleanup pass: {}", err),
        }
    }
}

impl Error for CleanError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            CleanError::Store(err) => Some(err),
            CleanError::AuditLog(err) => Some(err),
        }
    }
}

impl From<sqlx::Error> for CleanError {
    fn from(err: sqlx::Error) -> CleanError {
        CleanError::Store(err)
    }
}

impl From<std::io::Error> for CleanError {
    fn from(err: std::io::Error) -> CleanError {
        CleanError::AuditLog(err)
    }
}

impl From<CleanError> for crate::errors::AppError {
    fn from(err: CleanError) -> crate::errors::AppError {
        match err {
            CleanError::Store(err) => crate::errors::AppError::DatabaseError(Box::new(err)),
            CleanError::AuditLog(err) => {
                crate::errors::AppError::ProcessingError(format!("audit log failure: {err}"))
            }
        }
    }
}

/// Declines pending join requests from fresh-looking accounts, one bounded
/// batch per pass, at most one pass in flight.
///
/// Store and moderator come in as handles so the whole state machine can be
/// exercised without a database or the Bot API.
pub struct JoinRequestCleaner {
    store: Arc<dyn JoinRequestRepository>,
    moderator: Arc<dyn ChatModerator>,
    settings: CleanerSettings,
    pass_guard: Mutex<()>,
}

impl JoinRequestCleaner {

    pub fn new(
        store: Arc<dyn JoinRequestRepository>,
        moderator: Arc<dyn ChatModerator>,
        settings: CleanerSettings,
    ) -> Self {
        JoinRequestCleaner {
            store,
            moderator,
            settings,
            pass_guard: Mutex::new(()),
        }
    }

    /// Runs one cleanup pass.
    ///
    /// A trigger arriving while a pass is in flight returns (0, 0) without
    /// selecting anything: dropped, not queued. The next tick picks up the
    /// remaining backlog. An empty batch also returns (0, 0) and leaves the
    /// audit log untouched.
    ///
    /// Requests are processed strictly oldest-first and sequentially, so the
    /// audit log order matches the selection order and the Bot API is never
    /// hit concurrently.
    pub async fn clean_pending_requests(&self) -> Result<CleanReport, CleanError> {
        let Ok(_guard) = self.pass_guard.try_lock() else {
            debug!("Cleanup pass already in flight, dropping trigger");
            return Ok(CleanReport::default());
        };

        let pending = self
            .store
            .list_pending_fresh(
                self.settings.chat_id,
                self.settings.fresh_account_threshold,
                self.settings.batch_limit,
            )
            .await?;
        if pending.is_empty() {
            return Ok(CleanReport::default());
        }

        let mut log = AuditLog::open(&self.settings.log_path).await?;
        let mut report = CleanReport {
            declined: 0,
            processed: pending.len(),
        };

        for request in &pending {
            let mut outcome = "error";
            let mut failure = String::new();

            match self
                .moderator
                .decline_join_request(request.chat_id, request.user_id)
                .await
            {
                Ok(()) => {
                    self.store
                        .mark_status(&[request.id], JoinRequestStatus::Declined)
                        .await?;
                    report.declined += 1;
                    outcome = "declined";
                }
                Err(err) => {
                    failure = err.to_string();
                    if is_resolved_join_request_error(&err.message) {
                        self.store
                            .mark_status(&[request.id], JoinRequestStatus::Expired)
                            .await?;
                        outcome = "expired";
                    }
                    // Anything else stays pending and is retried next pass.
                }
            }

            let line = AuditRecord {
                outcome,
                request_id: request.id,
                chat_id: request.chat_id,
                user_id: request.user_id,
                username: request.username.as_deref().unwrap_or(""),
                first_name: request.first_name.as_deref().unwrap_or(""),
                message: &failure,
            }
            .format_line();
            log.append_line(&line).await?;
            info!("{line}");
        }

        Ok(report)
    }
}

/// Timer loop driving the cleanup. The first pass fires one full interval
/// after startup; the token stops the loop between passes, an in-flight pass
/// is allowed to finish (the caller bounds the final wait).
pub async fn run_periodic_cleanup(
    cleaner: Arc<JoinRequestCleaner>,
    interval: Duration,
    shutdown: CancellationToken,
) {
    debug!("Starting join request cleanup task.");

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }

        match cleaner.clean_pending_requests().await {
            Ok(report) if report.processed > 0 => {
                info!(
                    "Declined {}/{} pending join requests",
                    report.declined, report.processed
                );
            }
            Ok(_) => {}
            Err(err) => error!("Join request cleanup pass failed: {err}"),
        }
    }

    debug!("Join request cleanup task stopped.");
}
