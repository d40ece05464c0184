use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use tokio::sync::Notify;

use groupscribe::database::JoinRequestRepository;
use groupscribe::model::{JoinRequestDetails, JoinRequestStatus, NewJoinRequest, PendingJoinRequest};
use groupscribe::moderation::{
    ChatModerator, CleanError, CleanReport, CleanerSettings, DeclineError, JoinRequestCleaner,
};

const CHAT_ID: i64 = -1001234567890;
const THRESHOLD: i64 = 7_000_000_000;

#[derive(Debug, Clone)]
struct StoredRequest {
    id: i64,
    user_id: i64,
    chat_id: i64,
    username: Option<String>,
    first_name: Option<String>,
    request_date: DateTime<Utc>,
    status: JoinRequestStatus,
}

/// In-memory stand-in for the join request table.
#[derive(Default)]
struct MemoryStore {
    rows: Mutex<Vec<StoredRequest>>,
    fail_listing: bool,
}

impl MemoryStore {
    fn with_requests(requests: Vec<StoredRequest>) -> Self {
        MemoryStore {
            rows: Mutex::new(requests),
            fail_listing: false,
        }
    }

    fn status_of(&self, user_id: i64) -> JoinRequestStatus {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .find(|row| row.user_id == user_id)
            .map(|row| row.status)
            .expect("request should exist")
    }
}

#[async_trait]
impl JoinRequestRepository for MemoryStore {
    async fn upsert_pending(&self, request: &NewJoinRequest) -> Result<i64, sqlx::Error> {
        let mut rows = self.rows.lock().unwrap();
        if let Some(row) = rows
            .iter_mut()
            .find(|row| row.user_id == request.user_id && row.chat_id == request.chat_id)
        {
            row.username = request.username.clone();
            row.first_name = request.first_name.clone();
            row.request_date = request.request_date;
            row.status = JoinRequestStatus::Pending;
            return Ok(row.id);
        }
        let id = rows.len() as i64 + 1;
        rows.push(StoredRequest {
            id,
            user_id: request.user_id,
            chat_id: request.chat_id,
            username: request.username.clone(),
            first_name: request.first_name.clone(),
            request_date: request.request_date,
            status: JoinRequestStatus::Pending,
        });
        Ok(id)
    }

    async fn list_pending_fresh(
        &self,
        chat_id: i64,
        min_user_id: i64,
        limit: i64,
    ) -> Result<Vec<PendingJoinRequest>, sqlx::Error> {
        if self.fail_listing {
            return Err(sqlx::Error::PoolClosed);
        }
        let rows = self.rows.lock().unwrap();
        let mut pending: Vec<&StoredRequest> = rows
            .iter()
            .filter(|row| {
                row.chat_id == chat_id
                    && row.status == JoinRequestStatus::Pending
                    && row.user_id >= min_user_id
            })
            .collect();
        pending.sort_by_key(|row| row.request_date);
        pending.truncate(limit as usize);
        Ok(pending
            .into_iter()
            .map(|row| PendingJoinRequest {
                id: row.id,
                user_id: row.user_id,
                chat_id: row.chat_id,
                username: row.username.clone(),
                first_name: row.first_name.clone(),
                request_date: row.request_date,
            })
            .collect())
    }

    async fn mark_status(&self, ids: &[i64], status: JoinRequestStatus) -> Result<u64, sqlx::Error> {
        if ids.is_empty() {
            return Ok(0);
        }
        let mut rows = self.rows.lock().unwrap();
        let mut updated = 0;
        for row in rows.iter_mut() {
            if ids.contains(&row.id) {
                row.status = status;
                updated += 1;
            }
        }
        Ok(updated)
    }

    async fn list_for_chat(
        &self,
        chat_id: i64,
        status: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<JoinRequestDetails>, sqlx::Error> {
        let rows = self.rows.lock().unwrap();
        let mut matching: Vec<&StoredRequest> = rows
            .iter()
            .filter(|row| {
                row.chat_id == chat_id
                    && status.is_none_or(|status| row.status.as_str() == status)
            })
            .collect();
        matching.sort_by_key(|row| std::cmp::Reverse(row.request_date));
        Ok(matching
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .map(|row| JoinRequestDetails {
                id: row.id,
                user_id: row.user_id,
                chat_id: row.chat_id,
                username: row.username.clone(),
                first_name: row.first_name.clone(),
                bio: None,
                request_date: row.request_date,
                status: row.status.as_str().to_string(),
                created_at: row.request_date,
            })
            .collect())
    }
}

/// Moderator that replays configured per-user outcomes and records the call
/// order.
#[derive(Default)]
struct ScriptedModerator {
    failures: HashMap<i64, DeclineError>,
    calls: Mutex<Vec<i64>>,
}

impl ScriptedModerator {
    fn failing_for(failures: Vec<(i64, DeclineError)>) -> Self {
        ScriptedModerator {
            failures: failures.into_iter().collect(),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn call_order(&self) -> Vec<i64> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatModerator for ScriptedModerator {
    async fn decline_join_request(&self, _chat_id: i64, user_id: i64) -> Result<(), DeclineError> {
        self.calls.lock().unwrap().push(user_id);
        match self.failures.get(&user_id) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

/// Moderator that parks on the first call until released, to hold a pass
/// open while a second trigger fires.
struct BlockingModerator {
    started: Notify,
    release: Notify,
    calls: AtomicUsize,
}

impl BlockingModerator {
    fn new() -> Self {
        BlockingModerator {
            started: Notify::new(),
            release: Notify::new(),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ChatModerator for BlockingModerator {
    async fn decline_join_request(&self, _chat_id: i64, _user_id: i64) -> Result<(), DeclineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.started.notify_one();
        self.release.notified().await;
        Ok(())
    }
}

fn request_at(id: i64, user_id: i64, minute: u32) -> StoredRequest {
    StoredRequest {
        id,
        user_id,
        chat_id: CHAT_ID,
        username: Some(format!("user{id}")),
        first_name: Some("Test".to_string()),
        request_date: Utc.with_ymd_and_hms(2025, 5, 20, 10, minute, 0).unwrap(),
        status: JoinRequestStatus::Pending,
    }
}

fn temp_log_path(name: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!(
        "groupscribe-test-{}-{}.log",
        std::process::id(),
        name
    ));
    let _ = std::fs::remove_file(&path);
    path
}

fn cleaner_with(
    store: Arc<dyn JoinRequestRepository>,
    moderator: Arc<dyn ChatModerator>,
    log_path: PathBuf,
) -> JoinRequestCleaner {
    JoinRequestCleaner::new(
        store,
        moderator,
        CleanerSettings {
            chat_id: CHAT_ID,
            fresh_account_threshold: THRESHOLD,
            batch_limit: 10,
            log_path,
        },
    )
}

fn generic_timeout() -> DeclineError {
    DeclineError {
        kind: "NetworkError",
        message: "request timed out".to_string(),
    }
}

fn already_participant() -> DeclineError {
    DeclineError {
        kind: "ApiError",
        message: "Bad Request: User already participant".to_string(),
    }
}

#[tokio::test]
async fn declines_only_fresh_requests_oldest_first() {
    let store = Arc::new(MemoryStore::with_requests(vec![
        request_at(1, 7_100_000_000, 1),
        request_at(2, 6_000_000_000, 2),
        request_at(3, 7_200_000_000, 3),
    ]));
    let moderator = Arc::new(ScriptedModerator::default());
    let cleaner = cleaner_with(store.clone(), moderator.clone(), temp_log_path("selection"));

    let report = cleaner.clean_pending_requests().await.unwrap();

    assert_eq!(report, CleanReport { declined: 2, processed: 2 });
    // Ascending request date, regardless of the user id magnitudes.
    assert_eq!(moderator.call_order(), vec![7_100_000_000, 7_200_000_000]);
    assert_eq!(store.status_of(7_100_000_000), JoinRequestStatus::Declined);
    assert_eq!(store.status_of(7_200_000_000), JoinRequestStatus::Declined);
    assert_eq!(store.status_of(6_000_000_000), JoinRequestStatus::Pending);
}

#[tokio::test]
async fn resolved_error_signature_marks_expired() {
    let store = Arc::new(MemoryStore::with_requests(vec![request_at(1, 7_100_000_000, 1)]));
    let moderator = Arc::new(ScriptedModerator::failing_for(vec![(
        7_100_000_000,
        already_participant(),
    )]));
    let log_path = temp_log_path("expired");
    let cleaner = cleaner_with(store.clone(), moderator, log_path.clone());

    let report = cleaner.clean_pending_requests().await.unwrap();

    assert_eq!(report, CleanReport { declined: 0, processed: 1 });
    assert_eq!(store.status_of(7_100_000_000), JoinRequestStatus::Expired);

    let log = std::fs::read_to_string(&log_path).unwrap();
    let line = log.lines().next().unwrap();
    assert_eq!(line.split('\t').nth(1), Some("expired"));
    assert!(line.contains("User already participant"));
}

#[tokio::test]
async fn generic_error_leaves_request_pending_for_retry() {
    let store = Arc::new(MemoryStore::with_requests(vec![request_at(1, 7_100_000_000, 1)]));
    let moderator = Arc::new(ScriptedModerator::failing_for(vec![(
        7_100_000_000,
        generic_timeout(),
    )]));
    let log_path = temp_log_path("retry");
    let cleaner = cleaner_with(store.clone(), moderator.clone(), log_path.clone());

    let report = cleaner.clean_pending_requests().await.unwrap();
    assert_eq!(report, CleanReport { declined: 0, processed: 1 });
    assert_eq!(store.status_of(7_100_000_000), JoinRequestStatus::Pending);

    let log = std::fs::read_to_string(&log_path).unwrap();
    assert_eq!(log.lines().next().unwrap().split('\t').nth(1), Some("error"));

    // Still pending, so the next pass picks it up again.
    let report = cleaner.clean_pending_requests().await.unwrap();
    assert_eq!(report.processed, 1);
    assert_eq!(moderator.call_order(), vec![7_100_000_000, 7_100_000_000]);
}

#[tokio::test]
async fn second_pass_after_full_success_is_a_no_op() {
    let store = Arc::new(MemoryStore::with_requests(vec![
        request_at(1, 7_100_000_000, 1),
        request_at(2, 7_200_000_000, 2),
    ]));
    let moderator = Arc::new(ScriptedModerator::default());
    let log_path = temp_log_path("idempotent");
    let cleaner = cleaner_with(store.clone(), moderator.clone(), log_path.clone());

    let first = cleaner.clean_pending_requests().await.unwrap();
    assert_eq!(first, CleanReport { declined: 2, processed: 2 });

    let second = cleaner.clean_pending_requests().await.unwrap();
    assert_eq!(second, CleanReport { declined: 0, processed: 0 });
    assert_eq!(moderator.call_order().len(), 2);

    // The empty second pass appended nothing.
    let log = std::fs::read_to_string(&log_path).unwrap();
    assert_eq!(log.lines().count(), 2);
}

#[tokio::test]
async fn concurrent_trigger_is_dropped_silently() {
    let store = Arc::new(MemoryStore::with_requests(vec![request_at(1, 7_100_000_000, 1)]));
    let moderator = Arc::new(BlockingModerator::new());
    let cleaner = Arc::new(cleaner_with(
        store.clone(),
        moderator.clone(),
        temp_log_path("reentrancy"),
    ));

    let running = {
        let cleaner = cleaner.clone();
        tokio::spawn(async move { cleaner.clean_pending_requests().await })
    };

    // Wait until the first pass is parked inside the decline call.
    tokio::time::timeout(Duration::from_secs(5), moderator.started.notified())
        .await
        .expect("first pass should reach the moderator");

    let skipped = cleaner.clean_pending_requests().await.unwrap();
    assert_eq!(skipped, CleanReport { declined: 0, processed: 0 });
    assert_eq!(moderator.calls.load(Ordering::SeqCst), 1);

    moderator.release.notify_one();
    let finished = running.await.unwrap().unwrap();
    assert_eq!(finished, CleanReport { declined: 1, processed: 1 });
}

#[tokio::test]
async fn audit_log_gains_one_well_formed_line_per_request() {
    let store = Arc::new(MemoryStore::with_requests(vec![
        request_at(1, 7_100_000_000, 1),
        request_at(2, 7_150_000_000, 2),
        request_at(3, 7_200_000_000, 3),
    ]));
    let moderator = Arc::new(ScriptedModerator::failing_for(vec![
        (7_150_000_000, already_participant()),
        (7_200_000_000, generic_timeout()),
    ]));
    let log_path = temp_log_path("audit");
    let cleaner = cleaner_with(store, moderator, log_path.clone());

    let report = cleaner.clean_pending_requests().await.unwrap();
    assert_eq!(report, CleanReport { declined: 1, processed: 3 });

    let log = std::fs::read_to_string(&log_path).unwrap();
    let lines: Vec<&str> = log.lines().collect();
    assert_eq!(lines.len(), 3);

    let outcomes: Vec<&str> = lines
        .iter()
        .map(|line| line.split('\t').nth(1).unwrap())
        .collect();
    assert_eq!(outcomes, vec!["declined", "expired", "error"]);

    for line in &lines {
        let fields: Vec<&str> = line.split('\t').collect();
        assert_eq!(fields.len(), 8);
        assert!(DateTime::parse_from_rfc3339(fields[0]).is_ok());
        assert!(fields[2].starts_with("request_id="));
        assert!(fields[3].starts_with("chat_id="));
        assert!(fields[4].starts_with("user_id="));
        assert!(fields[5].starts_with("username="));
        assert!(fields[6].starts_with("first_name="));
        assert!(fields[7].starts_with("message="));
    }
}

#[tokio::test]
async fn empty_batch_creates_no_log_file() {
    let store = Arc::new(MemoryStore::default());
    let moderator = Arc::new(ScriptedModerator::default());
    let log_path = temp_log_path("empty");
    let cleaner = cleaner_with(store, moderator, log_path.clone());

    let report = cleaner.clean_pending_requests().await.unwrap();
    assert_eq!(report, CleanReport { declined: 0, processed: 0 });
    assert!(!log_path.exists());
}

#[tokio::test]
async fn store_failure_aborts_the_pass() {
    let store = Arc::new(MemoryStore {
        rows: Mutex::new(vec![request_at(1, 7_100_000_000, 1)]),
        fail_listing: true,
    });
    let moderator = Arc::new(ScriptedModerator::default());
    let cleaner = cleaner_with(store, moderator.clone(), temp_log_path("store-error"));

    let result = cleaner.clean_pending_requests().await;
    assert!(matches!(result, Err(CleanError::Store(_))));
    assert!(moderator.call_order().is_empty());
}

#[tokio::test]
async fn repeated_request_resets_terminal_status_to_pending() {
    let store = MemoryStore::with_requests(vec![]);
    let first_id = store
        .upsert_pending(&NewJoinRequest {
            user_id: 7_100_000_000,
            chat_id: CHAT_ID,
            username: Some("user".to_string()),
            first_name: Some("Test".to_string()),
            bio: None,
            request_date: Utc.with_ymd_and_hms(2025, 5, 20, 10, 0, 0).unwrap(),
        })
        .await
        .unwrap();
    store
        .mark_status(&[first_id], JoinRequestStatus::Declined)
        .await
        .unwrap();
    assert_eq!(store.status_of(7_100_000_000), JoinRequestStatus::Declined);

    let second_id = store
        .upsert_pending(&NewJoinRequest {
            user_id: 7_100_000_000,
            chat_id: CHAT_ID,
            username: Some("renamed".to_string()),
            first_name: Some("Test".to_string()),
            bio: None,
            request_date: Utc.with_ymd_and_hms(2025, 5, 21, 10, 0, 0).unwrap(),
        })
        .await
        .unwrap();

    assert_eq!(first_id, second_id);
    assert_eq!(store.status_of(7_100_000_000), JoinRequestStatus::Pending);
}
