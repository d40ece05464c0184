use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

/// Lifecycle of a stored join request. `Pending` is the only state the
/// cleanup pass ever selects; `Declined` and `Expired` are terminal and
/// sticky. A new inbound request for the same (user, chat) pair resets the
/// row back to `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinRequestStatus {
    Pending,
    Declined,
    Expired,
}

impl JoinRequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JoinRequestStatus::Pending => "pending",
            JoinRequestStatus::Declined => "declined",
            JoinRequestStatus::Expired => "expired",
        }
    }
}

impl std::fmt::Display for JoinRequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A new or refreshed join request as captured from a bot update.
#[derive(Debug, Clone)]
pub struct NewJoinRequest {
    pub user_id: i64,
    pub chat_id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub bio: Option<String>,
    pub request_date: DateTime<Utc>,
}

/// Row shape selected by the cleanup pass. Status is implicitly `pending`,
/// the query already filtered on it.
#[derive(Debug, Clone, FromRow)]
pub struct PendingJoinRequest {
    pub id: i64,
    pub user_id: i64,
    pub chat_id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub request_date: DateTime<Utc>,
}

/// Full row for the admin inspection endpoint.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct JoinRequestDetails {
    pub id: i64,
    pub user_id: i64,
    pub chat_id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub bio: Option<String>,
    pub request_date: DateTime<Utc>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_to_db_strings() {
        assert_eq!(JoinRequestStatus::Pending.as_str(), "pending");
        assert_eq!(JoinRequestStatus::Declined.as_str(), "declined");
        assert_eq!(JoinRequestStatus::Expired.as_str(), "expired");
        assert_eq!(JoinRequestStatus::Expired.to_string(), "expired");
    }
}
