use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row};
use crate::model::{JoinRequestDetails, JoinRequestStatus, NewJoinRequest, PendingJoinRequest};

/// Store operations the join request cleanup pass is built on. A trait so the
/// pass can be driven against an in-memory double in tests.
#[async_trait]
pub trait JoinRequestRepository: Send + Sync {
    /// Insert or refresh a request by its (user, chat) natural key, always
    /// resetting the status back to pending. Returns the surrogate id.
    async fn upsert_pending(&self, request: &NewJoinRequest) -> Result<i64, sqlx::Error>;

    /// Pending requests for the chat whose user id clears the freshness
    /// threshold, oldest request first, bounded by `limit`.
    async fn list_pending_fresh(
        &self,
        chat_id: i64,
        min_user_id: i64,
        limit: i64,
    ) -> Result<Vec<PendingJoinRequest>, sqlx::Error>;

    /// Bulk status transition; returns the number of updated rows. An empty
    /// id slice is a no-op that never touches the database.
    async fn mark_status(&self, ids: &[i64], status: JoinRequestStatus) -> Result<u64, sqlx::Error>;

    /// Admin inspection listing, newest request first.
    async fn list_for_chat(
        &self,
        chat_id: i64,
        status: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<JoinRequestDetails>, sqlx::Error>;
}

#[derive(Debug, Clone)]
pub struct JoinRequestDatabase {
    pool: Pool<Postgres>,
}

impl JoinRequestDatabase {
    pub fn new(pool: Pool<Postgres>) -> Self {
        JoinRequestDatabase { pool }
    }
}

#[async_trait]
impl JoinRequestRepository for JoinRequestDatabase {

    async fn upsert_pending(&self, request: &NewJoinRequest) -> Result<i64, sqlx::Error> {
        let row = sqlx::query(
            r#"
            INSERT INTO join_requests (user_id, chat_id, username, first_name, bio, request_date, status)
            VALUES ($1, $2, $3, $4, $5, $6, 'pending')
            ON CONFLICT (user_id, chat_id) DO UPDATE SET
                username = EXCLUDED.username,
                first_name = EXCLUDED.first_name,
                bio = EXCLUDED.bio,
                request_date = EXCLUDED.request_date,
                status = 'pending'
            RETURNING id
            "#,
        )
        .bind(request.user_id)
        .bind(request.chat_id)
        .bind(&request.username)
        .bind(&request.first_name)
        .bind(&request.bio)
        .bind(request.request_date)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.get("id"))
    }

    async fn list_pending_fresh(
        &self,
        chat_id: i64,
        min_user_id: i64,
        limit: i64,
    ) -> Result<Vec<PendingJoinRequest>, sqlx::Error> {
        let requests = sqlx::query_as::<_, PendingJoinRequest>(
            r#"
            SELECT id, user_id, chat_id, username, first_name, request_date
            FROM join_requests
            WHERE chat_id = $1
              AND status = 'pending'
              AND user_id >= $2
            ORDER BY request_date ASC
            LIMIT $3
            "#,
        )
        .bind(chat_id)
        .bind(min_user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(requests)
    }

    async fn mark_status(&self, ids: &[i64], status: JoinRequestStatus) -> Result<u64, sqlx::Error> {
        if ids.is_empty() {
            return Ok(0);
        }
        let result = sqlx::query("UPDATE join_requests SET status = $1 WHERE id = ANY($2)")
            .bind(status.as_str())
            .bind(ids)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn list_for_chat(
        &self,
        chat_id: i64,
        status: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<JoinRequestDetails>, sqlx::Error> {
        let query = if let Some(status) = status {
            sqlx::query_as::<_, JoinRequestDetails>(
                r#"
                SELECT id, user_id, chat_id, username, first_name, bio, request_date, status, created_at
                FROM join_requests
                WHERE chat_id = $1 AND status = $2
                ORDER BY request_date DESC
                LIMIT $3 OFFSET $4
                "#,
            )
            .bind(chat_id)
            .bind(status)
            .bind(limit)
            .bind(offset)
        } else {
            sqlx::query_as::<_, JoinRequestDetails>(
                r#"
                SELECT id, user_id, chat_id, username, first_name, bio, request_date, status, created_at
                FROM join_requests
                WHERE chat_id = $1
                ORDER BY request_date DESC
                LIMIT $2 OFFSET $3
                "#,
            )
            .bind(chat_id)
            .bind(limit)
            .bind(offset)
        };
        query.fetch_all(&self.pool).await
    }
}
