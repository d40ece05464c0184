use serde_json::{Map, Value};
use sqlx::{Pool, Postgres, Row};
use crate::model::{ChatStatsRow, DashboardChatRow, GlobalStats};

/// Read-only aggregates behind the admin overview and dashboard.
#[derive(Debug, Clone)]
pub struct StatsDatabase {
    pool: Pool<Postgres>,
}

impl StatsDatabase {

    pub fn new(pool: Pool<Postgres>) -> Self {
        StatsDatabase { pool }
    }

    /// Cheap liveness probe for the health endpoint.
    pub async fn health_probe(&self) -> Result<(), sqlx::Error> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn global_stats(&self) -> Result<GlobalStats, sqlx::Error> {
        let total_chats = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM chats")
            .fetch_one(&self.pool)
            .await?;
        let total_users = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        let total_messages = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM messages")
            .fetch_one(&self.pool)
            .await?;
        let messages_today =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM messages WHERE sent_at >= CURRENT_DATE")
                .fetch_one(&self.pool)
                .await?;

        let type_rows = sqlx::query(
            r#"
            SELECT message_type, COUNT(*) AS cnt
            FROM messages
            GROUP BY message_type
            ORDER BY cnt DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut messages_by_type = Map::new();
        for row in &type_rows {
            let message_type: String = row.get("message_type");
            let count: i64 = row.get("cnt");
            messages_by_type.insert(message_type, Value::from(count));
        }

        Ok(GlobalStats {
            total_chats,
            total_users,
            total_messages,
            messages_today,
            messages_by_type: Value::Object(messages_by_type),
        })
    }

    pub async fn chats_with_stats(&self) -> Result<Vec<ChatStatsRow>, sqlx::Error> {
        sqlx::query_as::<_, ChatStatsRow>(
            r#"
            SELECT
                c.id,
                c.type AS chat_type,
                c.title,
                c.username,
                COUNT(DISTINCT m.message_id) AS message_count,
                COUNT(DISTINCT m.user_id) AS user_count,
                MAX(m.sent_at) AS last_message_at
            FROM chats c
            LEFT JOIN messages m ON c.id = m.chat_id
            GROUP BY c.id, c.type, c.title, c.username
            ORDER BY message_count DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
    }

    /// One round trip for the whole dashboard: per-chat totals, the latest
    /// text message, and the week's top three posters as JSON.
    pub async fn dashboard_data(&self) -> Result<Vec<DashboardChatRow>, sqlx::Error> {
        sqlx::query_as::<_, DashboardChatRow>(
            r#"
            WITH stats AS (
                SELECT
                    c.id,
                    c.title,
                    COUNT(m.message_id) AS total_messages,
                    COUNT(m.message_id) FILTER (WHERE m.sent_at >= CURRENT_DATE) AS today_messages
                FROM chats c
                LEFT JOIN messages m ON c.id = m.chat_id
                GROUP BY c.id, c.title
            )
            SELECT
                s.id,
                s.title,
                s.total_messages,
                s.today_messages,
                lm.text AS last_message_text,
                lm.author AS last_message_author,
                lm.sent_at AS last_message_at,
                COALESCE(tu.data, '[]'::json) AS top_users
            FROM stats s
            LEFT JOIN LATERAL (
                SELECT
                    m.text,
                    COALESCE(u.username, u.first_name, 'Unknown') AS author,
                    m.sent_at
                FROM messages m
                LEFT JOIN users u ON m.user_id = u.id
                WHERE m.chat_id = s.id AND m.text IS NOT NULL
                ORDER BY m.sent_at DESC
                LIMIT 1
            ) lm ON TRUE
            LEFT JOIN LATERAL (
                SELECT
                    json_agg(json_build_object('name', t.name, 'count', t.count)) AS data
                FROM (
                    SELECT
                        COALESCE(u.username, u.first_name, 'Unknown') AS name,
                        COUNT(*) AS count
                    FROM messages m
                    JOIN users u ON m.user_id = u.id
                    WHERE m.chat_id = s.id
                      AND m.sent_at >= NOW() - INTERVAL '7 days'
                    GROUP BY u.id, u.username, u.first_name
                    ORDER BY count DESC
                    LIMIT 3
                ) t
            ) tu ON TRUE
            ORDER BY s.total_messages DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
    }
}
