use sqlx::{Pool, Postgres};
use crate::model::{
    ChatMessageRecord, ChatRecord, ChatRow, ConversationLine, DailyCount, MessageEdit,
    NewChatMessage, UserListRow, UserRecord,
};

/// Persistence for everything the bot observes: users, chats and their
/// messages, plus the read queries behind listings and the AI feeds.
#[derive(Debug, Clone)]
pub struct ChatLogDatabase {
    pool: Pool<Postgres>,
}

impl ChatLogDatabase {

    pub fn new(pool: Pool<Postgres>) -> Self {
        ChatLogDatabase { pool }
    }

    pub async fn save_user(&self, user: &UserRecord) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO users (id, is_bot, first_name, last_name, username, language_code, is_premium, last_updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, NOW())
            ON CONFLICT (id) DO UPDATE SET
                first_name = EXCLUDED.first_name,
                last_name = EXCLUDED.last_name,
                username = EXCLUDED.username,
                language_code = EXCLUDED.language_code,
                is_premium = EXCLUDED.is_premium,
                last_updated_at = NOW()
            "#,
        )
        .bind(user.id)
        .bind(user.is_bot)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.username)
        .bind(&user.language_code)
        .bind(user.is_premium)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn save_chat(&self, chat: &ChatRecord) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO chats (id, type, title, username)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE SET
                title = EXCLUDED.title,
                username = EXCLUDED.username,
                last_updated_at = NOW()
            "#,
        )
        .bind(chat.id)
        .bind(&chat.chat_type)
        .bind(&chat.title)
        .bind(&chat.username)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Duplicate deliveries are dropped on the (chat, message) key.
    pub async fn insert_message(&self, message: &NewChatMessage) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO messages (
                message_id, chat_id, user_id, message_type, text, caption,
                reply_to_message_id, forward_from_chat_id, sent_at, raw_message
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (chat_id, message_id) DO NOTHING
            "#,
        )
        .bind(message.message_id)
        .bind(message.chat_id)
        .bind(message.user_id)
        .bind(&message.message_type)
        .bind(&message.text)
        .bind(&message.caption)
        .bind(message.reply_to_message_id)
        .bind(message.forward_from_chat_id)
        .bind(message.sent_at)
        .bind(&message.raw_message)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn apply_edit(&self, edit: &MessageEdit) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE messages
            SET text = $1, caption = $2, edited_at = $3, raw_message = $4
            WHERE chat_id = $5 AND message_id = $6
            "#,
        )
        .bind(&edit.text)
        .bind(&edit.caption)
        .bind(edit.edited_at)
        .bind(&edit.raw_message)
        .bind(edit.chat_id)
        .bind(edit.message_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_chat(&self, chat_id: i64) -> Result<Option<ChatRow>, sqlx::Error> {
        sqlx::query_as::<_, ChatRow>(
            r#"
            SELECT id, type AS chat_type, title, username, first_seen_at, last_updated_at
            FROM chats WHERE id = $1
            "#,
        )
        .bind(chat_id)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn list_messages(
        &self,
        chat_id: i64,
        message_type: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ChatMessageRecord>, sqlx::Error> {
        let query = if let Some(message_type) = message_type {
            sqlx::query_as::<_, ChatMessageRecord>(
                r#"
                SELECT
                    m.message_id, m.message_type, m.text, m.caption, m.sent_at, m.edited_at,
                    m.reply_to_message_id,
                    u.id AS user_id, u.first_name AS user_first_name,
                    u.last_name AS user_last_name, u.username AS user_username
                FROM messages m
                LEFT JOIN users u ON m.user_id = u.id
                WHERE m.chat_id = $1 AND m.message_type = $2
                ORDER BY m.sent_at DESC
                LIMIT $3 OFFSET $4
                "#,
            )
            .bind(chat_id)
            .bind(message_type)
            .bind(limit)
            .bind(offset)
        } else {
            sqlx::query_as::<_, ChatMessageRecord>(
                r#"
                SELECT
                    m.message_id, m.message_type, m.text, m.caption, m.sent_at, m.edited_at,
                    m.reply_to_message_id,
                    u.id AS user_id, u.first_name AS user_first_name,
                    u.last_name AS user_last_name, u.username AS user_username
                FROM messages m
                LEFT JOIN users u ON m.user_id = u.id
                WHERE m.chat_id = $1
                ORDER BY m.sent_at DESC
                LIMIT $2 OFFSET $3
                "#,
            )
            .bind(chat_id)
            .bind(limit)
            .bind(offset)
        };
        query.fetch_all(&self.pool).await
    }

    /// Every message of one calendar day, day boundaries taken in the given
    /// timezone, oldest first.
    pub async fn list_messages_for_day(
        &self,
        chat_id: i64,
        date: &str,
        timezone: &str,
    ) -> Result<Vec<ChatMessageRecord>, sqlx::Error> {
        sqlx::query_as::<_, ChatMessageRecord>(
            r#"
            SELECT
                m.message_id, m.message_type, m.text, m.caption, m.sent_at, m.edited_at,
                m.reply_to_message_id,
                u.id AS user_id, u.first_name AS user_first_name,
                u.last_name AS user_last_name, u.username AS user_username
            FROM messages m
            LEFT JOIN users u ON m.user_id = u.id
            WHERE m.chat_id = $1
              AND (m.sent_at AT TIME ZONE 'UTC' AT TIME ZONE $3)::date = $2::date
            ORDER BY m.sent_at ASC
            "#,
        )
        .bind(chat_id)
        .bind(date)
        .bind(timezone)
        .fetch_all(&self.pool)
        .await
    }

    /// Text messages of the trailing 24 hours, chronological, for the
    /// summary prompt.
    pub async fn recent_conversation(
        &self,
        chat_id: i64,
        limit: i64,
    ) -> Result<Vec<ConversationLine>, sqlx::Error> {
        sqlx::query_as::<_, ConversationLine>(
            r#"
            SELECT
                m.text AS text,
                COALESCE(u.username, u.first_name, 'Unknown') AS author,
                m.sent_at,
                m.message_type
            FROM messages m
            LEFT JOIN users u ON m.user_id = u.id
            WHERE m.chat_id = $1
              AND m.sent_at >= NOW() - INTERVAL '24 hours'
              AND m.text IS NOT NULL
            ORDER BY m.sent_at ASC
            LIMIT $2
            "#,
        )
        .bind(chat_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }

    /// Messages with any text content over the trailing N days, newest
    /// first, for the strategy prompt.
    pub async fn conversation_for_period(
        &self,
        chat_id: i64,
        days: i32,
        limit: i64,
    ) -> Result<Vec<ConversationLine>, sqlx::Error> {
        sqlx::query_as::<_, ConversationLine>(
            r#"
            SELECT
                COALESCE(m.text, m.caption) AS text,
                COALESCE(u.username, u.first_name, 'Unknown') AS author,
                m.sent_at,
                m.message_type
            FROM messages m
            LEFT JOIN users u ON m.user_id = u.id
            WHERE m.chat_id = $1
              AND m.sent_at >= NOW() - make_interval(days => $2)
              AND (m.text IS NOT NULL OR m.caption IS NOT NULL)
            ORDER BY m.sent_at DESC
            LIMIT $3
            "#,
        )
        .bind(chat_id)
        .bind(days)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn daily_message_counts(
        &self,
        chat_id: i64,
        days: i32,
        timezone: &str,
    ) -> Result<Vec<DailyCount>, sqlx::Error> {
        sqlx::query_as::<_, DailyCount>(
            r#"
            SELECT
                (m.sent_at AT TIME ZONE 'UTC' AT TIME ZONE $3)::date AS date,
                COUNT(*) AS count
            FROM messages m
            WHERE m.chat_id = $1
              AND m.sent_at >= NOW() - make_interval(days => $2)
            GROUP BY date
            ORDER BY date ASC
            "#,
        )
        .bind(chat_id)
        .bind(days)
        .bind(timezone)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn list_users(&self, limit: i64, offset: i64) -> Result<Vec<UserListRow>, sqlx::Error> {
        sqlx::query_as::<_, UserListRow>(
            r#"
            SELECT
                u.id, u.first_name, u.last_name, u.username, u.is_bot, u.is_premium,
                u.language_code, u.first_seen_at,
                COUNT(m.message_id) AS message_count
            FROM users u
            LEFT JOIN messages m ON u.id = m.user_id
            GROUP BY u.id, u.first_name, u.last_name, u.username,
                     u.is_bot, u.is_premium, u.language_code, u.first_seen_at
            ORDER BY message_count DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
    }
}
