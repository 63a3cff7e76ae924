//! Conversation and user persistence over SQLite
//!
//! One `Store` wraps the connection pool and owns all CRUD. Each logical
//! write runs in a single transaction, so an append can never leave a
//! message behind without bumping its conversation's `updated_at`.

use std::path::Path;
use std::str::FromStr;

use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use thiserror::Error;

use crate::conversation::{Conversation, ConversationSummary, Message, Role, User};

/// Title assigned when a conversation is created without one.
pub const DEFAULT_TITLE: &str = "New Conversation";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("conversation {0} not found")]
    ConversationNotFound(i64),

    #[error("{0} is already taken")]
    Conflict(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Token accounting attached to assistant messages.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenUsage {
    pub tokens_used: i64,
    pub input_tokens: i64,
    pub output_tokens: i64,
}

pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Open (or create) the database at the given path.
    pub async fn new(db_path: &Path) -> Result<Self, sqlx::Error> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).ok();
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path.display()))?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    /// In-memory store for tests.
    pub async fn new_in_memory() -> Result<Self, sqlx::Error> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL UNIQUE,
                email TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS conversations (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER REFERENCES users(id) ON DELETE SET NULL,
                title TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                conversation_id INTEGER NOT NULL
                    REFERENCES conversations(id) ON DELETE CASCADE,
                role TEXT NOT NULL,
                content TEXT NOT NULL,
                model TEXT,
                tokens_used INTEGER NOT NULL DEFAULT 0,
                input_tokens INTEGER NOT NULL DEFAULT 0,
                output_tokens INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_messages_conversation
            ON messages(conversation_id, created_at)
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Create a conversation, using the placeholder title when none is given.
    pub async fn create_conversation(
        &self,
        title: Option<String>,
        user_id: Option<i64>,
    ) -> Result<Conversation, StoreError> {
        let title = match title {
            Some(t) if !t.trim().is_empty() => t,
            _ => DEFAULT_TITLE.to_string(),
        };
        let now = Utc::now();

        let conversation = sqlx::query_as::<_, Conversation>(
            r#"
            INSERT INTO conversations (user_id, title, created_at, updated_at)
            VALUES (?, ?, ?, ?)
            RETURNING id, user_id, title, created_at, updated_at
            "#,
        )
        .bind(user_id)
        .bind(&title)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(conversation)
    }

    /// Fetch one conversation. Absence is a value, not an error.
    pub async fn get_conversation(&self, id: i64) -> Result<Option<Conversation>, StoreError> {
        let conversation = sqlx::query_as::<_, Conversation>(
            r#"
            SELECT id, user_id, title, created_at, updated_at
            FROM conversations
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(conversation)
    }

    /// List conversations, most recently active first, with a message count
    /// computed at read time. SQLite reads a negative LIMIT as unlimited,
    /// so the cap is clamped before binding.
    pub async fn list_conversations(
        &self,
        user_id: Option<i64>,
        limit: i64,
    ) -> Result<Vec<ConversationSummary>, StoreError> {
        let limit = limit.max(0);
        let summaries = sqlx::query_as::<_, ConversationSummary>(
            r#"
            SELECT c.id, c.title, c.created_at, c.updated_at,
                   (SELECT COUNT(*) FROM messages m
                    WHERE m.conversation_id = c.id) AS message_count
            FROM conversations c
            WHERE (?1 IS NULL OR c.user_id = ?1)
            ORDER BY c.updated_at DESC
            LIMIT ?2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(summaries)
    }

    /// Update the title. An absent or empty title is a no-op, not a reset
    /// to the default.
    pub async fn update_title(
        &self,
        id: i64,
        title: Option<String>,
    ) -> Result<Option<Conversation>, StoreError> {
        if let Some(title) = title.filter(|t| !t.trim().is_empty()) {
            let updated = sqlx::query_as::<_, Conversation>(
                r#"
                UPDATE conversations SET title = ?
                WHERE id = ?
                RETURNING id, user_id, title, created_at, updated_at
                "#,
            )
            .bind(&title)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

            return Ok(updated);
        }

        self.get_conversation(id).await
    }

    /// Delete a conversation and all its messages. Returns whether a row
    /// existed.
    pub async fn delete_conversation(&self, id: i64) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM messages WHERE conversation_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM conversations WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    /// Insert a message and bump the parent conversation's `updated_at` to
    /// the same instant, in one transaction. Appending to a missing
    /// conversation is rejected.
    pub async fn append_message(
        &self,
        conversation_id: i64,
        role: Role,
        content: &str,
        model: Option<&str>,
        usage: Option<TokenUsage>,
    ) -> Result<Message, StoreError> {
        let mut tx = self.pool.begin().await?;

        let parent: Option<(i64,)> = sqlx::query_as("SELECT id FROM conversations WHERE id = ?")
            .bind(conversation_id)
            .fetch_optional(&mut *tx)
            .await?;
        if parent.is_none() {
            return Err(StoreError::ConversationNotFound(conversation_id));
        }

        let now = Utc::now();
        let usage = usage.unwrap_or_default();

        let message = sqlx::query_as::<_, Message>(
            r#"
            INSERT INTO messages
                (conversation_id, role, content, model,
                 tokens_used, input_tokens, output_tokens, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING id, conversation_id, role, content, model,
                      tokens_used, input_tokens, output_tokens, created_at
            "#,
        )
        .bind(conversation_id)
        .bind(role)
        .bind(content)
        .bind(model)
        .bind(usage.tokens_used)
        .bind(usage.input_tokens)
        .bind(usage.output_tokens)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE conversations SET updated_at = ? WHERE id = ?")
            .bind(now)
            .bind(conversation_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(message)
    }

    /// Full message history, oldest first. The id tie-break keeps the
    /// order total when two rows share a timestamp.
    pub async fn history(&self, conversation_id: i64) -> Result<Vec<Message>, StoreError> {
        let messages = sqlx::query_as::<_, Message>(
            r#"
            SELECT id, conversation_id, role, content, model,
                   tokens_used, input_tokens, output_tokens, created_at
            FROM messages
            WHERE conversation_id = ?
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(conversation_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(messages)
    }

    /// Register a user. Duplicate username or email surfaces as a conflict.
    pub async fn create_user(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, email, password_hash)
            VALUES (?, ?, ?)
            RETURNING id, username, email, password_hash
            "#,
        )
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StoreError::Conflict("username or email".into())
            }
            _ => StoreError::Database(e),
        })?;

        Ok(user)
    }

    pub async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let users = sqlx::query_as::<_, User>(
            "SELECT id, username, email, password_hash FROM users ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }
}
