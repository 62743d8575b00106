use super::*;

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

const SQLITE_USERS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT NOT NULL UNIQUE,
    password_hash TEXT,
    telegram_id TEXT UNIQUE,
    auth_token TEXT NOT NULL UNIQUE,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
    updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
)
"#;

const SQLITE_ITEMS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS items (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    text TEXT NOT NULL,
    user_id INTEGER NOT NULL,
    FOREIGN KEY(user_id) REFERENCES users(id) ON DELETE CASCADE
)
"#;

pub(super) struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Opens `sqlite:<path>` (created if missing) or `sqlite::memory:`.
    pub(super) async fn connect(url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);

        // One connection: an in-memory database lives and dies with it.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        Ok(SqliteStore { pool })
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn init_schema(&self) -> Result<(), StoreError> {
        sqlx::query(SQLITE_USERS_TABLE).execute(&self.pool).await?;
        sqlx::query(SQLITE_ITEMS_TABLE).execute(&self.pool).await?;
        Ok(())
    }

    async fn create_account(&self, account: &NewAccount) -> Result<Account, StoreError> {
        let result = sqlx::query(
            "INSERT INTO users (username, password_hash, telegram_id, auth_token) VALUES (?, ?, ?, ?)",
        )
        .bind(&account.username)
        .bind(&account.password_hash)
        .bind(&account.telegram_id)
        .bind(&account.auth_token)
        .execute(&self.pool)
        .await
        .map_err(StoreError::from_insert)?;

        Ok(Account {
            id: result.last_insert_rowid(),
            username: account.username.clone(),
            password_hash: account.password_hash.clone(),
            telegram_id: account.telegram_id.clone(),
            auth_token: account.auth_token.clone(),
        })
    }

    async fn account_by_token(&self, token: &str) -> Result<Option<Account>, StoreError> {
        let account = sqlx::query_as::<_, Account>(
            "SELECT id, username, password_hash, telegram_id, auth_token FROM users WHERE auth_token = ?",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;
        Ok(account)
    }

    async fn account_by_username(&self, username: &str) -> Result<Option<Account>, StoreError> {
        let account = sqlx::query_as::<_, Account>(
            "SELECT id, username, password_hash, telegram_id, auth_token FROM users WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(account)
    }

    async fn items_for(&self, owner_id: i64) -> Result<Vec<Item>, StoreError> {
        let items = sqlx::query_as::<_, Item>(
            "SELECT id, text, user_id FROM items WHERE user_id = ? ORDER BY id",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }

    async fn insert_item(&self, owner_id: i64, text: &str) -> Result<Item, StoreError> {
        let result = sqlx::query("INSERT INTO items (text, user_id) VALUES (?, ?)")
            .bind(text)
            .bind(owner_id)
            .execute(&self.pool)
            .await?;
        Ok(Item {
            id: result.last_insert_rowid(),
            text: text.to_string(),
            owner_id,
        })
    }

    async fn delete_item(&self, owner_id: i64, item_id: i64) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM items WHERE id = ? AND user_id = ?")
            .bind(item_id)
            .bind(owner_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn update_item(&self, owner_id: i64, item_id: i64, text: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE items SET text = ? WHERE id = ? AND user_id = ?")
            .bind(text)
            .bind(item_id)
            .bind(owner_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
