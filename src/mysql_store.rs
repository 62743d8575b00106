use super::*;

use std::time::Duration;

use sqlx::mysql::{MySqlPool, MySqlPoolOptions};

const MYSQL_USERS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id BIGINT NOT NULL AUTO_INCREMENT PRIMARY KEY,
    username VARCHAR(255) NOT NULL UNIQUE,
    password_hash VARCHAR(255) NULL,
    telegram_id VARCHAR(64) NULL UNIQUE,
    auth_token VARCHAR(64) NOT NULL UNIQUE,
    created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
    updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP
) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4
"#;

const MYSQL_ITEMS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS items (
    id BIGINT NOT NULL AUTO_INCREMENT PRIMARY KEY,
    text TEXT NOT NULL,
    user_id BIGINT NOT NULL,
    CONSTRAINT fk_items_user FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4
"#;

pub(super) struct MysqlStore {
    pool: MySqlPool,
}

impl MysqlStore {
    pub(super) async fn connect(url: &str) -> Result<Self, StoreError> {
        let pool = MySqlPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(30))
            .connect(url)
            .await?;
        Ok(MysqlStore { pool })
    }

    async fn item_exists(&self, owner_id: i64, item_id: i64) -> Result<bool, StoreError> {
        let row = sqlx::query("SELECT id FROM items WHERE id = ? AND user_id = ?")
            .bind(item_id)
            .bind(owner_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }
}

#[async_trait]
impl Store for MysqlStore {
    async fn init_schema(&self) -> Result<(), StoreError> {
        sqlx::query(MYSQL_USERS_TABLE).execute(&self.pool).await?;
        sqlx::query(MYSQL_ITEMS_TABLE).execute(&self.pool).await?;
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
            id: result.last_insert_id() as i64,
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
            id: result.last_insert_id() as i64,
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
        if result.rows_affected() > 0 {
            return Ok(true);
        }
        // MySQL reports zero affected rows when the text is unchanged.
        self.item_exists(owner_id, item_id).await
    }
}
