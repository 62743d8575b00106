use super::*;

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub(super) struct Account {
    pub(super) id: i64,
    pub(super) username: String,
    pub(super) password_hash: Option<String>,
    pub(super) telegram_id: Option<String>,
    pub(super) auth_token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub(super) struct Item {
    pub(super) id: i64,
    pub(super) text: String,
    #[sqlx(rename = "user_id")]
    pub(super) owner_id: i64,
}

#[derive(Debug, Clone)]
pub(super) struct NewAccount {
    pub(super) username: String,
    pub(super) password_hash: Option<String>,
    pub(super) telegram_id: Option<String>,
    pub(super) auth_token: String,
}

#[derive(Debug, thiserror::Error)]
pub(super) enum StoreError {
    #[error("a row with the same unique key already exists")]
    Duplicate,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    /// Maps unique-constraint violations on insert to `Duplicate`.
    pub(super) fn from_insert(err: sqlx::Error) -> Self {
        let unique = err
            .as_database_error()
            .map(|db| db.is_unique_violation())
            .unwrap_or(false);
        if unique {
            StoreError::Duplicate
        } else {
            StoreError::Database(err)
        }
    }
}

/// Accounts and their items. Every item query is scoped by owner id.
#[async_trait]
pub(super) trait Store: Send + Sync {
    async fn init_schema(&self) -> Result<(), StoreError>;

    async fn create_account(&self, account: &NewAccount) -> Result<Account, StoreError>;

    async fn account_by_token(&self, token: &str) -> Result<Option<Account>, StoreError>;

    async fn account_by_username(&self, username: &str) -> Result<Option<Account>, StoreError>;

    /// Items owned by `owner_id`, ascending by id.
    async fn items_for(&self, owner_id: i64) -> Result<Vec<Item>, StoreError>;

    async fn insert_item(&self, owner_id: i64, text: &str) -> Result<Item, StoreError>;

    /// Returns false when no row matched both `item_id` and `owner_id`.
    async fn delete_item(&self, owner_id: i64, item_id: i64) -> Result<bool, StoreError>;

    /// Returns false when no row matched both `item_id` and `owner_id`.
    async fn update_item(&self, owner_id: i64, item_id: i64, text: &str) -> Result<bool, StoreError>;
}

pub(super) async fn connect_store(database_url: &str) -> Result<Arc<dyn Store>> {
    if database_url.starts_with("sqlite:") {
        let store = SqliteStore::connect(database_url)
            .await
            .context("connect to sqlite")?;
        Ok(Arc::new(store))
    } else if database_url.starts_with("mysql:") {
        let store = MysqlStore::connect(database_url)
            .await
            .context("connect to mysql")?;
        Ok(Arc::new(store))
    } else {
        Err(anyhow!("unsupported database_url: {}", database_url))
    }
}
