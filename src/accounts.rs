use super::*;

#[derive(Debug, thiserror::Error)]
pub(super) enum AccountError {
    #[error("username and password are required")]
    MissingCredentials,
    #[error("an account with this username or telegram id already exists")]
    AlreadyExists,
    #[error("password hashing failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),
    #[error("password hashing task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for AccountError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate => AccountError::AlreadyExists,
            other => AccountError::Store(other),
        }
    }
}

pub(super) async fn register(
    store: &dyn Store,
    username: &str,
    password: &str,
    cost: u32,
) -> Result<Account, AccountError> {
    let username = username.trim();
    if username.is_empty() || password.is_empty() {
        return Err(AccountError::MissingCredentials);
    }
    let password = password.to_string();
    let password_hash = tokio::task::spawn_blocking(move || bcrypt::hash(password, cost)).await??;
    let account = store
        .create_account(&NewAccount {
            username: username.to_string(),
            password_hash: Some(password_hash),
            telegram_id: None,
            auth_token: new_auth_token(),
        })
        .await?;
    info!("registered web account {} (id {})", account.username, account.id);
    Ok(account)
}

/// Accounts without a password hash only exist for the chat bot and never log in.
pub(super) async fn authenticate(
    store: &dyn Store,
    username: &str,
    password: &str,
) -> Result<Option<Account>, AccountError> {
    let Some(account) = store.account_by_username(username.trim()).await? else {
        return Ok(None);
    };
    let Some(hash) = account.password_hash.clone() else {
        return Ok(None);
    };
    let password = password.to_string();
    let verified = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash)).await?;
    match verified {
        Ok(true) => Ok(Some(account)),
        Ok(false) => Ok(None),
        Err(err) => {
            warn!("unreadable password hash for {}: {}", account.username, err);
            Ok(None)
        }
    }
}

/// Creates a chat-only account and returns it with its fresh auth token.
pub(super) async fn provision(
    store: &dyn Store,
    username: &str,
    telegram_id: Option<&str>,
) -> Result<Account, AccountError> {
    let username = username.trim();
    if username.is_empty() {
        return Err(AccountError::MissingCredentials);
    }
    let account = store
        .create_account(&NewAccount {
            username: username.to_string(),
            password_hash: None,
            telegram_id: telegram_id.map(|id| id.to_string()),
            auth_token: new_auth_token(),
        })
        .await?;
    info!("provisioned chat account {} (id {})", account.username, account.id);
    Ok(account)
}

fn new_auth_token() -> String {
    Uuid::new_v4().to_string()
}
