use super::*;

use rand::rngs::OsRng;
use rand::RngCore;

pub(super) const SESSION_TTL_SECS: u64 = 24 * 60 * 60;
const SESSION_ID_BYTES: usize = 16;

#[derive(Clone, Debug, PartialEq, Eq)]
pub(super) struct Session {
    pub(super) account_id: i64,
    pub(super) username: String,
    pub(super) auth_token: String,
    pub(super) created_at: u64,
}

impl Session {
    fn is_expired(&self, now: u64, ttl_secs: u64) -> bool {
        now.saturating_sub(self.created_at) > ttl_secs
    }
}

/// Backing table for web sessions, keyed by session id.
#[async_trait]
pub(super) trait SessionStore: Send + Sync {
    async fn get(&self, id: &str) -> Option<Session>;

    async fn set(&self, id: String, session: Session);

    async fn delete(&self, id: &str) -> Option<Session>;

    /// Drops every session older than `ttl_secs`; returns how many were removed.
    async fn sweep(&self, now: u64, ttl_secs: u64) -> usize;
}

#[derive(Default)]
pub(super) struct MemorySessionStore {
    sessions: Mutex<HashMap<String, Session>>,
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, id: &str) -> Option<Session> {
        self.sessions.lock().await.get(id).cloned()
    }

    async fn set(&self, id: String, session: Session) {
        self.sessions.lock().await.insert(id, session);
    }

    async fn delete(&self, id: &str) -> Option<Session> {
        self.sessions.lock().await.remove(id)
    }

    async fn sweep(&self, now: u64, ttl_secs: u64) -> usize {
        let mut sessions = self.sessions.lock().await;
        let before = sessions.len();
        sessions.retain(|_, session| !session.is_expired(now, ttl_secs));
        before - sessions.len()
    }
}

pub(super) struct Sessions {
    store: Arc<dyn SessionStore>,
    ttl_secs: u64,
}

impl Sessions {
    pub(super) fn new(store: Arc<dyn SessionStore>, ttl_secs: u64) -> Self {
        Sessions { store, ttl_secs }
    }

    pub(super) fn in_memory() -> Self {
        Sessions::new(Arc::new(MemorySessionStore::default()), SESSION_TTL_SECS)
    }

    pub(super) async fn create(&self, account: &Account) -> String {
        self.create_at(account, now_ts()).await
    }

    pub(super) async fn create_at(&self, account: &Account, now: u64) -> String {
        let swept = self.store.sweep(now, self.ttl_secs).await;
        if swept > 0 {
            debug!("swept {} expired sessions", swept);
        }
        let id = new_session_id();
        self.store
            .set(
                id.clone(),
                Session {
                    account_id: account.id,
                    username: account.username.clone(),
                    auth_token: account.auth_token.clone(),
                    created_at: now,
                },
            )
            .await;
        id
    }

    pub(super) async fn resolve(&self, id: Option<&str>) -> Option<Session> {
        self.resolve_at(id, now_ts()).await
    }

    /// Looks up a live session. An expired entry is removed and reported absent.
    pub(super) async fn resolve_at(&self, id: Option<&str>, now: u64) -> Option<Session> {
        let id = id.filter(|id| !id.is_empty())?;
        let session = self.store.get(id).await?;
        if session.is_expired(now, self.ttl_secs) {
            self.store.delete(id).await;
            debug!("session expired for user {}", session.username);
            return None;
        }
        Some(session)
    }

    pub(super) async fn destroy(&self, id: &str) {
        if let Some(session) = self.store.delete(id).await {
            debug!("session closed for user {}", session.username);
        }
    }
}

fn new_session_id() -> String {
    let mut bytes = [0u8; SESSION_ID_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}
