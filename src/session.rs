use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::ACCESS_TOKEN_ENV;
use crate::cache::{Cache, SESSION_FILE};
use crate::types::{AccessToken, TokenStore};

/// Current time in epoch seconds
pub fn epoch_s() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp()).unwrap_or_default()
}

/// Persisted connection state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub id: String,
    pub user_name: Option<String>,
    pub tenant: Option<String>,
    #[serde(default)]
    pub tokens: TokenStore,
}

/// Connection to Microsoft 365 for one invocation.
///
/// Created empty or restored from the cache, started by `begin` after a
/// successful login and finished by `end`, which removes the cache file.
#[derive(Debug)]
pub struct Session {
    state: RwLock<SessionState>,
    cache: Option<Cache>,
    static_token: Option<String>,
}

impl Session {
    /// Restore the persisted session, honoring a static token from the environment
    pub fn restore() -> Result<Self> {
        let cache = Cache::new()?;
        let state: SessionState = cache.load(SESSION_FILE)?.unwrap_or_default();
        let static_token = std::env::var(ACCESS_TOKEN_ENV)
            .ok()
            .filter(|t| !t.trim().is_empty());
        Ok(Self::with_state(state, Some(cache), static_token))
    }

    /// Session that is never persisted
    pub fn in_memory() -> Self {
        Self::with_state(SessionState::default(), None, None)
    }

    /// In-memory session using `token` for every resource
    pub fn with_static_token(token: impl Into<String>) -> Self {
        Self::with_state(SessionState::default(), None, Some(token.into()))
    }

    /// Session persisted in `cache`
    pub fn in_cache(cache: Cache) -> Result<Self> {
        let state: SessionState = cache.load(SESSION_FILE)?.unwrap_or_default();
        Ok(Self::with_state(state, Some(cache), None))
    }

    fn with_state(mut state: SessionState, cache: Option<Cache>, static_token: Option<String>) -> Self {
        if state.id.is_empty() {
            state.id = Uuid::new_v4().to_string();
        }
        Self {
            state: RwLock::new(state),
            cache,
            static_token,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, SessionState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, SessionState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist(&self) -> Result<()> {
        match &self.cache {
            Some(cache) => cache.save(SESSION_FILE, &*self.read()),
            None => Ok(()),
        }
    }

    /// Whether requests can be authenticated
    pub fn is_active(&self) -> bool {
        self.static_token.is_some() || self.read().tokens.refresh_token().is_some()
    }

    /// Start a new session after login
    pub fn begin(
        &self,
        user_name: Option<String>,
        tenant: Option<String>,
        refresh_token: AccessToken,
    ) -> Result<()> {
        {
            let mut state = self.write();
            *state = SessionState {
                id: Uuid::new_v4().to_string(),
                user_name,
                tenant,
                tokens: TokenStore::default(),
            };
            state
                .tokens
                .insert("refresh_token".to_string(), refresh_token);
        }
        self.persist()
    }

    /// Forget all tokens and remove the persisted session
    pub fn end(&self) -> Result<()> {
        {
            let mut state = self.write();
            *state = SessionState {
                id: Uuid::new_v4().to_string(),
                ..SessionState::default()
            };
        }
        match &self.cache {
            Some(cache) => cache.delete(SESSION_FILE),
            None => Ok(()),
        }
    }

    /// Unexpired access token for `resource`
    pub fn cached_token(&self, resource: &str) -> Option<AccessToken> {
        self.read()
            .tokens
            .get(resource)
            .filter(|t| t.is_valid_at(epoch_s()))
            .cloned()
    }

    pub fn refresh_token(&self) -> Option<AccessToken> {
        self.read().tokens.refresh_token().cloned()
    }

    pub fn store_token(&self, resource: &str, token: AccessToken) -> Result<()> {
        self.write().tokens.insert(resource.to_string(), token);
        self.persist()
    }

    pub fn static_token(&self) -> Option<&str> {
        self.static_token.as_deref()
    }

    pub fn id(&self) -> String {
        self.read().id.clone()
    }

    pub fn user_name(&self) -> Option<String> {
        self.read().user_name.clone()
    }

    pub fn tenant(&self) -> Option<String> {
        self.read().tenant.clone()
    }
}
