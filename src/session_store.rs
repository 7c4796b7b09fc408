//! Session persistence shared by the API client and its callers.
//!
//! The client never touches a concrete storage backend. It reads and writes
//! string entries through [`SessionStore`], which is handed to it at
//! construction. Entries carry an optional lifetime in days, mirroring cookie
//! expiry: an expired entry reads as absent.

use crate::error::{ClientError, ClientResult};
use crate::models::{AuthResponse, SessionTokens, User};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub const ACCESS_TOKEN_KEY: &str = "accessToken";
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";
pub const USER_KEY: &str = "user";
pub const REGISTRATION_DATA_KEY: &str = "registrationData";

pub const ACCESS_TOKEN_TTL_DAYS: u32 = 7;
pub const REFRESH_TOKEN_TTL_DAYS: u32 = 30;
pub const USER_TTL_DAYS: u32 = 7;

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

/// Key/value storage for session state.
pub trait SessionStore: Send + Sync {
    /// Returns the value for `key`, or `None` when missing or expired.
    fn get(&self, key: &str) -> Option<String>;

    /// Stores `value` under `key`. `ttl_days = None` never expires.
    fn set(&self, key: &str, value: &str, ttl_days: Option<u32>) -> ClientResult<()>;

    /// Removes `key`. Removing a missing key is not an error.
    fn delete(&self, key: &str) -> ClientResult<()>;
}

pub type SharedSessionStore = Arc<dyn SessionStore>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct StoredEntry {
    pub value: String,
    pub expires_at: Option<i64>,
}

impl StoredEntry {
    pub fn new(value: &str, ttl_days: Option<u32>) -> Self {
        Self {
            value: value.to_string(),
            expires_at: ttl_days.map(|days| now_millis() + i64::from(days) * DAY_MS),
        }
    }

    pub fn is_live(&self, now: i64) -> bool {
        self.expires_at.map_or(true, |exp| now < exp)
    }
}

/// In-process store. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    entries: Mutex<HashMap<String, StoredEntry>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> ClientResult<std::sync::MutexGuard<'_, HashMap<String, StoredEntry>>> {
        self.entries
            .lock()
            .map_err(|_| ClientError::Store("Session store lock is poisoned".to_string()))
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: &str) -> Option<String> {
        let mut entries = self.lock().ok()?;
        let now = now_millis();
        let found = entries
            .get(key)
            .map(|entry| (entry.is_live(now), entry.value.clone()));
        match found {
            Some((true, value)) => Some(value),
            Some((false, _)) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    fn set(&self, key: &str, value: &str, ttl_days: Option<u32>) -> ClientResult<()> {
        self.lock()?
            .insert(key.to_string(), StoredEntry::new(value, ttl_days));
        Ok(())
    }

    fn delete(&self, key: &str) -> ClientResult<()> {
        self.lock()?.remove(key);
        Ok(())
    }
}

/// Reads a token entry, treating an empty value as absent.
pub(crate) fn read_token(store: &dyn SessionStore, key: &str) -> Option<String> {
    store.get(key).filter(|t| !t.trim().is_empty())
}

pub fn is_authenticated(store: &dyn SessionStore) -> bool {
    read_token(store, ACCESS_TOKEN_KEY).is_some()
}

/// The user record cached at login, if it is present and still parses.
pub fn cached_user(store: &dyn SessionStore) -> Option<User> {
    let raw = store.get(USER_KEY)?;
    serde_json::from_str(&raw).ok()
}

pub fn persist_tokens(store: &dyn SessionStore, tokens: &SessionTokens) -> ClientResult<()> {
    store.set(
        ACCESS_TOKEN_KEY,
        &tokens.access_token,
        Some(ACCESS_TOKEN_TTL_DAYS),
    )?;
    store.set(
        REFRESH_TOKEN_KEY,
        &tokens.refresh_token,
        Some(REFRESH_TOKEN_TTL_DAYS),
    )
}

/// Stores everything a successful OTP verification hands back.
pub fn persist_session(store: &dyn SessionStore, auth: &AuthResponse) -> ClientResult<()> {
    persist_tokens(
        store,
        &SessionTokens {
            access_token: auth.access_token.clone(),
            refresh_token: auth.refresh_token.clone(),
        },
    )?;
    let user = serde_json::to_string(&auth.user)
        .map_err(|e| ClientError::Store(format!("Failed to serialize user: {e}")))?;
    store.set(USER_KEY, &user, Some(USER_TTL_DAYS))
}

/// Drops the access token, refresh token and cached user.
pub fn clear_session(store: &dyn SessionStore) -> ClientResult<()> {
    for key in [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_KEY] {
        store.delete(key)?;
    }
    Ok(())
}

/// [`clear_session`] plus any pending onboarding data.
pub fn clear_all_auth_data(store: &dyn SessionStore) -> ClientResult<()> {
    clear_session(store)?;
    store.delete(REGISTRATION_DATA_KEY)
}

pub(crate) fn now_millis() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}
