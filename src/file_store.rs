use crate::error::{ClientError, ClientResult};
use crate::session_store::{now_millis, SessionStore, StoredEntry};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

pub const SESSION_FILE: &str = "session.json";
const APP_DIR: &str = "zeefit";

#[derive(Debug, Clone, Default, Serialize)]
struct SessionFile {
    entries: BTreeMap<String, FileEntry>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct FileEntry {
    value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    expires_at: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
struct SessionFileRaw {
    entries: Option<BTreeMap<String, FileEntryRaw>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileEntryRaw {
    value: Option<String>,
    expires_at: Option<i64>,
}

fn normalize_file(raw: SessionFileRaw) -> SessionFile {
    let now = now_millis();
    let entries = raw
        .entries
        .unwrap_or_default()
        .into_iter()
        .filter_map(|(key, entry)| {
            let value = entry.value?;
            let stored = StoredEntry {
                value,
                expires_at: entry.expires_at,
            };
            if key.is_empty() || !stored.is_live(now) {
                return None;
            }
            Some((
                key,
                FileEntry {
                    value: stored.value,
                    expires_at: stored.expires_at,
                },
            ))
        })
        .collect();
    SessionFile { entries }
}

/// Session store backed by a JSON file, standing in for a browser cookie jar.
///
/// The file is loaded lazily, cached per instance and rewritten on every
/// mutation. A missing or corrupt file reads as an empty session.
#[derive(Debug)]
pub struct FileSessionStore {
    path: PathBuf,
    cache: Mutex<Option<SessionFile>>,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: Mutex::new(None),
        }
    }

    /// `<data dir>/zeefit/session.json` for the current user.
    pub fn default_path() -> ClientResult<PathBuf> {
        let mut dir = dirs::data_dir()
            .ok_or_else(|| ClientError::Store("Failed to resolve data directory".to_string()))?;
        dir.push(APP_DIR);
        dir.push(SESSION_FILE);
        Ok(dir)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_loaded(&self) -> ClientResult<MutexGuard<'_, Option<SessionFile>>> {
        let mut cache = self
            .cache
            .lock()
            .map_err(|_| ClientError::Store("Session cache lock is poisoned".to_string()))?;
        if cache.is_none() {
            *cache = Some(self.load_from_disk());
        }
        Ok(cache)
    }

    fn load_from_disk(&self) -> SessionFile {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(_) => return SessionFile::default(),
        };
        match serde_json::from_str::<SessionFileRaw>(&raw) {
            Ok(parsed) => normalize_file(parsed),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), "ignoring corrupt session file: {e}");
                SessionFile::default()
            }
        }
    }

    fn write_to_disk(&self, file: &SessionFile) -> ClientResult<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .map_err(|e| ClientError::Store(format!("Failed to create session directory: {e}")))?;
        }
        let body = serde_json::to_string_pretty(file)
            .map_err(|e| ClientError::Store(format!("Failed to serialize session: {e}")))?;
        fs::write(&self.path, body)
            .map_err(|e| ClientError::Store(format!("Failed to write session file: {e}")))?;
        restrict_permissions(&self.path)
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> ClientResult<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
        .map_err(|e| ClientError::Store(format!("Failed to restrict session file permissions: {e}")))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> ClientResult<()> {
    Ok(())
}

impl SessionStore for FileSessionStore {
    fn get(&self, key: &str) -> Option<String> {
        let cache = self.lock_loaded().ok()?;
        let entry = cache.as_ref()?.entries.get(key)?;
        let stored = StoredEntry {
            value: entry.value.clone(),
            expires_at: entry.expires_at,
        };
        stored.is_live(now_millis()).then_some(stored.value)
    }

    fn set(&self, key: &str, value: &str, ttl_days: Option<u32>) -> ClientResult<()> {
        let mut cache = self.lock_loaded()?;
        let mut next = cache.clone().unwrap_or_default();
        let stored = StoredEntry::new(value, ttl_days);
        next.entries.insert(
            key.to_string(),
            FileEntry {
                value: stored.value,
                expires_at: stored.expires_at,
            },
        );
        self.write_to_disk(&next)?;
        *cache = Some(next);
        Ok(())
    }

    fn delete(&self, key: &str) -> ClientResult<()> {
        let mut cache = self.lock_loaded()?;
        let mut next = cache.clone().unwrap_or_default();
        if next.entries.remove(key).is_none() {
            return Ok(());
        }
        self.write_to_disk(&next)?;
        *cache = Some(next);
        Ok(())
    }
}
