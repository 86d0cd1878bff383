//! [`ConfigurationStore`] implementations: a JSON settings file and an in-memory map.
//!
//! The file keeps one object per scope:
//!
//! ```json
//! { "global": { "historyProject.list": [ { "name": "api", "branch": "main" } ] },
//!   "workspace": { "tree.directorySeparator": " > " } }
//! ```
//!
//! Reads prefer the workspace value. Writes replace the whole file through a
//! temp file in the same directory followed by a rename, so a crash never
//! leaves a half-written settings file behind.

use crate::traits::{ConfigScope, ConfigurationStore};
use async_trait::async_trait;
use color_eyre::eyre::{eyre, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

#[derive(Debug, Default, Serialize, Deserialize)]
struct SettingsFile {
    #[serde(default)]
    global: Map<String, Value>,
    #[serde(default)]
    workspace: Map<String, Value>,
}

impl SettingsFile {
    fn scope_mut(&mut self, scope: ConfigScope) -> &mut Map<String, Value> {
        match scope {
            ConfigScope::Global => &mut self.global,
            ConfigScope::Workspace => &mut self.workspace,
        }
    }
}

pub struct FileConfigStore {
    path: PathBuf,
    /// Serialises read-modify-write cycles of the file within this process.
    write_lock: Arc<Mutex<()>>,
}

impl FileConfigStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn read_settings(path: &Path) -> Result<SettingsFile> {
    let content = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(SettingsFile::default()),
        Err(e) => return Err(eyre!("Failed to read settings from {path:?}: {e}")),
    };
    if content.trim().is_empty() {
        return Ok(SettingsFile::default());
    }
    serde_json::from_str(&content).map_err(|e| eyre!("Failed to parse settings in {path:?}: {e}"))
}

fn write_settings_atomic(path: &Path, settings: &SettingsFile) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir)
        .map_err(|e| eyre!("Failed to create settings directory {dir:?}: {e}"))?;

    let content = serde_json::to_string_pretty(settings)?;
    let mut tmp = tempfile::NamedTempFile::new_in(&dir)
        .map_err(|e| eyre!("Failed to create temp file in {dir:?}: {e}"))?;
    tmp.write_all(content.as_bytes())?;
    tmp.write_all(b"\n")?;
    tmp.as_file_mut().sync_all()?;
    tmp.persist(path)
        .map_err(|e| eyre!("Failed to replace {path:?}: {}", e.error))?;
    Ok(())
}

#[async_trait]
impl ConfigurationStore for FileConfigStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let path = self.path.clone();
        let key = key.to_string();
        tokio::task::spawn_blocking(move || -> Result<Option<Value>> {
            let mut settings = read_settings(&path)?;
            Ok(settings
                .workspace
                .remove(&key)
                .or_else(|| settings.global.remove(&key)))
        })
        .await
        .map_err(|e| eyre!("settings read task failed: {e}"))?
    }

    async fn update(&self, key: &str, value: Value, scope: ConfigScope) -> Result<()> {
        let path = self.path.clone();
        let key = key.to_string();
        let lock = self.write_lock.clone();
        tokio::task::spawn_blocking(move || -> Result<()> {
            let _guard = lock
                .lock()
                .map_err(|_| eyre!("settings write lock poisoned"))?;
            let mut settings = read_settings(&path)?;
            settings.scope_mut(scope).insert(key.clone(), value);
            write_settings_atomic(&path, &settings)?;
            tracing::debug!(?path, %key, ?scope, "settings updated");
            Ok(())
        })
        .await
        .map_err(|e| eyre!("settings write task failed: {e}"))?
    }
}

/// Keeps settings in memory; used by tests and embedders without a settings file.
#[derive(Default)]
pub struct MemoryConfigStore {
    values: Mutex<HashMap<(String, bool), Value>>,
    fail_writes: std::sync::atomic::AtomicBool,
}

impl MemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every following `update` fail, to exercise persistence errors.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes
            .store(fail, std::sync::atomic::Ordering::SeqCst);
    }

    /// Serialized form of a key's effective value, for byte-level comparisons.
    pub fn snapshot(&self, key: &str) -> Option<String> {
        let values = self.values.lock().ok()?;
        values
            .get(&(key.to_string(), true))
            .or_else(|| values.get(&(key.to_string(), false)))
            .map(Value::to_string)
    }
}

#[async_trait]
impl ConfigurationStore for MemoryConfigStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let values = self
            .values
            .lock()
            .map_err(|_| eyre!("settings lock poisoned"))?;
        Ok(values
            .get(&(key.to_string(), true))
            .or_else(|| values.get(&(key.to_string(), false)))
            .cloned())
    }

    async fn update(&self, key: &str, value: Value, scope: ConfigScope) -> Result<()> {
        if self.fail_writes.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(eyre!("settings store is read-only"));
        }
        let mut values = self
            .values
            .lock()
            .map_err(|_| eyre!("settings lock poisoned"))?;
        values.insert((key.to_string(), scope == ConfigScope::Workspace), value);
        Ok(())
    }
}
