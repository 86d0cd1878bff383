use crate::error::{TreeError, TreeResult};
use crate::traits::{ConfigScope, ConfigurationStore};
use serde_json::Value;

pub const DIRECTORY_SEPARATOR_KEY: &str = "tree.directorySeparator";
pub const NUM_BUILDS_KEY: &str = "tree.numBuilds";

pub const DEFAULT_DIRECTORY_SEPARATOR: &str = " / ";
/// Jenkins keeps far more history than anyone scrolls through in a tree.
pub const DEFAULT_NUM_BUILDS: usize = 50;

/// Display settings for a tree. Changing them forces a refresh but never edits cached data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeSettings {
    pub directory_separator: String,
    pub num_builds: usize,
}

impl Default for TreeSettings {
    fn default() -> Self {
        Self {
            directory_separator: DEFAULT_DIRECTORY_SEPARATOR.to_string(),
            num_builds: DEFAULT_NUM_BUILDS,
        }
    }
}

impl TreeSettings {
    /// Reads the tree settings, falling back to defaults for missing or mistyped values.
    pub async fn load(store: &dyn ConfigurationStore) -> TreeResult<Self> {
        let mut settings = Self::default();

        match read(store, DIRECTORY_SEPARATOR_KEY).await? {
            Some(Value::String(sep)) => settings.directory_separator = sep,
            Some(other) => {
                tracing::warn!(value = %other, "ignoring non-string {DIRECTORY_SEPARATOR_KEY}");
            }
            None => {}
        }

        match read(store, NUM_BUILDS_KEY).await? {
            Some(value) => match value.as_u64().and_then(|n| usize::try_from(n).ok()) {
                Some(n) if n > 0 => settings.num_builds = n,
                _ => tracing::warn!(value = %value, "ignoring invalid {NUM_BUILDS_KEY}"),
            },
            None => {}
        }

        Ok(settings)
    }

    pub async fn save_directory_separator(
        store: &dyn ConfigurationStore,
        separator: &str,
    ) -> TreeResult<()> {
        store
            .update(
                DIRECTORY_SEPARATOR_KEY,
                Value::String(separator.to_string()),
                ConfigScope::Global,
            )
            .await
            .map_err(|e| TreeError::persistence(format!("{e:#}")))
    }
}

async fn read(store: &dyn ConfigurationStore, key: &str) -> TreeResult<Option<Value>> {
    store
        .get(key)
        .await
        .map_err(|e| TreeError::persistence(format!("{e:#}")))
}
