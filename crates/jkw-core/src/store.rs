//! The persisted, ordered list of tracked projects.
//!
//! Reads and writes are not synchronised here. Whoever mutates the list owns the
//! load → mutate → save critical section (see `history::HistoryOrderingService`).

use crate::error::{TreeError, TreeResult};
use crate::model::{ProjectKey, TrackedProject};
use crate::traits::{ConfigScope, ConfigurationStore};
use std::collections::HashSet;
use std::sync::Arc;

pub const PROJECT_LIST_KEY: &str = "historyProject.list";

#[derive(Clone)]
pub struct ProjectListStore {
    config: Arc<dyn ConfigurationStore>,
}

impl ProjectListStore {
    pub fn new(config: Arc<dyn ConfigurationStore>) -> Self {
        Self { config }
    }

    /// The persisted list verbatim, in stored order. An unset key is an empty list.
    pub async fn load(&self) -> TreeResult<Vec<TrackedProject>> {
        let value = self
            .config
            .get(PROJECT_LIST_KEY)
            .await
            .map_err(|e| TreeError::persistence(format!("{e:#}")))?;
        match value {
            None | Some(serde_json::Value::Null) => Ok(Vec::new()),
            Some(value) => serde_json::from_value(value).map_err(|e| {
                TreeError::persistence(format!("malformed {PROJECT_LIST_KEY}: {e}"))
            }),
        }
    }

    /// Replaces the persisted list. Later duplicates of a key are dropped.
    pub async fn save(&self, list: &[TrackedProject]) -> TreeResult<()> {
        let list = dedup_keys(list);
        let value = serde_json::to_value(&list)
            .map_err(|e| TreeError::persistence(format!("failed to encode project list: {e}")))?;
        self.config
            .update(PROJECT_LIST_KEY, value, ConfigScope::Global)
            .await
            .map_err(|e| TreeError::persistence(format!("{e:#}")))?;
        tracing::info!(count = list.len(), "tracked project list saved");
        Ok(())
    }

    /// Appends `project` unless its key is already tracked. Returns whether it was added.
    pub async fn track(&self, project: TrackedProject) -> TreeResult<bool> {
        let mut list = self.load().await?;
        let key = project.key();
        if list.iter().any(|p| p.key() == key) {
            return Ok(false);
        }
        list.push(project);
        self.save(&list).await?;
        Ok(true)
    }
}

/// `list` without the entries whose key is in `keys`, survivors kept in order.
pub fn remove(list: &[TrackedProject], keys: &HashSet<ProjectKey>) -> Vec<TrackedProject> {
    list.iter()
        .filter(|p| !keys.contains(&p.key()))
        .cloned()
        .collect()
}

fn dedup_keys(list: &[TrackedProject]) -> Vec<TrackedProject> {
    let mut seen = HashSet::with_capacity(list.len());
    let mut out = Vec::with_capacity(list.len());
    for project in list {
        if seen.insert(project.key()) {
            out.push(project.clone());
        } else {
            tracing::warn!(
                name = %project.name,
                branch = ?project.branch,
                "dropping duplicate tracked project"
            );
        }
    }
    out
}
