use crate::model::{Build, Job};
use crate::scope::Scope;
use async_trait::async_trait;
use color_eyre::eyre::Result;

/// Supplies job and build listings. Implementations should stop work, or at
/// least not block, once `scope` is cancelled; the tree discards late results either way.
#[async_trait]
pub trait RemoteJobSource: Send + Sync {
    /// With `parent`, its direct children. Without, every job on the server,
    /// nested ones included, folders included.
    async fn get_jobs(&self, parent: Option<&Job>, scope: &Scope) -> Result<Vec<Job>>;
    /// At most `limit` builds of `job`, newest first.
    async fn get_builds(&self, job: &Job, limit: usize, scope: &Scope) -> Result<Vec<Build>>;
    fn open_browser_at(&self, url: &str) -> Result<()>;
    async fn trigger_build(&self, job: &Job, branch: Option<&str>) -> Result<()>;
}

/// Blocking yes/no style question. `None` means declined or dismissed.
#[async_trait]
pub trait ConfirmationPrompt: Send + Sync {
    async fn ask(&self, message: &str, options: &[&str]) -> Option<String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigScope {
    Global,
    Workspace,
}

/// Key-value settings persistence.
#[async_trait]
pub trait ConfigurationStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>>;
    async fn update(&self, key: &str, value: serde_json::Value, scope: ConfigScope) -> Result<()>;
}

/// Fire-and-forget messages for the operator.
pub trait NotificationSink: Send + Sync {
    fn info(&self, message: &str);
    fn error(&self, message: &str);
}
