//! Refresh lifecycle of one tree instance.
//!
//! `Idle → Refreshing → Idle`. A refresh while already refreshing discards the
//! previous scope and stays in `Refreshing`; nothing is queued and the latest
//! request always wins. The tree returns to `Idle` once a root listing for the
//! current generation finishes, successfully or not.

use crate::cache::BuildTreeCache;
use crate::error::TreeResult;
use crate::events::TreeKind;
use crate::model::{BuildNode, JobNode};
use crate::settings::TreeSettings;
use std::sync::{Mutex, PoisonError, RwLock};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeStatus {
    Idle,
    Refreshing,
}

pub struct TreeController {
    cache: BuildTreeCache,
    status: Mutex<TreeStatus>,
    settings: RwLock<TreeSettings>,
}

impl TreeController {
    pub fn new(cache: BuildTreeCache, settings: TreeSettings) -> Self {
        cache.set_build_limit(settings.num_builds);
        Self {
            cache,
            status: Mutex::new(TreeStatus::Idle),
            settings: RwLock::new(settings),
        }
    }

    pub fn kind(&self) -> TreeKind {
        self.cache.tree()
    }

    pub fn status(&self) -> TreeStatus {
        *self.status.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn generation(&self) -> u64 {
        self.cache.generation()
    }

    pub fn settings(&self) -> TreeSettings {
        self.settings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn cache(&self) -> &BuildTreeCache {
        &self.cache
    }

    /// Abandons any outstanding listing, starts a new generation and notifies
    /// the UI, which is expected to re-query roots and expanded nodes.
    pub fn refresh(&self) -> u64 {
        let mut status = self.status.lock().unwrap_or_else(PoisonError::into_inner);
        *status = TreeStatus::Refreshing;
        let generation = self.cache.invalidate();
        tracing::debug!(tree = ?self.kind(), generation, "tree refresh requested");
        generation
    }

    /// Root nodes under the current generation. Empty if superseded mid-flight.
    pub async fn roots(&self) -> TreeResult<Vec<JobNode>> {
        let generation = self.begin_listing();
        let result = self.cache.list_roots().await;
        self.settle(generation);
        result
    }

    /// Builds below `node` under the current generation. Empty if superseded mid-flight.
    pub async fn expand(&self, node: &JobNode) -> TreeResult<Vec<BuildNode>> {
        self.cache.list_children(&node.job).await
    }

    /// Stores new display settings and forces a refresh. Cached data is only
    /// affected through that invalidation.
    pub fn apply_settings(&self, settings: TreeSettings) -> u64 {
        self.cache.set_build_limit(settings.num_builds);
        *self
            .settings
            .write()
            .unwrap_or_else(PoisonError::into_inner) = settings;
        self.refresh()
    }

    fn begin_listing(&self) -> u64 {
        let mut status = self.status.lock().unwrap_or_else(PoisonError::into_inner);
        *status = TreeStatus::Refreshing;
        self.cache.generation()
    }

    fn settle(&self, generation: u64) {
        let mut status = self.status.lock().unwrap_or_else(PoisonError::into_inner);
        if self.cache.generation() == generation {
            *status = TreeStatus::Idle;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::RootSelection;
    use crate::events::TreeEvent;
    use crate::model::JobType;
    use crate::test_support::{build, job, ScriptedSource};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use tokio::sync::mpsc;

    fn controller(
        source: Arc<ScriptedSource>,
    ) -> (TreeController, mpsc::UnboundedReceiver<TreeEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let cache = BuildTreeCache::new(TreeKind::Jobs, source, RootSelection::AllJobs, tx);
        (TreeController::new(cache, TreeSettings::default()), rx)
    }

    fn names(nodes: &[JobNode]) -> Vec<String> {
        nodes.iter().map(|n| n.job.full_name.clone()).collect()
    }

    #[tokio::test]
    async fn starts_idle_and_settles_after_listing() {
        let source = Arc::new(ScriptedSource::new());
        source.push_jobs(Ok(vec![job("a", JobType::Pipeline)]));
        let (ctl, _rx) = controller(source);
        assert_eq!(ctl.status(), TreeStatus::Idle);

        ctl.refresh();
        assert_eq!(ctl.status(), TreeStatus::Refreshing);
        ctl.roots().await.unwrap();
        assert_eq!(ctl.status(), TreeStatus::Idle);
    }

    #[tokio::test]
    async fn failed_listing_still_returns_to_idle() {
        let source = Arc::new(ScriptedSource::new());
        source.push_jobs(Err("connection refused".to_string()));
        let (ctl, _rx) = controller(source);
        ctl.refresh();
        assert!(ctl.roots().await.is_err());
        assert_eq!(ctl.status(), TreeStatus::Idle);
    }

    #[tokio::test]
    async fn refresh_fires_invalidation_with_new_generation() {
        let source = Arc::new(ScriptedSource::new());
        let (ctl, mut rx) = controller(source);
        let generation = ctl.refresh();
        assert_eq!(
            rx.try_recv().unwrap(),
            TreeEvent::Invalidated {
                tree: TreeKind::Jobs,
                generation
            }
        );
        assert_eq!(ctl.generation(), generation);
    }

    #[tokio::test]
    async fn second_refresh_wins_over_slow_first() {
        let source = Arc::new(ScriptedSource::new());
        let slow = source.push_gated_jobs();
        source.push_jobs(Ok(vec![job("new", JobType::Pipeline)]));
        let (ctl, _rx) = controller(source);

        ctl.refresh();
        let first = ctl.roots();
        let (first, second) = tokio::join!(first, async {
            tokio::task::yield_now().await;
            ctl.refresh();
            let second = ctl.roots().await;
            let _ = slow.send(Ok(vec![job("old", JobType::Pipeline)]));
            second
        });

        assert!(first.unwrap().is_empty());
        assert_eq!(names(&second.unwrap()), vec!["new"]);
        assert_eq!(names(&ctl.cache().cached_roots().unwrap()), vec!["new"]);
        assert_eq!(ctl.status(), TreeStatus::Idle);
    }

    #[tokio::test]
    async fn superseded_listing_leaves_tree_refreshing() {
        let source = Arc::new(ScriptedSource::new());
        let slow = source.push_gated_jobs();
        let (ctl, _rx) = controller(source);

        let (first, ()) = tokio::join!(ctl.roots(), async {
            tokio::task::yield_now().await;
            ctl.refresh();
        });
        drop(slow);
        assert!(first.unwrap().is_empty());
        assert_eq!(ctl.status(), TreeStatus::Refreshing);
    }

    #[tokio::test]
    async fn expand_lists_builds_of_node() {
        let source = Arc::new(ScriptedSource::new());
        source.push_builds(Ok(vec![build(9, true), build(8, false)]));
        let (ctl, _rx) = controller(source);
        let node = JobNode::new(job("svc", JobType::Pipeline));
        let builds = ctl.expand(&node).await.unwrap();
        assert_eq!(builds.len(), 2);
        assert!(builds[0].build.building);
        assert_eq!(builds[0].build.result, None);
    }

    #[tokio::test]
    async fn expand_cancelled_mid_call_returns_nothing() {
        let source = Arc::new(ScriptedSource::new());
        let slow = source.push_gated_builds();
        let (ctl, _rx) = controller(source);
        let node = JobNode::new(job("svc", JobType::Pipeline));

        let (builds, ()) = tokio::join!(ctl.expand(&node), async {
            tokio::task::yield_now().await;
            ctl.refresh();
            let _ = slow.send(Ok(vec![build(1, false)]));
        });

        assert!(builds.unwrap().is_empty());
        assert_eq!(ctl.cache().cached_children("svc"), None);
    }

    #[tokio::test]
    async fn apply_settings_refreshes_and_updates_limit() {
        let source = Arc::new(ScriptedSource::new());
        let (ctl, mut rx) = controller(source.clone());
        let before = ctl.generation();
        ctl.apply_settings(TreeSettings {
            directory_separator: " > ".to_string(),
            num_builds: 5,
        });
        assert_eq!(ctl.generation(), before + 1);
        assert_eq!(ctl.settings().directory_separator, " > ");
        assert!(matches!(rx.try_recv(), Ok(TreeEvent::Invalidated { .. })));

        ctl.expand(&JobNode::new(job("svc", JobType::Pipeline)))
            .await
            .unwrap();
        assert_eq!(source.last_build_limit(), Some(5));
    }
}
