//! Mutations of the tracked project list: reorder, delete, track, and the
//! per-project actions (open, rebuild) offered by the history tree.
//!
//! Every load → mutate → save cycle runs under `write`, so two reorders issued
//! back to back never read the same snapshot. The history tree is refreshed
//! after the lock is released.

use crate::controller::TreeController;
use crate::error::{TreeError, TreeResult};
use crate::events::{emit, Direction, EventSender, TreeEvent};
use crate::model::{JobNode, ProjectKey, TrackedProject};
use crate::store::{self, ProjectListStore};
use crate::traits::{ConfirmationPrompt, NotificationSink, RemoteJobSource};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;

const DELETE_CHOICE: &str = "Delete";

pub struct HistoryOrderingService {
    store: ProjectListStore,
    source: Arc<dyn RemoteJobSource>,
    prompt: Arc<dyn ConfirmationPrompt>,
    notifier: Arc<dyn NotificationSink>,
    tree: Arc<TreeController>,
    events: EventSender,
    write: Mutex<()>,
}

impl HistoryOrderingService {
    pub fn new(
        store: ProjectListStore,
        source: Arc<dyn RemoteJobSource>,
        prompt: Arc<dyn ConfirmationPrompt>,
        notifier: Arc<dyn NotificationSink>,
        tree: Arc<TreeController>,
        events: EventSender,
    ) -> Self {
        Self {
            store,
            source,
            prompt,
            notifier,
            tree,
            events,
            write: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &ProjectListStore {
        &self.store
    }

    /// Swaps the first project called `name` with its neighbour.
    ///
    /// Branches are ignored when matching, so with the same job tracked on two
    /// branches only the first entry can be moved. Returns `false` without
    /// touching the store when there is no match or the entry is already at
    /// the edge.
    pub async fn move_project(&self, name: &str, direction: Direction) -> TreeResult<bool> {
        {
            let _guard = self.write.lock().await;
            let mut list = self.store.load().await?;
            let Some(index) = list.iter().position(|p| p.name == name) else {
                tracing::debug!(%name, "move ignored, project not tracked");
                return Ok(false);
            };
            let Some(other) = neighbour(index, list.len(), direction) else {
                tracing::debug!(%name, ?direction, "move ignored, already at the edge");
                return Ok(false);
            };
            list.swap(index, other);
            self.store.save(&list).await?;
        }

        tracing::info!(%name, ?direction, "tracked project moved");
        emit(
            &self.events,
            TreeEvent::ProjectsReordered {
                name: name.to_string(),
                direction,
            },
        );
        self.tree.refresh();
        Ok(true)
    }

    /// Asks for confirmation, then removes every `(fullName, branch)` in
    /// `jobs`. Jobs that are not tracked are skipped silently. Returns whether
    /// the operator confirmed.
    pub async fn delete_projects(&self, jobs: &[JobNode]) -> TreeResult<bool> {
        if jobs.is_empty() {
            return Ok(false);
        }
        let names = jobs
            .iter()
            .map(|node| node.job.full_name.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        let message = format!("Stop tracking the following projects?\n\n{names}");
        if self.prompt.ask(&message, &[DELETE_CHOICE]).await.is_none() {
            tracing::debug!(count = jobs.len(), "delete declined");
            return Ok(false);
        }

        let keys: HashSet<ProjectKey> = jobs.iter().map(JobNode::key).collect();
        {
            let _guard = self.write.lock().await;
            let list = self.store.load().await?;
            let kept = store::remove(&list, &keys);
            self.store.save(&kept).await?;
            tracing::info!(removed = list.len() - kept.len(), "tracked projects deleted");
        }

        self.notifier.info(&format!("Stopped tracking {names}"));
        emit(
            &self.events,
            TreeEvent::ProjectsDeleted {
                names: jobs.iter().map(|node| node.job.full_name.clone()).collect(),
            },
        );
        self.tree.refresh();
        Ok(true)
    }

    /// Adds `project` to the end of the list. Returns `false` if it was already tracked.
    pub async fn track_project(&self, project: TrackedProject) -> TreeResult<bool> {
        let added = {
            let _guard = self.write.lock().await;
            self.store.track(project.clone()).await?
        };
        if added {
            tracing::info!(name = %project.name, branch = ?project.branch, "project tracked");
            emit(
                &self.events,
                TreeEvent::ProjectTracked {
                    name: project.name,
                    branch: project.branch,
                },
            );
            self.tree.refresh();
        }
        Ok(added)
    }

    /// Opens each job in the browser. All jobs are attempted; failures are
    /// reported together.
    pub fn open_projects(&self, jobs: &[JobNode]) -> TreeResult<()> {
        let failures: Vec<String> = jobs
            .iter()
            .filter_map(|node| {
                self.source
                    .open_browser_at(&node.job.url)
                    .err()
                    .map(|e| format!("{}: {e:#}", node.job.full_name))
            })
            .collect();
        if failures.is_empty() {
            Ok(())
        } else {
            Err(TreeError::BrowserLaunch(failures.join("; ")))
        }
    }

    /// Triggers a build of each job, passing its branch when it has one. The
    /// history tree is refreshed if any trigger succeeded; the first failure is
    /// returned once every job has been attempted.
    pub async fn rebuild_projects(&self, jobs: &[JobNode]) -> TreeResult<()> {
        let mut first_failure = None;
        let mut triggered = 0usize;
        for node in jobs {
            match self
                .source
                .trigger_build(&node.job, node.branch.as_deref())
                .await
            {
                Ok(()) => {
                    triggered += 1;
                    tracing::info!(job = %node.job.full_name, branch = ?node.branch, "build triggered");
                }
                Err(e) => {
                    tracing::warn!(job = %node.job.full_name, error = %e, "build trigger failed");
                    first_failure.get_or_insert_with(|| TreeError::remote(&e));
                }
            }
        }
        if triggered > 0 {
            self.tree.refresh();
        }
        first_failure.map_or(Ok(()), Err)
    }
}

fn neighbour(index: usize, len: usize, direction: Direction) -> Option<usize> {
    match direction {
        Direction::Up => index.checked_sub(1),
        Direction::Down => Some(index + 1).filter(|&next| next < len),
    }
}
