//! Lazily populated two-level tree: job nodes at the root, build nodes below.
//!
//! Every remote call runs under the scope that was current when it started.
//! The result is stored and returned only if that scope is still current when
//! the call completes; otherwise the call resolves to an empty listing. The
//! check-and-store happens under the same lock `invalidate` takes to renew the
//! scope, so a superseded response can never land after a newer refresh began.

use crate::error::{TreeError, TreeResult};
use crate::events::{emit, EventSender, TreeEvent, TreeKind};
use crate::model::{BuildNode, Job, JobNode, JobType};
use crate::scope::{Scope, ScopeSource};
use crate::settings::DEFAULT_NUM_BUILDS;
use crate::store::ProjectListStore;
use crate::traits::RemoteJobSource;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock, RwLockWriteGuard};
use std::time::Instant;

/// What the root level of a tree shows.
#[derive(Clone)]
pub enum RootSelection {
    /// Every non-folder job on the server, in server order.
    AllJobs,
    /// Tracked projects, in stored order, that resolve to a live non-folder job.
    Tracked(ProjectListStore),
}

#[derive(Default)]
struct Nodes {
    roots: Option<Vec<JobNode>>,
    /// Keyed by job `full_name`.
    children: HashMap<String, Vec<BuildNode>>,
}

pub struct BuildTreeCache {
    tree: TreeKind,
    source: Arc<dyn RemoteJobSource>,
    selection: RootSelection,
    scopes: ScopeSource,
    nodes: RwLock<Nodes>,
    build_limit: AtomicUsize,
    events: EventSender,
}

impl BuildTreeCache {
    pub fn new(
        tree: TreeKind,
        source: Arc<dyn RemoteJobSource>,
        selection: RootSelection,
        events: EventSender,
    ) -> Self {
        Self {
            tree,
            source,
            selection,
            scopes: ScopeSource::new(),
            nodes: RwLock::new(Nodes::default()),
            build_limit: AtomicUsize::new(DEFAULT_NUM_BUILDS),
            events,
        }
    }

    pub fn tree(&self) -> TreeKind {
        self.tree
    }

    pub fn generation(&self) -> u64 {
        self.scopes.generation()
    }

    pub fn current_scope(&self) -> Scope {
        self.scopes.current()
    }

    pub fn set_build_limit(&self, limit: usize) {
        self.build_limit.store(limit.max(1), Ordering::Relaxed);
    }

    /// Root job nodes, folders excluded, in source order.
    pub async fn list_roots(&self) -> TreeResult<Vec<JobNode>> {
        let scope = self.scopes.current();
        let start = Instant::now();

        let tracked = match &self.selection {
            RootSelection::AllJobs => None,
            RootSelection::Tracked(store) => Some(store.load().await?),
        };

        let Some(jobs) = self
            .fetch(&scope, self.source.get_jobs(None, &scope))
            .await?
        else {
            return Ok(Vec::new());
        };

        let roots = match tracked {
            None => jobs
                .into_iter()
                .filter(|job| job.job_type != JobType::Folder)
                .map(JobNode::new)
                .collect::<Vec<_>>(),
            Some(projects) => {
                let by_name: HashMap<&str, &Job> = jobs
                    .iter()
                    .filter(|job| job.job_type != JobType::Folder)
                    .map(|job| (job.full_name.as_str(), job))
                    .collect();
                projects
                    .into_iter()
                    .filter_map(|project| {
                        let job = by_name.get(project.name.as_str())?;
                        Some(JobNode {
                            job: (*job).clone(),
                            branch: project.branch,
                        })
                    })
                    .collect()
            }
        };

        let Some(mut nodes) = self.lock_if_current(&scope) else {
            tracing::debug!(tree = ?self.tree, generation = scope.generation(), "discarding stale roots");
            return Ok(Vec::new());
        };
        nodes.roots = Some(roots.clone());
        drop(nodes);

        tracing::debug!(
            tree = ?self.tree,
            generation = scope.generation(),
            count = roots.len(),
            elapsed_ms = start.elapsed().as_millis(),
            "roots listed"
        );
        Ok(roots)
    }

    /// Builds of `job` as returned by the server (newest first).
    pub async fn list_children(&self, job: &Job) -> TreeResult<Vec<BuildNode>> {
        let scope = self.scopes.current();
        let start = Instant::now();
        let limit = self.build_limit.load(Ordering::Relaxed);

        let Some(builds) = self
            .fetch(&scope, self.source.get_builds(job, limit, &scope))
            .await?
        else {
            return Ok(Vec::new());
        };

        let children: Vec<BuildNode> = builds
            .into_iter()
            .map(|build| BuildNode {
                job: job.clone(),
                build,
            })
            .collect();

        let Some(mut nodes) = self.lock_if_current(&scope) else {
            tracing::debug!(tree = ?self.tree, job = %job.full_name, "discarding stale builds");
            return Ok(Vec::new());
        };
        nodes
            .children
            .insert(job.full_name.clone(), children.clone());
        drop(nodes);

        tracing::debug!(
            tree = ?self.tree,
            job = %job.full_name,
            count = children.len(),
            elapsed_ms = start.elapsed().as_millis(),
            "builds listed"
        );
        Ok(children)
    }

    /// Cancels the live scope, drops every cached node and tells listeners.
    /// Returns the new generation.
    pub fn invalidate(&self) -> u64 {
        let generation = {
            let mut nodes = self.write_nodes();
            let scope = self.scopes.renew();
            *nodes = Nodes::default();
            scope.generation()
        };
        emit(
            &self.events,
            TreeEvent::Invalidated {
                tree: self.tree,
                generation,
            },
        );
        generation
    }

    /// Roots stored by the last listing of the current generation.
    pub fn cached_roots(&self) -> Option<Vec<JobNode>> {
        self.read_nodes().roots.clone()
    }

    pub fn cached_children(&self, full_name: &str) -> Option<Vec<BuildNode>> {
        self.read_nodes().children.get(full_name).cloned()
    }

    /// Races `call` against cancellation of `scope`. `Ok(None)` means cancelled.
    async fn fetch<T, F>(&self, scope: &Scope, call: F) -> TreeResult<Option<T>>
    where
        F: std::future::Future<Output = color_eyre::eyre::Result<T>>,
    {
        let result = tokio::select! {
            biased;
            () = scope.cancelled() => {
                tracing::debug!(tree = ?self.tree, generation = scope.generation(), "fetch cancelled");
                return Ok(None);
            }
            result = call => result,
        };
        match result {
            Ok(value) => Ok(Some(value)),
            // Superseded requests: failures are dropped like results.
            Err(_) if scope.is_cancelled() => Ok(None),
            Err(e) => {
                tracing::warn!(tree = ?self.tree, error = %e, "remote job source failed");
                Err(TreeError::remote(&e))
            }
        }
    }

    fn lock_if_current(&self, scope: &Scope) -> Option<RwLockWriteGuard<'_, Nodes>> {
        let nodes = self.write_nodes();
        if scope.is_cancelled() {
            None
        } else {
            Some(nodes)
        }
    }

    fn write_nodes(&self) -> RwLockWriteGuard<'_, Nodes> {
        self.nodes
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn read_nodes(&self) -> std::sync::RwLockReadGuard<'_, Nodes> {
        self.nodes
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
