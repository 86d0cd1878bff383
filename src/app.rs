//! Command dispatch. The CLI plays the UI layer: it runs one command against
//! the two trees, then drains tree events and redraws the history tree if it
//! was invalidated.

use crate::cli::{Command, ConfigCommand, HistoryCommand};
use crate::render;
use jkw_core::traits::{ConfigurationStore, ConfirmationPrompt, NotificationSink, RemoteJobSource};
use jkw_core::{
    BuildTreeCache, Direction, HistoryOrderingService, Job, JobNode, JobType, ProjectListStore,
    RootSelection, TrackedProject, TreeController, TreeEvent, TreeKind, TreeResult, TreeSettings,
};
use std::sync::Arc;
use tokio::sync::mpsc;

pub struct App {
    jobs: TreeController,
    history_tree: Arc<TreeController>,
    history: HistoryOrderingService,
    config: Arc<dyn ConfigurationStore>,
    notifier: Arc<dyn NotificationSink>,
    events: mpsc::UnboundedReceiver<TreeEvent>,
    width: usize,
}

impl App {
    pub async fn new(
        source: Arc<dyn RemoteJobSource>,
        config: Arc<dyn ConfigurationStore>,
        prompt: Arc<dyn ConfirmationPrompt>,
        notifier: Arc<dyn NotificationSink>,
        width: usize,
    ) -> TreeResult<Self> {
        let settings = TreeSettings::load(config.as_ref()).await?;
        let store = ProjectListStore::new(config.clone());
        let (tx, events) = mpsc::unbounded_channel();

        let jobs = TreeController::new(
            BuildTreeCache::new(TreeKind::Jobs, source.clone(), RootSelection::AllJobs, tx.clone()),
            settings.clone(),
        );
        let history_tree = Arc::new(TreeController::new(
            BuildTreeCache::new(
                TreeKind::History,
                source.clone(),
                RootSelection::Tracked(store.clone()),
                tx.clone(),
            ),
            settings,
        ));
        let history = HistoryOrderingService::new(
            store,
            source,
            prompt,
            notifier.clone(),
            history_tree.clone(),
            tx,
        );

        Ok(Self {
            jobs,
            history_tree,
            history,
            config,
            notifier,
            events,
            width,
        })
    }

    /// Runs `command` and returns the lines to print.
    pub async fn execute(&mut self, command: Command) -> TreeResult<Vec<String>> {
        let mut out = match command {
            Command::Jobs => self.list_jobs().await?,
            Command::Builds { job } => self.list_builds(&job).await?,
            Command::History(cmd) => self.run_history(cmd).await?,
            Command::Config(ConfigCommand::Separator { separator }) => {
                self.set_separator(&separator).await?
            }
        };
        out.extend(self.drain_events().await?);
        Ok(out)
    }

    async fn list_jobs(&self) -> TreeResult<Vec<String>> {
        let roots = self.jobs.roots().await?;
        if roots.is_empty() {
            return Ok(vec!["No jobs found.".to_string()]);
        }
        Ok(render::job_lines(
            &roots,
            &self.jobs.settings().directory_separator,
            self.width,
        ))
    }

    async fn list_builds(&self, name: &str) -> TreeResult<Vec<String>> {
        let roots = self.jobs.roots().await?;
        let Some(node) = roots.iter().find(|n| n.job.full_name == name) else {
            self.notifier.error(&format!("No job named {name}"));
            return Ok(Vec::new());
        };
        let builds = self.jobs.expand(node).await?;
        let mut out = vec![node.tooltip(&self.jobs.settings().directory_separator)];
        if builds.is_empty() {
            out.push("  (no builds)".to_string());
        } else {
            out.extend(render::build_lines(&builds, self.width));
        }
        Ok(out)
    }

    async fn list_history(&self) -> TreeResult<Vec<String>> {
        let roots = self.history_tree.roots().await?;
        if roots.is_empty() {
            return Ok(vec![
                "No tracked projects. Add one with `jkw history track <JOB>`.".to_string(),
            ]);
        }
        Ok(render::job_lines(
            &roots,
            &self.history_tree.settings().directory_separator,
            self.width,
        ))
    }

    async fn run_history(&self, cmd: HistoryCommand) -> TreeResult<Vec<String>> {
        match cmd {
            HistoryCommand::List => return self.list_history().await,
            HistoryCommand::Track { job, branch } => {
                let project = TrackedProject::new(job.as_str(), branch.as_deref());
                if !self.history.track_project(project).await? {
                    self.notifier.info(&format!("{job} is already tracked"));
                }
            }
            HistoryCommand::Up { job } => self.move_project(&job, Direction::Up).await?,
            HistoryCommand::Down { job } => self.move_project(&job, Direction::Down).await?,
            HistoryCommand::Delete { jobs, branch, .. } => {
                let nodes: Vec<JobNode> = jobs
                    .iter()
                    .map(|name| detached_node(name, branch.as_deref()))
                    .collect();
                self.history.delete_projects(&nodes).await?;
            }
            HistoryCommand::Open { jobs } => {
                let nodes = self.resolve_tracked(&jobs, None).await?;
                self.history.open_projects(&nodes)?;
            }
            HistoryCommand::Build { jobs, branch } => {
                let nodes = self.resolve_tracked(&jobs, branch.as_deref()).await?;
                self.history.rebuild_projects(&nodes).await?;
                if !nodes.is_empty() {
                    self.notifier.info(&format!("Queued {} build(s)", nodes.len()));
                }
            }
        }
        Ok(Vec::new())
    }

    async fn move_project(&self, name: &str, direction: Direction) -> TreeResult<()> {
        if !self.history.move_project(name, direction).await? {
            self.notifier.info(&format!("{name} was not moved"));
        }
        Ok(())
    }

    /// Tracked nodes named in `names`. With `branch`, only entries on that branch match.
    async fn resolve_tracked(
        &self,
        names: &[String],
        branch: Option<&str>,
    ) -> TreeResult<Vec<JobNode>> {
        let roots = self.history_tree.roots().await?;
        let mut nodes = Vec::with_capacity(names.len());
        for name in names {
            let found = roots.iter().find(|n| {
                n.job.full_name == *name && branch.map_or(true, |b| n.branch.as_deref() == Some(b))
            });
            match found {
                Some(node) => nodes.push(node.clone()),
                None => self
                    .notifier
                    .error(&format!("{name} is not a tracked project on this server")),
            }
        }
        Ok(nodes)
    }

    async fn set_separator(&self, separator: &str) -> TreeResult<Vec<String>> {
        TreeSettings::save_directory_separator(self.config.as_ref(), separator).await?;
        let settings = TreeSettings::load(self.config.as_ref()).await?;
        self.jobs.apply_settings(settings.clone());
        self.history_tree.apply_settings(settings);
        Ok(Vec::new())
    }

    /// Consumes pending events. A history invalidation redraws the history tree once.
    async fn drain_events(&mut self) -> TreeResult<Vec<String>> {
        let mut redraw_history = false;
        while let Ok(event) = self.events.try_recv() {
            tracing::debug!(?event, "tree event");
            if let TreeEvent::Invalidated {
                tree: TreeKind::History,
                ..
            } = event
            {
                redraw_history = true;
            }
        }
        if redraw_history {
            self.list_history().await
        } else {
            Ok(Vec::new())
        }
    }
}

/// A node for a project that is only known by name. Enough for key-based removal.
fn detached_node(name: &str, branch: Option<&str>) -> JobNode {
    JobNode {
        job: Job {
            full_name: name.to_string(),
            buildable: false,
            description: None,
            job_type: JobType::Unknown,
            url: String::new(),
        },
        branch: branch.map(str::to_string),
    }
}
