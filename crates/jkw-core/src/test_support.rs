//! Scripted collaborators shared by the unit tests and `tests/`. Enabled
//! outside this crate with the `test-support` feature.

use crate::model::{Build, BuildResult, Job, JobType};
use crate::scope::Scope;
use crate::traits::{ConfirmationPrompt, NotificationSink, RemoteJobSource};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use color_eyre::eyre::{eyre, Result};
use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;
use tokio::sync::oneshot;

pub type Scripted<T> = std::result::Result<T, String>;

enum Reply<T> {
    Ready(Scripted<T>),
    Gated(oneshot::Receiver<Scripted<T>>),
}

impl<T> Reply<T> {
    async fn resolve(self) -> Result<T> {
        let scripted = match self {
            Reply::Ready(r) => r,
            Reply::Gated(rx) => rx.await.map_err(|_| eyre!("gate dropped"))?,
        };
        scripted.map_err(|e| eyre!(e))
    }
}

/// Replays queued responses in call order. An empty queue answers with an empty list.
#[derive(Default)]
pub struct ScriptedSource {
    jobs: Mutex<VecDeque<Reply<Vec<Job>>>>,
    builds: Mutex<VecDeque<Reply<Vec<Build>>>>,
    last_limit: Mutex<Option<usize>>,
    opened: Mutex<Vec<String>>,
    triggered: Mutex<Vec<(String, Option<String>)>>,
    broken: Mutex<HashSet<String>>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_jobs(&self, reply: Scripted<Vec<Job>>) {
        self.jobs.lock().unwrap().push_back(Reply::Ready(reply));
    }

    pub fn push_gated_jobs(&self) -> oneshot::Sender<Scripted<Vec<Job>>> {
        let (tx, rx) = oneshot::channel();
        self.jobs.lock().unwrap().push_back(Reply::Gated(rx));
        tx
    }

    pub fn push_builds(&self, reply: Scripted<Vec<Build>>) {
        self.builds.lock().unwrap().push_back(Reply::Ready(reply));
    }

    pub fn push_gated_builds(&self) -> oneshot::Sender<Scripted<Vec<Build>>> {
        let (tx, rx) = oneshot::channel();
        self.builds.lock().unwrap().push_back(Reply::Gated(rx));
        tx
    }

    pub fn last_build_limit(&self) -> Option<usize> {
        *self.last_limit.lock().unwrap()
    }

    /// Makes opening or triggering `full_name` fail.
    pub fn break_job(&self, full_name: &str) {
        self.broken.lock().unwrap().insert(full_name.to_string());
    }

    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().unwrap().clone()
    }

    pub fn triggered(&self) -> Vec<(String, Option<String>)> {
        self.triggered.lock().unwrap().clone()
    }

    fn is_broken(&self, needle: &str) -> bool {
        self.broken.lock().unwrap().iter().any(|name| needle.contains(name.as_str()))
    }
}

#[async_trait]
impl RemoteJobSource for ScriptedSource {
    async fn get_jobs(&self, _parent: Option<&Job>, _scope: &Scope) -> Result<Vec<Job>> {
        let reply = self.jobs.lock().unwrap().pop_front();
        match reply {
            Some(reply) => reply.resolve().await,
            None => Ok(Vec::new()),
        }
    }

    async fn get_builds(&self, _job: &Job, limit: usize, _scope: &Scope) -> Result<Vec<Build>> {
        *self.last_limit.lock().unwrap() = Some(limit);
        let reply = self.builds.lock().unwrap().pop_front();
        match reply {
            Some(reply) => reply.resolve().await,
            None => Ok(Vec::new()),
        }
    }

    fn open_browser_at(&self, url: &str) -> Result<()> {
        if self.is_broken(url) {
            return Err(eyre!("no browser for {url}"));
        }
        self.opened.lock().unwrap().push(url.to_string());
        Ok(())
    }

    async fn trigger_build(&self, job: &Job, branch: Option<&str>) -> Result<()> {
        if self.is_broken(&job.full_name) {
            return Err(eyre!("HTTP 500 triggering {}", job.full_name));
        }
        self.triggered
            .lock()
            .unwrap()
            .push((job.full_name.clone(), branch.map(str::to_string)));
        Ok(())
    }
}

pub fn job(name: &str, job_type: JobType) -> Job {
    Job {
        full_name: name.to_string(),
        buildable: true,
        description: None,
        job_type,
        url: format!("https://ci.example.com/job/{name}/"),
    }
}

pub fn build(number: u64, building: bool) -> Build {
    Build {
        number,
        timestamp: Utc.timestamp_opt(1_717_236_000 + number as i64, 0).unwrap(),
        building,
        result: if building {
            None
        } else {
            Some(BuildResult::Success)
        },
        description: None,
    }
}

/// Answers every question with a fixed choice and remembers what was asked.
pub struct ScriptedPrompt {
    answer: Option<String>,
    asked: Mutex<Vec<String>>,
}

impl ScriptedPrompt {
    pub fn confirming() -> Self {
        Self {
            answer: Some("Delete".to_string()),
            asked: Mutex::new(Vec::new()),
        }
    }

    pub fn declining() -> Self {
        Self {
            answer: None,
            asked: Mutex::new(Vec::new()),
        }
    }

    pub fn asked(&self) -> Vec<String> {
        self.asked.lock().unwrap().clone()
    }
}

#[async_trait]
impl ConfirmationPrompt for ScriptedPrompt {
    async fn ask(&self, message: &str, _options: &[&str]) -> Option<String> {
        self.asked.lock().unwrap().push(message.to_string());
        self.answer.clone()
    }
}

#[derive(Default)]
pub struct RecordingSink {
    pub infos: Mutex<Vec<String>>,
    pub errors: Mutex<Vec<String>>,
}

impl NotificationSink for RecordingSink {
    fn info(&self, message: &str) {
        self.infos.lock().unwrap().push(message.to_string());
    }

    fn error(&self, message: &str) {
        self.errors.lock().unwrap().push(message.to_string());
    }
}
