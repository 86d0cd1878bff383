#![allow(dead_code)]

use async_trait::async_trait;
use color_eyre::eyre::{eyre, Result};
use jkw::app::App;
use jkw::executor::JenkinsExecutor;
use jkw::source::JenkinsSource;
use jkw_core::config_store::MemoryConfigStore;
use jkw_core::traits::{ConfirmationPrompt, NotificationSink};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub const BASE: &str = "https://jenkins.test";

pub const JOB_TREE: &str = "api/json?tree=jobs[_class,name,fullName,url,buildable,description]";

/// Serves canned `api/json` bodies by URL and records writes.
#[derive(Default)]
pub struct FakeServer {
    pages: Mutex<HashMap<String, String>>,
    pub posts: Mutex<Vec<String>>,
    pub opened: Mutex<Vec<String>>,
}

impl FakeServer {
    pub fn page(&self, url: &str, body: &str) {
        self.pages
            .lock()
            .unwrap()
            .insert(url.to_string(), body.to_string());
    }

    /// Serves the job listing of `container_url` (which ends with `/`).
    pub fn jobs(&self, container_url: &str, body: &str) {
        self.page(&format!("{container_url}{JOB_TREE}"), body);
    }
}

#[async_trait]
impl JenkinsExecutor for FakeServer {
    async fn get(&self, url: &str) -> Result<String> {
        self.pages
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| eyre!("Jenkins returned 404 for {url}"))
    }

    async fn post(&self, url: &str) -> Result<()> {
        self.posts.lock().unwrap().push(url.to_string());
        Ok(())
    }

    fn open_in_browser(&self, url: &str) -> Result<()> {
        self.opened.lock().unwrap().push(url.to_string());
        Ok(())
    }
}

pub struct Answer(pub Option<&'static str>);

#[async_trait]
impl ConfirmationPrompt for Answer {
    async fn ask(&self, _message: &str, _options: &[&str]) -> Option<String> {
        self.0.map(str::to_string)
    }
}

#[derive(Default)]
pub struct Collected {
    pub infos: Mutex<Vec<String>>,
    pub errors: Mutex<Vec<String>>,
}

impl NotificationSink for Collected {
    fn info(&self, message: &str) {
        self.infos.lock().unwrap().push(message.to_string());
    }

    fn error(&self, message: &str) {
        self.errors.lock().unwrap().push(message.to_string());
    }
}

pub fn job_json(class: &str, full_name: &str, url: &str) -> String {
    let name = full_name.rsplit('/').next().unwrap_or(full_name);
    format!(r#"{{"_class":"{class}","name":"{name}","fullName":"{full_name}","url":"{url}"}}"#)
}

pub const FOLDER: &str = "com.cloudbees.hudson.plugins.folder.Folder";
pub const PIPELINE: &str = "org.jenkinsci.plugins.workflow.job.WorkflowJob";
pub const MULTI: &str = "org.jenkinsci.plugins.workflow.multibranch.WorkflowMultiBranchProject";

/// A server with `deploy` at the root and `team/api/{main,dev}` below a folder
/// and a multibranch project.
pub fn sample_server() -> Arc<FakeServer> {
    let server = Arc::new(FakeServer::default());
    server.jobs(
        &format!("{BASE}/"),
        &format!(
            r#"{{"jobs":[{},{}]}}"#,
            job_json(FOLDER, "team", &format!("{BASE}/job/team/")),
            job_json(PIPELINE, "deploy", &format!("{BASE}/job/deploy/")),
        ),
    );
    server.jobs(
        &format!("{BASE}/job/team/"),
        &format!(
            r#"{{"jobs":[{}]}}"#,
            job_json(MULTI, "team/api", &format!("{BASE}/job/team/job/api/")),
        ),
    );
    server.jobs(
        &format!("{BASE}/job/team/job/api/"),
        &format!(
            r#"{{"jobs":[{},{}]}}"#,
            job_json(PIPELINE, "team/api/main", &format!("{BASE}/job/team/job/api/job/main/")),
            job_json(PIPELINE, "team/api/dev", &format!("{BASE}/job/team/job/api/job/dev/")),
        ),
    );
    server
}

pub struct Harness {
    pub app: App,
    pub server: Arc<FakeServer>,
    pub config: Arc<MemoryConfigStore>,
    pub notes: Arc<Collected>,
}

pub async fn harness(server: Arc<FakeServer>, answer: Option<&'static str>) -> Harness {
    let config = Arc::new(MemoryConfigStore::new());
    let notes = Arc::new(Collected::default());
    let source = Arc::new(JenkinsSource::new(BASE, server.clone()));
    let app = App::new(
        source,
        config.clone(),
        Arc::new(Answer(answer)),
        notes.clone(),
        200,
    )
    .await
    .unwrap();
    Harness {
        app,
        server,
        config,
        notes,
    }
}
