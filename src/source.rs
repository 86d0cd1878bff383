//! [`RemoteJobSource`] backed by the Jenkins JSON API.

use crate::executor::JenkinsExecutor;
use crate::parser;
use async_trait::async_trait;
use color_eyre::eyre::{eyre, Result};
use jkw_core::traits::RemoteJobSource;
use jkw_core::{Build, Job, Scope};
use std::collections::VecDeque;
use std::sync::Arc;

const JOB_TREE: &str = "jobs[_class,name,fullName,url,buildable,description]";
const BUILD_FIELDS: &str = "number,timestamp,building,result,description,url";
const BRANCH_PARAMETER: &str = "BRANCH";

pub struct JenkinsSource {
    base_url: String,
    executor: Arc<dyn JenkinsExecutor>,
}

impl JenkinsSource {
    pub fn new(base_url: &str, executor: Arc<dyn JenkinsExecutor>) -> Self {
        Self {
            base_url: with_trailing_slash(base_url),
            executor,
        }
    }

    async fn list_children(&self, parent: Option<&Job>) -> Result<Vec<Job>> {
        let base = parent.map_or(self.base_url.clone(), |job| with_trailing_slash(&job.url));
        let json = self
            .executor
            .get(&format!("{base}api/json?tree={JOB_TREE}"))
            .await?;
        parser::parse_jobs(&json, parent)
    }
}

#[async_trait]
impl RemoteJobSource for JenkinsSource {
    /// With a parent, its direct children. Without one, every job on the
    /// server: folders, organizations and multibranch projects are walked
    /// breadth-first, and each container is listed before its contents.
    async fn get_jobs(&self, parent: Option<&Job>, scope: &Scope) -> Result<Vec<Job>> {
        if parent.is_some() {
            return self.list_children(parent).await;
        }

        let mut all = Vec::new();
        let mut pending: VecDeque<Option<Job>> = VecDeque::from([None]);
        while let Some(container) = pending.pop_front() {
            if scope.is_cancelled() {
                return Err(eyre!("job listing cancelled"));
            }
            for job in self.list_children(container.as_ref()).await? {
                if job.job_type.has_children() {
                    pending.push_back(Some(job.clone()));
                }
                all.push(job);
            }
        }
        tracing::debug!(count = all.len(), "jenkins jobs listed");
        Ok(all)
    }

    async fn get_builds(&self, job: &Job, limit: usize, _scope: &Scope) -> Result<Vec<Build>> {
        let url = format!(
            "{}api/json?tree=builds[{BUILD_FIELDS}]{{0,{limit}}}",
            with_trailing_slash(&job.url)
        );
        let json = self.executor.get(&url).await?;
        parser::parse_builds(&json)
    }

    fn open_browser_at(&self, url: &str) -> Result<()> {
        self.executor.open_in_browser(url)
    }

    async fn trigger_build(&self, job: &Job, branch: Option<&str>) -> Result<()> {
        let url = build_trigger_url(job, branch);
        self.executor.post(&url).await?;
        tracing::info!(job = %job.full_name, ?branch, "jenkins build queued");
        Ok(())
    }
}

fn with_trailing_slash(url: &str) -> String {
    if url.ends_with('/') {
        url.to_string()
    } else {
        format!("{url}/")
    }
}

pub fn build_trigger_url(job: &Job, branch: Option<&str>) -> String {
    let base = with_trailing_slash(&job.url);
    match branch {
        Some(branch) => format!(
            "{base}buildWithParameters?{BRANCH_PARAMETER}={}",
            encode_query_value(branch)
        ),
        None => format!("{base}build"),
    }
}

/// Percent-encodes everything outside RFC 3986's unreserved set.
fn encode_query_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b'.' | b'~') {
            out.push(char::from(byte));
        } else {
            out.push_str(&format!("%{byte:02X}"));
        }
    }
    out
}
