use chrono::{DateTime, Utc};
use color_eyre::eyre::{eyre, Result};
use jkw_core::{Build, BuildResult, Job, JobType};
use serde::Deserialize;

// -- Intermediate Jenkins `api/json` structs --

#[derive(Deserialize, Debug)]
struct JenkinsJobList {
    #[serde(default)]
    jobs: Vec<JenkinsJob>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct JenkinsJob {
    #[serde(rename = "_class", default)]
    class: String,
    name: String,
    #[serde(default)]
    full_name: Option<String>,
    #[serde(default)]
    url: String,
    #[serde(default)]
    buildable: Option<bool>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Deserialize, Debug)]
struct JenkinsBuildList {
    #[serde(default)]
    builds: Vec<JenkinsBuild>,
}

#[derive(Deserialize, Debug)]
struct JenkinsBuild {
    number: u64,
    /// Epoch milliseconds.
    timestamp: i64,
    #[serde(default)]
    building: bool,
    #[serde(default)]
    result: Option<BuildResult>,
    #[serde(default)]
    description: Option<String>,
}

/// Maps the Java class Jenkins reports for an item to the tree's job kinds.
fn map_class(class: &str) -> JobType {
    match class {
        "com.cloudbees.hudson.plugins.folder.Folder" => JobType::Folder,
        "org.jenkinsci.plugins.workflow.multibranch.WorkflowMultiBranchProject" => JobType::Multi,
        "jenkins.branch.OrganizationFolder" => JobType::Org,
        "org.jenkinsci.plugins.workflow.job.WorkflowJob" => JobType::Pipeline,
        "hudson.model.FreeStyleProject" => JobType::Freestyle,
        _ => JobType::Unknown,
    }
}

impl JenkinsJob {
    fn into_job(self, parent: Option<&Job>) -> Job {
        let full_name = self.full_name.unwrap_or_else(|| match parent {
            Some(p) => format!("{}/{}", p.full_name, self.name),
            None => self.name.clone(),
        });
        let job_type = map_class(&self.class);
        Job {
            full_name,
            buildable: self.buildable.unwrap_or(!job_type.has_children()),
            description: self.description.filter(|d| !d.is_empty()),
            job_type,
            url: self.url,
        }
    }
}

impl TryFrom<JenkinsBuild> for Build {
    type Error = color_eyre::eyre::Report;

    fn try_from(b: JenkinsBuild) -> Result<Self> {
        let timestamp = DateTime::<Utc>::from_timestamp_millis(b.timestamp)
            .ok_or_else(|| eyre!("Build #{} has an invalid timestamp {}", b.number, b.timestamp))?;
        Ok(Build {
            number: b.number,
            timestamp,
            building: b.building,
            // Jenkins may report a provisional result while the build is still running.
            result: if b.building { None } else { b.result },
            description: b.description.filter(|d| !d.is_empty()),
        })
    }
}

/// Jobs directly below `parent` (or the server root), in server order.
pub fn parse_jobs(json: &str, parent: Option<&Job>) -> Result<Vec<Job>> {
    let list: JenkinsJobList =
        serde_json::from_str(json).map_err(|e| eyre!("Failed to parse job list: {e}"))?;
    Ok(list
        .jobs
        .into_iter()
        .map(|j| j.into_job(parent))
        .collect())
}

/// Builds in server order (newest first).
pub fn parse_builds(json: &str) -> Result<Vec<Build>> {
    let list: JenkinsBuildList =
        serde_json::from_str(json).map_err(|e| eyre!("Failed to parse build list: {e}"))?;
    list.builds.into_iter().map(Build::try_from).collect()
}
