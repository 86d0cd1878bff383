//! Typed job, build and tracked-project records, and the tree nodes built from them.

use chrono::{DateTime, Local, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Jenkins job kinds the tree distinguishes. Anything else maps to `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    Folder,
    Multi,
    Org,
    Pipeline,
    Freestyle,
    Unknown,
}

impl JobType {
    /// Folder-like jobs contain other jobs and are walked when listing.
    pub fn has_children(self) -> bool {
        matches!(self, JobType::Folder | JobType::Multi | JobType::Org)
    }

    pub fn is_pipeline_like(self) -> bool {
        matches!(self, JobType::Multi | JobType::Org | JobType::Pipeline)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    /// `/`-segmented path, e.g. `team/service/main`. Identity of the job.
    pub full_name: String,
    pub buildable: bool,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub job_type: JobType,
    pub url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BuildResult {
    Success,
    Failure,
    Aborted,
    Unstable,
    NotBuilt,
    #[serde(other)]
    Unknown,
}

impl fmt::Display for BuildResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BuildResult::Success => "SUCCESS",
            BuildResult::Failure => "FAILURE",
            BuildResult::Aborted => "ABORTED",
            BuildResult::Unstable => "UNSTABLE",
            BuildResult::NotBuilt => "NOT_BUILT",
            BuildResult::Unknown => "UNKNOWN",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Build {
    pub number: u64,
    pub timestamp: DateTime<Utc>,
    pub building: bool,
    /// Always `None` while `building` is true.
    pub result: Option<BuildResult>,
    pub description: Option<String>,
}

/// Uniqueness key of a tracked project.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProjectKey {
    pub name: String,
    pub branch: Option<String>,
}

impl ProjectKey {
    pub fn new(name: impl Into<String>, branch: Option<String>) -> Self {
        Self {
            name: name.into(),
            branch,
        }
    }
}

/// A persisted reference to a job, optionally scoped to a branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedProject {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
}

impl TrackedProject {
    pub fn new(name: impl Into<String>, branch: Option<&str>) -> Self {
        Self {
            name: name.into(),
            branch: branch.map(str::to_string),
        }
    }

    pub fn key(&self) -> ProjectKey {
        ProjectKey::new(self.name.clone(), self.branch.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobNode {
    pub job: Job,
    /// Set when the node comes from a tracked project with a branch.
    pub branch: Option<String>,
}

impl JobNode {
    pub fn new(job: Job) -> Self {
        Self { job, branch: None }
    }

    /// `fullName` with every `/` replaced by `separator`.
    pub fn label(&self, separator: &str) -> String {
        self.job.full_name.replace('/', separator)
    }

    pub fn tooltip(&self, separator: &str) -> String {
        let label = self.label(separator);
        match self.job.description.as_deref() {
            None | Some("") => label,
            Some(desc) => format!("{label} - {desc}"),
        }
    }

    pub fn key(&self) -> ProjectKey {
        ProjectKey::new(self.job.full_name.clone(), self.branch.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildNode {
    pub job: Job,
    pub build: Build,
}

impl BuildNode {
    pub fn label(&self) -> String {
        self.label_in(&Local)
    }

    /// Build number followed by the start time rendered in `tz`.
    pub fn label_in<Tz>(&self, tz: &Tz) -> String
    where
        Tz: TimeZone,
        Tz::Offset: fmt::Display,
    {
        let started = self.build.timestamp.with_timezone(tz);
        format!(
            "{}    {}",
            self.build.number,
            started.format("%m/%d/%Y, %I:%M:%S %p")
        )
    }

    pub fn tooltip(&self) -> String {
        self.tooltip_in(&Local)
    }

    pub fn tooltip_in<Tz>(&self, tz: &Tz) -> String
    where
        Tz: TimeZone,
        Tz::Offset: fmt::Display,
    {
        let label = self.label_in(tz);
        if self.build.building {
            return format!("{label}: BUILDING");
        }
        match self.build.result {
            Some(result) => format!("{label}: {result}"),
            None => format!("{label}: UNKNOWN"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeNode {
    Job(JobNode),
    Build(BuildNode),
}

impl TreeNode {
    pub fn job(&self) -> &Job {
        match self {
            TreeNode::Job(node) => &node.job,
            TreeNode::Build(node) => &node.job,
        }
    }

    pub fn description(&self) -> Option<&str> {
        match self {
            TreeNode::Job(node) => node.job.description.as_deref(),
            TreeNode::Build(node) => node.build.description.as_deref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(name: &str) -> Job {
        Job {
            full_name: name.to_string(),
            buildable: true,
            description: None,
            job_type: JobType::Pipeline,
            url: format!("https://ci.example.com/job/{name}/"),
        }
    }

    fn build(number: u64, building: bool, result: Option<BuildResult>) -> Build {
        Build {
            number,
            timestamp: Utc.with_ymd_and_hms(2024, 6, 1, 10, 5, 9).unwrap(),
            building,
            result,
            description: None,
        }
    }

    #[test]
    fn job_label_replaces_every_separator() {
        let node = JobNode::new(job("team/service/main"));
        assert_eq!(node.label(" / "), "team / service / main");
        assert_eq!(node.label("/"), "team/service/main");
    }

    #[test]
    fn job_tooltip_appends_description() {
        let mut j = job("deploy");
        let node = JobNode::new(j.clone());
        assert_eq!(node.tooltip("/"), "deploy");

        j.description = Some(String::new());
        assert_eq!(JobNode::new(j.clone()).tooltip("/"), "deploy");

        j.description = Some("prod rollout".to_string());
        assert_eq!(JobNode::new(j).tooltip("/"), "deploy - prod rollout");
    }

    #[test]
    fn build_label_formats_number_and_time() {
        let node = BuildNode {
            job: job("deploy"),
            build: build(42, false, Some(BuildResult::Success)),
        };
        assert_eq!(node.label_in(&Utc), "42    06/01/2024, 10:05:09 AM");
    }

    #[test]
    fn build_label_uses_twelve_hour_clock() {
        let mut b = build(43, false, None);
        b.timestamp = Utc.with_ymd_and_hms(2024, 6, 1, 15, 30, 0).unwrap();
        let node = BuildNode {
            job: job("deploy"),
            build: b,
        };
        assert_eq!(node.label_in(&Utc), "43    06/01/2024, 03:30:00 PM");

        let mut b = build(44, false, None);
        b.timestamp = Utc.with_ymd_and_hms(2024, 6, 2, 0, 15, 0).unwrap();
        let node = BuildNode {
            job: job("deploy"),
            build: b,
        };
        assert_eq!(node.label_in(&Utc), "44    06/02/2024, 12:15:00 AM");
    }

    #[test]
    fn build_tooltip_reports_building_or_result() {
        let running = BuildNode {
            job: job("deploy"),
            build: build(7, true, None),
        };
        assert!(running.tooltip_in(&Utc).ends_with(": BUILDING"));

        let failed = BuildNode {
            job: job("deploy"),
            build: build(8, false, Some(BuildResult::Failure)),
        };
        assert!(failed.tooltip_in(&Utc).ends_with(": FAILURE"));
    }

    #[test]
    fn tracked_project_key_includes_branch() {
        let a = TrackedProject::new("api", Some("main"));
        let b = TrackedProject::new("api", None);
        assert_ne!(a.key(), b.key());
        assert_eq!(a.key(), ProjectKey::new("api", Some("main".to_string())));
    }

    #[test]
    fn tracked_project_without_branch_omits_field() {
        let json = serde_json::to_string(&TrackedProject::new("api", None)).unwrap();
        assert_eq!(json, r#"{"name":"api"}"#);
        let back: TrackedProject =
            serde_json::from_str(r#"{"name":"api","branch":"dev"}"#).unwrap();
        assert_eq!(back.branch.as_deref(), Some("dev"));
    }

    #[test]
    fn build_result_parses_jenkins_spelling() {
        let r: BuildResult = serde_json::from_str(r#""NOT_BUILT""#).unwrap();
        assert_eq!(r, BuildResult::NotBuilt);
        let r: BuildResult = serde_json::from_str(r#""SOMETHING_NEW""#).unwrap();
        assert_eq!(r, BuildResult::Unknown);
    }

    #[test]
    fn folder_like_types() {
        assert!(JobType::Folder.has_children());
        assert!(JobType::Org.has_children());
        assert!(!JobType::Pipeline.has_children());
        assert!(JobType::Multi.is_pipeline_like());
        assert!(!JobType::Freestyle.is_pipeline_like());
    }
}
