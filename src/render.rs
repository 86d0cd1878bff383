//! Plain-text rendering of tree nodes for the terminal.

use chrono::TimeZone;
use jkw_core::{BuildNode, JobNode};
use std::fmt::Display;
use unicode_width::UnicodeWidthStr;

const FALLBACK_WIDTH: usize = 100;

pub fn terminal_width() -> usize {
    crossterm::terminal::size().map_or(FALLBACK_WIDTH, |(w, _)| usize::from(w).max(20))
}

fn truncate(s: &str, max_width: usize) -> String {
    if UnicodeWidthStr::width(s) <= max_width {
        s.to_string()
    } else {
        let mut result = String::new();
        let mut width = 0;
        for c in s.chars() {
            let cw = unicode_width::UnicodeWidthChar::width(c).unwrap_or(0);
            if width + cw + 1 > max_width {
                result.push('…');
                break;
            }
            result.push(c);
            width += cw;
        }
        result
    }
}

/// One line per job: position, label, branch and description.
pub fn job_lines(nodes: &[JobNode], separator: &str, max_width: usize) -> Vec<String> {
    nodes
        .iter()
        .enumerate()
        .map(|(i, node)| {
            let mut line = format!("{:>3}. {}", i + 1, node.label(separator));
            if let Some(branch) = &node.branch {
                line.push_str(&format!(" [{branch}]"));
            }
            if let Some(desc) = node.job.description.as_deref() {
                line.push_str(&format!("  - {desc}"));
            }
            truncate(&line, max_width)
        })
        .collect()
}

pub fn build_lines(nodes: &[BuildNode], max_width: usize) -> Vec<String> {
    build_lines_in(nodes, &chrono::Local, max_width)
}

/// One line per build: the tree label followed by its state.
pub fn build_lines_in<Tz>(nodes: &[BuildNode], tz: &Tz, max_width: usize) -> Vec<String>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    nodes
        .iter()
        .map(|node| {
            let state = match (node.build.building, node.build.result) {
                (true, _) => "BUILDING".to_string(),
                (false, Some(result)) => result.to_string(),
                (false, None) => "-".to_string(),
            };
            let mut line = format!("  {}  {state}", node.label_in(tz));
            if let Some(desc) = node.build.description.as_deref() {
                line.push_str(&format!("  {desc}"));
            }
            truncate(&line, max_width)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use jkw_core::{Build, BuildResult, Job, JobType};
    use pretty_assertions::assert_eq;

    fn job(name: &str, description: Option<&str>) -> Job {
        Job {
            full_name: name.to_string(),
            buildable: true,
            description: description.map(str::to_string),
            job_type: JobType::Pipeline,
            url: String::new(),
        }
    }

    #[test]
    fn truncate_short_unchanged() {
        assert_eq!(truncate("hello", 10), "hello");
    }

    #[test]
    fn truncate_long_adds_ellipsis() {
        let result = truncate("hello world", 6);
        assert_eq!(result, "hello…");
    }

    #[test]
    fn truncate_counts_wide_chars() {
        let result = truncate("日本語のジョブ", 7);
        assert!(UnicodeWidthStr::width(result.as_str()) <= 7);
        assert!(result.ends_with('…'));
    }

    #[test]
    fn job_lines_number_and_separate() {
        let nodes = vec![
            JobNode::new(job("team/api", Some("REST service"))),
            JobNode {
                job: job("deploy", None),
                branch: Some("main".to_string()),
            },
        ];
        assert_eq!(
            job_lines(&nodes, " / ", 80),
            vec![
                "  1. team / api  - REST service".to_string(),
                "  2. deploy [main]".to_string(),
            ]
        );
    }

    #[test]
    fn build_lines_show_state() {
        let at = Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap();
        let nodes = vec![
            BuildNode {
                job: job("svc", None),
                build: Build {
                    number: 12,
                    timestamp: at,
                    building: true,
                    result: None,
                    description: None,
                },
            },
            BuildNode {
                job: job("svc", None),
                build: Build {
                    number: 11,
                    timestamp: at,
                    building: false,
                    result: Some(BuildResult::Failure),
                    description: Some("flaky".to_string()),
                },
            },
        ];
        assert_eq!(
            build_lines_in(&nodes, &Utc, 80),
            vec![
                "  12    06/01/2024, 10:00:00 AM  BUILDING".to_string(),
                "  11    06/01/2024, 10:00:00 AM  FAILURE  flaky".to_string(),
            ]
        );
    }
}
