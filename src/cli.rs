use clap::{Parser, Subcommand};
use std::path::PathBuf;

const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), "+", env!("BUILD_NUMBER"));

#[derive(Parser, Debug)]
#[command(
    name = "jkw",
    version = VERSION,
    about = "Browse Jenkins jobs and keep a history of tracked projects"
)]
pub struct Cli {
    /// Jenkins base URL (e.g. https://jenkins.example.com)
    #[arg(long, env = "JENKINS_URL", value_parser = validate_url)]
    pub url: String,

    /// Jenkins user name
    #[arg(long, env = "JENKINS_USER")]
    pub user: Option<String>,

    /// Jenkins API token
    #[arg(long, env = "JENKINS_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Settings file (defaults to $XDG_CONFIG_HOME/jkw/settings.json)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Disable desktop notifications
    #[arg(long)]
    pub no_notify: bool,

    /// Enable verbose logging to $XDG_STATE_HOME/jkw/debug.log
    #[arg(long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// List every job on the server, folders excluded
    Jobs,
    /// List the most recent builds of a job
    Builds {
        /// Job full name (e.g. team/api/main)
        job: String,
    },
    /// Tracked projects
    #[command(subcommand)]
    History(HistoryCommand),
    /// Display settings
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum HistoryCommand {
    /// List tracked projects that exist on the server
    List,
    /// Start tracking a job
    Track {
        job: String,
        #[arg(short, long)]
        branch: Option<String>,
    },
    /// Move a tracked project one place up
    Up { job: String },
    /// Move a tracked project one place down
    Down { job: String },
    /// Stop tracking projects
    Delete {
        #[arg(required = true)]
        jobs: Vec<String>,
        #[arg(short, long)]
        branch: Option<String>,
        /// Do not ask for confirmation
        #[arg(short = 'y', long)]
        yes: bool,
    },
    /// Open tracked projects in the browser
    Open {
        #[arg(required = true)]
        jobs: Vec<String>,
    },
    /// Trigger builds of tracked projects
    Build {
        #[arg(required = true)]
        jobs: Vec<String>,
        #[arg(short, long)]
        branch: Option<String>,
    },
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum ConfigCommand {
    /// Set the separator shown between folder names
    Separator { separator: String },
}

/// Accepts only absolute http(s) URLs with a host.
pub fn validate_url(url: &str) -> Result<String, String> {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .ok_or_else(|| format!("Invalid Jenkins URL '{url}'. Expected http:// or https://."))?;
    if rest.is_empty() || rest.starts_with('/') || url.contains(char::is_whitespace) {
        return Err(format!("Invalid Jenkins URL '{url}'. Missing host."));
    }
    Ok(url.trim_end_matches('/').to_string())
}
