use jkw::app::App;
use jkw::cli::{Cli, Command, HistoryCommand};
use jkw::executor::{Credentials, CurlExecutor};
use jkw::notify;
use jkw::prompt::{AssumeYes, TerminalPrompt};
use jkw::render;
use jkw::source::JenkinsSource;

use clap::Parser;
use color_eyre::eyre::{eyre, Result};
use jkw_core::config_store::FileConfigStore;
use jkw_core::traits::{ConfirmationPrompt, RemoteJobSource};
use std::path::PathBuf;
use std::sync::Arc;

fn setup_verbose_logging() -> Result<()> {
    let state_dir = state_dir();
    std::fs::create_dir_all(&state_dir)
        .map_err(|e| eyre!("Failed to create log directory {state_dir:?}: {e}"))?;
    let log_path = state_dir.join("debug.log");
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .map_err(|e| eyre!("Failed to open log file {log_path:?}: {e}"))?;
    tracing_subscriber::fmt()
        .with_writer(file)
        .with_ansi(false)
        .init();
    tracing::info!(
        "jkw v{}+{} starting with verbose logging",
        env!("CARGO_PKG_VERSION"),
        env!("BUILD_NUMBER")
    );
    Ok(())
}

fn state_dir() -> PathBuf {
    xdg_dir("XDG_STATE_HOME", &[".local", "state"])
}

fn settings_path() -> PathBuf {
    xdg_dir("XDG_CONFIG_HOME", &[".config"]).join("settings.json")
}

fn xdg_dir(var: &str, home_fallback: &[&str]) -> PathBuf {
    if let Some(dir) = std::env::var_os(var) {
        PathBuf::from(dir).join("jkw")
    } else if let Some(home) = std::env::var_os("HOME") {
        home_fallback
            .iter()
            .fold(PathBuf::from(home), |path, part| path.join(part))
            .join("jkw")
    } else {
        PathBuf::from("/tmp/jkw")
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Cli::parse();

    if args.verbose {
        setup_verbose_logging()?;
    }

    if let Err(e) = CurlExecutor::check_available().await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
    let base_url = args.url;

    let credentials = match (args.user, args.token) {
        (Some(user), Some(token)) => Some(Credentials { user, token }),
        (None, None) => None,
        _ => return Err(eyre!("--user and --token must be given together")),
    };

    let executor = Arc::new(CurlExecutor::new(credentials));
    let source: Arc<dyn RemoteJobSource> = Arc::new(JenkinsSource::new(&base_url, executor));
    let config = Arc::new(FileConfigStore::new(args.config.unwrap_or_else(settings_path)));
    tracing::debug!(settings = ?config.path(), url = %base_url, "configuration resolved");

    let assume_yes = matches!(
        args.command,
        Command::History(HistoryCommand::Delete { yes: true, .. })
    );
    let prompt: Arc<dyn ConfirmationPrompt> = if assume_yes {
        Arc::new(AssumeYes)
    } else {
        Arc::new(TerminalPrompt)
    };
    let notifier = notify::sink(!args.no_notify);

    let mut app = App::new(
        source,
        config,
        prompt,
        notifier.clone(),
        render::terminal_width(),
    )
    .await?;

    match app.execute(args.command).await {
        Ok(lines) => {
            for line in lines {
                println!("{line}");
            }
            Ok(())
        }
        Err(e) => {
            notifier.error(&e.to_string());
            Err(e.into())
        }
    }
}
