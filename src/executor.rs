use async_trait::async_trait;
use color_eyre::eyre::{eyre, Result};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

const CURL_TIMEOUT: Duration = Duration::from_secs(30);
const RESPONSE_SIZE_LIMIT: usize = 10 * 1024 * 1024; // 10 MB

/// HTTP access to the Jenkins server plus the local browser.
#[async_trait]
pub trait JenkinsExecutor: Send + Sync {
    async fn get(&self, url: &str) -> Result<String>;
    async fn post(&self, url: &str) -> Result<()>;
    fn open_in_browser(&self, url: &str) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct Credentials {
    pub user: String,
    pub token: String,
}

/// Runs `curl` for every request. Credentials are fed through stdin so they
/// never show up in the process list.
pub struct CurlExecutor {
    credentials: Option<Credentials>,
}

impl CurlExecutor {
    pub fn new(credentials: Option<Credentials>) -> Self {
        Self { credentials }
    }

    pub async fn check_available() -> Result<()> {
        let version = Command::new("curl").arg("--version").output();
        let output = tokio::time::timeout(CURL_TIMEOUT, version)
            .await
            .map_err(|_| eyre!("curl --version timed out after {}s", CURL_TIMEOUT.as_secs()))?
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    eyre!("curl not found. Install it with your package manager.")
                } else {
                    eyre!("Failed to run curl: {e}")
                }
            })?;
        if !output.status.success() {
            return Err(eyre!("curl --version exited with {}", output.status));
        }
        Ok(())
    }

    async fn run_curl(&self, args: &[&str]) -> Result<String> {
        let start = std::time::Instant::now();
        let mut child = Command::new("curl")
            .args(["--silent", "--show-error", "--fail", "--globoff", "--config", "-"])
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    eyre!("curl not found. Install it with your package manager.")
                } else {
                    eyre!("Failed to run curl: {e}")
                }
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            if let Some(creds) = &self.credentials {
                let line = format!(
                    "user = \"{}:{}\"\n",
                    escape_config(&creds.user),
                    escape_config(&creds.token)
                );
                stdin
                    .write_all(line.as_bytes())
                    .await
                    .map_err(|e| eyre!("Failed to pass credentials to curl: {e}"))?;
            }
            drop(stdin);
        }

        let output = tokio::time::timeout(CURL_TIMEOUT, child.wait_with_output())
            .await
            .map_err(|_| eyre!("Jenkins request timed out after {}s", CURL_TIMEOUT.as_secs()))?
            .map_err(|e| eyre!("Failed to run curl: {e}"))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(eyre!("{}", classify_curl_error(output.status.code(), &stderr)));
        }

        let body = String::from_utf8_lossy(&output.stdout).to_string();
        check_response_size(&body)?;
        tracing::debug!(
            args = ?args,
            bytes = body.len(),
            elapsed_ms = start.elapsed().as_millis(),
            "curl request completed"
        );
        Ok(body)
    }
}

#[async_trait]
impl JenkinsExecutor for CurlExecutor {
    async fn get(&self, url: &str) -> Result<String> {
        self.run_curl(&[url]).await
    }

    async fn post(&self, url: &str) -> Result<()> {
        self.run_curl(&["--request", "POST", url]).await.map(|_| ())
    }

    fn open_in_browser(&self, url: &str) -> Result<()> {
        open_in_browser_impl(url)
    }
}

fn escape_config(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

fn check_response_size(body: &str) -> Result<()> {
    if body.len() > RESPONSE_SIZE_LIMIT {
        return Err(eyre!(
            "Response too large ({:.1} MB, max {} MB)",
            body.len() as f64 / (1024.0 * 1024.0),
            RESPONSE_SIZE_LIMIT / (1024 * 1024)
        ));
    }
    Ok(())
}

/// Opens a URL in the user's default browser.
///
/// Windows and macOS are detected at compile time; WSL2 compiles as Linux and
/// is detected at runtime so `wslview` is used instead of `xdg-open`.
fn open_in_browser_impl(url: &str) -> Result<()> {
    use std::process::Command;

    if !url.starts_with("https://") && !url.starts_with("http://") {
        return Err(eyre!("Refusing to open non-HTTP URL: {url}"));
    }

    if cfg!(target_os = "windows") {
        // The empty title keeps `start` from treating the URL as a window title.
        return Command::new("cmd")
            .args(["/C", "start", "", url])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map(|_| ())
            .map_err(|e| eyre!("Failed to open browser: {e}"));
    }

    let cmd = if cfg!(target_os = "macos") {
        "open"
    } else if std::env::var_os("WSL_DISTRO_NAME").is_some() {
        "wslview"
    } else {
        "xdg-open"
    };

    match Command::new(cmd)
        .arg(url)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
    {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            if std::env::var_os("WSL_DISTRO_NAME").is_some() {
                return Command::new("cmd.exe")
                    .args(["/C", "start", "", url])
                    .stdin(Stdio::null())
                    .stdout(Stdio::null())
                    .stderr(Stdio::null())
                    .spawn()
                    .map(|_| ())
                    .map_err(|e| eyre!("Failed to open browser via cmd.exe: {e}"));
            }
            Err(eyre!(
                "No browser opener found. On WSL install wslu; on Linux install xdg-utils."
            ))
        }
        Err(e) => Err(eyre!("Failed to open browser with {cmd}: {e}")),
    }
}

/// Turns curl's exit status and stderr into a message for the operator.
///
/// With `--fail`, HTTP errors exit with 22 and print "The requested URL
/// returned error: 403" on stderr.
pub fn classify_curl_error(code: Option<i32>, stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.contains("error: 401") || trimmed.contains("error: 403") {
        return "Jenkins rejected the credentials. Check --user and --token (or JENKINS_USER / JENKINS_TOKEN).".to_string();
    }
    if trimmed.contains("error: 404") {
        return "Jenkins returned 404. Check --url and the job name.".to_string();
    }
    match code {
        Some(6 | 7) => format!("Jenkins server unreachable: {trimmed}"),
        Some(28) => "Jenkins request timed out".to_string(),
        _ if trimmed.is_empty() => "curl request failed".to_string(),
        _ => format!("curl request failed: {trimmed}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_unauthorized() {
        let msg = classify_curl_error(
            Some(22),
            "curl: (22) The requested URL returned error: 401",
        );
        assert!(msg.contains("rejected the credentials"));
    }

    #[test]
    fn classify_forbidden() {
        let msg = classify_curl_error(
            Some(22),
            "curl: (22) The requested URL returned error: 403 Forbidden",
        );
        assert!(msg.contains("rejected the credentials"));
    }

    #[test]
    fn classify_not_found() {
        let msg = classify_curl_error(Some(22), "curl: (22) The requested URL returned error: 404");
        assert!(msg.contains("404"));
    }

    #[test]
    fn classify_connection_refused() {
        let msg = classify_curl_error(
            Some(7),
            "curl: (7) Failed to connect to localhost port 8080: Connection refused",
        );
        assert!(msg.starts_with("Jenkins server unreachable"));
    }

    #[test]
    fn classify_unknown_host() {
        let msg = classify_curl_error(Some(6), "curl: (6) Could not resolve host: jenkins");
        assert!(msg.starts_with("Jenkins server unreachable"));
    }

    #[test]
    fn classify_timeout() {
        assert_eq!(
            classify_curl_error(Some(28), "curl: (28) Operation timed out"),
            "Jenkins request timed out"
        );
    }

    #[test]
    fn classify_empty_stderr() {
        assert_eq!(classify_curl_error(Some(1), "  \n"), "curl request failed");
    }

    #[test]
    fn config_values_are_escaped() {
        assert_eq!(escape_config(r#"a"b\c"#), r#"a\"b\\c"#);
    }

    #[test]
    fn response_size_limit() {
        assert!(check_response_size("{}").is_ok());
        let big = "x".repeat(RESPONSE_SIZE_LIMIT + 1);
        assert!(check_response_size(&big).is_err());
    }

    #[test]
    fn refuses_non_http_urls() {
        assert!(open_in_browser_impl("file:///etc/passwd").is_err());
    }
}
