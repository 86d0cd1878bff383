use jkw_core::traits::NotificationSink;
use std::sync::Arc;

/// Prints info to stdout and errors to stderr.
pub struct ConsoleSink;

impl NotificationSink for ConsoleSink {
    fn info(&self, message: &str) {
        println!("{message}");
    }

    fn error(&self, message: &str) {
        eprintln!("Error: {message}");
    }
}

/// Console output plus a desktop notification for errors.
pub struct DesktopSink {
    console: ConsoleSink,
}

impl DesktopSink {
    pub fn new() -> Self {
        Self {
            console: ConsoleSink,
        }
    }
}

impl Default for DesktopSink {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationSink for DesktopSink {
    fn info(&self, message: &str) {
        self.console.info(message);
    }

    fn error(&self, message: &str) {
        self.console.error(message);
        send_desktop("Jenkins", message);
    }
}

#[cfg(feature = "desktop-notify")]
fn send_desktop(summary: &str, body: &str) {
    use notify_rust::{Notification, Urgency};

    if let Err(e) = Notification::new()
        .summary(summary)
        .body(body)
        .icon("dialog-error")
        .urgency(Urgency::Critical)
        .show()
    {
        tracing::debug!(error = %e, "desktop notification failed");
    }
}

#[cfg(not(feature = "desktop-notify"))]
fn send_desktop(_summary: &str, _body: &str) {}

/// The sink for this run: desktop notifications unless `--no-notify`.
pub fn sink(desktop: bool) -> Arc<dyn NotificationSink> {
    if desktop && cfg!(feature = "desktop-notify") {
        Arc::new(DesktopSink::new())
    } else {
        Arc::new(ConsoleSink)
    }
}
