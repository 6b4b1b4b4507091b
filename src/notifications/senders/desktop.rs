use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

use super::{NotificationSender, SenderError};
use crate::notifications::models::Notification;

const TITLE: &str = "Finesse Alert";

/// Raises a native desktop notification through the platform's notifier binary.
pub struct DesktopSender {
    launcher: Option<Launcher>,
}

enum Launcher {
    NotifySend,
    AppleScript,
    Custom { program: String, args: Vec<String> },
}

impl DesktopSender {
    pub fn new() -> Self {
        let launcher = if cfg!(target_os = "macos") {
            Some(Launcher::AppleScript)
        } else if cfg!(unix) {
            Some(Launcher::NotifySend)
        } else {
            None
        };
        Self { launcher }
    }

    /// Runs `program args.. <title> <body>` instead of the platform notifier.
    pub fn with_command(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            launcher: Some(Launcher::Custom {
                program: program.into(),
                args,
            }),
        }
    }
}

impl Default for DesktopSender {
    fn default() -> Self {
        Self::new()
    }
}

impl Launcher {
    fn command(&self, body: &str) -> Command {
        match self {
            Launcher::NotifySend => {
                let mut cmd = Command::new("notify-send");
                cmd.arg("--app-name=finesse-notifier").arg(TITLE).arg(body);
                cmd
            }
            Launcher::AppleScript => {
                let mut cmd = Command::new("osascript");
                cmd.arg("-e").arg(format!(
                    "display notification \"{}\" with title \"{}\"",
                    escape_applescript(body),
                    TITLE
                ));
                cmd
            }
            Launcher::Custom { program, args } => {
                let mut cmd = Command::new(program);
                cmd.args(args).arg(TITLE).arg(body);
                cmd
            }
        }
    }
}

fn escape_applescript(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

#[async_trait]
impl NotificationSender for DesktopSender {
    fn name(&self) -> &str {
        "desktop"
    }

    async fn send(&self, notification: &Notification) -> Result<(), SenderError> {
        let Some(launcher) = &self.launcher else {
            warn!(
                message = %notification.message,
                "No desktop notifier available on this platform."
            );
            return Ok(());
        };

        let body = format!("{} {}", notification.kind.icon(), notification.message);
        let output = launcher
            .command(&body)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| SenderError::SendFailed(format!("Failed to spawn notifier: {e}")))?;

        if !output.status.success() {
            return Err(SenderError::SendFailed(format!(
                "Notifier exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        debug!(kind = ?notification.kind, "Desktop notification shown.");
        Ok(())
    }
}
