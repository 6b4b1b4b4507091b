use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::monitor::Outcome;

pub const NOT_READY_MESSAGE: &str = "disconnected — not-ready status";
pub const DEVICE_ERROR_MESSAGE: &str = "disconnected — check network/softphone/monitoring session";
pub const TEST_MESSAGE: &str = "test notification - notifier is working";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    NotReady,
    DeviceError,
    TimeExceeded,
    Test,
}

impl NotificationKind {
    pub fn icon(&self) -> &'static str {
        match self {
            NotificationKind::NotReady => "⚠️",
            NotificationKind::DeviceError => "🔌",
            NotificationKind::TimeExceeded => "⏰",
            NotificationKind::Test => "🔔",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub message: String,
    pub agent_id: String,
    pub timestamp: DateTime<Utc>,
}

impl Notification {
    /// Composes the fixed message for `outcome`. Nominal outcomes produce nothing.
    pub fn for_outcome(outcome: &Outcome, agent_id: &str) -> Option<Self> {
        let (kind, message) = match outcome {
            Outcome::Nominal => return None,
            Outcome::NotReady => (NotificationKind::NotReady, NOT_READY_MESSAGE.to_string()),
            Outcome::DeviceError | Outcome::ConnectionError => {
                (NotificationKind::DeviceError, DEVICE_ERROR_MESSAGE.to_string())
            }
            Outcome::PausedExceeded { minutes } => (
                NotificationKind::TimeExceeded,
                format!("pause duration exceeded {minutes} minutes"),
            ),
        };
        Some(Self {
            kind,
            message,
            agent_id: agent_id.to_string(),
            timestamp: Utc::now(),
        })
    }

    /// One-line form used by the plain-text channels.
    pub fn headline(&self) -> String {
        format!("{} *Finesse Alert* - {}", self.kind.icon(), self.message)
    }

    pub fn test(agent_id: &str) -> Self {
        Self {
            kind: NotificationKind::Test,
            message: TEST_MESSAGE.to_string(),
            agent_id: agent_id.to_string(),
            timestamp: Utc::now(),
        }
    }
}

fn default_true() -> bool {
    true
}

/// Which channels receive notifications.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NotificationSettings {
    #[serde(default = "default_true")]
    pub desktop: bool,
    #[serde(default)]
    pub webhook: Option<WebhookSettings>,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            desktop: true,
            webhook: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WebhookSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub url: String,
    #[serde(default)]
    pub headers: Option<HashMap<String, String>>,
    /// Tera template for the request body; the chat-card payload is used when absent.
    #[serde(default)]
    pub body_template: Option<String>,
}
