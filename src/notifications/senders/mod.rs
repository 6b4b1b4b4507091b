use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use super::models::{Notification, NotificationSettings};

pub mod desktop;
pub mod webhook;

#[derive(Error, Debug)]
pub enum SenderError {
    #[error("Failed to send notification: {0}")]
    SendFailed(String),
    #[error("Invalid configuration for sender: {0}")]
    InvalidConfiguration(String),
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),
    #[error("Templating error: {0}")]
    TemplatingError(String),
    #[error("Send timed out after {0:?}")]
    TimedOut(Duration),
}

/// One delivery channel for notifications.
#[async_trait]
pub trait NotificationSender: Send + Sync {
    fn name(&self) -> &str;

    async fn send(&self, notification: &Notification) -> Result<(), SenderError>;
}

/// Builds the enabled channels. `link_url` is offered as a shortcut in rich payloads.
pub fn build_senders(
    settings: &NotificationSettings,
    link_url: &str,
) -> Result<Vec<Arc<dyn NotificationSender>>, SenderError> {
    let mut senders: Vec<Arc<dyn NotificationSender>> = Vec::new();

    if settings.desktop {
        senders.push(Arc::new(desktop::DesktopSender::new()));
    }
    if let Some(webhook) = settings.webhook.as_ref().filter(|w| w.enabled) {
        senders.push(Arc::new(webhook::WebhookSender::new(
            webhook.clone(),
            link_url.to_string(),
        )?));
    }

    info!(
        channels = ?senders.iter().map(|s| s.name()).collect::<Vec<_>>(),
        "Notification channels configured."
    );
    Ok(senders)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifications::models::WebhookSettings;

    fn webhook(enabled: bool) -> WebhookSettings {
        WebhookSettings {
            enabled,
            url: "https://chat.example/hook".to_string(),
            headers: None,
            body_template: None,
        }
    }

    #[test]
    fn test_build_senders_respects_flags() {
        let all = build_senders(
            &NotificationSettings {
                desktop: true,
                webhook: Some(webhook(true)),
            },
            "https://host/",
        )
        .unwrap();
        let names: Vec<_> = all.iter().map(|s| s.name().to_string()).collect();
        assert_eq!(names, vec!["desktop", "webhook"]);

        let none = build_senders(
            &NotificationSettings {
                desktop: false,
                webhook: Some(webhook(false)),
            },
            "https://host/",
        )
        .unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn test_invalid_header_is_rejected_up_front() {
        let mut settings = webhook(true);
        settings.headers = Some([("bad header".to_string(), "x".to_string())].into());
        let result = build_senders(
            &NotificationSettings {
                desktop: false,
                webhook: Some(settings),
            },
            "https://host/",
        );
        assert!(matches!(result, Err(SenderError::InvalidConfiguration(_))));
    }
}
