use async_trait::async_trait;
use reqwest::{Client, header};
use serde_json::{Value, json};
use std::time::Duration;
use tera::{Context, Tera};

use super::{NotificationSender, SenderError};
use crate::notifications::models::{Notification, WebhookSettings};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Posts notifications to a chat webhook.
pub struct WebhookSender {
    client: Client,
    url: String,
    headers: header::HeaderMap,
    body_template: Option<String>,
    link_url: String,
}

impl WebhookSender {
    /// Header names and values are checked here so a bad entry fails at startup, not per alert.
    pub fn new(settings: WebhookSettings, link_url: String) -> Result<Self, SenderError> {
        let mut headers = header::HeaderMap::new();
        for (key, value) in settings.headers.iter().flatten() {
            let name = header::HeaderName::from_bytes(key.as_bytes()).map_err(|e| {
                SenderError::InvalidConfiguration(format!("Invalid header name: {e}"))
            })?;
            let value = header::HeaderValue::from_str(value).map_err(|e| {
                SenderError::InvalidConfiguration(format!("Invalid header value: {e}"))
            })?;
            headers.insert(name, value);
        }

        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(crate::version::user_agent())
            .build()?;

        Ok(Self {
            client,
            url: settings.url,
            headers,
            body_template: settings.body_template,
            link_url,
        })
    }

    fn render_body(&self, notification: &Notification) -> Result<String, SenderError> {
        match &self.body_template {
            Some(template) => {
                let mut context = Context::new();
                context.insert("message", &notification.message);
                context.insert("agent_id", &notification.agent_id);
                context.insert("timestamp", &notification.timestamp.to_rfc3339());
                context.insert("kind", &notification.kind);
                Tera::one_off(template, &context, false)
                    .map_err(|e| SenderError::TemplatingError(e.to_string()))
            }
            None => Ok(card_payload(notification, &self.link_url).to_string()),
        }
    }
}

fn card_payload(notification: &Notification, link_url: &str) -> Value {
    json!({
        "text": notification.headline(),
        "cards": [{
            "header": {
                "title": "🔔 Finesse Notifier",
                "subtitle": format!("Agent: {}", notification.agent_id),
            },
            "sections": [{
                "widgets": [
                    { "textParagraph": { "text": format!("<b>Message:</b> {}", notification.message) } },
                    { "textParagraph": { "text": format!(
                        "<b>Time:</b> {}",
                        notification.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
                    ) } },
                    { "buttons": [{
                        "textButton": {
                            "text": "Open Finesse",
                            "onClick": { "openLink": { "url": link_url } }
                        }
                    }] }
                ]
            }]
        }]
    })
}

#[async_trait]
impl NotificationSender for WebhookSender {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn send(&self, notification: &Notification) -> Result<(), SenderError> {
        let body = self.render_body(notification)?;

        let response = self
            .client
            .post(&self.url)
            .headers(self.headers.clone())
            .header(header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            return Err(SenderError::SendFailed(format!(
                "Webhook returned non-success status: {status}. Body: {error_body}"
            )));
        }

        Ok(())
    }
}
