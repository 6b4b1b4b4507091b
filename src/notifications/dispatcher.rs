use futures::FutureExt;
use futures::future::join_all;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

use super::models::Notification;
use super::senders::{NotificationSender, SenderError};
use crate::monitor::Outcome;

/// The result of handing one notification to one channel.
#[derive(Debug)]
pub struct Delivery {
    pub channel: String,
    pub result: Result<(), SenderError>,
}

/// Upper bound on a single channel's send.
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Fans a notification out to every configured channel.
pub struct Dispatcher {
    senders: Vec<Arc<dyn NotificationSender>>,
    send_timeout: Duration,
}

impl Dispatcher {
    pub fn new(senders: Vec<Arc<dyn NotificationSender>>) -> Self {
        Self {
            senders,
            send_timeout: DEFAULT_SEND_TIMEOUT,
        }
    }

    pub fn with_send_timeout(mut self, send_timeout: Duration) -> Self {
        self.send_timeout = send_timeout;
        self
    }

    pub fn channel_count(&self) -> usize {
        self.senders.len()
    }

    /// Composes the message for `outcome` and sends it. Channel failures are logged, never returned.
    pub async fn dispatch(&self, outcome: &Outcome, agent_id: &str) {
        let Some(notification) = Notification::for_outcome(outcome, agent_id) else {
            return;
        };
        info!(%outcome, agent_id, message = %notification.message, "Dispatching notification.");
        self.deliver(&notification).await;
    }

    /// Sends to all channels concurrently. Each send is cut off after the send timeout, so a
    /// hung channel delays the caller by at most that long.
    pub async fn deliver(&self, notification: &Notification) -> Vec<Delivery> {
        let send_timeout = self.send_timeout;
        let sends = self.senders.iter().map(|sender| async move {
            let guarded = AssertUnwindSafe(sender.send(notification)).catch_unwind();
            let result = match tokio::time::timeout(send_timeout, guarded).await {
                Ok(Ok(result)) => result,
                Ok(Err(_)) => Err(SenderError::SendFailed("sender panicked".to_string())),
                Err(_) => Err(SenderError::TimedOut(send_timeout)),
            };

            match &result {
                Ok(()) => debug!(channel = sender.name(), "Notification delivered."),
                Err(e) => error!(channel = sender.name(), error = %e, "Notification delivery failed."),
            }
            Delivery {
                channel: sender.name().to_string(),
                result,
            }
        });
        join_all(sends).await
    }
}
