pub mod dispatcher;
pub mod models;
pub mod senders;

pub use dispatcher::{Delivery, Dispatcher};
pub use models::{Notification, NotificationKind, NotificationSettings, WebhookSettings};
pub use senders::{NotificationSender, SenderError, build_senders};
