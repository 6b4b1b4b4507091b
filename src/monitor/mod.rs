pub mod classifier;
pub mod hooks;
pub mod scheduler;
pub mod timer_config;

pub use classifier::{Classification, Outcome, classify, classify_poll};
pub use hooks::{MonitorHooks, NoopHooks};
pub use scheduler::{MonitorError, MonitorState, Scheduler};
pub use timer_config::{ConfigError, TimerConfig};
