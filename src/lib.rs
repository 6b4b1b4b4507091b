//! Watches a call-center agent's status and raises alerts when the agent looks
//! disconnected or has been paused for too long.
pub mod config;
pub mod finesse;
pub mod markup;
pub mod monitor;
pub mod notifications;
pub mod version;
