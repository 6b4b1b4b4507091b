//! Client for the agent status API.
pub mod client;
pub mod error;
pub mod models;

pub use client::{Endpoints, FinesseClient, StatusSource};
pub use error::ApiError;
pub use models::{AgentState, Credentials, ReasonCode, ReasonCodeList, StatusDocument};
