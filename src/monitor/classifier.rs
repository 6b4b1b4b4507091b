//! Maps a status read onto the notification taxonomy.
//!
//! Rules are applied in a fixed order and the first match wins:
//!
//! 1. the read itself failed → [`Outcome::ConnectionError`]
//! 2. reason code `-1` → [`Outcome::NotReady`]
//! 3. reason code in `1..=22` → [`Classification::EnterPauseWindow`]
//! 4. reason code `23` or `28` → [`Outcome::DeviceError`]
//! 5. state `NOT_READY` → [`Outcome::NotReady`]
//! 6. anything else → [`Outcome::Nominal`]
//!
//! Code 23 sits outside the pause band and counts as a device error, like 28.
use std::fmt;

use crate::finesse::{ApiError, StatusDocument};

const NOT_READY_REASON_CODE: i32 = -1;
const DEVICE_ERROR_REASON_CODES: [i32; 2] = [23, 28];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Nominal,
    NotReady,
    DeviceError,
    ConnectionError,
    PausedExceeded { minutes: u32 },
}

impl Outcome {
    pub fn is_nominal(&self) -> bool {
        matches!(self, Outcome::Nominal)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Nominal => f.write_str("nominal"),
            Outcome::NotReady => f.write_str("not-ready"),
            Outcome::DeviceError => f.write_str("device-error"),
            Outcome::ConnectionError => f.write_str("connection-error"),
            Outcome::PausedExceeded { minutes } => write!(f, "paused-exceeded({minutes}m)"),
        }
    }
}

/// The decision for one poll.
///
/// A pause is not reported straight away: the scheduler suspends polling and only
/// reports [`Outcome::PausedExceeded`] once the pause threshold has elapsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Outcome(Outcome),
    EnterPauseWindow { reason_code_id: i32 },
}

pub fn classify(doc: &StatusDocument) -> Classification {
    let reason_code_id = doc.reason_code_id();

    match reason_code_id {
        Some(NOT_READY_REASON_CODE) => return Classification::Outcome(Outcome::NotReady),
        Some(rc) if rc > 0 && rc < 23 => {
            return Classification::EnterPauseWindow { reason_code_id: rc };
        }
        Some(rc) if DEVICE_ERROR_REASON_CODES.contains(&rc) => {
            return Classification::Outcome(Outcome::DeviceError);
        }
        _ => {}
    }

    if doc.state_text() == Some("NOT_READY") {
        return Classification::Outcome(Outcome::NotReady);
    }
    Classification::Outcome(Outcome::Nominal)
}

/// Classifies the result of a status read, failed reads included.
pub fn classify_poll(result: &Result<StatusDocument, ApiError>) -> Classification {
    match result {
        Ok(doc) => classify(doc),
        Err(_) => Classification::Outcome(Outcome::ConnectionError),
    }
}
