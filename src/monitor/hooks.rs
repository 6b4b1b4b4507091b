use super::{Classification, Outcome};

/// Callbacks for a UI that sits on top of the monitor.
///
/// Both methods run on the polling task, so implementations should return quickly.
pub trait MonitorHooks: Send + Sync {
    /// Called once per poll. A nominal classification means any previously shown error can be cleared.
    fn on_tick(&self, _classification: &Classification) {}

    /// Called for every outcome other than [`Outcome::Nominal`], asking the consumer to bring
    /// the relevant view to the foreground.
    fn request_focus(&self, _outcome: &Outcome) {}
}

pub struct NoopHooks;

impl MonitorHooks for NoopHooks {}
