//! Drives periodic status polls for one bound agent.
//!
//! While `Polling`, a repeating timer fires every standard interval. A poll that lands in
//! the pause band switches to `Suspended`: the repeating timer is dropped and a one-shot
//! deadline is armed for the rest of the pause threshold. When it expires a
//! [`Outcome::PausedExceeded`] is reported and polling resumes.
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use super::classifier::{Classification, Outcome, classify_poll};
use super::hooks::MonitorHooks;
use super::timer_config::{ConfigError, TimerConfig};
use crate::finesse::{ApiError, Credentials, StatusSource};
use crate::notifications::Dispatcher;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MonitorError {
    #[error("invalid timer configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("a credential set is already bound; unbind it first")]
    AlreadyBound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Idle,
    Polling { interval: Duration },
    Suspended { delay: Duration, resume_at: Instant },
}

/// Owns the polling task for at most one credential set.
pub struct Scheduler {
    source: Arc<dyn StatusSource>,
    dispatcher: Arc<Dispatcher>,
    hooks: Arc<dyn MonitorHooks>,
    config: TimerConfig,
    state_tx: Arc<watch::Sender<MonitorState>>,
    session: Option<Session>,
}

struct Session {
    agent_id: String,
    handle: JoinHandle<()>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    config_tx: watch::Sender<TimerConfig>,
    active: Arc<AtomicBool>,
}

impl Session {
    fn stop(&mut self) {
        self.active.store(false, Ordering::SeqCst);
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        self.handle.abort();
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.stop();
    }
}

impl Scheduler {
    pub fn new(
        source: Arc<dyn StatusSource>,
        dispatcher: Arc<Dispatcher>,
        hooks: Arc<dyn MonitorHooks>,
    ) -> Self {
        let (state_tx, _) = watch::channel(MonitorState::Idle);
        Self {
            source,
            dispatcher,
            hooks,
            config: TimerConfig::default(),
            state_tx: Arc::new(state_tx),
            session: None,
        }
    }

    /// Starts polling for `credentials`. The first poll happens one standard interval from now.
    pub fn bind(&mut self, credentials: Credentials, config: TimerConfig) -> Result<(), MonitorError> {
        config.validate()?;
        if self.session.is_some() {
            return Err(MonitorError::AlreadyBound);
        }

        let agent_id = credentials.agent_id.clone();
        let active = Arc::new(AtomicBool::new(true));
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let (config_tx, config_rx) = watch::channel(config);

        self.config = config;
        self.state_tx.send_replace(MonitorState::Polling {
            interval: config.standard_interval(),
        });

        let task = PollTask {
            credentials,
            source: self.source.clone(),
            dispatcher: self.dispatcher.clone(),
            hooks: self.hooks.clone(),
            state_tx: self.state_tx.clone(),
            config_rx,
            active: active.clone(),
        };
        let handle = tokio::spawn(task.run(shutdown_rx));

        info!(
            agent_id = %agent_id,
            standard_interval_minutes = config.standard_interval_minutes,
            pause_threshold_minutes = config.pause_threshold_minutes,
            "Monitoring started."
        );
        self.session = Some(Session {
            agent_id,
            handle,
            shutdown_tx: Some(shutdown_tx),
            config_tx,
            active,
        });
        Ok(())
    }

    /// Stops polling and disarms both timers before returning.
    pub fn unbind(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.stop();
            info!(agent_id = %session.agent_id, "Monitoring stopped.");
        }
        self.state_tx.send_replace(MonitorState::Idle);
    }

    /// Applies new timers. A running interval is re-armed from now; a pending pause
    /// deadline is left as it was.
    pub fn reconfigure(&mut self, config: TimerConfig) -> Result<(), MonitorError> {
        config.validate()?;
        self.config = config;
        if let Some(session) = &self.session {
            session.config_tx.send_replace(config);
            info!(
                agent_id = %session.agent_id,
                standard_interval_minutes = config.standard_interval_minutes,
                pause_threshold_minutes = config.pause_threshold_minutes,
                "Timers reconfigured."
            );
        }
        Ok(())
    }

    pub fn state(&self) -> MonitorState {
        *self.state_tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<MonitorState> {
        self.state_tx.subscribe()
    }

    pub fn config(&self) -> TimerConfig {
        self.config
    }

    pub fn bound_agent(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.agent_id.as_str())
    }
}

struct PollTask {
    credentials: Credentials,
    source: Arc<dyn StatusSource>,
    dispatcher: Arc<Dispatcher>,
    hooks: Arc<dyn MonitorHooks>,
    state_tx: Arc<watch::Sender<MonitorState>>,
    config_rx: watch::Receiver<TimerConfig>,
    active: Arc<AtomicBool>,
}

impl PollTask {
    async fn run(mut self, mut shutdown_rx: oneshot::Receiver<()>) {
        'session: loop {
            let config = *self.config_rx.borrow_and_update();
            let period = config.standard_interval();
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            self.publish(MonitorState::Polling { interval: period });

            let armed_with = loop {
                tokio::select! {
                    biased;
                    _ = &mut shutdown_rx => return,
                    changed = self.config_rx.changed() => {
                        if changed.is_err() {
                            return;
                        }
                        continue 'session;
                    }
                    _ = interval.tick() => {
                        if let Classification::EnterPauseWindow { reason_code_id } = self.poll_once().await {
                            debug!(reason_code_id, "Pause observed; suspending polling.");
                            break *self.config_rx.borrow();
                        }
                    }
                }
            };

            let delay = armed_with.pause_window();
            let deadline = Instant::now() + delay;
            self.publish(MonitorState::Suspended {
                delay,
                resume_at: deadline,
            });

            loop {
                tokio::select! {
                    biased;
                    _ = &mut shutdown_rx => return,
                    changed = self.config_rx.changed() => {
                        if changed.is_err() {
                            return;
                        }
                    }
                    _ = tokio::time::sleep_until(deadline) => break,
                }
            }

            let outcome = Outcome::PausedExceeded {
                minutes: armed_with.pause_threshold_minutes,
            };
            warn!(agent_id = %self.credentials.agent_id, %outcome, "Pause threshold exceeded.");
            self.report(Classification::Outcome(outcome)).await;
        }
    }

    async fn poll_once(&self) -> Classification {
        let result = AssertUnwindSafe(self.source.fetch_status(&self.credentials))
            .catch_unwind()
            .await
            .unwrap_or_else(|_| Err(ApiError::Transport("status source panicked".to_string())));

        if let Err(e) = &result {
            warn!(agent_id = %self.credentials.agent_id, error = %e, "Status poll failed.");
        }
        let classification = classify_poll(&result);
        debug!(agent_id = %self.credentials.agent_id, ?classification, "Poll classified.");
        self.report(classification).await;
        classification
    }

    /// `unbind` can land between any two steps, so `active` is checked before each side effect.
    async fn report(&self, classification: Classification) {
        if !self.is_active() {
            return;
        }
        guarded("on_tick", || self.hooks.on_tick(&classification));

        let Classification::Outcome(outcome) = classification else {
            return;
        };
        if outcome.is_nominal() || !self.is_active() {
            return;
        }
        guarded("request_focus", || self.hooks.request_focus(&outcome));

        if !self.is_active() {
            return;
        }
        self.dispatcher
            .dispatch(&outcome, &self.credentials.agent_id)
            .await;
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    fn publish(&self, state: MonitorState) {
        let active = &self.active;
        self.state_tx.send_if_modified(|current| {
            if !active.load(Ordering::SeqCst) {
                return false;
            }
            *current = state;
            true
        });
    }
}

fn guarded(hook: &str, f: impl FnOnce()) {
    if std::panic::catch_unwind(AssertUnwindSafe(f)).is_err() {
        error!(hook, "Monitor hook panicked.");
    }
}
