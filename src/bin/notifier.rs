use clap::{Parser, Subcommand};
use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use tracing_appender::rolling;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use finesse_notifier::config::{NotifierConfig, load_cli_config};
use finesse_notifier::finesse::{AgentState, FinesseClient};
use finesse_notifier::monitor::{
    Classification, MonitorHooks, MonitorState, Outcome, Scheduler, classify,
};
use finesse_notifier::notifications::{Dispatcher, Notification, build_senders};
use finesse_notifier::version::VERSION;

#[derive(Parser, Debug)]
#[command(author, version = VERSION, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "notifier.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in and keep watching the agent until interrupted
    Run,
    /// Read the agent's status once and print it as JSON
    Status,
    /// Move the agent into another state (READY, NOT_READY, ...)
    SetState {
        state: String,
        #[arg(long)]
        reason_code: Option<i32>,
    },
    /// List the NOT_READY reason codes known to the server
    ReasonCodes,
    /// Send a test message through every configured channel
    TestNotification,
}

fn init_logging() {
    let file_appender = rolling::daily("logs", "notifier.log");
    let file_layer = fmt::layer()
        .with_writer(file_appender)
        .with_ansi(false)
        .json();

    let stdout_layer = fmt::layer().with_writer(std::io::stdout);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer)
        .init();
}

/// Surfaces monitor events in the log; a desktop build would raise its window here.
struct LoggingHooks;

impl MonitorHooks for LoggingHooks {
    fn on_tick(&self, classification: &Classification) {
        match classification {
            Classification::Outcome(Outcome::Nominal) => debug!("Agent status nominal."),
            other => debug!(classification = ?other, "Agent status checked."),
        }
    }

    fn request_focus(&self, outcome: &Outcome) {
        warn!(%outcome, "Agent needs attention.");
    }
}

#[cfg(unix)]
struct ReloadSignal(tokio::signal::unix::Signal);

#[cfg(unix)]
impl ReloadSignal {
    fn new() -> std::io::Result<Self> {
        use tokio::signal::unix::{SignalKind, signal};
        Ok(Self(signal(SignalKind::hangup())?))
    }

    async fn recv(&mut self) {
        if self.0.recv().await.is_none() {
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
struct ReloadSignal;

#[cfg(not(unix))]
impl ReloadSignal {
    fn new() -> std::io::Result<Self> {
        Ok(Self)
    }

    async fn recv(&mut self) {
        std::future::pending::<()>().await;
    }
}

async fn run(config_path: &Path, config: NotifierConfig) -> Result<(), Box<dyn Error>> {
    let client = Arc::new(FinesseClient::new(config.endpoints.clone())?);

    let status = client.fetch_status(&config.credentials).await.map_err(|e| {
        error!(error = %e, "Could not sign in with the configured credentials.");
        e
    })?;
    info!(
        agent = %status.display_name(),
        agent_id = %config.credentials.agent_id,
        state = status.state_text().unwrap_or("unknown"),
        "Signed in."
    );

    let senders = build_senders(&config.notifications, &config.console_url())?;
    let dispatcher = Arc::new(Dispatcher::new(senders));
    let mut scheduler = Scheduler::new(client.clone(), dispatcher, Arc::new(LoggingHooks));
    scheduler.bind(config.credentials.clone(), config.timers)?;

    let mut states = scheduler.subscribe();
    let mut reload = ReloadSignal::new()?;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupt received, shutting down.");
                break;
            }
            _ = reload.recv() => {
                reload_timers(config_path, &config, &mut scheduler);
            }
            changed = states.changed() => {
                if changed.is_err() {
                    break;
                }
                match *states.borrow_and_update() {
                    MonitorState::Idle => info!("Monitor idle."),
                    MonitorState::Polling { interval } => {
                        info!(interval_secs = interval.as_secs(), "Polling.");
                    }
                    MonitorState::Suspended { delay, .. } => {
                        info!(delay_secs = delay.as_secs(), "Polling suspended for pause window.");
                    }
                }
            }
        }
    }

    scheduler.unbind();
    Ok(())
}

fn reload_timers(config_path: &Path, current: &NotifierConfig, scheduler: &mut Scheduler) {
    info!(path = %config_path.display(), "Reload requested.");
    let fresh = match load_cli_config(config_path) {
        Ok(fresh) => fresh,
        Err(e) => {
            error!(error = %e, "Reload failed; keeping current timers.");
            return;
        }
    };

    if fresh.credentials.agent_id != current.credentials.agent_id
        || fresh.credentials.username != current.credentials.username
        || fresh.endpoints != current.endpoints
    {
        warn!("Credential or endpoint changes take effect only after a restart.");
    }
    if let Err(e) = scheduler.reconfigure(fresh.timers) {
        error!(error = %e, "Reload rejected; keeping current timers.");
    }
}

async fn print_status(config: &NotifierConfig) -> Result<(), Box<dyn Error>> {
    let client = FinesseClient::new(config.endpoints.clone())?;
    let status = client.fetch_status(&config.credentials).await?;
    let classification = classify(&status);

    let report = serde_json::json!({
        "agent": status.display_name(),
        "state": status.state_text(),
        "reason_code_id": status.reason_code_id(),
        "classification": format!("{classification:?}"),
        "document": status.tree(),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn set_state(
    config: &NotifierConfig,
    state: &str,
    reason_code: Option<i32>,
) -> Result<(), Box<dyn Error>> {
    let client = FinesseClient::new(config.endpoints.clone())?;
    let target = AgentState::parse(&state.to_ascii_uppercase());
    let status = client
        .submit_state(&config.credentials, &target, reason_code)
        .await?;
    println!(
        "{} is now {}",
        status.display_name(),
        status.state_text().unwrap_or("unknown")
    );
    Ok(())
}

async fn list_reason_codes(config: &NotifierConfig) -> Result<(), Box<dyn Error>> {
    let client = FinesseClient::new(config.endpoints.clone())?;
    let list = client.list_reason_codes(&config.credentials).await?;
    for code in &list.codes {
        let id = code.id.map(|id| id.to_string()).unwrap_or_else(|| "-".to_string());
        println!(
            "{id}\t{}\t{}",
            code.code.as_deref().unwrap_or("-"),
            code.label
        );
    }
    Ok(())
}

async fn send_test_notification(config: &NotifierConfig) -> Result<(), Box<dyn Error>> {
    let senders = build_senders(&config.notifications, &config.console_url())?;
    if senders.is_empty() {
        println!("No notification channels are enabled.");
        return Ok(());
    }
    let dispatcher = Dispatcher::new(senders);
    let deliveries = dispatcher
        .deliver(&Notification::test(&config.credentials.agent_id))
        .await;
    for delivery in deliveries {
        match delivery.result {
            Ok(()) => println!("{}: sent", delivery.channel),
            Err(e) => println!("{}: failed ({e})", delivery.channel),
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    init_logging();
    info!(version = VERSION, "Starting finesse notifier...");

    let config = match load_cli_config(&args.config) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Critical error loading configuration. Exiting.");
            return Err(e.into());
        }
    };

    match args.command {
        Command::Run => run(&args.config, config).await,
        Command::Status => print_status(&config).await,
        Command::SetState { state, reason_code } => set_state(&config, &state, reason_code).await,
        Command::ReasonCodes => list_reason_codes(&config).await,
        Command::TestNotification => send_test_notification(&config).await,
    }
}
