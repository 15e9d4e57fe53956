mod cli;
mod config;
mod storage;

use std::fmt::Write as _;

use crate::cli::ConfigCommand;
use chrono::{DateTime, Utc};
use clap::Parser;
use color_eyre::Result;
use petvault_core::{
    config::CryptoConfig,
    state::{GameState, Message, SharedState, Speaker},
    storage::KeyValueStore,
};
use petvault_persist::{FreshReason, LoadOutcome, PersistenceController, PersistenceSettings};
use petvault_storage::{
    file_store::FileKeyValueStore, sealer::StateSealer, secret::SecretProvider,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const PROBE_KEY: &str = "health/probe";
const RECENT_MESSAGES: usize = 5;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    init_tracing();

    let cli = cli::Cli::parse();
    let config = config::load()?;
    match cli.command.unwrap_or(cli::Command::Status) {
        cli::Command::Status => run_status(&config).await?,
        cli::Command::Say { text } => run_say(text, &config).await?,
        cli::Command::Reset => run_reset(&config).await?,
        cli::Command::Health => run_health_check(&config).await?,
        cli::Command::Version => print_version(),
        cli::Command::Config(ConfigCommand::Init) => init_config(&config)?,
    }

    Ok(())
}

fn init_tracing() {
    // Respect user-provided filters, default to warn so status output stays readable.
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

fn print_version() {
    println!("petvault {}", env!("CARGO_PKG_VERSION"));
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Build a controller over the configured store and run the initial load.
async fn open_session(
    config: &config::Config,
) -> Result<(PersistenceController<FileKeyValueStore>, LoadOutcome)> {
    let store = storage::store_from_config(config)?;
    let secrets = storage::secret_provider_from_config(config);
    Ok(open_session_with(store, secrets, config.persistence_settings(), now_millis()).await)
}

async fn open_session_with<S: KeyValueStore + 'static>(
    store: S,
    secrets: impl SecretProvider + 'static,
    settings: PersistenceSettings,
    now: i64,
) -> (PersistenceController<S>, LoadOutcome) {
    let state = SharedState::new(GameState::fresh(now));
    let controller = PersistenceController::new(store, secrets, state, settings);
    let outcome = controller.load().await;
    (controller, outcome)
}

async fn run_status(config: &config::Config) -> Result<()> {
    let (controller, outcome) = open_session(config).await?;
    print!("{}", render_status(&controller.state().snapshot(), &outcome));
    Ok(())
}

async fn run_say(text: Vec<String>, config: &config::Config) -> Result<()> {
    let (controller, _) = open_session(config).await?;
    say(&controller, text.join(" "), now_millis()).await?;
    let state = controller.state().snapshot();
    println!("Saved. {} message(s) in history.", state.messages.len());
    Ok(())
}

async fn say<S: KeyValueStore + 'static>(
    controller: &PersistenceController<S>,
    text: String,
    at: i64,
) -> Result<()> {
    let message = Message::new(Speaker::User, text, at)?;
    controller.state().update(|s| s.record_message(message));
    controller.notify_state_changed();
    controller.flush().await?;
    Ok(())
}

async fn run_reset(config: &config::Config) -> Result<()> {
    let store = storage::store_from_config(config)?;
    let secrets = storage::secret_provider_from_config(config);
    let controller = PersistenceController::new(
        store,
        secrets,
        SharedState::new(GameState::fresh(now_millis())),
        config.persistence_settings(),
    );
    controller.clear().await;
    println!("Save cleared. Your next session starts with a new pet.");
    Ok(())
}

/// Runs a quick health check of the save path.
async fn run_health_check(config: &config::Config) -> Result<()> {
    let store = storage::store_from_config(config)?;
    let secrets = storage::secret_provider_from_config(config);
    run_store_health(&store, secrets.as_ref(), config.crypto).await?;
    let mode = if config.crypto.enabled {
        "encrypted"
    } else {
        "plaintext"
    };
    println!("Storage: ok ({mode})");
    Ok(())
}

async fn run_store_health<S: KeyValueStore>(
    store: &S,
    secrets: &dyn SecretProvider,
    crypto: CryptoConfig,
) -> Result<()> {
    let payload = b"ok";
    let sealer = StateSealer::new(crypto.key_derivation_iterations);
    let secret = if crypto.enabled {
        Some(secrets.secret().await?)
    } else {
        None
    };

    let record = match &secret {
        Some(secret) => sealer.seal(payload, secret)?,
        None => String::from_utf8_lossy(payload).into_owned(),
    };
    store.set(PROBE_KEY, &record).await?;
    let stored = store
        .get(PROBE_KEY)
        .await?
        .ok_or_else(|| color_eyre::eyre::eyre!("probe record vanished"))?;
    store.delete(PROBE_KEY).await?;

    let round_trip = match &secret {
        Some(secret) => sealer.open(&stored, secret)?.to_vec(),
        None => stored.into_bytes(),
    };
    if round_trip != payload {
        color_eyre::eyre::bail!("storage round-trip failed");
    }
    Ok(())
}

fn init_config(config: &config::Config) -> Result<()> {
    let path = config::write_default_if_missing(config)?;
    println!("Config initialized at {}", path.display());
    Ok(())
}

fn render_status(state: &GameState, outcome: &LoadOutcome) -> String {
    let mut out = String::new();
    let headline = match outcome {
        LoadOutcome::Restored(_) | LoadOutcome::AlreadyLoaded => "Welcome back!".to_string(),
        LoadOutcome::Fresh(FreshReason::NoSavedState) => {
            "No save found. Meet your new pet!".to_string()
        }
        LoadOutcome::Fresh(FreshReason::Unreadable(kind)) => {
            format!("Save could not be read ({kind:?}). Starting with a new pet.")
        }
    };
    let p = &state.parameters;
    let _ = writeln!(out, "{headline}");
    let _ = writeln!(out, "Level {}  XP {}", p.level, p.xp);
    let _ = writeln!(
        out,
        "Intelligence {}  Memory {}  Friendliness {}",
        p.intelligence, p.memory, p.friendliness
    );
    let _ = writeln!(out, "Energy {}  Mood {}", p.energy, p.mood);
    let _ = writeln!(
        out,
        "Born {}  Last seen {}",
        format_millis(state.created_at),
        format_millis(state.last_action_time)
    );

    let skip = state.messages.len().saturating_sub(RECENT_MESSAGES);
    for message in &state.messages[skip..] {
        let _ = writeln!(
            out,
            "[{}] {}: {}",
            format_millis(message.timestamp),
            message.speaker.as_str(),
            message.text
        );
    }
    out
}

fn format_millis(ms: i64) -> String {
    DateTime::from_timestamp_millis(ms)
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| ms.to_string())
}
