//! Product recommender operator dashboard.
//!
//! Runs one dashboard session against the recommender API and drives it from
//! stdin. The active view is redrawn on stdout whenever the session changes;
//! logs go to stderr.
//!
//! # Usage
//!
//! ```bash
//! # Use RECOMMENDER_API_BASE from the environment, starting as user_001
//! recommender-dashboard
//!
//! # Override the API and starting identity
//! recommender-dashboard --api-base http://recs.internal:5000/api --user user_042
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::Parser;
use recommender_core::UserIdentity;
use recommender_dashboard::config::{ApiConfig, DashboardConfig};
use recommender_dashboard::console::{self, ConsoleCommand, HELP};
use recommender_dashboard::error::AppError;
use recommender_dashboard::gateway::ApiClient;
use recommender_dashboard::session::{Session, SessionError, SessionHandle, SessionSettings};
use sentry::integrations::tracing as sentry_tracing;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Stdout};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "recommender-dashboard")]
#[command(version, about = "Operator dashboard for the product recommender")]
struct Cli {
    /// Recommender API base URL (overrides `RECOMMENDER_API_BASE`)
    #[arg(long)]
    api_base: Option<String>,

    /// Identity to start with
    #[arg(short, long, default_value = UserIdentity::DEFAULT)]
    user: UserIdentity,

    /// Emit logs as JSON lines for structured log collection
    #[arg(long)]
    json_logs: bool,
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &DashboardConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Sentry must be initialized before the tracing subscriber
    let config = DashboardConfig::from_env();
    let sentry_guard = config.as_ref().ok().and_then(init_sentry);

    // stdout belongs to the rendered view, so logs go to stderr
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "recommender_dashboard=info".into());

    let json_layer = cli.json_logs.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .with_writer(std::io::stderr)
    });
    let text_layer =
        (!cli.json_logs).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    if sentry_guard.is_some() {
        tracing::info!("Sentry initialized");
    }

    let result = match config {
        Ok(config) => run(cli, config).await,
        Err(e) => Err(e.into()),
    };

    if let Err(e) = result {
        e.report();
        // Flush Sentry before exiting
        drop(sentry_guard);
        std::process::exit(1);
    }
}

async fn run(cli: Cli, mut config: DashboardConfig) -> Result<(), AppError> {
    if let Some(base) = cli.api_base.as_deref() {
        config.api.base_url = ApiConfig::new(base)?.base_url;
    }
    let identity = cli.user;

    let client = ApiClient::new(&config.api)?;
    tracing::info!(api = %client.base_url(), user = %identity, "Starting dashboard");

    let session = Session::spawn(client, SessionSettings::default(), Some(identity));
    let outcome = drive(&session.handle()).await;
    session.shutdown().await?;
    outcome
}

/// Feed operator input to the session and redraw on every change until quit.
async fn drive(handle: &SessionHandle) -> Result<(), AppError> {
    let mut updates = handle.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut out = tokio::io::stdout();

    emit(&mut out, &console::render(&handle.snapshot())).await?;
    emit(&mut out, HELP).await?;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                // EOF ends the session like `quit`
                let Some(line) = line? else { return Ok(()) };
                if line.trim().is_empty() {
                    continue;
                }
                match line.parse::<ConsoleCommand>() {
                    Ok(ConsoleCommand::Quit) => return Ok(()),
                    Ok(command) => execute(handle, command, &mut out).await?,
                    Err(e) => emit(&mut out, &format!("{e}\n{HELP}")).await?,
                }
            }
            changed = updates.changed() => {
                if changed.is_err() {
                    return Err(SessionError::Closed.into());
                }
                let snapshot = updates.borrow_and_update().clone();
                emit(&mut out, &console::render(&snapshot)).await?;
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted, ending session");
                return Ok(());
            }
        }
    }
}

async fn execute(
    handle: &SessionHandle,
    command: ConsoleCommand,
    out: &mut Stdout,
) -> Result<(), AppError> {
    match command {
        ConsoleCommand::User(raw) => handle.edit_identity(&raw).await?,
        ConsoleCommand::Random => {
            let identity = handle.randomize_identity().await?;
            tracing::info!(user = %identity, "Switched to random identity");
        }
        ConsoleCommand::View(view) => handle.set_view(view).await?,
        ConsoleCommand::Track { product_id, kind } => {
            handle.track_interaction(product_id, kind).await?;
        }
        ConsoleCommand::Show => emit(out, &console::render(&handle.snapshot())).await?,
        ConsoleCommand::Help => emit(out, HELP).await?,
        ConsoleCommand::Quit => {}
    }
    Ok(())
}

async fn emit(out: &mut Stdout, text: &str) -> std::io::Result<()> {
    out.write_all(text.as_bytes()).await?;
    if !text.ends_with('\n') {
        out.write_all(b"\n").await?;
    }
    out.flush().await
}
