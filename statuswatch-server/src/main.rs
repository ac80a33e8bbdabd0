use std::fmt;
use std::net::SocketAddr;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use statuswatch_server::server::{self, AppConfig, ConfigError};
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod cli;

const DEFAULT_PORT: u16 = 5000;
const DRAIN_TIMEOUT: Duration = Duration::from_secs(3);

/// Failures that keep the server from coming up at all.
#[derive(Debug)]
enum StartupError {
    Config(ConfigError),
    Bind(SocketAddr, std::io::Error),
}

impl StartupError {
    fn exit_code(&self) -> ExitCode {
        match self {
            StartupError::Config(_) => ExitCode::from(2),
            StartupError::Bind(..) => ExitCode::from(3),
        }
    }
}

impl fmt::Display for StartupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StartupError::Config(e) => write!(f, "config: {e}"),
            StartupError::Bind(addr, e) => write!(f, "cannot listen on {addr}: {e}"),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = cli::Cli::parse();
    init_tracing();

    match serve(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error=%e, "demo source failed to start");
            e.exit_code()
        }
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .init();
}

/// `$PORT` wins over `--port`, which wins over the config file.
fn listen_port(env_port: Option<&str>, flag: Option<u16>, configured: Option<u16>) -> u16 {
    env_port
        .and_then(|s| s.trim().parse::<u16>().ok())
        .or(flag)
        .or(configured)
        .unwrap_or(DEFAULT_PORT)
}

async fn serve(args: cli::Cli) -> Result<(), StartupError> {
    let config = AppConfig::load().map_err(StartupError::Config)?;
    let port = listen_port(
        std::env::var("PORT").ok().as_deref(),
        args.port,
        config.listen_port,
    );
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| StartupError::Bind(addr, e))?;

    let state = server::AppState::new(config);
    let stop = state.shutdown_token();
    info!(
        %addr,
        seed = ?state.config.seed,
        regenerate_every = state.config.regenerate_every,
        "serving demo listing"
    );

    let app = server::router(state);
    let drained = stop.clone().cancelled_owned();
    let mut task = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(drained)
            .await
    });

    wait_for_signal().await;
    stop.cancel();
    match tokio::time::timeout(DRAIN_TIMEOUT, &mut task).await {
        Ok(Ok(Ok(()))) => info!("demo source stopped"),
        Ok(Ok(Err(e))) => error!(error=%e, "server error while draining"),
        Ok(Err(e)) => error!(error=%e, "server task failed"),
        Err(_) => {
            warn!(timeout = ?DRAIN_TIMEOUT, "connections still open; aborting");
            task.abort();
        }
    }
    Ok(())
}

async fn wait_for_signal() {
    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error=%e, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        res = tokio::signal::ctrl_c() => {
            if let Err(e) = res {
                warn!(error=%e, "Ctrl+C handler failed; stopping");
            } else {
                info!("received Ctrl+C");
            }
        }
        _ = terminate => info!("received SIGTERM"),
    }
}
