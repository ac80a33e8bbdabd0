pub mod monitor;

use std::io::BufRead;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::source::HttpSource;
use crate::{AppError, render};
use monitor::{CycleOutcome, Refresher};

#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    pub render: bool,
}

/// Watch the configured source until SIGINT/SIGTERM.
pub async fn run(cfg: ClientConfig, opts: RunOptions) -> Result<(), AppError> {
    let source = HttpSource::from_config(&cfg);
    info!(server = source.base(), poll_ms = cfg.poll_interval_ms, "watching source");

    let cancel = CancellationToken::new();
    let handle = monitor::spawn(Arc::new(source), cfg.monitor_settings(), cancel.clone());

    let render_task = opts
        .render
        .then(|| tokio::spawn(render::run(handle.subscribe(), cancel.child_token())));
    let refresh_task = tokio::spawn(forward_refresh_requests(
        spawn_stdin_reader(),
        handle.refresher(),
        cancel.child_token(),
    ));

    shutdown_signal().await;
    info!("shutdown signal received; stopping monitor");
    cancel.cancel();
    handle.shutdown().await;

    if let Some(task) = render_task {
        let _ = tokio::time::timeout(Duration::from_secs(1), task).await;
    }
    refresh_task.abort();
    Ok(())
}

/// Read lines from stdin on a dedicated thread; every line is a refresh request.
fn spawn_stdin_reader() -> mpsc::Receiver<()> {
    let (tx, rx) = mpsc::channel(4);
    let spawned = std::thread::Builder::new()
        .name("stdin-refresh".into())
        .spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                if line.is_err() || tx.blocking_send(()).is_err() {
                    break;
                }
            }
        });
    if let Err(e) = spawned {
        warn!(error=%e, "failed to start stdin reader; manual refresh disabled");
    }
    rx
}

async fn forward_refresh_requests(
    mut requests: mpsc::Receiver<()>,
    refresher: Refresher,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            req = requests.recv() => {
                if req.is_none() {
                    debug!("stdin closed; manual refresh disabled");
                    break;
                }
                info!("manual refresh requested");
                match refresher.manual_refresh().await {
                    Ok(CycleOutcome::Applied { cycle, changed }) => {
                        info!(cycle, changed, "manual refresh applied");
                    }
                    Ok(CycleOutcome::Failed { cycle, error }) => {
                        warn!(cycle, error=%error, "manual refresh failed");
                    }
                    Err(e) => {
                        warn!(error=%e, "manual refresh unavailable");
                        break;
                    }
                }
            }
        }
    }
}

async fn shutdown_signal() {
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
                warn!(error=%e, "Ctrl+C handler failed");
            }
        }
        _ = terminate => {}
    }
}
