//! The poll → diff → notify pipeline.
//!
//! One task owns the [`SnapshotStore`] and the [`NotificationScheduler`] and is
//! the only place either is mutated. Poll ticks, manual refresh requests, fetch
//! completions and both notification deadlines are all handled from a single
//! `select!` loop, so no locking is needed around that state.
//!
//! Fetches run in their own tasks and report back tagged with a cycle id. Only
//! the completion of the cycle currently in flight is applied. A poll tick that
//! finds a fetch outstanding joins it, unless that fetch has been running for
//! longer than `stall_after`, in which case it is aborted and replaced.

use std::sync::Arc;
use std::time::Duration;

use statuswatch_shared::Snapshot;
use statuswatch_shared::api::rest::TransportError;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::AppError;
use crate::diff::diff;
use crate::notify::{NotificationScheduler, Stamp, Timings};
use crate::source::SnapshotSource;
use crate::store::SnapshotStore;
use crate::view::ViewState;

const SHUTDOWN_GRACE: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorSettings {
    pub poll_interval: Duration,
    /// Age after which an outstanding fetch is given up on by the next poll.
    pub stall_after: Duration,
    pub timings: Timings,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(5000),
            stall_after: Duration::from_secs(10),
            timings: Timings::default(),
        }
    }
}

/// Result of one fetch → diff → notify pass.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    Applied { cycle: u64, changed: usize },
    Failed { cycle: u64, error: TransportError },
}

impl CycleOutcome {
    pub fn cycle(&self) -> u64 {
        match self {
            CycleOutcome::Applied { cycle, .. } | CycleOutcome::Failed { cycle, .. } => *cycle,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Trigger {
    Poll,
    Manual,
}

type RefreshReply = oneshot::Sender<CycleOutcome>;
type Completion = (u64, Result<Snapshot, TransportError>);

/// Cloneable handle for requesting an out-of-band refresh.
#[derive(Debug, Clone)]
pub struct Refresher {
    tx: mpsc::Sender<RefreshReply>,
}

impl Refresher {
    /// Run the pipeline now and wait until that cycle is applied or has failed.
    ///
    /// If a fetch is already outstanding, this waits for it instead of starting
    /// a second one. The poll schedule is not shifted.
    pub async fn manual_refresh(&self) -> Result<CycleOutcome, AppError> {
        let (tx, rx) = oneshot::channel();
        self.tx
            .send(tx)
            .await
            .map_err(|_| AppError::MonitorStopped)?;
        rx.await.map_err(|_| AppError::MonitorStopped)
    }
}

pub struct MonitorHandle {
    refresher: Refresher,
    view_rx: watch::Receiver<ViewState>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl MonitorHandle {
    pub fn subscribe(&self) -> watch::Receiver<ViewState> {
        self.view_rx.clone()
    }

    pub fn view(&self) -> ViewState {
        self.view_rx.borrow().clone()
    }

    pub fn refresher(&self) -> Refresher {
        self.refresher.clone()
    }

    pub async fn manual_refresh(&self) -> Result<CycleOutcome, AppError> {
        self.refresher.manual_refresh().await
    }

    /// Stop the monitor and wait (bounded) for it to tear down its timers.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        let mut task = self.task;
        if tokio::time::timeout(SHUTDOWN_GRACE, &mut task).await.is_err() {
            warn!("monitor did not stop in time; aborting");
            task.abort();
        }
    }
}

/// Start the monitor task. The first poll happens immediately.
pub fn spawn(
    source: Arc<dyn SnapshotSource>,
    settings: MonitorSettings,
    cancel: CancellationToken,
) -> MonitorHandle {
    let (refresh_tx, refresh_rx) = mpsc::channel(8);
    let (done_tx, done_rx) = mpsc::unbounded_channel();
    let (view_tx, view_rx) = watch::channel(ViewState::initial());

    let monitor = Monitor {
        source,
        store: SnapshotStore::new(),
        scheduler: NotificationScheduler::new(settings.timings),
        view_tx,
        stall_after: settings.stall_after,
        is_loading: true,
        last_error: None,
        last_cycle: 0,
        in_flight: None,
        waiters: Vec::new(),
        done_tx,
    };
    let task = tokio::spawn(monitor.run(
        settings.poll_interval,
        refresh_rx,
        done_rx,
        cancel.child_token(),
    ));

    MonitorHandle {
        refresher: Refresher { tx: refresh_tx },
        view_rx,
        cancel,
        task,
    }
}

struct InFlight {
    cycle: u64,
    started: Instant,
    task: JoinHandle<()>,
}

struct Monitor {
    source: Arc<dyn SnapshotSource>,
    store: SnapshotStore,
    scheduler: NotificationScheduler,
    view_tx: watch::Sender<ViewState>,
    stall_after: Duration,
    is_loading: bool,
    last_error: Option<String>,
    last_cycle: u64,
    in_flight: Option<InFlight>,
    waiters: Vec<RefreshReply>,
    done_tx: mpsc::UnboundedSender<Completion>,
}

impl Monitor {
    async fn run(
        mut self,
        poll_interval: Duration,
        mut refresh_rx: mpsc::Receiver<RefreshReply>,
        mut done_rx: mpsc::UnboundedReceiver<Completion>,
        cancel: CancellationToken,
    ) {
        let mut poll = tokio::time::interval(poll_interval);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(?poll_interval, "monitor started");

        loop {
            let blink_at = self.scheduler.blink_deadline();
            let decay_at = self.scheduler.highlight_deadline();
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                Some((cycle, result)) = done_rx.recv() => {
                    self.complete(cycle, result);
                }
                _ = sleep_until_opt(blink_at) => {
                    self.fire_timers();
                }
                _ = sleep_until_opt(decay_at) => {
                    self.fire_timers();
                }
                _ = poll.tick() => {
                    self.on_poll();
                }
                Some(reply) = refresh_rx.recv() => {
                    self.waiters.push(reply);
                    if self.in_flight.is_none() {
                        self.start_cycle(Trigger::Manual);
                    } else {
                        debug!("manual refresh joins the fetch in flight");
                    }
                }
            }
        }

        self.teardown();
    }

    fn on_poll(&mut self) {
        let joined = self
            .in_flight
            .as_ref()
            .filter(|f| f.started.elapsed() < self.stall_after)
            .map(|f| f.cycle);
        match joined {
            Some(cycle) => debug!(cycle, "fetch still outstanding; poll joins it"),
            None => self.start_cycle(Trigger::Poll),
        }
    }

    /// Start a new cycle. An outstanding fetch is aborted; its waiters are
    /// answered by the new cycle.
    fn start_cycle(&mut self, trigger: Trigger) {
        if let Some(stale) = self.in_flight.take() {
            warn!(
                cycle = stale.cycle,
                elapsed = ?stale.started.elapsed(),
                "previous fetch still outstanding; superseding it"
            );
            stale.task.abort();
        }

        self.last_cycle += 1;
        let cycle = self.last_cycle;
        debug!(cycle, ?trigger, "starting fetch");

        let source = self.source.clone();
        let done = self.done_tx.clone();
        let task = tokio::spawn(async move {
            let result = source.fetch().await;
            let _ = done.send((cycle, result));
        });
        self.in_flight = Some(InFlight {
            cycle,
            started: Instant::now(),
            task,
        });
    }

    fn complete(&mut self, cycle: u64, result: Result<Snapshot, TransportError>) {
        match &self.in_flight {
            Some(f) if f.cycle == cycle => {}
            _ => {
                debug!(cycle, "discarding result of superseded fetch");
                return;
            }
        }
        self.in_flight = None;
        self.is_loading = false;

        let outcome = match result {
            Ok(snapshot) => {
                let changed = self.accept(snapshot, Stamp::now());
                CycleOutcome::Applied { cycle, changed }
            }
            Err(e) => {
                error!(error=%e, cycle, "fetch failed; keeping last good snapshot");
                self.last_error = Some(e.to_string());
                CycleOutcome::Failed { cycle, error: e }
            }
        };
        self.publish();

        for reply in self.waiters.drain(..) {
            let _ = reply.send(outcome.clone());
        }
    }

    /// Replace the stored snapshot and hand its change-set to the scheduler.
    fn accept(&mut self, snapshot: Snapshot, at: Stamp) -> usize {
        let records = snapshot.len();
        let previous = self.store.replace(snapshot);
        let changes = diff(&previous, self.store.current());
        let changed = changes.len();
        if changed > 0 {
            info!(changed, records, "records changed");
        } else {
            debug!(records, "no changes");
        }
        self.last_error = None;
        self.scheduler.on_snapshot_accepted(changes, at);
        changed
    }

    fn fire_timers(&mut self) {
        if self.scheduler.fire_due(Instant::now()) {
            self.publish();
        }
    }

    fn publish(&self) {
        let next = ViewState {
            records: self.store.current().clone(),
            is_loading: self.is_loading,
            is_error: self.last_error.is_some(),
            last_error: self.last_error.clone(),
            last_update: self.scheduler.last_update(),
            blink_active: self.scheduler.blink_active(),
            highlighted: self.scheduler.highlighted().clone(),
        };
        self.view_tx.send_if_modified(|view| {
            if *view == next {
                return false;
            }
            *view = next;
            true
        });
    }

    fn teardown(&mut self) {
        if let Some(f) = self.in_flight.take() {
            debug!(cycle = f.cycle, "aborting outstanding fetch");
            f.task.abort();
        }
        self.scheduler.cancel_timers();
        // dropping the reply senders releases manual-refresh callers
        self.waiters.clear();
        self.publish();
        info!("monitor stopped");
    }
}

async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(when) => tokio::time::sleep_until(when).await,
        None => std::future::pending().await,
    }
}
