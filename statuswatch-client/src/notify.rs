//! Transient change notifications: the blinking indicator and highlighted rows.
//!
//! [`NotificationScheduler`] is a plain state machine. It never sleeps on its
//! own; it exposes the next deadline of each timeline and the owner calls
//! [`NotificationScheduler::fire_due`] once that deadline has passed. Each
//! timeline holds at most one armed deadline, and arming it again replaces the
//! previous one.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::Instant;
use tracing::debug;

use crate::diff::ChangeSet;

pub const BLINK_PERIOD: Duration = Duration::from_millis(500);
pub const BLINK_TOGGLES: u32 = 5;
pub const HIGHLIGHT_TTL: Duration = Duration::from_millis(3000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timings {
    pub blink_period: Duration,
    pub blink_toggles: u32,
    pub highlight_ttl: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            blink_period: BLINK_PERIOD,
            blink_toggles: BLINK_TOGGLES,
            highlight_ttl: HIGHLIGHT_TTL,
        }
    }
}

/// A moment in both clocks: monotonic for timers, wall for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stamp {
    pub at: Instant,
    pub wall: DateTime<Utc>,
}

impl Stamp {
    pub fn now() -> Self {
        Self {
            at: Instant::now(),
            wall: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlinkPhase {
    Idle,
    Blinking { remaining: u32, next_tick: Instant },
}

#[derive(Debug)]
pub struct NotificationScheduler {
    timings: Timings,
    blink_active: bool,
    blink: BlinkPhase,
    highlighted: ChangeSet,
    highlight_expires: Option<Instant>,
    last_update: Option<DateTime<Utc>>,
}

impl NotificationScheduler {
    pub fn new(timings: Timings) -> Self {
        Self {
            timings,
            blink_active: false,
            blink: BlinkPhase::Idle,
            highlighted: ChangeSet::new(),
            highlight_expires: None,
            last_update: None,
        }
    }

    pub fn blink_active(&self) -> bool {
        self.blink_active
    }

    pub fn blink_phase(&self) -> BlinkPhase {
        self.blink
    }

    pub fn toggles_remaining(&self) -> u32 {
        match self.blink {
            BlinkPhase::Idle => 0,
            BlinkPhase::Blinking { remaining, .. } => remaining,
        }
    }

    pub fn highlighted(&self) -> &ChangeSet {
        &self.highlighted
    }

    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        self.last_update
    }

    /// Record a successful refresh and, if anything changed, restart both timelines.
    pub fn on_snapshot_accepted(&mut self, changes: ChangeSet, at: Stamp) {
        self.last_update = Some(at.wall);
        if changes.is_empty() {
            return;
        }

        debug!(
            changed = changes.len(),
            "restarting blink and highlight timelines"
        );
        self.highlighted = changes;
        self.highlight_expires = Some(at.at + self.timings.highlight_ttl);

        if self.timings.blink_toggles == 0 {
            self.blink = BlinkPhase::Idle;
            self.blink_active = false;
            return;
        }
        self.blink_active = true;
        self.blink = BlinkPhase::Blinking {
            remaining: self.timings.blink_toggles,
            next_tick: at.at + self.timings.blink_period,
        };
    }

    pub fn blink_deadline(&self) -> Option<Instant> {
        match self.blink {
            BlinkPhase::Idle => None,
            BlinkPhase::Blinking { next_tick, .. } => Some(next_tick),
        }
    }

    pub fn highlight_deadline(&self) -> Option<Instant> {
        self.highlight_expires
    }

    /// Run every timer callback whose deadline is at or before `now`.
    ///
    /// Returns whether any observable state changed.
    pub fn fire_due(&mut self, now: Instant) -> bool {
        let mut changed = false;
        while let Some(tick) = self.blink_deadline() {
            if tick > now {
                break;
            }
            self.blink_tick();
            changed = true;
        }
        if let Some(expires) = self.highlight_expires
            && expires <= now
        {
            self.highlight_expires = None;
            self.highlighted = ChangeSet::new();
            changed = true;
        }
        changed
    }

    fn blink_tick(&mut self) {
        let BlinkPhase::Blinking {
            remaining,
            next_tick,
        } = self.blink
        else {
            return;
        };
        let remaining = remaining.saturating_sub(1);
        if remaining == 0 {
            self.blink = BlinkPhase::Idle;
            self.blink_active = false;
        } else {
            self.blink_active = !self.blink_active;
            self.blink = BlinkPhase::Blinking {
                remaining,
                next_tick: next_tick + self.timings.blink_period,
            };
        }
    }

    /// Disarm both timelines. Used on teardown.
    pub fn cancel_timers(&mut self) {
        self.blink = BlinkPhase::Idle;
        self.blink_active = false;
        self.highlight_expires = None;
        self.highlighted = ChangeSet::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use statuswatch_shared::RecordId;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn stamp(at: Instant) -> Stamp {
        Stamp {
            at,
            wall: Utc::now(),
        }
    }

    fn set(ids: &[i64]) -> ChangeSet {
        ids.iter().map(|i| RecordId::from(*i)).collect()
    }

    #[test]
    fn empty_change_set_only_touches_timestamp() {
        let t0 = Instant::now();
        let mut sched = NotificationScheduler::new(Timings::default());
        sched.on_snapshot_accepted(set(&[1]), stamp(t0));
        let before_highlight = sched.highlighted().clone();
        let before_deadline = sched.highlight_deadline();

        let later = Stamp {
            at: t0 + ms(200),
            wall: Utc::now() + chrono::TimeDelta::seconds(1),
        };
        sched.on_snapshot_accepted(ChangeSet::new(), later);

        assert_eq!(sched.last_update(), Some(later.wall));
        assert!(sched.blink_active());
        assert_eq!(sched.toggles_remaining(), 5);
        assert_eq!(sched.highlighted(), &before_highlight);
        assert_eq!(sched.highlight_deadline(), before_deadline);
    }

    #[test]
    fn empty_change_set_from_idle_stays_idle() {
        let t0 = Instant::now();
        let mut sched = NotificationScheduler::new(Timings::default());
        assert_eq!(sched.last_update(), None);
        sched.on_snapshot_accepted(ChangeSet::new(), stamp(t0));
        assert!(sched.last_update().is_some());
        assert_eq!(sched.blink_phase(), BlinkPhase::Idle);
        assert!(sched.highlighted().is_empty());
        assert_eq!(sched.blink_deadline(), None);
        assert_eq!(sched.highlight_deadline(), None);
    }

    #[test]
    fn blink_runs_five_ticks_then_idles() {
        let t0 = Instant::now();
        let mut sched = NotificationScheduler::new(Timings::default());
        sched.on_snapshot_accepted(set(&[1]), stamp(t0));
        assert!(sched.blink_active());
        assert_eq!(sched.toggles_remaining(), 5);
        assert_eq!(sched.blink_deadline(), Some(t0 + ms(500)));

        let mut seen = Vec::new();
        for n in 1..=5u64 {
            assert!(!sched.fire_due(t0 + ms(500 * n) - ms(1)));
            assert!(sched.fire_due(t0 + ms(500 * n)));
            seen.push((sched.blink_active(), sched.toggles_remaining()));
        }
        assert_eq!(
            seen,
            vec![(false, 4), (true, 3), (false, 2), (true, 1), (false, 0)]
        );
        assert_eq!(sched.blink_phase(), BlinkPhase::Idle);
        assert_eq!(sched.blink_deadline(), None);
    }

    #[test]
    fn late_wakeup_catches_up_all_due_ticks() {
        let t0 = Instant::now();
        let mut sched = NotificationScheduler::new(Timings::default());
        sched.on_snapshot_accepted(set(&[1]), stamp(t0));
        assert!(sched.fire_due(t0 + ms(1600)));
        assert_eq!(sched.toggles_remaining(), 2);
        assert_eq!(sched.blink_deadline(), Some(t0 + ms(2000)));
    }

    #[test]
    fn second_change_restarts_blink_instead_of_accumulating() {
        let t0 = Instant::now();
        let mut sched = NotificationScheduler::new(Timings::default());
        sched.on_snapshot_accepted(set(&[1]), stamp(t0));
        sched.fire_due(t0 + ms(1000));
        assert_eq!(sched.toggles_remaining(), 3);

        let t1 = t0 + ms(1200);
        sched.on_snapshot_accepted(set(&[2]), stamp(t1));
        assert_eq!(sched.toggles_remaining(), 5);
        assert!(sched.blink_active());
        assert_eq!(sched.blink_deadline(), Some(t1 + ms(500)));

        // the old tick at t0+1500 is gone
        assert!(!sched.fire_due(t0 + ms(1500)));
        assert_eq!(sched.toggles_remaining(), 5);

        sched.fire_due(t1 + ms(2500));
        assert_eq!(sched.blink_phase(), BlinkPhase::Idle);
        assert!(!sched.blink_active());
    }

    #[test]
    fn highlight_decays_after_ttl() {
        let t0 = Instant::now();
        let mut sched = NotificationScheduler::new(Timings::default());
        sched.on_snapshot_accepted(set(&[7]), stamp(t0));
        assert!(sched.highlighted().contains(&RecordId::from(7)));

        sched.fire_due(t0 + ms(2999));
        assert!(sched.highlighted().contains(&RecordId::from(7)));

        assert!(sched.fire_due(t0 + ms(3000)));
        assert!(sched.highlighted().is_empty());
        assert_eq!(sched.highlight_deadline(), None);
    }

    #[test]
    fn new_change_resets_highlight_decay_and_replaces_set() {
        let t0 = Instant::now();
        let mut sched = NotificationScheduler::new(Timings::default());
        sched.on_snapshot_accepted(set(&[1, 2]), stamp(t0));

        let t1 = t0 + ms(1000);
        sched.on_snapshot_accepted(set(&[3]), stamp(t1));
        assert_eq!(sched.highlighted(), &set(&[3]));
        assert_eq!(sched.highlight_deadline(), Some(t0 + ms(4000)));

        sched.fire_due(t0 + ms(3000));
        assert_eq!(sched.highlighted(), &set(&[3]));

        sched.fire_due(t0 + ms(4000));
        assert!(sched.highlighted().is_empty());
    }

    #[test]
    fn timelines_run_independently() {
        let t0 = Instant::now();
        let timings = Timings {
            blink_period: ms(100),
            blink_toggles: 2,
            highlight_ttl: ms(150),
        };
        let mut sched = NotificationScheduler::new(timings);
        sched.on_snapshot_accepted(set(&[1]), stamp(t0));

        sched.fire_due(t0 + ms(100));
        assert_eq!(sched.toggles_remaining(), 1);
        assert!(!sched.highlighted().is_empty());

        sched.fire_due(t0 + ms(150));
        assert!(sched.highlighted().is_empty());
        assert_eq!(sched.toggles_remaining(), 1);

        sched.fire_due(t0 + ms(200));
        assert_eq!(sched.blink_phase(), BlinkPhase::Idle);
    }

    #[test]
    fn zero_toggles_never_blinks() {
        let t0 = Instant::now();
        let timings = Timings {
            blink_toggles: 0,
            ..Timings::default()
        };
        let mut sched = NotificationScheduler::new(timings);
        sched.on_snapshot_accepted(set(&[1]), stamp(t0));
        assert!(!sched.blink_active());
        assert_eq!(sched.blink_deadline(), None);
        assert!(!sched.highlighted().is_empty());
    }

    #[test]
    fn cancel_timers_disarms_everything() {
        let t0 = Instant::now();
        let mut sched = NotificationScheduler::new(Timings::default());
        sched.on_snapshot_accepted(set(&[1]), stamp(t0));
        sched.cancel_timers();
        assert_eq!(sched.blink_deadline(), None);
        assert_eq!(sched.highlight_deadline(), None);
        assert!(!sched.fire_due(t0 + ms(10_000)));
        assert!(sched.last_update().is_some());
    }
}
