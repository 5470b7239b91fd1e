//! Broadcast scheduling
//!
//! A small state machine: `Idle -> Armed -> Firing -> Idle`, plus
//! `Armed -> Idle` on cancel. While armed, the owner calls [`Scheduler::tick`]
//! once per [`CHECK_PERIOD`]; the tick that finds the target reached fires
//! the broadcast and resets to idle straight away. Playback keeps running in
//! the background after the reset.

pub mod clock;

use crate::{AnnouncerError, Result};
use chrono::{NaiveDateTime, NaiveTime};
use log::{debug, info};
use std::fmt;
use std::time::{Duration, Instant};

pub use clock::{Clock, ManualClock, SystemClock};

/// Period of the countdown check
pub const CHECK_PERIOD: Duration = Duration::from_secs(1);

/// Scheduler state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleState {
    Idle,
    Armed { target: NaiveDateTime },
    /// Only held while [`Broadcast::fire`] runs inside [`Scheduler::tick`]
    Firing,
}

/// A relative countdown
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Countdown {
    pub hours: u32,
    pub minutes: u32,
    pub seconds: u32,
}

impl Countdown {
    pub fn new(hours: u32, minutes: u32, seconds: u32) -> Self {
        Self {
            hours,
            minutes,
            seconds,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.total_seconds() == 0
    }

    pub fn total_seconds(&self) -> i64 {
        i64::from(self.hours) * 3600 + i64::from(self.minutes) * 60 + i64::from(self.seconds)
    }
}

impl fmt::Display for Countdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}h {}m {}s", self.hours, self.minutes, self.seconds)
    }
}

/// How the target time is chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleMode {
    /// Next occurrence of a wall-clock time
    At(NaiveTime),
    /// Now plus a countdown
    After(Countdown),
}

/// Result of [`Scheduler::arm`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArmResult {
    Armed(NaiveDateTime),
    /// A broadcast was already scheduled or firing; nothing changed
    Ignored,
}

/// Result of one periodic check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// Not armed; the check is stopped
    Idle,
    /// Still waiting, with whole seconds remaining
    Waiting { remaining_secs: i64 },
    /// Target reached, broadcast fired, state is back to idle
    Fired,
}

/// What the scheduler triggers when the target is reached
pub trait Broadcast {
    /// Start announcing `script`; must not block
    fn fire(&mut self, script: &str);

    /// Stop any announcement still playing
    fn stop(&mut self);
}

/// Format whole seconds as `H:MM:SS`
pub fn format_hms(total_secs: i64) -> String {
    let total = total_secs.max(0);
    format!("{}:{:02}:{:02}", total / 3600, (total / 60) % 60, total % 60)
}

/// The broadcast scheduler
pub struct Scheduler<C: Clock = SystemClock> {
    clock: C,
    state: ScheduleState,

    /// When the next periodic check is due; `None` while not armed
    next_check: Option<Instant>,
}

impl Scheduler<SystemClock> {
    pub fn with_system_clock() -> Self {
        Self::new(SystemClock)
    }
}

impl<C: Clock> Scheduler<C> {
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            state: ScheduleState::Idle,
            next_check: None,
        }
    }

    pub fn state(&self) -> ScheduleState {
        self.state
    }

    pub fn is_armed(&self) -> bool {
        matches!(self.state, ScheduleState::Armed { .. })
    }

    pub fn now(&self) -> NaiveDateTime {
        self.clock.now()
    }

    /// Compute the target time for `mode` without arming
    ///
    /// A wall-clock time that is not strictly in the future is moved to the
    /// same time tomorrow. A zero countdown is rejected.
    pub fn target_for(&self, mode: &ScheduleMode) -> Result<NaiveDateTime> {
        let now = self.clock.now();

        match mode {
            ScheduleMode::At(time) => {
                let today = now.date().and_time(*time);
                if today <= now {
                    Ok(today + chrono::Duration::days(1))
                } else {
                    Ok(today)
                }
            }
            ScheduleMode::After(countdown) => {
                if countdown.is_zero() {
                    return Err(AnnouncerError::Validation(
                        "Set a countdown longer than zero".to_string(),
                    ));
                }
                chrono::Duration::try_seconds(countdown.total_seconds())
                    .and_then(|delay| now.checked_add_signed(delay))
                    .ok_or_else(|| {
                        AnnouncerError::Validation("Countdown is too long".to_string())
                    })
            }
        }
    }

    /// Arm the scheduler
    ///
    /// Ignored when a broadcast is already scheduled or firing.
    pub fn arm(&mut self, mode: &ScheduleMode) -> Result<ArmResult> {
        if self.state != ScheduleState::Idle {
            debug!("Arm ignored in state {:?}", self.state);
            return Ok(ArmResult::Ignored);
        }

        let target = self.target_for(mode)?;
        self.state = ScheduleState::Armed { target };
        self.next_check = Some(Instant::now() + CHECK_PERIOD);

        info!("Broadcast scheduled for {}", target);
        Ok(ArmResult::Armed(target))
    }

    /// Run one periodic check
    ///
    /// Fires `script` through `broadcast` once the target is reached.
    pub fn tick(&mut self, script: &str, broadcast: &mut dyn Broadcast) -> Tick {
        let target = match self.state {
            ScheduleState::Armed { target } => target,
            _ => {
                self.next_check = None;
                return Tick::Idle;
            }
        };

        let remaining = target - self.clock.now();
        if remaining <= chrono::Duration::zero() {
            self.next_check = None;
            self.state = ScheduleState::Firing;
            info!("Broadcast target {} reached, firing", target);

            broadcast.fire(script);

            // Playback continues in the background
            self.state = ScheduleState::Idle;
            return Tick::Fired;
        }

        self.next_check = Some(Instant::now() + CHECK_PERIOD);
        Tick::Waiting {
            remaining_secs: remaining.num_seconds(),
        }
    }

    /// Cancel a scheduled broadcast
    ///
    /// Only valid while armed. Also stops any announcement still playing.
    pub fn cancel(&mut self, broadcast: &mut dyn Broadcast) -> Result<()> {
        if !self.is_armed() {
            return Err(AnnouncerError::Schedule("No broadcast is scheduled".to_string()));
        }

        self.state = ScheduleState::Idle;
        self.next_check = None;
        broadcast.stop();

        info!("Scheduled broadcast cancelled");
        Ok(())
    }

    /// Whether a periodic check should run at `now`
    pub fn is_check_due(&self, now: Instant) -> bool {
        self.next_check.is_some_and(|due| now >= due)
    }

    /// Time until the next periodic check, `None` when checking is stopped
    ///
    /// Used to set the event loop's poll timeout.
    pub fn time_until_next_check(&self, now: Instant) -> Option<Duration> {
        self.next_check
            .map(|due| due.saturating_duration_since(now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[derive(Default)]
    struct Recorder {
        fired: Vec<String>,
        stops: usize,
    }

    impl Broadcast for Recorder {
        fn fire(&mut self, script: &str) {
            self.fired.push(script.to_string());
        }

        fn stop(&mut self) {
            self.stops += 1;
        }
    }

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 9)
            .and_then(|d| d.and_hms_opt(h, m, s))
            .unwrap()
    }

    #[test]
    fn test_format_hms() {
        assert_eq!(format_hms(0), "0:00:00");
        assert_eq!(format_hms(61), "0:01:01");
        assert_eq!(format_hms(3600 * 25 + 5), "25:00:05");
        assert_eq!(format_hms(-3), "0:00:00");
    }

    #[test]
    fn test_future_time_today() {
        let scheduler = Scheduler::new(ManualClock::new(at(9, 0, 0)));
        let target = scheduler
            .target_for(&ScheduleMode::At(NaiveTime::from_hms_opt(12, 30, 0).unwrap()))
            .unwrap();
        assert_eq!(target, at(12, 30, 0));
    }

    #[test]
    fn test_current_time_rolls_to_tomorrow() {
        let scheduler = Scheduler::new(ManualClock::new(at(9, 0, 0)));
        let target = scheduler
            .target_for(&ScheduleMode::At(NaiveTime::from_hms_opt(9, 0, 0).unwrap()))
            .unwrap();
        assert_eq!(target, at(9, 0, 0) + chrono::Duration::days(1));
    }

    #[test]
    fn test_arm_twice_is_ignored() {
        let mut scheduler = Scheduler::new(ManualClock::new(at(9, 0, 0)));
        let mode = ScheduleMode::After(Countdown::new(0, 1, 0));

        assert_eq!(scheduler.arm(&mode).unwrap(), ArmResult::Armed(at(9, 1, 0)));
        let again = ScheduleMode::After(Countdown::new(0, 5, 0));
        assert_eq!(scheduler.arm(&again).unwrap(), ArmResult::Ignored);
        assert_eq!(scheduler.state(), ScheduleState::Armed { target: at(9, 1, 0) });
    }

    #[test]
    fn test_waiting_truncates_fraction() {
        let clock = ManualClock::new(at(9, 0, 0));
        let mut scheduler = Scheduler::new(clock.clone());
        scheduler.arm(&ScheduleMode::After(Countdown::new(0, 0, 10))).unwrap();

        clock.advance(chrono::Duration::milliseconds(8_500));
        let mut recorder = Recorder::default();
        assert_eq!(
            scheduler.tick("script", &mut recorder),
            Tick::Waiting { remaining_secs: 1 }
        );
    }

    #[test]
    fn test_fire_happens_once_then_idle() {
        let clock = ManualClock::new(at(9, 0, 0));
        let mut scheduler = Scheduler::new(clock.clone());
        scheduler.arm(&ScheduleMode::After(Countdown::new(0, 0, 2))).unwrap();
        let mut recorder = Recorder::default();

        clock.advance(chrono::Duration::seconds(2));
        assert_eq!(scheduler.tick("Lunch", &mut recorder), Tick::Fired);
        assert_eq!(scheduler.state(), ScheduleState::Idle);
        assert_eq!(scheduler.time_until_next_check(Instant::now()), None);

        clock.advance(chrono::Duration::seconds(2));
        assert_eq!(scheduler.tick("Lunch", &mut recorder), Tick::Idle);
        assert_eq!(recorder.fired, vec!["Lunch".to_string()]);
        assert_eq!(recorder.stops, 0);
    }

    #[test]
    fn test_huge_countdown_rejected() {
        let mut scheduler = Scheduler::new(ManualClock::new(at(9, 0, 0)));
        let err = scheduler
            .arm(&ScheduleMode::After(Countdown::new(u32::MAX, 59, 59)))
            .unwrap_err();
        assert!(err.is_validation());
        assert_eq!(scheduler.state(), ScheduleState::Idle);
    }

    #[test]
    fn test_cancel_when_idle_rejected() {
        let mut scheduler = Scheduler::new(ManualClock::new(at(9, 0, 0)));
        let mut recorder = Recorder::default();
        assert!(scheduler.cancel(&mut recorder).is_err());
        assert_eq!(recorder.stops, 0);
        assert_eq!(scheduler.state(), ScheduleState::Idle);
    }

    #[test]
    fn test_poll_timeout_tracks_arming() {
        let mut scheduler = Scheduler::new(ManualClock::new(at(9, 0, 0)));
        let now = Instant::now();
        assert_eq!(scheduler.time_until_next_check(now), None);
        assert!(!scheduler.is_check_due(now));

        scheduler.arm(&ScheduleMode::After(Countdown::new(0, 0, 5))).unwrap();
        let wait = scheduler.time_until_next_check(Instant::now()).unwrap();
        assert!(wait <= CHECK_PERIOD);
        assert!(scheduler.is_check_due(Instant::now() + CHECK_PERIOD));
    }
}
