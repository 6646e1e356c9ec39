//! Frame scheduler
//!
//! A [`LoopHandle`] turns host tick events into simulation ticks. Hosts only
//! provide the raw primitive (an interval timer or a display-sync callback)
//! through [`TickSource`]; the loop owns start/stop bookkeeping so a restart
//! can never leave a second tick source running.

use serde::{Deserialize, Serialize};

use crate::consts::{DEFAULT_TICK_HZ, MAX_FRAME_DT, MAX_SUBSTEPS};
use crate::error::{ConfigError, EngineError};

/// How ticks are paced
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TickMode {
    /// Constant `1/hz` steps regardless of display refresh
    FixedStep { hz: f32 },
    /// One tick per compositor frame with the measured delta
    DisplaySync,
}

impl Default for TickMode {
    fn default() -> Self {
        TickMode::FixedStep { hz: DEFAULT_TICK_HZ }
    }
}

impl TickMode {
    pub fn validate(&self) -> Result<(), ConfigError> {
        match *self {
            TickMode::FixedStep { hz } if !(hz > 0.0 && hz.is_finite()) => Err(ConfigError::InvalidTickRate(hz)),
            _ => Ok(()),
        }
    }

    /// Fixed step length in seconds, if any
    pub fn step(&self) -> Option<f32> {
        match *self {
            TickMode::FixedStep { hz } => Some(1.0 / hz),
            TickMode::DisplaySync => None,
        }
    }
}

/// Identifies one armed host registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TickToken(pub u64);

/// Host tick primitive
///
/// Fixed-step registrations keep firing until disarmed. Display-sync
/// registrations fire once; the loop re-arms after every frame.
pub trait TickSource {
    fn arm(&mut self, mode: TickMode) -> Result<TickToken, EngineError>;

    /// Cancel a registration; unknown or already-fired tokens are ignored
    fn disarm(&mut self, token: TickToken);
}

/// Passed to the tick callback
#[derive(Debug)]
pub struct TickContext {
    /// Seconds simulated by this tick
    pub dt: f32,
    /// 1-based tick counter since the loop was created
    pub tick: u64,
    stop_requested: bool,
}

impl TickContext {
    /// Stop the loop once this callback returns
    pub fn stop(&mut self) {
        self.stop_requested = true;
    }

    pub fn stop_requested(&self) -> bool {
        self.stop_requested
    }
}

/// Options for [`create_loop`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoopOptions {
    pub fixed_step: bool,
    pub hz: f32,
}

impl Default for LoopOptions {
    fn default() -> Self {
        Self {
            fixed_step: true,
            hz: DEFAULT_TICK_HZ,
        }
    }
}

impl LoopOptions {
    pub fn mode(&self) -> TickMode {
        if self.fixed_step {
            TickMode::FixedStep { hz: self.hz }
        } else {
            TickMode::DisplaySync
        }
    }
}

impl From<TickMode> for LoopOptions {
    fn from(mode: TickMode) -> Self {
        match mode {
            TickMode::FixedStep { hz } => Self { fixed_step: true, hz },
            TickMode::DisplaySync => Self {
                fixed_step: false,
                hz: DEFAULT_TICK_HZ,
            },
        }
    }
}

/// A start/stop-able tick loop
pub struct LoopHandle<S: TickSource, F: FnMut(&mut TickContext)> {
    source: S,
    callback: F,
    mode: TickMode,
    token: Option<TickToken>,
    last_time: Option<f64>,
    accumulator: f32,
    ticks: u64,
}

/// Build a loop over `source`; nothing fires until [`LoopHandle::start`]
pub fn create_loop<S, F>(source: S, callback: F, options: LoopOptions) -> LoopHandle<S, F>
where
    S: TickSource,
    F: FnMut(&mut TickContext),
{
    LoopHandle::new(source, callback, options.mode())
}

impl<S: TickSource, F: FnMut(&mut TickContext)> LoopHandle<S, F> {
    pub fn new(source: S, callback: F, mode: TickMode) -> Self {
        Self {
            source,
            callback,
            mode,
            token: None,
            last_time: None,
            accumulator: 0.0,
            ticks: 0,
        }
    }

    pub fn mode(&self) -> TickMode {
        self.mode
    }

    pub fn is_running(&self) -> bool {
        self.token.is_some()
    }

    /// Currently armed registration
    pub fn token(&self) -> Option<TickToken> {
        self.token
    }

    /// Ticks run since creation
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    /// Arm the tick source; no-op while already running
    pub fn start(&mut self) -> Result<(), EngineError> {
        if self.token.is_some() {
            return Ok(());
        }
        self.mode.validate()?;
        self.token = Some(self.source.arm(self.mode)?);
        self.last_time = None;
        self.accumulator = 0.0;
        log::info!("Loop started ({:?})", self.mode);
        Ok(())
    }

    /// Disarm the tick source; safe to call any number of times
    pub fn stop(&mut self) {
        if let Some(token) = self.token.take() {
            self.source.disarm(token);
            log::info!("Loop stopped after {} ticks", self.ticks);
        }
    }

    /// Host tick event at `now` seconds
    ///
    /// Returns the number of simulation ticks run. Events carrying a token
    /// other than the armed one are stale and ignored.
    pub fn fire(&mut self, token: TickToken, now: f64) -> usize {
        if self.token != Some(token) {
            log::trace!("Ignoring stale tick {:?}", token);
            return 0;
        }

        // First event only establishes the time base
        let elapsed = match self.last_time.replace(now) {
            Some(last) => ((now - last) as f32).max(0.0),
            None => 0.0,
        };

        let mut ran = 0;
        let mut stop = false;
        match self.mode {
            TickMode::FixedStep { hz } => {
                let step = 1.0 / hz;
                // A slow rate still needs one host frame to cover a full step
                let cap = (MAX_SUBSTEPS as f32 * step).max(MAX_FRAME_DT);
                self.accumulator += elapsed.min(cap);
                while self.accumulator >= step && ran < MAX_SUBSTEPS as usize {
                    self.accumulator -= step;
                    ran += 1;
                    if self.run_tick(step) {
                        stop = true;
                        break;
                    }
                }
                // Drop backlog a slow host can never catch up on
                self.accumulator = self.accumulator.min(step);
            }
            TickMode::DisplaySync => {
                if elapsed > 0.0 {
                    ran = 1;
                    stop = self.run_tick(elapsed.min(MAX_FRAME_DT));
                }
            }
        }

        if stop {
            self.stop();
        } else if self.mode == TickMode::DisplaySync {
            self.rearm();
        }
        ran
    }

    fn run_tick(&mut self, dt: f32) -> bool {
        self.ticks += 1;
        let mut ctx = TickContext {
            dt,
            tick: self.ticks,
            stop_requested: false,
        };
        (self.callback)(&mut ctx);
        ctx.stop_requested
    }

    fn rearm(&mut self) {
        if let Some(old) = self.token.take() {
            self.source.disarm(old);
        }
        match self.source.arm(self.mode) {
            Ok(token) => self.token = Some(token),
            Err(err) => log::warn!("Re-arming display tick failed ({err}); loop stopped"),
        }
    }
}

impl<S: TickSource, F: FnMut(&mut TickContext)> Drop for LoopHandle<S, F> {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::headless::ManualTickSource;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn counting_loop(
        mode: TickMode,
    ) -> (LoopHandle<ManualTickSource, impl FnMut(&mut TickContext)>, Rc<RefCell<Vec<f32>>>) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let handle = LoopHandle::new(ManualTickSource::new(), move |ctx: &mut TickContext| sink.borrow_mut().push(ctx.dt), mode);
        (handle, seen)
    }

    #[test]
    fn test_fixed_step_accumulates() {
        let (mut handle, seen) = counting_loop(TickMode::FixedStep { hz: 64.0 });
        handle.start().unwrap();
        let token = handle.token().unwrap();

        assert_eq!(handle.fire(token, 1.0), 0);
        assert_eq!(handle.fire(token, 1.0625), 4);
        // Half a step: nothing yet
        assert_eq!(handle.fire(token, 1.0703125), 0);
        assert_eq!(handle.fire(token, 1.078125), 1);
        assert!(seen.borrow().iter().all(|&dt| dt == 1.0 / 64.0));
    }

    #[test]
    fn test_slow_rate_keeps_wall_clock_pace() {
        let (mut handle, seen) = counting_loop(TickMode::FixedStep { hz: 4.0 });
        handle.start().unwrap();
        let token = handle.token().unwrap();

        // Four seconds of host frames, one per step
        let ran: usize = (0..=16).map(|i| handle.fire(token, i as f64 * 0.25)).sum();
        assert_eq!(ran, 16);
        assert!(seen.borrow().iter().all(|&dt| dt == 0.25));
    }

    #[test]
    fn test_substeps_are_capped() {
        let (mut handle, _) = counting_loop(TickMode::FixedStep { hz: 1024.0 });
        handle.start().unwrap();
        let token = handle.token().unwrap();
        handle.fire(token, 0.0);
        assert_eq!(handle.fire(token, 0.0625), MAX_SUBSTEPS as usize);
        // Backlog was dropped
        assert!(handle.fire(token, 0.0625 + 1.0 / 1024.0) <= 2);
    }

    #[test]
    fn test_idempotent_stop() {
        let (mut handle, seen) = counting_loop(TickMode::FixedStep { hz: 64.0 });
        handle.start().unwrap();
        let token = handle.token().unwrap();
        handle.fire(token, 0.0);
        handle.fire(token, 0.03125);
        assert_eq!(seen.borrow().len(), 2);

        handle.stop();
        handle.stop();
        assert!(!handle.is_running());
        assert_eq!(handle.source().active(), 0);
        // The host may still deliver an event queued before the stop
        assert_eq!(handle.fire(token, 0.0625), 0);
        assert_eq!(seen.borrow().len(), 2);
    }

    #[test]
    fn test_restart_does_not_duplicate_source() {
        let (mut handle, _) = counting_loop(TickMode::FixedStep { hz: 64.0 });
        handle.start().unwrap();
        handle.start().unwrap();
        assert_eq!(handle.source().arm_count(), 1);

        let old = handle.token().unwrap();
        handle.stop();
        handle.start().unwrap();
        let new = handle.token().unwrap();
        assert_ne!(old, new);
        assert_eq!(handle.source().active(), 1);
        assert_eq!(handle.fire(old, 5.0), 0);
    }

    #[test]
    fn test_stop_from_inside_callback() {
        let mut handle = create_loop(
            ManualTickSource::new(),
            |ctx: &mut TickContext| {
                if ctx.tick == 2 {
                    ctx.stop();
                }
            },
            LoopOptions { fixed_step: true, hz: 64.0 },
        );
        handle.start().unwrap();
        let token = handle.token().unwrap();
        handle.fire(token, 0.0);
        // Four steps due, but the callback stops the loop on the second
        assert_eq!(handle.fire(token, 0.0625), 2);
        assert!(!handle.is_running());
        assert_eq!(handle.ticks(), 2);
        assert_eq!(handle.source().active(), 0);
    }

    #[test]
    fn test_display_sync_rearms_each_frame() {
        let (mut handle, seen) = counting_loop(TickMode::DisplaySync);
        handle.start().unwrap();

        let first = handle.token().unwrap();
        assert_eq!(handle.fire(first, 0.0), 0);
        let second = handle.token().unwrap();
        assert_ne!(first, second);
        assert_eq!(handle.source().active(), 1);

        assert_eq!(handle.fire(second, 0.015625), 1);
        // Long stall is clamped
        let third = handle.token().unwrap();
        assert_eq!(handle.fire(third, 5.0), 1);
        assert_eq!(*seen.borrow(), vec![0.015625, MAX_FRAME_DT]);
    }

    #[test]
    fn test_arm_failure_propagates() {
        let (mut handle, _) = counting_loop(TickMode::FixedStep { hz: 60.0 });
        handle.source_mut().fail_next_arm();
        assert!(matches!(handle.start(), Err(EngineError::Host(_))));
        assert!(!handle.is_running());
        assert!(handle.start().is_ok());
    }

    #[test]
    fn test_invalid_rate_rejected() {
        let (mut handle, _) = counting_loop(TickMode::FixedStep { hz: 0.0 });
        assert!(matches!(handle.start(), Err(EngineError::Config(ConfigError::InvalidTickRate(_)))));
        assert_eq!(handle.source().arm_count(), 0);
    }

    #[test]
    fn test_drop_disarms() {
        let source = ManualTickSource::new();
        let probe = source.probe();
        {
            let mut handle = create_loop(source, |_: &mut TickContext| {}, LoopOptions::default());
            handle.start().unwrap();
            assert_eq!(probe.active(), 1);
        }
        assert_eq!(probe.active(), 0);
    }
}
