//! External scheduler: calls `Trainer::tick` at a fixed period.
//!
//! Only the runner sleeps, and it does so through the trainer's injected
//! `Clock`, so a `ManualClock` replays a recorded trace as fast as the CPU
//! allows while still producing the timestamps a real session would.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use swish_traits::{Actuator, SampleSource};

use crate::core::Trainer;
use crate::error::Result;
use crate::status::{TickReport, TrainingEvent};

/// Why `run` returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Shutdown,
    ShotBudget,
    TickBudget,
    SourceExhausted,
    CalibrationDone,
}

impl StopReason {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Shutdown => "shutdown",
            Self::ShotBudget => "shot_budget",
            Self::TickBudget => "tick_budget",
            Self::SourceExhausted => "source_exhausted",
            Self::CalibrationDone => "calibration_done",
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunParams {
    pub tick_hz: u32,
    /// Stop once this many shots have closed.
    pub max_shots: Option<u64>,
    pub max_ticks: Option<u64>,
    /// Stop as soon as a calibration completes or fails.
    pub stop_on_calibration: bool,
    /// After the source runs dry, keep ticking this long so a playing cue
    /// can finish and the motors end idle.
    pub settle_ms: u64,
    pub shutdown: Option<Arc<AtomicBool>>,
}

impl Default for RunParams {
    fn default() -> Self {
        Self {
            tick_hz: 100,
            max_shots: None,
            max_ticks: None,
            stop_on_calibration: false,
            settle_ms: 1_000,
            shutdown: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub ticks: u64,
    pub samples: u64,
    pub discarded: u64,
    pub shots: u64,
    pub stop: StopReason,
}

impl RunSummary {
    fn absorb<F: FnMut(&TrainingEvent)>(&mut self, report: &TickReport, on_event: &mut F) {
        self.ticks += 1;
        self.samples += report.samples as u64;
        self.discarded += report.discarded as u64;
        self.shots += report.shots_closed() as u64;
        for event in &report.events {
            on_event(event);
        }
    }
}

#[inline]
fn shutdown_requested(flag: Option<&Arc<AtomicBool>>) -> bool {
    flag.is_some_and(|f| f.load(Ordering::Relaxed))
}

/// Number of ticks that cover `ms` at `period_ms`, at least one.
#[inline]
fn settle_ticks(ms: u64, period_ms: u64) -> u64 {
    ms.div_ceil(period_ms.max(1)).max(1)
}

/// Drive `trainer` until a stop condition holds.
///
/// `on_event` sees every event in the order ticks produced it. Motors are
/// stopped before returning on every path except a tick error, which is
/// returned as-is.
pub fn run<Src, Act, F>(
    trainer: &mut Trainer<Src, Act>,
    params: &RunParams,
    mut on_event: F,
) -> Result<RunSummary>
where
    Src: SampleSource,
    Act: Actuator,
    F: FnMut(&TrainingEvent),
{
    let period = Duration::from_micros(crate::util::period_us(params.tick_hz));
    let period_ms = crate::util::period_ms(params.tick_hz);
    let mut summary = RunSummary {
        ticks: 0,
        samples: 0,
        discarded: 0,
        shots: 0,
        stop: StopReason::SourceExhausted,
    };
    tracing::info!(
        tick_hz = params.tick_hz,
        mode = trainer.mode().as_str(),
        max_shots = ?params.max_shots,
        "runner start"
    );

    let stop = loop {
        if shutdown_requested(params.shutdown.as_ref()) {
            break StopReason::Shutdown;
        }

        let report = trainer.tick()?;
        summary.absorb(&report, &mut on_event);

        if params.stop_on_calibration && report.calibration_done() {
            break StopReason::CalibrationDone;
        }
        if params.max_shots.is_some_and(|n| summary.shots >= n) {
            break StopReason::ShotBudget;
        }
        if params.max_ticks.is_some_and(|n| summary.ticks >= n) {
            break StopReason::TickBudget;
        }
        if trainer.source_exhausted() {
            break StopReason::SourceExhausted;
        }
        trainer.clock.sleep(period);
    };

    // let a cue that is still playing run out on a drained source
    if stop == StopReason::SourceExhausted || stop == StopReason::ShotBudget {
        for _ in 0..settle_ticks(params.settle_ms, period_ms) {
            if !trainer.haptics().any_active() {
                break;
            }
            trainer.clock.sleep(period);
            let report = trainer.tick()?;
            summary.absorb(&report, &mut on_event);
        }
    }

    trainer.stop_all();
    summary.stop = stop;
    tracing::info!(
        stop = stop.as_str(),
        ticks = summary.ticks,
        samples = summary.samples,
        shots = summary.shots,
        "runner stop"
    );
    Ok(summary)
}
