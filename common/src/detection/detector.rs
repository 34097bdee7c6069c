use embassy_time::{Duration, Instant};

use crate::consts::WARMUP_SAMPLES;
use crate::types::config::{secs, DetectorConfig};
use crate::types::measurements::Sample;
use crate::types::status::{Phase, ResetReason};

use super::window::{Trend, TrendWindow};

#[allow(unused_imports)]
use num_traits::Float as _;

const ID: &str = "detector";

/// Outcome of feeding one sample to the detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PhaseUpdate {
    /// Phase before the sample was processed
    pub previous: Phase,
    /// Phase after the sample was processed
    pub phase: Phase,
    /// Set if the sample caused the detector to reset
    pub reset: Option<ResetReason>,
}

impl PhaseUpdate {
    const fn unchanged(phase: Phase) -> Self {
        Self {
            previous: phase,
            phase,
            reset: None,
        }
    }

    pub fn changed(&self) -> bool {
        self.previous != self.phase
    }

    /// True if this update moved the detector into `phase`
    pub fn entered(&self, phase: Phase) -> bool {
        self.phase == phase && self.previous != phase
    }
}

enum Step {
    Stay,
    Enter(Phase),
    Reset(ResetReason),
}

/// Recognizes the takeoff sequence
/// `Idle → MotorOn → FirstRise → FirstFall → SecondFall → SecondRise → Steady`
/// from gravity-compensated samples, one sample per call.
#[derive(Debug, Clone)]
pub struct MotionPhaseDetector {
    config: DetectorConfig,
    idle_min_dwell: Duration,
    motor_on_min_dwell: Duration,
    transition_timeout: Duration,

    phase: Phase,
    entered_at: Option<Instant>,
    window: TrendWindow,

    samples: u32,
    resets: u32,
    transitions: u32,
    idle_entries: u32,
    last_reset: Option<ResetReason>,
}

impl MotionPhaseDetector {
    pub fn new(config: DetectorConfig) -> Self {
        Self {
            idle_min_dwell: secs(config.idle_min_dwell_s),
            motor_on_min_dwell: secs(config.motor_on_min_dwell_s),
            transition_timeout: secs(config.transition_timeout_s),
            config,
            phase: Phase::Idle,
            entered_at: None,
            window: TrendWindow::new(),
            samples: 0,
            resets: 0,
            transitions: 0,
            idle_entries: 0,
            last_reset: None,
        }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// When the current phase was entered, `None` before the first sample
    pub fn phase_entered_at(&self) -> Option<Instant> {
        self.entered_at
    }

    pub fn samples(&self) -> u32 {
        self.samples
    }

    pub fn resets(&self) -> u32 {
        self.resets
    }

    pub fn transitions(&self) -> u32 {
        self.transitions
    }

    pub fn last_reset(&self) -> Option<ResetReason> {
        self.last_reset
    }

    /// Process one sample and return the resulting phase.
    pub fn process(&mut self, sample: &Sample, now: Instant) -> Phase {
        self.advance(sample, now).phase
    }

    /// Process one sample and report what happened to the phase.
    pub fn advance(&mut self, sample: &Sample, now: Instant) -> PhaseUpdate {
        self.samples = self.samples.saturating_add(1);
        let entered_at = *self.entered_at.get_or_insert(now);
        let previous = self.phase;

        if self.samples <= WARMUP_SAMPLES {
            if self.samples == WARMUP_SAMPLES {
                debug!("{}: Warm-up complete", ID);
            }
            return PhaseUpdate::unchanged(previous);
        }

        if let Some(reason) = self.anomaly(sample) {
            return self.reset_with(reason, now);
        }

        let dwell = now.saturating_duration_since(entered_at);
        match self.transition(sample, dwell) {
            Step::Stay => PhaseUpdate::unchanged(previous),
            Step::Enter(phase) => self.enter(phase, now),
            Step::Reset(reason) => self.reset_with(reason, now),
        }
    }

    /// Abandon any partially recognized sequence on request.
    pub fn reset(&mut self, now: Instant) -> PhaseUpdate {
        self.reset_with(ResetReason::Requested, now)
    }

    /// Return to `Idle` after a landing was confirmed. Not counted as a reset.
    pub fn confirm_landing(&mut self, now: Instant) -> PhaseUpdate {
        info!("{}: Landing confirmed in {}", ID, self.phase);
        let update = self.enter(Phase::Idle, now);
        self.idle_entries = self.idle_entries.saturating_add(1);
        update
    }

    fn reset_with(&mut self, reason: ResetReason, now: Instant) -> PhaseUpdate {
        let previous = self.phase;
        warn!("{}: Reset from {}: {}", ID, previous, reason);

        self.phase = Phase::Idle;
        self.entered_at = Some(now);
        self.window.clear();
        self.resets = self.resets.saturating_add(1);
        self.idle_entries = self.idle_entries.saturating_add(1);
        self.last_reset = Some(reason);

        PhaseUpdate {
            previous,
            phase: Phase::Idle,
            reset: Some(reason),
        }
    }

    fn enter(&mut self, phase: Phase, now: Instant) -> PhaseUpdate {
        let previous = self.phase;
        info!("{}: {} -> {}", ID, previous, phase);

        self.phase = phase;
        self.entered_at = Some(now);
        self.window.clear();
        self.transitions = self.transitions.saturating_add(1);

        PhaseUpdate {
            previous,
            phase,
            reset: None,
        }
    }

    /// Conditions under which the current phase cannot be part of a takeoff.
    fn anomaly(&self, sample: &Sample) -> Option<ResetReason> {
        let cfg = &self.config;

        let acc_ceiling = match self.phase {
            Phase::Idle | Phase::MotorOn | Phase::FirstRise => cfg.large_acc_early,
            _ => cfg.large_acc_late,
        };

        if sample.max_acc() > acc_ceiling {
            return Some(ResetReason::LargeAcceleration);
        }

        if sample.max_gyr() > cfg.large_gyr {
            return Some(ResetReason::LargeAngularRate);
        }

        match self.phase {
            Phase::MotorOn | Phase::FirstRise => {
                if sample.max_horizontal_acc() > cfg.horizontal_early {
                    return Some(ResetReason::HorizontalMovement);
                }
                if sample.acc_activity() < cfg.motors_stopped {
                    return Some(ResetReason::MotorsStopped);
                }
            }
            Phase::FirstFall | Phase::SecondFall => {
                if sample.max_horizontal_acc() > cfg.horizontal_late {
                    return Some(ResetReason::HorizontalMovement);
                }
            }
            _ => (),
        }

        if self.phase.is_in_sequence() && sample.max_gyr() > cfg.max_rotation {
            return Some(ResetReason::ExcessiveRotation);
        }

        None
    }

    fn transition(&mut self, sample: &Sample, dwell: Duration) -> Step {
        match self.phase {
            Phase::Idle => {
                if self.is_artifact(sample) || !self.motor_started(sample) {
                    Step::Stay
                } else if self.idle_entries > 0 && dwell < self.idle_min_dwell {
                    Step::Reset(ResetReason::FalsePositive)
                } else {
                    Step::Enter(Phase::MotorOn)
                }
            }
            Phase::MotorOn => {
                self.record(sample);
                let margin = self.config.trend_margin_wide;
                if !self.has_trend(Trend::Rising, margin) {
                    Step::Stay
                } else if dwell < self.motor_on_min_dwell {
                    Step::Reset(ResetReason::FalsePositive)
                } else {
                    Step::Enter(Phase::FirstRise)
                }
            }
            Phase::FirstRise | Phase::FirstFall | Phase::SecondFall => {
                if dwell > self.transition_timeout {
                    return Step::Reset(ResetReason::Timeout);
                }

                self.record(sample);
                let (trend, next) = match self.phase {
                    Phase::FirstRise => (Trend::Falling, Phase::FirstFall),
                    Phase::FirstFall => (Trend::Falling, Phase::SecondFall),
                    _ => (Trend::Rising, Phase::SecondRise),
                };

                match self.has_trend(trend, self.config.trend_margin) {
                    true => Step::Enter(next),
                    false => Step::Stay,
                }
            }
            Phase::SecondRise => Step::Enter(Phase::Steady),
            Phase::Steady => Step::Stay,
        }
    }

    fn has_trend(&self, trend: Trend, margin: f32) -> bool {
        self.window.is_trend(trend, margin, self.config.min_amplitude)
    }

    /// Push the vertical acceleration, unless it reads as a calibration artifact
    fn record(&mut self, sample: &Sample) {
        if !self.is_artifact(sample) {
            self.window.push(sample.az());
        }
    }

    fn is_artifact(&self, sample: &Sample) -> bool {
        sample.is_calibration_artifact(self.config.artifact_floor)
            || sample.az().abs() > self.config.artifact_ceiling
    }

    /// Whether any axis shows the small, steady vibration of spinning motors
    fn motor_started(&self, sample: &Sample) -> bool {
        let acc_band = &self.config.motor_band_acc;
        let gyr_band = &self.config.motor_band_gyr;

        sample.acc.iter().any(|a| acc_band.contains_abs(*a))
            || sample.gyr.iter().any(|g| gyr_band.contains_abs(*g))
    }
}
