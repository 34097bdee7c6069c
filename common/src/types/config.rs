use embassy_time::Duration;
use serde::{Deserialize, Serialize};

use crate::{const_default, consts::GRAVITY_G, errors::ConfigError};

#[allow(unused_imports)]
use num_traits::Float as _;

/// Convert a configured number of seconds into a [`Duration`].
/// Negative and non-finite values saturate to zero.
pub fn secs(seconds: f32) -> Duration {
    if seconds.is_finite() && seconds > 0.0 {
        Duration::from_micros((seconds * 1_000_000.0) as u64)
    } else {
        Duration::from_ticks(0)
    }
}

/// An open interval on the absolute value of a measurement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Band {
    pub lower: f32,
    pub upper: f32,
}

impl Band {
    pub const fn new(lower: f32, upper: f32) -> Self {
        Self { lower, upper }
    }

    /// True if `lower < |value| < upper`
    pub fn contains_abs(&self, value: f32) -> bool {
        let value = value.abs();
        value > self.lower && value < self.upper
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(self.lower.is_finite() && self.upper.is_finite()) || self.lower < 0.0 {
            return Err(ConfigError::NonPositiveThreshold);
        }
        if self.lower >= self.upper {
            return Err(ConfigError::EmptyBand);
        }
        Ok(())
    }
}

/// Thresholds of the motion phase detector, in `g`, `deg/s` and seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[serde(default)]
pub struct DetectorConfig {
    /// Per-axis acceleration that reads as motor ripple when idle
    pub motor_band_acc: Band,
    /// Per-axis angular rate that reads as motor ripple when idle
    pub motor_band_gyr: Band,
    /// Acceleration ceiling in `Idle`, `MotorOn` and `FirstRise`
    pub large_acc_early: f32,
    /// Acceleration ceiling from `FirstFall` onwards, where swings are larger
    pub large_acc_late: f32,
    /// Angular rate ceiling in every gated phase
    pub large_gyr: f32,
    /// Horizontal acceleration cap in `MotorOn` and `FirstRise`
    pub horizontal_early: f32,
    /// Horizontal acceleration cap in `FirstFall` and `SecondFall`
    pub horizontal_late: f32,
    /// Below this summed acceleration the motors are considered stopped
    pub motors_stopped: f32,
    /// Angular rate cap while a sequence is in progress
    pub max_rotation: f32,
    /// Default margin of the trend rule
    pub trend_margin: f32,
    /// Margin of the trend rule for the first rise out of `MotorOn`
    pub trend_margin_wide: f32,
    /// Minimum spread of the trend window for any trend to count
    pub min_amplitude: f32,
    /// Vertical readings below this are calibration artifacts
    pub artifact_floor: f32,
    /// Vertical readings beyond this magnitude are calibration artifacts
    pub artifact_ceiling: f32,
    /// Dwell in `Idle` required before a new sequence may start
    pub idle_min_dwell_s: f32,
    /// Dwell in `MotorOn` required before the first rise counts
    pub motor_on_min_dwell_s: f32,
    /// Time allowed between the edges of the sequence
    pub transition_timeout_s: f32,
}

const_default!(DetectorConfig => {
    motor_band_acc: Band::new(0.02, 0.08),
    motor_band_gyr: Band::new(5.0, 15.0),
    large_acc_early: 1.5,
    large_acc_late: 2.0,
    large_gyr: 300.0,
    horizontal_early: 0.8,
    horizontal_late: 1.0,
    motors_stopped: 0.005,
    max_rotation: 70.0,
    trend_margin: 0.05,
    trend_margin_wide: 0.12,
    min_amplitude: 0.05,
    artifact_floor: -0.5,
    artifact_ceiling: 2.0,
    idle_min_dwell_s: 5.0,
    motor_on_min_dwell_s: 1.5,
    transition_timeout_s: 5.0,
});

impl DetectorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.motor_band_acc.validate()?;
        self.motor_band_gyr.validate()?;

        let thresholds = [
            self.large_acc_early,
            self.large_acc_late,
            self.large_gyr,
            self.horizontal_early,
            self.horizontal_late,
            self.motors_stopped,
            self.max_rotation,
            self.trend_margin,
            self.trend_margin_wide,
            self.min_amplitude,
            self.artifact_ceiling,
        ];
        if thresholds.iter().any(|t| !t.is_finite() || *t <= 0.0) {
            return Err(ConfigError::NonPositiveThreshold);
        }

        let durations = [
            self.idle_min_dwell_s,
            self.motor_on_min_dwell_s,
            self.transition_timeout_s,
        ];
        if durations.iter().any(|d| !d.is_finite() || *d <= 0.0) {
            return Err(ConfigError::NonPositiveDuration);
        }

        if self.trend_margin_wide < self.trend_margin {
            return Err(ConfigError::NarrowWidenedMargin);
        }
        if self.large_acc_late < self.large_acc_early {
            return Err(ConfigError::InvertedCeilings);
        }
        if !self.artifact_floor.is_finite() || self.artifact_floor >= 0.0 {
            return Err(ConfigError::ArtifactFloor);
        }
        Ok(())
    }
}

/// Timing and rest thresholds of the flight status tracker.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[serde(default)]
pub struct TrackerConfig {
    /// Continuous time in `Idle` after which the status is `Stopped`
    pub idle_timeout_s: f32,
    /// Continuous time at strict rest in `Steady` confirming a landing
    pub landing_duration_s: f32,
    /// Per-axis acceleration limit of the strict rest condition
    pub landing_acc: f32,
    /// Per-axis angular rate limit of the strict rest condition
    pub landing_gyr: f32,
    /// Vertical readings below this count as rest
    pub artifact_floor: f32,
}

const_default!(TrackerConfig => {
    idle_timeout_s: 10.0,
    landing_duration_s: 10.0,
    landing_acc: 0.03,
    landing_gyr: 10.0,
    artifact_floor: -0.5,
});

impl TrackerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if [self.landing_acc, self.landing_gyr]
            .iter()
            .any(|t| !t.is_finite() || *t <= 0.0)
        {
            return Err(ConfigError::NonPositiveThreshold);
        }
        if [self.idle_timeout_s, self.landing_duration_s]
            .iter()
            .any(|d| !d.is_finite() || *d <= 0.0)
        {
            return Err(ConfigError::NonPositiveDuration);
        }
        if !self.artifact_floor.is_finite() || self.artifact_floor >= 0.0 {
            return Err(ConfigError::ArtifactFloor);
        }
        Ok(())
    }
}

/// Configuration of the complete monitor and its polling loop.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[serde(default)]
pub struct MonitorConfig {
    pub detector: DetectorConfig,
    pub tracker: TrackerConfig,
    /// Subtracted from the raw vertical acceleration
    pub gravity_offset: f32,
    /// Period of the polling loop
    pub poll_interval_ms: u16,
    /// Emit a telemetry line every this many samples, 0 disables it
    pub log_every: u32,
    /// Consecutive sensor read failures tolerated before giving up
    pub max_read_errors: u32,
}

const_default!(MonitorConfig => {
    detector: DetectorConfig::const_default(),
    tracker: TrackerConfig::const_default(),
    gravity_offset: GRAVITY_G,
    poll_interval_ms: 50,
    log_every: 10,
    max_read_errors: 20,
});

impl MonitorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.detector.validate()?;
        self.tracker.validate()?;
        if !self.gravity_offset.is_finite() {
            return Err(ConfigError::NonPositiveThreshold);
        }
        if !(1..=1000).contains(&self.poll_interval_ms) {
            return Err(ConfigError::PollInterval);
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms as u64)
    }
}

/// Configuration of the status broadcaster.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[serde(default)]
pub struct ReportConfig {
    /// Re-broadcast an unchanged status after this many seconds
    pub interval_s: f32,
    /// Period of the reporting loop
    pub poll_interval_ms: u16,
}

const_default!(ReportConfig => {
    interval_s: 1.0,
    poll_interval_ms: 50,
});

impl ReportConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.interval_s.is_finite() || self.interval_s <= 0.0 {
            return Err(ConfigError::NonPositiveDuration);
        }
        if !(1..=1000).contains(&self.poll_interval_ms) {
            return Err(ConfigError::PollInterval);
        }
        Ok(())
    }
}
