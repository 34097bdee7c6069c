use serde::{Deserialize, Serialize};
use thiserror::Error;

#[non_exhaustive]
#[derive(Error, Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FlightStatError {
    #[error("Sensor source error: {0}")]
    Device(#[from] DeviceError),
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Status report error: {0}")]
    Report(#[from] ReportError),
    #[error("Calibration error: {0}")]
    Calibration(#[from] CalibrationError),
}

#[non_exhaustive]
#[derive(Error, Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DeviceError {
    #[error("The device is not responding after {millis} ms.")]
    Timeout { millis: u64 },
    #[error("The sensor has not produced its first sample yet.")]
    NotReady,
    #[error("The sensor stream has ended.")]
    EndOfStream,
    #[error("The sample buffer lock was poisoned by a panicking writer.")]
    Poisoned,
}

#[non_exhaustive]
#[derive(Error, Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    #[error("The lower bound of a detection band must be below its upper bound.")]
    EmptyBand,
    #[error("Thresholds and margins must be positive and finite.")]
    NonPositiveThreshold,
    #[error("Durations must be positive and finite.")]
    NonPositiveDuration,
    #[error("The widened trend margin must not be smaller than the default margin.")]
    NarrowWidenedMargin,
    #[error("The late-phase acceleration ceiling must not be below the early-phase ceiling.")]
    InvertedCeilings,
    #[error("The calibration artifact floor must be negative.")]
    ArtifactFloor,
    #[error("The polling interval must be between 1 ms and 1000 ms.")]
    PollInterval,
    #[error("The smoothing factor must be in (0, 1].")]
    SmoothingFactor,
}

#[non_exhaustive]
#[derive(Error, Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReportError {
    #[error("The beacon did not accept the new message.")]
    Rejected,
}

#[non_exhaustive]
#[derive(Error, Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CalibrationError {
    #[error("Too many sensor readings were dropped during the survey.")]
    SurveyMaxDropped,
    #[error("The survey finished without a single sample.")]
    SurveyNoSamples,
}

/// Suppresses repeated reports of an identical value within a time window.
pub struct Debounce<T> {
    duration: embassy_time::Duration,
    inner: Option<(embassy_time::Instant, T)>,
}

impl<T: PartialEq + Clone> Debounce<T> {
    pub fn new(duration: embassy_time::Duration) -> Self {
        Self {
            duration,
            inner: None,
        }
    }

    /// Returns the value if it should be reported at the time `now`,
    /// that is, if it differs from the last one or the window has passed.
    pub fn evaluate(&mut self, value: T, now: embassy_time::Instant) -> Option<T> {
        if self.inner.as_ref().is_none_or(|(t, v)| {
            now.saturating_duration_since(*t) > self.duration || v != &value
        }) {
            self.inner = Some((now, value.clone()));
            Some(value)
        } else {
            None
        }
    }
}
