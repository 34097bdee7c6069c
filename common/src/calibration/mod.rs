pub mod survey;

pub use survey::{SensorSurvey, SurveyReport};

use serde::{Deserialize, Serialize};

use crate::const_default;
use crate::errors::ConfigError;

/// Settings of the sensor survey, which observes the sensor at rest or with
/// motors spinning to help tune the motor-start bands.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[serde(default)]
pub struct SurveyCalib {
    pub duration_s: f32,
    pub poll_interval_ms: u16,
    pub max_dropped: usize,
    /// Smoothing factor of the running statistics
    pub alpha: f32,
}

const_default!(SurveyCalib => {
    duration_s: 10.0,
    poll_interval_ms: 50,
    max_dropped: 20,
    alpha: 0.02,
});

impl SurveyCalib {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.duration_s.is_finite() || self.duration_s <= 0.0 {
            return Err(ConfigError::NonPositiveDuration);
        }
        if !(1..=1000).contains(&self.poll_interval_ms) {
            return Err(ConfigError::PollInterval);
        }
        if !(self.alpha > 0.0 && self.alpha <= 1.0) {
            return Err(ConfigError::SmoothingFactor);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn survey_settings_are_checked() {
        assert_eq!(SurveyCalib::default().validate(), Ok(()));

        let invalid = [
            (SurveyCalib { poll_interval_ms: 0, ..Default::default() }, ConfigError::PollInterval),
            (SurveyCalib { poll_interval_ms: 1001, ..Default::default() }, ConfigError::PollInterval),
            (SurveyCalib { duration_s: 0.0, ..Default::default() }, ConfigError::NonPositiveDuration),
            (SurveyCalib { duration_s: f32::INFINITY, ..Default::default() }, ConfigError::NonPositiveDuration),
            (SurveyCalib { alpha: 0.0, ..Default::default() }, ConfigError::SmoothingFactor),
            (SurveyCalib { alpha: 1.5, ..Default::default() }, ConfigError::SmoothingFactor),
        ];

        for (config, error) in invalid {
            assert_eq!(config.validate(), Err(error), "{config:?}");
        }

        let edge = SurveyCalib { poll_interval_ms: 1000, alpha: 1.0, ..Default::default() };
        assert_eq!(edge.validate(), Ok(()));
    }
}
