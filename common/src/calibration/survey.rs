use core::array::from_fn;

use super::SurveyCalib;
use crate::{
    clock::Clock,
    detection::SampleAdapter,
    errors::{CalibrationError, DeviceError, FlightStatError},
    filters::Statistics,
    hw_abstraction::ImuSource,
    types::{config::secs, measurements::Sample},
};

use embassy_time::Duration;

#[allow(unused_imports)]
use num_traits::Float as _;

/// Margin applied on top of observed peaks when suggesting thresholds
pub const SUGGESTION_FACTOR: f32 = 1.5;

/// Observe the sensor for a while and report how much it moves. Run it once
/// at rest and once with motors spinning on the ground; the motor-start band
/// belongs between the two.
pub async fn survey_sensor(
    mut source: impl ImuSource,
    clock: impl Clock,
    gravity_offset: f32,
    config: SurveyCalib,
) -> Result<SurveyReport, FlightStatError> {
    const ID: &str = "sensor_survey";

    config.validate()?;
    info!("{}: Surveying sensor for {} s", ID, config.duration_s);

    let adapter = SampleAdapter::new(gravity_offset);
    let mut survey = SensorSurvey::new(config.alpha);
    let mut num_dropped = 0;

    let period = Duration::from_millis(config.poll_interval_ms as u64);
    let start = clock.now();
    let end = start + secs(config.duration_s);
    let mut next = start;

    while clock.now() < end {
        next += period;

        match source.read_acc_gyr_mag().await {
            Ok(raw) => survey.add(&adapter.adapt(&raw)),
            Err(DeviceError::EndOfStream) => {
                warn!("{}: Sensor stream ended early", ID);
                break;
            }
            Err(error) => {
                if num_dropped >= config.max_dropped {
                    error!("{}: Too many dropped readings, last: {}", ID, error);
                    Err(CalibrationError::SurveyMaxDropped)?
                }
                num_dropped += 1;
            }
        }

        clock.wait_until(next).await;
    }

    let report = survey.report().ok_or(CalibrationError::SurveyNoSamples)?;

    info!(
        "{}: Survey complete, {} samples, {} dropped",
        ID, report.samples, num_dropped
    );
    info!(
        "{}: Peak acc [g]: {:?}, suggested ceiling: {:?}",
        ID,
        report.acc_peak,
        report.suggested_acc_ceiling()
    );
    info!(
        "{}: Peak gyr [deg/s]: {:?}, suggested ceiling: {:?}",
        ID,
        report.gyr_peak,
        report.suggested_gyr_ceiling()
    );

    Ok(report)
}

/// Accumulates per-axis peaks and running statistics of adapted samples.
#[derive(Debug, Clone)]
pub struct SensorSurvey {
    samples: u32,
    acc_peak: [f32; 3],
    gyr_peak: [f32; 3],
    acc_stats: [Statistics<f32>; 3],
    gyr_stats: [Statistics<f32>; 3],
}

impl SensorSurvey {
    pub fn new(alpha: f32) -> Self {
        Self {
            samples: 0,
            acc_peak: [0.0; 3],
            gyr_peak: [0.0; 3],
            acc_stats: [Statistics::new(alpha); 3],
            gyr_stats: [Statistics::new(alpha); 3],
        }
    }

    pub fn add(&mut self, sample: &Sample) {
        self.samples = self.samples.saturating_add(1);

        for axis in 0..3 {
            let (acc, gyr) = (sample.acc[axis], sample.gyr[axis]);
            self.acc_peak[axis] = self.acc_peak[axis].max(acc.abs());
            self.gyr_peak[axis] = self.gyr_peak[axis].max(gyr.abs());
            self.acc_stats[axis].add_sample(acc);
            self.gyr_stats[axis].add_sample(gyr);
        }
    }

    pub fn samples(&self) -> u32 {
        self.samples
    }

    /// `None` until at least one sample was added
    pub fn report(&self) -> Option<SurveyReport> {
        if self.samples == 0 {
            return None;
        }

        Some(SurveyReport {
            samples: self.samples,
            acc_peak: self.acc_peak,
            gyr_peak: self.gyr_peak,
            acc_mean: from_fn(|i| self.acc_stats[i].mean()),
            acc_std_dev: from_fn(|i| self.acc_stats[i].std_dev()),
            gyr_mean: from_fn(|i| self.gyr_stats[i].mean()),
            gyr_std_dev: from_fn(|i| self.gyr_stats[i].std_dev()),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SurveyReport {
    pub samples: u32,
    pub acc_peak: [f32; 3],
    pub gyr_peak: [f32; 3],
    pub acc_mean: [f32; 3],
    pub acc_std_dev: [f32; 3],
    pub gyr_mean: [f32; 3],
    pub gyr_std_dev: [f32; 3],
}

impl SurveyReport {
    pub fn suggested_acc_ceiling(&self) -> [f32; 3] {
        self.acc_peak.map(|peak| peak * SUGGESTION_FACTOR)
    }

    pub fn suggested_gyr_ceiling(&self) -> [f32; 3] {
        self.gyr_peak.map(|peak| peak * SUGGESTION_FACTOR)
    }
}
