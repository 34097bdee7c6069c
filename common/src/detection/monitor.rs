use core::fmt;

use embassy_time::Instant;
use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;
use crate::types::config::MonitorConfig;
use crate::types::measurements::{Imu9DofData, Sample};
use crate::types::status::{FlightStatus, Phase};

use super::{FlightStatusTracker, MotionPhaseDetector, PhaseUpdate, SampleAdapter};

/// Everything that happened during one polling cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonitorStep {
    pub sample: Sample,
    pub update: PhaseUpdate,
    pub previous_status: FlightStatus,
    pub status: FlightStatus,
}

impl MonitorStep {
    pub fn status_changed(&self) -> bool {
        self.previous_status != self.status
    }
}

/// Counters collected over the lifetime of a monitor.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MonitorSummary {
    pub samples: u32,
    pub transitions: u32,
    pub resets: u32,
    pub takeoffs: u32,
    pub landings: u32,
    pub read_errors: u32,
    pub phase: Phase,
    pub status: FlightStatus,
}

impl fmt::Display for MonitorSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "samples: {}, transitions: {}, resets: {}, takeoffs: {}, landings: {}, read errors: {}, phase: {}, status: {}",
            self.samples,
            self.transitions,
            self.resets,
            self.takeoffs,
            self.landings,
            self.read_errors,
            self.phase,
            self.status,
        )
    }
}

/// Sample adapter, detector and tracker wired together.
#[derive(Debug, Clone)]
pub struct FlightMonitor {
    config: MonitorConfig,
    adapter: SampleAdapter,
    detector: MotionPhaseDetector,
    tracker: FlightStatusTracker,
    read_errors: u32,
}

impl FlightMonitor {
    pub fn new(config: MonitorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            adapter: SampleAdapter::new(config.gravity_offset),
            detector: MotionPhaseDetector::new(config.detector),
            tracker: FlightStatusTracker::new(config.tracker),
            read_errors: 0,
        })
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn detector(&self) -> &MotionPhaseDetector {
        &self.detector
    }

    pub fn tracker(&self) -> &FlightStatusTracker {
        &self.tracker
    }

    pub fn current_phase(&self) -> Phase {
        self.detector.phase()
    }

    pub fn current_status(&self) -> FlightStatus {
        self.tracker.status()
    }

    /// Adapt a raw snapshot and run it through detector and tracker.
    pub fn step(&mut self, raw: &Imu9DofData<f32>, now: Instant) -> MonitorStep {
        let sample = self.adapter.adapt(raw);
        self.step_sample(sample, now)
    }

    /// Run an already gravity-compensated sample through detector and tracker.
    pub fn step_sample(&mut self, sample: Sample, now: Instant) -> MonitorStep {
        let previous_status = self.tracker.status();
        let mut update = self.detector.advance(&sample, now);
        let status = self
            .tracker
            .update(&mut self.detector, &update, &sample, now);

        // The tracker moves the detector back to idle when it confirms a landing
        update.phase = self.detector.phase();

        MonitorStep {
            sample,
            update,
            previous_status,
            status,
        }
    }

    /// Abandon the current sequence, stopping the status if it was started.
    pub fn reset(&mut self, now: Instant) -> PhaseUpdate {
        let update = self.detector.reset(now);
        self.tracker.handle_reset(now);
        update
    }

    pub fn record_read_error(&mut self) {
        self.read_errors = self.read_errors.saturating_add(1);
    }

    pub fn summary(&self) -> MonitorSummary {
        MonitorSummary {
            samples: self.detector.samples(),
            transitions: self.detector.transitions(),
            resets: self.detector.resets(),
            takeoffs: self.tracker.takeoffs(),
            landings: self.tracker.landings(),
            read_errors: self.read_errors,
            phase: self.detector.phase(),
            status: self.tracker.status(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::script::{at, hold, takeoff};

    fn raw(sample: &Sample) -> Imu9DofData<f32> {
        let [ax, ay, az] = sample.acc;
        Imu9DofData {
            acc: [ax, ay, az + 1.0],
            gyr: sample.gyr,
            mag: [0.0; 3],
        }
    }

    #[test]
    fn rejects_invalid_config() {
        let mut config = MonitorConfig::default();
        config.detector.transition_timeout_s = -1.0;
        assert_eq!(
            FlightMonitor::new(config).err(),
            Some(ConfigError::NonPositiveDuration)
        );
    }

    #[test]
    fn full_flight_from_raw_snapshots() {
        let mut monitor = FlightMonitor::new(MonitorConfig::default()).unwrap();

        let mut script = takeoff();
        script.extend(hold(4900, 8000, crate::detection::script::ripple()));
        script.extend(hold(8000, 18_100, Sample::at_rest()));

        let changes: Vec<_> = script
            .iter()
            .map(|(now, sample)| monitor.step(&raw(sample), *now))
            .filter(|step| step.status_changed())
            .map(|step| step.status)
            .collect();

        assert_eq!(changes, [FlightStatus::Started, FlightStatus::Stopped]);

        let summary = monitor.summary();
        assert_eq!(summary.samples, script.len() as u32);
        assert_eq!(summary.transitions, 7);
        assert_eq!(summary.resets, 0);
        assert_eq!(summary.takeoffs, 1);
        assert_eq!(summary.landings, 1);
        assert_eq!(summary.phase, Phase::Idle);
        assert_eq!(summary.status, FlightStatus::Stopped);
    }

    #[test]
    fn landing_step_reports_idle_phase() {
        let mut monitor = FlightMonitor::new(MonitorConfig::default()).unwrap();

        let mut script = takeoff();
        script.extend(hold(4900, 8000, crate::detection::script::ripple()));
        script.extend(hold(8000, 18_100, Sample::at_rest()));

        let landing = script
            .iter()
            .map(|(now, sample)| monitor.step_sample(*sample, *now))
            .find(|step| step.status_changed() && step.status == FlightStatus::Stopped)
            .unwrap();

        assert_eq!(landing.update.previous, Phase::Steady);
        assert_eq!(landing.update.phase, Phase::Idle);
        assert_eq!(landing.update.reset, None);
        assert_eq!(landing.update.phase, monitor.current_phase());
    }

    #[test]
    fn explicit_reset_stops_status() {
        let mut monitor = FlightMonitor::new(MonitorConfig::default()).unwrap();
        for (now, sample) in takeoff() {
            monitor.step_sample(sample, now);
        }
        assert_eq!(monitor.current_status(), FlightStatus::Started);

        monitor.reset(at(5000));
        monitor.record_read_error();

        assert_eq!(monitor.current_phase(), Phase::Idle);
        assert_eq!(monitor.current_status(), FlightStatus::Stopped);
        assert_eq!(monitor.summary().resets, 1);
        assert_eq!(monitor.summary().read_errors, 1);
    }
}
