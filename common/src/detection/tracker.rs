use embassy_time::{Duration, Instant};

use crate::types::config::{secs, TrackerConfig};
use crate::types::measurements::Sample;
use crate::types::status::{FlightStatus, Phase};

use super::detector::{MotionPhaseDetector, PhaseUpdate};

#[allow(unused_imports)]
use num_traits::Float as _;

const ID: &str = "tracker";

/// Hysteresis on top of the detector, producing a status that only starts
/// once a full takeoff was recognized, and only stops after a reset, a
/// confirmed landing or a long stay in `Idle`.
#[derive(Debug, Clone)]
pub struct FlightStatusTracker {
    config: TrackerConfig,
    idle_timeout: Duration,
    landing_duration: Duration,

    status: FlightStatus,
    idle_since: Option<Instant>,
    rest_since: Option<Instant>,

    takeoffs: u32,
    landings: u32,
}

impl FlightStatusTracker {
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            idle_timeout: secs(config.idle_timeout_s),
            landing_duration: secs(config.landing_duration_s),
            config,
            status: FlightStatus::Stopped,
            idle_since: None,
            rest_since: None,
            takeoffs: 0,
            landings: 0,
        }
    }

    pub fn status(&self) -> FlightStatus {
        self.status
    }

    pub fn takeoffs(&self) -> u32 {
        self.takeoffs
    }

    pub fn landings(&self) -> u32 {
        self.landings
    }

    /// Start of the current unbroken stretch of strict rest in `Steady`
    pub fn rest_since(&self) -> Option<Instant> {
        self.rest_since
    }

    /// Fold the latest detector update into the status. Must be called
    /// right after the detector processed `sample`, since a confirmed
    /// landing forces the detector back to `Idle`.
    pub fn update(
        &mut self,
        detector: &mut MotionPhaseDetector,
        update: &PhaseUpdate,
        sample: &Sample,
        now: Instant,
    ) -> FlightStatus {
        if update.reset.is_some() {
            self.handle_reset(now);
        }

        match update.phase {
            Phase::Steady => {
                self.idle_since = None;

                if update.entered(Phase::Steady) {
                    self.rest_since = None;
                    if !self.status.is_flying() {
                        self.takeoffs = self.takeoffs.saturating_add(1);
                        self.set_status(FlightStatus::Started);
                    }
                }

                self.check_landing(detector, sample, now);
            }
            Phase::Idle => {
                self.rest_since = None;

                let idle_since = *self.idle_since.get_or_insert_with(|| {
                    debug!("{}: Idle timer started", ID);
                    now
                });

                if self.status.is_flying()
                    && now.saturating_duration_since(idle_since) >= self.idle_timeout
                {
                    info!("{}: Idle for {} s", ID, self.config.idle_timeout_s);
                    self.set_status(FlightStatus::Stopped);
                }
            }
            _ => {
                self.idle_since = None;
                self.rest_since = None;
            }
        }

        self.status
    }

    /// A detector reset while flying stops the status immediately and
    /// restarts the idle timer.
    pub fn handle_reset(&mut self, now: Instant) {
        self.rest_since = None;
        if self.status.is_flying() {
            self.set_status(FlightStatus::Stopped);
            self.idle_since = Some(now);
        }
    }

    fn check_landing(&mut self, detector: &mut MotionPhaseDetector, sample: &Sample, now: Instant) {
        if !self.is_at_rest(sample) {
            if self.rest_since.take().is_some() {
                debug!("{}: Landing window interrupted", ID);
            }
            return;
        }

        let rest_since = *self.rest_since.get_or_insert_with(|| {
            debug!("{}: Landing window started", ID);
            now
        });

        if now.saturating_duration_since(rest_since) >= self.landing_duration {
            detector.confirm_landing(now);
            self.rest_since = None;
            self.idle_since = Some(now);
            self.landings = self.landings.saturating_add(1);
            self.set_status(FlightStatus::Stopped);
        }
    }

    /// Strict near-rest, tighter than anything the motors would allow
    fn is_at_rest(&self, sample: &Sample) -> bool {
        if sample.is_calibration_artifact(self.config.artifact_floor) {
            return true;
        }

        sample.max_acc() <= self.config.landing_acc && sample.max_gyr() <= self.config.landing_gyr
    }

    fn set_status(&mut self, status: FlightStatus) {
        if self.status != status {
            info!("{}: Flight status {} -> {}", ID, self.status, status);
            self.status = status;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::script::{at, hold, lift, ripple, takeoff};
    use crate::types::config::DetectorConfig;
    use crate::types::status::ResetReason;

    struct Harness {
        detector: MotionPhaseDetector,
        tracker: FlightStatusTracker,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                detector: MotionPhaseDetector::new(DetectorConfig::default()),
                tracker: FlightStatusTracker::new(TrackerConfig::default()),
            }
        }

        fn step(&mut self, sample: &Sample, now: Instant) -> FlightStatus {
            let update = self.detector.advance(sample, now);
            self.tracker.update(&mut self.detector, &update, sample, now)
        }

        fn run(&mut self, script: &[(Instant, Sample)]) -> Vec<FlightStatus> {
            script
                .iter()
                .map(|(now, sample)| self.step(sample, *now))
                .collect()
        }

        fn airborne() -> Self {
            let mut harness = Self::new();
            harness.run(&takeoff());
            assert_eq!(harness.tracker.status(), FlightStatus::Started);
            harness
        }
    }

    fn status_changes(statuses: &[FlightStatus]) -> usize {
        statuses.windows(2).filter(|w| w[0] != w[1]).count()
    }

    #[test]
    fn clean_takeoff_starts_exactly_once() {
        let mut harness = Harness::new();

        let mut script = takeoff();
        script.extend(hold(4900, 9000, ripple()));
        let statuses = harness.run(&script);

        assert_eq!(status_changes(&statuses), 1);
        assert_eq!(statuses.last(), Some(&FlightStatus::Started));
        assert_eq!(harness.tracker.takeoffs(), 1);

        // Started with the sample that entered Steady, not before
        let first_started = script
            .iter()
            .zip(&statuses)
            .find(|(_, status)| status.is_flying())
            .map(|((now, _), _)| *now);
        assert_eq!(first_started, Some(at(4800)));
    }

    #[test]
    fn manual_pickup_never_starts() {
        let mut harness = Harness::new();

        let mut script: Vec<_> = takeoff().into_iter().filter(|(t, _)| *t <= at(2500)).collect();
        script.push((at(2600), Sample::new([1.0, 0.0, 0.0], [0.0; 3])));
        script.extend(hold(2700, 15_000, Sample::at_rest()));

        let statuses = harness.run(&script);
        assert!(statuses.iter().all(|s| *s == FlightStatus::Stopped));
        assert_eq!(harness.detector.last_reset(), Some(ResetReason::HorizontalMovement));
    }

    #[test]
    fn landing_confirmed_after_unbroken_rest() {
        let mut harness = Harness::airborne();

        // Strict rest latched at 5.0 s
        let statuses = harness.run(&hold(5000, 15_000, Sample::at_rest()));
        assert!(statuses.iter().all(|s| s.is_flying()));
        assert_eq!(harness.tracker.rest_since(), Some(at(5000)));

        // Exactly 10 s later
        assert_eq!(harness.step(&Sample::at_rest(), at(15_000)), FlightStatus::Stopped);
        assert_eq!(harness.detector.phase(), Phase::Idle);
        assert_eq!(harness.detector.resets(), 0);
        assert_eq!(harness.tracker.landings(), 1);
    }

    #[test]
    fn interrupted_landing_restarts_window() {
        let mut harness = Harness::airborne();

        harness.run(&hold(5000, 14_900, Sample::at_rest()));

        // A gust 9.9 s into the window
        assert!(harness.step(&ripple(), at(14_900)).is_flying());
        assert_eq!(harness.tracker.rest_since(), None);

        let statuses = harness.run(&hold(15_000, 25_000, Sample::at_rest()));
        assert!(statuses.iter().all(|s| s.is_flying()));
        assert_eq!(harness.step(&Sample::at_rest(), at(25_000)), FlightStatus::Stopped);
    }

    #[test]
    fn artifacts_count_as_rest() {
        let mut harness = Harness::airborne();

        let artifact = Sample::new([0.0, 0.0, -1.0], [0.0; 3]);
        harness.run(&hold(5000, 10_000, Sample::at_rest()));
        harness.run(&hold(10_000, 15_000, artifact));

        assert_eq!(harness.step(&artifact, at(15_000)), FlightStatus::Stopped);
    }

    #[test]
    fn loose_rest_is_not_a_landing() {
        let mut harness = Harness::airborne();

        // Hovering with motor ripple never lands
        let statuses = harness.run(&hold(5000, 30_000, lift(0.0)));
        assert!(statuses.iter().all(|s| s.is_flying()));
    }

    #[test]
    fn reset_while_started_stops_immediately() {
        let mut harness = Harness::airborne();

        let crash = Sample::new([2.5, 0.0, 0.0], [0.0; 3]);
        assert_eq!(harness.step(&crash, at(5000)), FlightStatus::Stopped);
        assert_eq!(harness.detector.phase(), Phase::Idle);

        // Idle timer runs from the reset instant and stays stopped
        let statuses = harness.run(&hold(5100, 20_000, Sample::at_rest()));
        assert!(statuses.iter().all(|s| *s == FlightStatus::Stopped));
    }

    #[test]
    fn idle_timeout_stops_a_flying_status() {
        let mut harness = Harness::airborne();

        // Only an external reset brings the detector to Idle while the
        // status is still flying, the tracker is not told about it.
        harness.detector.reset(at(5000));
        assert!(harness.tracker.status().is_flying());

        let statuses = harness.run(&hold(5100, 15_100, Sample::at_rest()));
        assert!(statuses.iter().all(|s| s.is_flying()));

        // 10 s after the first idle cycle at 5.1 s
        assert_eq!(harness.step(&Sample::at_rest(), at(15_100)), FlightStatus::Stopped);
        assert_eq!(harness.step(&Sample::at_rest(), at(15_200)), FlightStatus::Stopped);
    }

    #[test]
    fn idle_timeout_with_sensor_noise() {
        let mut harness = Harness::airborne();
        harness.detector.reset(at(5000));

        // Jitter well below the motor bands keeps the detector in Idle
        let noise = [
            Sample::new([0.0, 0.0, 0.015], [0.0, 1.5, 0.0]),
            Sample::new([0.0, 0.0, -0.012], [0.0, 0.0, -1.5]),
        ];
        let script: Vec<_> = (0..=100u64)
            .map(|i| (at(5100 + i * 100), noise[i as usize % 2]))
            .collect();

        let statuses = harness.run(&script);

        assert_eq!(harness.detector.phase(), Phase::Idle);
        assert_eq!(harness.detector.transitions(), 6);
        assert!(statuses[..100].iter().all(|s| s.is_flying()));
        assert_eq!(statuses[100], FlightStatus::Stopped);
        assert_eq!(harness.tracker.landings(), 0);
    }

    #[test]
    fn takeoff_again_after_landing() {
        let mut harness = Harness::airborne();
        harness.run(&hold(5000, 15_100, Sample::at_rest()));
        assert_eq!(harness.tracker.status(), FlightStatus::Stopped);

        // Same takeoff shifted by 20 s, well past the idle dwell guard
        let script: Vec<_> = takeoff()
            .into_iter()
            .skip(2)
            .map(|(t, s)| (t + Duration::from_secs(20), s))
            .collect();
        harness.run(&script);

        assert_eq!(harness.tracker.status(), FlightStatus::Started);
        assert_eq!(harness.tracker.takeoffs(), 2);
        assert_eq!(harness.tracker.landings(), 1);
    }
}
