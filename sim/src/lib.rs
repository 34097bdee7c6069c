use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

pub mod config;
pub mod distortion;
pub mod scenario;
pub mod ticker;

use common::calibration::SurveyCalib;
use common::clock::Clock;
use common::consts::GRAVITY_G;
use common::embassy_time::Instant;
use common::errors::DeviceError;
use common::hw_abstraction::ImuSource;
use common::types::config::{MonitorConfig, ReportConfig};
use common::types::measurements::Imu9DofData;
use distortion::Distortion;
use scenario::Scenario;
use ticker::Ticker;

type E = Box<dyn std::error::Error>;

#[derive(Debug, Clone)]
pub struct Configuration {
    pub rate_hz: f32,
    pub scenario: Scenario,
    pub magnetic_field: [f32; 3],
    pub accelerometer: Distortion,
    pub gyroscope: Distortion,
    pub monitor: MonitorConfig,
    pub report: ReportConfig,
    pub survey: SurveyCalib,
}

/// Produces sensor readings from a motion script.
#[derive(Debug, Clone)]
pub struct Simulation {
    scenario: Scenario,
    acc_dist: Distortion,
    gyr_dist: Distortion,
    magnetic_field: [f32; 3],
}

impl Simulation {
    pub fn new(scenario: Scenario) -> Self {
        Self {
            scenario,
            acc_dist: Distortion::default(),
            gyr_dist: Distortion::default(),
            magnetic_field: [0.0; 3],
        }
    }

    pub fn from_config(config: &Configuration) -> Self {
        Self::new(config.scenario.clone())
            .acc_distortion(config.accelerometer.clone())
            .gyr_distortion(config.gyroscope.clone())
            .magnetic_field(config.magnetic_field)
    }

    pub fn acc_distortion(mut self, acc: Distortion) -> Self {
        self.acc_dist = acc;
        self
    }

    pub fn gyr_distortion(mut self, gyr: Distortion) -> Self {
        self.gyr_dist = gyr;
        self
    }

    pub fn magnetic_field(mut self, mag: [f32; 3]) -> Self {
        self.magnetic_field = mag;
        self
    }

    pub fn scenario(&self) -> &Scenario {
        &self.scenario
    }

    /// Raw reading at `elapsed` into the scenario, with gravity on the
    /// vertical axis. `None` once the scenario is over.
    pub fn reading_at(&self, elapsed: Duration) -> Option<Imu9DofData<f32>> {
        let segment = self.scenario.segment_at(elapsed)?;
        let [ax, ay, az] = segment.acc;

        Some(Imu9DofData {
            acc: self.acc_dist.apply([ax, ay, az + GRAVITY_G]).into(),
            gyr: self.gyr_dist.apply(segment.gyr).into(),
            mag: self.magnetic_field,
        })
    }
}

#[derive(Debug, Default)]
struct FeedState {
    latest: Option<Imu9DofData<f32>>,
    finished: bool,
}

/// Samples a [`Simulation`] in real time on a background thread. Readers get
/// a copy of the latest snapshot.
pub struct SensorFeed {
    state: Arc<Mutex<FeedState>>,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl SensorFeed {
    pub fn spawn(sim: Simulation, rate_hz: f32) -> Result<Self, E> {
        if !(rate_hz > 0.0) {
            Err(format!("sampling rate must be positive, got {rate_hz}"))?
        }

        let state = Arc::new(Mutex::new(FeedState::default()));
        let stop = Arc::new(AtomicBool::new(false));

        let handle = std::thread::Builder::new()
            .name("sensor-feed".into())
            .spawn({
                let state = state.clone();
                let stop = stop.clone();
                move || sample_loop(sim, rate_hz, &state, &stop)
            })?;

        Ok(Self {
            state,
            stop,
            handle: Some(handle),
        })
    }

    fn snapshot(&self) -> Result<Imu9DofData<f32>, DeviceError> {
        let state = self.state.lock().map_err(|_| DeviceError::Poisoned)?;
        match (state.finished, state.latest) {
            (true, _) => Err(DeviceError::EndOfStream),
            (false, Some(reading)) => Ok(reading),
            (false, None) => Err(DeviceError::NotReady),
        }
    }
}

fn sample_loop(sim: Simulation, rate_hz: f32, state: &Mutex<FeedState>, stop: &AtomicBool) {
    log::info!(
        "sensor_feed: Sampling '{}' at {} Hz for {:?}",
        sim.scenario().name,
        rate_hz,
        sim.scenario().duration()
    );

    let mut ticker = Ticker::every(Duration::from_secs_f32(1.0 / rate_hz));
    let mut label = None;

    while !stop.load(Ordering::Relaxed) {
        let elapsed = ticker.elapsed();
        let segment = sim.scenario().segment_at(elapsed).map(|s| s.label.clone());
        if segment.is_some() && segment != label {
            log::debug!(
                "sensor_feed: Segment '{}' at {:?}",
                segment.as_deref().unwrap_or_default(),
                elapsed
            );
            label = segment;
        }

        let reading = sim.reading_at(elapsed);
        let Ok(mut state) = state.lock() else {
            log::error!("sensor_feed: State lock poisoned, stopping");
            return;
        };

        match reading {
            Some(reading) => state.latest = Some(reading),
            None => {
                state.finished = true;
                log::info!("sensor_feed: Scenario finished");
                return;
            }
        }

        drop(state);
        ticker.next();
    }
}

impl Drop for SensorFeed {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            _ = handle.join();
        }
    }
}

impl ImuSource for SensorFeed {
    async fn get_accel(&mut self) -> Result<[f32; 3], DeviceError> {
        self.snapshot().map(|reading| reading.acc)
    }

    async fn get_gyro(&mut self) -> Result<[f32; 3], DeviceError> {
        self.snapshot().map(|reading| reading.gyr)
    }

    async fn get_mag(&mut self) -> Result<[f32; 3], DeviceError> {
        self.snapshot().map(|reading| reading.mag)
    }

    // All three from the same snapshot
    async fn read_acc_gyr_mag(&mut self) -> Result<Imu9DofData<f32>, DeviceError> {
        self.snapshot()
    }
}

/// Reads a [`Simulation`] at whatever time the clock says, without a
/// sampling thread. Paired with a `ManualClock` this replays a scenario as
/// fast as the monitor can poll.
pub struct ScriptedImu<C: Clock> {
    sim: Simulation,
    clock: C,
    start: Instant,
}

impl<C: Clock> ScriptedImu<C> {
    pub fn new(sim: Simulation, clock: C) -> Self {
        let start = clock.now();
        Self { sim, clock, start }
    }

    fn reading(&self) -> Result<Imu9DofData<f32>, DeviceError> {
        let elapsed = self.clock.now().saturating_duration_since(self.start);
        self.sim
            .reading_at(Duration::from_micros(elapsed.as_micros()))
            .ok_or(DeviceError::EndOfStream)
    }
}

impl<C: Clock> ImuSource for ScriptedImu<C> {
    async fn get_accel(&mut self) -> Result<[f32; 3], DeviceError> {
        self.reading().map(|reading| reading.acc)
    }

    async fn get_gyro(&mut self) -> Result<[f32; 3], DeviceError> {
        self.reading().map(|reading| reading.gyr)
    }

    async fn get_mag(&mut self) -> Result<[f32; 3], DeviceError> {
        self.reading().map(|reading| reading.mag)
    }

    async fn read_acc_gyr_mag(&mut self) -> Result<Imu9DofData<f32>, DeviceError> {
        self.reading()
    }
}
