use common::calibration::{survey::survey_sensor, SurveyCalib};
use common::clock::ManualClock;
use common::consts::GRAVITY_G;
use common::detection::MonitorSummary;
use common::tasks::flight_monitor;
use common::types::config::MonitorConfig;
use common::types::status::{FlightStatus, Phase};
use flightstat_sim::config::DistortConfig;
use flightstat_sim::distortion::Distortion;
use flightstat_sim::scenario::{Scenario, ScenarioKind};
use flightstat_sim::{ScriptedImu, Simulation};

async fn replay(kind: ScenarioKind) -> MonitorSummary {
    let _ = env_logger::builder().is_test(true).try_init();

    let clock = ManualClock::default();
    let imu = ScriptedImu::new(Simulation::new(Scenario::preset(kind)), &clock);

    flight_monitor::main(imu, &clock, MonitorConfig::default())
        .await
        .unwrap()
}

#[futures_test::test]
async fn takeoff_and_landing() {
    let summary = replay(ScenarioKind::TakeoffAndLanding).await;

    assert_eq!(summary.takeoffs, 1);
    assert_eq!(summary.landings, 1);
    assert_eq!(summary.phase, Phase::Idle);
    assert_eq!(summary.status, FlightStatus::Stopped);
    assert_eq!(summary.read_errors, 0);
}

#[futures_test::test]
async fn manual_pickup_never_takes_off() {
    let summary = replay(ScenarioKind::ManualPickup).await;

    assert_eq!(summary.takeoffs, 0);
    assert_eq!(summary.resets, 1);
    assert_eq!(summary.phase, Phase::Idle);
    assert_eq!(summary.status, FlightStatus::Stopped);
}

#[futures_test::test]
async fn aborted_spinup_resets_once() {
    let summary = replay(ScenarioKind::AbortedSpinup).await;

    assert_eq!(summary.takeoffs, 0);
    assert_eq!(summary.resets, 1);
    assert_eq!(summary.status, FlightStatus::Stopped);
}

#[futures_test::test]
async fn bench_idle_stays_idle() {
    let summary = replay(ScenarioKind::BenchIdle).await;

    assert_eq!(summary.transitions, 0);
    assert_eq!(summary.resets, 0);
    assert_eq!(summary.phase, Phase::Idle);
    assert_eq!(summary.status, FlightStatus::Stopped);
}

#[futures_test::test]
async fn survey_of_a_noisy_bench() {
    let clock = ManualClock::default();
    let noise = Distortion::new_from_cfg(DistortConfig {
        noise: Some([0.002; 3]),
        ..Default::default()
    })
    .unwrap();

    let sim = Simulation::new(Scenario::preset(ScenarioKind::BenchIdle)).acc_distortion(noise);
    let config = SurveyCalib {
        duration_s: 2.0,
        poll_interval_ms: 50,
        ..Default::default()
    };

    let report = survey_sensor(ScriptedImu::new(sim, &clock), &clock, GRAVITY_G, config)
        .await
        .unwrap();

    assert_eq!(report.samples, 40);
    assert!(report.acc_peak.iter().all(|&peak| peak > 0.0 && peak < 0.02));
    assert_eq!(report.gyr_peak, [0.0; 3]);
}
