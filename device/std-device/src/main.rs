use std::time::Instant as StdInstant;

use clap::Parser;
use common::calibration::{survey::survey_sensor, SurveyReport};
use common::clock::{Clock, ManualClock, SystemClock};
use common::detection::MonitorSummary;
use common::embassy_futures::select::{select, Either};
use common::errors::FlightStatError;
use common::hw_abstraction::ImuSource;
use common::tasks::flight_monitor;
use common::tasks::status_reporter::{self, StatusBroadcaster};
use flightstat_sim::scenario::{Scenario, ScenarioKind};
use flightstat_sim::{Configuration, ScriptedImu, SensorFeed, Simulation};
use futures_executor::block_on;

mod resources;

use resources::ConsoleBeacon;

#[derive(clap::Parser)]
#[clap(about = "Flight status monitor running against a simulated IMU")]
struct Args {
    /// Path to the configuration file for the simulation
    #[clap(default_value = "sim_config.toml")]
    #[clap(short, long)]
    config: String,

    /// Run this preset instead of the scenario in the configuration file
    #[clap(short, long)]
    scenario: Option<ScenarioKind>,

    /// Replay on a simulated clock, as fast as possible
    #[clap(long)]
    fast: bool,

    /// Survey the sensor for the given number of seconds instead of monitoring
    #[clap(long, value_name = "SECS")]
    survey: Option<f32>,

    /// Increase log verbosity, -v for debug and -vv for trace
    #[clap(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    resources::setup_logging(args.verbose);

    // Load configuration, command line takes precedence
    let mut config = flightstat_sim::config::load_from_file_path(&args.config)?;
    if let Some(kind) = args.scenario {
        config.scenario = Scenario::preset(kind);
    }
    if let Some(secs) = args.survey {
        config.survey.duration_s = secs;
    }

    log::info!(
        "std_device: Scenario '{}' ({:?}) in {} mode",
        config.scenario.name,
        config.scenario.duration(),
        if args.fast { "fast" } else { "real-time" }
    );

    let started = StdInstant::now();
    let sim = Simulation::from_config(&config);

    if args.survey.is_some() {
        let report = if args.fast {
            let clock = ManualClock::default();
            survey(ScriptedImu::new(sim, &clock), &clock, &config)?
        } else {
            survey(SensorFeed::spawn(sim, config.rate_hz)?, SystemClock, &config)?
        };

        log::info!(
            "std_device: Surveyed {} samples in {:?}",
            report.samples,
            started.elapsed()
        );
        return Ok(());
    }

    let mut beacon = ConsoleBeacon::default();
    let mut broadcaster = StatusBroadcaster::new(config.report);

    let summary = if args.fast {
        let clock = ManualClock::default();
        let imu = ScriptedImu::new(sim, &clock);
        monitor(imu, &clock, &config, &mut beacon, &mut broadcaster)?
    } else {
        let feed = SensorFeed::spawn(sim, config.rate_hz)?;
        monitor(feed, &SystemClock, &config, &mut beacon, &mut broadcaster)?
    };

    log::info!("std_device: {}", summary);
    log::info!(
        "std_device: {} broadcasts ({} failed), beacon now '{}' after {} updates, finished in {:?}",
        broadcaster.broadcasts(),
        broadcaster.failures(),
        beacon.message().unwrap_or("-"),
        beacon.updates(),
        started.elapsed()
    );

    Ok(())
}

/// Run the flight monitor and the status reporter side by side until the
/// sensor stream ends.
fn monitor<C: Clock>(
    source: impl ImuSource,
    clock: &C,
    config: &Configuration,
    beacon: &mut ConsoleBeacon,
    broadcaster: &mut StatusBroadcaster,
) -> Result<MonitorSummary, FlightStatError> {
    let monitor = flight_monitor::main(source, clock, config.monitor);
    let reporter = status_reporter::main(beacon, clock, broadcaster);

    match block_on(select(monitor, reporter)) {
        Either::First(result) => result,
        Either::Second(()) => unreachable!("status reporter never returns"),
    }
}

fn survey(
    source: impl ImuSource,
    clock: impl Clock,
    config: &Configuration,
) -> Result<SurveyReport, FlightStatError> {
    block_on(survey_sensor(
        source,
        clock,
        config.monitor.gravity_offset,
        config.survey,
    ))
}
