use embassy_time::Duration;

use crate::{
    clock::Clock,
    detection::{FlightMonitor, MonitorStep, MonitorSummary},
    errors::{Debounce, DeviceError, FlightStatError},
    hw_abstraction::ImuSource,
    signals as s,
    types::config::MonitorConfig,
};

/// Poll the sensor source, run every reading through the flight monitor and
/// publish phase and status. Returns the summary once the source reports the
/// end of its stream.
pub async fn main(
    mut source: impl ImuSource,
    clock: impl Clock,
    config: MonitorConfig,
) -> Result<MonitorSummary, FlightStatError> {
    const ID: &str = "flight_monitor";

    let mut monitor = FlightMonitor::new(config)?;
    info!("{}: Task started, polling every {} ms", ID, config.poll_interval_ms);

    // Task outputs
    let mut snd_phase = s::FLIGHT_PHASE.sender();
    let mut snd_status = s::FLIGHT_STATUS.sender();
    snd_phase.send(monitor.current_phase());
    snd_status.send(monitor.current_status());

    let mut error_log = Debounce::new(Duration::from_secs(1));
    let mut consecutive_errors = 0;

    let period = config.poll_interval();
    let mut next = clock.now();

    info!("{}: Entering main loop", ID);
    loop {
        next += period;

        match source.read_acc_gyr_mag().await {
            Ok(raw) => {
                consecutive_errors = 0;
                let step = monitor.step(&raw, clock.now());

                snd_phase.send_if_changed(step.update.phase);
                snd_status.send_if_changed(step.status);

                log_telemetry(ID, &monitor, &step);
            }
            Err(DeviceError::EndOfStream) => {
                info!("{}: Sensor stream ended", ID);
                break;
            }
            Err(DeviceError::NotReady) => {
                debug!("{}: Waiting for first sensor reading", ID);
            }
            Err(error) => {
                consecutive_errors += 1;
                monitor.record_read_error();

                if let Some(error) = error_log.evaluate(error, clock.now()) {
                    warn!("{}: Failed to read sensor: {}", ID, error);
                }

                if consecutive_errors > config.max_read_errors {
                    error!(
                        "{}: Giving up after {} consecutive read errors",
                        ID, consecutive_errors
                    );
                    Err(error)?
                }
            }
        }

        clock.wait_until(next).await;
    }

    let summary = monitor.summary();
    info!("{}: {}", ID, summary);
    Ok(summary)
}

fn log_telemetry(id: &str, monitor: &FlightMonitor, step: &MonitorStep) {
    let every = monitor.config().log_every;
    let samples = monitor.detector().samples();
    if every == 0 || samples % every != 0 {
        return;
    }

    let [ax, ay, az] = step.sample.acc;
    let [gx, gy, gz] = step.sample.gyr;
    trace!(
        "{}: #{} acc [{}, {}, {}] gyr [{}, {}, {}] phase {} status {}",
        id,
        samples,
        ax,
        ay,
        az,
        gx,
        gy,
        gz,
        step.update.phase,
        step.status
    );
}
