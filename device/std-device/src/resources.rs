use common::errors::ReportError;
use common::hw_abstraction::StatusSink;

pub fn setup_logging(verbosity: u8) {
    let level = match verbosity {
        0 => log::LevelFilter::Info,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    // RUST_LOG overrides the level given on the command line
    env_logger::builder()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp_nanos()
        .init();
}

/// Stands in for the radio beacon by logging the advertised message.
#[derive(Debug, Default)]
pub struct ConsoleBeacon {
    message: Option<String>,
    updates: u32,
}

impl ConsoleBeacon {
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn updates(&self) -> u32 {
        self.updates
    }
}

impl StatusSink for ConsoleBeacon {
    async fn update_message(&mut self, message: &str) -> Result<(), ReportError> {
        if self.message.as_deref() == Some(message) {
            log::trace!("beacon: Refreshing '{}'", message);
        } else {
            log::info!("beacon: Advertising '{}'", message);
            self.message = Some(message.to_string());
        }

        self.updates += 1;
        Ok(())
    }
}
