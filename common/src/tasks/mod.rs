pub mod flight_monitor;
pub mod status_reporter;
