use crate::sync::watch::Watch;
use crate::types::status::{FlightStatus, Phase};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex as M;

/// Latest phase of the motion phase detector.
pub static FLIGHT_PHASE: Watch<Phase, M> = Watch::new();

/// Latest flight status, the value relayed by the beacon.
pub static FLIGHT_STATUS: Watch<FlightStatus, M> = Watch::new();

