//! Takeoff and landing recognition from a single body-mounted IMU.
//!
//! The [`MotionPhaseDetector`] follows the vertical acceleration signature of
//! a multirotor spooling up and lifting off, and the [`FlightStatusTracker`]
//! turns its phase history into a stable started/stopped status. Both are
//! plain state machines without I/O, driven once per polling cycle by the
//! [`FlightMonitor`].

pub mod adapter;
pub mod detector;
pub mod monitor;
pub mod tracker;
pub mod window;

pub use adapter::SampleAdapter;
pub use detector::{MotionPhaseDetector, PhaseUpdate};
pub use monitor::{FlightMonitor, MonitorStep, MonitorSummary};
pub use tracker::FlightStatusTracker;
