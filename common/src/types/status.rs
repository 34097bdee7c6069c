use core::fmt;

use serde::{Deserialize, Serialize};

/// The phases of the takeoff recognizer. The double rise and fall follow the
/// vertical acceleration of a multirotor spooling up, lifting off, briefly
/// overshooting and settling into hover.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Phase {
    /// On the ground, motors off
    #[default]
    Idle,
    /// Motor ripple observed, waiting for lift-off
    MotorOn,
    /// Lift-off impulse
    FirstRise,
    /// Impulse subsiding
    FirstFall,
    /// Dipping below the hover baseline
    SecondFall,
    /// Recovering towards the hover baseline
    SecondRise,
    /// Airborne
    Steady,
}

impl Phase {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Phase::Idle => "IDLE",
            Phase::MotorOn => "MOTOR_ON",
            Phase::FirstRise => "FIRST_RISE",
            Phase::FirstFall => "FIRST_FALL",
            Phase::SecondFall => "SECOND_FALL",
            Phase::SecondRise => "SECOND_RISE",
            Phase::Steady => "STEADY",
        }
    }

    /// Phases in which a takeoff sequence is partially recognized
    pub const fn is_in_sequence(&self) -> bool {
        !matches!(self, Phase::Idle | Phase::Steady)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The externally reported flight status.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum FlightStatus {
    #[default]
    Stopped,
    Started,
}

impl FlightStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            FlightStatus::Stopped => "STOP",
            FlightStatus::Started => "START",
        }
    }

    /// The single-character message relayed by the beacon
    pub const fn beacon_message(&self) -> &'static str {
        match self {
            FlightStatus::Stopped => "0",
            FlightStatus::Started => "1",
        }
    }

    pub const fn is_flying(&self) -> bool {
        matches!(self, FlightStatus::Started)
    }
}

impl fmt::Display for FlightStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why the detector abandoned a partially recognized sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ResetReason {
    /// An acceleration axis exceeded the ceiling of the current phase
    LargeAcceleration,
    /// An angular rate axis exceeded the global gyro ceiling
    LargeAngularRate,
    /// Horizontal acceleration typical of the device being carried by hand
    HorizontalMovement,
    /// The motor vibration disappeared
    MotorsStopped,
    /// Rotation too fast for a vehicle spooling up or lifting off
    ExcessiveRotation,
    /// A transition was detected before the required dwell time
    FalsePositive,
    /// The expected next edge did not show up in time
    Timeout,
    /// Requested by the application
    Requested,
}

impl ResetReason {
    pub const fn as_str(&self) -> &'static str {
        match self {
            ResetReason::LargeAcceleration => "large acceleration",
            ResetReason::LargeAngularRate => "large angular rate",
            ResetReason::HorizontalMovement => "excessive horizontal movement, manual handling",
            ResetReason::MotorsStopped => "motors stopped",
            ResetReason::ExcessiveRotation => "excessive rotation",
            ResetReason::FalsePositive => "transition before minimum dwell, false positive",
            ResetReason::Timeout => "timeout waiting for next edge",
            ResetReason::Requested => "requested",
        }
    }
}

impl fmt::Display for ResetReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
