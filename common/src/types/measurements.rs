use num_traits::Num;
use serde::{Deserialize, Serialize};

#[allow(unused_imports)]
use num_traits::Float as _;

/// One raw snapshot from a 9-DOF sensor, as handed out by the sensor source.
///
/// Acceleration still contains gravity, in `g`. Angular rate is in `deg/s`
/// and the magnetic field in `uT`.
#[derive(Debug, Default, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Imu9DofData<T: Num> {
    pub acc: [T; 3],
    pub gyr: [T; 3],
    pub mag: [T; 3],
}

/// One adapted sensor reading, the input record of the motion phase detector.
///
/// The vertical acceleration `acc[2]` is gravity-compensated, so a device at
/// rest reads approximately zero on every axis.
#[derive(Debug, Default, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Sample {
    /// Acceleration `[ax, ay, az]` in `g`
    pub acc: [f32; 3],
    /// Angular rate `[gx, gy, gz]` in `deg/s`
    pub gyr: [f32; 3],
    /// Magnetic field `[mx, my, mz]` in `uT`, not used for detection
    pub mag: Option<[f32; 3]>,
}

impl Sample {
    pub const fn new(acc: [f32; 3], gyr: [f32; 3]) -> Self {
        Self {
            acc,
            gyr,
            mag: None,
        }
    }

    pub const fn at_rest() -> Self {
        Self::new([0.0; 3], [0.0; 3])
    }

    pub const fn with_mag(mut self, mag: [f32; 3]) -> Self {
        self.mag = Some(mag);
        self
    }

    /// Gravity-compensated vertical acceleration
    pub fn az(&self) -> f32 {
        self.acc[2]
    }

    /// Largest absolute acceleration over all three axes
    pub fn max_acc(&self) -> f32 {
        self.acc.iter().fold(0.0, |max, a| max.max(a.abs()))
    }

    /// Largest absolute acceleration over the horizontal axes
    pub fn max_horizontal_acc(&self) -> f32 {
        self.acc[0].abs().max(self.acc[1].abs())
    }

    /// Sum of absolute accelerations, a cheap measure of overall vibration
    pub fn acc_activity(&self) -> f32 {
        self.acc.iter().map(|a| a.abs()).sum()
    }

    /// Largest absolute angular rate over all three axes
    pub fn max_gyr(&self) -> f32 {
        self.gyr.iter().fold(0.0, |max, g| max.max(g.abs()))
    }

    /// Whether the vertical axis reads like a sensor that has not finished
    /// its own calibration, e.g. a raw zero which shows up as `-1 g` here.
    pub fn is_calibration_artifact(&self, floor: f32) -> bool {
        self.az() < floor
    }
}
