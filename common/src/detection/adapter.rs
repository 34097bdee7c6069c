use crate::consts::GRAVITY_G;
use crate::types::measurements::{Imu9DofData, Sample};

/// Turns raw sensor snapshots into detector samples by removing gravity
/// from the vertical axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleAdapter {
    gravity_offset: f32,
}

impl Default for SampleAdapter {
    fn default() -> Self {
        Self::new(GRAVITY_G)
    }
}

impl SampleAdapter {
    pub const fn new(gravity_offset: f32) -> Self {
        Self { gravity_offset }
    }

    pub fn adapt(&self, raw: &Imu9DofData<f32>) -> Sample {
        let [ax, ay, az] = raw.acc;
        Sample::new([ax, ay, az - self.gravity_offset], raw.gyr).with_mag(raw.mag)
    }
}
