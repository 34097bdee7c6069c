use static_assertions::const_assert;

/// Gravity as seen by an accelerometer at rest, in units of [g]
pub const GRAVITY_G: f32 = 1.0;

/// Number of vertical acceleration samples used for trend detection
pub const TREND_WINDOW_LEN: usize = 3;

/// Number of calls to the detector that are ignored after start-up,
/// giving the sensor time to settle after its own calibration.
pub const WARMUP_SAMPLES: u32 = 2;

// A trend needs a first and a last value to compare
const_assert!(TREND_WINDOW_LEN >= 2);
