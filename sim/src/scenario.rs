use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// A stretch of constant motion. Acceleration is gravity-compensated, the
/// simulator adds gravity back on the vertical axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    #[serde(default)]
    pub label: String,
    pub duration_s: f32,
    #[serde(default)]
    pub acc: [f32; 3],
    #[serde(default)]
    pub gyr: [f32; 3],
}

impl Segment {
    fn new(label: &str, duration_s: f32, acc: [f32; 3], gyr: [f32; 3]) -> Self {
        Self {
            label: label.to_string(),
            duration_s,
            acc,
            gyr,
        }
    }

    fn rest(label: &str, duration_s: f32) -> Self {
        Self::new(label, duration_s, [0.0; 3], [0.0; 3])
    }

    fn duration(&self) -> Duration {
        Duration::from_micros((self.duration_s.max(0.0) * 1_000_000.0) as u64)
    }
}

/// Motor ripple of a small quadcopter on the ground or in hover
const RIPPLE_ACC: [f32; 3] = [0.04, 0.0, 0.0];
const RIPPLE_GYR: [f32; 3] = [0.0, 0.0, 8.0];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioKind {
    /// Sensor settles, motors spin up, lift-off, hover, landing
    TakeoffAndLanding,
    /// Motors spin up, then the vehicle is picked up by hand
    ManualPickup,
    /// Motors spin up and stop again without lifting off
    AbortedSpinup,
    /// Nothing happens
    BenchIdle,
}

impl ScenarioKind {
    pub const ALL: [ScenarioKind; 4] = [
        ScenarioKind::TakeoffAndLanding,
        ScenarioKind::ManualPickup,
        ScenarioKind::AbortedSpinup,
        ScenarioKind::BenchIdle,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            ScenarioKind::TakeoffAndLanding => "takeoff_and_landing",
            ScenarioKind::ManualPickup => "manual_pickup",
            ScenarioKind::AbortedSpinup => "aborted_spinup",
            ScenarioKind::BenchIdle => "bench_idle",
        }
    }
}

impl fmt::Display for ScenarioKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScenarioKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| {
                let known: Vec<_> = Self::ALL.iter().map(|k| k.as_str()).collect();
                format!("unknown scenario '{s}', expected one of: {}", known.join(", "))
            })
    }
}

/// A piecewise-constant motion script.
#[derive(Debug, Clone, PartialEq)]
pub struct Scenario {
    pub name: String,
    pub segments: Vec<Segment>,
}

impl Scenario {
    pub fn custom(name: impl Into<String>, segments: Vec<Segment>) -> Self {
        Self {
            name: name.into(),
            segments,
        }
    }

    pub fn preset(kind: ScenarioKind) -> Self {
        let segments = match kind {
            ScenarioKind::TakeoffAndLanding => vec![
                // Raw zero readings while the sensor calibrates itself
                Segment::new("sensor settling", 0.5, [0.0, 0.0, -1.0], [0.0; 3]),
                Segment::rest("on the ground", 2.5),
                Segment::new("spin-up", 3.0, RIPPLE_ACC, RIPPLE_GYR),
                Segment::new("lift-off", 1.0, [0.04, 0.0, 0.3], RIPPLE_GYR),
                Segment::new("overshoot", 1.0, [0.04, 0.0, 0.1], RIPPLE_GYR),
                Segment::new("sink", 1.0, [0.04, 0.0, -0.2], RIPPLE_GYR),
                Segment::new("recover", 1.0, RIPPLE_ACC, RIPPLE_GYR),
                Segment::new("hover", 10.0, RIPPLE_ACC, RIPPLE_GYR),
                Segment::rest("landed", 12.0),
            ],
            ScenarioKind::ManualPickup => vec![
                Segment::rest("on the ground", 3.0),
                Segment::new("spin-up", 2.0, RIPPLE_ACC, RIPPLE_GYR),
                Segment::new("carried", 1.0, [1.0, 0.3, 0.2], [20.0, -30.0, 25.0]),
                Segment::rest("put down", 6.0),
            ],
            ScenarioKind::AbortedSpinup => vec![
                Segment::rest("on the ground", 3.0),
                Segment::new("spin-up", 2.0, RIPPLE_ACC, RIPPLE_GYR),
                Segment::rest("motors off", 7.0),
            ],
            ScenarioKind::BenchIdle => vec![Segment::rest("on the bench", 15.0)],
        };

        Self::custom(kind.as_str(), segments)
    }

    pub fn duration(&self) -> Duration {
        self.segments.iter().map(Segment::duration).sum()
    }

    /// The segment active at `elapsed`, `None` once the scenario is over
    pub fn segment_at(&self, elapsed: Duration) -> Option<&Segment> {
        let mut end = Duration::ZERO;
        self.segments.iter().find(|segment| {
            end += segment.duration();
            elapsed < end
        })
    }
}
