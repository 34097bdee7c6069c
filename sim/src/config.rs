use std::io::Read;

use common::calibration::SurveyCalib;
use common::types::config::{MonitorConfig, ReportConfig};
use serde::{Deserialize, Serialize};

use crate::{
    distortion::Distortion,
    scenario::{Scenario, ScenarioKind, Segment},
    Configuration,
};

type E = Box<dyn std::error::Error>;

pub fn load_from_file_path(path: &str) -> Result<Configuration, E> {
    let mut file = std::fs::File::open(path)?;
    let mut string = String::with_capacity(1024);
    file.read_to_string(&mut string)?;
    load_from_str(&string)
}

pub fn load_from_str(string: &str) -> Result<Configuration, E> {
    let config: ToplevelConfig = toml::from_str(string)?;
    config.try_into()
}

#[derive(Default, Debug, Clone, Serialize, Deserialize)]
pub struct ToplevelConfig {
    #[serde(default)]
    simulation: SimConfig,
    #[serde(default)]
    monitor: MonitorConfig,
    #[serde(default)]
    report: ReportConfig,
    #[serde(default)]
    survey: SurveyCalib,
    #[serde(default)]
    acc_dist: DistortConfig,
    #[serde(default)]
    gyr_dist: DistortConfig,
}

impl TryFrom<ToplevelConfig> for Configuration {
    type Error = E;

    fn try_from(config: ToplevelConfig) -> Result<Self, Self::Error> {
        let sim = config.simulation;

        if !(sim.rate_hz > 0.0 && sim.rate_hz <= 10_000.0) {
            Err(format!("simulation rate must be within (0, 10000] Hz, got {}", sim.rate_hz))?
        }

        let scenario = match sim.segments {
            Some(segments) if !segments.is_empty() => Scenario::custom("custom", segments),
            Some(_) => Err("custom scenario has no segments")?,
            None => Scenario::preset(sim.scenario),
        };

        config.monitor.validate()?;
        config.report.validate()?;
        config.survey.validate()?;

        Ok(Configuration {
            rate_hz: sim.rate_hz,
            scenario,
            magnetic_field: sim.magnetic_field,
            accelerometer: Distortion::new_from_cfg(config.acc_dist)?,
            gyroscope: Distortion::new_from_cfg(config.gyr_dist)?,
            monitor: config.monitor,
            report: config.report,
            survey: config.survey,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Rate at which the simulated sensor produces readings
    pub rate_hz: f32,
    /// Preset motion script, ignored if `segments` are given
    pub scenario: ScenarioKind,
    /// Custom motion script
    pub segments: Option<Vec<Segment>>,
    /// Constant magnetic field reported by the magnetometer, in uT
    pub magnetic_field: [f32; 3],
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            rate_hz: 20.0,
            scenario: ScenarioKind::TakeoffAndLanding,
            segments: None,
            magnetic_field: [22.0, -3.0, 41.0],
        }
    }
}

#[derive(Default, Debug, Clone, Serialize, Deserialize)]
pub struct DistortConfig {
    pub noise: Option<[f32; 3]>,
    pub bias: Option<[f32; 3]>,
    pub warp: Option<[[f32; 3]; 3]>,
    pub max_range: Option<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = load_from_str("").unwrap();
        assert_eq!(config.scenario, Scenario::preset(ScenarioKind::TakeoffAndLanding));
        assert_eq!(config.monitor, MonitorConfig::default());
        assert_eq!(config.rate_hz, 20.0);
    }

    #[test]
    fn partial_overrides() {
        let config = load_from_str(
            r#"
            [simulation]
            rate_hz = 50.0
            scenario = "manual_pickup"

            [monitor]
            poll_interval_ms = 20

            [monitor.detector]
            trend_margin_wide = 0.15

            [report]
            interval_s = 2.0

            [acc_dist]
            noise = [0.002, 0.002, 0.002]
            "#,
        )
        .unwrap();

        assert_eq!(config.scenario.name, "manual_pickup");
        assert_eq!(config.rate_hz, 50.0);
        assert_eq!(config.monitor.poll_interval_ms, 20);
        assert_eq!(config.monitor.detector.trend_margin_wide, 0.15);
        assert_eq!(config.monitor.detector.trend_margin, 0.05);
        assert_eq!(config.report.interval_s, 2.0);
    }

    #[test]
    fn custom_segments() {
        let config = load_from_str(
            r#"
            [[simulation.segments]]
            label = "rest"
            duration_s = 2.0

            [[simulation.segments]]
            duration_s = 1.0
            acc = [0.05, 0.0, 0.0]
            "#,
        )
        .unwrap();

        assert_eq!(config.scenario.name, "custom");
        assert_eq!(config.scenario.segments.len(), 2);
        assert_eq!(config.scenario.segments[1].acc, [0.05, 0.0, 0.0]);
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(load_from_str("[simulation]\nrate_hz = 0.0").is_err());
        assert!(load_from_str("[simulation]\nscenario = \"loop\"").is_err());
        assert!(load_from_str("[monitor.detector]\nidle_min_dwell_s = -1.0").is_err());
        assert!(load_from_str("[simulation]\nsegments = []").is_err());
        assert!(load_from_str("[survey]\npoll_interval_ms = 0").is_err());
        assert!(load_from_str("[survey]\nalpha = 0.0").is_err());
    }
}
