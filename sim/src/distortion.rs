use nalgebra::{Matrix3, Vector3};
use rand_distr::{Distribution, Normal};

use crate::config::DistortConfig;

type E = Box<dyn std::error::Error>;

/// Imperfections applied to an ideal sensor reading.
#[derive(Debug, Clone, Default)]
pub struct Distortion {
    noise: Option<[Normal<f32>; 3]>,
    bias: Option<Vector3<f32>>,
    warp: Option<Matrix3<f32>>,
    clip: Option<f32>,
}

impl Distortion {
    pub fn new_from_cfg(cfg: DistortConfig) -> Result<Self, E> {
        let noise = if let Some(noise) = cfg.noise {
            Some([
                Normal::new(0.0, noise[0])?,
                Normal::new(0.0, noise[1])?,
                Normal::new(0.0, noise[2])?,
            ])
        } else {
            None
        };

        let bias = cfg.bias.map(Vector3::from);
        let warp = cfg.warp.map(|warp| {
            let rows = warp.map(|row| Vector3::from(row).transpose());
            Matrix3::from_rows(&rows)
        });

        let clip = match cfg.max_range {
            Some(range) if !(range > 0.0) => Err(format!("max_range must be positive, got {range}"))?,
            range => range,
        };

        Ok(Self {
            noise,
            bias,
            warp,
            clip,
        })
    }

    pub fn apply(&self, input: impl Into<Vector3<f32>>) -> Vector3<f32> {
        let mut output = input.into();

        if let Some(noise) = self.noise {
            let mut rng = rand::rng();
            output += Vector3::new(
                noise[0].sample(&mut rng),
                noise[1].sample(&mut rng),
                noise[2].sample(&mut rng),
            );
        }

        if let Some(bias) = self.bias {
            output += bias;
        }

        if let Some(warp) = self.warp {
            output = warp * output;
        }

        // Saturate like a sensor at the end of its measurement range
        if let Some(clip) = self.clip {
            output = output.map(|v| v.clamp(-clip, clip));
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn bias_warp_and_clip() {
        let distortion = Distortion::new_from_cfg(DistortConfig {
            bias: Some([0.1, 0.0, 0.0]),
            warp: Some([[2.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]]),
            max_range: Some(4.0),
            ..Default::default()
        })
        .unwrap();

        let output = distortion.apply([0.4, -1.0, 6.0]);
        assert_relative_eq!(output.x, 1.0, epsilon = 1e-6);
        assert_relative_eq!(output.y, -1.0);
        assert_relative_eq!(output.z, 4.0);
    }

    #[test]
    fn noise_is_centered() {
        let distortion = Distortion::new_from_cfg(DistortConfig {
            noise: Some([0.01; 3]),
            ..Default::default()
        })
        .unwrap();

        let mean = (0..2000)
            .map(|_| distortion.apply([0.0, 0.0, 1.0]))
            .fold(Vector3::zeros(), |acc, v| acc + v)
            / 2000.0;

        assert_relative_eq!(mean.z, 1.0, epsilon = 0.005);
        assert!(mean.x.abs() < 0.005);
    }

    #[test]
    fn rejects_invalid_settings() {
        let negative_noise = DistortConfig {
            noise: Some([0.01, -1.0, 0.01]),
            ..Default::default()
        };
        assert!(Distortion::new_from_cfg(negative_noise).is_err());

        let zero_range = DistortConfig {
            max_range: Some(0.0),
            ..Default::default()
        };
        assert!(Distortion::new_from_cfg(zero_range).is_err());
    }
}
