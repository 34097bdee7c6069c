use num_traits::real::Real;

/// Running mean and variance with exponential forgetting.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Statistics<T> {
    initialized: bool,
    alpha: T,
    mean: T,
    variance: T,
}

impl<T> Statistics<T>
where
    T: Real,
{
    /// Creates a new IIR statistics filter.
    /// `alpha` is the smoothing factor, typically a small value (e.g., 0.01),
    /// and is clamped into `(0, 1]`. A smaller alpha means a "slower" filter
    /// that remembers more history.
    pub fn new(alpha: T) -> Self {
        let alpha = if alpha > T::zero() {
            alpha.min(T::one())
        } else {
            T::epsilon()
        };

        Self {
            alpha,
            mean: T::zero(),
            variance: T::zero(),
            initialized: false,
        }
    }

    /// Adds a single sample to the IIR filter
    pub fn add_sample(&mut self, sample: T) {
        if !self.initialized {
            // First sample: Initialize mean to this sample, variance is 0
            self.mean = sample;
            self.variance = T::zero();
            self.initialized = true;
        } else {
            let delta = sample - self.mean;

            // M_n = M_{n-1} + alpha * delta
            self.mean = self.mean + delta * self.alpha;

            // V_n = (1 - alpha) * (V_{n-1} + alpha * delta^2)
            self.variance = (self.variance + delta * delta * self.alpha) * (T::one() - self.alpha);
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Returns the current IIR mean and variance
    pub fn mean_var(&self) -> (T, T) {
        (self.mean, self.variance)
    }

    pub fn mean(&self) -> T {
        self.mean
    }

    /// Returns the current IIR standard deviation
    pub fn std_dev(&self) -> T {
        self.variance.sqrt()
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn constant_input_has_no_spread() {
        let mut stats = Statistics::new(0.1f32);
        for _ in 0..100 {
            stats.add_sample(2.5);
        }
        assert_relative_eq!(stats.mean(), 2.5);
        assert_relative_eq!(stats.std_dev(), 0.0);
    }

    #[test]
    fn alternating_input_converges() {
        let mut stats = Statistics::new(0.05f64);
        for i in 0..2000 {
            stats.add_sample(if i % 2 == 0 { 1.0 } else { -1.0 });
        }
        let (mean, var) = stats.mean_var();
        assert!(mean.abs() < 0.1);
        assert_relative_eq!(var, 1.0, epsilon = 0.1);
    }

    #[test]
    fn alpha_is_clamped() {
        let mut stats = Statistics::new(2.0f32);
        stats.add_sample(1.0);
        stats.add_sample(3.0);
        // With alpha = 1 the mean follows the input
        assert_relative_eq!(stats.mean(), 3.0);
    }
}
