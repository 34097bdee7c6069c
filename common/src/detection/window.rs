use heapless::Deque;

use crate::consts::TREND_WINDOW_LEN;

#[allow(unused_imports)]
use num_traits::Float as _;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Trend {
    Rising,
    Falling,
}

/// The most recent vertical accelerations, oldest first.
#[derive(Debug, Clone)]
pub struct TrendWindow {
    values: Deque<f32, TREND_WINDOW_LEN>,
}

impl Default for TrendWindow {
    fn default() -> Self {
        Self::new()
    }
}

impl TrendWindow {
    pub const fn new() -> Self {
        Self {
            values: Deque::new(),
        }
    }

    /// Append a value, evicting the oldest one when full.
    pub fn push(&mut self, value: f32) {
        if self.values.is_full() {
            self.values.pop_front();
        }
        // Cannot fail, a slot was freed above
        let _ = self.values.push_back(value);
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.values.is_full()
    }

    /// Spread between the largest and smallest value in the window
    pub fn amplitude(&self) -> f32 {
        let (min, max) = self
            .values
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(min, max), v| {
                (min.min(*v), max.max(*v))
            });

        if self.values.is_empty() {
            0.0
        } else {
            max - min
        }
    }

    /// Whether the window holds a trend in the given direction. The window
    /// must be full, span at least `min_amplitude`, and its last value must
    /// have moved more than `margin` away from its first.
    pub fn is_trend(&self, trend: Trend, margin: f32, min_amplitude: f32) -> bool {
        if !self.is_full() || self.amplitude() < min_amplitude {
            return false;
        }

        let (Some(first), Some(last)) = (self.values.front(), self.values.back()) else {
            return false;
        };

        match trend {
            Trend::Rising => *last > *first + margin,
            Trend::Falling => *last < *first - margin,
        }
    }
}
