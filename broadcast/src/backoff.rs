//! Exponential per-symbol delay schedule.
//!
//! The first `k0` symbols of a chunk are essential — any fewer and no
//! receiver can decode — so they are sent at the floor delay.  Every symbol
//! past `k0` is redundancy, and its delay grows geometrically until it
//! saturates at the ceiling.  This keeps the initial burst dense and the
//! long redundant tail cheap.

use std::time::Duration;

/// A pure delay schedule over `(symbol index, minimum symbols)`.
#[derive(Debug, Clone, Copy)]
pub struct ExpBackoff {
    initial_delay_ms: f64,
    exp_base: f64,
    /// Exponent at which the delay reaches `max_delay_ms`.
    max_power: f64,
}

impl ExpBackoff {
    /// Build a schedule from a floor, ceiling, and growth base (all ms).
    pub fn new(initial_delay_ms: f64, max_delay_ms: f64, exp_base: f64) -> Self {
        let max_power = (max_delay_ms / initial_delay_ms).log2() / exp_base.log2();
        // A base of 1.0 (or a ceiling at the floor) degenerates to a flat
        // schedule rather than a NaN exponent.
        let max_power = if max_power.is_finite() {
            max_power.max(0.0)
        } else {
            0.0
        };
        Self {
            initial_delay_ms,
            exp_base,
            max_power,
        }
    }

    /// Delay before emitting symbol `k`, where `k0` is the minimum number of
    /// symbols required to decode the chunk.
    ///
    /// `initial · base^clamp(k − k0, 0, k_max)`, with `k_max` chosen so the
    /// result never exceeds the configured ceiling.
    pub fn delay(&self, k: u32, k0: u32) -> Duration {
        let power = (f64::from(k) - f64::from(k0)).clamp(0.0, self.max_power);
        Duration::from_secs_f64(self.initial_delay_ms * self.exp_base.powf(power) / 1_000.0)
    }
}
