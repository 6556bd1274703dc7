//! Automatic sensitivity control
//!
//! Keeps the rolling-average loudness inside a target band by nudging the
//! sensitivity multiplier once per block. Three regimes:
//! - too loud: step down by a fixed amount
//! - too quiet: step up by a fixed amount
//! - in band: relax toward the baseline by a fraction of the gap
//!
//! Nothing moves until the history window has filled once.

use std::collections::VecDeque;

/// Auto-gain tuning
#[derive(Debug, Clone)]
pub struct GainConfig {
    /// Sensitivity at startup
    pub initial: f32,

    /// Lower bound on sensitivity
    pub min: f32,

    /// Upper bound on sensitivity
    pub max: f32,

    /// Neutral sensitivity relaxed toward while in band
    pub baseline: f32,

    /// Amplitude readings averaged per decision
    pub history_size: usize,

    /// Rolling mean below this raises sensitivity
    pub target_low: f32,

    /// Rolling mean above this lowers sensitivity
    pub target_high: f32,

    /// Fixed step applied outside the target band
    pub adjustment_rate: f32,

    /// Fraction of the gap to baseline closed per block while in band
    pub settle_rate: f32,
}

impl Default for GainConfig {
    fn default() -> Self {
        Self {
            initial: 15.0,
            min: 5.0,
            max: 30.0,
            baseline: 15.0,
            history_size: 100,
            target_low: 0.05,
            target_high: 0.2,
            adjustment_rate: 0.1,
            settle_rate: 0.01,
        }
    }
}

/// Owns the amplitude history and the sensitivity it drives.
pub struct AutoGainController {
    config: GainConfig,
    sensitivity: f32,
    history: VecDeque<f32>,
}

impl AutoGainController {
    pub fn new(config: GainConfig) -> Self {
        let sensitivity = config.initial.clamp(config.min, config.max);
        let history = VecDeque::with_capacity(config.history_size);
        Self {
            config,
            sensitivity,
            history,
        }
    }

    /// Record `amplitude` and return the updated sensitivity.
    pub fn update(&mut self, amplitude: f32) -> f32 {
        if self.history.len() == self.config.history_size {
            self.history.pop_front();
        }
        self.history.push_back(amplitude);

        if self.history.len() < self.config.history_size {
            return self.sensitivity;
        }

        let avg = self.rolling_mean();
        let cfg = &self.config;

        self.sensitivity = if avg > cfg.target_high {
            (self.sensitivity - cfg.adjustment_rate).max(cfg.min)
        } else if avg < cfg.target_low {
            (self.sensitivity + cfg.adjustment_rate).min(cfg.max)
        } else {
            self.sensitivity + (cfg.baseline - self.sensitivity) * cfg.settle_rate
        };

        self.sensitivity
    }

    pub fn sensitivity(&self) -> f32 {
        self.sensitivity
    }

    /// True once enough readings have been seen for adjustments to start
    pub fn is_warmed_up(&self) -> bool {
        self.history.len() >= self.config.history_size
    }

    /// Mean of the retained amplitude readings, or 0 with no history
    pub fn rolling_mean(&self) -> f32 {
        if self.history.is_empty() {
            return 0.0;
        }
        self.history.iter().sum::<f32>() / self.history.len() as f32
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }
}

impl Default for AutoGainController {
    fn default() -> Self {
        Self::new(GainConfig::default())
    }
}

/// Map an amplitude to LED intensity in [0, 1].
///
/// Amplitudes under `threshold` are treated as noise and produce 0.
pub fn intensity(amplitude: f32, sensitivity: f32, threshold: f32) -> f32 {
    if amplitude.is_nan() || amplitude < threshold {
        return 0.0;
    }
    ((amplitude - threshold) * sensitivity).min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    const THRESHOLD: f32 = 0.01;

    fn assert_approx(actual: f32, expected: f32, tolerance: f32) {
        assert!(
            (actual - expected).abs() <= tolerance,
            "expected {expected}, got {actual}"
        );
    }

    fn warmed_up(amplitude: f32) -> AutoGainController {
        let mut agc = AutoGainController::default();
        for _ in 0..99 {
            agc.update(amplitude);
        }
        agc
    }

    #[test]
    fn sensitivity_is_frozen_during_warm_up() {
        let mut agc = AutoGainController::default();

        for i in 0..99 {
            // Extremely loud input that would otherwise push sensitivity down
            assert_eq!(agc.update(0.9), 15.0, "changed on call {}", i + 1);
        }
        assert!(!agc.is_warmed_up());
        assert_eq!(agc.history_len(), 99);
    }

    #[test]
    fn loud_history_steps_sensitivity_down() {
        let mut agc = warmed_up(0.5);

        assert_approx(agc.update(0.5), 14.9, 1e-5);
        assert_approx(agc.update(0.5), 14.8, 1e-5);
        assert!(agc.is_warmed_up());
    }

    #[test]
    fn quiet_history_steps_sensitivity_up() {
        let mut agc = warmed_up(0.01);

        assert_approx(agc.update(0.01), 15.1, 1e-5);
        assert_approx(agc.update(0.01), 15.2, 1e-5);
    }

    #[test]
    fn in_band_history_relaxes_toward_baseline() {
        let mut agc = AutoGainController::new(GainConfig {
            initial: 25.0,
            ..Default::default()
        });
        for _ in 0..99 {
            agc.update(0.1);
        }

        // 25 + (15 - 25) * 0.01
        assert_approx(agc.update(0.1), 24.9, 1e-5);
        // 24.9 + (15 - 24.9) * 0.01
        assert_approx(agc.update(0.1), 24.801, 1e-4);
    }

    #[test]
    fn sensitivity_floors_at_minimum() {
        let mut agc = AutoGainController::default();
        for _ in 0..1000 {
            agc.update(0.8);
        }

        assert_eq!(agc.sensitivity(), 5.0);
        assert_eq!(agc.update(0.8), 5.0);
    }

    #[test]
    fn sensitivity_ceilings_at_maximum() {
        let mut agc = AutoGainController::default();
        for _ in 0..1000 {
            agc.update(0.0);
        }

        assert_eq!(agc.sensitivity(), 30.0);
        assert_eq!(agc.update(0.0), 30.0);
    }

    #[test]
    fn history_evicts_oldest_reading() {
        let mut agc = AutoGainController::default();
        for _ in 0..100 {
            agc.update(1.0);
        }
        for _ in 0..100 {
            agc.update(0.1);
        }

        assert_eq!(agc.history_len(), 100);
        assert_approx(agc.rolling_mean(), 0.1, 1e-5);
    }

    #[test]
    fn random_sequences_respect_bounds_and_step_sizes() {
        let mut rng = StdRng::seed_from_u64(0x5eed);

        for _ in 0..20 {
            let mut agc = AutoGainController::default();
            let mut previous = agc.sensitivity();
            // Fixed steps are 0.1; settling from a bound closes 1% of at most 25
            let max_step = 0.1f32.max(0.01 * 25.0);
            let loudness: f32 = rng.gen_range(0.0..0.4);

            for _ in 0..2000 {
                let amplitude = (loudness + rng.gen_range(-0.05..0.05)).max(0.0);
                let current = agc.update(amplitude);

                assert!((5.0..=30.0).contains(&current), "out of bounds: {current}");
                assert!(
                    (current - previous).abs() <= max_step + 1e-5,
                    "jumped from {previous} to {current}"
                );
                previous = current;
            }
        }
    }

    #[test]
    fn intensity_is_zero_below_threshold() {
        for sensitivity in [5.0, 15.0, 30.0] {
            assert_eq!(intensity(0.0, sensitivity, THRESHOLD), 0.0);
            assert_eq!(intensity(0.009, sensitivity, THRESHOLD), 0.0);
        }
    }

    #[test]
    fn intensity_scales_and_saturates() {
        assert_approx(intensity(0.03, 15.0, THRESHOLD), 0.3, 1e-5);
        assert_eq!(intensity(0.5, 15.0, THRESHOLD), 1.0);
        assert_eq!(intensity(THRESHOLD, 15.0, THRESHOLD), 0.0);
    }

    #[test]
    fn intensity_is_monotonic_in_amplitude() {
        let mut rng = StdRng::seed_from_u64(42);

        for _ in 0..50 {
            let sensitivity: f32 = rng.gen_range(5.0..30.0);
            let mut amplitudes: Vec<f32> = (0..200).map(|_| rng.gen_range(0.0..0.2)).collect();
            amplitudes.sort_by(|a, b| a.total_cmp(b));

            let values: Vec<f32> = amplitudes
                .iter()
                .map(|&a| intensity(a, sensitivity, THRESHOLD))
                .collect();

            for pair in values.windows(2) {
                assert!(pair[0] <= pair[1], "{} > {}", pair[0], pair[1]);
            }
            assert!(values.iter().all(|v| (0.0..=1.0).contains(v)));
        }
    }
}
