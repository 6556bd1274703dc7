//! Dominant-frequency analysis and frequency-to-color mapping

use rustfft::{num_complex::Complex, FftPlanner};

/// Finds the strongest frequency in a mono block.
///
/// The transform is unwindowed and only the non-negative half of the spectrum
/// (bins `0..N/2`) is searched. Plans are cached by the planner, so blocks of
/// varying length are fine, though the control loop always feeds one size.
pub struct SpectralAnalyzer {
    planner: FftPlanner<f32>,
    buffer: Vec<Complex<f32>>,
}

impl SpectralAnalyzer {
    pub fn new() -> Self {
        Self {
            planner: FftPlanner::new(),
            buffer: Vec::new(),
        }
    }

    /// Frequency in Hz of the bin with the largest magnitude.
    ///
    /// Ties resolve to the lowest bin, so silence and pure DC both yield 0 Hz.
    pub fn dominant_frequency(&mut self, samples: &[f32], sample_rate: u32) -> f32 {
        let n = samples.len();
        if n < 2 {
            return 0.0;
        }

        self.buffer.clear();
        self.buffer.extend(samples.iter().map(|&s| Complex::new(s, 0.0)));

        let fft = self.planner.plan_fft_forward(n);
        fft.process(&mut self.buffer);

        let mut best_bin = 0;
        let mut best_mag = f32::MIN;
        for (bin, c) in self.buffer.iter().take(n / 2).enumerate() {
            let mag = c.norm();
            if mag > best_mag {
                best_mag = mag;
                best_bin = bin;
            }
        }

        bin_to_hz(best_bin, n, sample_rate)
    }
}

impl Default for SpectralAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

/// Center frequency of `bin` for an `n`-point transform.
pub fn bin_to_hz(bin: usize, n: usize, sample_rate: u32) -> f32 {
    bin as f32 * sample_rate as f32 / n as f32
}

/// Map a frequency onto the [0, 1] color axis, with Nyquist at 1.
///
/// Out-of-range and NaN inputs clamp rather than fail.
pub fn to_color(freq: f32, sample_rate: u32) -> f32 {
    let nyquist = sample_rate as f32 / 2.0;
    let color = freq / nyquist;
    if color.is_nan() {
        return 0.0;
    }
    color.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const RATE: u32 = 44_100;
    const N: usize = 1024;

    fn assert_approx(actual: f32, expected: f32, tolerance: f32) {
        assert!(
            (actual - expected).abs() <= tolerance,
            "expected {expected}, got {actual}"
        );
    }

    fn sine(freq: f32, amplitude: f32) -> Vec<f32> {
        (0..N)
            .map(|i| {
                amplitude * (2.0 * std::f32::consts::PI * freq * i as f32 / RATE as f32).sin()
            })
            .collect()
    }

    #[test]
    fn silence_has_zero_dominant_frequency() {
        let mut analyzer = SpectralAnalyzer::new();
        assert_eq!(analyzer.dominant_frequency(&[0.0; N], RATE), 0.0);
    }

    #[test]
    fn dc_has_zero_dominant_frequency() {
        let mut analyzer = SpectralAnalyzer::new();
        assert_eq!(analyzer.dominant_frequency(&[0.4; N], RATE), 0.0);
    }

    #[test]
    fn on_bin_sine_is_found_exactly() {
        let mut analyzer = SpectralAnalyzer::new();
        let freq = bin_to_hz(20, N, RATE);

        assert_approx(analyzer.dominant_frequency(&sine(freq, 0.5), RATE), freq, 1e-3);
    }

    #[test]
    fn off_bin_sine_is_within_one_bin() {
        let mut analyzer = SpectralAnalyzer::new();
        let resolution = RATE as f32 / N as f32;

        for freq in [220.0, 1000.0, 4321.0, 15000.0] {
            let found = analyzer.dominant_frequency(&sine(freq, 0.3), RATE);
            assert_approx(found, freq, resolution);
        }
    }

    #[test]
    fn search_ignores_upper_half_of_spectrum() {
        let mut analyzer = SpectralAnalyzer::new();
        // Alternating samples put all energy exactly at Nyquist (bin N/2).
        let nyquist: Vec<f32> = (0..N).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();

        let found = analyzer.dominant_frequency(&nyquist, RATE);
        assert!(found < RATE as f32 / 2.0, "got {found}");
    }

    #[test]
    fn analyzer_handles_changing_block_sizes() {
        let mut analyzer = SpectralAnalyzer::new();
        let freq = bin_to_hz(10, N, RATE);
        let block = sine(freq, 0.5);

        assert_approx(analyzer.dominant_frequency(&block, RATE), freq, 1e-3);
        assert_approx(
            analyzer.dominant_frequency(&block[..N / 2], RATE),
            freq,
            RATE as f32 / (N / 2) as f32,
        );
    }

    #[test]
    fn color_maps_nyquist_to_one() {
        assert_eq!(to_color(22_050.0, RATE), 1.0);
        assert_approx(to_color(11_025.0, RATE), 0.5, 1e-6);
        assert_eq!(to_color(0.0, RATE), 0.0);
    }

    #[test]
    fn color_is_clamped_for_any_input() {
        for freq in [-1.0e9, -1.0, 0.0, 1.0e6, f32::INFINITY, f32::NEG_INFINITY, f32::NAN] {
            let color = to_color(freq, RATE);
            assert!((0.0..=1.0).contains(&color), "{freq} -> {color}");
        }
    }
}
