//! Loudness measurement

/// Root-mean-square amplitude of a mono block.
///
/// An empty block has no energy and reports 0.
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_sq: f32 = samples.iter().map(|s| s * s).sum();
    (sum_sq / samples.len() as f32).sqrt()
}
