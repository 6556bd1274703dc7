//! Outbound frame encoding
//!
//! One frame per processing cycle, as a single text line:
//! `"<intensity>,<color>\n"` with both values printed to three decimals.

use std::fmt;

/// Intensity and color for one cycle, both in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutputFrame {
    pub intensity: f32,
    pub color: f32,
}

impl OutputFrame {
    /// Build a frame, clamping both values into [0, 1].
    pub fn new(intensity: f32, color: f32) -> Self {
        Self {
            intensity: unit(intensity),
            color: unit(color),
        }
    }

    /// Wire bytes for this frame, newline included
    pub fn encode(&self) -> Vec<u8> {
        self.to_string().into_bytes()
    }
}

impl fmt::Display for OutputFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:.3},{:.3}", self.intensity, self.color)
    }
}

fn unit(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        // Adding +0.0 turns -0.0 into 0.0, which would otherwise print as "-0.000"
        value.clamp(0.0, 1.0) + 0.0
    }
}
