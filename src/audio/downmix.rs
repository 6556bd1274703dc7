//! Interleaved-to-mono conversion

use super::Channels;
use std::borrow::Cow;

/// Collapse an interleaved block to mono.
///
/// Mono input is passed through untouched. Stereo input is averaged per L/R
/// pair, so the output is half as long; a trailing unpaired sample is dropped.
pub fn to_mono(block: &[f32], channels: Channels) -> Cow<'_, [f32]> {
    match channels {
        Channels::Mono => Cow::Borrowed(block),
        Channels::Stereo => Cow::Owned(
            block
                .chunks_exact(2)
                .map(|frame| (frame[0] + frame[1]) * 0.5)
                .collect(),
        ),
    }
}
