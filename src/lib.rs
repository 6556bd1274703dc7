//! Audio-reactive LED driver library
//!
//! Captures audio, derives an intensity from loudness (with automatic
//! sensitivity control) and a color from the dominant frequency, and streams
//! both to a microcontroller over a serial line.

pub mod audio;
pub mod cli;
pub mod control;
pub mod gain;
pub mod protocol;
pub mod state;

use audio::{AudioConfig, CaptureError, CpalSource};
use control::{ControlLoop, LoopCommand, LoopConfig};
use gain::{AutoGainController, GainConfig};
use protocol::{LinkConfig, LinkError, SerialLink};
use state::LoopOutcome;

use std::sync::mpsc;
use thiserror::Error;

/// Errors that prevent a session from reaching the running state
#[derive(Error, Debug)]
pub enum StartError {
    #[error("Audio capture unavailable: {0}")]
    Capture(#[from] CaptureError),

    #[error("Serial link unavailable: {0}")]
    Link(#[from] LinkError),
}

/// Full session configuration
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub audio: AudioConfig,
    pub link: LinkConfig,
    pub gain: GainConfig,
    pub control: LoopConfig,
}

/// Open the audio device and serial link, then run the control loop until a
/// stop command arrives or the link fails.
///
/// Both resources are released before this returns, on every path.
pub fn run_session(
    config: &Config,
    commands: mpsc::Receiver<LoopCommand>,
) -> Result<LoopOutcome, StartError> {
    // Open serial first so no audio queues up during the settle delay
    let link = SerialLink::open(&config.link)?;
    let source = CpalSource::open(&config.audio)?;

    let gain = AutoGainController::new(config.gain.clone());
    let control = ControlLoop::new(source, link, gain, config.control.clone(), commands);

    Ok(control.run())
}

/// Process exit code for a finished session.
///
/// 0 for an operator stop, 1 for a lost link, 2 for a failed start.
pub fn exit_code(result: &Result<LoopOutcome, StartError>) -> u8 {
    match result {
        Ok(outcome) if outcome.is_graceful() => 0,
        Ok(_) => 1,
        Err(_) => 2,
    }
}
