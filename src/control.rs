//! Per-block control loop
//!
//! Each cycle pulls one block from the capture source, measures loudness and
//! dominant frequency, updates the auto-gain, and writes one frame to the
//! link. The loop owns both I/O handles and releases them when it returns,
//! whichever way it stops.

use crate::audio::{rms, to_color, to_mono, AudioFrameSource, SpectralAnalyzer};
use crate::gain::{intensity, AutoGainController};
use crate::protocol::{FrameLink, LinkError, OutputFrame};
use crate::state::{LoopOutcome, LoopState, SessionStats, StopReason};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

/// Control loop timing and mapping parameters
#[derive(Debug, Clone)]
pub struct LoopConfig {
    /// Amplitudes below this produce zero intensity
    pub noise_threshold: f32,

    /// Sleep after each frame so the controller can keep up
    pub pace: Duration,

    /// Longest wait for audio before re-checking for a stop command
    pub poll_timeout: Duration,

    /// Read an acknowledgement line after every frame
    pub read_ack: bool,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            noise_threshold: 0.01,
            pace: Duration::from_millis(10),
            poll_timeout: Duration::from_millis(100),
            read_ack: true,
        }
    }
}

/// Commands sent to the control loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopCommand {
    Stop,
}

/// What one cycle computed
#[derive(Debug, Clone, Copy)]
pub struct CycleReport {
    pub frame: OutputFrame,
    pub amplitude: f32,
    pub sensitivity: f32,
    pub dominant_frequency: f32,
}

pub struct ControlLoop<S: AudioFrameSource, L: FrameLink> {
    source: S,
    link: L,
    gain: AutoGainController,
    spectral: SpectralAnalyzer,
    config: LoopConfig,
    commands: mpsc::Receiver<LoopCommand>,
    state: LoopState,
    history: Vec<LoopState>,
    stats: SessionStats,
}

impl<S: AudioFrameSource, L: FrameLink> ControlLoop<S, L> {
    pub fn new(
        source: S,
        link: L,
        gain: AutoGainController,
        config: LoopConfig,
        commands: mpsc::Receiver<LoopCommand>,
    ) -> Self {
        Self {
            source,
            link,
            gain,
            spectral: SpectralAnalyzer::new(),
            config,
            commands,
            state: LoopState::Starting,
            history: vec![LoopState::Starting],
            stats: SessionStats::default(),
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    /// Run until interrupted or the link fails, then release the source and link.
    pub fn run(mut self) -> LoopOutcome {
        self.transition(LoopState::Running);

        let reason = loop {
            if self.stop_requested() {
                break StopReason::Interrupted;
            }

            match self.run_cycle() {
                Ok(Some(_)) => {
                    if !self.config.pace.is_zero() {
                        thread::sleep(self.config.pace);
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    log::error!("Failed to send frame: {}", e);
                    break StopReason::LinkFailure(e);
                }
            }
        };

        self.transition(match &reason {
            StopReason::Interrupted => LoopState::StoppingOnInterrupt,
            StopReason::LinkFailure(_) => LoopState::StoppingOnLinkFailure,
        });
        self.stats.final_sensitivity = self.gain.sensitivity();

        let ControlLoop {
            source,
            link,
            state,
            mut history,
            stats,
            ..
        } = self;
        drop(link);
        drop(source);
        log::info!("Control loop {} -> {}", state, LoopState::Stopped);
        history.push(LoopState::Stopped);

        log::info!(
            "Session ended: {} frames sent, {} acknowledgements, sensitivity {:.2}",
            stats.frames_sent,
            stats.acks_received,
            stats.final_sensitivity
        );

        LoopOutcome {
            reason,
            stats,
            states: history,
        }
    }

    /// One pass of the pipeline.
    ///
    /// Returns `Ok(None)` when no block arrived within the poll timeout.
    pub fn run_cycle(&mut self) -> Result<Option<CycleReport>, LinkError> {
        let Some(block) = self.source.next_block(self.config.poll_timeout) else {
            return Ok(None);
        };

        let report = self.process_block(&block);

        self.link.send(&report.frame)?;
        self.stats.frames_sent += 1;
        log::debug!(
            "Sent value: {:.3}, {:.3}",
            report.frame.intensity,
            report.frame.color
        );

        if self.config.read_ack {
            match self.link.read_ack() {
                Some(ack) if !ack.is_empty() => {
                    self.stats.acks_received += 1;
                    log::debug!("Controller response: {}", ack);
                }
                _ => log::debug!("No controller response"),
            }
        }

        log::debug!(
            "Current sensitivity: {:.2}, Amplitude: {:.4}",
            report.sensitivity,
            report.amplitude
        );

        Ok(Some(report))
    }

    fn process_block(&mut self, block: &[f32]) -> CycleReport {
        let sample_rate = self.source.sample_rate();
        let mono = to_mono(block, self.source.channels());

        let amplitude = rms(&mono);
        // Gain must see this block's amplitude before it scales it
        let sensitivity = self.gain.update(amplitude);
        let value = intensity(amplitude, sensitivity, self.config.noise_threshold);

        let dominant_frequency = self.spectral.dominant_frequency(&mono, sample_rate);
        let color = to_color(dominant_frequency, sample_rate);

        CycleReport {
            frame: OutputFrame::new(value, color),
            amplitude,
            sensitivity,
            dominant_frequency,
        }
    }

    fn stop_requested(&self) -> bool {
        match self.commands.try_recv() {
            Ok(LoopCommand::Stop) => {
                log::info!("Control loop received stop command");
                true
            }
            Err(mpsc::TryRecvError::Disconnected) => {
                log::info!("Control loop command channel disconnected");
                true
            }
            Err(mpsc::TryRecvError::Empty) => false,
        }
    }

    fn transition(&mut self, next: LoopState) {
        log::info!("Control loop {} -> {}", self.state, next);
        self.state = next;
        self.history.push(next);
    }
}
