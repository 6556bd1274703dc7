//! Command-line argument parsing.

use clap::Parser;
use std::time::Duration;

use crate::audio::{CaptureError, Channels};
use crate::Config;

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "audioled")]
#[command(about = "Drive an LED strip controller from live audio", long_about = None)]
pub struct Args {
    /// Serial port of the LED controller (e.g. /dev/ttyUSB0, COM3)
    #[arg(long, value_name = "PORT")]
    pub port: Option<String>,

    /// Serial baud rate
    #[arg(long, value_name = "BAUD")]
    pub baud: Option<u32>,

    /// Capture device name, or a substring of it (e.g. "CABLE Output")
    #[arg(long, value_name = "NAME")]
    pub device: Option<String>,

    /// Capture channel count: 1 (mono) or 2 (stereo, downmixed)
    #[arg(long, value_name = "N")]
    pub channels: Option<u16>,

    /// Capture sample rate in Hz
    #[arg(long, value_name = "HZ")]
    pub sample_rate: Option<u32>,

    /// Frames per analysis block
    #[arg(long, value_name = "FRAMES")]
    pub block_size: Option<usize>,

    /// Wait after opening the port before sending frames
    #[arg(long, value_name = "MS")]
    pub settle_ms: Option<u64>,

    /// Longest wait for the controller's reply to each frame
    #[arg(long, value_name = "MS")]
    pub ack_timeout_ms: Option<u64>,

    /// Do not read controller replies
    #[arg(long)]
    pub no_ack: bool,

    /// Delay between frames
    #[arg(long, value_name = "MS")]
    pub pace_ms: Option<u64>,

    /// List capture devices and serial ports, then exit
    #[arg(long)]
    pub list: bool,
}

impl Args {
    /// Apply the arguments on top of the platform defaults
    pub fn to_config(&self) -> Result<Config, CaptureError> {
        let mut config = Config::default();

        if let Some(port) = &self.port {
            config.link.port = port.clone();
        }
        if let Some(baud) = self.baud {
            config.link.baud_rate = baud;
        }
        if let Some(ms) = self.settle_ms {
            config.link.settle_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = self.ack_timeout_ms {
            config.link.read_timeout = Duration::from_millis(ms);
        }

        if let Some(device) = &self.device {
            config.audio.device = Some(device.clone());
        }
        if let Some(channels) = self.channels {
            config.audio.channels = Channels::try_from(channels)?;
        }
        if let Some(rate) = self.sample_rate {
            config.audio.sample_rate = rate;
        }
        if let Some(frames) = self.block_size {
            config.audio.block_size = frames;
        }

        config.audio.validate()?;

        config.control.read_ack = !self.no_ack;
        if let Some(ms) = self.pace_ms {
            config.control.pace = Duration::from_millis(ms);
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_arguments_keep_defaults() {
        let args = Args::parse_from(["audioled"]);
        let config = args.to_config().unwrap();

        assert_eq!(config.audio.sample_rate, 44_100);
        assert_eq!(config.audio.block_size, 1024);
        assert_eq!(config.link.baud_rate, 115_200);
        assert_eq!(config.control.pace, Duration::from_millis(10));
        assert!(config.control.read_ack);
    }

    #[test]
    fn arguments_override_defaults() {
        let args = Args::parse_from([
            "audioled",
            "--port",
            "/dev/ttyACM0",
            "--baud",
            "57600",
            "--device",
            "CABLE Output",
            "--channels",
            "2",
            "--settle-ms",
            "0",
            "--ack-timeout-ms",
            "250",
            "--no-ack",
            "--pace-ms",
            "5",
        ]);
        let config = args.to_config().unwrap();

        assert_eq!(config.link.port, "/dev/ttyACM0");
        assert_eq!(config.link.baud_rate, 57_600);
        assert_eq!(config.link.settle_delay, Duration::ZERO);
        assert_eq!(config.link.read_timeout, Duration::from_millis(250));
        assert_eq!(config.audio.device.as_deref(), Some("CABLE Output"));
        assert_eq!(config.audio.channels, Channels::Stereo);
        assert!(!config.control.read_ack);
        assert_eq!(config.control.pace, Duration::from_millis(5));
    }

    #[test]
    fn unsupported_channel_count_is_a_config_error() {
        let args = Args::parse_from(["audioled", "--channels", "4"]);

        assert!(matches!(
            args.to_config(),
            Err(CaptureError::UnsupportedChannels(4))
        ));
    }

    #[test]
    fn zero_block_size_is_a_config_error() {
        let args = Args::parse_from(["audioled", "--block-size", "0"]);

        assert!(matches!(
            args.to_config(),
            Err(CaptureError::InvalidBlockSize(0))
        ));
    }

    #[test]
    fn zero_sample_rate_is_a_config_error() {
        let args = Args::parse_from(["audioled", "--sample-rate", "0"]);

        assert!(matches!(
            args.to_config(),
            Err(CaptureError::InvalidSampleRate)
        ));
    }
}
