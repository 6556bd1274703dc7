//! Input device enumeration and lookup

use super::CaptureError;
use cpal::traits::{DeviceTrait, HostTrait};
use cpal::{Device, Host};

/// Audio source information
#[derive(Debug, Clone)]
pub struct AudioSource {
    /// Device name as reported by the host
    pub name: String,

    /// Whether this is the host's default input
    pub is_default: bool,
}

/// List available capture devices on the default host
pub fn list_sources() -> Result<Vec<AudioSource>, CaptureError> {
    let host = cpal::default_host();

    let default_name = host.default_input_device().and_then(|d| d.name().ok());

    let devices = host
        .input_devices()
        .map_err(|e| CaptureError::EnumerationError(e.to_string()))?;

    let sources = devices
        .filter_map(|device| device.name().ok())
        .map(|name| AudioSource {
            is_default: default_name.as_deref() == Some(name.as_str()),
            name,
        })
        .collect();

    Ok(sources)
}

/// Resolve an input device by name.
///
/// `None` picks the host's default input. Otherwise the first device whose
/// name contains `wanted` is returned, so "CABLE Output" matches
/// "CABLE Output (VB-Audio Virtual Cable)".
pub fn find_input_device(host: &Host, wanted: Option<&str>) -> Result<Device, CaptureError> {
    let Some(wanted) = wanted else {
        return host
            .default_input_device()
            .ok_or(CaptureError::NoInputDevice);
    };

    let mut devices = host
        .input_devices()
        .map_err(|e| CaptureError::EnumerationError(e.to_string()))?;

    devices
        .find(|d| d.name().map(|n| name_matches(&n, wanted)).unwrap_or(false))
        .ok_or_else(|| CaptureError::DeviceNotFound(wanted.to_string()))
}

fn name_matches(name: &str, wanted: &str) -> bool {
    name.contains(wanted)
}
