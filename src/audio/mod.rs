//! Audio output
//!
//! Two playback paths exist. The device-aware path (rodio/cpal) can route a
//! file to a chosen output device; it is optional and may be missing at build
//! time or fail at runtime. The system path hands the file to the platform's
//! default player and is always present.

#[cfg(feature = "device-audio")]
pub mod device;
pub mod system;

use crate::playback::CancelToken;
use crate::Result;
use log::{debug, warn};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

pub use system::SystemPlayer;

/// Label of the sentinel entry used when no device list is available
pub const SYSTEM_DEFAULT_NAME: &str = "System default device";

/// A device as reported by the device-aware backend, before filtering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Position in the backend's full device list
    pub native_id: usize,
    pub name: String,
    pub host_api: String,
    pub output_channels: u16,
}

/// An entry of the output device selector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputDevice {
    /// Position in the selector
    pub display_index: usize,

    /// Backend device id, `None` for the system default sentinel
    pub native_id: Option<usize>,

    pub name: String,
    pub host_api: String,
}

impl OutputDevice {
    /// The single entry used when devices cannot be listed
    pub fn system_default() -> Self {
        Self {
            display_index: 0,
            native_id: None,
            name: SYSTEM_DEFAULT_NAME.to_string(),
            host_api: String::new(),
        }
    }

    pub fn is_system_default(&self) -> bool {
        self.native_id.is_none()
    }
}

impl fmt::Display for OutputDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host_api.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{} ({})", self.name, self.host_api)
        }
    }
}

/// Device-aware playback backend
pub trait DeviceAudio: Send + Sync {
    /// Every device the backend knows about, inputs included
    fn devices(&self) -> Result<Vec<DeviceInfo>>;

    /// Native id of the system default output device
    fn default_output_device(&self) -> Result<usize>;

    /// Play a WAV file on `native_id`, blocking until done or cancelled
    fn play_file(&self, path: &Path, native_id: usize, cancel: &CancelToken) -> Result<()>;
}

/// Platform default playback primitive
pub trait FallbackAudio: Send + Sync {
    /// Play a WAV file on the default device, blocking until done or cancelled
    fn play_file(&self, path: &Path, cancel: &CancelToken) -> Result<()>;
}

/// Result of output device enumeration
#[derive(Debug, Clone)]
pub struct DeviceListing {
    /// Selector entries; never empty
    pub devices: Vec<OutputDevice>,

    /// Entry to select initially
    pub selected: usize,

    /// Set when the device-aware path is unusable and playback falls back
    pub degraded: Option<String>,
}

impl DeviceListing {
    fn degraded(reason: String) -> Self {
        warn!("Device audio unavailable, using system default: {}", reason);
        Self {
            devices: vec![OutputDevice::system_default()],
            selected: 0,
            degraded: Some(reason),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded.is_some()
    }
}

/// Load the device-aware backend
///
/// Returns the reason when it cannot be used, so the caller can warn and
/// carry on with the system player.
pub fn load_device_audio(enabled: bool) -> std::result::Result<Arc<dyn DeviceAudio>, String> {
    if !enabled {
        return Err("device audio disabled in configuration".to_string());
    }

    open_device_audio()
}

#[cfg(feature = "device-audio")]
fn open_device_audio() -> std::result::Result<Arc<dyn DeviceAudio>, String> {
    device::RodioAudio::new()
        .map(|audio| Arc::new(audio) as Arc<dyn DeviceAudio>)
        .map_err(|e| e.to_string())
}

#[cfg(not(feature = "device-audio"))]
fn open_device_audio() -> std::result::Result<Arc<dyn DeviceAudio>, String> {
    Err("built without device-audio support".to_string())
}

/// Build the output device selector
///
/// Only devices with at least one output channel are listed. If the backend
/// is missing or fails, the list holds just the system default sentinel.
pub fn list_output_devices(audio: Option<&dyn DeviceAudio>) -> DeviceListing {
    let audio = match audio {
        Some(audio) => audio,
        None => return DeviceListing::degraded("device audio not loaded".to_string()),
    };

    let all = match audio.devices() {
        Ok(all) => all,
        Err(e) => return DeviceListing::degraded(format!("failed to list devices: {}", e)),
    };

    let devices: Vec<OutputDevice> = all
        .into_iter()
        .filter(|d| d.output_channels > 0)
        .enumerate()
        .map(|(display_index, d)| OutputDevice {
            display_index,
            native_id: Some(d.native_id),
            name: d.name,
            host_api: d.host_api,
        })
        .collect();

    if devices.is_empty() {
        return DeviceListing::degraded("no output devices found".to_string());
    }

    let selected = default_device_index(audio, &devices);
    debug!("Listed {} output devices, default at {}", devices.len(), selected);

    DeviceListing {
        devices,
        selected,
        degraded: None,
    }
}

/// Position of the system default output device in `devices`
///
/// Falls back to the first entry when the lookup fails.
pub fn default_device_index(audio: &dyn DeviceAudio, devices: &[OutputDevice]) -> usize {
    match audio.default_output_device() {
        Ok(native_id) => devices
            .iter()
            .position(|d| d.native_id == Some(native_id))
            .unwrap_or_else(|| {
                debug!("Default device {} is not an output entry, keeping first", native_id);
                0
            }),
        Err(e) => {
            debug!("Default device lookup failed, keeping first: {}", e);
            0
        }
    }
}
