//! Device-aware playback through rodio and cpal

use super::{DeviceAudio, DeviceInfo};
use crate::playback::CancelToken;
use crate::{AnnouncerError, Result};
use log::{debug, warn};
use rodio::cpal::traits::{DeviceTrait, HostTrait};
use rodio::cpal::{self, Device};
use rodio::{Decoder, OutputStream, Sink};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

/// How often a playing sink checks for cancellation
const CANCEL_POLL: Duration = Duration::from_millis(50);

/// Host and name of a device, stable across enumerations
type DeviceKey = (String, String);

/// rodio/cpal backend
///
/// Holds no audio handles; devices are enumerated on demand so the backend
/// can be shared between playback workers.
pub struct RodioAudio {
    /// Keys of the last listing, indexed by native id
    listed: Mutex<Vec<DeviceKey>>,
}

impl RodioAudio {
    /// Check that at least one audio host is usable
    pub fn new() -> Result<Self> {
        let hosts = cpal::available_hosts();
        if hosts.is_empty() {
            return Err(AnnouncerError::Audio("no audio hosts available".to_string()));
        }
        debug!("Audio hosts: {:?}", hosts);
        Ok(Self {
            listed: Mutex::new(Vec::new()),
        })
    }

    /// Every device of every host, in a stable order
    ///
    /// The position in this list is the device's native id.
    fn enumerate(&self) -> Result<Vec<(Device, String)>> {
        let mut all = Vec::new();

        for host_id in cpal::available_hosts() {
            let host = match cpal::host_from_id(host_id) {
                Ok(host) => host,
                Err(e) => {
                    warn!("Skipping audio host {}: {}", host_id.name(), e);
                    continue;
                }
            };

            let devices = host
                .devices()
                .map_err(|e| AnnouncerError::Audio(format!("Failed to list devices: {}", e)))?;

            for device in devices {
                all.push((device, host_id.name().to_string()));
            }
        }

        Ok(all)
    }

    fn device_name(device: &Device) -> String {
        device.name().unwrap_or_else(|_| "Unknown device".to_string())
    }

    fn key(device: &Device, host_api: &str) -> DeviceKey {
        (host_api.to_string(), Self::device_name(device))
    }

    fn output_channels(device: &Device) -> u16 {
        device
            .supported_output_configs()
            .map(|configs| configs.map(|c| c.channels()).max().unwrap_or(0))
            .unwrap_or(0)
    }
}

impl DeviceAudio for RodioAudio {
    fn devices(&self) -> Result<Vec<DeviceInfo>> {
        let devices: Vec<DeviceInfo> = self
            .enumerate()?
            .iter()
            .enumerate()
            .map(|(native_id, (device, host_api))| DeviceInfo {
                native_id,
                name: Self::device_name(device),
                host_api: host_api.clone(),
                output_channels: Self::output_channels(device),
            })
            .collect();

        if let Ok(mut listed) = self.listed.lock() {
            *listed = devices
                .iter()
                .map(|d| (d.host_api.clone(), d.name.clone()))
                .collect();
        }
        Ok(devices)
    }

    fn default_output_device(&self) -> Result<usize> {
        let host = cpal::default_host();
        let default = host
            .default_output_device()
            .ok_or_else(|| AnnouncerError::Audio("no default output device".to_string()))?;
        let default_name = Self::device_name(&default);
        let host_name = host.id().name();

        self.enumerate()?
            .iter()
            .position(|(device, host_api)| {
                host_api == host_name && Self::device_name(device) == default_name
            })
            .ok_or_else(|| {
                AnnouncerError::Audio(format!("default device {} not listed", default_name))
            })
    }

    fn play_file(&self, path: &Path, native_id: usize, cancel: &CancelToken) -> Result<()> {
        let wanted = self
            .listed
            .lock()
            .ok()
            .and_then(|listed| listed.get(native_id).cloned())
            .ok_or_else(|| AnnouncerError::Audio(format!("device {} was never listed", native_id)))?;

        let current: Vec<(Device, DeviceKey)> = self
            .enumerate()?
            .into_iter()
            .map(|(device, host_api)| {
                let key = Self::key(&device, &host_api);
                (device, key)
            })
            .collect();
        let keys: Vec<&DeviceKey> = current.iter().map(|(_, key)| key).collect();
        let position = find_device(&keys, &wanted).ok_or_else(|| {
            AnnouncerError::Audio(format!("device {} on {} disappeared", wanted.1, wanted.0))
        })?;
        let device = &current[position].0;

        let (_stream, handle) = OutputStream::try_from_device(device)
            .map_err(|e| AnnouncerError::Audio(format!("Failed to open device: {}", e)))?;
        let sink = Sink::try_new(&handle)
            .map_err(|e| AnnouncerError::Audio(format!("Failed to create sink: {}", e)))?;

        let file = File::open(path)?;
        let source = Decoder::new(BufReader::new(file))
            .map_err(|e| AnnouncerError::Audio(format!("Failed to decode audio: {}", e)))?;

        debug!("Playing {:?} on {} ({})", path, wanted.1, wanted.0);
        sink.append(source);

        while !sink.empty() {
            if cancel.is_cancelled() {
                debug!("Playback on {} cancelled", wanted.1);
                sink.stop();
                return Ok(());
            }
            thread::sleep(CANCEL_POLL);
        }

        Ok(())
    }
}

/// Position of the device with `wanted` host and name in a fresh listing
fn find_device(current: &[&DeviceKey], wanted: &DeviceKey) -> Option<usize> {
    current.iter().position(|key| *key == wanted)
}
