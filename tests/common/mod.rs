//! Fake backends shared by the integration tests
//!
//! The fake engine writes a few bytes instead of speech, and the fake audio
//! paths record what they were asked to play.

#![allow(dead_code)]

use announcer::audio::{DeviceAudio, DeviceInfo, FallbackAudio};
use announcer::playback::{CancelToken, StatusLine};
use announcer::schedule::ManualClock;
use announcer::speech::{SpeechEngine, Voice};
use announcer::state::config::Config;
use announcer::state::{AppState, Backends};
use announcer::{AnnouncerError, Result};
use chrono::{NaiveDate, NaiveDateTime};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use tempfile::TempDir;

/// Noon on a fixed day
pub fn noon() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 5, 1)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap()
}

#[derive(Default)]
pub struct FakeEngine {
    pub spoken: Mutex<Vec<(String, String)>>,
    pub fail: AtomicBool,
}

impl FakeEngine {
    pub fn spoken_texts(&self) -> Vec<String> {
        self.spoken
            .lock()
            .unwrap()
            .iter()
            .map(|(text, _)| text.clone())
            .collect()
    }
}

impl SpeechEngine for FakeEngine {
    fn name(&self) -> &'static str {
        "fake"
    }

    fn voices(&self) -> Result<Vec<Voice>> {
        Ok(vec![
            Voice {
                id: "en".to_string(),
                name: "English".to_string(),
                languages: vec!["en".to_string()],
            },
            Voice {
                id: "ko".to_string(),
                name: "Korean".to_string(),
                languages: vec!["ko".to_string()],
            },
        ])
    }

    fn synthesize_to_file(&self, text: &str, voice_id: &str, path: &Path) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(AnnouncerError::Speech("engine exploded".to_string()));
        }
        self.spoken
            .lock()
            .unwrap()
            .push((text.to_string(), voice_id.to_string()));
        fs::write(path, b"RIFF fake wave")?;
        Ok(())
    }
}

/// One recorded playback
#[derive(Debug, Clone)]
pub struct Played {
    pub path: PathBuf,
    pub bytes: u64,
    pub native_id: Option<usize>,
}

/// Records playbacks; with `hold` set, blocks until cancelled
#[derive(Default)]
pub struct FakeFallback {
    pub played: Mutex<Vec<Played>>,
    pub hold: AtomicBool,
    pub started: AtomicBool,
}

impl FakeFallback {
    pub fn holding() -> Self {
        let fallback = Self::default();
        fallback.hold.store(true, Ordering::SeqCst);
        fallback
    }

    pub fn played(&self) -> Vec<Played> {
        self.played.lock().unwrap().clone()
    }
}

impl FallbackAudio for FakeFallback {
    fn play_file(&self, path: &Path, cancel: &CancelToken) -> Result<()> {
        self.played.lock().unwrap().push(Played {
            path: path.to_path_buf(),
            bytes: fs::metadata(path)?.len(),
            native_id: None,
        });
        self.started.store(true, Ordering::SeqCst);

        if self.hold.load(Ordering::SeqCst) {
            let give_up = Instant::now() + Duration::from_secs(5);
            while !cancel.is_cancelled() && Instant::now() < give_up {
                thread::sleep(Duration::from_millis(10));
            }
        }
        Ok(())
    }
}

/// Device backend with a microphone, speakers and HDMI (the default)
#[derive(Default)]
pub struct FakeDevices {
    pub played: Mutex<Vec<Played>>,
    pub broken: bool,
}

impl FakeDevices {
    pub fn broken() -> Self {
        Self {
            broken: true,
            ..Self::default()
        }
    }

    pub fn played(&self) -> Vec<Played> {
        self.played.lock().unwrap().clone()
    }
}

impl DeviceAudio for FakeDevices {
    fn devices(&self) -> Result<Vec<DeviceInfo>> {
        if self.broken {
            return Err(AnnouncerError::Audio("host API exploded".to_string()));
        }
        let device = |native_id, name: &str, output_channels| DeviceInfo {
            native_id,
            name: name.to_string(),
            host_api: "ALSA".to_string(),
            output_channels,
        };
        Ok(vec![
            device(0, "Microphone", 0),
            device(1, "Speakers", 2),
            device(2, "HDMI", 2),
        ])
    }

    fn default_output_device(&self) -> Result<usize> {
        Ok(2)
    }

    fn play_file(&self, path: &Path, native_id: usize, _cancel: &CancelToken) -> Result<()> {
        self.played.lock().unwrap().push(Played {
            path: path.to_path_buf(),
            bytes: fs::metadata(path)?.len(),
            native_id: Some(native_id),
        });
        Ok(())
    }
}

/// An `AppState` wired to fakes, with its temp dir and handles
pub struct Harness {
    pub dir: TempDir,
    pub clock: ManualClock,
    pub status: Arc<StatusLine>,
    pub engine: Arc<FakeEngine>,
    pub fallback: Arc<FakeFallback>,
    pub devices: Option<Arc<FakeDevices>>,
    pub state: AppState<ManualClock>,
}

/// Config in `dir` with templates stored alongside it
pub fn test_config(dir: &Path) -> Config {
    let mut config = Config::load_from(dir.join("announcer.cfg")).expect("config");
    let templates = dir.join("templates.json");
    config.set("templates", "file", templates.to_str().unwrap());
    config
}

impl Harness {
    pub fn new() -> Self {
        Self::build(FakeFallback::default(), None)
    }

    pub fn with_fallback(fallback: FakeFallback) -> Self {
        Self::build(fallback, None)
    }

    pub fn with_devices(devices: FakeDevices) -> Self {
        Self::build(FakeFallback::default(), Some(devices))
    }

    fn build(fallback: FakeFallback, devices: Option<FakeDevices>) -> Self {
        let dir = TempDir::new().expect("temp dir");
        let clock = ManualClock::new(noon());
        let status = Arc::new(StatusLine::new());
        let engine = Arc::new(FakeEngine::default());
        let fallback = Arc::new(fallback);
        let devices = devices.map(Arc::new);

        let backends = Backends {
            engine: engine.clone(),
            device_audio: devices
                .clone()
                .map(|d| d as Arc<dyn DeviceAudio>),
            fallback: fallback.clone(),
        };
        let state = AppState::with_backends(
            test_config(dir.path()),
            backends,
            clock.clone(),
            status.clone(),
        )
        .expect("state");

        Self {
            dir,
            clock,
            status,
            engine,
            fallback,
            devices,
            state,
        }
    }

    /// Reopen the state on the same config and template file
    pub fn reopen(&self) -> AppState<ManualClock> {
        let backends = Backends {
            engine: self.engine.clone(),
            device_audio: None,
            fallback: self.fallback.clone(),
        };
        AppState::with_backends(
            test_config(self.dir.path()),
            backends,
            self.clock.clone(),
            self.status.clone(),
        )
        .expect("reopened state")
    }

    pub fn templates_path(&self) -> PathBuf {
        self.dir.path().join("templates.json")
    }
}

/// Wait until `flag` is set, panicking after a few seconds
pub fn wait_for(flag: &AtomicBool) {
    let give_up = Instant::now() + Duration::from_secs(5);
    while !flag.load(Ordering::SeqCst) {
        assert!(Instant::now() < give_up, "timed out waiting");
        thread::sleep(Duration::from_millis(10));
    }
}
