//! Synthesis and playback worker
//!
//! Each request runs on its own thread: synthesize the text into a fresh
//! temporary WAV file, play it through the chosen path, delete the file.
//! Callers are never blocked and never see worker errors; those only reach
//! the status line.

pub mod cancel;
pub mod status;

use crate::audio::{DeviceAudio, FallbackAudio};
use crate::speech::SpeechEngine;
use crate::{AnnouncerError, Result};
use log::{debug, error, info, warn};
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

pub use cancel::CancelToken;
pub use status::{Status, StatusLine, StatusReporter, StatusTone};

/// Status text shown once playback is over
pub const IDLE_TEXT: &str = "Waiting...";

/// How a finished playback ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Played,
    Cancelled,
}

/// Which output path a playback took
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Device-aware path, with the device's native id
    Device(usize),
    /// Platform default player
    SystemDefault,
}

/// Handle to a running playback
///
/// Dropping the handle detaches the worker; playback carries on.
pub struct PlaybackHandle {
    cancel: CancelToken,
    thread: JoinHandle<()>,
}

impl PlaybackHandle {
    /// Ask this playback to stop
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Wait for the worker to finish
    pub fn join(self) {
        if self.thread.join().is_err() {
            error!("Playback worker panicked");
        }
    }
}

/// Synthesis-and-playback worker factory
pub struct Player {
    engine: Arc<dyn SpeechEngine>,
    device_audio: Option<Arc<dyn DeviceAudio>>,
    fallback: Arc<dyn FallbackAudio>,
    status: Arc<dyn StatusReporter>,

    /// Bumped by `stop()`; tokens created earlier see themselves cancelled
    stop_generation: Arc<AtomicU64>,
}

impl Player {
    pub fn new(
        engine: Arc<dyn SpeechEngine>,
        device_audio: Option<Arc<dyn DeviceAudio>>,
        fallback: Arc<dyn FallbackAudio>,
        status: Arc<dyn StatusReporter>,
    ) -> Self {
        Self {
            engine,
            device_audio,
            fallback,
            status,
            stop_generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Name of the speech engine in use
    pub fn engine_name(&self) -> &'static str {
        self.engine.name()
    }

    /// Whether the device-aware path is available
    pub fn has_device_audio(&self) -> bool {
        self.device_audio.is_some()
    }

    /// Path a playback on `device` would take
    pub fn route(&self, device: Option<usize>) -> Route {
        match (&self.device_audio, device) {
            (Some(_), Some(native_id)) => Route::Device(native_id),
            _ => Route::SystemDefault,
        }
    }

    /// Speak `text` with `voice_id` on `device` in the background
    ///
    /// Empty text or voice is rejected up front. Everything after that
    /// happens on the worker thread.
    pub fn play(&self, text: &str, voice_id: &str, device: Option<usize>) -> Result<PlaybackHandle> {
        if text.trim().is_empty() {
            return Err(AnnouncerError::Validation("Nothing to say".to_string()));
        }
        if voice_id.is_empty() {
            return Err(AnnouncerError::Validation("No voice selected".to_string()));
        }

        let cancel = CancelToken::under(&self.stop_generation);
        let job = Job {
            text: text.to_string(),
            voice_id: voice_id.to_string(),
            route: self.route(device),
            engine: Arc::clone(&self.engine),
            device_audio: self.device_audio.clone(),
            fallback: Arc::clone(&self.fallback),
            status: Arc::clone(&self.status),
            cancel: cancel.clone(),
        };

        let thread = thread::Builder::new()
            .name("announcer-playback".to_string())
            .spawn(move || job.run())
            .map_err(|e| {
                error!("Failed to start playback worker: {}", e);
                self.status.report(Status::error(format!("Error: {}", e)));
                AnnouncerError::Audio(format!("Failed to start playback worker: {}", e))
            })?;

        Ok(PlaybackHandle { cancel, thread })
    }

    /// Stop every playback started so far
    ///
    /// Synthesis already in progress runs to completion, but its audio is
    /// not played.
    pub fn stop(&self) {
        debug!("Stopping all playback");
        self.stop_generation.fetch_add(1, Ordering::SeqCst);
    }
}

/// One playback request, owned by its worker thread
struct Job {
    text: String,
    voice_id: String,
    route: Route,
    engine: Arc<dyn SpeechEngine>,
    device_audio: Option<Arc<dyn DeviceAudio>>,
    fallback: Arc<dyn FallbackAudio>,
    status: Arc<dyn StatusReporter>,
    cancel: CancelToken,
}

impl Job {
    fn run(self) {
        match self.execute() {
            Ok(Outcome::Played) => {
                self.status.report(Status::idle(IDLE_TEXT));
            }
            Ok(Outcome::Cancelled) => {
                info!("Playback stopped");
            }
            Err(e) => {
                error!("Playback failed: {}", e);
                self.status.report(Status::error(format!("Error: {}", e)));
            }
        }
    }

    fn execute(&self) -> Result<Outcome> {
        let temp = tempfile::Builder::new()
            .prefix("announcer-")
            .suffix(".wav")
            .tempfile()?
            .into_temp_path();

        let result = self.synthesize_and_play(&temp);

        let path = temp.to_path_buf();
        if let Err(e) = temp.close() {
            warn!("Ignoring failure to remove {:?}: {}", path, e);
        }

        result
    }

    fn synthesize_and_play(&self, path: &Path) -> Result<Outcome> {
        debug!("Synthesizing {} chars with voice {}", self.text.len(), self.voice_id);
        self.engine
            .synthesize_to_file(&self.text, &self.voice_id, path)?;

        if fs::metadata(path)?.len() == 0 {
            return Err(AnnouncerError::Speech(format!(
                "{} produced no audio",
                self.engine.name()
            )));
        }

        if self.cancel.is_cancelled() {
            return Ok(Outcome::Cancelled);
        }

        match (self.route, &self.device_audio) {
            (Route::Device(native_id), Some(audio)) => {
                self.status
                    .report(Status::playing(format!("Playing... (device {})", native_id)));
                audio.play_file(path, native_id, &self.cancel)?;
            }
            _ => {
                self.status.report(Status::playing("Playing... (default device)"));
                self.fallback.play_file(path, &self.cancel)?;
            }
        }

        if self.cancel.is_cancelled() {
            Ok(Outcome::Cancelled)
        } else {
            Ok(Outcome::Played)
        }
    }
}
