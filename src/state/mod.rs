//! Application state management
//!
//! `AppState` is the one object the front end talks to. It owns the
//! template store, the voice and device selectors, the announcement fields,
//! the scheduler and the player, and implements every front-end action.

pub mod config;
pub mod templates;

use crate::audio::{self, DeviceAudio, FallbackAudio, OutputDevice, SystemPlayer};
use crate::playback::{PlaybackHandle, Player, Status, StatusReporter};
use crate::schedule::{
    format_hms, ArmResult, Broadcast, Clock, Countdown, ScheduleMode, ScheduleState, Scheduler,
    SystemClock, Tick,
};
use crate::speech::{create_engine, preferred_voice_index, SpeechEngine, Voice};
use crate::{AnnouncerError, Result};
use chrono::{NaiveDateTime, NaiveTime, Timelike};
use config::Config;
use log::{error, info, warn};
use regex::Regex;
use std::sync::Arc;
use std::time::Instant;
use templates::{Template, TemplateStore, NO_SELECTION};

/// Which schedule tab is active
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeKind {
    /// Wall-clock time
    Time,
    /// Countdown
    Timer,
}

/// Everything the user has typed or selected
#[derive(Debug, Clone)]
pub struct Fields {
    pub title: String,
    pub script: String,
    pub mode: ModeKind,
    pub at_time: NaiveTime,
    pub countdown: Countdown,

    /// Template picker slot, `NO_SELECTION` for none
    pub template_slot: usize,
}

/// Backends the state is built from
pub struct Backends {
    pub engine: Arc<dyn SpeechEngine>,
    pub device_audio: Option<Arc<dyn DeviceAudio>>,
    pub fallback: Arc<dyn FallbackAudio>,
}

/// Main application state
pub struct AppState<C: Clock = SystemClock> {
    pub config: Config,
    pub templates: TemplateStore,
    pub fields: Fields,

    voices: Vec<Voice>,
    voice_idx: Option<usize>,

    devices: Vec<OutputDevice>,
    device_idx: usize,

    /// Startup problems the user should see (degraded audio, no voices)
    warnings: Vec<String>,

    scheduler: Scheduler<C>,
    player: Player,
    status: Arc<dyn StatusReporter>,

    /// Playbacks that may still be running
    playbacks: Vec<PlaybackHandle>,
}

impl AppState<SystemClock> {
    /// Build the state from configuration, detecting real backends
    pub fn open(config: Config, status: Arc<dyn StatusReporter>) -> Result<Self> {
        let engine: Arc<dyn SpeechEngine> = Arc::from(create_engine(&config.engine())?);
        info!("Speech engine: {}", engine.name());

        let device_audio = match audio::load_device_audio(config.device_audio()) {
            Ok(audio) => Some(audio),
            Err(reason) => {
                warn!("Device audio unavailable: {}", reason);
                None
            }
        };

        let fallback = Arc::new(SystemPlayer::detect(config.fallback_player().as_deref()));

        let backends = Backends {
            engine,
            device_audio,
            fallback,
        };
        Self::with_backends(config, backends, SystemClock, status)
    }
}

impl<C: Clock> AppState<C> {
    /// Build the state from explicit backends and clock
    ///
    /// Loads templates, lists voices and devices and picks the initial
    /// selections. A malformed template file is an error.
    pub fn with_backends(
        config: Config,
        backends: Backends,
        clock: C,
        status: Arc<dyn StatusReporter>,
    ) -> Result<Self> {
        let templates = TemplateStore::open(config.template_file())?;
        let mut warnings = Vec::new();

        let voices = match backends.engine.voices() {
            Ok(voices) => voices,
            Err(e) => {
                warn!("Failed to list voices: {}", e);
                warnings.push(format!("Could not list voices: {}", e));
                Vec::new()
            }
        };
        let pattern = Regex::new(&config.preferred_voice()).map_err(|e| {
            AnnouncerError::Config(format!("Invalid preferred_voice pattern: {}", e))
        })?;
        let voice_idx = preferred_voice_index(&voices, &pattern);
        if voices.is_empty() && warnings.is_empty() {
            warnings.push(format!("{} reports no voices", backends.engine.name()));
        }

        // Devices that can't be listed can't be played to either
        let listing = audio::list_output_devices(backends.device_audio.as_deref());
        let device_audio = if listing.is_degraded() {
            None
        } else {
            backends.device_audio
        };
        if let Some(reason) = &listing.degraded {
            warnings.push(format!(
                "Advanced audio control is unavailable ({}). Using the system default player.",
                reason
            ));
        }

        let player = Player::new(
            backends.engine,
            device_audio,
            backends.fallback,
            Arc::clone(&status),
        );
        let scheduler = Scheduler::new(clock);

        let now = scheduler.now();
        let fields = Fields {
            title: String::new(),
            script: String::new(),
            mode: ModeKind::Time,
            at_time: now.time().with_nanosecond(0).unwrap_or_else(|| now.time()),
            countdown: Countdown::default(),
            template_slot: NO_SELECTION,
        };

        info!(
            "State ready: {} templates, {} voices, {} devices",
            templates.len(),
            voices.len(),
            listing.devices.len()
        );

        Ok(Self {
            config,
            templates,
            fields,
            voices,
            voice_idx,
            devices: listing.devices,
            device_idx: listing.selected,
            warnings,
            scheduler,
            player,
            status,
            playbacks: Vec::new(),
        })
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn voices(&self) -> &[Voice] {
        &self.voices
    }

    pub fn selected_voice(&self) -> Option<&Voice> {
        self.voice_idx.and_then(|idx| self.voices.get(idx))
    }

    pub fn selected_voice_index(&self) -> Option<usize> {
        self.voice_idx
    }

    pub fn select_voice(&mut self, idx: usize) -> Result<()> {
        if idx >= self.voices.len() {
            return Err(AnnouncerError::Validation(format!("No voice number {}", idx + 1)));
        }
        self.voice_idx = Some(idx);
        Ok(())
    }

    pub fn devices(&self) -> &[OutputDevice] {
        &self.devices
    }

    pub fn selected_device(&self) -> Option<&OutputDevice> {
        self.devices.get(self.device_idx)
    }

    pub fn selected_device_index(&self) -> usize {
        self.device_idx
    }

    pub fn select_device(&mut self, idx: usize) -> Result<()> {
        if idx >= self.devices.len() {
            return Err(AnnouncerError::Validation(format!("No device number {}", idx + 1)));
        }
        self.device_idx = idx;
        Ok(())
    }

    pub fn player(&self) -> &Player {
        &self.player
    }

    pub fn schedule_state(&self) -> ScheduleState {
        self.scheduler.state()
    }

    /// Publish a status update
    pub fn report(&self, status: Status) {
        self.status.report(status);
    }

    /// The schedule described by the current fields
    pub fn schedule_mode(&self) -> ScheduleMode {
        match self.fields.mode {
            ModeKind::Time => ScheduleMode::At(self.fields.at_time),
            ModeKind::Timer => ScheduleMode::After(self.fields.countdown),
        }
    }

    /// Load picker `slot` into the title and script fields
    ///
    /// The sentinel slot only clears the picker selection.
    pub fn pick_template(&mut self, slot: usize) -> Result<Option<&Template>> {
        if slot == NO_SELECTION {
            self.fields.template_slot = NO_SELECTION;
            return Ok(None);
        }

        let template = self
            .templates
            .get(slot)
            .ok_or_else(|| AnnouncerError::Validation(format!("No template number {}", slot)))?;
        self.fields.title = template.title.clone();
        self.fields.script = template.script.clone();
        self.fields.template_slot = slot;
        Ok(self.templates.get(slot))
    }

    /// Save the title and script fields as a new template and select it
    pub fn save_template(&mut self) -> Result<usize> {
        let slot = self.templates.append(&self.fields.title, &self.fields.script)?;
        self.fields.template_slot = slot;
        self.report(Status::idle("Template saved!"));
        Ok(slot)
    }

    /// Delete the selected template and clear the fields
    ///
    /// Nothing happens while no template is selected.
    pub fn delete_template(&mut self) -> Result<Option<Template>> {
        let removed = self.templates.delete(self.fields.template_slot)?;
        if removed.is_some() {
            self.fields.template_slot = NO_SELECTION;
            self.fields.title.clear();
            self.fields.script.clear();
        }
        Ok(removed)
    }

    /// Speak the configured preview sentence with the selected voice
    pub fn preview_voice(&mut self) -> Result<()> {
        let text = self.config.preview_text();
        self.speak(&text)
    }

    /// Speak the script field with the selected voice
    pub fn preview_script(&mut self) -> Result<()> {
        if self.fields.script.trim().is_empty() {
            return Err(AnnouncerError::Validation("Enter a script first".to_string()));
        }
        let script = self.fields.script.clone();
        self.speak(&script)
    }

    fn speak(&mut self, text: &str) -> Result<()> {
        let voice_id = self
            .selected_voice()
            .map(|v| v.id.clone())
            .ok_or_else(|| AnnouncerError::Validation("No voice selected".to_string()))?;
        let device = self.selected_device().and_then(|d| d.native_id);

        let handle = self.player.play(text, &voice_id, device)?;
        self.track(handle);
        Ok(())
    }

    fn track(&mut self, handle: PlaybackHandle) {
        self.playbacks.retain(|h| !h.is_finished());
        self.playbacks.push(handle);
    }

    /// Whether any playback worker is still running
    pub fn is_playing(&self) -> bool {
        self.playbacks.iter().any(|h| !h.is_finished())
    }

    /// Whether a broadcast is scheduled or anything is still playing
    pub fn is_busy(&self) -> bool {
        self.scheduler.state() != ScheduleState::Idle || self.is_playing()
    }

    /// Wait for every playback worker to finish
    pub fn join_playbacks(&mut self) {
        for handle in self.playbacks.drain(..) {
            handle.join();
        }
    }

    /// Cancel everything and wait for the workers
    pub fn shutdown(&mut self) {
        self.stop();
        for handle in &self.playbacks {
            handle.cancel();
        }
        self.join_playbacks();
        info!("All playback stopped");
    }

    /// Arm the scheduler from the current fields
    ///
    /// Requires a script. Returns `None` when a broadcast was already
    /// scheduled.
    pub fn start_schedule(&mut self) -> Result<Option<NaiveDateTime>> {
        if self.scheduler.state() != ScheduleState::Idle {
            return Ok(None);
        }
        if self.fields.script.trim().is_empty() {
            return Err(AnnouncerError::Validation("Enter a script first".to_string()));
        }

        let mode = self.schedule_mode();
        match self.scheduler.arm(&mode)? {
            ArmResult::Armed(target) => {
                self.report(Status::armed(format!(
                    "Broadcast scheduled for {}",
                    target.format("%Y-%m-%d %H:%M:%S")
                )));
                Ok(Some(target))
            }
            ArmResult::Ignored => Ok(None),
        }
    }

    /// The stop button: cancel a scheduled broadcast and silence playback
    pub fn stop(&mut self) {
        let (scheduler, mut broadcast) = self.split_broadcast();
        if scheduler.cancel(&mut broadcast).is_err() {
            // Nothing scheduled, but audio from an earlier firing may be playing
            broadcast.stop();
        }
        self.report(Status::idle("Broadcast cancelled / waiting"));
    }

    /// Whether a periodic check should run now
    pub fn is_check_due(&self, now: Instant) -> bool {
        self.scheduler.is_check_due(now)
    }

    /// Time until the next periodic check, for the event loop's timeout
    pub fn time_until_next_check(&self, now: Instant) -> Option<std::time::Duration> {
        self.scheduler.time_until_next_check(now)
    }

    /// Run the periodic check and update the status line
    pub fn tick(&mut self) -> Tick {
        let script = self.fields.script.clone();
        let (scheduler, mut broadcast) = self.split_broadcast();
        let tick = scheduler.tick(&script, &mut broadcast);

        match tick {
            Tick::Waiting { remaining_secs } => {
                self.report(Status::armed(format!(
                    "Waiting for broadcast... {}",
                    format_hms(remaining_secs)
                )));
            }
            Tick::Fired => {
                self.report(Status::idle("Broadcast sent"));
            }
            Tick::Idle => {}
        }
        tick
    }

    /// Borrow the scheduler alongside a broadcast bound to the current selection
    fn split_broadcast(&mut self) -> (&mut Scheduler<C>, PlayerBroadcast<'_>) {
        let voice_id = self
            .voice_idx
            .and_then(|idx| self.voices.get(idx))
            .map(|v| v.id.as_str());
        let device = self.devices.get(self.device_idx).and_then(|d| d.native_id);

        let broadcast = PlayerBroadcast {
            player: &self.player,
            status: self.status.as_ref(),
            voice_id,
            device,
            playbacks: &mut self.playbacks,
        };
        (&mut self.scheduler, broadcast)
    }
}

/// Broadcast bound to the player and the current voice/device selection
struct PlayerBroadcast<'a> {
    player: &'a Player,
    status: &'a dyn StatusReporter,
    voice_id: Option<&'a str>,
    device: Option<usize>,
    playbacks: &'a mut Vec<PlaybackHandle>,
}

impl Broadcast for PlayerBroadcast<'_> {
    fn fire(&mut self, script: &str) {
        self.status.report(Status::playing("ON AIR"));

        let voice_id = match self.voice_id {
            Some(voice_id) => voice_id,
            None => {
                error!("Broadcast fired with no voice selected");
                self.status.report(Status::error("Error: no voice selected"));
                return;
            }
        };

        match self.player.play(script, voice_id, self.device) {
            Ok(handle) => {
                self.playbacks.retain(|h| !h.is_finished());
                self.playbacks.push(handle);
            }
            Err(e) => {
                error!("Broadcast failed to start: {}", e);
                self.status.report(Status::error(format!("Error: {}", e)));
            }
        }
    }

    fn stop(&mut self) {
        self.player.stop();
    }
}
