//! Configuration management

use crate::{AnnouncerError, Result};
use ini::Ini;
use log::{debug, info};
use std::path::{Path, PathBuf};

/// Greeting spoken by the voice preview button
pub const DEFAULT_PREVIEW_TEXT: &str = "안녕하세요? 음성 모델 테스트 중입니다.";

/// Pattern for picking the initial voice (Korean locale)
pub const DEFAULT_PREFERRED_VOICE: &str = "KR|Korean|^ko";

/// Application configuration for the announcer
///
/// Persistent settings for template storage, speech engine selection
/// and audio output.
pub struct Config {
    /// INI configuration storage
    ini: Ini,

    /// Config file path (~/.announcer.cfg unless overridden)
    path: PathBuf,
}

impl Config {
    /// Load configuration from the default location or create it
    pub fn load() -> Result<Self> {
        Self::load_from(Self::config_path())
    }

    /// Load configuration from `path`, writing defaults there if it is missing
    pub fn load_from(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        debug!("Loading config from {:?}", path);

        let ini = if path.exists() {
            Ini::load_from_file(&path)
                .map_err(|e| AnnouncerError::IniParse(format!("Failed to load config: {}", e)))?
        } else {
            info!("Config file not found, creating default");
            let default = Self::default_config();
            default
                .write_to_file(&path)
                .map_err(|e| AnnouncerError::IniParse(format!("Failed to write config: {}", e)))?;
            default
        };

        Ok(Self { ini, path })
    }

    /// Get config file path (~/.announcer.cfg)
    fn config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".announcer.cfg")
    }

    /// Expose the config file path for display
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create default configuration
    fn default_config() -> Ini {
        let mut ini = Ini::new();

        ini.with_section(Some("templates"))
            .set("file", "templates.json");

        ini.with_section(Some("speech"))
            .set("engine", "auto")
            .set("preferred_voice", DEFAULT_PREFERRED_VOICE)
            .set("preview_text", DEFAULT_PREVIEW_TEXT);

        ini.with_section(Some("audio"))
            .set("device_audio", "true")
            .set("fallback_player", "");

        ini
    }

    /// Get a boolean value from config
    pub fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        self.ini
            .get_from(Some(section), key)
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    /// Get a string value from config
    pub fn get_string(&self, section: &str, key: &str, default: &str) -> String {
        self.ini
            .get_from(Some(section), key)
            .unwrap_or(default)
            .to_string()
    }

    /// Set a value in config
    pub fn set(&mut self, section: &str, key: &str, value: &str) {
        self.ini.with_section(Some(section)).set(key, value);
    }

    /// Template file location
    ///
    /// Relative paths are resolved against the working directory.
    pub fn template_file(&self) -> PathBuf {
        PathBuf::from(self.get_string("templates", "file", "templates.json"))
    }

    /// Which speech engine to use (`auto`, `espeak`, `say` or `sapi`)
    pub fn engine(&self) -> String {
        self.get_string("speech", "engine", "auto").to_lowercase()
    }

    /// Regex matched against voice id, name and languages to pick the initial voice
    pub fn preferred_voice(&self) -> String {
        self.get_string("speech", "preferred_voice", DEFAULT_PREFERRED_VOICE)
    }

    /// Text spoken by the voice preview
    pub fn preview_text(&self) -> String {
        let text = self.get_string("speech", "preview_text", DEFAULT_PREVIEW_TEXT);
        if text.trim().is_empty() {
            DEFAULT_PREVIEW_TEXT.to_string()
        } else {
            text
        }
    }

    /// Should the device-aware audio path be tried at all?
    pub fn device_audio(&self) -> bool {
        self.get_bool("audio", "device_audio", true)
    }

    /// Command used for default-device playback, if configured
    ///
    /// The file path is appended as the last argument.
    pub fn fallback_player(&self) -> Option<String> {
        let cmd = self.get_string("audio", "fallback_player", "");
        let cmd = cmd.trim();
        if cmd.is_empty() {
            None
        } else {
            Some(cmd.to_string())
        }
    }
}
