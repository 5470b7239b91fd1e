//! Speech engine abstraction
//!
//! Every backend renders text into an audio file with a chosen voice.
//! Playback of that file is the audio module's job.

use crate::platform::is_wsl;
use crate::{AnnouncerError, Result};
use log::{debug, info};
use regex::Regex;
use std::fmt;
use std::path::Path;

/// A synthesis voice as reported by the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Voice {
    /// Identifier handed back to the engine when synthesizing
    pub id: String,

    /// Human readable name
    pub name: String,

    /// Language tags such as `ko` or `en-GB`
    pub languages: Vec<String>,
}

impl fmt::Display for Voice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.languages.join(", "))
    }
}

/// Text-to-speech engine trait
///
/// Implementations must be usable from playback worker threads.
pub trait SpeechEngine: Send + Sync {
    /// Short backend name for logs and the status line
    fn name(&self) -> &'static str;

    /// Voices installed for this engine, in engine order
    fn voices(&self) -> Result<Vec<Voice>>;

    /// Render `text` with `voice_id` into a WAV file at `path`
    fn synthesize_to_file(&self, text: &str, voice_id: &str, path: &Path) -> Result<()>;
}

/// Index of the voice to select initially
///
/// The first voice whose id, name or language matches `pattern` wins;
/// otherwise the first voice. `None` only when there are no voices.
pub fn preferred_voice_index(voices: &[Voice], pattern: &Regex) -> Option<usize> {
    if voices.is_empty() {
        return None;
    }

    let found = voices.iter().position(|v| {
        pattern.is_match(&v.id)
            || pattern.is_match(&v.name)
            || v.languages.iter().any(|lang| pattern.is_match(lang))
    });

    match found {
        Some(idx) => {
            debug!("Preferred voice: {}", voices[idx]);
            Some(idx)
        }
        None => {
            debug!("No voice matches {:?}, keeping the first", pattern.as_str());
            Some(0)
        }
    }
}

/// Create a speech engine
///
/// `choice` is `espeak`, `say`, `sapi`, or `auto` for platform detection:
///
/// **WSL:** Windows SAPI via PowerShell, then espeak-ng
///
/// **Linux:** espeak-ng
///
/// **macOS:** `say`
pub fn create_engine(choice: &str) -> Result<Box<dyn SpeechEngine>> {
    use super::backends::espeak::EspeakEngine;
    use super::backends::sapi::SapiEngine;
    use super::backends::say::SayEngine;

    match choice {
        "espeak" => return Ok(Box::new(EspeakEngine::new()?)),
        "say" => return Ok(Box::new(SayEngine::new()?)),
        "sapi" => return Ok(Box::new(SapiEngine::new()?)),
        "auto" | "" => {}
        other => {
            return Err(AnnouncerError::Config(format!(
                "Unknown speech engine '{}' (expected auto, espeak, say or sapi)",
                other
            )))
        }
    }

    let platform = std::env::consts::OS;

    if platform == "macos" {
        info!("Detected macOS, using say");
        return Ok(Box::new(SayEngine::new()?));
    }

    if platform == "linux" && is_wsl() {
        info!("Detected WSL environment");

        // Windows voices are usually the reason to run under WSL
        match SapiEngine::new() {
            Ok(engine) => {
                info!("✓ Using Windows SAPI engine");
                return Ok(Box::new(engine));
            }
            Err(e) => {
                info!("✗ Windows SAPI engine unavailable: {}", e);
            }
        }
    }

    match EspeakEngine::new() {
        Ok(engine) => {
            info!("✓ Using espeak-ng engine");
            Ok(Box::new(engine))
        }
        Err(e) => Err(AnnouncerError::Speech(format!(
            "No speech engine available on platform '{}'. Tried:\n\
             1. Windows SAPI (WSL only)\n\
             2. espeak-ng (install: sudo apt install espeak-ng)\n\
             Error: {}",
            platform, e
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn voice(id: &str, name: &str, lang: &str) -> Voice {
        Voice {
            id: id.to_string(),
            name: name.to_string(),
            languages: vec![lang.to_string()],
        }
    }

    #[test]
    fn test_prefers_korean_voice() {
        let pattern = Regex::new(crate::state::config::DEFAULT_PREFERRED_VOICE).unwrap();
        let voices = vec![
            voice("en", "English", "en"),
            voice("HKEY_LOCAL_MACHINE\\TTS_MS_ko-KR_Heami", "Microsoft Heami", "ko-KR"),
        ];
        assert_eq!(preferred_voice_index(&voices, &pattern), Some(1));

        let voices = vec![voice("en", "English", "en"), voice("ko", "Korean", "ko")];
        assert_eq!(preferred_voice_index(&voices, &pattern), Some(1));
    }

    #[test]
    fn test_falls_back_to_first_voice() {
        let pattern = Regex::new("KR|Korean").unwrap();
        let voices = vec![voice("en", "English", "en"), voice("de", "German", "de")];
        assert_eq!(preferred_voice_index(&voices, &pattern), Some(0));
        assert_eq!(preferred_voice_index(&[], &pattern), None);
    }

    #[test]
    fn test_unknown_engine_rejected() {
        assert!(matches!(
            create_engine("festival"),
            Err(AnnouncerError::Config(_))
        ));
    }

    #[test]
    fn test_voice_display() {
        assert_eq!(voice("ko", "Korean", "ko").to_string(), "Korean (ko)");
    }
}
