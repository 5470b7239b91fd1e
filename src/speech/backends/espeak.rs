//! espeak-ng backend
//!
//! Dependencies:
//! - espeak-ng (install with: sudo apt install espeak-ng)

use super::{find_program, run_with_input};
use crate::speech::{SpeechEngine, Voice};
use crate::{AnnouncerError, Result};
use log::debug;
use std::path::Path;
use std::process::Command;

/// espeak-ng engine writing WAV files with `-w`
pub struct EspeakEngine {
    /// Path to espeak-ng
    espeak_path: String,
}

impl EspeakEngine {
    /// Create a new espeak-ng engine
    ///
    /// Verifies espeak-ng is installed
    pub fn new() -> Result<Self> {
        debug!("Creating espeak-ng engine");

        let espeak_path = find_program(&["espeak-ng", "/usr/bin/espeak-ng", "espeak"], &["--version"])
            .ok_or_else(|| {
                AnnouncerError::Speech(
                    "espeak-ng not found. Install with: sudo apt install espeak-ng".to_string(),
                )
            })?;
        debug!("Found espeak-ng at: {}", espeak_path);

        Ok(Self { espeak_path })
    }

    /// Parse the table printed by `espeak-ng --voices`
    ///
    /// ```text
    /// Pty Language       Age/Gender VoiceName          File                 Other Languages
    ///  5  ko              --/M      Korean             sit/ko
    /// ```
    fn parse_voices(listing: &str) -> Vec<Voice> {
        listing
            .lines()
            .skip(1)
            .filter_map(|line| {
                let fields: Vec<&str> = line.split_whitespace().collect();
                if fields.len() < 4 {
                    return None;
                }
                Some(Voice {
                    id: fields[1].to_string(),
                    name: fields[3].replace('_', " "),
                    languages: vec![fields[1].to_string()],
                })
            })
            .collect()
    }
}

impl SpeechEngine for EspeakEngine {
    fn name(&self) -> &'static str {
        "espeak-ng"
    }

    fn voices(&self) -> Result<Vec<Voice>> {
        let mut cmd = Command::new(&self.espeak_path);
        cmd.arg("--voices");

        let output = run_with_input(cmd, "")?;
        let voices = Self::parse_voices(&String::from_utf8_lossy(&output.stdout));
        debug!("espeak-ng reports {} voices", voices.len());
        Ok(voices)
    }

    fn synthesize_to_file(&self, text: &str, voice_id: &str, path: &Path) -> Result<()> {
        let mut cmd = Command::new(&self.espeak_path);
        cmd.arg("-v").arg(voice_id);
        cmd.arg("-b").arg("1"); // UTF-8 input
        cmd.arg("-w").arg(path);
        cmd.arg("--stdin");

        run_with_input(cmd, text)?;
        Ok(())
    }
}
