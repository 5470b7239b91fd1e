//! macOS `say` backend

use super::{find_program, run_with_input};
use crate::speech::{SpeechEngine, Voice};
use crate::{AnnouncerError, Result};
use log::debug;
use std::path::Path;
use std::process::Command;

/// Engine driving the macOS `say` command
pub struct SayEngine {
    say_path: String,
}

impl SayEngine {
    pub fn new() -> Result<Self> {
        debug!("Creating say engine");

        let say_path = find_program(&["say", "/usr/bin/say"], &["-v", "?"])
            .ok_or_else(|| AnnouncerError::Speech("say not found (macOS only)".to_string()))?;

        Ok(Self { say_path })
    }

    /// Parse `say -v ?` output
    ///
    /// Each line is `<name> <locale> # <sample sentence>`, where the name may
    /// contain spaces.
    fn parse_voices(listing: &str) -> Vec<Voice> {
        listing
            .lines()
            .filter_map(|line| {
                let (head, _sample) = line.split_once('#')?;
                let head = head.trim_end();
                let split = head.rfind(char::is_whitespace)?;
                let name = head[..split].trim();
                let locale = head[split..].trim();
                if name.is_empty() || locale.is_empty() {
                    return None;
                }
                Some(Voice {
                    id: name.to_string(),
                    name: name.to_string(),
                    languages: vec![locale.replace('_', "-")],
                })
            })
            .collect()
    }
}

impl SpeechEngine for SayEngine {
    fn name(&self) -> &'static str {
        "say"
    }

    fn voices(&self) -> Result<Vec<Voice>> {
        let mut cmd = Command::new(&self.say_path);
        cmd.arg("-v").arg("?");

        let output = run_with_input(cmd, "")?;
        Ok(Self::parse_voices(&String::from_utf8_lossy(&output.stdout)))
    }

    fn synthesize_to_file(&self, text: &str, voice_id: &str, path: &Path) -> Result<()> {
        let mut cmd = Command::new(&self.say_path);
        cmd.arg("-v").arg(voice_id);
        cmd.arg("--file-format=WAVE");
        cmd.arg("--data-format=LEI16@22050");
        cmd.arg("-o").arg(path);
        cmd.arg("-f").arg("-");

        run_with_input(cmd, text)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_voices() {
        let listing = "\
Alex                en_US    # Most people recognize me by my voice.
Good News           en_US    # Congratulations you just won the sweepstakes
Yuna                ko_KR    # 안녕하세요. 제 이름은 유나입니다.
";
        let voices = SayEngine::parse_voices(listing);
        assert_eq!(voices.len(), 3);
        assert_eq!(voices[1].id, "Good News");
        assert_eq!(voices[2].languages, vec!["ko-KR".to_string()]);
    }

    #[test]
    fn test_parse_voices_skips_garbage() {
        assert!(SayEngine::parse_voices("no marker here\n# only a comment\n").is_empty());
    }
}
