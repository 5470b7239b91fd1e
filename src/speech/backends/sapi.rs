//! Windows SAPI backend (System.Speech.Synthesis)
//!
//! This backend is primarily designed for WSL, where Windows voices can be
//! reached through PowerShell. Each request runs a short PowerShell script;
//! the announcement text is passed on stdin.

use super::{find_program, run_with_input};
use crate::platform::windows_path;
use crate::speech::{SpeechEngine, Voice};
use crate::{AnnouncerError, Result};
use log::debug;
use std::path::Path;
use std::process::Command;

const LIST_VOICES: &str = r#"
[Console]::OutputEncoding = [Text.Encoding]::UTF8
Add-Type -AssemblyName System.Speech
$synth = New-Object System.Speech.Synthesis.SpeechSynthesizer
foreach ($v in $synth.GetInstalledVoices()) {
    $info = $v.VoiceInfo
    "{0}`t{1}" -f $info.Name, $info.Culture.Name
}
"#;

/// Windows SAPI engine for WSL
pub struct SapiEngine {
    /// Path to powershell.exe
    powershell_path: String,
}

impl SapiEngine {
    /// Create a new Windows SAPI engine
    ///
    /// Verifies PowerShell is reachable and System.Speech loads
    pub fn new() -> Result<Self> {
        debug!("Creating Windows SAPI engine");

        let powershell_path = find_program(
            &[
                "powershell.exe",
                "/mnt/c/Windows/System32/WindowsPowerShell/v1.0/powershell.exe",
            ],
            &["-NoProfile", "-NonInteractive", "-Command", "Add-Type -AssemblyName System.Speech"],
        )
        .ok_or_else(|| {
            AnnouncerError::Speech(
                "PowerShell with System.Speech not found. WSL interop may not be enabled.".to_string(),
            )
        })?;
        debug!("Found PowerShell at: {}", powershell_path);

        Ok(Self { powershell_path })
    }

    fn command(&self, script: &str) -> Command {
        let mut cmd = Command::new(&self.powershell_path);
        cmd.arg("-NoProfile")
            .arg("-NonInteractive")
            .arg("-Command")
            .arg(script);
        cmd
    }

    /// Quote a value as a PowerShell single-quoted string
    fn quote(value: &str) -> String {
        format!("'{}'", value.replace('\'', "''"))
    }

    fn synthesize_script(voice: &str, path: &str) -> String {
        format!(
            "[Console]::InputEncoding = [Text.Encoding]::UTF8\n\
             Add-Type -AssemblyName System.Speech\n\
             $synth = New-Object System.Speech.Synthesis.SpeechSynthesizer\n\
             $synth.SelectVoice({})\n\
             $synth.SetOutputToWaveFile({})\n\
             $synth.Speak([Console]::In.ReadToEnd())\n\
             $synth.Dispose()\n",
            Self::quote(voice),
            Self::quote(path)
        )
    }

    /// Parse `name<TAB>culture` lines
    fn parse_voices(listing: &str) -> Vec<Voice> {
        listing
            .lines()
            .filter_map(|line| {
                let (name, culture) = line.trim_end_matches('\r').split_once('\t')?;
                if name.is_empty() {
                    return None;
                }
                Some(Voice {
                    id: name.to_string(),
                    name: name.to_string(),
                    languages: vec![culture.to_string()],
                })
            })
            .collect()
    }
}

impl SpeechEngine for SapiEngine {
    fn name(&self) -> &'static str {
        "sapi"
    }

    fn voices(&self) -> Result<Vec<Voice>> {
        let output = run_with_input(self.command(LIST_VOICES), "")?;
        Ok(Self::parse_voices(&String::from_utf8_lossy(&output.stdout)))
    }

    fn synthesize_to_file(&self, text: &str, voice_id: &str, path: &Path) -> Result<()> {
        let target = windows_path(path)?;
        let script = Self::synthesize_script(voice_id, &target);

        // Keep each announcement on stdin as a single block of text
        let text = text.replace('\r', "");
        run_with_input(self.command(&script), &text)?;
        Ok(())
    }
}
