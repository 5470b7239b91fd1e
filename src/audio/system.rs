//! System default playback
//!
//! Hands the file to whatever command-line player the platform provides.
//! Stopping kills the player process.

use super::FallbackAudio;
use crate::platform::{is_wsl, windows_path};
use crate::playback::CancelToken;
use crate::{AnnouncerError, Result};
use log::{debug, info};
use std::env;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::Duration;

/// How often a running player is checked for exit or cancellation
const CANCEL_POLL: Duration = Duration::from_millis(50);

/// Native players tried in order when none is configured
const CANDIDATES: &[&str] = &["paplay", "pw-play", "aplay", "afplay"];

/// How the player is invoked
#[derive(Debug, Clone, PartialEq, Eq)]
enum PlayerCommand {
    /// `program args... <file>`
    Program { program: String, args: Vec<String> },

    /// Windows Media.SoundPlayer through PowerShell (WSL)
    WindowsSoundPlayer { powershell: String },
}

/// Platform default player
pub struct SystemPlayer {
    command: Option<PlayerCommand>,
}

impl SystemPlayer {
    /// Pick a player
    ///
    /// A configured command wins; otherwise the first known player found on
    /// `PATH`. Finding none is not an error here: playback requests fail
    /// later with a message instead.
    pub fn detect(configured: Option<&str>) -> Self {
        let command = configured
            .and_then(Self::parse_command)
            .or_else(Self::find_native_player)
            .or_else(|| {
                if is_wsl() {
                    find_in_path("powershell.exe")
                        .map(|powershell| PlayerCommand::WindowsSoundPlayer { powershell })
                } else {
                    None
                }
            });

        match &command {
            Some(cmd) => info!("System player: {:?}", cmd),
            None => info!("No system player found"),
        }

        Self { command }
    }

    /// Describe the chosen player for status output
    pub fn describe(&self) -> String {
        match &self.command {
            Some(PlayerCommand::Program { program, .. }) => program.clone(),
            Some(PlayerCommand::WindowsSoundPlayer { .. }) => "Windows SoundPlayer".to_string(),
            None => "none".to_string(),
        }
    }

    fn parse_command(configured: &str) -> Option<PlayerCommand> {
        let mut parts = configured.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(PlayerCommand::Program {
            program,
            args: parts.collect(),
        })
    }

    fn find_native_player() -> Option<PlayerCommand> {
        CANDIDATES.iter().find_map(|name| {
            find_in_path(name).map(|program| PlayerCommand::Program {
                program,
                args: Vec::new(),
            })
        })
    }

    fn spawn(command: &PlayerCommand, path: &Path) -> Result<Child> {
        let mut cmd = match command {
            PlayerCommand::Program { program, args } => {
                let mut cmd = Command::new(program);
                cmd.args(args).arg(path);
                cmd
            }
            PlayerCommand::WindowsSoundPlayer { powershell } => {
                let target = windows_path(path)?.replace('\'', "''");
                let mut cmd = Command::new(powershell);
                cmd.arg("-NoProfile")
                    .arg("-NonInteractive")
                    .arg("-Command")
                    .arg(format!("(New-Object Media.SoundPlayer '{}').PlaySync()", target));
                cmd
            }
        };

        cmd.stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| AnnouncerError::Audio(format!("Failed to start player: {}", e)))
    }
}

impl FallbackAudio for SystemPlayer {
    fn play_file(&self, path: &Path, cancel: &CancelToken) -> Result<()> {
        let command = self.command.as_ref().ok_or_else(|| {
            AnnouncerError::Audio(format!(
                "No system audio player found (tried {}); set [audio] fallback_player",
                CANDIDATES.join(", ")
            ))
        })?;

        let mut child = Self::spawn(command, path)?;
        debug!("Player started with PID {}", child.id());

        loop {
            if cancel.is_cancelled() {
                debug!("Killing player process");
                if let Err(e) = child.kill() {
                    debug!("Failed to kill player process: {}", e);
                }
                let _ = child.wait(); // Clean up zombie
                return Ok(());
            }

            if let Some(status) = child.try_wait()? {
                if status.success() {
                    return Ok(());
                }
                return Err(AnnouncerError::Audio(format!("Player exited with {}", status)));
            }

            thread::sleep(CANCEL_POLL);
        }
    }
}

/// Locate `name` on `PATH`
fn find_in_path(name: &str) -> Option<String> {
    let paths = env::var_os("PATH")?;
    env::split_paths(&paths)
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
        .map(|found| found.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configured_command_wins() {
        let player = SystemPlayer::detect(Some("mpv --really-quiet"));
        assert_eq!(
            player.command,
            Some(PlayerCommand::Program {
                program: "mpv".to_string(),
                args: vec!["--really-quiet".to_string()],
            })
        );
        assert_eq!(player.describe(), "mpv");
    }

    #[test]
    fn test_blank_configured_command_ignored() {
        assert_eq!(SystemPlayer::parse_command("   "), None);
    }

    #[test]
    fn test_missing_player_reports_error() {
        let player = SystemPlayer { command: None };
        let err = player
            .play_file(Path::new("/nonexistent.wav"), &CancelToken::new())
            .unwrap_err();
        assert!(matches!(err, AnnouncerError::Audio(_)));
    }

    #[test]
    fn test_failing_player_reports_exit() {
        if find_in_path("false").is_none() {
            return;
        }
        let player = SystemPlayer::detect(Some("false"));
        let result = player.play_file(Path::new("/nonexistent.wav"), &CancelToken::new());
        assert!(result.is_err());
    }

    #[test]
    fn test_cancel_kills_player() {
        if find_in_path("sleep").is_none() {
            return;
        }
        // The "file" argument doubles as the sleep duration
        let player = SystemPlayer::detect(Some("sleep"));
        let cancel = CancelToken::new();
        cancel.cancel();
        assert!(player.play_file(Path::new("30"), &cancel).is_ok());
    }
}
