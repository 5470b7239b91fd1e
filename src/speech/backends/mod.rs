//! Platform-specific speech backends

use crate::{AnnouncerError, Result};
use log::debug;
use std::io::Write;
use std::process::{Command, Output, Stdio};

// espeak-ng, available on most Linux systems
pub mod espeak;

// macOS `say`
pub mod say;

// Windows SAPI through PowerShell, for WSL
pub mod sapi;

/// Find the first program in `candidates` that runs successfully with `check_args`
pub(crate) fn find_program(candidates: &[&str], check_args: &[&str]) -> Option<String> {
    for path in candidates {
        if let Ok(status) = Command::new(path)
            .args(check_args)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
        {
            if status.success() {
                return Some(path.to_string());
            }
        }
    }
    None
}

/// Run `cmd`, feeding `input` on stdin, and require a successful exit
///
/// Text goes through stdin so announcement scripts never need shell quoting.
pub(crate) fn run_with_input(mut cmd: Command, input: &str) -> Result<Output> {
    debug!("Running {:?}", cmd);

    let mut child = cmd
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| AnnouncerError::Speech(format!("Failed to start {:?}: {}", cmd.get_program(), e)))?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(input.as_bytes())?;
        // stdin is closed when dropped here so the program sees EOF
    }

    let output = child.wait_with_output()?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(AnnouncerError::Speech(format!(
            "{:?} exited with {}: {}",
            cmd.get_program(),
            output.status,
            stderr.trim()
        )));
    }

    Ok(output)
}
