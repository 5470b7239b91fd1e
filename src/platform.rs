//! Platform detection utilities

use crate::{AnnouncerError, Result};
use log::debug;
use once_cell::sync::Lazy;
use std::fs;
use std::path::Path;
use std::process::Command;

static IS_WSL: Lazy<bool> = Lazy::new(detect_wsl);

/// Detect if running in WSL (Windows Subsystem for Linux)
///
/// Checks for WSL-specific indicators in /proc/version and environment variables.
/// The answer is computed once per process.
pub fn is_wsl() -> bool {
    *IS_WSL
}

fn detect_wsl() -> bool {
    // Check for WSL-specific indicators in /proc/version
    if let Ok(contents) = fs::read_to_string("/proc/version") {
        let lower = contents.to_lowercase();
        if lower.contains("microsoft") || lower.contains("wsl") {
            return true;
        }
    }

    // Check for WSL environment variable
    std::env::var("WSL_DISTRO_NAME").is_ok()
}

/// Translate a Linux path into the form Windows tools expect
///
/// On WSL this shells out to `wslpath -w`; elsewhere the path is returned as is.
pub fn windows_path(path: &Path) -> Result<String> {
    if !is_wsl() {
        return Ok(path.to_string_lossy().into_owned());
    }

    let output = Command::new("wslpath")
        .arg("-w")
        .arg(path)
        .output()
        .map_err(|e| AnnouncerError::Other(format!("Failed to run wslpath: {}", e)))?;

    if !output.status.success() {
        return Err(AnnouncerError::Other(format!(
            "wslpath could not translate {}",
            path.display()
        )));
    }

    let translated = String::from_utf8(output.stdout)?.trim().to_string();
    debug!("Translated {} to {}", path.display(), translated);
    Ok(translated)
}
