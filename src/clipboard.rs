//! Clipboard integration

use crate::{AnnouncerError, Result};
use arboard::Clipboard;
use log::debug;

/// Read an announcement script from the system clipboard
///
/// Windows line endings are normalised and surrounding blank space is
/// dropped. An empty clipboard is a validation error.
pub fn script_from_clipboard() -> Result<String> {
    let mut clipboard = Clipboard::new()
        .map_err(|e| AnnouncerError::Other(format!("Failed to open clipboard: {}", e)))?;

    let text = clipboard
        .get_text()
        .map_err(|e| AnnouncerError::Other(format!("Failed to read clipboard: {}", e)))?;
    debug!("Read {} chars from clipboard", text.len());

    normalize_script(&text)
}

fn normalize_script(text: &str) -> Result<String> {
    let script = text.replace("\r\n", "\n").replace('\r', "\n");
    let script = script.trim();
    if script.is_empty() {
        return Err(AnnouncerError::Validation("The clipboard holds no text".to_string()));
    }
    Ok(script.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_endings_normalised() {
        assert_eq!(
            normalize_script("  First line\r\nSecond line\r\n").unwrap(),
            "First line\nSecond line"
        );
    }

    #[test]
    fn test_blank_clipboard_rejected() {
        assert!(normalize_script(" \r\n\t").unwrap_err().is_validation());
    }
}
