//! Command shell
//!
//! Applies console commands to the application state and renders replies.
//! Mistakes in user input are printed and never end the session.

use super::command::{parse_command, Command, HELP};
use crate::clipboard::script_from_clipboard;
use crate::playback::{Status, StatusTone};
use crate::schedule::{Clock, ScheduleState};
use crate::state::{AppState, ModeKind};
use crate::Result;
use log::debug;
use std::io::Write;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Columns used for titles in the template list
const TITLE_COLUMNS: usize = 24;

/// Columns used for the script preview in the template list
const PREVIEW_COLUMNS: usize = 40;

/// What the event loop should do after a line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellAction {
    Continue,
    Quit,
}

/// Console shell state
pub struct Shell {
    /// Colour output and prompts (stdin is a terminal)
    interactive: bool,

    /// A delete is waiting for y/n
    pending_delete: bool,
}

impl Shell {
    pub fn new(interactive: bool) -> Self {
        Self {
            interactive,
            pending_delete: false,
        }
    }

    /// Print the startup banner and any degraded-mode warnings
    pub fn greet<C: Clock>(&self, state: &AppState<C>, out: &mut dyn Write) -> Result<()> {
        writeln!(out, "Announcer {} ready", crate::VERSION)?;
        writeln!(out, "Configuration: {}", state.config.path().display())?;
        writeln!(
            out,
            "Speech engine: {} ({} voices)",
            state.player().engine_name(),
            state.voices().len()
        )?;
        writeln!(
            out,
            "Templates: {} in {}",
            state.templates.len(),
            state.templates.path().display()
        )?;
        for warning in state.warnings() {
            writeln!(out, "⚠ {}", warning)?;
        }
        writeln!(out, "Type 'help' for commands")?;
        self.prompt(out)
    }

    fn prompt(&self, out: &mut dyn Write) -> Result<()> {
        if self.interactive {
            write!(out, "> ")?;
        }
        out.flush()?;
        Ok(())
    }

    /// Render a status update on its own line
    pub fn show_status(&self, status: &Status, out: &mut dyn Write) -> Result<()> {
        writeln!(out, "{}", self.render_status(status))?;
        self.prompt(out)
    }

    fn render_status(&self, status: &Status) -> String {
        if !self.interactive {
            return format!("[{}]", status.text);
        }
        let colour = match status.tone {
            StatusTone::Playing => "\x1b[1;32m",
            StatusTone::Armed => "\x1b[33m",
            StatusTone::Error => "\x1b[31m",
            StatusTone::Idle => "\x1b[35m",
        };
        format!("{}[{}]\x1b[0m", colour, status.text)
    }

    /// Handle one line of input
    pub fn handle_line<C: Clock>(
        &mut self,
        state: &mut AppState<C>,
        line: &str,
        out: &mut dyn Write,
    ) -> Result<ShellAction> {
        if self.pending_delete {
            self.pending_delete = false;
            self.confirm_delete(state, line, out)?;
            self.prompt(out)?;
            return Ok(ShellAction::Continue);
        }

        let action = match parse_command(line) {
            Ok(Some(command)) => {
                debug!("Command: {:?}", command);
                match self.apply(state, command, out) {
                    Ok(action) => action,
                    Err(e) => {
                        writeln!(out, "⚠ {}", e)?;
                        ShellAction::Continue
                    }
                }
            }
            Ok(None) => ShellAction::Continue,
            Err(e) => {
                writeln!(out, "⚠ {}", e)?;
                ShellAction::Continue
            }
        };

        if action == ShellAction::Continue {
            self.prompt(out)?;
        }
        Ok(action)
    }

    fn apply<C: Clock>(
        &mut self,
        state: &mut AppState<C>,
        command: Command,
        out: &mut dyn Write,
    ) -> Result<ShellAction> {
        match command {
            Command::Help => writeln!(out, "{}", HELP)?,
            Command::Status => self.show_fields(state, out)?,

            Command::Title(title) => {
                state.fields.title = title;
            }
            Command::Script(script) => {
                state.fields.script = script;
            }
            Command::Paste => {
                let text = script_from_clipboard()?;
                writeln!(out, "Script set from clipboard ({} characters)", text.chars().count())?;
                state.fields.script = text;
            }

            Command::Voices => {
                if state.voices().is_empty() {
                    writeln!(out, "No voices available")?;
                }
                for (idx, voice) in state.voices().iter().enumerate() {
                    let marker = if state.selected_voice_index() == Some(idx) { "*" } else { " " };
                    writeln!(out, "{} {:>3}. {}", marker, idx + 1, voice)?;
                }
            }
            Command::Voice(n) => {
                state.select_voice(n - 1)?;
                if let Some(voice) = state.selected_voice() {
                    writeln!(out, "Voice: {}", voice)?;
                }
            }
            Command::Devices => {
                for device in state.devices() {
                    let marker = if state.selected_device_index() == device.display_index {
                        "*"
                    } else {
                        " "
                    };
                    writeln!(out, "{} {:>3}. {}", marker, device.display_index + 1, device)?;
                }
            }
            Command::Device(n) => {
                state.select_device(n - 1)?;
                if let Some(device) = state.selected_device() {
                    writeln!(out, "Output: {}", device)?;
                }
            }

            Command::Mode(mode) => {
                state.fields.mode = mode;
            }
            Command::Time(time) => {
                state.fields.at_time = time;
                state.fields.mode = ModeKind::Time;
            }
            Command::Timer(countdown) => {
                state.fields.countdown = countdown;
                state.fields.mode = ModeKind::Timer;
            }

            Command::PreviewVoice => state.preview_voice()?,
            Command::PreviewScript => state.preview_script()?,
            Command::Start => {
                if state.start_schedule()?.is_none() {
                    writeln!(out, "A broadcast is already scheduled")?;
                }
            }
            Command::Stop => state.stop(),

            Command::Save => {
                let slot = state.save_template()?;
                writeln!(out, "Saved as template {}", slot)?;
            }
            Command::Delete => {
                let slot = state.fields.template_slot;
                if let Some(template) = state.templates.get(slot) {
                    writeln!(out, "Really delete '{}'? (y/n)", template.title)?;
                    self.pending_delete = true;
                }
            }
            Command::Templates => self.list_templates(state, out)?,
            Command::Pick(slot) => {
                if let Some(template) = state.pick_template(slot)? {
                    writeln!(out, "Loaded '{}'", template.title)?;
                }
            }

            Command::Quit => return Ok(ShellAction::Quit),
        }

        Ok(ShellAction::Continue)
    }

    fn confirm_delete<C: Clock>(
        &mut self,
        state: &mut AppState<C>,
        answer: &str,
        out: &mut dyn Write,
    ) -> Result<()> {
        let answer = answer.trim().to_lowercase();
        if answer != "y" && answer != "yes" {
            writeln!(out, "Delete cancelled")?;
            return Ok(());
        }

        match state.delete_template() {
            Ok(Some(template)) => writeln!(out, "Deleted '{}'", template.title)?,
            Ok(None) => {}
            Err(e) => writeln!(out, "⚠ {}", e)?,
        }
        Ok(())
    }

    fn list_templates<C: Clock>(&self, state: &AppState<C>, out: &mut dyn Write) -> Result<()> {
        if state.templates.is_empty() {
            writeln!(out, "No saved templates")?;
            return Ok(());
        }

        for (idx, template) in state.templates.templates().iter().enumerate() {
            let slot = idx + 1;
            let marker = if state.fields.template_slot == slot { "*" } else { " " };
            let preview = template.script.lines().next().unwrap_or_default();
            writeln!(
                out,
                "{} {:>3}. {}  {}",
                marker,
                slot,
                pad_to_width(&truncate_to_width(&template.title, TITLE_COLUMNS), TITLE_COLUMNS),
                truncate_to_width(preview, PREVIEW_COLUMNS)
            )?;
        }
        Ok(())
    }

    fn show_fields<C: Clock>(&self, state: &AppState<C>, out: &mut dyn Write) -> Result<()> {
        let schedule = match state.schedule_state() {
            ScheduleState::Idle => "idle".to_string(),
            ScheduleState::Armed { target } => {
                format!("armed for {}", target.format("%Y-%m-%d %H:%M:%S"))
            }
            ScheduleState::Firing => "firing".to_string(),
        };
        let mode = match state.fields.mode {
            ModeKind::Time => format!("time {}", state.fields.at_time.format("%H:%M:%S")),
            ModeKind::Timer => format!("timer {}", state.fields.countdown),
        };

        writeln!(out, "Schedule: {}", schedule)?;
        writeln!(out, "Mode:     {}", mode)?;
        writeln!(out, "Title:    {}", state.fields.title)?;
        writeln!(out, "Script:   {}", state.fields.script)?;
        match state.selected_voice() {
            Some(voice) => writeln!(out, "Voice:    {}", voice)?,
            None => writeln!(out, "Voice:    none")?,
        }
        if let Some(device) = state.selected_device() {
            writeln!(out, "Output:   {}", device)?;
        }
        match state.templates.get(state.fields.template_slot) {
            Some(template) => writeln!(out, "Template: {}", template.title)?,
            None => writeln!(out, "Template: none")?,
        }
        Ok(())
    }
}

/// Cut `text` to at most `columns` terminal columns
fn truncate_to_width(text: &str, columns: usize) -> String {
    if text.width() <= columns {
        return text.to_string();
    }

    let mut used = 0;
    let mut cut = String::new();
    for ch in text.chars() {
        let w = ch.width().unwrap_or(0);
        if used + w + 1 > columns {
            break;
        }
        used += w;
        cut.push(ch);
    }
    cut.push('…');
    cut
}

/// Pad `text` with spaces to `columns` terminal columns
fn pad_to_width(text: &str, columns: usize) -> String {
    let width = text.width();
    let mut padded = text.to_string();
    padded.extend(std::iter::repeat(' ').take(columns.saturating_sub(width)));
    padded
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wide_characters_truncate_by_columns() {
        // Hangul syllables take two columns each
        let cut = truncate_to_width("점심시간안내방송", 7);
        assert_eq!(cut, "점심시…");
        assert!(cut.width() <= 7);
    }

    #[test]
    fn test_short_text_untouched() {
        assert_eq!(truncate_to_width("Lunch", 10), "Lunch");
    }

    #[test]
    fn test_pad_counts_columns() {
        assert_eq!(pad_to_width("점심", 6), "점심  ");
        assert_eq!(pad_to_width("toolong", 3), "toolong");
    }

    #[test]
    fn test_plain_status_rendering() {
        let shell = Shell::new(false);
        assert_eq!(shell.render_status(&Status::playing("ON AIR")), "[ON AIR]");
    }
}
