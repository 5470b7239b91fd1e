//! Console commands
//!
//! Each command stands for one control of the announcer window: a field,
//! a selector, the mode switch or a button.

use crate::schedule::Countdown;
use crate::state::ModeKind;
use crate::{AnnouncerError, Result};
use chrono::NaiveTime;

/// A parsed console command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    /// Show the status line and every field
    Status,

    // Fields
    Title(String),
    Script(String),
    /// Script from the clipboard
    Paste,

    // Selectors (1-based)
    Voices,
    Voice(usize),
    Devices,
    Device(usize),

    // Schedule entry
    Mode(ModeKind),
    Time(NaiveTime),
    Timer(Countdown),

    // Buttons
    PreviewVoice,
    PreviewScript,
    Start,
    Stop,
    Save,
    Delete,

    // Template picker (slot 0 clears the selection)
    Templates,
    Pick(usize),

    Quit,
}

/// Usage text, one command per line
pub const HELP: &str = "\
Fields:
  title <text>          set the template title
  script <text>         set the announcement script
  paste                 set the script from the clipboard
Voice and output:
  voices | voice <n>    list voices / select voice n
  devices | device <n>  list output devices / select device n
Schedule:
  mode time|timer       choose wall-clock time or countdown
  time HH:MM[:SS]       broadcast time
  timer <h> <m> <s>     countdown (also H:MM:SS)
  start                 schedule the broadcast
  stop                  cancel the schedule and stop playback
Preview:
  preview-voice (pv)    speak a test sentence with the voice
  preview (ps)          speak the script
Templates:
  templates             list saved templates
  pick <n>              load template n (0 clears the selection)
  save                  save title and script as a template
  delete                delete the picked template
Other:
  status | help | quit";

fn invalid(msg: impl Into<String>) -> AnnouncerError {
    AnnouncerError::Validation(msg.into())
}

fn parse_index(arg: &str, what: &str) -> Result<usize> {
    arg.trim()
        .parse::<usize>()
        .map_err(|_| invalid(format!("Expected a {} number, got '{}'", what, arg.trim())))
}

fn parse_selector(arg: &str, what: &str) -> Result<usize> {
    match parse_index(arg, what)? {
        0 => Err(invalid(format!("{} numbers start at 1", what))),
        n => Ok(n),
    }
}

/// Parse `HH:MM` or `HH:MM:SS`
pub fn parse_time(arg: &str) -> Result<NaiveTime> {
    let arg = arg.trim();
    NaiveTime::parse_from_str(arg, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(arg, "%H:%M"))
        .map_err(|_| invalid(format!("Expected a time like 14:30 or 14:30:15, got '{}'", arg)))
}

/// Parse `<h> <m> <s>` or `H:MM:SS`
pub fn parse_countdown(arg: &str) -> Result<Countdown> {
    let arg = arg.trim();
    let parts: Vec<&str> = if arg.contains(':') {
        arg.split(':').collect()
    } else {
        arg.split_whitespace().collect()
    };

    if parts.len() != 3 {
        return Err(invalid(format!(
            "Expected hours, minutes and seconds, got '{}'",
            arg
        )));
    }

    let mut values = [0u32; 3];
    for (value, part) in values.iter_mut().zip(&parts) {
        *value = part
            .trim()
            .parse()
            .map_err(|_| invalid(format!("'{}' is not a whole number", part.trim())))?;
    }

    Ok(Countdown::new(values[0], values[1], values[2]))
}

/// Parse one input line
///
/// Blank lines parse to `None`.
pub fn parse_command(line: &str) -> Result<Option<Command>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };

    let command = match verb.to_lowercase().as_str() {
        "help" | "?" => Command::Help,
        "status" | "show" => Command::Status,
        "title" => Command::Title(rest.to_string()),
        "script" => Command::Script(rest.to_string()),
        "paste" => Command::Paste,
        "voices" => Command::Voices,
        "voice" => Command::Voice(parse_selector(rest, "voice")?),
        "devices" => Command::Devices,
        "device" => Command::Device(parse_selector(rest, "device")?),
        "mode" => match rest.to_lowercase().as_str() {
            "time" | "at" => Command::Mode(ModeKind::Time),
            "timer" | "countdown" => Command::Mode(ModeKind::Timer),
            other => return Err(invalid(format!("Unknown mode '{}' (time or timer)", other))),
        },
        "time" | "at" => Command::Time(parse_time(rest)?),
        "timer" | "countdown" => Command::Timer(parse_countdown(rest)?),
        "preview-voice" | "pv" => Command::PreviewVoice,
        "preview" | "preview-script" | "ps" => Command::PreviewScript,
        "start" | "schedule" => Command::Start,
        "stop" | "cancel" => Command::Stop,
        "save" => Command::Save,
        "delete" | "del" => Command::Delete,
        "templates" | "list" => Command::Templates,
        "pick" | "load" => Command::Pick(parse_index(rest, "template")?),
        "quit" | "exit" | "q" => Command::Quit,
        other => return Err(invalid(format!("Unknown command '{}' (try help)", other))),
    };

    Ok(Some(command))
}
