//! Console front end
//!
//! Commands map onto the controls of the announcer window; the shell applies
//! them to `AppState` and renders the results.

pub mod command;
pub mod events;
pub mod shell;

pub use command::{parse_command, Command};
pub use events::{spawn_line_reader, ChannelStatus, EventQueue, UiEvent};
pub use shell::{Shell, ShellAction};
