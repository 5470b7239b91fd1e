//! Announcer - scheduled text-to-speech announcements
//!
//! Schedules a spoken announcement for a wall-clock time or after a
//! countdown, with voice and output device selection and reusable
//! announcement templates.

pub mod audio;
pub mod clipboard;
pub mod error;
pub mod platform;
pub mod playback;
pub mod schedule;
pub mod speech;
pub mod state;
pub mod ui;

pub use error::{AnnouncerError, Result};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const APP_NAME: &str = "announcer";
