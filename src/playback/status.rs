//! Status line shared by the event loop and playback workers

use std::fmt;
use std::sync::Mutex;

/// Visual state of the status line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusTone {
    Idle,
    Armed,
    Playing,
    Error,
}

/// Text and tone shown on the status line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub text: String,
    pub tone: StatusTone,
}

impl Status {
    pub fn new(text: impl Into<String>, tone: StatusTone) -> Self {
        Self {
            text: text.into(),
            tone,
        }
    }

    pub fn idle(text: impl Into<String>) -> Self {
        Self::new(text, StatusTone::Idle)
    }

    pub fn armed(text: impl Into<String>) -> Self {
        Self::new(text, StatusTone::Armed)
    }

    pub fn playing(text: impl Into<String>) -> Self {
        Self::new(text, StatusTone::Playing)
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::new(text, StatusTone::Error)
    }
}

impl Default for Status {
    fn default() -> Self {
        Status::idle("Waiting...")
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}

/// Receiver of status updates
///
/// Called from worker threads; implementations that drive a front end must
/// hand the update over to its event loop rather than touch it directly.
pub trait StatusReporter: Send + Sync {
    fn report(&self, status: Status);
}

/// Status reporter that keeps the latest update
#[derive(Debug, Default)]
pub struct StatusLine {
    current: Mutex<Status>,
}

impl StatusLine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Status {
        self.current
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl StatusReporter for StatusLine {
    fn report(&self, status: Status) {
        *self
            .current
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = status;
    }
}
