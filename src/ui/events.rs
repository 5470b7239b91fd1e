//! Event plumbing between worker threads and the event loop
//!
//! Playback workers and the stdin reader never touch the console state
//! directly. They queue an event and wake the loop's `mio::Poll`.

use crate::playback::{Status, StatusReporter};
use log::{debug, warn};
use mio::Waker;
use std::io::{self, BufRead};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

/// Something for the event loop to handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    /// One line of user input, without the newline
    Line(String),
    /// Input is closed
    Eof,
    /// New status line contents
    Status(Status),
}

/// Sending half of the event loop's queue
#[derive(Clone)]
pub struct EventQueue {
    tx: Arc<Mutex<Sender<UiEvent>>>,
    waker: Arc<Waker>,
}

impl EventQueue {
    pub fn new(tx: Sender<UiEvent>, waker: Arc<Waker>) -> Self {
        Self {
            tx: Arc::new(Mutex::new(tx)),
            waker,
        }
    }

    /// Queue `event` and wake the loop
    ///
    /// Returns false once the loop has gone away.
    pub fn send(&self, event: UiEvent) -> bool {
        let sent = self
            .tx
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .send(event)
            .is_ok();

        if sent {
            if let Err(e) = self.waker.wake() {
                warn!("Failed to wake event loop: {}", e);
            }
        }
        sent
    }
}

/// Status reporter that hands updates to the event loop
pub struct ChannelStatus {
    queue: EventQueue,
}

impl ChannelStatus {
    pub fn new(queue: EventQueue) -> Self {
        Self { queue }
    }
}

impl StatusReporter for ChannelStatus {
    fn report(&self, status: Status) {
        if !self.queue.send(UiEvent::Status(status)) {
            debug!("Status update dropped, event loop gone");
        }
    }
}

/// Read stdin line by line on a background thread
///
/// epoll refuses regular files and WSL terminals, so input is read with
/// blocking calls here instead of being registered with the poll.
pub fn spawn_line_reader(queue: EventQueue) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("announcer-input".to_string())
        .spawn(move || {
            let stdin = io::stdin();
            let mut lock = stdin.lock();
            let mut line = String::new();

            loop {
                line.clear();
                match lock.read_line(&mut line) {
                    Ok(0) => break,
                    Ok(_) => {
                        let text = line.trim_end_matches(['\n', '\r']).to_string();
                        if !queue.send(UiEvent::Line(text)) {
                            return;
                        }
                    }
                    Err(e) => {
                        warn!("stdin error: {}", e);
                        break;
                    }
                }
            }

            queue.send(UiEvent::Eof);
        })
}
