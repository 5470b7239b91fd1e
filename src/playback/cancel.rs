//! Cooperative cancellation for playback workers

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Cancellation token checked by playback loops
///
/// A token is cancelled either directly, through [`CancelToken::cancel`], or
/// when the stop generation it was created under moves on. The latter is how
/// one `stop()` reaches every playback started before it.
#[derive(Debug, Clone)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
    generation: Arc<AtomicU64>,
    started: u64,
}

impl CancelToken {
    /// A standalone token, only cancelled through [`CancelToken::cancel`]
    pub fn new() -> Self {
        Self::under(&Arc::new(AtomicU64::new(0)))
    }

    /// A token that is also cancelled once `generation` changes
    pub(crate) fn under(generation: &Arc<AtomicU64>) -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            generation: Arc::clone(generation),
            started: generation.load(Ordering::SeqCst),
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
            || self.generation.load(Ordering::SeqCst) != self.started
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}
