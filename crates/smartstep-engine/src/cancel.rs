//! Cooperative cancellation on resumed or terminated contexts.
//!
//! The execution-control side owns a [`SuspendTracker`] per thread and bumps
//! its generation whenever the thread leaves the suspended state. A
//! resolution captures a [`SuspendToken`] up front and checks it between
//! stages; once the generation moved, any result would describe a frame that
//! no longer exists.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use tracing::debug;

use crate::error::ResolveError;

#[derive(Debug)]
struct TrackerState {
    generation: AtomicU64,
    alive: AtomicBool,
}

/// Shared suspension state of one thread.
#[derive(Debug, Clone)]
pub struct SuspendTracker {
    state: Arc<TrackerState>,
}

impl Default for SuspendTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl SuspendTracker {
    /// Tracker for a live, suspended thread.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(TrackerState {
                generation: AtomicU64::new(0),
                alive: AtomicBool::new(true),
            }),
        }
    }

    /// Capture the current suspension.
    #[must_use]
    pub fn token(&self) -> SuspendToken {
        SuspendToken {
            state: Arc::clone(&self.state),
            generation: self.generation(),
        }
    }

    /// Number of suspend, resume and terminate events seen so far.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.state.generation.load(Ordering::Acquire)
    }

    /// False once the thread or process terminated.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.state.alive.load(Ordering::Acquire)
    }

    /// The thread stopped again; tokens from the previous stop are stale.
    pub fn suspend(&self) {
        self.bump();
    }

    /// The thread resumed.
    pub fn resume(&self) {
        self.bump();
    }

    /// The target process or thread is gone.
    pub fn terminate(&self) {
        self.state.alive.store(false, Ordering::Release);
        self.bump();
    }

    fn bump(&self) {
        self.state.generation.fetch_add(1, Ordering::AcqRel);
    }
}

/// Snapshot of a tracker taken when a resolution starts.
#[derive(Debug, Clone)]
pub struct SuspendToken {
    state: Arc<TrackerState>,
    generation: u64,
}

impl SuspendToken {
    /// Generation captured by this token.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether the context moved on since the token was taken.
    #[must_use]
    pub fn is_stale(&self) -> bool {
        self.check().is_err()
    }

    /// Fail with [`ResolveError::StaleContext`] once the context moved on.
    pub fn check(&self) -> Result<(), ResolveError> {
        let current = self.state.generation.load(Ordering::Acquire);
        if current == self.generation && self.state.alive.load(Ordering::Acquire) {
            return Ok(());
        }
        debug!(
            captured = self.generation,
            current, "suspended context changed, cancelling resolution"
        );
        Err(ResolveError::StaleContext {
            captured: self.generation,
            current,
        })
    }
}
