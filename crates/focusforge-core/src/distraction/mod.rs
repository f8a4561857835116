//! Distraction signal consumed by the scheduler.
//!
//! Producers (an activity monitor thread, a UI hook) increment a counter;
//! the scheduler drains it once per decision with
//! [`DistractionSignal::reset_distractions`].

mod feed;

pub use feed::{
    ActivityFeed, DistractionEvent, DistractionKind, DistractionSummary, WindowClass,
    WindowObservation,
};

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Reset-on-read distraction count.
pub trait DistractionSignal: Send + Sync {
    /// Return the accumulated count and zero it atomically.
    fn reset_distractions(&self) -> u32;
}

impl<T: DistractionSignal + ?Sized> DistractionSignal for Arc<T> {
    fn reset_distractions(&self) -> u32 {
        (**self).reset_distractions()
    }
}

/// Lock-free counter safe to share between a monitor and the scheduler.
#[derive(Debug, Default)]
pub struct DistractionCounter {
    count: AtomicU32,
}

impl DistractionCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self) {
        self.record_many(1);
    }

    /// Saturates at `u32::MAX`.
    pub fn record_many(&self, events: u32) {
        let _ = self
            .count
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                Some(n.saturating_add(events))
            });
    }

    /// Current count without consuming it.
    pub fn peek(&self) -> u32 {
        self.count.load(Ordering::Acquire)
    }
}

impl DistractionSignal for DistractionCounter {
    fn reset_distractions(&self) -> u32 {
        self.count.swap(0, Ordering::AcqRel)
    }
}

/// Signal that never reports distractions.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSignal;

impl DistractionSignal for NullSignal {
    fn reset_distractions(&self) -> u32 {
        0
    }
}
