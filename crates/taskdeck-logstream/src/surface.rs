//! Render surface seam and scroll-position tracking.

use crate::buffer::LogRecord;
use crate::lifecycle::StreamState;
use crate::protocol::TaskId;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Rendering callbacks the embedding console implements.
///
/// Streaming callbacks (`set_status`, `append_record`, `evict_oldest`,
/// `scroll_to_tail`) come from the session driver task and never overlap
/// one another; `initialize` and `clear_records` run in the caller's context
/// during `attach`/`clear`. After `detach` returns, no further call is made.
pub trait LogSurface: Send + Sync {
    /// Reset the pane for a task: header, empty record region, status region.
    fn initialize(&self, task_id: TaskId);

    /// Update the connection status indicator.
    fn set_status(&self, status: StreamState);

    /// Append one record at the tail of the record region.
    fn append_record(&self, record: &LogRecord);

    /// Drop the oldest rendered record. Paired with buffer eviction.
    fn evict_oldest(&self);

    /// Snap the viewport to the newest record.
    fn scroll_to_tail(&self);

    /// Empty the record region. Status and header stay.
    fn clear_records(&self);
}

/// Viewport geometry reported by the embedder on scroll, in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollMetrics {
    pub scroll_top: f32,
    pub content_height: f32,
    pub viewport_height: f32,
}

impl ScrollMetrics {
    /// Distance between the bottom of the viewport and the bottom of the
    /// content. Negative when the content is shorter than the viewport.
    pub fn distance_from_tail(&self) -> f32 {
        self.content_height - self.scroll_top - self.viewport_height
    }
}

/// Tracks whether the operator has scrolled up into history.
///
/// While the flag is set, appends stop forcing the viewport to the tail;
/// scrolling back within the threshold re-arms auto-follow on the next
/// append. Reads and writes are lock-free so the embedder can call
/// `observe` from its scroll handler without touching the async session.
#[derive(Debug, Clone)]
pub struct ScrollTracker {
    viewing_history: Arc<AtomicBool>,
    threshold_px: f32,
}

impl ScrollTracker {
    pub fn new(threshold_px: f32) -> Self {
        Self {
            viewing_history: Arc::new(AtomicBool::new(false)),
            threshold_px,
        }
    }

    /// Recompute the viewing-history flag from fresh geometry. Returns the
    /// new flag value.
    pub fn observe(&self, metrics: ScrollMetrics) -> bool {
        let viewing = metrics.distance_from_tail() > self.threshold_px;
        self.viewing_history.store(viewing, Ordering::SeqCst);
        viewing
    }

    pub fn is_viewing_history(&self) -> bool {
        self.viewing_history.load(Ordering::SeqCst)
    }

    /// Back to tail-following. Used when a fresh pane is attached.
    pub fn reset(&self) {
        self.viewing_history.store(false, Ordering::SeqCst);
    }
}
