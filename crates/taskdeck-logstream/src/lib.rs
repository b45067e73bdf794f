//! Live log stream client for the Taskdeck admin console.
//!
//! This crate intentionally exposes a small surface:
//! - a reconnecting WebSocket consumer for one task's log feed
//! - a bounded, scroll-aware render buffer behind a surface trait
//! - plain-text export of whatever is currently buffered

pub mod buffer;
pub mod config;
pub mod error;
pub mod export;
pub mod lifecycle;
pub mod protocol;
pub mod session;
pub mod surface;

pub use buffer::{LogBuffer, LogRecord};
pub use config::StreamConfig;
pub use error::{ClientError, Result};
pub use export::{LogExport, render_export};
pub use lifecycle::{ReconnectDecision, ReconnectPlan, StreamLifecycle, StreamState};
pub use protocol::{FeedMessage, HEARTBEAT_PROBE, LogLevel, TaskId, parse_feed_message};
pub use session::LogStreamClient;
pub use surface::{LogSurface, ScrollMetrics, ScrollTracker};
