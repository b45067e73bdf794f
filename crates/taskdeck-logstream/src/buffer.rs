//! Bounded render buffer for received log records.

use crate::protocol::LogLevel;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Mutex;

/// One rendered log record. The timestamp is taken at receipt; the feed does
/// not carry one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogRecord {
    pub level: LogLevel,
    pub message: String,
    pub received_at: DateTime<Local>,
    pub extra: Map<String, Value>,
}

impl LogRecord {
    pub fn new(level: LogLevel, message: impl Into<String>, extra: Map<String, Value>) -> Self {
        Self {
            level,
            message: message.into(),
            received_at: Local::now(),
            extra,
        }
    }
}

/// FIFO buffer of the most recent records, bounded at a fixed capacity.
///
/// Appends go to the tail; once the capacity is exceeded the oldest record is
/// evicted in the same call, so the length never observes a value above the
/// capacity.
#[derive(Debug, Clone)]
pub struct LogBuffer {
    records: Arc<Mutex<VecDeque<LogRecord>>>,
    capacity: usize,
}

impl LogBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            records: Arc::new(Mutex::new(VecDeque::with_capacity(capacity.min(1_024)))),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append a record, evicting the oldest one when the capacity is
    /// exceeded. Returns `true` when an eviction happened.
    pub async fn push(&self, record: LogRecord) -> bool {
        let mut records = self.records.lock().await;
        records.push_back(record);
        if records.len() > self.capacity {
            records.pop_front();
            true
        } else {
            false
        }
    }

    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }

    pub async fn clear(&self) {
        self.records.lock().await.clear();
    }

    /// Copy of the buffered records, oldest first.
    pub async fn snapshot(&self) -> Vec<LogRecord> {
        self.records.lock().await.iter().cloned().collect()
    }
}
