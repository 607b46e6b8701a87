//! Run-level counters shared by the generator and export tasks

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Counters for one run. Cheap to update from either task.
#[derive(Debug, Default)]
pub struct RunMetrics {
    start: Mutex<Option<DateTime<Utc>>>,
    end: Mutex<Option<DateTime<Utc>>>,
    batches: AtomicU64,
    elements: AtomicU64,
    bytes: AtomicU64,
}

/// Shared handle to [`RunMetrics`]
pub type SharedMetrics = Arc<RunMetrics>;

/// Point-in-time copy of [`RunMetrics`], serialized for the run report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub total_batches: u64,
    pub total_elements: u64,
    pub total_bytes: u64,
}

impl RunMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_start(&self, at: DateTime<Utc>) {
        *self.start.lock().unwrap_or_else(|e| e.into_inner()) = Some(at);
    }

    pub fn record_end(&self, at: DateTime<Utc>) {
        *self.end.lock().unwrap_or_else(|e| e.into_inner()) = Some(at);
    }

    /// Called by the generator once per flushed batch
    pub fn record_batch(&self, elements: u64) {
        self.batches.fetch_add(1, Ordering::Relaxed);
        self.elements.fetch_add(elements, Ordering::Relaxed);
    }

    /// Called by the export pipeline after a successful send
    pub fn record_bytes_sent(&self, bytes: u64) {
        self.bytes.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn batches(&self) -> u64 {
        self.batches.load(Ordering::Relaxed)
    }

    pub fn elements(&self) -> u64 {
        self.elements.load(Ordering::Relaxed)
    }

    pub fn bytes_sent(&self) -> u64 {
        self.bytes.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            start_time: *self.start.lock().unwrap_or_else(|e| e.into_inner()),
            end_time: *self.end.lock().unwrap_or_else(|e| e.into_inner()),
            total_batches: self.batches(),
            total_elements: self.elements(),
            total_bytes: self.bytes_sent(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.snapshot())
    }
}
