//! Idle eviction of pooled entries

use crate::metrics::MetricsTracker;
use crate::resource::Close;
use std::collections::VecDeque;
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

/// Metadata for tracking entry lifecycle
#[derive(Debug, Clone, Copy)]
pub(crate) struct EntryMetadata {
    pub created_at: Instant,
    pub last_used: Instant,
}

impl EntryMetadata {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            created_at: now,
            last_used: now,
        }
    }

    pub fn touch(&mut self) {
        self.last_used = Instant::now();
    }

    /// Whether the entry has gone unused for longer than `idle_timeout` as of `now`.
    pub fn is_idle(&self, now: Instant, idle_timeout: Duration) -> bool {
        now.saturating_duration_since(self.last_used) > idle_timeout
    }
}

/// A pooled resource together with its lifecycle metadata
pub(crate) struct Entry<T> {
    pub resource: T,
    pub meta: EntryMetadata,
}

impl<T> Entry<T> {
    pub fn new(resource: T) -> Self {
        Self {
            resource,
            meta: EntryMetadata::new(),
        }
    }
}

/// Remove and close every entry idle for longer than `idle_timeout`.
///
/// Must be called with the store lock held. The surviving entries keep their
/// relative order. Returns the number of entries evicted.
pub(crate) fn sweep_idle<T: Close>(
    entries: &mut VecDeque<Entry<T>>,
    idle_timeout: Duration,
    metrics: &MetricsTracker,
) -> usize {
    let now = Instant::now();
    let (idle, keep): (VecDeque<_>, VecDeque<_>) = entries
        .drain(..)
        .partition(|entry| entry.meta.is_idle(now, idle_timeout));
    *entries = keep;

    let evicted = idle.len();
    for entry in idle {
        tracing::debug!(
            age = ?now.saturating_duration_since(entry.meta.created_at),
            "evicting idle handle"
        );
        close_quietly(entry.resource, metrics);
    }
    metrics.evicted.fetch_add(evicted, Ordering::Relaxed);
    evicted
}

/// Close a resource, logging and counting a failure instead of reporting it.
pub(crate) fn close_quietly<T: Close>(resource: T, metrics: &MetricsTracker) {
    metrics.closed.fetch_add(1, Ordering::Relaxed);
    if let Err(err) = resource.close() {
        metrics.close_failures.fetch_add(1, Ordering::Relaxed);
        tracing::warn!(error = %err, "failed to close pooled handle");
    }
}
