//! Notifier delivery counters.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Cumulative delivery counters.
#[derive(Debug, Default)]
pub struct NotifierMetrics {
    published: AtomicU64,
    delivered: AtomicU64,
    dropped: AtomicU64,
    pruned: AtomicU64,
}

/// Point-in-time copy of [`NotifierMetrics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotifierMetricsSnapshot {
    /// Changes published.
    pub published: u64,
    /// Per-subscriber deliveries.
    pub delivered: u64,
    /// Deliveries dropped on a full buffer.
    pub dropped: u64,
    /// Subscribers removed after their receiver closed.
    pub pruned: u64,
}

impl NotifierMetrics {
    pub(crate) fn record_published(&self) {
        self.published.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_delivered(&self) {
        self.delivered.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_pruned(&self) {
        self.pruned.fetch_add(1, Ordering::Relaxed);
    }

    /// Read all counters.
    pub fn snapshot(&self) -> NotifierMetricsSnapshot {
        NotifierMetricsSnapshot {
            published: self.published.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            pruned: self.pruned.load(Ordering::Relaxed),
        }
    }
}
