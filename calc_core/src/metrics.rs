//! # Usage Metrics
//!
//! Per-material usage counting. The counter is a collaborator owned by the
//! application and passed to whoever records usage; there is no global
//! state.

use std::collections::BTreeMap;
use std::sync::Mutex;

/// Sink for material usage events
pub trait UsageMetrics: Send + Sync {
    /// Count one successful calculation for `material`
    fn record_material(&self, material: &str);

    /// Counts per material, sorted by name
    fn snapshot(&self) -> BTreeMap<String, u64>;
}

/// In-process counter keyed by material name
#[derive(Debug, Default)]
pub struct MaterialUsageCounter {
    counts: Mutex<BTreeMap<String, u64>>,
}

impl MaterialUsageCounter {
    pub fn new() -> Self {
        MaterialUsageCounter::default()
    }

    pub fn count(&self, material: &str) -> u64 {
        self.counts
            .lock()
            .map(|counts| counts.get(material).copied().unwrap_or(0))
            .unwrap_or(0)
    }
}

impl UsageMetrics for MaterialUsageCounter {
    fn record_material(&self, material: &str) {
        // A poisoned counter only loses statistics
        if let Ok(mut counts) = self.counts.lock() {
            *counts.entry(material.to_string()).or_insert(0) += 1;
        }
    }

    fn snapshot(&self) -> BTreeMap<String, u64> {
        self.counts.lock().map(|counts| counts.clone()).unwrap_or_default()
    }
}
