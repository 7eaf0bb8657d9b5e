//! Metrics collection module
//!
//! Tracks which search tier answered each request and how geometry lookups
//! ended. Responses look the same whatever tier answered, so these counters
//! are the only record of tier provenance besides the logs.

use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

/// Response times kept per tier
const TIMING_WINDOW: usize = 100;

/// Process-wide metrics collector
#[derive(Default)]
pub struct Metrics {
    searches: AtomicU64,
    primary_answers: AtomicU64,
    primary_failures: AtomicU64,
    fallback_answers: AtomicU64,
    fallback_failures: AtomicU64,
    internal_errors: AtomicU64,
    geometry_resolved: AtomicU64,
    geometry_missing: AtomicU64,
    geometry_errors: AtomicU64,
    /// Rolling response times per tier (ms)
    response_times: RwLock<HashMap<&'static str, VecDeque<u64>>>,
}

impl Metrics {
    /// Create a new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_search(&self) {
        self.searches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_primary_answer(&self) {
        self.primary_answers.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_primary_failure(&self) {
        self.primary_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fallback_answer(&self) {
        self.fallback_answers.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fallback_failure(&self) {
        self.fallback_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_internal_error(&self) {
        self.internal_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_geometry_resolved(&self) {
        self.geometry_resolved.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_geometry_miss(&self) {
        self.geometry_missing.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_geometry_error(&self) {
        self.geometry_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Record how long a tier took to answer
    pub fn record_response_time(&self, tier: &'static str, time_ms: u64) {
        let mut times = self
            .response_times
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let entry = times.entry(tier).or_default();

        if entry.len() >= TIMING_WINDOW {
            entry.pop_front();
        }
        entry.push_back(time_ms);
    }

    /// Point-in-time copy of all counters
    pub fn snapshot(&self) -> MetricsSnapshot {
        let times = self
            .response_times
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let avg_response_ms = times
            .iter()
            .filter_map(|(tier, t)| Some((tier.to_string(), average(t)?)))
            .collect();

        MetricsSnapshot {
            searches: self.searches.load(Ordering::Relaxed),
            primary_answers: self.primary_answers.load(Ordering::Relaxed),
            primary_failures: self.primary_failures.load(Ordering::Relaxed),
            fallback_answers: self.fallback_answers.load(Ordering::Relaxed),
            fallback_failures: self.fallback_failures.load(Ordering::Relaxed),
            internal_errors: self.internal_errors.load(Ordering::Relaxed),
            geometry_resolved: self.geometry_resolved.load(Ordering::Relaxed),
            geometry_missing: self.geometry_missing.load(Ordering::Relaxed),
            geometry_errors: self.geometry_errors.load(Ordering::Relaxed),
            avg_response_ms,
        }
    }
}

fn average(times: &VecDeque<u64>) -> Option<u64> {
    if times.is_empty() {
        None
    } else {
        Some(times.iter().sum::<u64>() / times.len() as u64)
    }
}

/// Serializable metrics view
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub searches: u64,
    pub primary_answers: u64,
    pub primary_failures: u64,
    pub fallback_answers: u64,
    pub fallback_failures: u64,
    pub internal_errors: u64,
    pub geometry_resolved: u64,
    pub geometry_missing: u64,
    pub geometry_errors: u64,
    pub avg_response_ms: HashMap<String, u64>,
}
