//! Prometheus metrics for the relayer roles
//!
//! Every series is labelled with the source chain it listens on, so the A->B
//! and B->A relayers share one registry without sharing counters.

use std::sync::{Arc, RwLock};

use prometheus::{IntCounterVec, IntGaugeVec, Opts, Registry};
use serde::Serialize;

pub type SharedMetrics = Arc<Metrics>;

const LABEL: &str = "source";

pub struct Metrics {
    /// BridgeLock logs received from the watcher
    pub locks_seen_total: IntCounterVec,
    /// Malformed BridgeLock logs that were skipped
    pub locks_skipped_total: IntCounterVec,
    pub unlocks_confirmed_total: IntCounterVec,
    pub unlocks_failed_total: IntCounterVec,
    /// Highest block scanned for BridgeLock logs
    pub last_polled_block: IntGaugeVec,
    pub registry: Registry,
    listeners: RwLock<Vec<String>>,
}

/// Per-listener counters for the JSON health endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListenerStats {
    pub source: String,
    pub locks_seen: u64,
    pub locks_skipped: u64,
    pub unlocks_confirmed: u64,
    pub unlocks_failed: u64,
    pub last_polled_block: u64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let locks_seen_total = IntCounterVec::new(
            Opts::new(
                "lockbridge_locks_seen_total",
                "Total BridgeLock events received",
            ),
            &[LABEL],
        )
        .expect("constant metric name is valid");

        let locks_skipped_total = IntCounterVec::new(
            Opts::new(
                "lockbridge_locks_skipped_total",
                "Total malformed BridgeLock events skipped",
            ),
            &[LABEL],
        )
        .expect("constant metric name is valid");

        let unlocks_confirmed_total = IntCounterVec::new(
            Opts::new(
                "lockbridge_unlocks_confirmed_total",
                "Total unlock transactions confirmed on the destination chain",
            ),
            &[LABEL],
        )
        .expect("constant metric name is valid");

        let unlocks_failed_total = IntCounterVec::new(
            Opts::new(
                "lockbridge_unlocks_failed_total",
                "Total unlock transactions that failed or reverted",
            ),
            &[LABEL],
        )
        .expect("constant metric name is valid");

        let last_polled_block = IntGaugeVec::new(
            Opts::new(
                "lockbridge_last_polled_block",
                "Last source block scanned for BridgeLock events",
            ),
            &[LABEL],
        )
        .expect("constant metric name is valid");

        // Names are unique constants and this runs once per registry
        registry
            .register(Box::new(locks_seen_total.clone()))
            .expect("metric registration must not be called twice");
        registry
            .register(Box::new(locks_skipped_total.clone()))
            .expect("metric registration must not be called twice");
        registry
            .register(Box::new(unlocks_confirmed_total.clone()))
            .expect("metric registration must not be called twice");
        registry
            .register(Box::new(unlocks_failed_total.clone()))
            .expect("metric registration must not be called twice");
        registry
            .register(Box::new(last_polled_block.clone()))
            .expect("metric registration must not be called twice");

        Self {
            locks_seen_total,
            locks_skipped_total,
            unlocks_confirmed_total,
            unlocks_failed_total,
            last_polled_block,
            registry,
            listeners: RwLock::new(Vec::new()),
        }
    }

    /// Make a listener visible on /health before it has seen any events
    pub fn register_listener(&self, source: &str) {
        if let Ok(mut listeners) = self.listeners.write() {
            if !listeners.iter().any(|s| s == source) {
                listeners.push(source.to_string());
            }
        }
    }

    pub fn record_lock_seen(&self, source: &str) {
        self.locks_seen_total.with_label_values(&[source]).inc();
    }

    pub fn record_lock_skipped(&self, source: &str) {
        self.locks_skipped_total.with_label_values(&[source]).inc();
    }

    pub fn record_unlock_confirmed(&self, source: &str) {
        self.unlocks_confirmed_total.with_label_values(&[source]).inc();
    }

    pub fn record_unlock_failed(&self, source: &str) {
        self.unlocks_failed_total.with_label_values(&[source]).inc();
    }

    pub fn set_last_polled_block(&self, source: &str, block: u64) {
        self.last_polled_block
            .with_label_values(&[source])
            .set(block as i64);
    }

    /// Current counters for every registered listener
    pub fn listener_stats(&self) -> Vec<ListenerStats> {
        let listeners = match self.listeners.read() {
            Ok(listeners) => listeners.clone(),
            Err(_) => return Vec::new(),
        };

        listeners
            .into_iter()
            .map(|source| {
                let labels = [source.as_str()];
                ListenerStats {
                    locks_seen: self.locks_seen_total.with_label_values(&labels).get(),
                    locks_skipped: self.locks_skipped_total.with_label_values(&labels).get(),
                    unlocks_confirmed: self
                        .unlocks_confirmed_total
                        .with_label_values(&labels)
                        .get(),
                    unlocks_failed: self.unlocks_failed_total.with_label_values(&labels).get(),
                    last_polled_block: self
                        .last_polled_block
                        .with_label_values(&labels)
                        .get()
                        .max(0) as u64,
                    source,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listener_stats() {
        let metrics = Metrics::new();
        metrics.register_listener("A");
        metrics.register_listener("A");
        metrics.register_listener("B");

        metrics.record_lock_seen("A");
        metrics.record_lock_seen("A");
        metrics.record_lock_skipped("A");
        metrics.record_unlock_confirmed("A");
        metrics.record_unlock_failed("B");
        metrics.set_last_polled_block("B", 1234);

        let stats = metrics.listener_stats();
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].source, "A");
        assert_eq!(stats[0].locks_seen, 2);
        assert_eq!(stats[0].locks_skipped, 1);
        assert_eq!(stats[0].unlocks_confirmed, 1);
        assert_eq!(stats[1].unlocks_failed, 1);
        assert_eq!(stats[1].last_polled_block, 1234);
    }

    #[test]
    fn test_registry_gathers_all_families() {
        let metrics = Metrics::new();
        metrics.record_lock_seen("A");
        metrics.record_lock_skipped("A");
        metrics.record_unlock_confirmed("A");
        metrics.record_unlock_failed("A");
        metrics.set_last_polled_block("A", 1);
        assert_eq!(metrics.registry.gather().len(), 5);
    }
}
