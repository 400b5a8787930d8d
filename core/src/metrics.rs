//! Prometheus counters for the relay loop (SPEC_FULL 10.8). Fee markets and
//! token economics stay out of scope; packet/ack/timeout/client-update/retry
//! counts are ambient observability, not fee functionality.
//!
//! Built against a private `Registry` rather than `prometheus`'s global
//! default one, so a process can hold more than one `Metrics` (tests, or a
//! future multi-tenant runner) without a duplicate-registration panic.

use prometheus::{IntCounterVec, Opts, Registry};

pub struct Metrics {
    pub registry: Registry,
    pub packets_relayed: IntCounterVec,
    pub acks_relayed: IntCounterVec,
    pub packets_timed_out: IntCounterVec,
    pub client_updates: IntCounterVec,
    pub retries: IntCounterVec,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();
        let packets_relayed = counter(&registry, "relayer_packets_relayed_total", "Number of IBC packets successfully relayed", &["path_id", "direction"])?;
        let acks_relayed = counter(&registry, "relayer_acks_relayed_total", "Number of IBC acknowledgements successfully relayed", &["path_id", "direction"])?;
        let packets_timed_out = counter(&registry, "relayer_packets_timed_out_total", "Number of IBC packets relayed as timeouts", &["path_id", "direction"])?;
        let client_updates = counter(&registry, "relayer_client_updates_total", "Number of MsgUpdateClient submissions", &["path_id", "client_id"])?;
        let retries = counter(&registry, "relayer_retries_total", "Number of retried operations due to a network-class error", &["path_id"])?;
        Ok(Self { registry, packets_relayed, acks_relayed, packets_timed_out, client_updates, retries })
    }

    pub fn record_iteration(&self, path_id: &str, outcome: &crate::link::RelayIterationOutcome) {
        self.packets_relayed.with_label_values(&[path_id, "a_to_b"]).inc_by(outcome.packets_relayed_a_to_b as u64);
        self.packets_relayed.with_label_values(&[path_id, "b_to_a"]).inc_by(outcome.packets_relayed_b_to_a as u64);
        self.acks_relayed.with_label_values(&[path_id, "a_to_b"]).inc_by(outcome.acks_relayed_a_to_b as u64);
        self.acks_relayed.with_label_values(&[path_id, "b_to_a"]).inc_by(outcome.acks_relayed_b_to_a as u64);
        self.packets_timed_out.with_label_values(&[path_id, "a"]).inc_by(outcome.timed_out_a as u64);
        self.packets_timed_out.with_label_values(&[path_id, "b"]).inc_by(outcome.timed_out_b as u64);
        for client_id in &outcome.client_updates {
            self.client_updates.with_label_values(&[path_id, client_id]).inc();
        }
        self.retries.with_label_values(&[path_id]).inc_by(outcome.retries);
    }
}

fn counter(registry: &Registry, name: &str, help: &str, labels: &[&str]) -> Result<IntCounterVec, prometheus::Error> {
    let counter = IntCounterVec::new(Opts::new(name, help), labels)?;
    registry.register(Box::new(counter.clone()))?;
    Ok(counter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_independent_metrics_sets_do_not_conflict() {
        let a = Metrics::new().unwrap();
        let b = Metrics::new().unwrap();
        a.packets_relayed.with_label_values(&["path-0", "a_to_b"]).inc();
        assert_eq!(a.packets_relayed.with_label_values(&["path-0", "a_to_b"]).get(), 1);
        assert_eq!(b.packets_relayed.with_label_values(&["path-0", "a_to_b"]).get(), 0);
    }

    #[test]
    fn record_iteration_adds_per_direction_counts() {
        use crate::link::RelayIterationOutcome;
        let metrics = Metrics::new().unwrap();
        let outcome = RelayIterationOutcome {
            packets_relayed_a_to_b: 2,
            packets_relayed_b_to_a: 1,
            acks_relayed_a_to_b: 1,
            acks_relayed_b_to_a: 0,
            timed_out_a: 1,
            timed_out_b: 0,
            ..Default::default()
        };
        metrics.record_iteration("path-0", &outcome);
        assert_eq!(metrics.packets_relayed.with_label_values(&["path-0", "a_to_b"]).get(), 2);
        assert_eq!(metrics.packets_timed_out.with_label_values(&["path-0", "a"]).get(), 1);
    }

    #[test]
    fn record_iteration_counts_client_updates_and_retries() {
        use crate::link::RelayIterationOutcome;
        let metrics = Metrics::new().unwrap();
        let outcome = RelayIterationOutcome {
            client_updates: vec!["07-tendermint-0".into(), "client-gno-0".into(), "07-tendermint-0".into()],
            retries: 3,
            ..Default::default()
        };
        metrics.record_iteration("path-0", &outcome);
        assert_eq!(metrics.client_updates.with_label_values(&["path-0", "07-tendermint-0"]).get(), 2);
        assert_eq!(metrics.client_updates.with_label_values(&["path-0", "client-gno-0"]).get(), 1);
        assert_eq!(metrics.retries.with_label_values(&["path-0"]).get(), 3);
    }
}
