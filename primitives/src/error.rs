//! The error taxonomy from spec 7. Retry policy and the supervisor's
//! "log and move on" behaviour both branch on these variants, so the
//! taxonomy is load-bearing, not cosmetic.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Bad path, bad numeric, bad log level. Fatal on startup.
    #[error("configuration error: {0}")]
    Config(String),

    /// Transport or gateway failure. Retryable under the policy in spec 5.
    #[error("network error: {0}")]
    Network(String),

    /// Deliver-tx non-zero code, missing event attribute, proof op shape
    /// mismatch. Non-retryable; the packet reappears next iteration if
    /// still pending.
    #[error("chain execution error (tx {tx_hash:?}): {log}")]
    ChainExecution { log: String, tx_hash: Option<String> },

    /// Proof key mismatch, unexpected client-state type URL,
    /// consensus/header mismatch. Non-retryable; may indicate attack or
    /// misconfiguration.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Batch-length mismatch, negative height, unknown chain type.
    /// Programmer error; abort the current operation.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// The source's light client on the destination disagrees with the
    /// source's own header at a height both should agree on (spec 4.3,
    /// Evidence check). Non-retryable.
    #[error("consensus evidence mismatch for client {client_id} at height {height}")]
    ConsensusEvidence { client_id: String, height: String },

    /// Cooperative cancellation; unwind cleanly.
    #[error("shutdown requested")]
    Shutdown,
}

impl Error {
    /// Whether this error class is retried under the backoff policy in
    /// spec 5 ("Network-class errors ... are retried ... Non-network
    /// errors ... are NOT retried").
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Network(_))
    }

    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Error::InvariantViolation(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_network_errors_are_retryable() {
        assert!(Error::Network("timeout".into()).is_retryable());
        assert!(!Error::Protocol("bad proof".into()).is_retryable());
        assert!(!Error::ChainExecution { log: "x".into(), tx_hash: None }.is_retryable());
        assert!(!Error::InvariantViolation("x".into()).is_retryable());
        assert!(!Error::Shutdown.is_retryable());
    }
}
