//! Proof Assembler, Light-Client Manager, Endpoint, Link (v1/v2), Relayer
//! Supervisor, embedded store, metrics, and CLI surface for the bidirectional
//! IBC relay engine (spec.md sections 4.1-4.6, 6).

pub mod cli;
pub mod endpoint;
pub mod light_client;
pub mod link;
pub mod metrics;
pub mod proof;
pub mod store;
pub mod supervisor;

pub use endpoint::Endpoint;
pub use light_client::LightClientManager;
pub use link::{Link, RelayIterationOutcome};
pub use metrics::Metrics;
pub use store::Store;
pub use supervisor::Supervisor;
