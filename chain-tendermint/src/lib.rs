//! Tendermint/CometBFT `ChainClient` implementation (spec 4.1). Talks to a
//! Cosmos SDK chain over RPC, assembles ICS-23 proofs (spec 4.2), and
//! builds validator-set-driven update headers (spec 4.3).

mod chain;
mod codec;
mod config;
mod error;
mod header;
mod proof;

pub use chain::TendermintChain;
pub use config::TendermintChainConfig;
pub use header::{build_update_header, check_evidence};
