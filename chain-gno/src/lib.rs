//! Gno.land `ChainClient` implementation (spec 4.1): same capability set as
//! the Tendermint variant, but IBC v2 client-to-client addressing only, no
//! relayer-visible rotating validator set, and state-mutating operations are
//! realm deployments rendered from a fixed Handlebars template rather than
//! Cosmos SDK `Msg`s.

mod chain;
mod config;
mod error;
mod proof;
mod template;

pub use chain::{GnoChain, GnoHeaderUpdate};
pub use config::GnoChainConfig;
pub use template::{render_update_client_realm, CreateClientRealmParams, RegisterCounterpartyRealmParams, UpdateClientRealmParams};
