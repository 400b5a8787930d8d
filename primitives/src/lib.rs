//! Shared types and the `ChainClient` capability trait for the relay
//! engine. Nothing in this crate knows about a concrete chain; `ChainClient`
//! implementations live in `relayer-tendermint` and `relayer-gno`.

pub mod chain;
pub mod client_state;
pub mod config;
pub mod error;
pub mod height;
pub mod ident;
pub mod packet;
pub mod path;
pub mod proof;
pub mod relay_path;
pub mod retry;

pub use chain::{
    ChainClient, ChainEvent, ChannelEnd, ConnectionEnd, HeaderInfo, HeightRange, PacketGroup,
    ProofBundle, Scope, SentPacket, TxResult, ValidatorSet,
};
pub use client_state::{ClientKind, ClientState, ConsensusState, MerkleRoot, TrustLevel};
pub use config::Config;
pub use error::Error;
pub use height::Height;
pub use packet::{Acknowledgement, ChannelOrder, Packet, PacketIdV1, PacketV1, PacketV2, PayloadV2};
pub use proof::ProofArtifact;
pub use relay_path::{ChainFees, ChainType, IbcVersion, PacketFilter, RelayPath, RelayedHeights};
