//! The key-class vocabulary for the Proof Assembler (spec 4.2): "given a
//! key class, identifiers, and a proof height, return `{data, proof,
//! proofHeight}`". `ChainClient::proof` dispatches on this enum so the
//! orchestration in `relayer-core` never needs to know each chain's key
//! encoding.

use crate::height::Height;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProofArtifact {
    PacketCommitmentV1 { port_id: String, channel_id: String, sequence: u64 },
    PacketAckV1 { port_id: String, channel_id: String, sequence: u64 },
    PacketReceiptV1 { port_id: String, channel_id: String, sequence: u64 },
    ChannelEndV1 { port_id: String, channel_id: String },
    ConnectionV1 { connection_id: String },
    ClientState { client_id: String },
    ConsensusState { client_id: String, height: Height },
    PacketCommitmentV2 { client_id: String, sequence: u64 },
    PacketAckV2 { client_id: String, sequence: u64 },
    PacketReceiptV2 { client_id: String, sequence: u64 },
}
