//! The Proof Assembler (spec 4.2): composes the chain-agnostic
//! `ChainClient::proof` calls into the composite bundles each IBC message
//! type needs. Height discipline (`queryHeight = proofHeight - 1`) is
//! enforced once, inside each `ChainClient` impl's proof-query helper; this
//! module only decides which keys to ask for and how to group the results.

use relayer_primitives::{
    chain::{ChainClient, ProofBundle},
    error::Error,
    height::Height,
    proof::ProofArtifact,
};

/// Connection-handshake proof = client-state proof ∥ connection proof ∥
/// consensus-state proof, all at the same query height (spec 4.2).
pub struct ConnectionHandshakeProof {
    pub client_state: ProofBundle,
    pub connection: ProofBundle,
    pub consensus_state: ProofBundle,
}

/// Channel-handshake proof = channel-end proof only (spec 4.2).
pub struct ChannelHandshakeProof {
    pub channel_end: ProofBundle,
}

pub async fn assemble_connection_handshake_proof(
    chain: &dyn ChainClient,
    client_id: &str,
    connection_id: &str,
    consensus_height: Height,
    proof_height: Height,
) -> Result<ConnectionHandshakeProof, Error> {
    let client_state = chain.proof(ProofArtifact::ClientState { client_id: client_id.to_string() }, proof_height).await?;
    let connection = chain
        .proof(ProofArtifact::ConnectionV1 { connection_id: connection_id.to_string() }, proof_height)
        .await?;
    let consensus_state = chain
        .proof(
            ProofArtifact::ConsensusState { client_id: client_id.to_string(), height: consensus_height },
            proof_height,
        )
        .await?;
    Ok(ConnectionHandshakeProof { client_state, connection, consensus_state })
}

pub async fn assemble_channel_handshake_proof(
    chain: &dyn ChainClient,
    port_id: &str,
    channel_id: &str,
    proof_height: Height,
) -> Result<ChannelHandshakeProof, Error> {
    let channel_end = chain
        .proof(ProofArtifact::ChannelEndV1 { port_id: port_id.to_string(), channel_id: channel_id.to_string() }, proof_height)
        .await?;
    Ok(ChannelHandshakeProof { channel_end })
}

/// Packet-relay proof for a v1 packet commitment (spec 4.2: "packet relay
/// proof = packet commitment").
pub async fn assemble_packet_commitment_proof_v1(
    chain: &dyn ChainClient,
    port_id: &str,
    channel_id: &str,
    sequence: u64,
    proof_height: Height,
) -> Result<ProofBundle, Error> {
    chain
        .proof(
            ProofArtifact::PacketCommitmentV1 { port_id: port_id.to_string(), channel_id: channel_id.to_string(), sequence },
            proof_height,
        )
        .await
}

pub async fn assemble_packet_commitment_proof_v2(
    chain: &dyn ChainClient,
    client_id: &str,
    sequence: u64,
    proof_height: Height,
) -> Result<ProofBundle, Error> {
    chain.proof(ProofArtifact::PacketCommitmentV2 { client_id: client_id.to_string(), sequence }, proof_height).await
}

/// Ack-relay proof (spec 4.2: "ack relay proof = ack").
pub async fn assemble_ack_proof_v1(
    chain: &dyn ChainClient,
    port_id: &str,
    channel_id: &str,
    sequence: u64,
    proof_height: Height,
) -> Result<ProofBundle, Error> {
    chain
        .proof(
            ProofArtifact::PacketAckV1 { port_id: port_id.to_string(), channel_id: channel_id.to_string(), sequence },
            proof_height,
        )
        .await
}

pub async fn assemble_ack_proof_v2(
    chain: &dyn ChainClient,
    client_id: &str,
    sequence: u64,
    proof_height: Height,
) -> Result<ProofBundle, Error> {
    chain.proof(ProofArtifact::PacketAckV2 { client_id: client_id.to_string(), sequence }, proof_height).await
}

/// Timeout proof (spec 4.2: "timeout proof = receipt (absence or presence,
/// per channel ordering)").
pub async fn assemble_receipt_proof_v1(
    chain: &dyn ChainClient,
    port_id: &str,
    channel_id: &str,
    sequence: u64,
    proof_height: Height,
) -> Result<ProofBundle, Error> {
    chain
        .proof(
            ProofArtifact::PacketReceiptV1 { port_id: port_id.to_string(), channel_id: channel_id.to_string(), sequence },
            proof_height,
        )
        .await
}

pub async fn assemble_receipt_proof_v2(
    chain: &dyn ChainClient,
    client_id: &str,
    sequence: u64,
    proof_height: Height,
) -> Result<ProofBundle, Error> {
    chain.proof(ProofArtifact::PacketReceiptV2 { client_id: client_id.to_string(), sequence }, proof_height).await
}
