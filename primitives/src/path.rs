//! Store-key construction for the Proof Assembler (spec 4.2). Building the
//! key is pure and chain-agnostic; only the proof bytes themselves require
//! an RPC round trip, which lives in the chain-specific `ChainClient`
//! impls.

use crate::height::Height;

const V2_COMMITMENT_TAG: u8 = 0x01;
const V2_RECEIPT_TAG: u8 = 0x02;
const V2_ACK_TAG: u8 = 0x03;

pub fn packet_commitment_v1(port_id: &str, channel_id: &str, sequence: u64) -> String {
    format!("commitments/ports/{port_id}/channels/{channel_id}/sequences/{sequence}")
}

pub fn packet_ack_v1(port_id: &str, channel_id: &str, sequence: u64) -> String {
    format!("acks/ports/{port_id}/channels/{channel_id}/sequences/{sequence}")
}

pub fn packet_receipt_v1(port_id: &str, channel_id: &str, sequence: u64) -> String {
    format!("receipts/ports/{port_id}/channels/{channel_id}/sequences/{sequence}")
}

pub fn channel_end_v1(port_id: &str, channel_id: &str) -> String {
    format!("channelEnds/ports/{port_id}/channels/{channel_id}")
}

pub fn connection_v1(connection_id: &str) -> String {
    format!("connections/{connection_id}")
}

pub fn client_state(client_id: &str) -> String {
    format!("clients/{client_id}/clientState")
}

pub fn consensus_state(client_id: &str, height: Height) -> String {
    format!(
        "clients/{client_id}/consensusStates/{}-{}",
        height.revision_number, height.revision_height
    )
}

fn v2_key(client_id: &str, tag: u8, sequence: u64) -> Vec<u8> {
    let mut key = Vec::with_capacity(client_id.len() + 1 + 8);
    key.extend_from_slice(client_id.as_bytes());
    key.push(tag);
    key.extend_from_slice(&sequence.to_be_bytes());
    key
}

pub fn packet_commitment_v2(client_id: &str, sequence: u64) -> Vec<u8> {
    v2_key(client_id, V2_COMMITMENT_TAG, sequence)
}

pub fn packet_receipt_v2(client_id: &str, sequence: u64) -> Vec<u8> {
    v2_key(client_id, V2_RECEIPT_TAG, sequence)
}

pub fn packet_ack_v2(client_id: &str, sequence: u64) -> Vec<u8> {
    v2_key(client_id, V2_ACK_TAG, sequence)
}
