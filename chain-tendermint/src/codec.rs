//! Protobuf decoding for the handful of Cosmos SDK / ibc-go wire types the
//! Chain Client needs to turn into the crate's chain-agnostic domain types
//! (spec 1 treats "the protobuf type definitions themselves" as an external
//! collaborator, referenced only by interface -- `ibc-proto` is that
//! interface).

use ibc_proto::ibc::{
    core::{channel::v1::Channel as RawChannel, connection::v1::ConnectionEnd as RawConnectionEnd},
    lightclients::tendermint::v1::{ClientState as RawClientState, ConsensusState as RawConsensusState},
};
use prost::Message;
use relayer_primitives::{
    chain::{ChainEvent, ChannelEnd, ConnectionEnd},
    client_state::{ClientState, ConsensusState, MerkleRoot, TrustLevel},
    error::Error,
    height::Height,
    packet::{AckV2, ChannelOrder, PacketV1, PacketV2, PayloadV2},
};

fn protocol(context: impl Into<String>) -> Error {
    Error::Protocol(context.into())
}

pub fn decode_client_state(bytes: &[u8]) -> Result<ClientState, Error> {
    let raw = RawClientState::decode(bytes).map_err(|e| protocol(format!("malformed client state: {e}")))?;
    let trust_level = raw
        .trust_level
        .map(|t| TrustLevel { numerator: t.numerator, denominator: t.denominator })
        .unwrap_or(TrustLevel::ONE_THIRD);
    let latest_height = raw
        .latest_height
        .map(|h| Height::new(h.revision_number, h.revision_height))
        .ok_or_else(|| protocol("client state missing latest_height"))?;
    let frozen_height = raw
        .frozen_height
        .map(|h| Height::new(h.revision_number, h.revision_height))
        .filter(|h| !h.is_zero());
    Ok(ClientState {
        chain_id: raw.chain_id,
        trust_level,
        trusting_period: duration_from_proto(raw.trusting_period),
        unbonding_period: duration_from_proto(raw.unbonding_period),
        max_clock_drift: duration_from_proto(raw.max_clock_drift),
        latest_height,
        frozen_height,
        upgrade_path: raw.upgrade_path,
        allow_update_after_expiry: raw.allow_update_after_expiry,
        allow_update_after_misbehaviour: raw.allow_update_after_misbehaviour,
    })
}

pub fn decode_consensus_state(bytes: &[u8]) -> Result<ConsensusState, Error> {
    let raw =
        RawConsensusState::decode(bytes).map_err(|e| protocol(format!("malformed consensus state: {e}")))?;
    let timestamp = raw.timestamp.ok_or_else(|| protocol("consensus state missing timestamp"))?;
    let root = raw.root.ok_or_else(|| protocol("consensus state missing root"))?;
    Ok(ConsensusState::Tendermint {
        timestamp_unix_secs: timestamp.seconds.max(0) as u64,
        root: MerkleRoot { hash: root.hash },
        next_validators_hash: raw.next_validators_hash,
    })
}

pub fn decode_connection_end(bytes: &[u8]) -> Result<ConnectionEnd, Error> {
    let raw = RawConnectionEnd::decode(bytes).map_err(|e| protocol(format!("malformed connection end: {e}")))?;
    let counterparty = raw.counterparty.ok_or_else(|| protocol("connection end missing counterparty"))?;
    Ok(ConnectionEnd {
        client_id: raw.client_id,
        counterparty_client_id: counterparty.client_id,
        counterparty_connection_id: (!counterparty.connection_id.is_empty())
            .then_some(counterparty.connection_id),
        state: connection_state_name(raw.state),
    })
}

pub fn decode_channel_end(bytes: &[u8]) -> Result<ChannelEnd, Error> {
    let raw = RawChannel::decode(bytes).map_err(|e| protocol(format!("malformed channel end: {e}")))?;
    let counterparty = raw.counterparty.ok_or_else(|| protocol("channel end missing counterparty"))?;
    Ok(ChannelEnd {
        state: channel_state_name(raw.state),
        ordering: channel_ordering(raw.ordering),
        counterparty_port_id: counterparty.port_id,
        counterparty_channel_id: counterparty.channel_id,
        connection_hops: raw.connection_hops,
    })
}

fn duration_from_proto(duration: Option<ibc_proto::google::protobuf::Duration>) -> std::time::Duration {
    match duration {
        Some(d) => std::time::Duration::from_secs(d.seconds.max(0) as u64)
            + std::time::Duration::from_nanos(d.nanos.max(0) as u64),
        None => std::time::Duration::ZERO,
    }
}

fn connection_state_name(state: i32) -> String {
    match state {
        1 => "INIT".into(),
        2 => "TRYOPEN".into(),
        3 => "OPEN".into(),
        _ => "UNINITIALIZED".into(),
    }
}

fn channel_state_name(state: i32) -> String {
    match state {
        1 => "INIT".into(),
        2 => "TRYOPEN".into(),
        3 => "OPEN".into(),
        4 => "CLOSED".into(),
        _ => "UNINITIALIZED".into(),
    }
}

fn channel_ordering(ordering: i32) -> Option<ChannelOrder> {
    match ordering {
        1 => Some(ChannelOrder::Unordered),
        2 => Some(ChannelOrder::Ordered),
        _ => None,
    }
}

/// ibc-go's `send_packet` event carries the packet fields flattened as
/// string attributes (see `ibc-go/modules/core/04-channel/keeper/events.go`).
pub fn decode_send_packet_event(event: &ChainEvent) -> Option<PacketV1> {
    if event.kind != "send_packet" {
        return None;
    }
    Some(PacketV1 {
        sequence: event.attribute("packet_sequence")?.parse().ok()?,
        source_port: event.attribute("packet_src_port")?.to_string(),
        source_channel: event.attribute("packet_src_channel")?.to_string(),
        destination_port: event.attribute("packet_dst_port")?.to_string(),
        destination_channel: event.attribute("packet_dst_channel")?.to_string(),
        data: hex::decode(event.attribute("packet_data_hex").unwrap_or("")).unwrap_or_default(),
        timeout_height: parse_height_attr(event.attribute("packet_timeout_height").unwrap_or("0-0")),
        timeout_timestamp: event.attribute("packet_timeout_timestamp")?.parse().ok()?,
    })
}

pub fn decode_write_ack_event(event: &ChainEvent) -> Option<(PacketV1, Vec<u8>)> {
    if event.kind != "write_acknowledgement" {
        return None;
    }
    let packet = PacketV1 {
        sequence: event.attribute("packet_sequence")?.parse().ok()?,
        source_port: event.attribute("packet_src_port")?.to_string(),
        source_channel: event.attribute("packet_src_channel")?.to_string(),
        destination_port: event.attribute("packet_dst_port")?.to_string(),
        destination_channel: event.attribute("packet_dst_channel")?.to_string(),
        data: hex::decode(event.attribute("packet_data_hex").unwrap_or("")).unwrap_or_default(),
        timeout_height: parse_height_attr(event.attribute("packet_timeout_height").unwrap_or("0-0")),
        timeout_timestamp: event.attribute("packet_timeout_timestamp")?.parse().ok()?,
    };
    let ack = hex::decode(event.attribute("packet_ack_hex")?).ok()?;
    Some((packet, ack))
}

/// IBC v2 (eureka) `send_packet` events carry client ids rather than
/// port/channel pairs, and flatten a single payload's fields alongside them
/// (spec 4.1 Scope = client-id). Attribute names mirror the v1 ones above
/// with `src`/`dst` endpoints replaced by the source/destination client.
pub fn decode_send_packet_event_v2(event: &ChainEvent) -> Option<PacketV2> {
    if event.kind != "send_packet" {
        return None;
    }
    let payload = PayloadV2 {
        source_port: event.attribute("payload_src_port").unwrap_or_default().to_string(),
        destination_port: event.attribute("payload_dst_port").unwrap_or_default().to_string(),
        encoding: event.attribute("payload_encoding").unwrap_or_default().to_string(),
        value: hex::decode(event.attribute("payload_data_hex").unwrap_or("")).unwrap_or_default(),
        version: event.attribute("payload_version").unwrap_or_default().to_string(),
    };
    Some(PacketV2 {
        sequence: event.attribute("packet_sequence")?.parse().ok()?,
        source_client: event.attribute("packet_src_client")?.to_string(),
        destination_client: event.attribute("packet_dst_client")?.to_string(),
        payloads: vec![payload],
        timeout_timestamp: event.attribute("packet_timeout_timestamp")?.parse().ok()?,
    })
}

pub fn decode_write_ack_event_v2(event: &ChainEvent) -> Option<(PacketV2, AckV2)> {
    if event.kind != "write_acknowledgement" {
        return None;
    }
    let packet = decode_send_packet_event_v2(&ChainEvent { kind: "send_packet".into(), attributes: event.attributes.clone() })?;
    let ack = hex::decode(event.attribute("packet_ack_hex")?).ok()?;
    Some((packet, AckV2 { app_acknowledgements: vec![ack] }))
}

fn parse_height_attr(raw: &str) -> Height {
    let (revision, height) = raw.split_once('-').unwrap_or(("0", raw));
    Height::new(revision.parse().unwrap_or(0), height.parse().unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(kind: &str, attrs: &[(&str, &str)]) -> ChainEvent {
        ChainEvent {
            kind: kind.to_string(),
            attributes: attrs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
        }
    }

    #[test]
    fn decodes_send_packet_event() {
        let e = event(
            "send_packet",
            &[
                ("packet_sequence", "4"),
                ("packet_src_port", "transfer"),
                ("packet_src_channel", "channel-0"),
                ("packet_dst_port", "transfer"),
                ("packet_dst_channel", "channel-1"),
                ("packet_timeout_height", "0-500"),
                ("packet_timeout_timestamp", "0"),
            ],
        );
        let packet = decode_send_packet_event(&e).unwrap();
        assert_eq!(packet.sequence, 4);
        assert_eq!(packet.timeout_height, Height::new(0, 500));
    }

    #[test]
    fn ignores_events_of_other_kinds() {
        let e = event("create_client", &[]);
        assert!(decode_send_packet_event(&e).is_none());
    }

    #[test]
    fn decodes_send_packet_event_v2() {
        let e = event(
            "send_packet",
            &[
                ("packet_sequence", "7"),
                ("packet_src_client", "07-tendermint-0"),
                ("packet_dst_client", "client-gno-0"),
                ("packet_timeout_timestamp", "1000"),
                ("payload_src_port", "transfer"),
                ("payload_dst_port", "transfer"),
                ("payload_data_hex", "deadbeef"),
            ],
        );
        let packet = decode_send_packet_event_v2(&e).unwrap();
        assert_eq!(packet.sequence, 7);
        assert_eq!(packet.source_client, "07-tendermint-0");
        assert_eq!(packet.destination_client, "client-gno-0");
        assert_eq!(packet.payloads[0].value, vec![0xde, 0xad, 0xbe, 0xef]);
    }

    #[test]
    fn decodes_write_ack_event_v2() {
        let e = event(
            "write_acknowledgement",
            &[
                ("packet_sequence", "7"),
                ("packet_src_client", "07-tendermint-0"),
                ("packet_dst_client", "client-gno-0"),
                ("packet_timeout_timestamp", "1000"),
                ("packet_ack_hex", "0102"),
            ],
        );
        let (packet, ack) = decode_write_ack_event_v2(&e).unwrap();
        assert_eq!(packet.sequence, 7);
        assert_eq!(ack.app_acknowledgements, vec![vec![0x01, 0x02]]);
    }

    #[test]
    fn decodes_write_ack_event() {
        let e = event(
            "write_acknowledgement",
            &[
                ("packet_sequence", "1"),
                ("packet_src_port", "transfer"),
                ("packet_src_channel", "channel-0"),
                ("packet_dst_port", "transfer"),
                ("packet_dst_channel", "channel-1"),
                ("packet_timeout_height", "0-0"),
                ("packet_timeout_timestamp", "0"),
                ("packet_ack_hex", "0102"),
            ],
        );
        let (_, ack) = decode_write_ack_event(&e).unwrap();
        assert_eq!(ack, vec![0x01, 0x02]);
    }
}
