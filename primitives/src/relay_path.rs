use crate::{height::Height, packet::PacketV1};

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum IbcVersion {
    V1 = 1,
    V2 = 2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ChainType {
    Cosmos,
    Gno,
}

/// Persistent, immutable-after-creation description of a relay path
/// (spec 3, "Relay Path").
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RelayPath {
    pub id: String,
    pub chain_id_a: String,
    pub node_a: String,
    pub query_node_a: Option<String>,
    pub chain_id_b: String,
    pub node_b: String,
    pub query_node_b: Option<String>,
    pub chain_type_a: ChainType,
    pub chain_type_b: ChainType,
    pub client_a: String,
    pub client_b: String,
    pub version: IbcVersion,
}

/// Low-water mark for the next poll's query per direction, per spec 3
/// "Relayed Heights". A missing row is treated as all zeros.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RelayedHeights {
    pub packet_height_a: Height,
    pub packet_height_b: Height,
    pub ack_height_a: Height,
    pub ack_height_b: Height,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ChainFees {
    pub chain_id: String,
    pub gas_price: f64,
    pub gas_denom: String,
}

/// Predicate applied to outgoing packets and acks before `unreceivedPackets`
/// queries, per spec 4.5 "Filter". Implemented as a plain function pointer
/// over the packet's port/channel pair so it can be persisted trivially
/// (serde on a closure isn't possible; the CLI only ever needs an allow-list
/// of channels, which is what every real packet filter in this domain is).
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct PacketFilter {
    /// `(port_id, channel_id)` pairs allowed on the source side. Empty
    /// means "allow all".
    pub allowed_channels: Vec<(String, String)>,
}

impl PacketFilter {
    pub fn allows(&self, packet: &PacketV1) -> bool {
        self.allowed_channels.is_empty()
            || self
                .allowed_channels
                .iter()
                .any(|(p, c)| p == &packet.source_port && c == &packet.source_channel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_filter_allows_everything() {
        let filter = PacketFilter::default();
        let packet = PacketV1 {
            sequence: 1,
            source_port: "transfer".into(),
            source_channel: "channel-0".into(),
            destination_port: "transfer".into(),
            destination_channel: "channel-1".into(),
            data: vec![],
            timeout_height: Height::zero(),
            timeout_timestamp: 0,
        };
        assert!(filter.allows(&packet));
    }

    #[test]
    fn nonempty_filter_restricts_to_allowed_channels() {
        let filter = PacketFilter { allowed_channels: vec![("transfer".into(), "channel-5".into())] };
        let mut packet = PacketV1 {
            sequence: 1,
            source_port: "transfer".into(),
            source_channel: "channel-0".into(),
            destination_port: "transfer".into(),
            destination_channel: "channel-1".into(),
            data: vec![],
            timeout_height: Height::zero(),
            timeout_timestamp: 0,
        };
        assert!(!filter.allows(&packet));
        packet.source_channel = "channel-5".into();
        assert!(filter.allows(&packet));
    }
}
