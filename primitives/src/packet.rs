use crate::height::Height;

/// Ordering of a v1 channel. Only relevant for the `nextSequenceRecv`
/// quirk in `timeoutPackets` (spec 4.1) and for the ordered-delivery
/// invariant on the destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ChannelOrder {
    Ordered,
    Unordered,
}

/// Identity of a v1 packet on its source: `(sourcePort, sourceChannel,
/// sequence)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PacketIdV1 {
    pub port_id: String,
    pub channel_id: String,
    pub sequence: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PacketV1 {
    pub sequence: u64,
    pub source_port: String,
    pub source_channel: String,
    pub destination_port: String,
    pub destination_channel: String,
    pub data: Vec<u8>,
    pub timeout_height: Height,
    pub timeout_timestamp: u64,
}

impl PacketV1 {
    pub fn id(&self) -> PacketIdV1 {
        PacketIdV1 {
            port_id: self.source_port.clone(),
            channel_id: self.source_channel.clone(),
            sequence: self.sequence,
        }
    }

    /// True once `cutoff_height`/`cutoff_time` are past the packet's
    /// timeout — i.e. it belongs in the `timeout` set rather than `submit`.
    pub fn is_past_cutoff(&self, cutoff_height: Height, cutoff_time: u64) -> bool {
        let height_expired = !self.timeout_height.is_zero() && self.timeout_height <= cutoff_height;
        let time_expired = self.timeout_timestamp != 0 && self.timeout_timestamp <= cutoff_time;
        height_expired || time_expired
    }
}

/// A v2 payload: application-level content addressed by port on each side,
/// carried opaque to the relayer (spec 1's Non-goals: packet-content
/// validation is out of scope).
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PayloadV2 {
    pub source_port: String,
    pub destination_port: String,
    pub encoding: String,
    pub value: Vec<u8>,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PacketV2 {
    pub sequence: u64,
    pub source_client: String,
    pub destination_client: String,
    pub payloads: Vec<PayloadV2>,
    pub timeout_timestamp: u64,
}

impl PacketV2 {
    pub fn is_past_cutoff(&self, cutoff_time: u64) -> bool {
        self.timeout_timestamp != 0 && self.timeout_timestamp <= cutoff_time
    }
}

/// A packet in either protocol generation. The Link operates generically
/// over this so that v1 and v2 share the submit/timeout-splitting logic in
/// spec 4.5.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Packet {
    V1(PacketV1),
    V2(PacketV2),
}

impl Packet {
    pub fn sequence(&self) -> u64 {
        match self {
            Packet::V1(p) => p.sequence,
            Packet::V2(p) => p.sequence,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Acknowledgement {
    V1 { original_packet: PacketV1, acknowledgement: Vec<u8> },
    V2 { original_packet: PacketV2, acknowledgement: AckV2 },
}

/// Structured v2 acknowledgement content. Whether a given payload's
/// `app_acknowledgement` is itself an opaque byte string that must be
/// decoded again, or is already the canonical wire form, is an Open
/// Question (spec 9) — not resolved here; see DESIGN.md.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AckV2 {
    pub app_acknowledgements: Vec<Vec<u8>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn packet(timeout_height: Height, timeout_timestamp: u64) -> PacketV1 {
        PacketV1 {
            sequence: 1,
            source_port: "transfer".into(),
            source_channel: "channel-0".into(),
            destination_port: "transfer".into(),
            destination_channel: "channel-1".into(),
            data: vec![],
            timeout_height,
            timeout_timestamp,
        }
    }

    #[test]
    fn past_cutoff_by_height() {
        let p = packet(Height::new(0, 105), 0);
        assert!(!p.is_past_cutoff(Height::new(0, 104), 0));
        assert!(p.is_past_cutoff(Height::new(0, 105), 0));
        assert!(p.is_past_cutoff(Height::new(0, 108), 0));
    }

    #[test]
    fn past_cutoff_by_time() {
        let p = packet(Height::zero(), 1_000);
        assert!(!p.is_past_cutoff(Height::zero(), 999));
        assert!(p.is_past_cutoff(Height::zero(), 1_000));
    }

    #[test]
    fn zero_timeout_fields_never_expire() {
        let p = packet(Height::zero(), 0);
        assert!(!p.is_past_cutoff(Height::new(5, 999_999), u64::MAX));
    }
}
