//! IBC v2 specifics for the Link (spec 4.5): client-scoped packet grouping.
//! There is no channel ordering in v2, so timeouts always carry the
//! packet's own sequence (spec 4.1).

use relayer_primitives::{chain::PacketGroup, packet::PacketV2};

pub(super) fn packet_group(packet: &PacketV2) -> PacketGroup {
    PacketGroup::Client(packet.destination_client.clone())
}

pub(super) fn ack_group(original_packet: &PacketV2) -> PacketGroup {
    PacketGroup::Client(original_packet.source_client.clone())
}

pub(super) fn resolve_next_seqs(packets: &[PacketV2]) -> Vec<u64> {
    packets.iter().map(|p| p.sequence).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn packet(sequence: u64) -> PacketV2 {
        PacketV2 {
            sequence,
            source_client: "client-a-0".into(),
            destination_client: "client-b-0".into(),
            payloads: vec![],
            timeout_timestamp: 0,
        }
    }

    #[test]
    fn groups_by_destination_client() {
        assert_eq!(packet_group(&packet(1)), PacketGroup::Client("client-b-0".into()));
    }

    #[test]
    fn ack_group_uses_source_client() {
        assert_eq!(ack_group(&packet(1)), PacketGroup::Client("client-a-0".into()));
    }

    #[test]
    fn next_seqs_are_the_packets_own_sequence() {
        let packets = vec![packet(1), packet(2)];
        assert_eq!(resolve_next_seqs(&packets), vec![1, 2]);
    }
}
