//! IBC v1 specifics for the Link (spec 4.5): channel-scoped packet grouping
//! and the ordered-channel `nextSequenceRecv` quirk when building timeouts.

use std::collections::HashMap;

use futures::future::try_join_all;
use relayer_primitives::{
    chain::{ChainClient, PacketGroup},
    error::Error,
    packet::PacketV1,
};

pub(super) fn packet_group(packet: &PacketV1) -> PacketGroup {
    PacketGroup::Channel { port_id: packet.destination_port.clone(), channel_id: packet.destination_channel.clone() }
}

/// The acknowledgement clears the commitment kept under the *sender's own*
/// port/channel identifiers, so the unreceived-acks group is keyed by
/// `(sourcePort, sourceChannel)` on the original packet, not the destination.
pub(super) fn ack_group(original_packet: &PacketV1) -> PacketGroup {
    PacketGroup::Channel { port_id: original_packet.source_port.clone(), channel_id: original_packet.source_channel.clone() }
}

/// Resolves the caller-supplied `nextSequenceRecv` for a timeout batch.
/// ORDERED channels need the destination's actual next-recv value; UNORDERED
/// channels get overridden to the packet's own sequence inside the
/// `ChainClient` impl regardless of what is passed here (spec 4.1). Channel
/// lookups are deduplicated per `(port,channel)` and fetched in parallel.
pub(super) async fn resolve_next_seqs(dest: &dyn ChainClient, packets: &[PacketV1]) -> Result<Vec<u64>, Error> {
    let mut unique: HashMap<(String, String), ()> = HashMap::new();
    for p in packets {
        unique.entry((p.destination_port.clone(), p.destination_channel.clone())).or_insert(());
    }
    let keys: Vec<_> = unique.keys().cloned().collect();
    let values = try_join_all(keys.iter().map(|(port, channel)| async move {
        dest.next_sequence_recv(port, channel).await.map(|seq| ((port.clone(), channel.clone()), seq))
    }))
    .await?;
    let by_channel: HashMap<_, _> = values.into_iter().collect();
    Ok(packets
        .iter()
        .map(|p| {
            *by_channel
                .get(&(p.destination_port.clone(), p.destination_channel.clone()))
                .unwrap_or(&p.sequence)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn packet(dest_port: &str, dest_channel: &str, sequence: u64) -> PacketV1 {
        PacketV1 {
            sequence,
            source_port: "transfer".into(),
            source_channel: "channel-0".into(),
            destination_port: dest_port.into(),
            destination_channel: dest_channel.into(),
            data: vec![],
            timeout_height: relayer_primitives::height::Height::zero(),
            timeout_timestamp: 0,
        }
    }

    #[test]
    fn groups_by_destination_channel() {
        let group = packet_group(&packet("transfer", "channel-1", 1));
        assert_eq!(group, PacketGroup::Channel { port_id: "transfer".into(), channel_id: "channel-1".into() });
    }

    #[test]
    fn ack_group_uses_source_channel() {
        let group = ack_group(&packet("transfer", "channel-1", 1));
        assert_eq!(group, PacketGroup::Channel { port_id: "transfer".into(), channel_id: "channel-0".into() });
    }
}
