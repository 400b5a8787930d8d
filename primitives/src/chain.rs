//! The Chain Client capability set (spec 4.1): one async trait implemented
//! by both chain variants so the rest of the core (Proof Assembler,
//! Light-Client Manager, Link) never needs to know which chain it is
//! talking to, except where the variant itself is the point (header
//! construction).

use std::time::Duration;

use async_trait::async_trait;

use crate::{
    client_state::{ClientKind, ClientState, ConsensusState},
    error::Error,
    height::Height,
    packet::{Acknowledgement, ChannelOrder, Packet},
    proof::ProofArtifact,
};

/// Scope for the event-log queries (`sentPackets`/`writtenAcks`): a
/// connection-id under IBC v1, a client-id under v2.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scope {
    Connection(String),
    Client(String),
}

/// Grouping key for `unreceivedPackets`/`unreceivedAcks`: v1 groups by
/// `(destPort, destChannel)`, v2 groups by `destClient` (spec 4.5 step 2).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PacketGroup {
    Channel { port_id: String, channel_id: String },
    Client(String),
}

#[derive(Debug, Clone, Copy)]
pub struct HeightRange {
    pub min: Height,
    pub max: Option<Height>,
}

impl HeightRange {
    pub fn from(min: Height) -> Self {
        Self { min, max: None }
    }
}

#[derive(Debug, Clone)]
pub struct SentPacket {
    pub packet: Packet,
    pub height: Height,
}

#[derive(Debug, Clone)]
pub struct WrittenAck {
    pub ack: Acknowledgement,
    pub height: Height,
}

#[derive(Debug, Clone, Default)]
pub struct ConnectionEnd {
    pub client_id: String,
    pub counterparty_client_id: String,
    pub counterparty_connection_id: Option<String>,
    pub state: String,
}

#[derive(Debug, Clone, Default)]
pub struct ChannelEnd {
    pub state: String,
    pub ordering: Option<ChannelOrder>,
    pub counterparty_port_id: String,
    pub counterparty_channel_id: String,
    pub connection_hops: Vec<String>,
}

/// A parsed chain event. `kind` is the event type (`create_client`,
/// `recv_packet`, ...); attributes are the flattened key/value pairs.
#[derive(Debug, Clone)]
pub struct ChainEvent {
    pub kind: String,
    pub attributes: Vec<(String, String)>,
}

impl ChainEvent {
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct TxResult {
    pub height: Height,
    pub tx_hash: String,
    pub events: Vec<ChainEvent>,
}

impl TxResult {
    /// Extracts a newly allocated identifier from the named event's named
    /// attribute, per spec 4.1 "Event ID extraction". Fails with
    /// `Error::Protocol` including the tx hash when absent, as required.
    pub fn find_new_identifier(&self, event_kind: &str, attribute: &str) -> Result<String, Error> {
        self.events
            .iter()
            .find(|e| e.kind == event_kind)
            .and_then(|e| e.attribute(attribute))
            .map(|s| s.to_string())
            .ok_or_else(|| {
                Error::Protocol(format!(
                    "missing {attribute} attribute on {event_kind} event (tx {})",
                    self.tx_hash
                ))
            })
    }
}

/// Opaque validator-set payload: enough to hash, not enough to interpret.
/// The concrete encoding lives in `relayer-tendermint`; `relayer-gno` never
/// produces one of these for real (its consensus doesn't carry a rotating
/// validator set known to the relayer) but the capability set is uniform,
/// per spec 4.1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatorSet {
    pub encoded: Vec<u8>,
}

impl ValidatorSet {
    pub fn hash(&self) -> Vec<u8> {
        use sha2::{Digest, Sha256};
        Sha256::digest(&self.encoded).to_vec()
    }
}

/// Enough of a header to run the evidence check (spec 4.3) without forcing
/// every chain kind into the same wire shape.
#[derive(Debug, Clone)]
pub struct HeaderInfo {
    pub height: Height,
    pub timestamp_unix_secs: u64,
    pub app_hash: Vec<u8>,
    pub next_validators_hash: Option<Vec<u8>>,
}

/// The header/evidence the Light-Client Manager submits in `MsgUpdateClient`.
/// Only the Tendermint variant is validator-set-driven (spec 4.1, 4.3).
#[derive(Debug, Clone)]
pub enum ClientMessage {
    Tendermint {
        signed_header: Vec<u8>,
        validator_set: ValidatorSet,
        trusted_height: Height,
        trusted_validators: ValidatorSet,
    },
    Gno {
        header: Vec<u8>,
        trusted_height: Height,
    },
}

impl ClientMessage {
    pub fn target_height(&self, new_height: Height) -> Height {
        match self {
            ClientMessage::Tendermint { .. } | ClientMessage::Gno { .. } => new_height,
        }
    }
}

/// Batch argument bundle for a `recvPackets`/`ackPackets`/`timeoutPackets`
/// submission: one proof per packet, proof height shared across the batch
/// (all proofs are queried at the same `proofHeight - 1`, spec 4.2).
#[derive(Debug, Clone)]
pub struct ProofBundle {
    pub data: Vec<u8>,
    pub proof: Vec<u8>,
    pub proof_height: Height,
}

fn check_batch_lengths(lens: &[usize]) -> Result<(), Error> {
    if lens.windows(2).all(|w| w[0] == w[1]) && lens.first().map_or(true, |&n| n >= 1) {
        Ok(())
    } else {
        Err(Error::invalid_argument(format!(
            "batch submission requires N >= 1 and equal-length parallel arrays, got {lens:?}"
        )))
    }
}

pub fn check_recv_batch(packets: &[Packet], proofs: &[ProofBundle]) -> Result<(), Error> {
    check_batch_lengths(&[packets.len(), proofs.len()])
}

pub fn check_timeout_batch(
    packets: &[Packet],
    proofs: &[ProofBundle],
    next_seqs: &[u64],
) -> Result<(), Error> {
    check_batch_lengths(&[packets.len(), proofs.len(), next_seqs.len()])
}

/// Uniform capability set over one chain, regardless of variant (spec 4.1).
#[async_trait]
pub trait ChainClient: Send + Sync {
    fn kind(&self) -> ClientKind;
    fn chain_id(&self) -> &str;

    /// Cumulative count of retried RPC attempts since this client was
    /// created (SPEC_FULL 10.8). Chain clients that retry override this;
    /// anything that doesn't retry at all keeps the default of zero.
    fn retry_count(&self) -> u64 {
        0
    }

    // -- lifecycle --
    async fn connect(&self) -> Result<(), Error>;
    async fn disconnect(&self) -> Result<(), Error>;

    // -- queries --
    async fn current_height(&self) -> Result<Height, Error>;
    async fn current_time(&self) -> Result<u64, Error>;
    async fn unbonding_period(&self) -> Result<Duration, Error>;
    async fn header(&self, height: Height) -> Result<HeaderInfo, Error>;
    async fn latest_header(&self) -> Result<HeaderInfo, Error>;
    async fn validator_set(&self, height: Height) -> Result<ValidatorSet, Error>;

    async fn client_state(&self, client_id: &str) -> Result<ClientState, Error>;
    async fn consensus_state(
        &self,
        client_id: &str,
        height: Option<Height>,
    ) -> Result<ConsensusState, Error>;
    async fn connection(&self, connection_id: &str) -> Result<ConnectionEnd, Error>;
    async fn channel(&self, port_id: &str, channel_id: &str) -> Result<ChannelEnd, Error>;
    async fn next_sequence_recv(&self, port_id: &str, channel_id: &str) -> Result<u64, Error>;
    async fn packet_commitment(
        &self,
        port_id: &str,
        channel_id: &str,
        sequence: u64,
    ) -> Result<Option<Vec<u8>>, Error>;
    async fn unreceived_packets(
        &self,
        group: &PacketGroup,
        sequences: &[u64],
    ) -> Result<Vec<u64>, Error>;
    async fn unreceived_acks(
        &self,
        group: &PacketGroup,
        sequences: &[u64],
    ) -> Result<Vec<u64>, Error>;

    /// The Proof Assembler (spec 4.2): given a key class and a proof
    /// height, return the data currently stored under that key together
    /// with its ICS-23 composite proof, queried at `proofHeight - 1`.
    async fn proof(&self, artifact: ProofArtifact, proof_height: Height) -> Result<ProofBundle, Error>;

    // -- event log queries --
    async fn sent_packets(&self, scope: &Scope, range: HeightRange) -> Result<Vec<SentPacket>, Error>;
    async fn written_acks(&self, scope: &Scope, range: HeightRange) -> Result<Vec<WrittenAck>, Error>;

    // -- transactional operations --
    async fn create_client(
        &self,
        client_state: ClientState,
        consensus_state: ConsensusState,
    ) -> Result<String, Error>;
    async fn update_client(&self, client_id: &str, header: ClientMessage) -> Result<TxResult, Error>;
    async fn conn_open_init(&self, client_id: &str, counterparty_client_id: &str) -> Result<String, Error>;
    async fn conn_open_try(&self, client_id: &str, counterparty_connection_id: &str) -> Result<String, Error>;
    async fn conn_open_ack(&self, connection_id: &str) -> Result<TxResult, Error>;
    async fn conn_open_confirm(&self, connection_id: &str) -> Result<TxResult, Error>;
    async fn channel_open_init(&self, port_id: &str, connection_id: &str) -> Result<String, Error>;
    async fn channel_open_try(&self, port_id: &str, counterparty_channel_id: &str) -> Result<String, Error>;
    async fn channel_open_ack(&self, port_id: &str, channel_id: &str) -> Result<TxResult, Error>;
    async fn channel_open_confirm(&self, port_id: &str, channel_id: &str) -> Result<TxResult, Error>;
    /// v2 only: binds a client-id on this chain to its counterparty
    /// client-id, replacing the connection/channel handshake.
    async fn register_counterparty(
        &self,
        client_id: &str,
        counterparty_client_id: &str,
    ) -> Result<TxResult, Error>;

    async fn recv_packets(
        &self,
        batch: Vec<Packet>,
        proofs: Vec<ProofBundle>,
        height: Height,
    ) -> Result<TxResult, Error>;
    async fn ack_packets(
        &self,
        batch: Vec<(Packet, Vec<u8>)>,
        proofs: Vec<ProofBundle>,
        height: Height,
    ) -> Result<TxResult, Error>;
    async fn timeout_packets(
        &self,
        batch: Vec<Packet>,
        proofs: Vec<ProofBundle>,
        next_seqs: Vec<u64>,
        height: Height,
    ) -> Result<TxResult, Error>;
}
