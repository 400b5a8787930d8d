use std::{
    collections::HashSet,
    str::FromStr,
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

use async_trait::async_trait;
use ics23::CommitmentProof;
use prost::Message;
use relayer_primitives::{
    chain::{
        ChainClient, ChainEvent, ChannelEnd, ClientMessage, ConnectionEnd, HeaderInfo, HeightRange,
        PacketGroup, ProofBundle, Scope, SentPacket, TxResult, ValidatorSet, WrittenAck,
    },
    client_state::{ClientKind, ClientState, ConsensusState, MerkleRoot, TrustLevel},
    error::Error,
    height::Height,
    ident::validate_all,
    packet::{AckV2, Acknowledgement, Packet, PacketV2, PayloadV2},
    retry::{retry, RetryPolicy},
};
use tendermint_rpc::{Client, HttpClient, Order};
use tokio::sync::RwLock;

use crate::{
    config::GnoChainConfig,
    error::from_rpc_error,
    proof::{self, RawMerkleProof},
    template::{self, CreateClientRealmParams, RegisterCounterpartyRealmParams},
};

const DEFAULT_UNBONDING_PERIOD: Duration = Duration::from_secs(21 * 24 * 60 * 60);

#[derive(Default)]
struct Mutable {
    client_id: Option<String>,
}

/// Gno.land Chain Client (spec 4.1: "a different consensus-state shape but
/// the same capability set"). Transport is identical to the Tendermint
/// variant; what differs is the consensus-state shape, the absence of a
/// rotating-validator-set header, and state-mutating operations being
/// realm deployments rather than Cosmos SDK `Msg`s.
pub struct GnoChain {
    config: GnoChainConfig,
    rpc: HttpClient,
    retry_policy: RetryPolicy,
    rpc_deadline: Duration,
    state: RwLock<Mutable>,
    retries: AtomicU64,
}

impl GnoChain {
    pub fn new(config: GnoChainConfig, retry_policy: RetryPolicy) -> Result<Self, Error> {
        Self::with_deadline(config, retry_policy, Duration::from_millis(6000) * 10)
    }

    /// `rpc_deadline` bounds each individual RPC attempt (spec 5:
    /// `estimatedBlockTime * 10`); the Supervisor constructs chain clients
    /// with the relayer-wide config's deadline rather than this default.
    pub fn with_deadline(config: GnoChainConfig, retry_policy: RetryPolicy, rpc_deadline: Duration) -> Result<Self, Error> {
        let rpc = HttpClient::new(config.rpc_url.clone())
            .map_err(|e| Error::Config(format!("invalid rpc url for {}: {e}", config.name)))?;
        let client_id = config.client_id.clone();
        Ok(Self {
            config,
            rpc,
            retry_policy,
            rpc_deadline,
            state: RwLock::new(Mutable { client_id }),
            retries: AtomicU64::new(0),
        })
    }

    async fn with_retry<T, F, Fut>(&self, context: &str, mut op: F) -> Result<T, Error>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, Error>>,
    {
        let deadline = self.rpc_deadline;
        retry(
            self.retry_policy,
            Error::is_retryable,
            || {
                self.retries.fetch_add(1, Ordering::Relaxed);
            },
            move || {
                let fut = op();
                async move {
                    match tokio::time::timeout(deadline, fut).await {
                        Ok(result) => result,
                        Err(_) => Err(Error::Network(format!("rpc call timed out after {deadline:?}"))),
                    }
                }
            },
        )
        .await
        .map_err(|e| match e {
            Error::Network(msg) => Error::Network(format!("{context} (after retries): {msg}")),
            other => other,
        })
    }

    async fn abci_query(
        &self,
        path: &str,
        data: Vec<u8>,
        height: Height,
        prove: bool,
    ) -> Result<tendermint_rpc::endpoint::abci_query::AbciQuery, Error> {
        let tm_height = if height.is_zero() {
            None
        } else {
            Some(
                tendermint::block::Height::try_from(height.revision_height)
                    .map_err(|e| Error::Protocol(format!("invalid height {height}: {e}")))?,
            )
        };
        let path = tendermint_rpc::abci::Path::from_str(path).ok();
        let response = self
            .with_retry("abci_query", || async {
                self.rpc
                    .abci_query(path.clone(), data.clone(), tm_height, prove)
                    .await
                    .map_err(|e| from_rpc_error("abci_query", e))
            })
            .await?;
        if !response.code.is_ok() {
            return Err(Error::ChainExecution { log: response.log.to_string(), tx_hash: None });
        }
        Ok(response)
    }

    /// Fixed VM store route; the realm-scoped key travels as query data,
    /// not the path, since v2 keys are raw binary (spec 4.2 Keys table).
    fn vm_query_path(&self) -> String {
        format!("/vm/qstore/{}", self.config.realm_namespace)
    }

    async fn query_key(&self, key: Vec<u8>) -> Result<Vec<u8>, Error> {
        let response = self.abci_query(&self.vm_query_path(), key, Height::zero(), false).await?;
        Ok(response.value.to_vec())
    }

    async fn query_with_proof(&self, key: Vec<u8>, proof_height: Height) -> Result<ProofBundle, Error> {
        let response = self.abci_query(&self.vm_query_path(), key.clone(), proof_height.query_height(), true).await?;
        let raw_proof = response.proof.ok_or_else(|| {
            Error::Protocol(format!("no proof returned for key {}", String::from_utf8_lossy(&key)))
        })?;
        let mut ops = raw_proof.ops.into_iter();
        let iavl_op = ops.next().ok_or_else(|| Error::Protocol("missing iavl proof op".into()))?;
        let simple_op = ops.next().ok_or_else(|| Error::Protocol("missing simple store proof op".into()))?;
        let iavl_proof = CommitmentProof::decode(iavl_op.data.as_slice())
            .map_err(|e| Error::Protocol(format!("malformed iavl proof op: {e}")))?;
        let simple_proof = CommitmentProof::decode(simple_op.data.as_slice())
            .map_err(|e| Error::Protocol(format!("malformed simple store proof op: {e}")))?;
        proof::existence_proof_value(&iavl_proof).map_err(|_| {
            Error::Protocol(format!("proof key mismatch for {}: no existence proof", String::from_utf8_lossy(&key)))
        })?;
        proof::assemble(response.value.to_vec(), RawMerkleProof { iavl_proof, simple_proof }, proof_height)
    }

    async fn submit_realm(&self, source: String) -> Result<TxResult, Error> {
        let tx_bytes = source.into_bytes();
        let response = self
            .with_retry("broadcast_tx_commit", || async {
                self.rpc
                    .broadcast_tx_commit(tx_bytes.clone())
                    .await
                    .map_err(|e| from_rpc_error("broadcast_tx_commit", e))
            })
            .await?;
        if response.check_tx.code.is_err() || response.deliver_tx.code.is_err() {
            return Err(Error::ChainExecution {
                log: format!("{}/{}", response.check_tx.log, response.deliver_tx.log),
                tx_hash: Some(response.hash.to_string()),
            });
        }
        let events = response
            .deliver_tx
            .events
            .into_iter()
            .map(|event| ChainEvent {
                kind: event.kind,
                attributes: event
                    .attributes
                    .into_iter()
                    .map(|a| (a.key.to_string(), a.value.to_string()))
                    .collect(),
            })
            .collect();
        Ok(TxResult { height: Height::new(0, response.height.value()), tx_hash: response.hash.to_string(), events })
    }
}

#[async_trait]
impl ChainClient for GnoChain {
    fn kind(&self) -> ClientKind {
        ClientKind::Gno
    }

    fn chain_id(&self) -> &str {
        &self.config.chain_id
    }

    fn retry_count(&self) -> u64 {
        self.retries.load(Ordering::Relaxed)
    }

    async fn connect(&self) -> Result<(), Error> {
        self.with_retry("connect", || async {
            self.rpc.status().await.map(|_| ()).map_err(|e| from_rpc_error("status", e))
        })
        .await
    }

    async fn disconnect(&self) -> Result<(), Error> {
        Ok(())
    }

    async fn current_height(&self) -> Result<Height, Error> {
        let status = self
            .with_retry("status", || async { self.rpc.status().await.map_err(|e| from_rpc_error("status", e)) })
            .await?;
        Ok(Height::new(0, status.sync_info.latest_block_height.value()))
    }

    async fn current_time(&self) -> Result<u64, Error> {
        let status = self
            .with_retry("status", || async { self.rpc.status().await.map_err(|e| from_rpc_error("status", e)) })
            .await?;
        Ok(status.sync_info.latest_block_time.unix_timestamp() as u64)
    }

    async fn unbonding_period(&self) -> Result<Duration, Error> {
        if let Some(client_id) = &self.state.read().await.client_id {
            return Ok(self.client_state(client_id).await?.unbonding_period);
        }
        Ok(DEFAULT_UNBONDING_PERIOD)
    }

    async fn header(&self, height: Height) -> Result<HeaderInfo, Error> {
        let tm_height = tendermint::block::Height::try_from(height.revision_height)
            .map_err(|e| Error::Protocol(format!("invalid height {height}: {e}")))?;
        let block = self
            .with_retry("block", || async { self.rpc.block(tm_height).await.map_err(|e| from_rpc_error("block", e)) })
            .await?;
        let header = block.block.header;
        Ok(HeaderInfo {
            height,
            timestamp_unix_secs: header.time.unix_timestamp() as u64,
            app_hash: header.app_hash.as_bytes().to_vec(),
            // Gno.land's header carries no rotating validator set known to
            // the relayer (spec 4.1); there is nothing to hash here.
            next_validators_hash: None,
        })
    }

    async fn latest_header(&self) -> Result<HeaderInfo, Error> {
        let height = self.current_height().await?;
        self.header(height).await
    }

    async fn validator_set(&self, _height: Height) -> Result<ValidatorSet, Error> {
        Err(Error::Protocol(
            "Gno chains have no relayer-visible rotating validator set; validator_set is a Tendermint-only query"
                .into(),
        ))
    }

    async fn client_state(&self, client_id: &str) -> Result<ClientState, Error> {
        validate_all([client_id])?;
        let key = relayer_primitives::path::client_state(client_id);
        let value = self.query_key(key.into_bytes()).await?;
        decode_client_state(&value)
    }

    async fn consensus_state(&self, client_id: &str, height: Option<Height>) -> Result<ConsensusState, Error> {
        validate_all([client_id])?;
        let height = match height {
            Some(h) => h,
            None => self.client_state(client_id).await?.latest_height,
        };
        let key = relayer_primitives::path::consensus_state(client_id, height);
        let value = self.query_key(key.into_bytes()).await?;
        decode_consensus_state(&value)
    }

    async fn connection(&self, connection_id: &str) -> Result<ConnectionEnd, Error> {
        validate_all([connection_id])?;
        Err(Error::Protocol(format!(
            "Gno paths use IBC v2 client-to-client addressing; connection {connection_id} is not applicable"
        )))
    }

    async fn channel(&self, port_id: &str, channel_id: &str) -> Result<ChannelEnd, Error> {
        validate_all([port_id, channel_id])?;
        Err(Error::Protocol("Gno paths use IBC v2 client-to-client addressing; channels are not applicable".into()))
    }

    async fn next_sequence_recv(&self, _port_id: &str, _channel_id: &str) -> Result<u64, Error> {
        Err(Error::Protocol("next_sequence_recv is a v1-only query".into()))
    }

    async fn packet_commitment(
        &self,
        _port_id: &str,
        _channel_id: &str,
        _sequence: u64,
    ) -> Result<Option<Vec<u8>>, Error> {
        Err(Error::Protocol("packet_commitment by (port,channel) is a v1-only query on Gno".into()))
    }

    async fn unreceived_packets(&self, group: &PacketGroup, sequences: &[u64]) -> Result<Vec<u64>, Error> {
        let client_id = v2_client(group)?;
        let mut unreceived = Vec::new();
        for &sequence in sequences {
            let key = relayer_primitives::path::packet_receipt_v2(&client_id, sequence);
            let value = self.query_key(key).await?;
            if value.is_empty() {
                unreceived.push(sequence);
            }
        }
        Ok(unreceived)
    }

    async fn unreceived_acks(&self, group: &PacketGroup, sequences: &[u64]) -> Result<Vec<u64>, Error> {
        let client_id = v2_client(group)?;
        let mut unreceived = Vec::new();
        for &sequence in sequences {
            let key = relayer_primitives::path::packet_commitment_v2(&client_id, sequence);
            let value = self.query_key(key).await?;
            if !value.is_empty() {
                unreceived.push(sequence);
            }
        }
        Ok(unreceived)
    }

    async fn proof(&self, artifact: relayer_primitives::ProofArtifact, proof_height: Height) -> Result<ProofBundle, Error> {
        let key = gno_proof_key(&artifact)?;
        self.query_with_proof(key, proof_height).await
    }

    async fn sent_packets(&self, scope: &Scope, range: HeightRange) -> Result<Vec<SentPacket>, Error> {
        let query = match scope {
            Scope::Client(client_id) => format!("send_packet.client_id='{client_id}'"),
            Scope::Connection(_) => {
                return Err(Error::Protocol("Gno paths are scoped by client id, not connection id".into()))
            }
        };
        let events = self.search_tx_events(&query, range).await?;
        let mut seen = HashSet::new();
        let mut packets = Vec::new();
        for (height, event) in events {
            if let Some(packet) = decode_send_packet_event(&event) {
                if seen.insert(packet.sequence) {
                    packets.push(SentPacket { packet: Packet::V2(packet), height });
                }
            }
        }
        Ok(packets)
    }

    async fn written_acks(&self, scope: &Scope, range: HeightRange) -> Result<Vec<WrittenAck>, Error> {
        let query = match scope {
            Scope::Client(client_id) => format!("write_acknowledgement.client_id='{client_id}'"),
            Scope::Connection(_) => {
                return Err(Error::Protocol("Gno paths are scoped by client id, not connection id".into()))
            }
        };
        let events = self.search_tx_events(&query, range).await?;
        let mut seen = HashSet::new();
        let mut acks = Vec::new();
        for (height, event) in events {
            if let Some((packet, ack)) = decode_write_ack_event(&event) {
                if seen.insert(packet.sequence) {
                    acks.push(WrittenAck { ack: Acknowledgement::V2 { original_packet: packet, acknowledgement: ack }, height });
                }
            }
        }
        Ok(acks)
    }

    async fn create_client(
        &self,
        client_state: ClientState,
        _consensus_state: ConsensusState,
    ) -> Result<String, Error> {
        let client_id = format!("gno-client-{}", client_state.latest_height.revision_height);
        let params = CreateClientRealmParams {
            realm_namespace: self.config.realm_namespace.clone(),
            client_id: client_id.clone(),
            counterparty_chain_id: client_state.chain_id,
            trusting_period_secs: client_state.trusting_period.as_secs(),
            latest_height: client_state.latest_height.revision_height,
        };
        let source = template::render_create_client_realm(&params)?;
        self.submit_realm(source).await?;
        self.state.write().await.client_id = Some(client_id.clone());
        Ok(client_id)
    }

    async fn update_client(&self, client_id: &str, header: ClientMessage) -> Result<TxResult, Error> {
        validate_all([client_id])?;
        let ClientMessage::Gno { header, .. } = header else {
            return Err(Error::Protocol("Gno update_client requires a Gno-shaped header".into()));
        };
        let update: GnoHeaderUpdate = serde_json::from_slice(&header)
            .map_err(|e| Error::Protocol(format!("malformed Gno header update payload: {e}")))?;
        let params = template::UpdateClientRealmParams {
            realm_namespace: self.config.realm_namespace.clone(),
            client_id: client_id.to_string(),
            new_height: update.height,
            new_app_hash_hex: hex::encode(&update.app_hash),
        };
        let source = template::render_update_client_realm(&params)?;
        self.submit_realm(source).await
    }

    async fn conn_open_init(&self, _client_id: &str, _counterparty_client_id: &str) -> Result<String, Error> {
        Err(Error::Protocol("Gno uses register_counterparty, not the v1 connection handshake".into()))
    }

    async fn conn_open_try(&self, _client_id: &str, _counterparty_connection_id: &str) -> Result<String, Error> {
        Err(Error::Protocol("Gno uses register_counterparty, not the v1 connection handshake".into()))
    }

    async fn conn_open_ack(&self, _connection_id: &str) -> Result<TxResult, Error> {
        Err(Error::Protocol("Gno uses register_counterparty, not the v1 connection handshake".into()))
    }

    async fn conn_open_confirm(&self, _connection_id: &str) -> Result<TxResult, Error> {
        Err(Error::Protocol("Gno uses register_counterparty, not the v1 connection handshake".into()))
    }

    async fn channel_open_init(&self, _port_id: &str, _connection_id: &str) -> Result<String, Error> {
        Err(Error::Protocol("Gno uses register_counterparty, not the v1 channel handshake".into()))
    }

    async fn channel_open_try(&self, _port_id: &str, _counterparty_channel_id: &str) -> Result<String, Error> {
        Err(Error::Protocol("Gno uses register_counterparty, not the v1 channel handshake".into()))
    }

    async fn channel_open_ack(&self, _port_id: &str, _channel_id: &str) -> Result<TxResult, Error> {
        Err(Error::Protocol("Gno uses register_counterparty, not the v1 channel handshake".into()))
    }

    async fn channel_open_confirm(&self, _port_id: &str, _channel_id: &str) -> Result<TxResult, Error> {
        Err(Error::Protocol("Gno uses register_counterparty, not the v1 channel handshake".into()))
    }

    async fn register_counterparty(
        &self,
        client_id: &str,
        counterparty_client_id: &str,
    ) -> Result<TxResult, Error> {
        validate_all([client_id, counterparty_client_id])?;
        let params = RegisterCounterpartyRealmParams {
            realm_namespace: self.config.realm_namespace.clone(),
            client_id: client_id.to_string(),
            counterparty_client_id: counterparty_client_id.to_string(),
        };
        let source = template::render_register_counterparty_realm(&params)?;
        self.submit_realm(source).await
    }

    async fn recv_packets(&self, batch: Vec<Packet>, proofs: Vec<ProofBundle>, height: Height) -> Result<TxResult, Error> {
        relayer_primitives::chain::check_recv_batch(&batch, &proofs)?;
        let packets = batch
            .iter()
            .zip(proofs.iter())
            .map(|(packet, bundle)| {
                let p = as_v2(packet)?;
                Ok(template::RecvPacketEntry {
                    source_client: p.source_client.clone(),
                    destination_client: p.destination_client.clone(),
                    sequence: p.sequence,
                    payload_hex: hex::encode(payload_value(p)),
                    proof_hex: hex::encode(&bundle.proof),
                })
            })
            .collect::<Result<Vec<_>, Error>>()?;
        let params =
            template::RecvPacketsRealmParams { realm_namespace: self.config.realm_namespace.clone(), proof_height: height.revision_height, packets };
        let source = template::render_recv_packets_realm(&params)?;
        self.submit_realm(source).await
    }

    async fn ack_packets(&self, batch: Vec<(Packet, Vec<u8>)>, proofs: Vec<ProofBundle>, height: Height) -> Result<TxResult, Error> {
        if batch.len() != proofs.len() || batch.is_empty() {
            return Err(Error::invalid_argument("ackPackets requires N >= 1 equal-length arrays"));
        }
        let acks = batch
            .iter()
            .zip(proofs.iter())
            .map(|((packet, ack_bytes), bundle)| {
                let p = as_v2(packet)?;
                Ok(template::AckPacketEntry {
                    source_client: p.source_client.clone(),
                    destination_client: p.destination_client.clone(),
                    sequence: p.sequence,
                    ack_hex: hex::encode(ack_bytes),
                    proof_hex: hex::encode(&bundle.proof),
                })
            })
            .collect::<Result<Vec<_>, Error>>()?;
        let params =
            template::AckPacketsRealmParams { realm_namespace: self.config.realm_namespace.clone(), proof_height: height.revision_height, acks };
        let source = template::render_ack_packets_realm(&params)?;
        self.submit_realm(source).await
    }

    async fn timeout_packets(
        &self,
        batch: Vec<Packet>,
        proofs: Vec<ProofBundle>,
        next_seqs: Vec<u64>,
        height: Height,
    ) -> Result<TxResult, Error> {
        relayer_primitives::chain::check_timeout_batch(&batch, &proofs, &next_seqs)?;
        // v2 packets carry their own sequence; there is no ordered/unordered
        // override quirk here, that is a v1-only wrinkle (spec 4.1).
        let packets = batch
            .iter()
            .zip(proofs.iter())
            .zip(next_seqs.iter())
            .map(|((packet, bundle), &next_sequence_recv)| {
                let p = as_v2(packet)?;
                Ok(template::TimeoutPacketEntry {
                    source_client: p.source_client.clone(),
                    destination_client: p.destination_client.clone(),
                    sequence: p.sequence,
                    next_sequence_recv,
                    proof_hex: hex::encode(&bundle.proof),
                })
            })
            .collect::<Result<Vec<_>, Error>>()?;
        let params = template::TimeoutPacketsRealmParams {
            realm_namespace: self.config.realm_namespace.clone(),
            proof_height: height.revision_height,
            packets,
        };
        let source = template::render_timeout_packets_realm(&params)?;
        self.submit_realm(source).await
    }
}

impl GnoChain {
    async fn search_tx_events(&self, query: &str, range: HeightRange) -> Result<Vec<(Height, ChainEvent)>, Error> {
        let query = tendermint_rpc::query::Query::from_str(query)
            .map_err(|e| Error::Protocol(format!("malformed event query {query:?}: {e}")))?;
        let response = self
            .with_retry("tx_search", || async {
                self.rpc.tx_search(query.clone(), false, 1, 100, Order::Ascending).await.map_err(|e| {
                    from_rpc_error("tx_search", e)
                })
            })
            .await?;
        let mut out = Vec::new();
        for tx in response.txs {
            let height = Height::new(0, tx.height.value());
            if height < range.min || range.max.map_or(false, |max| height > max) {
                continue;
            }
            for event in tx.tx_result.events {
                out.push((
                    height,
                    ChainEvent {
                        kind: event.kind,
                        attributes: event
                            .attributes
                            .into_iter()
                            .map(|a| (a.key.to_string(), a.value.to_string()))
                            .collect(),
                    },
                ));
            }
        }
        Ok(out)
    }
}

/// Maps an artifact to its storage key, restricted to what Gno actually
/// addresses (v2 packet state plus client/consensus state). v1 artifacts
/// never occur here, since Gno never produces a v1-scoped `PacketGroup`.
fn gno_proof_key(artifact: &relayer_primitives::ProofArtifact) -> Result<Vec<u8>, Error> {
    use relayer_primitives::ProofArtifact;
    match artifact {
        ProofArtifact::ClientState { client_id } => Ok(relayer_primitives::path::client_state(client_id).into_bytes()),
        ProofArtifact::ConsensusState { client_id, height } => {
            Ok(relayer_primitives::path::consensus_state(client_id, *height).into_bytes())
        }
        ProofArtifact::PacketCommitmentV2 { client_id, sequence } => {
            Ok(relayer_primitives::path::packet_commitment_v2(client_id, *sequence))
        }
        ProofArtifact::PacketAckV2 { client_id, sequence } => {
            Ok(relayer_primitives::path::packet_ack_v2(client_id, *sequence))
        }
        ProofArtifact::PacketReceiptV2 { client_id, sequence } => {
            Ok(relayer_primitives::path::packet_receipt_v2(client_id, *sequence))
        }
        ProofArtifact::PacketCommitmentV1 { .. }
        | ProofArtifact::PacketAckV1 { .. }
        | ProofArtifact::PacketReceiptV1 { .. }
        | ProofArtifact::ChannelEndV1 { .. }
        | ProofArtifact::ConnectionV1 { .. } => {
            Err(Error::Protocol("Gno paths use IBC v2 client-to-client addressing; v1 proof artifacts are not applicable".into()))
        }
    }
}

/// Every Gno packet is v2 client-to-client; this should never see a
/// `Packet::V1` since nothing on this chain client ever produces one.
fn as_v2(packet: &Packet) -> Result<&PacketV2, Error> {
    match packet {
        Packet::V2(p) => Ok(p),
        Packet::V1(_) => Err(Error::InvariantViolation("v1 packet submitted to a Gno chain client".into())),
    }
}

fn payload_value(packet: &PacketV2) -> &[u8] {
    packet.payloads.first().map(|p| p.value.as_slice()).unwrap_or(&[])
}

fn v2_client(group: &PacketGroup) -> Result<String, Error> {
    match group {
        PacketGroup::Client(client_id) => Ok(client_id.clone()),
        PacketGroup::Channel { .. } => {
            Err(Error::InvariantViolation("Gno chain client cannot resolve a channel-scoped group".into()))
        }
    }
}

fn decode_client_state(bytes: &[u8]) -> Result<ClientState, Error> {
    let stored: StoredClientState = serde_json::from_slice(bytes)
        .map_err(|e| Error::Protocol(format!("malformed Gno client state: {e}")))?;
    Ok(ClientState {
        chain_id: stored.counterparty_chain_id,
        trust_level: TrustLevel::ONE_THIRD,
        trusting_period: Duration::from_secs(stored.trusting_period_secs),
        unbonding_period: Duration::from_secs(stored.unbonding_period_secs),
        max_clock_drift: Duration::from_secs(10),
        latest_height: Height::new(0, stored.latest_height),
        frozen_height: None,
        upgrade_path: vec![],
        allow_update_after_expiry: false,
        allow_update_after_misbehaviour: false,
    })
}

fn decode_consensus_state(bytes: &[u8]) -> Result<ConsensusState, Error> {
    let stored: StoredConsensusState = serde_json::from_slice(bytes)
        .map_err(|e| Error::Protocol(format!("malformed Gno consensus state: {e}")))?;
    Ok(ConsensusState::Gno {
        timestamp_unix_secs: stored.timestamp_unix_secs,
        root: MerkleRoot { hash: stored.app_hash },
        realm_root_hash: stored.realm_root_hash,
    })
}

/// Gno packets are always v2 client-to-client (spec 4.1); every other method
/// on this chain client rejects v1 addressing, so the events decoded here
/// must not be tagged `Packet::V1` either.
fn decode_send_packet_event(event: &ChainEvent) -> Option<PacketV2> {
    if event.kind != "send_packet" {
        return None;
    }
    let payload = PayloadV2 {
        source_port: event.attribute("source_port").unwrap_or_default().to_string(),
        destination_port: event.attribute("destination_port").unwrap_or_default().to_string(),
        encoding: event.attribute("encoding").unwrap_or_default().to_string(),
        value: hex::decode(event.attribute("data_hex").unwrap_or("")).unwrap_or_default(),
        version: event.attribute("version").unwrap_or_default().to_string(),
    };
    Some(PacketV2 {
        sequence: event.attribute("sequence")?.parse().ok()?,
        source_client: event.attribute("source_client")?.to_string(),
        destination_client: event.attribute("destination_client")?.to_string(),
        payloads: vec![payload],
        timeout_timestamp: event.attribute("timeout_timestamp")?.parse().ok()?,
    })
}

fn decode_write_ack_event(event: &ChainEvent) -> Option<(PacketV2, AckV2)> {
    if event.kind != "write_acknowledgement" {
        return None;
    }
    let packet = decode_send_packet_event(&ChainEvent { kind: "send_packet".into(), attributes: event.attributes.clone() })?;
    let ack = hex::decode(event.attribute("ack_hex")?).ok()?;
    Some((packet, AckV2 { app_acknowledgements: vec![ack] }))
}

/// Wire payload for `ClientMessage::Gno::header`: the new height and app
/// hash the realm should record. Gno has no validator-set-driven header, so
/// this is the entire "header" the update path needs (spec 4.1: "a
/// different consensus-state shape but the same capability set").
#[derive(serde::Serialize, serde::Deserialize)]
pub struct GnoHeaderUpdate {
    pub height: u64,
    pub app_hash: Vec<u8>,
}

#[derive(serde::Deserialize)]
struct StoredClientState {
    counterparty_chain_id: String,
    trusting_period_secs: u64,
    unbonding_period_secs: u64,
    latest_height: u64,
}

#[derive(serde::Deserialize)]
struct StoredConsensusState {
    timestamp_unix_secs: u64,
    app_hash: Vec<u8>,
    realm_root_hash: Vec<u8>,
}
