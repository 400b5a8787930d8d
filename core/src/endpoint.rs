//! The addressable "side" of a relay (spec 4.4): binds a chain client to its
//! client-id on the counterparty and, for IBC v1, a connection-id.
//! `version = 1 <=> connection_id present; version = 2 <=> absent`.

use std::sync::Arc;

use relayer_primitives::{
    chain::{ChainClient, HeightRange, Scope, SentPacket, WrittenAck},
    error::Error,
    height::Height,
    relay_path::IbcVersion,
};

#[derive(Clone)]
pub struct Endpoint {
    pub client: Arc<dyn ChainClient>,
    pub client_id: String,
    pub connection_id: Option<String>,
    pub version: IbcVersion,
}

impl Endpoint {
    pub fn new(
        client: Arc<dyn ChainClient>,
        client_id: String,
        connection_id: Option<String>,
        version: IbcVersion,
    ) -> Result<Self, Error> {
        match (version, &connection_id) {
            (IbcVersion::V1, None) => {
                Err(Error::Config(format!("endpoint on client {client_id} is v1 but has no connection_id")))
            }
            (IbcVersion::V2, Some(_)) => {
                Err(Error::Config(format!("endpoint on client {client_id} is v2 but carries a connection_id")))
            }
            _ => Ok(Self { client, client_id, connection_id, version }),
        }
    }

    fn scope(&self) -> Scope {
        match &self.connection_id {
            Some(connection_id) => Scope::Connection(connection_id.clone()),
            None => Scope::Client(self.client_id.clone()),
        }
    }

    pub async fn query_sent_packets(&self, min_height: Height) -> Result<Vec<SentPacket>, Error> {
        self.client.sent_packets(&self.scope(), HeightRange::from(min_height)).await
    }

    pub async fn query_written_acks(&self, min_height: Height) -> Result<Vec<WrittenAck>, Error> {
        self.client.written_acks(&self.scope(), HeightRange::from(min_height)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relayer_primitives::client_state::ClientKind;

    struct StubChain;

    #[async_trait::async_trait]
    impl ChainClient for StubChain {
        fn kind(&self) -> ClientKind {
            ClientKind::Tendermint
        }
        fn chain_id(&self) -> &str {
            "stub"
        }
        async fn connect(&self) -> Result<(), Error> {
            Ok(())
        }
        async fn disconnect(&self) -> Result<(), Error> {
            Ok(())
        }
        async fn current_height(&self) -> Result<Height, Error> {
            Ok(Height::zero())
        }
        async fn current_time(&self) -> Result<u64, Error> {
            Ok(0)
        }
        async fn unbonding_period(&self) -> Result<std::time::Duration, Error> {
            Ok(std::time::Duration::ZERO)
        }
        async fn header(&self, _height: Height) -> Result<relayer_primitives::chain::HeaderInfo, Error> {
            unimplemented!()
        }
        async fn latest_header(&self) -> Result<relayer_primitives::chain::HeaderInfo, Error> {
            unimplemented!()
        }
        async fn validator_set(&self, _height: Height) -> Result<relayer_primitives::chain::ValidatorSet, Error> {
            unimplemented!()
        }
        async fn client_state(&self, _client_id: &str) -> Result<relayer_primitives::ClientState, Error> {
            unimplemented!()
        }
        async fn consensus_state(
            &self,
            _client_id: &str,
            _height: Option<Height>,
        ) -> Result<relayer_primitives::ConsensusState, Error> {
            unimplemented!()
        }
        async fn connection(&self, _connection_id: &str) -> Result<relayer_primitives::chain::ConnectionEnd, Error> {
            unimplemented!()
        }
        async fn channel(
            &self,
            _port_id: &str,
            _channel_id: &str,
        ) -> Result<relayer_primitives::chain::ChannelEnd, Error> {
            unimplemented!()
        }
        async fn next_sequence_recv(&self, _port_id: &str, _channel_id: &str) -> Result<u64, Error> {
            unimplemented!()
        }
        async fn packet_commitment(
            &self,
            _port_id: &str,
            _channel_id: &str,
            _sequence: u64,
        ) -> Result<Option<Vec<u8>>, Error> {
            unimplemented!()
        }
        async fn unreceived_packets(
            &self,
            _group: &relayer_primitives::chain::PacketGroup,
            _sequences: &[u64],
        ) -> Result<Vec<u64>, Error> {
            unimplemented!()
        }
        async fn unreceived_acks(
            &self,
            _group: &relayer_primitives::chain::PacketGroup,
            _sequences: &[u64],
        ) -> Result<Vec<u64>, Error> {
            unimplemented!()
        }
        async fn proof(
            &self,
            _artifact: relayer_primitives::ProofArtifact,
            _proof_height: Height,
        ) -> Result<relayer_primitives::chain::ProofBundle, Error> {
            unimplemented!()
        }
        async fn sent_packets(&self, scope: &Scope, _range: HeightRange) -> Result<Vec<SentPacket>, Error> {
            assert!(matches!(scope, Scope::Connection(_)));
            Ok(vec![])
        }
        async fn written_acks(&self, _scope: &Scope, _range: HeightRange) -> Result<Vec<WrittenAck>, Error> {
            Ok(vec![])
        }
        async fn create_client(
            &self,
            _client_state: relayer_primitives::ClientState,
            _consensus_state: relayer_primitives::ConsensusState,
        ) -> Result<String, Error> {
            unimplemented!()
        }
        async fn update_client(
            &self,
            _client_id: &str,
            _header: relayer_primitives::chain::ClientMessage,
        ) -> Result<relayer_primitives::chain::TxResult, Error> {
            unimplemented!()
        }
        async fn conn_open_init(&self, _client_id: &str, _counterparty_client_id: &str) -> Result<String, Error> {
            unimplemented!()
        }
        async fn conn_open_try(&self, _client_id: &str, _counterparty_connection_id: &str) -> Result<String, Error> {
            unimplemented!()
        }
        async fn conn_open_ack(&self, _connection_id: &str) -> Result<relayer_primitives::chain::TxResult, Error> {
            unimplemented!()
        }
        async fn conn_open_confirm(
            &self,
            _connection_id: &str,
        ) -> Result<relayer_primitives::chain::TxResult, Error> {
            unimplemented!()
        }
        async fn channel_open_init(&self, _port_id: &str, _connection_id: &str) -> Result<String, Error> {
            unimplemented!()
        }
        async fn channel_open_try(&self, _port_id: &str, _counterparty_channel_id: &str) -> Result<String, Error> {
            unimplemented!()
        }
        async fn channel_open_ack(
            &self,
            _port_id: &str,
            _channel_id: &str,
        ) -> Result<relayer_primitives::chain::TxResult, Error> {
            unimplemented!()
        }
        async fn channel_open_confirm(
            &self,
            _port_id: &str,
            _channel_id: &str,
        ) -> Result<relayer_primitives::chain::TxResult, Error> {
            unimplemented!()
        }
        async fn register_counterparty(
            &self,
            _client_id: &str,
            _counterparty_client_id: &str,
        ) -> Result<relayer_primitives::chain::TxResult, Error> {
            unimplemented!()
        }
        async fn recv_packets(
            &self,
            _batch: Vec<relayer_primitives::Packet>,
            _proofs: Vec<relayer_primitives::chain::ProofBundle>,
            _height: Height,
        ) -> Result<relayer_primitives::chain::TxResult, Error> {
            unimplemented!()
        }
        async fn ack_packets(
            &self,
            _batch: Vec<(relayer_primitives::Packet, Vec<u8>)>,
            _proofs: Vec<relayer_primitives::chain::ProofBundle>,
            _height: Height,
        ) -> Result<relayer_primitives::chain::TxResult, Error> {
            unimplemented!()
        }
        async fn timeout_packets(
            &self,
            _batch: Vec<relayer_primitives::Packet>,
            _proofs: Vec<relayer_primitives::chain::ProofBundle>,
            _next_seqs: Vec<u64>,
            _height: Height,
        ) -> Result<relayer_primitives::chain::TxResult, Error> {
            unimplemented!()
        }
    }

    #[test]
    fn rejects_v1_without_connection_id() {
        let endpoint = Endpoint::new(Arc::new(StubChain), "07-tendermint-0".into(), None, IbcVersion::V1);
        assert!(endpoint.is_err());
    }

    #[test]
    fn rejects_v2_with_connection_id() {
        let endpoint = Endpoint::new(
            Arc::new(StubChain),
            "client-0".into(),
            Some("connection-0".into()),
            IbcVersion::V2,
        );
        assert!(endpoint.is_err());
    }

    #[tokio::test]
    async fn v1_endpoint_scopes_queries_by_connection() {
        let endpoint = Endpoint::new(
            Arc::new(StubChain),
            "07-tendermint-0".into(),
            Some("connection-0".into()),
            IbcVersion::V1,
        )
        .unwrap();
        assert!(endpoint.query_sent_packets(Height::zero()).await.unwrap().is_empty());
    }
}
