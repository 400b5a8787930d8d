use std::str::FromStr;

use relayer_primitives::error::Error;
use tendermint_rpc::Url;

/// Configuration for one Tendermint/Cosmos-SDK chain side, modeled on the
/// teacher's `CosmosClientConfig`. Key material and gas pricing are owned
/// by the out-of-scope mnemonic/fee subsystems (spec 1); this struct only
/// carries what the Chain Client itself needs.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct TendermintChainConfig {
    pub name: String,
    pub chain_id: String,
    pub rpc_url: Url,
    pub grpc_url: Url,
    pub websocket_url: Url,
    pub client_id: Option<String>,
    pub connection_id: Option<String>,
    pub account_prefix: String,
    pub store_prefix: String,
    pub key_name: String,
}

impl TendermintChainConfig {
    /// Builds a config from the plain strings a persisted Relay Path row
    /// carries, reusing one node URL for RPC, gRPC, and the event
    /// websocket (the Supervisor only ever persists a single endpoint per
    /// side, spec 3 "Relay Path").
    pub fn from_node_url(
        chain_id: &str,
        node: &str,
        client_id: Option<String>,
        connection_id: Option<String>,
    ) -> Result<Self, Error> {
        let rpc_url = Url::from_str(node).map_err(|e| Error::Config(format!("invalid node url {node:?}: {e}")))?;
        Ok(Self {
            name: chain_id.to_string(),
            chain_id: chain_id.to_string(),
            rpc_url: rpc_url.clone(),
            grpc_url: rpc_url.clone(),
            websocket_url: rpc_url,
            client_id,
            connection_id,
            account_prefix: "cosmos".to_string(),
            store_prefix: "ibc".to_string(),
            key_name: "relayer".to_string(),
        })
    }
}
