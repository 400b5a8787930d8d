use std::str::FromStr;

use relayer_primitives::error::Error;
use tendermint_rpc::Url;

/// Configuration for one Gno.land chain side. Gno runs on a CometBFT
/// consensus engine, so the transport fields mirror the Tendermint side's
/// config, but there is no gas-price denom negotiation the way Cosmos SDK
/// chains have (gas is out of scope beyond "submit with a user-configured
/// gas price", spec 1).
#[derive(Debug, Clone, serde::Deserialize)]
pub struct GnoChainConfig {
    pub name: String,
    pub chain_id: String,
    pub rpc_url: Url,
    pub websocket_url: Url,
    pub client_id: Option<String>,
    pub realm_namespace: String,
    pub key_name: String,
}

impl GnoChainConfig {
    pub fn from_node_url(chain_id: &str, node: &str, client_id: Option<String>) -> Result<Self, Error> {
        let rpc_url = Url::from_str(node).map_err(|e| Error::Config(format!("invalid node url {node:?}: {e}")))?;
        Ok(Self {
            name: chain_id.to_string(),
            chain_id: chain_id.to_string(),
            rpc_url: rpc_url.clone(),
            websocket_url: rpc_url,
            client_id,
            realm_namespace: format!("gno.land/r/ibc/{chain_id}"),
            key_name: "relayer".to_string(),
        })
    }
}
