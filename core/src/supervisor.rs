//! The Relayer Supervisor (spec 4.6): holds the set of configured relay
//! paths, builds their Chain Clients and Links, runs the poll loop, and
//! persists last-relayed heights between iterations.

use std::{collections::HashMap, sync::Arc};

use relayer_gno::{GnoChain, GnoChainConfig};
use relayer_primitives::{
    chain::ChainClient,
    config::Config,
    error::Error,
    ident::validate_all,
    relay_path::{ChainType, IbcVersion, RelayPath, RelayedHeights},
    retry::RetryPolicy,
};
use relayer_tendermint::{TendermintChain, TendermintChainConfig};
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;
use tracing::{error, info};

use crate::{endpoint::Endpoint, light_client::LightClientManager, link::Link, metrics::Metrics, store::Store};

/// Derives a stable, URL-safe path id from its two endpoints. Persisted
/// Relay Paths carry no user-supplied id in the CLI surface (section 6 lists
/// only the chain/URL/type/version flags), so the Supervisor makes one up
/// deterministically -- re-adding the identical path again is then a no-op
/// rather than a duplicate row.
pub fn derive_path_id(chain_id_a: &str, node_a: &str, chain_id_b: &str, node_b: &str, version: IbcVersion) -> String {
    let mut hasher = Sha256::new();
    hasher.update(chain_id_a.as_bytes());
    hasher.update([0]);
    hasher.update(node_a.as_bytes());
    hasher.update([0]);
    hasher.update(chain_id_b.as_bytes());
    hasher.update([0]);
    hasher.update(node_b.as_bytes());
    hasher.update([0]);
    hasher.update([version as u8]);
    format!("path-{}", hex::encode(&hasher.finalize()[..8]))
}

struct LiveLink {
    link: Link,
    heights: RelayedHeights,
}

pub struct Supervisor {
    config: Config,
    store: Store,
    retry_policy: RetryPolicy,
    metrics: Metrics,
    links: Mutex<HashMap<String, LiveLink>>,
}

impl Supervisor {
    pub fn new(config: Config, store: Store) -> Result<Self, Error> {
        let retry_policy = RetryPolicy {
            max_retries: config.max_retries,
            initial_backoff: config.retry_backoff,
            max_backoff: config.max_retry_backoff,
        };
        let metrics = Metrics::new().map_err(|e| Error::Config(format!("failed to register metrics: {e}")))?;
        Ok(Self { config, store, retry_policy, metrics, links: Mutex::new(HashMap::new()) })
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// `addPath(paths_row)` (spec 4.6): persist the row; subsequent `init`
    /// picks it up. Client ids are left empty when the caller does not
    /// already have a pre-existing client on one or both sides; `init()`
    /// creates them lazily on first instantiation. Every identifier supplied
    /// here is validated before anything is persisted or any RPC issued
    /// (spec 8, scenario 6): a crafted `clientA`/`clientB` is rejected right
    /// here, not deferred to `init()`.
    #[allow(clippy::too_many_arguments)]
    pub fn add_path(
        &self,
        chain_id_a: String,
        node_a: String,
        chain_type_a: ChainType,
        chain_id_b: String,
        node_b: String,
        chain_type_b: ChainType,
        version: IbcVersion,
        client_a: Option<String>,
        client_b: Option<String>,
    ) -> Result<RelayPath, Error> {
        validate_all([chain_id_a.as_str(), chain_id_b.as_str()])?;
        validate_all(client_a.as_deref().into_iter().filter(|s| !s.is_empty()))?;
        validate_all(client_b.as_deref().into_iter().filter(|s| !s.is_empty()))?;

        let id = derive_path_id(&chain_id_a, &node_a, &chain_id_b, &node_b, version);
        let path = RelayPath {
            id,
            chain_id_a,
            node_a,
            query_node_a: None,
            chain_id_b,
            node_b,
            query_node_b: None,
            chain_type_a,
            chain_type_b,
            client_a: client_a.unwrap_or_default(),
            client_b: client_b.unwrap_or_default(),
            version,
        };
        self.store.put_path(&path)?;
        Ok(path)
    }

    pub fn list_paths(&self) -> Result<Vec<RelayPath>, Error> {
        self.store.list_paths()
    }

    /// `init()` (spec 4.6): for each persisted path not yet instantiated,
    /// build both Chain Clients, construct Endpoints, construct the Link,
    /// load last Relayed Heights, register in the live map.
    pub async fn init(&self) -> Result<(), Error> {
        let paths = self.store.list_paths()?;
        let mut live = self.links.lock().await;
        for path in paths {
            if live.contains_key(&path.id) {
                continue;
            }
            match self.instantiate(&path).await {
                Ok(live_link) => {
                    live.insert(path.id.clone(), live_link);
                    info!(path_id = %path.id, "link instantiated");
                }
                Err(err) => error!(path_id = %path.id, %err, "failed to instantiate path, will retry next init()"),
            }
        }
        Ok(())
    }

    async fn instantiate(&self, path: &RelayPath) -> Result<LiveLink, Error> {
        validate_all([path.chain_id_a.as_str(), path.chain_id_b.as_str()])?;

        let chain_a = self.build_chain(path.chain_type_a, &path.chain_id_a, &path.node_a, None).await?;
        let chain_b = self.build_chain(path.chain_type_b, &path.chain_id_b, &path.node_b, None).await?;

        let (client_a, client_b) = self.ensure_clients(path, chain_a.as_ref(), chain_b.as_ref()).await?;

        let (connection_a, connection_b) = match path.version {
            IbcVersion::V1 => {
                let pair = self.ensure_connections(path, chain_a.as_ref(), chain_b.as_ref(), &client_a, &client_b).await?;
                (pair.connection_a, pair.connection_b)
            }
            IbcVersion::V2 => {
                self.ensure_counterparty_registered(chain_a.as_ref(), chain_b.as_ref(), &client_a, &client_b).await?;
                (None, None)
            }
        };

        let endpoint_a = Endpoint::new(chain_a, client_a, connection_a, path.version)?;
        let endpoint_b = Endpoint::new(chain_b, client_b, connection_b, path.version)?;
        let link = Link::new(endpoint_a, endpoint_b, self.config.estimated_indexer_time)?;
        let heights = self.store.get_heights(&path.id)?;
        Ok(LiveLink { link, heights })
    }

    async fn build_chain(
        &self,
        chain_type: ChainType,
        chain_id: &str,
        node: &str,
        client_id: Option<String>,
    ) -> Result<Arc<dyn ChainClient>, Error> {
        let rpc_deadline = self.config.rpc_deadline();
        let client: Arc<dyn ChainClient> = match chain_type {
            ChainType::Cosmos => {
                let config = TendermintChainConfig::from_node_url(chain_id, node, client_id, None)?;
                Arc::new(TendermintChain::with_deadline(config, self.retry_policy, rpc_deadline)?)
            }
            ChainType::Gno => {
                let config = GnoChainConfig::from_node_url(chain_id, node, client_id)?;
                Arc::new(GnoChain::with_deadline(config, self.retry_policy, rpc_deadline)?)
            }
        };
        client.connect().await?;
        Ok(client)
    }

    /// Creates light clients on each side tracking the other, the first
    /// time a path with empty `clientA`/`clientB` fields is instantiated,
    /// and persists the filled-in ids so later restarts skip this step
    /// (spec 3: Relay Path is immutable after creation, but its client ids
    /// start absent and are filled in exactly once).
    async fn ensure_clients(
        &self,
        path: &RelayPath,
        chain_a: &dyn ChainClient,
        chain_b: &dyn ChainClient,
    ) -> Result<(String, String), Error> {
        if !path.client_a.is_empty() && !path.client_b.is_empty() {
            return Ok((path.client_a.clone(), path.client_b.clone()));
        }
        let client_a = if path.client_a.is_empty() {
            LightClientManager::create_client(chain_a, chain_b, None).await?
        } else {
            path.client_a.clone()
        };
        let client_b = if path.client_b.is_empty() {
            LightClientManager::create_client(chain_b, chain_a, None).await?
        } else {
            path.client_b.clone()
        };
        let mut updated = path.clone();
        updated.client_a = client_a.clone();
        updated.client_b = client_b.clone();
        self.store.put_path(&updated)?;
        Ok((client_a, client_b))
    }

    /// Runs the v1 connection handshake once per path and caches the
    /// resulting ids; a cached pair is reused on every subsequent `init()`.
    async fn ensure_connections(
        &self,
        path: &RelayPath,
        chain_a: &dyn ChainClient,
        chain_b: &dyn ChainClient,
        client_a: &str,
        client_b: &str,
    ) -> Result<crate::store::ConnectionPair, Error> {
        let cached = self.store.get_connections(&path.id)?;
        if let (Some(a), Some(b)) = (&cached.connection_a, &cached.connection_b) {
            return Ok(crate::store::ConnectionPair { connection_a: Some(a.clone()), connection_b: Some(b.clone()) });
        }
        let connection_a = chain_a.conn_open_init(client_a, client_b).await?;
        let connection_b = chain_b.conn_open_try(client_b, &connection_a).await?;
        chain_a.conn_open_ack(&connection_a).await?;
        chain_b.conn_open_confirm(&connection_b).await?;
        let pair = crate::store::ConnectionPair { connection_a: Some(connection_a), connection_b: Some(connection_b) };
        self.store.put_connections(&path.id, &pair)?;
        Ok(pair)
    }

    async fn ensure_counterparty_registered(
        &self,
        chain_a: &dyn ChainClient,
        chain_b: &dyn ChainClient,
        client_a: &str,
        client_b: &str,
    ) -> Result<(), Error> {
        chain_a.register_counterparty(client_a, client_b).await?;
        chain_b.register_counterparty(client_b, client_a).await?;
        Ok(())
    }

    /// `start()` (spec 4.6): launch the relay loop; returns immediately.
    /// Errors on one link are caught and logged; the loop never exits on a
    /// single link's failure.
    pub async fn start(self: Arc<Self>, shutdown: tokio::sync::watch::Receiver<bool>) {
        tokio::spawn(async move {
            self.run_loop(shutdown).await;
        });
    }

    async fn run_loop(&self, mut shutdown: tokio::sync::watch::Receiver<bool>) {
        loop {
            if *shutdown.borrow() {
                break;
            }
            if let Err(err) = self.init().await {
                error!(%err, "init() failed this iteration");
            }
            self.run_one_iteration().await;
            tokio::select! {
                _ = tokio::time::sleep(self.config.poll_interval) => {}
                _ = shutdown.changed() => {}
            }
        }
        info!("relay loop stopped");
    }

    async fn run_one_iteration(&self) {
        let mut live = self.links.lock().await;
        for (path_id, live_link) in live.iter_mut() {
            let result = live_link
                .link
                .relay_iteration(live_link.heights, self.config.timeout_blocks, self.config.timeout_seconds)
                .await;
            match result {
                Ok(outcome) => {
                    live_link.heights = outcome.heights;
                    self.metrics.record_iteration(path_id, &outcome);
                    if let Err(err) = self.store.put_heights(path_id, &outcome.heights) {
                        error!(path_id, %err, "failed to persist relayed heights");
                    }
                }
                Err(err) => error!(path_id, %err, "relay iteration failed"),
            }
        }
    }

    /// `stop()` (spec 4.6): disconnect every Chain Client and close the
    /// persistence store. The caller is responsible for flipping the
    /// shutdown watch to stop `run_loop` before calling this.
    pub async fn stop(&self) -> Result<(), Error> {
        let mut live = self.links.lock().await;
        for (path_id, live_link) in live.drain() {
            if let Err(err) = live_link.link.endpoint_a.client.disconnect().await {
                error!(path_id, %err, "error disconnecting endpoint A");
            }
            if let Err(err) = live_link.link.endpoint_b.client.disconnect().await {
                error!(path_id, %err, "error disconnecting endpoint B");
            }
        }
        self.store.close()
    }
}

