//! The embedded key-value store (spec 6 Persistence schema; SPEC_FULL 10.5):
//! `relayPaths`, `relayedHeights`, `chainFees`, plus an opaque mnemonic table
//! backing the `add-mnemonic` CLI command (key storage only — signing itself
//! stays out of scope, spec 1). Built on `sled`, matching the "embedded
//! key-value store" language spec 1 names as an external collaborator.
//!
//! A fourth, un-specified tree (`connections`) caches the v1 connection-ids
//! the Supervisor negotiates during `init()` — spec 3's Relay Path carries no
//! connection-id field, so rather than stretch that type, the negotiated
//! pair is kept alongside it, keyed by relay-path id.

use relayer_primitives::{
    error::Error,
    ident::validate_all,
    relay_path::{ChainFees, RelayPath, RelayedHeights},
};

pub struct Store {
    db: sled::Db,
    paths: sled::Tree,
    heights: sled::Tree,
    fees: sled::Tree,
    mnemonics: sled::Tree,
    connections: sled::Tree,
}

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct ConnectionPair {
    pub connection_a: Option<String>,
    pub connection_b: Option<String>,
}

impl Store {
    pub fn open(db_file: &str) -> Result<Self, Error> {
        let db = sled::open(db_file).map_err(|e| Error::Config(format!("failed to open store at {db_file}: {e}")))?;
        let paths = open_tree(&db, "relay_paths")?;
        let heights = open_tree(&db, "relayed_heights")?;
        let fees = open_tree(&db, "chain_fees")?;
        let mnemonics = open_tree(&db, "mnemonics")?;
        let connections = open_tree(&db, "connections")?;
        Ok(Self { db, paths, heights, fees, mnemonics, connections })
    }

    /// `addPath` (spec 4.6): persists the row. Identifiers are validated
    /// first so a crafted path can never reach a chain RPC call (spec 8
    /// scenario 6).
    pub fn put_path(&self, path: &RelayPath) -> Result<(), Error> {
        validate_all([path.id.as_str(), path.chain_id_a.as_str(), path.chain_id_b.as_str()])?;
        if !path.client_a.is_empty() {
            validate_all([path.client_a.as_str()])?;
        }
        if !path.client_b.is_empty() {
            validate_all([path.client_b.as_str()])?;
        }
        let bytes = serde_json::to_vec(path).map_err(|e| Error::Config(format!("failed to encode relay path: {e}")))?;
        self.paths.insert(path.id.as_bytes(), bytes).map_err(sled_error)?;
        Ok(())
    }

    pub fn list_paths(&self) -> Result<Vec<RelayPath>, Error> {
        self.paths
            .iter()
            .values()
            .map(|v| {
                let bytes = v.map_err(sled_error)?;
                serde_json::from_slice(&bytes).map_err(|e| Error::Protocol(format!("corrupt relay path row: {e}")))
            })
            .collect()
    }

    pub fn get_heights(&self, relay_path_id: &str) -> Result<RelayedHeights, Error> {
        match self.heights.get(relay_path_id.as_bytes()).map_err(sled_error)? {
            Some(bytes) => serde_json::from_slice(&bytes).map_err(|e| Error::Protocol(format!("corrupt relayed-heights row: {e}"))),
            None => Ok(RelayedHeights::default()),
        }
    }

    pub fn put_heights(&self, relay_path_id: &str, heights: &RelayedHeights) -> Result<(), Error> {
        let bytes = serde_json::to_vec(heights).map_err(|e| Error::Config(format!("failed to encode relayed heights: {e}")))?;
        self.heights.insert(relay_path_id.as_bytes(), bytes).map_err(sled_error)?;
        Ok(())
    }

    /// `chainFees(id pk, chainId unique replace, ...)`: one row per chain,
    /// replacing any existing row for the same chain id.
    pub fn put_chain_fees(&self, fees: &ChainFees) -> Result<(), Error> {
        validate_all([fees.chain_id.as_str()])?;
        let bytes = serde_json::to_vec(fees).map_err(|e| Error::Config(format!("failed to encode chain fees: {e}")))?;
        self.fees.insert(fees.chain_id.as_bytes(), bytes).map_err(sled_error)?;
        Ok(())
    }

    pub fn get_chain_fees(&self, chain_id: &str) -> Result<Option<ChainFees>, Error> {
        match self.fees.get(chain_id.as_bytes()).map_err(sled_error)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes).map_err(|e| Error::Protocol(format!("corrupt chain fees row: {e}")))?)),
            None => Ok(None),
        }
    }

    /// Opaque mnemonic storage for `add-mnemonic`. Key management and
    /// signing remain out of scope (spec 1); this only makes the bytes the
    /// mnemonic subsystem needs durable across restarts.
    pub fn put_mnemonic(&self, chain_id: &str, mnemonic: &str) -> Result<(), Error> {
        validate_all([chain_id])?;
        self.mnemonics.insert(chain_id.as_bytes(), mnemonic.as_bytes()).map_err(sled_error)?;
        Ok(())
    }

    pub fn has_mnemonic(&self, chain_id: &str) -> Result<bool, Error> {
        Ok(self.mnemonics.contains_key(chain_id.as_bytes()).map_err(sled_error)?)
    }

    pub fn get_connections(&self, relay_path_id: &str) -> Result<ConnectionPair, Error> {
        match self.connections.get(relay_path_id.as_bytes()).map_err(sled_error)? {
            Some(bytes) => serde_json::from_slice(&bytes).map_err(|e| Error::Protocol(format!("corrupt connections row: {e}"))),
            None => Ok(ConnectionPair::default()),
        }
    }

    pub fn put_connections(&self, relay_path_id: &str, pair: &ConnectionPair) -> Result<(), Error> {
        let bytes = serde_json::to_vec(pair).map_err(|e| Error::Config(format!("failed to encode connection pair: {e}")))?;
        self.connections.insert(relay_path_id.as_bytes(), bytes).map_err(sled_error)?;
        Ok(())
    }

    /// Flushes every tree to disk. Called from `Supervisor::stop()` so the
    /// store closes cleanly on every exit path (Design Notes 9, "Database
    /// handle caching -> lifecycle-owned resource").
    pub fn close(&self) -> Result<(), Error> {
        self.db.flush().map_err(sled_error)?;
        Ok(())
    }
}

fn open_tree(db: &sled::Db, name: &str) -> Result<sled::Tree, Error> {
    db.open_tree(name).map_err(sled_error)
}

fn sled_error(e: sled::Error) -> Error {
    Error::Config(format!("store error: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use relayer_primitives::relay_path::{ChainType, IbcVersion};

    fn sample_path(id: &str) -> RelayPath {
        RelayPath {
            id: id.to_string(),
            chain_id_a: "cosmoshub-4".into(),
            node_a: "http://localhost:26657".into(),
            query_node_a: None,
            chain_id_b: "gno-dev".into(),
            node_b: "http://localhost:26658".into(),
            query_node_b: None,
            chain_type_a: ChainType::Cosmos,
            chain_type_b: ChainType::Gno,
            client_a: String::new(),
            client_b: String::new(),
            version: IbcVersion::V2,
        }
    }

    #[test]
    fn round_trips_a_relay_path() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path().join("db").to_str().unwrap()).unwrap();
        store.put_path(&sample_path("path-0")).unwrap();
        let paths = store.list_paths().unwrap();
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].chain_id_a, "cosmoshub-4");
    }

    #[test]
    fn missing_heights_default_to_zero() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path().join("db").to_str().unwrap()).unwrap();
        assert_eq!(store.get_heights("no-such-path").unwrap(), RelayedHeights::default());
    }

    #[test]
    fn rejects_injection_attempt_in_client_id() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path().join("db").to_str().unwrap()).unwrap();
        let mut path = sample_path("path-0");
        path.client_a = "07-tendermint-0' OR 1=1 --".into();
        assert!(store.put_path(&path).is_err());
    }

    #[test]
    fn chain_fees_replace_on_same_chain_id() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path().join("db").to_str().unwrap()).unwrap();
        store.put_chain_fees(&ChainFees { chain_id: "cosmoshub-4".into(), gas_price: 0.025, gas_denom: "uatom".into() }).unwrap();
        store.put_chain_fees(&ChainFees { chain_id: "cosmoshub-4".into(), gas_price: 0.03, gas_denom: "uatom".into() }).unwrap();
        let fees = store.get_chain_fees("cosmoshub-4").unwrap().unwrap();
        assert_eq!(fees.gas_price, 0.03);
    }
}
