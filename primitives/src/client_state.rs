use std::time::Duration;

use crate::height::Height;

/// `numerator / denominator` trust level, e.g. the Tendermint default 1/3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TrustLevel {
    pub numerator: u64,
    pub denominator: u64,
}

impl TrustLevel {
    pub const ONE_THIRD: TrustLevel = TrustLevel { numerator: 1, denominator: 3 };
}

/// Tagging variant for the two Chain Client kinds (spec 4.1, Design Notes
/// 9 "tagged variant" option). The Light-Client Manager branches on this to
/// decide whether a validator-set-driven header is applicable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ClientKind {
    Tendermint,
    Gno,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ClientState {
    pub chain_id: String,
    pub trust_level: TrustLevel,
    pub trusting_period: Duration,
    pub unbonding_period: Duration,
    pub max_clock_drift: Duration,
    pub latest_height: Height,
    pub frozen_height: Option<Height>,
    pub upgrade_path: Vec<String>,
    pub allow_update_after_expiry: bool,
    pub allow_update_after_misbehaviour: bool,
}

impl ClientState {
    /// `trustingPeriod <- floor(2 * unbondingPeriod / 3)` unless the caller
    /// supplies an override, per spec 4.3 Create. Invariant:
    /// `trusting_period < unbonding_period`.
    pub fn default_trusting_period(unbonding_period: Duration) -> Duration {
        unbonding_period * 2 / 3
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen_height.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct MerkleRoot {
    pub hash: Vec<u8>,
}

/// Consensus state at one height the client has been updated to.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ConsensusState {
    Tendermint {
        timestamp_unix_secs: u64,
        root: MerkleRoot,
        next_validators_hash: Vec<u8>,
    },
    /// Gno's consensus-state shape omits `next_validators_hash` — Gno.land
    /// headers commit only to the app hash and a realm-root digest (spec
    /// 4.1: "a different consensus-state shape but the same capability
    /// set").
    Gno {
        timestamp_unix_secs: u64,
        root: MerkleRoot,
        realm_root_hash: Vec<u8>,
    },
}

impl ConsensusState {
    pub fn timestamp_unix_secs(&self) -> u64 {
        match self {
            ConsensusState::Tendermint { timestamp_unix_secs, .. } => *timestamp_unix_secs,
            ConsensusState::Gno { timestamp_unix_secs, .. } => *timestamp_unix_secs,
        }
    }

    pub fn root(&self) -> &MerkleRoot {
        match self {
            ConsensusState::Tendermint { root, .. } => root,
            ConsensusState::Gno { root, .. } => root,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_trusting_period_is_two_thirds() {
        let unbonding = Duration::from_secs(21 * 24 * 3600);
        let trusting = ClientState::default_trusting_period(unbonding);
        assert!(trusting < unbonding);
        assert_eq!(trusting, unbonding * 2 / 3);
    }
}
