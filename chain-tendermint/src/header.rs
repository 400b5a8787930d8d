//! Validator-set-driven update header construction (spec 4.3 Update,
//! step 4). Only the Tendermint variant does this; the Gno variant's
//! header construction lives in `relayer-gno`.

use relayer_primitives::{chain::ClientMessage, ConsensusState, Error, HeaderInfo, ValidatorSet};

/// `trustedHeight = L`, `trustedValidators` must equal the *next*
/// validators of the last header already trusted at `L` -- i.e. the
/// validator set at `L + 1` (spec 4.3 step 4: "MUST equal the
/// `nextValidators` of the last trusted header").
pub fn build_update_header(
    signed_header: Vec<u8>,
    target_validators: ValidatorSet,
    trusted_height: relayer_primitives::Height,
    trusted_validators: ValidatorSet,
) -> ClientMessage {
    ClientMessage::Tendermint {
        signed_header,
        validator_set: target_validators,
        trusted_height,
        trusted_validators,
    }
}

/// Evidence check (spec 4.3): the remote light client's consensus state at
/// a height must match the source's own header at that height. A mismatch
/// is either a buggy counterparty or a fork and is never retried.
pub fn check_evidence(
    client_id: &str,
    remote_consensus_state: &ConsensusState,
    source_header: &HeaderInfo,
) -> Result<(), Error> {
    let ConsensusState::Tendermint { root, next_validators_hash, .. } = remote_consensus_state else {
        return Err(Error::Protocol(format!(
            "client {client_id} has a non-Tendermint consensus state; evidence check not applicable"
        )));
    };
    if root.hash != source_header.app_hash {
        return Err(Error::ConsensusEvidence {
            client_id: client_id.to_string(),
            height: source_header.height.to_string(),
        });
    }
    if let Some(expected) = &source_header.next_validators_hash {
        if next_validators_hash != expected {
            return Err(Error::ConsensusEvidence {
                client_id: client_id.to_string(),
                height: source_header.height.to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use relayer_primitives::{Height, MerkleRoot};

    fn remote_state(app_hash: &[u8], nvh: &[u8]) -> ConsensusState {
        ConsensusState::Tendermint {
            timestamp_unix_secs: 1,
            root: MerkleRoot { hash: app_hash.to_vec() },
            next_validators_hash: nvh.to_vec(),
        }
    }

    fn source_header(app_hash: &[u8], nvh: &[u8]) -> HeaderInfo {
        HeaderInfo {
            height: Height::new(0, 100),
            timestamp_unix_secs: 1,
            app_hash: app_hash.to_vec(),
            next_validators_hash: Some(nvh.to_vec()),
        }
    }

    #[test]
    fn matching_evidence_passes() {
        let remote = remote_state(b"hash", b"nvh");
        let header = source_header(b"hash", b"nvh");
        assert!(check_evidence("07-tendermint-0", &remote, &header).is_ok());
    }

    #[test]
    fn mismatched_app_hash_is_evidence_of_fork() {
        let remote = remote_state(b"hash-a", b"nvh");
        let header = source_header(b"hash-b", b"nvh");
        let err = check_evidence("07-tendermint-0", &remote, &header).unwrap_err();
        assert!(matches!(err, Error::ConsensusEvidence { .. }));
    }

    #[test]
    fn mismatched_next_validators_hash_is_evidence() {
        let remote = remote_state(b"hash", b"nvh-a");
        let header = source_header(b"hash", b"nvh-b");
        let err = check_evidence("07-tendermint-0", &remote, &header).unwrap_err();
        assert!(matches!(err, Error::ConsensusEvidence { .. }));
    }
}
