//! Proof Assembler support for the Tendermint variant (spec 4.2). A Cosmos
//! SDK app hash is rooted by two ICS-23 ops in sequence: an `iavl` proof
//! that a key/value pair is a leaf of one module's store, and a `simple`
//! proof that the module's store root is a leaf of the top-level multi-
//! store. The two `CommitmentProof`s are concatenated length-delimited,
//! matching the wire shape of a Cosmos `MerkleProof { proofs: [...] }`.

use ics23::{commitment_proof::Proof, CommitmentProof, ExistenceProof};
use prost::Message;
use relayer_primitives::{Error, Height, ProofBundle};

pub const IAVL_STORE_SPEC_NAME: &str = "iavl";
pub const SIMPLE_STORE_SPEC_NAME: &str = "simple";

/// Two abci_query results (module store proof, multi-store proof), both
/// queried at the same `queryHeight = proofHeight - 1` (spec 4.2, "Height
/// discipline").
pub struct RawMerkleProof {
    pub iavl_proof: CommitmentProof,
    pub simple_proof: CommitmentProof,
}

pub fn assemble(data: Vec<u8>, raw: RawMerkleProof, proof_height: Height) -> Result<ProofBundle, Error> {
    let mut proof = Vec::new();
    raw.iavl_proof
        .encode_length_delimited(&mut proof)
        .map_err(|e| Error::Protocol(format!("failed to encode iavl proof op: {e}")))?;
    raw.simple_proof
        .encode_length_delimited(&mut proof)
        .map_err(|e| Error::Protocol(format!("failed to encode simple store proof op: {e}")))?;
    Ok(ProofBundle { data, proof, proof_height })
}

/// Extracts the leaf value actually committed by an existence proof, for
/// sanity-checking that the queried key really holds `expected_data`
/// before it is bundled up (a proof-key mismatch here is a
/// `ProtocolError`, not a retryable one).
pub fn existence_proof_value(proof: &CommitmentProof) -> Result<&[u8], Error> {
    match &proof.proof {
        Some(Proof::Exist(ExistenceProof { value, .. })) => Ok(value),
        _ => Err(Error::Protocol("expected an ICS-23 existence proof".into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn existence_proof(value: &[u8]) -> CommitmentProof {
        CommitmentProof {
            proof: Some(Proof::Exist(ExistenceProof {
                key: b"key".to_vec(),
                value: value.to_vec(),
                leaf: None,
                path: vec![],
            })),
        }
    }

    #[test]
    fn assembled_bundle_carries_both_ops_and_height() {
        let raw = RawMerkleProof {
            iavl_proof: existence_proof(b"committed-value"),
            simple_proof: existence_proof(b"store-root-value"),
        };
        let bundle = assemble(b"committed-value".to_vec(), raw, Height::new(0, 100)).unwrap();
        assert_eq!(bundle.data, b"committed-value");
        assert_eq!(bundle.proof_height, Height::new(0, 100));
        assert!(!bundle.proof.is_empty());
    }

    #[test]
    fn existence_proof_value_extracts_leaf_value() {
        let proof = existence_proof(b"hello");
        assert_eq!(existence_proof_value(&proof).unwrap(), b"hello");
    }

    #[test]
    fn existence_proof_value_rejects_non_existence_proof() {
        let proof = CommitmentProof { proof: None };
        assert!(existence_proof_value(&proof).is_err());
    }
}
