//! Proof Assembler support for the Gno variant (spec 4.2). Gno.land's state
//! store is also an IAVL tree committed under a top-level simple-map root
//! (the `tm2`/Gno.land stack descends from the same Cosmos SDK storage
//! design as Tendermint chains), so the composite bundle shape is identical
//! to the Tendermint variant's.

use ics23::{commitment_proof::Proof, CommitmentProof, ExistenceProof};
use prost::Message;
use relayer_primitives::{Error, Height, ProofBundle};

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
            iavl_proof: existence_proof(b"value"),
            simple_proof: existence_proof(b"root"),
        };
        let bundle = assemble(b"value".to_vec(), raw, Height::new(0, 50)).unwrap();
        assert_eq!(bundle.proof_height, Height::new(0, 50));
        assert!(!bundle.proof.is_empty());
    }

    #[test]
    fn existence_proof_value_rejects_non_existence_proof() {
        assert!(existence_proof_value(&CommitmentProof { proof: None }).is_err());
    }
}
