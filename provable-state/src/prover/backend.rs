//! Abstract proving backend and the deterministic mock used in tests.
//!
//! A [`Proof`] is an opaque attestation that some circuit maps a public input
//! to a public output. Provers never look inside an attestation; they only ask
//! the backend whether it verifies, so any backend honouring the
//! [`ProofBackend`] contract can be swapped in.
use super::ProverError;
use crate::field::{field_to_bytes, FieldElement, ToFields};
use serde::{Deserialize, Serialize};

/// Identifier of the state-transition circuit.
pub const STATE_TRANSITION_CIRCUIT: &str = "provable-state/state-transition";

/// Identifier of the block circuit.
pub const BLOCK_CIRCUIT: &str = "provable-state/block";

/// Identifier of the application (runtime) circuit.
pub const RUNTIME_CIRCUIT: &str = "provable-state/runtime";

/// An attested statement `circuit(public_input) = public_output`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proof<I, O> {
    /// Circuit the statement is about.
    pub circuit: String,
    /// Public input.
    pub public_input: I,
    /// Public output.
    pub public_output: O,
    /// Backend-specific attestation bytes.
    #[serde(with = "hex::serde")]
    pub attestation: Vec<u8>,
}

impl<I: ToFields, O: ToFields> Proof<I, O> {
    /// Field encoding of the public input followed by the public output.
    pub fn public_values(&self) -> Vec<FieldElement> {
        (&self.public_input, &self.public_output).to_fields()
    }
}

/// A proving backend.
///
/// `attest` and `check` form the object-safe core; `prove` and `verify` wrap
/// them for typed proofs.
pub trait ProofBackend: Send + Sync {
    /// Name of the backend, for logs and errors.
    fn name(&self) -> &'static str;

    /// Produces an attestation over `circuit` and the flattened public values.
    fn attest(&self, circuit: &str, public_values: &[FieldElement]) -> Result<Vec<u8>, ProverError>;

    /// Checks an attestation produced by [`attest`](ProofBackend::attest).
    fn check(&self, circuit: &str, public_values: &[FieldElement], attestation: &[u8]) -> bool;

    /// Attests `circuit(public_input) = public_output`.
    fn prove<I: ToFields, O: ToFields>(
        &self,
        circuit: &str,
        public_input: I,
        public_output: O,
    ) -> Result<Proof<I, O>, ProverError>
    where
        Self: Sized,
    {
        let public_values = (&public_input, &public_output).to_fields();
        let attestation = self.attest(circuit, &public_values)?;
        Ok(Proof {
            circuit: circuit.to_string(),
            public_input,
            public_output,
            attestation,
        })
    }

    /// Whether `proof` is a valid attestation for `circuit`.
    fn verify<I: ToFields, O: ToFields>(&self, proof: &Proof<I, O>, circuit: &str) -> bool
    where
        Self: Sized,
    {
        proof.circuit == circuit && self.check(circuit, &proof.public_values(), &proof.attestation)
    }

    /// Like [`verify`](ProofBackend::verify), failing with
    /// [`ProverError::InvalidProof`].
    fn ensure_valid<I: ToFields, O: ToFields>(
        &self,
        proof: &Proof<I, O>,
        circuit: &str,
    ) -> Result<(), ProverError>
    where
        Self: Sized,
    {
        if self.verify(proof, circuit) {
            Ok(())
        } else {
            Err(ProverError::InvalidProof {
                circuit: circuit.to_string(),
            })
        }
    }
}

/// Trusted stub backend.
///
/// The attestation is a keyed blake3 hash over the circuit identifier and the
/// public values. It binds a statement to whoever holds the key and proves
/// nothing about the computation itself.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MockBackend {
    key: [u8; 32],
}

impl Default for MockBackend {
    fn default() -> Self {
        Self {
            key: blake3::derive_key("provable-state mock backend key", &[]),
        }
    }
}

impl MockBackend {
    /// Creates a mock backend with the default key.
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses `key` for attestations. Backends with different keys reject each
    /// other's proofs.
    pub fn with_key(mut self, key: [u8; 32]) -> Self {
        self.key = key;
        self
    }

    fn digest(&self, circuit: &str, public_values: &[FieldElement]) -> blake3::Hash {
        let mut hasher = blake3::Hasher::new_keyed(&self.key);
        hasher.update(&(circuit.len() as u64).to_le_bytes());
        hasher.update(circuit.as_bytes());
        for value in public_values {
            hasher.update(&field_to_bytes(value));
        }
        hasher.finalize()
    }
}

impl ProofBackend for MockBackend {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn attest(
        &self,
        circuit: &str,
        public_values: &[FieldElement],
    ) -> Result<Vec<u8>, ProverError> {
        Ok(self.digest(circuit, public_values).as_bytes().to_vec())
    }

    fn check(&self, circuit: &str, public_values: &[FieldElement], attestation: &[u8]) -> bool {
        // blake3::Hash compares in constant time.
        <[u8; 32]>::try_from(attestation)
            .map(|bytes| self.digest(circuit, public_values) == blake3::Hash::from(bytes))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fe(n: u64) -> FieldElement {
        FieldElement::from(n)
    }

    /// Tests the mock attestation.
    ///
    /// Scenarios tested:
    /// - A fresh proof verifies for its own circuit only
    /// - Tampering with a public value invalidates the proof
    /// - A backend with another key rejects the proof
    #[test]
    fn mock_backend_roundtrip() {
        let backend = MockBackend::new();
        let proof = backend
            .prove(STATE_TRANSITION_CIRCUIT, [fe(1), fe(2)], [fe(3), fe(4)])
            .unwrap();
        assert!(backend.verify(&proof, STATE_TRANSITION_CIRCUIT));
        assert!(!backend.verify(&proof, BLOCK_CIRCUIT));

        let mut tampered = proof.clone();
        tampered.public_output[1] = fe(5);
        assert!(!backend.verify(&tampered, STATE_TRANSITION_CIRCUIT));
        assert_eq!(
            backend.ensure_valid(&tampered, STATE_TRANSITION_CIRCUIT),
            Err(ProverError::InvalidProof {
                circuit: STATE_TRANSITION_CIRCUIT.to_string()
            })
        );

        let other = MockBackend::new().with_key([7u8; 32]);
        assert!(!other.verify(&proof, STATE_TRANSITION_CIRCUIT));
    }

    /// Proofs cross process boundaries as JSON and must still verify.
    #[test]
    fn proof_survives_serialization() {
        use crate::prover::state_transition::{StateTransitionProof, StateTransitionPublicValues};

        let backend = MockBackend::new();
        let input = StateTransitionPublicValues::fresh(fe(11));
        let output = StateTransitionPublicValues {
            transitions_hash: fe(12),
            state_root: fe(13),
        };
        let proof = backend.prove(STATE_TRANSITION_CIRCUIT, input, output).unwrap();

        let json = serde_json::to_string(&proof).unwrap();
        let decoded: StateTransitionProof = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, proof);
        assert!(backend.verify(&decoded, STATE_TRANSITION_CIRCUIT));
    }

    #[test]
    fn truncated_attestation_is_rejected() {
        let backend = MockBackend::new();
        let mut proof = backend.prove(RUNTIME_CIRCUIT, (), fe(9)).unwrap();
        proof.attestation.pop();
        assert!(!backend.verify(&proof, RUNTIME_CIRCUIT));
    }
}
