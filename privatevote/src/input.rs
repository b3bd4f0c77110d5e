use crate::*;
use digest::Digest;
use ed25519_dalek::{Keypair, PublicKey, SecretKey, Signature, Signer, Verifier};
use sha2::Sha512;
use std::convert::TryFrom;
use std::str::FromStr;

const ATTESTATION_DOMAIN: &[u8] = b"privatevote/encrypted-input/v1";

/// Proof that an encrypted input is well-formed and bound to one voter and one ledger
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InputProof(pub Vec<u8>);

impl FromStr for InputProof {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        hex::decode(s)
            .map(InputProof)
            .map_err(|_| Error::InputProofBadHex)
    }
}

impl std::fmt::Display for InputProof {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "0x{}", hex::encode(&self.0))
    }
}

/// Verifies encrypted vote inputs
///
/// A proof is only valid for the `(contract, voter)` pair it was produced for, so a
/// ciphertext lifted from one voter cannot be replayed by another.
pub trait InputVerifier: Send + Sync {
    fn verify(
        &self,
        input: &Ciphertext,
        proof: &InputProof,
        contract: &Address,
        voter: &Address,
    ) -> Result<Ciphertext, ValidationError>;
}

fn attestation_message(input: &Ciphertext, contract: &Address, voter: &Address) -> Vec<u8> {
    let mut sha = Sha512::new();
    sha.update(ATTESTATION_DOMAIN);
    sha.update(contract.as_bytes());
    sha.update(voter.as_bytes());
    sha.update(&input.to_bytes()[..]);
    sha.finalize().to_vec()
}

/// Verifier that trusts an input gateway's ed25519 attestation
///
/// The gateway checks the voter's encryption out of band and signs the ciphertext
/// together with the contract and voter addresses.
pub struct AttestedInputVerifier {
    gateway: PublicKey,
}

impl AttestedInputVerifier {
    pub fn new(gateway: PublicKey) -> Self {
        AttestedInputVerifier { gateway }
    }
}

impl InputVerifier for AttestedInputVerifier {
    fn verify(
        &self,
        input: &Ciphertext,
        proof: &InputProof,
        contract: &Address,
        voter: &Address,
    ) -> Result<Ciphertext, ValidationError> {
        let signature = Signature::try_from(proof.0.as_slice())
            .map_err(|_| ValidationError::InputVerificationFailed)?;
        let message = attestation_message(input, contract, voter);

        self.gateway
            .verify(&message, &signature)
            .map_err(|_| ValidationError::InputVerificationFailed)?;

        Ok(*input)
    }
}

/// The input gateway side: produces proofs accepted by `AttestedInputVerifier`
pub struct InputAttestor {
    keypair: Keypair,
}

impl InputAttestor {
    pub fn generate() -> Self {
        let mut csprng = rand::rngs::OsRng {};
        InputAttestor {
            keypair: Keypair::generate(&mut csprng),
        }
    }

    pub fn from_secret_bytes(bytes: &[u8]) -> Result<Self, Error> {
        let secret = SecretKey::from_bytes(bytes)?;
        let public: PublicKey = (&secret).into();
        Ok(InputAttestor {
            keypair: Keypair { secret, public },
        })
    }

    pub fn secret_bytes(&self) -> [u8; 32] {
        self.keypair.secret.to_bytes()
    }

    pub fn public(&self) -> PublicKey {
        self.keypair.public
    }

    pub fn verifier(&self) -> AttestedInputVerifier {
        AttestedInputVerifier::new(self.public())
    }

    pub fn attest(&self, input: &Ciphertext, contract: &Address, voter: &Address) -> InputProof {
        let message = attestation_message(input, contract, voter);
        let signature = self.keypair.sign(&message);
        InputProof(signature.to_bytes().to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attested_input() {
        let mut rng = rand::rngs::OsRng {};
        let tally_key = TallyKeypair::generate(&mut rng);
        let attestor = InputAttestor::generate();
        let verifier = attestor.verifier();

        let contract = Address::derive(b"contract");
        let alice = Address::derive(b"alice");
        let bob = Address::derive(b"bob");

        let input = tally_key.public().encrypt(1, &mut rng);
        let proof = attestor.attest(&input, &contract, &alice);

        assert_eq!(
            verifier.verify(&input, &proof, &contract, &alice).unwrap(),
            input
        );

        // Replaying alice's input as bob fails
        assert!(matches!(
            verifier.verify(&input, &proof, &contract, &bob),
            Err(ValidationError::InputVerificationFailed)
        ));

        // So does replaying it against another ledger
        let other_contract = Address::derive(b"other contract");
        assert!(verifier
            .verify(&input, &proof, &other_contract, &alice)
            .is_err());

        // A different ciphertext under the same proof
        let other_input = tally_key.public().encrypt(1, &mut rng);
        assert!(verifier
            .verify(&other_input, &proof, &contract, &alice)
            .is_err());

        // Garbage proofs
        assert!(verifier
            .verify(&input, &InputProof(vec![1, 2, 3]), &contract, &alice)
            .is_err());

        // A proof from an untrusted gateway
        let rogue = InputAttestor::generate();
        let rogue_proof = rogue.attest(&input, &contract, &alice);
        assert!(verifier
            .verify(&input, &rogue_proof, &contract, &alice)
            .is_err());
    }

    #[test]
    fn test_attestor_restore() {
        let attestor = InputAttestor::generate();
        let restored = InputAttestor::from_secret_bytes(&attestor.secret_bytes()).unwrap();
        assert_eq!(restored.public(), attestor.public());

        let proof = InputProof(vec![0xab, 0xcd]);
        assert_eq!(proof.to_string(), "0xabcd");
        assert_eq!(InputProof::from_str("0xabcd").unwrap(), proof);
    }
}
