use crate::*;
use curve25519_dalek::constants::RISTRETTO_BASEPOINT_POINT;
use curve25519_dalek::ristretto::{CompressedRistretto, RistrettoPoint};
use curve25519_dalek::scalar::Scalar;
use curve25519_dalek::traits::Identity;
use rand_core::{CryptoRng, RngCore};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::convert::TryInto;
use std::ops::{Add, AddAssign};
use std::str::FromStr;

fn decompress(bytes: &[u8]) -> Option<RistrettoPoint> {
    if bytes.len() != 32 {
        return None;
    }
    CompressedRistretto::from_slice(bytes).decompress()
}

/// Additively homomorphic ciphertext
///
/// Exponential ElGamal over ristretto255: `(r·G, m·G + r·P)` where `P` is the
/// decryption service's public key. Adding two ciphertexts adds their plaintexts.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Ciphertext {
    c1: RistrettoPoint,
    c2: RistrettoPoint,
}

impl Ciphertext {
    /// The trivial encryption of zero
    pub fn zero() -> Self {
        Ciphertext {
            c1: RistrettoPoint::identity(),
            c2: RistrettoPoint::identity(),
        }
    }

    pub fn to_bytes(&self) -> [u8; 64] {
        let mut bytes = [0; 64];
        bytes[0..32].copy_from_slice(self.c1.compress().as_bytes());
        bytes[32..64].copy_from_slice(self.c2.compress().as_bytes());
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        if bytes.len() != 64 {
            return Err(Error::CiphertextBadEncoding);
        }
        let c1 = decompress(&bytes[0..32]).ok_or(Error::CiphertextBadEncoding)?;
        let c2 = decompress(&bytes[32..64]).ok_or(Error::CiphertextBadEncoding)?;

        Ok(Ciphertext { c1, c2 })
    }
}

impl Add for Ciphertext {
    type Output = Ciphertext;

    fn add(self, other: Ciphertext) -> Ciphertext {
        Ciphertext {
            c1: self.c1 + other.c1,
            c2: self.c2 + other.c2,
        }
    }
}

impl AddAssign for Ciphertext {
    fn add_assign(&mut self, other: Ciphertext) {
        *self = *self + other;
    }
}

impl FromStr for Ciphertext {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(|_| Error::CiphertextBadEncoding)?;
        Ciphertext::from_bytes(&bytes)
    }
}

impl std::fmt::Display for Ciphertext {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", hex::encode(&self.to_bytes()[..]))
    }
}

impl<'de> Deserialize<'de> for Ciphertext {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        FromStr::from_str(&s).map_err(de::Error::custom)
    }
}

impl Serialize for Ciphertext {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

/// Public key of the decryption service
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TallyPublicKey(RistrettoPoint);

impl TallyPublicKey {
    /// Encrypt a small value
    ///
    /// Voters encrypt the constant `1`; the option they pick is never encrypted.
    pub fn encrypt<R: RngCore + CryptoRng>(&self, value: u64, rng: &mut R) -> Ciphertext {
        let r = Scalar::random(rng);
        Ciphertext {
            c1: r * RISTRETTO_BASEPOINT_POINT,
            c2: Scalar::from(value) * RISTRETTO_BASEPOINT_POINT + r * self.0,
        }
    }

    pub fn to_bytes(&self) -> [u8; 32] {
        self.0.compress().to_bytes()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        decompress(bytes)
            .map(TallyPublicKey)
            .ok_or(Error::TallyKeyBadEncoding)
    }
}

impl FromStr for TallyPublicKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(|_| Error::TallyKeyBadEncoding)?;
        TallyPublicKey::from_bytes(&bytes)
    }
}

impl std::fmt::Display for TallyPublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", hex::encode(self.to_bytes()))
    }
}

/// Decryption key pair, held only by the decryption service
pub struct TallyKeypair {
    secret: Scalar,
    public: TallyPublicKey,
}

impl TallyKeypair {
    pub fn generate<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        let secret = Scalar::random(rng);
        TallyKeypair::from_secret(secret)
    }

    fn from_secret(secret: Scalar) -> Self {
        TallyKeypair {
            secret,
            public: TallyPublicKey(secret * RISTRETTO_BASEPOINT_POINT),
        }
    }

    pub fn public(&self) -> TallyPublicKey {
        self.public
    }

    pub fn secret_bytes(&self) -> [u8; 32] {
        self.secret.to_bytes()
    }

    pub fn from_secret_bytes(bytes: &[u8]) -> Result<Self, Error> {
        let bytes: [u8; 32] = bytes.try_into().map_err(|_| Error::TallyKeyBadEncoding)?;
        let secret = Scalar::from_canonical_bytes(bytes).ok_or(Error::TallyKeyBadEncoding)?;
        Ok(TallyKeypair::from_secret(secret))
    }

    /// Decrypt a ciphertext whose plaintext is known to be at most `bound`
    pub fn decrypt(&self, ciphertext: &Ciphertext, bound: u64) -> Result<u64, Error> {
        let target = ciphertext.c2 - self.secret * ciphertext.c1;

        let mut candidate = RistrettoPoint::identity();
        for value in 0..=bound {
            if candidate == target {
                return Ok(value);
            }
            candidate += RISTRETTO_BASEPOINT_POINT;
        }

        Err(Error::DecryptionOutOfRange(bound))
    }
}

/// Per-option running encrypted vote counts for one poll
///
/// Only ever grows by one encrypted unit per accepted vote. It has no way to open its
/// own ciphertexts.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(transparent)]
pub struct ConfidentialTallyAccumulator {
    counters: Vec<Ciphertext>,
}

impl ConfidentialTallyAccumulator {
    /// One fresh encrypted zero per option
    pub fn zero(option_count: usize) -> Self {
        ConfidentialTallyAccumulator {
            counters: vec![Ciphertext::zero(); option_count],
        }
    }

    /// Homomorphically add one encrypted unit into the counter for `option`
    pub fn accumulate(&mut self, option: usize, unit: Ciphertext) -> Result<(), ValidationError> {
        let counter = self
            .counters
            .get_mut(option)
            .ok_or(ValidationError::InvalidOptionIndex(option))?;
        *counter += unit;
        Ok(())
    }

    pub fn ciphertexts(&self) -> &[Ciphertext] {
        &self.counters
    }

    pub fn len(&self) -> usize {
        self.counters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }
}
