use crate::*;
use digest::Digest;
use rand::Rng;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::convert::TryInto;
use std::str::FromStr;

/// Account address
///
/// Identifies poll creators, voters, the ledger owner, the decryption oracle and the
/// ledger itself. Printed and parsed as `0x`-prefixed hex.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address(pub [u8; 20]);

impl Address {
    pub const LEN: usize = 20;

    pub fn zero() -> Self {
        Address([0; 20])
    }

    /// Create a random address
    pub fn random() -> Self {
        let mut csprng = rand::rngs::OsRng {};
        Address(csprng.gen())
    }

    /// Derive a stable address from an arbitrary label
    pub fn derive(label: &[u8]) -> Self {
        // This unwrap is OK - a sha512 digest is always longer than 20 bytes
        let bytes: [u8; 20] = sha2::Sha512::digest(label)[0..20].try_into().unwrap();
        Address(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0; 20]
    }
}

impl From<[u8; 20]> for Address {
    fn from(bytes: [u8; 20]) -> Self {
        Address(bytes)
    }
}

impl FromStr for Address {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s).map_err(|_| Error::AddressBadHex)?;
        let bytes: [u8; 20] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| Error::AddressBadLen)?;

        Ok(Address(bytes))
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        FromStr::from_str(&s).map_err(de::Error::custom)
    }
}

impl Serialize for Address {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_parsing() {
        let address = Address::random();
        let stringed = address.to_string();
        assert!(stringed.starts_with("0x"));
        assert_eq!(stringed.len(), 42);
        assert_eq!(Address::from_str(&stringed).unwrap(), address);

        // Without the prefix is also accepted
        assert_eq!(Address::from_str(&stringed[2..]).unwrap(), address);

        assert!(matches!(
            Address::from_str("0xnothex"),
            Err(Error::AddressBadHex)
        ));
        assert!(matches!(
            Address::from_str("0x0102"),
            Err(Error::AddressBadLen)
        ));
    }

    #[test]
    fn test_derived_addresses_are_stable() {
        assert_eq!(Address::derive(b"alice"), Address::derive(b"alice"));
        assert_ne!(Address::derive(b"alice"), Address::derive(b"bob"));
        assert!(Address::zero().is_zero());
        assert!(!Address::derive(b"alice").is_zero());

        let json = serde_json::to_string(&Address::derive(b"alice")).unwrap();
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Address::derive(b"alice"));
    }
}
