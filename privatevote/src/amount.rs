use crate::*;
use rust_decimal::Decimal;
use std::convert::TryFrom;
use std::str::FromStr;

/// Amount in wei
pub type Amount = u128;

pub const WEI_PER_ETHER: Amount = 1_000_000_000_000_000_000;

/// 0.001 ether
pub const DEFAULT_CREATION_FEE: Amount = WEI_PER_ETHER / 1000;

const ETHER_DECIMALS: u32 = 18;

/// Parse a decimal ether amount such as `0.001` into wei
pub fn parse_ether(s: &str) -> Result<Amount, Error> {
    let invalid = || Error::InvalidAmount(s.to_owned());

    let ether = Decimal::from_str(s.trim()).map_err(|_| invalid())?;
    if ether.is_sign_negative() || ether.scale() > ETHER_DECIMALS {
        return Err(invalid());
    }

    let wei = ether
        .checked_mul(Decimal::from(WEI_PER_ETHER as u64))
        .ok_or_else(invalid)?
        .normalize();
    if wei.scale() != 0 {
        return Err(invalid());
    }

    u128::try_from(wei.mantissa()).map_err(|_| invalid())
}

/// Format a wei amount as a decimal ether string
pub fn format_ether(amount: Amount) -> String {
    // Decimal mantissas are 96 bits
    if amount >= 1 << 96 {
        return format!("{} wei", amount);
    }

    Decimal::from_i128_with_scale(amount as i128, ETHER_DECIMALS)
        .normalize()
        .to_string()
}

/// `#[serde(with = "amount_string")]`: wei amounts as decimal strings
///
/// u128 values cannot pass through internally tagged enums, and JSON readers
/// outside Rust lose precision above 2^53 anyway.
pub mod amount_string {
    use super::Amount;
    use serde::{de, Deserialize, Deserializer, Serializer};
    use std::str::FromStr;

    pub fn serialize<S>(amount: &Amount, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&amount.to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Amount, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Amount::from_str(&s).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ether() {
        assert_eq!(parse_ether("0.001").unwrap(), DEFAULT_CREATION_FEE);
        assert_eq!(parse_ether("0.0005").unwrap(), DEFAULT_CREATION_FEE / 2);
        assert_eq!(parse_ether("1").unwrap(), WEI_PER_ETHER);
        assert_eq!(parse_ether("0").unwrap(), 0);

        assert!(parse_ether("-1").is_err());
        assert!(parse_ether("abc").is_err());
        assert!(parse_ether("0.0000000000000000001").is_err());
    }

    #[test]
    fn test_format_ether() {
        assert_eq!(format_ether(DEFAULT_CREATION_FEE), "0.001");
        assert_eq!(format_ether(2 * WEI_PER_ETHER), "2");
        assert_eq!(format_ether(0), "0");
    }

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    #[serde(tag = "type")]
    enum Tagged {
        Paid {
            #[serde(with = "amount_string")]
            amount: Amount,
        },
    }

    #[test]
    fn test_amount_string() {
        let large = Tagged::Paid {
            amount: u128::MAX,
        };
        let json = serde_json::to_string(&large).unwrap();
        assert_eq!(
            json,
            format!(r#"{{"type":"Paid","amount":"{}"}}"#, u128::MAX)
        );
        assert_eq!(serde_json::from_str::<Tagged>(&json).unwrap(), large);

        assert!(serde_json::from_str::<Tagged>(r#"{"type":"Paid","amount":"-1"}"#).is_err());
    }
}
