//! Fee-rate units.
//!
//! Payment requests carry the minimum fee rate in satoshis per byte (per
//! virtual byte on segwit chains). Wallet backends usually want a rate per
//! kilobyte, in coin units. A kilobyte here is always 1000 bytes.

use std::fmt;

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::ProtocolError;
use crate::proto::COIN_DECIMALS;

/// Bytes per kilobyte used for fee-rate conversion.
pub const BYTES_PER_KILOBYTE: u32 = 1000;

/// Satoshis in one coin.
const SATS_PER_COIN: u64 = 100_000_000;

/// A non-negative fee rate in satoshis per byte. Defaults to zero.
///
/// The wire value is a JSON number and arrives as `f64`. It is converted to
/// a [`Decimal`] once, here, and all arithmetic after that is exact.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FeeRate(Decimal);

impl FeeRate {
    /// Creates a fee rate from satoshis per byte.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidFeeRate`] for negative or non-finite
    /// values, and for rates too large to express per kilobyte.
    pub fn sat_per_byte(rate: f64) -> Result<Self, ProtocolError> {
        if !rate.is_finite() || rate < 0.0 {
            return Err(ProtocolError::InvalidFeeRate(rate.to_string()));
        }
        Decimal::from_f64(rate)
            .ok_or_else(|| ProtocolError::InvalidFeeRate(rate.to_string()))
            .and_then(Self::from_decimal)
    }

    /// Creates a fee rate from an exact satoshis-per-byte amount.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidFeeRate`] for negative rates, and for
    /// rates too large to express per kilobyte.
    pub fn from_decimal(rate: Decimal) -> Result<Self, ProtocolError> {
        if rate.is_sign_negative() && !rate.is_zero() {
            return Err(ProtocolError::InvalidFeeRate(rate.to_string()));
        }
        rate.checked_mul(Decimal::from(BYTES_PER_KILOBYTE))
            .ok_or_else(|| ProtocolError::InvalidFeeRate(rate.to_string()))?;
        Ok(Self(rate))
    }

    /// Returns the rate in satoshis per byte.
    #[must_use]
    pub const fn sat_per_byte_value(self) -> Decimal {
        self.0
    }

    /// Returns the rate in satoshis per 1000 bytes.
    #[must_use]
    pub fn sat_per_kvb(self) -> Decimal {
        // Bounded by the constructors.
        self.0 * Decimal::from(BYTES_PER_KILOBYTE)
    }

    /// Returns the rate in coin units per 1000 bytes, rounded up to eight
    /// decimal places so the converted rate never undershoots.
    #[must_use]
    pub fn btc_per_kvb(self) -> Decimal {
        (self.sat_per_kvb() / Decimal::from(SATS_PER_COIN))
            .round_dp_with_strategy(COIN_DECIMALS, RoundingStrategy::AwayFromZero)
    }
}

impl fmt::Display for FeeRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} sat/B", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_conversion_uses_thousand_byte_kilobyte() {
        let rate = FeeRate::sat_per_byte(2.5).unwrap();
        assert_eq!(rate.sat_per_kvb(), Decimal::from(2500));
        assert_eq!(rate.btc_per_kvb(), Decimal::from_str("0.000025").unwrap());
    }

    #[test]
    fn test_conversion_rounds_up() {
        let rate = FeeRate::sat_per_byte(0.0011).unwrap();
        // 1.1 sat/kvB is 0.000000011 BTC/kvB, rounded up to the next satoshi.
        assert_eq!(rate.btc_per_kvb(), Decimal::from_str("0.00000002").unwrap());
    }

    #[test]
    fn test_rejects_invalid_rates() {
        assert!(matches!(
            FeeRate::sat_per_byte(-1.0),
            Err(ProtocolError::InvalidFeeRate(_))
        ));
        assert!(FeeRate::sat_per_byte(f64::NAN).is_err());
        assert!(FeeRate::sat_per_byte(f64::INFINITY).is_err());
        assert!(FeeRate::sat_per_byte(0.0).is_ok());
        assert!(FeeRate::from_decimal(Decimal::from(-1)).is_err());
    }

    #[test]
    fn test_rejects_rates_beyond_decimal_range() {
        // Not representable as a Decimal at all.
        assert!(matches!(
            FeeRate::sat_per_byte(1e30),
            Err(ProtocolError::InvalidFeeRate(_))
        ));
        // Representable, but the per-kilobyte rate overflows.
        assert!(matches!(
            FeeRate::sat_per_byte(1e26),
            Err(ProtocolError::InvalidFeeRate(_))
        ));
        assert!(FeeRate::from_decimal(Decimal::MAX).is_err());
    }

    #[test]
    fn test_large_valid_rate_converts_exactly() {
        let rate = FeeRate::sat_per_byte(1e20).unwrap();
        assert_eq!(
            rate.btc_per_kvb(),
            Decimal::from_str("1000000000000000").unwrap()
        );
    }
}
