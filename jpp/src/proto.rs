//! Wire format types for the JSON Payment Protocol.
//!
//! # Key Types
//!
//! - [`PaymentRequest`] - Payment terms issued by the payee's server
//! - [`Output`] - A single address/amount pair the payer must fund
//! - [`PaymentResponse`] - Server acknowledgement of a submitted payment

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;
use crate::fee::FeeRate;

/// Decimal places of a coin amount (one satoshi is `1e-8` coin).
pub const COIN_DECIMALS: u32 = 8;

/// A payment request as sent by the payee's server.
///
/// Anyone can build or deserialize one. Only a request returned by
/// [`parse_payment_request`](crate::integrity::parse_payment_request) passes
/// signature verification, together with the
/// [`AuthenticationContext`](crate::integrity::AuthenticationContext) it was
/// returned with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    /// Network the payment must be made on (e.g. `"main"`, `"test"`).
    pub network: String,
    /// Currency code of the payment (e.g. `"BTC"`).
    pub currency: String,
    /// Outputs the transaction must pay.
    #[serde(default)]
    pub outputs: Vec<Output>,
    /// URL the payment (and its pre-verification) is posted to.
    pub payment_url: String,
    /// Minimum fee rate in satoshis per byte.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_fee_rate: Option<f64>,
    /// Legacy spelling of [`required_fee_rate`](Self::required_fee_rate).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_fee_per_byte: Option<f64>,
    /// Time the request was issued.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<DateTime<Utc>>,
    /// Time after which the server no longer accepts payment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<DateTime<Utc>>,
    /// Free-form message for the payer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
    /// Server-side identifier of the invoice.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<String>,
    /// Fields this client does not interpret.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// A single output of a [`PaymentRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Output {
    /// Destination address.
    pub address: String,
    /// Amount in base units (satoshis).
    pub amount: u64,
}

impl Output {
    /// Returns the amount in coin units with exactly eight decimal places.
    #[must_use]
    pub fn coin_amount(&self) -> Decimal {
        coins_from_base_units(self.amount)
    }
}

/// Converts base units to an exact eight-decimal coin amount.
#[must_use]
pub fn coins_from_base_units(amount: u64) -> Decimal {
    Decimal::from_i128_with_scale(i128::from(amount), COIN_DECIMALS)
}

impl PaymentRequest {
    /// Returns the fee rate the server requires.
    ///
    /// Prefers `requiredFeeRate` and falls back to the legacy
    /// `requiredFeePerByte`. A request carrying neither yields `None`.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidFeeRate`] for negative or non-finite values.
    pub fn fee_rate(&self) -> Result<Option<FeeRate>, ProtocolError> {
        self.required_fee_rate
            .or(self.required_fee_per_byte)
            .map(FeeRate::sat_per_byte)
            .transpose()
    }

    /// Returns the outputs as an address to coin-amount mapping.
    ///
    /// Amounts paid to the same address more than once are summed.
    #[must_use]
    pub fn outputs_by_address(&self) -> BTreeMap<String, Decimal> {
        let mut outputs: BTreeMap<String, Decimal> = BTreeMap::new();
        for output in &self.outputs {
            *outputs.entry(output.address.clone()).or_default() += output.coin_amount();
        }
        outputs
    }

    /// Returns the sum of all outputs in base units, or `None` on overflow.
    #[must_use]
    pub fn total_amount(&self) -> Option<u64> {
        self.outputs
            .iter()
            .try_fold(0u64, |acc, output| acc.checked_add(output.amount))
    }

    /// Returns `true` if the request carries an expiry earlier than `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires.is_some_and(|expires| expires < now)
    }

    /// Checks that the request targets the network and currency the caller
    /// is configured for. Both comparisons ignore ASCII case.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::CurrencyMismatch`] or
    /// [`ProtocolError::NetworkMismatch`].
    pub fn check_terms(&self, network: &str, currency: &str) -> Result<(), ProtocolError> {
        if !self.currency.eq_ignore_ascii_case(currency) {
            return Err(ProtocolError::CurrencyMismatch {
                expected: currency.to_owned(),
                actual: self.currency.clone(),
            });
        }
        if !self.network.eq_ignore_ascii_case(network) {
            return Err(ProtocolError::NetworkMismatch {
                expected: network.to_owned(),
                actual: self.network.clone(),
            });
        }
        Ok(())
    }

    /// [`check_terms`](Self::check_terms), then
    /// [`check_expiry`](Self::check_expiry).
    ///
    /// # Errors
    ///
    /// Returns the errors of [`check_terms`](Self::check_terms), or
    /// [`ProtocolError::RequestExpired`].
    pub fn check_terms_at(
        &self,
        network: &str,
        currency: &str,
        now: DateTime<Utc>,
    ) -> Result<(), ProtocolError> {
        self.check_terms(network, currency)?;
        self.check_expiry(now)
    }

    /// Rejects a request whose expiry is before `now`.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::RequestExpired`].
    pub fn check_expiry(&self, now: DateTime<Utc>) -> Result<(), ProtocolError> {
        match self.expires {
            Some(expires) if expires < now => {
                Err(ProtocolError::RequestExpired(expires.to_rfc3339()))
            }
            _ => Ok(()),
        }
    }
}

/// Server acknowledgement of a payment or verification submission.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResponse {
    /// Message from the server, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
    /// Echo of the submitted payment, if the server returns one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment: Option<serde_json::Value>,
    /// Fields this client does not interpret.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn request(json: &str) -> PaymentRequest {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_deserialize_minimal_request() {
        let pr = request(
            r#"{"network":"test","currency":"BTC","outputs":[{"address":"1Addr","amount":100000000}],"paymentUrl":"https://pay.example/p"}"#,
        );
        assert_eq!(pr.network, "test");
        assert_eq!(pr.outputs.len(), 1);
        assert_eq!(pr.outputs[0].amount, 100_000_000);
        assert_eq!(pr.payment_url, "https://pay.example/p");
        assert!(pr.fee_rate().unwrap().is_none());
        assert!(pr.extra.is_empty());
    }

    #[test]
    fn test_unknown_fields_are_kept() {
        let pr = request(
            r#"{"network":"main","currency":"BCH","outputs":[],"paymentUrl":"https://x/p","merchantData":"{\"a\":1}"}"#,
        );
        assert_eq!(
            pr.extra.get("merchantData"),
            Some(&serde_json::json!("{\"a\":1}"))
        );
    }

    #[test]
    fn test_outputs_keep_eight_decimals() {
        let pr = request(
            r#"{"network":"test","currency":"BTC","outputs":[{"address":"1A","amount":1},{"address":"1B","amount":123456789},{"address":"1A","amount":100000000}],"paymentUrl":"https://x/p"}"#,
        );
        let outputs = pr.outputs_by_address();
        assert_eq!(outputs["1A"], Decimal::from_str("1.00000001").unwrap());
        assert_eq!(outputs["1B"].to_string(), "1.23456789");
        assert_eq!(pr.total_amount(), Some(223_456_790));
    }

    #[test]
    fn test_fee_rate_falls_back_to_legacy_field() {
        let pr = request(
            r#"{"network":"test","currency":"BTC","outputs":[],"paymentUrl":"https://x/p","requiredFeePerByte":3}"#,
        );
        assert_eq!(pr.fee_rate().unwrap().unwrap().sat_per_byte_value(), Decimal::from(3));
    }

    #[test]
    fn test_check_terms_ignores_case() {
        let pr = request(
            r#"{"network":"Test","currency":"btc","outputs":[],"paymentUrl":"https://x/p"}"#,
        );
        assert!(pr.check_terms("test", "BTC").is_ok());
        assert!(matches!(
            pr.check_terms("main", "BTC"),
            Err(ProtocolError::NetworkMismatch { .. })
        ));
        assert!(matches!(
            pr.check_terms("test", "BCH"),
            Err(ProtocolError::CurrencyMismatch { .. })
        ));
    }

    #[test]
    fn test_expired_request_is_rejected() {
        let pr = request(
            r#"{"network":"test","currency":"BTC","outputs":[],"paymentUrl":"https://x/p","expires":"2020-01-01T00:15:00.000Z"}"#,
        );
        let now = DateTime::parse_from_rfc3339("2020-01-01T00:20:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert!(pr.is_expired(now));
        assert!(matches!(
            pr.check_terms_at("test", "BTC", now),
            Err(ProtocolError::RequestExpired(_))
        ));
    }
}
