//! Outbound payment payloads.
//!
//! Builders for the two JSON bodies a payer posts to a request's
//! `paymentUrl`: the pre-signing [`VerificationPayload`] and the final
//! [`PaymentPayload`]. Transactions are checked to be hex before they are
//! placed in either.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;

/// A transaction encoded as a non-empty, even-length hexadecimal string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct HexTransaction(String);

impl HexTransaction {
    /// Validates a hex-encoded transaction.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidTransactionEncoding`] if `tx` is empty,
    /// has odd length, or contains a non-hex character.
    pub fn parse(tx: impl Into<String>) -> Result<Self, ProtocolError> {
        let tx = tx.into();
        if tx.is_empty() || tx.len() % 2 != 0 || !tx.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(ProtocolError::InvalidTransactionEncoding);
        }
        Ok(Self(tx))
    }

    /// Returns the hex string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the encoded size in bytes.
    #[must_use]
    pub fn byte_len(&self) -> usize {
        self.0.len() / 2
    }

    /// Consumes the value, returning the hex string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl<'de> Deserialize<'de> for HexTransaction {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let tx = String::deserialize(deserializer)?;
        Self::parse(tx).map_err(serde::de::Error::custom)
    }
}

impl fmt::Display for HexTransaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for HexTransaction {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A signed transaction together with the size the server checks fees against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    /// The signed transaction.
    pub tx: HexTransaction,
    /// Weighted (virtual) size in bytes.
    pub weighted_size: u64,
}

/// Final payment body, posted as `application/payment`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentPayload {
    /// Currency code the payment is made in.
    pub currency: String,
    /// Signed transactions, hex encoded.
    pub transactions: Vec<HexTransaction>,
}

impl PaymentPayload {
    /// Builds the payload for a single signed transaction.
    #[must_use]
    pub fn new(currency: impl Into<String>, tx: HexTransaction) -> Self {
        Self {
            currency: currency.into(),
            transactions: vec![tx],
        }
    }
}

/// An unsigned transaction offered for pre-verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnsignedTransaction {
    /// The unsigned transaction.
    pub tx: HexTransaction,
    /// Expected weighted size of the transaction once signed.
    pub weighted_size: u64,
}

/// Pre-verification body, posted as `application/payment-verification`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationPayload {
    /// Currency code the payment is made in.
    pub currency: String,
    /// Unsigned transactions with their size hints.
    pub unsigned_transactions: Vec<UnsignedTransaction>,
}

impl VerificationPayload {
    /// Builds the payload for a single unsigned transaction.
    #[must_use]
    pub fn new(currency: impl Into<String>, tx: HexTransaction, weighted_size: u64) -> Self {
        Self {
            currency: currency.into(),
            unsigned_transactions: vec![UnsignedTransaction { tx, weighted_size }],
        }
    }
}
