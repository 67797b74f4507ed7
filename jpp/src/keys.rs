//! Trusted signing keys.
//!
//! A [`KeyRegistry`] maps identities (the `x-identity` header, a public-key
//! hash) to the [`TrustedKey`] allowed to sign payment requests, together
//! with the domains and networks that key may sign for. The registry is
//! supplied by the caller and never mutated by the protocol code.
//!
//! The serialized form matches the usual wallet configuration shape:
//!
//! ```json
//! {
//!   "mh65MN7drqmwpCRZcEeBEE9ceQCQ95HtZc": {
//!     "owner": "BitPay (TESTNET ONLY - DO NOT TRUST FOR ACTUAL BITCOIN)",
//!     "networks": ["test"],
//!     "domains": ["test.bitpay.com"],
//!     "publicKey": "03159069584176096f1c89763488b94dbc8d5e1fa7bf91f50b42f4befe4e45295a"
//!   }
//! }
//! ```

use std::collections::{BTreeSet, HashMap};

use k256::ecdsa::VerifyingKey;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ProtocolError;

/// Length of a compressed SEC1 secp256k1 public key.
pub const COMPRESSED_PUBLIC_KEY_LEN: usize = 33;

/// A public key trusted to sign payment requests for a set of domains and
/// networks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustedKey {
    owner: String,
    networks: BTreeSet<String>,
    domains: BTreeSet<String>,
    public_key: [u8; COMPRESSED_PUBLIC_KEY_LEN],
    verifying_key: VerifyingKey,
}

impl TrustedKey {
    /// Creates a trusted key from a hex-encoded compressed public key.
    ///
    /// `identity` is only used to label the error.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidPublicKey`] if the key is not 33 bytes
    /// of hex encoding a point on secp256k1.
    pub fn from_hex(
        identity: &str,
        owner: impl Into<String>,
        public_key_hex: &str,
    ) -> Result<Self, ProtocolError> {
        let invalid = |reason: String| ProtocolError::InvalidPublicKey {
            identity: identity.to_owned(),
            reason,
        };
        let bytes = hex::decode(public_key_hex.trim()).map_err(|e| invalid(e.to_string()))?;
        let public_key: [u8; COMPRESSED_PUBLIC_KEY_LEN] = bytes.as_slice().try_into().map_err(|_| {
            invalid(format!(
                "expected {COMPRESSED_PUBLIC_KEY_LEN} bytes, got {}",
                bytes.len()
            ))
        })?;
        let verifying_key =
            VerifyingKey::from_sec1_bytes(&public_key).map_err(|e| invalid(e.to_string()))?;
        Ok(Self {
            owner: owner.into(),
            networks: BTreeSet::new(),
            domains: BTreeSet::new(),
            public_key,
            verifying_key,
        })
    }

    /// Allows the key to sign for `network`.
    #[must_use]
    pub fn with_network(mut self, network: impl Into<String>) -> Self {
        self.networks.insert(network.into());
        self
    }

    /// Allows the key to sign for `domain`.
    #[must_use]
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domains.insert(domain.into().to_ascii_lowercase());
        self
    }

    /// Human-readable owner label shown to the payer.
    #[must_use]
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Networks this key may sign for.
    #[must_use]
    pub const fn networks(&self) -> &BTreeSet<String> {
        &self.networks
    }

    /// Domains this key may sign for (lower-cased).
    #[must_use]
    pub const fn domains(&self) -> &BTreeSet<String> {
        &self.domains
    }

    /// Compressed SEC1 encoding of the public key.
    #[must_use]
    pub const fn public_key(&self) -> &[u8; COMPRESSED_PUBLIC_KEY_LEN] {
        &self.public_key
    }

    /// Returns `true` if the key may sign requests served from `host`.
    #[must_use]
    pub fn trusts_domain(&self, host: &str) -> bool {
        self.domains
            .iter()
            .any(|domain| domain.eq_ignore_ascii_case(host))
    }

    /// Returns `true` if the key may sign requests for `network`.
    #[must_use]
    pub fn trusts_network(&self, network: &str) -> bool {
        self.networks.contains(network)
    }

    pub(crate) const fn verifying_key(&self) -> &VerifyingKey {
        &self.verifying_key
    }
}

/// Serialized form of a [`TrustedKey`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TrustedKeyRecord {
    owner: String,
    #[serde(default)]
    networks: Vec<String>,
    #[serde(default)]
    domains: Vec<String>,
    public_key: String,
}

impl TrustedKeyRecord {
    fn into_key(self, identity: &str) -> Result<TrustedKey, ProtocolError> {
        let key = TrustedKey::from_hex(identity, self.owner, &self.public_key)?;
        let key = self
            .networks
            .into_iter()
            .fold(key, TrustedKey::with_network);
        Ok(self.domains.into_iter().fold(key, TrustedKey::with_domain))
    }
}

impl From<&TrustedKey> for TrustedKeyRecord {
    fn from(key: &TrustedKey) -> Self {
        Self {
            owner: key.owner.clone(),
            networks: key.networks.iter().cloned().collect(),
            domains: key.domains.iter().cloned().collect(),
            public_key: hex::encode(key.public_key),
        }
    }
}

/// Identities trusted to sign payment requests.
///
/// Read-only once built; share it across concurrent exchanges behind an
/// [`Arc`](std::sync::Arc).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyRegistry {
    keys: HashMap<String, TrustedKey>,
}

impl KeyRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a trusted key under `identity`, replacing any previous entry.
    #[must_use]
    pub fn with_key(mut self, identity: impl Into<String>, key: TrustedKey) -> Self {
        self.keys.insert(identity.into(), key);
        self
    }

    /// Parses a registry from its JSON form.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or a key fails to decode.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Looks up the key trusted under `identity`.
    #[must_use]
    pub fn get(&self, identity: &str) -> Option<&TrustedKey> {
        self.keys.get(identity)
    }

    /// Returns the number of trusted identities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns `true` if no identity is trusted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Iterates over `(identity, key)` pairs in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &TrustedKey)> {
        self.keys.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl FromIterator<(String, TrustedKey)> for KeyRegistry {
    fn from_iter<I: IntoIterator<Item = (String, TrustedKey)>>(iter: I) -> Self {
        Self {
            keys: iter.into_iter().collect(),
        }
    }
}

impl Serialize for KeyRegistry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let records: std::collections::BTreeMap<&str, TrustedKeyRecord> = self
            .keys
            .iter()
            .map(|(identity, key)| (identity.as_str(), TrustedKeyRecord::from(key)))
            .collect();
        records.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for KeyRegistry {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let records = HashMap::<String, TrustedKeyRecord>::deserialize(deserializer)?;
        records
            .into_iter()
            .map(|(identity, record)| {
                let key = record.into_key(&identity).map_err(D::Error::custom)?;
                Ok((identity, key))
            })
            .collect()
    }
}
