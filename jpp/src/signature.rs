//! Payment-request signature verification.
//!
//! The server signs the SHA-256 digest of the response body with a secp256k1
//! key and announces the signature in three headers:
//!
//! - `signature` - hex of a DER (or 64-byte compact) ECDSA signature
//! - `x-signature-type` - always `ecc`
//! - `x-identity` - public-key hash used to look up the signing key
//!
//! A signature is only accepted if the identity is in the caller's
//! [`KeyRegistry`], the host that served the request is one of the identity's
//! domains, and the request's network is one of the identity's networks.
//! Scoping is checked independently of the signature, so a valid signature
//! from a key trusted elsewhere is still refused.

use k256::ecdsa::Signature;
use k256::ecdsa::signature::hazmat::PrehashVerifier;
#[cfg(feature = "telemetry")]
use tracing::{debug, instrument};
use url::Url;

use crate::error::ProtocolError;
use crate::headers::{self, ResponseHeaders};
use crate::integrity::AuthenticationContext;
use crate::keys::KeyRegistry;
use crate::proto::PaymentRequest;

/// Header values naming the signature and its signer.
#[derive(Debug, Clone, Copy)]
struct SignatureHeaders<'a> {
    signature: &'a str,
    identity: &'a str,
}

impl<'a> SignatureHeaders<'a> {
    fn extract(headers: &'a ResponseHeaders) -> Result<Self, ProtocolError> {
        let signature = required(headers, headers::SIGNATURE)?;
        let signature_type = required(headers, headers::X_SIGNATURE_TYPE)?;
        let identity = required(headers, headers::X_IDENTITY)?;

        if !is_token(signature_type) {
            return Err(ProtocolError::InvalidSignatureType(signature_type.to_owned()));
        }
        if !signature_type.eq_ignore_ascii_case(headers::SIGNATURE_TYPE_ECC) {
            return Err(ProtocolError::UnsupportedSignatureType(
                signature_type.to_owned(),
            ));
        }

        Ok(Self {
            signature,
            identity,
        })
    }
}

fn required<'a>(
    headers: &'a ResponseHeaders,
    name: &'static str,
) -> Result<&'a str, ProtocolError> {
    headers
        .get(name)
        .map(str::trim)
        .ok_or(ProtocolError::MissingSignatureHeader(name))
}

fn is_token(value: &str) -> bool {
    !value.is_empty()
        && value
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

/// Extracts the host a payment request was served from.
fn request_host(request_url: &str) -> Result<String, ProtocolError> {
    if request_url.is_empty() {
        return Err(ProtocolError::InvalidRequestUrl(String::new()));
    }
    let url = Url::parse(request_url)
        .map_err(|e| ProtocolError::InvalidRequestUrl(format!("{request_url}: {e}")))?;
    url.host_str()
        .filter(|host| !host.is_empty())
        .map(str::to_ascii_lowercase)
        .ok_or_else(|| ProtocolError::InvalidRequestUrl(format!("{request_url}: no host")))
}

/// Decodes a hex signature, accepting DER or 64-byte compact encodings.
///
/// High-S signatures are normalized so they verify like their low-S twin.
fn decode_signature(signature_hex: &str) -> Result<Signature, ProtocolError> {
    let bytes = hex::decode(signature_hex).map_err(|_| ProtocolError::InvalidSignature)?;
    let signature = Signature::from_der(&bytes)
        .or_else(|_| Signature::from_slice(&bytes))
        .map_err(|_| ProtocolError::InvalidSignature)?;
    Ok(signature.normalize_s().unwrap_or(signature))
}

/// Verifies that a payment request was signed by a key trusted for the host
/// it came from and the network it names.
///
/// `request_url` is the URL the request was actually fetched from (after
/// [`PaymentUri`](crate::uri::PaymentUri) resolution). Returns the owner
/// label of the signing identity.
///
/// # Errors
///
/// - [`ProtocolError::InvalidRequestUrl`] if `request_url` has no host
/// - [`ProtocolError::MissingParameter`] if `trusted_keys` is empty
/// - [`ProtocolError::UnauthenticatedRequest`] if `payment_request` is not
///   the request `context` was parsed with
/// - [`ProtocolError::MissingDigest`] / [`ProtocolError::DigestMismatch`] if
///   the digest header is gone or disagrees with the validated hash
/// - [`ProtocolError::MissingSignatureHeader`],
///   [`ProtocolError::InvalidSignatureType`],
///   [`ProtocolError::UnsupportedSignatureType`] for header problems
/// - [`ProtocolError::UntrustedIdentity`], [`ProtocolError::DomainNotTrusted`],
///   [`ProtocolError::NetworkNotTrusted`] for scoping failures
/// - [`ProtocolError::InvalidSignature`] if the signature does not verify
#[cfg_attr(
    feature = "telemetry",
    instrument(name = "jpp.signature.verify", skip_all, fields(request_url = %request_url), err)
)]
pub fn verify_payment_request(
    request_url: &str,
    payment_request: &PaymentRequest,
    context: &AuthenticationContext,
    trusted_keys: &KeyRegistry,
) -> Result<String, ProtocolError> {
    if request_url.is_empty() {
        return Err(ProtocolError::InvalidRequestUrl(String::new()));
    }
    if trusted_keys.is_empty() {
        return Err(ProtocolError::MissingParameter("trusted_keys"));
    }
    if !context.authenticates(payment_request) {
        return Err(ProtocolError::UnauthenticatedRequest);
    }
    // Scope against the digest-checked copy, never the caller's.
    let network = &context.request().network;

    // Re-read the digest from the headers rather than trusting the stored hash.
    let digest_hex = context
        .headers()
        .get(headers::DIGEST)
        .and_then(headers::digest_value)
        .ok_or(ProtocolError::MissingDigest)?;
    if !digest_hex.eq_ignore_ascii_case(context.hash()) {
        return Err(ProtocolError::DigestMismatch {
            actual: context.hash().to_owned(),
            expected: digest_hex.to_owned(),
        });
    }
    let digest = hex::decode(digest_hex).map_err(|_| ProtocolError::MissingDigest)?;

    let SignatureHeaders {
        signature,
        identity,
    } = SignatureHeaders::extract(context.headers())?;

    let host = request_host(request_url)?;

    let key = trusted_keys
        .get(identity)
        .ok_or_else(|| ProtocolError::UntrustedIdentity(identity.to_owned()))?;

    if !key.trusts_domain(&host) {
        return Err(ProtocolError::DomainNotTrusted {
            identity: identity.to_owned(),
            host,
        });
    }

    if !key.trusts_network(network) {
        return Err(ProtocolError::NetworkNotTrusted {
            identity: identity.to_owned(),
            network: network.clone(),
        });
    }

    let signature = decode_signature(signature)?;
    key.verifying_key()
        .verify_prehash(&digest, &signature)
        .map_err(|_| ProtocolError::InvalidSignature)?;

    #[cfg(feature = "telemetry")]
    debug!(identity, host = %host, owner = key.owner(), "Payment request signature verified");

    Ok(key.owner().to_owned())
}
