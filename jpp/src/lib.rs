#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Core types and verification for the JSON Payment Protocol.
//!
//! A payee's server answers a payment-request URL with a JSON document and
//! authenticates it with three layers of headers: a SHA-256 `Digest` of the
//! exact body, an ECDSA `Signature` over that digest, and an `X-Identity`
//! naming the signing key. This crate checks all three without doing any I/O.
//! The HTTP side lives in `jpp-http`.
//!
//! # Modules
//!
//! - [`uri`] - Resolves `https://` and `bitcoin:?r=` style payment URIs
//! - [`integrity`] - Parses a payment request and checks its digest
//! - [`signature`] - Verifies the signature against a [`KeyRegistry`]
//! - [`keys`] - Trusted keys scoped by domain and network
//! - [`proto`] - Payment request and response wire types
//! - [`payment`] - Outbound payment and verification payloads
//! - [`fee`] - Fee-rate units
//! - [`wallet`] - Traits for the wallet that builds, signs and broadcasts
//!
//! # Example
//!
//! ```rust,no_run
//! use jpp::{KeyRegistry, ResponseHeaders, parse_payment_request, verify_payment_request};
//!
//! # fn run(body: &[u8], headers: ResponseHeaders, keys: KeyRegistry) -> Result<(), jpp::ProtocolError> {
//! let (request, context) = parse_payment_request(body, &headers)?;
//! let owner = verify_payment_request("https://pay.example/i/abc", &request, &context, &keys)?;
//! println!("{owner} requests {} outputs", request.outputs.len());
//! # Ok(())
//! # }
//! ```
//!
//! # Feature Flags
//!
//! - `telemetry` - Enables tracing instrumentation of the verification steps

pub mod error;
pub mod fee;
pub mod headers;
pub mod integrity;
pub mod keys;
pub mod payment;
pub mod proto;
pub mod signature;
pub mod uri;
pub mod wallet;

pub use error::ProtocolError;
pub use fee::FeeRate;
pub use headers::ResponseHeaders;
pub use integrity::{AuthenticationContext, parse_payment_request};
pub use keys::{KeyRegistry, TrustedKey};
pub use payment::{HexTransaction, PaymentPayload, SignedTransaction, VerificationPayload};
pub use proto::{Output, PaymentRequest, PaymentResponse};
pub use signature::verify_payment_request;
pub use uri::{PaymentUri, resolve_payment_uri};
pub use wallet::{
    BoxError, BoxFuture, TransactionBroadcaster, TransactionBuilder, TransactionSigner,
};
