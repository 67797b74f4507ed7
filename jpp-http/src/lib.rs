#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! HTTP client for the JSON Payment Protocol.
//!
//! Fetches payment requests, checks them with the [`jpp`] core and submits
//! payments back to the payee's server.
//!
//! # Modules
//!
//! - [`client`] - [`PaymentProtocolClient`], which sequences an exchange
//! - [`transport`] - `GET` and `POST` over `reqwest`
//! - [`settle`] - Payment submission and broadcast run side by side
//! - [`options`] - Client-wide and per-request options
//! - [`constants`] - Media types and limits
//! - [`error`] - [`ClientError`]
//!
//! # Feature Flags
//!
//! - `telemetry` - Enables tracing spans around fetch and submit

pub mod client;
pub mod constants;
pub mod error;
pub mod options;
pub mod settle;
pub mod transport;

pub use client::{PaymentProtocolClient, PreparedPayment, VerifiedPaymentRequest};
pub use error::ClientError;
pub use options::{ClientOptions, EffectiveOptions, RequestOptions};
pub use settle::Settlement;
pub use transport::{HttpTransport, RawResponse};
