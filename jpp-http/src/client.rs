//! The payment-protocol client.
//!
//! [`PaymentProtocolClient`] sequences one exchange with a payee's server:
//! resolve the payment URI, fetch the request, check its digest, verify its
//! signature against the trusted keys, then submit payments to its
//! `paymentUrl`. Each exchange is independent; a client may run many at once.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use jpp::KeyRegistry;
//! use jpp_http::{ClientOptions, PaymentProtocolClient};
//!
//! # async fn run(keys: KeyRegistry, signed_tx: &str) -> Result<(), jpp_http::ClientError> {
//! let client = PaymentProtocolClient::new(ClientOptions::new(), Arc::new(keys))?;
//! let verified = client
//!     .get_payment_request("bitcoin:?r=https://test.bitpay.com/i/7EmXxXQo3Yv8xW9vFPMBoe")
//!     .await?;
//! PaymentProtocolClient::check_request(&verified.request, "test", "BTC")?;
//! let response = client
//!     .send_payment(&verified.request.currency, signed_tx, &verified.request.payment_url)
//!     .await?;
//! println!("{} says: {:?}", verified.owner, response.memo);
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use chrono::{DateTime, Utc};
use http::{HeaderValue, StatusCode};
use jpp::{
    AuthenticationContext, HexTransaction, KeyRegistry, PaymentPayload, PaymentRequest,
    PaymentResponse, ProtocolError, SignedTransaction, TransactionBroadcaster, TransactionBuilder,
    TransactionSigner, VerificationPayload, parse_payment_request, resolve_payment_uri,
    verify_payment_request,
};
use url::Url;

#[cfg(feature = "telemetry")]
use tracing::{debug, info};

use crate::constants::{
    CONTENT_TYPE_PAYMENT, CONTENT_TYPE_PAYMENT_VERIFICATION, CONTEXT_PAYMENT, CONTEXT_VERIFICATION,
};
use crate::error::ClientError;
use crate::options::{ClientOptions, RequestOptions};
use crate::settle::{Settlement, settle_concurrently};
use crate::transport::{HttpTransport, RawResponse};

/// A payment request whose digest and signature have both been checked.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedPaymentRequest {
    /// The parsed request.
    pub request: PaymentRequest,
    /// Owner label of the identity that signed it.
    pub owner: String,
    /// URL the request was served from.
    pub request_url: Url,
}

/// A signed transaction the server has pre-verified, waiting for the payer's
/// go-ahead.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedPayment {
    /// Currency of the payment.
    pub currency: String,
    /// URL the payment is posted to.
    pub payment_url: String,
    /// The signed transaction and its weighted size.
    pub signed: SignedTransaction,
    /// The server's answer to pre-verification.
    pub verification: PaymentResponse,
}

/// Client for the JSON Payment Protocol.
///
/// Cheap to clone; clones share the connection pool and the key registry.
#[derive(Clone, Debug)]
pub struct PaymentProtocolClient {
    transport: HttpTransport,
    trusted_keys: Arc<KeyRegistry>,
}

impl PaymentProtocolClient {
    /// Builds a client that trusts the signers in `trusted_keys`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::ClientBuild`] if the HTTP client cannot be built.
    pub fn new(
        options: ClientOptions,
        trusted_keys: Arc<KeyRegistry>,
    ) -> Result<Self, ClientError> {
        Ok(Self {
            transport: HttpTransport::new(options)?,
            trusted_keys,
        })
    }

    /// Returns the trusted signing keys.
    #[must_use]
    pub fn trusted_keys(&self) -> &KeyRegistry {
        &self.trusted_keys
    }

    /// Returns the connection options.
    #[must_use]
    pub const fn options(&self) -> &ClientOptions {
        self.transport.options()
    }

    /// Returns the underlying transport.
    #[must_use]
    pub const fn transport(&self) -> &HttpTransport {
        &self.transport
    }

    /// Resolves `uri` and fetches the payment request it points to, without
    /// parsing or checking it.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidProtocolUri`] for an unusable URI, or
    /// any transport error of [`HttpTransport::fetch_payment_request`].
    pub async fn get_raw_payment_request(&self, uri: &str) -> Result<RawResponse, ClientError> {
        self.get_raw_payment_request_with(uri, &RequestOptions::default())
            .await
    }

    /// [`get_raw_payment_request`](Self::get_raw_payment_request) with
    /// per-request options.
    ///
    /// # Errors
    ///
    /// See [`get_raw_payment_request`](Self::get_raw_payment_request).
    pub async fn get_raw_payment_request_with(
        &self,
        uri: &str,
        request: &RequestOptions,
    ) -> Result<RawResponse, ClientError> {
        let url = resolve_payment_uri(uri)?;
        self.transport.fetch_payment_request(&url, request).await
    }

    /// Parses a fetched payment request and checks its digest.
    ///
    /// # Errors
    ///
    /// See [`jpp::parse_payment_request`].
    pub fn parse_payment_request(
        &self,
        raw: &RawResponse,
    ) -> Result<(PaymentRequest, AuthenticationContext), ProtocolError> {
        parse_payment_request(&raw.body, &raw.headers)
    }

    /// Verifies the signature of a parsed payment request against this
    /// client's trusted keys. Returns the signer's owner label.
    ///
    /// # Errors
    ///
    /// See [`jpp::verify_payment_request`].
    pub fn verify_payment_request(
        &self,
        request_url: &Url,
        request: &PaymentRequest,
        context: &AuthenticationContext,
    ) -> Result<String, ProtocolError> {
        verify_payment_request(request_url.as_str(), request, context, &self.trusted_keys)
    }

    /// Fetches, digest-checks and signature-verifies a payment request.
    ///
    /// # Errors
    ///
    /// Returns the first transport, integrity or authentication failure.
    pub async fn get_payment_request(
        &self,
        uri: &str,
    ) -> Result<VerifiedPaymentRequest, ClientError> {
        let raw = self.get_raw_payment_request(uri).await?;
        let (request, context) = self.parse_payment_request(&raw)?;
        let owner = self.verify_payment_request(&raw.request_url, &request, &context)?;

        #[cfg(feature = "telemetry")]
        info!(
            owner = %owner,
            network = %request.network,
            currency = %request.currency,
            outputs = request.outputs.len(),
            "Payment request verified"
        );

        Ok(VerifiedPaymentRequest {
            request,
            owner,
            request_url: raw.request_url,
        })
    }

    /// Checks that a request targets the expected network and currency.
    ///
    /// Run this before building a transaction for the request.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::NetworkMismatch`] or
    /// [`ProtocolError::CurrencyMismatch`].
    pub fn check_request(
        request: &PaymentRequest,
        network: &str,
        currency: &str,
    ) -> Result<(), ProtocolError> {
        request.check_terms(network, currency)
    }

    /// [`check_request`](Self::check_request), also refusing a request that
    /// expired before `now`.
    ///
    /// # Errors
    ///
    /// As [`check_request`](Self::check_request), or
    /// [`ProtocolError::RequestExpired`].
    pub fn check_request_at(
        request: &PaymentRequest,
        network: &str,
        currency: &str,
        now: DateTime<Utc>,
    ) -> Result<(), ProtocolError> {
        request.check_terms_at(network, currency, now)
    }

    /// Asks the server to confirm an unsigned transaction pays the request's
    /// outputs at an adequate fee, before the payer signs it.
    ///
    /// `weighted_size` is the expected size of the signed transaction.
    ///
    /// # Errors
    ///
    /// - [`ProtocolError::InvalidTransactionEncoding`] if `unsigned_tx` is
    ///   not hex (no request is sent)
    /// - [`ClientError::VerificationRejected`] if the server refuses it
    /// - any transport error
    pub async fn verify_unsigned_payment(
        &self,
        currency: &str,
        unsigned_tx: &str,
        weighted_size: u64,
        payment_url: &str,
    ) -> Result<PaymentResponse, ClientError> {
        let tx = HexTransaction::parse(unsigned_tx)?;
        let url = parse_payment_url(payment_url)?;

        #[cfg(feature = "telemetry")]
        debug!(tx_bytes = tx.byte_len(), weighted_size, "Submitting unsigned transaction for verification");

        let payload = VerificationPayload::new(currency, tx, weighted_size);
        self.transport
            .submit_payload(
                &url,
                HeaderValue::from_static(CONTENT_TYPE_PAYMENT_VERIFICATION),
                CONTEXT_VERIFICATION,
                &payload,
                &RequestOptions::default(),
            )
            .await
            .map_err(|err| {
                rejection(err, |status, reason| ClientError::VerificationRejected {
                    status,
                    reason,
                })
            })
    }

    /// Sends the signed payment to the server.
    ///
    /// # Errors
    ///
    /// - [`ProtocolError::InvalidTransactionEncoding`] if `signed_tx` is not
    ///   hex (no request is sent)
    /// - [`ClientError::SubmissionRejected`] if the server refuses it
    /// - any transport error
    pub async fn send_payment(
        &self,
        currency: &str,
        signed_tx: &str,
        payment_url: &str,
    ) -> Result<PaymentResponse, ClientError> {
        let tx = HexTransaction::parse(signed_tx)?;
        let url = parse_payment_url(payment_url)?;
        self.submit_payment(&url, PaymentPayload::new(currency, tx))
            .await
    }

    /// Sends the signed payment to the server and broadcasts it through
    /// `broadcaster` at the same time.
    ///
    /// The transaction is validated once, before either side starts. After
    /// that, both outcomes are reported in the returned [`Settlement`].
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidTransactionEncoding`] or
    /// [`ProtocolError::InvalidRequestUrl`] before anything is sent.
    pub async fn settle<B>(
        &self,
        currency: &str,
        signed_tx: &str,
        payment_url: &str,
        broadcaster: &B,
    ) -> Result<Settlement, ClientError>
    where
        B: TransactionBroadcaster + ?Sized,
    {
        let tx = HexTransaction::parse(signed_tx)?;
        let url = parse_payment_url(payment_url)?;
        let payload = PaymentPayload::new(currency, tx.clone());
        Ok(settle_concurrently(
            self.submit_payment(&url, payload),
            broadcaster.broadcast(&tx),
        )
        .await)
    }

    /// Builds, signs and pre-verifies a payment for a verified request.
    ///
    /// Refuses an expired request before the wallet is asked for anything.
    /// The unsigned transaction is pre-verified with the signed
    /// transaction's weighted size. Nothing is sent to the server's payment
    /// endpoint or broadcast; pass the result to
    /// [`complete_payment`](Self::complete_payment) once the payer confirms.
    ///
    /// # Errors
    ///
    /// - [`ProtocolError::RequestExpired`] if the request has expired
    /// - [`ClientError::Wallet`] if building or signing fails
    /// - the errors of [`verify_unsigned_payment`](Self::verify_unsigned_payment)
    pub async fn prepare_payment<W, S>(
        &self,
        verified: &VerifiedPaymentRequest,
        builder: &W,
        signer: &S,
    ) -> Result<PreparedPayment, ClientError>
    where
        W: TransactionBuilder + ?Sized,
        S: TransactionSigner + ?Sized,
    {
        let request = &verified.request;
        request.check_expiry(Utc::now())?;
        let fee_rate = request.fee_rate()?.unwrap_or_default();
        let outputs = request.outputs_by_address();

        let unsigned = builder
            .build(&outputs, fee_rate)
            .await
            .map_err(|source| ClientError::Wallet {
                context: "build transaction",
                source,
            })?;
        let signed = signer
            .sign(&unsigned)
            .await
            .map_err(|source| ClientError::Wallet {
                context: "sign transaction",
                source,
            })?;

        let verification = self
            .verify_unsigned_payment(
                &request.currency,
                unsigned.as_str(),
                signed.weighted_size,
                &request.payment_url,
            )
            .await?;

        Ok(PreparedPayment {
            currency: request.currency.clone(),
            payment_url: request.payment_url.clone(),
            signed,
            verification,
        })
    }

    /// Settles a prepared payment: submits it and broadcasts it.
    ///
    /// # Errors
    ///
    /// See [`settle`](Self::settle).
    pub async fn complete_payment<B>(
        &self,
        prepared: &PreparedPayment,
        broadcaster: &B,
    ) -> Result<Settlement, ClientError>
    where
        B: TransactionBroadcaster + ?Sized,
    {
        self.settle(
            &prepared.currency,
            prepared.signed.tx.as_str(),
            &prepared.payment_url,
            broadcaster,
        )
        .await
    }

    /// Pays a verified request with the given wallet.
    ///
    /// Runs [`prepare_payment`](Self::prepare_payment), asks `confirm`
    /// whether to go ahead, then runs
    /// [`complete_payment`](Self::complete_payment).
    ///
    /// # Errors
    ///
    /// The errors of [`prepare_payment`](Self::prepare_payment) and
    /// [`settle`](Self::settle), or [`ClientError::PaymentDeclined`] if
    /// `confirm` returns `false`. Either stops the payment before anything is
    /// broadcast.
    pub async fn pay<W, S, B, F>(
        &self,
        verified: &VerifiedPaymentRequest,
        builder: &W,
        signer: &S,
        broadcaster: &B,
        confirm: F,
    ) -> Result<Settlement, ClientError>
    where
        W: TransactionBuilder + ?Sized,
        S: TransactionSigner + ?Sized,
        B: TransactionBroadcaster + ?Sized,
        F: FnOnce(&PreparedPayment) -> bool,
    {
        let prepared = self.prepare_payment(verified, builder, signer).await?;
        if !confirm(&prepared) {
            #[cfg(feature = "telemetry")]
            info!(owner = %verified.owner, "Payment declined");
            return Err(ClientError::PaymentDeclined);
        }
        self.complete_payment(&prepared, broadcaster).await
    }

    async fn submit_payment(
        &self,
        url: &Url,
        payload: PaymentPayload,
    ) -> Result<PaymentResponse, ClientError> {
        #[cfg(feature = "telemetry")]
        debug!(
            transactions = payload.transactions.len(),
            "Submitting signed payment"
        );

        self.transport
            .submit_payload(
                url,
                HeaderValue::from_static(CONTENT_TYPE_PAYMENT),
                CONTEXT_PAYMENT,
                &payload,
                &RequestOptions::default(),
            )
            .await
            .map_err(|err| {
                rejection(err, |status, reason| ClientError::SubmissionRejected {
                    status,
                    reason,
                })
            })
    }
}

/// Parses a request's `paymentUrl`.
fn parse_payment_url(payment_url: &str) -> Result<Url, ProtocolError> {
    if payment_url.is_empty() {
        return Err(ProtocolError::MissingParameter("payment_url"));
    }
    Url::parse(payment_url)
        .map_err(|e| ProtocolError::InvalidRequestUrl(format!("{payment_url}: {e}")))
}

/// Turns a non-200 answer into the server's stated rejection.
fn rejection(err: ClientError, reject: impl FnOnce(StatusCode, String) -> ClientError) -> ClientError {
    match err {
        ClientError::UnexpectedStatus { status, body, .. } => reject(status, body),
        other => other,
    }
}
