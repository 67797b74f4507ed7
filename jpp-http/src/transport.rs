//! HTTP transport for payment requests and payment submissions.
//!
//! [`HttpTransport`] performs exactly two kinds of exchange:
//!
//! - `GET` of a payment request, returning the unparsed body, headers and
//!   final URL as a [`RawResponse`]
//! - `POST` of a JSON payload to a request's `paymentUrl`, returning the
//!   parsed [`PaymentResponse`]
//!
//! It never retries. Every error carries a static context string naming the
//! exchange it came from.

use http::header::{ACCEPT, CONTENT_TYPE};
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use jpp::{PaymentResponse, ResponseHeaders};
use reqwest::redirect::Policy;
use reqwest::{Client, RequestBuilder};
use std::fmt::Display;
use url::Url;

#[cfg(feature = "telemetry")]
use tracing::{Span, instrument};

use crate::constants::{ACCEPT_PAYMENT_REQUEST, CONTEXT_FETCH, MAX_REDIRECTS};
use crate::error::ClientError;
use crate::options::{ClientOptions, EffectiveOptions, RequestOptions};

/// The unparsed result of fetching a payment request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    /// Body bytes exactly as received.
    pub body: Vec<u8>,
    /// Response headers.
    pub headers: ResponseHeaders,
    /// URL the body was served from, after redirects.
    pub request_url: Url,
}

/// Sends payment-protocol requests over a shared [`reqwest::Client`].
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: Client,
    options: ClientOptions,
}

impl HttpTransport {
    /// Builds a transport for the given options.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::ClientBuild`] if the TLS backend cannot be
    /// initialized.
    pub fn new(options: ClientOptions) -> Result<Self, ClientError> {
        let client = Client::builder()
            .danger_accept_invalid_certs(!options.verify_tls())
            .redirect(Policy::limited(MAX_REDIRECTS))
            .build()
            .map_err(ClientError::ClientBuild)?;
        Ok(Self { client, options })
    }

    /// Returns the options this transport was built with.
    #[must_use]
    pub const fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Fetches a payment request.
    ///
    /// # Errors
    ///
    /// - [`ClientError::Transport`] if no response was received
    /// - [`ClientError::UnexpectedStatus`] if the status is not 200
    /// - [`ClientError::ResponseBodyRead`] if the body could not be read
    #[cfg_attr(
        feature = "telemetry",
        instrument(
            name = "jpp.client.fetch",
            skip_all,
            fields(
                url = %url,
                otel.status_code = tracing::field::Empty,
                error.message = tracing::field::Empty,
            )
        )
    )]
    pub async fn fetch_payment_request(
        &self,
        url: &Url,
        request: &RequestOptions,
    ) -> Result<RawResponse, ClientError> {
        let req = apply(
            self.client.get(url.clone()),
            self.options.layered(request),
            ACCEPT,
            HeaderValue::from_static(ACCEPT_PAYMENT_REQUEST),
        );
        let result = fetch(req).await;
        record_result_on_span(&result);
        result
    }

    /// Posts a JSON payload with the given `Content-Type`.
    ///
    /// A non-200 answer is returned as [`ClientError::UnexpectedStatus`];
    /// callers map it to the rejection that fits the submission.
    ///
    /// # Errors
    ///
    /// - [`ClientError::Transport`] if no response was received
    /// - [`ClientError::UnexpectedStatus`] if the status is not 200
    /// - [`ClientError::ResponseBodyRead`] if the body could not be read
    /// - [`ClientError::MalformedResponse`] if the body is not JSON
    #[cfg_attr(
        feature = "telemetry",
        instrument(
            name = "jpp.client.submit",
            skip_all,
            fields(
                url = %url,
                context = context,
                otel.status_code = tracing::field::Empty,
                error.message = tracing::field::Empty,
            )
        )
    )]
    pub async fn submit_payload<T>(
        &self,
        url: &Url,
        content_type: HeaderValue,
        context: &'static str,
        payload: &T,
        request: &RequestOptions,
    ) -> Result<PaymentResponse, ClientError>
    where
        T: serde::Serialize + Sync + ?Sized,
    {
        // Content-Type goes on before `json()` so it is not replaced.
        let req = apply(
            self.client.post(url.clone()),
            self.options.layered(request),
            CONTENT_TYPE,
            content_type,
        )
        .json(payload);
        let result = post_json(req, context).await;
        record_result_on_span(&result);
        result
    }
}

/// Applies configured headers and timeout, then the protocol header, which
/// replaces any configured header of the same name.
fn apply(
    req: RequestBuilder,
    options: EffectiveOptions,
    name: HeaderName,
    value: HeaderValue,
) -> RequestBuilder {
    let EffectiveOptions {
        mut headers,
        timeout,
    } = options;
    headers.insert(name, value);
    let req = req.headers(headers);
    match timeout {
        Some(timeout) => req.timeout(timeout),
        None => req,
    }
}

async fn fetch(req: RequestBuilder) -> Result<RawResponse, ClientError> {
    let context = CONTEXT_FETCH;
    let http_response = req
        .send()
        .await
        .map_err(|e| ClientError::Transport { context, source: e })?;

    if http_response.status() != StatusCode::OK {
        return Err(unexpected_status(http_response, context).await);
    }

    let request_url = http_response.url().clone();
    let headers = response_headers(http_response.headers());
    let body = http_response
        .bytes()
        .await
        .map_err(|e| ClientError::ResponseBodyRead { context, source: e })?
        .to_vec();

    Ok(RawResponse {
        body,
        headers,
        request_url,
    })
}

async fn post_json(
    req: RequestBuilder,
    context: &'static str,
) -> Result<PaymentResponse, ClientError> {
    let http_response = req
        .send()
        .await
        .map_err(|e| ClientError::Transport { context, source: e })?;

    if http_response.status() != StatusCode::OK {
        return Err(unexpected_status(http_response, context).await);
    }

    let body = http_response
        .bytes()
        .await
        .map_err(|e| ClientError::ResponseBodyRead { context, source: e })?;
    serde_json::from_slice(&body)
        .map_err(|e| ClientError::MalformedResponse { context, source: e })
}

async fn unexpected_status(http_response: reqwest::Response, context: &'static str) -> ClientError {
    let status = http_response.status();
    match http_response.text().await {
        Ok(body) => ClientError::UnexpectedStatus {
            context,
            status,
            body,
        },
        Err(e) => ClientError::ResponseBodyRead { context, source: e },
    }
}

/// Copies the headers the protocol reads. Values that are not visible ASCII
/// are skipped; none of the protocol headers can contain them.
fn response_headers(headers: &HeaderMap) -> ResponseHeaders {
    headers
        .iter()
        .filter_map(|(name, value)| Some((name.as_str(), value.to_str().ok()?)))
        .collect()
}

/// Records the outcome of a request on a tracing span, including status and errors.
#[cfg(feature = "telemetry")]
fn record_result_on_span<R, E: Display>(result: &Result<R, E>) {
    let span = Span::current();
    match result {
        Ok(_) => {
            span.record("otel.status_code", "OK");
        }
        Err(err) => {
            span.record("otel.status_code", "ERROR");
            span.record("error.message", tracing::field::display(err));
            tracing::event!(tracing::Level::ERROR, error = %err, "Request to payment server failed");
        }
    }
}

/// Noop if telemetry feature is off.
#[cfg(not(feature = "telemetry"))]
fn record_result_on_span<R, E: Display>(_result: &Result<R, E>) {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{CONTENT_TYPE_PAYMENT, CONTEXT_PAYMENT};
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn partner_transport() -> HttpTransport {
        HttpTransport::new(ClientOptions::new().with_header(
            HeaderName::from_static("x-partner"),
            HeaderValue::from_static("acme"),
        ))
        .unwrap()
    }

    fn url(server: &MockServer, p: &str) -> Url {
        format!("{}{p}", server.uri()).parse().unwrap()
    }

    #[tokio::test]
    async fn test_fetch_sends_accept_and_partner_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/i/abc"))
            .and(header("accept", ACCEPT_PAYMENT_REQUEST))
            .and(header("x-partner", "acme"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("Digest", "SHA-256=00")
                    .set_body_string("{\"a\": 1}"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let raw = partner_transport()
            .fetch_payment_request(&url(&server, "/i/abc"), &RequestOptions::new())
            .await
            .unwrap();

        assert_eq!(raw.body, b"{\"a\": 1}");
        assert_eq!(raw.headers.get("digest"), Some("SHA-256=00"));
        assert_eq!(raw.request_url, url(&server, "/i/abc"));
    }

    #[tokio::test]
    async fn test_fetch_keeps_body_bytes_verbatim() {
        let server = MockServer::start().await;
        let body = "{\n  \"network\" : \"test\"\n}\r\n";
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;

        let raw = partner_transport()
            .fetch_payment_request(&url(&server, "/i/x"), &RequestOptions::new())
            .await
            .unwrap();
        assert_eq!(raw.body, body.as_bytes());
    }

    #[tokio::test]
    async fn test_fetch_non_200_surfaces_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_string("Invoice not found"))
            .mount(&server)
            .await;

        let err = partner_transport()
            .fetch_payment_request(&url(&server, "/i/missing"), &RequestOptions::new())
            .await
            .unwrap_err();
        match err {
            ClientError::UnexpectedStatus {
                context,
                status,
                body,
            } => {
                assert_eq!(context, CONTEXT_FETCH);
                assert_eq!(status, StatusCode::NOT_FOUND);
                assert_eq!(body, "Invoice not found");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_fetch_connection_failure_is_retryable() {
        let server = MockServer::start().await;
        let target = url(&server, "/i/abc");
        drop(server);

        let err = partner_transport()
            .fetch_payment_request(&target, &RequestOptions::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Transport { .. }));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_submit_sets_content_type_and_body() {
        let server = MockServer::start().await;
        let payload = json!({"currency": "BTC", "transactions": ["0100"]});
        Mock::given(method("POST"))
            .and(path("/p"))
            .and(header("content-type", CONTENT_TYPE_PAYMENT))
            .and(header("x-partner", "acme"))
            .and(body_json(&payload))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"memo": "Thanks"})))
            .expect(1)
            .mount(&server)
            .await;

        let response = partner_transport()
            .submit_payload(
                &url(&server, "/p"),
                HeaderValue::from_static(CONTENT_TYPE_PAYMENT),
                CONTEXT_PAYMENT,
                &payload,
                &RequestOptions::new(),
            )
            .await
            .unwrap();
        assert_eq!(response.memo.as_deref(), Some("Thanks"));
    }

    #[tokio::test]
    async fn test_submit_non_json_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
            .mount(&server)
            .await;

        let err = partner_transport()
            .submit_payload(
                &url(&server, "/p"),
                HeaderValue::from_static(CONTENT_TYPE_PAYMENT),
                CONTEXT_PAYMENT,
                &json!({}),
                &RequestOptions::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ClientError::MalformedResponse {
                context: CONTEXT_PAYMENT,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_request_options_override_partner_header() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header("x-partner", "other"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
            .expect(1)
            .mount(&server)
            .await;

        let request = RequestOptions::new().with_header(
            HeaderName::from_static("x-partner"),
            HeaderValue::from_static("other"),
        );
        partner_transport()
            .fetch_payment_request(&url(&server, "/i/abc"), &request)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_configured_accept_header_is_replaced() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header("accept", ACCEPT_PAYMENT_REQUEST))
            .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
            .expect(1)
            .mount(&server)
            .await;

        let transport = HttpTransport::new(ClientOptions::new().with_header(
            ACCEPT,
            HeaderValue::from_static("text/html"),
        ))
        .unwrap();
        transport
            .fetch_payment_request(&url(&server, "/i/abc"), &RequestOptions::new())
            .await
            .unwrap();
    }
}
