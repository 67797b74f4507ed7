//! HTTP constants of the JSON Payment Protocol.

/// `Accept` value sent when fetching a payment request.
pub const ACCEPT_PAYMENT_REQUEST: &str = "application/payment-request";

/// `Content-Type` of a final payment submission.
pub const CONTENT_TYPE_PAYMENT: &str = "application/payment";

/// `Content-Type` of an unsigned-transaction verification submission.
pub const CONTENT_TYPE_PAYMENT_VERIFICATION: &str = "application/payment-verification";

/// Maximum number of redirects followed by the transport.
pub const MAX_REDIRECTS: usize = 10;

/// Error context of the payment-request fetch.
pub const CONTEXT_FETCH: &str = "GET payment request";

/// Error context of the final payment submission.
pub const CONTEXT_PAYMENT: &str = "POST payment";

/// Error context of the verification submission.
pub const CONTEXT_VERIFICATION: &str = "POST payment verification";
