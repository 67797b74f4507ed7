//! Settlement: payment submission and broadcast, side by side.
//!
//! A signed transaction is handed to the payment server and to the
//! peer-to-peer network at the same time. The two effects are independent,
//! so [`Settlement`] keeps both outcomes and one failing never hides the other.

use std::future::Future;

use futures_util::future::join;
use jpp::{BoxError, PaymentResponse};
#[cfg(feature = "telemetry")]
use tracing::{info, warn};

use crate::error::ClientError;

/// Outcome of submitting and broadcasting one signed transaction.
#[derive(Debug)]
pub struct Settlement {
    /// The payment server's answer.
    pub payment: Result<PaymentResponse, ClientError>,
    /// The broadcaster's answer: the transaction id on success.
    pub broadcast: Result<String, BoxError>,
}

impl Settlement {
    /// Returns `true` if the server accepted the payment and the broadcast
    /// succeeded.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.payment.is_ok() && self.broadcast.is_ok()
    }

    /// Returns the broadcast transaction id, if the broadcast succeeded.
    #[must_use]
    pub fn txid(&self) -> Option<&str> {
        self.broadcast.as_deref().ok()
    }
}

/// Drives a payment submission and a broadcast concurrently and waits for
/// both.
pub async fn settle_concurrently<P, B>(payment: P, broadcast: B) -> Settlement
where
    P: Future<Output = Result<PaymentResponse, ClientError>>,
    B: Future<Output = Result<String, BoxError>>,
{
    let (payment, broadcast) = join(payment, broadcast).await;

    #[cfg(feature = "telemetry")]
    {
        match &payment {
            Ok(_) => info!("Payment accepted by server"),
            Err(err) => warn!(error = %err, "Payment submission failed"),
        }
        match &broadcast {
            Ok(txid) => info!(txid = %txid, "Transaction broadcast"),
            Err(err) => warn!(error = %err, "Transaction broadcast failed"),
        }
    }

    Settlement { payment, broadcast }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn test_broadcast_failure_keeps_payment_result() {
        let settlement = settle_concurrently(
            async {
                Ok::<_, ClientError>(PaymentResponse {
                    memo: Some("Thanks".to_owned()),
                    ..PaymentResponse::default()
                })
            },
            async { Err::<String, BoxError>("peer unreachable".into()) },
        )
        .await;

        assert_eq!(
            settlement.payment.as_ref().unwrap().memo.as_deref(),
            Some("Thanks")
        );
        assert_eq!(
            settlement.broadcast.as_ref().unwrap_err().to_string(),
            "peer unreachable"
        );
        assert!(!settlement.is_complete());
        assert_eq!(settlement.txid(), None);
    }

    #[tokio::test]
    async fn test_payment_failure_keeps_broadcast_result() {
        let settlement = settle_concurrently(
            async {
                Err::<PaymentResponse, _>(ClientError::SubmissionRejected {
                    status: StatusCode::BAD_REQUEST,
                    reason: "Invoice expired".to_owned(),
                })
            },
            async { Ok::<_, BoxError>("ab".repeat(32)) },
        )
        .await;

        assert!(matches!(
            settlement.payment,
            Err(ClientError::SubmissionRejected { .. })
        ));
        assert_eq!(settlement.txid(), Some("ab".repeat(32).as_str()));
    }

    #[tokio::test]
    async fn test_both_sides_run_concurrently() {
        // The payment side only finishes once the broadcast side has started.
        let (started, wait_for_broadcast) = oneshot::channel::<()>();
        let settlement = settle_concurrently(
            async move {
                let _ = wait_for_broadcast.await;
                Ok::<_, ClientError>(PaymentResponse::default())
            },
            async move {
                let _ = started.send(());
                Ok::<_, BoxError>("txid".to_owned())
            },
        )
        .await;
        assert!(settlement.is_complete());
    }
}
