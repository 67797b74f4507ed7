//! Interfaces to the wallet that funds, signs and broadcasts payments.
//!
//! The protocol code never touches keys, UTXOs or peers. Callers plug a
//! wallet in through these traits, which return boxed futures so they stay
//! object-safe and can be held as `Arc<dyn ...>`.

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;

use rust_decimal::Decimal;

use crate::fee::FeeRate;
use crate::payment::{HexTransaction, SignedTransaction};

/// A boxed, `Send` future borrowing from `'a`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Error type returned by wallet collaborators.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Builds a funded, unsigned transaction paying a request's outputs.
pub trait TransactionBuilder: Send + Sync {
    /// Builds a transaction paying `outputs` (address to coin amount) at no
    /// less than `fee_rate`.
    fn build<'a>(
        &'a self,
        outputs: &'a BTreeMap<String, Decimal>,
        fee_rate: FeeRate,
    ) -> BoxFuture<'a, Result<HexTransaction, BoxError>>;
}

/// Signs a transaction produced by a [`TransactionBuilder`].
pub trait TransactionSigner: Send + Sync {
    /// Signs `unsigned`, returning the signed transaction and its weighted size.
    fn sign<'a>(
        &'a self,
        unsigned: &'a HexTransaction,
    ) -> BoxFuture<'a, Result<SignedTransaction, BoxError>>;
}

/// Relays a signed transaction to the peer-to-peer network.
pub trait TransactionBroadcaster: Send + Sync {
    /// Broadcasts `tx`, returning its transaction id.
    fn broadcast<'a>(&'a self, tx: &'a HexTransaction) -> BoxFuture<'a, Result<String, BoxError>>;
}

impl<T: TransactionBroadcaster + ?Sized> TransactionBroadcaster for std::sync::Arc<T> {
    fn broadcast<'a>(&'a self, tx: &'a HexTransaction) -> BoxFuture<'a, Result<String, BoxError>> {
        (**self).broadcast(tx)
    }
}
