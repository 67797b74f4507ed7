//! JSON Payment Protocol command-line client.
//!
//! # Usage
//!
//! ```bash
//! # Print the verified terms of a payment request
//! jpp inspect "bitcoin:?r=https://test.bitpay.com/i/7EmXxXQo3Yv8xW9vFPMBoe"
//!
//! # Pre-verify an unsigned transaction, then pay with the signed one
//! jpp verify-tx https://test.bitpay.com/i/7EmXxXQo3Yv8xW9vFPMBoe --tx 0100... --weighted-size 226
//! jpp pay https://test.bitpay.com/i/7EmXxXQo3Yv8xW9vFPMBoe --tx 0100...
//! ```
//!
//! # Environment Variables
//!
//! - `JPP_CONFIG` - Path to TOML configuration file (default: `jpp.toml`)
//! - `JPP_NETWORK` / `JPP_CURRENCY` - Override the expected network and currency
//! - `RUST_LOG` - Log level filter (default: `info`)
//!
//! A `.env` file in the working directory is loaded first.

mod cli;
mod config;

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use clap::Parser;
use jpp_http::{PaymentProtocolClient, VerifiedPaymentRequest};
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command};
use crate::config::CliConfig;

#[tokio::main]
async fn main() {
    // A missing .env file is not an error.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = run(Cli::parse()).await {
        tracing::error!("jpp failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = CliConfig::load_from(&cli.config)?;
    if let Some(network) = cli.network {
        config.network = network;
    }
    if let Some(currency) = cli.currency {
        config.currency = currency;
    }
    tracing::info!(
        config = %cli.config.display(),
        network = %config.network,
        currency = %config.currency,
        trusted_keys = config.trusted_keys.len(),
        "Loaded configuration"
    );

    if config.trusted_keys.is_empty() {
        tracing::warn!("No trusted keys configured; no payment request will verify");
    }

    let options = config.client_options()?;
    let trusted_keys = Arc::new(std::mem::take(&mut config.trusted_keys));
    let client = PaymentProtocolClient::new(options, trusted_keys)?;

    match cli.command {
        Command::Inspect { uri } => {
            let verified = client.get_payment_request(&uri).await?;
            print_json(&summary(&verified)?)?;
        }
        Command::VerifyTx {
            uri,
            tx,
            weighted_size,
        } => {
            let verified = fetch_checked(&client, &config, &uri).await?;
            let request = &verified.request;
            let response = client
                .verify_unsigned_payment(&request.currency, &tx, weighted_size, &request.payment_url)
                .await?;
            print_json(&serde_json::to_value(response)?)?;
        }
        Command::Pay { uri, tx } => {
            let verified = fetch_checked(&client, &config, &uri).await?;
            let request = &verified.request;
            let response = client
                .send_payment(&request.currency, &tx, &request.payment_url)
                .await?;
            print_json(&serde_json::to_value(response)?)?;
        }
    }

    Ok(())
}

/// Fetches and verifies a request, then checks it matches the configured
/// network and currency and has not expired.
async fn fetch_checked(
    client: &PaymentProtocolClient,
    config: &CliConfig,
    uri: &str,
) -> Result<VerifiedPaymentRequest, Box<dyn std::error::Error>> {
    let verified = client.get_payment_request(uri).await?;
    PaymentProtocolClient::check_request_at(
        &verified.request,
        &config.network,
        &config.currency,
        Utc::now(),
    )?;
    tracing::info!(owner = %verified.owner, "Payment request verified");
    Ok(verified)
}

fn summary(
    verified: &VerifiedPaymentRequest,
) -> Result<serde_json::Value, Box<dyn std::error::Error>> {
    let request = &verified.request;
    let outputs: BTreeMap<String, String> = request
        .outputs_by_address()
        .into_iter()
        .map(|(address, amount)| (address, amount.to_string()))
        .collect();
    let fee_rate = request.fee_rate()?;

    Ok(serde_json::json!({
        "owner": verified.owner,
        "requestUrl": verified.request_url.as_str(),
        "network": request.network,
        "currency": request.currency,
        "outputs": outputs,
        "requiredFeeRate": fee_rate.map(|rate| rate.sat_per_byte_value().to_string()),
        "requiredFeePerKb": fee_rate.map(|rate| rate.btc_per_kvb().to_string()),
        "expires": request.expires.map(|expires| expires.to_rfc3339()),
        "memo": request.memo,
        "paymentUrl": request.payment_url,
    }))
}

#[allow(clippy::print_stdout)]
fn print_json(value: &serde_json::Value) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
