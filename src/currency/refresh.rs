//! The periodic exchange-rate refresh job.
//!
//! On a fixed interval the job fetches the latest rates from an external
//! provider and upserts them into the `currency_exchange` table row by row.
//! Readers may observe a table that is mid-refresh; each row is internally
//! consistent and rates move slowly enough for that to be acceptable.
//!
//! A failed fetch is logged and retried on the next tick. The job must never
//! take the process down.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use rusqlite::Connection;
use serde::Deserialize;

use crate::{Error, currency::upsert_rate};

/// The default provider, keyed to USD as the base unit.
pub const DEFAULT_PROVIDER_URL: &str =
    "https://api.exchangerate.host/latest?base=USD&symbols=USD,EUR,GBP,JPY,CNY";

/// The default time between refreshes.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// The shape of the provider's response.
#[derive(Debug, Deserialize)]
struct RateResponse {
    /// Currency code to units-per-base-unit.
    rates: HashMap<String, f64>,
}

/// Fetch the latest rates from `provider_url`.
///
/// # Errors
/// This function will return an error if the request failed, the provider
/// responded with an error status, or the body could not be decoded.
pub async fn fetch_rates(
    client: &reqwest::Client,
    provider_url: &str,
) -> Result<HashMap<String, f64>, reqwest::Error> {
    let response = client.get(provider_url).send().await?.error_for_status()?;
    let body: RateResponse = response.json().await?;

    Ok(body.rates)
}

/// Write `rates` into the exchange table, returning how many rows were
/// updated.
///
/// Rows are replaced one at a time, so a reader may see a mix of old and new
/// rates during the update. Non-positive rates from the provider are skipped
/// rather than stored.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is a SQL error.
pub fn apply_rates(rates: &HashMap<String, f64>, connection: &Connection) -> Result<usize, Error> {
    let mut updated = 0;

    for (currency_code, rate) in rates {
        match upsert_rate(currency_code, *rate, connection) {
            Ok(_) => updated += 1,
            Err(Error::Validation(_)) => {
                tracing::warn!("skipping invalid rate {rate} for {currency_code}");
            }
            Err(error) => return Err(error),
        }
    }

    Ok(updated)
}

/// Periodically refresh the exchange-rate table until the process exits.
///
/// Runs one refresh immediately, then one per `interval` tick. Every failure
/// path logs and waits for the next tick.
pub async fn refresh_rates_periodically(
    db_connection: Arc<Mutex<Connection>>,
    provider_url: String,
    interval: Duration,
) {
    let client = reqwest::Client::new();
    let mut ticker = tokio::time::interval(interval);

    loop {
        ticker.tick().await;

        let rates = match fetch_rates(&client, &provider_url).await {
            Ok(rates) => rates,
            Err(error) => {
                tracing::warn!("currency rate fetch failed, retrying next tick: {error}");
                continue;
            }
        };

        let result = {
            let connection = db_connection.lock().unwrap();
            apply_rates(&rates, &connection)
        };

        match result {
            Ok(updated) => tracing::info!("refreshed {updated} currency rates"),
            Err(error) => {
                tracing::warn!("failed to store currency rates, retrying next tick: {error}");
            }
        }
    }
}
