//! The currency-exchange reference table and its API routes.
//!
//! One row per supported currency code, holding the number of units of that
//! currency per one base unit (USD). Rows are written by the periodic
//! refresh job in [refresh] and by `PUT /api/currencies/{currency_code}`; every
//! conversion reads them through [RateTable].

use axum::{
    Json,
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
    AppState, Error,
    db::{CreateTable, MapRow},
};

mod convert;
pub mod refresh;

pub use convert::{RateTable, convert};

/// The exchange rate for one currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrencyRate {
    /// The ISO-4217 style three-letter code of the currency.
    pub currency_code: String,
    /// Units of this currency per one base unit (USD = 1.0).
    pub rate_to_base: f64,
    /// When the rate was last written.
    #[serde(with = "time::serde::rfc3339")]
    pub last_updated: OffsetDateTime,
}

impl CreateTable for CurrencyRate {
    fn create_table(connection: &Connection) -> Result<(), rusqlite::Error> {
        connection.execute(
            "CREATE TABLE IF NOT EXISTS currency_exchange (
                currency_code TEXT PRIMARY KEY,
                rate_to_base REAL NOT NULL,
                last_updated TEXT NOT NULL
                )",
            (),
        )?;

        // Starter currencies so a fresh database can convert immediately,
        // before the first provider refresh lands.
        let now = OffsetDateTime::now_utc();
        for (code, rate) in [
            ("USD", 1.0),
            ("EUR", 0.91),
            ("GBP", 0.78),
            ("JPY", 151.77),
            ("CNY", 7.23),
        ] {
            connection.execute(
                "INSERT OR IGNORE INTO currency_exchange (currency_code, rate_to_base, last_updated)
                 VALUES (?1, ?2, ?3)",
                (code, rate, now),
            )?;
        }

        Ok(())
    }
}

impl MapRow for CurrencyRate {
    type ReturnType = Self;

    fn map_row_with_offset(row: &Row, offset: usize) -> Result<Self::ReturnType, rusqlite::Error> {
        Ok(Self {
            currency_code: row.get(offset)?,
            rate_to_base: row.get(offset + 1)?,
            last_updated: row.get(offset + 2)?,
        })
    }
}

/// Retrieve all exchange rates.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is a SQL error.
pub fn get_rates(connection: &Connection) -> Result<Vec<CurrencyRate>, Error> {
    connection
        .prepare(
            "SELECT currency_code, rate_to_base, last_updated FROM currency_exchange
             ORDER BY currency_code",
        )?
        .query_map([], CurrencyRate::map_row)?
        .map(|maybe_rate| maybe_rate.map_err(Error::SqlError))
        .collect()
}

/// Retrieve the exchange rate for `currency_code`.
///
/// # Errors
/// This function will return a [Error::NotFound] if the currency is not in
/// the table, or a [Error::SqlError] if there is some other SQL error.
pub fn get_rate(currency_code: &str, connection: &Connection) -> Result<CurrencyRate, Error> {
    let rate = connection
        .prepare(
            "SELECT currency_code, rate_to_base, last_updated FROM currency_exchange
             WHERE currency_code = :code",
        )?
        .query_row(&[(":code", &currency_code)], CurrencyRate::map_row)?;

    Ok(rate)
}

/// Insert or update the rate for `currency_code`, refreshing its
/// `last_updated` timestamp.
///
/// # Errors
/// This function will return a [Error::Validation] if the rate is not a
/// positive number, or a [Error::SqlError] if there is a SQL error.
pub fn upsert_rate(
    currency_code: &str,
    rate_to_base: f64,
    connection: &Connection,
) -> Result<CurrencyRate, Error> {
    if !rate_to_base.is_finite() || rate_to_base <= 0.0 {
        return Err(Error::Validation(
            "exchange rate must be a positive number".to_string(),
        ));
    }

    let rate = connection
        .prepare(
            "INSERT INTO currency_exchange (currency_code, rate_to_base, last_updated)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(currency_code)
             DO UPDATE SET rate_to_base = excluded.rate_to_base,
                           last_updated = excluded.last_updated
             RETURNING currency_code, rate_to_base, last_updated",
        )?
        .query_row(
            (currency_code, rate_to_base, OffsetDateTime::now_utc()),
            CurrencyRate::map_row,
        )?;

    Ok(rate)
}

/// The body for updating a currency's exchange rate.
#[derive(Debug, Deserialize)]
pub struct UpdateRate {
    /// Units of the currency per one base unit.
    pub rate_to_base: f64,
}

/// A route handler for listing all exchange rates.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn get_rates_endpoint(State(state): State<AppState>) -> Response {
    let connection = state.db_connection.lock().unwrap();

    match get_rates(&connection) {
        Ok(rates) => Json(rates).into_response(),
        Err(error) => error.into_response(),
    }
}

/// A route handler for getting one currency's exchange rate.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn get_rate_endpoint(
    State(state): State<AppState>,
    Path(currency_code): Path<String>,
) -> Response {
    let connection = state.db_connection.lock().unwrap();

    match get_rate(&currency_code, &connection) {
        Ok(rate) => Json(rate).into_response(),
        Err(error) => error.into_response(),
    }
}

/// A route handler for setting one currency's exchange rate.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn update_rate_endpoint(
    State(state): State<AppState>,
    Path(currency_code): Path<String>,
    Json(update): Json<UpdateRate>,
) -> Response {
    let connection = state.db_connection.lock().unwrap();

    match upsert_rate(&currency_code, update.rate_to_base, &connection) {
        Ok(rate) => Json(rate).into_response(),
        Err(error) => error.into_response(),
    }
}
