//! Pure currency conversion through the base unit.

use std::collections::HashMap;

use rusqlite::Connection;

use crate::Error;

/// An in-memory snapshot of the exchange-rate table.
///
/// Maps currency code to the number of units of that currency per one base
/// unit. Dividing an amount by its currency's rate converts it into base
/// units; multiplying by the target's rate converts back out.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RateTable(HashMap<String, f64>);

impl RateTable {
    /// Load the current rate table from the database.
    ///
    /// # Errors
    /// This function will return a [Error::SqlError] if there is a SQL error.
    pub fn load(connection: &Connection) -> Result<Self, Error> {
        let rates = connection
            .prepare("SELECT currency_code, rate_to_base FROM currency_exchange")?
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<HashMap<String, f64>, rusqlite::Error>>()?;

        Ok(Self(rates))
    }

    /// Build a rate table from code/rate pairs. Intended for tests.
    pub fn from_rates<const N: usize>(rates: [(&str, f64); N]) -> Self {
        Self(
            rates
                .into_iter()
                .map(|(code, rate)| (code.to_string(), rate))
                .collect(),
        )
    }

    /// The rate for `currency_code`, if known.
    pub fn get(&self, currency_code: &str) -> Option<f64> {
        self.0.get(currency_code).copied()
    }

    /// The factor that converts an amount in `from` into `to`.
    ///
    /// # Errors
    /// This function will return a [Error::MissingExchangeRate] naming the
    /// first currency whose rate is absent from the table.
    pub fn factor(&self, from: &str, to: &str) -> Result<f64, Error> {
        if from == to {
            return Ok(1.0);
        }

        let from_rate = self
            .get(from)
            .ok_or_else(|| Error::MissingExchangeRate(from.to_string()))?;
        let to_rate = self
            .get(to)
            .ok_or_else(|| Error::MissingExchangeRate(to.to_string()))?;

        Ok(to_rate / from_rate)
    }
}

/// Convert `amount` from one currency to another via the base unit.
///
/// Converting a currency to itself is the identity and never consults the
/// rate table.
///
/// # Errors
/// This function will return a [Error::MissingExchangeRate] if either
/// currency's rate is absent. Missing rates fail loudly: silently passing the
/// unconverted amount through would corrupt every aggregate built on top.
pub fn convert(amount: f64, from: &str, to: &str, rates: &RateTable) -> Result<f64, Error> {
    Ok(amount * rates.factor(from, to)?)
}
