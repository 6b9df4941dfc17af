//! Income/expense summary and per-category breakdown.
//!
//! All figures are converted into the user's base currency before being
//! summed, so totals over a multi-currency ledger are comparable.

use axum::{
    Json,
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use crate::{
    Error,
    category::CategoryType,
    currency::{RateTable, convert},
    db::DatabaseId,
    state::AppState,
    transaction::TransactionType,
    user::{UserId, get_user},
};

use super::period::{DateRange, SummaryPeriod};

/// The query parameters accepted by the summary report.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SummaryQuery {
    /// A named period relative to today.
    pub period: Option<SummaryPeriod>,
    /// The first date to include. Takes effect together with `end_date` and
    /// then overrides `period`.
    pub start_date: Option<Date>,
    /// The last date to include.
    pub end_date: Option<Date>,
}

/// Total income and expense over a date range, in the user's base currency.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    /// The sum of converted income amounts.
    pub total_income: f64,
    /// The sum of converted expense amounts.
    pub total_expense: f64,
    /// The currency every figure is denominated in.
    pub base_currency: String,
}

/// The converted total for one category over a date range.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryTotal {
    /// The ID of the category.
    pub category_id: DatabaseId,
    /// The name of the category.
    pub category_name: String,
    /// Whether the category tracks income or expenses.
    pub category_type: CategoryType,
    /// The converted sum of the category's transactions.
    pub total_amount: f64,
}

/// A summary with its per-category breakdown.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryReport {
    /// Total income and expense over the range.
    pub summary: Summary,
    /// One row per category with activity in the range, largest total first.
    pub categories: Vec<CategoryTotal>,
}

/// One ledger row with its amount converted into the user's base currency.
///
/// Transfer audit rows are excluded; they are not income or spending.
#[derive(Debug, Clone)]
pub(super) struct ConvertedRow {
    pub date: Date,
    pub amount: f64,
    pub transaction_type: TransactionType,
    pub category_id: Option<DatabaseId>,
    pub category_name: Option<String>,
    pub category_type: Option<CategoryType>,
}

/// Fetch a user's income and expense rows in `range`, converting each amount
/// into the user's base currency.
///
/// Returns the rows and the base currency they are denominated in.
pub(super) fn fetch_converted_rows(
    user_id: UserId,
    range: DateRange,
    connection: &Connection,
) -> Result<(Vec<ConvertedRow>, String), Error> {
    let base_currency = get_user(user_id, connection)?.base_currency;
    let rates = RateTable::load(connection)?;

    let rows: Vec<(Date, f64, String, TransactionType, Option<DatabaseId>, Option<String>, Option<CategoryType>)> =
        connection
            .prepare(
                "SELECT t.date, t.amount, t.currency_code, t.transaction_type,
                        c.id, c.name, c.category_type
                 FROM \"transaction\" t
                 LEFT JOIN category c ON t.category_id = c.id
                 WHERE t.user_id = ?1
                   AND t.date BETWEEN ?2 AND ?3
                   AND t.transaction_type IN ('Income', 'Expense')
                 ORDER BY t.date ASC, t.id ASC",
            )?
            .query_map((user_id, range.start, range.end), |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                    row.get(6)?,
                ))
            })?
            .collect::<Result<_, _>>()?;

    let mut converted = Vec::with_capacity(rows.len());
    for (date, amount, currency_code, transaction_type, category_id, category_name, category_type) in
        rows
    {
        converted.push(ConvertedRow {
            date,
            amount: convert(amount, &currency_code, &base_currency, &rates)?,
            transaction_type,
            category_id,
            category_name,
            category_type,
        });
    }

    Ok((converted, base_currency))
}

/// Build the summary and category breakdown for `user_id` over `range`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if the user does not exist,
/// - [Error::MissingExchangeRate] if any row's currency, or the user's base
///   currency, has no exchange rate,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn summarize(
    user_id: UserId,
    range: DateRange,
    connection: &Connection,
) -> Result<SummaryReport, Error> {
    let (rows, base_currency) = fetch_converted_rows(user_id, range, connection)?;

    Ok(SummaryReport {
        summary: totals(&rows, base_currency),
        categories: category_breakdown(&rows),
    })
}

pub(super) fn totals(rows: &[ConvertedRow], base_currency: String) -> Summary {
    let mut total_income = 0.0;
    let mut total_expense = 0.0;

    for row in rows {
        match row.transaction_type {
            TransactionType::Income => total_income += row.amount,
            TransactionType::Expense => total_expense += row.amount,
            TransactionType::Transfer => {}
        }
    }

    Summary {
        total_income,
        total_expense,
        base_currency,
    }
}

pub(super) fn category_breakdown(rows: &[ConvertedRow]) -> Vec<CategoryTotal> {
    let mut breakdown: Vec<CategoryTotal> = Vec::new();

    for row in rows {
        let (Some(category_id), Some(name), Some(category_type)) = (
            row.category_id,
            row.category_name.as_deref(),
            row.category_type,
        ) else {
            continue;
        };

        match breakdown
            .iter_mut()
            .find(|total| total.category_id == category_id)
        {
            Some(total) => total.total_amount += row.amount,
            None => breakdown.push(CategoryTotal {
                category_id,
                category_name: name.to_string(),
                category_type,
                total_amount: row.amount,
            }),
        }
    }

    // A stable sort keeps first-seen order for equal totals.
    breakdown.sort_by(|a, b| {
        b.total_amount
            .partial_cmp(&a.total_amount)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    breakdown
}

/// A route handler for the transaction summary report.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn transaction_summary_endpoint(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
    Query(query): Query<SummaryQuery>,
) -> Response {
    let connection = state.db_connection.lock().unwrap();
    let range = DateRange::resolve(
        query.period,
        query.start_date,
        query.end_date,
        OffsetDateTime::now_utc().date(),
    );

    match summarize(user_id, range, &connection) {
        Ok(report) => Json(report).into_response(),
        Err(error) => error.into_response(),
    }
}
