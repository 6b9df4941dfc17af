//! Spending analysis over an explicit date range: summary, category
//! breakdown, and a month-by-month trend.

use axum::{
    Json,
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{Error, state::AppState, transaction::TransactionType, user::UserId};

use super::{
    period::DateRange,
    summary::{CategoryTotal, ConvertedRow, Summary, category_breakdown, fetch_converted_rows,
        totals},
};

/// The query parameters for the spending analysis. Both dates are required.
#[derive(Debug, Clone, Deserialize)]
pub struct SpendingQuery {
    /// The first date to include.
    pub start_date: Option<Date>,
    /// The last date to include.
    pub end_date: Option<Date>,
}

/// Converted income, expense, and savings for one calendar month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyTrend {
    /// The month in `YYYY-MM` form.
    pub month: String,
    /// The sum of converted income amounts in the month.
    pub income: f64,
    /// The sum of converted expense amounts in the month.
    pub expense: f64,
    /// Income minus expense for the month.
    pub savings: f64,
}

/// The full spending analysis for a date range.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpendingReport {
    /// Total income and expense over the range.
    pub summary: Summary,
    /// One row per category with activity in the range, largest total first.
    pub category_breakdown: Vec<CategoryTotal>,
    /// One row per calendar month with activity, in chronological order.
    pub monthly_trend: Vec<MonthlyTrend>,
}

/// Build the spending analysis for `user_id` over `range`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if the user does not exist,
/// - [Error::MissingExchangeRate] if any row's currency, or the user's base
///   currency, has no exchange rate,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn analyze_spending(
    user_id: UserId,
    range: DateRange,
    connection: &Connection,
) -> Result<SpendingReport, Error> {
    let (rows, base_currency) = fetch_converted_rows(user_id, range, connection)?;

    Ok(SpendingReport {
        monthly_trend: monthly_trend(&rows),
        category_breakdown: category_breakdown(&rows),
        summary: totals(&rows, base_currency),
    })
}

fn monthly_trend(rows: &[ConvertedRow]) -> Vec<MonthlyTrend> {
    let mut trend: Vec<MonthlyTrend> = Vec::new();

    // Rows arrive in date order, so months appear chronologically.
    for row in rows {
        let month = format!("{:04}-{:02}", row.date.year(), u8::from(row.date.month()));

        let index = match trend.iter().position(|entry| entry.month == month) {
            Some(index) => index,
            None => {
                trend.push(MonthlyTrend {
                    month,
                    income: 0.0,
                    expense: 0.0,
                    savings: 0.0,
                });
                trend.len() - 1
            }
        };
        let entry = &mut trend[index];

        match row.transaction_type {
            TransactionType::Income => entry.income += row.amount,
            TransactionType::Expense => entry.expense += row.amount,
            TransactionType::Transfer => {}
        }
        entry.savings = entry.income - entry.expense;
    }

    trend
}

/// A route handler for the spending analysis report.
///
/// Both `start_date` and `end_date` are required query parameters.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn spending_analysis_endpoint(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
    Query(query): Query<SpendingQuery>,
) -> Response {
    let (Some(start_date), Some(end_date)) = (query.start_date, query.end_date) else {
        return Error::Validation("start date and end date are required".to_string())
            .into_response();
    };

    let connection = state.db_connection.lock().unwrap();
    let range = DateRange {
        start: start_date,
        end: end_date,
    };

    match analyze_spending(user_id, range, &connection) {
        Ok(report) => Json(report).into_response(),
        Err(error) => error.into_response(),
    }
}
