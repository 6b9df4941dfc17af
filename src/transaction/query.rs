//! Filtered listing of a user's transactions.

use rusqlite::{Connection, Row, params_from_iter, types::Value};
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    Error,
    db::{DatabaseId, MapRow},
    user::UserId,
};

use super::core::{TRANSACTION_COLUMNS, Transaction, TransactionType};

/// The default number of transactions returned by a listing query.
pub const DEFAULT_PAGE_SIZE: u32 = 50;

/// Optional filters for listing a user's transactions.
///
/// Unset fields do not constrain the query. Results are sorted by date
/// descending, then ID descending, so recent activity comes first and the
/// order is stable across updates.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionFilter {
    /// Only include transactions on or after this date.
    pub start_date: Option<Date>,
    /// Only include transactions on or before this date.
    pub end_date: Option<Date>,
    /// Only include transactions in this category.
    #[serde(alias = "category")]
    pub category_id: Option<DatabaseId>,
    /// Only include transactions of this type.
    pub transaction_type: Option<TransactionType>,
    /// Only include transactions denominated in this currency.
    #[serde(alias = "currency")]
    pub currency_code: Option<String>,
    /// The maximum number of transactions to return.
    pub limit: Option<u32>,
    /// The number of matching transactions to skip, for pagination.
    pub offset: Option<u32>,
}

/// A transaction joined with the name of its category, for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionWithCategory {
    /// The transaction itself.
    #[serde(flatten)]
    pub transaction: Transaction,
    /// The name of the transaction's category, if it has one.
    pub category_name: Option<String>,
}

impl TransactionWithCategory {
    fn map_row(row: &Row) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            transaction: Transaction::map_row(row)?,
            category_name: row.get(9)?,
        })
    }
}

/// List a user's transactions, most recent first, applying `filter`.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is a SQL error.
pub fn get_user_transactions(
    user_id: UserId,
    filter: TransactionFilter,
    connection: &Connection,
) -> Result<Vec<TransactionWithCategory>, Error> {
    let columns: String = TRANSACTION_COLUMNS
        .split(", ")
        .map(|column| format!("\"transaction\".{column}"))
        .collect::<Vec<_>>()
        .join(", ");
    let mut query_string_parts = vec![format!(
        "SELECT {columns}, category.name FROM \"transaction\" \
         LEFT JOIN category ON \"transaction\".category_id = category.id"
    )];
    let mut where_clause_parts = vec!["\"transaction\".user_id = ?1".to_string()];
    let mut query_parameters = vec![Value::Integer(user_id.as_i64())];

    if let Some(start_date) = filter.start_date {
        where_clause_parts.push(format!("date >= ?{}", query_parameters.len() + 1));
        query_parameters.push(Value::Text(start_date.to_string()));
    }

    if let Some(end_date) = filter.end_date {
        where_clause_parts.push(format!("date <= ?{}", query_parameters.len() + 1));
        query_parameters.push(Value::Text(end_date.to_string()));
    }

    if let Some(category_id) = filter.category_id {
        where_clause_parts.push(format!("category_id = ?{}", query_parameters.len() + 1));
        query_parameters.push(Value::Integer(category_id));
    }

    if let Some(transaction_type) = filter.transaction_type {
        where_clause_parts.push(format!(
            "transaction_type = ?{}",
            query_parameters.len() + 1
        ));
        query_parameters.push(Value::Text(transaction_type.to_string()));
    }

    if let Some(currency_code) = filter.currency_code {
        where_clause_parts.push(format!("currency_code = ?{}", query_parameters.len() + 1));
        query_parameters.push(Value::Text(currency_code));
    }

    query_string_parts.push(String::from("WHERE ") + &where_clause_parts.join(" AND "));
    query_string_parts.push("ORDER BY date DESC, \"transaction\".id DESC".to_string());

    let limit = filter.limit.unwrap_or(DEFAULT_PAGE_SIZE);
    let offset = filter.offset.unwrap_or(0);
    query_string_parts.push(format!("LIMIT {limit} OFFSET {offset}"));

    let query_string = query_string_parts.join(" ");
    let params = params_from_iter(query_parameters.iter());

    connection
        .prepare(&query_string)?
        .query_map(params, TransactionWithCategory::map_row)?
        .map(|maybe_transaction| maybe_transaction.map_err(Error::SqlError))
        .collect()
}
