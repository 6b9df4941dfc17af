//! Advanced transaction search with union semantics.
//!
//! A transaction matches when any keyword is a substring of its description
//! OR its category is in the supplied set, with both sides narrowed by an
//! optional amount range. Each result is tagged with which side matched.

use axum::{
    Json,
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
};
use rusqlite::{Connection, Row, params_from_iter, types::Value};
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    db::{DatabaseId, MapRow},
    state::AppState,
    transaction::Transaction,
    user::UserId,
};

/// The most results a search will return.
pub const SEARCH_RESULT_LIMIT: u32 = 100;

/// The query parameters for the advanced search.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchQuery {
    /// Comma-separated keywords to look for in descriptions.
    pub keywords: Option<String>,
    /// Comma-separated category IDs to match.
    pub categories: Option<String>,
    /// Only include transactions of at least this amount.
    pub min_amount: Option<f64>,
    /// Only include transactions of at most this amount.
    pub max_amount: Option<f64>,
}

/// Which side of the search union a result matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    /// A keyword appeared in the description.
    DescriptionMatch,
    /// The category was in the supplied set.
    CategoryMatch,
    /// Both of the above.
    Both,
}

/// One search result: the transaction, its category name, and what matched.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    /// The matching transaction.
    #[serde(flatten)]
    pub transaction: Transaction,
    /// The name of the transaction's category, if it has one.
    pub category_name: Option<String>,
    /// Which search predicate the transaction satisfied.
    pub match_type: MatchType,
}

/// The parsed form of a [SearchQuery].
#[derive(Debug, Clone)]
pub struct SearchFilter {
    keywords: Vec<String>,
    category_ids: Vec<DatabaseId>,
    min_amount: Option<f64>,
    max_amount: Option<f64>,
}

impl TryFrom<SearchQuery> for SearchFilter {
    type Error = Error;

    /// Parse the comma-separated query parameters.
    ///
    /// # Errors
    /// Returns [Error::Validation] if neither keywords nor categories are
    /// supplied (an unconstrained search would return the user's entire
    /// history), or if a category ID is not an integer.
    fn try_from(query: SearchQuery) -> Result<Self, Self::Error> {
        let keywords: Vec<String> = query
            .keywords
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|keyword| !keyword.is_empty())
            .map(str::to_string)
            .collect();

        let category_ids = query
            .categories
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(|id| {
                id.parse::<DatabaseId>()
                    .map_err(|_| Error::Validation(format!("invalid category ID \"{id}\"")))
            })
            .collect::<Result<Vec<_>, _>>()?;

        if keywords.is_empty() && category_ids.is_empty() {
            return Err(Error::Validation(
                "at least one keyword or category is required".to_string(),
            ));
        }

        Ok(Self {
            keywords,
            category_ids,
            min_amount: query.min_amount,
            max_amount: query.max_amount,
        })
    }
}

/// Escape `%` and `_` so a keyword matches literally in a LIKE pattern.
fn escape_like(keyword: &str) -> String {
    keyword
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

impl SearchFilter {
    fn classify(&self, transaction: &Transaction) -> MatchType {
        let description = transaction.description.to_lowercase();
        let keyword_hit = self
            .keywords
            .iter()
            .any(|keyword| description.contains(&keyword.to_lowercase()));
        let category_hit = transaction
            .category_id
            .is_some_and(|category_id| self.category_ids.contains(&category_id));

        match (keyword_hit, category_hit) {
            (true, true) => MatchType::Both,
            (true, false) => MatchType::DescriptionMatch,
            // The query only returns rows matching at least one side.
            _ => MatchType::CategoryMatch,
        }
    }
}

/// Search a user's transactions, newest first, capped at
/// [SEARCH_RESULT_LIMIT] results.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is a SQL error.
pub fn search_transactions(
    user_id: UserId,
    filter: SearchFilter,
    connection: &Connection,
) -> Result<Vec<SearchResult>, Error> {
    let mut query_parameters = vec![Value::Integer(user_id.as_i64())];
    let mut union_parts: Vec<String> = Vec::new();

    if !filter.keywords.is_empty() {
        let like_clauses: Vec<String> = filter
            .keywords
            .iter()
            .map(|keyword| {
                query_parameters.push(Value::Text(format!("%{}%", escape_like(keyword))));
                format!("t.description LIKE ?{} ESCAPE '\\'", query_parameters.len())
            })
            .collect();
        union_parts.push(format!("({})", like_clauses.join(" OR ")));
    }

    if !filter.category_ids.is_empty() {
        let placeholders: Vec<String> = filter
            .category_ids
            .iter()
            .map(|category_id| {
                query_parameters.push(Value::Integer(*category_id));
                format!("?{}", query_parameters.len())
            })
            .collect();
        union_parts.push(format!("t.category_id IN ({})", placeholders.join(", ")));
    }

    let mut where_clause = format!(
        "t.user_id = ?1 AND ({})",
        union_parts.join(" OR ")
    );

    if let Some(min_amount) = filter.min_amount {
        query_parameters.push(Value::Real(min_amount));
        where_clause.push_str(&format!(" AND t.amount >= ?{}", query_parameters.len()));
    }

    if let Some(max_amount) = filter.max_amount {
        query_parameters.push(Value::Real(max_amount));
        where_clause.push_str(&format!(" AND t.amount <= ?{}", query_parameters.len()));
    }

    let query_string = format!(
        "SELECT t.id, t.user_id, t.category_id, t.amount, t.currency_code, t.date,
                t.transaction_type, t.description, t.payment_method, c.name
         FROM \"transaction\" t
         LEFT JOIN category c ON t.category_id = c.id
         WHERE {where_clause}
         ORDER BY t.date DESC, t.id DESC
         LIMIT {SEARCH_RESULT_LIMIT}"
    );

    let map_row = |row: &Row| {
        Ok((
            Transaction::map_row(row)?,
            row.get::<usize, Option<String>>(9)?,
        ))
    };

    connection
        .prepare(&query_string)?
        .query_map(params_from_iter(query_parameters.iter()), map_row)?
        .map(|maybe_row| {
            maybe_row
                .map(|(transaction, category_name)| {
                    let match_type = filter.classify(&transaction);
                    SearchResult {
                        transaction,
                        category_name,
                        match_type,
                    }
                })
                .map_err(Error::SqlError)
        })
        .collect()
}

/// A route handler for the advanced transaction search.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn advanced_search_endpoint(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
    Query(query): Query<SearchQuery>,
) -> Response {
    let filter = match SearchFilter::try_from(query) {
        Ok(filter) => filter,
        Err(error) => return error.into_response(),
    };

    let connection = state.db_connection.lock().unwrap();

    match search_transactions(user_id, filter, &connection) {
        Ok(results) => Json(results).into_response(),
        Err(error) => error.into_response(),
    }
}
