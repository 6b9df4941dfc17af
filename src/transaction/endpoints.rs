//! Route handlers for the transaction API.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::{db::DatabaseId, state::AppState, user::UserId};

use super::{
    batch::{BatchRequest, insert_batch},
    core::{
        NewTransaction, UpdateTransaction, delete_transaction, get_transaction,
        record_transaction, update_transaction,
    },
    query::{TransactionFilter, get_user_transactions},
};

/// A route handler for recording a new transaction.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn create_transaction_endpoint(
    State(state): State<AppState>,
    Json(new_transaction): Json<NewTransaction>,
) -> Response {
    let connection = state.db_connection.lock().unwrap();

    match record_transaction(new_transaction, &connection) {
        Ok(transaction) => (StatusCode::CREATED, Json(transaction)).into_response(),
        Err(error) => error.into_response(),
    }
}

/// A route handler for recording a batch of transactions atomically.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn batch_transactions_endpoint(
    State(state): State<AppState>,
    Json(batch): Json<BatchRequest>,
) -> Response {
    let connection = state.db_connection.lock().unwrap();

    match insert_batch(batch, &connection) {
        Ok(transactions) => (StatusCode::CREATED, Json(transactions)).into_response(),
        Err(error) => error.into_response(),
    }
}

/// A route handler for getting a single transaction by its ID.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn get_transaction_endpoint(
    State(state): State<AppState>,
    Path(transaction_id): Path<DatabaseId>,
) -> Response {
    let connection = state.db_connection.lock().unwrap();

    match get_transaction(transaction_id, &connection) {
        Ok(transaction) => Json(transaction).into_response(),
        Err(error) => error.into_response(),
    }
}

/// A route handler for listing a user's transactions, most recent first.
///
/// Filters (date range, category, type, currency, pagination) come from the
/// query string.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn get_user_transactions_endpoint(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
    Query(filter): Query<TransactionFilter>,
) -> Response {
    let connection = state.db_connection.lock().unwrap();

    match get_user_transactions(user_id, filter, &connection) {
        Ok(transactions) => Json(transactions).into_response(),
        Err(error) => error.into_response(),
    }
}

/// A route handler for updating a transaction.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn update_transaction_endpoint(
    State(state): State<AppState>,
    Path(transaction_id): Path<DatabaseId>,
    Json(update): Json<UpdateTransaction>,
) -> Response {
    let connection = state.db_connection.lock().unwrap();

    match update_transaction(transaction_id, update, &connection) {
        Ok(transaction) => Json(transaction).into_response(),
        Err(error) => error.into_response(),
    }
}

/// A route handler for deleting a transaction.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn delete_transaction_endpoint(
    State(state): State<AppState>,
    Path(transaction_id): Path<DatabaseId>,
) -> Response {
    let connection = state.db_connection.lock().unwrap();

    match delete_transaction(transaction_id, &connection) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => error.into_response(),
    }
}
