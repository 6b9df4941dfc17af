//! Fintrack is a multi-currency personal-finance tracker.
//!
//! This library provides a JSON REST API over a SQLite ledger: users with a
//! base currency and a running balance, income/expense transactions,
//! currency-normalized aggregation, budget tracking, and atomic transfers
//! between savings goals.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use serde_json::json;
use tokio::signal;

pub mod analysis;
pub mod budget;
pub mod category;
pub mod currency;
pub mod db;
mod endpoints;
mod password;
mod routing;
pub mod savings;
mod state;
pub mod transaction;
pub mod user;

pub use db::initialize as initialize_db;
pub use routing::build_router;
pub use state::AppState;

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The client sent a request that is missing a required parameter or
    /// contains an invalid one. The message describes what to fix.
    #[error("{0}")]
    Validation(String),

    /// The email and password combination did not match a user.
    #[error("invalid email or password")]
    InvalidCredentials,

    /// The requested resource was not found.
    ///
    /// For HTTP request handlers, the client should check that the parameters
    /// (e.g., ID) are correct and that the resource has been created.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// The email used to create a user is already registered.
    #[error("the email is already in use")]
    DuplicateEmail,

    /// The category name already exists for the user.
    #[error("a category with this name already exists")]
    DuplicateCategory,

    /// The user already has a budget for the category.
    #[error("a budget for this category already exists")]
    DuplicateBudget,

    /// A foreign key in the request (category, currency or user ID) does not
    /// refer to an existing row.
    #[error("a referenced row does not exist")]
    InvalidReference,

    /// A savings transfer asked for more than the source goal holds.
    #[error("insufficient savings to complete the transfer")]
    InsufficientFunds,

    /// A currency-normalized figure was requested but the exchange rate for
    /// the named currency is not in the rate table.
    ///
    /// Conversions fail loudly rather than silently passing the unconverted
    /// amount through to financial aggregates.
    #[error("no exchange rate available for currency {0}")]
    MissingExchangeRate(String),

    /// An unexpected error occurred with the underlying hashing library.
    ///
    /// The error string should only be logged for debugging on the server.
    /// Clients only ever see a generic internal server error.
    #[error("hashing failed: {0}")]
    HashingError(String),

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            // Code 787 occurs when a FOREIGN KEY constraint failed.
            rusqlite::Error::SqliteFailure(sql_error, Some(_))
                if sql_error.extended_code == 787 =>
            {
                Error::InvalidReference
            }
            // Code 2067 occurs when a UNIQUE constraint failed.
            rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
                if sql_error.extended_code == 2067 && desc.contains("user.email") =>
            {
                Error::DuplicateEmail
            }
            rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
                if sql_error.extended_code == 2067 && desc.contains("category.") =>
            {
                Error::DuplicateCategory
            }
            rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
                if sql_error.extended_code == 2067 && desc.contains("budget.") =>
            {
                Error::DuplicateBudget
            }
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => Error::SqlError(error),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Error::Validation(message) => (StatusCode::BAD_REQUEST, message.clone()),
            Error::InvalidReference => (StatusCode::BAD_REQUEST, self.to_string()),
            Error::InvalidCredentials => (StatusCode::UNAUTHORIZED, self.to_string()),
            Error::NotFound => (StatusCode::NOT_FOUND, self.to_string()),
            Error::DuplicateEmail
            | Error::DuplicateCategory
            | Error::DuplicateBudget
            | Error::InsufficientFunds => (StatusCode::CONFLICT, self.to_string()),
            Error::MissingExchangeRate(_) => (StatusCode::UNPROCESSABLE_ENTITY, self.to_string()),
            // Internal errors are logged on the server but never detailed to
            // the client.
            error => {
                tracing::error!("An unexpected error occurred: {error}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
