//! The user model: account creation, log in, and profile updates.
//!
//! A user owns every other row in the database except currency rates. The
//! `balance` column is denormalized: it always equals the signed sum of the
//! user's transactions and is maintained by the write path in
//! [crate::transaction::core], never recomputed from scratch.

use std::fmt::Display;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};

use crate::{
    AppState, Error,
    db::{CreateTable, MapRow},
    password::PasswordHash,
};

/// A newtype wrapper for integer user IDs.
///
/// This helps disambiguate user IDs from other types of IDs, leading to
/// better compile time errors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(i64);

impl UserId {
    /// Create a user ID from a raw integer.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// The raw integer value of the ID.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl rusqlite::ToSql for UserId {
    fn to_sql(&self) -> rusqlite::Result<rusqlite::types::ToSqlOutput<'_>> {
        Ok(self.0.into())
    }
}

impl rusqlite::types::FromSql for UserId {
    fn column_result(
        value: rusqlite::types::ValueRef<'_>,
    ) -> rusqlite::types::FromSqlResult<Self> {
        i64::column_result(value).map(UserId)
    }
}

/// A user's profile as exposed by the API.
///
/// The password hash deliberately lives outside this struct so that it can
/// never be serialized into a response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// The user's ID in the database.
    pub id: UserId,
    /// The user's display name.
    pub name: String,
    /// The user's email address, unique across the application.
    pub email: String,
    /// The ISO-4217 style code of the currency all aggregated figures are
    /// reported in.
    pub base_currency: String,
    /// The running signed sum of the user's transactions, in each
    /// transaction's native currency units.
    pub balance: f64,
}

impl CreateTable for User {
    fn create_table(connection: &Connection) -> Result<(), rusqlite::Error> {
        connection.execute(
            "CREATE TABLE IF NOT EXISTS user (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                email TEXT NOT NULL UNIQUE,
                password TEXT NOT NULL,
                base_currency TEXT NOT NULL DEFAULT 'USD',
                balance REAL NOT NULL DEFAULT 0
                )",
            (),
        )?;

        Ok(())
    }
}

impl MapRow for User {
    type ReturnType = Self;

    fn map_row_with_offset(row: &Row, offset: usize) -> Result<Self::ReturnType, rusqlite::Error> {
        Ok(Self {
            id: row.get(offset)?,
            name: row.get(offset + 1)?,
            email: row.get(offset + 2)?,
            base_currency: row.get(offset + 3)?,
            balance: row.get(offset + 4)?,
        })
    }
}

/// The data needed to create a new user.
#[derive(Debug, Deserialize)]
pub struct NewUser {
    /// The user's display name.
    pub name: String,
    /// The user's email address.
    pub email: String,
    /// The user's plain-text password, hashed before it is stored.
    pub password: String,
    /// The currency to report aggregates in. Defaults to USD.
    #[serde(default)]
    pub base_currency: Option<String>,
}

/// The fields of a user's profile that can be updated.
#[derive(Debug, Deserialize)]
pub struct UpdateUser {
    /// The user's display name.
    pub name: String,
    /// The user's email address.
    pub email: String,
    /// The currency to report aggregates in.
    pub base_currency: String,
}

/// Create a new user with a hashed password.
///
/// # Errors
/// This function will return a:
/// - [Error::DuplicateEmail] if the email is already registered,
/// - [Error::HashingError] if the password could not be hashed,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_user(new_user: NewUser, connection: &Connection) -> Result<User, Error> {
    let password_hash = PasswordHash::new(&new_user.password, PasswordHash::DEFAULT_COST)?;
    let base_currency = new_user.base_currency.unwrap_or_else(|| "USD".to_string());

    let user = connection
        .prepare(
            "INSERT INTO user (name, email, password, base_currency)
             VALUES (?1, ?2, ?3, ?4)
             RETURNING id, name, email, base_currency, balance",
        )?
        .query_row(
            (
                &new_user.name,
                &new_user.email,
                password_hash.to_string(),
                &base_currency,
            ),
            User::map_row,
        )?;

    Ok(user)
}

/// Retrieve a user's profile by their `id`.
///
/// # Errors
/// This function will return a [Error::NotFound] if `id` does not refer to a
/// valid user, or a [Error::SqlError] if there is some other SQL error.
pub fn get_user(id: UserId, connection: &Connection) -> Result<User, Error> {
    let user = connection
        .prepare("SELECT id, name, email, base_currency, balance FROM user WHERE id = :id")?
        .query_row(&[(":id", &id)], User::map_row)?;

    Ok(user)
}

/// Verify `password` against the stored hash for `email`, returning the
/// profile on success.
///
/// # Errors
/// This function will return a [Error::InvalidCredentials] if either the
/// email is unknown or the password does not match, without revealing which.
pub fn verify_credentials(
    email: &str,
    password: &str,
    connection: &Connection,
) -> Result<User, Error> {
    let (user, password_hash) = connection
        .prepare(
            "SELECT id, name, email, base_currency, balance, password FROM user
             WHERE email = :email",
        )?
        .query_row(&[(":email", &email)], |row| {
            let user = User::map_row(row)?;
            let raw_hash: String = row.get(5)?;

            Ok((user, PasswordHash::new_unchecked(&raw_hash)))
        })
        .map_err(|error| match error {
            rusqlite::Error::QueryReturnedNoRows => Error::InvalidCredentials,
            error => error.into(),
        })?;

    if password_hash.verify(password)? {
        Ok(user)
    } else {
        Err(Error::InvalidCredentials)
    }
}

/// Update the name, email, and base currency of the user with `id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a valid user,
/// - [Error::DuplicateEmail] if the new email belongs to another user,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn update_user(id: UserId, update: UpdateUser, connection: &Connection) -> Result<User, Error> {
    let user = connection
        .prepare(
            "UPDATE user SET name = ?1, email = ?2, base_currency = ?3 WHERE id = ?4
             RETURNING id, name, email, base_currency, balance",
        )?
        .query_row(
            (&update.name, &update.email, &update.base_currency, &id),
            User::map_row,
        )?;

    Ok(user)
}

/// The credentials for logging in a user.
#[derive(Debug, Deserialize)]
pub struct Credentials {
    /// The user's email address.
    pub email: String,
    /// The user's plain-text password.
    pub password: String,
}

/// A route handler for creating a new user.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn create_user_endpoint(
    State(state): State<AppState>,
    Json(new_user): Json<NewUser>,
) -> Response {
    let connection = state.db_connection.lock().unwrap();

    match create_user(new_user, &connection) {
        Ok(user) => (StatusCode::CREATED, Json(user)).into_response(),
        Err(error) => error.into_response(),
    }
}

/// A route handler for logging in a user.
///
/// Returns the profile without the password hash on success.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn log_in_endpoint(
    State(state): State<AppState>,
    Json(credentials): Json<Credentials>,
) -> Response {
    let connection = state.db_connection.lock().unwrap();

    match verify_credentials(&credentials.email, &credentials.password, &connection) {
        Ok(user) => Json(user).into_response(),
        Err(error) => error.into_response(),
    }
}

/// A route handler for getting a user's profile by their database ID.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn get_user_endpoint(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
) -> Response {
    let connection = state.db_connection.lock().unwrap();

    match get_user(user_id, &connection) {
        Ok(user) => Json(user).into_response(),
        Err(error) => error.into_response(),
    }
}

/// A route handler for updating a user's profile.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn update_user_endpoint(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
    Json(update): Json<UpdateUser>,
) -> Response {
    let connection = state.db_connection.lock().unwrap();

    match update_user(user_id, update, &connection) {
        Ok(user) => Json(user).into_response(),
        Err(error) => error.into_response(),
    }
}

#[cfg(test)]
mod user_tests {
    use rusqlite::Connection;

    use crate::{Error, db::initialize};

    use super::{NewUser, UpdateUser, UserId, create_user, get_user, update_user,
        verify_credentials};

    fn get_test_connection() -> Connection {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();
        connection
    }

    fn new_user(email: &str) -> NewUser {
        NewUser {
            name: "Test".to_string(),
            email: email.to_string(),
            password: "hunter2".to_string(),
            base_currency: None,
        }
    }

    #[test]
    fn create_user_defaults_to_usd() {
        let connection = get_test_connection();

        let user = create_user(new_user("test@test.com"), &connection).unwrap();

        assert_eq!(user.base_currency, "USD");
        assert_eq!(user.balance, 0.0);
    }

    #[test]
    fn create_user_rejects_duplicate_email() {
        let connection = get_test_connection();
        create_user(new_user("test@test.com"), &connection).unwrap();

        let result = create_user(new_user("test@test.com"), &connection);

        assert_eq!(result, Err(Error::DuplicateEmail));
    }

    #[test]
    fn verify_credentials_accepts_correct_password() {
        let connection = get_test_connection();
        let created = create_user(new_user("test@test.com"), &connection).unwrap();

        let user = verify_credentials("test@test.com", "hunter2", &connection).unwrap();

        assert_eq!(user, created);
    }

    #[test]
    fn verify_credentials_rejects_wrong_password() {
        let connection = get_test_connection();
        create_user(new_user("test@test.com"), &connection).unwrap();

        let result = verify_credentials("test@test.com", "hunter3", &connection);

        assert_eq!(result, Err(Error::InvalidCredentials));
    }

    #[test]
    fn verify_credentials_rejects_unknown_email() {
        let connection = get_test_connection();

        let result = verify_credentials("nobody@test.com", "hunter2", &connection);

        assert_eq!(result, Err(Error::InvalidCredentials));
    }

    #[test]
    fn get_user_returns_not_found_for_unknown_id() {
        let connection = get_test_connection();

        let result = get_user(UserId::new(999), &connection);

        assert_eq!(result, Err(Error::NotFound));
    }

    #[test]
    fn update_user_changes_profile() {
        let connection = get_test_connection();
        let user = create_user(new_user("test@test.com"), &connection).unwrap();

        let updated = update_user(
            user.id,
            UpdateUser {
                name: "Renamed".to_string(),
                email: "renamed@test.com".to_string(),
                base_currency: "EUR".to_string(),
            },
            &connection,
        )
        .unwrap();

        assert_eq!(updated.name, "Renamed");
        assert_eq!(updated.base_currency, "EUR");
        assert_eq!(get_user(user.id, &connection).unwrap(), updated);
    }
}
