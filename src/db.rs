//! Traits and functions for setting up and reading from the application's
//! SQLite database.

use rusqlite::{Connection, Row};

/// An alias for the integer type used for row IDs.
pub type DatabaseId = i64;

/// A trait for adding a model's schema to the database.
pub trait CreateTable {
    /// Create the table(s) for the model.
    ///
    /// # Errors
    /// Returns an error if there is an SQL error.
    fn create_table(connection: &Connection) -> Result<(), rusqlite::Error>;
}

/// A trait for mapping a [rusqlite::Row] from the database to a concrete rust type.
pub trait MapRow {
    /// The type that the row is mapped to.
    type ReturnType;

    /// Convert a row into a concrete type.
    ///
    /// **Note:** This function expects that the row object contains all the
    /// table columns in the order they were defined.
    ///
    /// # Errors
    /// Returns an error if a row item cannot be converted into the
    /// corresponding rust type, or if an invalid column index was used.
    fn map_row(row: &Row) -> Result<Self::ReturnType, rusqlite::Error> {
        Self::map_row_with_offset(row, 0)
    }

    /// Convert a row into a concrete type, reading from column `offset` onwards.
    ///
    /// This is useful when tables have been joined and you want to construct
    /// two different types from the one query.
    ///
    /// # Errors
    /// Returns an error if a row item cannot be converted into the
    /// corresponding rust type, or if an invalid column index was used.
    fn map_row_with_offset(row: &Row, offset: usize) -> Result<Self::ReturnType, rusqlite::Error>;
}

/// Create the tables for all the application's models.
///
/// Foreign keys are switched on so that references from transactions to
/// categories and currencies, and from goals and budgets to users, are
/// enforced by the database.
///
/// # Errors
/// Returns an error if there was a problem creating the tables for the
/// application's models.
pub fn initialize(connection: &Connection) -> Result<(), rusqlite::Error> {
    use crate::{
        budget::Budget, category::Category, currency::CurrencyRate, savings::SavingsGoal,
        transaction::Transaction, user::User,
    };

    connection.pragma_update(None, "foreign_keys", "ON")?;

    User::create_table(connection)?;
    Category::create_table(connection)?;
    CurrencyRate::create_table(connection)?;
    Transaction::create_table(connection)?;
    SavingsGoal::create_table(connection)?;
    Budget::create_table(connection)?;

    Ok(())
}
