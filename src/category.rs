//! This file defines the `Category` type, the types needed to create a
//! category, and the API routes for categories.
//!
//! A category is a typed bucket (income or expense) that every transaction
//! and budget references. A category may be scoped to a single user or
//! shared (NULL user).

use std::{fmt::Display, str::FromStr};

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
    db::{CreateTable, DatabaseId, MapRow},
    user::UserId,
};

/// Whether a category collects income or expenses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CategoryType {
    /// Money coming in, e.g. wages.
    Income,
    /// Money going out, e.g. groceries.
    Expense,
}

impl Display for CategoryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CategoryType::Income => write!(f, "Income"),
            CategoryType::Expense => write!(f, "Expense"),
        }
    }
}

impl FromStr for CategoryType {
    type Err = Error;

    fn from_str(string: &str) -> Result<Self, Self::Err> {
        match string {
            "Income" => Ok(CategoryType::Income),
            "Expense" => Ok(CategoryType::Expense),
            other => Err(Error::Validation(format!(
                "invalid category type \"{other}\", expected \"Income\" or \"Expense\""
            ))),
        }
    }
}

impl rusqlite::ToSql for CategoryType {
    fn to_sql(&self) -> rusqlite::Result<rusqlite::types::ToSqlOutput<'_>> {
        Ok(self.to_string().into())
    }
}

impl rusqlite::types::FromSql for CategoryType {
    fn column_result(
        value: rusqlite::types::ValueRef<'_>,
    ) -> rusqlite::types::FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|_| rusqlite::types::FromSqlError::InvalidType)
    }
}

/// A category for expenses and income, e.g. 'Groceries', 'Eating Out', 'Wages'.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    /// The ID of the category.
    pub id: DatabaseId,
    /// The name of the category.
    pub name: String,
    /// Whether the category collects income or expenses.
    pub category_type: CategoryType,
    /// The user the category belongs to, or `None` for a shared category.
    pub user_id: Option<UserId>,
}

impl CreateTable for Category {
    fn create_table(connection: &Connection) -> Result<(), rusqlite::Error> {
        connection.execute(
            "CREATE TABLE IF NOT EXISTS category (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                category_type TEXT NOT NULL CHECK (category_type IN ('Income', 'Expense')),
                user_id INTEGER,
                FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE,
                UNIQUE (name, user_id)
                )",
            (),
        )?;

        Ok(())
    }
}

impl MapRow for Category {
    type ReturnType = Self;

    fn map_row_with_offset(row: &Row, offset: usize) -> Result<Self::ReturnType, rusqlite::Error> {
        Ok(Self {
            id: row.get(offset)?,
            name: row.get(offset + 1)?,
            category_type: row.get(offset + 2)?,
            user_id: row.get(offset + 3)?,
        })
    }
}

/// The data needed to create a new category.
#[derive(Debug, Deserialize)]
pub struct NewCategory {
    /// The name of the category.
    pub name: String,
    /// Whether the category collects income or expenses.
    pub category_type: CategoryType,
    /// The user the category belongs to, or `None` for a shared category.
    #[serde(default)]
    pub user_id: Option<UserId>,
}

/// Create a new category.
///
/// # Errors
/// This function will return a:
/// - [Error::Validation] if `name` is empty,
/// - [Error::DuplicateCategory] if the name is already taken for the user,
/// - [Error::InvalidReference] if `user_id` does not refer to a valid user,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_category(new_category: NewCategory, connection: &Connection) -> Result<Category, Error> {
    if new_category.name.trim().is_empty() {
        return Err(Error::Validation(
            "category name cannot be empty".to_string(),
        ));
    }

    let category = connection
        .prepare(
            "INSERT INTO category (name, category_type, user_id) VALUES (?1, ?2, ?3)
             RETURNING id, name, category_type, user_id",
        )?
        .query_row(
            (
                &new_category.name,
                new_category.category_type,
                new_category.user_id,
            ),
            Category::map_row,
        )?;

    Ok(category)
}

/// Retrieve all categories.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is a SQL error.
pub fn get_categories(connection: &Connection) -> Result<Vec<Category>, Error> {
    connection
        .prepare("SELECT id, name, category_type, user_id FROM category ORDER BY name")?
        .query_map([], Category::map_row)?
        .map(|maybe_category| maybe_category.map_err(Error::SqlError))
        .collect()
}

/// Retrieve all categories with the given `category_type`.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is a SQL error.
pub fn get_categories_by_type(
    category_type: CategoryType,
    connection: &Connection,
) -> Result<Vec<Category>, Error> {
    connection
        .prepare(
            "SELECT id, name, category_type, user_id FROM category
             WHERE category_type = :category_type
             ORDER BY name",
        )?
        .query_map(&[(":category_type", &category_type)], Category::map_row)?
        .map(|maybe_category| maybe_category.map_err(Error::SqlError))
        .collect()
}

/// A route handler for creating a new category.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn create_category_endpoint(
    State(state): State<AppState>,
    Json(new_category): Json<NewCategory>,
) -> Response {
    let connection = state.db_connection.lock().unwrap();

    match create_category(new_category, &connection) {
        Ok(category) => (StatusCode::CREATED, Json(category)).into_response(),
        Err(error) => error.into_response(),
    }
}

/// A route handler for listing all categories.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn get_categories_endpoint(State(state): State<AppState>) -> Response {
    let connection = state.db_connection.lock().unwrap();

    match get_categories(&connection) {
        Ok(categories) => Json(categories).into_response(),
        Err(error) => error.into_response(),
    }
}

/// A route handler for listing categories of a given type.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn get_categories_by_type_endpoint(
    State(state): State<AppState>,
    Path(category_type): Path<String>,
) -> Response {
    let category_type = match category_type.parse() {
        Ok(category_type) => category_type,
        Err(error) => return Error::into_response(error),
    };

    let connection = state.db_connection.lock().unwrap();

    match get_categories_by_type(category_type, &connection) {
        Ok(categories) => Json(categories).into_response(),
        Err(error) => error.into_response(),
    }
}
