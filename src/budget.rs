//! Per-category spending budgets.
//!
//! A user can set at most one budget per category. Budgets can be defined
//! on daily, weekly, monthly, or yearly periods; the budget-status report
//! normalizes all of them to a monthly limit.

use std::{fmt::Display, str::FromStr};

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    Error,
    db::{CreateTable, DatabaseId, MapRow},
    state::AppState,
    user::UserId,
};

/// How often a budget's amount renews.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BudgetPeriod {
    /// The amount is available each day.
    Daily,
    /// The amount is available each week.
    Weekly,
    /// The amount is available each calendar month.
    Monthly,
    /// The amount is available each calendar year.
    Yearly,
}

impl BudgetPeriod {
    /// Normalize `amount` for this period into a limit for the month
    /// containing `month`.
    ///
    /// Daily budgets scale by the number of days in the month, weekly
    /// budgets by days divided by seven, and yearly budgets give one
    /// twelfth per month.
    pub fn monthly_limit(&self, amount: f64, month: Date) -> f64 {
        let days_in_month = f64::from(month.month().length(month.year()));

        match self {
            BudgetPeriod::Daily => amount * days_in_month,
            BudgetPeriod::Weekly => amount * days_in_month / 7.0,
            BudgetPeriod::Monthly => amount,
            BudgetPeriod::Yearly => amount / 12.0,
        }
    }
}

impl Display for BudgetPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BudgetPeriod::Daily => write!(f, "Daily"),
            BudgetPeriod::Weekly => write!(f, "Weekly"),
            BudgetPeriod::Monthly => write!(f, "Monthly"),
            BudgetPeriod::Yearly => write!(f, "Yearly"),
        }
    }
}

impl FromStr for BudgetPeriod {
    type Err = Error;

    fn from_str(string: &str) -> Result<Self, Self::Err> {
        match string {
            "Daily" => Ok(BudgetPeriod::Daily),
            "Weekly" => Ok(BudgetPeriod::Weekly),
            "Monthly" => Ok(BudgetPeriod::Monthly),
            "Yearly" => Ok(BudgetPeriod::Yearly),
            other => Err(Error::Validation(format!(
                "invalid budget period \"{other}\""
            ))),
        }
    }
}

impl rusqlite::ToSql for BudgetPeriod {
    fn to_sql(&self) -> rusqlite::Result<rusqlite::types::ToSqlOutput<'_>> {
        Ok(self.to_string().into())
    }
}

impl rusqlite::types::FromSql for BudgetPeriod {
    fn column_result(
        value: rusqlite::types::ValueRef<'_>,
    ) -> rusqlite::types::FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|_| rusqlite::types::FromSqlError::InvalidType)
    }
}

/// A spending limit for one of a user's categories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    /// The ID of the budget.
    pub id: DatabaseId,
    /// The user the budget belongs to.
    pub user_id: UserId,
    /// The category the budget limits.
    pub category_id: DatabaseId,
    /// The amount available per `period`, in the user's base currency.
    pub amount: f64,
    /// How often the amount renews.
    pub period: BudgetPeriod,
    /// When the budget takes effect.
    pub start_date: Date,
}

impl CreateTable for Budget {
    fn create_table(connection: &Connection) -> Result<(), rusqlite::Error> {
        connection.execute(
            "CREATE TABLE IF NOT EXISTS budget (
                id INTEGER PRIMARY KEY,
                user_id INTEGER NOT NULL,
                category_id INTEGER NOT NULL,
                amount REAL NOT NULL CHECK (amount > 0),
                period TEXT NOT NULL
                    CHECK (period IN ('Daily', 'Weekly', 'Monthly', 'Yearly')),
                start_date TEXT NOT NULL,
                UNIQUE(user_id, category_id),
                FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE,
                FOREIGN KEY(category_id) REFERENCES category(id)
                    ON UPDATE CASCADE ON DELETE CASCADE
                )",
            (),
        )?;

        Ok(())
    }
}

impl MapRow for Budget {
    type ReturnType = Self;

    fn map_row_with_offset(row: &Row, offset: usize) -> Result<Self::ReturnType, rusqlite::Error> {
        Ok(Self {
            id: row.get(offset)?,
            user_id: row.get(offset + 1)?,
            category_id: row.get(offset + 2)?,
            amount: row.get(offset + 3)?,
            period: row.get(offset + 4)?,
            start_date: row.get(offset + 5)?,
        })
    }
}

/// The data needed to create a budget.
#[derive(Debug, Clone, Deserialize)]
pub struct NewBudget {
    /// The user the budget belongs to.
    pub user_id: UserId,
    /// The category the budget limits.
    pub category_id: DatabaseId,
    /// The amount available per `period`, in the user's base currency.
    pub amount: f64,
    /// How often the amount renews.
    pub period: BudgetPeriod,
    /// When the budget takes effect.
    pub start_date: Date,
}

/// Create a budget for a user and category.
///
/// # Errors
/// This function will return a:
/// - [Error::Validation] if `amount` is not a positive number,
/// - [Error::DuplicateBudget] if the user already has a budget for the
///   category,
/// - [Error::InvalidReference] if the user or category does not exist,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_budget(new_budget: NewBudget, connection: &Connection) -> Result<Budget, Error> {
    if !new_budget.amount.is_finite() || new_budget.amount <= 0.0 {
        return Err(Error::Validation(
            "budget amount must be a positive number".to_string(),
        ));
    }

    let budget = connection
        .prepare(
            "INSERT INTO budget (user_id, category_id, amount, period, start_date)
             VALUES (?1, ?2, ?3, ?4, ?5)
             RETURNING id, user_id, category_id, amount, period, start_date",
        )?
        .query_row(
            (
                new_budget.user_id,
                new_budget.category_id,
                new_budget.amount,
                new_budget.period,
                new_budget.start_date,
            ),
            Budget::map_row,
        )?;

    Ok(budget)
}

/// Retrieve all of a user's budgets.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is a SQL error.
pub fn get_user_budgets(user_id: UserId, connection: &Connection) -> Result<Vec<Budget>, Error> {
    connection
        .prepare(
            "SELECT id, user_id, category_id, amount, period, start_date FROM budget
             WHERE user_id = :user_id",
        )?
        .query_map(&[(":user_id", &user_id)], Budget::map_row)?
        .map(|maybe_budget| maybe_budget.map_err(Error::SqlError))
        .collect()
}

/// A route handler for creating a budget.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn create_budget_endpoint(
    State(state): State<AppState>,
    Json(new_budget): Json<NewBudget>,
) -> Response {
    let connection = state.db_connection.lock().unwrap();

    match create_budget(new_budget, &connection) {
        Ok(budget) => (StatusCode::CREATED, Json(budget)).into_response(),
        Err(error) => error.into_response(),
    }
}

/// A route handler for listing a user's budgets.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn get_user_budgets_endpoint(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
) -> Response {
    let connection = state.db_connection.lock().unwrap();

    match get_user_budgets(user_id, &connection) {
        Ok(budgets) => Json(budgets).into_response(),
        Err(error) => error.into_response(),
    }
}
