//! Savings goals and atomic transfers between them.

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

mod transfer;

pub use transfer::{TransferRequest, transfer_savings, transfer_savings_endpoint};

/// A pot of money a user is saving towards a target.
///
/// `current_savings` can never go negative; the schema enforces this with a
/// CHECK constraint as a backstop to the transfer logic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavingsGoal {
    /// The ID of the savings goal.
    pub id: DatabaseId,
    /// The user the goal belongs to.
    pub user_id: UserId,
    /// A short name for the goal, e.g. 'Emergency Fund'.
    pub name: String,
    /// The amount the user is aiming to save, in their base currency.
    pub target_amount: f64,
    /// The amount saved so far, in the user's base currency.
    pub current_savings: f64,
    /// When the user wants to reach the target, if they set one.
    pub deadline: Option<Date>,
}

impl CreateTable for SavingsGoal {
    fn create_table(connection: &Connection) -> Result<(), rusqlite::Error> {
        connection.execute(
            "CREATE TABLE IF NOT EXISTS savings_goal (
                id INTEGER PRIMARY KEY,
                user_id INTEGER NOT NULL,
                name TEXT NOT NULL,
                target_amount REAL NOT NULL CHECK (target_amount > 0),
                current_savings REAL NOT NULL DEFAULT 0 CHECK (current_savings >= 0),
                deadline TEXT,
                FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
                )",
            (),
        )?;

        Ok(())
    }
}

impl MapRow for SavingsGoal {
    type ReturnType = Self;

    fn map_row_with_offset(row: &Row, offset: usize) -> Result<Self::ReturnType, rusqlite::Error> {
        Ok(Self {
            id: row.get(offset)?,
            user_id: row.get(offset + 1)?,
            name: row.get(offset + 2)?,
            target_amount: row.get(offset + 3)?,
            current_savings: row.get(offset + 4)?,
            deadline: row.get(offset + 5)?,
        })
    }
}

const SAVINGS_GOAL_COLUMNS: &str =
    "id, user_id, name, target_amount, current_savings, deadline";

/// The data needed to create a savings goal.
#[derive(Debug, Clone, Deserialize)]
pub struct NewSavingsGoal {
    /// The user the goal belongs to.
    pub user_id: UserId,
    /// A short name for the goal.
    pub name: String,
    /// The amount the user is aiming to save.
    pub target_amount: f64,
    /// The amount already saved, if any.
    #[serde(default)]
    pub current_savings: f64,
    /// When the user wants to reach the target, if they set one.
    #[serde(default)]
    pub deadline: Option<Date>,
}

/// The fields of a savings goal that can be updated.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateSavingsGoal {
    /// A short name for the goal.
    pub name: String,
    /// The amount the user is aiming to save.
    pub target_amount: f64,
    /// When the user wants to reach the target, if they set one.
    #[serde(default)]
    pub deadline: Option<Date>,
}

/// Create a savings goal.
///
/// # Errors
/// This function will return a:
/// - [Error::Validation] if the name is empty, the target is not positive,
///   or the starting savings are negative,
/// - [Error::InvalidReference] if the user does not exist,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_savings_goal(
    new_goal: NewSavingsGoal,
    connection: &Connection,
) -> Result<SavingsGoal, Error> {
    if new_goal.name.trim().is_empty() {
        return Err(Error::Validation(
            "savings goal name must not be empty".to_string(),
        ));
    }

    if !new_goal.target_amount.is_finite() || new_goal.target_amount <= 0.0 {
        return Err(Error::Validation(
            "target amount must be a positive number".to_string(),
        ));
    }

    if !new_goal.current_savings.is_finite() || new_goal.current_savings < 0.0 {
        return Err(Error::Validation(
            "current savings must not be negative".to_string(),
        ));
    }

    let goal = connection
        .prepare(&format!(
            "INSERT INTO savings_goal (user_id, name, target_amount, current_savings, deadline)
             VALUES (?1, ?2, ?3, ?4, ?5)
             RETURNING {SAVINGS_GOAL_COLUMNS}"
        ))?
        .query_row(
            (
                new_goal.user_id,
                &new_goal.name,
                new_goal.target_amount,
                new_goal.current_savings,
                new_goal.deadline,
            ),
            SavingsGoal::map_row,
        )?;

    Ok(goal)
}

/// Retrieve a savings goal by its `id`.
///
/// # Errors
/// This function will return a [Error::NotFound] if `id` does not refer to a
/// valid savings goal, or a [Error::SqlError] if there is some other SQL
/// error.
pub fn get_savings_goal(id: DatabaseId, connection: &Connection) -> Result<SavingsGoal, Error> {
    let goal = connection
        .prepare(&format!(
            "SELECT {SAVINGS_GOAL_COLUMNS} FROM savings_goal WHERE id = :id"
        ))?
        .query_row(&[(":id", &id)], SavingsGoal::map_row)?;

    Ok(goal)
}

/// Retrieve all of a user's savings goals.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is a SQL error.
pub fn get_user_savings_goals(
    user_id: UserId,
    connection: &Connection,
) -> Result<Vec<SavingsGoal>, Error> {
    connection
        .prepare(&format!(
            "SELECT {SAVINGS_GOAL_COLUMNS} FROM savings_goal WHERE user_id = :user_id"
        ))?
        .query_map(&[(":user_id", &user_id)], SavingsGoal::map_row)?
        .map(|maybe_goal| maybe_goal.map_err(Error::SqlError))
        .collect()
}

/// Update a savings goal's name, target, or deadline.
///
/// The saved amount is not updatable here; it only moves through transfers.
///
/// # Errors
/// This function will return a:
/// - [Error::Validation] if the name is empty or the target is not positive,
/// - [Error::NotFound] if `id` does not refer to a valid savings goal,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn update_savings_goal(
    id: DatabaseId,
    update: UpdateSavingsGoal,
    connection: &Connection,
) -> Result<SavingsGoal, Error> {
    if update.name.trim().is_empty() {
        return Err(Error::Validation(
            "savings goal name must not be empty".to_string(),
        ));
    }

    if !update.target_amount.is_finite() || update.target_amount <= 0.0 {
        return Err(Error::Validation(
            "target amount must be a positive number".to_string(),
        ));
    }

    let goal = connection
        .prepare(&format!(
            "UPDATE savings_goal SET name = ?1, target_amount = ?2, deadline = ?3
             WHERE id = ?4
             RETURNING {SAVINGS_GOAL_COLUMNS}"
        ))?
        .query_row(
            (&update.name, update.target_amount, update.deadline, id),
            SavingsGoal::map_row,
        )?;

    Ok(goal)
}

/// A route handler for creating a savings goal.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn create_savings_goal_endpoint(
    State(state): State<AppState>,
    Json(new_goal): Json<NewSavingsGoal>,
) -> Response {
    let connection = state.db_connection.lock().unwrap();

    match create_savings_goal(new_goal, &connection) {
        Ok(goal) => (StatusCode::CREATED, Json(goal)).into_response(),
        Err(error) => error.into_response(),
    }
}

/// A route handler for getting a savings goal by its ID.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn get_savings_goal_endpoint(
    State(state): State<AppState>,
    Path(goal_id): Path<DatabaseId>,
) -> Response {
    let connection = state.db_connection.lock().unwrap();

    match get_savings_goal(goal_id, &connection) {
        Ok(goal) => Json(goal).into_response(),
        Err(error) => error.into_response(),
    }
}

/// A route handler for listing a user's savings goals.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn get_user_savings_goals_endpoint(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
) -> Response {
    let connection = state.db_connection.lock().unwrap();

    match get_user_savings_goals(user_id, &connection) {
        Ok(goals) => Json(goals).into_response(),
        Err(error) => error.into_response(),
    }
}

/// A route handler for updating a savings goal.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn update_savings_goal_endpoint(
    State(state): State<AppState>,
    Path(goal_id): Path<DatabaseId>,
    Json(update): Json<UpdateSavingsGoal>,
) -> Response {
    let connection = state.db_connection.lock().unwrap();

    match update_savings_goal(goal_id, update, &connection) {
        Ok(goal) => Json(goal).into_response(),
        Err(error) => error.into_response(),
    }
}

#[cfg(test)]
pub(crate) mod test_utils {
    use rusqlite::Connection;

    use crate::user::UserId;

    use super::{NewSavingsGoal, SavingsGoal, create_savings_goal};

    pub fn create_test_goal(
        user_id: UserId,
        name: &str,
        current_savings: f64,
        connection: &Connection,
    ) -> SavingsGoal {
        create_savings_goal(
            NewSavingsGoal {
                user_id,
                name: name.to_string(),
                target_amount: 10_000.0,
                current_savings,
                deadline: None,
            },
            connection,
        )
        .unwrap()
    }
}

#[cfg(test)]
mod savings_tests {
    use time::macros::date;

    use crate::{
        Error,
        transaction::test_utils::{create_test_user, get_test_connection},
    };

    use super::{
        NewSavingsGoal, UpdateSavingsGoal, create_savings_goal, get_savings_goal,
        get_user_savings_goals, test_utils::create_test_goal, update_savings_goal,
    };

    #[test]
    fn create_and_get_goal() {
        let connection = get_test_connection();
        let user = create_test_user("test@test.com", &connection);

        let goal = create_savings_goal(
            NewSavingsGoal {
                user_id: user.id,
                name: "Holiday".to_string(),
                target_amount: 2_500.0,
                current_savings: 100.0,
                deadline: Some(date!(2026 - 01 - 01)),
            },
            &connection,
        )
        .unwrap();

        assert_eq!(get_savings_goal(goal.id, &connection).unwrap(), goal);
    }

    #[test]
    fn listing_only_returns_the_given_users_goals() {
        let connection = get_test_connection();
        let alice = create_test_user("alice@test.com", &connection);
        let bob = create_test_user("bob@test.com", &connection);
        let alice_goal = create_test_goal(alice.id, "Emergency Fund", 0.0, &connection);
        create_test_goal(bob.id, "New Car", 0.0, &connection);

        let goals = get_user_savings_goals(alice.id, &connection).unwrap();

        assert_eq!(goals, vec![alice_goal]);
    }

    #[test]
    fn update_changes_name_but_not_savings() {
        let connection = get_test_connection();
        let user = create_test_user("test@test.com", &connection);
        let goal = create_test_goal(user.id, "Holiday", 300.0, &connection);

        let updated = update_savings_goal(
            goal.id,
            UpdateSavingsGoal {
                name: "Big Holiday".to_string(),
                target_amount: 5_000.0,
                deadline: None,
            },
            &connection,
        )
        .unwrap();

        assert_eq!(updated.name, "Big Holiday");
        assert_eq!(updated.target_amount, 5_000.0);
        assert_eq!(updated.current_savings, 300.0);
    }

    #[test]
    fn empty_name_is_rejected() {
        let connection = get_test_connection();
        let user = create_test_user("test@test.com", &connection);

        let result = create_savings_goal(
            NewSavingsGoal {
                user_id: user.id,
                name: "  ".to_string(),
                target_amount: 100.0,
                current_savings: 0.0,
                deadline: None,
            },
            &connection,
        );

        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[test]
    fn get_missing_goal_returns_not_found() {
        let connection = get_test_connection();

        assert_eq!(get_savings_goal(999, &connection), Err(Error::NotFound));
    }
}
