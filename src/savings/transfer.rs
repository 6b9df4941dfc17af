//! Atomic transfers between a user's savings goals.

use axum::{
    Json,
    extract::State,
    response::{IntoResponse, Response},
};
use rusqlite::{Connection, TransactionBehavior};
use serde::Deserialize;
use time::OffsetDateTime;

use crate::{
    Error,
    db::{DatabaseId, MapRow},
    state::AppState,
    user::UserId,
};

use super::SavingsGoal;

/// A request to move money from one savings goal to another.
#[derive(Debug, Clone, Deserialize)]
pub struct TransferRequest {
    /// The user who owns both goals.
    pub user_id: UserId,
    /// The goal to take the money from.
    pub from_goal_id: DatabaseId,
    /// The goal to put the money into.
    pub to_goal_id: DatabaseId,
    /// The amount to move, in the user's base currency.
    pub amount: f64,
}

/// Move money between two of a user's savings goals, atomically.
///
/// Debits the source goal, credits the destination goal, and appends a
/// `Transfer` audit row to the user's ledger. The three writes run in one
/// exclusive SQLite transaction, so either all of them happen or none do,
/// and two competing transfers can never overdraw the source.
///
/// The audit row has no balance effect: the money moves between pots the
/// user already owns.
///
/// # Errors
/// This function will return a:
/// - [Error::Validation] if the goals are the same or the amount is not
///   positive,
/// - [Error::NotFound] if either goal does not exist or is not owned by
///   `user_id`,
/// - [Error::InsufficientFunds] if the source goal holds less than `amount`,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn transfer_savings(
    request: TransferRequest,
    connection: &mut Connection,
) -> Result<(), Error> {
    if request.from_goal_id == request.to_goal_id {
        return Err(Error::Validation(
            "cannot transfer between a goal and itself".to_string(),
        ));
    }

    if !request.amount.is_finite() || request.amount <= 0.0 {
        return Err(Error::Validation(
            "transfer amount must be a positive number".to_string(),
        ));
    }

    // Exclusive mode takes the write lock up front, so the funds check and
    // the debit cannot be split by a competing transfer.
    let sql_transaction =
        connection.transaction_with_behavior(TransactionBehavior::Exclusive)?;

    let source = get_owned_goal(request.user_id, request.from_goal_id, &sql_transaction)?;
    get_owned_goal(request.user_id, request.to_goal_id, &sql_transaction)?;

    if source.current_savings < request.amount {
        return Err(Error::InsufficientFunds);
    }

    let debited = sql_transaction.execute(
        "UPDATE savings_goal SET current_savings = current_savings - ?1
         WHERE id = ?2 AND user_id = ?3 AND current_savings >= ?1",
        (request.amount, request.from_goal_id, request.user_id),
    )?;
    if debited == 0 {
        return Err(Error::InsufficientFunds);
    }

    sql_transaction.execute(
        "UPDATE savings_goal SET current_savings = current_savings + ?1
         WHERE id = ?2 AND user_id = ?3",
        (request.amount, request.to_goal_id, request.user_id),
    )?;

    let base_currency: String = sql_transaction.query_row(
        "SELECT base_currency FROM user WHERE id = ?1",
        [request.user_id],
        |row| row.get(0),
    )?;

    sql_transaction.execute(
        "INSERT INTO \"transaction\"
         (user_id, category_id, amount, currency_code, date, transaction_type, description)
         VALUES (?1, NULL, ?2, ?3, ?4, 'Transfer', ?5)",
        (
            request.user_id,
            request.amount,
            base_currency,
            OffsetDateTime::now_utc().date(),
            format!(
                "Transfer from goal #{} to goal #{}",
                request.from_goal_id, request.to_goal_id
            ),
        ),
    )?;

    sql_transaction.commit()?;

    Ok(())
}

fn get_owned_goal(
    user_id: UserId,
    goal_id: DatabaseId,
    connection: &Connection,
) -> Result<SavingsGoal, Error> {
    let goal = connection
        .prepare(
            "SELECT id, user_id, name, target_amount, current_savings, deadline
             FROM savings_goal WHERE id = :id AND user_id = :user_id",
        )?
        .query_row(
            &[(":id", &goal_id), (":user_id", &user_id.as_i64())],
            SavingsGoal::map_row,
        )?;

    Ok(goal)
}

/// A route handler for transferring money between savings goals.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn transfer_savings_endpoint(
    State(state): State<AppState>,
    Json(request): Json<TransferRequest>,
) -> Response {
    let mut connection = state.db_connection.lock().unwrap();

    match transfer_savings(request, &mut connection) {
        Ok(()) => Json(serde_json::json!({ "message": "transfer completed" })).into_response(),
        Err(error) => error.into_response(),
    }
}

#[cfg(test)]
mod transfer_tests {
    use crate::{
        Error,
        savings::{get_savings_goal, test_utils::create_test_goal},
        transaction::test_utils::{create_test_user, get_test_connection},
        user::get_user,
    };

    use super::{TransferRequest, transfer_savings};

    #[test]
    fn transfer_moves_funds_and_writes_audit_row() {
        let mut connection = get_test_connection();
        let user = create_test_user("test@test.com", &connection);
        let from = create_test_goal(user.id, "Emergency Fund", 500.0, &connection);
        let to = create_test_goal(user.id, "Holiday", 50.0, &connection);

        transfer_savings(
            TransferRequest {
                user_id: user.id,
                from_goal_id: from.id,
                to_goal_id: to.id,
                amount: 200.0,
            },
            &mut connection,
        )
        .unwrap();

        assert_eq!(
            get_savings_goal(from.id, &connection).unwrap().current_savings,
            300.0
        );
        assert_eq!(
            get_savings_goal(to.id, &connection).unwrap().current_savings,
            250.0
        );

        let (transaction_type, description): (String, String) = connection
            .query_row(
                "SELECT transaction_type, description FROM \"transaction\" WHERE user_id = ?1",
                [user.id.as_i64()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert_eq!(transaction_type, "Transfer");
        assert_eq!(
            description,
            format!("Transfer from goal #{} to goal #{}", from.id, to.id)
        );
        // Moving money between pots does not change the user's balance.
        assert_eq!(get_user(user.id, &connection).unwrap().balance, 0.0);
    }

    #[test]
    fn overdraw_is_rejected_and_nothing_changes() {
        let mut connection = get_test_connection();
        let user = create_test_user("test@test.com", &connection);
        let from = create_test_goal(user.id, "Emergency Fund", 100.0, &connection);
        let to = create_test_goal(user.id, "Holiday", 0.0, &connection);

        let result = transfer_savings(
            TransferRequest {
                user_id: user.id,
                from_goal_id: from.id,
                to_goal_id: to.id,
                amount: 150.0,
            },
            &mut connection,
        );

        assert_eq!(result, Err(Error::InsufficientFunds));
        assert_eq!(
            get_savings_goal(from.id, &connection).unwrap().current_savings,
            100.0
        );
        assert_eq!(
            get_savings_goal(to.id, &connection).unwrap().current_savings,
            0.0
        );
    }

    #[test]
    fn transfer_to_the_same_goal_is_rejected() {
        let mut connection = get_test_connection();
        let user = create_test_user("test@test.com", &connection);
        let goal = create_test_goal(user.id, "Emergency Fund", 100.0, &connection);

        let result = transfer_savings(
            TransferRequest {
                user_id: user.id,
                from_goal_id: goal.id,
                to_goal_id: goal.id,
                amount: 10.0,
            },
            &mut connection,
        );

        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[test]
    fn non_positive_amount_is_rejected() {
        let mut connection = get_test_connection();
        let user = create_test_user("test@test.com", &connection);
        let from = create_test_goal(user.id, "Emergency Fund", 100.0, &connection);
        let to = create_test_goal(user.id, "Holiday", 0.0, &connection);

        for amount in [0.0, -5.0, f64::NAN] {
            let result = transfer_savings(
                TransferRequest {
                    user_id: user.id,
                    from_goal_id: from.id,
                    to_goal_id: to.id,
                    amount,
                },
                &mut connection,
            );

            assert!(matches!(result, Err(Error::Validation(_))));
        }
    }

    #[test]
    fn transfer_involving_another_users_goal_is_not_found() {
        let mut connection = get_test_connection();
        let alice = create_test_user("alice@test.com", &connection);
        let bob = create_test_user("bob@test.com", &connection);
        let alice_goal = create_test_goal(alice.id, "Emergency Fund", 100.0, &connection);
        let bob_goal = create_test_goal(bob.id, "New Car", 100.0, &connection);

        let result = transfer_savings(
            TransferRequest {
                user_id: alice.id,
                from_goal_id: alice_goal.id,
                to_goal_id: bob_goal.id,
                amount: 10.0,
            },
            &mut connection,
        );

        assert_eq!(result, Err(Error::NotFound));
        assert_eq!(
            get_savings_goal(alice_goal.id, &connection)
                .unwrap()
                .current_savings,
            100.0
        );
    }

    #[test]
    fn failed_audit_write_rolls_back_the_whole_transfer() {
        let mut connection = get_test_connection();
        let user = create_test_user("test@test.com", &connection);
        // Point the user at a currency with no exchange rate row, so the
        // audit insert fails its foreign key check after both balance
        // updates have applied.
        connection
            .execute(
                "UPDATE user SET base_currency = 'XXX' WHERE id = ?1",
                [user.id.as_i64()],
            )
            .unwrap();
        let from = create_test_goal(user.id, "Emergency Fund", 500.0, &connection);
        let to = create_test_goal(user.id, "Holiday", 0.0, &connection);

        let result = transfer_savings(
            TransferRequest {
                user_id: user.id,
                from_goal_id: from.id,
                to_goal_id: to.id,
                amount: 200.0,
            },
            &mut connection,
        );

        assert_eq!(result, Err(Error::InvalidReference));
        assert_eq!(
            get_savings_goal(from.id, &connection).unwrap().current_savings,
            500.0
        );
        assert_eq!(
            get_savings_goal(to.id, &connection).unwrap().current_savings,
            0.0
        );
    }
}
