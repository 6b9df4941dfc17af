//! Defines the core data model and the write path for ledger transactions.
//!
//! Every mutation here runs inside one SQL transaction that writes the
//! ledger row and adjusts the owning user's `balance` by the signed delta,
//! so the balance invariant holds after every call.

use std::{fmt::Display, str::FromStr};

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    Error,
    db::{CreateTable, DatabaseId, MapRow},
    user::UserId,
};

/// Whether a ledger entry adds to, subtracts from, or leaves unchanged the
/// user's balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionType {
    /// Money earned; adds to the balance.
    Income,
    /// Money spent; subtracts from the balance.
    Expense,
    /// An audit entry for a savings transfer; no balance effect.
    Transfer,
}

impl TransactionType {
    /// The multiplier that turns a stored (non-negative) amount into its
    /// signed contribution to the user's balance.
    pub fn sign(&self) -> f64 {
        match self {
            TransactionType::Income => 1.0,
            TransactionType::Expense => -1.0,
            TransactionType::Transfer => 0.0,
        }
    }
}

impl Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionType::Income => write!(f, "Income"),
            TransactionType::Expense => write!(f, "Expense"),
            TransactionType::Transfer => write!(f, "Transfer"),
        }
    }
}

impl FromStr for TransactionType {
    type Err = Error;

    fn from_str(string: &str) -> Result<Self, Self::Err> {
        match string {
            "Income" => Ok(TransactionType::Income),
            "Expense" => Ok(TransactionType::Expense),
            "Transfer" => Ok(TransactionType::Transfer),
            other => Err(Error::Validation(format!(
                "invalid transaction type \"{other}\""
            ))),
        }
    }
}

impl rusqlite::ToSql for TransactionType {
    fn to_sql(&self) -> rusqlite::Result<rusqlite::types::ToSqlOutput<'_>> {
        Ok(self.to_string().into())
    }
}

impl rusqlite::types::FromSql for TransactionType {
    fn column_result(
        value: rusqlite::types::ValueRef<'_>,
    ) -> rusqlite::types::FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|_| rusqlite::types::FromSqlError::InvalidType)
    }
}

/// An income or expense event in a user's ledger.
///
/// `amount` is always non-negative; the sign of its contribution to the
/// balance comes from `transaction_type` alone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// The ID of the transaction.
    pub id: DatabaseId,
    /// The user whose ledger this entry belongs to.
    pub user_id: UserId,
    /// The category the entry belongs to, if any.
    pub category_id: Option<DatabaseId>,
    /// The non-negative amount of money, in `currency_code` units.
    pub amount: f64,
    /// The currency the amount is denominated in.
    pub currency_code: String,
    /// When the transaction happened.
    pub date: Date,
    /// Whether this entry is income, an expense, or a transfer audit record.
    pub transaction_type: TransactionType,
    /// A text description of what the transaction was for.
    pub description: String,
    /// How the transaction was paid, e.g. 'Credit Card'.
    pub payment_method: String,
}

impl CreateTable for Transaction {
    fn create_table(connection: &Connection) -> Result<(), rusqlite::Error> {
        connection.execute(
            "CREATE TABLE IF NOT EXISTS \"transaction\" (
                id INTEGER PRIMARY KEY,
                user_id INTEGER NOT NULL,
                category_id INTEGER,
                amount REAL NOT NULL CHECK (amount >= 0),
                currency_code TEXT NOT NULL,
                date TEXT NOT NULL,
                transaction_type TEXT NOT NULL
                    CHECK (transaction_type IN ('Income', 'Expense', 'Transfer')),
                description TEXT NOT NULL DEFAULT '',
                payment_method TEXT NOT NULL DEFAULT 'Other',
                FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE,
                FOREIGN KEY(category_id) REFERENCES category(id)
                    ON UPDATE CASCADE ON DELETE SET NULL,
                FOREIGN KEY(currency_code) REFERENCES currency_exchange(currency_code)
                )",
            (),
        )?;

        Ok(())
    }
}

impl MapRow for Transaction {
    type ReturnType = Self;

    fn map_row_with_offset(row: &Row, offset: usize) -> Result<Self::ReturnType, rusqlite::Error> {
        Ok(Self {
            id: row.get(offset)?,
            user_id: row.get(offset + 1)?,
            category_id: row.get(offset + 2)?,
            amount: row.get(offset + 3)?,
            currency_code: row.get(offset + 4)?,
            date: row.get(offset + 5)?,
            transaction_type: row.get(offset + 6)?,
            description: row.get(offset + 7)?,
            payment_method: row.get(offset + 8)?,
        })
    }
}

/// The columns selected for a full transaction row.
pub(super) const TRANSACTION_COLUMNS: &str =
    "id, user_id, category_id, amount, currency_code, date, transaction_type, \
     description, payment_method";

/// The data needed to record a new transaction.
#[derive(Debug, Clone, Deserialize)]
pub struct NewTransaction {
    /// The user whose ledger the entry is added to.
    pub user_id: UserId,
    /// The category the entry belongs to, if any.
    #[serde(default)]
    pub category_id: Option<DatabaseId>,
    /// The non-negative amount of money, in `currency_code` units.
    pub amount: f64,
    /// The currency the amount is denominated in.
    pub currency_code: String,
    /// When the transaction happened.
    pub date: Date,
    /// Whether this entry is income or an expense.
    pub transaction_type: TransactionType,
    /// A text description of what the transaction was for.
    #[serde(default)]
    pub description: String,
    /// How the transaction was paid.
    #[serde(default = "default_payment_method")]
    pub payment_method: String,
}

/// The fields of a transaction that can be updated.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateTransaction {
    /// The category the entry belongs to, if any.
    #[serde(default)]
    pub category_id: Option<DatabaseId>,
    /// The non-negative amount of money, in `currency_code` units.
    pub amount: f64,
    /// The currency the amount is denominated in.
    pub currency_code: String,
    /// When the transaction happened.
    pub date: Date,
    /// Whether this entry is income or an expense.
    pub transaction_type: TransactionType,
    /// A text description of what the transaction was for.
    #[serde(default)]
    pub description: String,
    /// How the transaction was paid.
    #[serde(default = "default_payment_method")]
    pub payment_method: String,
}

fn default_payment_method() -> String {
    "Other".to_string()
}

fn validate_amount(amount: f64) -> Result<(), Error> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(Error::Validation(
            "amount must be a non-negative number; the sign is derived from the \
             transaction type"
                .to_string(),
        ));
    }

    Ok(())
}

/// Record a new transaction and adjust the owning user's balance, atomically.
///
/// # Errors
/// This function will return a:
/// - [Error::Validation] if `amount` is negative,
/// - [Error::InvalidReference] if the user, category, or currency does not
///   exist,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn record_transaction(
    new_transaction: NewTransaction,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let sql_transaction = connection.unchecked_transaction()?;
    let transaction = record_within(new_transaction, &sql_transaction)?;
    sql_transaction.commit()?;

    Ok(transaction)
}

/// Insert a ledger row and adjust the owning user's balance, without opening
/// a SQL transaction. Callers must already hold one.
pub(super) fn record_within(
    new_transaction: NewTransaction,
    connection: &Connection,
) -> Result<Transaction, Error> {
    validate_amount(new_transaction.amount)?;

    let transaction = connection
        .prepare(&format!(
            "INSERT INTO \"transaction\"
             (user_id, category_id, amount, currency_code, date, transaction_type,
              description, payment_method)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             RETURNING {TRANSACTION_COLUMNS}"
        ))?
        .query_row(
            (
                new_transaction.user_id,
                new_transaction.category_id,
                new_transaction.amount,
                &new_transaction.currency_code,
                new_transaction.date,
                new_transaction.transaction_type,
                &new_transaction.description,
                &new_transaction.payment_method,
            ),
            Transaction::map_row,
        )?;

    apply_balance_delta(
        transaction.user_id,
        transaction.transaction_type.sign() * transaction.amount,
        connection,
    )?;

    Ok(transaction)
}

/// Retrieve a transaction by its `id`.
///
/// # Errors
/// This function will return a [Error::NotFound] if `id` does not refer to a
/// valid transaction, or a [Error::SqlError] if there is some other SQL error.
pub fn get_transaction(id: DatabaseId, connection: &Connection) -> Result<Transaction, Error> {
    let transaction = connection
        .prepare(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM \"transaction\" WHERE id = :id"
        ))?
        .query_row(&[(":id", &id)], Transaction::map_row)?;

    Ok(transaction)
}

/// Update a transaction and re-adjust the owning user's balance, atomically.
///
/// The balance is adjusted by the difference between the new and old signed
/// amounts, so the invariant holds whether the amount, the type, or both
/// changed.
///
/// # Errors
/// This function will return a:
/// - [Error::Validation] if `amount` is negative,
/// - [Error::NotFound] if `id` does not refer to a valid transaction,
/// - [Error::InvalidReference] if the category or currency does not exist,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn update_transaction(
    id: DatabaseId,
    update: UpdateTransaction,
    connection: &Connection,
) -> Result<Transaction, Error> {
    validate_amount(update.amount)?;

    let sql_transaction = connection.unchecked_transaction()?;

    let old = sql_transaction
        .prepare(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM \"transaction\" WHERE id = :id"
        ))?
        .query_row(&[(":id", &id)], Transaction::map_row)?;

    let updated = sql_transaction
        .prepare(&format!(
            "UPDATE \"transaction\"
             SET category_id = ?1, amount = ?2, currency_code = ?3, date = ?4,
                 transaction_type = ?5, description = ?6, payment_method = ?7
             WHERE id = ?8
             RETURNING {TRANSACTION_COLUMNS}"
        ))?
        .query_row(
            (
                update.category_id,
                update.amount,
                &update.currency_code,
                update.date,
                update.transaction_type,
                &update.description,
                &update.payment_method,
                id,
            ),
            Transaction::map_row,
        )?;

    let delta = updated.transaction_type.sign() * updated.amount
        - old.transaction_type.sign() * old.amount;
    apply_balance_delta(old.user_id, delta, &sql_transaction)?;

    sql_transaction.commit()?;

    Ok(updated)
}

/// Delete a transaction and back out its balance contribution, atomically.
///
/// # Errors
/// This function will return a [Error::NotFound] if `id` does not refer to a
/// valid transaction, or a [Error::SqlError] if there is some other SQL error.
pub fn delete_transaction(id: DatabaseId, connection: &Connection) -> Result<(), Error> {
    let sql_transaction = connection.unchecked_transaction()?;

    let old = sql_transaction
        .prepare(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM \"transaction\" WHERE id = :id"
        ))?
        .query_row(&[(":id", &id)], Transaction::map_row)?;

    sql_transaction.execute("DELETE FROM \"transaction\" WHERE id = ?1", [id])?;

    apply_balance_delta(
        old.user_id,
        -(old.transaction_type.sign() * old.amount),
        &sql_transaction,
    )?;

    sql_transaction.commit()?;

    Ok(())
}

/// Add `delta` to the balance of the user with `user_id`.
///
/// Callers must run this inside the same SQL transaction as the ledger write
/// it accounts for.
pub(super) fn apply_balance_delta(
    user_id: UserId,
    delta: f64,
    connection: &Connection,
) -> Result<(), Error> {
    if delta == 0.0 {
        return Ok(());
    }

    let rows = connection.execute(
        "UPDATE user SET balance = balance + ?1 WHERE id = ?2",
        (delta, user_id),
    )?;

    if rows == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}


#[cfg(test)]
mod core_tests {
    use crate::{
        Error,
        db::DatabaseId,
        transaction::core::test_utils::{create_test_user, get_test_connection, new_transaction},
        user::get_user,
    };

    use super::{
        TransactionType, UpdateTransaction, delete_transaction, get_transaction,
        record_transaction, update_transaction,
    };

    #[test]
    fn record_income_increases_balance() {
        let connection = get_test_connection();
        let user = create_test_user("test@test.com", &connection);

        let transaction = record_transaction(
            new_transaction(user.id, 100.0, TransactionType::Income),
            &connection,
        )
        .unwrap();

        assert_eq!(transaction.amount, 100.0);
        assert_eq!(get_user(user.id, &connection).unwrap().balance, 100.0);
    }

    #[test]
    fn record_expense_decreases_balance() {
        let connection = get_test_connection();
        let user = create_test_user("test@test.com", &connection);

        record_transaction(
            new_transaction(user.id, 30.0, TransactionType::Expense),
            &connection,
        )
        .unwrap();

        assert_eq!(get_user(user.id, &connection).unwrap().balance, -30.0);
    }

    #[test]
    fn transfer_entries_do_not_move_the_balance() {
        let connection = get_test_connection();
        let user = create_test_user("test@test.com", &connection);

        record_transaction(
            new_transaction(user.id, 500.0, TransactionType::Transfer),
            &connection,
        )
        .unwrap();

        assert_eq!(get_user(user.id, &connection).unwrap().balance, 0.0);
    }

    #[test]
    fn record_rejects_negative_amount() {
        let connection = get_test_connection();
        let user = create_test_user("test@test.com", &connection);

        let result = record_transaction(
            new_transaction(user.id, -10.0, TransactionType::Expense),
            &connection,
        );

        assert!(matches!(result, Err(Error::Validation(_))));
        assert_eq!(get_user(user.id, &connection).unwrap().balance, 0.0);
    }

    #[test]
    fn record_rejects_unknown_currency() {
        let connection = get_test_connection();
        let user = create_test_user("test@test.com", &connection);

        let mut transaction = new_transaction(user.id, 10.0, TransactionType::Expense);
        transaction.currency_code = "XXX".to_string();

        let result = record_transaction(transaction, &connection);

        assert_eq!(result, Err(Error::InvalidReference));
    }

    #[test]
    fn update_adjusts_balance_by_the_difference() {
        let connection = get_test_connection();
        let user = create_test_user("test@test.com", &connection);
        let transaction = record_transaction(
            new_transaction(user.id, 100.0, TransactionType::Income),
            &connection,
        )
        .unwrap();

        // Income 100 -> Expense 40: the balance moves from +100 to -40.
        let updated = update_transaction(
            transaction.id,
            UpdateTransaction {
                category_id: None,
                amount: 40.0,
                currency_code: "USD".to_string(),
                date: transaction.date,
                transaction_type: TransactionType::Expense,
                description: transaction.description.clone(),
                payment_method: transaction.payment_method.clone(),
            },
            &connection,
        )
        .unwrap();

        assert_eq!(updated.amount, 40.0);
        assert_eq!(get_user(user.id, &connection).unwrap().balance, -40.0);
    }

    #[test]
    fn delete_backs_out_balance_contribution() {
        let connection = get_test_connection();
        let user = create_test_user("test@test.com", &connection);
        let first = record_transaction(
            new_transaction(user.id, 100.0, TransactionType::Income),
            &connection,
        )
        .unwrap();
        record_transaction(
            new_transaction(user.id, 30.0, TransactionType::Expense),
            &connection,
        )
        .unwrap();

        delete_transaction(first.id, &connection).unwrap();

        assert_eq!(get_user(user.id, &connection).unwrap().balance, -30.0);
        assert_eq!(get_transaction(first.id, &connection), Err(Error::NotFound));
    }

    #[test]
    fn balance_matches_signed_sum_after_mutation_sequence() {
        let connection = get_test_connection();
        let user = create_test_user("test@test.com", &connection);

        let mut ids: Vec<DatabaseId> = Vec::new();
        for (amount, transaction_type) in [
            (250.0, TransactionType::Income),
            (40.0, TransactionType::Expense),
            (60.0, TransactionType::Expense),
            (10.0, TransactionType::Income),
        ] {
            let transaction = record_transaction(
                new_transaction(user.id, amount, transaction_type),
                &connection,
            )
            .unwrap();
            ids.push(transaction.id);
        }
        delete_transaction(ids[1], &connection).unwrap();
        update_transaction(
            ids[2],
            UpdateTransaction {
                category_id: None,
                amount: 80.0,
                currency_code: "USD".to_string(),
                date: time::macros::date!(2025 - 06 - 16),
                transaction_type: TransactionType::Expense,
                description: String::new(),
                payment_method: "Other".to_string(),
            },
            &connection,
        )
        .unwrap();

        // 250 - 80 + 10
        let expected: f64 = connection
            .query_row(
                "SELECT TOTAL(CASE transaction_type
                    WHEN 'Income' THEN amount
                    WHEN 'Expense' THEN -amount
                    ELSE 0 END)
                 FROM \"transaction\" WHERE user_id = ?1",
                [user.id.as_i64()],
                |row| row.get(0),
            )
            .unwrap();
        let balance = get_user(user.id, &connection).unwrap().balance;
        assert_eq!(balance, expected);
        assert_eq!(balance, 180.0);
    }

    #[test]
    fn delete_missing_transaction_returns_not_found() {
        let connection = get_test_connection();

        assert_eq!(delete_transaction(999, &connection), Err(Error::NotFound));
    }
}
