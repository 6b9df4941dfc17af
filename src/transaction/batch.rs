//! Atomic insertion of multiple transactions in one request.

use rusqlite::Connection;
use serde::Deserialize;
use time::Date;

use crate::{Error, db::DatabaseId, user::UserId};

use super::core::{NewTransaction, Transaction, TransactionType, record_within};

/// A batch of transactions to record for one user.
///
/// Either every transaction in the batch is recorded, or none are.
#[derive(Debug, Clone, Deserialize)]
pub struct BatchRequest {
    /// The user whose ledger the entries are added to.
    pub user_id: UserId,
    /// The transactions to record.
    pub transactions: Vec<NewBatchTransaction>,
}

/// One entry in a [BatchRequest]. The owning user comes from the request.
#[derive(Debug, Clone, Deserialize)]
pub struct NewBatchTransaction {
    /// The category the entry belongs to, if any.
    #[serde(default)]
    pub category_id: Option<DatabaseId>,
    /// The non-negative amount of money, in `currency_code` units.
    pub amount: f64,
    /// The currency the amount is denominated in.
    pub currency_code: String,
    /// When the transaction happened.
    pub date: Date,
    /// Whether the entry is income or an expense.
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

/// Record every transaction in `batch`, or none if any of them fails.
///
/// # Errors
/// This function will return a:
/// - [Error::Validation] if the batch is empty or any amount is negative,
/// - [Error::InvalidReference] if any entry names a user, category, or
///   currency that does not exist,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn insert_batch(batch: BatchRequest, connection: &Connection) -> Result<Vec<Transaction>, Error> {
    if batch.transactions.is_empty() {
        return Err(Error::Validation(
            "a batch must contain at least one transaction".to_string(),
        ));
    }

    let sql_transaction = connection.unchecked_transaction()?;

    let mut recorded = Vec::with_capacity(batch.transactions.len());
    for entry in batch.transactions {
        // An error here drops the transaction before commit, rolling back
        // every entry recorded so far.
        let transaction = record_within(
            NewTransaction {
                user_id: batch.user_id,
                category_id: entry.category_id,
                amount: entry.amount,
                currency_code: entry.currency_code,
                date: entry.date,
                transaction_type: entry.transaction_type,
                description: entry.description,
                payment_method: entry.payment_method,
            },
            &sql_transaction,
        )?;
        recorded.push(transaction);
    }

    sql_transaction.commit()?;

    Ok(recorded)
}
