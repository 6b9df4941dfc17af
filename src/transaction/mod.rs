//! Transaction (ledger) management.
//!
//! This module contains everything related to the ledger:
//! - The `Transaction` model and the write path that keeps `user.balance`
//!   equal to the signed sum of the user's transactions
//! - Filtered queries over a user's history
//! - All-or-nothing batch insertion
//! - The JSON route handlers for the above

mod batch;
mod core;
mod endpoints;
mod query;

pub use batch::{BatchRequest, NewBatchTransaction, insert_batch};
pub use self::core::{
    NewTransaction, Transaction, TransactionType, UpdateTransaction, delete_transaction,
    get_transaction, record_transaction, update_transaction,
};
pub use endpoints::{
    batch_transactions_endpoint, create_transaction_endpoint, delete_transaction_endpoint,
    get_transaction_endpoint, get_user_transactions_endpoint, update_transaction_endpoint,
};
pub use query::{TransactionFilter, TransactionWithCategory, get_user_transactions};

#[cfg(test)]
pub(crate) use self::core::test_utils;
