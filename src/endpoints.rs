//! The API endpoint URIs.

/// The route to create a user.
pub const USERS: &str = "/api/users";
/// The route for logging in a user.
pub const LOG_IN: &str = "/api/users/log_in";
/// The route to get or update a user's profile.
pub const USER: &str = "/api/users/{user_id}";

/// The route to record a transaction.
pub const TRANSACTIONS: &str = "/api/transactions";
/// The route to record a batch of transactions atomically.
pub const TRANSACTIONS_BATCH: &str = "/api/transactions/batch";
/// The route to get, update, or delete a transaction.
pub const TRANSACTION: &str = "/api/transactions/{transaction_id}";
/// The route to list a user's transactions.
pub const USER_TRANSACTIONS: &str = "/api/transactions/user/{user_id}";
/// The route for the income/expense summary with category breakdown.
pub const TRANSACTION_SUMMARY: &str = "/api/transactions/summary/{user_id}";

/// The route for the spending analysis over a date range.
pub const SPENDING_ANALYSIS: &str = "/api/analysis/spending/{user_id}";
/// The route for the monthly budget status report.
pub const BUDGET_STATUS: &str = "/api/analysis/budget-status/{user_id}";
/// The route for the advanced transaction search.
pub const ADVANCED_SEARCH: &str = "/api/analysis/advanced-search/{user_id}";
/// The route to transfer money between savings goals.
pub const TRANSFER_SAVINGS: &str = "/api/analysis/transfer-savings";

/// The route to create a savings goal.
pub const SAVINGS: &str = "/api/savings";
/// The route to get or update a savings goal.
pub const SAVINGS_GOAL: &str = "/api/savings/{goal_id}";
/// The route to list a user's savings goals.
pub const USER_SAVINGS: &str = "/api/savings/user/{user_id}";

/// The route to list or create categories.
pub const CATEGORIES: &str = "/api/categories";
/// The route to list categories of one type.
pub const CATEGORIES_BY_TYPE: &str = "/api/categories/type/{category_type}";

/// The route to list or create budgets.
pub const BUDGETS: &str = "/api/budgets";
/// The route to list a user's budgets.
pub const USER_BUDGETS: &str = "/api/budgets/user/{user_id}";

/// The route to list exchange rates.
pub const CURRENCIES: &str = "/api/currencies";
/// The route to get or update one exchange rate.
pub const CURRENCY: &str = "/api/currencies/{currency_code}";
