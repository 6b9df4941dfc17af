//! Read-only reports over the ledger.
//!
//! Every figure these reports produce is converted into the owning user's
//! base currency first, so multi-currency ledgers aggregate into comparable
//! numbers. A missing exchange rate fails the whole report rather than
//! letting an unconverted amount slip into a total.

mod budget_status;
mod period;
mod search;
mod spending;
mod summary;

pub use budget_status::{
    BudgetHealth, BudgetStatusQuery, BudgetStatusRow, budget_status, budget_status_endpoint,
    calculate_budget_status,
};
pub use period::{DateRange, SummaryPeriod};
pub use search::{
    MatchType, SEARCH_RESULT_LIMIT, SearchFilter, SearchQuery, SearchResult,
    advanced_search_endpoint, search_transactions,
};
pub use spending::{
    MonthlyTrend, SpendingQuery, SpendingReport, analyze_spending, spending_analysis_endpoint,
};
pub use summary::{
    CategoryTotal, Summary, SummaryQuery, SummaryReport, summarize, transaction_summary_endpoint,
};
