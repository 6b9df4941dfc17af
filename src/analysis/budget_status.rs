//! Budget-versus-actual reporting for one calendar month.

use axum::{
    Json,
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use crate::{
    Error,
    budget::BudgetPeriod,
    db::{DatabaseId, MapRow},
    state::AppState,
    transaction::TransactionType,
    user::UserId,
};

use super::{period::DateRange, summary::fetch_converted_rows};

/// Where a category's spending stands relative to its budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BudgetHealth {
    /// Spending has reached or passed the monthly limit.
    #[serde(rename = "Over Budget")]
    OverBudget,
    /// Spending is below the monthly limit.
    #[serde(rename = "Within Budget")]
    WithinBudget,
    /// The category has spending but no budget.
    #[serde(rename = "No Budget Set")]
    NoBudgetSet,
}

impl BudgetHealth {
    /// A one-line suggestion to show next to the status.
    pub fn recommendation(&self) -> &'static str {
        match self {
            BudgetHealth::OverBudget => "Reduce spending in this category",
            BudgetHealth::WithinBudget => "Spending is on track",
            BudgetHealth::NoBudgetSet => "Consider setting a budget for this category",
        }
    }
}

/// Classify spending against an optional monthly limit.
///
/// `spent >= limit` counts as over budget: a fully consumed budget leaves no
/// room for further spending.
pub fn budget_status(spent: f64, monthly_limit: Option<f64>) -> BudgetHealth {
    match monthly_limit {
        None => BudgetHealth::NoBudgetSet,
        Some(limit) if spent >= limit => BudgetHealth::OverBudget,
        Some(_) => BudgetHealth::WithinBudget,
    }
}

/// One category's budget standing for the month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetStatusRow {
    /// The ID of the category.
    pub category_id: DatabaseId,
    /// The name of the category.
    pub category_name: String,
    /// Converted spending in the category this month.
    pub amount_spent: f64,
    /// The budget normalized to a monthly limit, if a budget is set.
    pub budget_limit: Option<f64>,
    /// How much of the limit is left. Negative when over budget.
    pub remaining: Option<f64>,
    /// Spending as a percentage of the limit.
    pub percentage_used: Option<f64>,
    /// Where spending stands relative to the limit.
    pub status: BudgetHealth,
    /// A one-line suggestion matching the status.
    pub recommendation: &'static str,
}

/// The query parameters for the budget status report.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BudgetStatusQuery {
    /// Any date inside the month to report on. Defaults to the current month.
    pub month: Option<Date>,
}

struct BudgetRow {
    category_id: DatabaseId,
    category_name: String,
    amount: f64,
    period: BudgetPeriod,
}

impl MapRow for BudgetRow {
    type ReturnType = Self;

    fn map_row_with_offset(
        row: &rusqlite::Row,
        offset: usize,
    ) -> Result<Self::ReturnType, rusqlite::Error> {
        Ok(Self {
            category_id: row.get(offset)?,
            category_name: row.get(offset + 1)?,
            amount: row.get(offset + 2)?,
            period: row.get(offset + 3)?,
        })
    }
}

/// Build the budget status report for the month containing `month`.
///
/// Covers the union of the user's budgeted categories and the categories
/// they spent in this month, so both unbudgeted spending and untouched
/// budgets show up.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if the user does not exist,
/// - [Error::MissingExchangeRate] if any row's currency, or the user's base
///   currency, has no exchange rate,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn calculate_budget_status(
    user_id: UserId,
    month: Date,
    connection: &Connection,
) -> Result<Vec<BudgetStatusRow>, Error> {
    let range = month_range(month);
    let (rows, _) = fetch_converted_rows(user_id, range, connection)?;

    let budgets: Vec<BudgetRow> = connection
        .prepare(
            "SELECT b.category_id, c.name, b.amount, b.period
             FROM budget b
             JOIN category c ON b.category_id = c.id
             WHERE b.user_id = :user_id
             ORDER BY c.name ASC",
        )?
        .query_map(&[(":user_id", &user_id)], BudgetRow::map_row)?
        .collect::<Result<_, _>>()?;

    let mut report: Vec<BudgetStatusRow> = budgets
        .into_iter()
        .map(|budget| {
            let limit = budget.period.monthly_limit(budget.amount, month);
            BudgetStatusRow {
                category_id: budget.category_id,
                category_name: budget.category_name,
                amount_spent: 0.0,
                budget_limit: Some(limit),
                remaining: Some(limit),
                percentage_used: Some(0.0),
                status: BudgetHealth::WithinBudget,
                recommendation: BudgetHealth::WithinBudget.recommendation(),
            }
        })
        .collect();

    for row in &rows {
        if row.transaction_type != TransactionType::Expense {
            continue;
        }
        let (Some(category_id), Some(category_name)) =
            (row.category_id, row.category_name.as_deref())
        else {
            continue;
        };

        match report
            .iter_mut()
            .find(|entry| entry.category_id == category_id)
        {
            Some(entry) => entry.amount_spent += row.amount,
            None => report.push(BudgetStatusRow {
                category_id,
                category_name: category_name.to_string(),
                amount_spent: row.amount,
                budget_limit: None,
                remaining: None,
                percentage_used: None,
                status: BudgetHealth::NoBudgetSet,
                recommendation: BudgetHealth::NoBudgetSet.recommendation(),
            }),
        }
    }

    for entry in &mut report {
        entry.status = budget_status(entry.amount_spent, entry.budget_limit);
        entry.recommendation = entry.status.recommendation();
        if let Some(limit) = entry.budget_limit {
            entry.remaining = Some(limit - entry.amount_spent);
            entry.percentage_used = Some(if limit == 0.0 {
                0.0
            } else {
                entry.amount_spent / limit * 100.0
            });
        }
    }

    Ok(report)
}

fn month_range(month: Date) -> DateRange {
    let start = Date::from_calendar_date(month.year(), month.month(), 1)
        .expect("the first day of a month is always a valid date");
    let end = Date::from_calendar_date(
        month.year(),
        month.month(),
        month.month().length(month.year()),
    )
    .expect("the length of a month is always a valid day");

    DateRange { start, end }
}

/// A route handler for the monthly budget status report.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn budget_status_endpoint(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
    Query(query): Query<BudgetStatusQuery>,
) -> Response {
    let month = query
        .month
        .unwrap_or_else(|| OffsetDateTime::now_utc().date());
    let connection = state.db_connection.lock().unwrap();

    match calculate_budget_status(user_id, month, &connection) {
        Ok(report) => Json(report).into_response(),
        Err(error) => error.into_response(),
    }
}

#[cfg(test)]
mod budget_status_tests {
    use time::macros::date;

    use crate::{
        budget::{BudgetPeriod, NewBudget, create_budget},
        category::CategoryType,
        transaction::{
            TransactionType, record_transaction,
            test_utils::{
                create_test_category, create_test_user, get_test_connection, new_transaction,
            },
        },
    };

    use super::{BudgetHealth, budget_status, calculate_budget_status};

    #[test]
    fn status_policy_matches_spent_against_limit() {
        assert_eq!(budget_status(50.0, Some(100.0)), BudgetHealth::WithinBudget);
        assert_eq!(budget_status(100.0, Some(100.0)), BudgetHealth::OverBudget);
        assert_eq!(budget_status(150.0, Some(100.0)), BudgetHealth::OverBudget);
        assert_eq!(budget_status(150.0, None), BudgetHealth::NoBudgetSet);
    }

    #[test]
    fn report_covers_budgeted_and_unbudgeted_spending() {
        let connection = get_test_connection();
        let user = create_test_user("test@test.com", &connection);
        let groceries =
            create_test_category("Groceries", CategoryType::Expense, user.id, &connection);
        let dining = create_test_category("Dining", CategoryType::Expense, user.id, &connection);
        create_budget(
            NewBudget {
                user_id: user.id,
                category_id: groceries,
                amount: 400.0,
                period: BudgetPeriod::Monthly,
                start_date: date!(2025 - 01 - 01),
            },
            &connection,
        )
        .unwrap();
        for (category_id, amount) in [(groceries, 120.0), (dining, 60.0)] {
            let mut transaction = new_transaction(user.id, amount, TransactionType::Expense);
            transaction.category_id = Some(category_id);
            record_transaction(transaction, &connection).unwrap();
        }

        let report = calculate_budget_status(user.id, date!(2025 - 06 - 01), &connection).unwrap();

        assert_eq!(report.len(), 2);
        let groceries_row = report
            .iter()
            .find(|row| row.category_id == groceries)
            .unwrap();
        assert_eq!(groceries_row.amount_spent, 120.0);
        assert_eq!(groceries_row.budget_limit, Some(400.0));
        assert_eq!(groceries_row.remaining, Some(280.0));
        assert_eq!(groceries_row.percentage_used, Some(30.0));
        assert_eq!(groceries_row.status, BudgetHealth::WithinBudget);

        let dining_row = report.iter().find(|row| row.category_id == dining).unwrap();
        assert_eq!(dining_row.status, BudgetHealth::NoBudgetSet);
        assert_eq!(dining_row.budget_limit, None);
    }

    #[test]
    fn untouched_budget_shows_up_with_zero_spending() {
        let connection = get_test_connection();
        let user = create_test_user("test@test.com", &connection);
        let category_id =
            create_test_category("Groceries", CategoryType::Expense, user.id, &connection);
        create_budget(
            NewBudget {
                user_id: user.id,
                category_id,
                amount: 400.0,
                period: BudgetPeriod::Monthly,
                start_date: date!(2025 - 01 - 01),
            },
            &connection,
        )
        .unwrap();

        let report = calculate_budget_status(user.id, date!(2025 - 06 - 01), &connection).unwrap();

        assert_eq!(report.len(), 1);
        assert_eq!(report[0].amount_spent, 0.0);
        assert_eq!(report[0].status, BudgetHealth::WithinBudget);
    }

    #[test]
    fn fully_spent_budget_is_over_budget() {
        let connection = get_test_connection();
        let user = create_test_user("test@test.com", &connection);
        let category_id =
            create_test_category("Groceries", CategoryType::Expense, user.id, &connection);
        create_budget(
            NewBudget {
                user_id: user.id,
                category_id,
                amount: 100.0,
                period: BudgetPeriod::Monthly,
                start_date: date!(2025 - 01 - 01),
            },
            &connection,
        )
        .unwrap();
        let mut transaction = new_transaction(user.id, 100.0, TransactionType::Expense);
        transaction.category_id = Some(category_id);
        record_transaction(transaction, &connection).unwrap();

        let report = calculate_budget_status(user.id, date!(2025 - 06 - 01), &connection).unwrap();

        assert_eq!(report[0].status, BudgetHealth::OverBudget);
        assert_eq!(report[0].remaining, Some(0.0));
    }

    #[test]
    fn non_monthly_periods_are_normalized() {
        let connection = get_test_connection();
        let user = create_test_user("test@test.com", &connection);
        let category_id =
            create_test_category("Coffee", CategoryType::Expense, user.id, &connection);
        create_budget(
            NewBudget {
                user_id: user.id,
                category_id,
                amount: 5.0,
                period: BudgetPeriod::Daily,
                start_date: date!(2025 - 01 - 01),
            },
            &connection,
        )
        .unwrap();

        // June has 30 days, so a 5-per-day budget is 150 for the month.
        let report = calculate_budget_status(user.id, date!(2025 - 06 - 15), &connection).unwrap();

        assert_eq!(report[0].budget_limit, Some(150.0));
    }

    #[test]
    fn spending_outside_the_month_is_ignored() {
        let connection = get_test_connection();
        let user = create_test_user("test@test.com", &connection);
        let category_id =
            create_test_category("Groceries", CategoryType::Expense, user.id, &connection);
        let mut transaction = new_transaction(user.id, 75.0, TransactionType::Expense);
        transaction.category_id = Some(category_id);
        transaction.date = date!(2025 - 05 - 31);
        record_transaction(transaction, &connection).unwrap();

        let report = calculate_budget_status(user.id, date!(2025 - 06 - 15), &connection).unwrap();

        assert!(report.is_empty());
    }
}
