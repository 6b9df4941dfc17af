//! Application router configuration.

use axum::{
    Router,
    routing::{get, post},
};

use crate::{
    AppState,
    analysis::{
        advanced_search_endpoint, budget_status_endpoint, spending_analysis_endpoint,
        transaction_summary_endpoint,
    },
    budget::{create_budget_endpoint, get_user_budgets_endpoint},
    category::{
        create_category_endpoint, get_categories_by_type_endpoint, get_categories_endpoint,
    },
    currency::{get_rate_endpoint, get_rates_endpoint, update_rate_endpoint},
    endpoints,
    savings::{
        create_savings_goal_endpoint, get_savings_goal_endpoint, get_user_savings_goals_endpoint,
        transfer_savings_endpoint, update_savings_goal_endpoint,
    },
    transaction::{
        batch_transactions_endpoint, create_transaction_endpoint, delete_transaction_endpoint,
        get_transaction_endpoint, get_user_transactions_endpoint, update_transaction_endpoint,
    },
    user::{create_user_endpoint, get_user_endpoint, log_in_endpoint, update_user_endpoint},
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(endpoints::USERS, post(create_user_endpoint))
        .route(endpoints::LOG_IN, post(log_in_endpoint))
        .route(
            endpoints::USER,
            get(get_user_endpoint).put(update_user_endpoint),
        )
        .route(endpoints::TRANSACTIONS, post(create_transaction_endpoint))
        .route(
            endpoints::TRANSACTIONS_BATCH,
            post(batch_transactions_endpoint),
        )
        .route(
            endpoints::TRANSACTION,
            get(get_transaction_endpoint)
                .put(update_transaction_endpoint)
                .delete(delete_transaction_endpoint),
        )
        .route(
            endpoints::USER_TRANSACTIONS,
            get(get_user_transactions_endpoint),
        )
        .route(
            endpoints::TRANSACTION_SUMMARY,
            get(transaction_summary_endpoint),
        )
        .route(
            endpoints::SPENDING_ANALYSIS,
            get(spending_analysis_endpoint),
        )
        .route(endpoints::BUDGET_STATUS, get(budget_status_endpoint))
        .route(endpoints::ADVANCED_SEARCH, get(advanced_search_endpoint))
        .route(endpoints::TRANSFER_SAVINGS, post(transfer_savings_endpoint))
        .route(endpoints::SAVINGS, post(create_savings_goal_endpoint))
        .route(
            endpoints::SAVINGS_GOAL,
            get(get_savings_goal_endpoint).put(update_savings_goal_endpoint),
        )
        .route(
            endpoints::USER_SAVINGS,
            get(get_user_savings_goals_endpoint),
        )
        .route(
            endpoints::CATEGORIES,
            get(get_categories_endpoint).post(create_category_endpoint),
        )
        .route(
            endpoints::CATEGORIES_BY_TYPE,
            get(get_categories_by_type_endpoint),
        )
        .route(
            endpoints::BUDGETS,
            post(create_budget_endpoint),
        )
        .route(endpoints::USER_BUDGETS, get(get_user_budgets_endpoint))
        .route(endpoints::CURRENCIES, get(get_rates_endpoint))
        .route(
            endpoints::CURRENCY,
            get(get_rate_endpoint).put(update_rate_endpoint),
        )
        .with_state(state)
}

#[cfg(test)]
mod route_tests {
    use axum_test::TestServer;
    use rusqlite::Connection;
    use serde_json::json;

    use crate::{AppState, db::initialize, endpoints};

    use super::build_router;

    fn new_test_server() -> TestServer {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();
        let router = build_router(AppState::new(connection));

        TestServer::new(router)
    }

    #[tokio::test]
    async fn create_user_then_log_in() {
        let server = new_test_server();

        let created = server
            .post(endpoints::USERS)
            .json(&json!({
                "name": "Alice",
                "email": "alice@test.com",
                "password": "correct horse battery staple"
            }))
            .await;
        created.assert_status(axum::http::StatusCode::CREATED);

        let logged_in = server
            .post(endpoints::LOG_IN)
            .json(&json!({
                "email": "alice@test.com",
                "password": "correct horse battery staple"
            }))
            .await;
        logged_in.assert_status_ok();
        let body: serde_json::Value = logged_in.json();
        assert_eq!(body["email"], "alice@test.com");
        assert!(body.get("password").is_none());
    }

    #[tokio::test]
    async fn record_transaction_and_fetch_summary() {
        let server = new_test_server();

        let user: serde_json::Value = server
            .post(endpoints::USERS)
            .json(&json!({
                "name": "Alice",
                "email": "alice@test.com",
                "password": "correct horse battery staple"
            }))
            .await
            .json();
        let user_id = user["id"].as_i64().unwrap();

        let created = server
            .post(endpoints::TRANSACTIONS)
            .json(&json!({
                "user_id": user_id,
                "amount": 50.0,
                "currency_code": "EUR",
                "date": "2025-06-15",
                "transaction_type": "Expense",
                "description": "dinner"
            }))
            .await;
        created.assert_status(axum::http::StatusCode::CREATED);

        let summary: serde_json::Value = server
            .get(&format!("/api/transactions/summary/{user_id}"))
            .await
            .json();
        let total_expense = summary["summary"]["total_expense"].as_f64().unwrap();
        assert!((total_expense - 50.0 / 0.91).abs() < 1e-9);

        // The balance moves by the raw amount, not the converted one.
        let profile: serde_json::Value =
            server.get(&format!("/api/users/{user_id}")).await.json();
        assert_eq!(profile["balance"].as_f64().unwrap(), -50.0);
    }

    #[tokio::test]
    async fn spending_analysis_requires_a_date_range() {
        let server = new_test_server();

        let user: serde_json::Value = server
            .post(endpoints::USERS)
            .json(&json!({
                "name": "Alice",
                "email": "alice@test.com",
                "password": "correct horse battery staple"
            }))
            .await
            .json();
        let user_id = user["id"].as_i64().unwrap();

        let response = server
            .get(&format!("/api/analysis/spending/{user_id}"))
            .await;

        response.assert_status(axum::http::StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn advanced_search_rejects_empty_filters() {
        let server = new_test_server();

        let response = server.get("/api/analysis/advanced-search/1").await;

        response.assert_status(axum::http::StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn duplicate_email_returns_conflict() {
        let server = new_test_server();
        let body = json!({
            "name": "Alice",
            "email": "alice@test.com",
            "password": "correct horse battery staple"
        });

        server.post(endpoints::USERS).json(&body).await;
        let second = server.post(endpoints::USERS).json(&body).await;

        second.assert_status(axum::http::StatusCode::CONFLICT);
        let error: serde_json::Value = second.json();
        assert_eq!(error["error"], "the email is already in use");
    }

    #[tokio::test]
    async fn transfer_between_goals_via_the_api() {
        let server = new_test_server();

        let user: serde_json::Value = server
            .post(endpoints::USERS)
            .json(&json!({
                "name": "Alice",
                "email": "alice@test.com",
                "password": "correct horse battery staple"
            }))
            .await
            .json();
        let user_id = user["id"].as_i64().unwrap();

        let from: serde_json::Value = server
            .post(endpoints::SAVINGS)
            .json(&json!({
                "user_id": user_id,
                "name": "Emergency Fund",
                "target_amount": 10000.0,
                "current_savings": 500.0
            }))
            .await
            .json();
        let to: serde_json::Value = server
            .post(endpoints::SAVINGS)
            .json(&json!({
                "user_id": user_id,
                "name": "Holiday",
                "target_amount": 2000.0
            }))
            .await
            .json();

        let response = server
            .post(endpoints::TRANSFER_SAVINGS)
            .json(&json!({
                "user_id": user_id,
                "from_goal_id": from["id"],
                "to_goal_id": to["id"],
                "amount": 200.0
            }))
            .await;
        response.assert_status_ok();

        let goal: serde_json::Value = server
            .get(&format!("/api/savings/{}", to["id"]))
            .await
            .json();
        assert_eq!(goal["current_savings"].as_f64().unwrap(), 200.0);
    }
}
