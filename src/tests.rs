#[cfg(test)]
mod integration_tests {
    use std::str::FromStr;

    use crate::schemas::{ApiResponse, ErrorResponse};
    use crate::test_utils::test_utils::{
        TEST_PASSWORD, bearer, default_category_id, register_and_login, setup_test_server,
    };
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use chrono::{Duration, Utc};
    use rust_decimal::Decimal;
    use serde_json::{Value, json};

    fn dec(value: &Value) -> Decimal {
        Decimal::from_str(value.as_str().expect("decimals are serialized as strings")).unwrap()
    }

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    async fn create_category(server: &TestServer, token: &str, name: &str) -> i64 {
        let (name_h, value_h) = bearer(token);
        let response = server
            .post("/api/v1/categories")
            .add_header(name_h, value_h)
            .json(&json!({ "name": name, "color": "#ff0000" }))
            .await;
        response.assert_status(StatusCode::CREATED);
        let body: ApiResponse<Value> = response.json();
        body.data["id"].as_i64().unwrap()
    }

    async fn create_transaction(
        server: &TestServer,
        token: &str,
        category_id: i64,
        kind: &str,
        amount: &str,
        date: &str,
    ) -> Value {
        let (name_h, value_h) = bearer(token);
        let response = server
            .post("/api/v1/transactions")
            .add_header(name_h, value_h)
            .json(&json!({
                "title": format!("{} {}", kind, amount),
                "amount": amount,
                "category_id": category_id,
                "type": kind,
                "date": date,
            }))
            .await;
        response.assert_status(StatusCode::CREATED);
        let body: ApiResponse<Value> = response.json();
        body.data
    }

    async fn create_budget(
        server: &TestServer,
        token: &str,
        category_id: i64,
        amount: &str,
        start: &str,
        end: &str,
    ) -> i64 {
        let (name_h, value_h) = bearer(token);
        let response = server
            .post("/api/v1/budgets")
            .add_header(name_h, value_h)
            .json(&json!({
                "category_id": category_id,
                "amount": amount,
                "period": "monthly",
                "start_date": start,
                "end_date": end,
            }))
            .await;
        response.assert_status(StatusCode::CREATED);
        let body: ApiResponse<Value> = response.json();
        body.data["id"].as_i64().unwrap()
    }

    async fn get_data(server: &TestServer, token: &str, path: &str) -> Value {
        let (name_h, value_h) = bearer(token);
        let response = server.get(path).add_header(name_h, value_h).await;
        response.assert_status_ok();
        let body: ApiResponse<Value> = response.json();
        assert!(body.success);
        body.data
    }

    #[tokio::test]
    async fn test_health_check() {
        let server = setup_test_server().await;
        let response = server.get("/health").await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["database"], "connected");
    }

    #[tokio::test]
    async fn test_protected_routes_require_token() {
        let server = setup_test_server().await;

        let response = server.get("/api/v1/budgets").await;
        response.assert_status(StatusCode::UNAUTHORIZED);
        let body: ErrorResponse = response.json();
        assert_eq!(body.code, "UNAUTHORIZED");
        assert!(!body.success);

        let (name_h, value_h) = bearer("not-a-real-token");
        server
            .get("/api/v1/transactions")
            .add_header(name_h, value_h)
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_default_categories_are_public() {
        let server = setup_test_server().await;
        let response = server.get("/api/v1/categories/defaults").await;
        response.assert_status_ok();
        let body: ApiResponse<Vec<Value>> = response.json();
        assert_eq!(body.data.len(), 10);
        assert!(body.data.iter().all(|c| c["is_default"] == true));
    }

    #[tokio::test]
    async fn test_registration_requires_verification() {
        let server = setup_test_server().await;

        let response = server
            .post("/api/v1/auth/register")
            .json(&json!({
                "email": "jane@example.com",
                "password": TEST_PASSWORD,
                "first_name": "Jane",
                "last_name": "Doe",
            }))
            .await;
        response.assert_status(StatusCode::CREATED);
        let body: ApiResponse<Value> = response.json();
        assert_eq!(body.data["user"]["is_verified"], false);
        assert!(body.data["user"].get("password_hash").is_none());
        let verification_token = body.data["verification_token"].as_str().unwrap().to_string();

        let response = server
            .post("/api/v1/auth/login")
            .json(&json!({ "email": "jane@example.com", "password": TEST_PASSWORD }))
            .await;
        response.assert_status(StatusCode::UNAUTHORIZED);

        server
            .post("/api/v1/auth/verify")
            .json(&json!({ "token": verification_token }))
            .await
            .assert_status_ok();

        let response = server
            .post("/api/v1/auth/login")
            .json(&json!({ "email": "jane@example.com", "password": TEST_PASSWORD }))
            .await;
        response.assert_status_ok();
        let body: ApiResponse<Value> = response.json();
        assert_eq!(body.data["token_type"], "Bearer");

        let token = body.data["token"].as_str().unwrap();
        let profile = get_data(&server, token, "/api/v1/auth/profile").await;
        assert_eq!(profile["user"]["email"], "jane@example.com");
        assert_eq!(profile["stats"]["categories_available"], 10);
    }

    #[tokio::test]
    async fn test_register_validation_and_duplicates() {
        let server = setup_test_server().await;
        register_and_login(&server, "dup@example.com").await;

        let response = server
            .post("/api/v1/auth/register")
            .json(&json!({
                "email": "dup@example.com",
                "password": TEST_PASSWORD,
                "first_name": "Dup",
                "last_name": "User",
            }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: ErrorResponse = response.json();
        assert_eq!(body.code, "EMAIL_TAKEN");

        server
            .post("/api/v1/auth/register")
            .json(&json!({
                "email": "not-an-email",
                "password": TEST_PASSWORD,
                "first_name": "Bad",
                "last_name": "Email",
            }))
            .await
            .assert_status(StatusCode::BAD_REQUEST);

        server
            .post("/api/v1/auth/register")
            .json(&json!({
                "email": "short@example.com",
                "password": "123",
                "first_name": "Short",
                "last_name": "Password",
            }))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_logout_revokes_token() {
        let server = setup_test_server().await;
        let token = register_and_login(&server, "bye@example.com").await;

        let (name_h, value_h) = bearer(&token);
        server
            .post("/api/v1/auth/logout")
            .add_header(name_h, value_h)
            .await
            .assert_status_ok();

        let (name_h, value_h) = bearer(&token);
        server
            .get("/api/v1/auth/profile")
            .add_header(name_h, value_h)
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_password_reset_flow() {
        let server = setup_test_server().await;
        let old_token = register_and_login(&server, "forgot@example.com").await;

        let response = server
            .post("/api/v1/auth/forgot-password")
            .json(&json!({ "email": "nobody@example.com" }))
            .await;
        response.assert_status_ok();
        let body: ApiResponse<Value> = response.json();
        assert!(body.data.get("reset_token").is_none());

        let response = server
            .post("/api/v1/auth/forgot-password")
            .json(&json!({ "email": "forgot@example.com" }))
            .await;
        let body: ApiResponse<Value> = response.json();
        let reset_token = body.data["reset_token"].as_str().unwrap().to_string();

        server
            .post("/api/v1/auth/reset-password")
            .json(&json!({ "token": reset_token, "new_password": "brand-new-pass" }))
            .await
            .assert_status_ok();

        let (name_h, value_h) = bearer(&old_token);
        server
            .get("/api/v1/auth/profile")
            .add_header(name_h, value_h)
            .await
            .assert_status(StatusCode::UNAUTHORIZED);

        server
            .post("/api/v1/auth/login")
            .json(&json!({ "email": "forgot@example.com", "password": "brand-new-pass" }))
            .await
            .assert_status_ok();

        server
            .post("/api/v1/auth/reset-password")
            .json(&json!({ "token": reset_token, "new_password": "another-pass" }))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_change_password_and_delete_account() {
        let server = setup_test_server().await;
        let token = register_and_login(&server, "leaving@example.com").await;

        let (name_h, value_h) = bearer(&token);
        let response = server
            .put("/api/v1/auth/change-password")
            .add_header(name_h, value_h)
            .json(&json!({ "current_password": "wrong-one", "new_password": "whatever1" }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);

        let (name_h, value_h) = bearer(&token);
        server
            .put("/api/v1/auth/change-password")
            .add_header(name_h, value_h)
            .json(&json!({ "current_password": TEST_PASSWORD, "new_password": "whatever1" }))
            .await
            .assert_status_ok();

        let (name_h, value_h) = bearer(&token);
        server
            .delete("/api/v1/auth/account")
            .add_header(name_h, value_h)
            .json(&json!({ "password": "whatever1" }))
            .await
            .assert_status_ok();

        server
            .post("/api/v1/auth/login")
            .json(&json!({ "email": "leaving@example.com", "password": "whatever1" }))
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_category_lifecycle() {
        let server = setup_test_server().await;
        let token = register_and_login(&server, "cats@example.com").await;

        let category_id = create_category(&server, &token, "Groceries").await;

        // Same name twice for one owner
        let (name_h, value_h) = bearer(&token);
        let response = server
            .post("/api/v1/categories")
            .add_header(name_h, value_h)
            .json(&json!({ "name": "Groceries" }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: ErrorResponse = response.json();
        assert_eq!(body.code, "DUPLICATE_CATEGORY");

        let (name_h, value_h) = bearer(&token);
        server
            .post("/api/v1/categories")
            .add_header(name_h, value_h)
            .json(&json!({ "name": "Pets", "color": "red" }))
            .await
            .assert_status(StatusCode::BAD_REQUEST);

        let listed = get_data(&server, &token, "/api/v1/categories").await;
        let listed = listed.as_array().unwrap();
        assert_eq!(listed.len(), 11);
        assert!(listed.iter().any(|c| c["id"] == category_id && c["is_custom"] == true));

        let (name_h, value_h) = bearer(&token);
        let response = server
            .put(&format!("/api/v1/categories/{}", category_id))
            .add_header(name_h, value_h)
            .json(&json!({ "name": "Food at home", "color": "#00ff00", "icon": "🥕" }))
            .await;
        response.assert_status_ok();
        let body: ApiResponse<Value> = response.json();
        assert_eq!(body.data["name"], "Food at home");
        assert_eq!(body.data["color"], "#00ff00");

        // Defaults are read-only
        let other = default_category_id(&server, "Other").await;
        let (name_h, value_h) = bearer(&token);
        let response = server
            .put(&format!("/api/v1/categories/{}", other))
            .add_header(name_h, value_h)
            .json(&json!({ "name": "Mine now" }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: ErrorResponse = response.json();
        assert_eq!(body.code, "VALIDATION_ERROR");
        assert_eq!(body.error, "Cannot modify default categories");

        let (name_h, value_h) = bearer(&token);
        let response = server
            .delete(&format!("/api/v1/categories/{}", other))
            .add_header(name_h, value_h)
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: ErrorResponse = response.json();
        assert_eq!(body.error, "Cannot delete default categories");

        // Someone else's category stays invisible
        let stranger = register_and_login(&server, "stranger@example.com").await;
        let (name_h, value_h) = bearer(&stranger);
        server
            .put(&format!("/api/v1/categories/{}", category_id))
            .add_header(name_h, value_h)
            .json(&json!({ "name": "Mine now" }))
            .await
            .assert_status(StatusCode::NOT_FOUND);
        let (name_h, value_h) = bearer(&stranger);
        server
            .delete(&format!("/api/v1/categories/{}", category_id))
            .add_header(name_h, value_h)
            .await
            .assert_status(StatusCode::NOT_FOUND);

        let (name_h, value_h) = bearer(&token);
        server
            .delete(&format!("/api/v1/categories/{}", category_id))
            .add_header(name_h, value_h)
            .await
            .assert_status_ok();

        let (name_h, value_h) = bearer(&token);
        server
            .get(&format!("/api/v1/categories/{}", category_id))
            .add_header(name_h, value_h)
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_category_with_transactions_cannot_be_deleted() {
        let server = setup_test_server().await;
        let token = register_and_login(&server, "blocked@example.com").await;
        let category_id = create_category(&server, &token, "Hobbies").await;
        create_transaction(&server, &token, category_id, "expense", "10.00", "2024-02-01").await;
        create_transaction(&server, &token, category_id, "expense", "12.00", "2024-02-02").await;

        let (name_h, value_h) = bearer(&token);
        let response = server
            .delete(&format!("/api/v1/categories/{}", category_id))
            .add_header(name_h, value_h)
            .await;
        response.assert_status(StatusCode::CONFLICT);
        let body: ErrorResponse = response.json();
        assert_eq!(body.code, "CATEGORY_HAS_TRANSACTIONS");
        assert_eq!(body.details.unwrap()["transaction_count"], 2);

        let category = get_data(&server, &token, &format!("/api/v1/categories/{}", category_id)).await;
        assert_eq!(category["name"], "Hobbies");
    }

    #[tokio::test]
    async fn test_category_stats_echo_period() {
        let server = setup_test_server().await;
        let token = register_and_login(&server, "stats@example.com").await;
        let category_id = create_category(&server, &token, "Coffee").await;
        create_transaction(&server, &token, category_id, "expense", "3.50", "2024-03-02").await;
        create_transaction(&server, &token, category_id, "expense", "4.50", "2024-03-20").await;
        create_transaction(&server, &token, category_id, "expense", "9.99", "2024-04-01").await;

        let stats = get_data(
            &server,
            &token,
            &format!(
                "/api/v1/categories/{}/stats?start_date=2024-03-01&end_date=2024-03-31",
                category_id
            ),
        )
        .await;
        assert_eq!(stats["expense_count"], 2);
        assert_eq!(dec(&stats["total_expenses"]), d("8.00"));
        assert_eq!(dec(&stats["avg_expense"]), d("4.00"));
        assert_eq!(stats["period"]["start_date"], "2024-03-01");
        assert_eq!(stats["period"]["end_date"], "2024-03-31");

        let other_token = register_and_login(&server, "snoop@example.com").await;
        let (name_h, value_h) = bearer(&other_token);
        server
            .get(&format!("/api/v1/categories/{}/stats", category_id))
            .add_header(name_h, value_h)
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_transaction_round_trip_and_isolation() {
        let server = setup_test_server().await;
        let token = register_and_login(&server, "owner@example.com").await;
        let category_id = default_category_id(&server, "Food & Dining").await;

        let (name_h, value_h) = bearer(&token);
        let response = server
            .post("/api/v1/transactions")
            .add_header(name_h, value_h)
            .json(&json!({
                "title": "Lunch",
                "amount": "12.50",
                "category_id": category_id,
                "type": "expense",
                "description": "Ramen",
                "date": "2024-05-10",
            }))
            .await;
        response.assert_status(StatusCode::CREATED);
        let created: ApiResponse<Value> = response.json();
        let id = created.data["id"].as_i64().unwrap();

        let fetched = get_data(&server, &token, &format!("/api/v1/transactions/{}", id)).await;
        assert_eq!(fetched["title"], "Lunch");
        assert_eq!(dec(&fetched["amount"]), d("12.50"));
        assert_eq!(fetched["category_id"], category_id);
        assert_eq!(fetched["type"], "expense");
        assert_eq!(fetched["description"], "Ramen");
        assert_eq!(fetched["date"], "2024-05-10");
        assert_eq!(fetched["category_name"], "Food & Dining");

        let intruder = register_and_login(&server, "intruder@example.com").await;
        let (name_h, value_h) = bearer(&intruder);
        server
            .get(&format!("/api/v1/transactions/{}", id))
            .add_header(name_h, value_h)
            .await
            .assert_status(StatusCode::NOT_FOUND);
        let (name_h, value_h) = bearer(&intruder);
        server
            .delete(&format!("/api/v1/transactions/{}", id))
            .add_header(name_h, value_h)
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_transaction_validation() {
        let server = setup_test_server().await;
        let token = register_and_login(&server, "strict@example.com").await;
        let category_id = default_category_id(&server, "Other").await;

        for amount in ["0", "0.001", "12.345"] {
            let (name_h, value_h) = bearer(&token);
            let response = server
                .post("/api/v1/transactions")
                .add_header(name_h, value_h)
                .json(&json!({
                    "title": "Nothing",
                    "amount": amount,
                    "category_id": category_id,
                    "date": "2024-05-10",
                }))
                .await;
            response.assert_status(StatusCode::BAD_REQUEST);
            let body: ErrorResponse = response.json();
            assert_eq!(body.code, "VALIDATION_ERROR", "amount {amount}");
        }

        let (name_h, value_h) = bearer(&token);
        server
            .post("/api/v1/transactions")
            .add_header(name_h, value_h)
            .json(&json!({
                "title": "Gift",
                "amount": "5.00",
                "category_id": category_id,
                "type": "present",
                "date": "2024-05-10",
            }))
            .await
            .assert_status(StatusCode::BAD_REQUEST);

        // Someone else's category
        let other = register_and_login(&server, "other@example.com").await;
        let private = create_category(&server, &other, "Private").await;
        let (name_h, value_h) = bearer(&token);
        let response = server
            .post("/api/v1/transactions")
            .add_header(name_h, value_h)
            .json(&json!({
                "title": "Sneaky",
                "amount": "5.00",
                "category_id": private,
                "date": "2024-05-10",
            }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: ErrorResponse = response.json();
        assert_eq!(body.code, "INVALID_CATEGORY");
    }

    #[tokio::test]
    async fn test_transaction_listing_pagination_and_filters() {
        let server = setup_test_server().await;
        let token = register_and_login(&server, "lister@example.com").await;
        let food = default_category_id(&server, "Food & Dining").await;
        let income = default_category_id(&server, "Income").await;

        for day in 1..=6 {
            create_transaction(&server, &token, food, "expense", &format!("{}.00", day), &format!("2024-06-0{}", day)).await;
        }
        let (name_h, value_h) = bearer(&token);
        server
            .post("/api/v1/transactions")
            .add_header(name_h, value_h)
            .json(&json!({
                "title": "Monthly SALARY",
                "amount": "3000.00",
                "category_id": income,
                "type": "income",
                "description": "June payroll",
                "date": "2024-06-30",
            }))
            .await
            .assert_status(StatusCode::CREATED);

        let page = get_data(&server, &token, "/api/v1/transactions?limit=3").await;
        assert_eq!(page["items"].as_array().unwrap().len(), 3);
        assert_eq!(page["pagination"]["total_count"], 7);
        assert_eq!(page["pagination"]["total_pages"], 3);
        assert_eq!(page["pagination"]["has_next_page"], true);
        assert_eq!(page["pagination"]["has_prev_page"], false);
        // Newest date first by default
        assert_eq!(page["items"][0]["date"], "2024-06-30");

        let last = get_data(&server, &token, "/api/v1/transactions?limit=3&page=3").await;
        assert_eq!(last["items"].as_array().unwrap().len(), 1);
        assert_eq!(last["pagination"]["has_next_page"], false);
        assert_eq!(last["pagination"]["has_prev_page"], true);

        let searched = get_data(&server, &token, "/api/v1/transactions?search=salary").await;
        assert_eq!(searched["pagination"]["total_count"], 1);

        let ranged = get_data(
            &server,
            &token,
            "/api/v1/transactions?type=expense&min_amount=2&max_amount=4&sort_by=amount&sort_order=asc",
        )
        .await;
        let amounts: Vec<Decimal> = ranged["items"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| dec(&t["amount"]))
            .collect();
        assert_eq!(amounts, vec![d("2"), d("3"), d("4")]);
        assert_eq!(ranged["pagination"]["total_count"], 3);

        let (name_h, value_h) = bearer(&token);
        server
            .get("/api/v1/transactions?sort_by=mood")
            .add_header(name_h, value_h)
            .await
            .assert_status(StatusCode::BAD_REQUEST);

        let (name_h, value_h) = bearer(&token);
        server
            .get("/api/v1/transactions?limit=0")
            .add_header(name_h, value_h)
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_transaction_aggregates() {
        let server = setup_test_server().await;
        let token = register_and_login(&server, "agg@example.com").await;
        let food = default_category_id(&server, "Food & Dining").await;
        let income = default_category_id(&server, "Income").await;

        create_transaction(&server, &token, food, "expense", "20.00", "2024-07-01").await;
        create_transaction(&server, &token, food, "expense", "30.00", "2024-07-15").await;
        create_transaction(&server, &token, income, "income", "500.00", "2024-07-20").await;

        let summary = get_data(
            &server,
            &token,
            "/api/v1/transactions/summary/category?start_date=2024-07-01&end_date=2024-07-31&type=expense",
        )
        .await;
        assert_eq!(summary["type"], "expense");
        let food_row = summary["summary"]
            .as_array()
            .unwrap()
            .iter()
            .find(|row| row["category_id"] == food)
            .cloned()
            .unwrap();
        assert_eq!(food_row["transaction_count"], 2);
        assert_eq!(dec(&food_row["total_amount"]), d("50.00"));

        let stats = get_data(
            &server,
            &token,
            "/api/v1/transactions/stats?start_date=2024-07-01&end_date=2024-07-31",
        )
        .await;
        assert_eq!(dec(&stats["total_expenses"]), d("50.00"));
        // Income counts as a transaction but not as an expense
        assert_eq!(stats["total_transactions"], 3);
        assert_eq!(stats["period"]["start_date"], "2024-07-01");

        let recent = get_data(&server, &token, "/api/v1/transactions/recent?limit=2").await;
        let recent = recent.as_array().unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0]["type"], "income");
    }

    #[tokio::test]
    async fn test_groceries_budget_scenario() {
        let server = setup_test_server().await;
        let token = register_and_login(&server, "groceries@example.com").await;
        let groceries = create_category(&server, &token, "Groceries").await;
        let budget_id = create_budget(&server, &token, groceries, "500.00", "2024-01-01", "2024-01-31").await;

        create_transaction(&server, &token, groceries, "expense", "120.00", "2024-01-05").await;
        create_transaction(&server, &token, groceries, "expense", "80.50", "2024-01-12").await;
        create_transaction(&server, &token, groceries, "expense", "50.00", "2024-01-31").await;
        // Outside the window and income do not count
        create_transaction(&server, &token, groceries, "expense", "99.00", "2024-02-01").await;
        create_transaction(&server, &token, groceries, "income", "1000.00", "2024-01-20").await;

        let budget = get_data(&server, &token, &format!("/api/v1/budgets/{}", budget_id)).await;
        assert_eq!(dec(&budget["spent_amount"]), d("250.50"));
        assert_eq!(dec(&budget["remaining_amount"]), d("249.50"));
        assert_eq!(dec(&budget["usage_percentage"]), d("50.1"));
        assert_eq!(budget["transaction_count"], 3);
        assert_eq!(budget["category_name"], "Groceries");
        assert_eq!(budget["period"], "monthly");
    }

    #[tokio::test]
    async fn test_budget_alerts_follow_threshold() {
        let server = setup_test_server().await;
        let token = register_and_login(&server, "alerts@example.com").await;
        let groceries = create_category(&server, &token, "Groceries").await;

        let today = Utc::now().date_naive();
        let start = (today - Duration::days(10)).to_string();
        let end = (today + Duration::days(10)).to_string();
        let budget_id = create_budget(&server, &token, groceries, "500.00", &start, &end).await;

        let spent_on = today.to_string();
        create_transaction(&server, &token, groceries, "expense", "120.00", &spent_on).await;
        create_transaction(&server, &token, groceries, "expense", "80.50", &spent_on).await;
        create_transaction(&server, &token, groceries, "expense", "50.00", &spent_on).await;

        let alerts = get_data(&server, &token, "/api/v1/budgets/alerts?threshold=80").await;
        assert!(alerts.as_array().unwrap().is_empty());

        create_transaction(&server, &token, groceries, "expense", "200.00", &spent_on).await;
        let alerts = get_data(&server, &token, "/api/v1/budgets/alerts").await;
        let alerts = alerts.as_array().unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0]["id"], budget_id);
        assert_eq!(dec(&alerts[0]["usage_percentage"]), d("90.1"));

        let current = get_data(&server, &token, "/api/v1/budgets/current").await;
        assert_eq!(current.as_array().unwrap().len(), 1);

        // Inactive budgets never alert
        let (name_h, value_h) = bearer(&token);
        server
            .patch(&format!("/api/v1/budgets/{}/toggle", budget_id))
            .add_header(name_h, value_h)
            .await
            .assert_status_ok();
        let alerts = get_data(&server, &token, "/api/v1/budgets/alerts").await;
        assert!(alerts.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_budget_toggle_is_reversible() {
        let server = setup_test_server().await;
        let token = register_and_login(&server, "toggle@example.com").await;
        let category = create_category(&server, &token, "Rent").await;
        let budget_id = create_budget(&server, &token, category, "900.00", "2024-01-01", "2024-12-31").await;

        let mut states = Vec::new();
        for _ in 0..2 {
            let (name_h, value_h) = bearer(&token);
            let response = server
                .patch(&format!("/api/v1/budgets/{}/toggle", budget_id))
                .add_header(name_h, value_h)
                .await;
            response.assert_status_ok();
            let body: ApiResponse<Value> = response.json();
            states.push(body.data["is_active"].as_bool().unwrap());
        }
        assert_eq!(states, vec![false, true]);

        let (name_h, value_h) = bearer(&token);
        server
            .patch("/api/v1/budgets/9999/toggle")
            .add_header(name_h, value_h)
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_budget_conflicts_and_references() {
        let server = setup_test_server().await;
        let token = register_and_login(&server, "budgets@example.com").await;
        let category = create_category(&server, &token, "Travel fund").await;
        create_budget(&server, &token, category, "100.00", "2024-01-01", "2024-01-31").await;

        let (name_h, value_h) = bearer(&token);
        let response = server
            .post("/api/v1/budgets")
            .add_header(name_h, value_h)
            .json(&json!({
                "category_id": category,
                "amount": "250.00",
                "period": "monthly",
                "start_date": "2024-01-01",
                "end_date": "2024-02-15",
            }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: ErrorResponse = response.json();
        assert_eq!(body.code, "DUPLICATE_BUDGET");

        let stranger = register_and_login(&server, "stranger@example.com").await;
        let (name_h, value_h) = bearer(&stranger);
        let response = server
            .post("/api/v1/budgets")
            .add_header(name_h, value_h)
            .json(&json!({
                "category_id": category,
                "amount": "50.00",
                "start_date": "2024-01-01",
                "end_date": "2024-01-31",
            }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: ErrorResponse = response.json();
        assert_eq!(body.code, "INVALID_CATEGORY");

        let (name_h, value_h) = bearer(&token);
        let response = server
            .post("/api/v1/budgets")
            .add_header(name_h, value_h)
            .json(&json!({
                "category_id": category,
                "amount": "50.00",
                "start_date": "2024-03-31",
                "end_date": "2024-03-01",
            }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: ErrorResponse = response.json();
        assert_eq!(body.code, "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_budget_listing_update_summary_and_delete() {
        let server = setup_test_server().await;
        let token = register_and_login(&server, "summary@example.com").await;
        let food = default_category_id(&server, "Food & Dining").await;
        let fun = default_category_id(&server, "Entertainment").await;

        let monthly = create_budget(&server, &token, food, "400.00", "2024-01-01", "2024-01-31").await;
        let yearly = {
            let (name_h, value_h) = bearer(&token);
            let response = server
                .post("/api/v1/budgets")
                .add_header(name_h, value_h)
                .json(&json!({
                    "category_id": fun,
                    "amount": "1200.00",
                    "period": "yearly",
                    "start_date": "2024-01-01",
                    "end_date": "2024-12-31",
                }))
                .await;
            response.assert_status(StatusCode::CREATED);
            let body: ApiResponse<Value> = response.json();
            body.data["id"].as_i64().unwrap()
        };
        create_transaction(&server, &token, food, "expense", "100.00", "2024-01-10").await;

        let yearly_only = get_data(&server, &token, "/api/v1/budgets?period=yearly").await;
        let yearly_only = yearly_only.as_array().unwrap();
        assert_eq!(yearly_only.len(), 1);
        assert_eq!(yearly_only[0]["id"], yearly);

        let (name_h, value_h) = bearer(&token);
        let response = server
            .put(&format!("/api/v1/budgets/{}", monthly))
            .add_header(name_h, value_h)
            .json(&json!({
                "amount": "200.00",
                "period": "monthly",
                "start_date": "2024-01-01",
                "end_date": "2024-01-31",
                "is_active": false,
            }))
            .await;
        response.assert_status_ok();
        let body: ApiResponse<Value> = response.json();
        assert_eq!(dec(&body.data["usage_percentage"]), d("50"));
        assert_eq!(body.data["is_active"], false);

        let summary = get_data(&server, &token, "/api/v1/budgets/summary").await;
        assert_eq!(summary["total_budgets"], 2);
        assert_eq!(summary["active_budgets"], 1);
        assert_eq!(dec(&summary["total_budget_amount"]), d("1400.00"));
        assert_eq!(dec(&summary["total_spent"]), d("100.00"));
        assert_eq!(dec(&summary["avg_usage_percentage"]), d("25"));

        let (name_h, value_h) = bearer(&token);
        server
            .delete(&format!("/api/v1/budgets/{}", monthly))
            .add_header(name_h, value_h)
            .await
            .assert_status_ok();
        let (name_h, value_h) = bearer(&token);
        server
            .get(&format!("/api/v1/budgets/{}", monthly))
            .add_header(name_h, value_h)
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_categories_with_budgets() {
        let server = setup_test_server().await;
        let token = register_and_login(&server, "joined@example.com").await;
        let groceries = create_category(&server, &token, "Groceries").await;
        let budget_id = create_budget(&server, &token, groceries, "300.00", "2024-01-01", "2024-01-31").await;
        create_transaction(&server, &token, groceries, "expense", "45.00", "2024-01-03").await;

        let rows = get_data(&server, &token, "/api/v1/categories/with-budgets").await;
        let rows = rows.as_array().unwrap();
        assert_eq!(rows.len(), 11);
        let row = rows.iter().find(|r| r["id"] == groceries).unwrap();
        assert_eq!(row["budget_id"], budget_id);
        assert_eq!(row["budget_period"], "monthly");
        assert_eq!(dec(&row["spent_amount"]), d("45.00"));
        assert!(rows.iter().filter(|r| r["id"] != groceries).all(|r| r["budget_id"].is_null()));
    }
}
