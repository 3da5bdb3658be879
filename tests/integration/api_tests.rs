//! API integration tests
//!
//! Run against a server started on a freshly migrated database.

use reqwest::Client;
use serde_json::{json, Value};

const BASE_URL: &str = "http://localhost:8080/api/v1";

/// Helper to get a counter staff token for the seeded admin
async fn get_admin_token(client: &Client) -> String {
    let response = client
        .post(format!("{}/admin/login", BASE_URL))
        .json(&json!({
            "name": "admin",
            "phone": "0900000000"
        }))
        .send()
        .await
        .expect("Failed to send login request");

    let body: Value = response.json().await.expect("Failed to parse login response");
    body["token"].as_str().expect("No token in response").to_string()
}

/// Phone number unlikely to collide between runs
fn unique_phone() -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .subsec_nanos();
    format!("09{:08}", nanos % 100_000_000)
}

async fn create_member(
    client: &Client,
    token: &str,
    name: &str,
    phone: &str,
    balance: &str,
) -> Value {
    let response = client
        .post(format!("{}/admin/members", BASE_URL))
        .bearer_auth(token)
        .json(&json!({
            "name": name,
            "phone": phone,
            "initial_balance": balance
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 201);
    response.json().await.expect("Failed to parse response")
}

async fn create_book(client: &Client, token: &str, name: &str, copies: i32) -> Value {
    let response = client
        .post(format!("{}/admin/books", BASE_URL))
        .bearer_auth(token)
        .json(&json!({
            "name": name,
            "author": "Integration",
            "price": "200",
            "copies_count": copies
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 201);
    response.json().await.expect("Failed to parse response")
}

async fn member_token(client: &Client, name: &str, phone: &str) -> String {
    let response = client
        .post(format!("{}/member/login", BASE_URL))
        .json(&json!({ "name": name, "phone": phone }))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("Failed to parse response");
    body["token"].as_str().expect("No token in response").to_string()
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_health_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/health", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
#[ignore]
async fn test_admin_login() {
    let client = Client::new();

    let response = client
        .post(format!("{}/admin/login", BASE_URL))
        .json(&json!({
            "name": "admin",
            "phone": "0900000000"
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["token"].is_string());
    assert_eq!(body["token_type"], "Bearer");
    assert_eq!(body["admin"]["name"], "admin");
}

#[tokio::test]
#[ignore]
async fn test_login_wrong_phone() {
    let client = Client::new();

    let response = client
        .post(format!("{}/admin/login", BASE_URL))
        .json(&json!({
            "name": "admin",
            "phone": "0911111111"
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 401);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["code"], "INVALID_PASSWORD");
}

#[tokio::test]
#[ignore]
async fn test_unauthorized_access() {
    let client = Client::new();

    let response = client
        .get(format!("{}/admin/members/search", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 401);
}

#[tokio::test]
#[ignore]
async fn test_duplicate_member_rejected() {
    let client = Client::new();
    let token = get_admin_token(&client).await;
    let phone = unique_phone();

    create_member(&client, &token, "Duplicate Check", &phone, "0").await;

    let response = client
        .post(format!("{}/admin/members", BASE_URL))
        .bearer_auth(&token)
        .json(&json!({ "name": "Duplicate Check", "phone": phone }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 409);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["code"], "MEMBER_ALREADY_EXISTS");
}

#[tokio::test]
#[ignore]
async fn test_checkout_return_and_renew() {
    let client = Client::new();
    let token = get_admin_token(&client).await;
    let phone = unique_phone();

    let member = create_member(&client, &token, "Loan Flow", &phone, "1000").await;
    let member_id = member["member_id"].as_i64().unwrap();
    let created = create_book(&client, &token, "Loan Flow Book", 2).await;
    let book_id = created["book"]["book_id"].as_i64().unwrap();

    // Silver level: 0.90 of a 200 rental price
    let response = client
        .post(format!("{}/admin/loans", BASE_URL))
        .bearer_auth(&token)
        .json(&json!({
            "member_id": member_id,
            "items": [{ "book_id": book_id, "copies_serial": 1 }]
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);
    let loan: Value = response.json().await.unwrap();
    let final_price: f64 = loan["final_price"].as_str().unwrap().parse().unwrap();
    assert_eq!(final_price, 180.0);
    let loan_id = loan["loan_id"].as_i64().unwrap();

    // The same copy cannot be lent twice
    let response = client
        .post(format!("{}/admin/loans", BASE_URL))
        .bearer_auth(&token)
        .json(&json!({
            "member_id": member_id,
            "items": [{ "book_id": book_id, "copies_serial": 1 }]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "COPY_NOT_AVAILABLE");

    // The member renews on their own
    let member_token = member_token(&client, "Loan Flow", &phone).await;
    let response = client
        .post(format!(
            "{}/member/loans/{}/items/{}/1/renew",
            BASE_URL, loan_id, book_id
        ))
        .bearer_auth(&member_token)
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
    let renewed: Value = response.json().await.unwrap();
    assert_eq!(renewed["renew_cnt"], 1);

    // Returned in Fair condition: damage fee recorded, copy back on the shelf
    let response = client
        .post(format!(
            "{}/admin/loans/{}/items/{}/1/return",
            BASE_URL, loan_id, book_id
        ))
        .bearer_auth(&token)
        .json(&json!({ "final_condition": "Fair" }))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
    let returned: Value = response.json().await.unwrap();
    assert_eq!(returned["copy_status"], "Available");
    assert_eq!(returned["book_condition"], "Fair");

    let response = client
        .post(format!(
            "{}/admin/loans/{}/items/{}/1/return",
            BASE_URL, loan_id, book_id
        ))
        .bearer_auth(&token)
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "ALREADY_RETURNED");
}

#[tokio::test]
#[ignore]
async fn test_reservation_fulfilment() {
    let client = Client::new();
    let token = get_admin_token(&client).await;
    let phone = unique_phone();

    let member = create_member(&client, &token, "Reserver", &phone, "500").await;
    let member_id = member["member_id"].as_i64().unwrap();
    let created = create_book(&client, &token, "Reserved Book", 1).await;
    let book_id = created["book"]["book_id"].as_i64().unwrap();

    let member_token = member_token(&client, "Reserver", &phone).await;
    let response = client
        .post(format!("{}/reservations", BASE_URL))
        .bearer_auth(&member_token)
        .json(&json!({ "book_ids": [book_id, book_id] }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "DUPLICATE_BOOK_IDS");

    let response = client
        .post(format!("{}/reservations", BASE_URL))
        .bearer_auth(&member_token)
        .json(&json!({ "book_ids": [book_id] }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);
    let reservation: Value = response.json().await.unwrap();
    let reservation_id = reservation["reservation_id"].as_i64().unwrap();

    let response = client
        .post(format!(
            "{}/admin/reservations/{}/fulfill",
            BASE_URL, reservation_id
        ))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
    let loan: Value = response.json().await.unwrap();
    assert_eq!(loan["member_id"], member_id);
    assert_eq!(loan["items"].as_array().unwrap().len(), 1);

    let response = client
        .get(format!("{}/member/reservations", BASE_URL))
        .bearer_auth(&member_token)
        .send()
        .await
        .unwrap();
    let reservations: Value = response.json().await.unwrap();
    assert_eq!(reservations[0]["status"], "Fulfilled");
}

#[tokio::test]
#[ignore]
async fn test_top_books() {
    let client = Client::new();

    let response = client
        .get(format!("{}/stats/top-books?limit=5", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());
    let body: Value = response.json().await.unwrap();
    assert!(body.as_array().unwrap().len() <= 5);
}

#[tokio::test]
#[ignore]
async fn test_batch_return_keeps_successful_items() {
    let client = Client::new();
    let token = get_admin_token(&client).await;
    let phone = unique_phone();

    let member = create_member(&client, &token, "Batch Return", &phone, "1000").await;
    let member_id = member["member_id"].as_i64().unwrap();
    let created = create_book(&client, &token, "Batch Return Book", 2).await;
    let book_id = created["book"]["book_id"].as_i64().unwrap();

    let response = client
        .post(format!("{}/admin/loans", BASE_URL))
        .bearer_auth(&token)
        .json(&json!({
            "member_id": member_id,
            "items": [
                { "book_id": book_id, "copies_serial": 1 },
                { "book_id": book_id, "copies_serial": 2 }
            ]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);
    let loan: Value = response.json().await.unwrap();
    let loan_id = loan["loan_id"].as_i64().unwrap();

    // The second entry names a copy that is not part of the loan
    let response = client
        .post(format!("{}/admin/loans/batch-return", BASE_URL))
        .bearer_auth(&token)
        .json(&json!({
            "items": [
                { "loan_id": loan_id, "book_id": book_id, "copies_serial": 1 },
                { "loan_id": loan_id, "book_id": book_id, "copies_serial": 99 },
                { "loan_id": loan_id, "book_id": book_id, "copies_serial": 2 }
            ]
        }))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
    let batch: Value = response.json().await.unwrap();
    assert_eq!(batch["success_count"], 2);
    assert_eq!(batch["fail_count"], 1);
    assert_eq!(batch["results"][1]["error"]["code"], "LOAN_ITEM_NOT_FOUND");

    let response = client
        .get(format!("{}/admin/loans/{}/records", BASE_URL, loan_id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let records: Value = response.json().await.unwrap();
    let records = records.as_array().unwrap();
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| r["return_date"].is_string()));
}

#[tokio::test]
#[ignore]
async fn test_search_prices_book_with_every_copy_lent() {
    let client = Client::new();
    let token = get_admin_token(&client).await;
    let phone = unique_phone();

    let member = create_member(&client, &token, "All Lent", &phone, "1000").await;
    let member_id = member["member_id"].as_i64().unwrap();
    let name = format!("AllLent{}", phone);
    let created = create_book(&client, &token, &name, 1).await;
    let book_id = created["book"]["book_id"].as_i64().unwrap();

    let response = client
        .post(format!("{}/admin/loans", BASE_URL))
        .bearer_auth(&token)
        .json(&json!({
            "member_id": member_id,
            "items": [{ "book_id": book_id, "copies_serial": 1 }]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);

    let response = client
        .get(format!("{}/books?keyword={}", BASE_URL, name))
        .send()
        .await
        .unwrap();
    let books: Value = response.json().await.unwrap();
    let book = &books.as_array().unwrap()[0];
    assert_eq!(book["available_count"], 0);
    assert!(book["estimated_min_rental_price"].is_string());
}
