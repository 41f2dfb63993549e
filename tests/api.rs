//! End-to-end HTTP tests over the in-memory store.

use axum_test::TestServer;
use serde_json::{json, Value};
use std::sync::Arc;
use stockroom::{app, AppState, Catalog, MemoryStore};

fn server() -> TestServer {
    server_with_token(None)
}

fn server_with_token(api_token: Option<&str>) -> TestServer {
    let state = AppState::new(
        Arc::new(MemoryStore::new()),
        Catalog::builtin(),
        api_token.map(str::to_string),
    );
    TestServer::new(app(state)).expect("test server")
}

fn acme() -> Value {
    json!({
        "name": "Acme",
        "contact": {"phone": "1234567890", "email": "a@acme.com"},
        "address": {"street": "1 Main St", "city": "Lahore", "country": "PK"}
    })
}

#[tokio::test]
async fn health_endpoint_is_open() {
    let server = server();
    let res = server.get("/health").await;
    res.assert_status_ok();
    assert_eq!(res.json::<Value>()["status"], json!("ok"));
}

#[tokio::test]
async fn create_supplier_assigns_first_domain_id() {
    let server = server();
    let res = server.post("/suppliers").json(&acme()).await;
    assert_eq!(res.status_code(), 201);
    let body = res.json::<Value>();
    assert_eq!(body["success"], json!(true));
    let data = &body["data"];
    let domain_id = data["supplierID"].as_str().unwrap();
    assert!(
        regex::Regex::new(r"^SP-\d{5}$").unwrap().is_match(domain_id),
        "{}",
        domain_id
    );
    assert_eq!(data["name"], json!("Acme"));
    // Public shape only: no status or timestamps.
    assert!(data.get("status").is_none());
    assert!(data.get("createdAt").is_none());
    assert!(data["supplier_Id"].is_string());
}

#[tokio::test]
async fn client_supplied_domain_id_is_ignored() {
    let server = server();
    let mut body = acme();
    body["supplierID"] = json!("SP-99999");
    let res = server.post("/suppliers").json(&body).await;
    assert_eq!(res.status_code(), 201);
    assert_eq!(res.json::<Value>()["data"]["supplierID"], json!("SP-00001"));
}

#[tokio::test]
async fn domain_id_lookup_on_empty_store_is_404() {
    let server = server();
    let res = server.get("/suppliers/supplierID/SP-00001").await;
    assert_eq!(res.status_code(), 404);
    let body = res.json::<Value>();
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["errorCode"], json!("NOT_FOUND"));
    assert_eq!(body["statusCode"], json!(404));
    let error = body["error"].as_str().unwrap();
    assert!(error.contains("not found"), "{}", error);
}

#[tokio::test]
async fn domain_id_lookup_roundtrip() {
    let server = server();
    server.post("/suppliers").json(&acme()).await;
    let res = server.get("/suppliers/supplierID/SP-00001").await;
    res.assert_status_ok();
    assert_eq!(res.json::<Value>()["data"]["name"], json!("Acme"));
}

#[tokio::test]
async fn malformed_domain_id_is_a_validation_error() {
    let server = server();
    let res = server.get("/suppliers/supplierID/SP-1").await;
    assert_eq!(res.status_code(), 400);
    assert_eq!(res.json::<Value>()["errorCode"], json!("VALIDATION_ERROR"));
}

#[tokio::test]
async fn status_filter_scopes_the_list() {
    let server = server();
    for (name, status) in [("A", "Active"), ("B", "Blocked"), ("C", "Active")] {
        let res = server
            .post("/suppliers")
            .json(&json!({"name": name, "status": status}))
            .await;
        assert_eq!(res.status_code(), 201);
    }
    let res = server.get("/suppliers").add_query_param("status", "Blocked").await;
    res.assert_status_ok();
    let body = res.json::<Value>();
    let suppliers = body["data"]["suppliers"].as_array().unwrap();
    assert_eq!(suppliers.len(), 1);
    assert_eq!(suppliers[0]["name"], json!("B"));
    assert_eq!(body["data"]["pagination"]["total"], json!(1));
}

#[tokio::test]
async fn empty_list_is_200_not_404() {
    let server = server();
    let res = server.get("/suppliers").await;
    res.assert_status_ok();
    let body = res.json::<Value>();
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["message"], json!("No suppliers found"));
    assert_eq!(body["data"]["suppliers"], json!([]));
    assert_eq!(body["data"]["pagination"]["totalPages"], json!(0));
}

#[tokio::test]
async fn page_beyond_total_pages_is_200_and_empty() {
    let server = server();
    server.post("/suppliers").json(&acme()).await;
    let res = server
        .get("/suppliers")
        .add_query_param("page", "50")
        .add_query_param("limit", "10")
        .await;
    res.assert_status_ok();
    let body = res.json::<Value>();
    assert_eq!(body["data"]["suppliers"], json!([]));
    assert_eq!(body["data"]["pagination"]["totalPages"], json!(1));
    assert_eq!(body["data"]["pagination"]["page"], json!(50));
}

#[tokio::test]
async fn extreme_page_and_limit_values_do_not_error() {
    let server = server();
    server.post("/suppliers").json(&acme()).await;
    let res = server
        .get("/suppliers")
        .add_query_param("page", "18446744073709551615")
        .add_query_param("limit", "18446744073709551615")
        .await;
    res.assert_status_ok();
    let body = res.json::<Value>();
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["data"]["suppliers"], json!([]));
    assert_eq!(body["data"]["pagination"]["total"], json!(1));
}

#[tokio::test]
async fn pagination_math_is_exact() {
    let server = server();
    for i in 0..11 {
        server
            .post("/suppliers")
            .json(&json!({"name": format!("S{:02}", i)}))
            .await;
    }
    let res = server.get("/suppliers").add_query_param("limit", "4").await;
    let body = res.json::<Value>();
    assert_eq!(body["data"]["pagination"]["total"], json!(11));
    assert_eq!(body["data"]["pagination"]["totalPages"], json!(3));
    assert_eq!(body["data"]["suppliers"].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn two_field_violations_come_back_together() {
    let server = server();
    let res = server
        .post("/suppliers")
        .json(&json!({"name": "", "contact": {"email": "nope"}}))
        .await;
    assert_eq!(res.status_code(), 400);
    let body = res.json::<Value>();
    assert_eq!(body["errorCode"], json!("VALIDATION_ERROR"));
    let errors = body["error"].as_array().unwrap();
    assert_eq!(errors.len(), 2, "{:?}", errors);
    // The error array carries plain message strings, not violation objects.
    assert!(errors.iter().all(Value::is_string), "{:?}", errors);
    assert!(errors.iter().any(|e| e.as_str().unwrap().contains("name")));
    assert!(errors
        .iter()
        .any(|e| e.as_str().unwrap().contains("contact.email")));
}

#[tokio::test]
async fn malformed_internal_id_is_400_never_500() {
    let server = server();
    let res = server.get("/suppliers/not-a-hex-id").await;
    assert_eq!(res.status_code(), 400);
    let body = res.json::<Value>();
    assert_eq!(body["errorCode"], json!("VALIDATION_ERROR"));
    assert_eq!(body["statusCode"], json!(400));
}

#[tokio::test]
async fn duplicate_email_is_a_conflict() {
    let server = server();
    let res = server.post("/suppliers").json(&acme()).await;
    assert_eq!(res.status_code(), 201);
    let mut second = acme();
    second["name"] = json!("Other");
    let res = server.post("/suppliers").json(&second).await;
    assert_eq!(res.status_code(), 409);
    assert_eq!(res.json::<Value>()["errorCode"], json!("CONFLICT"));
}

#[tokio::test]
async fn update_preserves_domain_id_and_applies_patch() {
    let server = server();
    let created = server.post("/suppliers").json(&acme()).await.json::<Value>();
    let id = created["data"]["supplier_Id"].as_str().unwrap().to_string();

    let res = server
        .put(&format!("/suppliers/{}", id))
        .json(&json!({"name": "Acme Ltd", "supplierID": "SP-99999"}))
        .await;
    res.assert_status_ok();
    let body = res.json::<Value>();
    assert_eq!(body["data"]["name"], json!("Acme Ltd"));
    assert_eq!(body["data"]["supplierID"], json!("SP-00001"));
}

#[tokio::test]
async fn update_of_missing_supplier_is_404() {
    let server = server();
    let res = server
        .put("/suppliers/665f1c2b9d3e4a5b6c7d8e9f")
        .json(&json!({"name": "Ghost"}))
        .await;
    assert_eq!(res.status_code(), 404);
}

#[tokio::test]
async fn delete_twice_is_200_then_404() {
    let server = server();
    let created = server.post("/suppliers").json(&acme()).await.json::<Value>();
    let id = created["data"]["supplier_Id"].as_str().unwrap().to_string();

    let res = server.delete(&format!("/suppliers/{}", id)).await;
    res.assert_status_ok();
    assert_eq!(res.json::<Value>()["success"], json!(true));

    let res = server.delete(&format!("/suppliers/{}", id)).await;
    assert_eq!(res.status_code(), 404);
    assert_eq!(res.json::<Value>()["errorCode"], json!("NOT_FOUND"));
}

#[tokio::test]
async fn deleting_a_supplier_does_not_recycle_its_domain_id() {
    let server = server();
    server.post("/suppliers").json(&json!({"name": "One"})).await;
    let second = server
        .post("/suppliers")
        .json(&json!({"name": "Two"}))
        .await
        .json::<Value>();
    assert_eq!(second["data"]["supplierID"], json!("SP-00002"));
    let id = second["data"]["supplier_Id"].as_str().unwrap().to_string();
    server.delete(&format!("/suppliers/{}", id)).await;

    let third = server
        .post("/suppliers")
        .json(&json!({"name": "Three"}))
        .await
        .json::<Value>();
    assert_eq!(third["data"]["supplierID"], json!("SP-00003"));
}

#[tokio::test]
async fn bulk_delete_reports_count() {
    let server = server();
    for name in ["A", "B", "C"] {
        server.post("/suppliers").json(&json!({"name": name})).await;
    }
    let res = server.delete("/suppliers").await;
    res.assert_status_ok();
    assert_eq!(res.json::<Value>()["data"]["deletedCount"], json!(3));
    let res = server.get("/suppliers").await;
    assert_eq!(res.json::<Value>()["data"]["pagination"]["total"], json!(0));
}

#[tokio::test]
async fn search_requires_a_term_of_two_characters() {
    let server = server();
    let res = server.get("/suppliers/search").await;
    assert_eq!(res.status_code(), 400);
    let res = server.get("/suppliers/search").add_query_param("term", "a").await;
    assert_eq!(res.status_code(), 400);
}

#[tokio::test]
async fn search_matches_substrings_without_pagination() {
    let server = server();
    server.post("/suppliers").json(&acme()).await;
    server
        .post("/suppliers")
        .json(&json!({"name": "Globex"}))
        .await;
    let res = server.get("/suppliers/search").add_query_param("term", "ACM").await;
    res.assert_status_ok();
    let body = res.json::<Value>();
    let hits = body["data"]["suppliers"].as_array().unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0]["name"], json!("Acme"));
    assert!(body["data"].get("pagination").is_none());
}

#[tokio::test]
async fn unknown_resource_is_404() {
    let server = server();
    let res = server.get("/gizmos").await;
    assert_eq!(res.status_code(), 404);
    assert_eq!(res.json::<Value>()["errorCode"], json!("NOT_FOUND"));
}

#[tokio::test]
async fn resources_have_independent_sequences() {
    let server = server();
    server.post("/suppliers").json(&json!({"name": "S"})).await;
    let product = server
        .post("/products")
        .json(&json!({"name": "Widget", "price": 10}))
        .await
        .json::<Value>();
    assert_eq!(product["data"]["productID"], json!("PR-00001"));
    let warehouse = server
        .post("/warehouses")
        .json(&json!({"name": "Main", "status": "Maintenance"}))
        .await
        .json::<Value>();
    assert_eq!(warehouse["data"]["warehouseID"], json!("WH-00001"));
}

#[tokio::test]
async fn bearer_token_gate_when_configured() {
    let server = server_with_token(Some("sekrit"));
    let res = server.get("/suppliers").await;
    assert_eq!(res.status_code(), 401);
    assert_eq!(res.json::<Value>()["errorCode"], json!("UNAUTHORIZED"));

    let res = server
        .get("/suppliers")
        .add_header(
            axum::http::header::AUTHORIZATION,
            axum::http::HeaderValue::from_static("Bearer sekrit"),
        )
        .await;
    res.assert_status_ok();

    // Health stays open.
    let res = server.get("/health").await;
    res.assert_status_ok();
}

#[tokio::test]
async fn user_passwords_never_appear_in_responses() {
    let server = server();
    let res = server
        .post("/users")
        .json(&json!({
            "name": "Sam",
            "email": "sam@acme.com",
            "password": "supersecret",
            "confirmPassword": "supersecret"
        }))
        .await;
    assert_eq!(res.status_code(), 201);
    let body = res.json::<Value>();
    assert!(body["data"].get("password").is_none());
    assert_eq!(body["data"]["userID"], json!("USR-00001"));

    let res = server.get("/users").await;
    let users = res.json::<Value>()["data"]["users"].clone();
    assert!(users[0].get("password").is_none());
}

#[tokio::test]
async fn transfer_to_same_warehouse_is_rejected() {
    let server = server();
    let id = "665f1c2b9d3e4a5b6c7d8e9f";
    let res = server
        .post("/inventory-transfers")
        .json(&json!({
            "inventory": id,
            "fromWarehouse": id,
            "toWarehouse": id,
            "quantity": 3
        }))
        .await;
    assert_eq!(res.status_code(), 400);
    let errors = res.json::<Value>()["error"].as_array().unwrap().clone();
    assert!(errors
        .iter()
        .any(|e| e.as_str().unwrap().contains("toWarehouse")));
}
