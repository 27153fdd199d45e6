//! Integration tests for the storefront HTTP clients

mod common;

use std::sync::Arc;

use common::{Harness, valid_token};
use serde::Deserialize;
use serde_json::{Value, json};
use storefront_core::{MemoryStore, Service, StorefrontConfig};
use storefront_http::{
    ApiRequest, ClientError, ClientFactory, PublicClient, SessionOptions, TypedClientBuilder,
};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Debug, Deserialize, PartialEq)]
struct Product {
    id: u32,
    name: String,
}

#[tokio::test]
async fn test_client_builder() {
    let client = TypedClientBuilder::new()
        .base_url("http://localhost:9001/")
        .build_public();

    assert!(client.is_ok());
    let client = client.unwrap();
    assert_eq!(client.base_url(), "http://localhost:9001");
}

#[tokio::test]
async fn test_client_builder_requires_base_url() {
    let result = TypedClientBuilder::new().build_public();
    assert!(matches!(result, Err(ClientError::Configuration(_))));

    let options = SessionOptions::new(Arc::new(MemoryStore::new()), "not a url");
    let result = TypedClientBuilder::new()
        .base_url("http://localhost:9001")
        .build_session(options);
    assert!(matches!(result, Err(ClientError::Configuration(_))));
}

#[tokio::test]
async fn test_public_client_never_sends_credentials() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/products"))
        .and(query_param("page", "1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "data": [{ "id": 1, "name": "Kettle" }] })),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = PublicClient::new(mock_server.uri()).unwrap();
    let products: Vec<Product> = client
        .execute_data(ApiRequest::get("/products").query("page", "1"))
        .await
        .unwrap();

    assert_eq!(
        products,
        vec![Product {
            id: 1,
            name: "Kettle".into()
        }]
    );

    let received = mock_server.received_requests().await.unwrap();
    assert!(
        received
            .iter()
            .all(|request| !request.headers.contains_key("authorization"))
    );
}

#[tokio::test]
async fn test_public_client_passes_401_through() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/item"))
        .respond_with(ResponseTemplate::new(401).set_body_string("login required"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = PublicClient::new(mock_server.uri()).unwrap();
    let result = client
        .post::<_, Value>("/item", &json!({ "productId": 3 }))
        .await;

    match result {
        Err(ClientError::AuthenticationFailed(message)) => assert_eq!(message, "login required"),
        other => panic!("expected authentication failure, got {other:?}"),
    }
}

#[tokio::test]
async fn test_session_client_attaches_bearer() {
    let access = valid_token("alice");
    let harness = Harness::with_credentials(&access, "R1").await;

    Mock::given(method("PUT"))
        .and(path("/orders/5/status"))
        .and(header("authorization", format!("Bearer {access}").as_str()))
        .and(body_json(json!({ "status": "SHIPPED" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": { "id": 5 } })))
        .expect(1)
        .mount(&harness.server)
        .await;

    let order: Value = harness
        .client
        .put("/orders/5/status", &json!({ "status": "SHIPPED" }))
        .await
        .unwrap();

    assert_eq!(order["data"]["id"], 5);
    harness.server.verify().await;
}

#[tokio::test]
async fn test_error_status_mapping() {
    let access = valid_token("alice");
    let harness = Harness::with_credentials(&access, "R1").await;

    for (route, status) in [("/missing", 404), ("/bad", 400), ("/denied", 403), ("/boom", 503)] {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(status).set_body_string("nope"))
            .mount(&harness.server)
            .await;
    }

    let client = &harness.client;
    assert!(matches!(
        client.get::<Value>("/missing").await,
        Err(ClientError::NotFound(_))
    ));
    assert!(matches!(
        client.get::<Value>("/bad").await,
        Err(ClientError::BadRequest(_))
    ));
    assert!(matches!(
        client.get::<Value>("/denied").await,
        Err(ClientError::Forbidden(_))
    ));

    let err = client.get::<Value>("/boom").await.unwrap_err();
    assert_eq!(err.status(), Some(503));
    assert!(!err.is_auth_expired());

    // None of these touch the session
    assert!(harness.navigator.routes().is_empty());
}

#[tokio::test]
async fn test_missing_envelope_data_is_a_serialization_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/inventory-items/count"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "count": 4 })))
        .mount(&mock_server)
        .await;

    let client = PublicClient::new(mock_server.uri()).unwrap();
    let result = client
        .execute_data::<u64>(ApiRequest::get("/inventory-items/count"))
        .await;

    assert!(matches!(result, Err(ClientError::Serialization(_))));
}

#[tokio::test]
async fn test_empty_success_body_decodes_as_null() {
    let mock_server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/products/3"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&mock_server)
        .await;

    let client = PublicClient::new(mock_server.uri()).unwrap();
    let body: Value = client.delete("/products/3").await.unwrap();
    assert_eq!(body, Value::Null);
}

#[tokio::test]
async fn test_guest_client_from_factory() {
    let mock_server = MockServer::start().await;
    let mut config = StorefrontConfig::default();
    config.services.cart = format!("{}/api/carts", mock_server.uri());

    Mock::given(method("GET"))
        .and(path("/api/carts/guest/abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": { "items": [] } })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let factory = ClientFactory::new(config, Arc::new(MemoryStore::new())).unwrap();
    let guest = factory.client_for(Service::Cart, false);
    assert!(!guest.is_authenticated());

    let cart: Value = guest
        .execute_data(ApiRequest::get("/guest/abc"))
        .await
        .unwrap();
    assert_eq!(cart, json!({ "items": [] }));

    mock_server.verify().await;
}
