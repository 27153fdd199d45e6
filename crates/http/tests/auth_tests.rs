//! Login, registration and logout through the client factory

mod common;

use std::sync::Arc;

use common::{RecordingNavigator, refresh_body, valid_token};
use serde_json::json;
use storefront_core::{CredentialPair, CredentialStore, MemoryStore, Service, StorefrontConfig};
use storefront_http::{
    ClientError, ClientFactory, LoginRequest, LogoutReason, RegisterRequest, SessionEvent,
};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct Setup {
    server: MockServer,
    store: Arc<MemoryStore>,
    navigator: Arc<RecordingNavigator>,
    factory: ClientFactory,
}

async fn setup(store: MemoryStore) -> Setup {
    let server = MockServer::start().await;
    let mut config = StorefrontConfig::default();
    config.auth.base_url = server.uri();
    config.auth.landing_route = "/login".into();
    config.services.account = format!("{}/api/v1", server.uri());
    config.services.cart = format!("{}/api/carts", server.uri());

    let store = Arc::new(store);
    let navigator = Arc::new(RecordingNavigator::default());
    let factory = ClientFactory::with_navigator(config, store.clone(), navigator.clone()).unwrap();

    Setup {
        server,
        store,
        navigator,
        factory,
    }
}

fn credentials() -> LoginRequest {
    LoginRequest {
        username: "alice".into(),
        password: "s3cret".into(),
    }
}

#[tokio::test]
async fn test_login_stores_pair_and_announces_it() {
    let setup = setup(MemoryStore::new()).await;
    let access = valid_token("alice");
    let mut events = setup.factory.session().subscribe_events();

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .and(body_json(json!({ "username": "alice", "password": "s3cret" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(refresh_body(&access, "R1")))
        .expect(1)
        .mount(&setup.server)
        .await;

    let pair = setup.factory.auth().login(&credentials()).await.unwrap();

    assert_eq!(pair, CredentialPair::new(access.clone(), "R1"));
    assert_eq!(setup.store.credentials().unwrap(), Some(pair));
    assert_eq!(
        setup.factory.session().authorization(),
        Some(format!("Bearer {access}"))
    );
    assert_eq!(events.try_recv().unwrap(), SessionEvent::LoggedIn);
}

#[tokio::test]
async fn test_rejected_login_stores_nothing() {
    let setup = setup(MemoryStore::new()).await;

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad credentials"))
        .mount(&setup.server)
        .await;

    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(refresh_body("A2", "R2")))
        .expect(0)
        .mount(&setup.server)
        .await;

    let result = setup.factory.auth().login(&credentials()).await;

    assert!(matches!(result, Err(ClientError::AuthenticationFailed(_))));
    assert_eq!(setup.store.credentials().unwrap(), None);
    assert!(setup.navigator.routes().is_empty());

    setup.server.verify().await;
}

#[tokio::test]
async fn test_register_returns_created_account() {
    let setup = setup(MemoryStore::new()).await;

    Mock::given(method("POST"))
        .and(path("/auth/register"))
        .and(body_json(json!({
            "username": "bob",
            "password": "pw",
            "email": "bob@example.com"
        })))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(json!({ "data": { "id": 12, "username": "bob" } })),
        )
        .expect(1)
        .mount(&setup.server)
        .await;

    let request = RegisterRequest {
        username: "bob".into(),
        password: "pw".into(),
        email: Some("bob@example.com".into()),
        extra: serde_json::Map::new(),
    };
    let account = setup.factory.auth().register(&request).await.unwrap();

    assert_eq!(account["id"], 12);
    assert_eq!(setup.store.credentials().unwrap(), None);
}

#[tokio::test]
async fn test_current_user_uses_bearer() {
    let access = valid_token("alice");
    let setup = setup(MemoryStore::with_credentials(&CredentialPair::new(
        access.clone(),
        "R1",
    )))
    .await;

    Mock::given(method("GET"))
        .and(path("/auth/me"))
        .and(header("authorization", format!("Bearer {access}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "id": 1, "username": "alice", "email": "alice@example.com", "roles": ["USER"] }
        })))
        .expect(1)
        .mount(&setup.server)
        .await;

    let profile = setup.factory.auth().current_user().await.unwrap();

    assert_eq!(profile.id, Some(1));
    assert_eq!(profile.username.as_deref(), Some("alice"));
    assert_eq!(profile.extra["roles"], json!(["USER"]));
}

#[tokio::test]
async fn test_logout_clears_credentials_even_if_backend_fails() {
    let access = valid_token("alice");
    let setup = setup(MemoryStore::with_credentials(&CredentialPair::new(
        access.clone(),
        "R1",
    )))
    .await;
    let mut events = setup.factory.session().subscribe_events();

    Mock::given(method("POST"))
        .and(path("/auth/logout"))
        .and(body_json(json!({ "refreshToken": "R1" })))
        .and(header("authorization", format!("Bearer {access}").as_str()))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&setup.server)
        .await;

    setup.factory.auth().logout().await.unwrap();

    assert_eq!(setup.store.credentials().unwrap(), None);
    assert_eq!(setup.navigator.routes(), vec!["/login".to_string()]);
    assert_eq!(
        events.try_recv().unwrap(),
        SessionEvent::LoggedOut {
            reason: LogoutReason::UserRequested
        }
    );

    setup.server.verify().await;
}

#[tokio::test]
async fn test_service_clients_share_the_session() {
    let access = valid_token("alice");
    let setup = setup(MemoryStore::with_credentials(&CredentialPair::new(
        access.clone(),
        "R1",
    )))
    .await;

    Mock::given(method("GET"))
        .and(path("/api/carts/items"))
        .and(header("authorization", format!("Bearer {access}").as_str()))
        .respond_with(ResponseTemplate::new(401))
        .mount(&setup.server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v1/users"))
        .and(header("authorization", format!("Bearer {access}").as_str()))
        .respond_with(ResponseTemplate::new(401))
        .mount(&setup.server)
        .await;

    Mock::given(method("GET"))
        .and(header("authorization", "Bearer A2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
        .expect(2)
        .mount(&setup.server)
        .await;

    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(refresh_body("A2", "R2"))
                .set_delay(std::time::Duration::from_millis(300)),
        )
        .expect(1)
        .mount(&setup.server)
        .await;

    let cart = setup.factory.client_for(Service::Cart, true);
    let users = setup.factory.session_client(Service::Account);

    let (items, accounts) = tokio::join!(
        cart.execute_data::<Vec<serde_json::Value>>(storefront_http::ApiRequest::get("/items")),
        users.execute_data::<Vec<serde_json::Value>>(storefront_http::ApiRequest::get("/users"))
    );

    assert!(items.unwrap().is_empty());
    assert!(accounts.unwrap().is_empty());
    assert_eq!(setup.store.access_token().unwrap().as_deref(), Some("A2"));

    setup.server.verify().await;
}
