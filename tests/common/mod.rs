// tests/common/mod.rs
#![allow(dead_code)]

use std::net::SocketAddr;

use reqwest::{Client, Response, header};
use serde_json::{Value, json};
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;
use storefront::{
    config::{Config, HashCost},
    models::user::Role,
    routes,
    services::credentials::{self, NewUser},
    state::AppState,
    utils::hash::hash_password,
};

pub const PASSWORD: &str = "Password123!";

pub struct TestApp {
    pub address: String,
    pub pool: SqlitePool,
    pub config: Config,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.address, path)
    }
}

pub fn test_config() -> Config {
    Config {
        port: 0,
        production: false,
        database_url: "sqlite::memory:".to_string(),
        cookie_secret: "integration-test-cookie-secret".to_string(),
        jwt_access_secret: "integration-test-access-secret".to_string(),
        jwt_access_expiration: 900,
        jwt_refresh_secret: "integration-test-refresh-secret".to_string(),
        jwt_refresh_expiration: 3600,
        hash_cost: HashCost {
            iterations: 1,
            memory_kib: 1024,
        },
        rate_limit_window_secs: 900,
        rate_limit_max: 0,
        max_addresses_per_user: 3,
        cors_origins: vec!["http://localhost:3000".to_string()],
        rust_log: "error".to_string(),
        admin_email: None,
        admin_password: None,
    }
}

/// Spawns the app on a random port over a fresh in-memory database.
pub async fn spawn_app() -> TestApp {
    spawn_app_with(test_config()).await
}

pub async fn spawn_app_with(config: Config) -> TestApp {
    // 1. A single long-lived connection keeps the in-memory database alive
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect(&config.database_url)
        .await
        .expect("Failed to open in-memory SQLite database");

    // 2. Run migrations
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    // 3. Router with state
    let state = AppState::new(pool.clone(), config.clone());
    let app = routes::create_router(state);

    // 4. Bind to port 0 to get a random available port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    // 5. Spawn the server in the background
    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });

    TestApp {
        address,
        pool,
        config,
    }
}

/// Client that keeps cookies between requests, like a browser.
pub fn browser() -> Client {
    Client::builder().cookie_store(true).build().unwrap()
}

pub async fn register(app: &TestApp, client: &Client, email: &str) -> Response {
    client
        .post(app.url("/auth/register"))
        .json(&json!({
            "name": "Test User",
            "email": email,
            "password": PASSWORD,
        }))
        .send()
        .await
        .expect("Failed to execute request")
}

pub async fn login(app: &TestApp, client: &Client, email: &str) -> Response {
    client
        .post(app.url("/auth/login"))
        .json(&json!({ "email": email, "password": PASSWORD }))
        .send()
        .await
        .expect("Failed to execute request")
}

pub async fn access_token(response: Response) -> String {
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    body["data"]["accessToken"].as_str().unwrap().to_string()
}

/// Registers and logs in a customer, returning the access token.
pub async fn customer_token(app: &TestApp, client: &Client, email: &str) -> String {
    let response = register(app, client, email).await;
    assert_eq!(response.status().as_u16(), 201);
    access_token(login(app, client, email).await).await
}

/// Inserts an admin directly and logs in, returning the access token.
pub async fn admin_token(app: &TestApp, client: &Client) -> String {
    let hashed = hash_password(PASSWORD, app.config.hash_cost).unwrap();
    credentials::create_user(
        &app.pool,
        NewUser {
            name: "Admin",
            email: "admin@example.com",
            password_hash: &hashed,
            phone: None,
            gender: None,
            role: Role::Admin,
        },
    )
    .await
    .unwrap();

    access_token(login(app, client, "admin@example.com").await).await
}

/// `refreshToken=<signed value>` as sent in the response's Set-Cookie header.
pub fn refresh_cookie_pair(response: &Response) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find(|value| value.starts_with("refreshToken="))
        .and_then(|value| value.split(';').next())
        .map(str::to_string)
}

pub async fn create_category(app: &TestApp, client: &Client, token: &str, name: &str) -> Value {
    let response = client
        .post(app.url("/categories"))
        .bearer_auth(token)
        .json(&json!({ "name": name }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 201);
    let body: Value = response.json().await.unwrap();
    body["data"].clone()
}

pub fn product_body(category_id: &str, style: Value, price: f64) -> Value {
    json!({
        "productType": "top-wear",
        "category": category_id,
        "gender": "men",
        "style": style,
        "price": price,
        "discount": 10,
        "description": "A comfortable everyday shirt.",
        "images": [{ "type": "fullView", "url": "https://cdn.example.com/shirt.jpg" }],
        "variants": [
            { "color": "Blue", "sizes": [{ "size": "M", "stock": 5 }, { "size": "L", "stock": 2 }] }
        ]
    })
}

pub async fn create_product(app: &TestApp, client: &Client, token: &str, body: &Value) -> Response {
    client
        .post(app.url("/products"))
        .bearer_auth(token)
        .json(body)
        .send()
        .await
        .unwrap()
}
