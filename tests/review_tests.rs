// tests/review_tests.rs

mod common;

use common::{
    TestApp, admin_token, create_category, create_product, customer_token, product_body, spawn_app,
};
use reqwest::{Client, Response};
use serde_json::{Value, json};

async fn seeded_product(app: &TestApp, client: &Client) -> String {
    let admin = admin_token(app, client).await;
    let shirts = create_category(app, client, &admin, "Shirts").await;
    let body = product_body(shirts["id"].as_str().unwrap(), json!({ "fit": "Slim" }), 999.0);
    let created: Value = create_product(app, client, &admin, &body)
        .await
        .json()
        .await
        .unwrap();
    created["data"]["id"].as_str().unwrap().to_string()
}

async fn post_review(
    app: &TestApp,
    client: &Client,
    token: &str,
    product_id: &str,
    body: Value,
) -> Response {
    client
        .post(app.url(&format!("/products/{}/reviews", product_id)))
        .bearer_auth(token)
        .json(&body)
        .send()
        .await
        .unwrap()
}

async fn ratings(app: &TestApp, client: &Client, product_id: &str) -> Value {
    let response = client
        .get(app.url(&format!("/products/{}", product_id)))
        .send()
        .await
        .unwrap();
    let body: Value = response.json().await.unwrap();
    body["data"]["ratings"].clone()
}

#[tokio::test]
async fn ratings_follow_reviews() {
    let app = spawn_app().await;
    let client = Client::new();
    let product_id = seeded_product(&app, &client).await;

    assert_eq!(ratings(&app, &client, &product_id).await, json!({ "average": 0.0, "count": 0 }));

    let mut three_star = None;
    for (email, rating) in [("a@example.com", 5), ("b@example.com", 3), ("c@example.com", 4)] {
        let token = customer_token(&app, &client, email).await;
        let response =
            post_review(&app, &client, &token, &product_id, json!({ "rating": rating })).await;
        assert_eq!(response.status().as_u16(), 201);
        if rating == 3 {
            let body: Value = response.json().await.unwrap();
            let id = body["data"]["id"].as_str().unwrap().to_string();
            three_star = Some((token, id));
        }
    }

    assert_eq!(ratings(&app, &client, &product_id).await, json!({ "average": 4.0, "count": 3 }));

    // Deleting the 3-star review moves the average up
    let (token, review_id) = three_star.unwrap();
    let response = client
        .delete(app.url(&format!("/products/{}/reviews/{}", product_id, review_id)))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    assert_eq!(ratings(&app, &client, &product_id).await, json!({ "average": 4.5, "count": 2 }));
}

#[tokio::test]
async fn averages_are_rounded_to_one_decimal() {
    let app = spawn_app().await;
    let client = Client::new();
    let product_id = seeded_product(&app, &client).await;

    for (email, rating) in [("a@example.com", 5), ("b@example.com", 4), ("c@example.com", 4)] {
        let token = customer_token(&app, &client, email).await;
        post_review(&app, &client, &token, &product_id, json!({ "rating": rating })).await;
    }

    assert_eq!(ratings(&app, &client, &product_id).await, json!({ "average": 4.3, "count": 3 }));
}

#[tokio::test]
async fn one_review_per_user_per_product() {
    let app = spawn_app().await;
    let client = Client::new();
    let product_id = seeded_product(&app, &client).await;
    let token = customer_token(&app, &client, "asha@example.com").await;

    let response = post_review(
        &app,
        &client,
        &token,
        &product_id,
        json!({ "rating": 4, "comment": "Fits well." }),
    )
    .await;
    assert_eq!(response.status().as_u16(), 201);

    let response = post_review(&app, &client, &token, &product_id, json!({ "rating": 2 })).await;
    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(
        body["message"],
        "You have already submitted a review for this product."
    );

    assert_eq!(ratings(&app, &client, &product_id).await["count"], 1);
}

#[tokio::test]
async fn reviews_are_validated() {
    let app = spawn_app().await;
    let client = Client::new();
    let product_id = seeded_product(&app, &client).await;
    let token = customer_token(&app, &client, "asha@example.com").await;

    let response = post_review(&app, &client, &token, &product_id, json!({ "rating": 6 })).await;
    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["errors"][0]["path"], "rating");

    let response = post_review(
        &app,
        &client,
        &token,
        &product_id,
        json!({ "rating": 3, "comment": "x".repeat(501) }),
    )
    .await;
    assert_eq!(response.status().as_u16(), 400);

    // Anonymous
    let response = client
        .post(app.url(&format!("/products/{}/reviews", product_id)))
        .json(&json!({ "rating": 3 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 401);

    // Unknown product
    let response = post_review(
        &app,
        &client,
        &token,
        &uuid::Uuid::new_v4().to_string(),
        json!({ "rating": 3 }),
    )
    .await;
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn only_the_author_can_change_a_review() {
    let app = spawn_app().await;
    let client = Client::new();
    let product_id = seeded_product(&app, &client).await;
    let author = customer_token(&app, &client, "asha@example.com").await;
    let other = customer_token(&app, &client, "ravi@example.com").await;

    let response = post_review(&app, &client, &author, &product_id, json!({ "rating": 2 })).await;
    let body: Value = response.json().await.unwrap();
    let review_url = app.url(&format!(
        "/products/{}/reviews/{}",
        product_id,
        body["data"]["id"].as_str().unwrap()
    ));

    // 1. Someone else
    let response = client
        .patch(&review_url)
        .bearer_auth(&other)
        .json(&json!({ "rating": 5 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 401);

    let response = client.delete(&review_url).bearer_auth(&other).send().await.unwrap();
    assert_eq!(response.status().as_u16(), 401);

    // 2. Empty update
    let response = client
        .patch(&review_url)
        .bearer_auth(&author)
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);

    // 3. The author, and the aggregate follows
    let response = client
        .patch(&review_url)
        .bearer_auth(&author)
        .json(&json!({ "rating": 5, "comment": "<b>Better</b> after a wash." }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["rating"], 5);

    assert_eq!(ratings(&app, &client, &product_id).await, json!({ "average": 5.0, "count": 1 }));
}

#[tokio::test]
async fn reviews_are_listed_with_author_names() {
    let app = spawn_app().await;
    let client = Client::new();
    let product_id = seeded_product(&app, &client).await;

    for email in ["a@example.com", "b@example.com"] {
        let token = customer_token(&app, &client, email).await;
        post_review(&app, &client, &token, &product_id, json!({ "rating": 4 })).await;
    }

    let response = client
        .get(app.url(&format!("/products/{}/reviews", product_id)))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["count"], 2);
    let first = &body["data"]["reviews"][0];
    assert_eq!(first["userName"], "Test User");
    assert_eq!(first["productId"], product_id.as_str());
    assert_eq!(first["rating"], 4);

    // Deleting the product takes its reviews along
    let admin_login = client
        .post(app.url("/auth/login"))
        .json(&json!({ "email": "admin@example.com", "password": common::PASSWORD }))
        .send()
        .await
        .unwrap();
    let admin = common::access_token(admin_login).await;
    let response = client
        .delete(app.url(&format!("/products/{}", product_id)))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reviews")
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(count, 0);
}
