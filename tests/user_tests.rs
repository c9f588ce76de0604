// tests/user_tests.rs

mod common;

use common::{customer_token, spawn_app};
use reqwest::Client;
use serde_json::{Value, json};

fn address(label: &str) -> Value {
    json!({
        "label": label,
        "area": "MG Road",
        "city": "Bengaluru",
        "state": "Karnataka",
        "postalCode": "560001"
    })
}

#[tokio::test]
async fn address_book_is_capped_and_labels_are_unique() {
    let app = spawn_app().await;
    let client = Client::new();
    let token = customer_token(&app, &client, "asha@example.com").await;

    for label in ["Home", "Office", "Gym"] {
        let response = client
            .post(app.url("/users/me/addresses"))
            .bearer_auth(&token)
            .json(&address(label))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 201);
    }

    // Cap reached
    let response = client
        .post(app.url("/users/me/addresses"))
        .bearer_auth(&token)
        .json(&address("Parents"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "You can only have a maximum of 3 addresses.");

    let response = client
        .get(app.url("/users/me"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let body: Value = response.json().await.unwrap();
    let addresses = body["data"]["addresses"].as_array().unwrap();
    assert_eq!(addresses.len(), 3);
    assert_eq!(addresses[0]["label"], "home");
    assert_eq!(addresses[0]["country"], "India");
}

#[tokio::test]
async fn duplicate_address_label_is_rejected() {
    let app = spawn_app().await;
    let client = Client::new();
    let token = customer_token(&app, &client, "asha@example.com").await;

    let first = client
        .post(app.url("/users/me/addresses"))
        .bearer_auth(&token)
        .json(&address("Home"))
        .send()
        .await
        .unwrap();
    assert_eq!(first.status().as_u16(), 201);

    let second = client
        .post(app.url("/users/me/addresses"))
        .bearer_auth(&token)
        .json(&address("  HOME "))
        .send()
        .await
        .unwrap();
    assert_eq!(second.status().as_u16(), 400);
}

#[tokio::test]
async fn last_address_cannot_be_deleted() {
    let app = spawn_app().await;
    let client = Client::new();
    let token = customer_token(&app, &client, "asha@example.com").await;

    let mut ids = Vec::new();
    for label in ["Home", "Office"] {
        let response = client
            .post(app.url("/users/me/addresses"))
            .bearer_auth(&token)
            .json(&address(label))
            .send()
            .await
            .unwrap();
        let body: Value = response.json().await.unwrap();
        let created = body["data"]
            .as_array()
            .unwrap()
            .iter()
            .find(|a| a["label"] == label.to_lowercase())
            .unwrap()["id"]
            .as_str()
            .unwrap()
            .to_string();
        ids.push(created);
    }

    // 1. Deleting one of two works
    let response = client
        .delete(app.url(&format!("/users/me/addresses/{}", ids[0])))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    // 2. The last one is protected
    let response = client
        .delete(app.url(&format!("/users/me/addresses/{}", ids[1])))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "You must have at least one address.");

    // 3. Already deleted, and malformed ids, are 404
    let response = client
        .delete(app.url(&format!("/users/me/addresses/{}", ids[0])))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);

    let response = client
        .delete(app.url("/users/me/addresses/not-an-id"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn addresses_belong_to_their_owner() {
    let app = spawn_app().await;
    let client = Client::new();
    let asha = customer_token(&app, &client, "asha@example.com").await;
    let ravi = customer_token(&app, &client, "ravi@example.com").await;

    let response = client
        .post(app.url("/users/me/addresses"))
        .bearer_auth(&asha)
        .json(&address("Home"))
        .send()
        .await
        .unwrap();
    let body: Value = response.json().await.unwrap();
    let id = body["data"][0]["id"].as_str().unwrap().to_string();

    let response = client
        .patch(app.url(&format!("/users/me/addresses/{}", id)))
        .bearer_auth(&ravi)
        .json(&json!({ "city": "Mysuru" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);

    let response = client
        .patch(app.url(&format!("/users/me/addresses/{}", id)))
        .bearer_auth(&asha)
        .json(&json!({ "city": "Mysuru", "label": "Flat" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["city"], "Mysuru");
    assert_eq!(body["data"]["label"], "flat");
    assert_eq!(body["data"]["area"], "MG Road");
}

#[tokio::test]
async fn update_me_changes_only_given_fields() {
    let app = spawn_app().await;
    let client = Client::new();
    let token = customer_token(&app, &client, "asha@example.com").await;

    let response = client
        .patch(app.url("/users/me"))
        .bearer_auth(&token)
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "No valid fields provided for update.");

    let response = client
        .patch(app.url("/users/me"))
        .bearer_auth(&token)
        .json(&json!({ "phone": "9876543210", "gender": "female" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["phone"], "9876543210");
    assert_eq!(body["data"]["gender"], "female");
    assert_eq!(body["data"]["name"], "Test User");

    // Phone numbers are unique across users
    let other = customer_token(&app, &client, "ravi@example.com").await;
    let response = client
        .patch(app.url("/users/me"))
        .bearer_auth(&other)
        .json(&json!({ "phone": "9876543210" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(
        body["message"],
        "A record with this phone already exists. Please use a different phone."
    );
}
