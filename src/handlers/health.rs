// src/handlers/health.rs

use serde_json::Value;

use crate::response::ApiResponse;

pub async fn health_check() -> ApiResponse<Value> {
    ApiResponse::message("Server is running")
}
