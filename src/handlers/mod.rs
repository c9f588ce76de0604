// src/handlers/mod.rs

pub mod auth;
pub mod categories;
pub mod health;
pub mod products;
pub mod reviews;
pub mod users;
