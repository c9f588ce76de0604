// src/services/mod.rs

pub mod credentials;
pub mod identity;
pub mod rating;
