// src/models/mod.rs

pub mod category;
pub mod product;
pub mod review;
pub mod user;
