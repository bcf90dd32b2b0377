// src/handlers/mod.rs

pub mod auth;
pub mod exam;
pub mod question;
pub mod stats;
