// src/handlers/mod.rs

pub mod auth;
pub mod catalog;
pub mod exams;
pub mod preferences;
pub mod results;
pub mod taker;
pub mod users;
