// src/services/mod.rs

pub mod auth;
pub mod builder;
pub mod catalog;
pub mod remote;
pub mod report;
pub mod results;
pub mod taker;
pub mod users;
