// src/models/user.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Canonical roles. Any stored spelling of "admin" maps to `Admin`;
/// everything else (`Professor`, `professor`, ...) maps to `Professor`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum Role {
    Professor,
    Admin,
}

impl From<String> for Role {
    fn from(raw: String) -> Self {
        Role::parse(&raw)
    }
}

impl Role {
    pub fn parse(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("admin") {
            Role::Admin
        } else {
            Role::Professor
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Professor => "professor",
            Role::Admin => "admin",
        }
    }
}

/// Represents one entry of the `users` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: i64,

    #[serde(default)]
    pub first_name: String,

    #[serde(default)]
    pub last_name: String,

    /// Login key, stored trimmed and lower-cased.
    pub email: String,

    /// Argon2 hash. Records written by the browser build hold plaintext.
    #[serde(default)]
    pub password: String,

    pub role: Role,

    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl UserRecord {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// User as returned by the admin API (no password).
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: Role,
    pub created_at: Option<DateTime<Utc>>,
}

impl From<&UserRecord> for PublicUser {
    fn from(u: &UserRecord) -> Self {
        Self {
            id: u.id,
            first_name: u.first_name.clone(),
            last_name: u.last_name.clone(),
            email: u.email.clone(),
            role: u.role,
            created_at: u.created_at,
        }
    }
}

/// DTO for creating a user from the admin panel.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    #[validate(length(min = 2, max = 80, message = "First name must have at least 2 characters."))]
    pub first_name: String,
    #[validate(length(min = 2, max = 80, message = "Last name must have at least 2 characters."))]
    pub last_name: String,
    #[validate(email(message = "Invalid email address."))]
    pub email: String,
    #[validate(length(min = 6, max = 128, message = "Password must have at least 6 characters."))]
    pub password: String,
    pub role: Role,
}

/// DTO for login.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email address."))]
    pub email: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
    /// Keep the email pre-filled on the next visit.
    #[serde(default)]
    pub remember: bool,
}

/// Counters shown on the user panel.
#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub total: usize,
    pub professors: usize,
    pub admins: usize,
    pub unique_emails: usize,
    pub last_created_at: Option<DateTime<Utc>>,
}
