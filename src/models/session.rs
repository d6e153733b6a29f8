// src/models/session.rs

use serde::{Deserialize, Serialize};

use super::{exam_record::Submitter, user::{Role, UserRecord}};

/// The single active session (`authUser`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub role: Role,
}

impl From<&UserRecord> for Session {
    fn from(u: &UserRecord) -> Self {
        Self {
            id: u.id,
            email: u.email.clone(),
            name: u.full_name(),
            role: u.role,
        }
    }
}

impl From<&Session> for Submitter {
    fn from(s: &Session) -> Self {
        Submitter {
            id: Some(s.id),
            name: Some(s.name.clone()),
            email: Some(s.email.clone()),
            role: Some(s.role.as_str().to_string()),
        }
    }
}

/// UI preferences persisted next to the collections.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    #[serde(default)]
    pub panel_collapsed: bool,
    #[serde(default)]
    pub remembered_email: Option<String>,
}

/// DTO for updating preferences; absent fields stay unchanged.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePreferencesRequest {
    #[serde(default)]
    pub panel_collapsed: Option<bool>,
}
