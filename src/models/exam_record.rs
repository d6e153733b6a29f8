// src/models/exam_record.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Represents one entry of the `examResponses` collection.
/// One record per exam per submission; never mutated once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "StoredResponse")]
pub struct ResponseRecord {
    pub exam_id: i64,

    /// Absent on older records; resolved through the referenced exam.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<i64>,

    /// Shared by every record written in the same submission.
    pub submitted_at: DateTime<Utc>,

    /// One entry per question, in question order.
    pub answers: Vec<Answer>,

    pub total: f64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub submitted_by: Option<Submitter>,
}

/// Stored shape; `total` may be missing on older records.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredResponse {
    exam_id: i64,
    #[serde(default)]
    group_id: Option<i64>,
    submitted_at: DateTime<Utc>,
    #[serde(default)]
    answers: Vec<Answer>,
    #[serde(default)]
    total: Option<f64>,
    #[serde(default)]
    submitted_by: Option<Submitter>,
}

impl From<StoredResponse> for ResponseRecord {
    fn from(r: StoredResponse) -> Self {
        let total = r
            .total
            .unwrap_or_else(|| r.answers.iter().map(|a| a.points).sum());
        Self {
            exam_id: r.exam_id,
            group_id: r.group_id,
            submitted_at: r.submitted_at,
            answers: r.answers,
            total,
            submitted_by: r.submitted_by,
        }
    }
}

/// Points are resolved from the selected option when submitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    pub question_index: usize,
    #[serde(default)]
    pub selected_option_index: Option<usize>,
    #[serde(default)]
    pub points: f64,
}

/// Identity snapshot of whoever was signed in at submission time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Submitter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

impl Submitter {
    /// Name, else email, else a generic label.
    pub fn label(&self) -> String {
        self.name
            .clone()
            .filter(|n| !n.is_empty())
            .or_else(|| self.email.clone())
            .unwrap_or_else(|| "Usuário".to_string())
    }
}

/// DTO for submitting answers to one exam or a whole group.
///
/// `selections[i][q]` is the option index picked for question `q` of the
/// `i`-th resolved exam; `null` means unanswered.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAnswersRequest {
    #[serde(default)]
    pub exam_id: Option<i64>,
    #[serde(default)]
    pub group_id: Option<i64>,
    pub selections: Vec<Vec<Option<usize>>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_total_is_summed_from_answers() {
        let raw = r#"{
            "examId": 7,
            "submittedAt": "2024-05-01T12:00:00.000Z",
            "answers": [
                {"questionIndex": 0, "selectedOptionIndex": 2, "points": 1},
                {"questionIndex": 1, "selectedOptionIndex": 1, "points": 0.5},
                {"questionIndex": 2, "selectedOptionIndex": null}
            ],
            "submittedBy": {"email": "ana@x.com"}
        }"#;

        let record: ResponseRecord = serde_json::from_str(raw).unwrap();
        assert_eq!(record.total, 1.5);
        assert_eq!(record.group_id, None);
        assert_eq!(record.answers[2].points, 0.0);
        assert_eq!(record.submitted_by.unwrap().label(), "ana@x.com");
    }
}
