// src/models/exam.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::question::{Question, QuestionDto};

/// One scored exam as held in the `generatedExams` collection.
///
/// Deserialization goes through [`StoredExam`], so older records that keep
/// their questions under `items` (or their theme under `examTopic`) load into
/// this canonical shape and never leak past the store boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "StoredExam")]
pub struct ExamDefinition {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub exam_name: Option<String>,
    pub exam_theme: Option<String>,
    /// Training category code (`th1`..`th8`).
    pub skill_training: Option<String>,
    pub clinical_case: Option<String>,
    pub exam_rules: Option<String>,
    pub total_points: f64,
    /// Order matters: answers refer to questions by index.
    pub questions: Vec<Question>,
    pub share_url: String,
    /// Shared by every exam authored in the same batch; equals `id` when standalone.
    pub group_id: i64,
    pub group_size: usize,
}

impl ExamDefinition {
    /// Sum of each question's maximum points.
    pub fn question_points(&self) -> f64 {
        self.questions.iter().map(|q| q.total_points).sum()
    }

    pub fn display_name(&self) -> String {
        self.exam_name
            .clone()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| format!("Prova {}", self.id))
    }
}

/// Every shape an exam record has been persisted in.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredExam {
    id: i64,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    exam_name: Option<String>,
    #[serde(default)]
    exam_theme: Option<String>,
    #[serde(default)]
    exam_topic: Option<String>,
    #[serde(default)]
    skill_training: Option<String>,
    #[serde(default)]
    clinical_case: Option<String>,
    #[serde(default)]
    exam_rules: Option<String>,
    #[serde(default)]
    total_points: Option<f64>,
    #[serde(default)]
    questions: Option<Vec<Question>>,
    #[serde(default)]
    items: Option<Vec<Question>>,
    #[serde(default)]
    share_url: Option<String>,
    #[serde(default)]
    group_id: Option<i64>,
    #[serde(default)]
    group_size: Option<usize>,
}

impl From<StoredExam> for ExamDefinition {
    fn from(e: StoredExam) -> Self {
        let questions = match (e.questions, e.items) {
            (Some(qs), _) if !qs.is_empty() => qs,
            (_, Some(items)) => items,
            (Some(qs), None) => qs,
            (None, None) => Vec::new(),
        };

        let derived_total: f64 = questions.iter().map(|q| q.total_points).sum();
        let total_points = match e.total_points {
            Some(t) if t != 0.0 || questions.is_empty() => t,
            _ => derived_total,
        };

        // Ids are creation-time milliseconds, so they double as a fallback timestamp.
        let created_at = e
            .created_at
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|d| d.with_timezone(&Utc))
            .or_else(|| DateTime::from_timestamp_millis(e.id))
            .unwrap_or_default();

        Self {
            id: e.id,
            created_at,
            exam_name: e.exam_name,
            exam_theme: e.exam_theme.or(e.exam_topic),
            skill_training: e.skill_training,
            clinical_case: e.clinical_case,
            exam_rules: e.exam_rules,
            total_points,
            questions,
            share_url: e.share_url.unwrap_or_default(),
            group_id: e.group_id.unwrap_or(e.id),
            group_size: e.group_size.unwrap_or(1).max(1),
        }
    }
}

/// Payload for `POST /exams`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamCreateDto {
    #[serde(default)]
    pub exam_name: Option<String>,
    #[serde(default)]
    pub exam_theme: Option<String>,
    #[serde(default)]
    pub skill_training: Option<String>,
    #[serde(default)]
    pub clinical_case: Option<String>,
    #[serde(default)]
    pub exam_rules: Option<String>,
    #[serde(default)]
    pub questions: Vec<QuestionDto>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by_id: Option<i64>,
}

/// Payload for `POST /exam-groups`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamGroupCreateDto {
    #[serde(default)]
    pub title: Option<String>,
    pub exams: Vec<ExamCreateDto>,
}

/// Response of `POST /exam-groups`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGroupResponse {
    pub group_id: i64,
    pub group_share_url: String,
    pub exams: Vec<ExamDefinition>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_items_are_normalized() {
        let raw = r#"{
            "id": 1700000000000,
            "createdAt": "2024-01-01T10:00:00.000Z",
            "examName": "Cardio",
            "examTopic": "Arritmias",
            "skillTraining": "th2",
            "clinicalCase": null,
            "examRules": null,
            "shareUrl": "",
            "items": [
                {"text": "Q1", "options": [{"value": 0}, {"value": 1}]},
                {"text": "Q2", "options": [{"value": 0}, {"value": 1}]}
            ]
        }"#;

        let exam: ExamDefinition = serde_json::from_str(raw).unwrap();
        assert_eq!(exam.questions.len(), 2);
        assert_eq!(exam.questions[0].total_points, 1.0);
        assert_eq!(exam.total_points, 2.0);
        assert_eq!(exam.exam_theme.as_deref(), Some("Arritmias"));
        assert_eq!(exam.group_id, exam.id);
        assert_eq!(exam.group_size, 1);
    }

    #[test]
    fn canonical_record_survives_a_store_round_trip() {
        let raw = r#"{
            "id": 42,
            "createdAt": "2024-05-01T12:30:00Z",
            "examName": "Neuro",
            "examTheme": "AVC",
            "skillTraining": "th1",
            "clinicalCase": "Caso",
            "examRules": "Regras",
            "totalPoints": 3,
            "questions": [
                {"text": "Q1", "options": [{"value": 0}, {"value": 0.5}, {"value": 1}], "totalPoints": 1},
                {"text": "Q2", "options": [{"value": 0}, {"value": 0.5}, {"value": 1}], "totalPoints": 1},
                {"text": "Q3", "options": [{"value": 0}, {"value": 0.5}, {"value": 1}], "totalPoints": 1}
            ],
            "shareUrl": "http://localhost/private/responder-prova?groupId=40",
            "groupId": 40,
            "groupSize": 3
        }"#;

        let exam: ExamDefinition = serde_json::from_str(raw).unwrap();
        let again: ExamDefinition =
            serde_json::from_str(&serde_json::to_string(&exam).unwrap()).unwrap();

        assert_eq!(exam, again);
        assert_eq!(again.group_id, 40);
        assert_eq!(again.question_points(), 3.0);
    }

    #[test]
    fn missing_created_at_falls_back_to_id_timestamp() {
        let exam: ExamDefinition = serde_json::from_str(r#"{"id": 1700000000000}"#).unwrap();
        assert_eq!(exam.created_at.timestamp_millis(), 1_700_000_000_000);
        assert!(exam.questions.is_empty());
        assert_eq!(exam.total_points, 0.0);
    }
}
