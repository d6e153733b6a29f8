// src/models/question.rs

use serde::{Deserialize, Serialize};

/// One selectable answer; `value` is the points awarded when chosen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "StoredOption")]
pub struct ExamOption {
    pub value: f64,
}

#[derive(Deserialize)]
struct StoredOption {
    #[serde(default)]
    value: Option<f64>,
}

impl From<StoredOption> for ExamOption {
    fn from(o: StoredOption) -> Self {
        Self {
            value: o.value.unwrap_or(0.0),
        }
    }
}

/// A prompt plus the ordered options cloned from its exam's template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "StoredQuestion")]
pub struct Question {
    pub text: String,
    pub options: Vec<ExamOption>,
    /// Maximum selectable points for this question.
    pub total_points: f64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredQuestion {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    options: Option<Vec<ExamOption>>,
    #[serde(default)]
    total_points: Option<f64>,
}

impl From<StoredQuestion> for Question {
    fn from(q: StoredQuestion) -> Self {
        let options = q.options.unwrap_or_default();
        let total_points = q
            .total_points
            .unwrap_or_else(|| max_value(&options));
        Self {
            text: q.text.unwrap_or_default(),
            options,
            total_points,
        }
    }
}

impl Question {
    /// Points for `selected`; unset or out-of-range indices are worth 0.
    pub fn points_for(&self, selected: Option<usize>) -> f64 {
        selected
            .and_then(|idx| self.options.get(idx))
            .map(|o| o.value)
            .unwrap_or(0.0)
    }
}

/// Highest option value, or 0 for an empty list.
pub fn max_value(options: &[ExamOption]) -> f64 {
    options
        .iter()
        .map(|o| o.value)
        .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |m| m.max(v))))
        .unwrap_or(0.0)
}

/// Wire DTO for one option.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionDto {
    pub value: f64,
}

/// Wire DTO for one question (prompt and options).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionDto {
    pub text: String,
    pub options: Vec<OptionDto>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_total_is_rederived_from_options() {
        let q: Question =
            serde_json::from_str(r#"{"text":"A","options":[{"value":0},{"value":2.5},{"value":null}]}"#)
                .unwrap();
        assert_eq!(q.total_points, 2.5);
        assert_eq!(q.options[2].value, 0.0);
    }

    #[test]
    fn points_for_ignores_bad_indices() {
        let q: Question =
            serde_json::from_str(r#"{"text":"A","options":[{"value":0},{"value":1}],"totalPoints":1}"#)
                .unwrap();
        assert_eq!(q.points_for(Some(1)), 1.0);
        assert_eq!(q.points_for(Some(7)), 0.0);
        assert_eq!(q.points_for(None), 0.0);
    }
}
