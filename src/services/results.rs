// src/services/results.rs

//! Joins exam definitions with their responses into result cards.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{
    exam::ExamDefinition,
    exam_record::{Answer, ResponseRecord, Submitter},
};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub max: f64,
    pub avg: f64,
    pub best: f64,
    pub worst: f64,
    pub count: usize,
    pub last_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamTotal {
    pub exam_id: i64,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamAnswers {
    pub exam_id: i64,
    pub answers: Vec<Answer>,
}

/// Records of one composite group that share a `submitted_at`, seen as one submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CombinedSubmission {
    pub submitted_at: DateTime<Utc>,
    pub total: f64,
    pub totals_by_exam: Vec<ExamTotal>,
    pub per_exam_answers: Vec<ExamAnswers>,
    /// First submitter found in the bucket.
    pub submitted_by: Option<Submitter>,
}

impl CombinedSubmission {
    pub fn total_for(&self, exam_id: i64) -> f64 {
        self.totals_by_exam
            .iter()
            .find(|t| t.exam_id == exam_id)
            .map_or(0.0, |t| t.total)
    }

    pub fn answers_for(&self, exam_id: i64) -> &[Answer] {
        self.per_exam_answers
            .iter()
            .find(|a| a.exam_id == exam_id)
            .map_or(&[], |a| a.answers.as_slice())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimpleCard {
    pub exam: ExamDefinition,
    /// Newest first.
    pub submissions: Vec<ResponseRecord>,
    pub stats: Stats,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositeCard {
    pub group_id: i64,
    pub exams: Vec<ExamDefinition>,
    /// Newest first.
    pub submissions: Vec<CombinedSubmission>,
    pub stats: Stats,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ResultCard {
    Simple(SimpleCard),
    Composite(CompositeCard),
}

impl ResultCard {
    pub fn stats(&self) -> &Stats {
        match self {
            ResultCard::Simple(c) => &c.stats,
            ResultCard::Composite(c) => &c.stats,
        }
    }

    pub fn group_id(&self) -> i64 {
        match self {
            ResultCard::Simple(c) => c.exam.group_id,
            ResultCard::Composite(c) => c.group_id,
        }
    }

    /// Exam name, or for composites `"{first name} (+n)"`.
    pub fn title(&self) -> String {
        match self {
            ResultCard::Simple(c) => c.exam.display_name(),
            ResultCard::Composite(c) => {
                let base = c
                    .exams
                    .first()
                    .and_then(|e| e.exam_name.clone())
                    .unwrap_or_else(|| "Prova composta".to_string());
                if c.exams.len() > 1 {
                    format!("{} (+{})", base, c.exams.len() - 1)
                } else {
                    base
                }
            }
        }
    }

    /// Creation time; the earliest member's for composites.
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        match self {
            ResultCard::Simple(c) => Some(c.exam.created_at),
            ResultCard::Composite(c) => c.exams.iter().map(|e| e.created_at).min(),
        }
    }

    pub fn question_count(&self) -> usize {
        match self {
            ResultCard::Simple(c) => c.exam.questions.len(),
            ResultCard::Composite(c) => c.exams.iter().map(|e| e.questions.len()).sum(),
        }
    }
}

/// Restricts which cards are produced.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultsFilter {
    #[serde(default)]
    pub exam_id: Option<i64>,
    #[serde(default)]
    pub group_id: Option<i64>,
}

/// `round(total / max * 100)%`, or `"0%"` when `max` is 0.
pub fn percent(total: f64, max: f64) -> String {
    if max == 0.0 || !max.is_finite() {
        return "0%".to_string();
    }
    let p = (total / max * 100.0).round();
    format!("{}%", if p.is_finite() { p as i64 } else { 0 })
}

fn compute_stats(max: f64, totals: &[f64], last_at: Option<DateTime<Utc>>) -> Stats {
    let count = totals.len();
    let best = totals.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let worst = totals.iter().copied().fold(f64::INFINITY, f64::min);
    let avg = if count == 0 {
        0.0
    } else {
        let mean = totals.iter().sum::<f64>() / count as f64;
        (mean * 10.0).round() / 10.0
    };

    Stats {
        max,
        avg,
        best: if count == 0 { 0.0 } else { best },
        worst: if count == 0 { 0.0 } else { worst },
        count,
        last_at,
    }
}

/// Buckets a group's responses by exact submission time.
fn combine(responses: &[&ResponseRecord]) -> Vec<CombinedSubmission> {
    let mut order: Vec<DateTime<Utc>> = Vec::new();
    let mut buckets: HashMap<DateTime<Utc>, Vec<&ResponseRecord>> = HashMap::new();
    for &r in responses {
        buckets
            .entry(r.submitted_at)
            .or_insert_with(|| {
                order.push(r.submitted_at);
                Vec::new()
            })
            .push(r);
    }

    let mut combined: Vec<CombinedSubmission> = order
        .into_iter()
        .filter_map(|at| buckets.remove(&at).map(|list| (at, list)))
        .map(|(submitted_at, list)| CombinedSubmission {
            submitted_at,
            total: list.iter().map(|r| r.total).sum(),
            totals_by_exam: list
                .iter()
                .map(|r| ExamTotal { exam_id: r.exam_id, total: r.total })
                .collect(),
            per_exam_answers: list
                .iter()
                .map(|r| ExamAnswers { exam_id: r.exam_id, answers: r.answers.clone() })
                .collect(),
            submitted_by: list.iter().find_map(|r| r.submitted_by.clone()),
        })
        .collect();

    combined.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
    combined
}

/// Builds result cards for every group that has at least one submission,
/// most recently answered first.
pub fn aggregate(
    exams: &[ExamDefinition],
    responses: &[ResponseRecord],
    filter: ResultsFilter,
) -> Vec<ResultCard> {
    let mut exams: Vec<&ExamDefinition> = exams.iter().collect();
    exams.sort_by(|a, b| b.id.cmp(&a.id));

    let mut responses: Vec<&ResponseRecord> = responses.iter().collect();
    responses.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));

    let exam_by_id: HashMap<i64, &ExamDefinition> = exams.iter().map(|e| (e.id, *e)).collect();
    let group_of_response = |r: &ResponseRecord| {
        r.group_id
            .or_else(|| exam_by_id.get(&r.exam_id).map(|e| e.group_id))
            .unwrap_or(r.exam_id)
    };

    let mut group_order: Vec<i64> = Vec::new();
    let mut exams_by_group: HashMap<i64, Vec<&ExamDefinition>> = HashMap::new();
    for exam in exams {
        if filter.exam_id.is_some_and(|id| exam.id != id)
            || filter.group_id.is_some_and(|gid| exam.group_id != gid)
        {
            continue;
        }
        exams_by_group
            .entry(exam.group_id)
            .or_insert_with(|| {
                group_order.push(exam.group_id);
                Vec::new()
            })
            .push(exam);
    }

    let mut responses_by_group: HashMap<i64, Vec<&ResponseRecord>> = HashMap::new();
    for r in responses {
        if filter.exam_id.is_some_and(|id| r.exam_id != id) {
            continue;
        }
        responses_by_group.entry(group_of_response(r)).or_default().push(r);
    }

    let mut cards = Vec::new();
    for gid in group_order {
        let Some(group_responses) = responses_by_group.get(&gid).filter(|r| !r.is_empty()) else {
            continue;
        };
        let group_exams = &exams_by_group[&gid];

        if let [exam] = group_exams.as_slice() {
            let submissions: Vec<ResponseRecord> = group_responses
                .iter()
                .filter(|r| r.exam_id == exam.id)
                .map(|r| (*r).clone())
                .collect();
            if submissions.is_empty() {
                continue;
            }

            let totals: Vec<f64> = submissions.iter().map(|s| s.total).collect();
            let last_at = submissions.first().map(|s| s.submitted_at);
            cards.push(ResultCard::Simple(SimpleCard {
                exam: (*exam).clone(),
                stats: compute_stats(exam.total_points, &totals, last_at),
                submissions,
            }));
        } else {
            let submissions = combine(group_responses);
            let max = group_exams.iter().map(|e| e.total_points).sum();
            let totals: Vec<f64> = submissions.iter().map(|s| s.total).collect();
            let last_at = submissions.first().map(|s| s.submitted_at);
            cards.push(ResultCard::Composite(CompositeCard {
                group_id: gid,
                exams: group_exams.iter().map(|e| (*e).clone()).collect(),
                stats: compute_stats(max, &totals, last_at),
                submissions,
            }));
        }
    }

    cards.sort_by(|a, b| b.stats().last_at.cmp(&a.stats().last_at));
    cards
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn exam(id: i64, group_id: Option<i64>, total: f64) -> ExamDefinition {
        let mut value = serde_json::json!({
            "id": id,
            "examName": format!("Prova {}", id),
            "totalPoints": total,
            "questions": [
                {"text": "Q1", "options": [{"value": 0}, {"value": 1}], "totalPoints": 1}
            ]
        });
        if let Some(gid) = group_id {
            value["groupId"] = serde_json::json!(gid);
        }
        serde_json::from_value(value).unwrap()
    }

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, 9, minute, 0).unwrap()
    }

    fn response(exam_id: i64, group_id: Option<i64>, minute: u32, total: f64) -> ResponseRecord {
        ResponseRecord {
            exam_id,
            group_id,
            submitted_at: at(minute),
            answers: vec![Answer { question_index: 0, selected_option_index: Some(1), points: total }],
            total,
            submitted_by: None,
        }
    }

    #[test]
    fn percent_guards_zero_max() {
        assert_eq!(percent(5.0, 0.0), "0%");
        assert_eq!(percent(1.5, 3.0), "50%");
        assert_eq!(percent(2.0, 3.0), "67%");
        assert_eq!(percent(3.0, 3.0), "100%");
    }

    #[test]
    fn simple_card_statistics() {
        let exams = vec![exam(1, None, 3.0)];
        let responses = vec![
            response(1, None, 1, 1.0),
            response(1, Some(1), 5, 2.5),
            response(1, None, 3, 2.0),
        ];

        let cards = aggregate(&exams, &responses, ResultsFilter::default());
        assert_eq!(cards.len(), 1);
        let ResultCard::Simple(card) = &cards[0] else { panic!("expected simple card") };

        assert_eq!(card.stats.max, 3.0);
        assert_eq!(card.stats.count, 3);
        assert_eq!(card.stats.best, 2.5);
        assert_eq!(card.stats.worst, 1.0);
        assert_eq!(card.stats.avg, 1.8);
        assert_eq!(card.stats.last_at, Some(at(5)));
        assert_eq!(card.submissions[0].submitted_at, at(5));
    }

    #[test]
    fn composite_submissions_are_bucketed_by_timestamp() {
        let exams = vec![exam(11, Some(10), 2.0), exam(12, Some(10), 4.0)];
        let mut with_submitter = response(12, Some(10), 7, 3.0);
        with_submitter.submitted_by = Some(Submitter { name: Some("Bia".into()), ..Default::default() });
        let responses = vec![
            response(11, Some(10), 7, 1.0),
            with_submitter,
            response(11, None, 2, 2.0),
            response(12, None, 2, 4.0),
        ];

        let cards = aggregate(&exams, &responses, ResultsFilter::default());
        assert_eq!(cards.len(), 1);
        let ResultCard::Composite(card) = &cards[0] else { panic!("expected composite card") };

        assert_eq!(card.stats.max, 6.0);
        assert_eq!(card.stats.count, 2);
        assert_eq!(card.submissions[0].submitted_at, at(7));
        assert_eq!(card.submissions[0].total, 4.0);
        assert_eq!(card.submissions[0].total_for(12), 3.0);
        assert_eq!(card.submissions[0].submitted_by.as_ref().unwrap().label(), "Bia");
        assert_eq!(card.submissions[1].total, 6.0);
        assert_eq!(card.stats.best, 6.0);
        assert_eq!(card.stats.avg, 5.0);
        assert_eq!(cards[0].title(), "Prova 12 (+1)");
        assert_eq!(cards[0].question_count(), 2);
    }

    #[test]
    fn groups_without_submissions_are_omitted_and_cards_sorted_by_recency() {
        let exams = vec![exam(1, None, 1.0), exam(2, None, 1.0), exam(3, None, 1.0)];
        let responses = vec![response(1, None, 9, 1.0), response(3, None, 20, 0.0)];

        let cards = aggregate(&exams, &responses, ResultsFilter::default());
        let ids: Vec<i64> = cards.iter().map(ResultCard::group_id).collect();
        assert_eq!(ids, vec![3, 1]);

        let only_one = aggregate(&exams, &responses, ResultsFilter { exam_id: Some(1), group_id: None });
        assert_eq!(only_one.len(), 1);
        assert_eq!(only_one[0].stats().count, 1);
    }

    #[test]
    fn orphan_responses_are_ignored() {
        let exams = vec![exam(1, None, 1.0)];
        let responses = vec![response(99, None, 1, 1.0)];
        assert!(aggregate(&exams, &responses, ResultsFilter::default()).is_empty());
    }
}
