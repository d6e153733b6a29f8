// src/services/taker.rs

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    error::AppError,
    models::{
        exam::ExamDefinition,
        exam_record::{Answer, ResponseRecord, Submitter},
    },
    store::Collection,
    utils::links::LinkTarget,
};

/// What the taker was asked to open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExamSelector {
    Exam(i64),
    Group(i64),
}

impl ExamSelector {
    /// `groupId` wins over `examId` when both are given.
    pub fn from_query(exam_id: Option<i64>, group_id: Option<i64>) -> Option<Self> {
        group_id
            .map(ExamSelector::Group)
            .or(exam_id.map(ExamSelector::Exam))
    }

    pub fn link_target(&self) -> LinkTarget {
        match *self {
            ExamSelector::Exam(id) => LinkTarget::Exam(id),
            ExamSelector::Group(id) => LinkTarget::Group(id),
        }
    }
}

/// Exams matching `selector`, in store order.
pub fn resolve_exams(all: &[ExamDefinition], selector: ExamSelector) -> Vec<ExamDefinition> {
    match selector {
        ExamSelector::Exam(id) => all.iter().filter(|e| e.id == id).take(1).cloned().collect(),
        ExamSelector::Group(gid) => all.iter().filter(|e| e.group_id == gid).cloned().collect(),
    }
}

/// One selection slot per question; nothing is preselected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerSheet {
    selections: Vec<Option<usize>>,
}

impl AnswerSheet {
    pub fn new(question_count: usize) -> Self {
        Self {
            selections: vec![None; question_count],
        }
    }

    pub fn selections(&self) -> &[Option<usize>] {
        &self.selections
    }

    pub fn select(&mut self, question: usize, option: Option<usize>) -> Result<(), AppError> {
        let slot = self
            .selections
            .get_mut(question)
            .ok_or_else(|| AppError::BadRequest(format!("No question at position {}", question + 1)))?;
        *slot = option;
        Ok(())
    }

    /// Every question has a selection.
    pub fn is_complete(&self) -> bool {
        self.selections.iter().all(Option::is_some)
    }

    /// Running total; unset or out-of-range selections count as 0.
    pub fn selected_total(&self, exam: &ExamDefinition) -> f64 {
        exam.questions
            .iter()
            .zip(&self.selections)
            .map(|(q, sel)| q.points_for(*sel))
            .sum()
    }

    fn answers(&self, exam: &ExamDefinition) -> Vec<Answer> {
        exam.questions
            .iter()
            .zip(&self.selections)
            .enumerate()
            .map(|(idx, (q, sel))| Answer {
                question_index: idx,
                selected_option_index: *sel,
                points: q.points_for(*sel),
            })
            .collect()
    }
}

/// What a successful submission produced.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionReceipt {
    pub submitted_at: DateTime<Utc>,
    pub overall_total: f64,
    pub responses: Vec<ResponseRecord>,
    /// Where to show results: the group when opened by group, else the exam.
    #[serde(skip)]
    pub results_target: LinkTarget,
}

/// The exams being answered, with one answer sheet each.
#[derive(Debug, Clone)]
pub struct TakerSession {
    selector: ExamSelector,
    exams: Vec<ExamDefinition>,
    sheets: Vec<AnswerSheet>,
}

impl TakerSession {
    /// Resolves `selector`; errors when no stored exam matches.
    pub fn open(all: &[ExamDefinition], selector: ExamSelector) -> Result<Self, AppError> {
        let exams = resolve_exams(all, selector);
        if exams.is_empty() {
            return Err(AppError::NotFound("Exam not found".to_string()));
        }

        let sheets = exams
            .iter()
            .map(|e| AnswerSheet::new(e.questions.len()))
            .collect();

        Ok(Self {
            selector,
            exams,
            sheets,
        })
    }

    pub fn exams(&self) -> &[ExamDefinition] {
        &self.exams
    }

    pub fn sheet(&self, index: usize) -> Option<&AnswerSheet> {
        self.sheets.get(index)
    }

    pub fn sheet_mut(&mut self, index: usize) -> Option<&mut AnswerSheet> {
        self.sheets.get_mut(index)
    }

    /// Loads a full selection grid (`selections[exam][question]`).
    pub fn apply(&mut self, selections: &[Vec<Option<usize>>]) -> Result<(), AppError> {
        if selections.len() != self.sheets.len() {
            return Err(AppError::BadRequest(format!(
                "Expected answers for {} exam(s), got {}",
                self.sheets.len(),
                selections.len()
            )));
        }

        for (i, (sheet, picks)) in self.sheets.iter_mut().zip(selections).enumerate() {
            if picks.len() != sheet.selections.len() {
                return Err(AppError::BadRequest(format!(
                    "Exam {} has {} questions, got {} answers",
                    i + 1,
                    sheet.selections.len(),
                    picks.len()
                )));
            }
            sheet.selections.clone_from(picks);
        }
        Ok(())
    }

    pub fn selected_total(&self, index: usize) -> f64 {
        match (self.exams.get(index), self.sheets.get(index)) {
            (Some(exam), Some(sheet)) => sheet.selected_total(exam),
            _ => 0.0,
        }
    }

    pub fn overall_total(&self) -> f64 {
        (0..self.exams.len()).map(|i| self.selected_total(i)).sum()
    }

    /// 0-based indices of sheets with an unanswered question.
    pub fn incomplete_sheets(&self) -> Vec<usize> {
        self.sheets
            .iter()
            .enumerate()
            .filter(|(_, s)| !s.is_complete())
            .map(|(i, _)| i)
            .collect()
    }

    pub fn can_submit(&self) -> bool {
        self.incomplete_sheets().is_empty()
    }

    pub fn results_target(&self) -> LinkTarget {
        self.selector.link_target()
    }

    /// One record per exam, all stamped with the same `submitted_at`.
    pub fn build_responses(
        &self,
        submitted_at: DateTime<Utc>,
        submitter: Option<Submitter>,
    ) -> Result<Vec<ResponseRecord>, AppError> {
        let incomplete = self.incomplete_sheets();
        if !incomplete.is_empty() {
            let positions: Vec<String> = incomplete.iter().map(|i| (i + 1).to_string()).collect();
            let msg = if incomplete.len() == 1 {
                format!("Select an option for every question in exam {}.", positions[0])
            } else {
                format!("Select an option for every question in exams: {}.", positions.join(", "))
            };
            return Err(AppError::BadRequest(msg));
        }

        Ok(self
            .exams
            .iter()
            .zip(&self.sheets)
            .map(|(exam, sheet)| ResponseRecord {
                exam_id: exam.id,
                group_id: Some(exam.group_id),
                submitted_at,
                answers: sheet.answers(exam),
                total: sheet.selected_total(exam),
                submitted_by: submitter.clone(),
            })
            .collect())
    }

    /// Validates, then prepends the new records (in exam order) to the response collection.
    pub async fn submit(
        &self,
        responses: &Collection<ResponseRecord>,
        submitted_at: DateTime<Utc>,
        submitter: Option<Submitter>,
    ) -> Result<SubmissionReceipt, AppError> {
        let records = self.build_responses(submitted_at, submitter)?;

        let batch = records.clone();
        responses
            .update(move |all| {
                all.splice(0..0, batch);
                Ok(())
            })
            .await?;

        tracing::info!(
            "Stored {} response(s) submitted at {}",
            records.len(),
            submitted_at
        );

        Ok(SubmissionReceipt {
            submitted_at,
            overall_total: self.overall_total(),
            responses: records,
            results_target: self.results_target(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Storage, keys};

    fn exam(id: i64, group_id: i64) -> ExamDefinition {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "examName": format!("Prova {}", id),
            "totalPoints": 3,
            "questions": [
                {"text": "Q1", "options": [{"value": 0}, {"value": 0.5}, {"value": 1}], "totalPoints": 1},
                {"text": "Q2", "options": [{"value": 0}, {"value": 0.5}, {"value": 1}], "totalPoints": 1},
                {"text": "Q3", "options": [{"value": 0}, {"value": 0.5}, {"value": 1}], "totalPoints": 1}
            ],
            "groupId": group_id
        }))
        .unwrap()
    }

    #[test]
    fn selector_prefers_group() {
        assert_eq!(ExamSelector::from_query(Some(1), Some(2)), Some(ExamSelector::Group(2)));
        assert_eq!(ExamSelector::from_query(Some(1), None), Some(ExamSelector::Exam(1)));
        assert_eq!(ExamSelector::from_query(None, None), None);
    }

    #[test]
    fn unknown_exam_is_not_found() {
        let all = vec![exam(1, 1)];
        assert!(matches!(
            TakerSession::open(&all, ExamSelector::Exam(99)),
            Err(AppError::NotFound(_))
        ));
        assert!(TakerSession::open(&all, ExamSelector::Group(99)).is_err());
    }

    #[test]
    fn running_total_follows_selections() {
        let all = vec![exam(1, 1)];
        let mut session = TakerSession::open(&all, ExamSelector::Exam(1)).unwrap();
        assert_eq!(session.overall_total(), 0.0);
        assert!(!session.can_submit());

        let sheet = session.sheet_mut(0).unwrap();
        sheet.select(0, Some(2)).unwrap();
        sheet.select(1, Some(1)).unwrap();
        sheet.select(2, Some(0)).unwrap();

        assert_eq!(session.selected_total(0), 1.5);
        assert!(session.can_submit());

        session.sheet_mut(0).unwrap().select(2, Some(9)).unwrap();
        assert_eq!(session.selected_total(0), 1.5);
    }

    #[test]
    fn incomplete_sheets_block_submission() {
        let all = vec![exam(1, 5), exam(2, 5)];
        let mut session = TakerSession::open(&all, ExamSelector::Group(5)).unwrap();
        session
            .apply(&[vec![Some(0), Some(0), Some(0)], vec![Some(1), None, Some(1)]])
            .unwrap();

        let err = session.build_responses(Utc::now(), None).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(ref m) if m.contains("exam 2")));

        assert!(session.apply(&[vec![Some(0)]]).is_err());
    }

    #[tokio::test]
    async fn group_submission_shares_timestamp_and_prepends_in_order() {
        let storage = Storage::memory();
        let responses = storage.collection::<ResponseRecord>(keys::RESPONSES);

        let all = vec![exam(1, 5), exam(2, 5), exam(3, 3)];
        let mut session = TakerSession::open(&all, ExamSelector::Group(5)).unwrap();
        session
            .apply(&[vec![Some(2), Some(1), Some(0)], vec![Some(2), Some(2), Some(2)]])
            .unwrap();

        let earlier = ResponseRecord {
            exam_id: 3,
            group_id: Some(3),
            submitted_at: Utc::now(),
            answers: Vec::new(),
            total: 0.0,
            submitted_by: None,
        };
        responses.save(&[earlier]).await.unwrap();

        let submitter = Submitter { name: Some("Ana".into()), ..Default::default() };
        let receipt = session.submit(&responses, Utc::now(), Some(submitter)).await.unwrap();

        assert_eq!(receipt.overall_total, 4.5);
        assert_eq!(receipt.results_target, LinkTarget::Group(5));

        let stored = responses.load().await.unwrap();
        assert_eq!(stored.iter().map(|r| r.exam_id).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(stored[0].submitted_at, stored[1].submitted_at);
        assert_eq!(stored[0].answers.len(), 3);
        assert_eq!(stored[0].total, stored[0].answers.iter().map(|a| a.points).sum::<f64>());
        assert_eq!(stored[0].total, 1.5);
        assert_eq!(stored[1].total, 3.0);
        assert_eq!(stored[0].group_id, Some(5));
        assert_eq!(stored[1].submitted_by.as_ref().and_then(|s| s.name.as_deref()), Some("Ana"));
    }
}
