// src/services/builder.rs

//! Exam authoring.
//!
//! An [`ExamBuilder`] holds one [`ExamDraft`] per exam being edited. Each
//! draft owns a list of question prompts and one option template shared by
//! all of its questions; generation clones the template onto every question.

use std::sync::LazyLock;

use chrono::{DateTime, SubsecRound, Utc};
use regex::Regex;
use validator::{Validate, ValidationError};

use crate::{
    config::MAX_EXAMS_PER_BATCH,
    error::AppError,
    models::{
        exam::{CreateGroupResponse, ExamCreateDto, ExamDefinition, ExamGroupCreateDto},
        question::{ExamOption, OptionDto, Question, QuestionDto},
    },
    services::remote::RemoteExamClient,
    store::Collection,
    utils::{ids::IdGenerator, links},
};

pub const DEFAULT_QUESTION_COUNT: usize = 3;
pub const DEFAULT_OPTION_COUNT: usize = 3;
pub const MAX_QUESTIONS: usize = 50;
pub const MAX_OPTIONS: usize = 10;

static TRAINING_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^th[1-8]$").expect("training code pattern"));

/// Display label for a training code; unknown codes are shown as-is.
pub fn training_label(code: Option<&str>) -> String {
    match code {
        Some(c) if TRAINING_CODE.is_match(c) => {
            let n = &c[2..];
            format!("Treinamento - {} (TH {})", n, n)
        }
        Some(c) => c.to_string(),
        None => "—".to_string(),
    }
}

fn validate_training_code(code: &str) -> Result<(), ValidationError> {
    if TRAINING_CODE.is_match(code) {
        Ok(())
    } else {
        Err(ValidationError::new("unknown_training_code"))
    }
}

/// Trims free text; blank becomes `None`.
fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, Default, PartialEq, Validate)]
pub struct QuestionDraft {
    #[validate(length(min = 3, message = "Question text must have at least 3 characters."))]
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Validate)]
pub struct OptionDraft {
    #[validate(
        required(message = "Option value is required."),
        range(min = 0.0, message = "Option values cannot be negative.")
    )]
    pub value: Option<f64>,
}

/// One exam sub-form.
#[derive(Debug, Clone, PartialEq, Validate)]
pub struct ExamDraft {
    #[validate(
        required(message = "Exam name is required."),
        length(min = 3, message = "Exam name must have at least 3 characters.")
    )]
    pub exam_name: Option<String>,

    #[validate(required(message = "Exam theme is required."))]
    pub exam_theme: Option<String>,

    #[validate(
        required(message = "Training category is required."),
        custom(function = validate_training_code)
    )]
    pub skill_training: Option<String>,

    #[validate(required(message = "Clinical case is required."))]
    pub clinical_case: Option<String>,

    #[validate(required(message = "Exam rules are required."))]
    pub exam_rules: Option<String>,

    #[validate(nested)]
    questions: Vec<QuestionDraft>,

    /// Option template shared by every question of this exam.
    #[validate(nested)]
    options: Vec<OptionDraft>,

    touched: bool,
}

impl Default for ExamDraft {
    fn default() -> Self {
        Self::new()
    }
}

impl ExamDraft {
    /// Blank draft with 3 questions and options worth 0, 1 and 2.
    pub fn new() -> Self {
        let mut draft = Self {
            exam_name: None,
            exam_theme: None,
            skill_training: None,
            clinical_case: None,
            exam_rules: None,
            questions: Vec::new(),
            options: Vec::new(),
            touched: false,
        };
        draft.resize_questions(DEFAULT_QUESTION_COUNT);
        draft.resize_options(DEFAULT_OPTION_COUNT);
        draft
    }

    pub fn set_exam_name(&mut self, value: Option<String>) {
        self.exam_name = clean(value);
    }

    pub fn set_exam_theme(&mut self, value: Option<String>) {
        self.exam_theme = clean(value);
    }

    pub fn set_skill_training(&mut self, value: Option<String>) {
        self.skill_training = clean(value).map(|v| v.to_lowercase());
    }

    pub fn set_clinical_case(&mut self, value: Option<String>) {
        self.clinical_case = clean(value);
    }

    pub fn set_exam_rules(&mut self, value: Option<String>) {
        self.exam_rules = clean(value);
    }

    pub fn questions(&self) -> &[QuestionDraft] {
        &self.questions
    }

    pub fn options(&self) -> &[OptionDraft] {
        &self.options
    }

    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    pub fn option_count(&self) -> usize {
        self.options.len()
    }

    /// Appends blank prompts or drops trailing ones; earlier prompts are kept.
    pub fn resize_questions(&mut self, count: usize) {
        if count > self.questions.len() {
            self.questions.resize_with(count, QuestionDraft::default);
        } else {
            self.questions.truncate(count);
        }
    }

    /// Appends options defaulting to their own index, or drops trailing ones.
    pub fn resize_options(&mut self, count: usize) {
        let current = self.options.len();
        if count > current {
            self.options.extend((current..count).map(|i| OptionDraft {
                value: Some(i as f64),
            }));
        } else {
            self.options.truncate(count);
        }
    }

    pub fn set_question_text(&mut self, index: usize, text: &str) -> bool {
        match self.questions.get_mut(index) {
            Some(q) => {
                q.text = text.trim().to_string();
                true
            }
            None => false,
        }
    }

    pub fn set_option_value(&mut self, index: usize, value: Option<f64>) -> bool {
        match self.options.get_mut(index) {
            Some(o) => {
                o.value = value;
                true
            }
            None => false,
        }
    }

    pub fn is_touched(&self) -> bool {
        self.touched
    }

    pub fn mark_all_touched(&mut self) {
        self.touched = true;
    }

    /// Highest value in the option template (unset counts as 0).
    pub fn max_option_value(&self) -> f64 {
        self.options
            .iter()
            .map(|o| o.value.unwrap_or(0.0))
            .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |m| m.max(v))))
            .unwrap_or(0.0)
    }

    /// max(option values) × question count, always derived from current input.
    pub fn total_points(&self) -> f64 {
        self.max_option_value() * self.questions.len() as f64
    }

    /// Field rules plus the question/option count bounds.
    pub fn check(&self) -> Result<(), String> {
        let mut problems = Vec::new();

        if let Err(errors) = self.validate() {
            problems.push(errors.to_string());
        }
        if !(1..=MAX_QUESTIONS).contains(&self.questions.len()) {
            problems.push(format!("questions: expected between 1 and {} questions", MAX_QUESTIONS));
        }
        if !(1..=MAX_OPTIONS).contains(&self.options.len()) {
            problems.push(format!("options: expected between 1 and {} options", MAX_OPTIONS));
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(problems.join("; "))
        }
    }

    /// Builds the exam record, cloning the option template onto every question.
    pub fn to_exam(
        &self,
        id: i64,
        group_id: i64,
        group_size: usize,
        share_url: String,
        created_at: DateTime<Utc>,
    ) -> ExamDefinition {
        let template: Vec<ExamOption> = self
            .options
            .iter()
            .map(|o| ExamOption {
                value: o.value.unwrap_or(0.0),
            })
            .collect();
        let per_question = self.max_option_value();

        let questions: Vec<Question> = self
            .questions
            .iter()
            .map(|q| Question {
                text: q.text.clone(),
                options: template.clone(),
                total_points: per_question,
            })
            .collect();

        ExamDefinition {
            id,
            created_at,
            exam_name: self.exam_name.clone(),
            exam_theme: self.exam_theme.clone(),
            skill_training: self.skill_training.clone(),
            clinical_case: self.clinical_case.clone(),
            exam_rules: self.exam_rules.clone(),
            total_points: per_question * questions.len() as f64,
            questions,
            share_url,
            group_id,
            group_size,
        }
    }

    pub fn to_dto(&self) -> ExamCreateDto {
        let options: Vec<OptionDto> = self
            .options
            .iter()
            .map(|o| OptionDto {
                value: o.value.unwrap_or(0.0),
            })
            .collect();

        ExamCreateDto {
            exam_name: self.exam_name.clone(),
            exam_theme: self.exam_theme.clone(),
            skill_training: self.skill_training.clone(),
            clinical_case: self.clinical_case.clone(),
            exam_rules: self.exam_rules.clone(),
            questions: self
                .questions
                .iter()
                .map(|q| QuestionDto {
                    text: q.text.clone(),
                    options: options.clone(),
                })
                .collect(),
            created_by_id: None,
        }
    }

    /// Reads an API payload. Every question must carry the same option values,
    /// since they all come from one template.
    pub fn from_dto(dto: &ExamCreateDto) -> Result<Self, String> {
        let mut draft = Self::new();
        draft.set_exam_name(dto.exam_name.clone());
        draft.set_exam_theme(dto.exam_theme.clone());
        draft.set_skill_training(dto.skill_training.clone());
        draft.set_clinical_case(dto.clinical_case.clone());
        draft.set_exam_rules(dto.exam_rules.clone());

        let template = dto
            .questions
            .first()
            .map(|q| q.options.clone())
            .unwrap_or_default();
        if dto.questions.iter().any(|q| q.options != template) {
            return Err("every question must use the same option values".to_string());
        }

        draft.questions = dto
            .questions
            .iter()
            .map(|q| QuestionDraft {
                text: q.text.trim().to_string(),
            })
            .collect();
        draft.options = template
            .iter()
            .map(|o| OptionDraft { value: Some(o.value) })
            .collect();

        Ok(draft)
    }
}

/// Where generated exams go and how ids/links are derived.
pub struct GenerationContext<'a> {
    pub exams: &'a Collection<ExamDefinition>,
    pub ids: &'a IdGenerator,
    pub origin: &'a str,
}

/// A set of exam sub-forms edited together.
#[derive(Debug, Clone)]
pub struct ExamBuilder {
    drafts: Vec<ExamDraft>,
    links: Vec<Option<String>>,
    group_link: Option<String>,
}

impl Default for ExamBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ExamBuilder {
    pub fn new() -> Self {
        Self::from_drafts(Vec::new())
    }

    pub fn from_drafts(mut drafts: Vec<ExamDraft>) -> Self {
        if drafts.is_empty() {
            drafts.push(ExamDraft::new());
        }
        let links = vec![None; drafts.len()];
        Self {
            drafts,
            links,
            group_link: None,
        }
    }

    pub fn exam_count(&self) -> usize {
        self.drafts.len()
    }

    /// Resizes to `count` sub-forms, keeping the ones below the new size.
    pub fn set_exam_count(&mut self, count: usize) -> Result<(), AppError> {
        if !(1..=MAX_EXAMS_PER_BATCH).contains(&count) {
            return Err(AppError::BadRequest(format!(
                "Exam count must be between 1 and {}",
                MAX_EXAMS_PER_BATCH
            )));
        }
        self.drafts.resize_with(count, ExamDraft::new);
        self.links.resize(count, None);
        Ok(())
    }

    pub fn drafts(&self) -> &[ExamDraft] {
        &self.drafts
    }

    pub fn draft(&self, index: usize) -> Option<&ExamDraft> {
        self.drafts.get(index)
    }

    pub fn draft_mut(&mut self, index: usize) -> Option<&mut ExamDraft> {
        self.drafts.get_mut(index)
    }

    pub fn total_points(&self, index: usize) -> f64 {
        self.drafts.get(index).map_or(0.0, ExamDraft::total_points)
    }

    /// Link produced by the last successful generation of sub-form `index`.
    pub fn last_link(&self, index: usize) -> Option<&str> {
        self.links.get(index).and_then(|l| l.as_deref())
    }

    pub fn group_link(&self) -> Option<&str> {
        self.group_link.as_deref()
    }

    /// Indices (0-based) of sub-forms that currently fail validation.
    pub fn invalid_drafts(&self) -> Vec<usize> {
        self.drafts
            .iter()
            .enumerate()
            .filter(|(_, d)| d.check().is_err())
            .map(|(i, _)| i)
            .collect()
    }

    /// Back to a single blank sub-form with no links.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    fn checked_draft(&mut self, index: usize) -> Result<&ExamDraft, AppError> {
        let draft = self
            .drafts
            .get_mut(index)
            .ok_or_else(|| AppError::BadRequest(format!("No exam form at position {}", index + 1)))?;

        if let Err(problems) = draft.check() {
            draft.mark_all_touched();
            return Err(AppError::BadRequest(format!(
                "Exam {}: review the required fields ({})",
                index + 1,
                problems
            )));
        }
        Ok(draft)
    }

    fn check_all(&mut self) -> Result<(), AppError> {
        let invalid = self.invalid_drafts();
        if invalid.is_empty() {
            return Ok(());
        }

        for &i in &invalid {
            self.drafts[i].mark_all_touched();
        }
        let positions: Vec<String> = invalid.iter().map(|i| (i + 1).to_string()).collect();
        Err(AppError::BadRequest(format!(
            "{} of {} exams need review (exams {}); nothing was generated",
            invalid.len(),
            self.drafts.len(),
            positions.join(", ")
        )))
    }

    /// Generates sub-form `index` as a standalone exam and prepends it to the store.
    pub async fn generate_one(
        &mut self,
        index: usize,
        ctx: &GenerationContext<'_>,
    ) -> Result<ExamDefinition, AppError> {
        let draft = self.checked_draft(index)?;

        let id = ctx.ids.next();
        let share_url = links::exam_share_url(ctx.origin, id);
        let exam = draft.to_exam(id, id, 1, share_url.clone(), Utc::now().trunc_subsecs(3));

        let stored = exam.clone();
        ctx.exams
            .update(move |all| {
                all.insert(0, stored);
                Ok(())
            })
            .await?;

        tracing::info!("Generated exam {} ({} questions)", exam.id, exam.questions.len());
        self.links[index] = Some(share_url);
        Ok(exam)
    }

    /// Generates every sub-form as one group, or nothing if any sub-form is invalid.
    pub async fn generate_all(
        &mut self,
        ctx: &GenerationContext<'_>,
    ) -> Result<CreateGroupResponse, AppError> {
        self.check_all()?;

        let group_id = ctx.ids.next();
        let group_size = self.drafts.len();
        let group_share_url = links::group_share_url(ctx.origin, group_id);
        let created_at = Utc::now().trunc_subsecs(3);

        let exams: Vec<ExamDefinition> = self
            .drafts
            .iter()
            .map(|d| d.to_exam(ctx.ids.next(), group_id, group_size, group_share_url.clone(), created_at))
            .collect();

        let batch = exams.clone();
        ctx.exams
            .update(move |all| {
                all.splice(0..0, batch);
                Ok(())
            })
            .await?;

        tracing::info!("Generated exam group {} with {} exams", group_id, group_size);
        self.links = vec![Some(group_share_url.clone()); group_size];
        self.group_link = Some(group_share_url.clone());

        Ok(CreateGroupResponse {
            group_id,
            group_share_url,
            exams,
        })
    }

    /// Same as [`generate_one`](Self::generate_one), but the remote API creates the
    /// record; its canonical copy is then stored locally.
    pub async fn generate_one_remote(
        &mut self,
        index: usize,
        client: &RemoteExamClient,
        exams: &Collection<ExamDefinition>,
    ) -> Result<ExamDefinition, AppError> {
        let dto = self.checked_draft(index)?.to_dto();
        let created = client.create_exam(&dto).await?;

        let stored = created.clone();
        exams
            .update(move |all| {
                all.retain(|e| e.id != stored.id);
                all.insert(0, stored);
                Ok(())
            })
            .await?;

        self.links[index] = Some(created.share_url.clone());
        Ok(created)
    }

    /// Remote counterpart of [`generate_all`](Self::generate_all).
    pub async fn generate_all_remote(
        &mut self,
        title: Option<String>,
        client: &RemoteExamClient,
        exams: &Collection<ExamDefinition>,
    ) -> Result<CreateGroupResponse, AppError> {
        self.check_all()?;

        let dto = ExamGroupCreateDto {
            title,
            exams: self.drafts.iter().map(ExamDraft::to_dto).collect(),
        };
        let created = client.create_group(&dto).await?;

        let batch = created.exams.clone();
        exams
            .update(move |all| {
                all.retain(|e| !batch.iter().any(|b| b.id == e.id));
                all.splice(0..0, batch);
                Ok(())
            })
            .await?;

        self.links = vec![Some(created.group_share_url.clone()); self.drafts.len()];
        self.group_link = Some(created.group_share_url.clone());
        Ok(created)
    }
}
