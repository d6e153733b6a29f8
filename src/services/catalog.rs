// src/services/catalog.rs

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    error::AppError,
    models::{exam::ExamDefinition, question::Question},
    services::builder::training_label,
    store::Collection,
    utils::links,
};

/// One card per exam group, anchored on its lowest-id member.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogCard {
    /// Representative id, used to delete the card.
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub exam_name: Option<String>,
    pub exam_theme: Option<String>,
    pub skill_training: Option<String>,
    pub training_label: String,
    pub clinical_case: Option<String>,
    pub exam_rules: Option<String>,
    pub total_points: f64,
    pub questions: Vec<Question>,
    pub option_headers: Vec<String>,
    pub share_url: String,
    pub group_id: i64,
    pub group_count: usize,
    /// Every member id; deleting the card removes all of them.
    pub ids: Vec<i64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortBy {
    #[default]
    Newest,
    Oldest,
    Name,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogQuery {
    #[serde(default)]
    pub search: Option<String>,
    /// Training code, or `all`/absent for no filter.
    #[serde(default)]
    pub training: Option<String>,
    #[serde(default)]
    pub sort: SortBy,
}

/// `"{v} ponto"` / `"{v} pontos"` for each option of the first question.
pub fn option_headers(questions: &[Question]) -> Vec<String> {
    questions
        .first()
        .map(|q| {
            q.options
                .iter()
                .map(|o| {
                    let suffix = if o.value == 1.0 { "" } else { "s" };
                    format!("{} ponto{}", o.value, suffix)
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Partitions exams by group id and builds one card per group.
pub fn build_cards(exams: &[ExamDefinition], origin: &str) -> Vec<CatalogCard> {
    let mut groups: BTreeMap<i64, Vec<&ExamDefinition>> = BTreeMap::new();
    for exam in exams {
        groups.entry(exam.group_id).or_default().push(exam);
    }

    groups
        .into_iter()
        .filter_map(|(group_id, mut members)| {
            members.sort_by_key(|e| e.id);
            let rep = *members.first()?;
            let group_count = members.len();

            let share_url = if group_count > 1 {
                links::group_share_url(origin, group_id)
            } else if rep.share_url.is_empty() {
                links::exam_share_url(origin, rep.id)
            } else {
                rep.share_url.clone()
            };

            Some(CatalogCard {
                id: rep.id,
                created_at: rep.created_at,
                exam_name: rep.exam_name.clone(),
                exam_theme: rep.exam_theme.clone(),
                skill_training: rep.skill_training.clone(),
                training_label: training_label(rep.skill_training.as_deref()),
                clinical_case: rep.clinical_case.clone(),
                exam_rules: rep.exam_rules.clone(),
                total_points: rep.total_points,
                option_headers: option_headers(&rep.questions),
                questions: rep.questions.clone(),
                share_url,
                group_id,
                group_count,
                ids: members.iter().map(|e| e.id).collect(),
            })
        })
        .collect()
}

fn contains(haystack: Option<&str>, needle: &str) -> bool {
    haystack.is_some_and(|h| h.to_lowercase().contains(needle))
}

/// Applies the training filter, free-text search and sort order.
pub fn filter_cards(mut cards: Vec<CatalogCard>, query: &CatalogQuery) -> Vec<CatalogCard> {
    if let Some(training) = query
        .training
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty() && !t.eq_ignore_ascii_case("all"))
    {
        cards.retain(|c| {
            c.skill_training
                .as_deref()
                .is_some_and(|s| s.eq_ignore_ascii_case(training))
        });
    }

    let needle = query
        .search
        .as_deref()
        .unwrap_or_default()
        .trim()
        .to_lowercase();
    if !needle.is_empty() {
        cards.retain(|c| {
            contains(c.exam_name.as_deref(), &needle)
                || contains(c.exam_theme.as_deref(), &needle)
                || contains(c.clinical_case.as_deref(), &needle)
                || contains(c.exam_rules.as_deref(), &needle)
                || c.questions.iter().any(|q| contains(Some(&q.text), &needle))
        });
    }

    match query.sort {
        SortBy::Newest => cards.sort_by(|a, b| b.id.cmp(&a.id)),
        SortBy::Oldest => cards.sort_by(|a, b| a.id.cmp(&b.id)),
        SortBy::Name => cards.sort_by(|a, b| {
            let an = a.exam_name.as_deref().unwrap_or_default();
            let bn = b.exam_name.as_deref().unwrap_or_default();
            an.to_lowercase()
                .cmp(&bn.to_lowercase())
                .then_with(|| an.cmp(bn))
        }),
    }

    cards
}

pub async fn list_cards(
    exams: &Collection<ExamDefinition>,
    origin: &str,
    query: &CatalogQuery,
) -> Result<Vec<CatalogCard>, AppError> {
    let all = exams.load().await?;
    Ok(filter_cards(build_cards(&all, origin), query))
}

/// Deletes the card whose representative id is `rep_id`, with all its members.
/// Returns the removed exam ids.
pub async fn delete_card(
    exams: &Collection<ExamDefinition>,
    rep_id: i64,
) -> Result<Vec<i64>, AppError> {
    exams
        .update(|all| {
            let card_ids = build_cards(all, "")
                .into_iter()
                .find(|c| c.id == rep_id)
                .map(|c| c.ids)
                .ok_or_else(|| AppError::NotFound(format!("Exam card {} not found", rep_id)))?;

            let doomed: HashSet<i64> = card_ids.iter().copied().collect();
            all.retain(|e| !doomed.contains(&e.id));
            Ok(card_ids)
        })
        .await
}

/// Empties the exam collection.
pub async fn clear_all(exams: &Collection<ExamDefinition>) -> Result<(), AppError> {
    exams.save(&[]).await
}
