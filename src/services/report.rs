// src/services/report.rs

//! Printable, self-contained HTML reports for one submission.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};

use crate::{
    models::{
        exam::ExamDefinition,
        exam_record::{Answer, ResponseRecord, Submitter},
    },
    services::results::{CombinedSubmission, CompositeCard, percent},
    utils::html::escape_text,
};

const STYLE: &str = "\
*{box-sizing:border-box}\
body{font-family:Roboto,Arial,sans-serif;margin:0;color:#111827}\
.page{padding:24px 28px}\
h1{margin:0 0 6px;font-size:22px}\
h2{margin:18px 0 8px;font-size:18px}\
h3{margin:14px 0 6px;font-size:15px}\
.muted{color:#6b7280;font-size:13px}\
.chips{display:flex;flex-wrap:wrap;gap:8px;margin:10px 0 14px}\
.chip{display:inline-flex;background:#f3f4f6;border:1px solid #e5e7eb;border-radius:999px;padding:3px 10px;font-size:12px}\
.case{white-space:pre-wrap;border:1px solid #e5e7eb;border-radius:8px;padding:10px 12px;font-size:13px}\
table{width:100%;border-collapse:collapse;margin-top:12px}\
th,td{border-bottom:1px solid #e5e7eb;padding:8px 6px;text-align:left;font-size:13px}\
.col-idx{width:48px;font-weight:600}\
.col-pts{width:120px;text-align:right;font-weight:600}\
.totals{display:flex;justify-content:flex-end;margin-top:12px;font-weight:700}\
.sep{border:none;border-top:2px dashed #e5e7eb;margin:22px 0}";

const PRINT_SCRIPT: &str =
    "<script>window.onload=function(){window.print();setTimeout(()=>window.close(),300);}</script>";

pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format("%d/%m/%Y %H:%M:%S").to_string()
}

/// Renders points without a trailing `.0` for whole numbers.
fn points(value: f64) -> String {
    if value.fract() == 0.0 && value.is_finite() {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

fn document(title: &str, body: &str) -> String {
    format!(
        "<!doctype html>\n<html>\n<head>\n<meta charset=\"utf-8\" />\n<title>{}</title>\n<style>{}</style>\n</head>\n<body>\n<div class=\"page\">\n{}</div>\n{}\n</body>\n</html>\n",
        escape_text(title),
        STYLE,
        body,
        PRINT_SCRIPT
    )
}

fn submitter_line(submitted_by: Option<&Submitter>) -> String {
    let submitter = submitted_by.cloned().unwrap_or_default();
    let mut line = format!("Respondido por: {}", escape_text(&submitter.label()));
    if let Some(email) = submitter.email.as_deref().filter(|e| Some(*e) != submitter.name.as_deref()) {
        let _ = write!(line, " ({})", escape_text(email));
    }
    line
}

/// Rules, clinical case and the per-question points table of one exam.
fn exam_section(out: &mut String, exam: &ExamDefinition, answers: &[Answer]) {
    if let Some(rules) = exam.exam_rules.as_deref().filter(|r| !r.is_empty()) {
        let _ = write!(out, "<h3>Regras e Orientações</h3><div class=\"case\">{}</div>\n", escape_text(rules));
    }
    if let Some(case) = exam.clinical_case.as_deref().filter(|c| !c.is_empty()) {
        let _ = write!(out, "<h3>Caso Clínico</h3><div class=\"case\">{}</div>\n", escape_text(case));
    }

    out.push_str("<table>\n<thead><tr><th class=\"col-idx\">#</th><th>Enunciados</th><th class=\"col-pts\">Pontos</th></tr></thead>\n<tbody>\n");
    for (i, question) in exam.questions.iter().enumerate() {
        let awarded = answers
            .iter()
            .find(|a| a.question_index == i)
            .map_or(0.0, |a| a.points);
        let _ = write!(
            out,
            "<tr><td class=\"col-idx\">{}</td><td class=\"col-text\">{}</td><td class=\"col-pts\">{}</td></tr>\n",
            i + 1,
            escape_text(&question.text),
            points(awarded)
        );
    }
    out.push_str("</tbody>\n</table>\n");
}

/// Report for one submission of a standalone exam.
pub fn render_simple(exam: &ExamDefinition, submission: &ResponseRecord) -> String {
    let name = exam.display_name();
    let mut body = String::new();

    let _ = write!(body, "<h1>{}</h1>\n", escape_text(&name));
    let _ = write!(
        body,
        "<div class=\"muted\">Enviado em {} · {}</div>\n",
        format_timestamp(submission.submitted_at),
        submitter_line(submission.submitted_by.as_ref())
    );
    body.push_str("<div class=\"chips\">");
    if let Some(theme) = exam.exam_theme.as_deref() {
        let _ = write!(body, "<span class=\"chip\">Tema: {}</span>", escape_text(theme));
    }
    let _ = write!(
        body,
        "<span class=\"chip\">Resultado: {} / {} ({})</span></div>\n",
        points(submission.total),
        points(exam.total_points),
        percent(submission.total, exam.total_points)
    );

    exam_section(&mut body, exam, &submission.answers);
    let _ = write!(
        body,
        "<div class=\"totals\">Total: {} / {}</div>\n",
        points(submission.total),
        points(exam.total_points)
    );

    document(&format!("Resultado - {}", name), &body)
}

/// Report for one combined submission of a multi-exam group.
pub fn render_composite(card: &CompositeCard, submission: &CombinedSubmission) -> String {
    let max: f64 = card.exams.iter().map(|e| e.total_points).sum();
    let mut body = String::new();

    body.push_str("<h1>Resultado - Prova composta</h1>\n");
    let _ = write!(
        body,
        "<div class=\"muted\">Grupo {} · Enviado em {} · {}</div>\n",
        card.group_id,
        format_timestamp(submission.submitted_at),
        submitter_line(submission.submitted_by.as_ref())
    );
    let _ = write!(
        body,
        "<div class=\"chips\"><span class=\"chip\">Provas: {}</span><span class=\"chip\">Resultado: {} / {} ({})</span></div>\n",
        card.exams.len(),
        points(submission.total),
        points(max),
        percent(submission.total, max)
    );

    for (idx, exam) in card.exams.iter().enumerate() {
        if idx > 0 {
            body.push_str("<hr class=\"sep\" />\n");
        }
        let subtotal = submission.total_for(exam.id);
        let name = exam
            .exam_name
            .clone()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| format!("Prova {}", idx + 1));

        let _ = write!(body, "<h2>{}</h2>\n", escape_text(&name));
        let _ = write!(
            body,
            "<div class=\"chips\"><span class=\"chip\">Resultado: {} / {} ({})</span></div>\n",
            points(subtotal),
            points(exam.total_points),
            percent(subtotal, exam.total_points)
        );
        exam_section(&mut body, exam, submission.answers_for(exam.id));
    }

    let _ = write!(
        body,
        "<div class=\"totals\">Total geral: {} / {}</div>\n",
        points(submission.total),
        points(max)
    );

    document(&format!("Resultado - Prova composta (grupo {})", card.group_id), &body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::results::{ExamAnswers, ExamTotal, Stats};
    use chrono::TimeZone;

    fn exam(id: i64, name: &str) -> ExamDefinition {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "examName": name,
            "examRules": "Sem consulta",
            "clinicalCase": "Paciente <b>78</b> anos",
            "totalPoints": 4,
            "questions": [
                {"text": "Avalia a dor?", "options": [{"value": 0}, {"value": 2}]},
                {"text": "Orienta & registra", "options": [{"value": 0}, {"value": 2}]}
            ],
            "groupId": 50
        }))
        .unwrap()
    }

    fn answers(first: f64, second: f64) -> Vec<Answer> {
        vec![
            Answer { question_index: 0, selected_option_index: Some(1), points: first },
            Answer { question_index: 1, selected_option_index: Some(0), points: second },
        ]
    }

    #[test]
    fn simple_report_escapes_user_text_and_triggers_print() {
        let exam = exam(1, "Dor <aguda>");
        let submission = ResponseRecord {
            exam_id: 1,
            group_id: None,
            submitted_at: Utc.with_ymd_and_hms(2025, 3, 10, 14, 5, 9).unwrap(),
            answers: answers(2.0, 0.0),
            total: 2.0,
            submitted_by: Some(Submitter { name: Some("Ana".into()), ..Default::default() }),
        };

        let html = render_simple(&exam, &submission);
        assert!(html.contains("&lt;aguda&gt;"));
        assert!(!html.contains("<aguda>"));
        assert!(html.contains("&lt;b&gt;78"));
        assert!(html.contains("Resultado: 2 / 4 (50%)"));
        assert!(html.contains("10/03/2025 14:05:09"));
        assert!(html.contains("Respondido por: Ana"));
        assert!(html.contains("window.print()"));
    }

    #[test]
    fn composite_report_lists_every_member() {
        let card = CompositeCard {
            group_id: 50,
            exams: vec![exam(51, "Primeira"), exam(52, "")],
            submissions: Vec::new(),
            stats: Stats { max: 8.0, avg: 0.0, best: 0.0, worst: 0.0, count: 0, last_at: None },
        };
        let submission = CombinedSubmission {
            submitted_at: Utc.with_ymd_and_hms(2025, 3, 10, 14, 5, 9).unwrap(),
            total: 6.0,
            totals_by_exam: vec![ExamTotal { exam_id: 51, total: 4.0 }, ExamTotal { exam_id: 52, total: 2.0 }],
            per_exam_answers: vec![
                ExamAnswers { exam_id: 51, answers: answers(2.0, 2.0) },
                ExamAnswers { exam_id: 52, answers: answers(2.0, 0.0) },
            ],
            submitted_by: None,
        };

        let html = render_composite(&card, &submission);
        assert!(html.contains("<h2>Primeira</h2>"));
        // clean_text also encodes spaces
        assert!(html.contains("<h2>Prova&#32;2</h2>"));
        assert!(html.contains("Resultado: 6 / 8 (75%)"));
        assert!(html.contains("Resultado: 4 / 4 (100%)"));
        assert!(html.contains("Respondido por: Usuário"));
        assert_eq!(html.matches("<hr class=\"sep\" />").count(), 1);
    }

    #[test]
    fn zero_max_reports_zero_percent() {
        let mut exam = exam(1, "Vazia");
        exam.total_points = 0.0;
        let submission = ResponseRecord {
            exam_id: 1,
            group_id: None,
            submitted_at: Utc::now(),
            answers: Vec::new(),
            total: 0.0,
            submitted_by: None,
        };
        assert!(render_simple(&exam, &submission).contains("(0%)"));
    }
}
