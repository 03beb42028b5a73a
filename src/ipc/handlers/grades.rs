use crate::calc::{self, ClassPolicy, Evaluation, SchoolSettings, StudentGrades};
use crate::ipc::error::ok;
use crate::ipc::types::{AppState, Request};
use crate::words;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::{flag, optional_param, required_param};

/// Either settings field may be left out; the gap is filled from startup config.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsParams {
    decision_points: Option<u32>,
    supplementary_subjects_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClassStudent {
    student_id: String,
    #[serde(flatten)]
    record: StudentGrades,
}

fn parse_settings(state: &AppState, req: &Request) -> Result<SchoolSettings, serde_json::Value> {
    let defaults = state.config.default_settings;
    let params: SettingsParams = optional_param(req, "settings")?.unwrap_or_default();
    Ok(SchoolSettings {
        decision_points: params.decision_points.unwrap_or(defaults.decision_points),
        supplementary_subjects_count: params
            .supplementary_subjects_count
            .unwrap_or(defaults.supplementary_subjects_count),
    })
}

fn subject_words(evaluation: &Evaluation) -> serde_json::Value {
    let mut out = serde_json::Map::new();
    for (name, g) in &evaluation.per_subject {
        out.insert(
            name.clone(),
            json!({
                "finalGrade1st": words::words_for_grade(g.final_grade_1st),
                "finalGradeWithDecision": words::words_for_grade(g.final_grade_with_decision),
                "finalGrade2nd": words::words_for_grade(g.final_grade_2nd),
            }),
        );
    }
    serde_json::Value::Object(out)
}

fn evaluation_json(evaluation: &Evaluation, with_words: bool) -> serde_json::Value {
    let mut out = json!(evaluation);
    if with_words {
        out["words"] = subject_words(evaluation);
    }
    out
}

fn handle_grades_evaluate(state: &mut AppState, req: &Request) -> serde_json::Value {
    let student: StudentGrades = match required_param(req, "student") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let subjects: Vec<String> = match required_param(req, "subjects") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let settings = match parse_settings(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let policy: ClassPolicy = match optional_param(req, "classPolicy") {
        Ok(v) => v.unwrap_or_default(),
        Err(e) => return e,
    };

    let evaluation = calc::evaluate_with_rules(
        &student,
        &subjects,
        &settings,
        &policy,
        &state.config.stage_rules,
    );
    debug!(
        id = %req.id,
        category = evaluation.category.as_str(),
        status = ?evaluation.result.status,
        subjects = evaluation.per_subject.len(),
        "evaluated student"
    );
    ok(&req.id, evaluation_json(&evaluation, flag(req, "withWords")))
}

fn handle_grades_evaluate_class(state: &mut AppState, req: &Request) -> serde_json::Value {
    let students: Vec<ClassStudent> = match required_param(req, "students") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let subjects: Vec<String> = match required_param(req, "subjects") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let settings = match parse_settings(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let policy: ClassPolicy = match optional_param(req, "classPolicy") {
        Ok(v) => v.unwrap_or_default(),
        Err(e) => return e,
    };
    let with_words = flag(req, "withWords");

    let evaluations: Vec<Evaluation> = students
        .iter()
        .map(|s| {
            calc::evaluate_with_rules(
                &s.record,
                &subjects,
                &settings,
                &policy,
                &state.config.stage_rules,
            )
        })
        .collect();
    let summary = calc::summarize_class(&subjects, &evaluations);

    let rows: Vec<serde_json::Value> = students
        .iter()
        .zip(&evaluations)
        .map(|(s, e)| {
            let mut row = evaluation_json(e, with_words);
            row["studentId"] = json!(s.student_id);
            row
        })
        .collect();

    debug!(
        id = %req.id,
        students = evaluations.len(),
        pending = summary.count(calc::ResultStatus::Pending),
        "evaluated class"
    );
    ok(
        &req.id,
        json!({
            "students": rows,
            "summary": summary,
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "grades.evaluate" => Some(handle_grades_evaluate(state, req)),
        "grades.evaluateClass" => Some(handle_grades_evaluate_class(state, req)),
        _ => None,
    }
}
