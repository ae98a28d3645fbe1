//! Scorecard rendering.

use comfy_table::{presets::UTF8_FULL, Cell, Table};

use crate::domain::models::{EvaluationResult, HandwritingReport, ResponseItem};

/// Accuracy and mean reaction time over one test's log.
fn summarize(responses: &[ResponseItem]) -> (usize, usize, f64) {
    let correct = responses.iter().filter(|r| r.correct).count();
    let mean_rt = if responses.is_empty() {
        0.0
    } else {
        responses
            .iter()
            .map(|r| r.reaction_time_seconds)
            .sum::<f64>()
            / responses.len() as f64
    };
    (correct, responses.len(), mean_rt)
}

/// Render the per-test summary table.
pub fn format_scorecard(audio: &[ResponseItem], reading: &[ResponseItem]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Test", "Correct", "Trials", "Mean RT (s)"]);

    for (name, responses) in [("Audio", audio), ("Reading", reading)] {
        let (correct, total, mean_rt) = summarize(responses);
        table.add_row(vec![
            Cell::new(name),
            Cell::new(correct),
            Cell::new(total),
            Cell::new(format!("{mean_rt:.2}")),
        ]);
    }
    table
}

/// Render the backend's evaluation verdict.
pub fn format_evaluation(result: &EvaluationResult) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Risk level", "Probability"]);
    table.add_row(vec![
        Cell::new(&result.risk_level),
        Cell::new(format!("{:.1}%", result.probability * 100.0)),
    ]);
    table
}

/// One-line handwriting verdict.
pub fn format_handwriting(report: &HandwritingReport) -> String {
    format!(
        "Handwriting: {} (risk {:.2}, ocr {:.2})",
        report.verdict, report.risk_score, report.ocr_score
    )
}
