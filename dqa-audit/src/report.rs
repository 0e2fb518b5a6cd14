//! Report rendering seam
//!
//! **[DQA-RPT-010]** Report rendering is an external collaborator; this
//! module defines the interface plus a plain built-in renderer that keeps
//! the CSV and email-preview endpoints servable without it.

use crate::models::{AuditIssue, AuditRun};

/// Renders an audit run into downloadable formats
pub trait ReportRenderer: Send + Sync {
    /// CSV attachment body for GET /report/:audit_id
    fn render_csv(&self, run: &AuditRun, issues: &[AuditIssue]) -> String;

    /// HTML body for GET /email-preview/:audit_id
    fn render_html(&self, run: &AuditRun, issues: &[AuditIssue]) -> String;
}

/// Built-in renderer: one CSV row / HTML table row per issue
pub struct PlainReportRenderer;

fn csv_escape(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn html_escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

impl ReportRenderer for PlainReportRenderer {
    fn render_csv(&self, _run: &AuditRun, issues: &[AuditIssue]) -> String {
        let mut out = String::new();
        out.push_str("issue_id,severity,status,entity_type,entity_id,description,detected_at,resolved_by,resolution_notes\n");

        for issue in issues {
            let resolved_by = issue
                .resolved_by
                .map(|r| r.as_str().to_string())
                .unwrap_or_default();
            let notes = issue.resolution_notes.clone().unwrap_or_default();
            out.push_str(&format!(
                "{},{},{},{},{},{},{},{},{}\n",
                issue.id,
                issue.severity.as_str(),
                issue.status.as_str(),
                csv_escape(&issue.entity_type),
                csv_escape(&issue.entity_id),
                csv_escape(&issue.description),
                issue.detected_at.to_rfc3339(),
                resolved_by,
                csv_escape(&notes),
            ));
        }

        out
    }

    fn render_html(&self, run: &AuditRun, issues: &[AuditIssue]) -> String {
        let completed = run
            .completed_at
            .map(|dt| dt.to_rfc3339())
            .unwrap_or_else(|| "in progress".to_string());

        let mut rows = String::new();
        for issue in issues {
            rows.push_str(&format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}/{}</td><td>{}</td></tr>\n",
                html_escape(issue.severity.as_str()),
                html_escape(issue.status.as_str()),
                html_escape(&issue.description),
                html_escape(&issue.entity_type),
                html_escape(&issue.entity_id),
                issue.detected_at.format("%Y-%m-%d %H:%M"),
            ));
        }

        format!(
            r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>Data Quality Audit Report</title></head>
<body>
<h1>Data Quality Audit Report</h1>
<p>Run {run_id} &mdash; completed {completed}</p>
<ul>
<li>Quality score: {score:.1}</li>
<li>Total issues: {total} ({errors} errors, {warnings} warnings, {info} info)</li>
<li>Auto-fixed: {auto_fixed}</li>
<li>Manual queue: {manual_queue}</li>
<li>Flagged for review: {flagged}</li>
</ul>
<table border="1" cellpadding="4" cellspacing="0">
<tr><th>Severity</th><th>Status</th><th>Description</th><th>Entity</th><th>Detected</th></tr>
{rows}</table>
</body>
</html>
"#,
            run_id = run.id,
            completed = completed,
            score = run.data_quality_score,
            total = run.total_issues,
            errors = run.errors,
            warnings = run.warnings,
            info = run.info,
            auto_fixed = run.auto_fixed,
            manual_queue = run.manual_queue,
            flagged = run.flagged_for_review,
            rows = rows,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dqa_common::Severity;
    use uuid::Uuid;

    fn fixture() -> (AuditRun, Vec<AuditIssue>) {
        let mut run = AuditRun::new();
        run.total_issues = 1;
        run.errors = 1;
        run.completed_at = Some(chrono::Utc::now());
        run.data_quality_score = 95.0;

        let issue = AuditIssue::new(
            run.id,
            "email contains, a comma \"quoted\"".to_string(),
            Severity::Error,
            "candidate".to_string(),
            "c-1".to_string(),
            None,
        );
        (run, vec![issue])
    }

    #[test]
    fn csv_has_header_and_escapes_fields() {
        let (run, issues) = fixture();
        let csv = PlainReportRenderer.render_csv(&run, &issues);

        let mut lines = csv.lines();
        assert!(lines.next().unwrap().starts_with("issue_id,severity,"));
        let row = lines.next().unwrap();
        assert!(row.contains("\"email contains, a comma \"\"quoted\"\"\""));
        assert!(lines.next().is_none());
    }

    #[test]
    fn html_escapes_and_carries_summary() {
        let (run, mut issues) = fixture();
        issues[0].description = "name has <script> tag".to_string();

        let html = PlainReportRenderer.render_html(&run, &issues);
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("Quality score: 95.0"));
        assert!(!html.contains("<script> tag"));
    }
}
