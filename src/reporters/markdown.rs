//! Markdown reporter for GitHub-flavored Markdown output
//!
//! Generates reports suitable for:
//! - Pull request comments on data drops
//! - Notebooks and wikis

use crate::cleaning::CleaningLog;
use crate::detectors::QualityReport;
use crate::models::Column;
use crate::pipeline::RunSummary;
use anyhow::Result;
use chrono::Local;

/// Render summary as GitHub-flavored Markdown
pub fn render(summary: &RunSummary) -> Result<String> {
    let mut md = String::new();

    md.push_str(&render_header(summary));
    md.push('\n');

    md.push_str(&render_scores(summary));
    md.push('\n');

    md.push_str(&render_columns(&summary.before, summary.after.as_ref()));
    md.push('\n');

    md.push_str(&render_outliers(&summary.before));
    md.push('\n');

    if let Some(log) = &summary.cleaning_log {
        md.push_str(&render_log(log));
        md.push('\n');
    }

    md.push_str(&render_footer());
    Ok(md)
}

fn render_header(summary: &RunSummary) -> String {
    let report = summary.final_report();
    let grade_emoji = match report.grade.as_str() {
        "A" => "🏆",
        "B" => "⭐",
        "C" => "⚠️",
        "D" => "❌",
        "F" => "💀",
        _ => "❓",
    };

    let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
    let mut header = format!(
        r#"# {} Data Quality Report

**Grade: {}** | **Score: {:.1}/100**

Generated: {}
"#,
        grade_emoji, report.grade, report.score, timestamp
    );
    if let (Some(seed), Some(rows)) = (summary.seed, summary.rows_synthesized) {
        header.push_str(&format!("\nSynthesized {} transactions with seed `{}`.\n", rows, seed));
    }
    if !summary.defects.is_empty() {
        header.push_str("\n**Injected defects:** ");
        let parts: Vec<String> = summary
            .defects
            .iter()
            .map(|(kind, n)| format!("{} × `{}`", n, kind))
            .collect();
        header.push_str(&parts.join(", "));
        header.push('\n');
    }
    header
}

fn render_scores(summary: &RunSummary) -> String {
    let b = &summary.before;
    let mut md = String::from("## Summary\n\n");
    match &summary.after {
        Some(a) => {
            md.push_str("| Metric | Before | After |\n|--------|--------|-------|\n");
            md.push_str(&format!("| **Score** | {:.1} ({}) | {:.1} ({}) |\n", b.score, b.grade, a.score, a.grade));
            md.push_str(&format!("| Rows | {} | {} |\n", b.row_count, a.row_count));
            md.push_str(&format!("| Missing cells | {} | {} |\n", b.total_missing, a.total_missing));
            md.push_str(&format!("| Out-of-range rows | {} | {} |\n", b.invalid_rows, a.invalid_rows));
            md.push_str(&format!("| Duplicate rows | {} | {} |\n", b.duplicate_count, a.duplicate_count));
            md.push_str(&format!("| Outlier rows | {} | {} |\n", b.outlier_rows, a.outlier_rows));
            md.push_str(&format!(
                "| Mixed date formats | {} | {} |\n",
                yes_no(b.has_format_inconsistency()),
                yes_no(a.has_format_inconsistency())
            ));
            md.push_str(&format!(
                "| Encoding issues | {} | {} |\n",
                b.total_encoding_issues(),
                a.total_encoding_issues()
            ));
        }
        None => {
            md.push_str("| Metric | Value |\n|--------|-------|\n");
            md.push_str(&format!("| **Score** | {:.1} ({}) |\n", b.score, b.grade));
            md.push_str(&format!("| Rows | {} |\n", b.row_count));
            md.push_str(&format!("| Missing cells | {} |\n", b.total_missing));
            md.push_str(&format!("| Out-of-range rows | {} |\n", b.invalid_rows));
            md.push_str(&format!("| Duplicate rows | {} |\n", b.duplicate_count));
            md.push_str(&format!("| Outlier rows | {} |\n", b.outlier_rows));
            md.push_str(&format!("| Mixed date formats | {} |\n", yes_no(b.has_format_inconsistency())));
            md.push_str(&format!("| Encoding issues | {} |\n", b.total_encoding_issues()));
        }
    }
    md
}

fn render_columns(before: &QualityReport, after: Option<&QualityReport>) -> String {
    let mut md = String::from("## Columns\n\n| Column | Missing | Missing % | Encoding issues |");
    if after.is_some() {
        md.push_str(" Missing after |");
    }
    md.push_str("\n|--------|---------|-----------|-----------------|");
    if after.is_some() {
        md.push_str("---------------|");
    }
    md.push('\n');

    for column in Column::all() {
        let stat = before.missing_by_column.get(column);
        md.push_str(&format!(
            "| `{}` | {} | {:.1}% | {} |",
            column,
            stat.map_or(0, |s| s.count),
            stat.map_or(0.0, |s| s.pct),
            before.encoding_issues.get(column).copied().unwrap_or(0)
        ));
        if let Some(a) = after {
            md.push_str(&format!(" {} |", a.missing(*column)));
        }
        md.push('\n');
    }

    for (column, histogram) in &before.format_variants {
        md.push_str(&format!("\n**Date formats in `{}`:** ", column));
        let buckets: Vec<String> = histogram
            .iter()
            .map(|(f, n)| format!("{} {}", f.name(), n))
            .collect();
        md.push_str(&buckets.join(", "));
        md.push('\n');
    }
    md
}

fn render_outliers(report: &QualityReport) -> String {
    let mut md = String::from("## Outliers\n\n");
    if report.outlier_by_column.is_empty() {
        md.push_str("No numeric values to fence.\n");
        return md;
    }
    md.push_str("| Column | Count | % | Lower | Upper | Min | Max |\n");
    md.push_str("|--------|-------|---|-------|-------|-----|-----|\n");
    for (column, s) in &report.outlier_by_column {
        md.push_str(&format!(
            "| `{}` | {} | {:.1}% | {:.0} | {:.0} | {:.0} | {:.0} |\n",
            column, s.count, s.pct, s.lower_bound, s.upper_bound, s.min, s.max
        ));
    }
    md
}

fn render_log(log: &CleaningLog) -> String {
    let mut md = String::from("## Cleaning Log\n\n");
    if log.is_empty() {
        md.push_str("✅ Nothing to clean.\n");
        return md;
    }
    for (i, entry) in log.iter().enumerate() {
        md.push_str(&format!("{}. {}\n", i + 1, entry.describe()));
    }
    md
}

fn render_footer() -> String {
    r#"---

*Generated by spendlab*
"#
    .to_string()
}

fn yes_no(b: bool) -> &'static str {
    if b {
        "yes"
    } else {
        "no"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporters::tests::test_summary;

    #[test]
    fn test_markdown_render_has_header() {
        let summary = test_summary();
        let md = render(&summary).unwrap();
        assert!(md.contains("# "));
        assert!(md.contains("Grade: A"));
        assert!(md.contains("100.0/100"));
    }

    #[test]
    fn test_markdown_numbered_log() {
        let summary = test_summary();
        let md = render(&summary).unwrap();
        assert!(md.contains("## Cleaning Log"));
        assert!(md.contains("1. ImputeNumeric"));
    }

    #[test]
    fn test_markdown_before_after_table() {
        let summary = test_summary();
        let md = render(&summary).unwrap();
        assert!(md.contains("| Metric | Before | After |"));
        assert!(md.contains("| Out-of-range rows | 0 | 0 |"));
        assert!(md.contains("| `amount` |"));
    }
}
