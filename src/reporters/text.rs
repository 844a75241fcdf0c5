//! Text (terminal) reporter with colors and formatting

use crate::cleaning::CleaningLog;
use crate::detectors::QualityReport;
use crate::pipeline::RunSummary;
use anyhow::Result;

/// Grade colors (ANSI escape codes)
fn grade_color(grade: &str) -> &'static str {
    match grade {
        "A" => "\x1b[32m", // Green
        "B" => "\x1b[92m", // Light green
        "C" => "\x1b[33m", // Yellow
        "D" => "\x1b[91m", // Light red
        "F" => "\x1b[31m", // Red
        _ => "\x1b[0m",
    }
}

/// Reset ANSI color
const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";

/// Render summary as formatted terminal output
pub fn render(summary: &RunSummary) -> Result<String> {
    let mut out = String::new();

    out.push_str(&format!("\n{BOLD}spendlab data quality{RESET}\n"));
    out.push_str(&format!(
        "{DIM}──────────────────────────────────────{RESET}\n"
    ));
    if let (Some(seed), Some(rows)) = (summary.seed, summary.rows_synthesized) {
        out.push_str(&format!("Synthesized {rows} transactions (seed {seed})\n"));
    }
    if !summary.defects.is_empty() {
        let parts: Vec<String> = summary
            .defects
            .iter()
            .map(|(kind, n)| format!("{n} {kind}"))
            .collect();
        out.push_str(&format!("Injected: {}\n", parts.join(", ")));
    }
    out.push('\n');

    let before_title = if summary.after.is_some() { "BEFORE CLEANING" } else { "REPORT" };
    render_report(&mut out, before_title, &summary.before);

    if let Some(log) = &summary.cleaning_log {
        render_log(&mut out, log);
    }
    if let Some(after) = &summary.after {
        render_report(&mut out, "AFTER CLEANING", after);
    }

    let last = summary.final_report();
    match last.grade.as_str() {
        "A" => out.push_str(&format!("{DIM}Dataset is clean.{RESET}\n")),
        _ => out.push_str(&format!(
            "{DIM}Run `spendlab clean` to repair the remaining issues.{RESET}\n"
        )),
    }

    Ok(out)
}

fn render_report(out: &mut String, title: &str, report: &QualityReport) {
    let grade_c = grade_color(&report.grade);
    out.push_str(&format!("{BOLD}{title}{RESET}\n"));
    out.push_str(&format!(
        "  Score: {BOLD}{:.1}/100{RESET}  Grade: {grade_c}{BOLD}{}{RESET}  Rows: {}  Columns: {}\n",
        report.score, report.grade, report.row_count, report.column_count
    ));

    let missing: Vec<String> = report
        .missing_by_column
        .iter()
        .filter(|(_, s)| s.count > 0)
        .map(|(c, s)| format!("{c} {} ({:.1}%)", s.count, s.pct))
        .collect();
    out.push_str(&format!(
        "  Missing:    {}\n",
        if missing.is_empty() { "none".to_string() } else { missing.join(", ") }
    ));
    if report.invalid_rows > 0 {
        let invalid: Vec<String> = report
            .invalid_by_column
            .iter()
            .filter(|(_, n)| **n > 0)
            .map(|(c, n)| format!("{c} {n}"))
            .collect();
        out.push_str(&format!(
            "  Invalid:    {} rows out of range ({})\n",
            report.invalid_rows,
            invalid.join(", ")
        ));
    }
    out.push_str(&format!(
        "  Duplicates: {} rows in {} groups\n",
        report.duplicate_count, report.duplicate_groups
    ));
    for (column, stat) in &report.outlier_by_column {
        out.push_str(&format!(
            "  Outliers:   {column} {} outside [{:.0}, {:.0}] {DIM}(min {:.0}, max {:.0}){RESET}\n",
            stat.count, stat.lower_bound, stat.upper_bound, stat.min, stat.max
        ));
    }
    for (column, histogram) in &report.format_variants {
        let buckets: Vec<String> = histogram
            .iter()
            .map(|(f, n)| format!("{} {n}", f.name()))
            .collect();
        out.push_str(&format!("  Formats:    {column} {}\n", buckets.join(", ")));
    }
    out.push_str(&format!(
        "  Encoding:   {} corrupted values\n",
        report.total_encoding_issues()
    ));

    let penalties: Vec<String> = report
        .penalties
        .iter()
        .filter(|(_, p)| **p > 0.0)
        .map(|(name, p)| format!("{name} -{p:.2}"))
        .collect();
    if !penalties.is_empty() {
        out.push_str(&format!("  {DIM}Penalties: {}{RESET}\n", penalties.join(", ")));
    }
    out.push('\n');
}

fn render_log(out: &mut String, log: &CleaningLog) {
    out.push_str(&format!("{BOLD}CLEANING LOG{RESET} ({} actions)\n", log.len()));
    if log.is_empty() {
        out.push_str(&format!("  {DIM}nothing to do{RESET}\n"));
    }
    for (i, entry) in log.iter().enumerate() {
        out.push_str(&format!("  {DIM}{:>3}{RESET}  {}\n", i + 1, entry.describe()));
    }
    out.push('\n');
}
