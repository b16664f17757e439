//! Terminal output formatting.

use bta_core::history::model::{AnalysisRecord, RecordStatus, User};
use bta_core::SyncAnalysis;
use colored::{ColoredString, Colorize};
use unicode_width::UnicodeWidthStr;

/// Print a finished analysis.
pub fn print_analysis(done: &SyncAnalysis) {
    println!(
        "{} {}",
        done.outcome.analysis_type.to_string().cyan().bold(),
        format!("({}, {})", done.outcome.agent, done.outcome.model).dimmed()
    );
    println!("{}: {}", "Query".bold(), done.outcome.query);
    println!("{}: {}", "File".bold(), done.file_name);
    println!();
    println!("{}", done.outcome.text);
    println!();
}

/// Print one stored analysis in full.
pub fn print_record(record: &AnalysisRecord) {
    println!(
        "{} {}",
        format!("Analysis {}", record.id).cyan().bold(),
        format!("({})", record.created_at).dimmed()
    );
    println!();
    println!("{}: {}", "Status".bold(), status_colored(record.status));
    println!("{}: {}", "Type".bold(), record.analysis_type);
    println!("{}: {}", "File".bold(), record.file_name);
    println!("{}: {}", "Query".bold(), record.query);
    println!("{}: {:.1}s", "Time".bold(), record.processing_time);
    if let Some(task_id) = &record.task_id {
        println!("{}: {}", "Task".bold(), task_id.dimmed());
    }
    println!();
    println!("{}", record.result);
}

/// Print a user's analyses as a table.
pub fn print_history_table(user_id: &str, records: &[AnalysisRecord]) {
    if records.is_empty() {
        println!("{}", format!("No analyses for {}.", user_id).dimmed());
        return;
    }

    println!(
        "{:<6} {:<20} {:<13} {:<10} {:<24} {:<28}",
        "ID", "Created", "Type", "Status", "File", "Query"
    );
    println!("{}", "─".repeat(104));

    for record in records {
        println!(
            "{:<6} {:<20} {:<13} {:<10} {:<24} {:<28}",
            record.id,
            short_timestamp(&record.created_at),
            record.analysis_type,
            // Pad before coloring so escape codes don't break alignment.
            status_colored_padded(record.status, 10),
            pad_visual(&truncate_visual(&record.file_name, 22), 24),
            truncate_visual(&record.query, 28)
        );
    }

    println!();
    println!("{}", format!("{} analyses", records.len()).dimmed());
}

/// Print a user.
pub fn print_user(user: &User) {
    println!("{}", user.user_id.cyan().bold());
    println!();
    println!(
        "{}: {}",
        "Email".bold(),
        user.email.as_deref().unwrap_or("-")
    );
    println!("{}: {}", "Created".bold(), user.created_at);
    println!("{}: {}", "Analyses".bold(), user.total_analyses);
}

fn status_colored(status: RecordStatus) -> ColoredString {
    match status {
        RecordStatus::Completed => status.as_str().green(),
        RecordStatus::Failed => status.as_str().red(),
    }
}

fn status_colored_padded(status: RecordStatus, width: usize) -> ColoredString {
    let padded = format!("{:<width$}", status.as_str(), width = width);
    match status {
        RecordStatus::Completed => padded.green(),
        RecordStatus::Failed => padded.red(),
    }
}

/// `2024-05-01T10:20:30.123456Z` -> `2024-05-01 10:20:30`.
fn short_timestamp(ts: &str) -> String {
    ts.get(..19).unwrap_or(ts).replace('T', " ")
}

/// Truncate to a display width, marking the cut with `..`.
fn truncate_visual(s: &str, max_width: usize) -> String {
    let s = s.lines().next().unwrap_or_default();
    if UnicodeWidthStr::width(s) <= max_width {
        return s.to_string();
    }
    if max_width <= 3 {
        return ".".repeat(max_width);
    }
    let mut result = String::new();
    let mut current_width = 0;
    for ch in s.chars() {
        let ch_width = unicode_width::UnicodeWidthChar::width(ch).unwrap_or(0);
        if current_width + ch_width > max_width - 2 {
            break;
        }
        result.push(ch);
        current_width += ch_width;
    }
    result.push_str("..");
    result
}

/// Pad to a display width; `format!` pads by chars, not columns.
fn pad_visual(s: &str, width: usize) -> String {
    let used = UnicodeWidthStr::width(s);
    format!("{}{}", s, " ".repeat(width.saturating_sub(used)))
}
