use chrono::{TimeZone, Utc};
use colored::*;
use querylens_controller::{ColumnDescriptor, ColumnVisibility, ControllerSnapshot};
use querylens_protocol::records::Record;
use serde_json::Value;

/// Columns holding SQL text, shortened unless full SQL is requested.
const SQL_COLUMNS: [&str; 4] = ["query", "digest_text", "query_sample_text", "prev_stmt"];
/// Columns holding unix seconds.
const TIME_COLUMNS: [&str; 5] = [
    "timestamp",
    "first_seen",
    "last_seen",
    "summary_begin_time",
    "summary_end_time",
];
const SQL_PREVIEW_CHARS: usize = 60;

pub fn format_cell(column: &str, value: Option<&Value>, full_sql: bool) -> String {
    match value {
        None | Some(Value::Null) => "-".to_string(),
        Some(Value::String(text)) => {
            let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
            if !full_sql && SQL_COLUMNS.contains(&column) {
                truncate(&text, SQL_PREVIEW_CHARS)
            } else {
                text
            }
        }
        Some(Value::Number(number)) if TIME_COLUMNS.contains(&column) => number
            .as_f64()
            .and_then(|secs| Utc.timestamp_opt(secs as i64, 0).single())
            .map(|at| at.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| number.to_string()),
        Some(other) => other.to_string(),
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut short: String = text.chars().take(max_chars.saturating_sub(1)).collect();
    short.push('…');
    short
}

/// Lays rows out as a plain-text table.
pub fn render_table<R: Record>(rows: &[R], columns: &[String], full_sql: bool) -> String {
    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|row| {
            let snapshot = row.snapshot();
            columns
                .iter()
                .map(|column| format_cell(column, snapshot.get(column), full_sql))
                .collect()
        })
        .collect();

    let widths: Vec<usize> = columns
        .iter()
        .enumerate()
        .map(|(i, column)| {
            cells
                .iter()
                .map(|row| row[i].chars().count())
                .chain(std::iter::once(column.chars().count()))
                .max()
                .unwrap_or_default()
        })
        .collect();

    let mut out = String::new();
    let header: Vec<String> = columns
        .iter()
        .zip(&widths)
        .map(|(column, width)| format!("{column:<width$}"))
        .collect();
    out.push_str(&header.join("  ").bold().to_string());
    out.push('\n');

    for row in cells {
        let line: Vec<String> = row
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{cell:<width$}"))
            .collect();
        out.push_str(line.join("  ").trim_end());
        out.push('\n');
    }
    out
}

/// Prints error alerts, the slow-load advisory and the rows of one page.
pub fn print_list<R: Record>(
    snapshot: &ControllerSnapshot<R>,
    page_rows: &[R],
    columns: &[String],
    page_count: usize,
    full_sql: bool,
) {
    for error in &snapshot.errors {
        eprintln!("{} {}", "✖".red().bold(), error.red());
    }

    if snapshot.is_data_loaded_slowly == Some(true) {
        eprintln!(
            "{}",
            "⚠ This query took a long time. Narrow the time range or add filters to speed it up."
                .yellow()
        );
    }

    if snapshot.is_empty_result() {
        println!("{}", "No results".dimmed());
        return;
    }

    if snapshot.data.is_none() {
        return;
    }

    print!("{}", render_table(page_rows, columns, full_sql));
    println!(
        "{}",
        format!(
            "page {} of {} · sorted by {}",
            snapshot.page + 1,
            page_count.max(1),
            snapshot.order
        )
        .dimmed()
    );
}

pub fn print_columns(columns: &[ColumnDescriptor], visibility: &ColumnVisibility) {
    for column in columns {
        let visible = visibility.get(&column.id).copied().unwrap_or(false);
        let mark = if visible { "●".green() } else { "○".dimmed() };
        let note = if column.advertised {
            ""
        } else {
            " (not advertised)"
        };
        println!("{mark} {}{}", column.id, note.dimmed());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use querylens_protocol::records::SlowQueryRecord;
    use serde_json::json;

    #[test]
    fn sql_is_shortened_unless_requested() {
        let long = "select ".repeat(20);
        let short = format_cell("query", Some(&json!(long)), false);
        assert_eq!(short.chars().count(), SQL_PREVIEW_CHARS);
        assert!(short.ends_with('…'));

        let full = format_cell("query", Some(&json!(long)), true);
        assert_eq!(full, long.trim_end());
    }

    #[test]
    fn timestamps_render_as_dates() {
        assert_eq!(
            format_cell("timestamp", Some(&json!(0.0)), false),
            "1970-01-01 00:00:00"
        );
        assert_eq!(format_cell("query_time", Some(&json!(1.5)), false), "1.5");
        assert_eq!(format_cell("db", None, false), "-");
    }

    #[test]
    fn table_aligns_columns() {
        colored::control::set_override(false);
        let rows = vec![SlowQueryRecord {
            db: Some("app".into()),
            query: Some("select 1".into()),
            ..Default::default()
        }];
        let table = render_table(&rows, &["db".to_string(), "query".to_string()], false);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[0].trim_end(), "db   query");
        assert_eq!(lines[1], "app  select 1");
    }
}
