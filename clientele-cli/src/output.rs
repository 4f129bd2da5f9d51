//! Output formatting utilities

use chrono::{DateTime, TimeZone, Utc};
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL_CONDENSED, ContentArrangement, Table};
use serde::Serialize;

use clientele_core::{Customer, Error, OperationResult};

/// Print a success message
pub fn success(msg: &str) {
    println!("{}", msg.green());
}

/// Print a warning message
pub fn warning(msg: &str) {
    println!("{}", msg.yellow());
}

/// Print an info message
pub fn info(msg: &str) {
    println!("{}", msg.cyan());
}

/// Print a successful result as JSON
pub fn print_json<T: Serialize>(data: T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(&OperationResult::ok(data))?);
    Ok(())
}

/// Print a failed command as JSON, keeping the core error kind when there is one
pub fn print_json_error(err: &anyhow::Error) {
    let result: OperationResult<()> = match err.downcast_ref::<Error>() {
        Some(core) => OperationResult::from_error(core),
        None => OperationResult::fail(format!("{:#}", err)),
    };
    match serde_json::to_string_pretty(&result) {
        Ok(json) => println!("{}", json),
        Err(_) => eprintln!("{:#}", err),
    }
}

/// Create a styled table
pub fn create_table() -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table
}

pub fn format_timestamp(timestamp_ms: i64) -> String {
    Utc.timestamp_millis_opt(timestamp_ms)
        .single()
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| timestamp_ms.to_string())
}

fn format_datetime(value: Option<DateTime<Utc>>) -> String {
    value
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn or_dash(value: Option<&str>) -> String {
    value.unwrap_or("-").to_string()
}

/// Vertical key/value table for one customer (secrets are never shown)
pub fn customer_table(customer: &Customer) -> Table {
    let mut table = create_table();
    table.add_row(vec![
        "ID".to_string(),
        customer.id.map(|id| id.to_string()).unwrap_or_else(|| "-".to_string()),
    ]);
    table.add_row(vec!["Username".to_string(), or_dash(customer.username.as_deref())]);
    table.add_row(vec!["Email".to_string(), or_dash(customer.email.as_deref())]);
    table.add_row(vec!["Name".to_string(), customer.display_name()]);
    table.add_row(vec![
        "Challenge question".to_string(),
        or_dash(customer.challenge_question.as_deref()),
    ]);
    table.add_row(vec!["Registered".to_string(), customer.registered.to_string()]);
    table.add_row(vec![
        "Password change required".to_string(),
        customer.password_change_required.to_string(),
    ]);
    table.add_row(vec!["Created".to_string(), format_datetime(customer.created_at)]);
    table.add_row(vec!["Updated".to_string(), format_datetime(customer.updated_at)]);
    table
}

/// Format bytes as human-readable size
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}
