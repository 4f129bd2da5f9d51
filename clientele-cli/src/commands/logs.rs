//! Logs command - read, summarize and prune the event log

use anyhow::Result;
use chrono::{Duration, Utc};
use clap::Subcommand;
use colored::Colorize;
use dialoguer::Confirm;
use serde_json::json;

use clientele_core::services::{LogEntry, LogStats};
use clientele_core::{EntryPoint, LogQuery, LoggingService};

use super::get_clientele_dir;
use crate::output::{self, format_timestamp};

#[derive(Subcommand)]
pub enum LogsCommands {
    /// Show recent log entries
    List {
        /// Number of entries to show
        #[arg(short, long, default_value = "50")]
        limit: usize,
        /// Show only failures
        #[arg(long)]
        errors: bool,
        /// Only entries about this customer id
        #[arg(long)]
        customer: Option<i64>,
        /// Only entries from this command (register, passwd, ...)
        #[arg(long)]
        command: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete old log entries
    Clear {
        /// Delete entries older than N days
        #[arg(long, default_value = "30")]
        older_than_days: u64,
        /// Skip confirmation prompt
        #[arg(long, short = 'f')]
        force: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show entry counts per event and the log database path
    Stats {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

impl LogsCommands {
    pub fn wants_json(&self) -> bool {
        match self {
            LogsCommands::List { json, .. }
            | LogsCommands::Clear { json, .. }
            | LogsCommands::Stats { json } => *json,
        }
    }
}

fn open_log() -> Result<LoggingService> {
    let dir = get_clientele_dir()?;
    std::fs::create_dir_all(&dir)?;
    LoggingService::new(&dir, EntryPoint::Cli, env!("CARGO_PKG_VERSION"))
}

pub fn run(command: LogsCommands) -> Result<()> {
    let logs = open_log()?;
    match command {
        LogsCommands::List {
            limit,
            errors,
            customer,
            command,
            json,
        } => {
            let query = LogQuery {
                limit,
                errors_only: errors,
                customer_id: customer,
                command,
            };
            list(&logs, &query, json)
        }
        LogsCommands::Clear {
            older_than_days,
            force,
            json,
        } => clear(&logs, older_than_days, force, json),
        LogsCommands::Stats { json } => stats(&logs, json),
    }
}

fn list(logs: &LoggingService, query: &LogQuery, json: bool) -> Result<()> {
    let entries = logs.query(query)?;

    if json {
        return output::print_json(&entries);
    }
    if entries.is_empty() {
        println!("{}", "No log entries.".dimmed());
        return Ok(());
    }

    let mut table = output::create_table();
    table.set_header(vec!["Time", "Event", "Command", "Customer", "Error"]);
    for entry in &entries {
        table.add_row(vec![
            format_timestamp(entry.timestamp),
            entry.event.clone(),
            entry.command.clone().unwrap_or_default(),
            entry.customer_id.map(|id| id.to_string()).unwrap_or_default(),
            error_cell(entry),
        ]);
    }
    println!("{}", table);
    Ok(())
}

fn error_cell(entry: &LogEntry) -> String {
    match &entry.error_message {
        Some(message) => message.red().to_string(),
        None => String::new(),
    }
}

fn clear(logs: &LoggingService, older_than_days: u64, force: bool, json: bool) -> Result<()> {
    let cutoff = Utc::now() - Duration::days(older_than_days as i64);

    if !force && !json {
        let confirmed = Confirm::new()
            .with_prompt(format!(
                "Delete log entries from before {}?",
                cutoff.format("%Y-%m-%d")
            ))
            .default(false)
            .interact()?;
        if !confirmed {
            println!("Cancelled.");
            return Ok(());
        }
    }

    let deleted = logs.delete_before(cutoff.timestamp_millis())?;
    if json {
        output::print_json(json!({ "deleted": deleted }))
    } else {
        output::success(&format!("Deleted {} log entries", deleted));
        Ok(())
    }
}

fn stats(logs: &LoggingService, json: bool) -> Result<()> {
    let stats: LogStats = logs.stats()?;
    let db_path = logs.db_path();
    let size_bytes = std::fs::metadata(db_path).map(|m| m.len()).unwrap_or(0);

    if json {
        return output::print_json(json!({
            "stats": stats,
            "databasePath": db_path.display().to_string(),
            "databaseSizeBytes": size_bytes,
        }));
    }

    println!("{}", "Event Log".bold());
    println!("  Entries: {} ({} failed)", stats.total, stats.errors);
    if let Some(first) = stats.first_timestamp {
        println!("  Since:   {}", format_timestamp(first));
    }
    println!("  File:    {} ({})", db_path.display(), output::format_size(size_bytes));

    if !stats.events.is_empty() {
        println!();
        let mut table = output::create_table();
        table.set_header(vec!["Event", "Count"]);
        for (event, count) in &stats.events {
            table.add_row(vec![event.clone(), count.to_string()]);
        }
        println!("{}", table);
    }
    Ok(())
}
