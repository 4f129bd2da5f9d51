//! Status command - show the data directory and customer counts

use anyhow::Result;
use colored::Colorize;
use serde::Serialize;

use super::get_context;
use crate::output;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusSummary {
    data_dir: String,
    database_path: Option<String>,
    total_customers: i64,
    registered_customers: i64,
    password_encoder: String,
    id_batch_size: u32,
}

pub fn run(json: bool) -> Result<()> {
    let ctx = get_context()?;

    let status = StatusSummary {
        data_dir: ctx.data_dir.display().to_string(),
        database_path: ctx.repository.db_path().map(|p| p.display().to_string()),
        total_customers: ctx.repository.count_customers()?,
        registered_customers: ctx.repository.count_registered_customers()?,
        password_encoder: ctx.config.password_encoder.to_string(),
        id_batch_size: ctx.id_generation_service.batch_size(),
    };

    if json {
        return output::print_json(&status);
    }

    println!("{}", "Clientele Status".bold());
    println!();

    let mut table = output::create_table();
    table.add_row(vec!["Customers".to_string(), status.total_customers.to_string()]);
    table.add_row(vec!["Registered".to_string(), status.registered_customers.to_string()]);
    table.add_row(vec!["Password encoder".to_string(), status.password_encoder.clone()]);
    table.add_row(vec!["Id batch size".to_string(), status.id_batch_size.to_string()]);
    println!("{}", table);
    println!();

    println!("Data directory: {}", status.data_dir);
    if let Some(path) = &status.database_path {
        println!("Database: {}", path);
    }

    Ok(())
}
