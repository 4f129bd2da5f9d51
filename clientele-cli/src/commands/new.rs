//! New command - fetch a customer or build an unsaved one with a fresh id

use anyhow::Result;
use colored::Colorize;

use super::get_context;
use crate::output;

pub fn run(id: Option<i64>, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let customer = ctx.customer_service.create_customer_from_id(id)?;

    if json {
        return output::print_json(&customer);
    }

    let is_new = customer.created_at.is_none();
    if is_new {
        output::info("New customer (not saved)");
        if let Some(requested) = id {
            println!("{}", format!("No customer with id {}, allocated a new id", requested).dimmed());
        }
    }
    println!("{}", output::customer_table(&customer));
    Ok(())
}
