//! Show command - look up a customer by id, email or username

use anyhow::{bail, Result};
use colored::Colorize;

use clientele_core::Customer;

use super::get_context;
use crate::output;

/// Which key to look the customer up by
pub enum Lookup {
    Id(i64),
    Email(String),
    Username(String),
}

impl Lookup {
    pub fn from_args(id: Option<i64>, email: Option<String>, username: Option<String>) -> Result<Self> {
        match (id, email, username) {
            (Some(id), None, None) => Ok(Lookup::Id(id)),
            (None, Some(email), None) => Ok(Lookup::Email(email)),
            (None, None, Some(username)) => Ok(Lookup::Username(username)),
            (None, None, None) => bail!("Give one of --id, --email or --username"),
            _ => bail!("Give only one of --id, --email or --username"),
        }
    }

    fn describe(&self) -> String {
        match self {
            Lookup::Id(id) => format!("id {}", id),
            Lookup::Email(email) => format!("email '{}'", email),
            Lookup::Username(username) => format!("username '{}'", username),
        }
    }
}

pub fn run(lookup: Lookup, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let service = &ctx.customer_service;

    let found: Option<Customer> = match &lookup {
        Lookup::Id(id) => service.read_customer_by_id(*id)?,
        Lookup::Email(email) => service.read_customer_by_email(email)?,
        Lookup::Username(username) => service.read_customer_by_username(username)?,
    };

    if json {
        return output::print_json(&found);
    }

    match found {
        Some(customer) => println!("{}", output::customer_table(&customer)),
        None => println!("{}", format!("No customer with {}", lookup.describe()).dimmed()),
    }
    Ok(())
}
