//! Passwd command - change a customer's password

use anyhow::{bail, Result};
use serde::Serialize;

use clientele_core::{AuthenticationSummary, Customer, LogEvent, PasswordChange, SecurityContext};

use super::{
    get_context, get_logger, get_new_password, get_password_or_prompt, log_event, log_failure,
    NEW_PASSWORD_ENV,
};
use crate::output;

#[derive(Serialize)]
struct PasswordChanged {
    customer: Customer,
    authentication: Option<AuthenticationSummary>,
}

pub fn run(
    username: String,
    current_password: Option<String>,
    new_password: Option<String>,
    require_change: bool,
    json: bool,
) -> Result<()> {
    let logger = get_logger();
    log_event(&logger, LogEvent::new("command_executed").with_command("passwd"));

    match change(username, current_password, new_password, require_change, json) {
        Ok(customer_id) => {
            log_event(
                &logger,
                LogEvent::new("password_changed")
                    .with_command("passwd")
                    .with_customer(customer_id),
            );
            Ok(())
        }
        Err(e) => Err(log_failure(&logger, "password_change_failed", "passwd", e)),
    }
}

fn change(
    username: String,
    current_password: Option<String>,
    new_password: Option<String>,
    require_change: bool,
    json: bool,
) -> Result<Option<i64>> {
    let ctx = get_context()?;

    let current = get_password_or_prompt(current_password, "Current password")?;
    let mut security_context = SecurityContext::new();
    ctx.authentication_service
        .authenticate(&username, &current, &mut security_context)?;

    let (new_password, confirm) = get_new_password(new_password, NEW_PASSWORD_ENV, "New password")?;
    if new_password == current {
        bail!("New password must differ from the current one");
    }

    let mut password_change = PasswordChange::new(username, new_password).requiring_change(require_change);
    password_change.current_password = Some(current);
    password_change.new_password_confirm = confirm;
    password_change.validate(ctx.config.min_password_length)?;

    let customer = ctx
        .customer_service
        .change_password(&password_change, &mut security_context)?;
    let customer_id = customer.id;

    if json {
        output::print_json(PasswordChanged {
            customer,
            authentication: security_context.authentication().map(|a| a.summary()),
        })?;
    } else {
        output::success(&format!("Password changed for '{}'", password_change.username));
        if customer.password_change_required {
            output::warning("The customer must change this password at next login");
        }
    }

    Ok(customer_id)
}
