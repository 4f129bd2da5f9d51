//! Register command - create a customer account

use anyhow::{bail, Result};
use colored::Colorize;
use dialoguer::Password;

use clientele_core::{Customer, LogEvent, PasswordChange};

use super::{get_context, get_logger, get_new_password, log_event, log_failure, PASSWORD_ENV};
use crate::output;

pub struct RegisterArgs {
    pub username: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub password: Option<String>,
    pub challenge_question: Option<String>,
    pub challenge_answer: Option<String>,
    pub json: bool,
}

pub fn run(args: RegisterArgs) -> Result<()> {
    let logger = get_logger();
    log_event(&logger, LogEvent::new("command_executed").with_command("register"));

    match register(args) {
        Ok(customer_id) => {
            log_event(
                &logger,
                LogEvent::new("customer_registered")
                    .with_command("register")
                    .with_customer(customer_id),
            );
            Ok(())
        }
        Err(e) => Err(log_failure(&logger, "registration_failed", "register", e)),
    }
}

fn register(args: RegisterArgs) -> Result<Option<i64>> {
    let ctx = get_context()?;

    let mut customer = Customer::new(args.username.trim(), args.email.trim());
    customer.first_name = args.first_name;
    customer.last_name = args.last_name;
    customer.validate_registration()?;

    if ctx
        .customer_service
        .read_customer_by_username(args.username.trim())?
        .is_some()
    {
        bail!("Username '{}' is already taken", args.username.trim());
    }

    let (password, confirm) = get_new_password(args.password, PASSWORD_ENV, "Password")?;
    let mut check = PasswordChange::new(args.username.trim(), password.clone());
    check.new_password_confirm = confirm;
    check.validate(ctx.config.min_password_length)?;
    customer.unencoded_password = Some(password);

    if let Some(question) = args.challenge_question {
        let answer = match args.challenge_answer {
            Some(a) => a,
            None => Password::new().with_prompt(question.as_str()).interact()?,
        };
        customer = customer.with_challenge(question, answer);
    } else if args.challenge_answer.is_some() {
        bail!("--challenge-answer needs --challenge-question");
    }

    let saved = ctx.customer_service.register_customer(customer)?;

    if args.json {
        output::print_json(&saved)?;
    } else {
        output::success(&format!("Registered customer '{}'", saved.display_name()));
        println!("{}", output::customer_table(&saved));
        if saved.challenge_question.is_none() {
            println!("{}", "No challenge question set".dimmed());
        }
    }

    Ok(saved.id)
}
