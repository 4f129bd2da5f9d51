//! Clientele CLI - customer profiles in your terminal

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;

mod commands;
mod output;

use commands::{logs, new, passwd, register, show, status};

/// Clientele - customer profiles in your terminal
#[derive(Parser)]
#[command(name = "cl", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a new customer
    Register {
        /// Login name (must be unique)
        username: String,
        /// Email address
        #[arg(long)]
        email: String,
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
        /// Password (falls back to CLIENTELE_PASSWORD, then a prompt)
        #[arg(short, long)]
        password: Option<String>,
        /// Security question used for password recovery
        #[arg(long)]
        challenge_question: Option<String>,
        /// Answer to the security question (prompted when omitted)
        #[arg(long)]
        challenge_answer: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show a customer
    Show {
        #[arg(long)]
        id: Option<i64>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        username: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Change a customer's password
    Passwd {
        username: String,
        /// Current password (falls back to CLIENTELE_PASSWORD, then a prompt)
        #[arg(long)]
        current_password: Option<String>,
        /// New password (falls back to CLIENTELE_NEW_PASSWORD, then a prompt)
        #[arg(long)]
        new_password: Option<String>,
        /// Force another change at next login
        #[arg(long)]
        require_change: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Fetch a customer by id, or build an unsaved one with a fresh id
    New {
        #[arg(long)]
        id: Option<i64>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show database status and configuration
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// View and manage application logs
    Logs {
        #[command(subcommand)]
        command: logs::LogsCommands,
    },
}

impl Commands {
    fn wants_json(&self) -> bool {
        match self {
            Commands::Register { json, .. }
            | Commands::Show { json, .. }
            | Commands::Passwd { json, .. }
            | Commands::New { json, .. }
            | Commands::Status { json } => *json,
            Commands::Logs { command } => command.wants_json(),
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let json = cli.command.wants_json();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if json {
                output::print_json_error(&e);
            } else {
                eprintln!("{} {:#}", "Error:".red().bold(), e);
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Register {
            username,
            email,
            first_name,
            last_name,
            password,
            challenge_question,
            challenge_answer,
            json,
        } => register::run(register::RegisterArgs {
            username,
            email,
            first_name,
            last_name,
            password,
            challenge_question,
            challenge_answer,
            json,
        }),
        Commands::Show { id, email, username, json } => {
            show::run(show::Lookup::from_args(id, email, username)?, json)
        }
        Commands::Passwd {
            username,
            current_password,
            new_password,
            require_change,
            json,
        } => passwd::run(username, current_password, new_password, require_change, json),
        Commands::New { id, json } => new::run(id, json),
        Commands::Status { json } => status::run(json),
        Commands::Logs { command } => logs::run(command),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_register() {
        let cli = Cli::try_parse_from([
            "cl", "register", "bob", "--email", "bob@example.com", "--password", "hunter2hunter2",
        ])
        .unwrap();
        match cli.command {
            Commands::Register { username, email, password, json, .. } => {
                assert_eq!(username, "bob");
                assert_eq!(email, "bob@example.com");
                assert_eq!(password.as_deref(), Some("hunter2hunter2"));
                assert!(!json);
            }
            _ => panic!("expected register"),
        }
    }

    #[test]
    fn test_json_flag_is_seen_through_subcommands() {
        let cli = Cli::try_parse_from(["cl", "logs", "list", "--customer", "7", "--json"]).unwrap();
        assert!(cli.command.wants_json());

        let cli = Cli::try_parse_from(["cl", "new"]).unwrap();
        assert!(!cli.command.wants_json());
    }

    #[test]
    fn test_show_requires_exactly_one_key() {
        assert!(show::Lookup::from_args(None, None, None).is_err());
        assert!(show::Lookup::from_args(Some(1), Some("a@b.co".into()), None).is_err());
        assert!(matches!(
            show::Lookup::from_args(None, None, Some("bob".into())),
            Ok(show::Lookup::Username(_))
        ));
    }
}
