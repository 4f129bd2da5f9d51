//! CLI command implementations

pub mod logs;
pub mod new;
pub mod passwd;
pub mod register;
pub mod show;
pub mod status;

use std::env;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use dialoguer::Password;
use clientele_core::{ClienteleContext, EntryPoint, LogEvent, LoggingService};

/// Environment variable consulted for passwords before prompting
pub const PASSWORD_ENV: &str = "CLIENTELE_PASSWORD";
/// Replacement password for `passwd`
pub const NEW_PASSWORD_ENV: &str = "CLIENTELE_NEW_PASSWORD";

/// Get the logging service for CLI operations
///
/// Returns None if logging fails to initialize (shouldn't block operations)
pub fn get_logger() -> Option<LoggingService> {
    let clientele_dir = get_clientele_dir().ok()?;
    // Ensure directory exists
    std::fs::create_dir_all(&clientele_dir).ok()?;
    LoggingService::new(&clientele_dir, EntryPoint::Cli, env!("CARGO_PKG_VERSION")).ok()
}

/// Log an event, ignoring any errors (logging should never break the app)
pub fn log_event(logger: &Option<LoggingService>, event: LogEvent) {
    if let Some(l) = logger {
        let _ = l.log(event);
    }
}

/// Log a failed command and pass the error through
pub fn log_failure(logger: &Option<LoggingService>, event: &str, command: &str, err: anyhow::Error) -> anyhow::Error {
    log_event(
        logger,
        LogEvent::new(event)
            .with_command(command)
            .with_error(err.to_string()),
    );
    err
}

/// Get the clientele directory from environment or default
pub fn get_clientele_dir() -> Result<PathBuf> {
    if let Ok(dir) = env::var("CLIENTELE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|home| home.join(".clientele"))
        .ok_or_else(|| anyhow!("Could not find home directory; set CLIENTELE_DIR"))
}

/// Open the clientele context in the data directory
pub fn get_context() -> Result<ClienteleContext> {
    let clientele_dir = get_clientele_dir()?;
    ClienteleContext::new(&clientele_dir).context("Failed to initialize clientele context")
}

/// Get password from flag, CLIENTELE_PASSWORD env var, or prompt
pub fn get_password_or_prompt(password_flag: Option<String>, prompt: &str) -> Result<String> {
    if let Some(p) = password_flag {
        return Ok(p);
    }
    if let Ok(p) = env::var(PASSWORD_ENV) {
        return Ok(p);
    }
    let p = Password::new().with_prompt(prompt).interact()?;
    Ok(p)
}

/// Get a new password from flag, `env_var`, or a prompt asked twice
///
/// Returns the password and, when prompted, the confirmation as typed.
pub fn get_new_password(
    password_flag: Option<String>,
    env_var: &str,
    prompt: &str,
) -> Result<(String, Option<String>)> {
    if let Some(p) = password_flag {
        return Ok((p, None));
    }
    if let Ok(p) = env::var(env_var) {
        return Ok((p, None));
    }
    let p1 = Password::new().with_prompt(prompt).interact()?;
    let p2 = Password::new().with_prompt("Confirm password").interact()?;
    Ok((p1, Some(p2)))
}
