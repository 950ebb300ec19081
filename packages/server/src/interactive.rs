//! Interactive server start.
//!
//! Prompts for the bind address and port, defaulting to the loaded
//! configuration, before starting the server.

use dialoguer::{Confirm, Input};
use police_perf_config::AppConfig;

use crate::ServerError;

/// Prompts for bind address and port, then runs the server.
///
/// # Errors
///
/// Returns [`ServerError`] if the server fails to start.
#[allow(clippy::future_not_send)]
pub async fn run(mut config: AppConfig) -> Result<(), ServerError> {
    println!("Police Performance Server");
    println!();

    config.bind_addr = Input::new()
        .with_prompt("Bind address")
        .default(config.bind_addr.clone())
        .interact_text()
        .unwrap_or(config.bind_addr);

    config.port = Input::new()
        .with_prompt("Port")
        .default(config.port)
        .interact_text()
        .unwrap_or(config.port);

    if !Confirm::new()
        .with_prompt(format!(
            "Start server on {}:{}?",
            config.bind_addr, config.port
        ))
        .default(true)
        .interact()
        .unwrap_or(true)
    {
        println!("Cancelled.");
        return Ok(());
    }

    crate::run_server(config).await
}
