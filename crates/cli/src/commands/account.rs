//! Account registration and login commands

use anyhow::{bail, Result};

use crate::client::{ApiClient, AuthResponse, LoginRequest, RegisterRequest};
use crate::output::{print_error, print_json, print_success, OutputFormat};

pub async fn register(
    client: &ApiClient,
    username: &str,
    password: &str,
    email: Option<String>,
    format: OutputFormat,
) -> Result<()> {
    let request = RegisterRequest {
        username: username.to_string(),
        password: password.to_string(),
        email,
    };
    let (_, response) = client.register(&request).await?;
    report(&response, format)
}

pub async fn login(
    client: &ApiClient,
    username: &str,
    password: &str,
    format: OutputFormat,
) -> Result<()> {
    let request = LoginRequest {
        username: username.to_string(),
        password: password.to_string(),
    };
    let (_, response) = client.login(&request).await?;
    report(&response, format)
}

/// Print the server's message; a rejected request is a failed command
fn report(response: &AuthResponse, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(response),
        OutputFormat::Table if response.success => print_success(&response.message),
        OutputFormat::Table => print_error(&response.message),
    }
    if !response.success {
        bail!("{}", response.message);
    }
    Ok(())
}
