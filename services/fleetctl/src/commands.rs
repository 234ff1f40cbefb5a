//! Subcommand execution
//!
//! Every command resolves to a `ResponseEnvelope<Value>` that `main` prints.
//! Token values are never part of the output.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result, bail};
use common::Secret;
use fleet_api::{ApiClient, LoginRedirect, Method, RequestOptions, ResponseEnvelope};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::warn;

use crate::cli::Command;

const PASSWORD_ENV: &str = "FLEET_PASSWORD";
const NEW_PASSWORD_ENV: &str = "FLEET_NEW_PASSWORD";

/// Tells the user to sign in again after the session was wiped.
pub struct CliRedirect;

impl LoginRedirect for CliRedirect {
    fn redirect_to_login(&self) {
        warn!("session expired and was cleared; run `fleetctl login` to sign in again");
    }
}

/// Password from a file if given, else from the environment.
pub fn resolve_password(file: Option<&Path>, env_key: &str) -> Result<Secret<String>> {
    if let Some(path) = file {
        return Secret::from_file(path).context("reading password file");
    }
    match Secret::from_env(env_key) {
        Some(secret) => Ok(secret),
        None => bail!("no password given: set {env_key} or pass a password file"),
    }
}

pub async fn run(command: Command, client: &ApiClient) -> Result<ResponseEnvelope<Value>> {
    let envelope = match command {
        Command::Login {
            email,
            password_file,
        } => {
            let password = resolve_password(password_file.as_deref(), PASSWORD_ENV)?;
            client
                .login(&email, password.expose())
                .await
                .map(move |_| json!({"logged_in": true, "email": email}))
        }
        Command::Logout => to_json(client.logout().await),
        Command::Profile => to_json(client.get_profile().await),
        Command::Validate => to_json(client.validate_token().await),
        Command::Refresh => client.refresh().await.map(|()| json!({"refreshed": true})),
        Command::Status => {
            let tokens = client.tokens().await.context("reading token store")?;
            ResponseEnvelope::local(json!({
                "logged_in": tokens.is_some(),
                "store": client.store().backend(),
                "base_url": client.base_url(),
            }))
        }
        Command::ChangePassword {
            current_password_file,
            new_password_file,
        } => {
            let current = resolve_password(current_password_file.as_deref(), PASSWORD_ENV)?;
            let new = resolve_password(new_password_file.as_deref(), NEW_PASSWORD_ENV)?;
            to_json(client.change_password(current.expose(), new.expose()).await)
        }
        Command::Request { method, path, data } => {
            let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
                .with_context(|| format!("invalid HTTP method {method:?}"))?;
            let body: Option<Value> = data
                .as_deref()
                .map(serde_json::from_str)
                .transpose()
                .context("--data must be valid JSON")?;
            client
                .request(method, &path, body.as_ref(), RequestOptions::default())
                .await
        }
    };
    Ok(envelope)
}

/// Write the envelope to stdout as pretty JSON.
pub fn print(envelope: &ResponseEnvelope<Value>) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, envelope).context("writing output")?;
    writeln!(stdout).context("writing output")?;
    Ok(())
}

fn to_json<T: Serialize>(envelope: ResponseEnvelope<T>) -> ResponseEnvelope<Value> {
    envelope.map(|data| serde_json::to_value(data).unwrap_or(Value::Null))
}
