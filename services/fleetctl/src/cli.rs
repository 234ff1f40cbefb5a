//! Command-line interface definition

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Command-line client for the fleet dashboard API
#[derive(Debug, Parser)]
#[command(name = "fleetctl", version, about)]
pub struct Cli {
    /// Path to the TOML config file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Sign in and store the issued token pair
    Login {
        #[arg(long)]
        email: String,
        /// File holding the password (defaults to FLEET_PASSWORD)
        #[arg(long)]
        password_file: Option<PathBuf>,
    },
    /// Sign out and delete the stored tokens
    Logout,
    /// Show the signed-in user's profile
    Profile,
    /// Ask the backend whether the stored access token is accepted
    Validate,
    /// Rotate the stored token pair now
    Refresh,
    /// Show whether a session is stored, without printing tokens
    Status,
    /// Change the signed-in user's password
    ChangePassword {
        /// File holding the current password (defaults to FLEET_PASSWORD)
        #[arg(long)]
        current_password_file: Option<PathBuf>,
        /// File holding the new password (defaults to FLEET_NEW_PASSWORD)
        #[arg(long)]
        new_password_file: Option<PathBuf>,
    },
    /// Send an authenticated request to any endpoint
    Request {
        /// HTTP method, e.g. GET or POST
        method: String,
        /// Path relative to the base URL, e.g. /api/v1/vehicles
        path: String,
        /// JSON request body
        #[arg(long)]
        data: Option<String>,
    },
}
