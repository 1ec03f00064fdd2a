//! CLI command definitions and dispatch.

pub mod control;
pub mod token;

use clap::{Parser, Subcommand};

use crate::output::OutputFormat;
use relayhub_core::error::AppError;

/// RelayHub: real-time WebSocket gateway
#[derive(Debug, Parser)]
#[command(name = "relayhub", version, about, long_about = None)]
pub struct Cli {
    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Number of users online on a hub
    Online(control::HubArgs),
    /// List users online on a hub
    Users(control::HubArgs),
    /// Send a JSON payload to one user
    Send(control::SendArgs),
    /// Send a JSON payload to every user on a hub
    Broadcast(control::BroadcastArgs),
    /// Issue a connection token for local testing
    Token(token::TokenArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self) -> Result<(), AppError> {
        match &self.command {
            Commands::Online(args) => control::online(args, self.format).await,
            Commands::Users(args) => control::users(args, self.format).await,
            Commands::Send(args) => control::send(args).await,
            Commands::Broadcast(args) => control::broadcast(args).await,
            Commands::Token(args) => token::execute(args),
        }
    }
}
