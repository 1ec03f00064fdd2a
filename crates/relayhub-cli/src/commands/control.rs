//! Control-plane commands.

use clap::Args;
use serde::Serialize;
use tabled::Tabled;

use relayhub_core::error::AppError;
use relayhub_realtime::OnlineUser;

use crate::client::{ControlClient, parse_payload};
use crate::output::{self, OutputFormat};

/// Which hub's control listener to talk to
#[derive(Debug, Args)]
pub struct HubArgs {
    /// Control listener address (`host:port`)
    #[arg(short, long, default_value = "127.0.0.1:50051")]
    pub addr: String,
}

#[derive(Debug, Args)]
pub struct SendArgs {
    #[command(flatten)]
    pub hub: HubArgs,
    /// Recipient user id
    #[arg(short, long)]
    pub user_id: i64,
    /// JSON payload, delivered verbatim
    #[arg(short, long)]
    pub payload: String,
}

#[derive(Debug, Args)]
pub struct BroadcastArgs {
    #[command(flatten)]
    pub hub: HubArgs,
    /// JSON payload, delivered verbatim
    #[arg(short, long)]
    pub payload: String,
}

#[derive(Debug, Serialize, Tabled)]
struct UserRow {
    id: i64,
    username: String,
    hardware_id: String,
}

impl From<OnlineUser> for UserRow {
    fn from(user: OnlineUser) -> Self {
        Self {
            id: user.id,
            username: user.username,
            hardware_id: user.hardware_id,
        }
    }
}

pub async fn online(args: &HubArgs, format: OutputFormat) -> Result<(), AppError> {
    let online = ControlClient::new(&args.addr).get_online().await?;
    output::print_value("online", &online, format);
    Ok(())
}

pub async fn users(args: &HubArgs, format: OutputFormat) -> Result<(), AppError> {
    let mut rows: Vec<UserRow> = ControlClient::new(&args.addr)
        .get_online_users()
        .await?
        .into_iter()
        .map(UserRow::from)
        .collect();
    rows.sort_by_key(|row| row.id);
    output::print_list(&rows, format);
    Ok(())
}

pub async fn send(args: &SendArgs) -> Result<(), AppError> {
    let payload = parse_payload(&args.payload)?;
    ControlClient::new(&args.hub.addr)
        .send_message(args.user_id, payload)
        .await?;
    output::print_success(&format!("Delivered to user {}", args.user_id));
    Ok(())
}

pub async fn broadcast(args: &BroadcastArgs) -> Result<(), AppError> {
    let payload = parse_payload(&args.payload)?;
    ControlClient::new(&args.hub.addr).broadcast(payload).await?;
    output::print_success("Broadcast queued");
    Ok(())
}
