// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `skillswap` — command-line client for the SkillSwap platform.

use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::error;

use skillswap_client::api::ApiClient;
use skillswap_client::config::ClientConfig;
use skillswap_client::notify::{ChannelEvent, NotificationChannel};

#[derive(Debug, Parser)]
#[command(name = "skillswap", about = "SkillSwap platform client", version)]
struct Cli {
    #[command(flatten)]
    config: ClientConfig,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Probe whether the stored session is still authenticated.
    Check,
    /// Stream notifications for a user until Ctrl-C.
    Watch {
        /// User id to open the notification channel for.
        #[arg(long)]
        user: i64,
        /// Acknowledge each notification as read on arrival.
        #[arg(long)]
        mark_read: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // reqwest is built without a TLS provider; install ring process-wide.
    let _ = rustls::crypto::ring::default_provider().install_default();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = run(cli).await {
        error!("fatal: {e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let client = Arc::new(ApiClient::new(cli.config));

    match cli.command {
        Command::Check => check(&client).await,
        Command::Watch { user, mark_read } => watch(client, user, mark_read).await,
    }
}

async fn check(client: &ApiClient) -> anyhow::Result<()> {
    let status = client.auth_check().await?;
    if status.authenticated {
        let who = status
            .user
            .as_ref()
            .and_then(|u| u.get("username"))
            .and_then(|v| v.as_str())
            .unwrap_or("unknown");
        println!("authenticated as {who}");
    } else {
        println!("not authenticated");
    }
    Ok(())
}

async fn watch(client: Arc<ApiClient>, user: i64, mark_read: bool) -> anyhow::Result<()> {
    let channel = NotificationChannel::connect(client, user);
    let mut events = channel.subscribe();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                channel.close();
                break;
            }
            event = events.recv() => {
                match event {
                    Ok(ChannelEvent::Connected) => {
                        println!("connected, {} unread", channel.unread_count().await);
                    }
                    Ok(ChannelEvent::NewNotification(n)) => {
                        println!("[{}] {}: {} ({})", n.timestamp, n.sender_name, n.title, n.message);
                        if mark_read {
                            channel.mark_as_read(n.id).await;
                        }
                    }
                    Ok(ChannelEvent::Snapshot { unread }) => {
                        println!("synced, {unread} unread");
                    }
                    Ok(ChannelEvent::Disconnected { code }) => {
                        println!("connection lost (code {code}), reconnecting");
                    }
                    Ok(ChannelEvent::Closed) => {
                        println!("channel closed");
                        break;
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(_) => break,
                }
            }
        }
    }
    Ok(())
}
