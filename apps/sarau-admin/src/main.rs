use std::sync::Arc;

use clap::Parser;
use sarau_groups::{Groups, GroupsConfig};
use sarau_store_sqlite::SqliteStore;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod cli;
mod commands;

use cli::{Cli, Command, GroupCommand, MemberCommand, RequestCommand};
use commands::*;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Logs go to stderr so `--json` output stays machine-readable.
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::debug!(database_url = ?cli.database_url, "Opening group store");
    let store = match &cli.database_url {
        Some(url) if url.starts_with("sqlite:") => SqliteStore::open(url).await?,
        Some(path) => SqliteStore::open(&format!("sqlite://{}?mode=rwc", path)).await?,
        None => SqliteStore::open_default().await?,
    };
    let ctx = Context {
        groups: Groups::new(Arc::new(store), GroupsConfig::from_env()?),
        actor: cli.as_user,
        json: cli.json,
    };

    match cli.command {
        Command::Group { group_cmd } => match group_cmd {
            GroupCommand::Create {
                name,
                description,
                private,
                image_url,
                cover_url,
            } => cmd_group_create(&ctx, name, description, private, image_url, cover_url).await?,
            GroupCommand::Show { group_id } => cmd_group_show(&ctx, &group_id).await?,
            GroupCommand::List { mine } => cmd_group_list(&ctx, mine).await?,
            GroupCommand::Update {
                group_id,
                name,
                description,
                clear_description,
                image_url,
                cover_url,
                private,
            } => {
                cmd_group_update(
                    &ctx,
                    &group_id,
                    name,
                    description,
                    clear_description,
                    image_url,
                    cover_url,
                    private,
                )
                .await?
            }
            GroupCommand::Delete { group_id } => cmd_group_delete(&ctx, &group_id).await?,
            GroupCommand::Recount { group_id } => cmd_group_recount(&ctx, &group_id).await?,
        },
        Command::Member { member_cmd } => match member_cmd {
            MemberCommand::List { group_id } => cmd_member_list(&ctx, &group_id).await?,
            MemberCommand::Join { group_id } => cmd_member_join(&ctx, &group_id).await?,
            MemberCommand::Leave { group_id } => cmd_member_leave(&ctx, &group_id).await?,
            MemberCommand::Toggle { group_id } => cmd_member_toggle(&ctx, &group_id).await?,
            MemberCommand::Status { group_id } => cmd_member_status(&ctx, &group_id).await?,
            MemberCommand::Role {
                group_id,
                user_id,
                role,
            } => cmd_member_role(&ctx, &group_id, &user_id, role).await?,
            MemberCommand::Remove { group_id, user_id } => {
                cmd_member_remove(&ctx, &group_id, &user_id).await?
            }
        },
        Command::Request { request_cmd } => match request_cmd {
            RequestCommand::Create { group_id } => cmd_request_create(&ctx, &group_id).await?,
            RequestCommand::List { group_id } => cmd_request_list(&ctx, &group_id).await?,
            RequestCommand::Resolve {
                group_id,
                request_id,
                resolution,
            } => cmd_request_resolve(&ctx, &group_id, &request_id, resolution).await?,
        },
    }

    Ok(())
}
