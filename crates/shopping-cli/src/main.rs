//! `shoppingms` command-line bootstrap.
//!
//! Wires the store to the terminal: initialization, status and a handful of
//! shopping list commands for checking a deployment by hand.

mod args;
mod cli;
mod renderer;

use anyhow::{Context, Result};
use args::{Args, Commands};
use clap::Parser;
use cli::Cli;
use log::info;
use renderer::TerminalRenderer;
use shopping_core::StoreBuilder;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let Args {
        database_file,
        db_name,
        no_color,
        command,
    } = Args::parse();

    let store = StoreBuilder::new()
        .with_db_name(db_name)
        .with_database_path(database_file)
        .build()
        .context("Failed to configure store")?;

    info!("shoppingms started");

    let cli = Cli::new(store, TerminalRenderer::new(!no_color));
    match command {
        Some(Commands::Init) => cli.init().await,
        Some(Commands::List { command }) => cli.handle_list_command(command).await,
        Some(Commands::Status) | None => cli.status().await,
    }
}
