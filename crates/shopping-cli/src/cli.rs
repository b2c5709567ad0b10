//! Command handlers.

use anyhow::{Context, Result};
use log::debug;
use shopping_core::{
    params::{CreateList, ListLists, UpdateList},
    ShoppingLists, Store,
};

use crate::{args::ListCommands, renderer::TerminalRenderer};

pub struct Cli {
    store: Store,
    renderer: TerminalRenderer,
}

impl Cli {
    pub fn new(store: Store, renderer: TerminalRenderer) -> Self {
        Self { store, renderer }
    }

    /// Brings the store to a ready state, then reports it.
    pub async fn init(&self) -> Result<()> {
        self.store
            .ensure_ready()
            .await
            .context("Failed to initialize store")?;
        self.status().await
    }

    pub async fn status(&self) -> Result<()> {
        let status = self
            .store
            .status()
            .await
            .context("Failed to read store status")?;
        self.renderer.render(&status.to_string());
        Ok(())
    }

    pub async fn handle_list_command(&self, command: ListCommands) -> Result<()> {
        match command {
            ListCommands::Create(args) => {
                let params = CreateList::from(args);
                let list = self
                    .store
                    .create_list(&params)
                    .await
                    .with_context(|| format!("Failed to create list '{}'", params.name))?;
                self.renderer.render(&list.to_string());
            }
            ListCommands::Update(args) => {
                let params = UpdateList::from(args);
                let list = self
                    .store
                    .update_list(&params)
                    .await
                    .with_context(|| format!("Failed to update list {}", params.id))?;
                self.renderer.render(&list.to_string());
            }
            ListCommands::Show(args) => self.show_lists(&ListLists::from(args)).await?,
        }
        Ok(())
    }

    async fn show_lists(&self, params: &ListLists) -> Result<()> {
        let lists = match self.store.lists(params).await {
            Ok(lists) => lists,
            Err(e) if e.is_not_found() => {
                debug!("Empty page for user {}: {e}", params.user_id);
                Vec::new()
            }
            Err(e) => return Err(e).context("Failed to list shopping lists"),
        };
        self.renderer.render(&ShoppingLists(lists).to_string());
        Ok(())
    }
}
