//! Data models for the store.
//!
//! This module contains the core data structures used throughout the store:
//! shopping lists and their modes, the persisted configuration record, and
//! the status snapshot of the init gate.

pub mod list;
pub mod status;

pub use list::{ListMode, ListUpdate, ShoppingList};
pub use status::{ConfigRecord, InitState, PersistedVersion, StoreStatus};
