//! Markdown display for store models.
//!
//! Domain models implement [`std::fmt::Display`] directly; collections get a
//! newtype wrapper so they can carry their own heading and empty-state text.
//!
//! - [`datetime`]: Date/time formatting utilities
//! - [`models`]: Display implementations for domain models

pub mod datetime;
pub mod models;

pub use datetime::ZonedStamp;
pub use models::ShoppingLists;
