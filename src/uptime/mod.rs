//! Uptime data model and formatting.

mod format;
mod models;

pub use format::*;
pub use models::*;
