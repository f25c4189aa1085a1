//! In-process event bus decoupling the uptime service from presentation.

mod bus;
mod models;

pub use bus::*;
pub use models::*;
