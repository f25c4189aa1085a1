//! Uptime acquisition: HTTP source and the polling service.

mod poller;
mod source;

pub use poller::*;
pub use source::*;

use crate::events::FetchError;

use std::time::Duration;
use thiserror::Error;

/// Reasons a fetch cycle can fail.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchFailure {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("network error: {0}")]
    Network(String),
    #[error("HTTP error! Status: {0}")]
    Status(u16),
    #[error("invalid response body: {0}")]
    Body(String),
    #[error("Unknown API response format")]
    Format,
}

impl From<FetchFailure> for FetchError {
    fn from(failure: FetchFailure) -> Self {
        FetchError {
            message: failure.to_string(),
        }
    }
}
