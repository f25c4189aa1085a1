//! Event types carried on the bus.

use crate::uptime::FormattedUptime;

/// Discriminant used to route subscriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    AssetsLoaded,
    DataUpdated,
    Error,
    SceneChange,
}

/// A fetch failure as reported to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchError {
    pub message: String,
}

/// Request to switch to another scene.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneChange {
    pub scene: String,
}

/// An event published on the bus.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    AssetsLoaded,
    DataUpdated(FormattedUptime),
    Error(FetchError),
    SceneChange(SceneChange),
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::AssetsLoaded => EventKind::AssetsLoaded,
            Event::DataUpdated(_) => EventKind::DataUpdated,
            Event::Error(_) => EventKind::Error,
            Event::SceneChange(_) => EventKind::SceneChange,
        }
    }
}
