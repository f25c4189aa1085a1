//! Console stand-in for the clock display.
//!
//! Consumes bus events the way a graphical front end would and keeps a text
//! rendition of what it would show.

use crate::events::{Event, EventBus, EventKind, SceneChange, SubscriptionId};

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Scene that shows the uptime clock.
pub const CLOCK_SCENE: &str = "ClockScene";

/// Announce that assets are ready and switch to the clock scene.
pub fn run_loading_sequence(bus: &EventBus) {
    tracing::info!("Assets loaded, switching to {}", CLOCK_SCENE);
    bus.publish(Event::AssetsLoaded);
    bus.publish(Event::SceneChange(SceneChange {
        scene: CLOCK_SCENE.to_string(),
    }));
}

/// What the clock would currently show.
#[derive(Debug, Clone, PartialEq)]
pub struct ClockDisplay {
    pub scene: Option<String>,
    pub days: String,
    pub time: String,
    /// Status line; hidden once live data arrives.
    pub status: Option<String>,
    /// An error was shown and its fallback data has not arrived yet.
    awaiting_fallback: bool,
}

impl Default for ClockDisplay {
    fn default() -> Self {
        Self {
            scene: None,
            days: String::new(),
            time: String::new(),
            status: Some("Initializing...".to_string()),
            awaiting_fallback: false,
        }
    }
}

impl ClockDisplay {
    fn apply(&mut self, event: &Event) {
        match event {
            Event::AssetsLoaded => {
                self.status = Some("Assets loaded".to_string());
            }
            Event::SceneChange(change) => {
                self.scene = Some(change.scene.clone());
                if change.scene == CLOCK_SCENE {
                    self.status = Some("Connecting to API...".to_string());
                }
            }
            Event::DataUpdated(uptime) => {
                self.days = format!("Days: {}", uptime.days);
                self.time = uptime.clock_face();
                // The data right after an error is its fallback; keep the error up.
                if self.awaiting_fallback {
                    self.awaiting_fallback = false;
                } else {
                    self.status = None;
                }
            }
            Event::Error(err) => {
                self.status = Some(format!("Error: {}", err.message));
                self.awaiting_fallback = true;
            }
        }
    }
}

/// Subscribes to every event kind and logs the resulting display.
pub struct ConsolePresenter {
    bus: Arc<EventBus>,
    display: Arc<Mutex<ClockDisplay>>,
    subscriptions: Vec<(EventKind, SubscriptionId)>,
}

impl ConsolePresenter {
    pub fn attach(bus: Arc<EventBus>) -> Self {
        let display = Arc::new(Mutex::new(ClockDisplay::default()));
        let kinds = [
            EventKind::AssetsLoaded,
            EventKind::SceneChange,
            EventKind::DataUpdated,
            EventKind::Error,
        ];

        let subscriptions = kinds
            .into_iter()
            .map(|kind| {
                let display = display.clone();
                let id = bus.subscribe(kind, move |event| {
                    let mut display = lock(&display);
                    display.apply(event);
                    log_event(event, &display);
                });
                (kind, id)
            })
            .collect();

        Self {
            bus,
            display,
            subscriptions,
        }
    }

    pub fn display(&self) -> ClockDisplay {
        lock(&self.display).clone()
    }

    /// Remove all subscriptions. Further events no longer reach the display.
    pub fn detach(&mut self) {
        for (kind, id) in self.subscriptions.drain(..) {
            self.bus.unsubscribe(kind, id);
        }
    }
}

impl Drop for ConsolePresenter {
    fn drop(&mut self) {
        self.detach();
    }
}

fn lock(display: &Mutex<ClockDisplay>) -> MutexGuard<'_, ClockDisplay> {
    display.lock().unwrap_or_else(PoisonError::into_inner)
}

fn log_event(event: &Event, view: &ClockDisplay) {
    match event {
        Event::DataUpdated(_) => tracing::info!("{}  {}", view.days, view.time),
        Event::Error(err) => tracing::error!("API error: {}", err.message),
        Event::SceneChange(change) => tracing::info!("Scene changed to {}", change.scene),
        Event::AssetsLoaded => tracing::debug!("Assets loaded"),
    }
}
