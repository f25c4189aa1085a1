//! Polling service: fetch, format, publish, fall back.

use super::{FetchFailure, UptimeSource};
use crate::events::{Event, EventBus};
use crate::uptime::{format_uptime, FormattedUptime};

use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{broadcast, Semaphore};

/// Period of the wall-clock derived fallback uptime (ten days).
pub const SYNTHETIC_UPTIME_PERIOD: i64 = 864_000;

/// Maximum number of fetch cycles allowed in flight at once.
const MAX_IN_FLIGHT: usize = 4;

/// Deterministic stand-in uptime used when no sample was ever fetched.
pub fn synthetic_uptime(now: DateTime<Utc>) -> f64 {
    now.timestamp().rem_euclid(SYNTHETIC_UPTIME_PERIOD) as f64
}

#[derive(Default)]
struct PollState {
    active: bool,
    /// Bumped on every start and stop so cycles from an earlier run are recognised.
    epoch: u64,
    next_seq: u64,
    applied_seq: u64,
    last_success: Option<FormattedUptime>,
    stop_tx: Option<broadcast::Sender<()>>,
}

/// Identifies one fetch cycle. Timer cycles are bound to the run that issued them.
#[derive(Debug, Clone, Copy)]
struct CycleTicket {
    epoch: Option<u64>,
    seq: u64,
}

impl PollState {
    fn issue(&mut self, epoch: Option<u64>) -> CycleTicket {
        self.next_seq += 1;
        CycleTicket {
            epoch,
            seq: self.next_seq,
        }
    }

    fn accepts(&self, ticket: CycleTicket) -> bool {
        if ticket.seq <= self.applied_seq {
            return false;
        }
        match ticket.epoch {
            Some(epoch) => self.active && self.epoch == epoch,
            None => true,
        }
    }
}

/// The shared half of the service handed to the timer loop and cycle tasks.
#[derive(Clone)]
struct Poller {
    bus: Arc<EventBus>,
    source: Arc<dyn UptimeSource>,
    state: Arc<Mutex<PollState>>,
    /// Held from settling a result until its events are delivered.
    delivery: Arc<Mutex<()>>,
}

impl Poller {
    fn state(&self) -> MutexGuard<'_, PollState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Ticket for a timer cycle, or `None` once the run has ended.
    fn timer_ticket(&self, epoch: u64) -> Option<CycleTicket> {
        let mut state = self.state();
        if !state.active || state.epoch != epoch {
            return None;
        }
        Some(state.issue(Some(epoch)))
    }

    async fn run_cycle(&self, ticket: CycleTicket) {
        tracing::debug!("UptimeService: fetch cycle {} started", ticket.seq);
        let result = self.source.fetch_uptime().await;

        // Cycles deliver one at a time, in the order they were accepted.
        let _delivery = self.delivery.lock().unwrap_or_else(PoisonError::into_inner);
        for event in self.settle(ticket, result) {
            self.bus.publish(event);
        }
    }

    /// Apply a cycle's outcome and return the events to publish.
    fn settle(&self, ticket: CycleTicket, result: Result<f64, FetchFailure>) -> Vec<Event> {
        let mut state = self.state();
        if !state.accepts(ticket) {
            tracing::debug!("UptimeService: discarding stale result of cycle {}", ticket.seq);
            return Vec::new();
        }
        state.applied_seq = ticket.seq;

        match result {
            Ok(seconds) => {
                let formatted = format_uptime(seconds);
                state.last_success = Some(formatted);
                tracing::debug!("UptimeService: uptime is {}", formatted);
                vec![Event::DataUpdated(formatted)]
            }
            Err(failure) => {
                tracing::warn!("UptimeService: error fetching uptime: {}", failure);
                let fallback = match state.last_success {
                    Some(cached) => cached,
                    None => format_uptime(synthetic_uptime(Utc::now())),
                };
                vec![Event::Error(failure.into()), Event::DataUpdated(fallback)]
            }
        }
    }
}

/// Polls an [`UptimeSource`] and publishes the outcome on an [`EventBus`].
///
/// Every successful cycle publishes `DataUpdated`. Every failed cycle publishes
/// `Error` followed by `DataUpdated` carrying the last good value, or a
/// synthetic one if nothing was fetched yet. Results from cycles that were
/// overtaken by a newer cycle, or that complete after `stop_fetching`, are
/// dropped.
pub struct UptimeService {
    poller: Poller,
    interval: Duration,
    in_flight: Arc<Semaphore>,
}

impl UptimeService {
    pub fn new(bus: Arc<EventBus>, source: Arc<dyn UptimeSource>, interval: Duration) -> Self {
        Self {
            poller: Poller {
                bus,
                source,
                state: Arc::new(Mutex::new(PollState::default())),
                delivery: Arc::new(Mutex::new(())),
            },
            interval,
            in_flight: Arc::new(Semaphore::new(MAX_IN_FLIGHT)),
        }
    }

    /// Fetch immediately, then every interval, until stopped.
    ///
    /// Must be called from within a tokio runtime. Calling it while already
    /// polling does nothing and returns `false`.
    pub fn start_fetching(&self) -> bool {
        let mut state = self.poller.state();
        if state.active {
            tracing::warn!("UptimeService: already fetching, ignoring start");
            return false;
        }

        state.active = true;
        state.epoch += 1;
        let epoch = state.epoch;
        let (stop_tx, stop_rx) = broadcast::channel(1);
        state.stop_tx = Some(stop_tx);
        drop(state);

        tracing::info!(
            "UptimeService: starting to fetch uptime every {:?}",
            self.interval
        );

        tokio::spawn(run_poll_loop(
            self.poller.clone(),
            epoch,
            self.interval,
            self.in_flight.clone(),
            stop_rx,
        ));

        true
    }

    /// Stop the timer. Safe to call when idle; returns whether polling was active.
    ///
    /// No result settles after this returns. A cycle that settled before the
    /// call finishes delivering its events, which lets a bus handler stop the
    /// service without deadlocking.
    pub fn stop_fetching(&self) -> bool {
        let mut state = self.poller.state();
        if !state.active {
            return false;
        }

        state.active = false;
        state.epoch += 1;
        if let Some(stop_tx) = state.stop_tx.take() {
            let _ = stop_tx.send(());
        }

        tracing::info!("UptimeService: stopped fetching uptime");
        true
    }

    /// Run a single fetch cycle now and wait for it to be published.
    ///
    /// Works whether or not the timer is running.
    #[cfg(test)]
    pub async fn fetch_once(&self) {
        let ticket = self.poller.state().issue(None);
        self.poller.run_cycle(ticket).await;
    }

    #[cfg(test)]
    pub fn is_active(&self) -> bool {
        self.poller.state().active
    }

    /// Last successfully fetched uptime, if any.
    pub fn last_uptime(&self) -> Option<FormattedUptime> {
        self.poller.state().last_success
    }
}

impl Drop for UptimeService {
    fn drop(&mut self) {
        self.stop_fetching();
    }
}

async fn run_poll_loop(
    poller: Poller,
    epoch: u64,
    period: Duration,
    in_flight: Arc<Semaphore>,
    mut stop_rx: broadcast::Receiver<()>,
) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = stop_rx.recv() => break,
            _ = interval.tick() => {
                let permit = match in_flight.clone().try_acquire_owned() {
                    Ok(p) => p,
                    Err(_) => {
                        tracing::warn!("UptimeService: skipping fetch, too many requests in flight");
                        continue;
                    }
                };

                let Some(ticket) = poller.timer_ticket(epoch) else {
                    break;
                };

                let poller = poller.clone();
                tokio::spawn(async move {
                    let _permit = permit;
                    poller.run_cycle(ticket).await;
                });
            }
        }
    }

    tracing::debug!("UptimeService: poll loop for run {} exited", epoch);
}
