//! Uptime Clock - polls a service's uptime and shows it as a running clock.

mod config;
mod events;
mod presenter;
mod service;
mod uptime;

use config::ClockConfig;
use events::EventBus;
use presenter::ConsolePresenter;
use service::{HttpUptimeSource, UptimeService};

use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive("uptime_clock=info".parse()?))
        .init();

    let cfg = ClockConfig::load();
    tracing::info!("Polling {} every {:?}", cfg.uptime_url, cfg.fetch_interval);

    let bus = Arc::new(EventBus::new());
    let source = Arc::new(HttpUptimeSource::from_config(&cfg)?);
    let service = UptimeService::new(bus.clone(), source, cfg.fetch_interval);

    let mut presenter = ConsolePresenter::attach(bus.clone());
    presenter::run_loading_sequence(&bus);

    service.start_fetching();

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down");

    service.stop_fetching();
    presenter.detach();

    let view = presenter.display();
    tracing::info!("Clock at shutdown: {}  {}", view.days, view.time);
    if let Some(last) = service.last_uptime() {
        tracing::info!(
            "Last reported uptime: {} ({} s)",
            last,
            last.total_seconds()
        );
    }

    Ok(())
}
