//! zipweather - weather for tracked US zip codes, served through a
//! persistent, freshness-aware response cache.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use zipweather::cache::EntryStore;
use zipweather::cli::{Cli, Command};
use zipweather::conditions::{evict_location, ConditionsHandle, WeatherApi};
use zipweather::config::AppConfig;
use zipweather::gateway::CachingGateway;
use zipweather::locations::LocationRegistry;
use zipweather::models::weather_icon;
use zipweather::store::FileStore;
use zipweather::transport::HttpTransport;

/// How long `show` waits for all tracked locations to resolve
const SHOW_TIMEOUT: Duration = Duration::from_secs(15);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => AppConfig::default_path()?,
    };
    let config = AppConfig::load(&config_path).await?;

    let store = Arc::new(FileStore::new()?);
    let cache = EntryStore::new(store.clone());
    let registry = LocationRegistry::load(store).await?;
    let gateway = CachingGateway::new(
        Arc::new(HttpTransport::new()),
        cache.clone(),
        config.refresh_interval_minutes,
    );
    let api = WeatherApi::new(gateway, config.api());

    match cli.command {
        Command::Add { zipcode } => {
            registry.add(&zipcode).await?;
            println!("Tracking {}", zipcode);
        }
        Command::Remove { zipcode } => {
            registry.remove(&zipcode).await?;
            // The long-running aggregator evicts on the Remove event; in this
            // one-shot process no aggregator is running, so evict here.
            evict_location(&cache, &zipcode).await?;
            println!("Stopped tracking {}", zipcode);
        }
        Command::List => {
            let locations = registry.locations().await;
            if locations.is_empty() {
                println!("No tracked zip codes. Add one with 'zipweather add <zip>'.");
            } else {
                for zipcode in locations {
                    println!("{}", zipcode);
                }
            }
        }
        Command::Show => {
            let expected = registry.locations().await.len();
            if expected == 0 {
                println!("No tracked zip codes. Add one with 'zipweather add <zip>'.");
                return Ok(());
            }

            let handle = ConditionsHandle::spawn(registry.clone(), api, cache.clone()).await;
            let mut rx = handle.conditions();
            let conditions = tokio::time::timeout(
                SHOW_TIMEOUT,
                rx.wait_for(|list| list.len() >= expected),
            )
            .await
            .map_err(|_| "timed out waiting for weather data")??
            .clone();

            for entry in &conditions {
                let name = entry.data.name.as_deref().unwrap_or("unknown");
                let summary = entry
                    .data
                    .weather
                    .first()
                    .map(|w| format!("{} ({})", w.description, weather_icon(w.id)))
                    .unwrap_or_else(|| "no description".to_string());
                println!(
                    "{} ({}): {:.0}F, {}",
                    entry.zip, name, entry.data.main.temp, summary
                );
            }

            handle.shutdown().await;
            registry.close().await;
        }
        Command::Forecast { zipcode } => {
            let forecast = api.forecast(&zipcode).await?;
            println!("5-day forecast for {}:", zipcode);
            for day in &forecast.list {
                let date = chrono::DateTime::from_timestamp(day.dt, 0)
                    .map(|d| d.format("%a %b %e").to_string())
                    .unwrap_or_else(|| day.dt.to_string());
                let summary = day
                    .weather
                    .first()
                    .map(|w| w.description.as_str())
                    .unwrap_or("no description");
                println!(
                    "  {}: {:.0}F to {:.0}F, {}",
                    date, day.temp.min, day.temp.max, summary
                );
            }
        }
    }

    Ok(())
}
