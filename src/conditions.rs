//! Tracked-conditions aggregator
//!
//! A background task subscribed to the location registry's change stream for
//! its whole lifetime. Every Add triggers a current-conditions fetch through
//! the caching gateway and appends a `(zip, conditions)` pair to an
//! observable collection; every Remove drops the matching pairs and evicts
//! both cache entries for the zip so a later re-add can never observe
//! pre-removal data.
//!
//! Add fetches resolve asynchronously, so a Remove can outrun an in-flight
//! fetch for the same zip. The fetch is not cancelled; instead its result is
//! dropped unless the zip is still present in the registry when it resolves.

use std::sync::Arc;

use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};

use crate::cache::{CacheError, EntryStore};
use crate::config::ApiConfig;
use crate::gateway::{cache_key, CachingGateway, FetchError, RequestKind};
use crate::locations::{LocationChangeKind, LocationRegistry};
use crate::models::{CurrentConditions, Forecast};
use crate::transport::Request;

/// Current conditions for one tracked location
#[derive(Debug, Clone)]
pub struct ConditionsAndZip {
    pub zip: String,
    pub data: CurrentConditions,
}

/// Errors that can occur fetching typed weather data
#[derive(Debug, Error)]
pub enum WeatherError {
    /// The request failed in the gateway or on the network
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The response body did not decode into the expected payload
    #[error("unexpected weather payload: {0}")]
    Payload(#[from] serde_json::Error),
}

/// Typed weather fetches over the caching gateway.
///
/// Builds the OpenWeatherMap URLs from explicit configuration; nothing here
/// reads ambient state.
#[derive(Clone)]
pub struct WeatherApi {
    gateway: CachingGateway,
    config: ApiConfig,
}

impl WeatherApi {
    pub fn new(gateway: CachingGateway, config: ApiConfig) -> Self {
        Self { gateway, config }
    }

    fn current_url(&self, zipcode: &str) -> String {
        format!(
            "{}/weather?zip={},us&units=imperial&APPID={}",
            self.config.base_url, zipcode, self.config.app_id
        )
    }

    fn forecast_url(&self, zipcode: &str) -> String {
        format!(
            "{}/forecast/daily?zip={},us&units=imperial&cnt=5&APPID={}",
            self.config.base_url, zipcode, self.config.app_id
        )
    }

    /// Fetches current conditions for `zipcode`, possibly from the cache
    pub async fn current_conditions(&self, zipcode: &str) -> Result<CurrentConditions, WeatherError> {
        let response = self.gateway.send(&Request::get(self.current_url(zipcode))).await?;
        Ok(serde_json::from_value(response.body)?)
    }

    /// Fetches the daily forecast for `zipcode`, possibly from the cache
    pub async fn forecast(&self, zipcode: &str) -> Result<Forecast, WeatherError> {
        let response = self.gateway.send(&Request::get(self.forecast_url(zipcode))).await?;
        Ok(serde_json::from_value(response.body)?)
    }
}

/// Evicts both cache entries for a location.
///
/// Unconditional: absent keys are a no-op, so eviction never depends on what
/// was actually cached.
pub async fn evict_location(cache: &EntryStore, zipcode: &str) -> Result<(), CacheError> {
    cache.remove(&cache_key(zipcode, RequestKind::CurrentConditions)).await?;
    cache.remove(&cache_key(zipcode, RequestKind::Forecast)).await?;
    Ok(())
}

type PendingFetch = BoxFuture<'static, (String, Result<CurrentConditions, WeatherError>)>;

/// Handle for the aggregator task, teardown included
pub struct ConditionsHandle {
    conditions: watch::Receiver<Vec<ConditionsAndZip>>,
    shutdown_tx: mpsc::Sender<()>,
}

impl ConditionsHandle {
    /// Spawns the aggregator: subscribes to the registry (receiving the
    /// replayed history first) and keeps the observable collection in sync
    /// with location changes until shutdown or registry close.
    pub async fn spawn(registry: LocationRegistry, api: WeatherApi, cache: EntryStore) -> Self {
        let (state_tx, state_rx) = watch::channel(Vec::new());
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        let mut changes = registry.subscribe().await;

        tokio::spawn(async move {
            let api = Arc::new(api);
            let mut pending: FuturesUnordered<PendingFetch> = FuturesUnordered::new();

            loop {
                tokio::select! {
                    maybe_change = changes.recv() => {
                        let change = match maybe_change {
                            Some(change) => change,
                            // Registry closed; nothing further will arrive.
                            None => break,
                        };
                        match change.kind {
                            LocationChangeKind::Add => {
                                let api = api.clone();
                                let zipcode = change.location;
                                pending.push(Box::pin(async move {
                                    let result = api.current_conditions(&zipcode).await;
                                    (zipcode, result)
                                }));
                            }
                            LocationChangeKind::Remove => {
                                let zipcode = change.location;
                                state_tx.send_modify(|list| {
                                    // Rebuild rather than splice in place.
                                    let kept: Vec<ConditionsAndZip> = list
                                        .drain(..)
                                        .filter(|entry: &ConditionsAndZip| entry.zip != zipcode)
                                        .collect();
                                    *list = kept;
                                });
                                if let Err(e) = evict_location(&cache, &zipcode).await {
                                    warn!(zip = %zipcode, error = %e, "cache eviction failed");
                                }
                            }
                        }
                    }
                    Some((zipcode, result)) = pending.next(), if !pending.is_empty() => {
                        match result {
                            Ok(data) => {
                                // Remove wins over an in-flight add fetch: only
                                // still-tracked locations may land.
                                if registry.contains(&zipcode).await {
                                    state_tx.send_modify(|list| {
                                        list.push(ConditionsAndZip { zip: zipcode.clone(), data });
                                    });
                                } else {
                                    debug!(zip = %zipcode, "dropping fetch result for removed location");
                                }
                            }
                            Err(e) => {
                                // Local to this location; other fetches continue.
                                warn!(zip = %zipcode, error = %e, "conditions fetch failed");
                            }
                        }
                    }
                    _ = shutdown_rx.recv() => break,
                }
            }
        });

        Self {
            conditions: state_rx,
            shutdown_tx,
        }
    }

    /// Read-only view of the tracked conditions collection
    pub fn conditions(&self) -> watch::Receiver<Vec<ConditionsAndZip>> {
        self.conditions.clone()
    }

    /// Stops the aggregator task
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
    }
}
