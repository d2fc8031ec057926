//! Caching gateway interposed on outbound weather requests
//!
//! Each request URL is classified by shape: a `zip=<digits>` parameter plus
//! either the current-weather or the daily-forecast path marks it as
//! cacheable under the key `"<zip>-current"` or `"<zip>-forecast"`. A fresh
//! cached entry short-circuits the network call with a synthesized response;
//! a miss or stale entry forwards the request and, on success, writes the
//! response body back into the cache. Anything else passes through untouched.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::cache::{is_stale, CacheError, EntryStore};
use crate::transport::{Request, Response, Transport, TransportError};

/// Request kinds the cache recognizes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    CurrentConditions,
    Forecast,
}

impl RequestKind {
    /// Cache-key suffix for this kind
    fn key_suffix(self) -> &'static str {
        match self {
            RequestKind::CurrentConditions => "current",
            RequestKind::Forecast => "forecast",
        }
    }
}

/// Cache key for a location and request kind
pub fn cache_key(zipcode: &str, kind: RequestKind) -> String {
    format!("{}-{}", zipcode, kind.key_suffix())
}

/// Classifies a URL into a cacheable request kind plus its zip code.
///
/// Returns `None` for any URL without a `zip=<digits>` parameter or without a
/// recognized path, which the gateway passes through untouched.
pub fn classify(url: &str) -> Option<(RequestKind, String)> {
    let tail = &url[url.find("zip=")? + "zip=".len()..];
    let zipcode: String = tail.chars().take_while(|c| c.is_ascii_digit()).collect();
    if zipcode.is_empty() {
        return None;
    }

    if url.contains("weather?") {
        Some((RequestKind::CurrentConditions, zipcode))
    } else if url.contains("forecast/daily") {
        Some((RequestKind::Forecast, zipcode))
    } else {
        None
    }
}

/// Errors that can occur sending a request through the gateway
#[derive(Debug, Error)]
pub enum FetchError {
    /// The cache lookup or write failed. A corrupt entry fails the request
    /// rather than being treated as a miss, so data corruption is never
    /// masked.
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// The forwarded network call failed; propagated unchanged, no retry
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Freshness-aware caching layer over a [`Transport`]
#[derive(Clone)]
pub struct CachingGateway {
    transport: Arc<dyn Transport>,
    cache: EntryStore,
    refresh_interval_minutes: i64,
}

impl CachingGateway {
    /// Creates a gateway with an explicit refresh interval.
    ///
    /// The interval comes from loaded configuration; taking it here keeps
    /// freshness checks impossible before configuration is available.
    pub fn new(transport: Arc<dyn Transport>, cache: EntryStore, refresh_interval_minutes: i64) -> Self {
        Self {
            transport,
            cache,
            refresh_interval_minutes,
        }
    }

    /// Sends a request, serving it from the cache when possible.
    ///
    /// Unrecognized URLs go straight to the transport with no cache
    /// interaction. Transport failures propagate unchanged and never write
    /// to the cache.
    pub async fn send(&self, request: &Request) -> Result<Response, FetchError> {
        let (kind, zipcode) = match classify(&request.url) {
            Some(classified) => classified,
            None => return Ok(self.transport.send(request).await?),
        };

        let key = cache_key(&zipcode, kind);
        if let Some(entry) = self.cache.find::<Value>(&key).await? {
            let age_minutes = (Utc::now() - entry.last_updated).num_seconds() as f64 / 60.0;
            if !is_stale(entry.last_updated, self.refresh_interval_minutes, Utc::now()) {
                debug!(zip = %zipcode, kind = ?kind, age_minutes, "cache hit");
                return Ok(Response::ok(entry.data));
            }
            debug!(zip = %zipcode, kind = ?kind, age_minutes, "cache stale");
        } else {
            debug!(zip = %zipcode, kind = ?kind, "cache miss");
        }

        let response = self.transport.send(request).await?;
        self.cache.save(&key, &response.body).await?;
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheEntry;
    use crate::store::{KeyValueStore, MemoryStore};
    use async_trait::async_trait;
    use chrono::Duration;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Transport that returns a fixed body and counts calls
    struct ScriptedTransport {
        body: Value,
        calls: AtomicUsize,
        fail: bool,
    }

    impl ScriptedTransport {
        fn new(body: Value) -> Self {
            Self {
                body,
                calls: AtomicUsize::new(0),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                body: Value::Null,
                calls: AtomicUsize::new(0),
                fail: true,
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn send(&self, _request: &Request) -> Result<Response, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(TransportError::Status { status: 500 });
            }
            Ok(Response::ok(self.body.clone()))
        }
    }

    fn current_url(zipcode: &str) -> String {
        format!(
            "https://api.openweathermap.org/data/2.5/weather?zip={},us&units=imperial&APPID=key",
            zipcode
        )
    }

    fn forecast_url(zipcode: &str) -> String {
        format!(
            "https://api.openweathermap.org/data/2.5/forecast/daily?zip={},us&units=imperial&cnt=5&APPID=key",
            zipcode
        )
    }

    /// Writes an entry with a back-dated timestamp straight into the store
    async fn seed_entry(store: &MemoryStore, key: &str, body: Value, age: Duration) {
        let entry = CacheEntry {
            last_updated: Utc::now() - age,
            data: body,
        };
        let raw = serde_json::to_string(&entry).unwrap();
        store.set(key, &raw).await.unwrap();
    }

    fn gateway_over(
        store: Arc<MemoryStore>,
        transport: Arc<ScriptedTransport>,
        interval_minutes: i64,
    ) -> CachingGateway {
        CachingGateway::new(transport, EntryStore::new(store), interval_minutes)
    }

    #[test]
    fn test_classify_current_conditions_url() {
        let (kind, zipcode) = classify(&current_url("30301")).unwrap();
        assert_eq!(kind, RequestKind::CurrentConditions);
        assert_eq!(zipcode, "30301");
    }

    #[test]
    fn test_classify_forecast_url() {
        let (kind, zipcode) = classify(&forecast_url("94105")).unwrap();
        assert_eq!(kind, RequestKind::Forecast);
        assert_eq!(zipcode, "94105");
    }

    #[test]
    fn test_classify_rejects_url_without_zip() {
        assert!(classify("https://api.openweathermap.org/data/2.5/weather?q=Atlanta").is_none());
    }

    #[test]
    fn test_classify_rejects_unrecognized_path() {
        assert!(classify("https://example.com/uvi?zip=30301").is_none());
    }

    #[test]
    fn test_classify_rejects_empty_zip() {
        assert!(classify("https://example.com/weather?zip=,us").is_none());
    }

    #[test]
    fn test_cache_key_format() {
        assert_eq!(cache_key("30301", RequestKind::CurrentConditions), "30301-current");
        assert_eq!(cache_key("30301", RequestKind::Forecast), "30301-forecast");
    }

    #[tokio::test]
    async fn test_fresh_entry_short_circuits_transport() {
        let store = Arc::new(MemoryStore::new());
        seed_entry(&store, "30301-current", json!({"temp": 70}), Duration::seconds(60)).await;
        let transport = Arc::new(ScriptedTransport::new(json!({"temp": 99})));
        let gateway = gateway_over(store, transport.clone(), 5);

        let response = gateway.send(&Request::get(current_url("30301"))).await.unwrap();

        assert_eq!(response.body, json!({"temp": 70}));
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn test_stale_entry_forwards_and_refreshes_cache() {
        let store = Arc::new(MemoryStore::new());
        seed_entry(&store, "30301-current", json!({"temp": 70}), Duration::seconds(400)).await;
        let transport = Arc::new(ScriptedTransport::new(json!({"temp": 55})));
        let gateway = gateway_over(store.clone(), transport.clone(), 5);

        let response = gateway.send(&Request::get(current_url("30301"))).await.unwrap();

        assert_eq!(response.body, json!({"temp": 55}));
        assert_eq!(transport.call_count(), 1);

        // The successful response replaced the stale entry.
        let entry: CacheEntry<Value> = EntryStore::new(store)
            .find("30301-current")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(entry.data, json!({"temp": 55}));
    }

    #[tokio::test]
    async fn test_miss_forwards_and_populates_cache() {
        let store = Arc::new(MemoryStore::new());
        let transport = Arc::new(ScriptedTransport::new(json!({"list": []})));
        let gateway = gateway_over(store.clone(), transport.clone(), 5);

        gateway.send(&Request::get(forecast_url("94105"))).await.unwrap();

        assert_eq!(transport.call_count(), 1);
        let entry: CacheEntry<Value> = EntryStore::new(store)
            .find("94105-forecast")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(entry.data, json!({"list": []}));
    }

    #[tokio::test]
    async fn test_forecast_and_current_use_separate_keys() {
        let store = Arc::new(MemoryStore::new());
        seed_entry(&store, "30301-current", json!({"temp": 70}), Duration::seconds(10)).await;
        let transport = Arc::new(ScriptedTransport::new(json!({"list": []})));
        let gateway = gateway_over(store, transport.clone(), 5);

        // A fresh current-conditions entry must not satisfy a forecast request.
        gateway.send(&Request::get(forecast_url("30301"))).await.unwrap();
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn test_unrecognized_url_passes_through_without_cache() {
        let store = Arc::new(MemoryStore::new());
        let transport = Arc::new(ScriptedTransport::new(json!({"ok": true})));
        let gateway = gateway_over(store.clone(), transport.clone(), 5);

        gateway
            .send(&Request::get("https://example.com/status"))
            .await
            .unwrap();

        assert_eq!(transport.call_count(), 1);
        assert_eq!(store.get("https://example.com/status").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_transport_failure_propagates_without_cache_write() {
        let store = Arc::new(MemoryStore::new());
        let transport = Arc::new(ScriptedTransport::failing());
        let gateway = gateway_over(store.clone(), transport, 5);

        let result = gateway.send(&Request::get(current_url("30301"))).await;

        assert!(matches!(
            result,
            Err(FetchError::Transport(TransportError::Status { status: 500 }))
        ));
        let cached: Option<CacheEntry<Value>> = EntryStore::new(store)
            .find("30301-current")
            .await
            .unwrap();
        assert!(cached.is_none());
    }

    #[tokio::test]
    async fn test_corrupt_entry_fails_the_request() {
        let store = Arc::new(MemoryStore::new());
        store.set("30301-current", "{\"nope\":1}").await.unwrap();
        let transport = Arc::new(ScriptedTransport::new(json!({"temp": 55})));
        let gateway = gateway_over(store, transport.clone(), 5);

        let result = gateway.send(&Request::get(current_url("30301"))).await;

        // Not treated as a miss: the transport is never consulted.
        assert!(matches!(
            result,
            Err(FetchError::Cache(CacheError::Corrupt { .. }))
        ));
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn test_zero_interval_always_forwards() {
        let store = Arc::new(MemoryStore::new());
        seed_entry(&store, "30301-current", json!({"temp": 70}), Duration::seconds(0)).await;
        let transport = Arc::new(ScriptedTransport::new(json!({"temp": 55})));
        let gateway = gateway_over(store, transport.clone(), 0);

        gateway.send(&Request::get(current_url("30301"))).await.unwrap();
        assert_eq!(transport.call_count(), 1);
    }
}
