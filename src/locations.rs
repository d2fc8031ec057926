//! Tracked-location registry with a replayed change stream
//!
//! The registry owns the canonical ordered list of tracked zip codes,
//! persisted as one JSON array under a single key. Every mutation is
//! broadcast as a [`LocationChange`]; the stream replays its full history to
//! each new subscriber, so a subscriber attaching after construction still
//! learns about every location loaded from storage, in original order.
//!
//! The replay is an explicit in-memory append log fanned out over
//! per-subscriber unbounded channels. No deduplication happens anywhere:
//! adding an already-tracked zip produces a duplicate list entry and a
//! duplicate Add event.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tracing::debug;

use crate::store::{KeyValueStore, StoreError};

/// Store key holding the serialized location list
pub const LOCATIONS_KEY: &str = "locations";

/// Kind of change to the tracked-location list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationChangeKind {
    Add,
    Remove,
}

/// One change to the tracked-location list. Transient; only its effect (the
/// list itself) is persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationChange {
    pub kind: LocationChangeKind,
    pub location: String,
}

/// Errors that can occur loading or mutating the registry
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The persisted location list exists but is not a valid string array
    #[error("persisted location list is corrupt")]
    CorruptList,

    /// The backing store failed
    #[error("registry store access failed: {0}")]
    Store(#[from] StoreError),

    /// Serializing the location list failed
    #[error("failed to serialize location list: {0}")]
    Serialize(#[from] serde_json::Error),
}

struct RegistryInner {
    /// Canonical ordered list; duplicates allowed
    locations: Vec<String>,
    /// Full event history, replayed to every new subscriber
    log: Vec<LocationChange>,
    /// Live subscribers; a closed receiver is dropped on the next emit
    subscribers: Vec<mpsc::UnboundedSender<LocationChange>>,
    /// Once closed, no live events are delivered and new subscribers only
    /// get the replayed history
    closed: bool,
}

impl RegistryInner {
    fn emit(&mut self, change: LocationChange) {
        self.log.push(change.clone());
        if self.closed {
            return;
        }
        self.subscribers
            .retain(|tx| tx.send(change.clone()).is_ok());
    }
}

/// Handle to the tracked-location registry. Cheap to clone; all clones share
/// the same state.
#[derive(Clone)]
pub struct LocationRegistry {
    store: Arc<dyn KeyValueStore>,
    inner: Arc<Mutex<RegistryInner>>,
}

impl LocationRegistry {
    /// Loads the registry from the store.
    ///
    /// An absent list means an empty registry. Each pre-existing location is
    /// recorded as an Add event in the replay log before this returns, so a
    /// subscriber attached immediately afterwards sees one Add per location
    /// in insertion order.
    pub async fn load(store: Arc<dyn KeyValueStore>) -> Result<Self, RegistryError> {
        let locations: Vec<String> = match store.get(LOCATIONS_KEY).await? {
            Some(raw) => serde_json::from_str(&raw).map_err(|_| RegistryError::CorruptList)?,
            None => Vec::new(),
        };

        let log = locations
            .iter()
            .map(|loc| LocationChange {
                kind: LocationChangeKind::Add,
                location: loc.clone(),
            })
            .collect();

        Ok(Self {
            store,
            inner: Arc::new(Mutex::new(RegistryInner {
                locations,
                log,
                subscribers: Vec::new(),
                closed: false,
            })),
        })
    }

    /// Appends `zipcode` to the list, persists, and emits an Add event.
    ///
    /// Never deduplicates; callers are expected not to add a zip that is
    /// already tracked, but the registry does not enforce this.
    pub async fn add(&self, zipcode: &str) -> Result<(), RegistryError> {
        let mut inner = self.inner.lock().await;

        let mut next = inner.locations.clone();
        next.push(zipcode.to_string());
        self.persist(&next).await?;

        inner.locations = next;
        inner.emit(LocationChange {
            kind: LocationChangeKind::Add,
            location: zipcode.to_string(),
        });
        debug!(zip = zipcode, "location added");
        Ok(())
    }

    /// Removes the first occurrence of `zipcode`, persists, and emits a
    /// Remove event. A zip that is not tracked is a no-op and emits nothing.
    pub async fn remove(&self, zipcode: &str) -> Result<(), RegistryError> {
        let mut inner = self.inner.lock().await;

        let index = match inner.locations.iter().position(|loc| loc == zipcode) {
            Some(index) => index,
            None => return Ok(()),
        };

        let mut next = inner.locations.clone();
        next.remove(index);
        self.persist(&next).await?;

        inner.locations = next;
        inner.emit(LocationChange {
            kind: LocationChangeKind::Remove,
            location: zipcode.to_string(),
        });
        debug!(zip = zipcode, "location removed");
        Ok(())
    }

    /// Subscribes to the change stream.
    ///
    /// The receiver first yields the full event history in original order,
    /// then live events. After [`close`](Self::close) the receiver ends once
    /// the history is drained.
    pub async fn subscribe(&self) -> mpsc::UnboundedReceiver<LocationChange> {
        let mut inner = self.inner.lock().await;
        let (tx, rx) = mpsc::unbounded_channel();

        for change in &inner.log {
            // Receiver is in scope, so the only send failure mode is closure,
            // which cannot happen yet.
            let _ = tx.send(change.clone());
        }

        if !inner.closed {
            inner.subscribers.push(tx);
        }
        rx
    }

    /// Current list of tracked locations, in insertion order
    pub async fn locations(&self) -> Vec<String> {
        self.inner.lock().await.locations.clone()
    }

    /// Returns true if `zipcode` is currently tracked
    pub async fn contains(&self, zipcode: &str) -> bool {
        self.inner
            .lock()
            .await
            .locations
            .iter()
            .any(|loc| loc == zipcode)
    }

    /// Closes the change stream. Existing subscribers drain whatever they
    /// have already received and then end; later subscribers still get the
    /// replayed history before their stream ends.
    pub async fn close(&self) {
        let mut inner = self.inner.lock().await;
        inner.closed = true;
        inner.subscribers.clear();
    }

    /// Persists a candidate list as a whole value. Runs before the in-memory
    /// commit so a failed write leaves memory and store on the old list.
    async fn persist(&self, locations: &[String]) -> Result<(), RegistryError> {
        let raw = serde_json::to_string(locations)?;
        self.store.set(LOCATIONS_KEY, &raw).await?;
        Ok(())
    }
}
