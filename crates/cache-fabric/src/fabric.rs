use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::{Mutex, Notify};

use observatory_core::EngineError;

use crate::disk::DiskCache;
use crate::memory::TtlCache;

struct Flight {
    done: AtomicBool,
    notify: Notify,
}

impl Flight {
    fn new() -> Self {
        Self {
            done: AtomicBool::new(false),
            notify: Notify::new(),
        }
    }
}

/// Process-wide single-flight registry, keyed by `namespace:key`.
///
/// At most one fetch per key is in flight; late arrivals park on the
/// flight's completion flag and read the result back through the cache.
#[derive(Default)]
pub struct Inflight {
    flights: Mutex<HashMap<String, Arc<Flight>>>,
}

impl Inflight {
    pub fn new() -> Self {
        Self::default()
    }
}

enum Role {
    Originator(Arc<Flight>),
    Waiter(Arc<Flight>),
}

/// One cached data domain: an L1 TTL cache over the shared L2 disk store,
/// with single-flight deduplication and an optional error predicate.
///
/// Read path: L1 → L2 (promoting hits) → fetcher. Successful fetches write
/// both tiers; results the predicate flags as errors stay in L1 only, so
/// the next cold read retries upstream. Without a predicate every result
/// goes to L2. Sentinel values ("provider legitimately has nothing") are
/// ordinary non-error results and cache normally.
pub struct Namespace<T> {
    name: String,
    l1: TtlCache<T>,
    disk: Arc<DiskCache>,
    disk_ttl: Duration,
    inflight: Arc<Inflight>,
    is_error: Option<fn(&T) -> bool>,
}

impl<T> Namespace<T>
where
    T: Clone + Serialize + DeserializeOwned + Send + Sync,
{
    pub fn new(
        name: &str,
        l1_capacity: usize,
        l1_ttl: Duration,
        disk: Arc<DiskCache>,
        disk_ttl: Duration,
        inflight: Arc<Inflight>,
        is_error: Option<fn(&T) -> bool>,
    ) -> Self {
        Self {
            name: name.to_string(),
            l1: TtlCache::new(l1_capacity, l1_ttl),
            disk,
            disk_ttl,
            inflight,
            is_error,
        }
    }

    fn disk_key(&self, key: &str) -> String {
        format!("{}:{}", self.name, key)
    }

    fn flags_error(&self, value: &T) -> bool {
        self.is_error.map_or(false, |p| p(value))
    }

    /// Look up `key`, invoking `fetcher` on a full miss.
    ///
    /// An L1 hit that the predicate flags as an error falls through to L2
    /// (which may have recovered valid data) and then to the fetcher.
    /// Fetcher exceptions bubble to the current caller; they are neither
    /// swallowed nor cached.
    pub async fn get_or_fetch<F, Fut>(&self, key: &str, fetcher: F) -> Result<T, EngineError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, EngineError>>,
    {
        if let Some(value) = self.l1.get(key) {
            if !self.flags_error(&value) {
                tracing::debug!("{} L1 hit for {key}", self.name);
                return Ok(value);
            }
            tracing::debug!("{} L1 holds an error result for {key}, trying L2", self.name);
        }

        let disk_key = self.disk_key(key);
        if let Some(value) = self.disk.get::<T>(&disk_key) {
            tracing::debug!("{} L2 hit for {key}", self.name);
            self.l1.insert(key, value.clone());
            return Ok(value);
        }

        let role = {
            let mut flights = self.inflight.flights.lock().await;
            match flights.get(&disk_key) {
                Some(flight) => Role::Waiter(flight.clone()),
                None => {
                    let flight = Arc::new(Flight::new());
                    flights.insert(disk_key.clone(), flight.clone());
                    Role::Originator(flight)
                }
            }
        };

        match role {
            Role::Originator(flight) => {
                let result = self.fetch_and_store(key, &disk_key, &fetcher).await;
                // Mark done and wake before deregistering so a thread that
                // found this flight never waits on a dead entry.
                flight.done.store(true, Ordering::Release);
                flight.notify.notify_waiters();
                self.inflight.flights.lock().await.remove(&disk_key);
                result
            }
            Role::Waiter(flight) => {
                loop {
                    if flight.done.load(Ordering::Acquire) {
                        break;
                    }
                    let notified = flight.notify.notified();
                    tokio::pin!(notified);
                    notified.as_mut().enable();
                    if flight.done.load(Ordering::Acquire) {
                        break;
                    }
                    notified.await;
                }

                // The originator wrote its result to L1 — error sentinels
                // included; a cached sentinel is a legitimate answer and is
                // never "improved" with a redundant call.
                if let Some(value) = self.l1.get(key) {
                    return Ok(value);
                }
                if let Some(value) = self.disk.get::<T>(&disk_key) {
                    self.l1.insert(key, value.clone());
                    return Ok(value);
                }
                // The originator failed with a real error: one independent
                // retry per waiter (still rate-limited inside the fetcher).
                tracing::debug!("{} originator for {key} failed, waiter retries once", self.name);
                self.fetch_and_store(key, &disk_key, &fetcher).await
            }
        }
    }

    async fn fetch_and_store<F, Fut>(
        &self,
        key: &str,
        disk_key: &str,
        fetcher: &F,
    ) -> Result<T, EngineError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, EngineError>>,
    {
        let value = fetcher().await?;
        self.l1.insert(key, value.clone());
        if self.flags_error(&value) {
            tracing::debug!("{} result for {key} is an error, skipping L2", self.name);
        } else {
            self.disk.set(disk_key, &value, self.disk_ttl);
        }
        Ok(value)
    }

    /// Write both tiers directly (batch pre-warm path).
    pub fn prime(&self, key: &str, value: &T) {
        self.l1.insert(key, value.clone());
        if !self.flags_error(value) {
            self.disk.set(&self.disk_key(key), value, self.disk_ttl);
        }
    }

    /// Peek L1/L2 without fetching.
    pub fn peek(&self, key: &str) -> Option<T> {
        if let Some(value) = self.l1.get(key) {
            return Some(value);
        }
        let value = self.disk.get::<T>(&self.disk_key(key))?;
        self.l1.insert(key, value.clone());
        Some(value)
    }

    /// Clear this namespace's L1 tier. (The shared L2 store is cleared
    /// once, by the owner of the `DiskCache`.)
    pub fn clear_l1(&self) {
        self.l1.clear();
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}
