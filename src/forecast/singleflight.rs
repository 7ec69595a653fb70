//! Collapses concurrent fetches for the same key into one.
//!
//! The registry is a sharded concurrent map, so only callers whose keys land in
//! the same shard ever contend, and only for the instant it takes to look up or
//! insert a record. No lock is held across an `.await`.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures_util::future::{BoxFuture, FutureExt, Shared};
use log::debug;
use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

type SharedFetch<V, E> = Shared<BoxFuture<'static, Result<V, E>>>;

struct InFlight<V, E> {
    id: u64,
    fetch: SharedFetch<V, E>,
}

/// Registry of in-flight fetches, one per key.
///
/// Created with the service that owns it and drained with [`Singleflight::clear`]
/// on shutdown.
pub struct Singleflight<K, V, E>
where
    K: Eq + Hash,
{
    in_flight: Arc<DashMap<K, InFlight<V, E>>>,
    next_id: AtomicU64,
}

impl<K, V, E> Default for Singleflight<K, V, E>
where
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, E> Singleflight<K, V, E>
where
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            in_flight: Arc::new(DashMap::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Runs `fetch` for `key` unless a fetch for that key is already running,
    /// in which case the caller waits for it and receives the same result.
    ///
    /// Success and failure are both delivered to every waiter. Nothing is
    /// remembered once the fetch completes: the record is removed by the fetch
    /// itself before its result becomes visible, so a call that arrives after
    /// that always starts a fresh fetch.
    ///
    /// The fetch runs on its own task. A waiter that gives up (a dropped
    /// future, a route deadline) does not cancel it for the others, and the
    /// record is still removed when it finishes. Must be called within a
    /// tokio runtime.
    pub async fn resolve<F, Fut>(&self, key: K, fetch: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        let (shared, leader) = match self.in_flight.entry(key.clone()) {
            Entry::Occupied(entry) => {
                debug!("Joining in-flight fetch for {:?}", key);
                (entry.get().fetch.clone(), false)
            }
            Entry::Vacant(entry) => {
                let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                let fetch = fetch();
                let in_flight = self.in_flight.clone();
                let key = key.clone();
                let shared = async move {
                    let result = fetch.await;
                    // A newer fetch for the same key may already have replaced
                    // this record after a `clear`.
                    in_flight.remove_if(&key, |_, record| record.id == id);
                    result
                }
                .boxed()
                .shared();
                entry.insert(InFlight {
                    id,
                    fetch: shared.clone(),
                });
                (shared, true)
            }
        };

        if leader {
            let driver = shared.clone();
            tokio::spawn(async move {
                let _ = driver.await;
            });
        }
        shared.await
    }

    /// Number of keys with a fetch in flight.
    pub fn len(&self) -> usize {
        self.in_flight.len()
    }

    pub fn is_empty(&self) -> bool {
        self.in_flight.is_empty()
    }

    /// Forgets every in-flight record. Callers already waiting keep their
    /// handle and still receive a result.
    pub fn clear(&self) {
        self.in_flight.clear();
    }
}
