//! Keyed query cache with request coalescing and stale-while-revalidate
//!
//! One `QueryCache` is owned per view session and handed by clone to every
//! component that reads or invalidates it. All state lives behind a single
//! `Rc<RefCell<_>>`; no borrow is held across an await or while listeners run.
//!
//! Every fetch is tagged with a monotonic sequence number. A completion is
//! applied only if its sequence is still the latest issued for its key, so a
//! slow fetch can never overwrite the result of a newer one.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::rc::{Rc, Weak};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use futures::future::LocalBoxFuture;
use lru::LruCache;

use crate::api::ApiError;
use crate::state::spawn::{notify_all, ListenerId, Listeners, Spawner};

pub type QueryFuture<V> = LocalBoxFuture<'static, Result<V, ApiError>>;

/// Produces a fresh fetch for one key. Kept with the entry so invalidation can
/// refetch observed keys without the caller's help.
pub type QueryFn<V> = Rc<dyn Fn() -> QueryFuture<V>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
    Pending,
    Success,
    Error,
}

/// Read-only snapshot of a cached query.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry<K, V> {
    pub key: K,
    pub status: QueryStatus,
    /// Last successful result. Survives refetches and failed fetches.
    pub data: Option<V>,
    pub error: Option<ApiError>,
    pub fetched_at: Option<DateTime<Utc>>,
    pub is_stale: bool,
}

impl<K, V> CacheEntry<K, V> {
    fn new(key: K) -> Self {
        Self {
            key,
            status: QueryStatus::Pending,
            data: None,
            error: None,
            fetched_at: None,
            is_stale: false,
        }
    }

    /// Nothing to show yet.
    pub fn is_loading(&self) -> bool {
        self.status == QueryStatus::Pending && self.data.is_none()
    }

    /// Showing cached data while a newer fetch is in flight.
    pub fn is_refetching(&self) -> bool {
        self.status == QueryStatus::Pending && self.data.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CacheConfig {
    /// Distinct keys retained; observed and in-flight keys are never evicted.
    pub capacity: usize,
    /// How long a success counts as fresh. Zero revalidates on every request.
    pub stale_time: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 32,
            stale_time: Duration::ZERO,
        }
    }
}

struct Slot<K, V> {
    entry: CacheEntry<K, V>,
    query: Option<QueryFn<V>>,
    latest_seq: u64,
    /// `next_seq` at the last invalidation
    invalidated_at: Option<u64>,
}

struct FetchJob<K, V> {
    key: K,
    seq: u64,
    query: QueryFn<V>,
}

struct CacheState<K, V> {
    config: CacheConfig,
    entries: LruCache<K, Slot<K, V>>,
    observers: HashMap<K, usize>,
    next_seq: u64,
    listeners: Listeners,
}

pub struct QueryCache<K, V> {
    state: Rc<RefCell<CacheState<K, V>>>,
    spawner: Rc<dyn Spawner>,
}

impl<K, V> Clone for QueryCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
            spawner: self.spawner.clone(),
        }
    }
}

impl<K, V> QueryCache<K, V>
where
    K: Eq + Hash + Clone + Debug + 'static,
    V: Clone + 'static,
{
    pub fn new(config: CacheConfig, spawner: Rc<dyn Spawner>) -> Self {
        Self {
            state: Rc::new(RefCell::new(CacheState {
                config,
                entries: LruCache::unbounded(),
                observers: HashMap::new(),
                next_seq: 0,
                listeners: Listeners::default(),
            })),
            spawner,
        }
    }

    pub fn get(&self, key: &K) -> Option<CacheEntry<K, V>> {
        self.state.borrow().entries.peek(key).map(|slot| slot.entry.clone())
    }

    /// Look up `key`, fetching with `query` unless a fetch is already in flight
    /// or the last success is still fresh. Returns the entry as it stands after
    /// the call; previously fetched data stays visible while a refetch runs.
    pub fn request(&self, key: K, query: QueryFn<V>) -> CacheEntry<K, V> {
        let (entry, job) = self.state.borrow_mut().begin_request(key, query);
        if let Some(job) = job {
            self.run(job);
            self.notify();
        }
        entry
    }

    /// Mark every entry matching `predicate` stale. Observed entries refetch
    /// immediately; the rest wait for their next request. Returns how many
    /// entries were marked.
    pub fn invalidate(&self, predicate: impl Fn(&K) -> bool) -> usize {
        let (marked, jobs) = self.state.borrow_mut().invalidate(&predicate);
        if marked == 0 {
            return 0;
        }
        for job in jobs {
            self.run(job);
        }
        self.notify();
        marked
    }

    /// Register interest in `key` until the guard is dropped.
    pub fn observe(&self, key: K) -> ObserverGuard<K, V> {
        *self.state.borrow_mut().observers.entry(key.clone()).or_insert(0) += 1;
        ObserverGuard {
            state: Rc::downgrade(&self.state),
            key,
        }
    }

    pub fn subscribe(&self, callback: Rc<dyn Fn()>) -> ListenerId {
        self.state.borrow_mut().listeners.add(callback)
    }

    pub fn unsubscribe(&self, id: ListenerId) {
        self.state.borrow_mut().listeners.remove(id);
    }

    fn notify(&self) {
        let callbacks = self.state.borrow().listeners.snapshot();
        notify_all(callbacks);
    }

    fn run(&self, job: FetchJob<K, V>) {
        let FetchJob { key, seq, query } = job;
        let state = Rc::downgrade(&self.state);
        let fetch = query();

        self.spawner.spawn(Box::pin(async move {
            let result = fetch.await;
            let Some(state) = state.upgrade() else {
                tracing::debug!("Dropping fetch #{} for {:?}: session closed", seq, key);
                return;
            };
            let applied = state.borrow_mut().complete(&key, seq, result);
            if applied {
                let callbacks = state.borrow().listeners.snapshot();
                notify_all(callbacks);
            }
        }));
    }
}

#[cfg(test)]
impl<K, V> QueryCache<K, V>
where
    K: Eq + Hash + Clone + Debug + 'static,
    V: Clone + 'static,
{
    pub fn is_observed(&self, key: &K) -> bool {
        self.state.borrow().is_observed(key)
    }

    pub fn len(&self) -> usize {
        self.state.borrow().entries.len()
    }
}

impl<K, V> CacheState<K, V>
where
    K: Eq + Hash + Clone + Debug,
    V: Clone,
{
    fn is_observed(&self, key: &K) -> bool {
        self.observers.get(key).is_some_and(|count| *count > 0)
    }

    fn begin_request(&mut self, key: K, query: QueryFn<V>) -> (CacheEntry<K, V>, Option<FetchJob<K, V>>) {
        if !self.entries.contains(&key) {
            self.entries.push(
                key.clone(),
                Slot {
                    entry: CacheEntry::new(key.clone()),
                    query: None,
                    latest_seq: 0,
                    invalidated_at: None,
                },
            );
            self.trim(&key);
        }

        let now = Utc::now();
        let stale_time = self.config.stale_time;
        let Some(slot) = self.entries.get_mut(&key) else {
            return (CacheEntry::new(key), None);
        };
        slot.query = Some(query.clone());

        // An in-flight fetch started before the last invalidation cannot absorb new requests
        let in_flight_is_current = slot.latest_seq > 0
            && slot.invalidated_at.map_or(true, |at| at < slot.latest_seq);

        match slot.entry.status {
            QueryStatus::Pending if in_flight_is_current => {
                tracing::debug!("Coalescing request for {:?} into fetch #{}", key, slot.latest_seq);
                return (slot.entry.clone(), None);
            }
            QueryStatus::Success if !slot.entry.is_stale && is_fresh(slot.entry.fetched_at, stale_time, now) => {
                tracing::debug!("Serving fresh entry for {:?}", key);
                return (slot.entry.clone(), None);
            }
            _ => {}
        }

        self.next_seq += 1;
        let seq = self.next_seq;
        slot.latest_seq = seq;
        slot.entry.status = QueryStatus::Pending;
        tracing::debug!("Starting fetch #{} for {:?}", seq, key);

        (slot.entry.clone(), Some(FetchJob { key, seq, query }))
    }

    fn invalidate(&mut self, predicate: &dyn Fn(&K) -> bool) -> (usize, Vec<FetchJob<K, V>>) {
        let keys: Vec<K> = self
            .entries
            .iter()
            .filter(|(key, _)| predicate(*key))
            .map(|(key, _)| key.clone())
            .collect();

        let mut jobs = Vec::new();
        for key in &keys {
            let observed = self.is_observed(key);
            let Some(slot) = self.entries.peek_mut(key) else {
                continue;
            };
            slot.entry.is_stale = true;
            slot.invalidated_at = Some(self.next_seq);

            // Unobserved keys revalidate lazily on their next request
            if !observed {
                continue;
            }
            let Some(query) = slot.query.clone() else {
                continue;
            };
            self.next_seq += 1;
            slot.latest_seq = self.next_seq;
            slot.entry.status = QueryStatus::Pending;
            jobs.push(FetchJob {
                key: key.clone(),
                seq: self.next_seq,
                query,
            });
        }

        tracing::debug!("Invalidated {} entries, refetching {}", keys.len(), jobs.len());
        (keys.len(), jobs)
    }

    /// Apply a finished fetch. Returns whether anything changed.
    fn complete(&mut self, key: &K, seq: u64, result: Result<V, ApiError>) -> bool {
        let Some(slot) = self.entries.peek_mut(key) else {
            tracing::debug!("Dropping fetch #{} for {:?}: entry evicted", seq, key);
            return false;
        };
        if slot.latest_seq != seq {
            tracing::debug!(
                "Discarding fetch #{} for {:?}: superseded by #{}",
                seq,
                key,
                slot.latest_seq
            );
            return false;
        }

        let entry = &mut slot.entry;
        match result {
            Ok(data) => {
                entry.status = QueryStatus::Success;
                entry.data = Some(data);
                entry.error = None;
                entry.fetched_at = Some(Utc::now());
                entry.is_stale = slot.invalidated_at.is_some_and(|at| at >= seq);
            }
            Err(e) => {
                tracing::warn!("Fetch #{} for {:?} failed: {}", seq, key, e);
                entry.status = QueryStatus::Error;
                entry.error = Some(e);
            }
        }
        true
    }

    /// Evict least recently used keys beyond capacity, stale ones first.
    fn trim(&mut self, protect: &K) {
        let capacity = self.config.capacity.max(1);
        while self.entries.len() > capacity {
            let candidates: Vec<(K, bool)> = self
                .entries
                .iter()
                .rev()
                .filter(|(key, slot)| {
                    *key != protect
                        && slot.entry.status != QueryStatus::Pending
                        && !self.is_observed(*key)
                })
                .map(|(key, slot)| (key.clone(), slot.entry.is_stale))
                .collect();

            let victim = candidates
                .iter()
                .find(|(_, stale)| *stale)
                .or_else(|| candidates.first())
                .map(|(key, _)| key.clone());

            match victim {
                Some(key) => {
                    tracing::debug!("Evicting cached query {:?}", key);
                    self.entries.pop(&key);
                }
                None => break,
            }
        }
    }
}

fn is_fresh(fetched_at: Option<DateTime<Utc>>, stale_time: Duration, now: DateTime<Utc>) -> bool {
    let Some(fetched_at) = fetched_at else {
        return false;
    };
    match TimeDelta::from_std(stale_time) {
        Ok(window) => fetched_at + window > now,
        Err(_) => true,
    }
}

/// Keeps a key observed while alive.
pub struct ObserverGuard<K: Eq + Hash, V> {
    state: Weak<RefCell<CacheState<K, V>>>,
    key: K,
}

impl<K: Eq + Hash, V> Drop for ObserverGuard<K, V> {
    fn drop(&mut self) {
        let Some(state) = self.state.upgrade() else {
            return;
        };
        let Ok(mut state) = state.try_borrow_mut() else {
            tracing::error!("Query cache busy while releasing an observer");
            return;
        };
        if let Some(count) = state.observers.get_mut(&self.key) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                state.observers.remove(&self.key);
            }
        }
    }
}
