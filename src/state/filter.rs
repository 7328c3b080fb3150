//! Active filter of the list view and its link to the query cache

use std::rc::Rc;

use futures::FutureExt;

use crate::api::LeadStore;
use crate::error::LeadsError;
use crate::models::{CacheKey, LeadFilter, LeadPage, SuccessFilter, WechatFilter};
use crate::state::cache::{CacheEntry, ObserverGuard, QueryCache, QueryFn};

pub type LeadCache = QueryCache<CacheKey, LeadPage>;
pub type LeadEntry = CacheEntry<CacheKey, LeadPage>;

/// Fetch closure for one key, remembered by the cache for refetches.
pub fn lead_query(store: Rc<dyn LeadStore>, key: CacheKey) -> QueryFn<LeadPage> {
    Rc::new(move || {
        let store = store.clone();
        let key = key.clone();
        async move { store.fetch(&key).await }.boxed_local()
    })
}

/// Holds the filter fields. Every change re-derives the cache key; a new key
/// is observed and requested immediately, without debouncing.
pub struct FilterState {
    filter: LeadFilter,
    key: CacheKey,
    cache: LeadCache,
    store: Rc<dyn LeadStore>,
    _observer: ObserverGuard<CacheKey, LeadPage>,
}

impl FilterState {
    pub fn new(cache: LeadCache, store: Rc<dyn LeadStore>) -> Self {
        let filter = LeadFilter::default();
        let key = filter.cache_key();
        let _observer = cache.observe(key.clone());
        Self {
            filter,
            key,
            cache,
            store,
            _observer,
        }
    }

    pub fn filter(&self) -> &LeadFilter {
        &self.filter
    }

    /// Request the active key (initial mount).
    pub fn load(&self) -> LeadEntry {
        self.cache
            .request(self.key.clone(), lead_query(self.store.clone(), self.key.clone()))
    }

    pub fn set_search(&mut self, search: impl Into<String>) -> LeadEntry {
        let search = search.into();
        self.update(|f| f.search = search)
    }

    pub fn set_success(&mut self, is_success: SuccessFilter) -> LeadEntry {
        self.update(|f| f.is_success = is_success)
    }

    pub fn set_wechat(&mut self, has_wechat: WechatFilter) -> LeadEntry {
        self.update(|f| f.has_wechat = has_wechat)
    }

    pub fn set_intention_level(&mut self, level: Option<String>) -> LeadEntry {
        self.update(|f| f.intention_level = level)
    }

    pub fn update(&mut self, change: impl FnOnce(&mut LeadFilter)) -> LeadEntry {
        change(&mut self.filter);
        let key = self.filter.cache_key();
        if key == self.key {
            if let Some(entry) = self.current() {
                return entry;
            }
            return self.load();
        }

        tracing::debug!("Filter changed: {:?} -> {:?}", self.key, key);
        // Observe the new key before the old guard is released
        self._observer = self.cache.observe(key.clone());
        self.key = key;
        self.load()
    }

    /// The entry rendered for the active filter.
    pub fn current(&self) -> Option<LeadEntry> {
        self.cache.get(&self.key)
    }

    pub fn fetch_error(&self) -> Option<LeadsError> {
        self.current()
            .and_then(|entry| entry.error)
            .map(LeadsError::Fetch)
    }

    /// Manual refresh of the active key only.
    pub fn refresh(&self) {
        let key = self.key.clone();
        self.cache.invalidate(move |k| *k == key);
    }
}
