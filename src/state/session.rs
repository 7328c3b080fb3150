//! One list-view session: a private cache shared by handle with the filter,
//! the mutation coordinator and the stats, plus the toast channel.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use crate::api::LeadStore;
use crate::state::cache::CacheConfig;
use crate::state::filter::{FilterState, LeadCache, LeadEntry};
use crate::state::mutations::{InvalidationPolicy, MutationCoordinator};
use crate::state::notifications::NotificationChannel;
use crate::state::spawn::{ListenerId, Spawner};
use crate::state::stats::LeadStats;

#[derive(Clone)]
pub struct LeadsSession {
    pub cache: LeadCache,
    pub filter: Rc<RefCell<FilterState>>,
    pub mutations: MutationCoordinator,
    pub notifications: NotificationChannel,
}

/// Listener registrations to hand back on teardown.
#[derive(Debug, Clone, Copy)]
pub struct SessionSubscription {
    cache: ListenerId,
    notifications: ListenerId,
}

impl LeadsSession {
    pub fn new(
        store: Rc<dyn LeadStore>,
        cache_config: CacheConfig,
        toast_duration: Duration,
        spawner: Rc<dyn Spawner>,
        policy: Rc<dyn InvalidationPolicy>,
    ) -> Self {
        let cache = LeadCache::new(cache_config, spawner.clone());
        let notifications = NotificationChannel::new(toast_duration, spawner);
        let filter = FilterState::new(cache.clone(), store.clone());
        let mutations = MutationCoordinator::new(store, cache.clone(), notifications.clone(), policy);

        Self {
            cache,
            filter: Rc::new(RefCell::new(filter)),
            mutations,
            notifications,
        }
    }

    /// Entry for the active filter.
    pub fn visible(&self) -> Option<LeadEntry> {
        self.filter.borrow().current()
    }

    pub fn stats(&self) -> LeadStats {
        LeadStats::from_entry(self.visible().as_ref())
    }

    /// Call `on_change` whenever cached queries or the toast change.
    pub fn subscribe(&self, on_change: Rc<dyn Fn()>) -> SessionSubscription {
        SessionSubscription {
            cache: self.cache.subscribe(on_change.clone()),
            notifications: self.notifications.subscribe(on_change),
        }
    }

    pub fn unsubscribe(&self, subscription: SessionSubscription) {
        self.cache.unsubscribe(subscription.cache);
        self.notifications.unsubscribe(subscription.notifications);
    }
}
