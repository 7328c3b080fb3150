//! In-memory [`LeadStore`] for tests
//!
//! Applies the same predicates and ordering as the remote store. Fetches can be
//! gated so a test decides when, and in which order, they complete.

use std::cell::{Cell, RefCell};
use std::cmp::Ordering;

use async_trait::async_trait;
use futures::channel::oneshot;

use crate::api::{ApiError, LeadStore};
use crate::models::{CacheKey, Lead, LeadPage, LeadPatch, NewLead};

#[derive(Default)]
pub struct MemoryLeadStore {
    rows: RefCell<Vec<Lead>>,
    gated: Cell<bool>,
    gates: RefCell<Vec<(CacheKey, Option<oneshot::Sender<()>>)>>,
    fetched: RefCell<Vec<CacheKey>>,
    writes: RefCell<Vec<String>>,
    fail_writes: RefCell<Option<ApiError>>,
    fail_fetches: RefCell<Option<ApiError>>,
}

impl MemoryLeadStore {
    pub fn with_rows(rows: Vec<Lead>) -> Self {
        let store = Self::default();
        *store.rows.borrow_mut() = rows;
        store
    }

    /// Hold every subsequent fetch until [`release`](Self::release) is called.
    pub fn hold_fetches(&self) {
        self.gated.set(true);
    }

    /// Complete every held fetch issued for `key`.
    pub fn release(&self, key: &CacheKey) {
        for (gated_key, gate) in self.gates.borrow_mut().iter_mut() {
            if gated_key == key {
                if let Some(gate) = gate.take() {
                    let _ = gate.send(());
                }
            }
        }
    }

    pub fn fetch_count(&self) -> usize {
        self.fetched.borrow().len()
    }

    /// Phones targeted by writes, in call order.
    pub fn writes(&self) -> Vec<String> {
        self.writes.borrow().clone()
    }

    pub fn fail_writes_with(&self, error: ApiError) {
        *self.fail_writes.borrow_mut() = Some(error);
    }

    pub fn fail_fetches_with(&self, error: Option<ApiError>) {
        *self.fail_fetches.borrow_mut() = error;
    }

    pub fn row(&self, phone: &str) -> Option<Lead> {
        self.rows.borrow().iter().find(|l| l.phone == phone).cloned()
    }

    fn query(&self, key: &CacheKey) -> LeadPage {
        let mut items: Vec<Lead> = self
            .rows
            .borrow()
            .iter()
            .filter(|lead| key.matches(lead))
            .cloned()
            .collect();
        items.sort_by(|a, b| match (a.latest_call_time, b.latest_call_time) {
            (Some(a), Some(b)) => b.cmp(&a),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        });
        LeadPage {
            total_count: items.len() as u64,
            items,
        }
    }

    fn check_write(&self, phone: &str) -> Result<(), ApiError> {
        self.writes.borrow_mut().push(phone.to_string());
        match self.fail_writes.borrow().clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[async_trait(?Send)]
impl LeadStore for MemoryLeadStore {
    async fn fetch(&self, key: &CacheKey) -> Result<LeadPage, ApiError> {
        self.fetched.borrow_mut().push(key.clone());
        // Snapshot at call time, like a server answering the query it received
        let result = match self.fail_fetches.borrow().clone() {
            Some(error) => Err(error),
            None => Ok(self.query(key)),
        };

        if self.gated.get() {
            let (tx, rx) = oneshot::channel();
            self.gates.borrow_mut().push((key.clone(), Some(tx)));
            let _ = rx.await;
        }
        result
    }

    async fn insert(&self, lead: &NewLead) -> Result<(), ApiError> {
        self.check_write(&lead.phone)?;
        let mut rows = self.rows.borrow_mut();
        if rows.iter().any(|l| l.phone == lead.phone) {
            return Err(ApiError::Server(
                "duplicate key value violates unique constraint \"leads_pkey\"".to_string(),
            ));
        }
        rows.push(Lead {
            phone: lead.phone.clone(),
            intention_level: lead.intention_level.clone(),
            detail: lead.detail.clone(),
            is_success: lead.is_success,
            has_wechat: lead.has_wechat,
            total_call_count: 0,
            connected_call_count: 0,
            latest_call_time: None,
            tags: None,
        });
        Ok(())
    }

    async fn update(&self, phone: &str, patch: &LeadPatch) -> Result<(), ApiError> {
        self.check_write(phone)?;
        let mut rows = self.rows.borrow_mut();
        let lead = rows
            .iter_mut()
            .find(|l| l.phone == phone)
            .ok_or_else(|| ApiError::NotFound(format!("No lead with phone {}", phone)))?;
        if let Some(value) = patch.is_success {
            lead.is_success = value;
        }
        if let Some(value) = patch.has_wechat {
            lead.has_wechat = value;
        }
        if let Some(value) = &patch.intention_level {
            lead.intention_level = value.clone();
        }
        if let Some(value) = &patch.detail {
            lead.detail = value.clone();
        }
        Ok(())
    }

    async fn delete(&self, phone: &str) -> Result<(), ApiError> {
        self.check_write(phone)?;
        let mut rows = self.rows.borrow_mut();
        let before = rows.len();
        rows.retain(|l| l.phone != phone);
        if rows.len() == before {
            return Err(ApiError::NotFound(format!("No lead with phone {}", phone)));
        }
        Ok(())
    }
}

/// A lead with no calls and both flags unset.
pub fn lead(phone: &str) -> Lead {
    Lead {
        phone: phone.to_string(),
        intention_level: None,
        detail: None,
        is_success: false,
        has_wechat: false,
        total_call_count: 0,
        connected_call_count: 0,
        latest_call_time: None,
        tags: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use crate::models::LeadFilter;

    #[test]
    fn test_orders_by_latest_call_with_nulls_last() {
        let mut early = lead("13800138001");
        early.latest_call_time = Some(Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap());
        let mut late = lead("13800138002");
        late.latest_call_time = Some(Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap());
        let never = lead("13800138003");

        let store = MemoryLeadStore::with_rows(vec![never, early, late]);
        let page = futures::executor::block_on(store.fetch(&LeadFilter::default().cache_key())).unwrap();
        let phones: Vec<_> = page.items.iter().map(|l| l.phone.as_str()).collect();

        assert_eq!(phones, vec!["13800138002", "13800138001", "13800138003"]);
        assert_eq!(page.total_count, 3);
    }
}
