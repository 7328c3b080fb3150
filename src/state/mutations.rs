//! Create/update/delete of leads: remote write first, then cache invalidation
//!
//! Nothing is applied optimistically. A failed write leaves every cache entry
//! untouched and is reported through the notification channel.

use std::rc::Rc;

use crate::api::LeadStore;
use crate::error::LeadsError;
use crate::models::{CacheKey, Lead, LeadForm, LeadPatch, NewLead};
use crate::state::filter::LeadCache;
use crate::state::notifications::NotificationChannel;

pub const LEAD_CREATED: &str = "Lead created";
pub const PHONE_REQUIRED: &str = "Phone number is required";

/// A write that has been confirmed by the store.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    Created(NewLead),
    Updated { phone: String, patch: LeadPatch },
    Deleted { phone: String },
}

impl Mutation {
    pub fn phone(&self) -> &str {
        match self {
            Mutation::Created(lead) => &lead.phone,
            Mutation::Updated { phone, .. } | Mutation::Deleted { phone } => phone,
        }
    }

    fn action(&self) -> &str {
        match self {
            Mutation::Created(_) => "Create",
            Mutation::Updated { .. } => "Update",
            Mutation::Deleted { .. } => "Delete",
        }
    }
}

/// Decides which cached queries a confirmed write makes stale.
pub trait InvalidationPolicy {
    fn affects(&self, key: &CacheKey, mutation: &Mutation) -> bool;
}

/// Every cached query. Filters are evaluated by the store, and one write can
/// move a row into or out of any of them.
#[derive(Debug, Clone, Copy, Default)]
pub struct InvalidateAll;

impl InvalidationPolicy for InvalidateAll {
    fn affects(&self, _key: &CacheKey, _mutation: &Mutation) -> bool {
        true
    }
}

#[derive(Clone)]
pub struct MutationCoordinator {
    store: Rc<dyn LeadStore>,
    cache: LeadCache,
    notifications: NotificationChannel,
    policy: Rc<dyn InvalidationPolicy>,
}

impl MutationCoordinator {
    pub fn new(
        store: Rc<dyn LeadStore>,
        cache: LeadCache,
        notifications: NotificationChannel,
        policy: Rc<dyn InvalidationPolicy>,
    ) -> Self {
        Self {
            store,
            cache,
            notifications,
            policy,
        }
    }

    /// Insert the form's lead. The form is cleared on success and kept as is
    /// on any failure so the user can retry.
    pub async fn create_lead(&self, form: &mut LeadForm) -> Result<(), LeadsError> {
        let record = form.to_new_lead();
        if record.phone.is_empty() {
            self.notifications.error(PHONE_REQUIRED);
            return Err(LeadsError::Validation(PHONE_REQUIRED.to_string()));
        }

        self.apply(Mutation::Created(record), LEAD_CREATED.to_string())
            .await?;
        form.clear();
        Ok(())
    }

    /// Flip `is_success` of the row as currently rendered.
    pub async fn toggle_success(&self, lead: &Lead) -> Result<(), LeadsError> {
        let is_success = !lead.is_success;
        let message = if is_success {
            format!("Marked {} as success", lead.phone)
        } else {
            format!("Unmarked success for {}", lead.phone)
        };
        let patch = LeadPatch {
            is_success: Some(is_success),
            ..Default::default()
        };
        self.update(&lead.phone, patch, message).await
    }

    /// Flip `has_wechat` of the row as currently rendered.
    pub async fn toggle_wechat(&self, lead: &Lead) -> Result<(), LeadsError> {
        let has_wechat = !lead.has_wechat;
        let message = if has_wechat {
            format!("Marked {} as WeChat added", lead.phone)
        } else {
            format!("Marked {} as WeChat not added", lead.phone)
        };
        let patch = LeadPatch {
            has_wechat: Some(has_wechat),
            ..Default::default()
        };
        self.update(&lead.phone, patch, message).await
    }

    /// Replace the free-text fields. Blank input clears the field.
    pub async fn update_details(&self, phone: &str, intention_level: &str, detail: &str) -> Result<(), LeadsError> {
        let blank_to_null = |value: &str| {
            let value = value.trim();
            (!value.is_empty()).then(|| value.to_string())
        };
        let patch = LeadPatch {
            intention_level: Some(blank_to_null(intention_level)),
            detail: Some(blank_to_null(detail)),
            ..Default::default()
        };
        self.update(phone, patch, format!("Updated {}", phone)).await
    }

    pub async fn delete_lead(&self, phone: &str) -> Result<(), LeadsError> {
        let mutation = Mutation::Deleted {
            phone: phone.to_string(),
        };
        self.apply(mutation, format!("Deleted {}", phone)).await
    }

    async fn update(&self, phone: &str, patch: LeadPatch, message: String) -> Result<(), LeadsError> {
        let mutation = Mutation::Updated {
            phone: phone.to_string(),
            patch,
        };
        self.apply(mutation, message).await
    }

    async fn apply(&self, mutation: Mutation, message: String) -> Result<(), LeadsError> {
        let result = match &mutation {
            Mutation::Created(record) => self.store.insert(record).await,
            Mutation::Updated { phone, patch } => self.store.update(phone, patch).await,
            Mutation::Deleted { phone } => self.store.delete(phone).await,
        };

        if let Err(e) = result {
            tracing::warn!("{} of lead {} failed: {}", mutation.action(), mutation.phone(), e);
            self.notifications
                .error(format!("{} failed: {}", mutation.action(), e));
            return Err(LeadsError::Write(e));
        }

        let policy = self.policy.clone();
        let invalidated = self.cache.invalidate(|key| policy.affects(key, &mutation));
        tracing::info!(
            "{} of lead {} succeeded, invalidated {} cached queries",
            mutation.action(),
            mutation.phone(),
            invalidated
        );

        self.notifications.success(message);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::memory::{lead, MemoryLeadStore};
    use crate::api::ApiError;
    use crate::models::{LeadFilter, SuccessFilter};
    use crate::state::cache::CacheConfig;
    use crate::state::notifications::{ToastKind, DEFAULT_TOAST_DURATION};
    use crate::state::session::LeadsSession;
    use crate::state::spawn::TokioLocalSpawner;
    use tokio::task::LocalSet;

    fn session(rows: Vec<Lead>) -> (LeadsSession, Rc<MemoryLeadStore>) {
        session_with_policy(rows, Rc::new(InvalidateAll))
    }

    fn session_with_policy(
        rows: Vec<Lead>,
        policy: Rc<dyn InvalidationPolicy>,
    ) -> (LeadsSession, Rc<MemoryLeadStore>) {
        let store = Rc::new(MemoryLeadStore::with_rows(rows));
        let session = LeadsSession::new(
            store.clone(),
            CacheConfig::default(),
            DEFAULT_TOAST_DURATION,
            Rc::new(TokioLocalSpawner),
            policy,
        );
        (session, store)
    }

    /// Let spawned fetches run to completion.
    async fn settle() {
        for _ in 0..16 {
            tokio::task::yield_now().await;
        }
    }

    fn visible_phones(session: &LeadsSession) -> Vec<String> {
        session
            .visible()
            .and_then(|entry| entry.data)
            .map(|page| page.items.into_iter().map(|l| l.phone).collect())
            .unwrap_or_default()
    }

    fn toast(session: &LeadsSession) -> (ToastKind, String) {
        let toast = session.notifications.current().expect("a toast is showing");
        (toast.kind, toast.text)
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_lead_confirms_and_refetches_active_filter() {
        LocalSet::new()
            .run_until(async {
                let (session, store) = session(vec![lead("13800138001")]);
                session.filter.borrow_mut().set_search("138");
                settle().await;

                let mut form = LeadForm {
                    phone: "13800138099".to_string(),
                    ..Default::default()
                };
                session.mutations.create_lead(&mut form).await.unwrap();

                assert_eq!(toast(&session), (ToastKind::Success, LEAD_CREATED.to_string()));
                assert_eq!(form, LeadForm::default());
                assert!(store.row("13800138099").is_some());

                settle().await;
                assert!(visible_phones(&session).contains(&"13800138099".to_string()));
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_lead_with_empty_phone_makes_no_remote_call() {
        LocalSet::new()
            .run_until(async {
                let (session, store) = session(vec![]);
                session.filter.borrow().load();
                settle().await;
                let fetches = store.fetch_count();

                let mut form = LeadForm {
                    phone: "   ".to_string(),
                    detail: "call back tomorrow".to_string(),
                    ..Default::default()
                };
                let result = session.mutations.create_lead(&mut form).await;

                assert_eq!(result, Err(LeadsError::Validation(PHONE_REQUIRED.to_string())));
                assert!(store.writes().is_empty());
                assert_eq!(toast(&session), (ToastKind::Error, PHONE_REQUIRED.to_string()));
                assert_eq!(form.detail, "call back tomorrow");

                settle().await;
                assert_eq!(store.fetch_count(), fetches);
                assert!(!session.visible().unwrap().is_stale);
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_create_keeps_form_and_cache() {
        LocalSet::new()
            .run_until(async {
                let (session, store) = session(vec![lead("13800138001")]);
                session.filter.borrow().load();
                settle().await;
                store.fail_writes_with(ApiError::Server("permission denied for table leads".to_string()));

                let mut form = LeadForm {
                    phone: "13800138099".to_string(),
                    intention_level: "A".to_string(),
                    ..Default::default()
                };
                let result = session.mutations.create_lead(&mut form).await;

                assert!(matches!(result, Err(LeadsError::Write(_))));
                assert_eq!(form.phone, "13800138099");
                assert_eq!(form.intention_level, "A");
                let (kind, text) = toast(&session);
                assert_eq!(kind, ToastKind::Error);
                assert!(text.contains("permission denied for table leads"));
                assert!(!session.visible().unwrap().is_stale);
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_toggle_success_targets_one_phone_and_invalidates_everything() {
        LocalSet::new()
            .run_until(async {
                let (session, store) = session(vec![lead("13800138001"), lead("13800138002")]);

                // Cache a second filter, then come back to "all"
                session.filter.borrow_mut().set_success(SuccessFilter::Success);
                settle().await;
                session.filter.borrow_mut().set_success(SuccessFilter::All);
                settle().await;
                let success_key = LeadFilter {
                    is_success: SuccessFilter::Success,
                    ..Default::default()
                }
                .cache_key();
                assert!(!session.cache.get(&success_key).unwrap().is_stale);

                let row = session.visible().unwrap().data.unwrap().items[0].clone();
                assert_eq!(row.phone, "13800138001");
                session.mutations.toggle_success(&row).await.unwrap();

                assert_eq!(store.writes(), vec!["13800138001"]);
                assert!(store.row("13800138001").unwrap().is_success);
                assert!(!store.row("13800138002").unwrap().is_success);
                assert!(session.cache.get(&success_key).unwrap().is_stale);
                assert_eq!(
                    toast(&session),
                    (ToastKind::Success, "Marked 13800138001 as success".to_string())
                );

                // The observed "all" key refetched, the unobserved one did not
                settle().await;
                assert!(!session.visible().unwrap().is_stale);
                assert!(session.cache.get(&success_key).unwrap().is_stale);

                let row = session.visible().unwrap().data.unwrap().items[0].clone();
                session.mutations.toggle_success(&row).await.unwrap();
                assert_eq!(
                    toast(&session),
                    (ToastKind::Success, "Unmarked success for 13800138001".to_string())
                );
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_toggle_wechat_and_update_details() {
        LocalSet::new()
            .run_until(async {
                let (session, store) = session(vec![lead("13800138001")]);
                session.filter.borrow().load();
                settle().await;

                let row = session.visible().unwrap().data.unwrap().items[0].clone();
                session.mutations.toggle_wechat(&row).await.unwrap();
                assert!(store.row("13800138001").unwrap().has_wechat);
                assert_eq!(
                    toast(&session).1,
                    "Marked 13800138001 as WeChat added"
                );

                session
                    .mutations
                    .update_details("13800138001", "B", " ")
                    .await
                    .unwrap();
                let updated = store.row("13800138001").unwrap();
                assert_eq!(updated.intention_level.as_deref(), Some("B"));
                assert_eq!(updated.detail, None);
                assert_eq!(toast(&session).1, "Updated 13800138001");
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_deleting_missing_phone_reports_remote_error_without_invalidation() {
        LocalSet::new()
            .run_until(async {
                let (session, store) = session(vec![lead("13800138001")]);
                session.filter.borrow().load();
                settle().await;
                let fetches = store.fetch_count();

                let result = session.mutations.delete_lead("13800000000").await;

                assert!(matches!(result, Err(LeadsError::Write(ApiError::NotFound(_)))));
                let (kind, text) = toast(&session);
                assert_eq!(kind, ToastKind::Error);
                assert!(text.contains("No lead with phone 13800000000"));

                settle().await;
                assert!(!session.visible().unwrap().is_stale);
                assert_eq!(store.fetch_count(), fetches);
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_lead_removes_row_after_refetch() {
        LocalSet::new()
            .run_until(async {
                let (session, _store) = session(vec![lead("13800138001"), lead("13800138002")]);
                session.filter.borrow().load();
                settle().await;

                session.mutations.delete_lead("13800138001").await.unwrap();
                assert_eq!(toast(&session).1, "Deleted 13800138001");

                // Still the last known-good rows until the refetch lands
                assert_eq!(visible_phones(&session).len(), 2);
                settle().await;
                assert_eq!(visible_phones(&session), vec!["13800138002"]);
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_policy_narrows_invalidation() {
        struct OnlyMatchingSearch;

        impl InvalidationPolicy for OnlyMatchingSearch {
            fn affects(&self, key: &CacheKey, mutation: &Mutation) -> bool {
                mutation.phone().contains(&key.search)
            }
        }

        LocalSet::new()
            .run_until(async {
                let (session, store) =
                    session_with_policy(vec![lead("13800138001")], Rc::new(OnlyMatchingSearch));
                let mutations = session.mutations.clone();

                session.filter.borrow_mut().set_search("139");
                settle().await;
                let fetches = store.fetch_count();

                let mut form = LeadForm {
                    phone: "13800138099".to_string(),
                    ..Default::default()
                };
                mutations.create_lead(&mut form).await.unwrap();
                settle().await;

                assert_eq!(store.fetch_count(), fetches);
                assert!(!session.visible().unwrap().is_stale);
            })
            .await;
    }
}
