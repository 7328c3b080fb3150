//! Remote access to the `leads` table

use async_trait::async_trait;
use crate::api::{ApiClient, ApiError};
use crate::models::{CacheKey, Lead, LeadPage, LeadPatch, NewLead};

pub const LEADS_TABLE: &str = "leads";

/// `latest_call_time DESC NULLS LAST`: never-called leads sink to the bottom.
pub const LEADS_ORDER: &str = "latest_call_time.desc.nullslast";

/// The narrow read/write contract the list view depends on. Every call is a
/// single remote operation; no caching and no retries.
#[async_trait(?Send)]
pub trait LeadStore {
    /// Rows matching `key`, ordered by [`LEADS_ORDER`], with the exact count.
    async fn fetch(&self, key: &CacheKey) -> Result<LeadPage, ApiError>;

    async fn insert(&self, lead: &NewLead) -> Result<(), ApiError>;

    /// Fails with [`ApiError::NotFound`] when no row has this phone.
    async fn update(&self, phone: &str, patch: &LeadPatch) -> Result<(), ApiError>;

    /// Fails with [`ApiError::NotFound`] when no row has this phone.
    async fn delete(&self, phone: &str) -> Result<(), ApiError>;
}

/// [`LeadStore`] backed by Supabase's PostgREST endpoint.
#[derive(Clone)]
pub struct SupabaseLeadStore {
    client: ApiClient,
}

impl SupabaseLeadStore {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

#[async_trait(?Send)]
impl LeadStore for SupabaseLeadStore {
    async fn fetch(&self, key: &CacheKey) -> Result<LeadPage, ApiError> {
        let params = fetch_params(key);
        let result = self.client.select::<Lead>(LEADS_TABLE, &params).await?;
        let total_count = result.exact_count.unwrap_or(result.rows.len() as u64);

        tracing::debug!("Fetched {} of {} leads for {:?}", result.rows.len(), total_count, key);

        Ok(LeadPage {
            items: result.rows,
            total_count,
        })
    }

    async fn insert(&self, lead: &NewLead) -> Result<(), ApiError> {
        self.client.insert(LEADS_TABLE, lead).await
    }

    async fn update(&self, phone: &str, patch: &LeadPatch) -> Result<(), ApiError> {
        let updated: Vec<Lead> = self
            .client
            .update(LEADS_TABLE, &phone_params(phone), patch)
            .await?;
        expect_row(updated.len(), phone)
    }

    async fn delete(&self, phone: &str) -> Result<(), ApiError> {
        let deleted: Vec<Lead> = self.client.delete(LEADS_TABLE, &phone_params(phone)).await?;
        expect_row(deleted.len(), phone)
    }
}

/// PostgREST query string for a fetch. Predicates are evaluated by the store,
/// never on the client.
pub fn fetch_params(key: &CacheKey) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("select", "*".to_string()),
        ("order", LEADS_ORDER.to_string()),
    ];

    if !key.search.is_empty() {
        params.push(("phone", format!("ilike.*{}*", escape_like(&key.search))));
    }
    if let Some(is_success) = key.is_success {
        params.push(("is_success", format!("eq.{}", is_success)));
    }
    if let Some(has_wechat) = key.has_wechat {
        params.push(("has_wechat", format!("eq.{}", has_wechat)));
    }
    if let Some(level) = &key.intention_level {
        params.push(("intention_level", format!("eq.{}", level)));
    }

    params
}

// LIKE treats `%` and `_` as wildcards and `\` as their escape
fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn phone_params(phone: &str) -> Vec<(&'static str, String)> {
    vec![("phone", format!("eq.{}", phone))]
}

// PostgREST answers 2xx even when the match key hits nothing
fn expect_row(affected: usize, phone: &str) -> Result<(), ApiError> {
    if affected == 0 {
        Err(ApiError::NotFound(format!("No lead with phone {}", phone)))
    } else {
        Ok(())
    }
}
