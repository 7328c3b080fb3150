//! Summary metrics for the visible result set

use crate::models::{CacheKey, LeadPage};
use crate::state::cache::CacheEntry;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LeadStats {
    /// Exact match count reported by the store.
    pub total: u64,
    pub success: u64,
    pub with_wechat: u64,
    /// `round(success / total * 100)`, 0 when there is nothing to count.
    pub success_rate: u32,
}

impl LeadStats {
    pub fn from_page(page: &LeadPage) -> Self {
        let success = page.items.iter().filter(|l| l.is_success).count() as u64;
        let with_wechat = page.items.iter().filter(|l| l.has_wechat).count() as u64;
        let total = page.total_count;

        let success_rate = if total > 0 {
            ((success as f64 / total as f64) * 100.0).round() as u32
        } else {
            0
        };

        Self {
            total,
            success,
            with_wechat,
            success_rate,
        }
    }

    /// Stats of whatever data the entry currently shows, zeros when it has none.
    pub fn from_entry(entry: Option<&CacheEntry<CacheKey, LeadPage>>) -> Self {
        entry
            .and_then(|e| e.data.as_ref())
            .map(Self::from_page)
            .unwrap_or_default()
    }
}
