//! Filter value objects and the cache key derived from them

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuccessFilter {
    #[default]
    All,
    Success,
    Pending,
}

impl SuccessFilter {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SuccessFilter::All => None,
            SuccessFilter::Success => Some(true),
            SuccessFilter::Pending => Some(false),
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            SuccessFilter::All => "All",
            SuccessFilter::Success => "Success",
            SuccessFilter::Pending => "Pending",
        }
    }

    pub fn from_value(value: &str) -> Self {
        match value {
            "success" => SuccessFilter::Success,
            "pending" => SuccessFilter::Pending,
            _ => SuccessFilter::All,
        }
    }

    pub fn value(&self) -> &str {
        match self {
            SuccessFilter::All => "all",
            SuccessFilter::Success => "success",
            SuccessFilter::Pending => "pending",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WechatFilter {
    #[default]
    All,
    True,
    False,
}

impl WechatFilter {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            WechatFilter::All => None,
            WechatFilter::True => Some(true),
            WechatFilter::False => Some(false),
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            WechatFilter::All => "All",
            WechatFilter::True => "Added WeChat",
            WechatFilter::False => "No WeChat",
        }
    }

    pub fn from_value(value: &str) -> Self {
        match value {
            "true" => WechatFilter::True,
            "false" => WechatFilter::False,
            _ => WechatFilter::All,
        }
    }

    pub fn value(&self) -> &str {
        match self {
            WechatFilter::All => "all",
            WechatFilter::True => "true",
            WechatFilter::False => "false",
        }
    }
}

/// The list view's filter as the user entered it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LeadFilter {
    pub search: String,
    pub is_success: SuccessFilter,
    pub has_wechat: WechatFilter,
    pub intention_level: Option<String>,
}

impl LeadFilter {
    /// Derive the cache key. Two filters that would send the same query to the
    /// store produce equal keys.
    pub fn cache_key(&self) -> CacheKey {
        CacheKey {
            search: normalize_search(&self.search),
            is_success: self.is_success.as_bool(),
            has_wechat: self.has_wechat.as_bool(),
            intention_level: self
                .intention_level
                .as_deref()
                .map(str::trim)
                .filter(|level| !level.is_empty())
                .map(str::to_string),
        }
    }
}

/// Normalized query parameters; the sole input of a fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    pub search: String,
    pub is_success: Option<bool>,
    pub has_wechat: Option<bool>,
    pub intention_level: Option<String>,
}

impl CacheKey {
    /// Whether a row satisfies this key's predicates, as the store evaluates them.
    pub fn matches(&self, lead: &crate::models::Lead) -> bool {
        if !self.search.is_empty()
            && !lead.phone.to_lowercase().contains(&self.search.to_lowercase())
        {
            return false;
        }
        if self.is_success.is_some_and(|wanted| lead.is_success != wanted) {
            return false;
        }
        if self.has_wechat.is_some_and(|wanted| lead.has_wechat != wanted) {
            return false;
        }
        match &self.intention_level {
            Some(level) => lead.intention_level.as_deref() == Some(level.as_str()),
            None => true,
        }
    }
}

// `*` is PostgREST's LIKE wildcard and cannot be escaped inside a filter value
fn normalize_search(search: &str) -> String {
    search.trim().replace('*', "")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Lead;

    #[test]
    fn test_equal_filters_share_a_key() {
        let a = LeadFilter {
            search: "138".to_string(),
            is_success: SuccessFilter::Success,
            ..Default::default()
        };
        let b = a.clone();
        assert_eq!(a.cache_key(), b.cache_key());
    }

    #[test]
    fn test_key_normalizes_search_and_intention() {
        let padded = LeadFilter {
            search: "  138* ".to_string(),
            intention_level: Some("  ".to_string()),
            ..Default::default()
        };
        let plain = LeadFilter {
            search: "138".to_string(),
            ..Default::default()
        };
        assert_eq!(padded.cache_key(), plain.cache_key());
    }

    #[test]
    fn test_each_field_changes_the_key() {
        let base = LeadFilter::default();
        let keys = [
            LeadFilter { search: "1".to_string(), ..Default::default() },
            LeadFilter { is_success: SuccessFilter::Pending, ..Default::default() },
            LeadFilter { has_wechat: WechatFilter::False, ..Default::default() },
            LeadFilter { intention_level: Some("A".to_string()), ..Default::default() },
        ];
        for filter in keys {
            assert_ne!(filter.cache_key(), base.cache_key(), "{filter:?}");
        }
    }

    #[test]
    fn test_tri_state_values_round_trip_through_select_values() {
        for filter in [SuccessFilter::All, SuccessFilter::Success, SuccessFilter::Pending] {
            assert_eq!(SuccessFilter::from_value(filter.value()), filter);
        }
        for filter in [WechatFilter::All, WechatFilter::True, WechatFilter::False] {
            assert_eq!(WechatFilter::from_value(filter.value()), filter);
        }
    }

    #[test]
    fn test_key_matches_rows() {
        let lead = Lead {
            phone: "13800138001".to_string(),
            intention_level: Some("A".to_string()),
            detail: None,
            is_success: true,
            has_wechat: false,
            total_call_count: 0,
            connected_call_count: 0,
            latest_call_time: None,
            tags: None,
        };
        let key = LeadFilter {
            search: "0013".to_string(),
            is_success: SuccessFilter::Success,
            has_wechat: WechatFilter::False,
            intention_level: Some("A".to_string()),
        }
        .cache_key();
        assert!(key.matches(&lead));

        let wechat_only = LeadFilter {
            has_wechat: WechatFilter::True,
            ..Default::default()
        };
        assert!(!wechat_only.cache_key().matches(&lead));
    }

    #[test]
    fn test_search_wildcard_characters_match_literally() {
        let key = LeadFilter {
            search: "1_8".to_string(),
            ..Default::default()
        }
        .cache_key();
        let mut lead = Lead {
            phone: "13800138001".to_string(),
            intention_level: None,
            detail: None,
            is_success: false,
            has_wechat: false,
            total_call_count: 0,
            connected_call_count: 0,
            latest_call_time: None,
            tags: None,
        };
        assert!(!key.matches(&lead));

        lead.phone = "91_8000".to_string();
        assert!(key.matches(&lead));
    }
}
