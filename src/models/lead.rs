use serde::{Deserialize, Deserializer, Serialize};
use chrono::{DateTime, NaiveDateTime, Utc};

/// A row of the `leads` table. `phone` is the primary key.
///
/// Call counters are rendered as the store returns them; nothing here assumes
/// `connected_call_count <= total_call_count`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Lead {
    pub phone: String,
    pub intention_level: Option<String>,
    pub detail: Option<String>,
    #[serde(default, deserialize_with = "deserialize_or_default")]
    pub is_success: bool,
    #[serde(default, deserialize_with = "deserialize_or_default")]
    pub has_wechat: bool,
    #[serde(default, deserialize_with = "deserialize_or_default")]
    pub total_call_count: i64,
    #[serde(default, deserialize_with = "deserialize_or_default")]
    pub connected_call_count: i64,
    #[serde(default, deserialize_with = "deserialize_call_time")]
    pub latest_call_time: Option<DateTime<Utc>>,
    pub tags: Option<serde_json::Value>,
}

/// Missing and `null` both read as the type's default.
fn deserialize_or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Accepts `timestamptz` and `timestamp` text; an unreadable value reads as
/// never called rather than failing the whole page.
fn deserialize_call_time<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };
    let parsed = parse_call_time(raw.trim());
    if parsed.is_none() {
        tracing::debug!("Unreadable latest_call_time: {:?}", raw);
    }
    Ok(parsed)
}

fn parse_call_time(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(time) = DateTime::parse_from_rfc3339(raw) {
        return Some(time.with_timezone(&Utc));
    }
    if let Ok(time) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f%#z") {
        return Some(time.with_timezone(&Utc));
    }
    // Without an offset the value is taken as UTC
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|time| time.and_utc())
}

impl Lead {
    /// Raw "connected/total" label.
    pub fn call_summary(&self) -> String {
        format!("{}/{}", self.connected_call_count, self.total_call_count)
    }

    /// Connected share in percent, clamped to 0..=100. `None` without calls.
    pub fn connect_rate(&self) -> Option<u32> {
        if self.total_call_count <= 0 {
            return None;
        }
        let connected = self.connected_call_count.clamp(0, self.total_call_count);
        Some(((connected as f64 / self.total_call_count as f64) * 100.0).round() as u32)
    }

    pub fn intention_label(&self) -> &str {
        match self.intention_level.as_deref() {
            Some(level) if !level.trim().is_empty() => level,
            _ => "-",
        }
    }

    pub fn status_label(&self) -> &str {
        if self.is_success {
            "Success"
        } else {
            "Pending"
        }
    }

    pub fn status_color_class(&self) -> &str {
        if self.is_success {
            "bg-green-100 text-green-800"
        } else {
            "bg-gray-100 text-gray-800"
        }
    }
}

/// One page of query results: rows in display order plus the exact match count.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LeadPage {
    pub items: Vec<Lead>,
    pub total_count: u64,
}

/// Body of an insert. Flags default to `false` on creation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewLead {
    pub phone: String,
    pub intention_level: Option<String>,
    pub detail: Option<String>,
    pub is_success: bool,
    pub has_wechat: bool,
}

/// Partial update body; only `Some` fields are sent.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LeadPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_success: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_wechat: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intention_level: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<Option<String>>,
}

/// The creation form's fields. Blank optional fields are stored as `NULL`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LeadForm {
    pub phone: String,
    pub intention_level: String,
    pub detail: String,
}

impl LeadForm {
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn to_new_lead(&self) -> NewLead {
        NewLead {
            phone: self.phone.trim().to_string(),
            intention_level: non_blank(&self.intention_level),
            detail: non_blank(&self.detail),
            is_success: false,
            has_wechat: false,
        }
    }
}

fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
