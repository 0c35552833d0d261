//! Flat records as delivered by list services, and the response envelope.
//!
//! Services answer in several shapes: a bare array, `{"items": [...]}`,
//! `{"data": [...]}` or a nested `{"data": {"data"|"items": [...]}}`.
//! All of them deserialize into [`ResponseEnvelope`] and are flattened by
//! [`ResponseEnvelope::normalize`]; nothing else in the crate inspects the
//! raw shape.

use serde::{Deserialize, Deserializer, Serialize};

use crate::traits::RecordKey;

/// Arbitrary record attributes, in service order.
pub type Payload = serde_json::Map<String, serde_json::Value>;

/// One flat record referencing its parent by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    #[serde(deserialize_with = "deserialize_key")]
    pub id: RecordKey,

    #[serde(default, deserialize_with = "deserialize_optional_key")]
    pub parent_id: Option<RecordKey>,

    /// Server hint: `Some(false)` means the record is known to be a leaf.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_children: Option<bool>,

    /// Children embedded by the service (eager load). `Some(vec![])` means
    /// "loaded, no children".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<Record>>,

    #[serde(flatten)]
    pub payload: Payload,
}

impl Record {
    /// Creates a record with an empty payload.
    pub fn new(id: impl Into<RecordKey>, parent_id: Option<&str>) -> Self {
        Self {
            id: id.into(),
            parent_id: parent_id.map(str::to_owned),
            has_children: None,
            children: None,
            payload: Payload::new(),
        }
    }

    pub fn with_has_children(mut self, has_children: bool) -> Self {
        self.has_children = Some(has_children);
        self
    }

    pub fn with_children(mut self, children: Vec<Record>) -> Self {
        self.children = Some(children);
        self
    }

    pub fn with_attr(mut self, name: &str, value: impl Into<serde_json::Value>) -> Self {
        self.payload.insert(name.to_owned(), value.into());
        self
    }
}

/// Ids arrive as strings or numbers; both are keyed by their textual form.
#[derive(Deserialize)]
#[serde(untagged)]
enum KeyRepr {
    Text(String),
    Number(serde_json::Number),
}

impl From<KeyRepr> for RecordKey {
    fn from(repr: KeyRepr) -> Self {
        match repr {
            KeyRepr::Text(s) => s,
            KeyRepr::Number(n) => n.to_string(),
        }
    }
}

fn deserialize_key<'de, D>(deserializer: D) -> Result<RecordKey, D::Error>
where
    D: Deserializer<'de>,
{
    KeyRepr::deserialize(deserializer).map(RecordKey::from)
}

fn deserialize_optional_key<'de, D>(deserializer: D) -> Result<Option<RecordKey>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<KeyRepr>::deserialize(deserializer)?.map(RecordKey::from))
}

/// Zero-based page selector for root searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub index: usize,
    pub size: usize,
}

impl PageRequest {
    pub const DEFAULT_SIZE: usize = 20;

    pub fn first(size: usize) -> Self {
        Self { index: 0, size: size.max(1) }
    }

    /// Offset of the first record of this page.
    pub fn offset(&self) -> usize {
        self.index * self.size
    }

    pub fn next(&self) -> Self {
        Self { index: self.index + 1, size: self.size }
    }

    pub fn previous(&self) -> Self {
        Self { index: self.index.saturating_sub(1), size: self.size }
    }

    /// Number of pages needed to show `total` records (at least one).
    pub fn page_count(&self, total: u64) -> usize {
        let size = self.size.max(1) as u64;
        (total.div_ceil(size) as usize).max(1)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::first(Self::DEFAULT_SIZE)
    }
}

/// A normalized response: records plus the server-side total.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordPage {
    pub records: Vec<Record>,
    /// Total matching records across all pages.
    pub total: u64,
}

/// Every response shape the list services are known to produce.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ResponseEnvelope {
    /// `[...]`
    Bare(Vec<Record>),
    /// `{"items": [...], "total": n}`
    Items {
        items: Vec<Record>,
        #[serde(default)]
        total: Option<u64>,
    },
    /// `{"data": ..., "total": n}` where `data` is itself one of the shapes
    Data {
        data: Box<ResponseEnvelope>,
        #[serde(default)]
        total: Option<u64>,
    },
}

impl ResponseEnvelope {
    /// Flattens any envelope shape into records and a total.
    ///
    /// The innermost reported total wins; when no level reports one the
    /// record count is used.
    pub fn normalize(self) -> RecordPage {
        let mut envelope = self;
        let mut outer_total = None;
        loop {
            match envelope {
                ResponseEnvelope::Bare(records) => {
                    let total = outer_total.unwrap_or(records.len() as u64);
                    return RecordPage { records, total };
                }
                ResponseEnvelope::Items { items, total } => {
                    let total = total.or(outer_total).unwrap_or(items.len() as u64);
                    return RecordPage { records: items, total };
                }
                ResponseEnvelope::Data { data, total } => {
                    outer_total = total.or(outer_total);
                    envelope = *data;
                }
            }
        }
    }

    /// Parses a raw JSON body into an envelope.
    pub fn from_json(body: &str) -> Result<Self, crate::error::FetchError> {
        serde_json::from_str(body).map_err(|e| crate::error::FetchError::Decode {
            message: e.to_string(),
        })
    }
}

impl From<Vec<Record>> for ResponseEnvelope {
    fn from(records: Vec<Record>) -> Self {
        ResponseEnvelope::Bare(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_and_null_ids() {
        let record: Record =
            serde_json::from_str(r#"{"id": 7, "parentId": null, "name": "ops"}"#).unwrap();
        assert_eq!(record.id, "7");
        assert_eq!(record.parent_id, None);
        assert_eq!(record.payload["name"], "ops");

        let child: Record = serde_json::from_str(r#"{"id": "8", "parentId": 7}"#).unwrap();
        assert_eq!(child.parent_id.as_deref(), Some("7"));
    }

    #[test]
    fn test_missing_parent_field() {
        let record: Record = serde_json::from_str(r#"{"id": "a"}"#).unwrap();
        assert_eq!(record.parent_id, None);
        assert_eq!(record.has_children, None);
        assert!(record.children.is_none());
    }

    #[test]
    fn test_normalize_bare_array() {
        let env = ResponseEnvelope::from_json(r#"[{"id": 1}, {"id": 2}]"#).unwrap();
        let page = env.normalize();
        assert_eq!(page.records.len(), 2);
        assert_eq!(page.total, 2);
    }

    #[test]
    fn test_normalize_items_with_total() {
        let env = ResponseEnvelope::from_json(r#"{"items": [{"id": 1}], "total": 40}"#).unwrap();
        let page = env.normalize();
        assert_eq!(page.records[0].id, "1");
        assert_eq!(page.total, 40);
    }

    #[test]
    fn test_normalize_data_array() {
        let env = ResponseEnvelope::from_json(r#"{"data": [{"id": "x"}]}"#).unwrap();
        assert_eq!(env.normalize().records[0].id, "x");
    }

    #[test]
    fn test_normalize_nested_data() {
        let env = ResponseEnvelope::from_json(
            r#"{"data": {"data": [{"id": "x"}, {"id": "y"}]}, "total": 12}"#,
        )
        .unwrap();
        let page = env.normalize();
        assert_eq!(page.records.len(), 2);
        assert_eq!(page.total, 12);

        let env = ResponseEnvelope::from_json(r#"{"data": {"items": [{"id": "x"}], "total": 3}}"#)
            .unwrap();
        assert_eq!(env.normalize().total, 3);
    }

    #[test]
    fn test_decode_error() {
        let err = ResponseEnvelope::from_json(r#"{"rows": []}"#).unwrap_err();
        assert!(matches!(err, crate::error::FetchError::Decode { .. }));
    }

    #[test]
    fn test_page_request_math() {
        let page = PageRequest { index: 2, size: 10 };
        assert_eq!(page.offset(), 20);
        assert_eq!(page.page_count(0), 1);
        assert_eq!(page.page_count(21), 3);
        assert_eq!(page.previous().index, 1);
        assert_eq!(PageRequest::first(0).size, 1);
    }
}
