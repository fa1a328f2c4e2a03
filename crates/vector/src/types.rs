use serde::{Deserialize, Serialize};

/// Metadata for one stored item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemRecord {
    /// Series ID (externally assigned, unique across the store)
    pub id: i64,

    /// Display title (may be empty)
    pub title: String,
}

impl ItemRecord {
    pub fn new(id: i64, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
        }
    }
}

/// One element of the `meta.json` array
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct MetaEntry {
    pub series_id: i64,

    #[serde(default)]
    pub title: Option<String>,
}

impl From<MetaEntry> for ItemRecord {
    fn from(entry: MetaEntry) -> Self {
        Self {
            id: entry.series_id,
            title: entry.title.unwrap_or_default(),
        }
    }
}

impl From<&ItemRecord> for MetaEntry {
    fn from(record: &ItemRecord) -> Self {
        Self {
            series_id: record.id,
            title: Some(record.title.clone()),
        }
    }
}

/// Search result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedResult {
    /// 1-based position
    pub rank: usize,

    /// Series ID
    pub id: i64,

    /// Display title
    pub title: String,

    /// Cosine similarity (unrounded)
    pub score: f32,
}
