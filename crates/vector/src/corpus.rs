use serde::Deserialize;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{info, warn};
use tvrec_common::{Result, TvRecError};

use crate::types::ItemRecord;

/// One line of the enriched series JSONL.
///
/// Only the fields the store needs are kept; everything else on the line is
/// ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawSeriesRecord {
    #[serde(default)]
    pub series_id: Option<i64>,

    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub original_title: Option<String>,

    /// Natural-language document fed to the embedding model
    #[serde(default)]
    pub doc_text: Option<String>,
}

/// Build input: document text plus the record it describes
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesDocument {
    pub text: String,
    pub record: ItemRecord,
}

impl SeriesDocument {
    pub fn new(text: impl Into<String>, record: ItemRecord) -> Self {
        Self {
            text: text.into(),
            record,
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

impl RawSeriesRecord {
    /// Narrow to a `SeriesDocument`; `None` when the record has no id.
    ///
    /// Title falls back to `original_title`, then to an empty string.
    pub fn into_document(self) -> Option<SeriesDocument> {
        let id = self.series_id?;
        let title = non_empty(self.title)
            .or_else(|| non_empty(self.original_title))
            .unwrap_or_default();

        Some(SeriesDocument {
            text: self.doc_text.unwrap_or_default(),
            record: ItemRecord::new(id, title),
        })
    }
}

/// Parse JSONL from a reader. Blank lines are skipped.
pub fn parse_jsonl<R: BufRead>(reader: R) -> Result<Vec<RawSeriesRecord>> {
    let mut records = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let record = serde_json::from_str(line).map_err(|e| {
            TvRecError::invalid_input(format!("line {}: malformed JSON record: {}", i + 1, e))
        })?;
        records.push(record);
    }
    Ok(records)
}

/// Read a JSONL corpus and narrow every record to a build document
pub fn load_documents(path: &Path) -> Result<Vec<SeriesDocument>> {
    let file = std::fs::File::open(path).map_err(|e| {
        TvRecError::invalid_input(format!("Failed to open corpus {}: {}", path.display(), e))
    })?;
    let raw = parse_jsonl(BufReader::new(file))?;
    let total = raw.len();

    let documents: Vec<SeriesDocument> = raw
        .into_iter()
        .filter_map(RawSeriesRecord::into_document)
        .collect();

    let dropped = total - documents.len();
    if dropped > 0 {
        warn!("Dropped {} corpus records without series_id", dropped);
    }
    info!("Loaded {} documents from {}", documents.len(), path.display());

    Ok(documents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const CORPUS: &str = r#"{"series_id": 1396, "title": "Breaking Bad", "doc_text": "Title: Breaking Bad\nGenres: Drama", "genres": ["Drama"]}

{"series_id": 1399, "title": "", "original_title": "Game of Thrones", "doc_text": "Title: Game of Thrones"}
{"title": "No id", "doc_text": "orphan"}
{"series_id": 42, "doc_text": "   "}
"#;

    #[test]
    fn test_parse_skips_blank_lines() {
        let records = parse_jsonl(Cursor::new(CORPUS)).unwrap();
        assert_eq!(records.len(), 4);
        assert_eq!(records[0].series_id, Some(1396));
    }

    #[test]
    fn test_malformed_line_reports_line_number() {
        let err = parse_jsonl(Cursor::new("{\"series_id\": 1}\n{oops\n")).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_narrowing() {
        let docs: Vec<SeriesDocument> = parse_jsonl(Cursor::new(CORPUS))
            .unwrap()
            .into_iter()
            .filter_map(RawSeriesRecord::into_document)
            .collect();

        assert_eq!(docs.len(), 3);
        assert_eq!(docs[0].record, ItemRecord::new(1396, "Breaking Bad"));
        assert_eq!(docs[1].record.title, "Game of Thrones");
        assert_eq!(docs[2].record, ItemRecord::new(42, ""));
        assert_eq!(docs[2].text, "   ");
    }

    #[test]
    fn test_load_documents_from_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("llm_titles.jsonl");
        std::fs::write(&path, CORPUS).unwrap();

        let docs = load_documents(&path).unwrap();
        assert_eq!(docs.len(), 3);
    }

    #[test]
    fn test_load_documents_missing_file() {
        let err = load_documents(Path::new("/nonexistent/corpus.jsonl")).unwrap_err();
        assert!(matches!(err, TvRecError::InvalidInput(_)));
    }
}
