use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;
use tvrec_common::{Result, TvRecError};

use crate::store::{VectorStore, EMBEDDINGS_FILE, META_FILE};

/// Manifest artifact name
pub const MANIFEST_FILE: &str = "manifest.json";

/// Shape and checksums recorded next to a saved store.
///
/// Optional on load: stores written by other tools carry none.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreManifest {
    /// Model the vectors came from
    #[serde(default)]
    pub embedding_model: Option<String>,

    /// Number of rows
    pub count: usize,

    /// Row width
    pub dimension: usize,

    /// When the store was written
    pub created_at: DateTime<Utc>,

    /// SHA-256 of `embeddings.npy` (hex)
    pub embeddings_sha256: String,

    /// SHA-256 of `meta.json` (hex)
    pub meta_sha256: String,
}

fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

impl StoreManifest {
    /// Describe a store from the exact bytes about to be written
    pub(crate) fn describe(store: &VectorStore, npy: &[u8], meta_json: &[u8]) -> Self {
        Self {
            embedding_model: store.embedding_model().map(str::to_string),
            count: store.vectors().nrows(),
            dimension: store.vectors().ncols(),
            created_at: Utc::now(),
            embeddings_sha256: sha256_hex(npy),
            meta_sha256: sha256_hex(meta_json),
        }
    }

    pub(crate) fn write(&self, dir: &Path) -> Result<()> {
        let data = serde_json::to_string_pretty(self)?;
        std::fs::write(dir.join(MANIFEST_FILE), data)?;
        Ok(())
    }

    /// Read the manifest of a store directory, if it has one
    pub fn read(dir: &Path) -> Result<Option<Self>> {
        let path = dir.join(MANIFEST_FILE);
        if !path.is_file() {
            return Ok(None);
        }
        let data = std::fs::read_to_string(&path)?;
        Ok(Some(serde_json::from_str(&data)?))
    }

    /// Check the loaded artifacts against the recorded shape and checksums
    pub(crate) fn verify(
        &self,
        dir: &Path,
        store: &VectorStore,
        npy: &[u8],
        meta_json: &[u8],
    ) -> Result<()> {
        let shape = (store.vectors().nrows(), store.vectors().ncols());
        if shape != (self.count, self.dimension) {
            return Err(TvRecError::IntegrityMismatch {
                path: dir.join(MANIFEST_FILE),
                detail: format!(
                    "manifest records {} x {}, artifacts hold {} x {}",
                    self.count, self.dimension, shape.0, shape.1
                ),
            });
        }

        let checks = [
            (EMBEDDINGS_FILE, &self.embeddings_sha256, npy),
            (META_FILE, &self.meta_sha256, meta_json),
        ];
        for (file, expected, bytes) in checks {
            let actual = sha256_hex(bytes);
            if !actual.eq_ignore_ascii_case(expected) {
                return Err(TvRecError::IntegrityMismatch {
                    path: dir.join(file),
                    detail: format!("sha256 {} does not match manifest {}", actual, expected),
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ItemRecord;

    fn saved_store(dir: &Path) {
        VectorStore::from_rows(
            vec![vec![1.0, 0.0], vec![0.0, 1.0]],
            vec![ItemRecord::new(1, "Dark"), ItemRecord::new(2, "Lost")],
        )
        .unwrap()
        .with_embedding_model("nomic-embed-text")
        .save(dir)
        .unwrap();
    }

    #[test]
    fn test_manifest_written() {
        let tmp = tempfile::tempdir().unwrap();
        saved_store(tmp.path());

        let manifest = StoreManifest::read(tmp.path()).unwrap().unwrap();
        assert_eq!(manifest.count, 2);
        assert_eq!(manifest.dimension, 2);
        assert_eq!(manifest.embedding_model.as_deref(), Some("nomic-embed-text"));
        assert_eq!(manifest.meta_sha256.len(), 64);
    }

    #[test]
    fn test_tampered_meta_detected() {
        let tmp = tempfile::tempdir().unwrap();
        saved_store(tmp.path());
        std::fs::write(
            tmp.path().join(META_FILE),
            r#"[{"series_id": 1, "title": "Dark"}, {"series_id": 3, "title": "Lost"}]"#,
        )
        .unwrap();

        let err = VectorStore::load(tmp.path()).unwrap_err();
        match err {
            TvRecError::IntegrityMismatch { path, .. } => assert!(path.ends_with(META_FILE)),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_manifest_is_none() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(StoreManifest::read(tmp.path()).unwrap().is_none());
    }
}
