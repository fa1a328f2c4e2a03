use ndarray::Array2;
use ndarray_npy::{ReadNpyExt, WriteNpyExt};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tvrec_common::{Result, TvRecError};

use crate::manifest::StoreManifest;
use crate::types::{ItemRecord, MetaEntry};

/// Vector matrix artifact name
pub const EMBEDDINGS_FILE: &str = "embeddings.npy";

/// Metadata artifact name
pub const META_FILE: &str = "meta.json";

/// Conventional subdirectory searched when a directory lacks the artifacts
pub const FALLBACK_DIR: &str = "embedding";

/// Immutable, aligned pair of an N×D vector matrix and N item records.
///
/// Row `i` of `vectors` belongs to `records[i]`. Rows are expected to be
/// unit length; the store never re-normalizes.
#[derive(Debug, Clone)]
pub struct VectorStore {
    vectors: Array2<f32>,
    records: Vec<ItemRecord>,
    embedding_model: Option<String>,
}

impl VectorStore {
    /// Pair a matrix with its records, rejecting any length disagreement
    pub fn new(vectors: Array2<f32>, records: Vec<ItemRecord>) -> Result<Self> {
        if records.len() != vectors.nrows() {
            return Err(TvRecError::CountMismatch {
                records: records.len(),
                rows: vectors.nrows(),
            });
        }

        Ok(Self {
            vectors,
            records,
            embedding_model: None,
        })
    }

    /// Assemble the matrix from individual rows of equal width
    pub fn from_rows(rows: Vec<Vec<f32>>, records: Vec<ItemRecord>) -> Result<Self> {
        let n = rows.len();
        let dim = rows.first().map_or(0, Vec::len);

        let mut flat = Vec::with_capacity(n * dim);
        for (row, vector) in rows.into_iter().enumerate() {
            if vector.len() != dim {
                return Err(TvRecError::RaggedRows {
                    row,
                    expected: dim,
                    found: vector.len(),
                });
            }
            flat.extend(vector);
        }

        let vectors = Array2::from_shape_vec((n, dim), flat)
            .map_err(|e| TvRecError::invalid_input(format!("bad matrix shape: {}", e)))?;
        Self::new(vectors, records)
    }

    /// Tag the store with the model its vectors came from
    pub fn with_embedding_model(mut self, model: impl Into<String>) -> Self {
        self.embedding_model = Some(model.into());
        self
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Row width, undefined for an empty store
    pub fn dimension(&self) -> Option<usize> {
        if self.is_empty() {
            None
        } else {
            Some(self.vectors.ncols())
        }
    }

    pub fn vectors(&self) -> &Array2<f32> {
        &self.vectors
    }

    pub fn records(&self) -> &[ItemRecord] {
        &self.records
    }

    pub fn embedding_model(&self) -> Option<&str> {
        self.embedding_model.as_deref()
    }

    /// Write `embeddings.npy`, `meta.json` and `manifest.json` into `dir`
    pub fn save(&self, dir: &Path) -> Result<()> {
        std::fs::create_dir_all(dir)?;

        let mut npy = Vec::new();
        self.vectors
            .write_npy(&mut npy)
            .map_err(|e| TvRecError::serialization(format!("Failed to encode embeddings: {}", e)))?;

        let meta: Vec<MetaEntry> = self.records.iter().map(MetaEntry::from).collect();
        let meta_json = serde_json::to_vec_pretty(&meta)?;

        let emb_path = dir.join(EMBEDDINGS_FILE);
        let meta_path = dir.join(META_FILE);
        std::fs::write(&emb_path, &npy)?;
        std::fs::write(&meta_path, &meta_json)?;

        StoreManifest::describe(self, &npy, &meta_json).write(dir)?;

        info!(
            "Vector store saved: {} ({} x {})",
            dir.display(),
            self.vectors.nrows(),
            self.vectors.ncols()
        );
        Ok(())
    }

    /// Load a store from a directory holding both artifacts.
    ///
    /// A missing artifact yields `MissingArtifact` listing the primary and
    /// `embedding/` fallback paths. A manifest, when present, must agree with
    /// the artifacts.
    pub fn load(dir: &Path) -> Result<Self> {
        Self::load_from(dir, candidate_paths(dir))
    }

    /// Load from a resolved location, reporting every path resolution searched
    pub fn load_resolved(resolved: &ResolvedStore) -> Result<Self> {
        Self::load_from(&resolved.dir, resolved.tried.clone())
    }

    fn load_from(dir: &Path, tried: Vec<PathBuf>) -> Result<Self> {
        let emb_path = dir.join(EMBEDDINGS_FILE);
        let meta_path = dir.join(META_FILE);

        if !emb_path.is_file() || !meta_path.is_file() {
            return Err(TvRecError::MissingArtifact { tried });
        }

        let npy = std::fs::read(&emb_path)?;
        let vectors = Array2::<f32>::read_npy(npy.as_slice()).map_err(|e| {
            TvRecError::serialization(format!("Failed to read {}: {}", emb_path.display(), e))
        })?;

        let meta_json = std::fs::read(&meta_path)?;
        let entries: Vec<MetaEntry> = serde_json::from_slice(&meta_json)?;
        let records = entries.into_iter().map(ItemRecord::from).collect();

        let mut store = Self::new(vectors, records)?;

        if let Some(manifest) = StoreManifest::read(dir)? {
            manifest.verify(dir, &store, &npy, &meta_json)?;
            store.embedding_model = manifest.embedding_model;
        } else {
            debug!("No manifest in {}, skipping integrity check", dir.display());
        }

        info!(
            "Vector store loaded: {} ({} x {})",
            dir.display(),
            store.vectors.nrows(),
            store.vectors.ncols()
        );
        Ok(store)
    }
}

/// Every artifact location a failed load reports
fn candidate_paths(dir: &Path) -> Vec<PathBuf> {
    let fallback = dir.join(FALLBACK_DIR);
    vec![
        dir.join(EMBEDDINGS_FILE),
        dir.join(META_FILE),
        fallback.join(EMBEDDINGS_FILE),
        fallback.join(META_FILE),
    ]
}

fn has_artifacts(dir: &Path) -> bool {
    dir.join(EMBEDDINGS_FILE).is_file() && dir.join(META_FILE).is_file()
}

/// Store directory picked by resolution, with every artifact path it looked at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedStore {
    pub dir: PathBuf,
    pub tried: Vec<PathBuf>,
}

fn push_candidates(tried: &mut Vec<PathBuf>, dir: &Path) {
    for path in candidate_paths(dir) {
        if !tried.contains(&path) {
            tried.push(path);
        }
    }
}

/// Directory as-is when it holds the artifacts, else its `embedding/` child
fn resolve_existing(dir: &Path, tried: &mut Vec<PathBuf>) -> Option<PathBuf> {
    push_candidates(tried, dir);
    if !dir.is_dir() {
        return None;
    }
    if has_artifacts(dir) {
        return Some(dir.to_path_buf());
    }
    let nested = dir.join(FALLBACK_DIR);
    if nested.is_dir() {
        return Some(nested);
    }
    Some(dir.to_path_buf())
}

/// Resolve a user-supplied store path against the current directory
pub fn resolve_store_dir(arg: &Path) -> ResolvedStore {
    match std::env::current_dir() {
        Ok(cwd) => resolve_store_dir_in(arg, &cwd),
        Err(_) => {
            let mut tried = Vec::new();
            let dir = resolve_existing(arg, &mut tried).unwrap_or_else(|| arg.to_path_buf());
            ResolvedStore { dir, tried }
        }
    }
}

/// Resolve a store path, trying `arg` and then `cwd/arg`.
///
/// Falls back to `arg` unchanged. `tried` holds the primary and `embedding/`
/// artifact paths of every directory examined, for the load error.
pub fn resolve_store_dir_in(arg: &Path, cwd: &Path) -> ResolvedStore {
    let mut tried = Vec::new();
    let dir = resolve_existing(arg, &mut tried)
        .or_else(|| resolve_existing(&cwd.join(arg), &mut tried))
        .unwrap_or_else(|| arg.to_path_buf());
    ResolvedStore { dir, tried }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn sample_store() -> VectorStore {
        let rows = vec![vec![1.0, 0.0, 0.0], vec![0.0, 0.6, 0.8], vec![0.0, 0.0, 1.0]];
        let records = vec![
            ItemRecord::new(1396, "Breaking Bad"),
            ItemRecord::new(1399, "Game of Thrones"),
            ItemRecord::new(66732, ""),
        ];
        VectorStore::from_rows(rows, records).unwrap()
    }

    #[test]
    fn test_count_mismatch_rejected() {
        let err = VectorStore::new(array![[1.0f32, 0.0], [0.0, 1.0]], vec![ItemRecord::new(1, "a")])
            .unwrap_err();
        assert!(matches!(err, TvRecError::CountMismatch { records: 1, rows: 2 }));
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let err = VectorStore::from_rows(
            vec![vec![1.0, 0.0], vec![1.0]],
            vec![ItemRecord::new(1, "a"), ItemRecord::new(2, "b")],
        )
        .unwrap_err();
        assert!(matches!(err, TvRecError::RaggedRows { row: 1, expected: 2, found: 1 }));
    }

    #[test]
    fn test_empty_store() {
        let store = VectorStore::from_rows(Vec::new(), Vec::new()).unwrap();
        assert!(store.is_empty());
        assert_eq!(store.dimension(), None);
    }

    #[test]
    fn test_save_load_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        let store = sample_store().with_embedding_model("all-minilm");
        store.save(tmp.path()).unwrap();

        assert!(tmp.path().join(EMBEDDINGS_FILE).is_file());
        assert!(tmp.path().join(META_FILE).is_file());

        let loaded = VectorStore::load(tmp.path()).unwrap();
        assert_eq!(loaded.records(), store.records());
        assert_eq!(loaded.dimension(), Some(3));
        assert_eq!(loaded.embedding_model(), Some("all-minilm"));
        for (a, b) in loaded.vectors().iter().zip(store.vectors().iter()) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn test_load_empty_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        VectorStore::from_rows(Vec::new(), Vec::new())
            .unwrap()
            .save(tmp.path())
            .unwrap();
        let loaded = VectorStore::load(tmp.path()).unwrap();
        assert!(loaded.is_empty());
    }

    #[test]
    fn test_meta_json_layout() {
        let tmp = tempfile::tempdir().unwrap();
        sample_store().save(tmp.path()).unwrap();
        let raw = std::fs::read_to_string(tmp.path().join(META_FILE)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value[0]["series_id"], 1396);
        assert_eq!(value[1]["title"], "Game of Thrones");
        assert_eq!(value.as_array().unwrap().len(), 3);
    }

    #[test]
    fn test_load_missing_artifact_lists_candidates() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join(META_FILE), "[]").unwrap();

        let err = VectorStore::load(tmp.path()).unwrap_err();
        match &err {
            TvRecError::MissingArtifact { tried } => {
                assert_eq!(tried.len(), 4);
                assert!(tried.contains(&tmp.path().join(EMBEDDINGS_FILE)));
                assert!(tried.contains(&tmp.path().join(FALLBACK_DIR).join(META_FILE)));
            }
            other => panic!("unexpected error: {other}"),
        }
        let msg = err.to_string();
        assert!(msg.contains(&tmp.path().join(FALLBACK_DIR).join(EMBEDDINGS_FILE).display().to_string()));
    }

    #[test]
    fn test_load_count_mismatch() {
        let tmp = tempfile::tempdir().unwrap();
        sample_store().save(tmp.path()).unwrap();
        std::fs::remove_file(tmp.path().join(crate::manifest::MANIFEST_FILE)).unwrap();
        std::fs::write(
            tmp.path().join(META_FILE),
            r#"[{"series_id": 1, "title": "only one"}]"#,
        )
        .unwrap();

        let err = VectorStore::load(tmp.path()).unwrap_err();
        assert!(matches!(err, TvRecError::CountMismatch { records: 1, rows: 3 }));
    }

    #[test]
    fn test_load_without_manifest() {
        let tmp = tempfile::tempdir().unwrap();
        sample_store().save(tmp.path()).unwrap();
        std::fs::remove_file(tmp.path().join(crate::manifest::MANIFEST_FILE)).unwrap();

        let loaded = VectorStore::load(tmp.path()).unwrap();
        assert_eq!(loaded.len(), 3);
        assert_eq!(loaded.embedding_model(), None);
    }

    #[test]
    fn test_resolve_direct_dir() {
        let tmp = tempfile::tempdir().unwrap();
        sample_store().save(tmp.path()).unwrap();
        assert_eq!(resolve_store_dir_in(tmp.path(), Path::new("/")).dir, tmp.path());
    }

    #[test]
    fn test_resolve_descends_into_embedding_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let nested = tmp.path().join(FALLBACK_DIR);
        sample_store().save(&nested).unwrap();

        assert_eq!(resolve_store_dir_in(tmp.path(), Path::new("/")).dir, nested);
    }

    #[test]
    fn test_resolve_relative_to_cwd() {
        let tmp = tempfile::tempdir().unwrap();
        let nested = tmp.path().join("stores").join(FALLBACK_DIR);
        sample_store().save(&nested).unwrap();

        let resolved = resolve_store_dir_in(Path::new("stores"), tmp.path());
        assert_eq!(resolved.dir, nested);
    }

    #[test]
    fn test_resolve_unknown_path_unchanged() {
        let tmp = tempfile::tempdir().unwrap();
        let arg = Path::new("no-such-store-dir");
        let resolved = resolve_store_dir_in(arg, tmp.path());
        assert_eq!(resolved.dir, PathBuf::from(arg));
        assert!(resolved.tried.contains(&arg.join(EMBEDDINGS_FILE)));
        assert!(resolved.tried.contains(&tmp.path().join(arg).join(META_FILE)));

        let err = VectorStore::load_resolved(&resolved).unwrap_err();
        match err {
            TvRecError::MissingArtifact { tried } => assert_eq!(tried.len(), 8),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_after_embedding_fallback_lists_base_paths() {
        let tmp = tempfile::tempdir().unwrap();
        let nested = tmp.path().join(FALLBACK_DIR);
        std::fs::create_dir(&nested).unwrap();

        let resolved = resolve_store_dir_in(tmp.path(), Path::new("/"));
        assert_eq!(resolved.dir, nested);

        let err = VectorStore::load_resolved(&resolved).unwrap_err();
        let tried = match &err {
            TvRecError::MissingArtifact { tried } => tried.clone(),
            other => panic!("unexpected error: {other}"),
        };
        assert!(tried.contains(&tmp.path().join(EMBEDDINGS_FILE)));
        assert!(tried.contains(&tmp.path().join(META_FILE)));
        assert!(tried.contains(&nested.join(EMBEDDINGS_FILE)));
        assert!(tried.contains(&nested.join(META_FILE)));
        assert!(!tried.iter().any(|p| p.starts_with(nested.join(FALLBACK_DIR))));
        assert!(err.to_string().contains(&tmp.path().join(META_FILE).display().to_string()));
    }
}
