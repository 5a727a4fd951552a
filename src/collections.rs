//! Persisted per-document collections.
//!
//! Each uploaded PDF becomes one collection: a directory under the base
//! directory, named after the file's stem, holding a single SQLite index.
//!
//! ```text
//! <base_dir>/
//! ├── policy/
//! │   └── index.sqlite            meta + chunks (text, page, embedding)
//! ├── handbook/
//! │   └── index.sqlite
//! └── .staging-manual-<uuid>/     ingestion in progress, never listed
//! ```
//!
//! Collections are created once and never rebuilt: creating a name that
//! already exists hands back the existing collection. A new collection is
//! built in a hidden staging directory and renamed into place only after
//! every chunk has been embedded and stored, so an interrupted ingestion
//! never shows up in [`CollectionStore::list`]. Deletion renames the
//! directory to a staging name before removing it, for the same reason.

use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

use docchat_core::chunk::chunk_pages;
use docchat_core::embedding::Embedder;
use docchat_core::index::VectorIndex;
use docchat_core::models::Chunk;
use docchat_core::{Error, Result};

use crate::db::{self, INDEX_FILE};
use crate::extract::extract_pdf_pages;
use crate::migrate;
use crate::progress::{IngestProgressEvent, IngestProgressReporter};
use crate::sqlite_index::SqliteIndex;

const STAGING_PREFIX: &str = ".staging-";

/// Outcome of an ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestStatus {
    Created,
    /// The collection was already on disk and was reused as-is.
    AlreadyExists,
}

pub struct Ingested {
    pub handle: CollectionHandle,
    pub status: IngestStatus,
}

/// Summary of a persisted collection, read from its metadata.
#[derive(Debug, Clone, Serialize)]
pub struct CollectionInfo {
    pub name: String,
    pub chunks: usize,
    pub embedding_model: String,
    pub dims: usize,
    pub source_file: String,
    /// RFC 3339.
    pub created_at: String,
}

/// An opened collection.
#[derive(Clone)]
pub struct CollectionHandle {
    name: String,
    index: Arc<SqliteIndex>,
}

impl CollectionHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Shared handle for the retrieval pipeline.
    pub fn index(&self) -> Arc<dyn VectorIndex> {
        self.index.clone()
    }

    pub async fn info(&self) -> Result<CollectionInfo> {
        let meta = self.index.read_meta().await?;
        let get = |key: &str| meta.get(key).cloned().unwrap_or_default();
        Ok(CollectionInfo {
            name: self.name.clone(),
            chunks: self.index.count().await?,
            embedding_model: get("embedding_model"),
            dims: get("dims").parse().unwrap_or(0),
            source_file: get("source_file"),
            created_at: get("created_at"),
        })
    }

    /// Warn when the collection was embedded with a different model than
    /// `embedder`; similarity scores are then meaningless.
    pub async fn check_embedder(&self, embedder: &dyn Embedder) -> Result<()> {
        let meta = self.index.read_meta().await?;
        if let Some(model) = meta.get("embedding_model") {
            if model != embedder.model_name() {
                tracing::warn!(
                    collection = %self.name,
                    stored = %model,
                    configured = embedder.model_name(),
                    "collection was embedded with a different model"
                );
            }
        }
        Ok(())
    }
}

/// The base directory and every collection in it.
pub struct CollectionStore {
    base_dir: PathBuf,
}

impl CollectionStore {
    /// Open the store, creating `base_dir` if needed and removing staging
    /// directories left behind by interrupted ingestions.
    pub fn open(base_dir: impl Into<PathBuf>) -> Result<Self> {
        let base_dir = base_dir.into();
        std::fs::create_dir_all(&base_dir)?;

        for entry in std::fs::read_dir(&base_dir)? {
            let entry = entry?;
            let file_name = entry.file_name();
            if file_name.to_string_lossy().starts_with(STAGING_PREFIX) {
                match std::fs::remove_dir_all(entry.path()) {
                    Ok(()) => tracing::info!(path = %entry.path().display(), "removed stale staging directory"),
                    Err(e) => tracing::warn!(path = %entry.path().display(), error = %e, "could not remove staging directory"),
                }
            }
        }

        Ok(Self { base_dir })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn collection_dir(&self, name: &str) -> PathBuf {
        self.base_dir.join(name)
    }

    fn staging_dir(&self, name: &str) -> PathBuf {
        self.base_dir
            .join(format!("{}{}-{}", STAGING_PREFIX, name, uuid::Uuid::new_v4()))
    }

    pub fn exists(&self, name: &str) -> bool {
        validate_name(name).is_ok() && self.collection_dir(name).is_dir()
    }

    /// Build collection `name` from `chunks`, embedding each one.
    ///
    /// Reports [`IngestProgressEvent::Embedding`] after every stored chunk.
    /// When `name` already exists nothing is embedded and the existing
    /// collection is returned with [`IngestStatus::AlreadyExists`].
    pub async fn create(
        &self,
        name: &str,
        source_file: &str,
        chunks: &[Chunk],
        embedder: &dyn Embedder,
        progress: &dyn IngestProgressReporter,
    ) -> Result<Ingested> {
        validate_name(name)?;

        if self.collection_dir(name).exists() {
            tracing::info!(collection = name, "collection already exists, reusing it");
            return Ok(Ingested {
                handle: self.load(name).await?,
                status: IngestStatus::AlreadyExists,
            });
        }

        if chunks.is_empty() {
            return Err(Error::EmptyDocument {
                name: name.to_string(),
            });
        }

        std::fs::create_dir_all(&self.base_dir)?;
        let staging = self.staging_dir(name);

        let built = build_index(&staging, name, source_file, chunks, embedder, progress).await;
        if let Err(e) = built {
            remove_staging(&staging);
            return Err(e);
        }

        let target = self.collection_dir(name);
        if let Err(e) = std::fs::rename(&staging, &target) {
            remove_staging(&staging);
            if target.exists() {
                tracing::info!(collection = name, "collection appeared during ingestion, reusing it");
                return Ok(Ingested {
                    handle: self.load(name).await?,
                    status: IngestStatus::AlreadyExists,
                });
            }
            return Err(Error::storage(name, "publishing collection", e));
        }

        tracing::info!(collection = name, chunks = chunks.len(), "collection created");
        progress.report(IngestProgressEvent::Done {
            collection: name.to_string(),
            chunks: chunks.len() as u64,
        });

        Ok(Ingested {
            handle: self.load(name).await?,
            status: IngestStatus::Created,
        })
    }

    /// Turn an uploaded PDF into a collection named after the file.
    pub async fn ingest_pdf(
        &self,
        file_name: &str,
        bytes: &[u8],
        embedder: &dyn Embedder,
        progress: &dyn IngestProgressReporter,
    ) -> Result<Ingested> {
        let name = collection_name_from_file(file_name)?;

        if self.collection_dir(&name).exists() {
            tracing::info!(collection = %name, "collection already exists, skipping extraction");
            return Ok(Ingested {
                handle: self.load(&name).await?,
                status: IngestStatus::AlreadyExists,
            });
        }

        progress.report(IngestProgressEvent::Extracting {
            collection: name.clone(),
        });
        let pages = extract_pdf_pages(&name, bytes)?;
        let chunks = chunk_pages(&pages);
        tracing::debug!(collection = %name, pages = pages.len(), chunks = chunks.len(), "chunked document");

        let source_file = Path::new(file_name)
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_else(|| file_name.to_string());
        self.create(&name, &source_file, &chunks, embedder, progress)
            .await
    }

    /// [`ingest_pdf`](Self::ingest_pdf) for a file on disk.
    pub async fn ingest_file(
        &self,
        path: &Path,
        embedder: &dyn Embedder,
        progress: &dyn IngestProgressReporter,
    ) -> Result<Ingested> {
        let bytes = tokio::fs::read(path).await?;
        self.ingest_pdf(&path.to_string_lossy(), &bytes, embedder, progress)
            .await
    }

    /// Open an existing collection.
    pub async fn load(&self, name: &str) -> Result<CollectionHandle> {
        validate_name(name)?;
        let dir = self.collection_dir(name);
        if !dir.is_dir() {
            return Err(Error::NotFound {
                name: name.to_string(),
            });
        }

        let db_path = dir.join(INDEX_FILE);
        if !db_path.is_file() {
            return Err(Error::load(name, format!("{} is missing", INDEX_FILE)));
        }

        let pool = db::connect_existing(&db_path)
            .await
            .map_err(|e| Error::load(name, e))?;
        if let Err(reason) = migrate::verify_schema(&pool).await {
            pool.close().await;
            return Err(Error::load(name, reason));
        }

        tracing::debug!(collection = name, "collection loaded");
        Ok(CollectionHandle {
            name: name.to_string(),
            index: Arc::new(SqliteIndex::new(name, pool)),
        })
    }

    /// Delete a collection.
    ///
    /// The directory is first renamed to a hidden staging name, so the
    /// collection leaves [`list`](Self::list) in one step. Its files and
    /// then its directories are removed bottom-up; anything left behind by a
    /// failed removal is swept by the next [`open`](Self::open).
    pub fn delete(&self, name: &str) -> Result<()> {
        validate_name(name)?;
        let dir = self.collection_dir(name);
        if !dir.is_dir() {
            return Err(Error::NotFound {
                name: name.to_string(),
            });
        }

        let doomed = self.staging_dir(name);
        std::fs::rename(&dir, &doomed).map_err(|e| Error::storage(name, "deleting collection", e))?;

        if let Err(e) = remove_tree(&doomed) {
            tracing::warn!(path = %doomed.display(), error = %e, "could not remove deleted collection files");
        }

        tracing::info!(collection = name, "collection deleted");
        Ok(())
    }

    /// Names of all collections, sorted. Creates the base directory if it
    /// does not exist.
    pub fn list(&self) -> Result<BTreeSet<String>> {
        std::fs::create_dir_all(&self.base_dir)?;
        let mut names = BTreeSet::new();
        for entry in std::fs::read_dir(&self.base_dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.starts_with('.') {
                names.insert(name);
            }
        }
        Ok(names)
    }

    pub async fn info(&self, name: &str) -> Result<CollectionInfo> {
        let handle = self.load(name).await?;
        let info = handle.info().await;
        handle.index.close().await;
        info
    }
}

async fn build_index(
    staging: &Path,
    name: &str,
    source_file: &str,
    chunks: &[Chunk],
    embedder: &dyn Embedder,
    progress: &dyn IngestProgressReporter,
) -> Result<()> {
    let pool = db::connect(&staging.join(INDEX_FILE))
        .await
        .map_err(|e| Error::storage(name, "creating index", e))?;
    migrate::create_schema(&pool)
        .await
        .map_err(|e| Error::storage(name, "creating index", e))?;
    let index = SqliteIndex::new(name, pool);

    let result = fill_index(&index, name, source_file, chunks, embedder, progress).await;
    index.close().await;
    result
}

async fn fill_index(
    index: &SqliteIndex,
    name: &str,
    source_file: &str,
    chunks: &[Chunk],
    embedder: &dyn Embedder,
    progress: &dyn IngestProgressReporter,
) -> Result<()> {
    let total = chunks.len() as u64;
    let mut dims = embedder.dims();

    for (i, chunk) in chunks.iter().enumerate() {
        let vector = embedder
            .embed_one(&chunk.text)
            .await
            .map_err(|e| match e {
                Error::Provider { message, .. } => Error::Provider {
                    operation: format!("embedding chunk {} of '{}'", i, name),
                    message,
                },
                other => other,
            })?;
        if i == 0 {
            dims = vector.len();
        }
        index.add(chunk, &vector).await?;
        progress.report(IngestProgressEvent::Embedding {
            collection: name.to_string(),
            n: i as u64 + 1,
            total,
        });
    }

    index
        .write_meta(&[
            ("collection", name.to_string()),
            ("source_file", source_file.to_string()),
            ("embedding_model", embedder.model_name().to_string()),
            ("dims", dims.to_string()),
            ("created_at", chrono::Utc::now().to_rfc3339()),
        ])
        .await
}

/// Remove files, then directories, bottom-up.
fn remove_tree(root: &Path) -> std::io::Result<()> {
    for entry in WalkDir::new(root).contents_first(true) {
        let entry = entry?;
        if entry.file_type().is_dir() {
            std::fs::remove_dir(entry.path())?;
        } else {
            std::fs::remove_file(entry.path())?;
        }
    }
    Ok(())
}

fn remove_staging(staging: &Path) {
    if let Err(e) = std::fs::remove_dir_all(staging) {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(path = %staging.display(), error = %e, "could not remove staging directory");
        }
    }
}

/// Collection name for an uploaded file: its base name without extension.
///
/// ```rust
/// use docchat::collections::collection_name_from_file;
///
/// assert_eq!(collection_name_from_file("docs/policy.pdf").unwrap(), "policy");
/// assert!(collection_name_from_file(".pdf").is_err());
/// ```
pub fn collection_name_from_file(file_name: &str) -> Result<String> {
    let stem = Path::new(file_name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    validate_name(&stem)?;
    Ok(stem)
}

/// Reject names that could escape the base directory or collide with
/// staging directories.
pub fn validate_name(name: &str) -> Result<()> {
    let reason = if name.trim().is_empty() {
        "name is empty"
    } else if name == "." || name == ".." {
        "name is a relative path component"
    } else if name.contains('/') || name.contains('\\') {
        "name contains a path separator"
    } else if name.starts_with('.') {
        "name starts with '.'"
    } else {
        return Ok(());
    };
    Err(Error::InvalidName {
        name: name.to_string(),
        reason: reason.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NoProgress;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Deterministic 3-dimensional vectors keyed on a few words.
    struct WordEmbedder {
        calls: AtomicUsize,
        fail_at: Option<usize>,
    }

    impl WordEmbedder {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail_at: None,
            }
        }
    }

    #[async_trait]
    impl Embedder for WordEmbedder {
        fn model_name(&self) -> &str {
            "word-test"
        }
        fn dims(&self) -> usize {
            3
        }
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_at == Some(call) {
                return Err(Error::provider("embedding", "HTTP 503"));
            }
            Ok(texts
                .iter()
                .map(|t| {
                    let t = t.to_lowercase();
                    vec![
                        t.matches("storm").count() as f32 + 0.01,
                        t.matches("flood").count() as f32,
                        t.matches("theft").count() as f32,
                    ]
                })
                .collect())
        }
    }

    #[derive(Default)]
    struct RecordingProgress(Mutex<Vec<IngestProgressEvent>>);

    impl IngestProgressReporter for RecordingProgress {
        fn report(&self, event: IngestProgressEvent) {
            self.0.lock().unwrap().push(event);
        }
    }

    /// Three pages of about 700 characters each, several chunks in total.
    fn sample_chunks() -> Vec<Chunk> {
        let pages: Vec<String> = [
            "Storm damage to the roof is covered up to the insured amount. ",
            "Flood damage is excluded unless the flood option was purchased. ",
            "Theft must be reported to the police within 48 hours. ",
        ]
        .iter()
        .map(|sentence| sentence.repeat(11))
        .collect();
        let chunks = chunk_pages(&pages);
        assert!(chunks.len() >= 3);
        chunks
    }

    #[test]
    fn test_collection_name_from_file() {
        assert_eq!(collection_name_from_file("policy.pdf").unwrap(), "policy");
        assert_eq!(
            collection_name_from_file("/tmp/uploads/Annual Report.v2.pdf").unwrap(),
            "Annual Report.v2"
        );
        assert!(collection_name_from_file("").is_err());
        assert!(collection_name_from_file("..").is_err());
        assert!(collection_name_from_file(".hidden.pdf").is_err());
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("policy").is_ok());
        assert!(validate_name("a/b").is_err());
        assert!(validate_name("a\\b").is_err());
        assert!(validate_name(".staging-x").is_err());
        assert!(validate_name("   ").is_err());
    }

    #[test]
    fn test_list_creates_missing_base_dir() {
        let tmp = TempDir::new().unwrap();
        let base = tmp.path().join("nested").join("store");
        let store = CollectionStore { base_dir: base.clone() };
        assert!(store.list().unwrap().is_empty());
        assert!(base.is_dir());
    }

    #[tokio::test]
    async fn test_create_then_load() {
        let tmp = TempDir::new().unwrap();
        let store = CollectionStore::open(tmp.path()).unwrap();
        let embedder = WordEmbedder::new();
        let progress = RecordingProgress::default();
        let chunks = sample_chunks();

        let ingested = store
            .create("policy", "policy.pdf", &chunks, &embedder, &progress)
            .await
            .unwrap();
        assert_eq!(ingested.status, IngestStatus::Created);
        assert_eq!(store.list().unwrap().into_iter().collect::<Vec<_>>(), vec!["policy"]);

        let info = store.info("policy").await.unwrap();
        assert_eq!(info.chunks, chunks.len());
        assert_eq!(info.embedding_model, "word-test");
        assert_eq!(info.dims, 3);
        assert_eq!(info.source_file, "policy.pdf");
        assert!(chrono::DateTime::parse_from_rfc3339(&info.created_at).is_ok());

        let events = progress.0.lock().unwrap();
        let fractions: Vec<f64> = events
            .iter()
            .filter(|e| matches!(e, IngestProgressEvent::Embedding { .. }))
            .filter_map(|e| e.fraction())
            .collect();
        assert_eq!(fractions.len(), chunks.len());
        assert_eq!(fractions.last().copied(), Some(1.0));
        assert!(matches!(events.last(), Some(IngestProgressEvent::Done { .. })));
    }

    #[tokio::test]
    async fn test_create_twice_reuses_collection() {
        let tmp = TempDir::new().unwrap();
        let store = CollectionStore::open(tmp.path()).unwrap();
        let embedder = WordEmbedder::new();
        let chunks = sample_chunks();

        store
            .create("policy", "policy.pdf", &chunks, &embedder, &NoProgress)
            .await
            .unwrap();
        let calls = embedder.calls.load(Ordering::SeqCst);
        let second = store
            .create("policy", "policy.pdf", &chunks, &embedder, &NoProgress)
            .await
            .unwrap();

        assert_eq!(second.status, IngestStatus::AlreadyExists);
        assert_eq!(embedder.calls.load(Ordering::SeqCst), calls);
        assert_eq!(store.list().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_embedding_leaves_nothing_behind() {
        let tmp = TempDir::new().unwrap();
        let store = CollectionStore::open(tmp.path()).unwrap();
        let mut embedder = WordEmbedder::new();
        embedder.fail_at = Some(1);

        let err = store
            .create("policy", "policy.pdf", &sample_chunks(), &embedder, &NoProgress)
            .await
            .err()
            .unwrap();
        assert!(
            matches!(err, Error::Provider { ref operation, .. } if operation == "embedding chunk 1 of 'policy'")
        );
        assert!(store.list().unwrap().is_empty());
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_empty_document_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let store = CollectionStore::open(tmp.path()).unwrap();
        let err = store
            .create("blank", "blank.pdf", &[], &WordEmbedder::new(), &NoProgress)
            .await
            .err()
            .unwrap();
        assert!(matches!(err, Error::EmptyDocument { .. }));
        assert!(!store.exists("blank"));
    }

    #[tokio::test]
    async fn test_open_sweeps_staging_dirs_and_list_hides_them() {
        let tmp = TempDir::new().unwrap();
        let stale = tmp.path().join(".staging-policy-1234");
        std::fs::create_dir_all(&stale).unwrap();
        std::fs::write(stale.join(INDEX_FILE), b"partial").unwrap();

        let store = CollectionStore::open(tmp.path()).unwrap();
        assert!(!stale.exists());

        std::fs::create_dir_all(tmp.path().join(".staging-other-5678")).unwrap();
        std::fs::write(tmp.path().join("stray.txt"), b"x").unwrap();
        assert!(store.list().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_then_list() {
        let tmp = TempDir::new().unwrap();
        let store = CollectionStore::open(tmp.path()).unwrap();
        let embedder = WordEmbedder::new();
        store
            .create("policy", "policy.pdf", &sample_chunks(), &embedder, &NoProgress)
            .await
            .unwrap();
        store
            .create("handbook", "handbook.pdf", &sample_chunks(), &embedder, &NoProgress)
            .await
            .unwrap();

        store.delete("policy").unwrap();
        let names = store.list().unwrap();
        assert!(!names.contains("policy"));
        assert!(names.contains("handbook"));
        assert!(!tmp.path().join("policy").exists());

        let err = store.delete("policy").unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_delete_renames_before_removing() {
        let tmp = TempDir::new().unwrap();
        let store = CollectionStore::open(tmp.path()).unwrap();
        let embedder = WordEmbedder::new();
        let created = store
            .create("policy", "policy.pdf", &sample_chunks(), &embedder, &NoProgress)
            .await
            .unwrap();

        // Leftovers of an earlier delete whose removal failed halfway.
        let leftover = tmp.path().join(".staging-policy-0000");
        std::fs::create_dir_all(leftover.join("nested")).unwrap();
        std::fs::write(leftover.join("index.sqlite-wal"), b"wal").unwrap();

        // The index is still open while its collection is deleted.
        let index = created.handle.index();
        store.delete("policy").unwrap();
        assert!(store.list().unwrap().is_empty());
        assert!(!store.exists("policy"));
        assert!(store.load("policy").await.err().unwrap().is_not_found());
        drop(index);
        drop(created);

        let residue: Vec<_> = std::fs::read_dir(tmp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .filter(|n| n.contains("policy") && n != ".staging-policy-0000")
            .collect();
        assert!(residue.is_empty(), "unexpected residue: {:?}", residue);

        CollectionStore::open(tmp.path()).unwrap();
        assert!(!leftover.exists());
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_remove_tree_bottom_up() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("tree");
        std::fs::create_dir_all(root.join("a/b")).unwrap();
        std::fs::write(root.join("a/b/file"), b"x").unwrap();
        std::fs::write(root.join("top"), b"y").unwrap();

        remove_tree(&root).unwrap();
        assert!(!root.exists());
        assert!(remove_tree(&root).is_err());
    }

    #[tokio::test]
    async fn test_load_missing_and_corrupt() {
        let tmp = TempDir::new().unwrap();
        let store = CollectionStore::open(tmp.path()).unwrap();
        assert!(store.load("ghost").await.err().unwrap().is_not_found());

        let dir = tmp.path().join("corrupt");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(INDEX_FILE), b"this is not an sqlite database, just text padding it out").unwrap();
        let err = store.load("corrupt").await.err().unwrap();
        assert!(matches!(err, Error::LoadError { ref name, .. } if name == "corrupt"));

        std::fs::create_dir_all(tmp.path().join("hollow")).unwrap();
        let err = store.load("hollow").await.err().unwrap();
        assert!(matches!(err, Error::LoadError { .. }));
    }

    #[tokio::test]
    async fn test_loaded_collection_answers_queries() {
        let tmp = TempDir::new().unwrap();
        let store = CollectionStore::open(tmp.path()).unwrap();
        let embedder = WordEmbedder::new();
        store
            .create("policy", "policy.pdf", &sample_chunks(), &embedder, &NoProgress)
            .await
            .unwrap();

        let handle = store.load("policy").await.unwrap();
        let index = handle.index();
        let hits = docchat_core::retrieve::retrieve(index.as_ref(), &embedder, "flood?")
            .await
            .unwrap();
        assert!(!hits.is_empty());
        assert!(hits.len() <= docchat_core::retrieve::RETRIEVAL_K);
        assert!(hits[0].chunk.text.contains("Flood"));
    }

    #[tokio::test]
    async fn test_ingest_pdf_rejects_non_pdf_without_creating() {
        let tmp = TempDir::new().unwrap();
        let store = CollectionStore::open(tmp.path()).unwrap();
        let err = store
            .ingest_pdf("notes.pdf", b"plain text", &WordEmbedder::new(), &NoProgress)
            .await
            .err()
            .unwrap();
        assert!(matches!(err, Error::Extraction { .. }));
        assert!(store.list().unwrap().is_empty());
    }
}
