// src/store/mod.rs
//! Append-only similarity store for the knowledge base.
//!
//! Flat (exhaustive) squared-L2 index over embeddings, persisted as a single
//! JSON file `{dir}/index.json`. Writes go through a temp file + rename.

pub mod embed;

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use metrics::counter;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{AdvisorError, Result};
use crate::monitor::anon_hash;

pub use embed::{Embedder, HashEmbedder, OpenAiEmbedder};

pub const INDEX_FILE: &str = "index.json";

pub type Metadata = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredDocument {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub metadata: Metadata,
    pub embedding: Vec<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoreHit {
    pub distance: f32,
    pub text: String,
    pub metadata: Metadata,
}

#[derive(Debug, Deserialize)]
struct IndexFile {
    dimension: usize,
    documents: Vec<StoredDocument>,
}

pub struct SimilarityStore {
    dir: PathBuf,
    dimension: usize,
    documents: Vec<StoredDocument>,
    embedder: Arc<dyn Embedder>,
}

/// Short content hash used as document id.
pub fn doc_id(text: &str) -> String {
    anon_hash(text)
}

impl SimilarityStore {
    /// Load `{dir}/index.json` or start an empty index.
    ///
    /// An unreadable file or one built with a different dimension is
    /// discarded with a warning. A `dir` that is not a directory is an error.
    pub fn open(dir: impl AsRef<Path>, embedder: Arc<dyn Embedder>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        if dir.exists() && !dir.is_dir() {
            return Err(AdvisorError::Store {
                message: format!("{} is not a directory", dir.display()),
            });
        }
        let dimension = embedder.dimensions();
        let mut store = Self {
            dir,
            dimension,
            documents: Vec::new(),
            embedder,
        };

        let path = store.index_path();
        if path.exists() {
            match fs::read_to_string(&path)
                .map_err(AdvisorError::from)
                .and_then(|s| serde_json::from_str::<IndexFile>(&s).map_err(AdvisorError::from))
            {
                Ok(idx) if idx.documents.is_empty() || idx.dimension == dimension => {
                    info!(docs = idx.documents.len(), path = %path.display(), "similarity index loaded");
                    store.documents = idx.documents;
                }
                Ok(idx) => {
                    warn!(
                        loaded = idx.dimension,
                        expected = dimension,
                        "index dimension differs from embedder; re-initializing"
                    );
                }
                Err(e) => {
                    warn!(error = %e, "failed to load similarity index; starting fresh");
                }
            }
        }
        fs::create_dir_all(&store.dir)?;
        Ok(store)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn documents(&self) -> &[StoredDocument] {
        &self.documents
    }

    fn index_path(&self) -> PathBuf {
        self.dir.join(INDEX_FILE)
    }

    /// Embed and append one document, then persist. Returns the document count.
    pub async fn add(&mut self, text: &str, metadata: Metadata) -> Result<usize> {
        let embedding = self.embedder.embed(text).await?;
        if embedding.len() != self.dimension {
            warn!(
                from = self.dimension,
                to = embedding.len(),
                "embedding dimension changed; re-initializing index"
            );
            self.dimension = embedding.len();
            self.documents.clear();
        }
        self.documents.push(StoredDocument {
            id: doc_id(text),
            text: text.to_string(),
            metadata,
            embedding,
        });
        self.save()?;
        counter!("store_documents_added_total").increment(1);
        Ok(self.documents.len())
    }

    /// The `k` nearest documents by squared L2 distance, closest first.
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<StoreHit>> {
        if self.documents.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        let q = self.embedder.embed(query).await?;
        if q.len() != self.dimension {
            warn!(
                query = q.len(),
                index = self.dimension,
                "query embedding dimension does not match index"
            );
            return Ok(Vec::new());
        }

        let mut scored: Vec<(f32, &StoredDocument)> = self
            .documents
            .iter()
            .map(|d| (squared_l2(&q, &d.embedding), d))
            .collect();
        scored.sort_by(|a, b| a.0.total_cmp(&b.0));

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(distance, d)| StoreHit {
                distance,
                text: d.text.clone(),
                metadata: d.metadata.clone(),
            })
            .collect())
    }

    fn save(&self) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.index_path();
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_string(&IndexFileRef {
            dimension: self.dimension,
            documents: &self.documents,
        })?;
        let mut f = fs::File::create(&tmp)?;
        f.write_all(json.as_bytes())?;
        fs::rename(tmp, path)?;
        Ok(())
    }
}

#[derive(Serialize)]
struct IndexFileRef<'a> {
    dimension: usize,
    documents: &'a [StoredDocument],
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}
