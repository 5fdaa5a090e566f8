//! Evaluation memoization: none, ephemeral per-run, or persisted
//! across runs.
//!
//! The sole correctness property callers may rely on: for a fixed
//! position and task signature, the compute function is invoked at most
//! once per distinct cache instance. There is no staleness handling; a
//! non-deterministic objective silently gets its earlier value back on a
//! hit.

use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

use hs_types::{CacheError, Fingerprint, HsResult, ObjectiveError};

/// Per-worker view of the task's memoization policy.
///
/// `None` and `Ephemeral` are private to the owning worker; `Persisted`
/// shares one [`PersistedStore`] across all workers of the task.
pub enum EvaluationCache {
    None,
    Ephemeral(HashMap<Fingerprint, f64>),
    Persisted(Arc<PersistedStore>),
}

impl EvaluationCache {
    pub fn ephemeral() -> Self {
        Self::Ephemeral(HashMap::new())
    }

    /// Return the memoized score for `fingerprint`, or run `compute`,
    /// record its result, and return it. The bool is true on a hit.
    pub fn get_or_compute<F>(
        &mut self,
        fingerprint: &Fingerprint,
        compute: F,
    ) -> Result<(f64, bool), ObjectiveError>
    where
        F: FnOnce() -> Result<f64, ObjectiveError>,
    {
        match self {
            Self::None => compute().map(|score| (score, false)),
            Self::Ephemeral(store) => {
                if let Some(&score) = store.get(fingerprint) {
                    return Ok((score, true));
                }
                let score = compute()?;
                store.insert(fingerprint.clone(), score);
                Ok((score, false))
            }
            Self::Persisted(store) => store.get_or_compute(fingerprint, compute),
        }
    }
}

/// Hit/miss accounting, reported for diagnostics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub stores: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        if self.hits + self.misses == 0 {
            0.0
        } else {
            self.hits as f64 / (self.hits + self.misses) as f64
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredEntry {
    score: f64,
    hits: u64,
}

/// One entry's slot. The per-entry mutex serializes read-modify-write on
/// a single fingerprint without blocking workers on other fingerprints;
/// the map's shard lock is only held for the cheap slot insertion.
type Slot = Arc<Mutex<Option<StoredEntry>>>;

/// Cross-run evaluation store, one JSON file per task signature.
///
/// Best effort: a corrupt file is logged and treated as empty, a failed
/// flush is logged and dropped. Entries stay valid for as long as the
/// signature file exists; deleting the file is the invalidation
/// mechanism.
pub struct PersistedStore {
    path: PathBuf,
    entries: DashMap<Fingerprint, Slot>,
    stats: RwLock<CacheStats>,
}

impl PersistedStore {
    /// Open (or create) the store for `signature` under `dir`.
    pub fn open(dir: &Path, signature: &str) -> HsResult<Self> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(format!("{signature}.json"));

        let entries = DashMap::new();
        if path.exists() {
            match Self::load(&path) {
                Ok(loaded) => {
                    debug!(
                        entries = loaded.len(),
                        path = %path.display(),
                        "hydrated persisted evaluation store"
                    );
                    for (fp, entry) in loaded {
                        entries.insert(fp, Arc::new(Mutex::new(Some(entry))));
                    }
                }
                Err(e) => {
                    warn!(error = %e, "persisted store unreadable, starting empty");
                }
            }
        }

        Ok(Self {
            path,
            entries,
            stats: RwLock::new(CacheStats::default()),
        })
    }

    fn load(path: &Path) -> Result<HashMap<Fingerprint, StoredEntry>, CacheError> {
        let bytes = std::fs::read(path).map_err(|source| CacheError::Io {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_slice(&bytes).map_err(|source| CacheError::Corrupt {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn get_or_compute<F>(
        &self,
        fingerprint: &Fingerprint,
        compute: F,
    ) -> Result<(f64, bool), ObjectiveError>
    where
        F: FnOnce() -> Result<f64, ObjectiveError>,
    {
        let slot: Slot = self
            .entries
            .entry(fingerprint.clone())
            .or_default()
            .clone();

        let mut guard = slot.lock();
        if let Some(entry) = guard.as_mut() {
            entry.hits += 1;
            self.stats.write().hits += 1;
            return Ok((entry.score, true));
        }

        // Miss: compute while holding only this fingerprint's lock, so a
        // sibling worker racing on the same position waits instead of
        // recomputing, and workers on other fingerprints proceed.
        let score = compute()?;
        *guard = Some(StoredEntry { score, hits: 0 });
        let mut stats = self.stats.write();
        stats.misses += 1;
        stats.stores += 1;
        Ok((score, false))
    }

    /// Write the store back to disk. Best effort; failures are logged by
    /// the caller.
    pub fn flush(&self) -> HsResult<()> {
        let snapshot: HashMap<Fingerprint, StoredEntry> = self
            .entries
            .iter()
            .filter_map(|item| {
                item.value()
                    .lock()
                    .clone()
                    .map(|entry| (item.key().clone(), entry))
            })
            .collect();
        let json = serde_json::to_vec_pretty(&snapshot)?;
        std::fs::write(&self.path, json)?;
        debug!(
            entries = snapshot.len(),
            path = %self.path.display(),
            "flushed persisted evaluation store"
        );
        Ok(())
    }

    pub fn stats(&self) -> CacheStats {
        self.stats.read().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
