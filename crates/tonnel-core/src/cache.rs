//! per-pool leaf cache
//!
//! one json document per pool contract: the newest logical time already
//! scanned and every leaf seen so far, in chain order. documents are
//! replaced whole via a temp file in the same directory and a rename.

use crate::address::Address;
use crate::error::{Result, TonnelError};
use crate::field::FieldElement;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// scan progress of one pool
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cache {
    /// logical time of the newest scanned transaction
    pub cursor: Option<u64>,
    /// leaves in chain insertion order
    pub leaves: Vec<FieldElement>,
}

/// on-disk layout, `{"to_lt": "...", "leafs": ["...", ...]}`
#[derive(Debug, Serialize, Deserialize)]
struct CacheDocument {
    to_lt: Option<String>,
    #[serde(default)]
    leafs: Vec<FieldElement>,
}

impl CacheDocument {
    fn into_cache(self) -> Result<Cache> {
        let cursor = match self.to_lt {
            Some(lt) => Some(
                lt.parse()
                    .map_err(|_| TonnelError::InvalidData(format!("bad to_lt {:?}", lt)))?,
            ),
            None => None,
        };
        Ok(Cache {
            cursor,
            leaves: self.leafs,
        })
    }
}

pub struct LeafCache {
    dir: PathBuf,
}

impl LeafCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// document path for a pool
    pub fn path(&self, pool: &Address) -> PathBuf {
        self.dir.join(format!("{}.json", pool))
    }

    /// cached state, empty if missing or unreadable
    pub fn load(&self, pool: &Address) -> Cache {
        let path = self.path(pool);
        let contents = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Cache::default(),
            Err(e) => {
                warn!("unreadable cache {}: {}", path.display(), e);
                return Cache::default();
            }
        };

        let parsed = serde_json::from_str::<CacheDocument>(&contents)
            .map_err(TonnelError::from)
            .and_then(CacheDocument::into_cache);
        match parsed {
            Ok(cache) => {
                debug!(
                    "loaded cache for {}: {} leaves, cursor {:?}",
                    pool,
                    cache.leaves.len(),
                    cache.cursor
                );
                cache
            }
            Err(e) => {
                warn!("ignoring malformed cache {}: {}", path.display(), e);
                Cache::default()
            }
        }
    }

    /// replace the pool's document
    pub fn save(&self, pool: &Address, cursor: Option<u64>, leaves: &[FieldElement]) -> Result<()> {
        fs::create_dir_all(&self.dir)?;

        let doc = CacheDocument {
            to_lt: cursor.map(|lt| lt.to_string()),
            leafs: leaves.to_vec(),
        };
        let json = serde_json::to_vec(&doc)?;

        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(&json)?;
        tmp.as_file().sync_all()?;
        tmp.persist(self.path(pool)).map_err(|e| TonnelError::Io(e.error))?;

        debug!("saved cache for {}: {} leaves", pool, leaves.len());
        Ok(())
    }

    /// drop the pool's document; missing is fine
    pub fn remove(&self, pool: &Address) -> Result<()> {
        match fs::remove_file(self.path(pool)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
