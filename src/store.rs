//! # Nodeset Store
//!
//! Persistence seam and batch driver. The pipeline itself never touches
//! storage; a [`NodesetStore`] loads and saves nodesets by id and
//! [`process_all`] runs one function over every stored nodeset, recording
//! per-item failures without aborting the batch.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::model::Nodeset;
use crate::{Error, Result};

/// Load / store nodesets by id.
pub trait NodesetStore: Send + Sync {
    /// All ids, sorted.
    fn list_ids(&self) -> Result<Vec<String>>;

    fn load(&self, id: &str) -> Result<Nodeset>;

    fn store(&self, id: &str, nodeset: &Nodeset) -> Result<()>;
}

// ============================================================================
// MemoryStore
// ============================================================================

/// In-memory store. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<BTreeMap<String, Nodeset>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_nodeset(self, id: impl Into<String>, nodeset: Nodeset) -> Self {
        self.inner.write().insert(id.into(), nodeset);
        self
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}

impl NodesetStore for MemoryStore {
    fn list_ids(&self) -> Result<Vec<String>> {
        Ok(self.inner.read().keys().cloned().collect())
    }

    fn load(&self, id: &str) -> Result<Nodeset> {
        self.inner
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("nodeset {id}")))
    }

    fn store(&self, id: &str, nodeset: &Nodeset) -> Result<()> {
        self.inner.write().insert(id.to_string(), nodeset.clone());
        Ok(())
    }
}

// ============================================================================
// DirectoryStore
// ============================================================================

/// One `nodeset<id>.json` file per nodeset in a directory.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
}

const FILE_PREFIX: &str = "nodeset";
const FILE_SUFFIX: &str = ".json";

impl DirectoryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_of(&self, id: &str) -> PathBuf {
        self.root.join(format!("{FILE_PREFIX}{id}{FILE_SUFFIX}"))
    }
}

impl NodesetStore for DirectoryStore {
    fn list_ids(&self) -> Result<Vec<String>> {
        let mut ids = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let name = entry?.file_name();
            let Some(name) = name.to_str() else { continue };
            if let Some(id) = name.strip_prefix(FILE_PREFIX).and_then(|rest| rest.strip_suffix(FILE_SUFFIX)) {
                ids.push(id.to_string());
            }
        }
        ids.sort();
        Ok(ids)
    }

    fn load(&self, id: &str) -> Result<Nodeset> {
        let path = self.path_of(id);
        if !path.exists() {
            return Err(Error::NotFound(format!("nodeset {id} in {}", self.root.display())));
        }
        Nodeset::from_json(&std::fs::read_to_string(path)?)
    }

    fn store(&self, id: &str, nodeset: &Nodeset) -> Result<()> {
        std::fs::create_dir_all(&self.root)?;
        std::fs::write(self.path_of(id), nodeset.to_json()?)?;
        Ok(())
    }
}

// ============================================================================
// Batch driver
// ============================================================================

/// Outcome of [`process_all`].
#[derive(Debug)]
pub struct BatchReport<T> {
    pub succeeded: Vec<(String, T)>,
    pub failed: Vec<(String, Error)>,
    pub skipped: Vec<String>,
}

impl<T> Default for BatchReport<T> {
    fn default() -> Self {
        Self { succeeded: Vec::new(), failed: Vec::new(), skipped: Vec::new() }
    }
}

impl<T> BatchReport<T> {
    pub fn processed(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    pub fn failed_ids(&self) -> Vec<&str> {
        self.failed.iter().map(|(id, _)| id.as_str()).collect()
    }
}

/// Run `f` over every nodeset in `store` except the `blacklist`ed ids.
///
/// A load failure or an `Err` from `f` is recorded for that id and the batch
/// moves on.
pub fn process_all<S, T, F>(store: &S, blacklist: &[String], mut f: F) -> Result<BatchReport<T>>
where
    S: NodesetStore + ?Sized,
    F: FnMut(&str, &Nodeset) -> Result<T>,
{
    let mut report = BatchReport::default();
    for id in store.list_ids()? {
        if blacklist.contains(&id) {
            info!(nodeset = %id, "skipping blacklisted nodeset");
            report.skipped.push(id);
            continue;
        }
        match store.load(&id).and_then(|nodeset| f(&id, &nodeset)) {
            Ok(value) => {
                debug!(nodeset = %id, "processed nodeset");
                report.succeeded.push((id, value));
            }
            Err(err) => {
                warn!(nodeset = %id, error = %err, "failed to process nodeset");
                report.failed.push((id, err));
            }
        }
    }
    info!(
        processed = report.processed(),
        failed = report.failed.len(),
        skipped = report.skipped.len(),
        "batch finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn store() -> MemoryStore {
        MemoryStore::new()
            .with_nodeset("1", Nodeset::new().with_node(1, "L", "a"))
            .with_nodeset("2", Nodeset::new())
            .with_nodeset("3", Nodeset::new().with_node(1, "L", "a").with_node(2, "L", "b"))
    }

    #[test]
    fn test_memory_store() {
        let store = store();
        assert_eq!(store.list_ids().unwrap(), vec!["1", "2", "3"]);
        assert_eq!(store.load("3").unwrap().nodes.len(), 2);
        assert!(matches!(store.load("9"), Err(Error::NotFound(_))));

        let shared = store.clone();
        shared.store("9", &Nodeset::new()).unwrap();
        assert_eq!(store.len(), 4);
    }

    #[test]
    fn test_failures_do_not_abort_batch() {
        let report = process_all(&store(), &["1".to_string()], |id, nodeset| {
            if nodeset.nodes.is_empty() {
                return Err(Error::Validation(format!("{id} is empty")));
            }
            Ok(nodeset.nodes.len())
        })
        .unwrap();
        assert_eq!(report.skipped, vec!["1"]);
        assert_eq!(report.failed_ids(), vec!["2"]);
        assert_eq!(report.succeeded, vec![("3".to_string(), 2)]);
        assert_eq!(report.processed(), 2);
    }

    #[test]
    fn test_directory_store() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("nodesets");
        let store = DirectoryStore::new(&root);
        let nodeset = Nodeset::new().with_node(7, "I", "claim").with_edge(7, 8);
        store.store("17918", &nodeset).unwrap();
        std::fs::write(root.join("notes.txt"), "ignored").unwrap();

        assert_eq!(store.list_ids().unwrap(), vec!["17918"]);
        assert_eq!(store.load("17918").unwrap(), nodeset);
        assert!(matches!(store.load("1"), Err(Error::NotFound(_))));
    }
}
