//! File-backed persistence.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::Result;
use crate::hooks::{CacheHooks, CacheSnapshot, MutationQueue, NotificationArgs};
use crate::legacy::LegacyCachePersistence;

/// Reads `path`, treating a missing file as empty.
fn read_or_empty(path: &Path) -> Result<Vec<u8>> {
    match fs::read(path) {
        Ok(bytes) => Ok(bytes),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(e.into()),
    }
}

/// Replaces `path` with `bytes` through a sibling temporary file.
fn write_replace(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Keeps the unified cache in a JSON file.
///
/// Register with [`TokenCache::with_hooks`](crate::TokenCache::with_hooks).
/// The file is merged into the store before every access and rewritten
/// after every access that changed state.
#[derive(Debug, Clone)]
pub struct FileCachePersistence {
    path: PathBuf,
}

impl FileCachePersistence {
    /// Creates a hook for the file at `path`. The file need not exist.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the cache file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CacheHooks for FileCachePersistence {
    fn before_access(
        &self,
        _args: &NotificationArgs,
        _snapshot: &CacheSnapshot,
        mutations: &mut MutationQueue,
    ) -> Result<()> {
        let bytes = read_or_empty(&self.path)?;
        if !bytes.is_empty() {
            debug!(path = %self.path.display(), bytes = bytes.len(), "Loading cache file");
            mutations.deserialize(bytes);
        }
        Ok(())
    }

    fn after_access(
        &self,
        args: &NotificationArgs,
        snapshot: &CacheSnapshot,
        _mutations: &mut MutationQueue,
    ) -> Result<()> {
        if !args.has_state_changed {
            return Ok(());
        }
        let bytes = snapshot.serialize()?;
        write_replace(&self.path, &bytes)?;
        debug!(path = %self.path.display(), bytes = bytes.len(), "Wrote cache file");
        Ok(())
    }
}

/// Keeps the legacy cache document in a file.
#[derive(Debug, Clone)]
pub struct FileLegacyPersistence {
    path: PathBuf,
}

impl FileLegacyPersistence {
    /// Creates a persistence for the file at `path`. The file need not exist.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the legacy cache file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LegacyCachePersistence for FileLegacyPersistence {
    fn load(&self) -> Result<Vec<u8>> {
        read_or_empty(&self.path)
    }

    fn write(&self, bytes: &[u8]) -> Result<()> {
        write_replace(&self.path, bytes)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::legacy::LegacyCache;
    use crate::store::CacheContents;

    fn args(has_state_changed: bool) -> NotificationArgs {
        NotificationArgs {
            client_id: "client".into(),
            account: None,
            has_state_changed,
        }
    }

    #[test]
    fn test_missing_file_queues_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let hook = FileCachePersistence::new(dir.path().join("cache.json"));
        let mut queue = MutationQueue::new();

        hook.before_access(&args(false), &CacheSnapshot::new(CacheContents::new()), &mut queue)
            .unwrap();

        assert!(queue.is_empty());
    }

    #[test]
    fn test_after_access_writes_only_on_change() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("cache.json");
        let hook = FileCachePersistence::new(&path);
        let snapshot = CacheSnapshot::new(CacheContents::new());

        hook.after_access(&args(false), &snapshot, &mut MutationQueue::new())
            .unwrap();
        assert!(!path.exists());

        hook.after_access(&args(true), &snapshot, &mut MutationQueue::new())
            .unwrap();
        assert!(path.exists());

        let mut queue = MutationQueue::new();
        hook.before_access(&args(false), &snapshot, &mut queue).unwrap();
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_legacy_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let persistence = FileLegacyPersistence::new(dir.path().join("legacy.json"));

        assert!(persistence.load_cache().unwrap().is_empty());

        persistence.write_cache(&LegacyCache::new()).unwrap();
        assert!(persistence.path().exists());
        assert!(persistence.load_cache().unwrap().is_empty());
    }
}
