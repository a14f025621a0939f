use std::{
    fs::File,
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use fs4::fs_std::FileExt;
use tracing::{debug, trace};

use super::kv::KeyValueStore;

const LOCK_FILE: &str = ".lock";

/// The main realization of [KeyValueStore]. Every key is a file inside `store_dir`.
///
/// Writes are done into a temporary sibling that is renamed over the target, so a reader either
/// sees the previous value or the new one. An advisory lock on `store_dir/.lock` keeps two
/// processes from interleaving writes.
pub struct FileStore {
    store_dir: PathBuf,
}

impl FileStore {
    pub fn new(store_dir: PathBuf) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(&store_dir)?;

        Ok(Self { store_dir })
    }

    pub fn dir(&self) -> &Path {
        &self.store_dir
    }

    fn key_path(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        Ok(self.store_dir.join(key))
    }

    fn lock_file(&self) -> Result<File> {
        let path = self.store_dir.join(LOCK_FILE);
        File::options()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .with_context(|| format!("Failed to open lock file {path:?}"))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.key_path(key)?;
        let lock = self.lock_file()?;
        FileExt::lock_shared(&lock)?;
        let result = std::fs::read(&path);
        FileExt::unlock(&lock)?;

        match result {
            Ok(v) => {
                trace!("Read {} bytes from {path:?}", v.len());
                Ok(Some(v))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to read {path:?}")),
        }
    }

    fn set(&mut self, key: &str, value: &[u8]) -> Result<()> {
        let path = self.key_path(key)?;
        let temp_path = self.store_dir.join(format!("{key}.tmp"));

        // Semi-safe acquire-release for the directory
        let lock = self.lock_file()?;
        FileExt::lock_exclusive(&lock)?;
        let result = write_replace(&temp_path, &path, value);
        FileExt::unlock(&lock)?;

        result.inspect(|_| debug!("Wrote {} bytes into {path:?}", value.len()))
    }
}

fn write_replace(temp_path: &Path, path: &Path, value: &[u8]) -> Result<()> {
    let mut file = File::create(temp_path)
        .with_context(|| format!("Failed to create {temp_path:?}"))?;
    file.write_all(value)?;
    file.sync_all()?;
    drop(file);
    std::fs::rename(temp_path, path)
        .with_context(|| format!("Failed to move {temp_path:?} into {path:?}"))?;
    Ok(())
}

/// Keys become file names, so only a conservative character set is accepted.
fn validate_key(key: &str) -> Result<()> {
    let valid = !key.is_empty()
        && !key.starts_with('.')
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if !valid {
        bail!("Illegal store key {key:?}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use tempfile::tempdir;

    use crate::storage::{kv::KeyValueStore, stopped_key, HABITS_KEY};

    use super::{validate_key, FileStore};

    #[test]
    fn test_file_store_basic() -> Result<()> {
        let dir = tempdir()?;
        let mut store = FileStore::new(dir.path().join("store"))?;

        assert_eq!(store.get(HABITS_KEY)?, None);

        store.set(HABITS_KEY, b"[]")?;
        assert_eq!(store.get(HABITS_KEY)?, Some(b"[]".to_vec()));

        store.set(HABITS_KEY, br#"[{"id":1}]"#)?;
        assert_eq!(store.get(HABITS_KEY)?, Some(br#"[{"id":1}]"#.to_vec()));

        Ok(())
    }

    #[test]
    fn test_file_store_persists_between_instances() -> Result<()> {
        let dir = tempdir()?;
        {
            let mut store = FileStore::new(dir.path().to_owned())?;
            store.set(&stopped_key(1745150400000), b"2025-04-23")?;
        }
        let store = FileStore::new(dir.path().to_owned())?;
        assert_eq!(
            store.get("habit-1745150400000-stopped")?,
            Some(b"2025-04-23".to_vec())
        );

        let leftovers = std::fs::read_dir(dir.path())?
            .filter_map(|v| v.ok())
            .filter(|v| v.file_name().to_string_lossy().ends_with(".tmp"))
            .count();
        assert_eq!(leftovers, 0);
        Ok(())
    }

    #[test]
    fn test_file_store_rejects_paths() -> Result<()> {
        let dir = tempdir()?;
        let mut store = FileStore::new(dir.path().to_owned())?;
        assert!(store.set("../escape", b"x").is_err());
        assert!(store.get(".lock").is_err());
        assert!(validate_key("").is_err());
        assert!(validate_key("habit-12-stopped").is_ok());
        Ok(())
    }
}
