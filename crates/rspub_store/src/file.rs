//! File-based store backend.

use crate::backend::StoreBackend;
use crate::error::{StoreError, StoreResult};
use crate::lock::StoreLock;
use fs2::FileExt;
use rspub_model::ConfigId;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

const LOCK_FILE: &str = "LOCK";
const TEMP_SUFFIX: &str = ".tmp";

/// A store backend keeping one directory per configuration.
///
/// Blobs are plain files replaced with the write-then-rename pattern:
/// 1. Write to a temporary file
/// 2. Sync the temporary file to disk
/// 3. Rename it over the blob
/// 4. Fsync the directory so the rename is durable
///
/// Run locks are `fs2` advisory locks on a `LOCK` file, so they exclude
/// other processes as well as other handles in this process.
#[derive(Debug, Clone)]
pub struct FileBackend {
    root: PathBuf,
}

impl FileBackend {
    /// Opens a store rooted at `root`, creating the directory if missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or `root` is
    /// not a directory.
    pub fn open(root: impl Into<PathBuf>) -> StoreResult<Self> {
        let root = root.into();
        if !root.exists() {
            fs::create_dir_all(&root)?;
        }
        if !root.is_dir() {
            return Err(StoreError::Corrupted(format!(
                "store root is not a directory: {}",
                root.display()
            )));
        }
        Ok(Self { root })
    }

    /// Returns the store root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the directory of a configuration.
    #[must_use]
    pub fn config_dir(&self, config: &ConfigId) -> PathBuf {
        self.root.join(config.as_str())
    }

    fn blob_path(&self, config: &ConfigId, name: &str) -> PathBuf {
        self.config_dir(config).join(name)
    }

    fn ensure_config_dir(&self, config: &ConfigId) -> StoreResult<PathBuf> {
        let dir = self.config_dir(config);
        if !dir.exists() {
            fs::create_dir_all(&dir)?;
            sync_directory(&self.root)?;
        }
        Ok(dir)
    }
}

impl StoreBackend for FileBackend {
    fn read(&self, config: &ConfigId, name: &str) -> StoreResult<Option<Vec<u8>>> {
        match fs::read(self.blob_path(config, name)) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn replace(&self, config: &ConfigId, name: &str, data: &[u8]) -> StoreResult<()> {
        let dir = self.ensure_config_dir(config)?;
        let target = dir.join(name);
        let temp = dir.join(format!("{name}{TEMP_SUFFIX}"));

        let mut file = File::create(&temp)?;
        file.write_all(data)?;
        file.sync_all()?;
        drop(file);

        fs::rename(&temp, &target)?;
        sync_directory(&dir)?;
        Ok(())
    }

    fn remove(&self, config: &ConfigId, name: &str) -> StoreResult<bool> {
        let dir = self.config_dir(config);
        match fs::remove_file(dir.join(name)) {
            Ok(()) => {
                sync_directory(&dir)?;
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn configs(&self) -> StoreResult<Vec<ConfigId>> {
        let mut configs = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
                continue;
            };
            let Ok(config) = ConfigId::new(name) else {
                continue;
            };
            if has_blobs(&entry.path())? {
                configs.push(config);
            }
        }
        configs.sort();
        Ok(configs)
    }

    fn try_lock(&self, config: &ConfigId) -> StoreResult<StoreLock> {
        let dir = self.ensure_config_dir(config)?;
        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(dir.join(LOCK_FILE))?;

        if lock_file.try_lock_exclusive().is_err() {
            return Err(StoreError::Locked {
                config: config.to_string(),
            });
        }
        Ok(StoreLock::file(config.clone(), lock_file))
    }
}

fn has_blobs(dir: &Path) -> StoreResult<bool> {
    for entry in fs::read_dir(dir)? {
        let name = entry?.file_name();
        let name = name.to_string_lossy();
        if name != LOCK_FILE && !name.ends_with(TEMP_SUFFIX) {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Syncs a directory so that renames and creations in it are durable.
///
/// Windows NTFS journals metadata, so the explicit fsync is skipped there.
#[cfg(unix)]
fn sync_directory(dir: &Path) -> StoreResult<()> {
    File::open(dir)?.sync_all()?;
    Ok(())
}

#[cfg(not(unix))]
fn sync_directory(_dir: &Path) -> StoreResult<()> {
    Ok(())
}
