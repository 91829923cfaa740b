//! Zip packaging of downloaded files
//!
//! Every archive the process writes is registered under a random id. Only
//! registered archives can be served back, whether the client asks by id or
//! by the path returned in a download result. Registrations expire after a
//! fixed lifetime; expired archives are deleted when the next one is created.

use log::{debug, info, warn};
use std::collections::HashMap;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use uuid::Uuid;
use zip::write::SimpleFileOptions;

use crate::errors::TransferError;

/// One file to put into an archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub name: String,
    pub data: Vec<u8>,
}

impl ArchiveEntry {
    pub fn new(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }
}

/// A generated archive on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredArchive {
    pub id: String,
    pub path: PathBuf,
}

#[derive(Debug)]
struct Registration {
    path: PathBuf,
    created: Instant,
}

/// Registry of archives generated by this process
#[derive(Debug)]
pub struct ArchiveStore {
    root: PathBuf,
    ttl: Duration,
    archives: Mutex<HashMap<String, Registration>>,
}

impl ArchiveStore {
    pub fn new(root: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            root: root.into(),
            ttl,
            archives: Mutex::new(HashMap::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write `entries` into a new zip file and register it.
    ///
    /// An empty entry list still produces a valid, empty archive. A failed
    /// write leaves nothing behind on disk or in the registry.
    pub async fn create(&self, entries: Vec<ArchiveEntry>) -> Result<StoredArchive, TransferError> {
        self.evict_expired().await;
        tokio::fs::create_dir_all(&self.root).await?;

        let id = Uuid::new_v4().to_string();
        let path = self.root.join(format!("{}.zip", id));
        let count = entries.len();

        let target = path.clone();
        let written = tokio::task::spawn_blocking(move || write_zip(&target, &entries))
            .await
            .map_err(|e| TransferError::Archive(format!("archive task failed: {}", e)))
            .and_then(|result| result);
        if let Err(e) = written {
            if let Err(cleanup) = tokio::fs::remove_file(&path).await {
                debug!("No partial archive to remove at {}: {}", path.display(), cleanup);
            }
            return Err(e);
        }

        self.lock()?.insert(
            id.clone(),
            Registration {
                path: path.clone(),
                created: Instant::now(),
            },
        );
        info!("📦 Packaged {} files into {}", count, path.display());

        Ok(StoredArchive { id, path })
    }

    /// Path of a registered archive by id
    pub fn resolve_id(&self, id: &str) -> Option<PathBuf> {
        self.lock()
            .ok()?
            .get(id)
            .filter(|registration| self.is_live(registration))
            .map(|registration| registration.path.clone())
    }

    /// Accept `path` only when it names an archive this store generated
    pub fn resolve_path(&self, path: &str) -> Option<PathBuf> {
        let requested = Path::new(path);
        let archives = self.lock().ok()?;
        let found = archives
            .values()
            .filter(|registration| self.is_live(registration))
            .find(|registration| registration.path.as_path() == requested)
            .map(|registration| registration.path.clone());
        if found.is_none() {
            debug!("Refusing to serve unregistered path {}", path);
        }
        found
    }

    /// Registered archives, including expired ones not yet evicted
    pub fn len(&self) -> usize {
        self.lock().map(|archives| archives.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_live(&self, registration: &Registration) -> bool {
        registration.created.elapsed() < self.ttl
    }

    /// Drop expired registrations and delete their files
    async fn evict_expired(&self) {
        for path in self.take_expired() {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => debug!("🗑️ Removed expired archive {}", path.display()),
                Err(e) => warn!("Failed to remove expired archive {}: {}", path.display(), e),
            }
        }
    }

    fn take_expired(&self) -> Vec<PathBuf> {
        let Ok(mut archives) = self.lock() else {
            return Vec::new();
        };
        let ids: Vec<String> = archives
            .iter()
            .filter(|(_, registration)| !self.is_live(registration))
            .map(|(id, _)| id.clone())
            .collect();
        ids.iter()
            .filter_map(|id| archives.remove(id))
            .map(|registration| registration.path)
            .collect()
    }

    fn lock(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<String, Registration>>, TransferError> {
        self.archives
            .lock()
            .map_err(|_| TransferError::Archive("archive registry poisoned".to_string()))
    }
}

fn write_zip(path: &Path, entries: &[ArchiveEntry]) -> Result<(), TransferError> {
    let file = File::create(path)?;
    let mut writer = zip::ZipWriter::new(file);
    let options =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    for entry in entries {
        writer
            .start_file(entry.name.as_str(), options)
            .map_err(|e| TransferError::Archive(e.to_string()))?;
        writer.write_all(&entry.data)?;
    }

    writer
        .finish()
        .map_err(|e| TransferError::Archive(e.to_string()))?;
    Ok(())
}
