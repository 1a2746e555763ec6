//! File-backed recommend history.

use std::collections::{HashSet, VecDeque};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, BufWriter};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};

use super::codec::{decode_line, encode_entry, DecodedLine, HistoryEntry};
use super::lock::FileLock;
use super::normalize::normalize_url;
use super::RecommendCache;
use crate::config::CacheConfig;
use crate::error::{Error, Result};

/// Lifecycle of a [`FileRecommendCache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    Uninitialized,
    Open,
    Closed,
}

/// History of posted URLs persisted as JSON Lines.
///
/// Owns the lock file for as long as it is open. The in-memory entry list is
/// the authoritative view and is rewritten in full on every successful
/// [`add_entry`](RecommendCache::add_entry).
pub struct FileRecommendCache {
    config: CacheConfig,
    state: CacheState,
    /// Insertion order; front is oldest
    entries: VecDeque<HistoryEntry>,
    urls: HashSet<String>,
    lock: Option<FileLock>,
    clock: fn() -> DateTime<Utc>,
}

impl FileRecommendCache {
    pub fn new(config: CacheConfig) -> Self {
        Self::with_clock(config, Utc::now)
    }

    /// Create a cache with a custom time source (for testing).
    pub fn with_clock(config: CacheConfig, clock: fn() -> DateTime<Utc>) -> Self {
        Self {
            config,
            state: CacheState::Uninitialized,
            entries: VecDeque::new(),
            urls: HashSet::new(),
            lock: None,
            clock,
        }
    }

    pub fn state(&self) -> CacheState {
        self.state
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Entries in posting order, oldest first.
    pub fn entries(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Open the cache: create the directory, take the lock, load the file
    /// and drop expired entries.
    ///
    /// A disabled cache opens without touching the filesystem.
    pub fn initialize(&mut self) -> Result<()> {
        if self.state != CacheState::Uninitialized {
            return Err(Error::Config(
                "recommend history cache was already initialized".to_string(),
            ));
        }

        if !self.config.enabled {
            self.state = CacheState::Open;
            return Ok(());
        }

        let path = self.config.file_path.clone();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            create_cache_dir(parent)?;
        }

        // Dropping `lock` on any error below releases it.
        let lock = FileLock::acquire(&path)?;
        let loaded = load_entries(&path)?;

        self.entries.clear();
        self.urls.clear();
        for mut entry in loaded {
            entry.url = normalize_url(&entry.url).to_string();
            if self.urls.insert(entry.url.clone()) {
                self.entries.push_back(entry);
            } else {
                tracing::debug!(url = %entry.url, "Dropping duplicate history entry");
            }
        }

        let expired = self.sweep_expired();
        tracing::info!(
            path = %path.display(),
            entries = self.entries.len(),
            expired,
            "Opened recommend history"
        );

        self.lock = Some(lock);
        self.state = CacheState::Open;
        Ok(())
    }

    /// Remove entries posted at or before `now - retention_days`.
    ///
    /// A retention window reaching past the earliest representable time
    /// expires nothing.
    fn sweep_expired(&mut self) -> usize {
        let now = (self.clock)();
        let Some(cutoff) = Duration::try_days(i64::from(self.config.retention_days))
            .and_then(|window| now.checked_sub_signed(window))
        else {
            tracing::debug!(
                retention_days = self.config.retention_days,
                "Retention window exceeds calendar range; keeping every entry"
            );
            return 0;
        };
        let before = self.entries.len();
        let urls = &mut self.urls;
        self.entries.retain(|entry| {
            let keep = entry.posted_at > cutoff;
            if !keep {
                urls.remove(&entry.url);
            }
            keep
        });
        before - self.entries.len()
    }

    /// Drop oldest entries until within `max_entries`.
    fn evict_overflow(&mut self) {
        while self.entries.len() > self.config.max_entries {
            if let Some(oldest) = self.entries.pop_front() {
                tracing::debug!(url = %oldest.url, "Evicting oldest history entry");
                self.urls.remove(&oldest.url);
            }
        }
    }

    /// Rewrite the whole file through a sibling temp file and rename.
    fn save(&self) -> Result<()> {
        let path = &self.config.file_path;
        let tmp_path = tmp_path_for(path);

        let result = write_entries(&tmp_path, &self.entries).and_then(|()| {
            fs::rename(&tmp_path, path).map_err(|e| io_error(path, e))
        });

        if result.is_err() {
            if let Err(e) = fs::remove_file(&tmp_path) {
                if e.kind() != io::ErrorKind::NotFound {
                    tracing::warn!(
                        path = %tmp_path.display(),
                        error = %e,
                        "Failed to remove temporary history file"
                    );
                }
            }
        }
        result
    }
}

impl RecommendCache for FileRecommendCache {
    fn is_cached(&self, url: &str) -> bool {
        if !self.config.enabled || self.state != CacheState::Open {
            return false;
        }
        self.urls.contains(normalize_url(url))
    }

    fn add_entry(&mut self, url: &str, title: &str) -> Result<()> {
        if !self.config.enabled {
            return Ok(());
        }
        if self.state != CacheState::Open {
            return Err(Error::CacheNotOpen);
        }

        let url = normalize_url(url);
        if self.urls.contains(url) {
            tracing::debug!(url = %url, "URL already in recommend history");
            return Ok(());
        }

        self.entries.push_back(HistoryEntry {
            url: url.to_string(),
            title: title.to_string(),
            posted_at: (self.clock)(),
        });
        self.urls.insert(url.to_string());
        self.evict_overflow();

        // In-memory state stays updated even if the save fails.
        self.save()
    }

    fn close(&mut self) -> Result<()> {
        if let Some(mut lock) = self.lock.take() {
            lock.release();
        }
        self.state = CacheState::Closed;
        Ok(())
    }
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut raw = path.as_os_str().to_os_string();
    raw.push(".tmp");
    PathBuf::from(raw)
}

fn io_error(path: &Path, e: io::Error) -> Error {
    if e.kind() == io::ErrorKind::PermissionDenied {
        Error::Permission {
            path: path.to_path_buf(),
            source: e,
        }
    } else {
        Error::Io(e)
    }
}

#[cfg(unix)]
fn create_cache_dir(dir: &Path) -> Result<()> {
    use std::os::unix::fs::DirBuilderExt;

    fs::DirBuilder::new()
        .recursive(true)
        .mode(0o755)
        .create(dir)
        .map_err(|source| Error::DirectoryCreate {
            path: dir.to_path_buf(),
            source,
        })
}

#[cfg(not(unix))]
fn create_cache_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).map_err(|source| Error::DirectoryCreate {
        path: dir.to_path_buf(),
        source,
    })
}

/// Read every decodable entry. A missing file is an empty history.
fn load_entries(path: &Path) -> Result<Vec<HistoryEntry>> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(io_error(path, e)),
    };

    let mut entries = Vec::new();
    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|source| Error::Corrupted {
            path: path.to_path_buf(),
            source,
        })?;

        match decode_line(&line) {
            DecodedLine::Entry(entry) => entries.push(entry),
            DecodedLine::Blank => {}
            DecodedLine::Malformed(reason) => tracing::warn!(
                path = %path.display(),
                line = index + 1,
                error = %reason,
                "Skipping malformed recommend history line"
            ),
        }
    }
    Ok(entries)
}

fn write_entries<'a, I>(tmp_path: &Path, entries: I) -> Result<()>
where
    I: IntoIterator<Item = &'a HistoryEntry>,
{
    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(tmp_path)
        .map_err(|e| io_error(tmp_path, e))?;

    let mut writer = BufWriter::new(file);
    for entry in entries {
        encode_entry(&mut writer, entry)?;
    }

    let file = writer.into_inner().map_err(|e| Error::Io(e.into_error()))?;
    file.sync_all()?;
    drop(file);
    Ok(())
}
