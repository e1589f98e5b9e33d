//! Build-dir cache: one JSON entry per analyzed file+configuration
//!
//! Layout: `{build_dir}/{name}_{hash}.json`, where `name` is the file's
//! base name and `hash` is derived from the full path and configuration.
//! Entries are written to a temp file first and renamed into place.

use crate::features::build_cache::{CacheEntry, CacheError, CacheResult};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub struct BuildDirCache {
    dir: PathBuf,
}

impl BuildDirCache {
    /// Open (and create) the build directory
    pub fn new(dir: impl AsRef<Path>) -> CacheResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Stored entry of `file` in configuration `cfg`
    ///
    /// Missing and unreadable entries are both a miss; corruption is logged.
    pub fn read_summary(&self, file: &str, cfg: &str) -> Option<CacheEntry> {
        match self.load(&self.entry_path(file, cfg)) {
            Ok(entry) => Some(entry),
            Err(CacheError::NotFound) => {
                debug!(file, cfg, "build-dir cache miss");
                None
            }
            Err(err) => {
                warn!(file, cfg, error = %err, "ignoring unreadable build-dir cache entry");
                None
            }
        }
    }

    /// Atomically store the entry of `file` in configuration `cfg`
    pub fn write_summary(&self, file: &str, cfg: &str, entry: &CacheEntry) -> CacheResult<()> {
        let bytes = serde_json::to_vec(entry).map_err(|e| CacheError::Serialization(e.to_string()))?;
        let path = self.entry_path(file, cfg);

        // Atomic write: tmp file + rename
        let tmp_path = path.with_extension("tmp");
        {
            let mut tmp = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&tmp_path)?;
            tmp.write_all(&bytes)?;
            tmp.sync_all()?;
        }
        fs::rename(&tmp_path, &path)?;
        debug!(file, cfg, bytes = bytes.len(), "build-dir cache entry written");
        Ok(())
    }

    /// Remove every entry
    pub fn clear(&self) -> CacheResult<()> {
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                fs::remove_file(&path)?;
            }
        }
        Ok(())
    }

    fn load(&self, path: &Path) -> CacheResult<CacheEntry> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(CacheError::NotFound),
            Err(e) => return Err(e.into()),
        };
        let entry: CacheEntry = serde_json::from_slice(&bytes).map_err(|e| CacheError::Corrupted(e.to_string()))?;
        if entry.version != CacheEntry::VERSION {
            return Err(CacheError::VersionMismatch {
                found: entry.version,
                expected: CacheEntry::VERSION,
            });
        }
        Ok(entry)
    }

    /// Entry file for `file` + `cfg`
    pub fn entry_path(&self, file: &str, cfg: &str) -> PathBuf {
        let mut hasher = blake3::Hasher::new();
        hasher.update(file.as_bytes());
        hasher.update(&[0]);
        hasher.update(cfg.as_bytes());
        let hex = hasher.finalize().to_hex();
        let base: String = Path::new(file)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("file")
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '.' { c } else { '_' })
            .collect();
        self.dir.join(format!("{}_{}.json", base, &hex[..16]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::build_cache::Fingerprint;
    use crate::shared::models::{Certainty, ErrorMessage, FileLocation, Severity};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn entry() -> CacheEntry {
        let mut entry = CacheEntry::new(Fingerprint::for_analysis("int x;", "", "sig"));
        entry.diagnostics.push(ErrorMessage::new(
            vec![FileLocation::new("a.c", 3, 5)],
            "a.c",
            Severity::Error,
            "$symbol:x\nUninitialized variable: $symbol",
            "uninitvar",
            Certainty::Normal,
        ));
        entry
    }

    #[test]
    fn test_write_then_read() {
        let temp = TempDir::new().unwrap();
        let cache = BuildDirCache::new(temp.path()).unwrap();
        assert!(cache.read_summary("src/a.c", "").is_none());

        cache.write_summary("src/a.c", "", &entry()).unwrap();
        let read = cache.read_summary("src/a.c", "").unwrap();
        assert_eq!(read, entry());
        // configurations are stored apart
        assert!(cache.read_summary("src/a.c", "A").is_none());
        assert!(!cache.entry_path("src/a.c", "").with_extension("tmp").exists());
    }

    #[test]
    fn test_corrupted_entry_is_a_miss() {
        let temp = TempDir::new().unwrap();
        let cache = BuildDirCache::new(temp.path()).unwrap();
        fs::write(cache.entry_path("a.c", ""), b"{ not json").unwrap();
        assert!(cache.read_summary("a.c", "").is_none());
        assert!(matches!(
            cache.load(&cache.entry_path("a.c", "")),
            Err(CacheError::Corrupted(_))
        ));
    }

    #[test]
    fn test_version_mismatch_is_a_miss() {
        let temp = TempDir::new().unwrap();
        let cache = BuildDirCache::new(temp.path()).unwrap();
        let mut old = entry();
        old.version = 0;
        cache.write_summary("a.c", "", &old).unwrap();
        assert!(cache.read_summary("a.c", "").is_none());
    }

    #[test]
    fn test_fingerprint_covers_inputs() {
        let base = Fingerprint::for_analysis("int x;", "", "sig");
        assert!(entry().is_valid_for(&base));
        assert_ne!(base, Fingerprint::for_analysis("int y;", "", "sig"));
        assert_ne!(base, Fingerprint::for_analysis("int x;", "A", "sig"));
        assert_ne!(base, Fingerprint::for_analysis("int x;", "", "other"));
    }

    #[test]
    fn test_clear() {
        let temp = TempDir::new().unwrap();
        let cache = BuildDirCache::new(temp.path()).unwrap();
        cache.write_summary("a.c", "", &entry()).unwrap();
        cache.clear().unwrap();
        assert!(cache.read_summary("a.c", "").is_none());
    }
}
