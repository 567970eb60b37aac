//! Modification-time staleness.
//!
//! A source is stale when its output is missing or older than the source.
//! Stale sources seed the dirty set before dependencies are propagated. Output
//! mtimes are cached per build in an [`MtimeCache`] owned by the site, which
//! is cleared on reset and updated after each write.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::time::SystemTime;

use camino::{Utf8Path, Utf8PathBuf};

/// Remembers, per source path, the modification time the output was last
/// known to have.
///
/// The first check for a source reads the destination's mtime from disk, later
/// checks are answered from memory. Writing an artifact [records](Self::record)
/// the source mtime it was produced from, so a long-lived cache keeps giving
/// correct answers across consecutive builds of the same process.
#[derive(Debug, Default, Clone)]
pub struct MtimeCache {
    mtimes: HashMap<Utf8PathBuf, SystemTime>,
}

impl MtimeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Is `source` newer than the output written to `dest`?
    ///
    /// An output which doesn't exist yet is always stale, and so is one without
    /// a source file behind it.
    pub fn is_stale(&mut self, source: &Utf8Path, dest: &Utf8Path) -> io::Result<bool> {
        let modified = match fs::metadata(source) {
            Ok(meta) => meta.modified()?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(true),
            Err(e) => return Err(e),
        };

        let cached = match self.mtimes.get(source) {
            Some(mtime) => *mtime,
            None => {
                if !dest.exists() {
                    return Ok(true);
                }
                let mtime = fs::metadata(dest)?.modified()?;
                self.mtimes.insert(source.to_owned(), mtime);
                mtime
            }
        };

        Ok(modified > cached)
    }

    /// Records that the output for `source` is now up to date with `mtime`.
    pub fn record(&mut self, source: &Utf8Path, mtime: SystemTime) {
        self.mtimes.insert(source.to_owned(), mtime);
    }

    pub fn get(&self, source: &Utf8Path) -> Option<SystemTime> {
        self.mtimes.get(source).copied()
    }

    /// Forgets everything, the next checks go back to the filesystem.
    pub fn reset(&mut self) {
        self.mtimes.clear();
    }

    pub fn len(&self) -> usize {
        self.mtimes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mtimes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::fs::File;
    use std::time::Duration;

    use tempfile::TempDir;

    fn touch(path: &Utf8Path, mtime: SystemTime) {
        fs::write(path, "x").unwrap();
        File::options()
            .write(true)
            .open(path)
            .unwrap()
            .set_modified(mtime)
            .unwrap();
    }

    fn setup() -> (TempDir, Utf8PathBuf, Utf8PathBuf) {
        let dir = TempDir::new().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap().to_owned();
        let source = root.join("source.txt");
        let dest = root.join("dest.txt");
        (dir, source, dest)
    }

    #[test]
    fn test_missing_destination_is_stale() {
        let (_dir, source, dest) = setup();
        touch(&source, SystemTime::now());

        let mut cache = MtimeCache::new();

        assert!(cache.is_stale(&source, &dest).unwrap());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_missing_source_is_stale() {
        let (_dir, source, dest) = setup();
        touch(&dest, SystemTime::now());

        let mut cache = MtimeCache::new();

        assert!(cache.is_stale(&source, &dest).unwrap());
        assert!(cache.is_stale(&source, &dest).unwrap());
    }

    #[test]
    fn test_newer_source_is_stale() {
        let (_dir, source, dest) = setup();
        let now = SystemTime::now();
        touch(&dest, now - Duration::from_secs(60));
        touch(&source, now);

        let mut cache = MtimeCache::new();

        assert!(cache.is_stale(&source, &dest).unwrap());
    }

    #[test]
    fn test_older_source_is_fresh() {
        let (_dir, source, dest) = setup();
        let now = SystemTime::now();
        touch(&source, now - Duration::from_secs(60));
        touch(&dest, now);

        let mut cache = MtimeCache::new();

        assert!(!cache.is_stale(&source, &dest).unwrap());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_cached_mtime_wins_over_disk() {
        let (_dir, source, dest) = setup();
        let now = SystemTime::now();
        touch(&source, now - Duration::from_secs(60));
        touch(&dest, now);

        let mut cache = MtimeCache::new();
        assert!(!cache.is_stale(&source, &dest).unwrap());

        // the destination is gone, but the cache still answers
        fs::remove_file(&dest).unwrap();
        assert!(!cache.is_stale(&source, &dest).unwrap());

        cache.reset();
        assert!(cache.is_stale(&source, &dest).unwrap());
    }

    #[test]
    fn test_record_marks_fresh() {
        let (_dir, source, dest) = setup();
        let now = SystemTime::now();
        touch(&dest, now - Duration::from_secs(60));
        touch(&source, now);

        let mut cache = MtimeCache::new();
        assert!(cache.is_stale(&source, &dest).unwrap());

        cache.record(&source, now);
        assert!(!cache.is_stale(&source, &dest).unwrap());
        assert_eq!(cache.get(&source), Some(now));
    }
}
