//! Filesystem helpers and progress output.

use std::collections::{BTreeSet, HashSet};
use std::fmt::Display;
use std::fs;
use std::io;
use std::sync::LazyLock;
use std::time::Instant;

use camino::{Utf8Path, Utf8PathBuf};
use console::Style;
use glob::{MatchOptions, Pattern, glob_with};
use indicatif::ProgressStyle;

use crate::error::LoaderError;

const ANSI_BLUE: Style = Style::new().blue();

pub(crate) static PROGRESS_STYLE: LazyLock<ProgressStyle> = LazyLock::new(|| {
    ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        .expect("Error setting progress bar template")
        .progress_chars("#>-")
});

pub fn as_overhead(s: Instant) -> impl Display {
    let e = Instant::now();
    let f = format!("(+{}ms)", e.duration_since(s).as_millis());
    ANSI_BLUE.apply_to(f)
}

/// Every file and directory below `root`, hidden entries included.
pub(crate) fn list_tree(root: &Utf8Path) -> Result<HashSet<Utf8PathBuf>, LoaderError> {
    let options = MatchOptions {
        require_literal_leading_dot: false,
        ..MatchOptions::new()
    };

    let pattern = format!("{}/**/*", Pattern::escape(root.as_str()));

    let mut entries = HashSet::new();
    for entry in glob_with(&pattern, options)? {
        entries.insert(Utf8PathBuf::try_from(entry?)?);
    }

    Ok(entries)
}

/// `paths` together with all of their ancestors.
pub(crate) fn with_ancestors(paths: impl IntoIterator<Item = Utf8PathBuf>) -> HashSet<Utf8PathBuf> {
    let mut acc = HashSet::new();

    for path in paths {
        for ancestor in path.ancestors() {
            if ancestor.as_str().is_empty() || !acc.insert(ancestor.to_path_buf()) {
                break;
            }
        }
    }

    acc
}

/// Deletes every path in `obsolete`, directories recursively. Paths already
/// gone together with a deleted parent are skipped.
pub(crate) fn remove_all(obsolete: impl IntoIterator<Item = Utf8PathBuf>) -> io::Result<usize> {
    // parents sort before their children
    let obsolete: BTreeSet<_> = obsolete.into_iter().collect();
    let mut removed = 0;

    for path in obsolete {
        let meta = match fs::symlink_metadata(&path) {
            Ok(meta) => meta,
            Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
            Err(e) => return Err(e),
        };

        if meta.is_dir() {
            fs::remove_dir_all(&path)?;
        } else {
            fs::remove_file(&path)?;
        }

        tracing::debug!("removed {}", path);
        removed += 1;
    }

    Ok(removed)
}
