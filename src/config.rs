//! Build settings.

use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use chrono::NaiveDateTime;
use serde::Deserialize;

use crate::error::ConfigError;

/// Settings for a [`Site`](crate::Site).
///
/// Deserializable from any serde format, unknown keys are kept in
/// [`extra`](Self::extra) and exposed to renderers through the site payload.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root of the source tree.
    pub source: Utf8PathBuf,
    /// Where the site is written to.
    pub destination: Utf8PathBuf,
    /// Rebuild everything, ignoring modification times and dependencies.
    pub full: bool,
    /// Publish posts dated after [`time`](Self::time).
    pub future: bool,
    /// Keep only the newest `n` posts.
    pub limit_posts: Option<usize>,
    /// Entry names skipped during discovery.
    pub exclude: Vec<String>,
    /// Fixed build time, defaults to now.
    pub time: Option<NaiveDateTime>,
    /// Log every written destination.
    pub debug: bool,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source: Utf8PathBuf::from("."),
            destination: Utf8PathBuf::from("_site"),
            full: false,
            future: true,
            limit_posts: None,
            exclude: Vec::new(),
            time: None,
            debug: false,
            extra: serde_json::Map::new(),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn source(mut self, path: impl Into<Utf8PathBuf>) -> Self {
        self.source = path.into();
        self
    }

    pub fn destination(mut self, path: impl Into<Utf8PathBuf>) -> Self {
        self.destination = path.into();
        self
    }

    pub fn full(mut self, full: bool) -> Self {
        self.full = full;
        self
    }

    pub fn future(mut self, future: bool) -> Self {
        self.future = future;
        self
    }

    pub fn limit_posts(mut self, limit: usize) -> Self {
        self.limit_posts = Some(limit);
        self
    }

    pub fn exclude(mut self, names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.exclude.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn time(mut self, time: NaiveDateTime) -> Self {
        self.time = Some(time);
        self
    }

    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(limit) = self.limit_posts
            && limit < 1
        {
            return Err(ConfigError::LimitPosts(limit));
        }

        Ok(())
    }

    /// Makes `source` and `destination` absolute and lexically clean, so
    /// paths built from either compare equal to paths listed from disk.
    pub fn normalized(mut self) -> Result<Self, ConfigError> {
        self.source = absolute(&self.source)?;
        self.destination = absolute(&self.destination)?;
        Ok(self)
    }
}

fn absolute(path: &Utf8Path) -> Result<Utf8PathBuf, ConfigError> {
    let error = |reason: String| ConfigError::Path(path.to_owned(), reason);

    let full = std::path::absolute(path).map_err(|e| error(e.to_string()))?;
    let full = Utf8PathBuf::try_from(full).map_err(|e| error(e.to_string()))?;

    let mut clean = Utf8PathBuf::new();
    for component in full.components() {
        match component {
            Utf8Component::CurDir => {}
            Utf8Component::ParentDir => {
                clean.pop();
            }
            _ => clean.push(component.as_str()),
        }
    }

    Ok(clean)
}
