use camino::Utf8PathBuf;
use thiserror::Error;

use crate::site::Phase;

#[derive(Debug, Error)]
pub enum SiteError {
    #[error("Invalid configuration:\n{0}")]
    Config(#[from] ConfigError),

    #[error("Error while reading the source tree:\n{0}")]
    Loader(#[from] LoaderError),

    #[error("Error while building the website.\n{0}")]
    Build(#[from] BuildError),

    #[cfg(feature = "live")]
    #[error("Error while watching for file changes:\n{0}")]
    Watch(#[from] WatchError),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Limit posts must be unset or at least 1, got {0}")]
    LimitPosts(usize),

    #[error("Couldn't resolve path '{0}': {1}")]
    Path(Utf8PathBuf, String),
}

#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("Couldn't load data from file.\n{0}")]
    FileSystem(#[from] std::io::Error),

    #[error("Couldn't compile glob pattern.\n{0}")]
    GlobPattern(#[from] glob::PatternError),

    #[error("Couldn't run glob.\n{0}")]
    Glob(#[from] glob::GlobError),

    #[error("Couldn't convert path to UTF-8.\n{0}")]
    PathFormat(#[from] camino::FromPathBufError),

    #[error("Malformed front matter in '{0}':\n{1}")]
    FrontMatter(Utf8PathBuf, anyhow::Error),
}

/// Errors a [`Renderer`](crate::Renderer) may report.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The layout directory vanished while rendering. The orchestrator
    /// tolerates this and carries on with the remaining artifacts.
    #[error("Layout directory '{0}' does not exist")]
    MissingLayoutDir(Utf8PathBuf),

    #[error(transparent)]
    Userland(#[from] anyhow::Error),
}

#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Loader(#[from] LoaderError),

    #[error("Phase '{found:?}' can't be entered from '{current:?}'")]
    OutOfOrder { current: Phase, found: Phase },

    #[error("Rendering '{0}':\n{1}")]
    Render(Utf8PathBuf, RenderError),

    #[error("Generator '{0}':\n{1}")]
    Generator(String, anyhow::Error),
}

#[cfg(feature = "live")]
#[derive(Debug, Error)]
pub enum WatchError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Notify(#[from] notify::Error),

    #[error(transparent)]
    Recv(#[from] std::sync::mpsc::RecvError),
}
