#![forbid(unsafe_code)]
#![doc = include_str!("../README.md")]

mod artifact;
mod config;
mod engine;
mod error;
mod io;
pub mod loader;
mod render;
mod site;
#[cfg(feature = "live")]
mod watch;

pub use crate::artifact::{Artifact, ArtifactKind, Document, FrontMatter, PostInfo};
pub use crate::config::Config;
pub use crate::engine::{
    AllPosts, DepGraph, DependencyHandler, MtimeCache, NodeId, NodeKind, ResolveContext,
    Resolvers, SourcePath, Taxonomy,
};
pub use crate::error::*;
pub use crate::io::as_overhead;
#[cfg(feature = "minijinja")]
pub use crate::render::JinjaRenderer;
pub use crate::render::{Layout, Layouts, Renderer, Summary, Verbatim, site_payload};
pub use crate::site::{Generator, Phase, Site};
#[cfg(feature = "live")]
pub use crate::watch::watch;

/// Installs a `tracing` subscriber printing to stderr.
///
/// The filter is read from `KASANE_LOG`, e.g. `KASANE_LOG=kasane=debug`, and
/// defaults to `info`. Does nothing if a global subscriber is already set.
#[cfg(feature = "logging")]
pub fn init_logging() {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_env("KASANE_LOG").unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_writer(std::io::stderr))
        .try_init();
}
