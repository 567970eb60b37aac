//! The incremental core: what is dirty, what was used, what is stale.

mod graph;
mod resolve;
mod stale;

pub use crate::engine::graph::{DepGraph, NodeId, NodeKind};
pub use crate::engine::resolve::{
    AllPosts, DependencyHandler, ResolveContext, Resolvers, SourcePath, Taxonomy,
};
pub use crate::engine::stale::MtimeCache;
