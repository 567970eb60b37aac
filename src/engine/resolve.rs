//! Translation of declared dependency names into graph edges.
//!
//! Artifacts declare what they read by name in their front matter, e.g.
//! `depends: ["*", "category:rust", "about.md"]`. Each name is offered to the
//! registered [`DependencyHandler`]s in order, the first one that claims it
//! adds the edges. A name nobody claims is not an error, the build carries on
//! without that edge.

use std::collections::BTreeMap;

use camino::Utf8Path;

use crate::artifact::Artifact;
use crate::engine::{DepGraph, NodeId};

/// Everything a handler may look at while resolving a name.
pub struct ResolveContext<'a> {
    pub graph: &'a mut DepGraph,
    pub posts: &'a [Artifact],
    pub pages: &'a [Artifact],
    pub static_files: &'a [Artifact],
    /// Category name to indices into `posts`.
    pub categories: &'a BTreeMap<String, Vec<usize>>,
    /// Tag name to indices into `posts`.
    pub tags: &'a BTreeMap<String, Vec<usize>>,
}

impl ResolveContext<'_> {
    /// Every tracked artifact: posts, pages, then static files.
    pub fn artifacts(&self) -> impl Iterator<Item = &Artifact> {
        self.posts
            .iter()
            .chain(self.pages.iter())
            .chain(self.static_files.iter())
    }
}

/// A named-dependency handler in the [`Resolvers`] chain.
pub trait DependencyHandler {
    /// Used in logs.
    fn name(&self) -> &str;

    /// Whether this handler wants to look at `dependency` at all.
    fn matches(&self, dependency: &str) -> bool;

    /// Adds the edges for `dependency` to `node` via
    /// [`DepGraph::add_dependency`]. Returns `false` to pass the name on to
    /// the next handler.
    fn resolve(&self, dependency: &str, node: NodeId, ctx: &mut ResolveContext) -> bool;
}

/// Ordered chain of [`DependencyHandler`]s.
pub struct Resolvers {
    handlers: Vec<Box<dyn DependencyHandler>>,
}

impl Resolvers {
    /// A chain without any handler, every name stays unresolved.
    pub fn empty() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    /// The built-in chain: [`AllPosts`], categories, tags, then [`SourcePath`].
    pub fn with_defaults() -> Self {
        let mut chain = Self::empty();
        chain.push(AllPosts);
        chain.push(Taxonomy::categories());
        chain.push(Taxonomy::tags());
        chain.push(SourcePath);
        chain
    }

    /// Appends a handler, it is tried after every handler already registered.
    pub fn push(&mut self, handler: impl DependencyHandler + 'static) {
        self.handlers.push(Box::new(handler));
    }

    /// Registers a handler in front of every handler already registered.
    pub fn prepend(&mut self, handler: impl DependencyHandler + 'static) {
        self.handlers.insert(0, Box::new(handler));
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.handlers.iter().map(|handler| handler.name())
    }

    /// Walks the chain for `dependency`. Returns the name of the handler that
    /// claimed it.
    pub fn resolve(
        &self,
        dependency: &str,
        node: NodeId,
        ctx: &mut ResolveContext,
    ) -> Option<&str> {
        self.handlers
            .iter()
            .find(|handler| handler.matches(dependency) && handler.resolve(dependency, node, ctx))
            .map(|handler| handler.name())
    }
}

impl Default for Resolvers {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// `*` makes an artifact depend on every post.
pub struct AllPosts;

impl DependencyHandler for AllPosts {
    fn name(&self) -> &str {
        "all-posts"
    }

    fn matches(&self, dependency: &str) -> bool {
        dependency == "*"
    }

    fn resolve(&self, _: &str, node: NodeId, ctx: &mut ResolveContext) -> bool {
        for post in ctx.posts {
            ctx.graph.add_dependency(node, post.node());
        }

        true
    }
}

#[derive(Debug, Clone, Copy)]
enum TaxonomyKind {
    Category,
    Tag,
}

/// `category:<name>` and `tag:<name>` make an artifact depend on a bundle of
/// every post filed under that name. Unknown names are left unresolved.
pub struct Taxonomy {
    kind: TaxonomyKind,
}

impl Taxonomy {
    pub fn categories() -> Self {
        Self {
            kind: TaxonomyKind::Category,
        }
    }

    pub fn tags() -> Self {
        Self {
            kind: TaxonomyKind::Tag,
        }
    }

    fn prefix(&self) -> &'static str {
        match self.kind {
            TaxonomyKind::Category => "category:",
            TaxonomyKind::Tag => "tag:",
        }
    }
}

impl DependencyHandler for Taxonomy {
    fn name(&self) -> &str {
        match self.kind {
            TaxonomyKind::Category => "category",
            TaxonomyKind::Tag => "tag",
        }
    }

    fn matches(&self, dependency: &str) -> bool {
        dependency.starts_with(self.prefix())
    }

    fn resolve(&self, dependency: &str, node: NodeId, ctx: &mut ResolveContext) -> bool {
        let Some(key) = dependency.strip_prefix(self.prefix()) else {
            return false;
        };

        let index = match self.kind {
            TaxonomyKind::Category => ctx.categories,
            TaxonomyKind::Tag => ctx.tags,
        };

        let Some(indices) = index.get(key) else {
            return false;
        };

        let members: Vec<_> = indices.iter().map(|&i| ctx.posts[i].node()).collect();
        let bundle = ctx.graph.bundle(dependency, members);
        ctx.graph.add_dependency(node, bundle);

        true
    }
}

/// A name equal to some artifact's source path, relative to the source root,
/// makes an artifact depend on that one artifact.
pub struct SourcePath;

impl DependencyHandler for SourcePath {
    fn name(&self) -> &str {
        "source-path"
    }

    fn matches(&self, _: &str) -> bool {
        true
    }

    fn resolve(&self, dependency: &str, node: NodeId, ctx: &mut ResolveContext) -> bool {
        let wanted = dependency.trim_start_matches("./").trim_start_matches('/');
        let wanted = Utf8Path::new(wanted);

        let target = ctx
            .artifacts()
            .find(|artifact| artifact.relative_path() == wanted)
            .map(Artifact::node);

        match target {
            Some(target) => {
                ctx.graph.add_dependency(node, target);
                true
            }
            None => false,
        }
    }
}
