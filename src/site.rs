//! The build orchestrator.
//!
//! A build walks through [`Phase`]s strictly in order:
//! reset, collect, resolve, render, clean and write. [`Site::process`] runs
//! all of them, the individual steps are public so that callers can feed
//! artifacts in by hand or inspect the graph in between.

use std::collections::BTreeMap;
use std::time::Instant;

use camino::Utf8Path;
use chrono::NaiveDateTime;
use console::style;
use indicatif::ProgressBar;
use serde_json::Value;

use crate::artifact::{Artifact, ArtifactKind, Document, cmp_posts};
use crate::config::Config;
use crate::engine::{DepGraph, MtimeCache, NodeKind, ResolveContext, Resolvers};
use crate::error::{BuildError, ConfigError, RenderError};
use crate::io::{PROGRESS_STYLE, as_overhead, list_tree, remove_all, with_ancestors};
use crate::loader::Reader;
use crate::render::{Layouts, Renderer, Verbatim, site_payload};

/// The last step a build went through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Reset,
    Collected,
    Resolved,
    Rendered,
    Cleaned,
    Written,
}

/// Runs after content discovery and may add more artifacts to the site.
pub trait Generator {
    fn name(&self) -> &str;

    fn generate(&self, site: &mut Site) -> anyhow::Result<()>;
}

pub struct Site {
    config: Config,
    time: NaiveDateTime,
    phase: Phase,

    graph: DepGraph,
    /// Survives builds, see [`Site::reset_cache`].
    mtimes: MtimeCache,
    resolvers: Resolvers,
    renderer: Box<dyn Renderer>,
    generators: Vec<Box<dyn Generator>>,

    layouts: Layouts,
    posts: Vec<Artifact>,
    pages: Vec<Artifact>,
    static_files: Vec<Artifact>,
    categories: BTreeMap<String, Vec<usize>>,
    tags: BTreeMap<String, Vec<usize>>,
}

impl Site {
    /// Fails on an invalid configuration, before any build ran.
    pub fn new(config: Config) -> Result<Self, ConfigError> {
        config.validate()?;
        let config = config.normalized()?;

        let mut site = Self {
            time: NaiveDateTime::MIN,
            config,
            phase: Phase::Reset,
            graph: DepGraph::new(),
            mtimes: MtimeCache::new(),
            resolvers: Resolvers::with_defaults(),
            renderer: Box::new(Verbatim),
            generators: Vec::new(),
            layouts: Layouts::new(),
            posts: Vec::new(),
            pages: Vec::new(),
            static_files: Vec::new(),
            categories: BTreeMap::new(),
            tags: BTreeMap::new(),
        };
        site.reset();

        Ok(site)
    }

    pub fn with_renderer(mut self, renderer: impl Renderer + 'static) -> Self {
        self.renderer = Box::new(renderer);
        self
    }

    pub fn with_generator(mut self, generator: impl Generator + 'static) -> Self {
        self.generators.push(Box::new(generator));
        self
    }

    /// The dependency handler chain, for registering custom handlers.
    pub fn resolvers_mut(&mut self) -> &mut Resolvers {
        &mut self.resolvers
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Build time of the current build.
    pub fn time(&self) -> NaiveDateTime {
        self.time
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Dependency graph of the current build.
    pub fn graph(&self) -> &DepGraph {
        &self.graph
    }

    pub fn layouts(&self) -> &Layouts {
        &self.layouts
    }

    /// Posts in chronological order once dependencies are resolved.
    pub fn posts(&self) -> &[Artifact] {
        &self.posts
    }

    pub fn pages(&self) -> &[Artifact] {
        &self.pages
    }

    pub fn static_files(&self) -> &[Artifact] {
        &self.static_files
    }

    pub fn categories(&self) -> &BTreeMap<String, Vec<usize>> {
        &self.categories
    }

    pub fn tags(&self) -> &BTreeMap<String, Vec<usize>> {
        &self.tags
    }

    /// Posts, pages, then static files.
    pub fn artifacts(&self) -> impl Iterator<Item = &Artifact> {
        self.posts
            .iter()
            .chain(self.pages.iter())
            .chain(self.static_files.iter())
    }

    /// Looks an artifact up by its source path relative to the source root.
    pub fn find(&self, path: impl AsRef<Utf8Path>) -> Option<&Artifact> {
        let path = path.as_ref();
        self.artifacts()
            .find(|artifact| artifact.relative_path() == path)
    }

    /// Forgets every observed modification time.
    pub fn reset_cache(&mut self) {
        self.mtimes.reset();
    }

    /// The object handed to the renderer.
    pub fn payload(&self) -> Value {
        site_payload(
            &self.config.extra,
            self.time,
            &self.posts,
            &self.pages,
            &self.categories,
            &self.tags,
        )
    }

    /// Runs a whole build.
    pub fn process(&mut self) -> Result<(), BuildError> {
        let s = Instant::now();

        self.reset();
        self.read()?;
        self.generate()?;
        self.resolve_dependencies()?;
        self.render()?;
        self.cleanup()?;
        let written = self.write()?;

        tracing::info!(
            "{} {} written, {} total {}",
            style("Built").green(),
            written,
            self.posts.len() + self.pages.len() + self.static_files.len(),
            as_overhead(s)
        );

        Ok(())
    }

    /// Starts a new build. Nothing of the previous build's graph survives.
    pub fn reset(&mut self) {
        self.time = self
            .config
            .time
            .unwrap_or_else(|| chrono::Local::now().naive_local());
        self.graph = DepGraph::new();
        self.layouts.clear();
        self.posts.clear();
        self.pages.clear();
        self.static_files.clear();
        self.categories.clear();
        self.tags.clear();
        self.phase = Phase::Reset;
    }

    /// Discovers layouts and content below the source directory.
    pub fn read(&mut self) -> Result<(), BuildError> {
        self.advance(Phase::Reset, Phase::Collected)?;
        let s = Instant::now();

        let reader = Reader::new(
            &self.config.source,
            &self.config.destination,
            &self.config.exclude,
            self.time,
            self.config.future,
        );
        let found = reader.read()?;

        self.layouts = found.layouts;

        let mut posts = found.posts;
        posts.sort_by(cmp_posts);
        if let Some(limit) = self.config.limit_posts {
            let excess = posts.len().saturating_sub(limit);
            posts.drain(..excess);
        }

        for doc in posts.into_iter().chain(found.pages).chain(found.static_files) {
            self.add(doc)?;
        }
        self.phase = Phase::Collected;

        tracing::info!(
            "Read {} posts, {} pages, {} static files {}",
            self.posts.len(),
            self.pages.len(),
            self.static_files.len(),
            as_overhead(s)
        );

        Ok(())
    }

    /// Starts tracking a document, giving it a node in the graph.
    pub fn add(&mut self, doc: Document) -> Result<(), BuildError> {
        self.collecting(Phase::Collected)?;
        self.phase = Phase::Collected;

        let label = doc.relative_path();
        let (kind, list) = match doc.kind {
            ArtifactKind::Post(_) => (NodeKind::Post, &mut self.posts),
            ArtifactKind::Page => (NodeKind::Page, &mut self.pages),
            ArtifactKind::StaticFile => (NodeKind::StaticFile, &mut self.static_files),
        };

        let node = self.graph.add_node(kind, label.as_str());
        list.push(Artifact::new(node, doc));

        Ok(())
    }

    /// Runs every registered [`Generator`].
    pub fn generate(&mut self) -> Result<(), BuildError> {
        self.collecting(Phase::Collected)?;

        let generators = std::mem::take(&mut self.generators);
        let result = generators.iter().try_for_each(|generator| {
            tracing::debug!("running generator {}", generator.name());
            generator
                .generate(self)
                .map_err(|e| BuildError::Generator(generator.name().to_string(), e))
        });
        self.generators = generators;

        result
    }

    /// Decides what has to be rebuilt.
    ///
    /// A full build dirties everything. Otherwise stale pages and posts are
    /// dirtied and their declared dependencies are resolved into edges, posts
    /// also depend on their chronological neighbours. Static files only look
    /// at their own staleness.
    pub fn resolve_dependencies(&mut self) -> Result<(), BuildError> {
        self.advance(Phase::Collected, Phase::Resolved)?;
        let s = Instant::now();

        self.index_posts();

        if self.config.full {
            let nodes: Vec<_> = self.artifacts().map(Artifact::node).collect();
            for node in nodes {
                self.graph.mark_dirty(node);
            }
        } else {
            let Self {
                ref config,
                ref mut graph,
                ref mut mtimes,
                ref resolvers,
                ref posts,
                ref pages,
                ref static_files,
                ref categories,
                ref tags,
                ..
            } = *self;

            let dest = &config.destination;
            let mut ctx = ResolveContext {
                graph,
                posts,
                pages,
                static_files,
                categories,
                tags,
            };

            for page in pages {
                mark_if_stale(page, dest, mtimes, ctx.graph)?;
                resolve_declared(resolvers, page, &mut ctx);
            }

            for (i, post) in posts.iter().enumerate() {
                mark_if_stale(post, dest, mtimes, ctx.graph)?;
                resolve_declared(resolvers, post, &mut ctx);

                let next = posts.get(i + 1).map(Artifact::node);
                let previous = i.checked_sub(1).map(|i| posts[i].node());
                ctx.graph.add_dependency(post.node(), next);
                ctx.graph.add_dependency(post.node(), previous);
            }

            for file in static_files {
                mark_if_stale(file, dest, mtimes, ctx.graph)?;
            }
        }

        self.phase = Phase::Resolved;
        tracing::info!(
            "Resolved dependencies, {} dirty {}",
            self.graph.count_dirty(),
            as_overhead(s)
        );

        Ok(())
    }

    /// Renders every post, then every page.
    pub fn render(&mut self) -> Result<(), BuildError> {
        self.advance(Phase::Resolved, Phase::Rendered)?;
        let s = Instant::now();

        let payload = self.payload();

        for artifact in self.posts.iter_mut().chain(self.pages.iter_mut()) {
            match self.renderer.render(artifact, &self.layouts, &payload) {
                Ok(output) => artifact.set_output(output),
                Err(RenderError::MissingLayoutDir(dir)) => {
                    tracing::debug!("no layouts at {dir}, skipping {}", artifact.relative_path());
                }
                Err(e) => return Err(BuildError::Render(artifact.path(), e)),
            }
        }

        self.phase = Phase::Rendered;
        tracing::info!("Rendered {}", as_overhead(s));

        Ok(())
    }

    /// Deletes everything in the destination that no current artifact
    /// writes to.
    pub fn cleanup(&mut self) -> Result<(), BuildError> {
        self.advance(Phase::Rendered, Phase::Cleaned)?;

        let dest = &self.config.destination;
        let expected = with_ancestors(self.artifacts().map(|artifact| artifact.destination(dest)));
        let obsolete: Vec<_> = list_tree(dest)?
            .into_iter()
            .filter(|path| !expected.contains(path))
            .collect();

        let removed = remove_all(obsolete)?;
        if removed > 0 {
            tracing::info!("Removed {removed} obsolete entries");
        }

        self.phase = Phase::Cleaned;
        Ok(())
    }

    /// Writes every dirty artifact. Returns how many were written.
    pub fn write(&mut self) -> Result<usize, BuildError> {
        self.advance(Phase::Cleaned, Phase::Written)?;
        let s = Instant::now();

        let Self {
            ref config,
            ref graph,
            ref mut mtimes,
            ref posts,
            ref pages,
            ref static_files,
            ..
        } = *self;

        let total = posts.len() + pages.len() + static_files.len();
        let bar = ProgressBar::new(total as u64).with_style(PROGRESS_STYLE.clone());
        let mut written = 0;

        for artifact in posts.iter().chain(pages).chain(static_files) {
            if artifact.write(graph, &config.destination, mtimes)? {
                let path = artifact.destination(&config.destination);
                if config.debug {
                    tracing::info!("wrote {path}");
                } else {
                    tracing::debug!("wrote {path}");
                }
                written += 1;
            }
            bar.inc(1);
        }

        bar.finish_with_message(format!("Wrote {written} files {}", as_overhead(s)));

        self.phase = Phase::Written;
        Ok(written)
    }

    /// Sorts posts and rebuilds the category and tag indices.
    fn index_posts(&mut self) {
        self.posts
            .sort_by(|a, b| cmp_posts(a.document(), b.document()));

        self.categories.clear();
        self.tags.clear();

        for (i, post) in self.posts.iter().enumerate() {
            let matter = post.front_matter();
            for category in &matter.categories {
                self.categories.entry(category.clone()).or_default().push(i);
            }
            for tag in &matter.tags {
                self.tags.entry(tag.clone()).or_default().push(i);
            }
        }
    }

    /// Content may be added right after a reset or while collecting.
    fn collecting(&self, found: Phase) -> Result<(), BuildError> {
        match self.phase {
            Phase::Reset | Phase::Collected => Ok(()),
            current => Err(BuildError::OutOfOrder { current, found }),
        }
    }

    fn advance(&self, from: Phase, found: Phase) -> Result<(), BuildError> {
        match self.phase {
            current if current == from => Ok(()),
            // nothing was collected, which is fine
            Phase::Reset if from == Phase::Collected => Ok(()),
            current => Err(BuildError::OutOfOrder { current, found }),
        }
    }
}

fn mark_if_stale(
    artifact: &Artifact,
    dest: &Utf8Path,
    mtimes: &mut MtimeCache,
    graph: &mut DepGraph,
) -> Result<(), BuildError> {
    if mtimes.is_stale(&artifact.path(), &artifact.destination(dest))? {
        tracing::debug!("{} is stale", artifact.relative_path());
        graph.mark_dirty(artifact.node());
    }

    Ok(())
}

fn resolve_declared(resolvers: &Resolvers, artifact: &Artifact, ctx: &mut ResolveContext) {
    for dependency in artifact.explicit_dependencies() {
        match resolvers.resolve(dependency, artifact.node(), ctx) {
            Some(handler) => {
                tracing::trace!("{dependency} resolved by {handler}");
            }
            None => {
                tracing::warn!(
                    source = %artifact.path(),
                    "unknown dependency '{dependency}'"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::fs::{self, File};
    use std::time::{Duration, SystemTime};

    use camino::Utf8PathBuf;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    use crate::artifact::FrontMatter;

    struct Fixture {
        _dir: TempDir,
        source: Utf8PathBuf,
        dest: Utf8PathBuf,
    }

    impl Fixture {
        fn new() -> Self {
            Self::in_dir(TempDir::new().unwrap())
        }

        fn in_dir(dir: TempDir) -> Self {
            let root = Utf8Path::from_path(dir.path()).unwrap().to_owned();
            let source = root.join("src");
            let dest = root.join("out");

            let fx = Self {
                _dir: dir,
                source,
                dest,
            };

            fx.write("index.md", "---\ndepends: ['*']\n---\nindex");
            fx.write("about.md", "---\ntitle: About\n---\nabout");
            fx.write("css/site.css", "body {}");
            fx.write("_posts/2024-01-01-a.md", "---\ncategories: [rust]\n---\na");
            fx.write("_posts/2024-01-02-b.md", "---\n---\nb");
            fx.write("_posts/2024-01-03-c.md", "---\ncategories: [rust]\n---\nc");
            fx.write("_posts/2024-01-04-d.md", "---\n---\nd");

            fx
        }

        fn write(&self, path: &str, content: &str) {
            let path = self.source.join(path);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }

        /// Moves the source's mtime into the future.
        fn touch(&self, path: &str) {
            File::options()
                .write(true)
                .open(self.source.join(path))
                .unwrap()
                .set_modified(SystemTime::now() + Duration::from_secs(3600))
                .unwrap();
        }

        fn config(&self) -> Config {
            let time = NaiveDate::from_ymd_opt(2024, 6, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap();

            Config::new()
                .source(&self.source)
                .destination(&self.dest)
                .time(time)
        }

        fn site(&self) -> Site {
            Site::new(self.config()).unwrap()
        }
    }

    fn read(path: &Utf8Path) -> String {
        fs::read_to_string(path).unwrap().trim().to_string()
    }

    fn dirty(site: &Site, path: &str) -> bool {
        site.graph().is_dirty(site.find(path).unwrap().node())
    }

    #[test]
    fn test_invalid_config() {
        let config = Config::new().limit_posts(0);

        assert!(matches!(
            Site::new(config),
            Err(ConfigError::LimitPosts(0))
        ));
    }

    #[test]
    fn test_first_build_writes_everything() {
        let fx = Fixture::new();
        let mut site = fx.site();

        site.process().unwrap();

        assert_eq!(site.phase(), Phase::Written);
        assert_eq!(site.graph().count_dirty(), 7);
        assert_eq!(read(&fx.dest.join("index.html")), "index");
        assert!(fx.dest.join("about.html").exists());
        assert!(fx.dest.join("css/site.css").exists());
        assert!(fx.dest.join("rust/2024/01/01/a.html").exists());
        assert!(fx.dest.join("2024/01/02/b.html").exists());
    }

    #[test]
    fn test_second_build_is_clean() {
        let fx = Fixture::new();
        let mut site = fx.site();

        site.process().unwrap();
        site.process().unwrap();

        assert_eq!(site.graph().count_dirty(), 0);

        // a fresh process observes the outputs on disk
        let mut site = fx.site();
        site.process().unwrap();

        assert_eq!(site.graph().count_dirty(), 0);
    }

    #[test]
    fn test_touched_post_dirties_neighbours_and_index() {
        let fx = Fixture::new();
        let mut site = fx.site();
        site.process().unwrap();

        fx.touch("_posts/2024-01-02-b.md");
        site.process().unwrap();

        assert!(dirty(&site, "_posts/2024-01-02-b.md"));
        assert!(dirty(&site, "_posts/2024-01-01-a.md"));
        assert!(dirty(&site, "_posts/2024-01-03-c.md"));
        assert!(dirty(&site, "index.md"));

        assert!(!dirty(&site, "_posts/2024-01-04-d.md"));
        assert!(!dirty(&site, "about.md"));
        assert!(!dirty(&site, "css/site.css"));
    }

    #[test]
    fn test_propagation_is_one_hop() {
        let fx = Fixture::new();
        let mut site = fx.site();
        site.process().unwrap();

        fx.touch("_posts/2024-01-01-a.md");
        site.process().unwrap();

        assert!(dirty(&site, "_posts/2024-01-01-a.md"));
        assert!(dirty(&site, "_posts/2024-01-02-b.md"));
        assert!(!dirty(&site, "_posts/2024-01-03-c.md"));
        assert!(!dirty(&site, "_posts/2024-01-04-d.md"));
        assert!(site.graph().is_used(site.find("_posts/2024-01-03-c.md").unwrap().node()));
    }

    #[test]
    fn test_category_dependency() {
        let fx = Fixture::new();
        fx.write("rust.md", "---\ndepends: ['category:rust']\n---\nrust");
        let mut site = fx.site();
        site.process().unwrap();

        fx.touch("_posts/2024-01-04-d.md");
        site.process().unwrap();
        assert!(!dirty(&site, "rust.md"));

        fx.touch("_posts/2024-01-03-c.md");
        site.process().unwrap();
        assert!(dirty(&site, "rust.md"));
    }

    #[test]
    fn test_touched_static_file() {
        let fx = Fixture::new();
        let mut site = fx.site();
        site.process().unwrap();

        fx.write("css/site.css", "body { margin: 0 }");
        fx.touch("css/site.css");
        site.process().unwrap();

        assert_eq!(site.graph().count_dirty(), 1);
        assert_eq!(
            fs::read_to_string(fx.dest.join("css/site.css")).unwrap(),
            "body { margin: 0 }"
        );
    }

    #[test]
    fn test_full_build_dirties_everything() {
        let fx = Fixture::new();
        let mut site = fx.site();
        site.process().unwrap();

        let mut site = Site::new(fx.config().full(true)).unwrap();
        site.process().unwrap();

        assert_eq!(site.graph().count_dirty(), 7);
        assert_eq!(site.graph().edge_count(), 0);
    }

    #[test]
    fn test_unknown_dependency_is_not_fatal() {
        let fx = Fixture::new();
        fx.write("lost.md", "---\ndepends: [nowhere.md, 'tag:none']\n---\nlost");
        let mut site = fx.site();

        site.process().unwrap();

        assert!(fx.dest.join("lost.html").exists());
    }

    #[test]
    fn test_cleanup_removes_orphans() {
        let fx = Fixture::new();
        fs::create_dir_all(fx.dest.join("sub")).unwrap();
        fs::create_dir_all(fx.dest.join(".hidden")).unwrap();
        fs::write(fx.dest.join("old.html"), "").unwrap();
        fs::write(fx.dest.join("sub/old2.html"), "").unwrap();
        fs::write(fx.dest.join(".hidden/x"), "").unwrap();

        let mut site = fx.site();
        site.process().unwrap();

        assert!(!fx.dest.join("old.html").exists());
        assert!(!fx.dest.join("sub").exists());
        assert!(!fx.dest.join(".hidden").exists());
        assert!(fx.dest.join("index.html").exists());
        assert!(fx.dest.join("css").is_dir());
    }

    #[test]
    fn test_relative_destination_keeps_outputs() {
        let fx = Fixture::in_dir(TempDir::new_in(".").unwrap());
        let name = fx._dir.path().file_name().unwrap().to_str().unwrap();
        let config = fx
            .config()
            .source(format!("./{name}/src"))
            .destination(format!("./{name}/out"));

        let mut site = Site::new(config).unwrap();
        site.process().unwrap();
        site.process().unwrap();

        assert!(fx.dest.join("index.html").exists());
        assert!(fx.dest.join("css/site.css").exists());
        assert_eq!(site.graph().count_dirty(), 0);
    }

    #[test]
    fn test_cleanup_after_source_removal() {
        let fx = Fixture::new();
        let mut site = fx.site();
        site.process().unwrap();
        assert!(fx.dest.join("about.html").exists());

        fs::remove_file(fx.source.join("about.md")).unwrap();
        site.process().unwrap();

        assert!(!fx.dest.join("about.html").exists());
    }

    #[test]
    fn test_limit_posts() {
        let fx = Fixture::new();
        let mut site = Site::new(fx.config().limit_posts(2)).unwrap();

        site.process().unwrap();

        let slugs: Vec<_> = site
            .posts()
            .iter()
            .map(|post| post.post_info().unwrap().slug.as_str())
            .collect();
        assert_eq!(slugs, ["c", "d"]);
        assert_eq!(site.categories()["rust"], vec![0]);
    }

    #[test]
    fn test_out_of_order() {
        let fx = Fixture::new();
        let mut site = fx.site();

        assert!(matches!(
            site.render(),
            Err(BuildError::OutOfOrder {
                current: Phase::Reset,
                found: Phase::Rendered
            })
        ));

        site.read().unwrap();
        site.resolve_dependencies().unwrap();

        assert!(matches!(
            site.read(),
            Err(BuildError::OutOfOrder {
                current: Phase::Resolved,
                ..
            })
        ));
        assert!(matches!(site.write(), Err(BuildError::OutOfOrder { .. })));
    }

    #[test]
    fn test_manual_collection() {
        let fx = Fixture::new();
        let mut site = fx.site();

        site.add(Document::page(
            &fx.source,
            "",
            "about.md",
            FrontMatter::default(),
            "hand fed",
        ))
        .unwrap();
        site.resolve_dependencies().unwrap();
        site.render().unwrap();
        site.cleanup().unwrap();

        assert_eq!(site.write().unwrap(), 1);
        assert_eq!(fs::read_to_string(fx.dest.join("about.html")).unwrap(), "hand fed");
    }

    struct NoLayouts;

    impl Renderer for NoLayouts {
        fn render(&self, artifact: &Artifact, _: &Layouts, _: &Value) -> Result<String, RenderError> {
            match artifact.front_matter().title {
                Some(_) => Err(RenderError::MissingLayoutDir("_layouts".into())),
                None => Ok(format!("<p>{}</p>", artifact.content().trim())),
            }
        }
    }

    #[test]
    fn test_missing_layout_dir_is_tolerated() {
        let fx = Fixture::new();
        let mut site = fx.site().with_renderer(NoLayouts);

        site.process().unwrap();

        assert_eq!(read(&fx.dest.join("about.html")), "about");
        assert_eq!(
            fs::read_to_string(fx.dest.join("index.html")).unwrap(),
            "<p>index</p>"
        );
    }

    struct Failing;

    impl Renderer for Failing {
        fn render(&self, _: &Artifact, _: &Layouts, _: &Value) -> Result<String, RenderError> {
            Err(anyhow::anyhow!("broken template").into())
        }
    }

    #[test]
    fn test_render_error_is_fatal() {
        let fx = Fixture::new();
        let mut site = fx.site().with_renderer(Failing);

        assert!(matches!(site.process(), Err(BuildError::Render(..))));
    }

    struct Archive;

    impl Generator for Archive {
        fn name(&self) -> &str {
            "archive"
        }

        fn generate(&self, site: &mut Site) -> anyhow::Result<()> {
            let content = format!("{} posts", site.posts().len());
            let source = site.config().source.clone();
            let matter = FrontMatter {
                depends: vec!["*".into()],
                ..Default::default()
            };

            site.add(Document::page(source, "", "archive.html", matter, content))?;
            Ok(())
        }
    }

    #[test]
    fn test_generator_adds_pages() {
        let fx = Fixture::new();
        let mut site = fx.site().with_generator(Archive);

        site.process().unwrap();
        assert_eq!(fs::read_to_string(fx.dest.join("archive.html")).unwrap(), "4 posts");

        // no file behind it, so it is rebuilt every time
        site.process().unwrap();
        assert!(dirty(&site, "archive.html"));
        assert!(fx.dest.join("archive.html").exists());
    }

    struct Broken;

    impl Generator for Broken {
        fn name(&self) -> &str {
            "broken"
        }

        fn generate(&self, _: &mut Site) -> anyhow::Result<()> {
            anyhow::bail!("nope")
        }
    }

    #[test]
    fn test_generator_error_is_fatal() {
        let fx = Fixture::new();
        let mut site = fx.site().with_generator(Broken);

        let err = site.process().unwrap_err();
        assert!(matches!(err, BuildError::Generator(name, _) if name == "broken"));
    }

    #[test]
    fn test_payload() {
        let fx = Fixture::new();
        let mut site = fx.site();
        site.process().unwrap();

        let payload = site.payload();

        assert_eq!(payload["site"]["posts"].as_array().unwrap().len(), 4);
        assert_eq!(payload["site"]["categories"]["rust"].as_array().unwrap().len(), 2);
        assert_eq!(payload["site"]["time"], "2024-06-01 00:00:00");
    }
}
