//! Posts, pages and static files: the things a build writes out.
//!
//! A [`Document`] is what content discovery produces. Once handed to a
//! [`Site`](crate::Site) it gets a node in the dependency graph and becomes an
//! [`Artifact`].

use std::cmp::Ordering;
use std::fs;
use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::Deserialize;

use crate::engine::{DepGraph, MtimeCache, NodeId};

/// Source extensions which are converted to HTML on output.
const CONVERTED: &[&str] = &["md", "markdown", "mkd", "textile", "html"];

/// The front matter keys the build core cares about. Anything else in the
/// header is ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FrontMatter {
    pub title: Option<String>,
    pub layout: Option<String>,
    /// Explicitly declared dependency names, resolved by the
    /// [`Resolvers`](crate::Resolvers) chain.
    #[serde(alias = "dependencies")]
    pub depends: Vec<String>,
    pub categories: Vec<String>,
    pub tags: Vec<String>,
    pub published: Option<bool>,
    pub date: Option<String>,
}

/// Post specific data derived from the `YYYY-MM-DD-slug.ext` file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostInfo {
    pub date: NaiveDateTime,
    pub slug: String,
}

impl PostInfo {
    /// Parses a post file name like `2024-03-01-hello-world.md`. Returns `None`
    /// for anything that doesn't look like a post.
    pub fn from_file_name(name: &str) -> Option<Self> {
        let (stem, _) = name.rsplit_once('.')?;
        let mut parts = stem.splitn(4, '-');

        let year = parts.next()?.parse().ok()?;
        let month = parts.next()?.parse().ok()?;
        let day = parts.next()?.parse().ok()?;
        let slug = parts.next().filter(|slug| !slug.is_empty())?;

        let date = NaiveDate::from_ymd_opt(year, month, day)?;

        Some(Self {
            date: date.and_time(NaiveTime::MIN),
            slug: slug.to_string(),
        })
    }

    /// Front matter may pin the exact publication time.
    fn with_override(mut self, date: Option<&str>) -> Self {
        let parsed = date.and_then(|date| {
            NaiveDateTime::parse_from_str(date, "%Y-%m-%d %H:%M:%S")
                .or_else(|_| NaiveDateTime::parse_from_str(date, "%Y-%m-%d %H:%M"))
                .ok()
                .or_else(|| {
                    NaiveDate::parse_from_str(date, "%Y-%m-%d")
                        .ok()
                        .map(|date| date.and_time(NaiveTime::MIN))
                })
        });

        if let Some(date) = parsed {
            self.date = date;
        }

        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactKind {
    Post(PostInfo),
    Page,
    StaticFile,
}

/// A discovered source file, not yet tracked by any site.
#[derive(Debug, Clone)]
pub struct Document {
    pub kind: ArtifactKind,
    /// The source root.
    pub base: Utf8PathBuf,
    /// Directory between the source root and the file.
    pub dir: Utf8PathBuf,
    /// File name, for posts the path below `_posts`.
    pub name: String,
    pub matter: FrontMatter,
    pub content: String,
}

impl Document {
    pub fn page(
        base: impl Into<Utf8PathBuf>,
        dir: impl Into<Utf8PathBuf>,
        name: impl Into<String>,
        matter: FrontMatter,
        content: impl Into<String>,
    ) -> Self {
        Self {
            kind: ArtifactKind::Page,
            base: base.into(),
            dir: dir.into(),
            name: name.into(),
            matter,
            content: content.into(),
        }
    }

    pub fn static_file(
        base: impl Into<Utf8PathBuf>,
        dir: impl Into<Utf8PathBuf>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            kind: ArtifactKind::StaticFile,
            base: base.into(),
            dir: dir.into(),
            name: name.into(),
            matter: FrontMatter::default(),
            content: String::new(),
        }
    }

    /// Creates a post from a file below `<base>/<dir>/_posts`. Returns `None`
    /// if `name` doesn't follow the `YYYY-MM-DD-slug.ext` convention.
    pub fn post(
        base: impl Into<Utf8PathBuf>,
        dir: impl Into<Utf8PathBuf>,
        name: impl Into<String>,
        matter: FrontMatter,
        content: impl Into<String>,
    ) -> Option<Self> {
        let name = name.into();
        let file_name = Utf8Path::new(&name).file_name()?;
        let info = PostInfo::from_file_name(file_name)?.with_override(matter.date.as_deref());

        Some(Self {
            kind: ArtifactKind::Post(info),
            base: base.into(),
            dir: dir.into(),
            name,
            matter,
            content: content.into(),
        })
    }

    /// Path of the source file relative to the source root.
    pub fn relative_path(&self) -> Utf8PathBuf {
        match self.kind {
            ArtifactKind::Post(_) => self.dir.join("_posts").join(&self.name),
            _ => self.dir.join(&self.name),
        }
    }

    /// Absolute path of the source file.
    pub fn path(&self) -> Utf8PathBuf {
        self.base.join(self.relative_path())
    }

    /// Path of the output relative to the destination root.
    pub fn relative_destination(&self) -> Utf8PathBuf {
        match &self.kind {
            ArtifactKind::StaticFile => self.dir.join(&self.name),
            ArtifactKind::Page => {
                let mut path = self.dir.join(&self.name);
                if path.extension().is_some_and(|ext| CONVERTED.contains(&ext)) {
                    path.set_extension("html");
                }
                path
            }
            ArtifactKind::Post(info) => {
                let mut path = self.dir.clone();
                for category in &self.matter.categories {
                    path.push(category);
                }
                path.push(info.date.format("%Y/%m/%d").to_string());
                path.push(format!("{}.html", info.slug));
                path
            }
        }
    }
}

/// A document tracked by a site for the duration of one build.
#[derive(Debug, Clone)]
pub struct Artifact {
    node: NodeId,
    doc: Document,
    output: Option<String>,
}

impl Artifact {
    pub(crate) fn new(node: NodeId, doc: Document) -> Self {
        Self {
            node,
            doc,
            output: None,
        }
    }

    /// This artifact's node in the site's [`DepGraph`].
    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn kind(&self) -> &ArtifactKind {
        &self.doc.kind
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn front_matter(&self) -> &FrontMatter {
        &self.doc.matter
    }

    pub fn content(&self) -> &str {
        &self.doc.content
    }

    pub fn post_info(&self) -> Option<&PostInfo> {
        match &self.doc.kind {
            ArtifactKind::Post(info) => Some(info),
            _ => None,
        }
    }

    pub fn explicit_dependencies(&self) -> &[String] {
        &self.doc.matter.depends
    }

    pub fn path(&self) -> Utf8PathBuf {
        self.doc.path()
    }

    pub fn relative_path(&self) -> Utf8PathBuf {
        self.doc.relative_path()
    }

    /// Where this artifact is written below `dest`.
    pub fn destination(&self, dest: &Utf8Path) -> Utf8PathBuf {
        dest.join(self.doc.relative_destination())
    }

    /// Site-absolute URL of the output.
    pub fn url(&self) -> String {
        format!("/{}", self.doc.relative_destination())
    }

    pub fn is_html(&self) -> bool {
        self.doc.relative_destination().extension() == Some("html")
    }

    /// Rendered output, if rendering already ran.
    pub fn output(&self) -> Option<&str> {
        self.output.as_deref()
    }

    pub(crate) fn set_output(&mut self, output: String) {
        self.output = Some(output);
    }

    /// Writes the artifact below `dest` if its node is dirty. Returns whether
    /// anything was written.
    ///
    /// Static files are copied, everything else is written from its rendered
    /// output, or its raw content when it was never rendered.
    pub fn write(
        &self,
        graph: &DepGraph,
        dest: &Utf8Path,
        mtimes: &mut MtimeCache,
    ) -> io::Result<bool> {
        if !graph.is_dirty(self.node) {
            return Ok(false);
        }

        let source = self.path();
        let dest_path = self.destination(dest);

        if let Some(parent) = dest_path.parent() {
            fs::create_dir_all(parent)?;
        }

        match self.doc.kind {
            ArtifactKind::StaticFile => {
                fs::copy(&source, &dest_path)?;
            }
            _ => {
                let text = self.output.as_deref().unwrap_or(&self.doc.content);
                fs::write(&dest_path, text)?;
            }
        }

        // generated documents may have no file behind them
        if let Ok(mtime) = fs::metadata(&source).and_then(|meta| meta.modified()) {
            mtimes.record(&source, mtime);
        }

        Ok(true)
    }
}

/// Chronological order of posts, ties broken by slug.
pub(crate) fn cmp_posts(a: &Document, b: &Document) -> Ordering {
    match (&a.kind, &b.kind) {
        (ArtifactKind::Post(a), ArtifactKind::Post(b)) => {
            a.date.cmp(&b.date).then_with(|| a.slug.cmp(&b.slug))
        }
        _ => Ordering::Equal,
    }
}
