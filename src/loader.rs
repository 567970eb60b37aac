//! Discovery of layouts, posts, pages and static files in a source tree.

use std::fs;
use std::io::Read;
use std::sync::LazyLock;

use camino::{Utf8Path, Utf8PathBuf};
use chrono::NaiveDateTime;
use gray_matter::Matter;
use gray_matter::engine::YAML;

use crate::artifact::{ArtifactKind, Document, FrontMatter, PostInfo};
use crate::error::LoaderError;
use crate::render::{Layout, Layouts};

/// Entry names that are always picked up, even though they are hidden.
const ALWAYS_INCLUDE: &[&str] = &[".htaccess"];

/// Everything found in a source tree.
#[derive(Debug, Default)]
pub struct Discovery {
    pub layouts: Layouts,
    pub posts: Vec<Document>,
    pub pages: Vec<Document>,
    pub static_files: Vec<Document>,
}

/// Walks a source tree the way a build sees it.
pub struct Reader<'a> {
    source: &'a Utf8Path,
    /// Canonical destination, if it exists yet.
    destination: Option<Utf8PathBuf>,
    exclude: &'a [String],
    time: NaiveDateTime,
    future: bool,
}

impl<'a> Reader<'a> {
    pub fn new(
        source: &'a Utf8Path,
        destination: &'a Utf8Path,
        exclude: &'a [String],
        time: NaiveDateTime,
        future: bool,
    ) -> Self {
        Self {
            source,
            destination: destination.canonicalize_utf8().ok(),
            exclude,
            time,
            future,
        }
    }

    pub fn read(&self) -> Result<Discovery, LoaderError> {
        let mut found = Discovery {
            layouts: self.read_layouts()?,
            ..Default::default()
        };

        self.read_directories(Utf8Path::new(""), &mut found)?;

        Ok(found)
    }

    /// Reads `<source>/_layouts/*.*`. A missing directory means no layouts.
    pub fn read_layouts(&self) -> Result<Layouts, LoaderError> {
        let base = self.source.join("_layouts");
        let mut layouts = Layouts::new();

        if !base.is_dir() {
            return Ok(layouts);
        }

        for name in self.entries(&base, false)? {
            let path = base.join(&name);
            let Some((stem, _)) = name.rsplit_once('.') else {
                continue;
            };
            if !path.is_file() {
                continue;
            }

            let (matter, content) = read_front_matter(&path)?;
            layouts.insert(
                stem.to_string(),
                Layout {
                    name: stem.to_string(),
                    path,
                    matter,
                    content,
                },
            );
        }

        Ok(layouts)
    }

    fn read_directories(&self, dir: &Utf8Path, found: &mut Discovery) -> Result<(), LoaderError> {
        let base = self.source.join(dir);

        self.read_posts(dir, found)?;

        for name in self.entries(&base, true)? {
            let path = base.join(&name);

            if path.is_dir() {
                if self.destination.is_some()
                    && self.destination == path.canonicalize_utf8().ok()
                {
                    continue;
                }
                self.read_directories(&dir.join(&name), found)?;
            } else if is_page(&path)? {
                let (matter, content) = read_front_matter(&path)?;
                found
                    .pages
                    .push(Document::page(self.source, dir, name, matter, content));
            } else {
                found
                    .static_files
                    .push(Document::static_file(self.source, dir, name));
            }
        }

        Ok(())
    }

    /// Reads `<source>/<dir>/_posts/**`, skipping unpublished posts and,
    /// unless `future` is set, posts dated after the build time.
    fn read_posts(&self, dir: &Utf8Path, found: &mut Discovery) -> Result<(), LoaderError> {
        let base = self.source.join(dir).join("_posts");
        if !base.is_dir() {
            return Ok(());
        }

        let mut files = Vec::new();
        self.walk_files(&base, Utf8Path::new(""), &mut files)?;

        for name in files {
            let is_post = name
                .file_name()
                .and_then(PostInfo::from_file_name)
                .is_some();
            if !is_post {
                tracing::debug!("skipping {}, not a post", base.join(&name));
                continue;
            }

            let (matter, content) = read_front_matter(&base.join(&name))?;
            let Some(post) = Document::post(self.source, dir, name.as_str(), matter, content)
            else {
                continue;
            };

            let ArtifactKind::Post(info) = &post.kind else {
                continue;
            };

            let published = post.matter.published.unwrap_or(true);
            if published && (self.future || info.date <= self.time) {
                found.posts.push(post);
            }
        }

        Ok(())
    }

    fn walk_files(
        &self,
        base: &Utf8Path,
        rel: &Utf8Path,
        acc: &mut Vec<Utf8PathBuf>,
    ) -> Result<(), LoaderError> {
        for name in self.entries(&base.join(rel), false)? {
            let rel = rel.join(&name);
            if base.join(&rel).is_dir() {
                self.walk_files(base, &rel, acc)?;
            } else {
                acc.push(rel);
            }
        }

        Ok(())
    }

    /// Sorted names in `dir` that survive [`Self::keep`].
    fn entries(&self, dir: &Utf8Path, always_include: bool) -> Result<Vec<String>, LoaderError> {
        let mut names = Vec::new();

        for entry in dir.read_dir_utf8()? {
            let entry = entry?;
            let name = entry.file_name();
            let symlink = entry.file_type()?.is_symlink();

            if (always_include && ALWAYS_INCLUDE.contains(&name) && !symlink)
                || self.keep(name, symlink)
            {
                names.push(name.to_string());
            }
        }

        names.sort();
        Ok(names)
    }

    /// Hidden, private (`_`), backup (`#`, `~`), excluded and symlinked entries
    /// are not part of the site.
    fn keep(&self, name: &str, symlink: bool) -> bool {
        !(name.starts_with(['.', '_', '#'])
            || name.ends_with('~')
            || self.exclude.iter().any(|excluded| excluded == name)
            || symlink)
    }
}

/// Files starting with a `---` front matter header are pages.
fn is_page(path: &Utf8Path) -> Result<bool, LoaderError> {
    let mut head = [0u8; 3];
    let mut file = fs::File::open(path)?;
    let mut read = 0;

    while read < head.len() {
        match file.read(&mut head[read..])? {
            0 => break,
            n => read += n,
        }
    }

    Ok(&head[..read] == b"---")
}

fn read_front_matter(path: &Utf8Path) -> Result<(FrontMatter, String), LoaderError> {
    let content = fs::read_to_string(path)?;
    parse_yaml(&content).map_err(|e| LoaderError::FrontMatter(path.to_owned(), e))
}

/// Splits `content` into its YAML front matter and the rest.
pub fn parse_yaml<D>(content: &str) -> Result<(D, String), anyhow::Error>
where
    D: for<'de> serde::Deserialize<'de>,
{
    use gray_matter::Pod;

    static PARSER: LazyLock<Matter<YAML>> = LazyLock::new(Matter::<YAML>::new);

    let entity = PARSER.parse(content)?;
    let object = entity
        .data
        .unwrap_or_else(Pod::new_hash)
        .deserialize::<D>()
        .map_err(|e| anyhow::anyhow!("Malformed frontmatter:\n{e}"))?;

    Ok((object, entity.content))
}
