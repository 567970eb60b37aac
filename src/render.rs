//! The rendering seam.
//!
//! The build core does not know how content becomes HTML. It hands every post
//! and page to a [`Renderer`] along with the site's [`Layouts`] and a JSON
//! payload describing the whole site, and stores whatever comes back.

use std::collections::BTreeMap;

use camino::Utf8PathBuf;
use chrono::NaiveDateTime;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::artifact::{Artifact, FrontMatter};
use crate::error::RenderError;

/// A template read from the `_layouts` directory.
#[derive(Debug, Clone)]
pub struct Layout {
    pub name: String,
    pub path: Utf8PathBuf,
    /// Layouts may themselves declare a parent layout.
    pub matter: FrontMatter,
    pub content: String,
}

/// Layouts by name, the file name without its extension.
pub type Layouts = BTreeMap<String, Layout>;

/// Turns an artifact's content into its final output.
pub trait Renderer {
    /// `payload` is the object built by [`site_payload`]. Returning
    /// [`RenderError::MissingLayoutDir`] is tolerated by the build, any other
    /// error aborts it.
    fn render(
        &self,
        artifact: &Artifact,
        layouts: &Layouts,
        payload: &Value,
    ) -> Result<String, RenderError>;
}

/// Outputs content unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct Verbatim;

impl Renderer for Verbatim {
    fn render(&self, artifact: &Artifact, _: &Layouts, _: &Value) -> Result<String, RenderError> {
        Ok(artifact.content().to_string())
    }
}

/// What renderers see of a single artifact.
#[derive(Debug, Clone, Serialize)]
pub struct Summary<'a> {
    pub url: String,
    pub path: Utf8PathBuf,
    pub title: Option<&'a str>,
    pub date: Option<String>,
    pub categories: &'a [String],
    pub tags: &'a [String],
}

impl<'a> From<&'a Artifact> for Summary<'a> {
    fn from(artifact: &'a Artifact) -> Self {
        let matter = artifact.front_matter();

        Self {
            url: artifact.url(),
            path: artifact.relative_path(),
            title: matter.title.as_deref(),
            date: artifact
                .post_info()
                .map(|info| info.date.format("%Y-%m-%d %H:%M:%S").to_string()),
            categories: &matter.categories,
            tags: &matter.tags,
        }
    }
}

/// Builds `{ "site": { ... } }`: the extra configuration keys merged with
/// `time`, `posts` (newest first), `pages`, `html_pages`, `categories` and
/// `tags`.
pub fn site_payload(
    extra: &Map<String, Value>,
    time: NaiveDateTime,
    posts: &[Artifact],
    pages: &[Artifact],
    categories: &BTreeMap<String, Vec<usize>>,
    tags: &BTreeMap<String, Vec<usize>>,
) -> Value {
    let mut site = extra.clone();
    site.insert(
        "time".into(),
        Value::String(time.format("%Y-%m-%d %H:%M:%S").to_string()),
    );
    site.insert("posts".into(), summaries(posts.iter().rev()));
    site.insert("pages".into(), summaries(pages.iter()));
    site.insert(
        "html_pages".into(),
        summaries(pages.iter().filter(|page| page.is_html())),
    );
    site.insert("categories".into(), index(posts, categories));
    site.insert("tags".into(), index(posts, tags));

    let mut root = Map::new();
    root.insert("site".into(), Value::Object(site));
    Value::Object(root)
}

fn summaries<'a>(items: impl Iterator<Item = &'a Artifact>) -> Value {
    Value::Array(
        items
            .map(|artifact| serde_json::to_value(Summary::from(artifact)).unwrap_or_default())
            .collect(),
    )
}

fn index(posts: &[Artifact], index: &BTreeMap<String, Vec<usize>>) -> Value {
    Value::Object(
        index
            .iter()
            .map(|(name, members)| (name.clone(), summaries(members.iter().map(|&i| &posts[i]))))
            .collect(),
    )
}

/// Renders content, then its layout chain, as minijinja templates.
///
/// Templates see `site` (the payload), `page` (a [`Summary`]) and, in
/// layouts, `content`. Unknown layout names end the chain silently.
#[cfg(feature = "minijinja")]
#[derive(Debug, Default, Clone, Copy)]
pub struct JinjaRenderer;

#[cfg(feature = "minijinja")]
impl Renderer for JinjaRenderer {
    fn render(
        &self,
        artifact: &Artifact,
        layouts: &Layouts,
        payload: &Value,
    ) -> Result<String, RenderError> {
        use std::collections::HashSet;

        use minijinja::{Environment, context};

        let env = Environment::new();
        let site = &payload["site"];
        let page = Summary::from(artifact);

        let mut content = env
            .render_str(artifact.content(), context! { site => site, page => &page })
            .map_err(anyhow::Error::from)?;

        let mut seen = HashSet::new();
        let mut next = artifact.front_matter().layout.as_deref();

        while let Some(name) = next {
            let Some(layout) = layouts.get(name) else {
                break;
            };
            if !seen.insert(name) {
                break;
            }

            content = env
                .render_str(
                    &layout.content,
                    context! { site => site, page => &page, content => content },
                )
                .map_err(anyhow::Error::from)?;

            next = layout.matter.layout.as_deref();
        }

        Ok(content)
    }
}
