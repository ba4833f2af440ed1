/// Guide content loader.
///
/// Projects a directory of markdown+frontmatter files into page-ready
/// [`GuideRecord`]s. There is no caching layer: every call re-reads and
/// re-renders from disk. The corpus is small and edited out-of-band, so a
/// stale-free read beats a memo table.
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::warn;

use crate::error::AppError;
use crate::model::GuideRecord;
use crate::parser;

const DEFAULT_TITLE: &str = "Untitled Guide";
const DEFAULT_DESCRIPTION: &str = "No description available.";
const DEFAULT_IMAGE: &str = "/placeholder-image.jpg";
const DEFAULT_ICON: &str = "MapPin";

pub struct GuideStore {
    dir: PathBuf,
}

impl GuideStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// All guides, sorted ascending by title (ordinal, case-sensitive).
    ///
    /// Slug collisions are logged; lookups resolve them first-match-wins in
    /// sorted-filename order.
    pub fn all_guides(&self) -> Result<Vec<GuideRecord>, AppError> {
        let mut records = Vec::new();
        let mut seen_slugs: HashMap<String, String> = HashMap::new();

        for path in self.markdown_files()? {
            let record = load_record(&path)?;
            if let Some(first_id) = seen_slugs.get(&record.slug) {
                warn!(
                    slug = %record.slug,
                    first = %first_id,
                    duplicate = %record.id,
                    "duplicate guide slug, lookups resolve to the first file"
                );
            } else {
                seen_slugs.insert(record.slug.clone(), record.id.clone());
            }
            records.push(record);
        }

        records.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(records)
    }

    /// Look up one guide by its effective slug (frontmatter `slug`, else the
    /// filename stem). Returns `None` when nothing matches — absence, not an
    /// error. On a collision the first file in sorted-filename order wins.
    pub fn guide(&self, slug: &str) -> Result<Option<GuideRecord>, AppError> {
        for path in self.markdown_files()? {
            let id = file_stem(&path);
            let raw = std::fs::read_to_string(&path)?;
            let source = parser::parse_source(&raw);

            let effective_slug = source
                .frontmatter
                .get("slug")
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .unwrap_or(&id);

            if effective_slug == slug {
                return Ok(Some(assemble(id, source)));
            }
        }
        Ok(None)
    }

    /// Markdown files in the guides directory, in sorted filename order so
    /// enumeration (and therefore collision tie-breaking) is deterministic.
    fn markdown_files(&self) -> Result<Vec<PathBuf>, AppError> {
        let mut paths: Vec<PathBuf> = std::fs::read_dir(&self.dir)?
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .map(|entry| entry.path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "md"))
            .collect();
        paths.sort();
        Ok(paths)
    }
}

fn load_record(path: &Path) -> Result<GuideRecord, AppError> {
    let raw = std::fs::read_to_string(path)?;
    Ok(assemble(file_stem(path), parser::parse_source(&raw)))
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Assemble a record from the parsed source, applying display defaults for
/// anything the frontmatter omits. Recognized keys move into the typed
/// fields; everything else stays in the open attribute bag.
fn assemble(id: String, source: parser::GuideSource) -> GuideRecord {
    let mut frontmatter = source.frontmatter;

    let slug = take_string(&mut frontmatter, "slug").unwrap_or_else(|| id.clone());
    let title = take_string(&mut frontmatter, "title")
        .unwrap_or_else(|| DEFAULT_TITLE.to_string());
    let description = take_string(&mut frontmatter, "description")
        .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string());
    let image = take_string(&mut frontmatter, "image")
        .unwrap_or_else(|| DEFAULT_IMAGE.to_string());
    let icon = take_string(&mut frontmatter, "icon").unwrap_or_else(|| DEFAULT_ICON.to_string());

    // Reserved output keys must not shadow the computed fields when the
    // extra bag is flattened into the JSON record.
    for key in ["id", "contentHtml"] {
        frontmatter.remove(key);
    }

    GuideRecord {
        id,
        slug,
        title,
        description,
        image,
        icon,
        content_html: parser::render_markdown(&source.body),
        extra: frontmatter,
    }
}

/// Remove `key` from the bag and return it when it is a non-empty string.
/// Non-string values are dropped so they cannot duplicate a typed field in
/// the serialized record.
fn take_string(map: &mut Map<String, Value>, key: &str) -> Option<String> {
    match map.remove(key)? {
        Value::String(s) if !s.is_empty() => Some(s),
        _ => None,
    }
}
