use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single travel guide, projected fresh from one markdown file on every
/// read. The markdown corpus is the durable source of truth; records are
/// never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuideRecord {
    /// Filename stem, e.g. "bali" for `bali.md`.
    pub id: String,
    /// Routing identifier: frontmatter `slug`, falling back to `id`.
    pub slug: String,
    pub title: String,
    pub description: String,
    pub image: String,
    pub icon: String,
    /// Markdown body rendered to HTML.
    pub content_html: String,
    /// Any other frontmatter keys, carried verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
