/// Parser for guide source files.
///
/// A guide file is markdown with an optional YAML frontmatter block:
/// - the block is delimited by `---` lines at the very top of the file
/// - a file that does not open with `---` is all body
/// - an opening `---` with no closing delimiter is also treated as all body
///
/// Frontmatter is an open attribute bag: recognized keys (`slug`, `title`,
/// `description`, `image`, `icon`) feed the typed record fields and any
/// other keys pass through verbatim. Malformed YAML is tolerated — it is
/// logged and treated as an empty bag so one bad file cannot take down the
/// whole listing.
use serde_json::{Map, Value};
use tracing::warn;

/// The two halves of a guide source file, before record assembly.
#[derive(Debug, Clone)]
pub struct GuideSource {
    pub frontmatter: Map<String, Value>,
    pub body: String,
}

/// Split a raw guide file into its frontmatter bag and markdown body.
pub fn parse_source(raw: &str) -> GuideSource {
    let (yaml, body) = split_frontmatter(raw);
    let frontmatter = match yaml {
        Some(yaml) => parse_frontmatter(&yaml),
        None => Map::new(),
    };
    GuideSource { frontmatter, body }
}

/// Render a markdown body to HTML.
pub fn render_markdown(markdown: &str) -> String {
    let parser = pulldown_cmark::Parser::new(markdown);
    let mut html = String::new();
    pulldown_cmark::html::push_html(&mut html, parser);
    html
}

fn split_frontmatter(raw: &str) -> (Option<String>, String) {
    let mut lines = raw.lines();
    match lines.next() {
        Some(first) if first.trim_end() == "---" => {}
        _ => return (None, raw.to_string()),
    }

    let mut yaml_lines = Vec::new();
    for line in lines.by_ref() {
        if line.trim_end() == "---" {
            let body: Vec<&str> = lines.collect();
            return (Some(yaml_lines.join("\n")), body.join("\n"));
        }
        yaml_lines.push(line);
    }

    // Opening delimiter with no closing one: not frontmatter.
    (None, raw.to_string())
}

fn parse_frontmatter(yaml: &str) -> Map<String, Value> {
    if yaml.trim().is_empty() {
        return Map::new();
    }
    match serde_yaml::from_str::<Map<String, Value>>(yaml) {
        Ok(map) => map,
        Err(e) => {
            warn!(error = %e, "malformed frontmatter, applying defaults");
            Map::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn splits_frontmatter_from_body() {
        let raw = "---\ntitle: Kyoto\nslug: kyoto-classic\n---\n# Heading\n\nBody text.\n";
        let source = parse_source(raw);
        assert_eq!(source.frontmatter["title"], json!("Kyoto"));
        assert_eq!(source.frontmatter["slug"], json!("kyoto-classic"));
        assert_eq!(source.body, "# Heading\n\nBody text.");
    }

    #[test]
    fn file_without_frontmatter_is_all_body() {
        let raw = "# Just markdown\n\nNo metadata here.\n";
        let source = parse_source(raw);
        assert!(source.frontmatter.is_empty());
        assert!(source.body.starts_with("# Just markdown"));
    }

    #[test]
    fn unclosed_frontmatter_is_all_body() {
        let raw = "---\ntitle: Dangling\nNo closing delimiter";
        let source = parse_source(raw);
        assert!(source.frontmatter.is_empty());
        assert_eq!(source.body, raw);
    }

    #[test]
    fn empty_frontmatter_block_is_tolerated() {
        let raw = "---\n---\nBody only.";
        let source = parse_source(raw);
        assert!(source.frontmatter.is_empty());
        assert_eq!(source.body, "Body only.");
    }

    #[test]
    fn malformed_yaml_is_tolerated() {
        let raw = "---\ntitle: [unclosed\n---\nBody.";
        let source = parse_source(raw);
        assert!(source.frontmatter.is_empty());
        assert_eq!(source.body, "Body.");
    }

    #[test]
    fn extra_keys_pass_through() {
        let raw = "---\ntitle: Bali\nbestSeason: spring\nbudgetTier: 2\n---\n";
        let source = parse_source(raw);
        assert_eq!(source.frontmatter["bestSeason"], json!("spring"));
        assert_eq!(source.frontmatter["budgetTier"], json!(2));
    }

    #[test]
    fn renders_markdown_to_html() {
        let html = render_markdown("# Hello\n\nSome *emphasis*.");
        assert!(html.contains("<h1>Hello</h1>"));
        assert!(html.contains("<em>emphasis</em>"));
    }

    #[test]
    fn renders_empty_body() {
        assert_eq!(render_markdown(""), "");
    }
}
