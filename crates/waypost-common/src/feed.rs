/// Client for the external blog syndication feed.
///
/// The feed is a standard RSS document: `rss > channel > item[]`, where each
/// item carries `title`, `link`, `pubDate`, and `description` children, any
/// of which may be wrapped in CDATA. Extraction is regex-based over that
/// deterministic structure; a missing child defaults to the empty string
/// rather than rejecting the item.
///
/// Fetch results are cached in memory for a bounded interval so the blog
/// section does not hit the upstream on every page render.
use std::time::{Duration, Instant};

use regex::Regex;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::error::CommonError;

/// A single post from the syndication feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedPost {
    pub title: String,
    pub link: String,
    #[serde(rename = "pubDate")]
    pub pub_date: String,
    pub description: String,
}

#[derive(Clone, Debug)]
pub struct FeedClientConfig {
    /// URL of the RSS feed.
    pub url: String,
    pub timeout: Duration,
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    /// How long a fetched post list stays fresh.
    pub cache_ttl: Duration,
}

impl FeedClientConfig {
    /// Load configuration from environment variables.
    ///
    /// Returns `None` when `WAYPOST_FEED_URL` is unset — the feed is an
    /// optional collaborator and the service runs without it.
    ///
    /// Optional knobs:
    /// - `WAYPOST_FEED_TIMEOUT_SECS` (default 30)
    /// - `WAYPOST_FEED_MAX_RETRIES` (default 3)
    /// - `WAYPOST_FEED_RETRY_INITIAL_MS` (default 200)
    /// - `WAYPOST_FEED_RETRY_MAX_MS` (default 5000)
    /// - `WAYPOST_FEED_TTL_SECS` (default 3600)
    pub fn from_env() -> Option<Self> {
        let url = std::env::var("WAYPOST_FEED_URL").ok()?;

        let timeout = std::env::var("WAYPOST_FEED_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or_else(|| Duration::from_secs(30));

        let max_retries = std::env::var("WAYPOST_FEED_MAX_RETRIES")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(3);

        let initial_backoff = std::env::var("WAYPOST_FEED_RETRY_INITIAL_MS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or_else(|| Duration::from_millis(200));

        let max_backoff = std::env::var("WAYPOST_FEED_RETRY_MAX_MS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or_else(|| Duration::from_millis(5_000));

        let cache_ttl = std::env::var("WAYPOST_FEED_TTL_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or_else(|| Duration::from_secs(3_600));

        Some(Self {
            url: url.trim().to_string(),
            timeout,
            max_retries,
            initial_backoff,
            max_backoff,
            cache_ttl,
        })
    }
}

pub struct FeedClient {
    config: FeedClientConfig,
    http: reqwest::Client,
}

impl FeedClient {
    pub fn new(config: FeedClientConfig) -> Result<Self, CommonError> {
        let http = reqwest::Client::builder()
            .user_agent("waypost-site")
            .build()?;
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &FeedClientConfig {
        &self.config
    }

    /// Fetch the feed document and extract all posts.
    ///
    /// Transient failures (timeouts, connection errors, 429/5xx) are retried
    /// with exponential backoff up to `max_retries` attempts.
    pub async fn fetch_posts(&self) -> Result<Vec<FeedPost>, CommonError> {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match self.fetch_once().await {
                Ok(posts) => return Ok(posts),
                Err(e) => {
                    if attempt > self.config.max_retries || !should_retry(&e) {
                        return Err(e);
                    }
                    let delay = backoff_delay(
                        self.config.initial_backoff,
                        self.config.max_backoff,
                        attempt - 1,
                    );
                    warn!(
                        attempt,
                        delay_ms = delay.as_millis(),
                        error = %e,
                        "feed fetch failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    async fn fetch_once(&self) -> Result<Vec<FeedPost>, CommonError> {
        let resp = self
            .http
            .get(&self.config.url)
            .timeout(self.config.timeout)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(CommonError::Upstream {
                status: resp.status(),
            });
        }
        let xml = resp.text().await?;
        Ok(parse_feed(&xml))
    }
}

fn should_retry(err: &CommonError) -> bool {
    match err {
        CommonError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
        CommonError::Upstream { status } => {
            *status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
        }
    }
}

fn backoff_delay(initial: Duration, max: Duration, exponent: u32) -> Duration {
    let mult = 1u128.checked_shl(exponent).unwrap_or(u128::MAX);
    let base_ms = initial.as_millis().saturating_mul(mult);
    let capped_ms = std::cmp::min(base_ms, max.as_millis()) as u64;
    Duration::from_millis(capped_ms)
}

/// Extract all `<item>` records from an RSS document.
///
/// Items missing a child field get the empty string for it. Anything that is
/// not inside an `<item>` block is ignored.
pub fn parse_feed(xml: &str) -> Vec<FeedPost> {
    let item_re = Regex::new(r"(?s)<item\b[^>]*>(.*?)</item>").expect("valid regex");

    item_re
        .captures_iter(xml)
        .map(|caps| {
            let block = &caps[1];
            FeedPost {
                title: item_field(block, "title"),
                link: item_field(block, "link"),
                pub_date: item_field(block, "pubDate"),
                description: item_field(block, "description"),
            }
        })
        .collect()
}

/// Pull the text content of a named child element out of an item block,
/// stripping a CDATA wrapper and unescaping the predefined XML entities.
fn item_field(block: &str, tag: &str) -> String {
    let re = Regex::new(&format!(r"(?s)<{tag}\b[^>]*>(.*?)</{tag}>")).expect("valid regex");
    let Some(caps) = re.captures(block) else {
        return String::new();
    };
    let raw = caps[1].trim();

    let inner = raw
        .strip_prefix("<![CDATA[")
        .and_then(|s| s.strip_suffix("]]>"))
        .unwrap_or(raw);

    unescape_xml(inner.trim())
}

/// Unescape the five predefined XML entities. `&amp;` goes last so escaped
/// ampersands do not get double-expanded.
fn unescape_xml(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

struct CacheEntry {
    fetched_at: Instant,
    posts: Vec<FeedPost>,
}

/// The feed as seen by the rest of the service: a bounded, recent list of
/// posts, cached for `cache_ttl`.
///
/// When the feed URL is not configured the service always reports an empty
/// list. When a refetch fails but a stale cache entry exists, the stale
/// entry is served — the blog section is decorative and an hour-old list
/// beats an error page.
pub struct FeedService {
    client: Option<FeedClient>,
    cached: RwLock<Option<CacheEntry>>,
}

impl FeedService {
    /// Build from the environment. Logs whether the feed is active.
    pub fn from_env() -> Result<Self, CommonError> {
        match FeedClientConfig::from_env() {
            Some(config) => {
                info!(url = %config.url, ttl_secs = config.cache_ttl.as_secs(), "feed configured");
                Ok(Self {
                    client: Some(FeedClient::new(config)?),
                    cached: RwLock::new(None),
                })
            }
            None => {
                info!("WAYPOST_FEED_URL unset, feed disabled");
                Ok(Self {
                    client: None,
                    cached: RwLock::new(None),
                })
            }
        }
    }

    /// Construct a disabled service (always returns an empty post list).
    pub fn disabled() -> Self {
        Self {
            client: None,
            cached: RwLock::new(None),
        }
    }

    /// Return up to `limit` posts, refetching when the cache has expired.
    pub async fn posts(&self, limit: usize) -> Result<Vec<FeedPost>, CommonError> {
        let Some(client) = &self.client else {
            return Ok(Vec::new());
        };
        let ttl = client.config().cache_ttl;

        {
            let guard = self.cached.read().await;
            if let Some(entry) = guard.as_ref() {
                if entry.fetched_at.elapsed() < ttl {
                    return Ok(bounded(&entry.posts, limit));
                }
            }
        }

        match client.fetch_posts().await {
            Ok(posts) => {
                let result = bounded(&posts, limit);
                let mut guard = self.cached.write().await;
                *guard = Some(CacheEntry {
                    fetched_at: Instant::now(),
                    posts,
                });
                Ok(result)
            }
            Err(e) => {
                let guard = self.cached.read().await;
                if let Some(entry) = guard.as_ref() {
                    warn!(error = %e, "feed refetch failed, serving stale posts");
                    return Ok(bounded(&entry.posts, limit));
                }
                Err(e)
            }
        }
    }
}

fn bounded(posts: &[FeedPost], limit: usize) -> Vec<FeedPost> {
    posts.iter().take(limit).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Waypost Journal</title>
    <link>https://journal.example.com</link>
    <item>
      <title><![CDATA[Ten days in Kyoto]]></title>
      <link>https://journal.example.com/p/kyoto</link>
      <pubDate>Tue, 03 Jun 2025 09:00:00 +0000</pubDate>
      <description><![CDATA[Temples, tea &amp; trains.]]></description>
    </item>
    <item>
      <title>Packing light &amp; right</title>
      <link>https://journal.example.com/p/packing</link>
      <pubDate>Mon, 26 May 2025 09:00:00 +0000</pubDate>
      <description>One bag, three weeks</description>
    </item>
  </channel>
</rss>"#;

    #[test]
    fn parses_items_in_document_order() {
        let posts = parse_feed(SAMPLE);
        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0].title, "Ten days in Kyoto");
        assert_eq!(posts[0].link, "https://journal.example.com/p/kyoto");
        assert_eq!(posts[0].pub_date, "Tue, 03 Jun 2025 09:00:00 +0000");
        assert_eq!(posts[1].title, "Packing light & right");
    }

    #[test]
    fn cdata_contents_are_unwrapped_and_unescaped() {
        let posts = parse_feed(SAMPLE);
        assert_eq!(posts[0].description, "Temples, tea & trains.");
    }

    #[test]
    fn missing_fields_default_to_empty() {
        let xml = "<rss><channel><item><title>Only a title</title></item></channel></rss>";
        let posts = parse_feed(xml);
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].title, "Only a title");
        assert_eq!(posts[0].link, "");
        assert_eq!(posts[0].pub_date, "");
        assert_eq!(posts[0].description, "");
    }

    #[test]
    fn channel_metadata_is_not_an_item() {
        let xml = "<rss><channel><title>Channel title</title></channel></rss>";
        assert!(parse_feed(xml).is_empty());
    }

    #[test]
    fn unescape_handles_amp_last() {
        assert_eq!(unescape_xml("&amp;lt;"), "&lt;");
        assert_eq!(unescape_xml("a &lt; b &gt; c"), "a < b > c");
        assert_eq!(unescape_xml("&quot;hi&apos;"), "\"hi'");
    }

    #[test]
    fn feed_post_serializes_pub_date_as_camel_case() {
        let post = FeedPost {
            title: "t".into(),
            link: "l".into(),
            pub_date: "d".into(),
            description: "x".into(),
        };
        let json = serde_json::to_value(&post).unwrap();
        assert_eq!(json["pubDate"], "d");
        assert!(json.get("pub_date").is_none());
    }

    #[tokio::test]
    async fn disabled_service_serves_empty_list() {
        let service = FeedService::disabled();
        let posts = service.posts(5).await.unwrap();
        assert!(posts.is_empty());
    }

    fn post(title: &str) -> FeedPost {
        FeedPost {
            title: title.to_string(),
            link: format!("https://journal.example.com/p/{title}"),
            pub_date: "Tue, 03 Jun 2025 09:00:00 +0000".to_string(),
            description: String::new(),
        }
    }

    fn test_client(url: &str, cache_ttl: Duration) -> FeedClient {
        FeedClient::new(FeedClientConfig {
            url: url.to_string(),
            timeout: Duration::from_secs(2),
            max_retries: 0,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(1),
            cache_ttl,
        })
        .unwrap()
    }

    fn seeded_service(client: FeedClient, posts: Vec<FeedPost>) -> FeedService {
        FeedService {
            client: Some(client),
            cached: RwLock::new(Some(CacheEntry {
                fetched_at: Instant::now(),
                posts,
            })),
        }
    }

    /// Bind an ephemeral local port and answer exactly one HTTP request with
    /// the given RSS document. Returns the URL to fetch.
    async fn serve_once(xml: &'static str) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 2048];
            let _ = stream.read(&mut buf).await;
            let response = format!(
                "HTTP/1.1 200 OK\r\ncontent-type: application/rss+xml\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                xml.len(),
                xml
            );
            stream.write_all(response.as_bytes()).await.unwrap();
        });
        format!("http://{addr}/rss")
    }

    // Nothing listens on port 1, so any fetch attempt fails fast.
    const UNREACHABLE: &str = "http://127.0.0.1:1/rss";

    #[tokio::test]
    async fn fresh_cache_entry_is_served_without_refetch() {
        let client = test_client(UNREACHABLE, Duration::from_secs(3_600));
        let service = seeded_service(client, vec![post("cached")]);

        let posts = service.posts(5).await.unwrap();
        assert_eq!(posts, vec![post("cached")]);
    }

    #[tokio::test]
    async fn expired_cache_refetches_from_upstream() {
        let url = serve_once(SAMPLE).await;
        let client = test_client(&url, Duration::ZERO);
        let service = seeded_service(client, vec![post("old")]);

        let posts = service.posts(5).await.unwrap();
        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0].title, "Ten days in Kyoto");
    }

    #[tokio::test]
    async fn stale_posts_served_when_refetch_fails() {
        let client = test_client(UNREACHABLE, Duration::ZERO);
        let service = seeded_service(client, vec![post("stale")]);

        let posts = service.posts(5).await.unwrap();
        assert_eq!(posts, vec![post("stale")]);
    }

    #[tokio::test]
    async fn cold_cache_fetch_failure_is_an_error() {
        let client = test_client(UNREACHABLE, Duration::from_secs(3_600));
        let service = FeedService {
            client: Some(client),
            cached: RwLock::new(None),
        };

        assert!(service.posts(5).await.is_err());
    }

    #[test]
    fn bounded_truncates() {
        let posts = parse_feed(SAMPLE);
        assert_eq!(bounded(&posts, 1).len(), 1);
        assert_eq!(bounded(&posts, 10).len(), 2);
    }
}
