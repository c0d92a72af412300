//! Client for the Trac ticket tracker (code.djangoproject.com).
//!
//! Trac has no JSON API for tickets, so records are assembled from three
//! sources: the ticket HTML page (title, description, date block, and the
//! `old_values` object embedded in a script), the RSS comment feed, and the
//! HTML search listing. Each field extractor is independently optional; a
//! fragment that fails to match leaves its field unset instead of discarding
//! the record.

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::backoff::BackoffPolicy;
use crate::config::Config;
use crate::constants;
use crate::error::Result;
use crate::fetch::Fetcher;
use crate::models::{Comment, Ticket, TicketHit};
use crate::scan::extract_embedded_object;
use crate::text::strip_html;

static TITLE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<title>(.+?)</title>").expect("valid regex"));
// Title format: "#36814 (During migration...) – Django"
static TITLE_SUMMARY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"#\d+\s*\((.+?)\)\s*[–-]").expect("valid regex"));
static DESCRIPTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)<div class="description">.*?<div class="searchable">(.*?)</div>"#)
        .expect("valid regex")
});
static DATE_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?s)<div class="date">(.*?)</div>"#).expect("valid regex"));
static PARAGRAPHS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<p[^>]*>(.*?)</p>").expect("valid regex"));
// title format: "See timeline at Dec 20, 2025, 8:56:37 AM"
static TIMELINE_LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<a[^>]*class="timeline"[^>]*title="See timeline at ([^"]+)""#)
        .expect("valid regex")
});
static RESULTS_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?s)<dl id="results">(.*?)</dl>"#).expect("valid regex"));
static DT_ENTRY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<dt>(.*?)</dt>").expect("valid regex"));
static RESULT_LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)<a[^>]*href="[^"]*/ticket/(\d+)"[^>]*>(.+?)</a>"#).expect("valid regex")
});
// Listing shape: #ID: Component: Summary (status: resolution)
static HIT_SHAPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^#\d+:\s*(?:[^:]+:\s*)?(.+?)\s*(?:\((\w+)(?::\s*(\w+))?\))?$")
        .expect("valid regex")
});

/// Client for ticket lookups and searches against a Trac instance.
pub struct TracClient {
    fetcher: Fetcher,
    base_url: String,
}

impl TracClient {
    /// Build a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: &Config) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(constants::USER_AGENT));
        let fetcher = Fetcher::new(
            headers,
            config.timeout,
            config.max_attempts,
            BackoffPolicy::new(config.backoff_base, config.backoff_cap),
        )?;
        Ok(Self {
            fetcher,
            base_url: config.trac_base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Fetch one ticket, assembling the record from the HTML page, the
    /// embedded `old_values` object, and the RSS comment feed.
    ///
    /// # Errors
    ///
    /// Returns an error only for fetch failures; missing fragments degrade to
    /// absent fields.
    pub async fn get_ticket(&self, ticket_id: u32) -> Result<Ticket> {
        let html = self
            .fetcher
            .get_text(&format!("{}/ticket/{ticket_id}", self.base_url), &[])
            .await?;

        let old_values = extract_embedded_object(&html, "old_values");
        if old_values.is_empty() {
            debug!(ticket_id, "No old_values object found in ticket page");
        }

        let (created, last_modified) = extract_dates(&html);
        let keywords = split_keywords(&old_values);
        let comments = self.get_comments(ticket_id).await?;

        Ok(Ticket {
            id: ticket_id,
            summary: extract_summary(&html),
            reporter: string_field(&old_values, "reporter"),
            owner: string_field(&old_values, "owner"),
            component: string_field(&old_values, "component"),
            version: string_field(&old_values, "version"),
            severity: string_field(&old_values, "severity"),
            status: string_field(&old_values, "status"),
            resolution: string_field(&old_values, "resolution"),
            keywords,
            triage_stage: string_field(&old_values, "stage"),
            has_patch: old_values.get("has_patch").and_then(Value::as_str) == Some("1"),
            created,
            last_modified,
            description: extract_description(&html),
            comments,
        })
    }

    /// Search the tracker and parse the HTML results listing.
    ///
    /// # Errors
    ///
    /// Returns an error only for fetch failures.
    pub async fn search(&self, query: &str, max_results: usize) -> Result<Vec<TicketHit>> {
        let html = self
            .fetcher
            .get_text(
                &format!("{}/search", self.base_url),
                &[("q", query), ("noquickjump", "1"), ("ticket", "on")],
            )
            .await?;
        Ok(parse_search_listing(&html, max_results))
    }

    /// Fetch ticket comments from the RSS feed, which is far more stable to
    /// parse than the comment markup on the page.
    async fn get_comments(&self, ticket_id: u32) -> Result<Vec<Comment>> {
        let body = self
            .fetcher
            .get_bytes(
                &format!("{}/ticket/{ticket_id}", self.base_url),
                &[("format", "rss")],
            )
            .await?;
        Ok(parse_comment_feed(&body))
    }
}

/// Read a string field out of the embedded object, treating empty strings as
/// absent (Trac writes `""` for unset fields).
fn string_field(values: &Map<String, Value>, key: &str) -> Option<String> {
    values
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
}

fn split_keywords(values: &Map<String, Value>) -> Vec<String> {
    values
        .get("keywords")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Extract the ticket summary from the page title's parenthesized segment.
fn extract_summary(html: &str) -> String {
    TITLE
        .captures(html)
        .and_then(|title| TITLE_SUMMARY.captures(&title[1]).map(|m| m[1].to_string()))
        .unwrap_or_default()
}

/// Extract the plain-text ticket description from its nested container.
fn extract_description(html: &str) -> String {
    DESCRIPTION
        .captures(html)
        .map(|m| strip_html(&m[1]))
        .unwrap_or_default()
}

/// Extract the created / last-modified display timestamps from the dated
/// metadata block. Each paragraph carries a timeline anchor whose title holds
/// the absolute timestamp; the paragraph's own text says which one it is.
fn extract_dates(html: &str) -> (Option<String>, Option<String>) {
    let mut created = None;
    let mut last_modified = None;

    if let Some(block) = DATE_BLOCK.captures(html) {
        for paragraph in PARAGRAPHS.captures_iter(&block[1]) {
            let p_html = &paragraph[1];
            let Some(link) = TIMELINE_LINK.captures(p_html) else {
                continue;
            };
            let date_str = link[1].to_string();
            let p_text = strip_html(p_html);
            if p_text.contains("Opened") {
                created = Some(date_str);
            } else if p_text.contains("Last modified") {
                last_modified = Some(date_str);
            }
        }
    }

    (created, last_modified)
}

/// Parse the `<dl id="results">` search listing into hits, stopping once
/// `max_results` entries have been collected.
fn parse_search_listing(html: &str, max_results: usize) -> Vec<TicketHit> {
    let Some(listing) = RESULTS_BLOCK.captures(html) else {
        return Vec::new();
    };

    let mut results = Vec::new();
    for entry in DT_ENTRY.captures_iter(&listing[1]) {
        let Some(link) = RESULT_LINK.captures(&entry[1]) else {
            continue;
        };
        let Ok(ticket_id) = link[1].parse::<u32>() else {
            continue;
        };
        let link_text = strip_html(&link[2]);

        let mut summary = String::new();
        let mut status = String::new();
        let mut resolution = String::new();
        if let Some(shape) = HIT_SHAPE.captures(&link_text) {
            summary = shape[1].trim().to_string();
            status = shape.get(2).map(|m| m.as_str().to_string()).unwrap_or_default();
            resolution = shape.get(3).map(|m| m.as_str().to_string()).unwrap_or_default();
        }

        results.push(TicketHit {
            id: ticket_id,
            summary,
            status,
            resolution,
        });
        if results.len() >= max_results {
            break;
        }
    }
    results
}

/// Parse the RSS comment feed into ordered comments. A feed that does not
/// parse yields no comments rather than failing the whole ticket.
fn parse_comment_feed(body: &[u8]) -> Vec<Comment> {
    let feed = match feed_rs::parser::parse(body) {
        Ok(feed) => feed,
        Err(e) => {
            warn!(error = %e, "Failed to parse ticket comment feed");
            return Vec::new();
        }
    };

    feed.entries
        .into_iter()
        .map(|entry| Comment {
            author: entry
                .authors
                .first()
                .map(|a| a.name.clone())
                .unwrap_or_default(),
            date: entry.published.map(|d| d.to_rfc2822()).unwrap_or_default(),
            content: entry
                .summary
                .map(|s| strip_html(&s.content))
                .unwrap_or_default(),
        })
        .collect()
}
