//! Client for the Discourse forum (forum.djangoproject.com).
//!
//! Discourse speaks JSON, so the work here is shaping its search and topic
//! payloads into canonical records: pairing topic summaries with excerpts
//! from the parallel matching-posts array, flattening the post stream, and
//! cross-referencing Trac ticket numbers against forum discussions.

use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::backoff::BackoffPolicy;
use crate::config::Config;
use crate::constants;
use crate::error::Result;
use crate::fetch::Fetcher;
use crate::models::{Post, Topic, TopicHit};
use crate::text::strip_html;

/// Category slug → Discourse category id. Process-wide, never mutated.
static CATEGORIES: Lazy<HashMap<&'static str, u64>> = Lazy::new(|| {
    HashMap::from([
        ("announcements", 7),
        ("users", 6),     // "Using Django"
        ("internals", 5), // "Django Internals"
        ("projects", 11), // "Show & Tell"
        ("events", 12),
        ("packages", 30),
    ])
});

/// Payload of `/search.json`: topic summaries plus a parallel array of
/// matching posts carrying the excerpts.
#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    topics: Vec<SearchTopic>,
    #[serde(default)]
    posts: Vec<SearchPost>,
}

#[derive(Debug, Deserialize)]
struct SearchTopic {
    id: u64,
    #[serde(default)]
    title: String,
    #[serde(default)]
    slug: String,
    #[serde(default)]
    category_id: Option<u64>,
    #[serde(default)]
    created_at: String,
    #[serde(default)]
    posts_count: u64,
    #[serde(default)]
    has_accepted_answer: bool,
    #[serde(default)]
    closed: bool,
}

#[derive(Debug, Deserialize)]
struct SearchPost {
    #[serde(default)]
    topic_id: Option<u64>,
    #[serde(default)]
    blurb: String,
}

/// Payload of `/t/<id>.json`.
#[derive(Debug, Deserialize)]
struct TopicResponse {
    #[serde(default)]
    id: Option<u64>,
    #[serde(default)]
    title: String,
    #[serde(default)]
    slug: String,
    #[serde(default)]
    category_id: Option<u64>,
    #[serde(default)]
    created_at: String,
    #[serde(default)]
    posts_count: u64,
    #[serde(default)]
    views: u64,
    #[serde(default)]
    closed: bool,
    #[serde(default)]
    archived: bool,
    #[serde(default)]
    has_accepted_answer: bool,
    /// A structured accepted-answer object when one exists; Discourse also
    /// emits booleans and nulls here, which carry no post number.
    #[serde(default)]
    accepted_answer: Value,
    #[serde(default)]
    post_stream: PostStream,
    #[serde(default)]
    tags: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct PostStream {
    #[serde(default)]
    posts: Vec<RawPost>,
}

#[derive(Debug, Deserialize)]
struct RawPost {
    #[serde(default)]
    id: u64,
    #[serde(default)]
    post_number: u64,
    #[serde(default)]
    username: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    created_at: String,
    #[serde(default)]
    cooked: String,
    #[serde(default)]
    like_count: u64,
    #[serde(default)]
    accepted_answer: bool,
}

/// Client for topic lookups and searches against a Discourse instance.
pub struct ForumClient {
    fetcher: Fetcher,
    base_url: String,
}

impl ForumClient {
    /// Build a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: &Config) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(constants::USER_AGENT));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let fetcher = Fetcher::new(
            headers,
            config.timeout,
            config.max_attempts,
            BackoffPolicy::new(config.backoff_base, config.backoff_cap),
        )?;
        Ok(Self {
            fetcher,
            base_url: config.forum_base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Search forum topics, optionally restricted to a known category.
    ///
    /// The category filter rides inside the query text (`<query> ##<slug>`),
    /// which is the in-line filter syntax the search endpoint understands;
    /// unknown category names are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error for fetch failures or an undecodable payload.
    pub async fn search(
        &self,
        query: &str,
        category: Option<&str>,
        max_results: usize,
    ) -> Result<Vec<TopicHit>> {
        let query = match category.filter(|slug| CATEGORIES.contains_key(*slug)) {
            Some(slug) => format!("{query} ##{slug}"),
            None => query.to_string(),
        };

        let body = self
            .fetcher
            .get_bytes(&format!("{}/search.json", self.base_url), &[("q", &query)])
            .await?;
        let response: SearchResponse = serde_json::from_slice(&body)?;
        Ok(assemble_hits(response, &self.base_url, max_results))
    }

    /// Fetch one topic including its ordered posts.
    ///
    /// # Errors
    ///
    /// Returns an error for fetch failures or an undecodable payload.
    pub async fn get_topic(&self, topic_id: u64) -> Result<Topic> {
        let body = self
            .fetcher
            .get_bytes(&format!("{}/t/{topic_id}.json", self.base_url), &[])
            .await?;
        let response: TopicResponse = serde_json::from_slice(&body)?;
        Ok(build_topic(response, topic_id, &self.base_url))
    }

    /// Search the forum for discussions mentioning a Trac ticket.
    ///
    /// Runs three query variants one after another and merges the results;
    /// sequential execution guarantees an earlier hit is never displaced by
    /// a later duplicate.
    ///
    /// # Errors
    ///
    /// Returns an error for fetch failures or an undecodable payload.
    pub async fn search_by_ticket(&self, ticket_id: u32) -> Result<Vec<TopicHit>> {
        let queries = [
            format!("ticket {ticket_id}"),
            format!("#{ticket_id}"),
            format!("code.djangoproject.com/ticket/{ticket_id}"),
        ];

        let mut batches = Vec::with_capacity(queries.len());
        for query in &queries {
            debug!(%query, "Running ticket cross-reference query");
            batches.push(
                self.search(query, None, constants::TICKET_SEARCH_PER_QUERY)
                    .await?,
            );
        }
        Ok(merge_hits(batches))
    }
}

/// Pair each topic summary with the excerpt of its first matching post and
/// emit up to `max_results` hits.
fn assemble_hits(response: SearchResponse, base_url: &str, max_results: usize) -> Vec<TopicHit> {
    let mut blurbs: HashMap<u64, String> = HashMap::new();
    for post in response.posts {
        if let Some(topic_id) = post.topic_id {
            // First occurrence in list order wins
            blurbs.entry(topic_id).or_insert(post.blurb);
        }
    }

    response
        .topics
        .into_iter()
        .take(max_results)
        .map(|topic| {
            let url = format!("{base_url}/t/{}/{}", topic.slug, topic.id);
            let blurb = blurbs.remove(&topic.id).unwrap_or_default();
            TopicHit {
                id: topic.id,
                title: topic.title,
                slug: topic.slug,
                url,
                category_id: topic.category_id,
                created_at: topic.created_at,
                posts_count: topic.posts_count,
                has_accepted_answer: topic.has_accepted_answer,
                closed: topic.closed,
                blurb,
            }
        })
        .collect()
}

/// Merge query batches into one list deduplicated by topic id, first seen
/// (by batch order, then within-batch order) wins.
fn merge_hits(batches: Vec<Vec<TopicHit>>) -> Vec<TopicHit> {
    let mut seen = HashSet::new();
    let mut merged = Vec::new();
    for batch in batches {
        for hit in batch {
            if seen.insert(hit.id) {
                merged.push(hit);
            }
        }
    }
    merged
}

fn build_topic(response: TopicResponse, requested_id: u64, base_url: &str) -> Topic {
    let id = response.id.unwrap_or(requested_id);
    let url = format!("{base_url}/t/{}/{id}", response.slug);

    let posts = response
        .post_stream
        .posts
        .into_iter()
        .map(|post| Post {
            id: post.id,
            post_number: post.post_number,
            username: post.username,
            name: post.name,
            created_at: post.created_at,
            content: strip_html(&post.cooked),
            like_count: post.like_count,
            accepted_answer: post.accepted_answer,
        })
        .collect();

    // Only a structured accepted-answer object yields a post number
    let accepted_answer_post_number = response
        .accepted_answer
        .as_object()
        .and_then(|obj| obj.get("post_number"))
        .and_then(Value::as_u64);

    Topic {
        id,
        title: response.title,
        slug: response.slug,
        url,
        category_id: response.category_id,
        created_at: response.created_at,
        posts_count: response.posts_count,
        views: response.views,
        closed: response.closed,
        archived: response.archived,
        has_accepted_answer: response.has_accepted_answer,
        accepted_answer_post_number,
        posts,
        tags: response.tags,
    }
}
