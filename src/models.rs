//! Canonical records returned by the clients.
//!
//! Every record is assembled fresh per call and never mutated afterwards.
//! Serialization convention: tracker fields the page may not yield are
//! `Option` and render as `null`; forum fields that Discourse only ever
//! supplies as strings default to the empty string, and only `category_id`
//! and `accepted_answer_post_number` are nullable on the forum side. Field
//! declaration order is the stable output order.

use serde::Serialize;

/// A Trac ticket with its lifecycle fields and comment history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ticket {
    pub id: u32,
    /// Parsed from the page title; empty when the title does not match.
    pub summary: String,
    pub reporter: Option<String>,
    pub owner: Option<String>,
    pub component: Option<String>,
    pub version: Option<String>,
    pub severity: Option<String>,
    pub status: Option<String>,
    pub resolution: Option<String>,
    pub keywords: Vec<String>,
    pub triage_stage: Option<String>,
    pub has_patch: bool,
    /// Display-formatted timestamps as shown on the page; not parsed to a
    /// temporal type because the markup does not guarantee a machine format.
    pub created: Option<String>,
    pub last_modified: Option<String>,
    pub description: String,
    /// Feed order, which is chronological as delivered.
    pub comments: Vec<Comment>,
}

/// One ticket comment from the RSS feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Comment {
    pub author: String,
    pub date: String,
    pub content: String,
}

/// A forum topic including its ordered posts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Topic {
    pub id: u64,
    pub title: String,
    pub slug: String,
    pub url: String,
    pub category_id: Option<u64>,
    pub created_at: String,
    pub posts_count: u64,
    pub views: u64,
    pub closed: bool,
    pub archived: bool,
    pub has_accepted_answer: bool,
    /// Present only when the payload carries a structured accepted-answer
    /// object with a post number.
    pub accepted_answer_post_number: Option<u64>,
    pub posts: Vec<Post>,
    pub tags: Vec<String>,
}

/// One post within a forum topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Post {
    pub id: u64,
    pub post_number: u64,
    pub username: String,
    pub name: String,
    pub created_at: String,
    /// Cooked HTML reduced to plain text.
    pub content: String,
    pub like_count: u64,
    pub accepted_answer: bool,
}

/// One entry from the tracker's HTML search listing. All fields are
/// best-effort: empty string when the listing text does not parse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TicketHit {
    pub id: u32,
    pub summary: String,
    pub status: String,
    pub resolution: String,
}

/// One topic from the forum search results, enriched with the excerpt of its
/// first matching post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopicHit {
    pub id: u64,
    pub title: String,
    pub slug: String,
    pub url: String,
    pub category_id: Option<u64>,
    pub created_at: String,
    pub posts_count: u64,
    pub has_accepted_answer: bool,
    pub closed: bool,
    /// Excerpt from the matching-posts array; empty when no post matched.
    pub blurb: String,
}
