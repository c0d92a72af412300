//! Shared constants used across both clients.

/// User agent sent with every request to identify this client.
pub const USER_AGENT: &str = "django-triage/0.2.0";

/// Default number of results returned by the tracker and forum searches.
pub const DEFAULT_MAX_RESULTS: usize = 20;

/// Per-query result cap used by the multi-query ticket cross-reference search.
pub const TICKET_SEARCH_PER_QUERY: usize = 10;
