//! Clients for Django's public issue-tracking surfaces.
//!
//! Queries the Trac ticket tracker (code.djangoproject.com) and the
//! Discourse forum (forum.djangoproject.com) and converts their mixed
//! response formats (HTML pages, an embedded script object, an RSS comment
//! feed, JSON search payloads) into canonical serializable records.
//!
//! All fetching is sequential with bounded retries; parsing failures degrade
//! to absent fields rather than discarding an otherwise valid record.

pub mod backoff;
pub mod config;
pub mod constants;
pub mod error;
pub mod fetch;
pub mod forum;
pub mod models;
pub mod scan;
pub mod text;
pub mod trac;

pub use config::Config;
pub use error::{Error, Result};
pub use forum::ForumClient;
pub use trac::TracClient;
