//! Integration tests for the Trac client against a mock tracker.

use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use django_triage::error::FetchError;
use django_triage::{Config, Error, TracClient};

fn test_config(server: &MockServer) -> Config {
    Config {
        trac_base_url: server.uri(),
        ..Config::for_testing()
    }
}

/// Ticket page in the shape Trac renders: title with the parenthesized
/// summary, the embedded `old_values` script object, the date block with
/// timeline anchors, and the nested description container.
const TICKET_HTML: &str = r##"<!DOCTYPE html>
<html>
<head>
<title>#36814 (During migration rename of M2M field breaks) – Django</title>
<script>
  var old_values = {"reporter": "dantyan", "owner": "", "component": "Migrations",
    "version": "6.0", "severity": "Normal", "status": "closed",
    "resolution": "duplicate", "keywords": "migration, manytomany",
    "stage": "Unreviewed", "has_patch": "1"};
</script>
</head>
<body>
<div id="ticket">
  <div class="date">
    <p>Opened <a class="timeline" href="/timeline?from=2025-12-20" title="See timeline at Dec 20, 2025, 8:56:37 AM">3 days ago</a></p>
    <p>Last modified <a class="timeline" href="/timeline?from=2025-12-23" title="See timeline at Dec 23, 2025, 3:37:30 AM">11 hours ago</a></p>
  </div>
  <div class="description">
    <h3>Description</h3>
    <div class="searchable"><p>Renaming a <code>ManyToManyField</code> breaks.</p><br><p>Second paragraph.</p></div>
  </div>
</div>
</body>
</html>"##;

const COMMENT_RSS: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<rss version="2.0" xmlns:dc="http://purl.org/dc/elements/1.1/">
  <channel>
    <title>Ticket #36814</title>
    <link>https://code.djangoproject.com/ticket/36814</link>
    <description>Ticket comments</description>
    <item>
      <dc:creator>Jacob Walls</dc:creator>
      <pubDate>Sat, 20 Dec 2025 10:12:00 +0000</pubDate>
      <link>https://code.djangoproject.com/ticket/36814#comment:1</link>
      <guid isPermaLink="false">ticket-36814-1</guid>
      <description>&lt;p&gt;Looks like a &lt;em&gt;duplicate&lt;/em&gt; of #36790.&lt;/p&gt;</description>
    </item>
    <item>
      <dc:creator>dantyan</dc:creator>
      <pubDate>Tue, 23 Dec 2025 03:37:30 +0000</pubDate>
      <link>https://code.djangoproject.com/ticket/36814#comment:2</link>
      <guid isPermaLink="false">ticket-36814-2</guid>
      <description>&lt;p&gt;Agreed, closing.&lt;/p&gt;</description>
    </item>
  </channel>
</rss>"#;

const EMPTY_RSS: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<rss version="2.0"><channel><title>Ticket</title></channel></rss>"#;

async fn mount_ticket_page(server: &MockServer, ticket_id: u32, html: &str, rss: &str) {
    // The RSS mock carries the extra query matcher, so it must be mounted
    // first; the plain page request falls through to the HTML mock.
    Mock::given(method("GET"))
        .and(path(format!("/ticket/{ticket_id}")))
        .and(query_param("format", "rss"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(rss, "application/rss+xml"))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/ticket/{ticket_id}")))
        .respond_with(ResponseTemplate::new(200).set_body_string(html))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_get_ticket_assembles_record() {
    let server = MockServer::start().await;
    mount_ticket_page(&server, 36814, TICKET_HTML, COMMENT_RSS).await;

    let client = TracClient::new(&test_config(&server)).unwrap();
    let ticket = client.get_ticket(36814).await.unwrap();

    assert_eq!(ticket.id, 36814);
    assert_eq!(ticket.summary, "During migration rename of M2M field breaks");
    assert_eq!(ticket.reporter.as_deref(), Some("dantyan"));
    assert_eq!(ticket.owner, None); // empty string in old_values means unset
    assert_eq!(ticket.component.as_deref(), Some("Migrations"));
    assert_eq!(ticket.version.as_deref(), Some("6.0"));
    assert_eq!(ticket.severity.as_deref(), Some("Normal"));
    assert_eq!(ticket.status.as_deref(), Some("closed"));
    assert_eq!(ticket.resolution.as_deref(), Some("duplicate"));
    assert_eq!(ticket.keywords, vec!["migration", "manytomany"]);
    assert_eq!(ticket.triage_stage.as_deref(), Some("Unreviewed"));
    assert!(ticket.has_patch);
    assert_eq!(ticket.created.as_deref(), Some("Dec 20, 2025, 8:56:37 AM"));
    assert_eq!(
        ticket.last_modified.as_deref(),
        Some("Dec 23, 2025, 3:37:30 AM")
    );
    assert_eq!(
        ticket.description,
        "Renaming a ManyToManyField breaks.\nSecond paragraph."
    );

    assert_eq!(ticket.comments.len(), 2);
    assert_eq!(ticket.comments[0].author, "Jacob Walls");
    assert_eq!(ticket.comments[0].date, "Sat, 20 Dec 2025 10:12:00 +0000");
    assert_eq!(
        ticket.comments[0].content,
        "Looks like a duplicate of #36790."
    );
    assert_eq!(ticket.comments[1].author, "dantyan");
    assert_eq!(ticket.comments[1].content, "Agreed, closing.");
}

#[tokio::test]
async fn test_get_ticket_missing_fragments_degrade_to_defaults() {
    let server = MockServer::start().await;
    mount_ticket_page(
        &server,
        99,
        "<html><head><title>Django</title></head><body>unexpected markup</body></html>",
        EMPTY_RSS,
    )
    .await;

    let client = TracClient::new(&test_config(&server)).unwrap();
    let ticket = client.get_ticket(99).await.unwrap();

    // Still a complete record shape, with fields at their defaults
    assert_eq!(ticket.id, 99);
    assert_eq!(ticket.summary, "");
    assert_eq!(ticket.reporter, None);
    assert_eq!(ticket.status, None);
    assert!(ticket.keywords.is_empty());
    assert!(!ticket.has_patch);
    assert_eq!(ticket.created, None);
    assert_eq!(ticket.description, "");
    assert!(ticket.comments.is_empty());
}

#[tokio::test]
async fn test_get_ticket_fetch_failure_aborts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ticket/1"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = TracClient::new(&test_config(&server)).unwrap();
    let err = client.get_ticket(1).await.expect_err("404 must abort");
    assert!(matches!(
        err,
        Error::Fetch(FetchError::FatalStatus { status }) if status.as_u16() == 404
    ));
}

#[tokio::test]
async fn test_search_parses_listing() {
    let server = MockServer::start().await;
    let listing = r#"<html><body><dl id="results">
        <dt><a href="/ticket/36800">#36800: Migrations: Rename breaks FK (closed: duplicate)</a></dt>
        <dt><a href="/ticket/36801">#36801: Forms: Widget ignores attrs (new)</a></dt>
    </dl></body></html>"#;

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "rename migration"))
        .and(query_param("noquickjump", "1"))
        .and(query_param("ticket", "on"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing))
        .expect(1)
        .mount(&server)
        .await;

    let client = TracClient::new(&test_config(&server)).unwrap();
    let hits = client.search("rename migration", 20).await.unwrap();

    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].id, 36800);
    assert_eq!(hits[0].summary, "Rename breaks FK");
    assert_eq!(hits[0].status, "closed");
    assert_eq!(hits[0].resolution, "duplicate");
    assert_eq!(hits[1].id, 36801);
    assert_eq!(hits[1].status, "new");
    assert_eq!(hits[1].resolution, "");
}

#[tokio::test]
async fn test_search_no_results_block() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html><body>nothing</body></html>"))
        .mount(&server)
        .await;

    let client = TracClient::new(&test_config(&server)).unwrap();
    let hits = client.search("nothing at all", 20).await.unwrap();
    assert!(hits.is_empty());
}
