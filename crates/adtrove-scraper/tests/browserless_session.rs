//! Integration tests for `BrowserlessSession`.
//!
//! Uses `wiremock` to stand in for the Browserless `/function` endpoint so no
//! browser or network access is needed.

use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use adtrove_scraper::{
    BrowserlessConfig, BrowserlessSession, CollectorConfig, CreativeCollector, PageSession,
    ScraperError, StopReason,
};

fn test_config(server: &MockServer, max_retries: u32) -> BrowserlessConfig {
    BrowserlessConfig {
        base_url: server.uri(),
        token: Some("test-token".to_string()),
        library_url: "https://www.facebook.com/ads/library/".to_string(),
        page_timeout_secs: 5,
        max_retries,
        backoff_base_secs: 0,
    }
}

fn creatives_json(refs: &[&str]) -> serde_json::Value {
    let creatives: Vec<_> = refs
        .iter()
        .map(|r| json!({ "imageRef": r, "altText": format!("alt {r}"), "textSnippets": ["Sponsored"] }))
        .collect();
    json!({ "creatives": creatives })
}

// ---------------------------------------------------------------------------
// Happy paths
// ---------------------------------------------------------------------------

#[tokio::test]
async fn extract_posts_function_with_token_and_parses_creatives() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/function"))
        .and(query_param("token", "test-token"))
        .and(body_partial_json(json!({ "context": { "scrolls": 0 } })))
        .respond_with(ResponseTemplate::new(200).set_body_json(creatives_json(&["img-1", "img-2"])))
        .expect(1)
        .mount(&server)
        .await;

    let mut session =
        BrowserlessSession::new(&test_config(&server, 0), "Acme").expect("build session");
    let observations = session.extract().await.expect("extract");

    assert_eq!(observations.len(), 2);
    assert_eq!(observations[0].image_ref, "img-1");
    assert_eq!(observations[0].alt_text.as_deref(), Some("alt img-1"));
    assert_eq!(observations[1].text_snippets, vec!["Sponsored"]);
}

#[tokio::test]
async fn load_more_deepens_scroll_for_next_extract() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/function"))
        .and(body_partial_json(json!({ "context": { "scrolls": 2 } })))
        .respond_with(ResponseTemplate::new(200).set_body_json(creatives_json(&["img-9"])))
        .expect(1)
        .mount(&server)
        .await;

    let mut session =
        BrowserlessSession::new(&test_config(&server, 0), "Acme").expect("build session");
    session.load_more().await.expect("load more");
    session.load_more().await.expect("load more");
    assert_eq!(session.scroll_depth(), 2);

    let observations = session.extract().await.expect("extract");
    assert_eq!(observations[0].image_ref, "img-9");
}

#[tokio::test]
async fn missing_fields_in_creatives_default_to_empty() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/function"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "creatives": [{ "imageRef": "x" }] })),
        )
        .mount(&server)
        .await;

    let mut session =
        BrowserlessSession::new(&test_config(&server, 0), "Acme").expect("build session");
    let observations = session.extract().await.expect("extract");

    assert_eq!(observations[0].alt_text, None);
    assert!(observations[0].text_snippets.is_empty());
}

#[tokio::test]
async fn collector_converges_against_browserless() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/function"))
        .respond_with(ResponseTemplate::new(200).set_body_json(creatives_json(&["img-1"])))
        .expect(3)
        .mount(&server)
        .await;

    let mut session =
        BrowserlessSession::new(&test_config(&server, 0), "Acme").expect("build session");
    let mut collector = CreativeCollector::new(CollectorConfig {
        max_passes: 10,
        stagnant_threshold: 2,
        settle_delay: std::time::Duration::ZERO,
        pass_timeout: std::time::Duration::from_secs(5),
    });

    let summary = collector.run(&mut session).await.expect("collect");

    assert_eq!(summary.stop_reason, StopReason::Converged);
    assert_eq!(summary.unique_creatives, 1);
}

// ---------------------------------------------------------------------------
// Error paths
// ---------------------------------------------------------------------------

#[tokio::test]
async fn library_page_without_creatives_fails_collection() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/function"))
        .respond_with(ResponseTemplate::new(200).set_body_json(creatives_json(&[])))
        .expect(2)
        .mount(&server)
        .await;

    let mut session =
        BrowserlessSession::new(&test_config(&server, 0), "Acme").expect("build session");
    let mut collector = CreativeCollector::new(CollectorConfig {
        max_passes: 10,
        stagnant_threshold: 2,
        settle_delay: std::time::Duration::ZERO,
        pass_timeout: std::time::Duration::from_secs(5),
    });

    let err = collector
        .run(&mut session)
        .await
        .expect_err("empty library page should fail");

    assert!(
        matches!(err, ScraperError::CollectionTimeout { passes: 2, .. }),
        "got: {err:?}"
    );
}

#[tokio::test]
async fn retries_after_503_and_succeeds() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/function"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/function"))
        .respond_with(ResponseTemplate::new(200).set_body_json(creatives_json(&["img-1"])))
        .mount(&server)
        .await;

    let mut session =
        BrowserlessSession::new(&test_config(&server, 1), "Acme").expect("build session");
    let observations = session.extract().await.expect("extract after retry");

    assert_eq!(observations.len(), 1);
}

#[tokio::test]
async fn rate_limit_is_returned_after_exhausting_retries() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/function"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
        .expect(2) // 1 initial + 1 retry
        .mount(&server)
        .await;

    let mut session =
        BrowserlessSession::new(&test_config(&server, 1), "Acme").expect("build session");
    let err = session.extract().await.expect_err("should be rate limited");

    assert!(
        matches!(err, ScraperError::RateLimited { retry_after_secs: 0, .. }),
        "got: {err:?}"
    );
}

#[tokio::test]
async fn unauthorized_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/function"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad token"))
        .expect(1)
        .mount(&server)
        .await;

    let mut session =
        BrowserlessSession::new(&test_config(&server, 3), "Acme").expect("build session");
    let err = session.extract().await.expect_err("should fail");

    match err {
        ScraperError::UnexpectedStatus { status, body, url } => {
            assert_eq!(status, 401);
            assert_eq!(body, "bad token");
            assert!(!url.contains("test-token"), "token leaked into error: {url}");
        }
        other => panic!("expected UnexpectedStatus, got: {other:?}"),
    }
}

#[tokio::test]
async fn malformed_body_is_a_deserialize_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/function"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let mut session =
        BrowserlessSession::new(&test_config(&server, 0), "Acme").expect("build session");
    let err = session.extract().await.expect_err("should fail");

    assert!(matches!(err, ScraperError::Deserialize { .. }), "got: {err:?}");
}

#[tokio::test]
async fn first_pass_failure_fails_collection() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/function"))
        .respond_with(ResponseTemplate::new(400))
        .mount(&server)
        .await;

    let mut session =
        BrowserlessSession::new(&test_config(&server, 0), "Acme").expect("build session");
    let mut collector = CreativeCollector::new(CollectorConfig::default());

    let err = collector.run(&mut session).await.expect_err("should fail");
    assert!(matches!(err, ScraperError::CollectionTimeout { .. }));
}
