mod common;

use assert2::{check, let_assert};
use common::{MockDocs, PAYLOAD, THIRD_CANDIDATE, VERSION};
use std::sync::Arc;
use std::time::{Duration, Instant};
use stddoc_mcp::search::search;
use stddoc_mcp::{FetchError, Fetcher, PipelineError, Resolver};
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

fn client() -> reqwest::Client {
    stddoc_mcp::http::new_client(Duration::from_secs(5)).unwrap()
}

// --- Resolution ---

#[tokio::test(flavor = "multi_thread")]
async fn resolver_returns_first_existing_candidate() {
    let docs = MockDocs::start().await;

    Mock::given(method("HEAD"))
        .and(path("/search-index.js"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&docs.server)
        .await;
    docs.mount_head(THIRD_CANDIDATE, 200).await;
    Mock::given(method("HEAD"))
        .and(path("/search-index-std.js"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&docs.server)
        .await;

    let resolver = Resolver::from_config(client(), &docs.config).unwrap();
    let url = resolver.resolve(VERSION).await.unwrap();

    check!(url.as_str() == docs.url(THIRD_CANDIDATE));
}

#[tokio::test(flavor = "multi_thread")]
async fn resolver_lists_every_attempt_when_nothing_exists() {
    let docs = MockDocs::start().await;

    let resolver = Resolver::from_config(client(), &docs.config).unwrap();
    let_assert!(Err(err) = resolver.resolve(VERSION).await);

    let expected: Vec<String> = docs
        .config
        .candidates
        .iter()
        .map(|c| format!("{}{}", docs.root(), c.replace("{version}", VERSION)))
        .collect();
    check!(err.version == VERSION);
    check!(err.attempted == expected);
    check!(err.attempted.len() == 11);
}

#[tokio::test(flavor = "multi_thread")]
async fn resolver_moves_on_after_candidate_timeout() {
    let mut docs = MockDocs::start().await;
    docs.config.probe_timeout_ms = 200;

    Mock::given(method("HEAD"))
        .and(path("/search-index.js"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .expect(1)
        .mount(&docs.server)
        .await;
    docs.mount_head(THIRD_CANDIDATE, 200).await;

    let resolver = Resolver::from_config(client(), &docs.config).unwrap();
    let started = Instant::now();
    let url = resolver.resolve(VERSION).await.unwrap();

    check!(url.as_str() == docs.url(THIRD_CANDIDATE));
    check!(started.elapsed() < Duration::from_secs(2));
}

// --- Fetching ---

#[tokio::test(flavor = "multi_thread")]
async fn fetch_reports_network_cause() {
    let fetcher = Fetcher::new(client(), 1024);
    // Nothing listens on port 1.
    let url = reqwest::Url::parse("http://127.0.0.1:1/search-index.js").unwrap();

    let_assert!(Err(FetchError::Network { url: failed, cause }) = fetcher.fetch(&url).await);
    check!(failed == url.as_str());
    check!(!cause.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn fetch_rejects_error_status() {
    let docs = MockDocs::start().await;
    docs.mount_get(THIRD_CANDIDATE, ResponseTemplate::new(500)).await;

    let fetcher = Fetcher::new(client(), docs.config.max_payload_bytes);
    let url = reqwest::Url::parse(&docs.url(THIRD_CANDIDATE)).unwrap();

    let_assert!(Err(FetchError::Status { status, .. }) = fetcher.fetch(&url).await);
    check!(status == 500);
}

#[tokio::test(flavor = "multi_thread")]
async fn fetch_enforces_payload_limit() {
    let docs = MockDocs::start().await;
    docs.mount_get(THIRD_CANDIDATE, ResponseTemplate::new(200).set_body_string(PAYLOAD))
        .await;

    let fetcher = Fetcher::new(client(), 64);
    let url = reqwest::Url::parse(&docs.url(THIRD_CANDIDATE)).unwrap();

    let_assert!(Err(FetchError::TooLarge { limit, .. }) = fetcher.fetch(&url).await);
    check!(limit == 64);
}

#[tokio::test(flavor = "multi_thread")]
async fn fetch_rejects_non_utf8_body() {
    let docs = MockDocs::start().await;
    docs.mount_get(
        THIRD_CANDIDATE,
        ResponseTemplate::new(200).set_body_bytes(vec![b'[', 0xff, 0xfe, b']']),
    )
    .await;

    let fetcher = Fetcher::new(client(), docs.config.max_payload_bytes);
    let url = reqwest::Url::parse(&docs.url(THIRD_CANDIDATE)).unwrap();

    let_assert!(Err(FetchError::Body { .. }) = fetcher.fetch(&url).await);
}

// --- Pipeline ---

#[tokio::test(flavor = "multi_thread")]
async fn pipeline_decodes_resolved_index() {
    let docs = MockDocs::with_index().await;
    let state = docs.state();

    let index = state.get_index(VERSION).await.unwrap();

    check!(index.stats.crates == 2);
    check!(index.stats.items == 9);
    check!(index.stats.unresolvable == 1);
    check!(index.items[2].path == "std::collections::hash_map::HashMap");
    check!(
        index.items[2].url
            == format!("{}std/collections/hash_map/struct.HashMap.html", docs.root())
    );
    check!(index.items[7].url == format!("{}std/index.html#macro.println", docs.root()));
    check!(state.resolved_url(VERSION).await.map(|u| u.to_string()) == Some(docs.url(THIRD_CANDIDATE)));
}

#[tokio::test(flavor = "multi_thread")]
async fn decoded_records_are_well_formed() {
    let docs = MockDocs::with_index().await;
    let index = docs.state().get_index(VERSION).await.unwrap();

    check!(!index.items.is_empty());
    for item in &index.items {
        check!(!item.name.is_empty());
        check!(item.path.ends_with(item.name.as_str()));
        let_assert!(Ok(url) = reqwest::Url::parse(&item.url), "{}", item.url);
        check!(url.as_str().starts_with(docs.root()));
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn pipeline_result_is_cached() {
    let docs = MockDocs::start().await;
    Mock::given(method("HEAD"))
        .and(path(THIRD_CANDIDATE))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&docs.server)
        .await;
    Mock::given(method("GET"))
        .and(path(THIRD_CANDIDATE))
        .respond_with(ResponseTemplate::new(200).set_body_string(PAYLOAD))
        .expect(1)
        .mount(&docs.server)
        .await;

    let state = docs.state();
    let first = state.get_index(VERSION).await.unwrap();
    let second = state.get_index(VERSION).await.unwrap();

    check!(Arc::ptr_eq(&first, &second));
    check!(state.is_cached(&docs.url(THIRD_CANDIDATE)).await);
}

#[tokio::test(flavor = "multi_thread")]
async fn refresh_fetches_again() {
    let docs = MockDocs::start().await;
    docs.mount_head(THIRD_CANDIDATE, 200).await;
    Mock::given(method("GET"))
        .and(path(THIRD_CANDIDATE))
        .respond_with(ResponseTemplate::new(200).set_body_string(PAYLOAD))
        .expect(2)
        .mount(&docs.server)
        .await;

    let state = docs.state();
    let first = state.get_index(VERSION).await.unwrap();
    let refreshed = state.refresh(VERSION).await.unwrap();

    check!(!Arc::ptr_eq(&first, &refreshed));
    check!(first == refreshed);
}

#[tokio::test(flavor = "multi_thread")]
async fn refresh_does_not_join_running_pipeline() {
    let docs = MockDocs::start().await;
    docs.mount_head(THIRD_CANDIDATE, 200).await;
    Mock::given(method("GET"))
        .and(path(THIRD_CANDIDATE))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(PAYLOAD)
                .set_delay(Duration::from_millis(400)),
        )
        .expect(2)
        .mount(&docs.server)
        .await;

    let state = docs.state();
    let preload = tokio::spawn({
        let state = Arc::clone(&state);
        async move { state.get_index(VERSION).await }
    });
    tokio::time::sleep(Duration::from_millis(150)).await;
    check!(state.is_loading(&docs.url(THIRD_CANDIDATE)).await);

    let refreshed = state.refresh(VERSION).await.unwrap();
    let preloaded = preload.await.unwrap().unwrap();
    check!(!Arc::ptr_eq(&preloaded, &refreshed));

    // Only the refreshed result is cached.
    let cached = state.get_index(VERSION).await.unwrap();
    check!(Arc::ptr_eq(&cached, &refreshed));
    check!(!state.is_loading(&docs.url(THIRD_CANDIDATE)).await);
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_callers_share_one_pipeline() {
    let docs = MockDocs::start().await;
    Mock::given(method("HEAD"))
        .and(path("/search-index.js"))
        .respond_with(ResponseTemplate::new(404).set_delay(Duration::from_millis(100)))
        .expect(1)
        .mount(&docs.server)
        .await;
    Mock::given(method("HEAD"))
        .and(path(THIRD_CANDIDATE))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&docs.server)
        .await;
    Mock::given(method("GET"))
        .and(path(THIRD_CANDIDATE))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(PAYLOAD)
                .set_delay(Duration::from_millis(300)),
        )
        .expect(1)
        .mount(&docs.server)
        .await;

    let state = docs.state();
    let (a, b, c) = tokio::join!(
        state.get_index(VERSION),
        state.get_index(VERSION),
        state.get_index(VERSION)
    );

    let (a, b, c) = (a.unwrap(), b.unwrap(), c.unwrap());
    check!(Arc::ptr_eq(&a, &b));
    check!(Arc::ptr_eq(&b, &c));
    check!(!state.is_loading(&docs.url(THIRD_CANDIDATE)).await);
}

#[tokio::test(flavor = "multi_thread")]
async fn decode_failure_is_not_cached() {
    let docs = MockDocs::start().await;
    docs.mount_head(THIRD_CANDIDATE, 200).await;
    Mock::given(method("GET"))
        .and(path(THIRD_CANDIDATE))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(r#"searchIndex["std"] = [alert(1)];"#),
        )
        .expect(2)
        .mount(&docs.server)
        .await;

    let state = docs.state();
    let_assert!(Err(PipelineError::Decode(err)) = state.get_index(VERSION).await);
    check!(err.reason.contains("executable content"));

    let_assert!(Err(PipelineError::Decode(_)) = state.get_index(VERSION).await);
    check!(!state.is_cached(&docs.url(THIRD_CANDIDATE)).await);
}

#[tokio::test(flavor = "multi_thread")]
async fn fetch_failure_surfaces_through_pipeline() {
    let docs = MockDocs::start().await;
    docs.mount_head(THIRD_CANDIDATE, 200).await;
    docs.mount_get(THIRD_CANDIDATE, ResponseTemplate::new(503)).await;

    let state = docs.state();
    let_assert!(
        Err(PipelineError::Fetch(FetchError::Status { status, url })) =
            state.get_index(VERSION).await
    );
    check!(status == 503);
    check!(url == docs.url(THIRD_CANDIDATE));
}

// --- Session ---

#[tokio::test(flavor = "multi_thread")]
async fn session_load_publishes_items() {
    let docs = MockDocs::with_index().await;
    let session = docs.session();

    let before = session.snapshot().await;
    check!(before.items().is_empty());
    check!(!before.loading);

    let snapshot = session.load_now().await;
    check!(!snapshot.loading);
    check!(snapshot.error.is_none());
    check!(snapshot.items().len() == 9);

    let paths: Vec<&str> = search(snapshot.items(), "vec")
        .into_iter()
        .map(|i| i.path.as_str())
        .collect();
    check!(paths == vec!["std::vec", "std::vec::Vec", "std::vec::VecDeque"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn session_records_resolution_error() {
    let docs = MockDocs::start().await;
    let session = docs.session();

    let snapshot = session.load_now().await;
    check!(!snapshot.loading);
    check!(snapshot.items().is_empty());
    let_assert!(Some(PipelineError::Resolution(err)) = &snapshot.error);
    check!(err.attempted.len() == docs.config.candidates.len());
}

#[tokio::test(flavor = "multi_thread")]
async fn session_keeps_previous_items_when_refresh_fails() {
    let docs = MockDocs::with_index().await;
    let session = docs.session();
    check!(session.load_now().await.items().len() == 9);

    docs.server.reset().await;
    session.refresh().await.await.unwrap();

    let snapshot = session.snapshot().await;
    check!(snapshot.items().len() == 9);
    let_assert!(Some(PipelineError::Resolution(_)) = snapshot.error);
}

#[tokio::test(flavor = "multi_thread")]
async fn session_events_update_favorites_and_recents() {
    let docs = MockDocs::with_index().await;
    let session = docs.session();
    let snapshot = session.load_now().await;
    let hash_map = snapshot.items()[2].clone();
    let swap = snapshot.items()[6].clone();

    check!(session.toggle_favorite(&hash_map).await.unwrap());
    check!(session.is_favorite(&hash_map.url).await);
    check!(session.favorites().await == vec![hash_map.clone()]);

    session.item_opened(&hash_map).await.unwrap();
    session.item_opened(&swap).await.unwrap();
    check!(session.recents().await == vec![swap.clone(), hash_map.clone()]);

    check!(!session.toggle_favorite(&hash_map).await.unwrap());
    check!(session.favorites().await.is_empty());
    check!(session.find_item(&swap.url).await == Some(swap));
}

#[tokio::test(flavor = "multi_thread")]
async fn dropped_session_discards_late_result() {
    let docs = MockDocs::start().await;
    docs.mount_head(THIRD_CANDIDATE, 200).await;
    docs.mount_get(
        THIRD_CANDIDATE,
        ResponseTemplate::new(200)
            .set_body_string(PAYLOAD)
            .set_delay(Duration::from_millis(200)),
    )
    .await;

    let state = docs.state();
    let session = stddoc_mcp::DocSession::new(
        Arc::clone(&state),
        VERSION,
        Arc::new(stddoc_mcp::MemoryStore::new()),
    )
    .unwrap();

    let handle = session.load().await;
    drop(session);
    handle.await.unwrap();

    // The pipeline itself still finished and was cached for the next session,
    // and the cache holds the only reference: the dropped session kept nothing.
    check!(state.is_cached(&docs.url(THIRD_CANDIDATE)).await);
    let index = state.get_index(VERSION).await.unwrap();
    check!(Arc::strong_count(&index) == 2);
}
