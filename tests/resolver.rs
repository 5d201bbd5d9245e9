//! Integration tests for VideoResolver and VideoClient.
//!
//! Uses wiremock for the videos endpoint and an in-memory SQLite cache. Write
//! back goes through a QueuedScheduler so tests decide when it lands.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::{json, Value};
use vidmeta::cache::{CacheEntry, CacheStorage, SqliteStorage, StoreProvider};
use vidmeta::config::{ApiConfig, AuthConfig};
use vidmeta::scheduler::QueuedScheduler;
use vidmeta::youtube::{
  Credential, StaticCredentials, Video, VideoClient, VideoResolver, YOUTUBE_READONLY_SCOPE,
};
use vidmeta::AuthError;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

const VIDEOS_PATH: &str = "/youtube/v3/videos";

struct Fixture {
  resolver: VideoResolver,
  client: VideoClient,
  store: Arc<StoreProvider<SqliteStorage>>,
  scheduler: Arc<QueuedScheduler>,
}

fn video_json(id: &str) -> Value {
  json!({
    "kind": "youtube#video",
    "etag": format!("etag-{id}"),
    "id": id,
    "snippet": { "title": format!("Video {id}") },
    "contentDetails": { "duration": "PT1M" },
  })
}

fn video(id: &str) -> Video {
  serde_json::from_value(video_json(id)).unwrap()
}

fn requested_ids(request: &Request) -> Vec<String> {
  request
    .url
    .query_pairs()
    .find(|(k, _)| k == "id")
    .map(|(_, v)| v.split(',').map(String::from).collect())
    .unwrap_or_default()
}

/// Answers with one item per requested id.
fn echo(request: &Request) -> ResponseTemplate {
  let items: Vec<Value> = requested_ids(request).iter().map(|id| video_json(id)).collect();
  ResponseTemplate::new(200).set_body_json(json!({
    "kind": "youtube#videoListResponse",
    "items": items,
  }))
}

fn fixture_with(server: &MockServer, credential: Credential) -> Fixture {
  let api = ApiConfig {
    endpoint: format!("{}{}", server.uri(), VIDEOS_PATH),
    ..ApiConfig::default()
  };
  let credentials = Arc::new(StaticCredentials::new(credential));
  let client = VideoClient::new(&api, &AuthConfig::default(), credentials).expect("client");

  let store = Arc::new(StoreProvider::ready(
    SqliteStorage::open_in_memory().expect("in-memory store"),
  ));
  let scheduler = Arc::new(QueuedScheduler::new());
  let resolver = VideoResolver::new(client.clone(), Arc::clone(&store), scheduler.clone());

  Fixture {
    resolver,
    client,
    store,
    scheduler,
  }
}

fn fixture(server: &MockServer) -> Fixture {
  fixture_with(
    server,
    Credential::new("test-token", vec![YOUTUBE_READONLY_SCOPE.to_string()]),
  )
}

fn ids(n: usize) -> Vec<String> {
  (0..n).map(|i| format!("v{:03}", i)).collect()
}

#[tokio::test]
async fn test_get_fetches_once_then_serves_from_cache() {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path(VIDEOS_PATH))
    .and(query_param("id", "abc"))
    .and(query_param("part", "snippet,contentDetails"))
    .and(header("authorization", "Bearer test-token"))
    .respond_with(echo)
    .expect(1)
    .mount(&server)
    .await;

  let fx = fixture(&server);

  let first = fx.resolver.get("abc").await.unwrap();
  assert_eq!(first, Some(video("abc")));
  assert_eq!(fx.scheduler.pending(), 1);
  fx.scheduler.run_pending().await;

  let second = fx.resolver.get("abc").await.unwrap();
  assert_eq!(second, Some(video("abc")));
  assert_eq!(fx.scheduler.pending(), 0);
}

#[tokio::test]
async fn test_get_before_write_back_fetches_again() {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path(VIDEOS_PATH))
    .respond_with(echo)
    .expect(2)
    .mount(&server)
    .await;

  let fx = fixture(&server);

  fx.resolver.get("abc").await.unwrap();
  fx.resolver.get("abc").await.unwrap();
  assert_eq!(fx.scheduler.pending(), 2);
}

#[tokio::test]
async fn test_get_missing_video_is_not_cached() {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path(VIDEOS_PATH))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": [] })))
    .expect(2)
    .mount(&server)
    .await;

  let fx = fixture(&server);

  assert!(fx.resolver.get("gone").await.unwrap().is_none());
  fx.scheduler.run_pending().await;
  assert!(fx.resolver.get("gone").await.unwrap().is_none());
  assert_eq!(fx.scheduler.pending(), 0);
}

#[tokio::test]
async fn test_get_malformed_response_is_absent() {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path(VIDEOS_PATH))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": "nope" })))
    .mount(&server)
    .await;

  let fx = fixture(&server);

  let result = fx.resolver.get("abc").await.expect("degrades, not an error");
  assert!(result.is_none());
}

#[tokio::test]
async fn test_get_server_error_is_absent() {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path(VIDEOS_PATH))
    .respond_with(
      ResponseTemplate::new(403)
        .set_body_json(json!({ "error": { "code": 403, "message": "quota" } })),
    )
    .mount(&server)
    .await;

  let fx = fixture(&server);

  assert!(fx.resolver.get("abc").await.unwrap().is_none());
  assert_eq!(fx.scheduler.pending(), 0);
}

#[tokio::test]
async fn test_fetch_many_chunks_by_fifty() {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path(VIDEOS_PATH))
    .respond_with(echo)
    .expect(3)
    .mount(&server)
    .await;

  let fx = fixture(&server);
  let input = ids(120);

  let fetched = fx.client.fetch_many(&input).await.unwrap();
  let fetched_ids: Vec<String> = fetched.iter().map(|(id, _)| id.clone()).collect();
  assert_eq!(fetched_ids, input);

  let requests = server.received_requests().await.unwrap();
  let mut chunks: Vec<Vec<String>> = requests.iter().map(requested_ids).collect();
  assert!(chunks.iter().all(|c| c.len() <= 50));
  chunks.sort();
  assert_eq!(chunks, input.chunks(50).map(|c| c.to_vec()).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_fetch_many_requests_chunks_concurrently() {
  let server = MockServer::start().await;
  let delay = Duration::from_millis(500);
  Mock::given(method("GET"))
    .and(path(VIDEOS_PATH))
    .respond_with(move |request: &Request| echo(request).set_delay(delay))
    .expect(3)
    .mount(&server)
    .await;

  let fx = fixture(&server);
  let input = ids(150);

  let started = Instant::now();
  let fetched = fx.client.fetch_many(&input).await.unwrap();
  let elapsed = started.elapsed();

  assert_eq!(fetched.len(), 150);
  assert!(elapsed >= delay);
  assert!(
    elapsed < delay * 2,
    "three chunks took {:?}, expected about one delay of {:?}",
    elapsed,
    delay
  );
}

#[tokio::test]
async fn test_fetch_many_empty_skips_authorization() {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .respond_with(echo)
    .expect(0)
    .mount(&server)
    .await;

  let fx = fixture_with(&server, Credential::default());

  let fetched = fx.client.fetch_many(&[]).await.expect("no credential needed");
  assert!(fetched.is_empty());
}

#[tokio::test]
async fn test_get_many_keeps_item_without_etag() {
  let server = MockServer::start().await;
  let raw = json!({ "kind": "youtube#video", "id": "a", "snippet": null });
  Mock::given(method("GET"))
    .and(path(VIDEOS_PATH))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": [raw.clone()] })))
    .mount(&server)
    .await;

  let fx = fixture(&server);

  let result = fx.resolver.get_many(&["a".to_string()]).await.unwrap();
  assert_eq!(serde_json::to_value(&result["a"]).unwrap(), raw);

  fx.scheduler.run_pending().await;
  let store = fx.store.handle().await.unwrap();
  let cached = store.get::<Video>("a").unwrap().expect("written back");
  assert_eq!(serde_json::to_value(&cached.data).unwrap(), raw);
}

#[tokio::test]
async fn test_fetch_many_isolates_failed_chunk() {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path(VIDEOS_PATH))
    .respond_with(|request: &Request| {
      if requested_ids(request).contains(&"v050".to_string()) {
        ResponseTemplate::new(500).set_body_string("backend unavailable")
      } else {
        echo(request)
      }
    })
    .expect(3)
    .mount(&server)
    .await;

  let fx = fixture(&server);
  let input = ids(120);

  let result = fx.resolver.get_many(&input).await.expect("no error for a failed chunk");

  assert_eq!(result.len(), 70);
  assert!(input[..50].iter().all(|id| result.contains_key(id)));
  assert!(input[50..100].iter().all(|id| !result.contains_key(id)));
  assert!(input[100..].iter().all(|id| result.contains_key(id)));
}

#[tokio::test]
async fn test_fetch_many_drops_items_without_id() {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path(VIDEOS_PATH))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({
      "items": [
        video_json("a"),
        { "kind": "youtube#video", "etag": "x" },
        { "kind": "youtube#video", "etag": "y", "id": 7 },
      ]
    })))
    .mount(&server)
    .await;

  let fx = fixture(&server);

  let fetched = fx
    .client
    .fetch_many(&["a".to_string(), "b".to_string()])
    .await
    .unwrap();
  assert_eq!(fetched, vec![("a".to_string(), video("a"))]);
}

#[tokio::test]
async fn test_get_many_merges_cache_hits_with_fetched() {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path(VIDEOS_PATH))
    .and(query_param("id", "b"))
    .respond_with(echo)
    .expect(1)
    .mount(&server)
    .await;

  let fx = fixture(&server);
  let store = fx.store.handle().await.unwrap();
  store.put(&CacheEntry::new(video("a"), 1)).unwrap();

  let result = fx
    .resolver
    .get_many(&["a".to_string(), "b".to_string()])
    .await
    .unwrap();

  assert_eq!(result.len(), 2);
  assert_eq!(result["a"], video("a"));
  assert_eq!(result["b"], video("b"));

  // Nothing is persisted until the write-back runs
  assert!(store.get::<Video>("b").unwrap().is_none());
  assert_eq!(fx.scheduler.pending(), 1);
  fx.scheduler.run_pending().await;

  let b = store.get::<Video>("b").unwrap().expect("b written back");
  assert_eq!(b.data, video("b"));
  assert!(b.timestamp > 1);

  // The cache hit was not rewritten
  assert_eq!(store.get::<Video>("a").unwrap().unwrap().timestamp, 1);
}

#[tokio::test]
async fn test_get_many_all_cached_skips_network() {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .respond_with(echo)
    .expect(0)
    .mount(&server)
    .await;

  let fx = fixture(&server);
  let store = fx.store.handle().await.unwrap();
  store
    .put_many(&[CacheEntry::new(video("a"), 1), CacheEntry::new(video("b"), 1)])
    .unwrap();

  let result = fx
    .resolver
    .get_many(&["a".to_string(), "b".to_string(), "a".to_string()])
    .await
    .unwrap();

  assert_eq!(result.len(), 2);
  assert_eq!(fx.scheduler.pending(), 0);
}

#[tokio::test]
async fn test_get_many_omits_unknown_ids() {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path(VIDEOS_PATH))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": [video_json("a")] })))
    .mount(&server)
    .await;

  let fx = fixture(&server);

  let result = fx
    .resolver
    .get_many(&["a".to_string(), "private".to_string()])
    .await
    .unwrap();

  assert_eq!(result.len(), 1);
  assert!(!result.contains_key("private"));
}

#[tokio::test]
async fn test_missing_scope_fails_without_network_or_writes() {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .respond_with(echo)
    .expect(0)
    .mount(&server)
    .await;

  let fx = fixture_with(
    &server,
    Credential::new(
      "test-token",
      vec!["https://www.googleapis.com/auth/youtube.upload".to_string()],
    ),
  );

  let err = fx.resolver.get("abc").await.unwrap_err();
  assert!(matches!(
    err.downcast_ref::<AuthError>(),
    Some(AuthError::MissingScope { .. })
  ));

  let err = fx
    .resolver
    .get_many(&["abc".to_string(), "def".to_string()])
    .await
    .unwrap_err();
  assert!(matches!(
    err.downcast_ref::<AuthError>(),
    Some(AuthError::MissingScope { .. })
  ));

  assert_eq!(fx.scheduler.pending(), 0);
}

#[tokio::test]
async fn test_missing_token_fails() {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .respond_with(echo)
    .expect(0)
    .mount(&server)
    .await;

  let fx = fixture_with(
    &server,
    Credential {
      token: None,
      granted_scopes: vec![YOUTUBE_READONLY_SCOPE.to_string()],
    },
  );

  let err = fx.client.fetch_one("abc").await.unwrap_err();
  assert_eq!(err.downcast_ref::<AuthError>(), Some(&AuthError::MissingToken));
  assert_eq!(fx.scheduler.pending(), 0);
}

#[tokio::test]
async fn test_try_fetch_one_reports_failure_reason() {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path(VIDEOS_PATH))
    .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
    .mount(&server)
    .await;

  let fx = fixture(&server);

  let outcome = fx.client.try_fetch_one("abc").await.unwrap();
  assert!(!outcome.is_success());
  assert!(matches!(
    outcome,
    vidmeta::youtube::FetchOutcome::Failure(vidmeta::FetchFailure::InvalidJson(_))
  ));
}
