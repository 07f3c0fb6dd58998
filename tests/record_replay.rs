//! Integration tests for record-replay cycle

mod common;

use std::path::Path;

use bytes::Bytes;
use tempfile::TempDir;

use common::{get, post, snapshot, StubTransport};
use rewind::matcher::UrlMatch;
use rewind::storage;
use rewind::{
    Config, Interceptor, MatchPolicy, Method, Mode, Request, Response, RewindError, Session,
};

fn open(path: &Path, mode: Mode) -> Interceptor {
    Interceptor::new(Session::open(&Config::new(path, mode)).unwrap())
}

fn requests() -> Vec<hyper::Request<Bytes>> {
    vec![
        get("http://api.example.com/users?page=1"),
        post("http://api.example.com/users", Bytes::from_static(b"{\"name\":\"ada\"}")),
        post("http://api.example.com/audio", Bytes::from(vec![0u8, 255, 1, 254, 0, 0])),
        get("http://api.example.com/binary"),
        get("http://api.example.com/empty"),
        get("http://api.example.com/cookies"),
    ]
}

#[tokio::test]
async fn test_record_then_replay_is_byte_identical() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("round_trip.yaml");

    // Phase 1: Record mode
    let transport = StubTransport::new();
    let recording = open(&path, Mode::Record);
    let mut live = Vec::new();
    for request in requests() {
        let response = recording.handle(request, &transport).await.unwrap();
        live.push(snapshot(&response));
    }
    let report = recording.finish().await.unwrap();
    assert_eq!(report.recorded, live.len());
    assert_eq!(transport.calls(), live.len());

    // Phase 2: Replay mode
    let offline = StubTransport::new();
    let replaying = open(&path, Mode::Replay);
    for (request, expected) in requests().into_iter().zip(&live) {
        let response = replaying.handle(request, &offline).await.unwrap();
        assert_eq!(&snapshot(&response), expected);
    }

    let report = replaying.finish().await.unwrap();
    assert_eq!(report.replayed, live.len());
    assert!(report.unconsumed.is_empty());
    assert!(!report.saved);
    assert_eq!(offline.calls(), 0, "replay must not touch the network");
}

#[tokio::test]
async fn test_status_scenario() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("status.yaml");

    let mut cassette = rewind::Cassette::create_empty(Mode::Record);
    cassette.push(
        Request::new(Method::Get, "http://localhost/status").unwrap(),
        Response::new(200, "ok"),
    );
    storage::save(&path, &cassette).unwrap();

    let transport = StubTransport::new();
    let interceptor = open(&path, Mode::Replay);

    let response = interceptor
        .handle(get("http://localhost/status"), &transport)
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.body().as_ref(), b"ok");

    let err = interceptor
        .handle(get("http://localhost/other"), &transport)
        .await
        .unwrap_err();
    assert!(matches!(err, RewindError::NoMatchingInteraction { .. }));
    assert_eq!(transport.calls(), 0);
}

#[tokio::test]
async fn test_sequential_out_of_order_fails_on_first_deviation() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("sequential.yaml");
    let transport = StubTransport::new();

    let recording = open(&path, Mode::Record);
    for url in ["http://h/a", "http://h/b", "http://h/c"] {
        recording.handle(get(url), &transport).await.unwrap();
    }
    recording.finish().await.unwrap();

    let replaying = open(&path, Mode::Replay);
    replaying.handle(get("http://h/a"), &transport).await.unwrap();

    // `/c` is recorded, but `/b` comes first
    let err = replaying
        .handle(get("http://h/c"), &transport)
        .await
        .unwrap_err();
    match err {
        RewindError::NoMatchingInteraction { url, .. } => assert_eq!(url, "http://h/c"),
        other => panic!("expected NoMatchingInteraction, got {other:?}"),
    }

    // The failed request consumed nothing
    replaying.handle(get("http://h/b"), &transport).await.unwrap();
    replaying.handle(get("http://h/c"), &transport).await.unwrap();
    assert_eq!(transport.calls(), 3);
}

#[tokio::test]
async fn test_any_order_replay() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("any_order.yaml");
    let transport = StubTransport::new();

    let recording = open(&path, Mode::Record);
    for url in ["http://h/a", "http://h/b", "http://h/c"] {
        recording.handle(get(url), &transport).await.unwrap();
    }
    recording.finish().await.unwrap();

    let config = Config::new(&path, Mode::Replay)
        .with_matching(MatchPolicy::default().any_order());
    let replaying = Interceptor::new(Session::open(&config).unwrap());

    for url in ["http://h/c", "http://h/a", "http://h/b"] {
        let response = replaying.handle(get(url), &transport).await.unwrap();
        let expected = format!("GET {url} (0 bytes)");
        assert_eq!(response.body().as_ref(), expected.as_bytes());
    }

    // Each interaction replays at most once
    assert!(replaying
        .handle(get("http://h/a"), &transport)
        .await
        .unwrap_err()
        .is_no_match());
}

#[tokio::test]
async fn test_record_if_missing_fills_gap() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("gap.yaml");
    let transport = StubTransport::new();

    // Cassette holds `/one` and `/three`; `/two` was never recorded
    let recording = open(&path, Mode::Record);
    recording.handle(get("http://h/one"), &transport).await.unwrap();
    recording.handle(get("http://h/three"), &transport).await.unwrap();
    recording.finish().await.unwrap();
    assert_eq!(transport.calls(), 2);

    let filling = open(&path, Mode::RecordIfMissing);
    for url in ["http://h/one", "http://h/two", "http://h/three"] {
        let response = filling.handle(get(url), &transport).await.unwrap();
        assert_eq!(response.body().as_ref(), format!("GET {url} (0 bytes)").as_bytes());
    }
    let report = filling.finish().await.unwrap();

    assert_eq!(transport.calls(), 3, "only the missing request is forwarded");
    assert_eq!(report.replayed, 2);
    assert_eq!(report.recorded, 1);
    assert!(report.unconsumed.is_empty());

    let cassette = storage::load(&path).unwrap();
    let indices: Vec<u64> = cassette.interactions().iter().map(|i| i.order_index).collect();
    assert_eq!(indices, vec![0, 1, 2]);
    assert_eq!(cassette.interactions()[2].request.url, "http://h/two");
}

#[tokio::test]
async fn test_record_if_missing_creates_cassette() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("fresh.yaml");
    let transport = StubTransport::new();

    let interceptor = open(&path, Mode::RecordIfMissing);
    interceptor.handle(get("http://h/new"), &transport).await.unwrap();
    interceptor.finish().await.unwrap();

    assert_eq!(storage::load(&path).unwrap().len(), 1);

    // Second run replays without the network
    let offline = StubTransport::new();
    let interceptor = open(&path, Mode::RecordIfMissing);
    interceptor.handle(get("http://h/new"), &offline).await.unwrap();
    interceptor.finish().await.unwrap();
    assert_eq!(offline.calls(), 0);
}

#[tokio::test]
async fn test_record_appends_to_existing_cassette() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("append.yaml");
    let transport = StubTransport::new();

    for url in ["http://h/first", "http://h/second"] {
        let interceptor = open(&path, Mode::Record);
        interceptor.handle(get(url), &transport).await.unwrap();
        interceptor.finish().await.unwrap();
    }

    let cassette = storage::load(&path).unwrap();
    assert_eq!(cassette.len(), 2);
    assert_eq!(cassette.interactions()[1].order_index, 1);
    assert_eq!(cassette.interactions()[1].request.url, "http://h/second");
}

#[tokio::test]
async fn test_unconsumed_interactions_reported() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("leftover.yaml");
    let transport = StubTransport::new();

    let recording = open(&path, Mode::Record);
    recording.handle(get("http://h/a"), &transport).await.unwrap();
    recording.handle(get("http://h/b"), &transport).await.unwrap();
    recording.finish().await.unwrap();

    let lenient = open(&path, Mode::Replay);
    lenient.handle(get("http://h/a"), &transport).await.unwrap();
    assert_eq!(lenient.finish().await.unwrap().unconsumed, vec![1]);

    let strict_config = Config::new(&path, Mode::Replay).strict(true);
    let strict = Interceptor::new(Session::open(&strict_config).unwrap());
    strict.handle(get("http://h/a"), &transport).await.unwrap();
    assert!(matches!(
        strict.finish().await,
        Err(RewindError::UnconsumedInteractions { count: 1, .. })
    ));
}

#[tokio::test]
async fn test_ignore_query_policy_end_to_end() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("query.yaml");
    let transport = StubTransport::new();

    let recording = open(&path, Mode::Record);
    recording
        .handle(get("http://h/search?q=rust&ts=1"), &transport)
        .await
        .unwrap();
    recording.finish().await.unwrap();

    let config = Config::new(&path, Mode::Replay)
        .with_matching(MatchPolicy::default().with_url(UrlMatch::IgnoreQuery));
    let replaying = Interceptor::new(Session::open(&config).unwrap());
    let response = replaying
        .handle(get("http://h/search?q=rust&ts=2"), &transport)
        .await
        .unwrap();

    assert_eq!(response.body().as_ref(), b"GET http://h/search?q=rust&ts=1 (0 bytes)");
}

#[tokio::test]
async fn test_redacted_header_not_persisted() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("secret.yaml");
    let transport = StubTransport::new();

    let config = Config::new(&path, Mode::Record).redact_headers(["Authorization"]);
    let interceptor = Interceptor::new(Session::open(&config).unwrap());
    let request = hyper::Request::builder()
        .uri("http://h/me")
        .header("Authorization", "Bearer hunter2")
        .body(Bytes::new())
        .unwrap();
    interceptor.handle(request, &transport).await.unwrap();
    interceptor.finish().await.unwrap();

    let document = std::fs::read_to_string(&path).unwrap();
    assert!(!document.contains("hunter2"));
    assert!(document.contains("[REDACTED]"));
}

#[tokio::test]
async fn test_corrupt_cassette_fails_before_any_request() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("corrupt.yaml");
    std::fs::write(&path, "version: 1\nmode: record\ncreated_at: 0\ninteractions: 12\n").unwrap();

    for mode in [Mode::Replay, Mode::RecordIfMissing, Mode::Record] {
        assert!(matches!(
            Session::open(&Config::new(&path, mode)),
            Err(RewindError::CorruptCassette { .. })
        ));
    }
}

#[tokio::test]
async fn test_replay_keeps_http_version() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("h2.yaml");

    let h2 = rewind::next_fn(|_req: hyper::Request<Bytes>| async {
        hyper::Response::builder()
            .version(hyper::Version::HTTP_2)
            .status(200)
            .body(Bytes::from_static(b"over h2"))
            .map_err(|e| RewindError::Other(e.to_string()))
    });

    let recording = open(&path, Mode::Record);
    let live = recording.handle(get("http://h/h2"), &h2).await.unwrap();
    recording.finish().await.unwrap();
    assert_eq!(live.version(), hyper::Version::HTTP_2);

    let replaying = open(&path, Mode::Replay);
    let replayed = replaying
        .handle(get("http://h/h2"), &StubTransport::new())
        .await
        .unwrap();
    assert_eq!(replayed.version(), live.version());
    assert_eq!(snapshot(&replayed), snapshot(&live));
}
