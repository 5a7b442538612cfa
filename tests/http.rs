use axum::{extract::Query, http::StatusCode, routing::get, Json, Router};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use iss_tracker::config::Config;
use iss_tracker::server::{build_router, AppState};

const SAMPLE: &str = include_str!("fixtures/iss_sample.xml");
const SINGLE: &str = include_str!("fixtures/iss_single.xml");
const SINGLE_EPOCH: &str = "2023-048T12:00:00.000Z";

async fn spawn(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

/// Longer than any client timeout the harness configures.
const STALL: Duration = Duration::from_secs(3);

/// Upstream that serves `body`, a 500 while `failing` is set, or stalls
/// past the client timeout while `stalled` is set.
async fn mock_upstream(
    body: &'static str,
    failing: Arc<AtomicBool>,
    stalled: Arc<AtomicBool>,
) -> String {
    let app = Router::new().route(
        "/feed.xml",
        get(move || {
            let failing = failing.clone();
            let stalled = stalled.clone();
            async move {
                if stalled.load(Ordering::SeqCst) {
                    tokio::time::sleep(STALL).await;
                }
                if failing.load(Ordering::SeqCst) {
                    (StatusCode::INTERNAL_SERVER_ERROR, "upstream down".to_string())
                } else {
                    (StatusCode::OK, body.to_string())
                }
            }
        }),
    );
    format!("{}/feed.xml", spawn(app).await)
}

#[derive(Clone, Copy)]
enum GeoMode {
    Place,
    Ocean,
    Broken,
    /// Answers like `Place`, but only after the client has given up.
    Stalled,
}

async fn mock_geocoder(mode: GeoMode) -> String {
    let app = Router::new().route(
        "/reverse",
        get(move |Query(params): Query<HashMap<String, String>>| async move {
            if let GeoMode::Stalled = mode {
                tokio::time::sleep(STALL).await;
            }
            match mode {
                GeoMode::Place | GeoMode::Stalled => (
                    StatusCode::OK,
                    Json(json!({
                        "display_name": "Test Place",
                        "lat": params.get("lat"),
                        "lon": params.get("lon"),
                        "zoom": params.get("zoom"),
                        "language": params.get("accept-language"),
                        "format": params.get("format"),
                    })),
                ),
                GeoMode::Ocean => (StatusCode::OK, Json(json!({ "error": "Unable to geocode" }))),
                GeoMode::Broken => (
                    StatusCode::SERVICE_UNAVAILABLE,
                    Json(json!({ "message": "overloaded" })),
                ),
            }
        }),
    );
    spawn(app).await
}

struct Harness {
    base: String,
    client: reqwest::Client,
    upstream_failing: Arc<AtomicBool>,
    upstream_stalled: Arc<AtomicBool>,
}

impl Harness {
    async fn start(feed: &'static str, mode: GeoMode) -> Self {
        Self::start_with_timeout(feed, mode, 5).await
    }

    /// Starts with `timeout_secs` for both the upstream and geocoder clients.
    async fn start_with_timeout(feed: &'static str, mode: GeoMode, timeout_secs: u64) -> Self {
        let upstream_failing = Arc::new(AtomicBool::new(false));
        let upstream_stalled = Arc::new(AtomicBool::new(false));
        let mut config = Config::minimal();
        config.upstream.url =
            mock_upstream(feed, upstream_failing.clone(), upstream_stalled.clone()).await;
        config.upstream.timeout_secs = timeout_secs;
        config.geocode.base_url = mock_geocoder(mode).await;
        config.geocode.timeout_secs = timeout_secs;

        let state = AppState::from_config(&config).unwrap();
        let base = spawn(build_router(state)).await;
        Self {
            base,
            client: reqwest::Client::new(),
            upstream_failing,
            upstream_stalled,
        }
    }

    async fn get(&self, path: &str) -> (StatusCode, String) {
        let resp = self
            .client
            .get(format!("{}{}", self.base, path))
            .send()
            .await
            .unwrap();
        let status = StatusCode::from_u16(resp.status().as_u16()).unwrap();
        (status, resp.text().await.unwrap())
    }

    async fn get_json(&self, path: &str) -> (StatusCode, Value) {
        let (status, body) = self.get(path).await;
        let json = serde_json::from_str(&body)
            .unwrap_or_else(|e| panic!("non-JSON body for {}: {} ({})", path, body, e));
        (status, json)
    }

    async fn load(&self) -> (StatusCode, String) {
        let resp = self
            .client
            .post(format!("{}/post-data", self.base))
            .send()
            .await
            .unwrap();
        let status = StatusCode::from_u16(resp.status().as_u16()).unwrap();
        (status, resp.text().await.unwrap())
    }

    async fn reset(&self) -> (StatusCode, String) {
        let resp = self
            .client
            .delete(format!("{}/delete-data", self.base))
            .send()
            .await
            .unwrap();
        let status = StatusCode::from_u16(resp.status().as_u16()).unwrap();
        (status, resp.text().await.unwrap())
    }
}

fn assert_error(body: &Value, code: &str) {
    assert_eq!(body["error"]["code"], code, "unexpected body: {}", body);
    assert!(body["error"]["message"].is_string());
}

#[tokio::test]
async fn test_empty_store_reports_unavailable() {
    let h = Harness::start(SINGLE, GeoMode::Place).await;

    let (status, body) = h.get_json("/epochs").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_error(&body, "dataset_unavailable");
    assert_eq!(body["error"]["message"], "The data set does not exist yet!");
}

#[tokio::test]
async fn test_load_single_record_and_compute_speed() {
    let h = Harness::start(SINGLE, GeoMode::Place).await;

    let (status, text) = h.load().await;
    assert_eq!(status, StatusCode::OK);
    assert!(text.contains("Successfully reloaded"));

    let (status, body) = h.get_json("/epochs").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([SINGLE_EPOCH]));

    let (status, body) = h.get_json(&format!("/epochs/{}/speed", SINGLE_EPOCH)).await;
    assert_eq!(status, StatusCode::OK);
    let value = body["speed"]["value"].as_f64().unwrap();
    assert!((value - 5.0).abs() < 1e-9);
    assert_eq!(body["speed"]["units"], "km/s");
}

#[tokio::test]
async fn test_epoch_slicing() {
    let h = Harness::start(SAMPLE, GeoMode::Place).await;
    h.load().await;

    let (_, all) = h.get_json("/epochs").await;
    assert_eq!(all.as_array().unwrap().len(), 4);
    assert_eq!(all[0], "2023-061T12:00:00.000Z");

    let (status, body) = h.get_json("/epochs?limit=2&offset=1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!(["2023-061T12:04:00.000Z", "2023-061T12:08:00.000Z"]));

    let (status, body) = h.get_json("/epochs?offset=100").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));

    let (status, body) = h.get_json("/epochs?limit=abc").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_error(&body, "bad_request");
    assert!(body["error"]["message"].as_str().unwrap().contains("limit"));

    let (status, body) = h.get_json("/epochs?offset=-3").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]["message"].as_str().unwrap().contains("offset"));
}

#[tokio::test]
async fn test_repeated_query_parameter_is_bad_request() {
    let h = Harness::start(SAMPLE, GeoMode::Place).await;
    h.load().await;

    let (status, body) = h.get_json("/epochs?limit=1&limit=2").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_error(&body, "bad_request");
    assert!(body["error"]["message"].as_str().unwrap().contains("limit"));

    let (status, body) = h.get_json("/epochs?offset=1&offset=2").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_error(&body, "bad_request");

    // Unknown keys are ignored.
    let (status, body) = h.get_json("/epochs?limit=1&format=xml").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!(["2023-061T12:00:00.000Z"]));
}

#[tokio::test]
async fn test_single_epoch_lookup() {
    let h = Harness::start(SAMPLE, GeoMode::Place).await;
    h.load().await;

    let (status, body) = h.get_json("/epochs/2023-061T12:04:00.000Z").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["EPOCH"], "2023-061T12:04:00.000Z");
    assert_eq!(body["X"]["units"], "km");
    assert_eq!(body["X_DOT"]["units"], "km/s");

    let (status, body) = h.get_json("/epochs/2023-061T12:05:00.000Z").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_error(&body, "not_found");
}

#[tokio::test]
async fn test_reset_makes_everything_unavailable() {
    let h = Harness::start(SAMPLE, GeoMode::Place).await;
    h.load().await;

    let (status, text) = h.reset().await;
    assert_eq!(status, StatusCode::OK);
    assert!(text.contains("Successfully deleted"));

    for path in [
        "/",
        "/comment",
        "/header",
        "/metadata",
        "/epochs",
        "/epochs/2023-061T12:00:00.000Z",
        "/epochs/2023-061T12:00:00.000Z/speed",
        "/epochs/2023-061T12:00:00.000Z/location",
        "/now",
    ] {
        let (status, body) = h.get_json(path).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE, "path {}", path);
        assert_error(&body, "dataset_unavailable");
    }
}

#[tokio::test]
async fn test_document_sections() {
    let h = Harness::start(SAMPLE, GeoMode::Place).await;
    h.load().await;

    let (status, body) = h.get_json("/header").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ORIGINATOR"], "JSC");

    let (_, body) = h.get_json("/metadata").await;
    assert_eq!(body["OBJECT_NAME"], "ISS");
    assert_eq!(body["STOP_TIME"], "2023-076T12:00:00.000Z");

    let (_, body) = h.get_json("/comment").await;
    assert_eq!(body.as_array().unwrap().len(), 3);

    let (status, body) = h.get_json("/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["stateVector"].as_array().unwrap().len(), 4);
    assert_eq!(body["header"]["CREATION_DATE"], "2023-062T01:41:41.434Z");
}

#[tokio::test]
async fn test_missing_section_is_empty() {
    let h = Harness::start(SINGLE, GeoMode::Place).await;
    h.load().await;

    let (status, body) = h.get_json("/comment").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_error(&body, "dataset_empty");
    assert_eq!(body["error"]["message"], "The data is empty!");
}

#[tokio::test]
async fn test_location_with_geocoded_place() {
    let h = Harness::start(SINGLE, GeoMode::Place).await;
    h.load().await;

    let (status, body) = h
        .get_json(&format!("/epochs/{}/location", SINGLE_EPOCH))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["Epoch"], SINGLE_EPOCH);

    let location = &body["Location"];
    assert!(location["latitude"].as_f64().unwrap().abs() < 1e-9);
    assert!((location["longitude"].as_f64().unwrap() - 32.0).abs() < 1e-9);
    assert!(location["altitude"]["value"].as_f64().unwrap().abs() < 1e-9);
    assert_eq!(location["altitude"]["units"], "km");

    assert_eq!(body["geo"]["display_name"], "Test Place");
    assert_eq!(body["geo"]["zoom"], "10");
    assert_eq!(body["geo"]["language"], "en");
    assert_eq!(body["geo"]["format"], "jsonv2");

    assert!((body["speed"]["value"].as_f64().unwrap() - 5.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_location_over_ocean() {
    let h = Harness::start(SINGLE, GeoMode::Ocean).await;
    h.load().await;

    let (status, body) = h
        .get_json(&format!("/epochs/{}/location", SINGLE_EPOCH))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["geo"], "The ISS must be over an ocean...");
}

#[tokio::test]
async fn test_geocoder_failure_is_reported() {
    let h = Harness::start(SINGLE, GeoMode::Broken).await;
    h.load().await;

    let (status, body) = h
        .get_json(&format!("/epochs/{}/location", SINGLE_EPOCH))
        .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_error(&body, "geocode_error");
}

#[tokio::test]
async fn test_geocoder_timeout_is_reported() {
    let h = Harness::start_with_timeout(SINGLE, GeoMode::Stalled, 1).await;
    let (status, _) = h.load().await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = h
        .get_json(&format!("/epochs/{}/location", SINGLE_EPOCH))
        .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_error(&body, "geocode_error");

    // Speed does not touch the geocoder.
    let (status, _) = h.get_json(&format!("/epochs/{}/speed", SINGLE_EPOCH)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_now_returns_nearest_epoch() {
    let h = Harness::start(SAMPLE, GeoMode::Ocean).await;
    h.load().await;

    // Every fixture epoch is in the past, so the latest one is nearest.
    let (status, body) = h.get_json("/now").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["Epoch"], "2023-061T12:12:00.000Z");
    assert!(body["Location"]["altitude"]["value"].as_f64().unwrap() > 300.0);
    assert_eq!(body["speed"]["units"], "km/s");
}

#[tokio::test]
async fn test_failed_reload_keeps_previous_dataset() {
    let h = Harness::start(SAMPLE, GeoMode::Place).await;
    let (status, _) = h.load().await;
    assert_eq!(status, StatusCode::OK);

    h.upstream_failing.store(true, Ordering::SeqCst);
    let (status, body) = h.load().await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    let body: Value = serde_json::from_str(&body).unwrap();
    assert_error(&body, "upstream_fetch");

    let (status, body) = h.get_json("/epochs").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn test_upstream_timeout_keeps_previous_dataset() {
    let h = Harness::start_with_timeout(SAMPLE, GeoMode::Place, 1).await;
    let (status, _) = h.load().await;
    assert_eq!(status, StatusCode::OK);
    let (_, before) = h.get_json("/").await;

    h.upstream_stalled.store(true, Ordering::SeqCst);
    let (status, body) = h.load().await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    let body: Value = serde_json::from_str(&body).unwrap();
    assert_error(&body, "upstream_fetch");

    let (status, after) = h.get_json("/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(after, before);
    let (_, epochs) = h.get_json("/epochs").await;
    assert_eq!(epochs.as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn test_upstream_timeout_on_first_load_leaves_store_absent() {
    let h = Harness::start_with_timeout(SAMPLE, GeoMode::Place, 1).await;
    h.upstream_stalled.store(true, Ordering::SeqCst);

    let (status, body) = h.load().await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    let body: Value = serde_json::from_str(&body).unwrap();
    assert_error(&body, "upstream_fetch");

    let (status, body) = h.get_json("/epochs").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_error(&body, "dataset_unavailable");
}

#[tokio::test]
async fn test_unparsable_feed_is_parse_error() {
    let h = Harness::start("<html><body>maintenance</body></html>", GeoMode::Place).await;

    let (status, body) = h.load().await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    let body: Value = serde_json::from_str(&body).unwrap();
    assert_error(&body, "upstream_parse");

    let (status, _) = h.get_json("/epochs").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_help_and_health() {
    let h = Harness::start(SINGLE, GeoMode::Place).await;

    let (status, text) = h.get("/help").await;
    assert_eq!(status, StatusCode::OK);
    assert!(text.starts_with("usage:"));
    for route in ["/epochs/<epoch>/speed", "/epochs/<epoch>/location", "/now", "/post-data"] {
        assert!(text.contains(route), "help text missing {}", route);
    }

    let (status, body) = h.get_json("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}
