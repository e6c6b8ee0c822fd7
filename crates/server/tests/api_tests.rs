//! API integration tests.

use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use approx::assert_relative_eq;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use base64::Engine;
use rstest::rstest;
use serde_json::{json, Value};
use tower::ServiceExt;

use emotion_core::classification::domain::emotion_classifier::{
    ClassificationError, EmotionClassifier,
};
use emotion_core::classification::domain::emotion_distribution::EmotionDistribution;
use emotion_core::detection::domain::face_detector::{DetectionError, FaceDetector};
use emotion_core::normalization::face_patch::FacePatch;
use emotion_core::pipeline::model_context::ModelContext;
use emotion_core::shared::bounding_box::BoundingBox;
use emotion_core::shared::constants::MAX_IMAGE_DIMENSION;
use emotion_core::shared::raster_image::RasterImage;
use emotion_server::{create_router, AppState, ServerConfig};

const LABELS: [&str; 7] = ["angry", "disgust", "fear", "happy", "neutral", "sad", "surprise"];

// --- Stubs ---

/// Reports one centered face whenever the image is not a flat canvas.
struct ContrastDetector;

impl FaceDetector for ContrastDetector {
    fn detect(&self, gray: &RasterImage) -> Result<Vec<BoundingBox>, DetectionError> {
        let first = gray.data().first().copied();
        if gray.data().iter().all(|&v| Some(v) == first) {
            return Ok(Vec::new());
        }
        let (w, h) = (gray.width() as i32, gray.height() as i32);
        Ok(vec![BoundingBox::new(w / 4, h / 4, w / 2, h / 2)])
    }
}

/// Deterministic logits derived from the patch, so repeated requests on the
/// same image must agree.
struct PatchStatsClassifier;

impl EmotionClassifier for PatchStatsClassifier {
    fn classify(&self, patch: &FacePatch) -> Result<EmotionDistribution, ClassificationError> {
        let mean = patch.tensor().mean().unwrap_or(0.0);
        let logits: Vec<f32> = (0..7).map(|i| mean * i as f32 - (i as f32 - 3.0).abs()).collect();
        EmotionDistribution::from_scores(&logits)
    }
}

struct PanickingClassifier;

impl EmotionClassifier for PanickingClassifier {
    fn classify(&self, _patch: &FacePatch) -> Result<EmotionDistribution, ClassificationError> {
        panic!("classifier exploded");
    }
}

/// Sleeps while classifying and records how many calls overlapped.
#[derive(Default)]
struct SlowClassifier {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl EmotionClassifier for SlowClassifier {
    fn classify(&self, _patch: &FacePatch) -> Result<EmotionDistribution, ClassificationError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(50));
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        EmotionDistribution::from_scores(&[0.0; 7])
    }
}

// --- Helpers ---

fn app_with(models: ModelContext) -> Router {
    create_router(AppState::new(models, &ServerConfig::default()))
}

fn full_app() -> Router {
    app_with(ModelContext::new(
        Some(Arc::new(ContrastDetector)),
        Some(Arc::new(PatchStatsClassifier)),
    ))
}

fn encode_png(img: image::RgbImage) -> String {
    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

fn face_like_png() -> String {
    let img = image::RgbImage::from_fn(96, 96, |x, y| {
        let v = ((x * 7 + y * 3) % 256) as u8;
        image::Rgb([v, v / 2, 255 - v])
    });
    format!("data:image/png;base64,{}", encode_png(img))
}

fn blank_png() -> String {
    encode_png(image::RgbImage::from_pixel(96, 96, image::Rgb([128, 128, 128])))
}

fn post_json(uri: &str, body: String) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

async fn predict(app: Router, image: String) -> (StatusCode, Value) {
    send(app, post_json("/predict", json!({ "image": image }).to_string())).await
}

fn assert_error_body(body: &Value) {
    assert!(body["error"].as_str().is_some_and(|e| !e.is_empty()));
    assert_eq!(body["emotion"], "Error");
}

// --- Status endpoints ---

#[tokio::test]
async fn test_index_reports_loaded_models() {
    let (status, body) = send(full_app(), get("/")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "Emotion detection server is running");
    assert_eq!(body["model_loaded"], true);
    assert_eq!(body["cascade_loaded"], true);
    assert_eq!(body["endpoint"], "/predict");
}

#[tokio::test]
async fn test_health_is_consistent_with_index() {
    let partial = ModelContext::new(None, Some(Arc::new(PatchStatsClassifier)));

    let (_, index) = send(app_with(partial.clone()), get("/")).await;
    let (status, health) = send(app_with(partial), get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "ok");
    assert_eq!(index["model_loaded"], true);
    assert_eq!(health["model"], "loaded");
    assert_eq!(index["cascade_loaded"], false);
    assert_eq!(health["cascade"], "not loaded");
}

// --- Predict ---

#[tokio::test]
async fn test_face_is_classified() {
    let (status, body) = predict(full_app(), face_like_png()).await;
    assert_eq!(status, StatusCode::OK);

    let emotion = body["emotion"].as_str().unwrap();
    assert!(LABELS.contains(&emotion));

    let confidence = body["confidence"].as_f64().unwrap();
    assert!((0.0..=1.0).contains(&confidence));

    let all = body["all_predictions"].as_object().unwrap();
    let keys: Vec<&str> = all.keys().map(String::as_str).collect();
    let mut sorted_labels = LABELS.to_vec();
    sorted_labels.sort_unstable();
    let mut sorted_keys = keys.clone();
    sorted_keys.sort_unstable();
    assert_eq!(sorted_keys, sorted_labels);

    let total: f64 = all.values().map(|v| v.as_f64().unwrap()).sum();
    assert_relative_eq!(total, 1.0, epsilon = 1e-4);
    assert_relative_eq!(all[emotion].as_f64().unwrap(), confidence);
}

#[tokio::test]
async fn test_blank_canvas_has_no_face() {
    let (status, body) = predict(full_app(), blank_png()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "emotion": "No Face" }));
}

#[tokio::test]
async fn test_same_image_twice_is_identical() {
    let image = face_like_png();
    let (_, first) = predict(full_app(), image.clone()).await;
    let (_, second) = predict(full_app(), image).await;
    assert_eq!(first["emotion"], second["emotion"]);
    assert_eq!(first["all_predictions"], second["all_predictions"]);
}

#[tokio::test]
async fn test_missing_image_is_bad_request() {
    let (status, body) = send(full_app(), post_json("/predict", json!({ "picture": "x" }).to_string())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No image data provided");
    assert_eq!(body["emotion"], "Error");
}

#[rstest]
#[case::not_base64(json!({ "image": "this is not base64!!" }).to_string())]
#[case::not_an_image(
    json!({ "image": base64::engine::general_purpose::STANDARD.encode(b"plain text") }).to_string()
)]
#[case::image_too_large(
    json!({ "image": encode_png(image::RgbImage::new(MAX_IMAGE_DIMENSION + 1, 1)) }).to_string()
)]
#[case::empty_body(String::new())]
#[case::malformed_json("{\"image\":".to_string())]
#[case::non_string_image(json!({ "image": 42 }).to_string())]
#[tokio::test]
async fn test_bad_payload_is_bad_request(#[case] body: String) {
    let (status, body) = send(full_app(), post_json("/predict", body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_error_body(&body);
}

#[tokio::test]
async fn test_missing_classifier_is_reported_before_body_problems() {
    let app = app_with(ModelContext::new(Some(Arc::new(ContrastDetector)), None));
    let (status, body) = send(app, post_json("/predict", "{}".into())).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Model not loaded");
    assert_eq!(body["emotion"], "Error");
}

#[tokio::test]
async fn test_missing_cascade_is_server_error() {
    let app = app_with(ModelContext::new(None, Some(Arc::new(PatchStatsClassifier))));
    let (status, body) = predict(app, face_like_png()).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Face cascade not loaded");
}

#[tokio::test]
async fn test_classifier_panic_becomes_server_error() {
    let app = app_with(ModelContext::new(
        Some(Arc::new(ContrastDetector)),
        Some(Arc::new(PanickingClassifier)),
    ));
    let (status, body) = predict(app, face_like_png()).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_error_body(&body);
}

#[tokio::test]
async fn test_oversized_body_is_rejected_as_json() {
    let config = ServerConfig {
        max_body_bytes: 1024,
        ..ServerConfig::default()
    };
    let app = create_router(AppState::new(
        ModelContext::new(Some(Arc::new(ContrastDetector)), Some(Arc::new(PatchStatsClassifier))),
        &config,
    ));

    // Streamed body, caught while buffering.
    let (status, body) = send(app.clone(), post_json("/predict", "x".repeat(4096))).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_error_body(&body);

    // Declared length, caught before the handler runs.
    let mut request = post_json("/predict", "x".repeat(4096));
    request
        .headers_mut()
        .insert(header::CONTENT_LENGTH, header::HeaderValue::from_static("4096"));
    let (status, body) = send(app, request).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_error_body(&body);
}

#[tokio::test]
async fn test_wrong_method_is_json_error() {
    let (status, body) = send(full_app(), get("/predict")).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_error_body(&body);
}

#[tokio::test]
async fn test_predictions_respect_concurrency_limit() {
    let classifier = Arc::new(SlowClassifier::default());
    let config = ServerConfig {
        max_concurrent_predictions: Some(1),
        ..ServerConfig::default()
    };
    let app = create_router(AppState::new(
        ModelContext::new(Some(Arc::new(ContrastDetector)), Some(classifier.clone())),
        &config,
    ));

    let image = face_like_png();
    let handles: Vec<_> = (0..4)
        .map(|_| tokio::spawn(predict(app.clone(), image.clone())))
        .collect();
    for handle in handles {
        let (status, _) = handle.await.unwrap();
        assert_eq!(status, StatusCode::OK);
    }

    assert_eq!(classifier.peak.load(Ordering::SeqCst), 1);
}

// --- CORS ---

#[tokio::test]
async fn test_preflight_answers_ok_regardless_of_body() {
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/predict")
        .header(header::ORIGIN, "http://localhost:3000")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type, x-custom")
        .body(Body::from("garbage"))
        .unwrap();

    let response = full_app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_METHODS], "GET, POST, OPTIONS");
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_HEADERS], "content-type, x-custom");

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body, json!({ "status": "ok" }));
}

#[tokio::test]
async fn test_preflight_works_without_models() {
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/predict")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(app_with(ModelContext::default()), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_every_response_allows_any_origin() {
    for request in [
        get("/"),
        get("/health"),
        post_json("/predict", "{}".into()),
    ] {
        let response = full_app().oneshot(request).await.unwrap();
        assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    }
}
