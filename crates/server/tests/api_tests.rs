//! Integration tests for the HTTP API endpoints

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use diabetes_api::api::{cors_layer, create_router, AppState};
use predict_lib::{ClassifierHandle, PredictionService, ServiceMetrics, StructuredLogger};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tower::ServiceExt;

const FRONTEND_ORIGIN: &str = "http://localhost:3000";

fn reference_model_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("models/logistic_model.json")
}

fn reference_handle() -> ClassifierHandle {
    let handle = ClassifierHandle::load(&reference_model_path(), None);
    assert!(handle.is_loaded(), "reference model should load: {:?}", handle);
    handle
}

async fn setup_test_app(handle: ClassifierHandle) -> Router {
    let service = PredictionService::new(
        handle,
        ServiceMetrics::new(),
        StructuredLogger::new("test-instance"),
    );
    let state = Arc::new(AppState::new(service));
    let cors = cors_layer(&[FRONTEND_ORIGIN.to_string()]).unwrap();
    create_router(state, cors)
}

fn sample_record() -> Value {
    json!({
        "Pregnancies": 6,
        "Glucose": 148,
        "BloodPressure": 72,
        "SkinThickness": 35,
        "Insulin": 0,
        "BMI": 33.6,
        "DiabetesPedigreeFunction": 0.627,
        "Age": 50
    })
}

fn predict_request(body: &Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/api/predict")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn test_status_returns_ok() {
    let app = setup_test_app(reference_handle()).await;

    let (status, body) = send(
        app,
        Request::builder().uri("/api/").body(Body::empty()).unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok"}));
}

#[tokio::test]
async fn test_status_ok_without_classifier() {
    let app = setup_test_app(ClassifierHandle::unloaded("model file not found")).await;

    let (status, body) = send(
        app,
        Request::builder().uri("/api/").body(Body::empty()).unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok"}));
}

#[tokio::test]
async fn test_predict_reference_record() {
    let app = setup_test_app(reference_handle()).await;

    let (status, body) = send(app, predict_request(&sample_record())).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_diabetic"], 1);

    let z: f64 = -8.4047
        + 0.1232 * 6.0
        + 0.0351 * 148.0
        - 0.0133 * 72.0
        + 0.0006 * 35.0
        - 0.0012 * 0.0
        + 0.0897 * 33.6
        + 0.9452 * 0.627
        + 0.0149 * 50.0;
    let expected = 1.0 / (1.0 + (-z).exp());
    let probability = body["probability"].as_f64().unwrap();
    assert!((probability - expected).abs() < 1e-9);
    assert!(probability > 0.70 && probability < 0.74);
}

#[tokio::test]
async fn test_predict_is_deterministic() {
    let app = setup_test_app(reference_handle()).await;

    let (_, first) = send(app.clone(), predict_request(&sample_record())).await;
    let (_, second) = send(app, predict_request(&sample_record())).await;

    assert_eq!(first, second);
}

#[tokio::test]
async fn test_predict_results_are_in_range() {
    let app = setup_test_app(reference_handle()).await;

    let records = [
        json!({"Pregnancies": 1, "Glucose": 85, "BloodPressure": 66, "SkinThickness": 29,
               "Insulin": 0, "BMI": 26.6, "DiabetesPedigreeFunction": 0.351, "Age": 31}),
        json!({"Pregnancies": 0, "Glucose": 0, "BloodPressure": 0, "SkinThickness": 0,
               "Insulin": 0, "BMI": 0, "DiabetesPedigreeFunction": 0, "Age": 0}),
        json!({"Pregnancies": 17, "Glucose": 199, "BloodPressure": 122, "SkinThickness": 99,
               "Insulin": 846, "BMI": 67.1, "DiabetesPedigreeFunction": 2.42, "Age": 81}),
        json!({"Pregnancies": -1e6, "Glucose": 1e9, "BloodPressure": 0.5, "SkinThickness": 3,
               "Insulin": 2, "BMI": 1, "DiabetesPedigreeFunction": 0, "Age": 1}),
    ];

    for record in &records {
        let (status, body) = send(app.clone(), predict_request(record)).await;
        assert_eq!(status, StatusCode::OK);

        let label = body["is_diabetic"].as_i64().unwrap();
        let probability = body["probability"].as_f64().unwrap();
        assert!(label == 0 || label == 1);
        assert!((0.0..=1.0).contains(&probability));
    }
}

#[tokio::test]
async fn test_predict_accepts_numeric_strings() {
    let app = setup_test_app(reference_handle()).await;

    let mut record = sample_record();
    record["Glucose"] = json!("148");
    record["BMI"] = json!("33.6");

    let (status, with_strings) = send(app.clone(), predict_request(&record)).await;
    let (_, with_numbers) = send(app, predict_request(&sample_record())).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(with_strings, with_numbers);
}

#[tokio::test]
async fn test_predict_missing_field_is_validation_error() {
    for field in predict_lib::FEATURE_NAMES {
        let app = setup_test_app(reference_handle()).await;

        let mut record = sample_record();
        record.as_object_mut().unwrap().remove(field);

        let (status, body) = send(app, predict_request(&record)).await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "field {}", field);
        assert_eq!(body["detail"][0]["type"], "missing");
        assert_eq!(body["detail"][0]["loc"], json!(["body", field]));
    }
}

#[tokio::test]
async fn test_predict_non_numeric_field_is_validation_error() {
    let app = setup_test_app(reference_handle()).await;

    let mut record = sample_record();
    record["Age"] = json!("fifty");

    let (status, body) = send(app, predict_request(&record)).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["detail"][0]["type"], "float_parsing");
    assert_eq!(body["detail"][0]["loc"], json!(["body", "Age"]));
}

#[tokio::test]
async fn test_predict_malformed_json_is_validation_error() {
    let app = setup_test_app(reference_handle()).await;

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/predict")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"Pregnancies\": 6,"))
        .unwrap();
    let (status, body) = send(app, request).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["detail"][0]["type"], "json_invalid");
}

#[tokio::test]
async fn test_predict_body_without_content_type_is_read_as_json() {
    let app = setup_test_app(reference_handle()).await;

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/predict")
        .body(Body::from(sample_record().to_string()))
        .unwrap();
    let (status, body) = send(app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_diabetic"], 1);
}

#[tokio::test]
async fn test_predict_content_type_handling() {
    let app = setup_test_app(reference_handle()).await;

    let with_charset = Request::builder()
        .method(Method::POST)
        .uri("/api/predict")
        .header(header::CONTENT_TYPE, "application/json; charset=utf-8")
        .body(Body::from(sample_record().to_string()))
        .unwrap();
    let (status, _) = send(app.clone(), with_charset).await;
    assert_eq!(status, StatusCode::OK);

    let plain_text = Request::builder()
        .method(Method::POST)
        .uri("/api/predict")
        .header(header::CONTENT_TYPE, "text/plain")
        .body(Body::from(sample_record().to_string()))
        .unwrap();
    let (status, body) = send(app, plain_text).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["detail"][0]["type"], "json_invalid");
}

#[tokio::test]
async fn test_predict_without_classifier_returns_500() {
    let app = setup_test_app(ClassifierHandle::unloaded("model file not found")).await;

    let (status, body) = send(app, predict_request(&sample_record())).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"detail": "Model not loaded on server"}));
}

#[tokio::test]
async fn test_predict_without_classifier_still_validates() {
    let app = setup_test_app(ClassifierHandle::unloaded("model file not found")).await;

    let (status, _) = send(app, predict_request(&json!({"Glucose": 148}))).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_checksum_mismatch_leaves_service_without_classifier() {
    let wrong_digest = "ab".repeat(32);
    let handle = ClassifierHandle::load(&reference_model_path(), Some(&wrong_digest));
    assert!(!handle.is_loaded());
    let app = setup_test_app(handle).await;

    let (status, body) = send(app, predict_request(&sample_record())).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["detail"], "Model not loaded on server");
}

#[tokio::test]
async fn test_linear_svc_artifact_reports_fallback_probability() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("svc.json");
    std::fs::write(
        &path,
        json!({
            "kind": "linear_svc",
            "classes": [0, 1],
            "coefficients": [0.0, 0.02, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
            "intercept": -2.0
        })
        .to_string(),
    )
    .unwrap();
    let app = setup_test_app(ClassifierHandle::load(&path, None)).await;

    let (status, body) = send(app, predict_request(&sample_record())).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"is_diabetic": 1, "probability": 0.5}));
}

#[tokio::test]
async fn test_healthz_reports_unloaded_classifier() {
    let app = setup_test_app(ClassifierHandle::unloaded("model file not found")).await;

    let (status, body) = send(
        app,
        Request::builder().uri("/healthz").body(Body::empty()).unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "unhealthy");
    assert_eq!(body["components"]["classifier"]["status"], "unhealthy");
    assert_eq!(
        body["components"]["classifier"]["message"],
        "model file not found"
    );
}

#[tokio::test]
async fn test_readyz_depends_on_classifier() {
    let loaded = setup_test_app(reference_handle()).await;
    let (status, body) = send(
        loaded,
        Request::builder().uri("/readyz").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ready"], true);

    let unloaded = setup_test_app(ClassifierHandle::unloaded("missing")).await;
    let (status, body) = send(
        unloaded,
        Request::builder().uri("/readyz").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["ready"], false);
}

#[tokio::test]
async fn test_metrics_endpoint_returns_prometheus_format() {
    let app = setup_test_app(reference_handle()).await;

    let (status, _) = send(app.clone(), predict_request(&sample_record())).await;
    assert_eq!(status, StatusCode::OK);

    let response = app
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers().get("content-type").unwrap();
    assert!(content_type.to_str().unwrap().contains("text/plain"));

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let metrics_text = String::from_utf8(body.to_vec()).unwrap();

    assert!(metrics_text.contains("diabetes_api_predictions_total"));
    assert!(metrics_text.contains("diabetes_api_prediction_latency_seconds_bucket"));
}

#[tokio::test]
async fn test_cors_allows_configured_origin() {
    let app = setup_test_app(reference_handle()).await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/")
                .header(header::ORIGIN, FRONTEND_ORIGIN)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let headers = response.headers();
    assert_eq!(
        headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        FRONTEND_ORIGIN
    );
    assert_eq!(
        headers.get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS).unwrap(),
        "true"
    );
}

#[tokio::test]
async fn test_cors_rejects_unlisted_origin() {
    let app = setup_test_app(reference_handle()).await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/")
                .header(header::ORIGIN, "https://evil.example")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert!(response
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .is_none());
}

#[tokio::test]
async fn test_cors_preflight_mirrors_request() {
    let app = setup_test_app(reference_handle()).await;

    let response = app
        .oneshot(
            Request::builder()
                .method(Method::OPTIONS)
                .uri("/api/predict")
                .header(header::ORIGIN, FRONTEND_ORIGIN)
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(
        headers.get(header::ACCESS_CONTROL_ALLOW_METHODS).unwrap(),
        "POST"
    );
    assert_eq!(
        headers.get(header::ACCESS_CONTROL_ALLOW_HEADERS).unwrap(),
        "content-type"
    );
}

#[test]
fn test_cors_wildcard_origin_is_a_config_error() {
    let err = cors_layer(&[FRONTEND_ORIGIN.to_string(), "*".to_string()]).unwrap_err();
    assert!(err.to_string().contains("Wildcard origin"));

    assert!(cors_layer(&["not a header\n".to_string()]).is_err());
}
