mod common;

use chrono::Local;
use common::{png_bytes, state_with, FixedClass};
use httpmock::prelude::*;
use nutriscan::domain::model::ResponseStatus;
use nutriscan::domain::ports::{ImageUpload, PredictionService, Storage};
use nutriscan::report::{default_report_filename, render_report, ReportDetails};
use nutriscan::{
    construct_router, AppError, HttpPredictionClient, ImageVerdict, LocalStorage, NumericVerdict,
    RawBiometrics, ScreeningSession,
};
use tempfile::TempDir;

fn upload() -> ImageUpload {
    ImageUpload {
        filename: "child.png".to_string(),
        mime_type: "image/png".to_string(),
        bytes: png_bytes(),
    }
}

async fn spawn_server(score: f32, class_index: i64) -> String {
    let app = construct_router(state_with(score, FixedClass::new(class_index), false), 1024 * 1024);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}/PredictFull", addr)
}

#[tokio::test]
async fn test_end_to_end_screening_against_real_server() {
    let endpoint = spawn_server(0.2, 1).await;
    let session = ScreeningSession::new(HttpPredictionClient::new(endpoint).unwrap());
    let biometrics = RawBiometrics::new("Male", "2", "80.5", "9.8");

    let outcome = session.run(&upload(), Some(&biometrics)).await.unwrap();

    assert_eq!(outcome.initial.status(), ResponseStatus::Incomplete);
    assert_eq!(outcome.initial.image_prediction(), Some(ImageVerdict::Malnourished));

    let detailed = outcome.final_response();
    assert_eq!(detailed.status(), ResponseStatus::Success);
    assert_eq!(detailed.numeric_prediction(), Some(NumericVerdict::Stunted));
    assert_eq!(detailed.advice(), Some(NumericVerdict::Stunted.advice()));
}

#[tokio::test]
async fn test_end_to_end_normal_image_and_pdf_export() {
    let endpoint = spawn_server(0.9, 0).await;
    let session = ScreeningSession::new(HttpPredictionClient::new(endpoint).unwrap());

    let outcome = session.run(&upload(), None).await.unwrap();
    assert_eq!(outcome.final_response().image_prediction(), Some(ImageVerdict::Normal));
    assert!(!outcome.needs_biometrics());

    let temp_dir = TempDir::new().unwrap();
    let storage = LocalStorage::new(temp_dir.path().to_str().unwrap());
    let details = ReportDetails {
        child_name: "Test Child".to_string(),
        age_years: Some(4),
        gender: "Male".to_string(),
        height_cm: Some(101.0),
        weight_kg: Some(15.5),
        generated_at: Local::now(),
    };
    let pdf = render_report(&details, outcome.final_response()).unwrap();
    let filename = default_report_filename(&details.generated_at);
    let path = storage.write_file(&filename, &pdf).await.unwrap();

    let written = std::fs::read(&path).unwrap();
    assert!(written.starts_with(b"%PDF"));
    assert!(path.ends_with(".pdf"));
}

#[tokio::test]
async fn test_client_sends_only_present_fields() {
    let server = MockServer::start();
    let api_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/PredictFull")
            .body_contains("name=\"file\"")
            .body_contains("name=\"Sex\"");
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(serde_json::json!({
                "status": "incomplete",
                "Image Prediction": "Malnourished",
                "Numeric Prediction": null,
                "Advice": "Malnourished detected. Please provide Age, Height, and Weight."
            }));
    });

    let client = HttpPredictionClient::new(server.url("/PredictFull")).unwrap();
    let biometrics = RawBiometrics {
        sex: Some("female".to_string()),
        ..Default::default()
    };

    let response = client.predict(&upload(), Some(&biometrics)).await.unwrap();

    api_mock.assert();
    assert_eq!(response.status(), ResponseStatus::Incomplete);
}

#[tokio::test]
async fn test_client_parses_error_body_from_strict_server() {
    let server = MockServer::start();
    let api_mock = server.mock(|when, then| {
        when.method(POST).path("/PredictFull");
        then.status(422)
            .header("Content-Type", "application/json")
            .json_body(serde_json::json!({
                "status": "error",
                "error": "Invalid input types for Age/Height/Weight."
            }));
    });

    let client = HttpPredictionClient::new(server.url("/PredictFull")).unwrap();
    let response = client.predict(&upload(), None).await.unwrap();

    api_mock.assert();
    assert_eq!(response.error(), Some("Invalid input types for Age/Height/Weight."));
}

#[tokio::test]
async fn test_client_reports_non_json_failures() {
    let server = MockServer::start();
    let api_mock = server.mock(|when, then| {
        when.method(POST).path("/PredictFull");
        then.status(502).body("bad gateway");
    });

    let client = HttpPredictionClient::new(server.url("/PredictFull")).unwrap();
    let err = client.predict(&upload(), None).await.unwrap_err();

    api_mock.assert();
    assert!(matches!(err, AppError::ServiceError { status: 502, .. }));
}

#[tokio::test]
async fn test_session_surfaces_error_status() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/PredictFull");
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(serde_json::json!({"status": "error", "error": "boom"}));
    });

    let session = ScreeningSession::new(HttpPredictionClient::new(server.url("/PredictFull")).unwrap());
    let err = session.run(&upload(), None).await.unwrap_err();

    assert!(matches!(err, AppError::ValidationError { ref message } if message == "boom"));
}
