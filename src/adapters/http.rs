use crate::core::assessment::Assessor;
use crate::domain::model::{PredictionRequest, PredictionResponse, RawBiometrics, INTERNAL_FAILURE_MESSAGE};
use crate::utils::error::{AppError, Result};
use axum::extract::multipart::MultipartRejection;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

pub struct AppState {
    assessor: Assessor,
    /// When false every outcome is answered with 200 and a status field.
    strict_status_codes: bool,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(assessor: Assessor, strict_status_codes: bool) -> Self {
        Self {
            assessor,
            strict_status_codes,
        }
    }

    fn respond(&self, result: Result<PredictionResponse>) -> (StatusCode, Json<PredictionResponse>) {
        match result {
            Ok(response) => (StatusCode::OK, Json(response)),
            Err(e) if e.is_client_error() => {
                let message = e.user_friendly_message();
                tracing::info!("Rejected prediction input: {}", message);
                let status = if self.strict_status_codes {
                    StatusCode::UNPROCESSABLE_ENTITY
                } else {
                    StatusCode::OK
                };
                (status, Json(PredictionResponse::failure(message)))
            }
            Err(e) => {
                tracing::error!(
                    "❌ Prediction failed: {} (Category: {:?}, Severity: {:?})",
                    e,
                    e.category(),
                    e.severity()
                );
                let status = if self.strict_status_codes {
                    StatusCode::INTERNAL_SERVER_ERROR
                } else {
                    StatusCode::OK
                };
                (status, Json(PredictionResponse::failure(INTERNAL_FAILURE_MESSAGE)))
            }
        }
    }
}

pub fn construct_router(state: SharedState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(read_root))
        .route("/health", get(health))
        .route("/PredictFull", post(predict_full))
        .with_state(state)
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

#[derive(Serialize)]
struct RootResponse {
    message: &'static str,
}

async fn read_root() -> Json<RootResponse> {
    Json(RootResponse {
        message: "✅ Malnutrition Demo API is running!",
    })
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

#[tracing::instrument(name = "POST /PredictFull", skip_all)]
async fn predict_full(
    State(state): State<SharedState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> (StatusCode, Json<PredictionResponse>) {
    let request = match multipart {
        Ok(multipart) => read_prediction_form(multipart).await,
        Err(rejection) => Err(AppError::validation(format!(
            "Expected a multipart form upload: {}",
            rejection.body_text()
        ))),
    };

    let request = match request {
        Ok(request) => request,
        Err(e) => return state.respond(Err(e)),
    };

    tracing::debug!(
        "Received {} image bytes, biometrics complete: {}",
        request.image.len(),
        request.biometrics.is_complete()
    );

    // 推論是 CPU 密集工作，不佔用 async worker
    let assessor = state.assessor.clone();
    let result = tokio::task::spawn_blocking(move || assessor.assess(&request))
        .await
        .unwrap_or_else(|e| Err(AppError::internal(format!("assessment task failed: {}", e))));

    state.respond(result)
}

/// Pulls `file` plus the optional `Sex`/`Age`/`Height`/`Weight` fields.
/// Blank text fields count as absent.
async fn read_prediction_form(mut multipart: Multipart) -> Result<PredictionRequest> {
    let mut image = None;
    let mut biometrics = RawBiometrics::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::validation(format!("Malformed multipart body: {}", e.body_text())))?
    {
        let name = field.name().unwrap_or_default().to_string();

        if name == "file" {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::validation(format!("Failed to read upload: {}", e.body_text())))?;
            image = Some(bytes.to_vec());
            continue;
        }

        let slot = match name.as_str() {
            "Sex" => &mut biometrics.sex,
            "Age" => &mut biometrics.age,
            "Height" => &mut biometrics.height,
            "Weight" => &mut biometrics.weight,
            other => {
                tracing::debug!("Ignoring unexpected form field '{}'", other);
                continue;
            }
        };

        let value = field
            .text()
            .await
            .map_err(|e| AppError::validation(format!("Failed to read field {}: {}", name, e.body_text())))?;
        if !value.trim().is_empty() {
            *slot = Some(value);
        }
    }

    let image = image.ok_or_else(|| AppError::validation("Missing required form field: file"))?;
    Ok(PredictionRequest::new(image, biometrics))
}
