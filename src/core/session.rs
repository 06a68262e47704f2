use crate::domain::model::{PredictionResponse, RawBiometrics, ResponseStatus};
use crate::domain::ports::{ImageUpload, PredictionService};
use crate::utils::error::{AppError, Result};

#[derive(Debug, Clone)]
pub struct ScreeningOutcome {
    /// Answer to the image-only call.
    pub initial: PredictionResponse,
    /// Answer to the follow-up call with biometrics, when one was made.
    pub detailed: Option<PredictionResponse>,
}

impl ScreeningOutcome {
    pub fn final_response(&self) -> &PredictionResponse {
        self.detailed.as_ref().unwrap_or(&self.initial)
    }

    /// True when the image alone was not enough and no biometrics were sent.
    pub fn needs_biometrics(&self) -> bool {
        self.detailed.is_none()
            && self
                .initial
                .image_prediction()
                .is_some_and(|verdict| verdict.needs_numeric_stage())
    }
}

/// Client-side flow: image first, biometrics only when the image calls for them.
pub struct ScreeningSession<P: PredictionService> {
    service: P,
}

impl<P: PredictionService> ScreeningSession<P> {
    pub fn new(service: P) -> Self {
        Self { service }
    }

    pub async fn run(
        &self,
        image: &ImageUpload,
        biometrics: Option<&RawBiometrics>,
    ) -> Result<ScreeningOutcome> {
        tracing::info!("🔍 Analyzing image '{}'", image.filename);
        let initial = self.service.predict(image, None).await?;

        if initial.status() == ResponseStatus::Error {
            return Err(AppError::validation(
                initial.error().unwrap_or("prediction service returned an error"),
            ));
        }

        let verdict = initial
            .image_prediction()
            .ok_or_else(|| AppError::internal("response carried no image prediction"))?;
        tracing::info!("✅ Image Prediction: {}", verdict);

        if !verdict.needs_numeric_stage() {
            return Ok(ScreeningOutcome {
                initial,
                detailed: None,
            });
        }

        let Some(biometrics) = biometrics.filter(|b| !b.is_empty()) else {
            tracing::warn!("⚠️ Please enter biometric data for detailed analysis.");
            return Ok(ScreeningOutcome {
                initial,
                detailed: None,
            });
        };

        tracing::info!("📋 Submitting biometrics for detailed analysis");
        let detailed = self.service.predict(image, Some(biometrics)).await?;

        Ok(ScreeningOutcome {
            initial,
            detailed: Some(detailed),
        })
    }
}
