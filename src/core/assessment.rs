use crate::core::preprocessing::ImagePreprocessor;
use crate::domain::model::{
    Biometrics, ImageVerdict, NumericVerdict, PredictionRequest, PredictionResponse,
};
use crate::domain::ports::{ImageClassifier, TabularClassifier};
use crate::utils::error::Result;
use std::sync::Arc;

/// Runs the image model, then the tabular model when the image is not normal.
///
/// Both models are shared read-only handles; one `Assessor` serves every
/// request for the lifetime of the process.
#[derive(Clone)]
pub struct Assessor {
    image_model: Arc<dyn ImageClassifier>,
    tabular_model: Arc<dyn TabularClassifier>,
    preprocessor: ImagePreprocessor,
}

impl Assessor {
    pub fn new(
        image_model: Arc<dyn ImageClassifier>,
        tabular_model: Arc<dyn TabularClassifier>,
        preprocessor: ImagePreprocessor,
    ) -> Self {
        Self {
            image_model,
            tabular_model,
            preprocessor,
        }
    }

    /// Never fails: undecodable images and model errors become `Unknown`.
    pub fn classify_image(&self, bytes: &[u8]) -> ImageVerdict {
        let tensor = match self.preprocessor.prepare(bytes) {
            Ok(tensor) => tensor,
            Err(e) => {
                tracing::warn!("⚠️ Image decode failed ({} bytes): {}", bytes.len(), e);
                return ImageVerdict::Unknown;
            }
        };

        match self.image_model.score(&tensor) {
            Ok(score) => {
                let verdict = ImageVerdict::from_score(score);
                tracing::debug!("Image model '{}' score {:.4} -> {}", self.image_model.name(), score, verdict);
                verdict
            }
            Err(e) => {
                tracing::error!("❌ Image inference failed: {}", e);
                ImageVerdict::Unknown
            }
        }
    }

    pub fn classify_biometrics(&self, biometrics: &Biometrics) -> Result<NumericVerdict> {
        let row = biometrics.feature_row();
        let class_index = self.tabular_model.classify(&row)?;
        let verdict = NumericVerdict::from_class(class_index);

        if verdict == NumericVerdict::Unknown {
            tracing::warn!(
                "⚠️ Tabular model '{}' returned unmapped class {}",
                self.tabular_model.name(),
                class_index
            );
        }

        Ok(verdict)
    }

    /// Decides which of the response shapes applies to `request`.
    ///
    /// Invalid biometrics surface as `AppError::ValidationError` and tabular
    /// failures as `AppError::InferenceError`; the caller turns them into
    /// failure bodies.
    pub fn assess(&self, request: &PredictionRequest) -> Result<PredictionResponse> {
        let image_verdict = self.classify_image(&request.image);

        if !image_verdict.needs_numeric_stage() {
            return Ok(PredictionResponse::healthy());
        }

        let missing = request.biometrics.missing_fields();
        if !missing.is_empty() {
            tracing::info!("Image verdict {}, missing biometrics: {:?}", image_verdict, missing);
            return Ok(PredictionResponse::incomplete(image_verdict, &missing));
        }

        let biometrics = request.biometrics.parse()?;
        let numeric_verdict = self.classify_biometrics(&biometrics)?;

        tracing::info!("Image verdict {}, numeric verdict {}", image_verdict, numeric_verdict);
        Ok(PredictionResponse::classified(image_verdict, numeric_verdict))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::AppError;
    use crate::domain::model::{RawBiometrics, ResponseStatus, HEALTHY_IMAGE_ADVICE};
    use image::{ImageFormat, Rgb, RgbImage};
    use ndarray::Array4;
    use std::io::Cursor;
    use std::sync::Mutex;

    struct FixedScore(f32);

    impl ImageClassifier for FixedScore {
        fn name(&self) -> &str {
            "fixed-score"
        }

        fn score(&self, input: &Array4<f32>) -> Result<f32> {
            assert_eq!(input.shape(), &[1, 8, 8, 3]);
            Ok(self.0)
        }
    }

    struct FailingImage;

    impl ImageClassifier for FailingImage {
        fn name(&self) -> &str {
            "failing"
        }

        fn score(&self, _input: &Array4<f32>) -> Result<f32> {
            Err(AppError::inference("failing", "session crashed"))
        }
    }

    #[derive(Default)]
    struct RecordingTabular {
        class_index: i64,
        rows: Mutex<Vec<[f32; 4]>>,
    }

    impl RecordingTabular {
        fn returning(class_index: i64) -> Self {
            Self {
                class_index,
                rows: Mutex::new(Vec::new()),
            }
        }
    }

    impl TabularClassifier for RecordingTabular {
        fn name(&self) -> &str {
            "recording"
        }

        fn classify(&self, row: &[f32; 4]) -> Result<i64> {
            self.rows.lock().unwrap().push(*row);
            Ok(self.class_index)
        }
    }

    fn png() -> Vec<u8> {
        let img = RgbImage::from_pixel(12, 12, Rgb([120, 80, 40]));
        let mut buffer = Cursor::new(Vec::new());
        img.write_to(&mut buffer, ImageFormat::Png).unwrap();
        buffer.into_inner()
    }

    fn assessor(image: impl ImageClassifier + 'static, tabular: Arc<RecordingTabular>) -> Assessor {
        Assessor::new(
            Arc::new(image),
            tabular,
            ImagePreprocessor::new(8, Default::default()),
        )
    }

    #[test]
    fn test_normal_image_skips_numeric_stage() {
        let tabular = Arc::new(RecordingTabular::returning(2));
        let assessor = assessor(FixedScore(0.8), tabular.clone());

        let request = PredictionRequest::new(png(), RawBiometrics::new("male", "2", "80", "10"));
        let response = assessor.assess(&request).unwrap();

        assert_eq!(response, PredictionResponse::healthy());
        assert_eq!(response.advice(), Some(HEALTHY_IMAGE_ADVICE));
        assert!(tabular.rows.lock().unwrap().is_empty());
    }

    #[test]
    fn test_threshold_boundary_is_normal() {
        let assessor = assessor(FixedScore(0.5), Arc::new(RecordingTabular::default()));
        assert_eq!(assessor.classify_image(&png()), ImageVerdict::Normal);
    }

    #[test]
    fn test_malnourished_without_biometrics_is_incomplete() {
        let assessor = assessor(FixedScore(0.2), Arc::new(RecordingTabular::default()));
        let response = assessor
            .assess(&PredictionRequest::new(png(), RawBiometrics::default()))
            .unwrap();

        assert_eq!(response.status(), ResponseStatus::Incomplete);
        assert_eq!(response.image_prediction(), Some(ImageVerdict::Malnourished));
        assert_eq!(response.numeric_prediction(), None);
    }

    #[test]
    fn test_partial_biometrics_is_incomplete() {
        let assessor = assessor(FixedScore(0.2), Arc::new(RecordingTabular::default()));
        let mut biometrics = RawBiometrics::new("female", "3", "90", "12");
        biometrics.weight = None;

        let response = assessor.assess(&PredictionRequest::new(png(), biometrics)).unwrap();
        assert_eq!(response.status(), ResponseStatus::Incomplete);
        assert!(response.advice().unwrap().contains("Weight"));
    }

    #[test]
    fn test_non_numeric_biometrics_is_validation_error() {
        let assessor = assessor(FixedScore(0.2), Arc::new(RecordingTabular::default()));
        let request = PredictionRequest::new(png(), RawBiometrics::new("female", "abc", "90", "12"));

        assert!(matches!(
            assessor.assess(&request),
            Err(AppError::ValidationError { ref message })
                if message == crate::domain::model::INVALID_BIOMETRICS_MESSAGE
        ));
    }

    #[test]
    fn test_wasted_example() {
        let tabular = Arc::new(RecordingTabular::returning(2));
        let assessor = assessor(FixedScore(0.2), tabular.clone());

        let request = PredictionRequest::new(png(), RawBiometrics::new("female", "3", "90", "12"));
        let response = assessor.assess(&request).unwrap();

        assert_eq!(response.status(), ResponseStatus::Success);
        assert_eq!(response.numeric_prediction(), Some(NumericVerdict::Wasted));
        assert_eq!(response.advice(), Some(NumericVerdict::Wasted.advice()));
        assert_eq!(*tabular.rows.lock().unwrap(), vec![[0.0, 3.0, 90.0, 12.0]]);
    }

    #[test]
    fn test_unmapped_class_is_unknown() {
        let assessor = assessor(FixedScore(0.1), Arc::new(RecordingTabular::returning(7)));
        let request = PredictionRequest::new(png(), RawBiometrics::new("male", "4", "100", "15"));

        let response = assessor.assess(&request).unwrap();
        assert_eq!(response.numeric_prediction(), Some(NumericVerdict::Unknown));
        assert_eq!(
            response.advice(),
            Some("⚠️ Unable to determine numeric malnutrition.")
        );
    }

    #[test]
    fn test_bad_image_bytes_are_unknown() {
        let assessor = assessor(FixedScore(0.9), Arc::new(RecordingTabular::default()));
        assert_eq!(assessor.classify_image(b"\x00\x01garbage"), ImageVerdict::Unknown);

        let response = assessor
            .assess(&PredictionRequest::new(b"garbage".to_vec(), RawBiometrics::default()))
            .unwrap();
        assert_eq!(response.image_prediction(), Some(ImageVerdict::Unknown));
        assert_eq!(response.status(), ResponseStatus::Incomplete);
    }

    #[test]
    fn test_image_inference_failure_is_unknown() {
        let assessor = assessor(FailingImage, Arc::new(RecordingTabular::default()));
        assert_eq!(assessor.classify_image(&png()), ImageVerdict::Unknown);
    }
}
