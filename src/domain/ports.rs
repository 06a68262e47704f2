use crate::domain::model::{PredictionResponse, RawBiometrics};
use crate::utils::error::Result;
use async_trait::async_trait;
use ndarray::Array4;

/// Pre-trained image model: one RGB tensor in, one scalar in [0, 1] out.
pub trait ImageClassifier: Send + Sync {
    fn name(&self) -> &str;
    fn score(&self, input: &Array4<f32>) -> Result<f32>;
}

/// Pre-trained tabular model over the `[sex, age, height, weight]` row.
pub trait TabularClassifier: Send + Sync {
    fn name(&self) -> &str;
    fn classify(&self, row: &[f32; 4]) -> Result<i64>;
}

pub trait Storage: Send + Sync {
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<String>> + Send;
}

/// An uploaded image as the client sends it.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub filename: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Remote side of the screening flow, normally the `/PredictFull` endpoint.
#[async_trait]
pub trait PredictionService: Send + Sync {
    async fn predict(
        &self,
        image: &ImageUpload,
        biometrics: Option<&RawBiometrics>,
    ) -> Result<PredictionResponse>;
}
