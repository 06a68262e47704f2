use crate::domain::model::{PredictionResponse, RawBiometrics};
use crate::domain::ports::{ImageUpload, PredictionService};
use crate::utils::error::{AppError, Result};
use crate::utils::validation::{validate_file_extension, validate_url};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use std::path::Path;

pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:8000/PredictFull";
pub const ALLOWED_IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// Talks to a running `/PredictFull` endpoint.
#[derive(Debug, Clone)]
pub struct HttpPredictionClient {
    client: Client,
    endpoint: String,
}

impl HttpPredictionClient {
    pub fn new(endpoint: impl Into<String>) -> Result<Self> {
        let endpoint = endpoint.into();
        validate_url("endpoint", &endpoint)?;
        Ok(Self {
            client: Client::new(),
            endpoint,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn build_form(image: &ImageUpload, biometrics: Option<&RawBiometrics>) -> Result<Form> {
        let part = Part::bytes(image.bytes.clone())
            .file_name(image.filename.clone())
            .mime_str(&image.mime_type)?;
        let mut form = Form::new().part("file", part);

        // 只送出有值的欄位
        if let Some(biometrics) = biometrics {
            let fields = [
                ("Sex", &biometrics.sex),
                ("Age", &biometrics.age),
                ("Height", &biometrics.height),
                ("Weight", &biometrics.weight),
            ];
            for (key, value) in fields {
                if let Some(value) = value.as_deref().filter(|v| !v.trim().is_empty()) {
                    form = form.text(key, value.to_string());
                }
            }
        }

        Ok(form)
    }
}

#[async_trait]
impl PredictionService for HttpPredictionClient {
    async fn predict(
        &self,
        image: &ImageUpload,
        biometrics: Option<&RawBiometrics>,
    ) -> Result<PredictionResponse> {
        let form = Self::build_form(image, biometrics)?;

        tracing::debug!("Posting {} bytes to {}", image.bytes.len(), self.endpoint);
        let response = self.client.post(&self.endpoint).multipart(form).send().await?;
        let status = response.status();
        tracing::debug!("Prediction service status: {}", status);

        let body = response.text().await?;
        match serde_json::from_str::<PredictionResponse>(&body) {
            Ok(parsed) => Ok(parsed),
            Err(e) if status.is_success() => Err(AppError::SerializationError(e)),
            Err(_) => Err(AppError::ServiceError {
                status: status.as_u16(),
                message: body,
            }),
        }
    }
}

fn mime_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .as_deref()
    {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        _ => "application/octet-stream",
    }
}

/// Reads a jpg/jpeg/png file from disk for upload.
pub async fn load_image_upload(path: impl AsRef<Path>) -> Result<ImageUpload> {
    let path = path.as_ref();
    let display = path.display().to_string();
    validate_file_extension("image", &display, &ALLOWED_IMAGE_EXTENSIONS)?;

    let bytes = tokio::fs::read(path).await?;
    let filename = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("upload")
        .to_string();

    Ok(ImageUpload {
        filename,
        mime_type: mime_for(path).to_string(),
        bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_invalid_endpoint() {
        assert!(HttpPredictionClient::new("not a url").is_err());
        assert!(HttpPredictionClient::new(DEFAULT_ENDPOINT).is_ok());
    }

    #[test]
    fn test_mime_for() {
        assert_eq!(mime_for(Path::new("a.JPG")), "image/jpeg");
        assert_eq!(mime_for(Path::new("a.png")), "image/png");
        assert_eq!(mime_for(Path::new("a.bin")), "application/octet-stream");
    }

    #[tokio::test]
    async fn test_load_image_upload_rejects_other_extensions() {
        let err = load_image_upload("child.gif").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidConfigValueError { .. }));
    }
}
