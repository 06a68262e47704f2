use crate::utils::error::{AppError, Result};
use crate::utils::validation::{validate_range, Validate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Scores strictly below this are read as malnourished.
pub const IMAGE_THRESHOLD: f32 = 0.5;

pub const HEALTHY_IMAGE_ADVICE: &str =
    "Child appears healthy. Maintain balanced diet and regular check-ups.";
pub const INVALID_BIOMETRICS_MESSAGE: &str = "Invalid input types for Age/Height/Weight.";
pub const INTERNAL_FAILURE_MESSAGE: &str = "Prediction failed due to an internal error.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageVerdict {
    Malnourished,
    Normal,
    Unknown,
}

impl ImageVerdict {
    pub fn from_score(score: f32) -> Self {
        // NaN 不會小於門檻，要先擋掉
        if score.is_nan() {
            ImageVerdict::Unknown
        } else if score < IMAGE_THRESHOLD {
            ImageVerdict::Malnourished
        } else {
            ImageVerdict::Normal
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ImageVerdict::Malnourished => "Malnourished",
            ImageVerdict::Normal => "Normal",
            ImageVerdict::Unknown => "Unknown",
        }
    }

    pub fn needs_numeric_stage(&self) -> bool {
        *self != ImageVerdict::Normal
    }
}

impl fmt::Display for ImageVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NumericVerdict {
    Healthy,
    Stunted,
    Wasted,
    Underweight,
    Unknown,
}

impl NumericVerdict {
    pub fn from_class(class_index: i64) -> Self {
        match class_index {
            0 => NumericVerdict::Healthy,
            1 => NumericVerdict::Stunted,
            2 => NumericVerdict::Wasted,
            3 => NumericVerdict::Underweight,
            _ => NumericVerdict::Unknown,
        }
    }

    pub fn advice(&self) -> &'static str {
        match self {
            NumericVerdict::Healthy => "✅ Continue good health practices and regular checkups.",
            NumericVerdict::Stunted => {
                "⚠️ Child shows stunting. Consult pediatrician and follow nutrition plan."
            }
            NumericVerdict::Wasted => {
                "⚠️ Child shows wasting. Consult pediatrician and follow nutrition plan."
            }
            NumericVerdict::Underweight => {
                "⚠️ Child is underweight. Consult pediatrician and follow nutrition plan."
            }
            NumericVerdict::Unknown => "⚠️ Unable to determine numeric malnutrition.",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NumericVerdict::Healthy => "Healthy",
            NumericVerdict::Stunted => "Stunted",
            NumericVerdict::Wasted => "Wasted",
            NumericVerdict::Underweight => "Underweight",
            NumericVerdict::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for NumericVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sex {
    Male,
    Female,
}

impl Sex {
    /// Anything other than "male" counts as female.
    pub fn from_input(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("male") {
            Sex::Male
        } else {
            Sex::Female
        }
    }

    pub fn code(&self) -> f32 {
        match self {
            Sex::Male => 1.0,
            Sex::Female => 0.0,
        }
    }
}

/// Biometric form fields as they arrive on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawBiometrics {
    pub sex: Option<String>,
    pub age: Option<String>,
    pub height: Option<String>,
    pub weight: Option<String>,
}

impl RawBiometrics {
    pub fn new(
        sex: impl Into<String>,
        age: impl Into<String>,
        height: impl Into<String>,
        weight: impl Into<String>,
    ) -> Self {
        Self {
            sex: Some(sex.into()),
            age: Some(age.into()),
            height: Some(height.into()),
            weight: Some(weight.into()),
        }
    }

    /// 依照表單欄位順序列出缺少的欄位
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.age.is_none() {
            missing.push("Age");
        }
        if self.sex.is_none() {
            missing.push("Sex");
        }
        if self.height.is_none() {
            missing.push("Height");
        }
        if self.weight.is_none() {
            missing.push("Weight");
        }
        missing
    }

    pub fn is_complete(&self) -> bool {
        self.missing_fields().is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.sex.is_none() && self.age.is_none() && self.height.is_none() && self.weight.is_none()
    }

    /// Coerces the four fields; fails if any is absent or not numeric.
    pub fn parse(&self) -> Result<Biometrics> {
        let (Some(sex), Some(age), Some(height), Some(weight)) =
            (&self.sex, &self.age, &self.height, &self.weight)
        else {
            return Err(AppError::validation(format!(
                "Missing biometric fields: {}",
                self.missing_fields().join(", ")
            )));
        };

        let age: i64 = age
            .trim()
            .parse()
            .map_err(|_| AppError::validation(INVALID_BIOMETRICS_MESSAGE))?;
        let height = parse_finite(height)?;
        let weight = parse_finite(weight)?;

        Ok(Biometrics {
            sex: Sex::from_input(sex),
            age,
            height,
            weight,
        })
    }
}

/// Accepted ranges for operator-entered measurements (children under five).
pub const AGE_RANGE_YEARS: (u32, u32) = (0, 5);
pub const HEIGHT_RANGE_CM: (f64, f64) = (40.0, 120.0);
pub const WEIGHT_RANGE_KG: (f64, f64) = (2.0, 30.0);

/// Typed measurements entered on the client before they go on the wire.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Measurements {
    pub sex: Option<String>,
    pub age_years: Option<u32>,
    pub height_cm: Option<f64>,
    pub weight_kg: Option<f64>,
}

impl Measurements {
    pub fn to_raw(&self) -> RawBiometrics {
        RawBiometrics {
            sex: self.sex.clone(),
            age: self.age_years.map(|v| v.to_string()),
            height: self.height_cm.map(|v| v.to_string()),
            weight: self.weight_kg.map(|v| v.to_string()),
        }
    }
}

impl Validate for Measurements {
    fn validate(&self) -> Result<()> {
        if let Some(age) = self.age_years {
            validate_range("age", age, AGE_RANGE_YEARS.0, AGE_RANGE_YEARS.1)?;
        }
        if let Some(height) = self.height_cm {
            validate_range("height", height, HEIGHT_RANGE_CM.0, HEIGHT_RANGE_CM.1)?;
        }
        if let Some(weight) = self.weight_kg {
            validate_range("weight", weight, WEIGHT_RANGE_KG.0, WEIGHT_RANGE_KG.1)?;
        }
        Ok(())
    }
}

fn parse_finite(value: &str) -> Result<f64> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| AppError::validation(INVALID_BIOMETRICS_MESSAGE))
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Biometrics {
    pub sex: Sex,
    pub age: i64,
    pub height: f64,
    pub weight: f64,
}

impl Biometrics {
    /// Row layout expected by the tabular model: sex, age, height, weight.
    pub fn feature_row(&self) -> [f32; 4] {
        [
            self.sex.code(),
            self.age as f32,
            self.height as f32,
            self.weight as f32,
        ]
    }
}

#[derive(Debug, Clone, Default)]
pub struct PredictionRequest {
    pub image: Vec<u8>,
    pub biometrics: RawBiometrics,
}

impl PredictionRequest {
    pub fn new(image: Vec<u8>, biometrics: RawBiometrics) -> Self {
        Self { image, biometrics }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Success,
    Incomplete,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerdictBody {
    pub status: ResponseStatus,
    #[serde(rename = "Image Prediction")]
    pub image_prediction: ImageVerdict,
    #[serde(rename = "Numeric Prediction")]
    pub numeric_prediction: Option<NumericVerdict>,
    #[serde(rename = "Advice")]
    pub advice: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureBody {
    pub status: ResponseStatus,
    pub error: String,
}

/// JSON payload returned by `POST /PredictFull`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PredictionResponse {
    Verdict(VerdictBody),
    Failure(FailureBody),
}

impl PredictionResponse {
    pub fn healthy() -> Self {
        PredictionResponse::Verdict(VerdictBody {
            status: ResponseStatus::Success,
            image_prediction: ImageVerdict::Normal,
            numeric_prediction: None,
            advice: HEALTHY_IMAGE_ADVICE.to_string(),
        })
    }

    pub fn incomplete(image: ImageVerdict, missing: &[&str]) -> Self {
        let lead = match image {
            ImageVerdict::Unknown => "Image could not be assessed.",
            _ => "Malnourished detected.",
        };
        PredictionResponse::Verdict(VerdictBody {
            status: ResponseStatus::Incomplete,
            image_prediction: image,
            numeric_prediction: None,
            advice: format!("{} Please provide {}.", lead, join_fields(missing)),
        })
    }

    pub fn classified(image: ImageVerdict, numeric: NumericVerdict) -> Self {
        PredictionResponse::Verdict(VerdictBody {
            status: ResponseStatus::Success,
            image_prediction: image,
            numeric_prediction: Some(numeric),
            advice: numeric.advice().to_string(),
        })
    }

    pub fn failure(message: impl Into<String>) -> Self {
        PredictionResponse::Failure(FailureBody {
            status: ResponseStatus::Error,
            error: message.into(),
        })
    }

    pub fn status(&self) -> ResponseStatus {
        match self {
            PredictionResponse::Verdict(body) => body.status,
            PredictionResponse::Failure(body) => body.status,
        }
    }

    pub fn image_prediction(&self) -> Option<ImageVerdict> {
        match self {
            PredictionResponse::Verdict(body) => Some(body.image_prediction),
            PredictionResponse::Failure(_) => None,
        }
    }

    pub fn numeric_prediction(&self) -> Option<NumericVerdict> {
        match self {
            PredictionResponse::Verdict(body) => body.numeric_prediction,
            PredictionResponse::Failure(_) => None,
        }
    }

    pub fn advice(&self) -> Option<&str> {
        match self {
            PredictionResponse::Verdict(body) => Some(&body.advice),
            PredictionResponse::Failure(_) => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            PredictionResponse::Verdict(_) => None,
            PredictionResponse::Failure(body) => Some(&body.error),
        }
    }
}

/// "Age", "Age and Sex", "Age, Sex, Height, and Weight"
fn join_fields(fields: &[&str]) -> String {
    match fields {
        [] => String::new(),
        [only] => only.to_string(),
        [first, second] => format!("{} and {}", first, second),
        [init @ .., last] => format!("{}, and {}", init.join(", "), last),
    }
}
