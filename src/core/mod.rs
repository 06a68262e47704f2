pub mod assessment;
pub mod preprocessing;
pub mod session;

pub use crate::domain::model::{ImageVerdict, NumericVerdict, PredictionRequest, PredictionResponse};
pub use crate::domain::ports::{ImageClassifier, PredictionService, Storage, TabularClassifier};
pub use crate::utils::error::Result;
