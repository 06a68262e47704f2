pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod report;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::ServerArgs;
pub use config::ServiceConfig;

#[cfg(feature = "onnx")]
pub use adapters::onnx::{OnnxImageClassifier, OnnxTabularClassifier};
pub use adapters::{
    client::HttpPredictionClient,
    http::{construct_router, AppState},
    storage::LocalStorage,
};
pub use core::{assessment::Assessor, session::ScreeningSession};
pub use domain::model::{
    ImageVerdict, Measurements, NumericVerdict, PredictionResponse, RawBiometrics,
};
pub use utils::error::{AppError, Result};
