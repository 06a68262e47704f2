//! ONNX Runtime backed implementations of the classifier ports.

use crate::domain::ports::{ImageClassifier, TabularClassifier};
use crate::utils::error::{AppError, Result};
use ndarray::Array4;
use ort::logging::LogLevel;
use ort::session::Session;
use ort::value::TensorRef;
use std::path::Path;
use std::sync::Mutex;

fn load_session(model: &str, path: &Path) -> Result<Session> {
    let load_error = |message: String| AppError::ModelLoadError {
        model: model.to_string(),
        path: path.display().to_string(),
        message,
    };

    if !path.is_file() {
        return Err(load_error("file not found".to_string()));
    }

    let builder = Session::builder()
        .and_then(|builder| builder.with_log_level(LogLevel::Error))
        .map_err(|e| load_error(e.to_string()))?;

    builder
        .commit_from_file(path)
        .map_err(|e| load_error(e.to_string()))
}

/// `run` needs exclusive access to the session, hence the mutex.
struct GuardedSession {
    name: String,
    session: Mutex<Session>,
}

impl GuardedSession {
    fn open(name: &str, path: &Path) -> Result<Self> {
        let session = load_session(name, path)?;
        tracing::info!("✅ Loaded {} model from {}", name, path.display());
        Ok(Self {
            name: name.to_string(),
            session: Mutex::new(session),
        })
    }

    fn fail(&self, message: impl Into<String>) -> AppError {
        AppError::inference(&self.name, message)
    }

    /// Runs a single f32 input and hands the first output to `extract`.
    fn run<T>(
        &self,
        shape: &[usize],
        data: &[f32],
        extract: impl FnOnce(&ort::value::DynValue) -> Result<T>,
    ) -> Result<T> {
        let dims: Vec<i64> = shape.iter().map(|&d| d as i64).collect();
        let tensor = TensorRef::from_array_view((dims, data))
            .map_err(|e| self.fail(format!("failed to build input tensor: {}", e)))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| self.fail("session lock poisoned"))?;

        let outputs = session
            .run(ort::inputs![tensor])
            .map_err(|e| self.fail(format!("forward pass failed: {}", e)))?;

        if outputs.len() == 0 {
            return Err(self.fail("model produced no outputs"));
        }
        extract(&outputs[0])
    }
}

pub struct OnnxImageClassifier {
    inner: GuardedSession,
}

impl OnnxImageClassifier {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            inner: GuardedSession::open("image", path.as_ref())?,
        })
    }
}

impl ImageClassifier for OnnxImageClassifier {
    fn name(&self) -> &str {
        &self.inner.name
    }

    fn score(&self, input: &Array4<f32>) -> Result<f32> {
        let data = input
            .as_slice()
            .ok_or_else(|| self.inner.fail("input tensor is not contiguous"))?;

        self.inner.run(input.shape(), data, |output| {
            let (_, values) = output
                .try_extract_tensor::<f32>()
                .map_err(|e| self.inner.fail(format!("expected f32 output: {}", e)))?;
            // 只取第一個數值（sigmoid 輸出）
            values
                .first()
                .copied()
                .ok_or_else(|| self.inner.fail("empty output tensor"))
        })
    }
}

pub struct OnnxTabularClassifier {
    inner: GuardedSession,
}

impl OnnxTabularClassifier {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            inner: GuardedSession::open("tabular", path.as_ref())?,
        })
    }
}

impl TabularClassifier for OnnxTabularClassifier {
    fn name(&self) -> &str {
        &self.inner.name
    }

    fn classify(&self, row: &[f32; 4]) -> Result<i64> {
        self.inner.run(&[1, row.len()], row, |output| {
            // sklearn exports emit an int64 label tensor first
            if let Ok((_, labels)) = output.try_extract_tensor::<i64>() {
                return labels
                    .first()
                    .copied()
                    .ok_or_else(|| self.inner.fail("empty label tensor"));
            }

            let (_, values) = output
                .try_extract_tensor::<f32>()
                .map_err(|e| self.inner.fail(format!("unsupported output type: {}", e)))?;
            class_from_scores(values)
                .ok_or_else(|| self.inner.fail("empty or non-finite output tensor"))
        })
    }
}

/// A single value is taken as the class itself, several as per-class scores.
/// NaN or infinite outputs give no class at all.
fn class_from_scores(values: &[f32]) -> Option<i64> {
    if values.iter().any(|v| !v.is_finite()) {
        return None;
    }
    match values {
        [] => None,
        [only] => Some(only.round() as i64),
        scores => scores
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(index, _)| index as i64),
    }
}
