#![allow(dead_code)]

use image::{ImageFormat, Rgb, RgbImage};
use ndarray::Array4;
use nutriscan::core::preprocessing::ImagePreprocessor;
use nutriscan::domain::ports::{ImageClassifier, TabularClassifier};
use nutriscan::{AppError, AppState, Assessor, Result};
use std::io::Cursor;
use std::sync::{Arc, Mutex};

pub const BOUNDARY: &str = "nutriscan-test-boundary";

pub struct FixedScore(pub f32);

impl ImageClassifier for FixedScore {
    fn name(&self) -> &str {
        "fixed-score"
    }

    fn score(&self, _input: &Array4<f32>) -> Result<f32> {
        Ok(self.0)
    }
}

pub struct FixedClass {
    pub class_index: i64,
    pub rows: Mutex<Vec<[f32; 4]>>,
}

impl FixedClass {
    pub fn new(class_index: i64) -> Arc<Self> {
        Arc::new(Self {
            class_index,
            rows: Mutex::new(Vec::new()),
        })
    }
}

impl TabularClassifier for FixedClass {
    fn name(&self) -> &str {
        "fixed-class"
    }

    fn classify(&self, row: &[f32; 4]) -> Result<i64> {
        self.rows.lock().unwrap().push(*row);
        Ok(self.class_index)
    }
}

pub struct BrokenTabular;

impl TabularClassifier for BrokenTabular {
    fn name(&self) -> &str {
        "broken"
    }

    fn classify(&self, _row: &[f32; 4]) -> Result<i64> {
        Err(AppError::inference("broken", "session crashed"))
    }
}

pub fn state_with(
    score: f32,
    tabular: Arc<dyn TabularClassifier>,
    strict_status_codes: bool,
) -> Arc<AppState> {
    let assessor = Assessor::new(
        Arc::new(FixedScore(score)),
        tabular,
        ImagePreprocessor::new(32, Default::default()),
    );
    Arc::new(AppState::new(assessor, strict_status_codes))
}

pub fn png_bytes() -> Vec<u8> {
    let img = RgbImage::from_pixel(40, 30, Rgb([200, 150, 120]));
    let mut buffer = Cursor::new(Vec::new());
    img.write_to(&mut buffer, ImageFormat::Png).unwrap();
    buffer.into_inner()
}

pub fn multipart_body(image: Option<&[u8]>, fields: &[(&str, &str)]) -> Vec<u8> {
    let mut body = Vec::new();

    if let Some(image) = image {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"child.png\"\r\nContent-Type: image/png\r\n\r\n",
                BOUNDARY
            )
            .as_bytes(),
        );
        body.extend_from_slice(image);
        body.extend_from_slice(b"\r\n");
    }

    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            )
            .as_bytes(),
        );
    }

    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}
