use crate::utils::error::Result;
use image::imageops::FilterType;
use ndarray::Array4;
use serde::{Deserialize, Serialize};

pub const DEFAULT_IMAGE_SIZE: u32 = 224;

/// Axis order of the tensor fed to the image model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TensorLayout {
    /// 1 x H x W x 3, what Keras exports produce
    #[default]
    Nhwc,
    /// 1 x 3 x H x W
    Nchw,
}

#[derive(Debug, Clone, Copy)]
pub struct ImagePreprocessor {
    size: u32,
    layout: TensorLayout,
}

impl Default for ImagePreprocessor {
    fn default() -> Self {
        Self::new(DEFAULT_IMAGE_SIZE, TensorLayout::default())
    }
}

impl ImagePreprocessor {
    pub fn new(size: u32, layout: TensorLayout) -> Self {
        Self { size, layout }
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn layout(&self) -> TensorLayout {
        self.layout
    }

    /// Decodes `bytes`, resizes to a square RGB image and scales to [0, 1].
    pub fn prepare(&self, bytes: &[u8]) -> Result<Array4<f32>> {
        let decoded = image::load_from_memory(bytes)?;
        tracing::debug!(
            "Decoded image {}x{}, resizing to {}x{}",
            decoded.width(),
            decoded.height(),
            self.size,
            self.size
        );

        let rgb = decoded.to_rgb8();
        let resized = image::imageops::resize(&rgb, self.size, self.size, FilterType::CatmullRom);
        let side = self.size as usize;

        let tensor = match self.layout {
            TensorLayout::Nhwc => Array4::from_shape_fn((1, side, side, 3), |(_, y, x, c)| {
                resized.get_pixel(x as u32, y as u32)[c] as f32 / 255.0
            }),
            TensorLayout::Nchw => Array4::from_shape_fn((1, 3, side, side), |(_, c, y, x)| {
                resized.get_pixel(x as u32, y as u32)[c] as f32 / 255.0
            }),
        };

        Ok(tensor)
    }
}
