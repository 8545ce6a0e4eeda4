use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, RgbImage};
use ndarray::Array4;

use crate::config::{ModelConfig, Normalization, ResizeMode, TensorLayout};
use crate::error::{DetectorError, Result};
use crate::validation::ImageKind;

const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Turns uploaded bytes into the model's input tensor.
#[derive(Debug, Clone, Copy)]
pub struct Preprocessor {
    size: u32,
    layout: TensorLayout,
    normalization: Normalization,
    resize: ResizeMode,
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::from_config(&ModelConfig::default())
    }
}

impl Preprocessor {
    pub fn from_config(config: &ModelConfig) -> Self {
        Self {
            size: config.input_size,
            layout: config.layout,
            normalization: config.normalization,
            resize: config.resize,
        }
    }

    pub fn input_shape(&self) -> [usize; 4] {
        let s = self.size as usize;
        match self.layout {
            TensorLayout::Nhwc => [1, s, s, 3],
            TensorLayout::Nchw => [1, 3, s, s],
        }
    }

    pub fn decode(&self, bytes: &[u8], kind: Option<ImageKind>) -> Result<DynamicImage> {
        let decoded = match kind {
            Some(kind) => image::load_from_memory_with_format(bytes, kind.format()),
            None => image::load_from_memory(bytes),
        };
        decoded.map_err(|e| DetectorError::Decode(e.to_string()))
    }

    /// Resize to a `size` x `size` RGB image.
    pub fn resize(&self, img: &DynamicImage) -> RgbImage {
        match self.resize {
            ResizeMode::Stretch => img
                .resize_exact(self.size, self.size, FilterType::Nearest)
                .to_rgb8(),
            ResizeMode::Letterbox => self.letterbox(img),
        }
    }

    // Keep the aspect ratio, longest edge = size, centre on black.
    fn letterbox(&self, img: &DynamicImage) -> RgbImage {
        let size = self.size;
        let (width, height) = img.dimensions();
        let (new_width, new_height) = if width > height {
            (size, ((size * height) / width).max(1))
        } else {
            (((size * width) / height).max(1), size)
        };

        let resized = img
            .resize_exact(new_width, new_height, FilterType::Triangle)
            .to_rgb8();
        let mut canvas = RgbImage::new(size, size);
        let pad_x = (size - new_width) / 2;
        let pad_y = (size - new_height) / 2;
        for (x, y, pixel) in resized.enumerate_pixels() {
            canvas.put_pixel(x + pad_x, y + pad_y, *pixel);
        }
        canvas
    }

    pub fn to_tensor(&self, img: &RgbImage) -> Array4<f32> {
        let shape = self.input_shape();
        let mut tensor = Array4::zeros(shape);
        for (x, y, pixel) in img.enumerate_pixels() {
            let (x, y) = (x as usize, y as usize);
            for c in 0..3 {
                let value = self.normalize(pixel[c], c);
                match self.layout {
                    TensorLayout::Nhwc => tensor[[0, y, x, c]] = value,
                    TensorLayout::Nchw => tensor[[0, c, y, x]] = value,
                }
            }
        }
        tensor
    }

    fn normalize(&self, channel: u8, c: usize) -> f32 {
        let unit = channel as f32 / 255.0;
        match self.normalization {
            Normalization::Unit => unit,
            Normalization::Imagenet => (unit - IMAGENET_MEAN[c]) / IMAGENET_STD[c],
        }
    }

    /// Decode, resize and normalise in one go.
    pub fn prepare(&self, bytes: &[u8], kind: Option<ImageKind>) -> Result<Array4<f32>> {
        let img = self.decode(bytes, kind)?;
        Ok(self.to_tensor(&self.resize(&img)))
    }
}
