use std::path::{Path, PathBuf};

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use log::debug;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::error::{Error, Result};
use crate::loader::ModelFormat;
use crate::model::ImageCategory;

use super::{Sample, SampleReader};

/// Per-channel ImageNet statistics, RGB order
pub const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
pub const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Pixel normalisation convention expected by the model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Normalization {
    /// Resize shorter side, centre crop, scale to [0, 1], subtract mean, divide by std
    MeanStd,
    /// Resize to the exact target and divide by 256
    UnitScale,
}

impl Normalization {
    /// ONNX model-zoo networks are trained with mean/std inputs, frozen
    /// TensorFlow graphs with plain scaled pixels.
    pub fn for_format(format: ModelFormat) -> Self {
        match format {
            ModelFormat::Onnx => Normalization::MeanStd,
            ModelFormat::TfProtobuf => Normalization::UnitScale,
        }
    }
}

/// Decode an image file into a planar CHW float buffer for `category`.
///
/// The file is closed as soon as decoding finishes.
pub fn read_image(path: &Path, category: ImageCategory, normalization: Normalization) -> Result<Vec<f32>> {
    if category == ImageCategory::Unknown {
        return Err(Error::Input(format!(
            "can not read image {}: model input is not a known image shape",
            path.display()
        )));
    }
    let img = image::open(path)
        .map_err(|e| Error::Input(format!("can not read image {}: {}", path.display(), e)))?;
    decode_image(&img, category, normalization)
}

/// Resize, crop and normalise an already decoded image
pub fn decode_image(img: &DynamicImage, category: ImageCategory, normalization: Normalization) -> Result<Vec<f32>> {
    let (channels, height, width) = category
        .dims()
        .ok_or_else(|| Error::Input("image input category is unknown".to_string()))?;
    let (src_w, src_h) = img.dimensions();
    if src_w == 0 || src_h == 0 {
        return Err(Error::Input("image has zero size".to_string()));
    }
    let (width, height) = (width as u32, height as u32);

    if channels == 1 {
        let gray = img.resize_exact(width, height, FilterType::Triangle).to_luma8();
        return Ok(gray.pixels().map(|p| p.0[0] as f32 / 255.0).collect());
    }

    let prepared = match normalization {
        Normalization::MeanStd => {
            let side = match category {
                ImageCategory::ImageNet224 => 256,
                _ => height.max(width),
            };
            center_crop(&resize_shorter_side(img, side), width, height)
        }
        Normalization::UnitScale => img.resize_exact(width, height, FilterType::Triangle),
    };
    let rgb = prepared.to_rgb8();

    let plane = (width * height) as usize;
    let mut data = vec![0.0f32; 3 * plane];
    for (i, pixel) in rgb.pixels().enumerate() {
        for c in 0..3 {
            let value = pixel.0[c] as f32;
            data[c * plane + i] = match normalization {
                Normalization::MeanStd => (value / 255.0 - IMAGENET_MEAN[c]) / IMAGENET_STD[c],
                Normalization::UnitScale => value / 256.0,
            };
        }
    }
    Ok(data)
}

fn resize_shorter_side(img: &DynamicImage, side: u32) -> DynamicImage {
    let (w, h) = img.dimensions();
    let scale = |long: u32, short: u32| ((long as u64 * side as u64 + short as u64 / 2) / short as u64) as u32;
    let (new_w, new_h) = if w <= h {
        (side, scale(h, w).max(side))
    } else {
        (scale(w, h).max(side), side)
    };
    img.resize_exact(new_w, new_h, FilterType::Triangle)
}

fn center_crop(img: &DynamicImage, width: u32, height: u32) -> DynamicImage {
    let (w, h) = img.dimensions();
    let x = w.saturating_sub(width) / 2;
    let y = h.saturating_sub(height) / 2;
    img.crop_imm(x, y, width.min(w), height.min(h))
}

/// Reader yielding a single decoded image
#[derive(Debug, Clone)]
pub struct SingleImageReader {
    path: PathBuf,
    category: ImageCategory,
    normalization: Normalization,
    consumed: bool,
}

impl SingleImageReader {
    pub fn new(path: impl Into<PathBuf>, category: ImageCategory, normalization: Normalization) -> Self {
        Self {
            path: path.into(),
            category,
            normalization,
            consumed: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SampleReader for SingleImageReader {
    fn produce_sample(&mut self) -> Result<Option<Sample>> {
        if self.consumed {
            return Ok(None);
        }
        debug!("reading image: {}", self.path.display());
        let data = read_image(&self.path, self.category, self.normalization)?;
        self.consumed = true;
        Ok(Some(Sample::unlabeled(data)))
    }

    fn rewind(&mut self) -> Result<()> {
        self.consumed = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn solid(width: u32, height: u32, color: [u8; 3]) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb(color)))
    }

    #[test]
    fn test_mean_std_layout_and_values() {
        let img = solid(320, 240, [255, 0, 128]);
        let data = decode_image(&img, ImageCategory::ImageNet224, Normalization::MeanStd).unwrap();
        assert_eq!(data.len(), 3 * 224 * 224);

        let plane = 224 * 224;
        let red = (1.0 - IMAGENET_MEAN[0]) / IMAGENET_STD[0];
        let green = (0.0 - IMAGENET_MEAN[1]) / IMAGENET_STD[1];
        assert!((data[0] - red).abs() < 2e-2);
        assert!((data[plane] - green).abs() < 2e-2);
        assert!((data[plane - 1] - red).abs() < 2e-2);
    }

    #[test]
    fn test_unit_scale_divides_by_256() {
        let img = solid(50, 80, [128, 64, 0]);
        let data = decode_image(&img, ImageCategory::ImageNet299, Normalization::UnitScale).unwrap();
        assert_eq!(data.len(), 3 * 299 * 299);
        assert!((data[0] - 0.5).abs() < 5e-3);
        assert!((data[299 * 299] - 0.25).abs() < 5e-3);
        assert!(data[2 * 299 * 299].abs() < 5e-3);
    }

    #[test]
    fn test_mnist_is_single_channel() {
        let img = solid(56, 56, [255, 255, 255]);
        let data = decode_image(&img, ImageCategory::Mnist28, Normalization::MeanStd).unwrap();
        assert_eq!(data.len(), 28 * 28);
        assert!(data.iter().all(|&v| (v - 1.0).abs() < 1e-2));
    }

    #[test]
    fn test_unknown_category_is_input_error() {
        let img = solid(10, 10, [0, 0, 0]);
        let err = decode_image(&img, ImageCategory::Unknown, Normalization::MeanStd).unwrap_err();
        assert!(matches!(err, Error::Input(_)));

        let err = read_image(Path::new("missing.png"), ImageCategory::Unknown, Normalization::MeanStd).unwrap_err();
        assert!(matches!(err, Error::Input(_)));
    }

    #[test]
    fn test_single_image_reader_yields_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cat.png");
        solid(30, 30, [10, 20, 30]).save(&path).unwrap();

        let mut reader = SingleImageReader::new(&path, ImageCategory::ImageNet224, Normalization::UnitScale);
        assert!(reader.produce_sample().unwrap().is_some());
        assert!(reader.produce_sample().unwrap().is_none());
        reader.rewind().unwrap();
        let sample = reader.produce_sample().unwrap().unwrap();
        assert_eq!(sample.label, None);
        assert_eq!(sample.data.len(), 3 * 224 * 224);
    }

    #[test]
    fn test_undecodable_file_is_input_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"not an image").unwrap();

        let err = read_image(&path, ImageCategory::ImageNet224, Normalization::MeanStd).unwrap_err();
        assert!(matches!(err, Error::Input(_)));
    }
}
