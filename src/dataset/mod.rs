// Dataset readers
//
// Every reader is a finite, restartable producer of samples. The sweep run
// modes pull one sample at a time and drop it after injection, so memory use
// stays at one sample regardless of dataset size.

pub mod debug;
pub mod image;
pub mod index;
pub mod mnist;

use std::path::Path;

use crate::error::Result;

pub use self::debug::{read_float_file, DebugFloatReader};
pub use self::image::{decode_image, read_image, Normalization, SingleImageReader};
pub use self::index::{DirectoryIndexReader, DEFAULT_INDEX_FILE};
pub use self::mnist::{render_ascii, MnistStream};

/// One input sample: a flat float buffer plus its ground truth when known
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub data: Vec<f32>,
    pub label: Option<usize>,
}

impl Sample {
    pub fn unlabeled(data: Vec<f32>) -> Self {
        Self { data, label: None }
    }

    pub fn labeled(data: Vec<f32>, label: usize) -> Self {
        Self {
            data,
            label: Some(label),
        }
    }
}

/// A finite source of samples
pub trait SampleReader {
    /// Next sample, or `None` once the source is exhausted
    fn produce_sample(&mut self) -> Result<Option<Sample>>;

    /// Restart from the first sample
    fn rewind(&mut self) -> Result<()>;
}

/// Labelled binary dataset read sequentially from a directory.
///
/// `next_sample` may be called exactly as many times as `initialize`
/// reported; `finalize` releases the open streams and may be called more
/// than once.
pub trait StreamingDataset {
    /// Open the streams in `dir` and return the number of samples
    fn initialize(&mut self, dir: &Path) -> Result<usize>;

    /// Next (pixels, label) pair
    fn next_sample(&mut self) -> Result<(Vec<f32>, usize)>;

    fn finalize(&mut self);
}
