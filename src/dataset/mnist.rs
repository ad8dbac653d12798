// MNIST test set streamed from IDX files
//
// IDX format (all header values big-endian):
//   images: magic(2051) | count(u32) | rows(u32) | cols(u32) | pixel_data(u8...)
//   labels: magic(2049) | count(u32) | label_data(u8...)
//
// Only one image is held in memory at a time.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use log::debug;

use crate::error::{Error, Result};

use super::{Sample, SampleReader, StreamingDataset};

pub const IMAGES_FILE: &str = "t10k-images-idx3-ubyte";
pub const LABELS_FILE: &str = "t10k-labels-idx1-ubyte";

const IMAGE_MAGIC: u32 = 2051;
const LABEL_MAGIC: u32 = 2049;
const ROWS: usize = 28;
const COLS: usize = 28;

/// Sequential reader over the MNIST image and label streams
#[derive(Debug, Default)]
pub struct MnistStream {
    dir: Option<PathBuf>,
    images: Option<BufReader<File>>,
    labels: Option<BufReader<File>>,
    count: usize,
    remaining: usize,
}

impl MnistStream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create and initialize in one step
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let mut stream = Self::new();
        stream.initialize(dir.as_ref())?;
        Ok(stream)
    }

    /// Samples reported by `initialize`
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Samples not yet read
    pub fn remaining(&self) -> usize {
        self.remaining
    }

    /// True while the streams are held open
    pub fn is_open(&self) -> bool {
        self.images.is_some() || self.labels.is_some()
    }
}

impl StreamingDataset for MnistStream {
    fn initialize(&mut self, dir: &Path) -> Result<usize> {
        self.finalize();

        let open = |name: &str| -> Result<BufReader<File>> {
            let path = dir.join(name);
            File::open(&path)
                .map(BufReader::new)
                .map_err(|e| Error::Input(format!("can not read mnist files in dir {}: {}: {}", dir.display(), name, e)))
        };
        let mut images = open(IMAGES_FILE)?;
        let mut labels = open(LABELS_FILE)?;

        let magic = read_u32(&mut images)?;
        if magic != IMAGE_MAGIC {
            return Err(Error::Input(format!(
                "{}: invalid magic {:#06x}, expected {:#06x}",
                IMAGES_FILE, magic, IMAGE_MAGIC
            )));
        }
        let image_count = read_u32(&mut images)? as usize;
        let rows = read_u32(&mut images)? as usize;
        let cols = read_u32(&mut images)? as usize;
        if rows != ROWS || cols != COLS {
            return Err(Error::Input(format!(
                "{}: images are {}x{}, expected {}x{}",
                IMAGES_FILE, rows, cols, ROWS, COLS
            )));
        }

        let magic = read_u32(&mut labels)?;
        if magic != LABEL_MAGIC {
            return Err(Error::Input(format!(
                "{}: invalid magic {:#06x}, expected {:#06x}",
                LABELS_FILE, magic, LABEL_MAGIC
            )));
        }
        let label_count = read_u32(&mut labels)? as usize;
        if image_count != label_count {
            return Err(Error::Input(format!(
                "mnist count mismatch: {} images vs {} labels",
                image_count, label_count
            )));
        }

        debug!("mnist images = {}", image_count);
        self.dir = Some(dir.to_path_buf());
        self.images = Some(images);
        self.labels = Some(labels);
        self.count = image_count;
        self.remaining = image_count;
        Ok(image_count)
    }

    fn next_sample(&mut self) -> Result<(Vec<f32>, usize)> {
        if self.remaining == 0 {
            return Err(Error::Input("read past the end of the mnist stream".to_string()));
        }
        let (Some(images), Some(labels)) = (self.images.as_mut(), self.labels.as_mut()) else {
            return Err(Error::Input("mnist stream is not initialized".to_string()));
        };

        let mut pixels = [0u8; ROWS * COLS];
        images.read_exact(&mut pixels)?;
        let mut label = [0u8; 1];
        labels.read_exact(&mut label)?;

        self.remaining -= 1;
        Ok((pixels.iter().map(|&p| p as f32 / 255.0).collect(), label[0] as usize))
    }

    fn finalize(&mut self) {
        self.images = None;
        self.labels = None;
        self.remaining = 0;
    }
}

impl SampleReader for MnistStream {
    fn produce_sample(&mut self) -> Result<Option<Sample>> {
        if self.remaining == 0 {
            return Ok(None);
        }
        let (data, label) = self.next_sample()?;
        Ok(Some(Sample::labeled(data, label)))
    }

    fn rewind(&mut self) -> Result<()> {
        let dir = self
            .dir
            .clone()
            .ok_or_else(|| Error::Input("mnist stream is not initialized".to_string()))?;
        self.initialize(&dir).map(|_| ())
    }
}

fn read_u32(reader: &mut impl Read) -> Result<u32> {
    let mut buf = [0u8; 4];
    reader
        .read_exact(&mut buf)
        .map_err(|e| Error::Input(format!("truncated mnist header: {}", e)))?;
    Ok(u32::from_be_bytes(buf))
}

/// Render a digit as ASCII art, darkest pixels as `@`
pub fn render_ascii(pixels: &[f32], cols: usize, label: usize) -> String {
    const RAMP: &[u8] = b" .:-=+*#%@";
    let mut out = format!("label: {}\n", label);
    for row in pixels.chunks(cols.max(1)) {
        for &p in row {
            let level = (p.clamp(0.0, 1.0) * (RAMP.len() - 1) as f32).round() as usize;
            out.push(RAMP[level] as char);
        }
        out.push('\n');
    }
    out
}
