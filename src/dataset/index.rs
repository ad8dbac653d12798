use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::model::ImageCategory;

use super::image::{read_image, Normalization};
use super::{Sample, SampleReader};

/// Index file looked up inside an ImageNet validation directory
pub const DEFAULT_INDEX_FILE: &str = "val.txt";

/// Lazy reader over `<root>/<index>` records of the form `<relative-path> <label>`
#[derive(Debug)]
pub struct DirectoryIndexReader {
    root: PathBuf,
    index_path: PathBuf,
    category: ImageCategory,
    normalization: Normalization,
    reader: BufReader<File>,
    line_number: usize,
}

impl DirectoryIndexReader {
    /// Open the index. A missing directory, a missing index or an index with
    /// no records are all input errors.
    pub fn open(
        root: impl AsRef<Path>,
        index_file: &str,
        category: ImageCategory,
        normalization: Normalization,
    ) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_dir() {
            return Err(Error::Input(format!("can not change to imagenet dir: {}", root.display())));
        }
        if category == ImageCategory::Unknown {
            return Err(Error::Input(
                "imagenet sweep requires a 3x224x224 or 3x299x299 model input".to_string(),
            ));
        }

        let index_path = root.join(index_file);
        let file = File::open(&index_path)
            .map_err(|e| Error::Input(format!("can not open {}: {}", index_path.display(), e)))?;

        let mut reader = Self {
            root,
            index_path,
            category,
            normalization,
            reader: BufReader::new(file),
            line_number: 0,
        };
        if reader.next_record()?.is_none() {
            return Err(Error::Input(format!("index {} has no records", reader.index_path.display())));
        }
        reader.rewind()?;
        Ok(reader)
    }

    pub fn index_path(&self) -> &Path {
        &self.index_path
    }

    /// Next `(path, label)` record without decoding the image
    pub fn next_record(&mut self) -> Result<Option<(PathBuf, usize)>> {
        let mut line = String::new();
        loop {
            line.clear();
            if self.reader.read_line(&mut line)? == 0 {
                return Ok(None);
            }
            self.line_number += 1;

            let mut fields = line.split_whitespace();
            let Some(file) = fields.next() else {
                continue;
            };
            let label = fields
                .next()
                .ok_or_else(|| self.malformed("missing label"))?
                .parse::<usize>()
                .map_err(|e| self.malformed(&e.to_string()))?;
            if fields.next().is_some() {
                return Err(self.malformed("unexpected field after label"));
            }
            return Ok(Some((self.root.join(file), label)));
        }
    }

    fn malformed(&self, reason: &str) -> Error {
        Error::Input(format!(
            "{} line {}: {}",
            self.index_path.display(),
            self.line_number,
            reason
        ))
    }
}

impl SampleReader for DirectoryIndexReader {
    fn produce_sample(&mut self) -> Result<Option<Sample>> {
        match self.next_record()? {
            Some((path, label)) => {
                let data = read_image(&path, self.category, self.normalization)?;
                Ok(Some(Sample::labeled(data, label)))
            }
            None => Ok(None),
        }
    }

    fn rewind(&mut self) -> Result<()> {
        self.reader.seek(SeekFrom::Start(0))?;
        self.line_number = 0;
        Ok(())
    }
}
