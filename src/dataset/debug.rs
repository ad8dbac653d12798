use std::fs;
use std::path::{Path, PathBuf};

use log::debug;

use crate::error::{Error, Result};

use super::{Sample, SampleReader};

/// Read whitespace separated float literals until end of file
pub fn read_float_file(path: &Path) -> Result<Vec<f32>> {
    let text = fs::read_to_string(path)
        .map_err(|e| Error::Input(format!("can not read debug file {}: {}", path.display(), e)))?;

    text.split_whitespace()
        .enumerate()
        .map(|(i, token)| {
            token.parse::<f32>().map_err(|_| {
                Error::Input(format!(
                    "{}: value {} is not a float: {:?}",
                    path.display(),
                    i,
                    token
                ))
            })
        })
        .collect()
}

/// Reader producing one sample from an ASCII float file.
///
/// The file must hold at least `required` values; nothing is padded.
#[derive(Debug, Clone)]
pub struct DebugFloatReader {
    path: PathBuf,
    required: usize,
    consumed: bool,
}

impl DebugFloatReader {
    pub fn new(path: impl Into<PathBuf>, required: usize) -> Self {
        Self {
            path: path.into(),
            required,
            consumed: false,
        }
    }

    /// Read and validate the whole file
    pub fn read(&self) -> Result<Vec<f32>> {
        debug!("reading debug: {}", self.path.display());
        let values = read_float_file(&self.path)?;
        if values.len() < self.required {
            return Err(Error::Input(format!(
                "model requires {} inputs, only {} provided",
                self.required,
                values.len()
            )));
        }
        Ok(values)
    }
}

impl SampleReader for DebugFloatReader {
    fn produce_sample(&mut self) -> Result<Option<Sample>> {
        if self.consumed {
            return Ok(None);
        }
        let values = self.read()?;
        self.consumed = true;
        Ok(Some(Sample::unlabeled(values)))
    }

    fn rewind(&mut self) -> Result<()> {
        self.consumed = false;
        Ok(())
    }
}
