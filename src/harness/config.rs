use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::dataset::{Normalization, DEFAULT_INDEX_FILE};
use crate::error::{Error, Result};
use crate::execution::ExecutionOptions;

use super::run_mode::RunMode;

/// Where the Eval and SingleImage modes take their input from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputSource {
    /// Seeded random data
    None,
    Image(PathBuf),
    /// ASCII float file
    DebugFile(PathBuf),
}

impl Default for InputSource {
    fn default() -> Self {
        InputSource::None
    }
}

/// Immutable run configuration handed to the harness
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    pub run_mode: RunMode,
    /// Benchmark and perf report iterations; negative is rejected
    pub iterations: i64,
    pub copy_arg: bool,
    /// Name of the parameter fed with sample data
    pub arg_name: String,
    pub random_input: bool,
    /// Record per-iteration latencies in benchmark mode
    pub profiling: bool,
    pub input: InputSource,
    pub imagenet_dir: Option<PathBuf>,
    pub index_file: String,
    pub mnist_dir: Option<PathBuf>,
    /// Instructions removed from the end of the model; 0 keeps all
    pub trim: i64,
    pub label_file: Option<PathBuf>,
    pub normalization: Normalization,
    pub verbose: bool,
    /// Sweep progress is reported every this many samples
    pub progress_interval: usize,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            run_mode: RunMode::None,
            iterations: 1000,
            copy_arg: false,
            arg_name: "0".to_string(),
            random_input: false,
            profiling: false,
            input: InputSource::None,
            imagenet_dir: None,
            index_file: DEFAULT_INDEX_FILE.to_string(),
            mnist_dir: None,
            trim: 0,
            label_file: None,
            normalization: Normalization::MeanStd,
            verbose: false,
            progress_interval: 1000,
        }
    }
}

impl HarnessConfig {
    pub fn new(run_mode: RunMode) -> Self {
        Self {
            run_mode,
            ..Self::default()
        }
    }

    /// Load from a JSON document; missing fields take their defaults
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn set_run_mode(mut self, run_mode: RunMode) -> Self {
        self.run_mode = self.run_mode.select(run_mode);
        self
    }

    pub fn set_iterations(mut self, iterations: i64) -> Self {
        self.iterations = iterations;
        self
    }

    pub fn enable_copy_arg(mut self, enable: bool) -> Self {
        self.copy_arg = enable;
        self
    }

    pub fn set_arg_name(mut self, arg_name: impl Into<String>) -> Self {
        self.arg_name = arg_name.into();
        self
    }

    pub fn enable_random_input(mut self, enable: bool) -> Self {
        self.random_input = enable;
        self
    }

    pub fn enable_profiling(mut self, enable: bool) -> Self {
        self.profiling = enable;
        self
    }

    pub fn set_image(mut self, path: impl Into<PathBuf>) -> Self {
        self.input = InputSource::Image(path.into());
        self
    }

    pub fn set_debug_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.input = InputSource::DebugFile(path.into());
        self
    }

    pub fn set_imagenet_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.imagenet_dir = Some(dir.into());
        self
    }

    pub fn set_index_file(mut self, name: impl Into<String>) -> Self {
        self.index_file = name.into();
        self
    }

    pub fn set_mnist_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.mnist_dir = Some(dir.into());
        self
    }

    pub fn set_trim(mut self, trim: i64) -> Self {
        self.trim = trim;
        self
    }

    pub fn set_label_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.label_file = Some(path.into());
        self
    }

    pub fn set_normalization(mut self, normalization: Normalization) -> Self {
        self.normalization = normalization;
        self
    }

    pub fn enable_verbose(mut self, enable: bool) -> Self {
        self.verbose = enable;
        self
    }

    pub fn set_progress_interval(mut self, interval: usize) -> Self {
        self.progress_interval = interval;
        self
    }

    /// Check the prerequisites of the selected run mode
    pub fn validate(&self) -> Result<()> {
        if self.iterations < 0 {
            return Err(Error::Configuration(format!("iterations < 0: {}", self.iterations)));
        }
        if self.trim < 0 {
            return Err(Error::Configuration(format!("trim < 0: {}", self.trim)));
        }
        if self.progress_interval == 0 {
            return Err(Error::Configuration("progress interval must be positive".to_string()));
        }
        if self.arg_name.is_empty() {
            return Err(Error::Configuration("input argument name is empty".to_string()));
        }

        match self.run_mode {
            RunMode::SingleImage if !matches!(self.input, InputSource::Image(_)) => Err(Error::Configuration(
                "single image classification requires an image file".to_string(),
            )),
            RunMode::ImageNetSweep if self.imagenet_dir.is_none() => Err(Error::Configuration(
                "imagenet sweep requires an imagenet directory".to_string(),
            )),
            RunMode::MnistSweep if self.mnist_dir.is_none() => Err(Error::Configuration(
                "mnist sweep requires an mnist directory".to_string(),
            )),
            _ => Ok(()),
        }
    }

    /// Options for the execution engine
    pub fn execution_options(&self) -> ExecutionOptions {
        ExecutionOptions::new()
            .set_arg_name(self.arg_name.clone())
            .enable_copy_arg(self.copy_arg)
            .enable_random_input(self.random_input)
            .enable_profiling(self.profiling)
    }

    /// Iteration count once validated
    pub fn iteration_count(&self) -> usize {
        self.iterations.max(0) as usize
    }

    /// Trim count once validated
    pub fn trim_count(&self) -> usize {
        self.trim.max(0) as usize
    }
}
