// Run-mode dispatcher
//
// `Harness` owns nothing but the configuration and label table; the model and
// device adapter are borrowed for the lifetime of the harness and never
// mutated. Trimming works on a clone of the model.

pub mod binder;
pub mod config;
pub mod run_mode;
mod session;

use std::io::Write;
use std::path::Path;

use log::{info, warn};

use crate::dataset::{DirectoryIndexReader, MnistStream, SampleReader, StreamingDataset};
use crate::error::{Error, Result};
use crate::execution::DeviceAdapter;
use crate::labels::LabelTable;
use crate::model::CompiledModel;
use crate::tools::report::{ModelListing, RunReport};

pub use binder::bind_parameters;
pub use config::{HarnessConfig, InputSource};
pub use run_mode::RunMode;

use session::Session;

/// Evaluation harness for one compiled model
pub struct Harness<'a> {
    config: HarnessConfig,
    model: &'a dyn CompiledModel,
    device: &'a dyn DeviceAdapter,
    labels: LabelTable,
}

impl<'a> Harness<'a> {
    /// Validate `config` and load the label table it names
    pub fn new(config: HarnessConfig, model: &'a dyn CompiledModel, device: &'a dyn DeviceAdapter) -> Result<Self> {
        config.validate()?;
        let labels = match &config.label_file {
            Some(path) => LabelTable::load(path)?,
            None => LabelTable::default(),
        };
        Ok(Self {
            config,
            model,
            device,
            labels,
        })
    }

    /// Replace the label table used for classification output
    pub fn with_labels(mut self, labels: LabelTable) -> Self {
        self.labels = labels;
        self
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn labels(&self) -> &LabelTable {
        &self.labels
    }

    /// Run the configured mode, writing its report lines to `out`
    pub fn run(&self, out: &mut dyn Write) -> Result<RunReport> {
        let trimmed = self.trimmed_model()?;
        let model: &dyn CompiledModel = match &trimmed {
            Some(m) => &**m,
            None => self.model,
        };

        info!("run mode {}", self.config.run_mode);
        match self.config.run_mode {
            RunMode::None => Ok(RunReport::None),
            RunMode::PrintModel => self.print_model(model, out).map(RunReport::ModelListing),
            RunMode::Benchmark => self.session(model, out)?.benchmark(out),
            RunMode::PerfReport => self.session(model, out)?.perf_report(out),
            RunMode::SingleImage => {
                let InputSource::Image(path) = &self.config.input else {
                    return Err(Error::Configuration(
                        "single image classification requires an image file".to_string(),
                    ));
                };
                self.session(model, out)?.single_image(path, out)
            }
            RunMode::ImageNetSweep => {
                let mut session = self.session(model, out)?;
                let dir = self.imagenet_dir()?;
                let mut reader = DirectoryIndexReader::open(
                    dir,
                    &self.config.index_file,
                    session.category(),
                    self.config.normalization,
                )?;
                session.imagenet_sweep(&mut reader, out)
            }
            RunMode::MnistSweep => {
                let dir = self.mnist_dir()?;
                let mut stream = MnistStream::new();
                self.session(model, out)?.mnist_sweep(&mut stream, dir, out)
            }
            RunMode::Eval => self.session(model, out)?.eval(out).map(RunReport::Eval),
            RunMode::EvalAndPrint => {
                let mut session = self.session(model, out)?;
                let listing = self.print_model(model, out)?;
                let output = session.eval(out)?;
                Ok(RunReport::EvalAndPrint { listing, output })
            }
        }
    }

    /// Accuracy sweep over any labelled sample source
    pub fn run_imagenet_sweep(&self, reader: &mut dyn SampleReader, out: &mut dyn Write) -> Result<RunReport> {
        let trimmed = self.trimmed_model()?;
        let model: &dyn CompiledModel = match &trimmed {
            Some(m) => &**m,
            None => self.model,
        };
        self.session(model, out)?.imagenet_sweep(reader, out)
    }

    /// MNIST sweep over any streaming dataset rooted at `dir`
    pub fn run_mnist_sweep(
        &self,
        dataset: &mut dyn StreamingDataset,
        dir: &Path,
        out: &mut dyn Write,
    ) -> Result<RunReport> {
        let trimmed = self.trimmed_model()?;
        let model: &dyn CompiledModel = match &trimmed {
            Some(m) => &**m,
            None => self.model,
        };
        self.session(model, out)?.mnist_sweep(dataset, dir, out)
    }

    fn session<'s>(&'s self, model: &'s dyn CompiledModel, out: &mut dyn Write) -> Result<Session<'s>> {
        Session::bind(&self.config, &self.labels, model, self.device, out)
    }

    /// Clone and shorten the model when a trim inside its size is requested
    fn trimmed_model(&self) -> Result<Option<Box<dyn CompiledModel>>> {
        let trim = self.config.trim_count();
        if trim == 0 {
            return Ok(None);
        }
        let size = self.model.size();
        if trim >= size {
            warn!("trim {} >= program size {}, ignored", trim, size);
            return Ok(None);
        }

        info!("removing last {} of {} instructions", trim, size);
        let mut trimmed = self.model.clone_model();
        trimmed.remove_instructions(trim)?;
        Ok(Some(trimmed))
    }

    fn print_model(&self, model: &dyn CompiledModel, out: &mut dyn Write) -> Result<ModelListing> {
        let shapes = model.parameter_shapes();
        if !shapes.contains_key(&self.config.arg_name) {
            let error = Error::ParameterNotFound {
                name: self.config.arg_name.clone(),
                candidates: shapes.keys().cloned().collect(),
            };
            warn!("{}", error);
        }

        let text = model.to_string();
        writeln!(out, "Program with {} instructions", model.size())?;
        write!(out, "{}", text)?;
        if !text.ends_with('\n') {
            writeln!(out)?;
        }
        Ok(ModelListing {
            instructions: model.size(),
            text,
        })
    }

    fn imagenet_dir(&self) -> Result<&Path> {
        self.config
            .imagenet_dir
            .as_deref()
            .ok_or_else(|| Error::Configuration("imagenet sweep requires an imagenet directory".to_string()))
    }

    fn mnist_dir(&self) -> Result<&Path> {
        self.config
            .mnist_dir
            .as_deref()
            .ok_or_else(|| Error::Configuration("mnist sweep requires an mnist directory".to_string()))
    }
}

impl std::fmt::Debug for Harness<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Harness")
            .field("config", &self.config)
            .field("instructions", &self.model.size())
            .field("device", &self.device.is_device())
            .field("labels", &self.labels.len())
            .finish()
    }
}
