// Model loading facade
//
// Parsing and compilation live outside this crate. A `ModelLoader`
// implementation turns a `ModelSpec` into a compiled model plus the device
// adapter for its target; this module validates the `ModelSpec` and normalises
// every failure into `Error::ModelLoadError`.

use std::path::{Path, PathBuf};

use log::{info, warn};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::error::{Error, Result};
use crate::execution::{DeviceAdapter, Target};
use crate::model::CompiledModel;

/// Serialized model format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ModelFormat {
    Onnx,
    TfProtobuf,
}

/// Input tensor layout of a frozen TensorFlow graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    Nchw,
    Nhwc,
}

/// Quantization applied at compile time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Quantize {
    None,
    Fp16,
    Int8,
}

/// Everything an external loader needs to produce a compiled model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    pub format: ModelFormat,
    pub path: PathBuf,
    /// Explicit layout request; `None` keeps the format default
    #[serde(default)]
    pub layout: Option<Layout>,
    #[serde(default = "default_quantize")]
    pub quantize: Quantize,
    #[serde(default)]
    pub target: Target,
    #[serde(default)]
    pub trace_compile: bool,
    #[serde(default)]
    pub trace_eval: bool,
}

fn default_quantize() -> Quantize {
    Quantize::None
}

impl ModelSpec {
    pub fn new(format: ModelFormat, path: impl Into<PathBuf>) -> Self {
        Self {
            format,
            path: path.into(),
            layout: None,
            quantize: Quantize::None,
            target: Target::default(),
            trace_compile: false,
            trace_eval: false,
        }
    }

    pub fn onnx(path: impl Into<PathBuf>) -> Self {
        Self::new(ModelFormat::Onnx, path)
    }

    pub fn tf_protobuf(path: impl Into<PathBuf>) -> Self {
        Self::new(ModelFormat::TfProtobuf, path)
    }

    pub fn set_layout(mut self, layout: Layout) -> Self {
        self.layout = Some(layout);
        self
    }

    pub fn set_quantize(mut self, quantize: Quantize) -> Self {
        self.quantize = quantize;
        self
    }

    pub fn set_target(mut self, target: Target) -> Self {
        self.target = target;
        self
    }

    pub fn enable_trace_compile(mut self, enable: bool) -> Self {
        self.trace_compile = enable;
        self
    }

    pub fn enable_trace_eval(mut self, enable: bool) -> Self {
        self.trace_eval = enable;
        self
    }

    /// Layout the loader should use
    pub fn effective_layout(&self) -> Layout {
        match (self.format, self.layout) {
            (_, Some(layout)) => layout,
            (ModelFormat::Onnx, None) => Layout::Nchw,
            (ModelFormat::TfProtobuf, None) => Layout::Nhwc,
        }
    }

    /// Reject contradictory combinations
    pub fn validate(&self) -> Result<()> {
        if self.format == ModelFormat::Onnx && self.layout == Some(Layout::Nhwc) {
            return Err(Error::Configuration(
                "the NHWC layout only applies to tensorflow models".to_string(),
            ));
        }
        if self.path.as_os_str().is_empty() {
            return Err(Error::Configuration("model path is empty".to_string()));
        }
        if self.quantize == Quantize::Int8 {
            warn!("int8 quantization not yet implemented, compiling without it");
        }
        Ok(())
    }
}

/// A compiled model bound to the adapter for the device it was compiled for
pub struct LoadedModel {
    pub model: Box<dyn CompiledModel>,
    pub device: Box<dyn DeviceAdapter>,
}

impl std::fmt::Debug for LoadedModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedModel")
            .field("instructions", &self.model.size())
            .field("device", &self.device.is_device())
            .finish()
    }
}

/// Parses and compiles models; implemented outside this crate
pub trait ModelLoader {
    fn load(&self, spec: &ModelSpec) -> Result<LoadedModel>;
}

/// Validate `spec` and load it. Any loader failure becomes a `ModelLoadError`.
pub fn load_model(loader: &dyn ModelLoader, spec: &ModelSpec) -> Result<LoadedModel> {
    spec.validate()?;
    if !spec.path.exists() {
        return Err(Error::ModelLoadError(spec.path.clone(), "file does not exist".to_string()));
    }

    info!(
        "loading {} model {} ({} layout) for {}",
        spec.format,
        spec.path.display(),
        spec.effective_layout(),
        spec.target
    );
    loader.load(spec).map_err(|e| into_load_error(&spec.path, e))
}

fn into_load_error(path: &Path, error: Error) -> Error {
    match error {
        e @ Error::ModelLoadError(..) => e,
        other => Error::ModelLoadError(path.to_path_buf(), other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::HostAdapter;
    use crate::model::{ParameterMap, ParameterShapes};
    use crate::tensor::Argument;
    use std::fmt;
    use std::io::Write;

    struct EmptyModel;

    impl fmt::Display for EmptyModel {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "empty")
        }
    }

    impl CompiledModel for EmptyModel {
        fn parameter_shapes(&self) -> ParameterShapes {
            ParameterShapes::new()
        }
        fn eval(&self, _params: &ParameterMap) -> Result<Argument> {
            Argument::new(vec![1].into(), vec![0.0])
        }
        fn size(&self) -> usize {
            0
        }
        fn remove_instructions(&mut self, _count: usize) -> Result<()> {
            Ok(())
        }
        fn perf_report(&self, _out: &mut dyn Write, _iterations: usize, _params: &ParameterMap) -> Result<()> {
            Ok(())
        }
        fn clone_model(&self) -> Box<dyn CompiledModel> {
            Box::new(EmptyModel)
        }
    }

    struct Loader {
        fail: bool,
    }

    impl ModelLoader for Loader {
        fn load(&self, _spec: &ModelSpec) -> Result<LoadedModel> {
            if self.fail {
                return Err(Error::Input("unsupported operator: Foo".to_string()));
            }
            Ok(LoadedModel {
                model: Box::new(EmptyModel),
                device: Box::new(HostAdapter),
            })
        }
    }

    #[test]
    fn test_onnx_rejects_nhwc() {
        let spec = ModelSpec::onnx("resnet50.onnx").set_layout(Layout::Nhwc);
        assert!(spec.validate().unwrap_err().is_configuration());

        let spec = ModelSpec::tf_protobuf("inception.pb").set_layout(Layout::Nchw);
        assert!(spec.validate().is_ok());
        assert_eq!(spec.effective_layout(), Layout::Nchw);
        assert_eq!(ModelSpec::tf_protobuf("x.pb").effective_layout(), Layout::Nhwc);
    }

    #[test]
    fn test_int8_is_accepted() {
        let spec = ModelSpec::onnx("m.onnx").set_quantize(Quantize::Int8);
        assert!(spec.validate().is_ok());
    }

    #[test]
    fn test_load_fails_fast() {
        let dir = tempfile::tempdir().unwrap();
        let missing = ModelSpec::onnx(dir.path().join("missing.onnx"));
        assert!(matches!(
            load_model(&Loader { fail: false }, &missing),
            Err(Error::ModelLoadError(..))
        ));

        let path = dir.path().join("model.onnx");
        std::fs::write(&path, b"\x08\x07").unwrap();
        let spec = ModelSpec::onnx(&path);
        let err = load_model(&Loader { fail: true }, &spec).unwrap_err();
        match err {
            Error::ModelLoadError(p, msg) => {
                assert_eq!(p, path);
                assert!(msg.contains("unsupported operator"));
            }
            other => panic!("unexpected error: {}", other),
        }

        let loaded = load_model(&Loader { fail: false }, &spec).unwrap();
        assert_eq!(loaded.model.size(), 0);
        assert!(!loaded.device.is_device());
    }

    #[test]
    fn test_spec_from_json() {
        let spec: ModelSpec =
            serde_json::from_str(r#"{"format": "tf_protobuf", "path": "m.pb", "target": "cpu"}"#).unwrap();
        assert_eq!(spec.format, ModelFormat::TfProtobuf);
        assert_eq!(spec.target, Target::Cpu);
        assert_eq!(spec.quantize, Quantize::None);
    }
}
