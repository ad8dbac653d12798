pub mod error;
pub mod tensor;
pub mod model;
pub mod execution;
pub mod dataset;
pub mod scoring;
pub mod labels;
pub mod loader;
pub mod harness;
pub mod tools;

// Re-export commonly used types
pub use error::{Error, Result};
pub use tensor::{generate_argument, stable_hash, Argument, Residency, Shape};
pub use model::{CompiledModel, ImageCategory, ParameterMap, ParameterShapes};
pub use execution::{
    DeviceAdapter, ExecutionEngine, ExecutionOptions, HostAdapter, ProfileEvent, StagingDevice, Target, TransferStats,
};
pub use dataset::{
    DebugFloatReader, DirectoryIndexReader, MnistStream, Normalization, Sample, SampleReader, SingleImageReader,
    StreamingDataset,
};
pub use scoring::{argmax, top5, AccuracyAccumulator};
pub use labels::LabelTable;
pub use loader::{load_model, Layout, LoadedModel, ModelFormat, ModelLoader, ModelSpec, Quantize};
pub use harness::{bind_parameters, Harness, HarnessConfig, InputSource, RunMode};
pub use tools::report::{export_report, ReportFormat, RunReport};
