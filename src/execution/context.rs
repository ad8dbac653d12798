use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// Device a model is compiled for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Target {
    Cpu,
    Gpu,
}

impl Default for Target {
    fn default() -> Self {
        Target::Gpu
    }
}

/// Options for the execution engine
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionOptions {
    /// Name of the parameter fed with sample data
    pub arg_name: String,
    /// Re-stage the input and pull the result back on every benchmark iteration
    pub copy_arg: bool,
    /// Fill parameters with random data before transferring them to the device
    pub random_input: bool,
    /// Record per-run latencies
    pub enable_profiling: bool,
}

impl Default for ExecutionOptions {
    fn default() -> Self {
        Self {
            arg_name: "0".to_string(),
            copy_arg: false,
            random_input: false,
            enable_profiling: false,
        }
    }
}

impl ExecutionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the bound input parameter name
    pub fn set_arg_name(mut self, arg_name: impl Into<String>) -> Self {
        self.arg_name = arg_name.into();
        self
    }

    pub fn enable_copy_arg(mut self, enable: bool) -> Self {
        self.copy_arg = enable;
        self
    }

    pub fn enable_random_input(mut self, enable: bool) -> Self {
        self.random_input = enable;
        self
    }

    /// Enable or disable latency profiling
    pub fn enable_profiling(mut self, enable: bool) -> Self {
        self.enable_profiling = enable;
        self
    }
}
