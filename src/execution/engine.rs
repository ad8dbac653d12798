use std::time::{Duration, Instant};

use log::debug;

use crate::error::{Error, Result};
use crate::model::{CompiledModel, ParameterMap};
use crate::tensor::{Argument, Shape};

use super::context::ExecutionOptions;
use super::device::DeviceAdapter;

/// Profiling event data
#[derive(Debug, Clone)]
pub struct ProfileEvent {
    /// Sequence number of the run
    pub id: usize,
    pub name: String,
    /// Wall time from eval call to completed device barrier
    pub duration: Duration,
}

/// Runs a compiled model against a parameter map.
///
/// Every evaluation is followed by a device barrier, so results are
/// materialised and timings include real completion.
pub struct ExecutionEngine<'a> {
    model: &'a dyn CompiledModel,
    device: &'a dyn DeviceAdapter,
    options: ExecutionOptions,
    input_shape: Shape,
    profile_events: Vec<ProfileEvent>,
    run_count: usize,
}

impl<'a> ExecutionEngine<'a> {
    /// Create an engine feeding `options.arg_name`
    pub fn new(
        model: &'a dyn CompiledModel,
        device: &'a dyn DeviceAdapter,
        options: ExecutionOptions,
    ) -> Result<Self> {
        let shapes = model.parameter_shapes();
        let input_shape = shapes.get(&options.arg_name).cloned().ok_or_else(|| {
            Error::ParameterNotFound {
                name: options.arg_name.clone(),
                candidates: shapes.keys().cloned().collect(),
            }
        })?;

        Ok(Self {
            model,
            device,
            options,
            input_shape,
            profile_events: Vec::new(),
            run_count: 0,
        })
    }

    pub fn arg_name(&self) -> &str {
        &self.options.arg_name
    }

    /// Shape of the bound input parameter
    pub fn input_shape(&self) -> &Shape {
        &self.input_shape
    }

    pub fn options(&self) -> &ExecutionOptions {
        &self.options
    }

    pub fn device(&self) -> &dyn DeviceAdapter {
        self.device
    }

    /// Bind sample data to the input parameter, staging it on the device.
    ///
    /// Extra values beyond the input's element count are ignored; fewer is an
    /// input error.
    pub fn stage_input(&self, params: &mut ParameterMap, mut data: Vec<f32>) -> Result<()> {
        let required = self.input_shape.elements();
        if data.len() < required {
            return Err(Error::Input(format!(
                "model requires {} inputs, only {} provided",
                required,
                data.len()
            )));
        }
        data.truncate(required);
        let argument = Argument::new(self.input_shape.clone(), data)?;
        self.stage_argument(params, argument)
    }

    /// Bind an already built host argument to the input parameter
    pub fn stage_argument(&self, params: &mut ParameterMap, argument: Argument) -> Result<()> {
        let staged = self.device.to_device(argument)?;
        params.insert(self.options.arg_name.clone(), staged);
        Ok(())
    }

    /// Evaluate once and wait for completion. The result may be device resident.
    pub fn run(&mut self, params: &ParameterMap) -> Result<Argument> {
        if !params.contains(&self.options.arg_name) {
            return Err(Error::Configuration(format!(
                "input argument {} has not been bound",
                self.options.arg_name
            )));
        }

        let start = Instant::now();
        let result = self.model.eval(params)?;
        self.device.finish()?;
        let duration = start.elapsed();

        if self.options.enable_profiling {
            self.profile_events.push(ProfileEvent {
                id: self.run_count,
                name: "model_execution".to_string(),
                duration,
            });
        }
        self.run_count += 1;
        Ok(result)
    }

    /// Evaluate once and return a host readable result
    pub fn run_to_host(&mut self, params: &ParameterMap) -> Result<Argument> {
        let result = self.run(params)?;
        self.to_host(result)
    }

    /// Pull a result back from the device if needed
    pub fn to_host(&self, result: Argument) -> Result<Argument> {
        if result.is_device() {
            debug!("copying result {} back from device", result.shape());
            self.device.from_device(result)
        } else {
            Ok(result)
        }
    }

    /// Number of completed evaluations
    pub fn run_count(&self) -> usize {
        self.run_count
    }

    pub fn profile_events(&self) -> &[ProfileEvent] {
        &self.profile_events
    }

    /// Recorded run durations, in execution order
    pub fn latencies(&self) -> Vec<Duration> {
        self.profile_events.iter().map(|e| e.duration).collect()
    }

    pub fn clear_profile(&mut self) {
        self.profile_events.clear();
    }
}

impl std::fmt::Debug for ExecutionEngine<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionEngine")
            .field("arg_name", &self.options.arg_name)
            .field("input_shape", &self.input_shape)
            .field("device", &self.device.is_device())
            .field("run_count", &self.run_count)
            .finish()
    }
}
