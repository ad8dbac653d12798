use log::debug;

use crate::error::{Error, Result};
use crate::execution::{DeviceAdapter, ExecutionOptions};
use crate::model::{CompiledModel, ParameterMap};
use crate::tensor::{generate_argument, stable_hash};

/// Build the parameter map for `model`.
///
/// Every parameter except the bound input is filled: seeded random data on
/// the host, a zeroed device buffer, or seeded random data copied to the
/// device when random input is requested. The bound input is left out for
/// the run mode to stage.
pub fn bind_parameters(
    model: &dyn CompiledModel,
    device: &dyn DeviceAdapter,
    options: &ExecutionOptions,
) -> Result<ParameterMap> {
    let shapes = model.parameter_shapes();
    if !shapes.contains_key(&options.arg_name) {
        return Err(Error::ParameterNotFound {
            name: options.arg_name.clone(),
            candidates: shapes.keys().cloned().collect(),
        });
    }

    let mut params = ParameterMap::new();
    for (name, shape) in &shapes {
        if *name == options.arg_name {
            continue;
        }
        let argument = if device.is_device() && options.random_input {
            device.to_device(generate_argument(shape, stable_hash(name)))?
        } else if device.is_device() {
            device.allocate(shape)?
        } else {
            generate_argument(shape, stable_hash(name))
        };
        debug!("bound parameter {} {}", name, shape);
        params.insert(name.clone(), argument);
    }
    Ok(params)
}
