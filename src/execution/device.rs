use std::cell::Cell;

use log::trace;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::tensor::{Argument, Residency, Shape};

/// Moves arguments between host memory and a compute device.
///
/// The engine and run modes only talk to devices through this trait; the
/// concrete adapter is chosen once when the harness is built.
pub trait DeviceAdapter {
    /// Copy a host argument into device memory
    fn to_device(&self, argument: Argument) -> Result<Argument>;

    /// Copy a device argument back to host memory
    fn from_device(&self, argument: Argument) -> Result<Argument>;

    /// Zero-initialised device buffer of the given shape
    fn allocate(&self, shape: &Shape) -> Result<Argument>;

    /// Block until all queued device work has completed
    fn finish(&self) -> Result<()>;

    /// False for adapters whose operations are no-ops
    fn is_device(&self) -> bool;
}

/// Adapter for host-resident execution. Every operation is an identity.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostAdapter;

impl DeviceAdapter for HostAdapter {
    fn to_device(&self, argument: Argument) -> Result<Argument> {
        Ok(argument)
    }

    fn from_device(&self, argument: Argument) -> Result<Argument> {
        Ok(argument)
    }

    fn allocate(&self, shape: &Shape) -> Result<Argument> {
        Ok(Argument::zeros(shape))
    }

    fn finish(&self) -> Result<()> {
        Ok(())
    }

    fn is_device(&self) -> bool {
        false
    }
}

/// Transfer counters kept by [`StagingDevice`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferStats {
    pub to_device: usize,
    pub from_device: usize,
    pub allocations: usize,
    pub barriers: usize,
    pub bytes_to_device: usize,
    pub bytes_from_device: usize,
}

/// Adapter for a discrete memory space mirrored in host RAM.
///
/// Transfers copy the buffer and retag its residency, so host code cannot
/// read a device buffer without an explicit `from_device`. Backends without
/// their own transfer path use it directly.
#[derive(Debug, Default)]
pub struct StagingDevice {
    stats: Cell<TransferStats>,
}

impl StagingDevice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> TransferStats {
        self.stats.get()
    }

    fn record(&self, update: impl FnOnce(&mut TransferStats)) {
        let mut stats = self.stats.get();
        update(&mut stats);
        self.stats.set(stats);
    }
}

impl DeviceAdapter for StagingDevice {
    fn to_device(&self, argument: Argument) -> Result<Argument> {
        if argument.is_device() {
            return Ok(argument);
        }
        let bytes = argument.shape().elements() * std::mem::size_of::<f32>();
        let staged = Argument::new(argument.shape().clone(), argument.raw().iter().copied().collect())?
            .with_residency(Residency::Device);
        trace!("to_device {} ({} bytes)", argument.shape(), bytes);
        self.record(|s| {
            s.to_device += 1;
            s.bytes_to_device += bytes;
        });
        Ok(staged)
    }

    fn from_device(&self, argument: Argument) -> Result<Argument> {
        if !argument.is_device() {
            return Err(Error::Input(format!(
                "from_device called on host argument {}",
                argument.shape()
            )));
        }
        let bytes = argument.shape().elements() * std::mem::size_of::<f32>();
        let host = Argument::new(argument.shape().clone(), argument.raw().iter().copied().collect())?;
        trace!("from_device {} ({} bytes)", argument.shape(), bytes);
        self.record(|s| {
            s.from_device += 1;
            s.bytes_from_device += bytes;
        });
        Ok(host)
    }

    fn allocate(&self, shape: &Shape) -> Result<Argument> {
        self.record(|s| s.allocations += 1);
        Ok(Argument::zeros(shape).with_residency(Residency::Device))
    }

    fn finish(&self) -> Result<()> {
        self.record(|s| s.barriers += 1);
        Ok(())
    }

    fn is_device(&self) -> bool {
        true
    }
}
