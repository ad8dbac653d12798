pub mod context;
pub mod device;
pub mod engine;

pub use context::{ExecutionOptions, Target};
pub use device::{DeviceAdapter, HostAdapter, StagingDevice, TransferStats};
pub use engine::{ExecutionEngine, ProfileEvent};
