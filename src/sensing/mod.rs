pub mod controller;
pub mod loop_worker;
pub mod network;

pub use controller::{MonitorController, MonitorHandle};
pub use loop_worker::{EndOutcome, LoopTiming};
pub use network::{platform_sensor, NetworkSensor, PlatformSensor};
