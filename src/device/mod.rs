//! Device-aware execution.
//!
//! - [`DeviceAllocator`]: the external allocator interface
//! - [`LocalAllocator`]: in-process allocator with per-device locks
//! - [`DeviceDispatcher`]: picks a backend per call and hands out
//!   [`DeviceLease`]s that release themselves on drop

mod allocator;
mod dispatcher;

pub use allocator::{DeviceAllocator, DeviceHandle, DeviceKind, DeviceStatus, LocalAllocator};
pub use dispatcher::{DeviceDispatcher, DeviceLease};
