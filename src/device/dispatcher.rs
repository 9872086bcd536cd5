//! Per-call choice between CPU and accelerator evaluation.

use super::allocator::{DeviceAllocator, DeviceHandle, DeviceKind, DeviceStatus};
use crate::error::Result;
use crate::fitness::{AcceleratorEvaluator, CpuEvaluator, Evaluator};
use crate::population::Population;
use rand::RngCore;
use std::sync::Arc;
use tracing::debug;

/// Chooses an evaluation backend for each call.
///
/// The set of backends is fixed at construction: an accelerator backend
/// exists only if the allocator reported an accelerator device then.
/// Individual calls only decide which of them to reserve.
pub struct DeviceDispatcher {
    allocator: Arc<dyn DeviceAllocator>,
    cpu: Arc<dyn Evaluator>,
    accelerator: Option<Arc<dyn Evaluator>>,
}

impl DeviceDispatcher {
    /// Builds a dispatcher with the default backends.
    pub fn new(allocator: Arc<dyn DeviceAllocator>) -> Self {
        let has_accelerator = allocator
            .device_status()
            .iter()
            .any(|d| d.kind == DeviceKind::Accelerator);
        let accelerator: Option<Arc<dyn Evaluator>> = if has_accelerator {
            Some(Arc::new(AcceleratorEvaluator::new()))
        } else {
            None
        };
        Self {
            allocator,
            cpu: Arc::new(CpuEvaluator::new()),
            accelerator,
        }
    }

    /// Builds a dispatcher with caller-supplied backends.
    pub fn with_evaluators(
        allocator: Arc<dyn DeviceAllocator>,
        cpu: Arc<dyn Evaluator>,
        accelerator: Option<Arc<dyn Evaluator>>,
    ) -> Self {
        Self {
            allocator,
            cpu,
            accelerator,
        }
    }

    /// Whether an accelerator backend is installed.
    pub fn has_accelerator(&self) -> bool {
        self.accelerator.is_some()
    }

    /// Status of every device known to the allocator.
    pub fn device_status(&self) -> Vec<DeviceStatus> {
        self.allocator.device_status()
    }

    /// Reserves a device for one evaluation call.
    ///
    /// Returns an accelerator lease if one was requested, is installed, and
    /// has a free slot; a CPU lease otherwise. The reservation is released
    /// when the lease is dropped.
    pub fn select(&self, requested_accelerator: bool) -> Result<DeviceLease<'_>> {
        let prefer = requested_accelerator && self.accelerator.is_some();
        let handle = self.allocator.try_reserve(prefer)?;
        let evaluator: &dyn Evaluator = match (handle.kind, &self.accelerator) {
            (DeviceKind::Accelerator, Some(acc)) => &**acc,
            _ => &*self.cpu,
        };
        if requested_accelerator && handle.kind == DeviceKind::Cpu {
            debug!(device = handle.id, "accelerator unavailable, using cpu");
        }
        Ok(DeviceLease {
            handle,
            evaluator,
            allocator: &*self.allocator,
        })
    }
}

impl std::fmt::Debug for DeviceDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceDispatcher")
            .field("has_accelerator", &self.has_accelerator())
            .finish()
    }
}

/// A held device reservation. Dropping it releases the device.
pub struct DeviceLease<'a> {
    handle: DeviceHandle,
    evaluator: &'a dyn Evaluator,
    allocator: &'a dyn DeviceAllocator,
}

impl DeviceLease<'_> {
    /// The reserved device.
    pub fn handle(&self) -> DeviceHandle {
        self.handle
    }

    /// Evaluates `population` on the reserved device.
    pub fn evaluate(&self, population: &Population, rng: &mut dyn RngCore) -> Result<Vec<f32>> {
        self.evaluator.evaluate(population, rng)
    }
}

impl Drop for DeviceLease<'_> {
    fn drop(&mut self) {
        self.allocator.release(self.handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::LocalAllocator;
    use crate::error::OptimizationError;
    use crate::random::create_rng;

    fn accelerated() -> (Arc<LocalAllocator>, DeviceDispatcher) {
        let alloc = Arc::new(LocalAllocator::cpu_only().with_accelerator(1 << 20, 1, 4.0));
        let dispatcher = DeviceDispatcher::new(alloc.clone());
        (alloc, dispatcher)
    }

    #[test]
    fn test_cpu_only_has_no_accelerator_backend() {
        let dispatcher = DeviceDispatcher::new(Arc::new(LocalAllocator::cpu_only()));
        assert!(!dispatcher.has_accelerator());
        let lease = dispatcher.select(true).unwrap();
        assert_eq!(lease.handle().kind, DeviceKind::Cpu);
    }

    #[test]
    fn test_accelerator_when_requested() {
        let (_, dispatcher) = accelerated();
        assert_eq!(dispatcher.select(true).unwrap().handle().kind, DeviceKind::Accelerator);
        assert_eq!(dispatcher.select(false).unwrap().handle().kind, DeviceKind::Cpu);
    }

    #[test]
    fn test_busy_accelerator_falls_back() {
        let (_, dispatcher) = accelerated();
        let first = dispatcher.select(true).unwrap();
        let second = dispatcher.select(true).unwrap();
        assert_eq!(first.handle().kind, DeviceKind::Accelerator);
        assert_eq!(second.handle().kind, DeviceKind::Cpu);
        drop(first);
        assert_eq!(dispatcher.select(true).unwrap().handle().kind, DeviceKind::Accelerator);
    }

    #[test]
    fn test_lease_released_after_failed_evaluation() {
        let (alloc, dispatcher) = accelerated();
        let pop = Population::from_rows("bad", vec![vec![f32::NAN]], vec![0.0], 1.0).unwrap();
        {
            let lease = dispatcher.select(true).unwrap();
            let err = lease.evaluate(&pop, &mut create_rng(0)).unwrap_err();
            assert!(matches!(err, OptimizationError::NumericOverflow { .. }));
        }
        let status = alloc.device_status();
        assert!(status[1].available);
        assert_eq!(status[1].load, 0.0);
    }

    #[test]
    fn test_accelerator_lease_is_deterministic() {
        let (_, dispatcher) = accelerated();
        let pop = Population::random("p", 8, 4, 1.0, &mut create_rng(1));
        let a = dispatcher.select(true).unwrap().evaluate(&pop, &mut create_rng(2)).unwrap();
        let b = dispatcher.select(true).unwrap().evaluate(&pop, &mut create_rng(3)).unwrap();
        assert_eq!(a, b);
    }
}
