//! Device allocator interface and an in-process implementation.

use crate::error::{OptimizationError, Result};
use parking_lot::Mutex;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::fmt;

/// Class of execution device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum DeviceKind {
    /// Host CPU.
    Cpu,
    /// GPU or other accelerator.
    Accelerator,
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceKind::Cpu => f.write_str("cpu"),
            DeviceKind::Accelerator => f.write_str("accelerator"),
        }
    }
}

/// Reservation token for one device slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceHandle {
    /// Allocator-assigned device index.
    pub id: usize,
    /// Device class.
    pub kind: DeviceKind,
}

/// Point-in-time view of one device.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DeviceStatus {
    /// Allocator-assigned device index.
    pub id: usize,
    /// Device class.
    pub kind: DeviceKind,
    /// Whether another reservation would currently succeed.
    pub available: bool,
    /// Estimated free device memory, in bytes.
    pub free_memory: u64,
    /// Fraction of the concurrency limit in use, `0.0..=1.0`.
    pub load: f32,
    /// Relative throughput; higher is faster.
    pub performance_score: f32,
}

/// Source of compute devices.
///
/// Implementations must be safe to call from several threads; every
/// successful [`try_reserve`](Self::try_reserve) is paired with exactly one
/// [`release`](Self::release).
pub trait DeviceAllocator: Send + Sync {
    /// Reserves a device slot, preferring an accelerator when asked.
    ///
    /// Returns a CPU handle when no accelerator slot is free. Fails with
    /// [`OptimizationError::DeviceUnavailable`] only if not even the CPU
    /// can take the work.
    fn try_reserve(&self, prefer_accelerator: bool) -> Result<DeviceHandle>;

    /// Returns a reservation.
    fn release(&self, handle: DeviceHandle);

    /// Current status of every device.
    fn device_status(&self) -> Vec<DeviceStatus>;
}

#[derive(Debug)]
struct DeviceSlot {
    kind: DeviceKind,
    concurrency_limit: usize,
    memory_bytes: u64,
    performance_score: f32,
    // each slot has its own lock; no allocator-wide lock exists
    active: Mutex<usize>,
}

impl DeviceSlot {
    fn try_acquire(&self) -> bool {
        let mut active = self.active.lock();
        if *active < self.concurrency_limit {
            *active += 1;
            true
        } else {
            false
        }
    }

    fn status(&self, id: usize) -> DeviceStatus {
        let active = *self.active.lock();
        let load = if self.concurrency_limit == usize::MAX {
            0.0
        } else {
            active as f32 / self.concurrency_limit.max(1) as f32
        };
        let free_memory = (self.memory_bytes as f64 * (1.0 - load as f64).max(0.0)) as u64;
        DeviceStatus {
            id,
            kind: self.kind,
            available: active < self.concurrency_limit,
            free_memory,
            load,
            performance_score: self.performance_score,
        }
    }
}

/// In-process allocator with a CPU device (id 0) and any number of
/// accelerator slots.
///
/// # Examples
///
/// ```
/// use u_adaptive::device::{DeviceAllocator, DeviceKind, LocalAllocator};
///
/// let alloc = LocalAllocator::cpu_only().with_accelerator(8 << 30, 1, 10.0);
/// let a = alloc.try_reserve(true).unwrap();
/// let b = alloc.try_reserve(true).unwrap();
/// assert_eq!(a.kind, DeviceKind::Accelerator);
/// assert_eq!(b.kind, DeviceKind::Cpu); // accelerator at its limit
/// alloc.release(a);
/// alloc.release(b);
/// ```
#[derive(Debug)]
pub struct LocalAllocator {
    slots: Vec<DeviceSlot>,
}

impl LocalAllocator {
    /// Allocator exposing an unbounded CPU device only.
    pub fn cpu_only() -> Self {
        Self {
            slots: vec![DeviceSlot {
                kind: DeviceKind::Cpu,
                concurrency_limit: usize::MAX,
                memory_bytes: 0,
                performance_score: 1.0,
                active: Mutex::new(0),
            }],
        }
    }

    /// Caps concurrent CPU reservations (a bounded worker pool).
    pub fn with_cpu_limit(mut self, limit: usize) -> Self {
        if let Some(cpu) = self.slots.first_mut() {
            cpu.concurrency_limit = limit;
        }
        self
    }

    /// Adds an accelerator with the given memory, concurrency limit and
    /// performance score.
    pub fn with_accelerator(
        mut self,
        memory_bytes: u64,
        concurrency_limit: usize,
        performance_score: f32,
    ) -> Self {
        self.slots.push(DeviceSlot {
            kind: DeviceKind::Accelerator,
            concurrency_limit,
            memory_bytes,
            performance_score,
            active: Mutex::new(0),
        });
        self
    }

    /// Accelerator ids ordered by descending performance score.
    fn accelerators_by_score(&self) -> Vec<usize> {
        let mut ids: Vec<usize> = self
            .slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.kind == DeviceKind::Accelerator)
            .map(|(i, _)| i)
            .collect();
        ids.sort_by(|&a, &b| {
            self.slots[b]
                .performance_score
                .total_cmp(&self.slots[a].performance_score)
        });
        ids
    }
}

impl Default for LocalAllocator {
    fn default() -> Self {
        Self::cpu_only()
    }
}

impl DeviceAllocator for LocalAllocator {
    fn try_reserve(&self, prefer_accelerator: bool) -> Result<DeviceHandle> {
        if prefer_accelerator {
            for id in self.accelerators_by_score() {
                if self.slots[id].try_acquire() {
                    return Ok(DeviceHandle {
                        id,
                        kind: DeviceKind::Accelerator,
                    });
                }
            }
        }
        if self.slots[0].try_acquire() {
            return Ok(DeviceHandle {
                id: 0,
                kind: DeviceKind::Cpu,
            });
        }
        Err(OptimizationError::DeviceUnavailable(
            "cpu worker limit reached".into(),
        ))
    }

    fn release(&self, handle: DeviceHandle) {
        if let Some(slot) = self.slots.get(handle.id) {
            let mut active = slot.active.lock();
            *active = active.saturating_sub(1);
        }
    }

    fn device_status(&self) -> Vec<DeviceStatus> {
        self.slots
            .iter()
            .enumerate()
            .map(|(id, slot)| slot.status(id))
            .collect()
    }
}
