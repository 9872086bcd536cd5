//! Fitness evaluation.
//!
//! [`Evaluator`] is the capability interface; [`CpuEvaluator`] and
//! [`AcceleratorEvaluator`] are its two backends. Which one runs for a given
//! call is decided by the [`DeviceDispatcher`](crate::device::DeviceDispatcher).

mod evaluator;

pub use evaluator::{
    score_row, AcceleratorEvaluator, CpuEvaluator, Evaluator, CPU_NOISE_STD, NOISE_CLIP_SIGMAS,
    SCORE_SCALE,
};
pub(crate) use evaluator::sigmoid;
