//! The optimization engine.
//!
//! [`Engine`] owns the populations, the device dispatcher and the run
//! statistics. [`Engine::run`] validates a config, takes the run lock,
//! drives the selected strategy iteration by iteration, and records the
//! outcome.

use super::config::{
    validate_contribution_weight, ConfigSource, EngineConfig, OptimizationConfig, ProcessingMode,
    Strategy,
};
use super::metrics::{EngineMetrics, MetricsSink, RunEvent, TracingSink};
use super::types::{performance_gain, OptimizationHistory, OptimizationResult};
use crate::convergence::ConvergenceMonitor;
use crate::device::{DeviceAllocator, DeviceDispatcher, DeviceStatus, LocalAllocator};
use crate::error::{OptimizationError, Result};
use crate::evolution::{EvolutionOperator, ParentSelection};
use crate::gradient::GradientOptimizer;
use crate::population::{Population, PopulationStore};
use crate::random::{create_rng, rng_from_option};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::Rng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

/// Callback invoked after every recorded iteration.
///
/// Runs on the thread executing the run, while the run lock is held.
pub trait IterationObserver: Send + Sync {
    /// `iteration` is 1-based and counts across hybrid phases.
    fn on_iteration(&self, iteration: usize, metric: f32);
}

/// State guarded by the run lock.
struct RunState {
    store: PopulationStore,
    rng: StdRng,
}

/// Adaptive multi-strategy optimization engine.
///
/// One run at a time: a second concurrent [`run`](Self::run) fails
/// immediately with [`OptimizationError::RunInProgress`].
///
/// # Usage
///
/// ```
/// use u_adaptive::engine::{Engine, EngineConfig, OptimizationConfig};
///
/// let engine = Engine::new(
///     EngineConfig::default()
///         .with_feature_dim(8)
///         .with_population_size(6)
///         .with_domain("vision", 1.0)
///         .with_seed(42),
/// )
/// .unwrap();
///
/// let result = engine
///     .run(OptimizationConfig::default().with_max_iterations(5).with_seed(1))
///     .unwrap();
/// assert!(result.success);
/// assert_eq!(result.history.len(), result.iterations_completed);
/// ```
pub struct Engine {
    config: EngineConfig,
    state: Mutex<RunState>,
    metrics: Mutex<EngineMetrics>,
    dispatcher: DeviceDispatcher,
    sink: Arc<dyn MetricsSink>,
    observer: Option<Arc<dyn IterationObserver>>,
}

/// How a strategy phase stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PhaseEnd {
    Exhausted,
    Converged,
    Cancelled,
}

/// Per-run settings shared by every phase.
struct RunContext<'a> {
    monitor: ConvergenceMonitor,
    cancel: Option<&'a AtomicBool>,
    observer: Option<&'a dyn IterationObserver>,
}

impl RunContext<'_> {
    fn cancelled(&self) -> bool {
        self.cancel.is_some_and(|flag| flag.load(Ordering::Relaxed))
    }
}

/// One strategy's iteration step.
trait Phase {
    /// Performs one iteration and returns its metric.
    fn step(&mut self, rng: &mut StdRng) -> Result<f32>;
}

/// Evolution iteration: advance (after the first), evaluate, measure.
struct EvolutionPhase<'a> {
    store: &'a mut PopulationStore,
    dispatcher: &'a DeviceDispatcher,
    operator: EvolutionOperator,
    prefer_accelerator: bool,
    evaluated: bool,
}

impl Phase for EvolutionPhase<'_> {
    fn step(&mut self, rng: &mut StdRng) -> Result<f32> {
        if self.evaluated {
            for population in self.store.iter_mut() {
                self.operator.advance(population, rng)?;
            }
        }
        for population in self.store.iter_mut() {
            let scores = {
                let lease = self.dispatcher.select(self.prefer_accelerator)?;
                lease.evaluate(population, rng)?
            };
            population.set_fitness(scores)?;
        }
        self.evaluated = true;
        Ok(self.store.adaptation_level())
    }
}

impl Phase for GradientOptimizer {
    fn step(&mut self, rng: &mut StdRng) -> Result<f32> {
        GradientOptimizer::step(self, rng)
    }
}

/// Drives `phase` for up to `budget` iterations, appending to `history`.
///
/// Convergence is judged on this phase's own slice of the history.
fn drive<P: Phase>(
    phase: &mut P,
    budget: usize,
    ctx: &RunContext<'_>,
    history: &mut OptimizationHistory,
    rng: &mut StdRng,
) -> Result<PhaseEnd> {
    let start = history.len();
    for _ in 0..budget {
        if ctx.cancelled() {
            return Ok(PhaseEnd::Cancelled);
        }
        let metric = phase.step(rng)?;
        history.push(metric);
        if let Some(observer) = ctx.observer {
            observer.on_iteration(history.len(), metric);
        }
        if ctx.monitor.check(&history.values()[start..]) {
            return Ok(PhaseEnd::Converged);
        }
    }
    Ok(PhaseEnd::Exhausted)
}

/// What a strategy handler hands back to [`Engine::run_with_cancel`].
struct Outcome {
    end: PhaseEnd,
    memory_used: u64,
}

impl Engine {
    /// Creates an engine with a CPU-only allocator.
    pub fn new(config: EngineConfig) -> Result<Self> {
        Self::with_allocator(config, Arc::new(LocalAllocator::cpu_only()))
    }

    /// Creates an engine over a caller-supplied device allocator.
    ///
    /// One population is created per configured domain.
    pub fn with_allocator(config: EngineConfig, allocator: Arc<dyn DeviceAllocator>) -> Result<Self> {
        config.validate()?;
        let mut rng = rng_from_option(config.seed);
        let mut store = PopulationStore::new();
        for domain in &config.domains {
            let size = domain.size.unwrap_or(config.population_size);
            store.create(
                &domain.id,
                size,
                config.feature_dim,
                domain.contribution_weight,
                &mut rng,
            )?;
        }
        let dispatcher = DeviceDispatcher::new(allocator);
        info!(
            populations = store.len(),
            feature_dim = config.feature_dim,
            accelerator = dispatcher.has_accelerator(),
            "engine initialized"
        );
        Ok(Self {
            config,
            state: Mutex::new(RunState { store, rng }),
            metrics: Mutex::new(EngineMetrics::default()),
            dispatcher,
            sink: Arc::new(TracingSink),
            observer: None,
        })
    }

    /// Replaces the audit sink.
    pub fn with_sink(mut self, sink: Arc<dyn MetricsSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Installs an iteration observer.
    pub fn with_observer(mut self, observer: Arc<dyn IterationObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Engine initialization parameters.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Snapshot of the aggregate run statistics.
    pub fn metrics(&self) -> EngineMetrics {
        self.metrics.lock().clone()
    }

    /// Status of every execution device.
    pub fn device_status(&self) -> Vec<DeviceStatus> {
        self.dispatcher.device_status()
    }

    /// Adds a population for a new sub-domain.
    ///
    /// # Errors
    /// - [`OptimizationError::RunInProgress`] while a run holds the lock
    /// - [`OptimizationError::InvalidEliteCount`] if `size < 2`
    /// - [`OptimizationError::InvalidConfig`] if `contribution_weight` is
    ///   not in `[0, 1]`
    /// - [`OptimizationError::DuplicateId`] if `id` is taken
    pub fn register_population(&self, id: &str, size: usize, contribution_weight: f32) -> Result<()> {
        if size < 2 {
            return Err(OptimizationError::InvalidEliteCount { size });
        }
        validate_contribution_weight(id, contribution_weight)?;
        let mut guard = self.state.try_lock().ok_or(OptimizationError::RunInProgress)?;
        let state = &mut *guard;
        state.store.create(
            id,
            size,
            self.config.feature_dim,
            contribution_weight,
            &mut state.rng,
        )?;
        debug!(population = id, size, "population registered");
        Ok(())
    }

    /// Clone of one population.
    ///
    /// Fails with [`OptimizationError::RunInProgress`] during a run.
    pub fn population(&self, id: &str) -> Result<Population> {
        let state = self.state.try_lock().ok_or(OptimizationError::RunInProgress)?;
        state.store.get(id).cloned()
    }

    /// Ids of all registered populations.
    pub fn population_ids(&self) -> Result<Vec<String>> {
        let state = self.state.try_lock().ok_or(OptimizationError::RunInProgress)?;
        Ok(state.store.ids())
    }

    /// Runs an optimization with the defaults of a configuration source.
    pub fn run_defaults<S: ConfigSource + ?Sized>(
        &self,
        source: &S,
    ) -> Result<OptimizationResult> {
        self.run(source.defaults())
    }

    /// Runs one optimization to completion.
    pub fn run(&self, config: OptimizationConfig) -> Result<OptimizationResult> {
        self.run_with_cancel(config, None)
    }

    /// Runs one optimization with an optional cancellation flag.
    ///
    /// The flag is checked once before every iteration. A cancelled run
    /// returns `Ok` with `success == false` and the partial history;
    /// populations keep the state of the last completed generation.
    ///
    /// # Errors
    /// Rejected without touching any state:
    /// - [`OptimizationError::InvalidConfig`]
    /// - [`OptimizationError::UnknownStrategy`]
    /// - [`OptimizationError::StrategyUnsupported`]
    /// - [`OptimizationError::RunInProgress`]
    ///
    /// Aborting a started run (counted as a failed run):
    /// - [`OptimizationError::NumericOverflow`]
    /// - [`OptimizationError::DeviceUnavailable`]
    #[instrument(skip_all, fields(strategy = %config.strategy, mode = %config.mode))]
    pub fn run_with_cancel(
        &self,
        config: OptimizationConfig,
        cancel: Option<Arc<AtomicBool>>,
    ) -> Result<OptimizationResult> {
        config.validate()?;
        let strategy = config.strategy.resolve()?;
        if strategy == Strategy::Reinforcement {
            return Err(OptimizationError::StrategyUnsupported(strategy));
        }
        self.check_memory_budget(&config, strategy)?;

        let mut guard = self.state.try_lock().ok_or(OptimizationError::RunInProgress)?;
        let state = &mut *guard;

        let started = Instant::now();
        let mut rng = match config.seed {
            Some(seed) => create_rng(seed),
            None => create_rng(state.rng.random()),
        };
        info!(
            max_iterations = config.max_iterations,
            populations = state.store.len(),
            "optimization run started"
        );

        let ctx = RunContext {
            monitor: ConvergenceMonitor::new(config.convergence_threshold),
            cancel: cancel.as_deref(),
            observer: self.observer.as_deref(),
        };
        let mut history = OptimizationHistory::with_capacity(config.max_iterations);

        let outcome = match strategy {
            Strategy::PopulationEvolution => self.run_evolution(
                &mut state.store,
                EvolutionOperator::new(),
                &config,
                config.max_iterations,
                &ctx,
                &mut history,
                &mut rng,
            ),
            Strategy::EvolutionaryVariant => self.run_evolution(
                &mut state.store,
                EvolutionOperator::new().with_selection(ParentSelection::Tournament(2)),
                &config,
                config.max_iterations,
                &ctx,
                &mut history,
                &mut rng,
            ),
            Strategy::GradientDescent => self.run_gradient(
                &config,
                config.max_iterations,
                &ctx,
                &mut history,
                &mut rng,
            ),
            Strategy::Hybrid => {
                self.run_hybrid(&mut state.store, &config, &ctx, &mut history, &mut rng)
            }
            Strategy::Reinforcement => Err(OptimizationError::StrategyUnsupported(strategy)),
        };
        let elapsed = started.elapsed();

        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(error = %err, iterations = history.len(), "optimization run aborted");
                self.metrics.lock().record(false, 0.0, elapsed);
                drop(guard);
                self.emit(strategy, config.mode, false, elapsed, 0.0, &history);
                return Err(err);
            }
        };

        let cancelled = outcome.end == PhaseEnd::Cancelled;
        let success = !cancelled;
        let gain = if success { performance_gain(&history) } else { 0.0 };
        self.metrics.lock().record(success, gain, elapsed);
        drop(guard);

        if cancelled {
            info!(iterations = history.len(), "optimization run cancelled");
        } else {
            debug!(
                iterations = history.len(),
                best = ?history.best(),
                converged = outcome.end == PhaseEnd::Converged,
                "optimization run completed"
            );
        }
        self.emit(strategy, config.mode, success, elapsed, gain, &history);

        Ok(OptimizationResult {
            success,
            strategy,
            final_metric: history.last().unwrap_or(0.0),
            iterations_completed: history.len(),
            performance_gain: gain,
            memory_used: outcome.memory_used,
            converged: outcome.end == PhaseEnd::Converged,
            cancelled,
            processing_time: elapsed,
            history,
        })
    }

    /// Returns the final aggregate statistics and drops the engine.
    pub fn shutdown(self) -> EngineMetrics {
        let metrics = self.metrics.into_inner();
        info!(total_runs = metrics.total_runs, "engine shut down");
        metrics
    }

    fn check_memory_budget(&self, config: &OptimizationConfig, strategy: Strategy) -> Result<()> {
        let uses_gradient = matches!(strategy, Strategy::GradientDescent | Strategy::Hybrid);
        if config.memory_budget == 0 || !uses_gradient {
            return Ok(());
        }
        let batch_bytes = (config.batch_size as u64)
            .saturating_mul(self.config.feature_dim as u64)
            .saturating_mul(std::mem::size_of::<f32>() as u64);
        if batch_bytes > config.memory_budget {
            return Err(OptimizationError::InvalidConfig(format!(
                "gradient batch needs {batch_bytes} bytes, budget is {}",
                config.memory_budget
            )));
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn run_evolution(
        &self,
        store: &mut PopulationStore,
        operator: EvolutionOperator,
        config: &OptimizationConfig,
        budget: usize,
        ctx: &RunContext<'_>,
        history: &mut OptimizationHistory,
        rng: &mut StdRng,
    ) -> Result<Outcome> {
        let mut phase = EvolutionPhase {
            store,
            dispatcher: &self.dispatcher,
            operator,
            prefer_accelerator: config.prefer_accelerator,
            evaluated: false,
        };
        let end = drive(&mut phase, budget, ctx, history, rng)?;
        Ok(Outcome {
            end,
            memory_used: phase.store.memory_bytes(),
        })
    }

    fn run_gradient(
        &self,
        config: &OptimizationConfig,
        budget: usize,
        ctx: &RunContext<'_>,
        history: &mut OptimizationHistory,
        rng: &mut StdRng,
    ) -> Result<Outcome> {
        let mut optimizer = GradientOptimizer::new(
            self.config.feature_dim,
            config.learning_rate,
            config.batch_size,
            rng,
        )?;
        let end = drive(&mut optimizer, budget, ctx, history, rng)?;
        Ok(Outcome {
            end,
            memory_used: optimizer.memory_bytes(),
        })
    }

    fn run_hybrid(
        &self,
        store: &mut PopulationStore,
        config: &OptimizationConfig,
        ctx: &RunContext<'_>,
        history: &mut OptimizationHistory,
        rng: &mut StdRng,
    ) -> Result<Outcome> {
        let evolution_budget = (config.max_iterations / 2).max(1);
        let gradient_budget = config.max_iterations - evolution_budget;

        let first = self.run_evolution(
            store,
            EvolutionOperator::new(),
            config,
            evolution_budget,
            ctx,
            history,
            rng,
        )?;
        if first.end == PhaseEnd::Cancelled || gradient_budget == 0 {
            return Ok(first);
        }

        debug!(
            evolution_iterations = history.len(),
            gradient_budget, "hybrid switching to gradient phase"
        );
        let second = self.run_gradient(config, gradient_budget, ctx, history, rng)?;
        Ok(Outcome {
            end: second.end,
            memory_used: first.memory_used + second.memory_used,
        })
    }

    fn emit(
        &self,
        strategy: Strategy,
        mode: ProcessingMode,
        success: bool,
        processing_time: Duration,
        performance_gain: f32,
        history: &OptimizationHistory,
    ) {
        self.sink.record(&RunEvent {
            strategy,
            mode,
            success,
            processing_time,
            performance_gain,
            final_metric: history.last().unwrap_or(0.0),
            iterations: history.len(),
        });
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("dispatcher", &self.dispatcher)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================
