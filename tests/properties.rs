//! Property-based tests for the evolution, fitness and convergence layers.

use proptest::prelude::*;
use u_adaptive::convergence::{ConvergenceMonitor, LOOKBACK};
use u_adaptive::evolution::{elite_count, rank_descending, EvolutionOperator, ParentSelection};
use u_adaptive::fitness::{score_row, CpuEvaluator, Evaluator};
use u_adaptive::population::Population;
use u_adaptive::random::create_rng;

fn selection_strategy() -> impl Strategy<Value = ParentSelection> {
    prop_oneof![
        Just(ParentSelection::Uniform),
        (1usize..4).prop_map(ParentSelection::Tournament),
    ]
}

proptest! {
    #[test]
    fn evolution_preserves_shape_and_bounds(
        size in 2usize..24,
        dim in 1usize..12,
        generations in 1u32..6,
        seed in any::<u64>(),
        selection in selection_strategy(),
    ) {
        let mut rng = create_rng(seed);
        let mut pop = Population::random("p", size, dim, 1.0, &mut rng);
        let op = EvolutionOperator::new().with_selection(selection);
        let evaluator = CpuEvaluator::new();

        for g in 1..=generations {
            op.advance(&mut pop, &mut rng).unwrap();
            prop_assert_eq!(pop.generation(), g);
            prop_assert_eq!(pop.size(), size);
            prop_assert_eq!(pop.weights().len(), size * dim);
            prop_assert!(pop.fitness().iter().all(|f| (0.0..=1.0).contains(f)));

            let scores = evaluator.evaluate(&pop, &mut rng).unwrap();
            pop.set_fitness(scores).unwrap();
        }
    }

    #[test]
    fn elites_survive_one_generation(
        size in 2usize..20,
        dim in 1usize..8,
        seed in any::<u64>(),
    ) {
        let mut rng = create_rng(seed);
        let mut pop = Population::random("p", size, dim, 1.0, &mut rng);
        let ranked = rank_descending(pop.fitness());
        let n_elite = elite_count(size);
        let elites: Vec<Vec<f32>> = ranked[..n_elite].iter().map(|&i| pop.row(i).to_vec()).collect();
        let elite_fitness: Vec<f32> = ranked[..n_elite].iter().map(|&i| pop.fitness()[i]).collect();

        EvolutionOperator::new().advance(&mut pop, &mut rng).unwrap();

        for (k, row) in elites.iter().enumerate() {
            prop_assert_eq!(pop.row(k), row.as_slice());
            prop_assert_eq!(pop.fitness()[k], elite_fitness[k]);
        }
    }

    #[test]
    fn short_histories_never_converge(
        history in prop::collection::vec(0.0f32..1.0, 0..=LOOKBACK),
        threshold in 0.0f32..10.0,
    ) {
        prop_assert!(!ConvergenceMonitor::new(threshold).check(&history));
    }

    #[test]
    fn cpu_noise_is_bounded(
        size in 1usize..16,
        dim in 1usize..16,
        seed in any::<u64>(),
    ) {
        let mut rng = create_rng(seed);
        let pop = Population::random("p", size, dim, 1.0, &mut rng);
        let scores = CpuEvaluator::new().evaluate(&pop, &mut rng).unwrap();
        for (row, score) in pop.rows().zip(&scores) {
            prop_assert!((score - score_row(row)).abs() <= 0.03 + 1e-6);
        }
    }
}
