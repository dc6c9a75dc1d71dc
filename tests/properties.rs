//! Property tests for ranking, selection and the goal manager.

use std::time::{Duration, Instant};

use proptest::prelude::*;

use evocover::schema::ReplacementPolicy;
use evocover::search::{
    Candidate, Execution, FitnessFunction, Genome, Goal, GoalGraph, GoalId, GoalManager,
    crowding_distance_assignment, dominates, fast_non_dominated_sort, preference_sort,
    rank_index,
};

#[derive(Debug, Clone)]
struct Hits(Vec<usize>);

impl Genome for Hits {
    fn size(&self) -> usize {
        self.0.len()
    }
}

/// Goal `g{n}` is covered iff `n` is in the genome; otherwise distance 1.
struct Reach;

impl FitnessFunction<Hits> for Reach {
    type Trace = Vec<String>;

    fn execute(&self, genome: &Hits, _deadline: Instant) -> Execution<Self::Trace> {
        Execution::Completed(genome.0.iter().map(|n| format!("g{n}")).collect())
    }

    fn distance(&self, goal: &Goal, trace: &Self::Trace) -> f64 {
        if trace.contains(&goal.discriminator) { 0.0 } else { 1.0 }
    }
}

fn scored_population(rows: &[Vec<u8>]) -> (GoalGraph, Vec<GoalId>, Vec<Candidate<Hits>>) {
    let width = rows.iter().map(Vec::len).min().unwrap_or(0);
    let mut graph = GoalGraph::new();
    let objectives: Vec<_> = (0..width)
        .map(|i| graph.add_goal(Goal::new("P", format!("o{i}"))))
        .collect();
    let population = rows
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let mut c = Candidate::new(i as u64, Hits(vec![0; i % 4]), 0, Vec::new());
            for (&goal, &value) in objectives.iter().zip(row) {
                c.fitness.insert(goal, f64::from(value));
            }
            c
        })
        .collect();
    (graph, objectives, population)
}

fn rows() -> impl Strategy<Value = Vec<Vec<u8>>> {
    (1usize..4).prop_flat_map(|m| prop::collection::vec(prop::collection::vec(0u8..5, m), 1..30))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn fronts_partition_the_population(rows in rows()) {
        let (graph, objectives, mut pop) = scored_population(&rows);
        let fronts = fast_non_dominated_sort(&mut pop, &graph, &objectives);

        let mut seen = vec![0usize; pop.len()];
        for (rank, front) in fronts.iter().enumerate() {
            prop_assert!(!front.is_empty());
            for &i in front {
                seen[i] += 1;
                prop_assert_eq!(pop[i].rank, rank);
            }
        }
        prop_assert!(seen.iter().all(|&n| n == 1));
    }

    #[test]
    fn fronts_respect_dominance(rows in rows()) {
        let (graph, objectives, mut pop) = scored_population(&rows);
        let fronts = fast_non_dominated_sort(&mut pop, &graph, &objectives);

        for (k, front) in fronts.iter().enumerate() {
            for &a in front {
                for &b in front {
                    prop_assert!(!dominates(&pop[a], &pop[b], &graph, &objectives));
                }
                if k > 0 {
                    let dominated = fronts[k - 1]
                        .iter()
                        .any(|&p| dominates(&pop[p], &pop[a], &graph, &objectives));
                    prop_assert!(dominated, "member {} of front {} has no dominator", a, k);
                }
            }
        }
    }

    #[test]
    fn crowding_marks_boundaries(rows in rows()) {
        let (graph, objectives, mut pop) = scored_population(&rows);
        let fronts = fast_non_dominated_sort(&mut pop, &graph, &objectives);

        for front in &fronts {
            crowding_distance_assignment(&mut pop, front, &graph, &objectives);
            for &i in front {
                prop_assert!(pop[i].crowding_distance >= 0.0);
            }
            if front.len() <= 2 {
                prop_assert!(front.iter().all(|&i| pop[i].crowding_distance.is_infinite()));
            } else {
                prop_assert!(front.iter().any(|&i| pop[i].crowding_distance.is_infinite()));
            }
        }
    }

    #[test]
    fn preference_front_holds_every_best(rows in rows()) {
        let (graph, objectives, mut pop) = scored_population(&rows);
        let fronts = preference_sort(&mut pop, &graph, &objectives);

        for &goal in &objectives {
            let best = pop
                .iter()
                .map(|c| c.fitness_for(&graph, goal))
                .fold(f64::INFINITY, f64::min);
            prop_assert!(fronts[0].iter().any(|&i| pop[i].fitness_for(&graph, goal) == best));
        }
        let total: usize = fronts.iter().map(Vec::len).sum();
        prop_assert_eq!(total, pop.len());
    }

    #[test]
    fn rank_index_stays_in_bounds(bias in 1.01f64..2.0, n in 1usize..500, r in 0.0f64..1.0) {
        prop_assert!(rank_index(bias, n, r) < n);
    }

    #[test]
    fn coverage_is_monotone_and_sound(
        goals in 2usize..12,
        edges in prop::collection::vec((0usize..12, 0usize..12), 0..20),
        runs in prop::collection::vec(prop::collection::vec(0usize..12, 0..6), 1..25),
    ) {
        let mut graph = GoalGraph::new();
        let ids: Vec<_> = (0..goals)
            .map(|i| graph.add_goal(Goal::new("P", format!("g{i}"))))
            .collect();
        for (a, b) in edges {
            if a < goals && b < goals {
                graph.add_dependency(ids[a], ids[b]);
            }
        }

        let mut manager = GoalManager::new(graph, ReplacementPolicy::Size);
        let mut covered = 0;
        for (id, genes) in runs.into_iter().enumerate() {
            let mut c = Candidate::new(id as u64, Hits(genes), 0, Vec::new());
            manager.evaluate(&mut c, &Reach, Duration::from_secs(5));
            manager.absorb_newly_covered(&c);

            prop_assert_eq!(manager.check_invariants(), Ok(()));
            prop_assert!(manager.num_covered() >= covered);
            covered = manager.num_covered();
            prop_assert_eq!(manager.num_covered() + manager.num_uncovered(), goals);
            for goal in manager.current_goals() {
                prop_assert!(!manager.is_covered(goal));
            }
            for (goal, holder) in manager.covered_goals() {
                prop_assert_eq!(holder.fitness.get(&goal), Some(&0.0));
            }
        }
    }
}
