//! The 1+(λ,λ) genetic algorithm: a mutation phase that explores, followed
//! by a crossover phase that repairs the best mutant against its parent.

use crate::search::candidate::{Candidate, Genome};
use crate::search::operators::{FitnessFunction, GeneticOperators};

use super::SearchEngine;

impl<G, O, F> SearchEngine<G, O, F>
where
    G: Genome,
    O: GeneticOperators<G>,
    F: FitnessFunction<G>,
{
    pub(super) fn step_one_plus_lambda_lambda(&mut self, lambda: usize) {
        let Some(parent) = self.population.pop() else {
            return;
        };

        // Mutation phase.
        let mut batch = self.mutants(std::slice::from_ref(&parent), lambda);
        batch.insert(0, parent);
        self.settle(&mut batch);
        let mutants = batch.split_off(1);
        let Some(parent) = batch.pop() else {
            return;
        };
        let Some(best_mutant) = best_of(mutants) else {
            self.population = vec![parent];
            return;
        };

        // Crossover phase: failed attempts count against the budget.
        let mut children = Vec::with_capacity(lambda);
        let mut attempts = 0;
        while children.len() < lambda && attempts < lambda {
            attempts += 1;
            match self
                .operators
                .crossover(&parent.genome, &best_mutant.genome, &mut self.rng)
            {
                Ok((a, b)) => {
                    for genome in [a, b] {
                        if children.len() < lambda {
                            children.push(Candidate::new(
                                self.next_id(),
                                genome,
                                self.generation + 1,
                                vec![parent.id, best_mutant.id],
                            ));
                        }
                    }
                }
                Err(e) => log::debug!("{e} (attempt {attempts} of {lambda})"),
            }
        }

        let mut batch = vec![parent, best_mutant];
        batch.extend(children);
        self.settle(&mut batch);
        let children = batch.split_off(2);
        let (Some(best_mutant), Some(parent)) = (batch.pop(), batch.pop()) else {
            return;
        };

        let next = match best_of(children) {
            Some(child) if child.better_or_equal(&parent) => child,
            Some(child) if child.better_or_equal(&best_mutant) => child,
            _ => best_mutant,
        };
        self.population = vec![next];
    }
}

/// Lowest aggregate fitness; the earliest one on ties.
fn best_of<G>(candidates: Vec<Candidate<G>>) -> Option<Candidate<G>> {
    candidates
        .into_iter()
        .min_by(|a, b| a.aggregate.total_cmp(&b.aggregate))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{BudgetConfig, SearchConfig, StrategyConfig};
    use crate::search::engine::test_support::*;

    fn engine(ops: BitOps) -> SearchEngine<Bits, BitOps, Ladder> {
        let (graph, _) = ladder_graph(32);
        let config = SearchConfig {
            strategy: StrategyConfig::OnePlusLambdaLambda { lambda: 4 },
            random_seed: Some(9),
            threads: Some(2),
            budget: BudgetConfig {
                max_generations: Some(20),
                max_evaluations: None,
                time_budget_ms: None,
            },
            ..SearchConfig::default()
        };
        SearchEngine::new(config, graph, ops, Ladder).unwrap()
    }

    #[test]
    fn test_best_of_prefers_first_on_ties() {
        let mut a = Candidate::new(1, Bits(vec![]), 0, Vec::new());
        let mut b = Candidate::new(2, Bits(vec![]), 0, Vec::new());
        a.aggregate = 0.5;
        b.aggregate = 0.5;
        assert_eq!(best_of(vec![a, b]).map(|c| c.id), Some(1));
        assert!(best_of::<Bits>(Vec::new()).is_none());
    }

    #[test]
    fn test_keeps_single_parent() {
        let mut engine = engine(BitOps::new(32));
        engine.initialize_population();
        for _ in 0..5 {
            engine.evolve();
            assert_eq!(engine.population().len(), 1);
        }
    }

    #[test]
    fn test_parent_is_always_replaced() {
        // The comparison chain ends at the best mutant, never the old parent.
        let mut engine = engine(BitOps::new(32));
        engine.initialize_population();
        let parent = engine.population()[0].id;
        engine.evolve();
        let next = &engine.population()[0];
        assert_ne!(next.id, parent);
        assert_eq!(next.generation, 1);
    }

    #[test]
    fn test_failed_crossover_falls_back_to_best_mutant() {
        let ops = BitOps {
            len: 32,
            broken_crossover: true,
        };
        let mut engine = engine(ops);
        engine.initialize_population();
        let parent = engine.population()[0].id;
        engine.evolve();

        let next = &engine.population()[0];
        assert_ne!(next.id, parent);
        assert_eq!(next.parents, vec![parent]);
    }
}
