//! (μ,λ) and (μ+λ) evolution strategies. (1+1) is (μ+λ) with μ = λ = 1.

use crate::search::candidate::{Candidate, Genome, sort_by_aggregate};
use crate::search::operators::{FitnessFunction, GeneticOperators};

use super::SearchEngine;

impl<G, O, F> SearchEngine<G, O, F>
where
    G: Genome,
    O: GeneticOperators<G>,
    F: FitnessFunction<G>,
{
    /// Offspring replace the parents: the best μ of λ mutants survive.
    pub(super) fn step_mu_comma_lambda(&mut self, mu: usize, lambda: usize) {
        let parents = std::mem::take(&mut self.population);
        let mut offspring = self.mutants(&parents, lambda / mu);
        self.settle(&mut offspring);

        sort_by_aggregate(&mut offspring);
        offspring.truncate(mu);
        self.population = offspring;
    }

    /// Each parent in turn is replaced by the best remaining offspring if
    /// that offspring is at least as good. Used offspring are consumed.
    pub(super) fn step_mu_plus_lambda(&mut self, mu: usize, lambda: usize) {
        let parents = std::mem::take(&mut self.population);
        let count = parents.len();
        let offspring = self.mutants(&parents, lambda / mu);

        // Parents may be stale if the last generation opened new goals.
        let mut union = parents;
        union.extend(offspring);
        self.settle(&mut union);

        let mut offspring = union.split_off(count);
        let mut parents = union;
        sort_by_aggregate(&mut offspring);

        let mut offspring = offspring.into_iter().peekable();
        let mut replaced = 0;
        for parent in parents.iter_mut() {
            if offspring
                .peek()
                .is_some_and(|best| best.better_or_equal(parent))
                && let Some(best) = offspring.next()
            {
                *parent = best;
                replaced += 1;
            }
        }
        log::trace!("(μ+λ) replaced {replaced} of {count} parents");

        self.population = parents;
    }

    /// `per_parent` mutated copies of every parent.
    pub(super) fn mutants(&mut self, parents: &[Candidate<G>], per_parent: usize) -> Vec<Candidate<G>> {
        let mut offspring = Vec::with_capacity(parents.len() * per_parent);
        for parent in parents {
            for _ in 0..per_parent {
                offspring.push(self.mutant_of(parent));
            }
        }
        offspring
    }
}
