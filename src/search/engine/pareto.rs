//! NSGA-II generations and the many-objective variant built on preference
//! sorting.

use crate::schema::FrontHeuristic;
use crate::search::candidate::{Candidate, Genome, sort_by_aggregate};
use crate::search::goal::{GoalGraph, GoalId};
use crate::search::operators::{FitnessFunction, GeneticOperators};
use crate::search::ranking::{
    FrontDistance, crowded_comparator, fast_non_dominated_sort, performance_score_assignment,
    preference_sort,
};

use super::SearchEngine;

impl<G, O, F> SearchEngine<G, O, F>
where
    G: Genome,
    O: GeneticOperators<G>,
    F: FitnessFunction<G>,
{
    /// One generation: breed N offspring, rank parents plus offspring on the
    /// current goals, keep the best N by front and crowding distance.
    ///
    /// With `preference` the first front is preference-sorted and survives
    /// whole, even when it holds more than N candidates, and fronts are
    /// ordered by the configured front distance.
    pub(super) fn step_pareto(&mut self, preference: bool) {
        let n = self.config.population_size;
        let offspring = self.breed(n);

        let mut union = std::mem::take(&mut self.population);
        union.extend(offspring);
        self.settle(&mut union);
        let distance = self.front_distance(&mut union, preference);

        let objectives = self.manager.current_goals();
        let graph = self.manager.graph();
        let fronts = if preference {
            preference_sort(&mut union, graph, &objectives)
        } else {
            fast_non_dominated_sort(&mut union, graph, &objectives)
        };

        let capacity = if preference {
            n.max(fronts.first().map_or(0, Vec::len))
        } else {
            n
        };
        let survivors =
            fill_from_fronts(&mut union, &fronts, capacity, graph, &objectives, distance);
        log::trace!(
            "{} fronts over {} candidates, {} survive by {distance:?}",
            fronts.len(),
            union.len(),
            survivors.len()
        );

        self.population = extract(union, &survivors);
    }

    /// Rank and crowd the whole population, e.g. after initialization.
    pub(super) fn rank_population(&mut self, preference: bool) {
        let mut population = std::mem::take(&mut self.population);
        let distance = self.front_distance(&mut population, preference);

        let objectives = self.manager.current_goals();
        let graph = self.manager.graph();
        let fronts = if preference {
            preference_sort(&mut population, graph, &objectives)
        } else {
            fast_non_dominated_sort(&mut population, graph, &objectives)
        };
        for front in &fronts {
            distance.assign(&mut population, front, graph, &objectives);
        }
        self.population = population;
    }

    /// Score `population` and decide how its fronts are ordered. NSGA-II
    /// always uses crowding distance.
    fn front_distance(
        &mut self,
        population: &mut [Candidate<G>],
        preference: bool,
    ) -> FrontDistance {
        if !preference {
            return FrontDistance::Crowding;
        }
        performance_score_assignment(population);
        match self.config.front_distance {
            FrontHeuristic::Crowding => FrontDistance::Crowding,
            FrontHeuristic::EpsilonDominance => FrontDistance::EpsilonDominance,
            FrontHeuristic::Adaptive => {
                let objectives = self.manager.current_goals();
                self.heuristic
                    .update(population, self.manager.graph(), &objectives)
            }
        }
    }

    /// Select parent pairs, recombine and mutate until `count` offspring exist.
    fn breed(&mut self, count: usize) -> Vec<Candidate<G>> {
        if self.selector.requires_sorted() {
            sort_by_aggregate(&mut self.population);
        }
        self.selector.reset();

        let mut offspring = Vec::with_capacity(count);
        while offspring.len() < count {
            let (Some(i), Some(j)) = (
                self.selector.pick(&self.population, &mut self.rng),
                self.selector.pick(&self.population, &mut self.rng),
            ) else {
                break;
            };

            let parents = vec![self.population[i].id, self.population[j].id];
            let mut first = self.population[i].genome.clone();
            let mut second = self.population[j].genome.clone();

            if self.rng.chance(self.config.crossover_rate) {
                match self.operators.crossover(&first, &second, &mut self.rng) {
                    Ok((a, b)) => {
                        first = a;
                        second = b;
                    }
                    Err(e) => log::debug!("{e}; keeping parent clones"),
                }
            }

            for mut genome in [first, second] {
                if offspring.len() == count {
                    break;
                }
                if self.rng.chance(self.config.mutation_rate) {
                    self.mutate_until_changed(&mut genome);
                }
                offspring.push(Candidate::new(
                    self.next_id(),
                    genome,
                    self.generation + 1,
                    parents.clone(),
                ));
            }
        }
        offspring
    }
}

/// Take whole fronts while they fit, then the members of the first front
/// that does not with the largest `distance`.
fn fill_from_fronts<G: Genome>(
    population: &mut [Candidate<G>],
    fronts: &[Vec<usize>],
    capacity: usize,
    graph: &GoalGraph,
    objectives: &[GoalId],
    distance: FrontDistance,
) -> Vec<usize> {
    let mut chosen = Vec::with_capacity(capacity);
    for front in fronts {
        if chosen.len() >= capacity {
            break;
        }
        distance.assign(population, front, graph, objectives);

        let remain = capacity - chosen.len();
        if front.len() <= remain {
            chosen.extend_from_slice(front);
        } else {
            let mut sorted = front.clone();
            sorted.sort_by(|&a, &b| crowded_comparator(&population[a], &population[b]));
            chosen.extend_from_slice(&sorted[..remain]);
        }
    }
    chosen
}

/// Move the candidates at `indices` out of `population`, in that order.
fn extract<G>(population: Vec<Candidate<G>>, indices: &[usize]) -> Vec<Candidate<G>> {
    let mut slots: Vec<Option<Candidate<G>>> = population.into_iter().map(Some).collect();
    indices.iter().filter_map(|&i| slots[i].take()).collect()
}
