//! Pareto ranking: fast non-dominated sorting, crowding distance and the
//! crowded comparison operator (NSGA-II), plus preference sorting and the
//! alternative front distances of the many-objective loop.
//!
//! All functions take the objective list explicitly. Callers pass the goals
//! currently targeted, so fitness values left over from covered goals never
//! take part in a ranking.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use super::candidate::{Candidate, Genome};
use super::goal::{GoalGraph, GoalId};

/// `true` if `a` is no worse than `b` on every objective and strictly better
/// on at least one.
pub fn dominates<G>(
    a: &Candidate<G>,
    b: &Candidate<G>,
    graph: &GoalGraph,
    objectives: &[GoalId],
) -> bool
where
    G: Genome,
{
    let mut strictly_better = false;
    for &id in objectives {
        let goal = graph.goal(id);
        let va = a.fitness_for(graph, id);
        let vb = b.fitness_for(graph, id);
        if goal.better(vb, va) {
            return false;
        }
        if goal.better(va, vb) {
            strictly_better = true;
        }
    }
    strictly_better
}

/// Sort the population into Pareto fronts and store each member's rank.
///
/// Returns the fronts as index lists, front 0 being the non-dominated layer.
/// Deterministic for a fixed population order.
pub fn fast_non_dominated_sort<G: Genome>(
    population: &mut [Candidate<G>],
    graph: &GoalGraph,
    objectives: &[GoalId],
) -> Vec<Vec<usize>> {
    let all: Vec<usize> = (0..population.len()).collect();
    let fronts = sort_subset(population, &all, graph, objectives);
    assign_ranks(population, &fronts, 0);
    fronts
}

/// Non-dominated sort restricted to `subset`; returned fronts hold indices
/// into `population`.
fn sort_subset<G: Genome>(
    population: &[Candidate<G>],
    subset: &[usize],
    graph: &GoalGraph,
    objectives: &[GoalId],
) -> Vec<Vec<usize>> {
    let n = subset.len();
    if n == 0 {
        return Vec::new();
    }

    let mut domination_count = vec![0usize; n];
    let mut dominated: Vec<Vec<usize>> = vec![Vec::new(); n];

    for p in 0..n {
        for q in (p + 1)..n {
            let a = &population[subset[p]];
            let b = &population[subset[q]];
            if dominates(a, b, graph, objectives) {
                dominated[p].push(q);
                domination_count[q] += 1;
            } else if dominates(b, a, graph, objectives) {
                dominated[q].push(p);
                domination_count[p] += 1;
            }
        }
    }

    let mut fronts = Vec::new();
    let mut front: Vec<usize> = (0..n).filter(|&p| domination_count[p] == 0).collect();
    while !front.is_empty() {
        let mut next = Vec::new();
        for &p in &front {
            for &q in &dominated[p] {
                domination_count[q] -= 1;
                if domination_count[q] == 0 {
                    next.push(q);
                }
            }
        }
        next.sort_unstable();
        fronts.push(front.iter().map(|&p| subset[p]).collect());
        front = next;
    }
    fronts
}

fn assign_ranks<G>(population: &mut [Candidate<G>], fronts: &[Vec<usize>], offset: usize) {
    for (rank, front) in fronts.iter().enumerate() {
        for &i in front {
            population[i].rank = rank + offset;
        }
    }
}

/// Assign crowding distances to the members of one front.
///
/// Boundary members on every objective get `+∞`; interior members accumulate
/// the normalized gap between their neighbours over all objectives.
/// Zero-width ranges contribute nothing.
pub fn crowding_distance_assignment<G: Genome>(
    population: &mut [Candidate<G>],
    front: &[usize],
    graph: &GoalGraph,
    objectives: &[GoalId],
) {
    for &i in front {
        population[i].crowding_distance = 0.0;
    }
    let n = front.len();
    if n == 0 {
        return;
    }
    if n <= 2 {
        for &i in front {
            population[i].crowding_distance = f64::INFINITY;
        }
        return;
    }

    let mut sorted = front.to_vec();
    for &id in objectives {
        sorted.sort_by(|&a, &b| {
            population[a]
                .fitness_for(graph, id)
                .total_cmp(&population[b].fitness_for(graph, id))
        });

        let min = population[sorted[0]].fitness_for(graph, id);
        let max = population[sorted[n - 1]].fitness_for(graph, id);
        population[sorted[0]].crowding_distance = f64::INFINITY;
        population[sorted[n - 1]].crowding_distance = f64::INFINITY;

        let range = max - min;
        if range <= 0.0 || !range.is_finite() {
            continue;
        }
        for k in 1..(n - 1) {
            let next = population[sorted[k + 1]].fitness_for(graph, id);
            let prev = population[sorted[k - 1]].fitness_for(graph, id);
            let gap = (next - prev) / range;
            if !gap.is_nan() {
                population[sorted[k]].crowding_distance += gap;
            }
        }
    }
}

/// Lower rank first; on equal rank, larger crowding distance first.
pub fn crowded_comparator<G>(a: &Candidate<G>, b: &Candidate<G>) -> Ordering {
    a.rank
        .cmp(&b.rank)
        .then_with(|| b.crowding_distance.total_cmp(&a.crowding_distance))
}

/// Preference sorting for many objectives.
///
/// Front 0 holds, for every objective, the candidate with the best value
/// (smaller genome on ties, then lower index). The rest is ranked by
/// non-dominated sorting starting at rank 1.
pub fn preference_sort<G: Genome>(
    population: &mut [Candidate<G>],
    graph: &GoalGraph,
    objectives: &[GoalId],
) -> Vec<Vec<usize>> {
    if population.is_empty() {
        return Vec::new();
    }
    if objectives.is_empty() {
        return fast_non_dominated_sort(population, graph, objectives);
    }

    let mut preferred = vec![false; population.len()];
    for &id in objectives {
        let goal = graph.goal(id);
        let mut best = 0;
        for i in 1..population.len() {
            let vi = population[i].fitness_for(graph, id);
            let vb = population[best].fitness_for(graph, id);
            if goal.better(vi, vb) || (vi == vb && population[i].size() < population[best].size()) {
                best = i;
            }
        }
        preferred[best] = true;
    }

    let front0: Vec<usize> = (0..population.len()).filter(|&i| preferred[i]).collect();
    let rest: Vec<usize> = (0..population.len()).filter(|&i| !preferred[i]).collect();
    let rest_fronts = sort_subset(population, &rest, graph, objectives);

    let mut fronts = Vec::with_capacity(rest_fronts.len() + 1);
    fronts.push(front0);
    fronts.extend(rest_fronts);
    assign_ranks(population, &fronts, 0);
    fronts
}

/// Distance written to `crowding_distance` to order the members of a front.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrontDistance {
    Crowding,
    EpsilonDominance,
    /// Lower `performance_score` ranks first.
    Performance,
}

impl FrontDistance {
    pub fn assign<G: Genome>(
        self,
        population: &mut [Candidate<G>],
        front: &[usize],
        graph: &GoalGraph,
        objectives: &[GoalId],
    ) {
        match self {
            Self::Crowding => crowding_distance_assignment(population, front, graph, objectives),
            Self::EpsilonDominance => {
                epsilon_dominance_assignment(population, front, graph, objectives)
            }
            Self::Performance => {
                for &i in front {
                    let c = &mut population[i];
                    c.crowding_distance = 1.0 / (1.0 + c.performance_score);
                }
            }
        }
    }
}

/// Per-goal epsilon dominance.
///
/// For every objective on which the front is not tied, the members holding
/// the best value get the fraction of the front they beat there. A member
/// keeps the largest fraction over all objectives; everybody else gets 0.
pub fn epsilon_dominance_assignment<G: Genome>(
    population: &mut [Candidate<G>],
    front: &[usize],
    graph: &GoalGraph,
    objectives: &[GoalId],
) {
    for &i in front {
        population[i].crowding_distance = 0.0;
    }
    let n = front.len();
    for &id in objectives {
        let goal = graph.goal(id);
        let values: Vec<f64> = front
            .iter()
            .map(|&i| population[i].fitness_for(graph, id))
            .collect();
        let Some(best) = values
            .iter()
            .copied()
            .reduce(|a, b| if goal.better(b, a) { b } else { a })
        else {
            continue;
        };

        let winners = values.iter().filter(|&&v| v == best).count();
        if winners == n {
            continue;
        }
        let share = (n - winners) as f64 / n as f64;
        for (&i, &v) in front.iter().zip(&values) {
            if v == best {
                let c = &mut population[i];
                c.crowding_distance = c.crowding_distance.max(share);
            }
        }
    }
}

/// Score every candidate by its quality indicators.
///
/// Each indicator is min-max normalized over `population` and the results
/// are summed, lower being better. A candidate lacking an indicator that
/// others report takes the worst value for it.
pub fn performance_score_assignment<G>(population: &mut [Candidate<G>]) {
    let mut ranges: BTreeMap<String, (f64, f64)> = BTreeMap::new();
    for c in population.iter() {
        for (name, &value) in &c.quality_indicators {
            if value.is_nan() {
                continue;
            }
            let range = ranges.entry(name.clone()).or_insert((value, value));
            range.0 = range.0.min(value);
            range.1 = range.1.max(value);
        }
    }

    for c in population.iter_mut() {
        c.performance_score = ranges
            .iter()
            .map(|(name, &(min, max))| match c.quality_indicators.get(name) {
                Some(&value) if !value.is_nan() => {
                    let span = max - min;
                    if span > 0.0 && span.is_finite() {
                        (value - min) / span
                    } else {
                        0.0
                    }
                }
                _ => 1.0,
            })
            .sum();
    }
}
