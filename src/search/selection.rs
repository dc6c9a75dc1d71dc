//! Parent selection operators.

use std::cmp::Ordering;

use crate::schema::SelectionMethod;

use super::candidate::Candidate;
use super::ranking::crowded_comparator;
use super::rng::SearchRng;

/// Inverse CDF of linear ranking selection.
///
/// `r` is a uniform draw in `[0, 1)`; the result indexes a population of size
/// `n` sorted best-to-worst.
pub fn rank_index(bias: f64, n: usize, r: f64) -> usize {
    let d = (bias - (bias * bias - 4.0 * (bias - 1.0) * r).sqrt()) / (2.0 * (bias - 1.0));
    ((n as f64 * d) as usize).min(n.saturating_sub(1))
}

/// Stateful selection operator.
///
/// Binary tournament keeps a shuffled permutation of the population indices
/// between calls; elitist selection keeps a cursor over the top K.
pub struct Selector {
    method: SelectionMethod,
    permutation: Vec<usize>,
    cursor: usize,
    elite_cursor: usize,
}

impl Selector {
    pub fn new(method: SelectionMethod) -> Self {
        Self {
            method,
            permutation: Vec::new(),
            cursor: 0,
            elite_cursor: 0,
        }
    }

    /// Whether the population must be sorted best-to-worst by aggregate
    /// fitness before calling [`Selector::pick`].
    pub fn requires_sorted(&self) -> bool {
        matches!(
            self.method,
            SelectionMethod::Elitist { .. } | SelectionMethod::Rank { .. }
        )
    }

    /// Forget per-generation state.
    pub fn reset(&mut self) {
        self.permutation.clear();
        self.cursor = 0;
        self.elite_cursor = 0;
    }

    /// Pick one individual. Returns `None` for an empty population.
    pub fn pick<G>(&mut self, population: &[Candidate<G>], rng: &mut SearchRng) -> Option<usize> {
        let n = population.len();
        if n == 0 {
            return None;
        }

        let index = match self.method {
            SelectionMethod::Elitist { k } => {
                let k = k.clamp(1, n);
                let index = self.elite_cursor % k;
                self.elite_cursor = (self.elite_cursor + 1) % k;
                index
            }
            SelectionMethod::Rank { bias } => rank_index(bias, n, rng.unit()),
            SelectionMethod::Roulette => roulette(population, rng),
            SelectionMethod::Random => rng.index(n),
            SelectionMethod::BinaryTournament => self.binary_tournament(population, rng),
            SelectionMethod::Tournament { size } => {
                let mut winner = rng.index(n);
                for _ in 1..size.max(1) {
                    let challenger = rng.index(n);
                    if crowded_comparator(&population[challenger], &population[winner])
                        == Ordering::Less
                    {
                        winner = challenger;
                    }
                }
                winner
            }
        };
        Some(index)
    }

    /// Pick `count` individuals (with repetition).
    pub fn select<G>(
        &mut self,
        population: &[Candidate<G>],
        count: usize,
        rng: &mut SearchRng,
    ) -> Vec<usize> {
        (0..count)
            .filter_map(|_| self.pick(population, rng))
            .collect()
    }

    fn binary_tournament<G>(&mut self, population: &[Candidate<G>], rng: &mut SearchRng) -> usize {
        let n = population.len();
        if n == 1 {
            return 0;
        }
        if self.permutation.len() != n || self.cursor + 2 > n {
            self.permutation = (0..n).collect();
            rng.shuffle(&mut self.permutation);
            self.cursor = 0;
        }

        let a = self.permutation[self.cursor];
        let b = self.permutation[self.cursor + 1];
        self.cursor += 2;

        match crowded_comparator(&population[a], &population[b]) {
            Ordering::Greater => b,
            Ordering::Less => a,
            Ordering::Equal => {
                if rng.chance(0.5) {
                    a
                } else {
                    b
                }
            }
        }
    }
}

/// Fitness-proportionate choice over minimized aggregate fitness.
fn roulette<G>(population: &[Candidate<G>], rng: &mut SearchRng) -> usize {
    let weight = |c: &Candidate<G>| {
        if c.aggregate.is_finite() {
            1.0 / (1.0 + c.aggregate.max(0.0))
        } else {
            0.0
        }
    };

    let sum: f64 = population.iter().map(weight).sum();
    if sum <= 0.0 || !sum.is_finite() {
        return rng.index(population.len());
    }

    let mut r = rng.unit() * sum;
    for (i, candidate) in population.iter().enumerate() {
        r -= weight(candidate);
        if r < 0.0 {
            return i;
        }
    }
    population.len() - 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::candidate::test_support::Ints;

    fn population(aggregates: &[f64]) -> Vec<Candidate<Ints>> {
        aggregates
            .iter()
            .enumerate()
            .map(|(i, &f)| {
                let mut c = Candidate::new(i as u64, Ints(vec![]), 0, Vec::new());
                c.aggregate = f;
                c.rank = 0;
                c
            })
            .collect()
    }

    #[test]
    fn test_rank_index_formula() {
        // d = (1.7 - sqrt(2.89 - 1.4)) / 1.4 = 0.34239...
        assert_eq!(rank_index(1.7, 10, 0.5), 3);
        assert_eq!(rank_index(1.7, 10, 0.0), 0);
        assert!(rank_index(1.7, 10, 0.999_999) <= 9);
    }

    #[test]
    fn test_rank_prefers_front() {
        let pop = population(&[0.0; 20]);
        let mut selector = Selector::new(SelectionMethod::Rank { bias: 1.9 });
        let mut rng = SearchRng::new(5);
        let picks = selector.select(&pop, 2000, &mut rng);
        let front = picks.iter().filter(|&&i| i < 10).count();
        assert!(front > 1100, "front half picked {front} times");
    }

    #[test]
    fn test_elitist_cycles_top_k() {
        let pop = population(&[0.0, 1.0, 2.0, 3.0]);
        let mut selector = Selector::new(SelectionMethod::Elitist { k: 2 });
        let mut rng = SearchRng::new(1);
        assert_eq!(selector.select(&pop, 5, &mut rng), vec![0, 1, 0, 1, 0]);
    }

    #[test]
    fn test_roulette_prefers_fitter() {
        let pop = population(&[0.0, 99.0]);
        let mut selector = Selector::new(SelectionMethod::Roulette);
        let mut rng = SearchRng::new(7);
        let picks = selector.select(&pop, 1000, &mut rng);
        let zero = picks.iter().filter(|&&i| i == 0).count();
        assert!(zero > 900);
    }

    #[test]
    fn test_roulette_degenerate_is_uniform() {
        let pop = population(&[f64::INFINITY, f64::INFINITY, f64::INFINITY]);
        let mut selector = Selector::new(SelectionMethod::Roulette);
        let mut rng = SearchRng::new(7);
        let picks = selector.select(&pop, 300, &mut rng);
        for i in 0..3 {
            assert!(picks.contains(&i));
        }
    }

    #[test]
    fn test_empty_population() {
        let pop = population(&[]);
        let mut rng = SearchRng::new(7);
        for method in [
            SelectionMethod::Random,
            SelectionMethod::Roulette,
            SelectionMethod::BinaryTournament,
            SelectionMethod::Tournament { size: 3 },
            SelectionMethod::Rank { bias: 1.5 },
            SelectionMethod::Elitist { k: 2 },
        ] {
            assert_eq!(Selector::new(method).pick(&pop, &mut rng), None);
        }
    }

    #[test]
    fn test_binary_tournament_uses_crowded_comparison() {
        let mut pop = population(&[0.0, 0.0]);
        pop[0].rank = 1;
        pop[1].rank = 0;
        let mut selector = Selector::new(SelectionMethod::BinaryTournament);
        let mut rng = SearchRng::new(11);
        for _ in 0..10 {
            assert_eq!(selector.pick(&pop, &mut rng), Some(1));
        }
    }

    #[test]
    fn test_binary_tournament_consumes_permutation() {
        // Rank equals index: each pick returns the better of a disjoint pair,
        // so one pass over 4 individuals never returns the worst one.
        let mut pop = population(&[0.0; 4]);
        for (i, c) in pop.iter_mut().enumerate() {
            c.rank = i;
        }
        let mut selector = Selector::new(SelectionMethod::BinaryTournament);
        let mut rng = SearchRng::new(3);
        for _ in 0..20 {
            let first = selector.pick(&pop, &mut rng).unwrap();
            let second = selector.pick(&pop, &mut rng).unwrap();
            assert_ne!(first, second);
            assert!(first != 3 && second != 3);
        }
    }

    #[test]
    fn test_tournament_picks_best_rank() {
        let mut pop = population(&[0.0; 5]);
        for (i, c) in pop.iter_mut().enumerate() {
            c.rank = 4 - i;
        }
        let mut selector = Selector::new(SelectionMethod::Tournament { size: 50 });
        let mut rng = SearchRng::new(2);
        assert_eq!(selector.pick(&pop, &mut rng), Some(4));
    }
}
