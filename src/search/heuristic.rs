//! Stagnation-driven choice of front distance for the many-objective loop.
//!
//! Epsilon dominance pushes the search towards better objective values;
//! the performance score favours candidates with better quality indicators.
//! Whichever is active stays active while the best value of some current
//! goal keeps improving. Once it stalls, the heuristic that has stalled less
//! often takes over.

use std::collections::BTreeMap;

use super::candidate::{Candidate, Genome};
use super::goal::{GoalGraph, GoalId};
use super::ranking::FrontDistance;

#[derive(Debug, Clone)]
pub struct HeuristicSwitch {
    active: FrontDistance,
    epsilon_stagnation: usize,
    performance_stagnation: usize,
    best: BTreeMap<GoalId, f64>,
}

impl HeuristicSwitch {
    pub fn new() -> Self {
        Self {
            active: FrontDistance::EpsilonDominance,
            epsilon_stagnation: 0,
            performance_stagnation: 0,
            best: BTreeMap::new(),
        }
    }

    /// Observe a ranked population and pick the distance for its fronts.
    pub fn update<G: Genome>(
        &mut self,
        population: &[Candidate<G>],
        graph: &GoalGraph,
        objectives: &[GoalId],
    ) -> FrontDistance {
        let improved = self.observe(population, graph, objectives);
        self.advance(improved)
    }

    /// Record the best value per objective. Returns `true` if any objective
    /// improved on its record; objectives seen for the first time count.
    fn observe<G: Genome>(
        &mut self,
        population: &[Candidate<G>],
        graph: &GoalGraph,
        objectives: &[GoalId],
    ) -> bool {
        self.best.retain(|goal, _| objectives.contains(goal));

        let mut improved = false;
        for &id in objectives {
            let goal = graph.goal(id);
            let Some(best) = population
                .iter()
                .map(|c| c.fitness_for(graph, id))
                .reduce(|a, b| if goal.better(b, a) { b } else { a })
            else {
                continue;
            };
            match self.best.get(&id) {
                Some(&record) if !goal.better(best, record) => {}
                _ => {
                    self.best.insert(id, best);
                    improved = true;
                }
            }
        }
        improved
    }

    fn advance(&mut self, improved: bool) -> FrontDistance {
        let stagnation = match self.active {
            FrontDistance::Performance => &mut self.performance_stagnation,
            _ => &mut self.epsilon_stagnation,
        };
        if improved {
            *stagnation = 0;
            return self.active;
        }

        *stagnation += 1;
        let next = if self.performance_stagnation > self.epsilon_stagnation {
            FrontDistance::EpsilonDominance
        } else {
            FrontDistance::Performance
        };
        if next != self.active {
            log::debug!(
                "Front distance {:?} stalled, switching to {next:?}",
                self.active
            );
        }
        self.active = next;
        next
    }
}

impl Default for HeuristicSwitch {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::candidate::test_support::scored;
    use crate::search::goal::Goal;

    #[test]
    fn test_stays_while_improving() {
        let mut switch = HeuristicSwitch::new();
        assert_eq!(switch.advance(true), FrontDistance::EpsilonDominance);
        assert_eq!(switch.advance(true), FrontDistance::EpsilonDominance);
    }

    #[test]
    fn test_alternates_on_stagnation() {
        let mut switch = HeuristicSwitch::new();
        // epsilon 1, performance 0
        assert_eq!(switch.advance(false), FrontDistance::Performance);
        // epsilon 1, performance 1
        assert_eq!(switch.advance(false), FrontDistance::Performance);
        // epsilon 1, performance 2
        assert_eq!(switch.advance(false), FrontDistance::EpsilonDominance);
        // improvement resets only the active counter
        assert_eq!(switch.advance(true), FrontDistance::EpsilonDominance);
        assert_eq!(switch.epsilon_stagnation, 0);
        assert_eq!(switch.performance_stagnation, 2);
    }

    #[test]
    fn test_observe_tracks_best_values() {
        let mut graph = GoalGraph::new();
        let a = graph.add_goal(Goal::new("C", "a"));
        let b = graph.add_goal(Goal::new("C", "b"));
        let mut switch = HeuristicSwitch::new();

        let first = vec![scored(0, &[(a, 3.0)]), scored(1, &[(a, 2.0)])];
        assert!(switch.observe(&first, &graph, &[a]));
        assert!(!switch.observe(&first, &graph, &[a]));

        let better = vec![scored(2, &[(a, 1.0)])];
        assert!(switch.observe(&better, &graph, &[a]));
        assert_eq!(switch.best.get(&a), Some(&1.0));

        // A newly opened goal counts as progress; a dropped one is forgotten.
        let opened = vec![scored(3, &[(b, 5.0)])];
        assert!(switch.observe(&opened, &graph, &[b]));
        assert!(!switch.best.contains_key(&a));
    }
}
