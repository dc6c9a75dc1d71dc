//! The unit being optimized: a genome plus its evaluation bookkeeping.

use std::collections::{BTreeMap, BTreeSet};

use super::goal::{GoalGraph, GoalId};

/// A genome the engine can evolve.
///
/// The engine never looks inside a genome; it only needs to clone it and ask
/// for its size, which the default archive policy uses to prefer simpler
/// solutions.
pub trait Genome: Clone + Send + Sync {
    /// Number of elements (statements, genes ...) in the genome.
    fn size(&self) -> usize;
}

/// A candidate individual in the population.
#[derive(Debug, Clone)]
pub struct Candidate<G> {
    /// Unique identifier.
    pub id: u64,
    /// The genome.
    pub genome: G,
    /// Fitness per goal evaluated in `evaluated_epoch`.
    pub fitness: BTreeMap<GoalId, f64>,
    /// Sum of normalized fitness over the evaluated goals (lower is better).
    pub aggregate: f64,
    /// Pareto front index, 0 = non-dominated layer.
    pub rank: usize,
    /// Local density estimate; higher means more isolated.
    pub crowding_distance: f64,
    /// Optional secondary scores used by indicator-based archive policies.
    pub quality_indicators: BTreeMap<String, f64>,
    /// Sum of min-max normalized quality indicators within the last ranked
    /// population (lower is better).
    pub performance_score: f64,
    /// Already covered goals this candidate also reaches.
    pub reached: BTreeSet<GoalId>,
    /// Execution timed out or faulted on the last evaluation.
    pub faulted: bool,
    /// Genome changed since the last evaluation.
    pub changed: bool,
    /// Goal epoch the fitness map belongs to (None = never evaluated).
    pub evaluated_epoch: Option<u64>,
    /// Generation created.
    pub generation: usize,
    /// Parent IDs.
    pub parents: Vec<u64>,
}

impl<G: Genome> Candidate<G> {
    pub fn new(id: u64, genome: G, generation: usize, parents: Vec<u64>) -> Self {
        Self {
            id,
            genome,
            fitness: BTreeMap::new(),
            aggregate: f64::INFINITY,
            rank: usize::MAX,
            crowding_distance: 0.0,
            quality_indicators: BTreeMap::new(),
            performance_score: 0.0,
            reached: BTreeSet::new(),
            faulted: false,
            changed: true,
            evaluated_epoch: None,
            generation,
            parents,
        }
    }

    /// Copy of this candidate with a fresh identity, ready to be modified.
    pub fn offspring(&self, id: u64, generation: usize) -> Self {
        Self::new(id, self.genome.clone(), generation, vec![self.id])
    }

    /// Genome size.
    pub fn size(&self) -> usize {
        self.genome.size()
    }

    /// Fitness for `goal`, or the goal's worst value if not evaluated.
    pub fn fitness_for(&self, graph: &GoalGraph, goal: GoalId) -> f64 {
        self.fitness
            .get(&goal)
            .copied()
            .unwrap_or_else(|| graph.goal(goal).worst())
    }

    /// Whether the fitness map is valid for the given goal epoch.
    pub fn is_evaluated_for(&self, epoch: u64) -> bool {
        !self.changed && self.evaluated_epoch == Some(epoch)
    }

    /// `true` if `self` is at least as good as `other` on aggregate fitness.
    #[inline]
    pub fn better_or_equal(&self, other: &Self) -> bool {
        self.aggregate <= other.aggregate
    }
}

/// Sort candidates best-to-worst by aggregate fitness (stable).
pub fn sort_by_aggregate<G>(population: &mut [Candidate<G>]) {
    population.sort_by(|a, b| a.aggregate.total_cmp(&b.aggregate));
}
