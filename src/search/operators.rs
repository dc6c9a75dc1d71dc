//! Interfaces to the collaborators the engine treats as black boxes:
//! genome construction, genetic operators, execution and stopping.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use super::goal::Goal;
use super::rng::SearchRng;

/// Outcome of running one candidate.
#[derive(Debug, Clone)]
pub enum Execution<T> {
    /// The run finished and produced a trace.
    Completed(T),
    /// The run exceeded its deadline.
    TimedOut,
    /// The run crashed outside the code under test.
    Faulted(String),
}

/// Runs candidates and measures how close their traces get to each goal.
pub trait FitnessFunction<G>: Send + Sync {
    /// Whatever the execution records (reached branches, outputs ...).
    type Trace: Send;

    /// Execute a genome. Implementations should give up once `deadline`
    /// passes; a run that returns late is treated as a timeout anyway.
    fn execute(&self, genome: &G, deadline: Instant) -> Execution<Self::Trace>;

    /// Distance from the trace to the goal, in `[0, ∞)`; 0 means covered.
    fn distance(&self, goal: &Goal, trace: &Self::Trace) -> f64;

    /// Secondary quality scores (e.g. non-functional metrics).
    fn indicators(&self, _genome: &G, _trace: &Self::Trace) -> BTreeMap<String, f64> {
        BTreeMap::new()
    }
}

/// Creates fresh genomes (random or seeded).
pub trait ChromosomeFactory<G>: Send + Sync {
    fn create(&self, rng: &mut SearchRng) -> G;
}

/// Mutates a genome in place.
pub trait MutationOperator<G>: Send + Sync {
    /// Returns whether the genome actually changed. Encodings where a
    /// mutation can be a no-op must report `false` so the caller can retry.
    fn mutate(&self, genome: &mut G, rng: &mut SearchRng) -> bool;
}

/// Recoverable failure of a crossover attempt.
#[derive(Debug, Clone, thiserror::Error)]
#[error("Crossover failed: {0}")]
pub struct CrossoverError(pub String);

/// Recombines two genomes.
pub trait CrossoverOperator<G>: Send + Sync {
    fn crossover(&self, a: &G, b: &G, rng: &mut SearchRng) -> Result<(G, G), CrossoverError>;
}

/// Factory, mutation and crossover bundled, as every strategy needs all three.
pub trait GeneticOperators<G>: ChromosomeFactory<G> + MutationOperator<G> + CrossoverOperator<G> {}

impl<G, T> GeneticOperators<G> for T where
    T: ChromosomeFactory<G> + MutationOperator<G> + CrossoverOperator<G>
{
}

/// Snapshot of the engine passed to stopping conditions.
#[derive(Debug, Clone, Copy)]
pub struct EngineState {
    /// Generations completed.
    pub generation: usize,
    /// Candidate evaluations performed.
    pub evaluations: u64,
    /// Time since the search started.
    pub elapsed: Duration,
    /// Covered goals.
    pub covered_goals: usize,
    /// Size of the goal universe.
    pub total_goals: usize,
}

/// Decides when the search ends.
pub trait StoppingCondition: Send + Sync {
    fn is_finished(&self, state: &EngineState) -> bool;
}

impl<F> StoppingCondition for F
where
    F: Fn(&EngineState) -> bool + Send + Sync,
{
    fn is_finished(&self, state: &EngineState) -> bool {
        self(state)
    }
}
