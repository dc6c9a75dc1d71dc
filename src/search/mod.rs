//! Many-objective evolutionary search for coverage goals.
//!
//! # Overview
//!
//! The search system consists of:
//!
//! - **Goals** (`goal`): Coverage objectives and their structural dependency graph
//! - **Goal Manager** (`manager`): Covered/uncovered/current partition plus the
//!   per-goal archive of best solutions
//! - **Ranking** (`ranking`): Non-dominated sorting, crowding distance and
//!   preference sorting
//! - **Selection** (`selection`): Parent selection operators
//! - **Engine** (`engine`): The generation loop and its strategies
//!
//! Only the goals currently targeted drive fitness. A goal becomes targeted
//! once all of its structural parents are covered, so the search climbs a
//! dependency graph instead of facing every goal at once.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::time::Instant;
//!
//! use evocover::schema::SearchConfig;
//! use evocover::search::{
//!     ChromosomeFactory, CrossoverError, CrossoverOperator, Execution, FitnessFunction, Genome,
//!     Goal, GoalGraph, MutationOperator, SearchEngine, SearchRng,
//! };
//!
//! #[derive(Clone)]
//! struct Input(i64);
//!
//! impl Genome for Input {
//!     fn size(&self) -> usize {
//!         1
//!     }
//! }
//!
//! struct Ops;
//!
//! impl ChromosomeFactory<Input> for Ops {
//!     fn create(&self, rng: &mut SearchRng) -> Input {
//!         Input(rng.index(1000) as i64)
//!     }
//! }
//!
//! impl MutationOperator<Input> for Ops {
//!     fn mutate(&self, genome: &mut Input, rng: &mut SearchRng) -> bool {
//!         genome.0 += if rng.chance(0.5) { 1 } else { -1 };
//!         true
//!     }
//! }
//!
//! impl CrossoverOperator<Input> for Ops {
//!     fn crossover(
//!         &self,
//!         a: &Input,
//!         b: &Input,
//!         _rng: &mut SearchRng,
//!     ) -> Result<(Input, Input), CrossoverError> {
//!         Ok((Input((a.0 + b.0) / 2), Input(a.0 - b.0)))
//!     }
//! }
//!
//! /// Branch distance to `x == target` for each goal.
//! struct Branches;
//!
//! impl FitnessFunction<Input> for Branches {
//!     type Trace = i64;
//!
//!     fn execute(&self, genome: &Input, _deadline: Instant) -> Execution<i64> {
//!         Execution::Completed(genome.0)
//!     }
//!
//!     fn distance(&self, goal: &Goal, x: &i64) -> f64 {
//!         let target: i64 = goal.discriminator.parse().unwrap_or_default();
//!         (x - target).abs() as f64
//!     }
//! }
//!
//! let mut graph = GoalGraph::new();
//! let low = graph.add_goal(Goal::new("f", "10"));
//! let high = graph.add_goal(Goal::new("f", "500"));
//! graph.add_dependency(low, high);
//!
//! let mut engine: SearchEngine<Input, _, _> =
//!     SearchEngine::new(SearchConfig::default(), graph, Ops, Branches).unwrap();
//! let result = engine.run_with_callback(|progress| {
//!     println!("Generation {}: {:.0}% covered", progress.generation, progress.coverage * 100.0);
//! });
//! println!("{} solutions", result.solutions.len());
//! ```
//!
//! # Strategies
//!
//! - `Nsga2`: Non-dominated sorting over the current goals
//! - `ManyObjective`: NSGA-II with preference sorting; the best candidate for
//!   every current goal always survives. `front_distance` picks crowding,
//!   epsilon dominance, or an adaptive switch to the quality-indicator score
//! - `MuCommaLambda` / `MuPlusLambda` / `OnePlusOne`: Mutation-only evolution strategies
//! - `OnePlusLambdaLambda`: Mutation phase followed by a crossover repair phase

mod budget;
mod candidate;
mod engine;
mod goal;
mod heuristic;
mod manager;
mod operators;
mod ranking;
mod replacement;
mod rng;
mod selection;

pub use candidate::{Candidate, Genome, sort_by_aggregate};
pub use engine::{SearchEngine, SearchError};
pub use goal::{Goal, GoalGraph, GoalId};
pub use manager::{GoalManager, InvariantViolation};
pub use operators::{
    ChromosomeFactory, CrossoverError, CrossoverOperator, EngineState, Execution,
    FitnessFunction, GeneticOperators, MutationOperator, StoppingCondition,
};
pub use ranking::{
    FrontDistance, crowded_comparator, crowding_distance_assignment, dominates,
    epsilon_dominance_assignment, fast_non_dominated_sort, performance_score_assignment,
    preference_sort,
};
pub use rng::SearchRng;
pub use selection::{Selector, rank_index};
