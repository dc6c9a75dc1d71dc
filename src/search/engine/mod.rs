//! The generational search loop.
//!
//! [`SearchEngine`] owns the population, the goal manager and the genetic
//! operators. Every strategy follows the same cycle: breed offspring,
//! evaluate them in parallel against the current goals, absorb coverage in
//! index order, then apply the strategy's survivor rule.

mod evolution_strategy;
mod lambda_lambda;
mod pareto;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use rayon::prelude::*;

use crate::schema::{
    ConfigError, SearchConfig, SearchProgress, SearchResult, SearchStats, SolutionSummary,
    StopReason, StrategyConfig,
};

use super::candidate::{Candidate, Genome};
use super::goal::GoalGraph;
use super::heuristic::HeuristicSwitch;
use super::manager::GoalManager;
use super::operators::{EngineState, FitnessFunction, GeneticOperators, StoppingCondition};
use super::rng::SearchRng;
use super::selection::Selector;

/// Errors raised while setting up a search.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("Goal graph is empty")]
    NoGoals,
    #[error("Failed to build evaluation thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Evolution engine driving a coverage search.
pub struct SearchEngine<G, O, F> {
    config: SearchConfig,
    rng: SearchRng,
    operators: O,
    fitness: F,
    manager: GoalManager<G>,
    population: Vec<Candidate<G>>,
    selector: Selector,
    heuristic: HeuristicSwitch,
    stopping_conditions: Vec<Box<dyn StoppingCondition>>,
    pool: Option<rayon::ThreadPool>,
    generation: usize,
    evaluations: u64,
    failed_evaluations: u64,
    started: Option<Instant>,
    next_id: Arc<AtomicU64>,
    cancelled: Arc<AtomicBool>,
}

impl<G, O, F> SearchEngine<G, O, F>
where
    G: Genome,
    O: GeneticOperators<G>,
    F: FitnessFunction<G>,
{
    /// Create a new engine over the given goal universe.
    pub fn new(
        config: SearchConfig,
        graph: GoalGraph,
        operators: O,
        fitness: F,
    ) -> Result<Self, SearchError> {
        config.validate()?;
        if graph.is_empty() {
            return Err(SearchError::NoGoals);
        }

        let seed = config.random_seed.unwrap_or_else(rand::random);
        log::info!(
            "Search seed {seed}, strategy {:?}, {} goals",
            config.strategy,
            graph.len()
        );

        let pool = match config.threads {
            Some(threads) => Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .build()?,
            ),
            None => None,
        };

        Ok(Self {
            rng: SearchRng::new(seed),
            operators,
            fitness,
            manager: GoalManager::new(graph, config.replacement),
            population: Vec::new(),
            selector: Selector::new(config.selection.clone()),
            heuristic: HeuristicSwitch::new(),
            stopping_conditions: Vec::new(),
            pool,
            generation: 0,
            evaluations: 0,
            failed_evaluations: 0,
            started: None,
            next_id: Arc::new(AtomicU64::new(0)),
            cancelled: Arc::new(AtomicBool::new(false)),
            config,
        })
    }

    /// Add an external stopping condition, checked after the built-in budget.
    pub fn with_stopping_condition(mut self, condition: impl StoppingCondition + 'static) -> Self {
        self.stopping_conditions.push(Box::new(condition));
        self
    }

    /// Get cancellation handle.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn manager(&self) -> &GoalManager<G> {
        &self.manager
    }

    pub fn population(&self) -> &[Candidate<G>] {
        &self.population
    }

    /// Generations completed since initialization.
    pub fn generation(&self) -> usize {
        self.generation
    }

    pub fn evaluations(&self) -> u64 {
        self.evaluations
    }

    /// Snapshot handed to stopping conditions.
    pub fn state(&self) -> EngineState {
        EngineState {
            generation: self.generation,
            evaluations: self.evaluations,
            elapsed: self.started.map_or(Duration::ZERO, |t| t.elapsed()),
            covered_goals: self.manager.num_covered(),
            total_goals: self.manager.total_goals(),
        }
    }

    /// Create, evaluate and rank the initial population.
    pub fn initialize_population(&mut self) {
        self.started.get_or_insert_with(Instant::now);
        self.generation = 0;

        let size = self
            .config
            .strategy
            .population_size(self.config.population_size);
        let mut population = Vec::with_capacity(size);
        for _ in 0..size {
            let genome = self.operators.create(&mut self.rng);
            population.push(Candidate::new(self.next_id(), genome, 0, Vec::new()));
        }

        self.settle(&mut population);
        self.population = population;

        match self.config.strategy {
            StrategyConfig::Nsga2 => self.rank_population(false),
            StrategyConfig::ManyObjective => self.rank_population(true),
            _ => {}
        }

        log::info!(
            "Initial population of {size}: {}/{} goals covered",
            self.manager.num_covered(),
            self.manager.total_goals()
        );
    }

    /// Run one generation of the configured strategy.
    pub fn evolve(&mut self) {
        if self.population.is_empty() {
            self.initialize_population();
            return;
        }

        match self.config.strategy.clone() {
            StrategyConfig::Nsga2 => self.step_pareto(false),
            StrategyConfig::ManyObjective => self.step_pareto(true),
            StrategyConfig::MuCommaLambda { mu, lambda } => self.step_mu_comma_lambda(mu, lambda),
            StrategyConfig::MuPlusLambda { mu, lambda } => self.step_mu_plus_lambda(mu, lambda),
            StrategyConfig::OnePlusOne => self.step_mu_plus_lambda(1, 1),
            StrategyConfig::OnePlusLambdaLambda { lambda } => self.step_one_plus_lambda_lambda(lambda),
        }

        self.generation += 1;
        log::debug!(
            "Generation {}: {}/{} goals covered, {} current, {} evaluations",
            self.generation,
            self.manager.num_covered(),
            self.manager.total_goals(),
            self.manager.num_current(),
            self.evaluations
        );
    }

    /// Check if the search should stop.
    pub fn should_stop(&self) -> Option<StopReason> {
        if self.cancelled.load(Ordering::Relaxed) {
            return Some(StopReason::Cancelled);
        }

        if self.manager.num_uncovered() == 0 {
            return Some(StopReason::AllGoalsCovered);
        }

        let state = self.state();
        if let Some(reason) = self.config.budget.exhausted(&state) {
            return Some(reason);
        }

        if self
            .stopping_conditions
            .iter()
            .any(|condition| condition.is_finished(&state))
        {
            return Some(StopReason::External);
        }

        None
    }

    pub fn is_finished(&self) -> bool {
        self.should_stop().is_some()
    }

    /// Get current progress.
    pub fn progress(&self) -> SearchProgress {
        let best_fitness = self
            .population
            .iter()
            .map(|c| c.aggregate)
            .fold(f64::INFINITY, f64::min);

        SearchProgress {
            generation: self.generation,
            evaluations: self.evaluations,
            covered_goals: self.manager.num_covered(),
            current_goals: self.manager.num_current(),
            uncovered_goals: self.manager.num_uncovered(),
            coverage: self.manager.coverage(),
            best_fitness,
            archive_size: self.manager.archive_len(),
            population_size: self.population.len(),
        }
    }

    /// Run the search with a progress callback invoked after initialization
    /// and after every generation.
    pub fn run_with_callback<C>(&mut self, mut callback: C) -> SearchResult
    where
        C: FnMut(&SearchProgress),
    {
        let start_time = *self.started.get_or_insert_with(Instant::now);

        if self.population.is_empty() {
            self.initialize_population();
            callback(&self.progress());
        }

        let stop_reason = loop {
            if let Some(reason) = self.should_stop() {
                break reason;
            }
            self.evolve();
            callback(&self.progress());
        };

        log::info!(
            "Search stopped after {} generations ({stop_reason:?}): {}/{} goals covered",
            self.generation,
            self.manager.num_covered(),
            self.manager.total_goals()
        );

        self.result(stop_reason, start_time.elapsed().as_secs_f64())
    }

    /// Run the search without progress reporting.
    pub fn run(&mut self) -> SearchResult {
        self.run_with_callback(|_| {})
    }

    /// Archived test suite and statistics.
    pub fn result(&self, stop_reason: StopReason, elapsed_seconds: f64) -> SearchResult {
        let graph = self.manager.graph();
        let solutions = self
            .manager
            .archived_solutions()
            .map(|(candidate, goals)| SolutionSummary {
                id: candidate.id,
                generation: candidate.generation,
                size: candidate.size(),
                goals: goals.iter().map(|&g| graph.goal(g).to_string()).collect(),
                parents: candidate.parents.clone(),
            })
            .collect();
        let uncovered = self
            .manager
            .remaining_goals()
            .into_iter()
            .map(|g| graph.goal(g).to_string())
            .collect();

        SearchResult {
            coverage: self.manager.coverage(),
            solutions,
            uncovered,
            stats: SearchStats {
                generations: self.generation,
                total_evaluations: self.evaluations,
                failed_evaluations: self.failed_evaluations,
                total_goals: self.manager.total_goals(),
                covered_goals: self.manager.num_covered(),
                elapsed_seconds,
                stop_reason,
            },
        }
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Evaluate every member not valid for the current goal epoch.
    fn evaluate_stale(&mut self, batch: &mut [Candidate<G>]) {
        let epoch = self.manager.epoch();
        let manager = &self.manager;
        let fitness = &self.fitness;
        let timeout = Duration::from_millis(self.config.evaluation_timeout_ms);

        let mut run = || {
            batch
                .par_iter_mut()
                .filter(|candidate| !candidate.is_evaluated_for(epoch))
                .map(|candidate| {
                    let ok = manager.evaluate(candidate, fitness, timeout);
                    (1u64, u64::from(!ok))
                })
                .reduce(|| (0, 0), |a, b| (a.0 + b.0, a.1 + b.1))
        };
        let (evaluated, failed) = match &self.pool {
            Some(pool) => pool.install(run),
            None => run(),
        };

        self.evaluations += evaluated;
        self.failed_evaluations += failed;
    }

    /// Evaluate and absorb a batch until its fitness matches the goal epoch.
    ///
    /// Absorbing can open new goals; the batch is then re-evaluated against
    /// them, so goals reached in the same run are covered right away. Every
    /// round covers at least one goal, so this terminates.
    fn settle(&mut self, batch: &mut [Candidate<G>]) {
        loop {
            self.evaluate_stale(batch);
            let epoch = self.manager.epoch();
            self.manager.absorb_generation(batch);
            if self.manager.epoch() == epoch || self.manager.num_current() == 0 {
                break;
            }
        }
    }

    /// Mutate until the genome reports a change or the attempt cap is hit.
    fn mutate_until_changed(&mut self, genome: &mut G) -> bool {
        for _ in 0..self.config.max_mutation_attempts {
            if self.operators.mutate(genome, &mut self.rng) {
                return true;
            }
        }
        log::trace!(
            "Mutation left genome unchanged after {} attempts",
            self.config.max_mutation_attempts
        );
        false
    }

    /// Clone `parent` under a fresh id and mutate it.
    fn mutant_of(&mut self, parent: &Candidate<G>) -> Candidate<G> {
        let mut child = parent.offspring(self.next_id(), self.generation + 1);
        self.mutate_until_changed(&mut child.genome);
        child
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::time::Instant;

    use crate::search::candidate::Genome;
    use crate::search::goal::{Goal, GoalGraph, GoalId};
    use crate::search::operators::{
        ChromosomeFactory, CrossoverError, CrossoverOperator, Execution, FitnessFunction,
        MutationOperator,
    };
    use crate::search::rng::SearchRng;

    /// Bit-string genome.
    #[derive(Debug, Clone, PartialEq)]
    pub struct Bits(pub Vec<bool>);

    impl Genome for Bits {
        fn size(&self) -> usize {
            self.0.iter().filter(|&&b| b).count()
        }
    }

    /// Random bit strings, one-bit flips and one-point crossover.
    pub struct BitOps {
        pub len: usize,
        /// Make every crossover fail.
        pub broken_crossover: bool,
    }

    impl BitOps {
        pub fn new(len: usize) -> Self {
            Self {
                len,
                broken_crossover: false,
            }
        }
    }

    impl ChromosomeFactory<Bits> for BitOps {
        fn create(&self, rng: &mut SearchRng) -> Bits {
            Bits((0..self.len).map(|_| rng.chance(0.1)).collect())
        }
    }

    impl MutationOperator<Bits> for BitOps {
        fn mutate(&self, genome: &mut Bits, rng: &mut SearchRng) -> bool {
            let i = rng.index(genome.0.len());
            genome.0[i] = !genome.0[i];
            true
        }
    }

    impl CrossoverOperator<Bits> for BitOps {
        fn crossover(
            &self,
            a: &Bits,
            b: &Bits,
            rng: &mut SearchRng,
        ) -> Result<(Bits, Bits), CrossoverError> {
            if self.broken_crossover {
                return Err(CrossoverError("disabled".to_string()));
            }
            let cut = rng.index(a.0.len());
            let mut x = a.0[..cut].to_vec();
            x.extend_from_slice(&b.0[cut..]);
            let mut y = b.0[..cut].to_vec();
            y.extend_from_slice(&a.0[cut..]);
            Ok((Bits(x), Bits(y)))
        }
    }

    /// Goal `i` wants bit `i` set; its distance is the number of unset bits
    /// among `0..=i`, so every goal on the ladder has a gradient.
    pub struct Ladder;

    impl FitnessFunction<Bits> for Ladder {
        type Trace = Vec<bool>;

        fn execute(&self, genome: &Bits, _deadline: Instant) -> Execution<Self::Trace> {
            Execution::Completed(genome.0.clone())
        }

        fn distance(&self, goal: &Goal, trace: &Self::Trace) -> f64 {
            let Ok(i) = goal.discriminator.parse::<usize>() else {
                return f64::MAX;
            };
            trace.iter().take(i + 1).filter(|&&b| !b).count() as f64
        }
    }

    /// `n` goals, chained `0 -> 1 -> ... -> n-1`.
    pub fn ladder_graph(n: usize) -> (GoalGraph, Vec<GoalId>) {
        let mut graph = GoalGraph::new();
        let ids: Vec<_> = (0..n)
            .map(|i| graph.add_goal(Goal::new("Ladder", i.to_string())))
            .collect();
        for pair in ids.windows(2) {
            graph.add_dependency(pair[0], pair[1]);
        }
        (graph, ids)
    }
}
