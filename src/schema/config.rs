//! Search configuration types.
//!
//! Everything here is plain serde data so a run can be described in a JSON
//! file and reproduced from its `random_seed`.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Top-level configuration for a coverage search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Generation loop shape.
    #[serde(default)]
    pub strategy: StrategyConfig,
    /// Population size N for NSGA-II and the many-objective loop.
    #[serde(default = "default_population_size")]
    pub population_size: usize,
    /// Probability of applying crossover to a selected pair (0.0-1.0).
    #[serde(default = "default_crossover_rate")]
    pub crossover_rate: f64,
    /// Probability of mutating an offspring (0.0-1.0).
    #[serde(default = "default_mutation_rate")]
    pub mutation_rate: f64,
    /// Upper bound on mutate-until-changed retries.
    #[serde(default = "default_max_mutation_attempts")]
    pub max_mutation_attempts: usize,
    /// Parent selection operator.
    #[serde(default)]
    pub selection: SelectionMethod,
    /// Policy deciding which candidate stays archived for a covered goal.
    #[serde(default)]
    pub replacement: ReplacementPolicy,
    /// How the many-objective loop orders candidates inside a front.
    #[serde(default)]
    pub front_distance: FrontHeuristic,
    /// Stopping budget.
    #[serde(default)]
    pub budget: BudgetConfig,
    /// Wall-clock budget for one candidate execution, in milliseconds.
    #[serde(default = "default_evaluation_timeout_ms")]
    pub evaluation_timeout_ms: u64,
    /// Evaluation worker threads (None = one per core).
    #[serde(default)]
    pub threads: Option<usize>,
    /// Random seed for reproducibility.
    #[serde(default)]
    pub random_seed: Option<u64>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyConfig::default(),
            population_size: default_population_size(),
            crossover_rate: default_crossover_rate(),
            mutation_rate: default_mutation_rate(),
            max_mutation_attempts: default_max_mutation_attempts(),
            selection: SelectionMethod::default(),
            replacement: ReplacementPolicy::default(),
            front_distance: FrontHeuristic::default(),
            budget: BudgetConfig::default(),
            evaluation_timeout_ms: default_evaluation_timeout_ms(),
            threads: None,
            random_seed: None,
        }
    }
}

fn default_population_size() -> usize {
    50
}
fn default_crossover_rate() -> f64 {
    0.75
}
fn default_mutation_rate() -> f64 {
    0.8
}
fn default_max_mutation_attempts() -> usize {
    10
}
fn default_evaluation_timeout_ms() -> u64 {
    5_000
}

/// Generation loop shape.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum StrategyConfig {
    /// Non-dominated sorting GA over the currently targeted goals.
    Nsga2,
    /// NSGA-II replacement with preference sorting: the best candidate for
    /// every open goal always survives.
    ManyObjective,
    /// Non-elitist (μ,λ): offspring fully replace the parents.
    MuCommaLambda { mu: usize, lambda: usize },
    /// Elitist (μ+λ): a parent is only replaced by an offspring at least as good.
    MuPlusLambda { mu: usize, lambda: usize },
    /// Classic (1+1), i.e. (μ+λ) with μ = λ = 1.
    OnePlusOne,
    /// 1+(λ,λ): mutation phase followed by a crossover repair phase.
    OnePlusLambdaLambda { lambda: usize },
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self::ManyObjective
    }
}

impl StrategyConfig {
    /// Number of individuals the strategy keeps between generations.
    pub fn population_size(&self, configured: usize) -> usize {
        match self {
            Self::Nsga2 | Self::ManyObjective => configured,
            Self::MuCommaLambda { mu, .. } | Self::MuPlusLambda { mu, .. } => *mu,
            Self::OnePlusOne | Self::OnePlusLambdaLambda { .. } => 1,
        }
    }
}

/// Selection operator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "method")]
pub enum SelectionMethod {
    /// The K best individuals of a fitness-sorted population, in turn.
    Elitist { k: usize },
    /// Linear ranking with bias `b > 1` (closed-form inverse CDF).
    Rank {
        #[serde(default = "default_rank_bias")]
        bias: f64,
    },
    /// Fitness-proportionate (roulette wheel).
    Roulette,
    /// Uniform random choice.
    Random,
    /// Binary tournament over a shuffled permutation, crowded comparison.
    BinaryTournament,
    /// K-way tournament with rank and crowding comparison.
    Tournament {
        #[serde(default = "default_tournament_size")]
        size: usize,
    },
}

impl Default for SelectionMethod {
    fn default() -> Self {
        Self::BinaryTournament
    }
}

fn default_rank_bias() -> f64 {
    1.7
}
fn default_tournament_size() -> usize {
    10
}

/// Archive replacement policy for goals that are already covered.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum ReplacementPolicy {
    /// Smaller genome wins; the newcomer wins ties.
    #[default]
    Size,
    /// Pairwise min-max normalized quality indicators, lower sum wins.
    MinMaxIndicators,
    /// Indicators squashed with `x / (x + 1)`, lower sum wins.
    MonotoneIndicators,
}

/// Secondary distance the many-objective loop uses inside a front.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum FrontHeuristic {
    /// NSGA-II crowding distance.
    #[default]
    Crowding,
    /// Reward candidates holding the best value of some goal, scaled by how
    /// much of the front they beat on it.
    EpsilonDominance,
    /// Start with epsilon dominance and switch to the quality-indicator
    /// performance score (and back) whenever the active one stops improving
    /// the best objective values.
    Adaptive,
}

/// Stopping budget. A limit of `None` never fires.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetConfig {
    /// Maximum number of generations.
    #[serde(default = "default_max_generations")]
    pub max_generations: Option<usize>,
    /// Maximum number of candidate evaluations.
    #[serde(default)]
    pub max_evaluations: Option<u64>,
    /// Wall-clock budget for the whole search, in milliseconds.
    #[serde(default)]
    pub time_budget_ms: Option<u64>,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            max_generations: default_max_generations(),
            max_evaluations: None,
            time_budget_ms: None,
        }
    }
}

fn default_max_generations() -> Option<usize> {
    Some(100)
}

// ============================================================================
// Validation
// ============================================================================

/// Configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Population size must be at least 2")]
    PopulationTooSmall,
    #[error("Invalid probability for {name}: {value}")]
    InvalidRate { name: &'static str, value: f64 },
    #[error("Lambda ({lambda}) must be a positive multiple of mu ({mu})")]
    InvalidLambda { mu: usize, lambda: usize },
    #[error("Rank selection bias must be in (1, 2], got {0}")]
    InvalidRankBias(f64),
    #[error("Selection size must be positive")]
    InvalidSelectionSize,
    #[error("Mutation attempts must be positive")]
    InvalidMutationAttempts,
    #[error("Thread count must be positive")]
    InvalidThreads,
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

impl SearchConfig {
    /// Load a configuration from a JSON file and validate it.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate search configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.strategy {
            StrategyConfig::Nsga2 | StrategyConfig::ManyObjective => {
                if self.population_size < 2 {
                    return Err(ConfigError::PopulationTooSmall);
                }
            }
            StrategyConfig::MuCommaLambda { mu, lambda }
            | StrategyConfig::MuPlusLambda { mu, lambda } => {
                if mu == 0 || lambda == 0 || lambda % mu != 0 {
                    return Err(ConfigError::InvalidLambda { mu, lambda });
                }
            }
            StrategyConfig::OnePlusLambdaLambda { lambda } => {
                if lambda == 0 {
                    return Err(ConfigError::InvalidLambda { mu: 1, lambda });
                }
            }
            StrategyConfig::OnePlusOne => {}
        }

        let check_rate = |value: f64, name: &'static str| {
            if (0.0..=1.0).contains(&value) {
                Ok(())
            } else {
                Err(ConfigError::InvalidRate { name, value })
            }
        };
        check_rate(self.crossover_rate, "crossover_rate")?;
        check_rate(self.mutation_rate, "mutation_rate")?;

        match self.selection {
            SelectionMethod::Rank { bias } if !(bias > 1.0 && bias <= 2.0) => {
                return Err(ConfigError::InvalidRankBias(bias));
            }
            SelectionMethod::Elitist { k: 0 } | SelectionMethod::Tournament { size: 0 } => {
                return Err(ConfigError::InvalidSelectionSize);
            }
            _ => {}
        }

        if self.max_mutation_attempts == 0 {
            return Err(ConfigError::InvalidMutationAttempts);
        }

        if self.threads == Some(0) {
            return Err(ConfigError::InvalidThreads);
        }

        Ok(())
    }
}
