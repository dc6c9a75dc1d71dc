//! Progress and result types reported by the search engine.

use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Progress update emitted after every generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchProgress {
    /// Current generation number.
    pub generation: usize,
    /// Candidate evaluations performed so far.
    pub evaluations: u64,
    /// Number of covered goals.
    pub covered_goals: usize,
    /// Number of goals driving fitness this generation.
    pub current_goals: usize,
    /// Number of goals not covered yet.
    pub uncovered_goals: usize,
    /// Covered fraction of all goals.
    pub coverage: f64,
    /// Lowest aggregate fitness in the population.
    pub best_fitness: f64,
    /// Candidates currently archived.
    pub archive_size: usize,
    /// Population size.
    pub population_size: usize,
}

/// One archived solution in the final result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolutionSummary {
    /// Candidate identifier.
    pub id: u64,
    /// Generation the candidate was created in.
    pub generation: usize,
    /// Genome size as reported by the genome.
    pub size: usize,
    /// Goals this candidate is the archived best for, as `scope:discriminator`.
    pub goals: Vec<String>,
    /// Parent IDs (for genealogy).
    pub parents: Vec<u64>,
}

/// Final result of a search run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// Covered fraction of all goals.
    pub coverage: f64,
    /// Archived solutions, one entry per distinct candidate.
    pub solutions: Vec<SolutionSummary>,
    /// Goals never covered, as `scope:discriminator`.
    pub uncovered: Vec<String>,
    /// Statistics from the run.
    pub stats: SearchStats,
}

impl SearchResult {
    /// Write the result as pretty-printed JSON.
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)
    }

    /// Load a result previously written by [`SearchResult::save_json`].
    pub fn load_json<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let content = fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }
}

/// Statistics from a search run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchStats {
    /// Total generations run.
    pub generations: usize,
    /// Total evaluations performed.
    pub total_evaluations: u64,
    /// Evaluations that timed out or faulted.
    pub failed_evaluations: u64,
    /// Number of goals in the goal universe.
    pub total_goals: usize,
    /// Number of covered goals.
    pub covered_goals: usize,
    /// Time taken (in seconds).
    pub elapsed_seconds: f64,
    /// Reason for stopping.
    pub stop_reason: StopReason,
}

/// Reason the search stopped.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum StopReason {
    /// Reached maximum generations.
    MaxGenerations,
    /// Reached maximum evaluations.
    MaxEvaluations,
    /// Wall-clock budget exhausted.
    TimeBudget,
    /// Every goal is covered.
    AllGoalsCovered,
    /// A user supplied stopping condition fired.
    External,
    /// User cancelled.
    Cancelled,
}
