//! Evocover CLI - Run a coverage search on a synthetic branch ladder.
//!
//! The ladder stands in for a program under test: input `i` must equal a
//! target before the branches guarded by input `i + 1` become reachable.

#[cfg(feature = "dhat-heap")]
#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

use std::path::PathBuf;
use std::time::Instant;

use rand_distr::{Distribution, Normal};

use evocover::{
    schema::SearchConfig,
    search::{
        ChromosomeFactory, CrossoverError, CrossoverOperator, Execution, FitnessFunction, Genome,
        Goal, GoalGraph, MutationOperator, SearchEngine, SearchRng,
    },
};

/// Inputs beyond this magnitude crash the simulated program.
const INPUT_LIMIT: i64 = 1_000_000;

#[derive(Debug, Clone)]
struct Inputs(Vec<i64>);

impl Genome for Inputs {
    fn size(&self) -> usize {
        self.0.iter().filter(|&&x| x != 0).count()
    }
}

struct LadderOperators {
    inputs: usize,
    step: Normal<f64>,
}

impl LadderOperators {
    fn new(inputs: usize) -> Self {
        Self {
            inputs,
            step: Normal::new(0.0, 20.0).unwrap_or_else(|e| {
                eprintln!("Invalid mutation distribution: {e}");
                std::process::exit(1);
            }),
        }
    }
}

impl ChromosomeFactory<Inputs> for LadderOperators {
    fn create(&self, rng: &mut SearchRng) -> Inputs {
        Inputs(
            (0..self.inputs)
                .map(|_| rng.index(401) as i64 - 200)
                .collect(),
        )
    }
}

impl MutationOperator<Inputs> for LadderOperators {
    fn mutate(&self, genome: &mut Inputs, rng: &mut SearchRng) -> bool {
        let i = rng.index(genome.0.len());
        let delta = self.step.sample(rng.inner()).round() as i64;
        genome.0[i] += delta;
        delta != 0
    }
}

impl CrossoverOperator<Inputs> for LadderOperators {
    fn crossover(
        &self,
        a: &Inputs,
        b: &Inputs,
        rng: &mut SearchRng,
    ) -> Result<(Inputs, Inputs), CrossoverError> {
        if a.0.len() != b.0.len() || a.0.len() < 2 {
            return Err(CrossoverError(format!(
                "cannot cut inputs of length {} and {}",
                a.0.len(),
                b.0.len()
            )));
        }
        let cut = 1 + rng.index(a.0.len() - 1);
        let mut x = a.0[..cut].to_vec();
        x.extend_from_slice(&b.0[cut..]);
        let mut y = b.0[..cut].to_vec();
        y.extend_from_slice(&a.0[cut..]);
        Ok((Inputs(x), Inputs(y)))
    }
}

/// Branch distances of the simulated program.
struct Ladder {
    targets: Vec<i64>,
}

impl FitnessFunction<Inputs> for Ladder {
    type Trace = Vec<i64>;

    fn execute(&self, genome: &Inputs, _deadline: Instant) -> Execution<Self::Trace> {
        if genome.0.iter().any(|x| x.abs() > INPUT_LIMIT) {
            return Execution::Faulted("input out of range".to_string());
        }
        Execution::Completed(genome.0.clone())
    }

    fn distance(&self, goal: &Goal, trace: &Self::Trace) -> f64 {
        let Some((index, kind)) = goal.discriminator.split_once(':') else {
            return f64::MAX;
        };
        let Ok(i) = index.parse::<usize>() else {
            return f64::MAX;
        };
        let (Some(&x), Some(&target)) = (trace.get(i), self.targets.get(i)) else {
            return f64::MAX;
        };

        match kind {
            "eq" => (x - target).abs() as f64,
            "below" => (x - (target - 100) + 1).max(0) as f64,
            _ => f64::MAX,
        }
    }
}

/// `i:eq` requires `(i-1):eq`; `i:below` hangs off the same parent.
fn ladder_graph(inputs: usize) -> (GoalGraph, Vec<i64>) {
    let targets: Vec<i64> = (0..inputs).map(|i| (i as i64 * 73) % 300 - 150).collect();
    let mut graph = GoalGraph::new();
    let mut previous = None;
    for i in 0..inputs {
        let eq = graph.add_goal(Goal::new("ladder", format!("{i}:eq")));
        let below = graph.add_goal(Goal::new("ladder", format!("{i}:below")));
        if let Some(parent) = previous {
            graph.add_dependency(parent, eq);
            graph.add_dependency(parent, below);
        }
        previous = Some(eq);
    }
    (graph, targets)
}

fn main() {
    #[cfg(feature = "dhat-heap")]
    let _profiler = dhat::Profiler::new_heap();

    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <config.json> [inputs] [result.json]", args[0]);
        eprintln!();
        eprintln!("Run a coverage search on a synthetic branch ladder.");
        eprintln!();
        eprintln!("Arguments:");
        eprintln!("  config.json  Path to search configuration file");
        eprintln!("  inputs       Number of ladder inputs (default: 8)");
        eprintln!("  result.json  Where to write the search result");
        eprintln!();
        eprintln!("Example configuration is generated with --example flag.");
        std::process::exit(1);
    }

    if args[1] == "--example" {
        print_example_config();
        return;
    }

    let config = SearchConfig::from_json_file(&args[1]).unwrap_or_else(|e| {
        eprintln!("Error loading config: {e}");
        std::process::exit(1);
    });
    let inputs: usize = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(8);
    let output = args.get(3).map(PathBuf::from);

    let (graph, targets) = ladder_graph(inputs);

    println!("Evocover Search");
    println!("===============");
    println!("Strategy: {:?}", config.strategy);
    println!("Goals: {} ({} inputs)", graph.len(), inputs);
    println!("Selection: {:?}", config.selection);
    println!("Replacement: {:?}", config.replacement);
    println!();

    let mut engine = SearchEngine::<Inputs, _, _>::new(
        config,
        graph,
        LadderOperators::new(inputs),
        Ladder { targets },
    )
    .unwrap_or_else(|e| {
        eprintln!("Error creating search: {e}");
        std::process::exit(1);
    });

    let result = engine.run_with_callback(|progress| {
        println!(
            "  Generation {}: {}/{} covered ({} current), best={:.4}, archive={}, evals={}",
            progress.generation,
            progress.covered_goals,
            progress.covered_goals + progress.uncovered_goals,
            progress.current_goals,
            progress.best_fitness,
            progress.archive_size,
            progress.evaluations
        );
    });

    println!();
    println!("Stopped: {:?}", result.stats.stop_reason);
    println!(
        "Coverage: {:.1}% ({}/{})",
        result.coverage * 100.0,
        result.stats.covered_goals,
        result.stats.total_goals
    );
    println!(
        "Evaluations: {} ({} failed)",
        result.stats.total_evaluations, result.stats.failed_evaluations
    );
    println!("Solutions: {}", result.solutions.len());
    for solution in &result.solutions {
        println!(
            "  #{} (gen {}, size {}): {}",
            solution.id,
            solution.generation,
            solution.size,
            solution.goals.join(", ")
        );
    }
    if !result.uncovered.is_empty() {
        println!("Uncovered: {}", result.uncovered.join(", "));
    }
    println!("Time: {:.2}s", result.stats.elapsed_seconds);

    if let Some(path) = output {
        if let Err(e) = result.save_json(&path) {
            eprintln!("Error writing result: {e}");
            std::process::exit(1);
        }
        println!("Result written to {}", path.display());
    }
}

fn print_example_config() {
    let config = SearchConfig::default();
    match serde_json::to_string_pretty(&config) {
        Ok(json) => {
            println!("Example configuration (config.json):");
            println!("{json}");
        }
        Err(e) => eprintln!("Error serializing config: {e}"),
    }
}
