//! Benchmarks for Pareto ranking.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use rand::prelude::*;

use evocover::search::{
    Candidate, Genome, Goal, GoalGraph, GoalId, crowding_distance_assignment,
    fast_non_dominated_sort, preference_sort,
};

#[derive(Clone)]
struct Fixed(usize);

impl Genome for Fixed {
    fn size(&self) -> usize {
        self.0
    }
}

fn population(size: usize, goals: usize, seed: u64) -> (GoalGraph, Vec<GoalId>, Vec<Candidate<Fixed>>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut graph = GoalGraph::new();
    let objectives: Vec<_> = (0..goals)
        .map(|i| graph.add_goal(Goal::new("bench", i.to_string())))
        .collect();

    let population = (0..size)
        .map(|i| {
            let mut c = Candidate::new(i as u64, Fixed(rng.gen_range(1..20)), 0, Vec::new());
            for &g in &objectives {
                c.fitness.insert(g, rng.gen_range(0.0..10.0));
            }
            c
        })
        .collect();
    (graph, objectives, population)
}

fn bench_non_dominated_sort(c: &mut Criterion) {
    let mut group = c.benchmark_group("non_dominated_sort");

    for size in [50, 100, 200, 400] {
        let (graph, objectives, mut pop) = population(size, 10, 42);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| fast_non_dominated_sort(black_box(&mut pop), &graph, &objectives));
        });
    }

    group.finish();
}

fn bench_preference_sort(c: &mut Criterion) {
    let mut group = c.benchmark_group("preference_sort");

    for goals in [10, 50, 200] {
        let (graph, objectives, mut pop) = population(100, goals, 7);
        group.bench_with_input(BenchmarkId::from_parameter(goals), &goals, |b, _| {
            b.iter(|| preference_sort(black_box(&mut pop), &graph, &objectives));
        });
    }

    group.finish();
}

fn bench_crowding(c: &mut Criterion) {
    let (graph, objectives, mut pop) = population(400, 20, 3);
    let front: Vec<usize> = (0..pop.len()).collect();

    c.bench_function("crowding_distance_400x20", |b| {
        b.iter(|| crowding_distance_assignment(black_box(&mut pop), &front, &graph, &objectives));
    });
}

criterion_group!(benches, bench_non_dominated_sort, bench_preference_sort, bench_crowding);
criterion_main!(benches);
