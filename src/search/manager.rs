//! Dynamic goal partition and per-goal archive.
//!
//! The manager owns the only long-lived search state: which goals are
//! covered, which are still open, which of the open ones drive fitness right
//! now, and the best candidate found for every covered goal.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::time::{Duration, Instant};

use crate::schema::ReplacementPolicy;

use super::candidate::{Candidate, Genome};
use super::goal::{GoalGraph, GoalId};
use super::operators::{Execution, FitnessFunction};

/// Broken partition or archive invariant. Always a programming error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvariantViolation {
    #[error("Goal {0} is current but not uncovered")]
    CurrentNotUncovered(GoalId),
    #[error("Goal {0} is both covered and uncovered")]
    CoveredAndUncovered(GoalId),
    #[error("Goal {0} is neither covered nor uncovered")]
    Unaccounted(GoalId),
    #[error("Goal {0} points at an archive entry that does not list it")]
    ArchiveMismatch(GoalId),
    #[error("Archive entry {0} covers no goal")]
    EmptyEntry(u64),
}

struct ArchiveEntry<G> {
    candidate: Candidate<G>,
    goals: BTreeSet<GoalId>,
}

/// Bidirectional goal ↔ candidate map. Both halves change together.
struct Archive<G> {
    by_goal: BTreeMap<GoalId, u64>,
    entries: BTreeMap<u64, ArchiveEntry<G>>,
}

impl<G: Genome> Archive<G> {
    fn new() -> Self {
        Self {
            by_goal: BTreeMap::new(),
            entries: BTreeMap::new(),
        }
    }

    fn holder(&self, goal: GoalId) -> Option<&Candidate<G>> {
        self.by_goal
            .get(&goal)
            .and_then(|id| self.entries.get(id))
            .map(|e| &e.candidate)
    }

    /// Make `candidate` the archived solution for `goal`, detaching any
    /// previous holder.
    fn assign(&mut self, goal: GoalId, candidate: &Candidate<G>) {
        if let Some(previous) = self.by_goal.insert(goal, candidate.id)
            && previous != candidate.id
            && let Some(entry) = self.entries.get_mut(&previous)
        {
            entry.goals.remove(&goal);
            if entry.goals.is_empty() {
                self.entries.remove(&previous);
                log::trace!("Archive dropped candidate {previous}");
            }
        }

        let entry = self
            .entries
            .entry(candidate.id)
            .or_insert_with(|| ArchiveEntry {
                candidate: candidate.clone(),
                goals: BTreeSet::new(),
            });
        entry.candidate.fitness.insert(goal, 0.0);
        entry.goals.insert(goal);
    }
}

/// Tracks covered/uncovered/current goals and the best candidate per goal.
pub struct GoalManager<G> {
    graph: GoalGraph,
    /// Parents that must be covered before a goal is targeted.
    required_parents: Vec<Vec<GoalId>>,
    /// Inverse of `required_parents`: goals waiting on each goal.
    dependents: Vec<Vec<GoalId>>,
    policy: ReplacementPolicy,
    uncovered: BTreeSet<GoalId>,
    current: BTreeSet<GoalId>,
    archive: Archive<G>,
    epoch: u64,
}

impl<G: Genome> GoalManager<G> {
    /// Partition all goals as uncovered and target the roots.
    pub fn new(graph: GoalGraph, policy: ReplacementPolicy) -> Self {
        let required_parents = required_parents(&graph);
        let mut dependents = vec![Vec::new(); graph.len()];
        for id in graph.ids() {
            for parent in &required_parents[id.index()] {
                dependents[parent.index()].push(id);
            }
        }

        let uncovered: BTreeSet<GoalId> = graph.ids().collect();
        let current: BTreeSet<GoalId> = graph
            .ids()
            .filter(|id| required_parents[id.index()].is_empty())
            .collect();

        log::debug!(
            "Goal manager initialized: {} goals, {} targeted",
            graph.len(),
            current.len()
        );

        Self {
            graph,
            required_parents,
            dependents,
            policy,
            uncovered,
            current,
            archive: Archive::new(),
            epoch: 0,
        }
    }

    pub fn graph(&self) -> &GoalGraph {
        &self.graph
    }

    /// Increments whenever the set of current goals changes.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Goals driving fitness this generation, in id order.
    pub fn current_goals(&self) -> Vec<GoalId> {
        self.current.iter().copied().collect()
    }

    /// All goals not covered yet: current ones first, then the rest.
    pub fn remaining_goals(&self) -> Vec<GoalId> {
        self.current
            .iter()
            .chain(self.uncovered.difference(&self.current))
            .copied()
            .collect()
    }

    pub fn is_covered(&self, goal: GoalId) -> bool {
        self.archive.by_goal.contains_key(&goal)
    }

    /// Covered goals with their archived candidate.
    pub fn covered_goals(&self) -> impl Iterator<Item = (GoalId, &Candidate<G>)> {
        self.archive.by_goal.keys().filter_map(|&goal| {
            self.archive.holder(goal).map(|candidate| (goal, candidate))
        })
    }

    /// Archived candidate for a goal, if covered.
    pub fn best_for(&self, goal: GoalId) -> Option<&Candidate<G>> {
        self.archive.holder(goal)
    }

    /// Distinct archived candidates and the goals each one is best for.
    pub fn archived_solutions(&self) -> impl Iterator<Item = (&Candidate<G>, &BTreeSet<GoalId>)> {
        self.archive
            .entries
            .values()
            .map(|e| (&e.candidate, &e.goals))
    }

    pub fn archive_len(&self) -> usize {
        self.archive.entries.len()
    }

    pub fn num_covered(&self) -> usize {
        self.archive.by_goal.len()
    }

    pub fn num_uncovered(&self) -> usize {
        self.uncovered.len()
    }

    pub fn num_current(&self) -> usize {
        self.current.len()
    }

    pub fn total_goals(&self) -> usize {
        self.graph.len()
    }

    /// Covered fraction of the goal universe (1.0 for an empty universe).
    pub fn coverage(&self) -> f64 {
        if self.graph.is_empty() {
            1.0
        } else {
            self.num_covered() as f64 / self.graph.len() as f64
        }
    }

    /// Execute `candidate` and record its fitness for every current goal.
    ///
    /// Goals that are already covered are also checked so the archive can
    /// consider the candidate as a replacement; those results go to
    /// `candidate.reached` and never into the fitness map. A timeout or
    /// fault assigns the worst fitness to every current goal.
    ///
    /// Returns `false` if the execution failed.
    pub fn evaluate<F>(&self, candidate: &mut Candidate<G>, fitness: &F, timeout: Duration) -> bool
    where
        F: FitnessFunction<G>,
    {
        candidate.fitness.clear();
        candidate.reached.clear();
        candidate.quality_indicators.clear();
        candidate.changed = false;
        candidate.evaluated_epoch = Some(self.epoch);

        let started = Instant::now();
        let deadline = started + timeout;
        let execution = fitness.execute(&candidate.genome, deadline);
        let execution = match execution {
            Execution::Completed(_) if started.elapsed() > timeout => Execution::TimedOut,
            other => other,
        };

        let trace = match execution {
            Execution::Completed(trace) => trace,
            Execution::TimedOut => {
                log::debug!("Candidate {} timed out", candidate.id);
                self.assign_worst(candidate);
                return false;
            }
            Execution::Faulted(reason) => {
                log::debug!("Candidate {} faulted: {reason}", candidate.id);
                self.assign_worst(candidate);
                return false;
            }
        };

        candidate.faulted = false;
        let mut aggregate = 0.0;
        for &id in &self.current {
            let goal = self.graph.goal(id);
            let mut value = fitness.distance(goal, &trace);
            if value.is_nan() {
                value = goal.worst();
            }
            aggregate += goal.normalize(value);
            candidate.fitness.insert(id, value);
        }
        candidate.aggregate = aggregate;

        for &id in self.archive.by_goal.keys() {
            let goal = self.graph.goal(id);
            if goal.is_covered_by(fitness.distance(goal, &trace)) {
                candidate.reached.insert(id);
            }
        }

        candidate.quality_indicators = fitness.indicators(&candidate.genome, &trace);
        true
    }

    fn assign_worst(&self, candidate: &mut Candidate<G>) {
        candidate.faulted = true;
        candidate.aggregate = f64::INFINITY;
        for &id in &self.current {
            candidate.fitness.insert(id, self.graph.goal(id).worst());
        }
    }

    /// Move every goal the candidate covers into the archive and open up the
    /// children that became reachable. Returns the newly covered goals.
    pub fn absorb_newly_covered(&mut self, candidate: &Candidate<G>) -> Vec<GoalId> {
        if candidate.faulted || candidate.evaluated_epoch.is_none() {
            return Vec::new();
        }

        let hits: BTreeSet<GoalId> = candidate
            .fitness
            .iter()
            .filter(|&(&id, &value)| self.graph.goal(id).is_covered_by(value))
            .map(|(&id, _)| id)
            .chain(candidate.reached.iter().copied())
            .collect();

        let mut newly_covered = Vec::new();
        for goal in hits {
            if self.uncovered.remove(&goal) {
                self.current.remove(&goal);
                newly_covered.push(goal);
            }
            self.archive_update(goal, candidate);
        }

        let mut opened = false;
        for &goal in &newly_covered {
            for &child in &self.dependents[goal.index()] {
                if self.uncovered.contains(&child)
                    && !self.current.contains(&child)
                    && self.required_parents[child.index()]
                        .iter()
                        .all(|p| self.archive.by_goal.contains_key(p))
                {
                    self.current.insert(child);
                    opened = true;
                }
            }
        }

        if !newly_covered.is_empty() || opened {
            self.epoch += 1;
            log::debug!(
                "Candidate {} covered {} goals; {} current, {} uncovered",
                candidate.id,
                newly_covered.len(),
                self.current.len(),
                self.uncovered.len()
            );
        }

        debug_assert_eq!(self.check_invariants(), Ok(()));
        newly_covered
    }

    /// Absorb a whole evaluated generation in index order.
    pub fn absorb_generation(&mut self, candidates: &[Candidate<G>]) -> usize {
        candidates
            .iter()
            .map(|c| self.absorb_newly_covered(c).len())
            .sum()
    }

    /// Offer `candidate` as the archived solution for a goal it covers.
    ///
    /// Returns `true` if the archive changed.
    pub fn archive_update(&mut self, goal: GoalId, candidate: &Candidate<G>) -> bool {
        let accept = match self.archive.holder(goal) {
            None => true,
            Some(archived) if archived.id == candidate.id => false,
            Some(archived) => self.policy.is_better(archived, candidate),
        };
        if accept {
            self.archive.assign(goal, candidate);
        }
        accept
    }

    /// Check the partition and archive invariants.
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        for &goal in &self.current {
            if !self.uncovered.contains(&goal) {
                return Err(InvariantViolation::CurrentNotUncovered(goal));
            }
        }
        for goal in self.graph.ids() {
            let covered = self.archive.by_goal.contains_key(&goal);
            let uncovered = self.uncovered.contains(&goal);
            match (covered, uncovered) {
                (true, true) => return Err(InvariantViolation::CoveredAndUncovered(goal)),
                (false, false) => return Err(InvariantViolation::Unaccounted(goal)),
                _ => {}
            }
        }
        for (&goal, id) in &self.archive.by_goal {
            let listed = self
                .archive
                .entries
                .get(id)
                .is_some_and(|e| e.goals.contains(&goal));
            if !listed {
                return Err(InvariantViolation::ArchiveMismatch(goal));
            }
        }
        for (&id, entry) in &self.archive.entries {
            if entry.goals.is_empty() {
                return Err(InvariantViolation::EmptyEntry(id));
            }
            for goal in &entry.goals {
                if self.archive.by_goal.get(goal) != Some(&id) {
                    return Err(InvariantViolation::ArchiveMismatch(*goal));
                }
            }
        }
        Ok(())
    }
}

/// Parents that must be covered before each goal is targeted.
///
/// A goal outside any cycle needs all of its parents. Members of a cycle
/// first wait for every parent the cycle has outside itself. Inside the
/// cycle they open in breadth-first order from the members entered from
/// outside (the lowest id when there is none), ignoring only the links that
/// lead back to an earlier member.
fn required_parents(graph: &GoalGraph) -> Vec<Vec<GoalId>> {
    let component = graph.components();
    let count = component.iter().map(|&c| c + 1).max().unwrap_or(0);
    let mut members: Vec<Vec<GoalId>> = vec![Vec::new(); count];
    for id in graph.ids() {
        members[component[id.index()]].push(id);
    }

    let mut external: Vec<BTreeSet<GoalId>> = vec![BTreeSet::new(); count];
    let mut depth = vec![0usize; graph.len()];
    for (c, group) in members.iter().enumerate() {
        let mut entries = Vec::new();
        for &id in group {
            let outside: Vec<GoalId> = graph
                .parents(id)
                .iter()
                .copied()
                .filter(|p| component[p.index()] != c)
                .collect();
            if !outside.is_empty() {
                entries.push(id);
            }
            external[c].extend(outside);
        }
        if group.len() < 2 {
            continue;
        }
        if entries.is_empty() {
            entries.push(group[0]);
        }

        let mut seen: BTreeSet<GoalId> = entries.iter().copied().collect();
        let mut queue: VecDeque<GoalId> = entries.into_iter().collect();
        while let Some(id) = queue.pop_front() {
            for &child in graph.children(id) {
                if component[child.index()] == c && seen.insert(child) {
                    depth[child.index()] = depth[id.index()] + 1;
                    queue.push_back(child);
                }
            }
        }
    }

    graph
        .ids()
        .map(|id| {
            let c = component[id.index()];
            let mut required = external[c].clone();
            required.extend(graph.parents(id).iter().copied().filter(|p| {
                component[p.index()] == c && depth[p.index()] < depth[id.index()]
            }));
            required.into_iter().collect()
        })
        .collect()
}
