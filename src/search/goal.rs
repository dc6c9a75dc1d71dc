//! Coverage goals and their structural dependency graph.
//!
//! Goals are stored in an arena and referenced by [`GoalId`]. Children and
//! parents are plain id lists, so cycles and shared children need no special
//! handling.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Index of a goal inside its [`GoalGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GoalId(pub u32);

impl GoalId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for GoalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A single coverage objective.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Goal {
    /// Where the goal lives (class, module, function ...).
    pub scope: String,
    /// What distinguishes it inside the scope (branch id, line, mutant ...).
    pub discriminator: String,
    /// Whether lower fitness values are better.
    pub minimize: bool,
}

impl Goal {
    /// A minimization goal, the usual case for coverage distances.
    pub fn new(scope: impl Into<String>, discriminator: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            discriminator: discriminator.into(),
            minimize: true,
        }
    }

    /// A goal whose fitness should be maximized.
    pub fn maximize(scope: impl Into<String>, discriminator: impl Into<String>) -> Self {
        Self {
            minimize: false,
            ..Self::new(scope, discriminator)
        }
    }

    /// Worst possible fitness value for this goal's direction.
    #[inline]
    pub fn worst(&self) -> f64 {
        if self.minimize { f64::MAX } else { 0.0 }
    }

    /// Whether `value` marks the goal as satisfied.
    ///
    /// Only minimized goals can be covered: a distance of exactly zero.
    #[inline]
    pub fn is_covered_by(&self, value: f64) -> bool {
        self.minimize && value == 0.0
    }

    /// `true` if `a` is strictly better than `b` for this goal.
    #[inline]
    pub fn better(&self, a: f64, b: f64) -> bool {
        if self.minimize { a < b } else { a > b }
    }

    /// Map a raw value into `[0, 1]`, 0 being best. Negative values count as 0.
    #[inline]
    pub fn normalize(&self, value: f64) -> f64 {
        let value = value.max(0.0);
        if self.minimize {
            if value >= f64::MAX {
                1.0
            } else {
                value / (value + 1.0)
            }
        } else {
            1.0 / (1.0 + value)
        }
    }
}

impl fmt::Display for Goal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.scope, self.discriminator)
    }
}

/// Arena of goals plus their structural parent/child relation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GoalGraph {
    goals: Vec<Goal>,
    children: Vec<Vec<GoalId>>,
    parents: Vec<Vec<GoalId>>,
}

impl GoalGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a goal and return its id.
    pub fn add_goal(&mut self, goal: Goal) -> GoalId {
        let id = GoalId(self.goals.len() as u32);
        self.goals.push(goal);
        self.children.push(Vec::new());
        self.parents.push(Vec::new());
        id
    }

    /// Declare `child` reachable once `parent` (and its other parents) are covered.
    ///
    /// Self-loops and duplicate edges are ignored. Panics if either id is
    /// not part of this graph.
    pub fn add_dependency(&mut self, parent: GoalId, child: GoalId) {
        assert!(
            parent.index() < self.goals.len() && child.index() < self.goals.len(),
            "dependency {parent} -> {child} references an unknown goal"
        );
        if parent == child || self.children[parent.index()].contains(&child) {
            return;
        }
        self.children[parent.index()].push(child);
        self.parents[child.index()].push(parent);
    }

    pub fn len(&self) -> usize {
        self.goals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.goals.is_empty()
    }

    /// Get a goal by id.
    pub fn goal(&self, id: GoalId) -> &Goal {
        &self.goals[id.index()]
    }

    /// All goal ids in insertion order.
    pub fn ids(&self) -> impl Iterator<Item = GoalId> + '_ {
        (0..self.goals.len() as u32).map(GoalId)
    }

    /// Structural children of a goal.
    pub fn children(&self, id: GoalId) -> &[GoalId] {
        &self.children[id.index()]
    }

    /// Structural parents of a goal.
    pub fn parents(&self, id: GoalId) -> &[GoalId] {
        &self.parents[id.index()]
    }

    /// Goals with no structural parent; targeted from the first generation.
    pub fn roots(&self) -> impl Iterator<Item = GoalId> + '_ {
        self.ids().filter(|id| self.parents[id.index()].is_empty())
    }

    /// Look a goal up by its identity.
    pub fn find(&self, scope: &str, discriminator: &str) -> Option<GoalId> {
        self.goals
            .iter()
            .position(|g| g.scope == scope && g.discriminator == discriminator)
            .map(|i| GoalId(i as u32))
    }

    /// Strongly connected component index of every goal.
    ///
    /// Two goals share a component iff each is reachable from the other.
    /// Iterative Kosaraju, so deep dependency chains do not overflow the stack.
    pub fn components(&self) -> Vec<usize> {
        let n = self.goals.len();

        // Pass 1: finish order on the child relation.
        let mut visited = vec![false; n];
        let mut order = Vec::with_capacity(n);
        for start in 0..n {
            if visited[start] {
                continue;
            }
            visited[start] = true;
            let mut stack = vec![(start, 0usize)];
            while let Some((node, next)) = stack.pop() {
                if let Some(&child) = self.children[node].get(next) {
                    stack.push((node, next + 1));
                    if !visited[child.index()] {
                        visited[child.index()] = true;
                        stack.push((child.index(), 0));
                    }
                } else {
                    order.push(node);
                }
            }
        }

        // Pass 2: sweep the parent relation in reverse finish order.
        let mut component = vec![usize::MAX; n];
        let mut count = 0;
        for &start in order.iter().rev() {
            if component[start] != usize::MAX {
                continue;
            }
            component[start] = count;
            let mut stack = vec![start];
            while let Some(node) = stack.pop() {
                for parent in &self.parents[node] {
                    if component[parent.index()] == usize::MAX {
                        component[parent.index()] = count;
                        stack.push(parent.index());
                    }
                }
            }
            count += 1;
        }

        component
    }
}
