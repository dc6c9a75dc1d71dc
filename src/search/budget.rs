//! Built-in stopping condition backed by the configured budget.

use crate::schema::{BudgetConfig, StopReason};

use super::operators::{EngineState, StoppingCondition};

impl BudgetConfig {
    /// The first exhausted limit, if any.
    pub fn exhausted(&self, state: &EngineState) -> Option<StopReason> {
        if let Some(limit) = self.max_generations
            && state.generation >= limit
        {
            return Some(StopReason::MaxGenerations);
        }

        if let Some(limit) = self.max_evaluations
            && state.evaluations >= limit
        {
            return Some(StopReason::MaxEvaluations);
        }

        if let Some(limit) = self.time_budget_ms
            && state.elapsed.as_millis() >= u128::from(limit)
        {
            return Some(StopReason::TimeBudget);
        }

        None
    }
}

impl StoppingCondition for BudgetConfig {
    fn is_finished(&self, state: &EngineState) -> bool {
        self.exhausted(state).is_some()
    }
}
