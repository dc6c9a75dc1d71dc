//! Archive replacement policies.
//!
//! A policy compares the candidate currently archived for a goal with a new
//! candidate that also covers it, and decides whether the newcomer takes the
//! slot. The indicator policies normalize pairwise rather than against the
//! whole population, since goals are archived one at a time across
//! generations.

use std::collections::BTreeMap;

use crate::schema::ReplacementPolicy;

use super::candidate::{Candidate, Genome};

impl ReplacementPolicy {
    /// Returns `true` if `candidate` should replace `archived`.
    pub fn is_better<G: Genome>(&self, archived: &Candidate<G>, candidate: &Candidate<G>) -> bool {
        let scores = match self {
            Self::Size => None,
            Self::MinMaxIndicators => Some(min_max_scores(
                &archived.quality_indicators,
                &candidate.quality_indicators,
            )),
            Self::MonotoneIndicators => Some((
                monotone_score(&archived.quality_indicators),
                monotone_score(&candidate.quality_indicators),
            )),
        };

        match scores {
            Some((archived_score, candidate_score)) if archived_score != candidate_score => {
                candidate_score < archived_score
            }
            _ => candidate.size() <= archived.size(),
        }
    }
}

/// Sum of min-max normalized indicators for both candidates.
///
/// Indicators missing from either side, or equal on both, contribute 0.
fn min_max_scores(archived: &BTreeMap<String, f64>, candidate: &BTreeMap<String, f64>) -> (f64, f64) {
    let mut archived_sum = 0.0;
    let mut candidate_sum = 0.0;

    for (name, &a) in archived {
        let Some(&c) = candidate.get(name) else {
            continue;
        };
        let min = a.min(c);
        let max = a.max(c);
        if min == max {
            continue;
        }
        let range = max - min;
        archived_sum += (a - min) / range;
        candidate_sum += (c - min) / range;
    }

    (archived_sum, candidate_sum)
}

/// Sum of `x / (x + 1)` over all indicators.
fn monotone_score(indicators: &BTreeMap<String, f64>) -> f64 {
    indicators.values().map(|x| x / (x + 1.0)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::candidate::test_support::Ints;

    fn with_indicators(id: u64, size: usize, indicators: &[(&str, f64)]) -> Candidate<Ints> {
        let mut c = Candidate::new(id, Ints(vec![0; size]), 0, Vec::new());
        c.quality_indicators = indicators
            .iter()
            .map(|(k, v)| (k.to_string(), *v))
            .collect();
        c
    }

    #[test]
    fn test_size_prefers_smaller() {
        let archived = with_indicators(1, 5, &[]);
        let small = with_indicators(2, 3, &[]);
        let large = with_indicators(3, 8, &[]);
        assert!(ReplacementPolicy::Size.is_better(&archived, &small));
        assert!(!ReplacementPolicy::Size.is_better(&archived, &large));
    }

    #[test]
    fn test_size_tie_goes_to_newcomer() {
        let archived = with_indicators(1, 4, &[]);
        let same = with_indicators(2, 4, &[]);
        assert!(ReplacementPolicy::Size.is_better(&archived, &same));
    }

    #[test]
    fn test_monotone_scenario() {
        let archived = with_indicators(1, 1, &[("x", 1.0)]);
        let candidate = with_indicators(2, 9, &[("x", 0.5)]);
        assert!((monotone_score(&archived.quality_indicators) - 0.5).abs() < 1e-12);
        assert!((monotone_score(&candidate.quality_indicators) - 1.0 / 3.0).abs() < 1e-12);
        assert!(ReplacementPolicy::MonotoneIndicators.is_better(&archived, &candidate));
        assert!(!ReplacementPolicy::MonotoneIndicators.is_better(&candidate, &archived));
    }

    #[test]
    fn test_min_max_normalizes_pairwise() {
        // Candidate is better on "time" by a lot and worse on "memory" by a
        // little; pairwise normalization weighs both indicators equally.
        let archived = with_indicators(1, 1, &[("time", 100.0), ("memory", 10.0), ("calls", 3.0)]);
        let candidate = with_indicators(2, 1, &[("time", 1.0), ("memory", 11.0), ("calls", 3.0)]);
        let (a, c) = min_max_scores(&archived.quality_indicators, &candidate.quality_indicators);
        assert_eq!(a, 1.0);
        assert_eq!(c, 1.0);
        // Equal sums fall back to size, and sizes are equal.
        assert!(ReplacementPolicy::MinMaxIndicators.is_better(&archived, &candidate));

        let dominated = with_indicators(3, 1, &[("time", 200.0), ("memory", 12.0), ("calls", 3.0)]);
        assert!(!ReplacementPolicy::MinMaxIndicators.is_better(&archived, &dominated));
    }

    #[test]
    fn test_indicator_policies_without_indicators_use_size() {
        let archived = with_indicators(1, 2, &[]);
        let larger = with_indicators(2, 3, &[]);
        assert!(!ReplacementPolicy::MonotoneIndicators.is_better(&archived, &larger));
        assert!(!ReplacementPolicy::MinMaxIndicators.is_better(&archived, &larger));
    }
}
