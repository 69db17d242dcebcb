//! Complexity score types
//!
//! A complexity score is a non-negative integer plus a LOW/MEDIUM/HIGH level
//! derived from fixed thresholds. The structured factor breakdown must
//! reproduce the score exactly, which [`ComponentComplexity::from_factors`]
//! enforces by construction.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Score an atomic must reach when its value set has no cached codes,
/// forcing at least MEDIUM so the component is flagged for review
pub const ZERO_CODES_FLOOR: u32 = 4;

/// Coarse complexity band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ComplexityLevel {
    Low,
    Medium,
    High,
}

impl ComplexityLevel {
    /// Fixed threshold mapping: 0-3 LOW, 4-7 MEDIUM, 8+ HIGH
    pub fn for_score(score: u32) -> Self {
        match score {
            0..=3 => ComplexityLevel::Low,
            4..=7 => ComplexityLevel::Medium,
            _ => ComplexityLevel::High,
        }
    }
}

impl fmt::Display for ComplexityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ComplexityLevel::Low => "LOW",
            ComplexityLevel::Medium => "MEDIUM",
            ComplexityLevel::High => "HIGH",
        };
        f.write_str(s)
    }
}

/// Structured breakdown of a complexity score
///
/// Atomic components populate `base`/`timing_clauses`/`negations`/`zero_codes`;
/// composites and clauses populate `children_sum`/`and_operators`/
/// `nesting_depth`. The recompute in [`ComplexityFactors::score`] is the union
/// of both rules, so a single formula covers every producer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplexityFactors {
    /// Base cost of an atomic criterion
    #[serde(default)]
    pub base: u32,
    /// 1 for bare timing, 2 when a quantity or position qualifier is present
    #[serde(default)]
    pub timing_clauses: u32,
    /// Negation penalty (2 per negation)
    #[serde(default)]
    pub negations: u32,
    /// Sum of resolved children's scores
    #[serde(default)]
    pub children_sum: u32,
    /// AND penalty: child count minus one when combined with AND
    #[serde(default)]
    pub and_operators: u32,
    /// 2 x deepest composite-child nesting
    #[serde(default)]
    pub nesting_depth: u32,
    /// Primary value set had no cached codes; score floored at 4
    #[serde(default)]
    pub zero_codes: bool,
}

impl ComplexityFactors {
    /// Recompute the total: `max(base + timing + negations, zero-code floor)
    /// + children_sum + and_operators + nesting_depth`
    pub fn score(&self) -> u32 {
        let own = self.base + self.timing_clauses + self.negations;
        let own = if self.zero_codes {
            own.max(ZERO_CODES_FLOOR)
        } else {
            own
        };
        own + self.children_sum + self.and_operators + self.nesting_depth
    }
}

/// A cached complexity result: level, score, and the factors behind it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentComplexity {
    pub level: ComplexityLevel,
    pub score: u32,
    pub factors: ComplexityFactors,
}

impl ComponentComplexity {
    /// Build from factors, deriving score and level so the `level = f(score)`
    /// and `factors reproduce score` invariants hold by construction
    pub fn from_factors(factors: ComplexityFactors) -> Self {
        let score = factors.score();
        Self {
            level: ComplexityLevel::for_score(score),
            score,
            factors,
        }
    }
}
