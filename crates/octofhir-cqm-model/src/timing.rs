//! Timing expressions for atomic components
//!
//! A timing expression anchors when a clinical event must occur relative to a
//! reference period ("colonoscopy within 10 years before end of Measurement
//! Period"). The operator/quantity/unit/position/reference fields are the
//! structured form; `display_expression` caches the rendered text.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default anchor used when a timing expression carries no explicit reference
pub const DEFAULT_REFERENCE: &str = "Measurement Period";

/// Temporal relationship between a clinical event and its reference period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TimingOperator {
    /// Event occurs during the reference period
    During,
    /// Event occurs before the reference period
    Before,
    /// Event occurs after the reference period
    After,
    /// Event interval overlaps the reference period
    Overlaps,
    /// Event occurs within a quantity of units of the reference
    Within,
    /// Event starts before the reference
    StartsBefore,
    /// Event starts after the reference
    StartsAfter,
    /// Event ends before the reference
    EndsBefore,
    /// Event ends after the reference
    EndsAfter,
}

impl TimingOperator {
    /// Canonical kebab-case token, stable across versions (part of the
    /// identity-key contract)
    pub fn as_str(&self) -> &'static str {
        match self {
            TimingOperator::During => "during",
            TimingOperator::Before => "before",
            TimingOperator::After => "after",
            TimingOperator::Overlaps => "overlaps",
            TimingOperator::Within => "within",
            TimingOperator::StartsBefore => "starts-before",
            TimingOperator::StartsAfter => "starts-after",
            TimingOperator::EndsBefore => "ends-before",
            TimingOperator::EndsAfter => "ends-after",
        }
    }
}

impl Default for TimingOperator {
    fn default() -> Self {
        TimingOperator::During
    }
}

impl fmt::Display for TimingOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimingOperator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "during" => Ok(TimingOperator::During),
            "before" => Ok(TimingOperator::Before),
            "after" => Ok(TimingOperator::After),
            "overlaps" => Ok(TimingOperator::Overlaps),
            "within" => Ok(TimingOperator::Within),
            "starts-before" => Ok(TimingOperator::StartsBefore),
            "starts-after" => Ok(TimingOperator::StartsAfter),
            "ends-before" => Ok(TimingOperator::EndsBefore),
            "ends-after" => Ok(TimingOperator::EndsAfter),
            other => Err(format!("unknown timing operator: {other}")),
        }
    }
}

/// Time unit for quantified timing expressions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimingUnit {
    Years,
    Months,
    Weeks,
    Days,
    Hours,
}

impl TimingUnit {
    /// Canonical lowercase token
    pub fn as_str(&self) -> &'static str {
        match self {
            TimingUnit::Years => "years",
            TimingUnit::Months => "months",
            TimingUnit::Weeks => "weeks",
            TimingUnit::Days => "days",
            TimingUnit::Hours => "hours",
        }
    }
}

impl fmt::Display for TimingUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A temporal constraint on an atomic component
///
/// `display_expression` is a cache maintained by authoring flows; callers
/// that need the text should go through [`TimingExpression::display`] which
/// falls back to rendering from the structured fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimingExpression {
    /// Temporal operator
    pub operator: TimingOperator,
    /// Quantity for "within N units" style expressions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<u32>,
    /// Unit accompanying the quantity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<TimingUnit>,
    /// Free-text qualifier, e.g. "before end of"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    /// Anchor, e.g. "Measurement Period"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    /// Cached human-readable rendering
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_expression: Option<String>,
}

impl TimingExpression {
    /// A bare timing expression with just an operator
    pub fn new(operator: TimingOperator) -> Self {
        Self {
            operator,
            quantity: None,
            unit: None,
            position: None,
            reference: None,
            display_expression: None,
        }
    }

    /// "during Measurement Period" - the most common timing
    pub fn during_measurement_period() -> Self {
        Self::new(TimingOperator::During).with_reference(DEFAULT_REFERENCE)
    }

    /// Set the quantity and unit
    pub fn with_quantity(mut self, quantity: u32, unit: TimingUnit) -> Self {
        self.quantity = Some(quantity);
        self.unit = Some(unit);
        self
    }

    /// Set the position qualifier
    pub fn with_position(mut self, position: impl Into<String>) -> Self {
        self.position = Some(position.into());
        self
    }

    /// Set the anchor reference
    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    /// Anchor reference, defaulting to "Measurement Period" when unset
    pub fn effective_reference(&self) -> &str {
        self.reference.as_deref().unwrap_or(DEFAULT_REFERENCE)
    }

    /// Whether a quantity or position qualifier adds an extra clause
    pub fn has_extra_clause(&self) -> bool {
        self.quantity.is_some() || self.position.is_some()
    }

    /// Render the human-readable text from the structured fields
    ///
    /// Examples: "during Measurement Period",
    /// "within 10 years before end of Measurement Period".
    pub fn render_display(&self) -> String {
        let mut parts: Vec<String> = vec![self.operator.as_str().to_string()];
        if let Some(quantity) = self.quantity {
            match self.unit {
                Some(unit) => parts.push(format!("{quantity} {unit}")),
                None => parts.push(quantity.to_string()),
            }
        }
        if let Some(position) = &self.position {
            parts.push(position.clone());
        }
        parts.push(self.effective_reference().to_string());
        parts.join(" ")
    }

    /// Cached display text when present, otherwise rendered on the fly
    pub fn display(&self) -> String {
        match &self.display_expression {
            Some(cached) => cached.clone(),
            None => self.render_display(),
        }
    }
}

impl fmt::Display for TimingExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}
