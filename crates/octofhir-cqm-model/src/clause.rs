//! Population criteria trees
//!
//! A measure's population criteria form a tree of [`LogicalClause`] nodes
//! whose leaves are [`DataElement`]s. The tree is stored as an arena keyed by
//! clause id with explicit parent/child id lists - no back-pointers - so that
//! recursive algorithms can guard against cycles with a visited set instead
//! of trusting the structure.

use crate::component::ValueSet;
use crate::timing::TimingExpression;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

pub use crate::component::CompositeOperator as ClauseOperator;

/// Review state of an extracted clause
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    Pending,
    Accepted,
    Rejected,
    Modified,
}

impl Default for ReviewStatus {
    fn default() -> Self {
        ReviewStatus::Pending
    }
}

/// Clinical category of a data element
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementType {
    /// Age, gender, and similar patient characteristics
    Demographic,
    Encounter,
    Condition,
    Procedure,
    Medication,
    Observation,
    Laboratory,
    Other(String),
}

impl ElementType {
    /// Demographic elements are excluded from value-set-based audits
    pub fn is_demographic(&self) -> bool {
        matches!(self, ElementType::Demographic)
    }
}

/// Leaf of a criteria tree: one clinical criterion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataElement {
    pub id: String,
    /// Criterion text as extracted or authored
    pub description: String,
    pub element_type: ElementType,
    /// Value sets backing this criterion
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub value_sets: Vec<ValueSet>,
    /// Whether the criterion asserts absence
    #[serde(default)]
    pub negation: bool,
    /// Timing overriding the linked component's own timing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timing_override: Option<TimingExpression>,
    /// Lookback window text, e.g. "24 months"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timing_window: Option<String>,
    /// Link to a library component, when one has been matched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component_id: Option<String>,
    #[serde(default)]
    pub display_order: u32,
}

impl DataElement {
    pub fn new(
        id: impl Into<String>,
        description: impl Into<String>,
        element_type: ElementType,
    ) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            element_type,
            value_sets: Vec::new(),
            negation: false,
            timing_override: None,
            timing_window: None,
            component_id: None,
            display_order: 0,
        }
    }

    /// Attach backing value sets
    pub fn with_value_sets(mut self, value_sets: Vec<ValueSet>) -> Self {
        self.value_sets = value_sets;
        self
    }

    /// Link to a library component
    pub fn with_component(mut self, component_id: impl Into<String>) -> Self {
        self.component_id = Some(component_id.into());
        self
    }

    /// Mark as negated
    pub fn negated(mut self) -> Self {
        self.negation = true;
        self
    }
}

/// One node of a population criteria tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogicalClause {
    pub id: String,
    pub operator: ClauseOperator,
    /// Owning parent; root clauses have none
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    /// Ordered sub-clauses
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub child_clause_ids: Vec<String>,
    /// Ordered leaves
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub data_elements: Vec<DataElement>,
    #[serde(default)]
    pub display_order: u32,
    /// Extraction confidence from the ingestion flow
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub review_status: ReviewStatus,
    /// Cached translation snippet, maintained by the code-generation layer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cql_snippet: Option<String>,
}

impl LogicalClause {
    pub fn new(id: impl Into<String>, operator: ClauseOperator) -> Self {
        Self {
            id: id.into(),
            operator,
            parent_id: None,
            child_clause_ids: Vec::new(),
            data_elements: Vec::new(),
            display_order: 0,
            confidence: None,
            review_status: ReviewStatus::default(),
            cql_snippet: None,
        }
    }

    /// Sub-clauses plus leaves; the count the AND penalty is based on
    pub fn child_count(&self) -> usize {
        self.child_clause_ids.len() + self.data_elements.len()
    }
}

/// Arena of clauses keyed by id
///
/// Parent/child consistency is the authoring layer's responsibility; the
/// engine's recursive walks verify acyclicity rather than assume it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClauseTree {
    clauses: IndexMap<String, LogicalClause>,
}

impl ClauseTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a clause
    pub fn insert(&mut self, clause: LogicalClause) {
        self.clauses.insert(clause.id.clone(), clause);
    }

    pub fn get(&self, id: &str) -> Option<&LogicalClause> {
        self.clauses.get(id)
    }

    /// Clauses without a parent, in insertion order
    pub fn roots(&self) -> impl Iterator<Item = &LogicalClause> {
        self.clauses.values().filter(|c| c.parent_id.is_none())
    }

    /// Resolved sub-clauses of a clause; ids missing from the arena are
    /// skipped
    pub fn children_of<'a>(
        &'a self,
        clause: &'a LogicalClause,
    ) -> impl Iterator<Item = &'a LogicalClause> {
        clause
            .child_clause_ids
            .iter()
            .filter_map(|id| self.clauses.get(id))
    }

    pub fn iter(&self) -> impl Iterator<Item = &LogicalClause> {
        self.clauses.values()
    }

    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }
}

/// Flattened measure element supplied by the import/linking collaborator for
/// usage audits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeasureElement {
    pub element_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub element_type: ElementType,
    /// OID of the element's value set; elements without one (demographics,
    /// pure age constraints) are excluded from audits
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_set_oid: Option<String>,
    /// Library link, when the element has been matched to a component
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component_id: Option<String>,
}

impl MeasureElement {
    pub fn new(element_id: impl Into<String>, element_type: ElementType) -> Self {
        Self {
            element_id: element_id.into(),
            description: None,
            element_type,
            value_set_oid: None,
            component_id: None,
        }
    }

    pub fn with_oid(mut self, oid: impl Into<String>) -> Self {
        self.value_set_oid = Some(oid.into());
        self
    }

    pub fn with_component(mut self, component_id: impl Into<String>) -> Self {
        self.component_id = Some(component_id.into());
        self
    }

    /// Whether the element carries an OID worth auditing
    pub fn has_meaningful_oid(&self) -> bool {
        !self.element_type.is_demographic()
            && self
                .value_set_oid
                .as_deref()
                .is_some_and(|oid| !oid.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_roots_and_children() {
        let mut tree = ClauseTree::new();
        let mut root = LogicalClause::new("root", ClauseOperator::And);
        root.child_clause_ids = vec!["child".to_string()];
        tree.insert(root);
        let mut child = LogicalClause::new("child", ClauseOperator::Or);
        child.parent_id = Some("root".to_string());
        tree.insert(child);

        let roots: Vec<_> = tree.roots().map(|c| c.id.as_str()).collect();
        assert_eq!(roots, vec!["root"]);

        let root = tree.get("root").unwrap();
        let children: Vec<_> = tree.children_of(root).map(|c| c.id.as_str()).collect();
        assert_eq!(children, vec!["child"]);
    }

    #[test]
    fn test_children_of_skips_missing_ids() {
        let mut tree = ClauseTree::new();
        let mut root = LogicalClause::new("root", ClauseOperator::And);
        root.child_clause_ids = vec!["ghost".to_string()];
        tree.insert(root);

        let root = tree.get("root").unwrap();
        assert_eq!(tree.children_of(root).count(), 0);
    }

    #[test]
    fn test_meaningful_oid() {
        let demographic = MeasureElement::new("e1", ElementType::Demographic).with_oid("1.2.3");
        assert!(!demographic.has_meaningful_oid());

        let no_oid = MeasureElement::new("e2", ElementType::Condition);
        assert!(!no_oid.has_meaningful_oid());

        let blank_oid = MeasureElement::new("e3", ElementType::Condition).with_oid("  ");
        assert!(!blank_oid.has_meaningful_oid());

        let ok = MeasureElement::new("e4", ElementType::Condition).with_oid("1.2.3");
        assert!(ok.has_meaningful_oid());
    }

    #[test]
    fn test_child_count_includes_leaves() {
        let mut clause = LogicalClause::new("c", ClauseOperator::And);
        clause.child_clause_ids = vec!["a".to_string()];
        clause.data_elements = vec![
            DataElement::new("e1", "Office visit", ElementType::Encounter),
            DataElement::new("e2", "Colonoscopy", ElementType::Procedure),
        ];
        assert_eq!(clause.child_count(), 3);
    }
}
