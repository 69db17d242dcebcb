//! Clinical quality measure component library engine
//!
//! This crate ties together:
//! - The component/criteria data model (`octofhir-cqm-model`)
//! - The canonicalization, matching, and complexity-scoring engine
//!   (`octofhir-cqm-engine`)
//!
//! # Example
//!
//! ```
//! use octofhir_cqm::{
//!     find_match_prioritizing_approved, AtomicComponent, LibraryComponent, LibrarySnapshot,
//!     ParsedAtomic, ParsedComponent, ResourceType, TimingExpression, ValueSet,
//! };
//!
//! let library = LibraryComponent::new_atomic(
//!     "comp-1",
//!     "Colonoscopy",
//!     AtomicComponent {
//!         value_set: ValueSet::new("2.16.840.1.113883.3.464.1003.108.12.1020", "Colonoscopy"),
//!         additional_value_sets: Vec::new(),
//!         timing: Some(TimingExpression::during_measurement_period()),
//!         negation: false,
//!         resource_type: ResourceType::Procedure,
//!         gender_value: None,
//!     },
//! );
//! let snapshot = LibrarySnapshot::from_components([library]);
//!
//! let candidate = ParsedComponent::Atomic(ParsedAtomic {
//!     name: "Colonoscopy".to_string(),
//!     value_set_oid: Some("2.16.840.1.113883.3.464.1003.108.12.1020".to_string()),
//!     value_set_name: "Colonoscopy".to_string(),
//!     timing: Some(TimingExpression::during_measurement_period()),
//!     negation: false,
//!     resource_type: ResourceType::Procedure,
//!     gender_value: None,
//! });
//! let outcome = find_match_prioritizing_approved(&candidate, &snapshot);
//! assert_eq!(outcome.component_id.as_deref(), Some("comp-1"));
//! ```

// Re-export all public APIs from internal crates
pub use octofhir_cqm_engine as engine;
pub use octofhir_cqm_model as model;

// Convenience re-exports
pub use octofhir_cqm_engine::{
    EngineError, EngineResult, FieldDiff, LibrarySnapshot, MatchOutcome, SimilarityMatch,
    UsageReport, UsageWarning, UsageWarningKind, component_hash, diff_components,
    find_exact_match, find_match_prioritizing_approved, find_similar, find_similar_default,
    parsed_hash, score_clause_tree, score_component, validate_usage,
};
pub use octofhir_cqm_model::{
    ApprovalStatus, AtomicComponent, ClauseTree, Code, ComplexityFactors, ComplexityLevel,
    ComponentComplexity, ComponentKind, ComponentReference, CompositeComponent, CompositeOperator,
    DataElement, ElementType, LibraryComponent, LogicalClause, MeasureElement, ParsedAtomic,
    ParsedComponent, ParsedComposite, ResourceType, TimingExpression, TimingOperator, TimingUnit,
    ValueSet,
};
