//! Data model for clinical quality measure authoring
//!
//! This crate defines the shapes the canonicalization/matching engine
//! operates on:
//! - Library components (atomic and composite) with approval lifecycle,
//!   version bookkeeping, and cached complexity
//! - Timing expressions
//! - Parsed candidate components from document ingestion
//! - Population criteria trees (`LogicalClause` arenas) and flattened
//!   measure elements
//! - A defensive serde boundary for JSON-as-text persistence fields

pub mod clause;
pub mod complexity;
pub mod component;
pub mod persist;
pub mod timing;

pub use clause::{
    ClauseOperator, ClauseTree, DataElement, ElementType, LogicalClause, MeasureElement,
    ReviewStatus,
};
pub use complexity::{ComplexityFactors, ComplexityLevel, ComponentComplexity, ZERO_CODES_FLOOR};
pub use component::{
    ApprovalStatus, AtomicComponent, Code, ComponentKind, ComponentMetadata, ComponentReference,
    CompositeComponent, CompositeOperator, LibraryComponent, ParsedAtomic, ParsedComponent,
    ParsedComposite, ResourceType, UsageInfo, ValueSet, VersionInfo, VersionRecord,
};
pub use timing::{DEFAULT_REFERENCE, TimingExpression, TimingOperator, TimingUnit};
