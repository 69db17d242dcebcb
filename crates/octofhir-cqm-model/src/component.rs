//! Library components and parsed candidates
//!
//! This module defines the polymorphic component model:
//! - [`LibraryComponent`] - a persisted, versioned unit of clinical logic,
//!   either atomic (value set + timing) or composite (AND/OR/NOT of children)
//! - [`ParsedComponent`] - a transient candidate produced by document
//!   ingestion or fresh authoring, never carrying a library id
//!
//! The atomic/composite split is a tagged union sharing a common header,
//! dispatched by match rather than a class hierarchy.

use crate::complexity::ComponentComplexity;
use crate::timing::TimingExpression;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a library component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    /// Freshly authored or imported, not yet reviewed
    Draft,
    /// Submitted for clinical review
    PendingReview,
    /// Approved for reuse across measures
    Approved,
    /// Soft-deleted; ineligible for new matches but still resolvable
    Archived,
}

impl ApprovalStatus {
    pub fn is_approved(&self) -> bool {
        matches!(self, ApprovalStatus::Approved)
    }

    pub fn is_archived(&self) -> bool {
        matches!(self, ApprovalStatus::Archived)
    }
}

impl fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ApprovalStatus::Draft => "draft",
            ApprovalStatus::PendingReview => "pending_review",
            ApprovalStatus::Approved => "approved",
            ApprovalStatus::Archived => "archived",
        };
        f.write_str(s)
    }
}

/// Clinical domain category of an atomic component
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    Encounter,
    Condition,
    Procedure,
    Medication,
    Observation,
    Laboratory,
    Patient,
    /// Category outside the common set
    Other(String),
}

/// A single clinical code within a value set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Code {
    /// Code value, e.g. "45378"
    pub code: String,
    /// Code system, e.g. "CPT", "ICD-10-CM"
    pub system: String,
    /// Human-readable display text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
    /// Code system version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// A named, versioned collection of clinical codes identified by OID
///
/// The OID is the source of truth for identity; the cached `codes` list may
/// be refreshed independently without changing what the value set means.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueSet {
    /// Object identifier, e.g. "2.16.840.1.113883.3.464.1003.108.12.1020"
    pub oid: String,
    /// Display name, e.g. "Colonoscopy"
    pub name: String,
    /// Value set version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Cached expansion; may lag behind the terminology service
    #[serde(default)]
    pub codes: Vec<Code>,
}

impl ValueSet {
    /// Value set with no cached codes
    pub fn new(oid: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            oid: oid.into(),
            name: name.into(),
            version: None,
            codes: Vec::new(),
        }
    }

    /// Attach cached codes
    pub fn with_codes(mut self, codes: Vec<Code>) -> Self {
        self.codes = codes;
        self
    }
}

/// Reference from a composite component to one of its children
///
/// Order of references is meaningful for display but not for identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentReference {
    /// Id of the referenced library component
    pub component_id: String,
    /// Version pin at the time of composition, informational only;
    /// matching and hashing always resolve to the current component
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_id: Option<String>,
    /// Display name snapshot for rendering without resolution
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl ComponentReference {
    pub fn new(component_id: impl Into<String>) -> Self {
        Self {
            component_id: component_id.into(),
            version_id: None,
            display_name: None,
        }
    }
}

/// Boolean combinator for composite components and logical clauses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CompositeOperator {
    And,
    Or,
    Not,
}

impl CompositeOperator {
    /// Canonical uppercase token (part of the identity-key contract)
    pub fn as_str(&self) -> &'static str {
        match self {
            CompositeOperator::And => "AND",
            CompositeOperator::Or => "OR",
            CompositeOperator::Not => "NOT",
        }
    }
}

impl fmt::Display for CompositeOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload of an atomic component: one value set plus timing and qualifiers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AtomicComponent {
    /// Primary value set; its OID drives identity
    pub value_set: ValueSet,
    /// Supplementary value sets (e.g. with-diagnosis qualifiers)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub additional_value_sets: Vec<ValueSet>,
    /// Temporal constraint, absent for untimed criteria
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timing: Option<TimingExpression>,
    /// Whether the criterion asserts absence of the event
    #[serde(default)]
    pub negation: bool,
    /// Clinical domain category
    pub resource_type: ResourceType,
    /// Gender constraint for demographic criteria
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender_value: Option<String>,
}

/// Payload of a composite component: a combinator over child references
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositeComponent {
    /// Boolean combinator
    pub operator: CompositeOperator,
    /// Ordered children; order matters for display only
    pub children: Vec<ComponentReference>,
}

/// The two component variants
///
/// Serialized with an explicit `kind` tag; an unrecognized tag is a
/// data-integrity error and fails deserialization loudly rather than being
/// coerced into either variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ComponentKind {
    Atomic(AtomicComponent),
    Composite(CompositeComponent),
}

/// Version bookkeeping for a component
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionInfo {
    /// Monotonically increasing version number
    #[serde(default)]
    pub version: u32,
    /// Opaque id of the current version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_id: Option<String>,
    /// Prior versions, newest first
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub prior_versions: Vec<VersionRecord>,
}

/// One entry in a component's version history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionRecord {
    pub version_id: String,
    pub version: u32,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Where a component is used
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageInfo {
    /// Measures referencing this component
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub measure_ids: Vec<String>,
    /// Total reference count across measures
    #[serde(default)]
    pub use_count: u32,
}

/// Free-form curation metadata
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentMetadata {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Provenance, e.g. the measure or document this was extracted from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Owning steward organization
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steward: Option<String>,
}

/// A persisted, versioned component in the reuse library
///
/// `id` is assigned at creation and never reused; content may change across
/// versions, but identity hashing and matching always operate on the current
/// content, never on `id` equality.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryComponent {
    /// Stable identifier
    pub id: String,
    /// Display name
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Variant payload
    #[serde(flatten)]
    pub kind: ComponentKind,
    /// Lifecycle state
    pub status: ApprovalStatus,
    /// Cached complexity; recomputed by the engine on create/edit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complexity: Option<ComponentComplexity>,
    #[serde(default)]
    pub version_info: VersionInfo,
    #[serde(default)]
    pub usage: UsageInfo,
    #[serde(default)]
    pub metadata: ComponentMetadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
}

impl LibraryComponent {
    /// New draft atomic component with bookkeeping defaults
    pub fn new_atomic(
        id: impl Into<String>,
        name: impl Into<String>,
        atomic: AtomicComponent,
    ) -> Self {
        Self::new(id, name, ComponentKind::Atomic(atomic))
    }

    /// New draft composite component with bookkeeping defaults
    pub fn new_composite(
        id: impl Into<String>,
        name: impl Into<String>,
        composite: CompositeComponent,
    ) -> Self {
        Self::new(id, name, ComponentKind::Composite(composite))
    }

    fn new(id: impl Into<String>, name: impl Into<String>, kind: ComponentKind) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            kind,
            status: ApprovalStatus::Draft,
            complexity: None,
            version_info: VersionInfo::default(),
            usage: UsageInfo::default(),
            metadata: ComponentMetadata::default(),
            created_at: now,
            updated_at: now,
            created_by: None,
            updated_by: None,
        }
    }

    /// Set the lifecycle status
    pub fn with_status(mut self, status: ApprovalStatus) -> Self {
        self.status = status;
        self
    }

    pub fn is_atomic(&self) -> bool {
        matches!(self.kind, ComponentKind::Atomic(_))
    }

    pub fn is_composite(&self) -> bool {
        matches!(self.kind, ComponentKind::Composite(_))
    }

    /// Not archived, hence eligible for new matches
    pub fn is_active(&self) -> bool {
        !self.status.is_archived()
    }

    pub fn is_approved(&self) -> bool {
        self.status.is_approved()
    }

    pub fn as_atomic(&self) -> Option<&AtomicComponent> {
        match &self.kind {
            ComponentKind::Atomic(atomic) => Some(atomic),
            ComponentKind::Composite(_) => None,
        }
    }

    pub fn as_composite(&self) -> Option<&CompositeComponent> {
        match &self.kind {
            ComponentKind::Composite(composite) => Some(composite),
            ComponentKind::Atomic(_) => None,
        }
    }

    /// OID of the primary value set for atomics, None for composites
    pub fn primary_oid(&self) -> Option<&str> {
        self.as_atomic().map(|atomic| atomic.value_set.oid.as_str())
    }
}

/// Atomic candidate freshly parsed from a document or authored in the UI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedAtomic {
    /// Name proposed by the ingestion flow
    pub name: String,
    /// OID of the value set, when the ingestion flow resolved one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_set_oid: Option<String>,
    /// Value set name as it appeared in the source text
    pub value_set_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timing: Option<TimingExpression>,
    #[serde(default)]
    pub negation: bool,
    pub resource_type: ResourceType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender_value: Option<String>,
}

/// Composite candidate with inline children
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedComposite {
    pub name: String,
    pub operator: CompositeOperator,
    /// Inline children; ingestion produces atomic children in practice
    pub children: Vec<ParsedComponent>,
}

/// A transient candidate component, same semantic shape as the library
/// variants but never carrying a library id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParsedComponent {
    Atomic(ParsedAtomic),
    Composite(ParsedComposite),
}

impl ParsedComponent {
    pub fn name(&self) -> &str {
        match self {
            ParsedComponent::Atomic(atomic) => &atomic.name,
            ParsedComponent::Composite(composite) => &composite.name,
        }
    }

    pub fn is_atomic(&self) -> bool {
        matches!(self, ParsedComponent::Atomic(_))
    }

    pub fn as_atomic(&self) -> Option<&ParsedAtomic> {
        match self {
            ParsedComponent::Atomic(atomic) => Some(atomic),
            ParsedComponent::Composite(_) => None,
        }
    }

    pub fn as_composite(&self) -> Option<&ParsedComposite> {
        match self {
            ParsedComponent::Composite(composite) => Some(composite),
            ParsedComponent::Atomic(_) => None,
        }
    }
}
