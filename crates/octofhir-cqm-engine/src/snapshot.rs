//! Library snapshots
//!
//! A [`LibrarySnapshot`] is the atomic, dependency-injected view of the
//! component library that every engine operation works against. Callers
//! performing batch work (linking a whole measure, auditing usage) build one
//! snapshot and reuse it across the batch so every match and complexity sum
//! observes the same state.
//!
//! The snapshot also carries the incrementally maintained content-hash index
//! backing exact matching: hash -> ids of active components. Archived
//! components stay resolvable by id (composites may still reference them)
//! but never appear in the index.

use crate::identity::component_hash;
use octofhir_cqm_model::{ApprovalStatus, ComponentReference, LibraryComponent};
use indexmap::IndexMap;
use std::collections::HashMap;

/// An atomic view of the component library with a content-hash index
#[derive(Debug, Clone, Default)]
pub struct LibrarySnapshot {
    /// id -> component, in insertion order; includes archived components
    components: IndexMap<String, LibraryComponent>,
    /// content hash -> active component ids, in insertion order
    hash_index: HashMap<String, Vec<String>>,
    /// active component id -> its indexed content hash
    hash_by_id: HashMap<String, String>,
}

impl LibrarySnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a snapshot from a repository dump
    ///
    /// Arrival order does not matter: the hash index is built in a second
    /// pass once every component is resolvable.
    pub fn from_components(components: impl IntoIterator<Item = LibraryComponent>) -> Self {
        let mut snapshot = Self::new();
        for component in components {
            snapshot
                .components
                .insert(component.id.clone(), component);
        }
        let ids: Vec<String> = snapshot.components.keys().cloned().collect();
        for id in ids {
            snapshot.index_component(&id);
        }
        snapshot
    }

    /// Insert a newly created component and index it
    ///
    /// Existing composites may already reference the new id (a previously
    /// dangling child), so referencing composites are reindexed too.
    pub fn insert(&mut self, component: LibraryComponent) {
        let id = component.id.clone();
        self.unindex_component(&id);
        self.components.insert(id.clone(), component);
        self.index_component(&id);
        self.reindex_active_composites(&id);
    }

    /// Replace a component's current content and reindex
    ///
    /// A child edit changes the hash of every composite above it, so all
    /// active composites are reindexed along with the updated component.
    pub fn update(&mut self, component: LibraryComponent) {
        let id = component.id.clone();
        self.unindex_component(&id);
        self.components.insert(id.clone(), component);
        self.index_component(&id);
        self.reindex_active_composites(&id);
    }

    /// Reindex every active composite other than the changed component; a
    /// child change cascades into the hash of every composite above it
    fn reindex_active_composites(&mut self, changed_id: &str) {
        let composite_ids: Vec<String> = self
            .components
            .values()
            .filter(|c| c.is_composite() && c.is_active() && c.id != changed_id)
            .map(|c| c.id.clone())
            .collect();
        for composite_id in composite_ids {
            self.unindex_component(&composite_id);
            self.index_component(&composite_id);
        }
    }

    /// Archive a component: it leaves the hash index (no new matches) but
    /// stays resolvable for hash computation when referenced as a child
    pub fn archive(&mut self, id: &str) {
        self.unindex_component(id);
        if let Some(component) = self.components.get_mut(id) {
            component.status = ApprovalStatus::Archived;
        }
    }

    fn index_component(&mut self, id: &str) {
        let Some(component) = self.components.get(id) else {
            return;
        };
        if !component.is_active() {
            return;
        }
        match component_hash(component, self) {
            Ok(hash) => {
                self.hash_by_id.insert(id.to_string(), hash.clone());
                self.hash_index.entry(hash).or_default().push(id.to_string());
            }
            Err(err) => {
                // Cyclic composites stay resolvable by id but cannot be
                // matched by hash.
                log::warn!("component {id} left out of hash index: {err}");
            }
        }
    }

    fn unindex_component(&mut self, id: &str) {
        if let Some(hash) = self.hash_by_id.remove(id) {
            if let Some(ids) = self.hash_index.get_mut(&hash) {
                ids.retain(|existing| existing != id);
                if ids.is_empty() {
                    self.hash_index.remove(&hash);
                }
            }
        }
    }

    /// Resolve a component by id, archived included
    pub fn get(&self, id: &str) -> Option<&LibraryComponent> {
        self.components.get(id)
    }

    /// Resolve a composite child reference to its current component
    pub fn resolve(&self, reference: &ComponentReference) -> Option<&LibraryComponent> {
        self.get(&reference.component_id)
    }

    /// Active (non-archived) components in insertion order
    pub fn iter_active(&self) -> impl Iterator<Item = &LibraryComponent> {
        self.components.values().filter(|c| c.is_active())
    }

    /// All components, archived included
    pub fn iter(&self) -> impl Iterator<Item = &LibraryComponent> {
        self.components.values()
    }

    /// Active component ids sharing a content hash, in insertion order
    pub fn ids_for_hash(&self, hash: &str) -> &[String] {
        self.hash_index.get(hash).map_or(&[], Vec::as_slice)
    }

    /// First active component with the given content hash
    pub fn first_active_for_hash(&self, hash: &str) -> Option<&LibraryComponent> {
        self.ids_for_hash(hash)
            .first()
            .and_then(|id| self.get(id))
    }

    /// Indexed content hash of an active component
    pub fn hash_of(&self, id: &str) -> Option<&str> {
        self.hash_by_id.get(id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use octofhir_cqm_model::{
        AtomicComponent, CompositeComponent, CompositeOperator, ResourceType, TimingExpression,
        ValueSet,
    };
    use pretty_assertions::assert_eq;

    fn atomic(id: &str, oid: &str) -> LibraryComponent {
        LibraryComponent::new_atomic(
            id,
            format!("Atomic {id}"),
            AtomicComponent {
                value_set: ValueSet::new(oid, format!("Value set {oid}")),
                additional_value_sets: Vec::new(),
                timing: Some(TimingExpression::during_measurement_period()),
                negation: false,
                resource_type: ResourceType::Procedure,
                gender_value: None,
            },
        )
    }

    fn composite(id: &str, operator: CompositeOperator, children: &[&str]) -> LibraryComponent {
        LibraryComponent::new_composite(
            id,
            format!("Composite {id}"),
            CompositeComponent {
                operator,
                children: children
                    .iter()
                    .map(|child| ComponentReference::new(*child))
                    .collect(),
            },
        )
    }

    #[test]
    fn test_identical_atomics_share_hash_bucket() {
        let mut snapshot = LibrarySnapshot::new();
        snapshot.insert(atomic("a1", "1.2.3"));
        snapshot.insert(atomic("a2", "1.2.3"));

        let hash = snapshot.hash_of("a1").unwrap().to_string();
        assert_eq!(snapshot.ids_for_hash(&hash), ["a1", "a2"]);
        assert_eq!(snapshot.first_active_for_hash(&hash).unwrap().id, "a1");
    }

    #[test]
    fn test_archive_removes_from_index_but_stays_resolvable() {
        let mut snapshot = LibrarySnapshot::new();
        snapshot.insert(atomic("a1", "1.2.3"));
        let hash = snapshot.hash_of("a1").unwrap().to_string();

        snapshot.archive("a1");
        assert!(snapshot.ids_for_hash(&hash).is_empty());
        assert!(snapshot.get("a1").is_some());
        assert!(!snapshot.get("a1").unwrap().is_active());
        assert_eq!(snapshot.iter_active().count(), 0);
        assert_eq!(snapshot.len(), 1);
    }

    #[test]
    fn test_update_reindexes_referencing_composites() {
        let mut snapshot = LibrarySnapshot::from_components([
            atomic("a1", "1.2.3"),
            atomic("a2", "4.5.6"),
            composite("c1", CompositeOperator::Or, &["a1", "a2"]),
        ]);
        let before = snapshot.hash_of("c1").unwrap().to_string();

        // Change a1's underlying value set; the composite's hash must follow
        snapshot.update(atomic("a1", "9.9.9"));
        let after = snapshot.hash_of("c1").unwrap().to_string();
        assert_ne!(before, after);
    }

    #[test]
    fn test_insert_reindexes_composites_with_resolved_children() {
        // The composite arrives first; its child dangles and the composite
        // is indexed under the dangling-child hash
        let mut snapshot = LibrarySnapshot::new();
        snapshot.insert(composite("comp", CompositeOperator::Not, &["a1"]));
        let stale = snapshot.hash_of("comp").unwrap().to_string();

        // Inserting the child must refresh the parent's indexed hash to the
        // one a freshly built snapshot computes
        snapshot.insert(atomic("a1", "1.2.3"));
        let fresh = LibrarySnapshot::from_components([
            atomic("a1", "1.2.3"),
            composite("comp", CompositeOperator::Not, &["a1"]),
        ]);
        assert_ne!(snapshot.hash_of("comp"), Some(stale.as_str()));
        assert_eq!(snapshot.hash_of("comp"), fresh.hash_of("comp"));

        let resolved = fresh
            .hash_of("comp")
            .and_then(|hash| snapshot.first_active_for_hash(hash));
        assert_eq!(resolved.map(|c| c.id.as_str()), Some("comp"));
    }

    #[test]
    fn test_build_order_does_not_matter() {
        let forward = LibrarySnapshot::from_components([
            atomic("a1", "1.2.3"),
            composite("c1", CompositeOperator::And, &["a1"]),
        ]);
        let backward = LibrarySnapshot::from_components([
            composite("c1", CompositeOperator::And, &["a1"]),
            atomic("a1", "1.2.3"),
        ]);
        assert_eq!(forward.hash_of("c1"), backward.hash_of("c1"));
    }

    #[test]
    fn test_cyclic_composite_is_resolvable_but_unindexed() {
        let snapshot = LibrarySnapshot::from_components([
            composite("c1", CompositeOperator::And, &["c2"]),
            composite("c2", CompositeOperator::And, &["c1"]),
        ]);
        assert!(snapshot.hash_of("c1").is_none());
        assert!(snapshot.hash_of("c2").is_none());
        assert!(snapshot.get("c1").is_some());
    }
}
