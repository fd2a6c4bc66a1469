use crate::{hash_string, serialize_for_hash};
use std::collections::BTreeMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use tether_schema::{ResourceSchema, SchemaId};
use tether_types::ForeignValue;
use tracing::{debug, warn};

/// Identity of one set element.
///
/// `hash` is the element's integer identity; `ordinal` breaks ties between
/// elements sharing a hash, in order of appearance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementIdentity {
    pub hash: i64,
    pub ordinal: usize,
}

/// Pairing of prior and proposed set elements by identity.
///
/// All indices refer to the input slices. Every list is in identity order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SetMatching {
    pub matched: Vec<(usize, usize)>,
    pub removed: Vec<usize>,
    pub added: Vec<usize>,
}

/// Computes element identities for one set node of a resource schema.
pub struct SetIdentityResolver<'a> {
    schema: &'a ResourceSchema,
    set: SchemaId,
    element: SchemaId,
}

impl<'a> SetIdentityResolver<'a> {
    /// `set` is the set node. Passing any other collection node hashes its
    /// elements the same way; a scalar node hashes values as themselves.
    pub fn new(schema: &'a ResourceSchema, set: SchemaId) -> Self {
        let element = schema.node(set).element().unwrap_or(set);
        Self {
            schema,
            set,
            element,
        }
    }

    /// The integer identity of a single element.
    ///
    /// Uses the provider's hash function when the set declares one. A hash
    /// function that panics is logged and replaced by the default identity.
    #[must_use]
    pub fn identity(&self, element: &ForeignValue) -> i64 {
        if let Some(hash) = &self.schema.node(self.set).set_hash {
            match catch_unwind(AssertUnwindSafe(|| hash.hash(element))) {
                Ok(code) => return code,
                Err(_) => warn!(
                    token = %self.schema.token,
                    "Set hash function panicked, falling back to default identity"
                ),
            }
        }
        self.default_identity(element)
    }

    /// The canonical identity: CRC-32 of the element's hash serialization.
    #[must_use]
    pub fn default_identity(&self, element: &ForeignValue) -> i64 {
        hash_string(&serialize_for_hash(&self.schema.arena, self.element, element))
    }

    /// Identities for every element, with positional tie-breaking inside
    /// buckets of equal hashes.
    #[must_use]
    pub fn identities(&self, elements: &[ForeignValue]) -> Vec<ElementIdentity> {
        let mut buckets: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
        let identities: Vec<ElementIdentity> = elements
            .iter()
            .enumerate()
            .map(|(i, element)| {
                let hash = self.identity(element);
                let bucket = buckets.entry(hash).or_default();
                bucket.push(i);
                ElementIdentity {
                    hash,
                    ordinal: bucket.len() - 1,
                }
            })
            .collect();
        for (hash, members) in &buckets {
            if members.len() > 1 && members.iter().any(|&i| elements[i] != elements[members[0]]) {
                debug!(
                    token = %self.schema.token,
                    hash,
                    members = members.len(),
                    "Set identity collision, ordering colliding elements by position"
                );
            }
        }
        identities
    }

    /// Indices of `elements` in identity order. This is the stable order in
    /// which sets are presented to the destination.
    #[must_use]
    pub fn canonical_order(&self, elements: &[ForeignValue]) -> Vec<usize> {
        let identities = self.identities(elements);
        let mut order: Vec<usize> = (0..elements.len()).collect();
        order.sort_by_key(|&i| identities[i]);
        order
    }

    /// Pairs prior and proposed elements that share an identity.
    #[must_use]
    pub fn match_sets(&self, prior: &[ForeignValue], proposed: &[ForeignValue]) -> SetMatching {
        let prior_ids: BTreeMap<ElementIdentity, usize> = self
            .identities(prior)
            .into_iter()
            .enumerate()
            .map(|(i, id)| (id, i))
            .collect();
        let proposed_ids: BTreeMap<ElementIdentity, usize> = self
            .identities(proposed)
            .into_iter()
            .enumerate()
            .map(|(i, id)| (id, i))
            .collect();

        let mut matching = SetMatching::default();
        for (id, &p) in &prior_ids {
            match proposed_ids.get(id) {
                Some(&n) => matching.matched.push((p, n)),
                None => matching.removed.push(p),
            }
        }
        for (id, &n) in &proposed_ids {
            if !prior_ids.contains_key(id) {
                matching.added.push(n);
            }
        }
        matching
    }
}
