//! Module: cascade
//! Responsibility: expand one root entity into the ordered batch of objects an
//! operation must touch, following declared cascade policy.
//! Does not own: writes, hooks, or referential-integrity checks.
//!
//! Invariants:
//! - The root is always emitted.
//! - Each (type, key) is emitted at most once per call, including on cyclic graphs.
//! - Order per relationship side: for persist/merge an owning-side target is
//!   emitted before its owner and an inverse-side target after it; remove
//!   reverses both. On acyclic graphs this holds for every cascading edge,
//!   including targets reached through more than one path.
//! - Any failure aborts the whole resolution; no partial batch is returned.

mod enhanced;

pub use enhanced::{EnhancedEntity, ForeignKeys};

use crate::{
    db::{cache::EntityIdentity, metadata::MetadataRegistry},
    error::{Error, ErrorClass, ErrorOrigin},
    key::Key,
    model::{BackendKind, Cardinality, CascadeType, EntityModel, ModelBinding, RelationModel},
    traits::EntityRef,
};
use std::collections::{BTreeSet, HashMap};
use thiserror::Error as ThisError;

///
/// ResolveError
///

#[derive(Debug, ThisError)]
pub enum ResolveError {
    #[error("entity '{path}' is not registered with this persistence unit")]
    UnregisteredEntity { path: String },

    #[error("entity '{path}' has no primary key value in field '{field}'")]
    MissingKey { path: String, field: String },

    #[error("entity '{path}' has an empty primary key in field '{field}'")]
    EmptyKey { path: String, field: String },

    #[error("entity '{path}' does not expose declared relation field '{field}'")]
    UnknownRelationField { path: String, field: String },

    #[error(
        "relation '{path}.{field}' declares target '{expected}' but holds an instance of '{found}'"
    )]
    TargetMismatch {
        path: String,
        field: String,
        expected: String,
        found: String,
    },

    #[error("relation '{path}.{field}' is single-valued but holds {count} instances")]
    CardinalityViolation {
        path: String,
        field: String,
        count: usize,
    },
}

impl From<ResolveError> for Error {
    fn from(err: ResolveError) -> Self {
        Self::new(ErrorClass::Resolution, ErrorOrigin::Cascade, err.to_string())
    }
}

///
/// CascadeResolver
///

pub struct CascadeResolver<'a> {
    metadata: &'a MetadataRegistry,
}

impl<'a> CascadeResolver<'a> {
    #[must_use]
    pub const fn new(metadata: &'a MetadataRegistry) -> Self {
        Self { metadata }
    }

    /// Resolve the ordered, deduplicated batch reachable from `root` for `op`.
    pub fn resolve(
        &self,
        root: &EntityRef,
        op: CascadeType,
        backend: BackendKind,
    ) -> Result<Vec<EnhancedEntity>, ResolveError> {
        let mut walk = Walk {
            metadata: self.metadata,
            op,
            backend,
            ids: HashMap::new(),
            slots: Vec::new(),
            emitted: Vec::new(),
            edges: Vec::new(),
        };
        walk.visit(root)?;

        Ok(walk.into_batch())
    }
}

///
/// Walk
///
/// Depth-first traversal state for one `resolve` call. Nodes get an id on
/// discovery; every cascading relation records an (earlier, later) edge
/// between owner and target ids.
///

struct Walk<'a> {
    metadata: &'a MetadataRegistry,
    op: CascadeType,
    backend: BackendKind,
    ids: HashMap<EntityIdentity, usize>,
    slots: Vec<Option<EnhancedEntity>>,
    // ids in depth-first emission order; used as the tie-break rank
    emitted: Vec<usize>,
    edges: Vec<(usize, usize)>,
}

impl Walk<'_> {
    fn visit(&mut self, entity: &EntityRef) -> Result<usize, ResolveError> {
        let model = self.registered_model(entity)?;
        let key = read_key(entity, model)?;

        let identity = EntityIdentity::new(model.path, key.clone());
        if let Some(&id) = self.ids.get(&identity) {
            return Ok(id);
        }
        let id = self.slots.len();
        self.ids.insert(identity, id);
        self.slots.push(None);

        // Phase 1: read every relation field; cascade into targets that must precede the owner.
        let mut foreign_keys = Vec::with_capacity(model.relations.len());
        let mut deferred = Vec::new();

        for relation in model.relations {
            let related = read_relation(entity, model, relation)?;
            let keys = related
                .iter()
                .map(|target| read_key(target, target.model()))
                .collect::<Result<Vec<_>, _>>()?;

            foreign_keys.push(ForeignKeys {
                field: relation.field,
                column: relation.foreign_key,
                keys,
            });

            if !relation.cascade.includes(self.op) {
                continue;
            }
            if relation.target_first(self.op) {
                for target in &related {
                    let target = self.visit(target)?;
                    self.edges.push((target, id));
                }
            } else {
                deferred.extend(related);
            }
        }

        // Phase 2: emit the owner, then targets that must follow it.
        self.slots[id] = Some(EnhancedEntity::new(
            EntityRef::clone(entity),
            key,
            ModelBinding::new(model, self.backend),
            foreign_keys,
        ));
        self.emitted.push(id);

        for target in &deferred {
            let target = self.visit(target)?;
            self.edges.push((id, target));
        }

        Ok(id)
    }

    // Order the batch so every edge's earlier end precedes its later end.
    //
    // Among ready nodes the depth-first emission rank wins, so a walk whose
    // emission order already satisfies every edge is returned unchanged.
    // When a cycle leaves no node ready, the lowest-ranked waiting node is
    // emitted next.
    fn into_batch(self) -> Vec<EnhancedEntity> {
        let count = self.slots.len();
        let mut rank = vec![0; count];
        for (position, &id) in self.emitted.iter().enumerate() {
            rank[id] = position;
        }

        let mut successors = vec![Vec::new(); count];
        let mut pending = vec![0usize; count];
        for &(earlier, later) in &self.edges {
            if earlier != later {
                successors[earlier].push(later);
                pending[later] += 1;
            }
        }

        let (mut ready, mut waiting): (BTreeSet<usize>, BTreeSet<usize>) =
            (0..count).map(|id| rank[id]).partition(|&r| pending[self.emitted[r]] == 0);
        let mut done = vec![false; count];
        let mut order = Vec::with_capacity(count);

        while let Some(next) = ready.pop_first().or_else(|| waiting.pop_first()) {
            let id = self.emitted[next];
            if done[id] {
                continue;
            }
            done[id] = true;
            order.push(id);

            for &later in &successors[id] {
                pending[later] = pending[later].saturating_sub(1);
                if pending[later] == 0 && !done[later] && waiting.remove(&rank[later]) {
                    ready.insert(rank[later]);
                }
            }
        }

        let mut slots = self.slots;
        order
            .into_iter()
            .filter_map(|id| slots[id].take())
            .collect()
    }

    fn registered_model(&self, entity: &EntityRef) -> Result<&'static EntityModel, ResolveError> {
        let path = entity.model().path;

        self.metadata
            .get(path)
            .ok_or_else(|| ResolveError::UnregisteredEntity {
                path: path.to_string(),
            })
    }
}

// Materialize an entity's key through its model's key field.
fn read_key(entity: &EntityRef, model: &EntityModel) -> Result<Key, ResolveError> {
    let key = entity
        .primary_key()
        .ok_or_else(|| ResolveError::MissingKey {
            path: model.path.to_string(),
            field: model.primary_key.to_string(),
        })?;

    if key.is_empty() {
        return Err(ResolveError::EmptyKey {
            path: model.path.to_string(),
            field: model.primary_key.to_string(),
        });
    }

    Ok(key)
}

// Read one relation field and check it against its declared shape.
fn read_relation(
    entity: &EntityRef,
    model: &EntityModel,
    relation: &RelationModel,
) -> Result<Vec<EntityRef>, ResolveError> {
    let related = entity
        .related(relation.field)
        .ok_or_else(|| ResolveError::UnknownRelationField {
            path: model.path.to_string(),
            field: relation.field.to_string(),
        })?;

    if relation.cardinality == Cardinality::One && related.len() > 1 {
        return Err(ResolveError::CardinalityViolation {
            path: model.path.to_string(),
            field: relation.field.to_string(),
            count: related.len(),
        });
    }

    if let Some(stray) = related
        .iter()
        .find(|target| target.model().path != relation.target_path)
    {
        return Err(ResolveError::TargetMismatch {
            path: model.path.to_string(),
            field: relation.field.to_string(),
            expected: relation.target_path.to_string(),
            found: stray.model().path.to_string(),
        });
    }

    Ok(related)
}
