//! The identifier translation map.
//!
//! When a dataset is mirrored from one store into the other, every row
//! gets a fresh identifier on the destination side. The map records each
//! `(kind, source id) -> destination id` pair so that foreign keys of
//! dependent rows can be rewritten as the copy walks the dependency
//! graph.
//!
//! The map is a run-scoped value: built fresh for one reconciliation
//! pass, never persisted, never shared between runs.

use crate::entity::{Entity, EntityKind};
use crate::error::{Error, Result};
use crate::EntityId;
use std::collections::HashMap;

/// Mapping from source-store identifiers to destination-store
/// identifiers, scoped per entity kind.
#[derive(Debug, Default)]
pub struct TranslationMap {
    entries: HashMap<(EntityKind, EntityId), EntityId>,
}

impl TranslationMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a source-to-destination pair.
    pub fn put(&mut self, kind: EntityKind, source_id: EntityId, dest_id: EntityId) {
        self.entries.insert((kind, source_id), dest_id);
    }

    /// Look up a pair, if present.
    pub fn get(&self, kind: EntityKind, source_id: EntityId) -> Option<EntityId> {
        self.entries.get(&(kind, source_id)).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Translate a foreign key. A miss is a hard error: it means the
    /// parent kind was not copied first, and writing a defaulted key
    /// would corrupt the destination silently.
    pub fn translate(&self, kind: EntityKind, source_id: EntityId) -> Result<EntityId> {
        self.get(kind, source_id)
            .ok_or(Error::MissingTranslation { kind, source_id })
    }

    /// Rewrite every foreign key of an entity from source-store ids to
    /// destination-store ids. Kinds without references are untouched.
    pub fn rewrite_refs(&self, entity: &mut Entity) -> Result<()> {
        match entity {
            Entity::Address(a) => {
                a.user_ref = self.translate(EntityKind::User, a.user_ref)?;
            }
            Entity::PaymentDetail(p) => {
                p.user_ref = self.translate(EntityKind::User, p.user_ref)?;
            }
            Entity::Order(o) => {
                o.user_ref = self.translate(EntityKind::User, o.user_ref)?;
            }
            Entity::OrderItem(i) => {
                i.order_ref = self.translate(EntityKind::Order, i.order_ref)?;
                i.coffee_ref = self.translate(EntityKind::Coffee, i.coffee_ref)?;
            }
            Entity::User(_) | Entity::Coffee(_) => {}
        }
        Ok(())
    }
}
