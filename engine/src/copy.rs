//! Shallow copies: moving a row's content between stores.
//!
//! A shallow copy carries the business fields of a row into a fresh,
//! identity-less value that can be inserted into the other store. The
//! copy keeps `created_at` and `deleted_at`; callers that need different
//! audit semantics (the bulk reconciler re-stamps `created_at` from the
//! source row) override them explicitly after copying.

use crate::entity::{Address, Coffee, Entity, Order, OrderItem, PaymentDetail, User};
use crate::error::{Error, Result};

/// A value-only duplication of an entity's business fields.
///
/// Implemented per concrete kind; the closed [`Entity`] enum dispatches
/// at compile time, so there is no runtime "unregistered type" failure
/// mode to defend against.
pub trait ShallowCopy {
    /// Produce a copy with default identity fields and identical
    /// business-field values.
    fn shallow_copy(&self) -> Self;
}

impl ShallowCopy for User {
    fn shallow_copy(&self) -> Self {
        User {
            meta: self.meta.detached(),
            ..self.clone()
        }
    }
}

impl ShallowCopy for Coffee {
    fn shallow_copy(&self) -> Self {
        Coffee {
            meta: self.meta.detached(),
            ..self.clone()
        }
    }
}

impl ShallowCopy for Address {
    fn shallow_copy(&self) -> Self {
        Address {
            meta: self.meta.detached(),
            ..self.clone()
        }
    }
}

impl ShallowCopy for Order {
    fn shallow_copy(&self) -> Self {
        Order {
            meta: self.meta.detached(),
            ..self.clone()
        }
    }
}

impl ShallowCopy for OrderItem {
    fn shallow_copy(&self) -> Self {
        OrderItem {
            meta: self.meta.detached(),
            ..self.clone()
        }
    }
}

impl ShallowCopy for PaymentDetail {
    fn shallow_copy(&self) -> Self {
        PaymentDetail {
            meta: self.meta.detached(),
            ..self.clone()
        }
    }
}

impl ShallowCopy for Entity {
    fn shallow_copy(&self) -> Self {
        match self {
            Entity::User(e) => Entity::User(e.shallow_copy()),
            Entity::Address(e) => Entity::Address(e.shallow_copy()),
            Entity::Order(e) => Entity::Order(e.shallow_copy()),
            Entity::OrderItem(e) => Entity::OrderItem(e.shallow_copy()),
            Entity::Coffee(e) => Entity::Coffee(e.shallow_copy()),
            Entity::PaymentDetail(e) => Entity::PaymentDetail(e.shallow_copy()),
        }
    }
}

impl Entity {
    /// Overwrite this row's business fields and soft-delete marker with
    /// the source's, keeping this row's own identity and creation time.
    ///
    /// This is the overwrite-on-resync path: re-backing-up an already
    /// synced entity replaces the global row's content in place, it never
    /// merges.
    pub fn overwrite_from(&mut self, source: &Entity) -> Result<()> {
        if self.kind() != source.kind() {
            return Err(Error::KindMismatch {
                expected: self.kind(),
                actual: source.kind(),
            });
        }

        let own = self.meta().clone();
        let mut fresh = source.shallow_copy();
        *fresh.meta_mut() = crate::entity::Meta {
            id: own.id,
            global_id: own.global_id,
            created_at: own.created_at,
            deleted_at: source.meta().deleted_at,
        };
        *self = fresh;
        Ok(())
    }
}
