//! The entity model shared by the local and global stores.
//!
//! Entities are a closed set of variants. The store a row lives in assigns
//! its identifier; the [`Meta`] block tracks that identifier, the optional
//! link to the mirrored global row, and the audit timestamps.

use crate::error::{Error, Result};
use crate::{EntityId, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identity and store-tracking state carried by every entity.
///
/// `Meta` is never part of the serialized business payload: a row's
/// tracking state belongs to the store it lives in, not to the fields
/// being mirrored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meta {
    /// Identifier assigned by the store this row lives in.
    /// `None` until inserted; immutable once assigned.
    pub id: Option<EntityId>,
    /// Identifier of the mirrored row in the global store.
    /// `None` until a successful backup.
    pub global_id: Option<EntityId>,
    /// When the row was created (milliseconds since epoch).
    /// Stamped at local insertion; the reconciliation copy preserves it.
    pub created_at: Option<Timestamp>,
    /// Soft-delete marker. Propagation across stores is best-effort.
    pub deleted_at: Option<Timestamp>,
}

impl Meta {
    /// Tracking state for a copy that has not been inserted anywhere:
    /// no identity, no global link, audit timestamps carried over.
    pub fn detached(&self) -> Meta {
        Meta {
            id: None,
            global_id: None,
            created_at: self.created_at,
            deleted_at: self.deleted_at,
        }
    }

    /// Check if the row is soft-deleted.
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// The closed set of entity kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    User,
    Address,
    Order,
    OrderItem,
    Coffee,
    PaymentDetail,
}

impl EntityKind {
    /// Kinds in the order a bulk copy must visit them: independent kinds
    /// first, then kinds whose foreign keys reference them.
    pub const DEPENDENCY_ORDER: [EntityKind; 6] = [
        EntityKind::User,
        EntityKind::Coffee,
        EntityKind::Address,
        EntityKind::PaymentDetail,
        EntityKind::Order,
        EntityKind::OrderItem,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::User => "user",
            EntityKind::Address => "address",
            EntityKind::Order => "order",
            EntityKind::OrderItem => "order_item",
            EntityKind::Coffee => "coffee",
            EntityKind::PaymentDetail => "payment_detail",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "user" => Ok(EntityKind::User),
            "address" => Ok(EntityKind::Address),
            "order" => Ok(EntityKind::Order),
            "order_item" => Ok(EntityKind::OrderItem),
            "coffee" => Ok(EntityKind::Coffee),
            "payment_detail" => Ok(EntityKind::PaymentDetail),
            other => Err(Error::InvalidPayload(format!(
                "unknown entity kind: {other}"
            ))),
        }
    }
}

/// Variety of coffee bean.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoffeeName {
    #[default]
    Arabica,
    Robusta,
    Liberica,
    Excelsa,
}

/// Processing state of a coffee product.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoffeeKind {
    #[default]
    Roasted,
    Ground,
    Raw,
}

/// Lifecycle status of an order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Shipped,
}

/// Role of a customer address.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressKind {
    #[default]
    Personal,
    Shipping,
    Billing,
}

/// A customer account.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub user_name: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: Option<String>,
    #[serde(skip)]
    pub meta: Meta,
}

/// A coffee product in the catalog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coffee {
    pub name: CoffeeName,
    pub kind: CoffeeKind,
    /// Unit price in cents.
    pub price_cents: i64,
    #[serde(skip)]
    pub meta: Meta,
}

/// A customer address. `user_ref` points at a [`User`] row in the same
/// store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub user_ref: EntityId,
    pub kind: AddressKind,
    pub street: String,
    pub house_number: String,
    pub city: String,
    pub postal_code: String,
    pub country_iso: String,
    pub unit_number: Option<String>,
    #[serde(skip)]
    pub meta: Meta,
}

/// A customer order. `user_ref` points at a [`User`] row in the same
/// store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub user_ref: EntityId,
    pub status: OrderStatus,
    #[serde(skip)]
    pub meta: Meta,
}

/// One line of an order. Both references point into the same store as the
/// item itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub order_ref: EntityId,
    pub coffee_ref: EntityId,
    pub quantity: u32,
    /// Unit price in cents at the time of ordering.
    pub unit_price_cents: i64,
    #[serde(skip)]
    pub meta: Meta,
}

impl OrderItem {
    /// Line total: quantity times unit price, in cents.
    pub fn total_cents(&self) -> i64 {
        self.unit_price_cents * i64::from(self.quantity)
    }
}

/// Stored payment instrument of a customer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDetail {
    pub user_ref: EntityId,
    pub last_four: u16,
    /// Card expiry (milliseconds since epoch).
    pub expires_at: Timestamp,
    pub gateway_token: String,
    #[serde(skip)]
    pub meta: Meta,
}

/// A domain entity. The set of variants is closed; adding a kind means
/// touching every exhaustive match in this crate, which is intentional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Entity {
    User(User),
    Address(Address),
    Order(Order),
    OrderItem(OrderItem),
    Coffee(Coffee),
    PaymentDetail(PaymentDetail),
}

impl Entity {
    /// The kind of this entity.
    pub fn kind(&self) -> EntityKind {
        match self {
            Entity::User(_) => EntityKind::User,
            Entity::Address(_) => EntityKind::Address,
            Entity::Order(_) => EntityKind::Order,
            Entity::OrderItem(_) => EntityKind::OrderItem,
            Entity::Coffee(_) => EntityKind::Coffee,
            Entity::PaymentDetail(_) => EntityKind::PaymentDetail,
        }
    }

    /// Tracking state of this entity.
    pub fn meta(&self) -> &Meta {
        match self {
            Entity::User(e) => &e.meta,
            Entity::Address(e) => &e.meta,
            Entity::Order(e) => &e.meta,
            Entity::OrderItem(e) => &e.meta,
            Entity::Coffee(e) => &e.meta,
            Entity::PaymentDetail(e) => &e.meta,
        }
    }

    /// Mutable tracking state of this entity.
    pub fn meta_mut(&mut self) -> &mut Meta {
        match self {
            Entity::User(e) => &mut e.meta,
            Entity::Address(e) => &mut e.meta,
            Entity::Order(e) => &mut e.meta,
            Entity::OrderItem(e) => &mut e.meta,
            Entity::Coffee(e) => &mut e.meta,
            Entity::PaymentDetail(e) => &mut e.meta,
        }
    }

    /// Identifier in the store this row lives in, or [`Error::MissingId`]
    /// if the entity was never inserted.
    pub fn id(&self) -> Result<EntityId> {
        self.meta().id.ok_or(Error::MissingId)
    }

    /// Business fields as a JSON value. Tracking state is not included.
    pub fn payload_json(&self) -> Result<serde_json::Value> {
        let value = match self {
            Entity::User(e) => serde_json::to_value(e),
            Entity::Address(e) => serde_json::to_value(e),
            Entity::Order(e) => serde_json::to_value(e),
            Entity::OrderItem(e) => serde_json::to_value(e),
            Entity::Coffee(e) => serde_json::to_value(e),
            Entity::PaymentDetail(e) => serde_json::to_value(e),
        };
        value.map_err(|e| Error::InvalidPayload(e.to_string()))
    }

    /// Rebuild an entity of the given kind from a business payload.
    /// The returned entity carries default (empty) tracking state.
    pub fn from_payload(kind: EntityKind, payload: serde_json::Value) -> Result<Entity> {
        let entity = match kind {
            EntityKind::User => serde_json::from_value(payload).map(Entity::User),
            EntityKind::Address => serde_json::from_value(payload).map(Entity::Address),
            EntityKind::Order => serde_json::from_value(payload).map(Entity::Order),
            EntityKind::OrderItem => serde_json::from_value(payload).map(Entity::OrderItem),
            EntityKind::Coffee => serde_json::from_value(payload).map(Entity::Coffee),
            EntityKind::PaymentDetail => {
                serde_json::from_value(payload).map(Entity::PaymentDetail)
            }
        };
        entity.map_err(|e| Error::InvalidPayload(e.to_string()))
    }
}

impl From<User> for Entity {
    fn from(e: User) -> Self {
        Entity::User(e)
    }
}

impl From<Address> for Entity {
    fn from(e: Address) -> Self {
        Entity::Address(e)
    }
}

impl From<Order> for Entity {
    fn from(e: Order) -> Self {
        Entity::Order(e)
    }
}

impl From<OrderItem> for Entity {
    fn from(e: OrderItem) -> Self {
        Entity::OrderItem(e)
    }
}

impl From<Coffee> for Entity {
    fn from(e: Coffee) -> Self {
        Entity::Coffee(e)
    }
}

impl From<PaymentDetail> for Entity {
    fn from(e: PaymentDetail) -> Self {
        Entity::PaymentDetail(e)
    }
}
