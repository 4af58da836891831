//! Fixed catalogs and the seeding routine for a fresh deployment.
//!
//! The global store of a new installation is populated from these
//! catalogs; the local store is then filled by a bulk reconciliation
//! pass against it. Assignments of orders, addresses and payment
//! instruments to customers are randomized but reproducible: the caller
//! supplies the seed.

use brewsync_engine::{
    Address, AddressKind, Coffee, CoffeeKind, CoffeeName, Entity, EntityId, EntityStore, Order,
    OrderItem, OrderStatus, PaymentDetail, Result, Timestamp, User,
};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use uuid::Uuid;

const MILLIS_PER_YEAR: u64 = 365 * 24 * 60 * 60 * 1000;

/// The coffee catalog. Prices are in cents.
pub fn coffees() -> Vec<Coffee> {
    let table: [(CoffeeName, CoffeeKind, i64); 10] = [
        (CoffeeName::Arabica, CoffeeKind::Roasted, 1450),
        (CoffeeName::Robusta, CoffeeKind::Roasted, 1120),
        (CoffeeName::Arabica, CoffeeKind::Ground, 1375),
        (CoffeeName::Robusta, CoffeeKind::Ground, 1090),
        (CoffeeName::Arabica, CoffeeKind::Raw, 840),
        (CoffeeName::Robusta, CoffeeKind::Raw, 695),
        (CoffeeName::Liberica, CoffeeKind::Roasted, 1680),
        (CoffeeName::Liberica, CoffeeKind::Ground, 1530),
        (CoffeeName::Excelsa, CoffeeKind::Roasted, 1725),
        (CoffeeName::Excelsa, CoffeeKind::Raw, 910),
    ];

    table
        .into_iter()
        .map(|(name, kind, price_cents)| Coffee {
            name,
            kind,
            price_cents,
            ..Coffee::default()
        })
        .collect()
}

/// The customer catalog.
pub fn users() -> Vec<User> {
    let table = [
        ("alice.smith", "alice@example.com", "Alice", "Smith"),
        ("bob.johnson", "bob@example.com", "Bob", "Johnson"),
        ("carol.wilson", "carol@example.com", "Carol", "Wilson"),
        ("david.brown", "david@example.com", "David", "Brown"),
        ("emma.davis", "emma@example.com", "Emma", "Davis"),
        ("frank.miller", "frank@example.com", "Frank", "Miller"),
        ("grace.moore", "grace@example.com", "Grace", "Moore"),
        ("henry.taylor", "henry@example.com", "Henry", "Taylor"),
        ("irene.anderson", "irene@example.com", "Irene", "Anderson"),
        ("jack.thomas", "jack@example.com", "Jack", "Thomas"),
    ];

    table
        .into_iter()
        .map(|(user_name, email, first_name, last_name)| User {
            user_name: user_name.into(),
            email: email.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            ..User::default()
        })
        .collect()
}

fn addresses(user_ids: &[EntityId], rng: &mut SmallRng) -> Vec<Address> {
    let table: [(AddressKind, &str, &str, &str, &str, &str, Option<&str>); 6] = [
        (AddressKind::Personal, "Maple Avenue", "14", "Springfield", "62704", "US", None),
        (AddressKind::Shipping, "Keizersgracht", "221", "Amsterdam", "1016 DV", "NL", Some("2B")),
        (AddressKind::Billing, "Oak Street", "7", "Portland", "97205", "US", None),
        (AddressKind::Shipping, "Hauptstrasse", "89", "Berlin", "10827", "DE", None),
        (AddressKind::Personal, "Via Roma", "42", "Torino", "10121", "IT", Some("3")),
        (AddressKind::Billing, "Rue de Rivoli", "110", "Paris", "75001", "FR", None),
    ];

    table
        .into_iter()
        .map(
            |(kind, street, house_number, city, postal_code, country_iso, unit_number)| Address {
                user_ref: pick(user_ids, rng),
                kind,
                street: street.into(),
                house_number: house_number.into(),
                city: city.into(),
                postal_code: postal_code.into(),
                country_iso: country_iso.into(),
                unit_number: unit_number.map(Into::into),
                ..Address::default()
            },
        )
        .collect()
}

fn payment_details(user_ids: &[EntityId], now: Timestamp, rng: &mut SmallRng) -> Vec<PaymentDetail> {
    let table: [(u16, u64); 10] = [
        (8530, 2),
        (6394, 4),
        (2303, 4),
        (7863, 5),
        (975, 2),
        (1212, 2),
        (3465, 1),
        (7893, 1),
        (4234, 2),
        (4895, 5),
    ];

    table
        .into_iter()
        .map(|(last_four, years)| PaymentDetail {
            user_ref: pick(user_ids, rng),
            last_four,
            expires_at: now + years * MILLIS_PER_YEAR,
            gateway_token: Uuid::new_v4().to_string(),
            ..PaymentDetail::default()
        })
        .collect()
}

fn orders(user_ids: &[EntityId], rng: &mut SmallRng) -> Vec<Order> {
    (0..20)
        .map(|_| Order {
            user_ref: pick(user_ids, rng),
            status: OrderStatus::Pending,
            ..Order::default()
        })
        .collect()
}

fn order_items(
    order_ids: &[EntityId],
    coffee_prices: &[(EntityId, i64)],
    rng: &mut SmallRng,
) -> Vec<OrderItem> {
    order_ids
        .iter()
        .map(|&order_ref| {
            let (coffee_ref, unit_price_cents) = coffee_prices[rng.gen_range(0..coffee_prices.len())];
            OrderItem {
                order_ref,
                coffee_ref,
                quantity: rng.gen_range(1..=25),
                unit_price_cents,
                ..OrderItem::default()
            }
        })
        .collect()
}

fn pick(ids: &[EntityId], rng: &mut SmallRng) -> EntityId {
    ids[rng.gen_range(0..ids.len())]
}

/// Populate an empty store with the full demo dataset. Returns the
/// number of rows written.
///
/// Not idempotent: calling it against a non-empty store duplicates the
/// catalogs. Callers gate on an empty store.
pub async fn seed_store<S: EntityStore>(
    store: &S,
    now: Timestamp,
    rng_seed: u64,
) -> Result<usize> {
    let mut rng = SmallRng::seed_from_u64(rng_seed);
    let mut total = 0;

    let mut user_ids = Vec::new();
    for user in users() {
        let mut entity = Entity::from(user);
        entity.meta_mut().created_at = Some(now);
        user_ids.push(store.insert(&mut entity).await?);
        total += 1;
    }

    let mut coffee_prices = Vec::new();
    for coffee in coffees() {
        let price_cents = coffee.price_cents;
        let mut entity = Entity::from(coffee);
        entity.meta_mut().created_at = Some(now);
        let id = store.insert(&mut entity).await?;
        coffee_prices.push((id, price_cents));
        total += 1;
    }

    for address in addresses(&user_ids, &mut rng) {
        let mut entity = Entity::from(address);
        entity.meta_mut().created_at = Some(now);
        store.insert(&mut entity).await?;
        total += 1;
    }

    for payment in payment_details(&user_ids, now, &mut rng) {
        let mut entity = Entity::from(payment);
        entity.meta_mut().created_at = Some(now);
        store.insert(&mut entity).await?;
        total += 1;
    }

    let mut order_ids = Vec::new();
    for order in orders(&user_ids, &mut rng) {
        let mut entity = Entity::from(order);
        entity.meta_mut().created_at = Some(now);
        order_ids.push(store.insert(&mut entity).await?);
        total += 1;
    }

    for item in order_items(&order_ids, &coffee_prices, &mut rng) {
        let mut entity = Entity::from(item);
        entity.meta_mut().created_at = Some(now);
        store.insert(&mut entity).await?;
        total += 1;
    }

    Ok(total)
}
