// Shared fixtures for integration tests
#![allow(dead_code)]

use seating_optimizer::{Guest, OptimizationResult, RelationshipKind, Table};
use tracing_subscriber::EnvFilter;

/// Installs a test subscriber once; honors `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn confirmed(n: usize) -> Vec<Guest> {
    (0..n).map(|i| Guest::confirmed(format!("g{i}"))).collect()
}

pub fn tables(capacities: &[u32]) -> Vec<Table> {
    capacities
        .iter()
        .enumerate()
        .map(|(i, capacity)| Table::new(format!("t{i}"), *capacity))
        .collect()
}

/// Declares the relationship on both guests.
pub fn link(guests: &mut [Guest], a: &str, b: &str, kind: RelationshipKind, strength: u32) {
    for (from, to) in [(a, b), (b, a)] {
        if let Some(guest) = guests.iter_mut().find(|g| g.id == from) {
            *guest = guest.clone().with_relationship(to, kind, strength);
        }
    }
}

pub fn applied(guests: &[Guest], result: &OptimizationResult) -> Vec<Guest> {
    let mut guests = guests.to_vec();
    result.apply(&mut guests);
    guests
}

pub fn table_of<'a>(guests: &'a [Guest], id: &str) -> Option<&'a str> {
    guests.iter().find(|g| g.id == id).and_then(|g| g.table_id.as_deref())
}

pub fn occupancy(guests: &[Guest], table_id: &str) -> usize {
    guests.iter().filter(|g| g.table_id.as_deref() == Some(table_id)).count()
}

pub fn seated(guests: &[Guest]) -> usize {
    guests.iter().filter(|g| g.table_id.is_some()).count()
}

/// Avoid-linked pairs sharing a table, whichever side declared the link.
pub fn violations(guests: &[Guest]) -> Vec<(String, String)> {
    guests
        .iter()
        .flat_map(|guest| {
            guest
                .relationships
                .iter()
                .filter(|r| r.kind == RelationshipKind::Avoid)
                .map(move |r| (guest, r))
        })
        .filter(|(guest, r)| {
            let table = table_of(guests, &guest.id);
            table.is_some() && table == table_of(guests, &r.guest_id)
        })
        .map(|(guest, r)| (guest.id.clone(), r.guest_id.clone()))
        .collect()
}
