use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::anneal::refine;
use crate::config::OptimizerConfig;
use crate::model::condition::{RelationGraph, Score};
use crate::model::entity::{Constraint, Event, Guest, GuestId, Table, TableId};
use crate::model::group::Arrangement;
use crate::placement::{index_tables, place, retain};

/// New table and seat of one guest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatAssignment {
    pub guest_id: GuestId,
    pub table_id: Option<TableId>,
    pub seat_index: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationResult {
    pub before_score: Score,
    pub after_score: Score,
    /// Guests whose table changed, in input order.
    pub moved_guests: Vec<GuestId>,
    /// Guests that had no table before and have one now.
    pub newly_seated: usize,
    /// Every guest whose table or seat index changed.
    pub assignments: Vec<SeatAssignment>,
}

impl OptimizationResult {
    /// Writes the assignments back into the host's guest records.
    pub fn apply(&self, guests: &mut [Guest]) {
        let updates: HashMap<&str, &SeatAssignment> = self.assignments
            .iter()
            .map(|assignment| (assignment.guest_id.as_str(), assignment))
            .collect();
        for guest in guests.iter_mut() {
            if let Some(assignment) = updates.get(guest.id.as_str()) {
                guest.table_id = assignment.table_id.clone();
                guest.seat_index = assignment.seat_index;
            }
        }
    }

    pub fn is_unchanged(&self) -> bool {
        self.assignments.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Optimizer {
    config: OptimizerConfig,
}

impl Optimizer {
    pub fn new(config: OptimizerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// Computes a new seating for the confirmed guests. The inputs are not
    /// modified; apply the result with [`OptimizationResult::apply`].
    #[instrument(skip_all, fields(guests = guests.len(), tables = tables.len()))]
    pub fn run(&self, guests: &[Guest], tables: &[Table], constraints: &[Constraint]) -> OptimizationResult {
        let graph = RelationGraph::build(guests, constraints, &self.config);
        let before = Arrangement::from_guests(guests);
        let before_score = graph.score(&before);

        let table_index = index_tables(tables);
        let (mut layout, waiting) = retain(guests, tables, &table_index, &graph, &self.config);
        place(&mut layout.cache, &waiting, &graph);
        let cache = refine(layout.cache, &graph, &self.config.anneal, self.config.seed);

        let mut after = Arrangement::new();
        for (index, id) in cache.seated() {
            if let Some(guest_id) = graph.roster.guest_id(id) {
                after.assign(guest_id.clone(), tables[index].id.clone());
            }
        }
        for (guest_id, index) in &layout.held {
            after.assign(guest_id.clone(), tables[*index].id.clone());
        }
        let after_score = graph.score(&after);

        let result = report(guests, tables, &before, &after, before_score, after_score);
        info!(
            before_score = result.before_score,
            after_score = result.after_score,
            moved = result.moved_guests.len(),
            newly_seated = result.newly_seated,
            unseated = graph.roster.len() - cache.seated_count(),
            "seating optimized"
        );
        result
    }
}

/// Optimizes with the default configuration and no explicit constraints.
pub fn optimize(guests: &[Guest], tables: &[Table]) -> OptimizationResult {
    Optimizer::default().run(guests, tables, &[])
}

/// Optimizes an event, if there is one. A missing event yields an empty result.
pub fn optimize_event(event: Option<&Event>, config: &OptimizerConfig) -> OptimizationResult {
    match event {
        Some(event) => Optimizer::new(config.clone()).run(&event.guests, &event.tables, &event.constraints),
        None => {
            debug!("no event to optimize");
            OptimizationResult::default()
        }
    }
}

fn report(
    guests: &[Guest],
    tables: &[Table],
    before: &Arrangement,
    after: &Arrangement,
    before_score: Score,
    after_score: Score,
) -> OptimizationResult {
    let mut seen = HashSet::new();
    let mut moved_guests = Vec::new();
    let mut newly_seated = 0;
    for guest in guests {
        if !seen.insert(guest.id.as_str()) {
            continue;
        }
        let (was, now) = (before.table_of(&guest.id), after.table_of(&guest.id));
        if was != now {
            moved_guests.push(guest.id.clone());
        }
        if was.is_none() && now.is_some() {
            newly_seated += 1;
        }
    }

    let seats = seat_indices(guests, tables, after);
    let mut emitted = HashSet::new();
    let mut assignments = Vec::new();
    for guest in guests {
        let table_id = after.table_of(&guest.id);
        let seat_index = seats.get(guest.id.as_str()).copied();
        let changed = guest.table_id.as_ref() != table_id || guest.seat_index != seat_index;
        if changed && emitted.insert(guest.id.as_str()) {
            assignments.push(SeatAssignment {
                guest_id: guest.id.clone(),
                table_id: table_id.cloned(),
                seat_index,
            });
        }
    }

    OptimizationResult {
        before_score,
        after_score,
        moved_guests,
        newly_seated,
        assignments,
    }
}

/// Guests that stay at their table keep a valid seat index; the rest take the
/// lowest free one.
fn seat_indices<'a>(guests: &'a [Guest], tables: &[Table], after: &Arrangement) -> HashMap<&'a str, u32> {
    let mut capacity: HashMap<&str, u32> = HashMap::new();
    for table in tables {
        capacity.entry(table.id.as_str()).or_insert(table.capacity);
    }

    let mut taken: HashSet<(TableId, u32)> = HashSet::new();
    let mut seats = HashMap::new();
    for guest in guests {
        let Some(table_id) = after.table_of(&guest.id) else { continue };
        if seats.contains_key(guest.id.as_str()) || guest.table_id.as_ref() != Some(table_id) {
            continue;
        }
        let limit = capacity.get(table_id.as_str()).copied().unwrap_or(0);
        if let Some(index) = guest.seat_index.filter(|index| *index < limit) {
            if taken.insert((table_id.clone(), index)) {
                seats.insert(guest.id.as_str(), index);
            }
        }
    }

    for guest in guests {
        let Some(table_id) = after.table_of(&guest.id) else { continue };
        if seats.contains_key(guest.id.as_str()) {
            continue;
        }
        let limit = capacity.get(table_id.as_str()).copied().unwrap_or(0);
        if let Some(index) = (0..limit).find(|index| !taken.contains(&(table_id.clone(), *index))) {
            taken.insert((table_id.clone(), index));
            seats.insert(guest.id.as_str(), index);
        }
    }
    seats
}
