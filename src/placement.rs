//! Constructive placement: keep valid existing seats, then seat affinity
//! clusters greedily.

use std::cmp::Ordering;
use std::collections::HashMap;

use itertools::Itertools;
use tracing::debug;

use crate::action::{Action, ActionResult, Index};
use crate::cache::SeatingCache;
use crate::config::OptimizerConfig;
use crate::model::condition::{Id, RelationGraph, Score};
use crate::model::entity::{Guest, GuestId, RsvpStatus, Table};

/// Seating state between the placement phases.
pub(crate) struct Layout {
    pub cache: SeatingCache,
    /// Pending guests left at their table, by table index.
    pub held: HashMap<GuestId, Index>,
}

/// Maps each table id to the index of its first occurrence.
pub(crate) fn index_tables(tables: &[Table]) -> HashMap<&str, Index> {
    let mut index = HashMap::new();
    for (table_index, table) in tables.iter().enumerate() {
        if index.contains_key(table.id.as_str()) {
            debug!(table_id = %table.id, "duplicate table id ignored");
            continue;
        }
        index.insert(table.id.as_str(), table_index);
    }
    index
}

/// Confirmed guests still needing a seat, in roster order.
#[derive(Debug, Default)]
pub(crate) struct Waiting {
    /// Guests that held a seat which could not be kept.
    pub displaced: Vec<Id>,
    pub unseated: Vec<Id>,
}

/// Builds the starting layout from the seats guests already hold.
pub(crate) fn retain(
    guests: &[Guest],
    tables: &[Table],
    table_index: &HashMap<&str, Index>,
    graph: &RelationGraph,
    config: &OptimizerConfig,
) -> (Layout, Waiting) {
    let lookup = |guest: &Guest| guest.table_id.as_deref().and_then(|t| table_index.get(t)).copied();

    let mut reserved = vec![0usize; tables.len()];
    let mut held = HashMap::new();
    if config.keep_pending_seated {
        for guest in guests.iter().filter(|g| g.rsvp_status == RsvpStatus::Pending) {
            let Some(index) = lookup(guest) else { continue };
            if held.contains_key(&guest.id) || reserved[index] >= tables[index].capacity as usize {
                continue;
            }
            reserved[index] += 1;
            held.insert(guest.id.clone(), index);
        }
    }

    let capacities = tables.iter().enumerate().map(|(index, table)| {
        if table_index.get(table.id.as_str()) == Some(&index) {
            (table.capacity as usize).saturating_sub(reserved[index])
        } else {
            0
        }
    });
    let mut cache = SeatingCache::new(capacities);

    let mut visited = vec![false; graph.roster.len()];
    let mut waiting = Waiting::default();
    for guest in guests.iter().filter(|g| g.is_confirmed()) {
        let Some(id) = graph.roster.id_of(&guest.id) else { continue };
        if std::mem::replace(&mut visited[id as usize], true) {
            continue;
        }
        let retained = match lookup(guest) {
            Some(index) => {
                let action = Action::Seat { guest: id, table_index: index };
                matches!(cache.simulate(&action, graph), ActionResult::ScoreDiff(_))
                    && cache.act(action, graph).is_ok()
            }
            None => false,
        };
        match (retained, &guest.table_id) {
            (true, _) => {}
            (false, Some(_)) => waiting.displaced.push(id),
            (false, None) => waiting.unseated.push(id),
        }
    }

    debug!(
        retained = cache.seated_count(),
        held = held.len(),
        displaced = waiting.displaced.len(),
        unseated = waiting.unseated.len(),
        "existing seats retained"
    );
    (Layout { cache, held }, waiting)
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    table_index: Index,
    satisfied: bool,
    diff: Score,
    free: usize,
}

impl Candidate {
    /// No repulsion first, then score gain, then emptier tables, then lower index.
    fn rank(&self, other: &Candidate) -> Ordering {
        self.satisfied.cmp(&other.satisfied)
            .then(self.diff.total_cmp(&other.diff))
            .then(self.free.cmp(&other.free))
            .then(other.table_index.cmp(&self.table_index))
    }

    fn from_result(table_index: Index, free: usize, result: ActionResult) -> Option<Candidate> {
        let (satisfied, diff) = match result {
            ActionResult::ScoreDiff(diff) => (true, diff),
            ActionResult::UnsatisfiedScoreDiff(diff) => (false, diff),
            ActionResult::Failed(_) => return None,
        };
        Some(Candidate { table_index, satisfied, diff, free })
    }
}

/// Seats every waiting guest that fits. Displaced guests go first so that a
/// re-run never trades a held seat for a new guest. Whoever is left waits on
/// the bench.
pub(crate) fn place(cache: &mut SeatingCache, waiting: &Waiting, graph: &RelationGraph) {
    place_group(cache, &waiting.displaced, graph);
    place_group(cache, &waiting.unseated, graph);

    let mut seated = vec![false; graph.roster.len()];
    cache.seated().for_each(|(_, id)| seated[id as usize] = true);
    cache.bench = waiting.displaced.iter()
        .chain(&waiting.unseated)
        .copied()
        .filter(|id| !seated[*id as usize])
        .collect();
}

/// Seats the given guests cluster by cluster. A guest with no conflict-free
/// seat waits until the rest of the group is placed.
fn place_group(cache: &mut SeatingCache, waiting: &[Id], graph: &RelationGraph) {
    let mut is_waiting = vec![false; graph.roster.len()];
    waiting.iter().for_each(|id| is_waiting[*id as usize] = true);

    let units = graph.clusters()
        .into_iter()
        .map(|cluster| cluster.into_iter().filter(|id| is_waiting[*id as usize]).collect_vec())
        .filter(|unit| !unit.is_empty())
        .map(|unit| (graph.internal_affinity(&unit), unit))
        .sorted_by(|(wa, a), (wb, b)| b.len().cmp(&a.len()).then(wb.cmp(wa)).then(a[0].cmp(&b[0])))
        .map(|(_, unit)| unit)
        .collect_vec();

    let mut split = 0;
    let mut deferred = Vec::new();
    for unit in &units {
        if place_whole(cache, unit, graph) {
            continue;
        }
        if unit.len() > 1 {
            split += 1;
        }
        deferred.extend(unit.iter().copied().filter(|id| !place_one(cache, *id, graph, false)));
    }
    for id in &deferred {
        place_one(cache, *id, graph, true);
    }
    debug!(
        units = units.len(),
        split,
        deferred = deferred.len(),
        seated = cache.seated_count(),
        free = cache.free_seats(),
        "greedy placement done"
    );
}

/// Seats the whole unit at one table if some table fits it without a
/// repulsion conflict.
fn place_whole(cache: &mut SeatingCache, unit: &[Id], graph: &RelationGraph) -> bool {
    let best = cache.tables.iter().enumerate()
        .filter(|(_, table)| table.free_seats() >= unit.len())
        .filter_map(|(table_index, table)| {
            let result = unit.iter()
                .map(|id| cache.simulate(&Action::Seat { guest: *id, table_index }, graph))
                .fold(ActionResult::ScoreDiff(0.0), |acc, r| acc + r);
            Candidate::from_result(table_index, table.free_seats(), result)
        })
        .max_by(|a, b| a.rank(b));

    match best {
        Some(candidate) if candidate.satisfied => {
            for id in unit {
                let action = Action::Seat { guest: *id, table_index: candidate.table_index };
                if cache.act(action, graph).is_err() {
                    return false;
                }
            }
            true
        }
        _ => false,
    }
}

/// Seats one guest at the best table. Unless `force` is set, a guest whose
/// best seat is next to someone they repel stays unseated. Returns whether
/// the guest was seated.
fn place_one(cache: &mut SeatingCache, id: Id, graph: &RelationGraph, force: bool) -> bool {
    let best = cache.tables.iter().enumerate()
        .filter(|(_, table)| table.free_seats() > 0)
        .filter_map(|(table_index, table)| {
            let result = cache.simulate(&Action::Seat { guest: id, table_index }, graph);
            Candidate::from_result(table_index, table.free_seats(), result)
        })
        .max_by(|a, b| a.rank(b));

    match best {
        Some(candidate) if candidate.satisfied || force => {
            match cache.act(Action::Seat { guest: id, table_index: candidate.table_index }, graph) {
                Ok(()) => true,
                Err(err) => {
                    debug!(%err, guest = id, "seat rejected");
                    false
                }
            }
        }
        _ => false,
    }
}
