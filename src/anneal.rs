use std::cmp::Ordering;
use std::collections::HashMap;

use rand::prelude::{Rng, SeedableRng, SliceRandom};
use rand::rngs::SmallRng;
use tracing::{debug, warn};

use crate::model::condition::{Id, RelationGraph, Score};
use crate::config::AnnealParams;
use crate::action::{Action, ActionResult, Position, Index};
use crate::cache::SeatingCache;

const MOVE_PROBABILITY: f64 = 0.3;
const BENCH_PROBABILITY: f64 = 0.2;
const EPSILON: Score = 1e-9;

struct State {
    cache: SeatingCache,
    conflicts: usize,
    n_iterations: usize,
    temperature: f64,
}

struct ActionGenerator {
    n_tables: Index,
    candidates: Vec<Position>,
    single_table: bool,
    rng: SmallRng,
}

impl ActionGenerator {
    fn new(n_tables: Index, seed: u64) -> ActionGenerator {
        ActionGenerator {
            n_tables,
            candidates: Vec::new(),
            single_table: true,
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    fn init(&mut self, cache: &SeatingCache) {
        self.candidates = cache.tables
            .iter().enumerate()
            .flat_map(
                |(table_index, table)| {
                    (0..table.members.len()).map(move |member_index| Position { table_index, member_index })
                }
            )
            .collect();
        self.single_table = cache.tables.iter().filter(|t| !t.members.is_empty()).count() < 2;
        self.candidates.shuffle(&mut self.rng);
    }

    fn pop(&mut self, cache: &SeatingCache) -> Option<Position> {
        if self.candidates.is_empty() {
            self.init(cache);
        }
        self.candidates.pop()
    }

    /// Positions may be stale after earlier actions; the cache rejects those.
    /// Waiting guests are only offered while `repairing`.
    fn next(&mut self, cache: &SeatingCache, repairing: bool) -> Option<Action> {
        let pos1 = self.pop(cache)?;
        if repairing && !cache.bench.is_empty() && self.rng.gen_bool(BENCH_PROBABILITY) {
            let bench_index = self.rng.gen_range(0..cache.bench.len());
            return Some(Action::Bench { from: pos1, bench_index });
        }
        if self.single_table || self.rng.gen_bool(MOVE_PROBABILITY) {
            let to = self.rng.gen_range(0..self.n_tables);
            return Some(Action::Move { from: pos1, to });
        }
        for _ in 0..cache.seated_count() {
            let pos2 = self.pop(cache)?;
            if pos1.table_index != pos2.table_index {
                return Some(Action::Swap(pos1, pos2))
            }
        }
        None
    }

    /// Zero-gain proposals pass only if `neutral` is set.
    fn accept(&mut self, diff: Score, temperature: f64, neutral: bool) -> bool {
        if diff.abs() <= EPSILON {
            return neutral;
        }
        diff > 0.0 || (temperature > 0.0 && self.rng.gen::<f64>() < (diff / temperature).exp())
    }
}

/// Improves a complete seating with swaps, moves into free seats and, while
/// some guest sits next to someone they repel, exchanges with waiting guests.
/// Proposals are ranked by conflict count first, then by score: an action
/// that adds a conflict is never taken and one that removes a conflict always
/// is. Returns the best seating seen, with guests the search moved for no
/// gain sent back to their starting table.
pub(crate) fn refine(cache: SeatingCache, graph: &RelationGraph, params: &AnnealParams, seed: u64) -> SeatingCache {
    let n_tables = cache.tables.len();
    if n_tables < 2 || cache.seated_count() == 0 || graph.is_flat() {
        return cache;
    }

    let home: HashMap<Id, Index> = cache.seated().map(|(table_index, id)| (id, table_index)).collect();
    let mut generator = ActionGenerator::new(n_tables, seed);
    let conflicts = cache.conflicts(graph);
    let mut best = cache.clone();
    let mut best_conflicts = conflicts;
    let mut state = State { cache, conflicts, n_iterations: 0, temperature: params.temperature };
    let mut accepted = 0usize;

    while state.n_iterations < params.max_iterations {
        state.n_iterations += 1;
        state.temperature *= params.cooling_rate;

        let repairing = state.conflicts > 0;
        let Some(action) = generator.next(&state.cache, repairing) else { break };
        let diff = match state.cache.simulate(&action, graph) {
            ActionResult::ScoreDiff(diff) | ActionResult::UnsatisfiedScoreDiff(diff) => diff,
            ActionResult::Failed(_) => continue,
        };
        let conflict_diff = state.cache.conflict_diff(&action, graph);
        let take = match conflict_diff.cmp(&0) {
            Ordering::Less => true,
            Ordering::Greater => false,
            Ordering::Equal if matches!(action, Action::Bench { .. }) => false,
            Ordering::Equal => generator.accept(diff, state.temperature, repairing),
        };
        if !take {
            continue;
        }
        if let Err(err) = state.cache.act(action, graph) {
            warn!(%err, "simulated action failed to apply");
            break;
        }
        state.conflicts = state.conflicts.saturating_add_signed(conflict_diff);
        accepted += 1;
        if state.conflicts < best_conflicts
            || (state.conflicts == best_conflicts && state.cache.score > best.score + EPSILON)
        {
            best = state.cache.clone();
            best_conflicts = state.conflicts;
        }
    }

    debug!(
        iterations = state.n_iterations,
        accepted,
        last = state.cache.score,
        best = best.score,
        conflicts = best_conflicts,
        "refinement done"
    );
    settle(best, &home, graph)
}

/// Sends guests back to their `home` table wherever that costs no score and
/// seats nobody next to someone they repel.
fn settle(mut cache: SeatingCache, home: &HashMap<Id, Index>, graph: &RelationGraph) -> SeatingCache {
    let mut returned = 0usize;
    while let Some(action) = find_return(&cache, home, graph) {
        if let Err(err) = cache.act(action, graph) {
            warn!(%err, "return move failed to apply");
            break;
        }
        returned += 1;
    }
    if returned > 0 {
        debug!(returned, "idle moves undone");
    }
    cache
}

/// A move home, or a swap that sends two guests home, that loses no score.
fn find_return(cache: &SeatingCache, home: &HashMap<Id, Index>, graph: &RelationGraph) -> Option<Action> {
    for (table_index, table) in cache.tables.iter().enumerate() {
        for (member_index, member) in table.members.iter().enumerate() {
            let Some(&to) = home.get(&member.id) else { continue };
            if to == table_index {
                continue;
            }
            let from = Position { table_index, member_index };
            let swaps = cache.tables[to].members.iter().enumerate()
                .filter(|(_, other)| home.get(&other.id) == Some(&table_index))
                .map(|(other_index, _)| Action::Swap(from, Position { table_index: to, member_index: other_index }));
            let found = std::iter::once(Action::Move { from, to })
                .chain(swaps)
                .find(|action| matches!(cache.simulate(action, graph), ActionResult::ScoreDiff(diff) if diff > -EPSILON));
            if found.is_some() {
                return found;
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OptimizerConfig;
    use crate::model::entity::{Guest, RelationshipKind};

    fn seat(cache: &mut SeatingCache, graph: &RelationGraph, seats: &[(u32, Index)]) {
        for (guest, table_index) in seats {
            cache.act(Action::Seat { guest: *guest, table_index: *table_index }, graph).unwrap();
        }
    }

    #[test]
    fn swaps_partners_together() {
        // 0-1 and 2-3 partners, seated crosswise
        let guests = vec![
            Guest::confirmed("a").with_relationship("b", RelationshipKind::Partner, 5),
            Guest::confirmed("b"),
            Guest::confirmed("c").with_relationship("d", RelationshipKind::Partner, 5),
            Guest::confirmed("d"),
        ];
        let graph = RelationGraph::build(&guests, &[], &OptimizerConfig::default());
        let mut cache = SeatingCache::new([2, 2]);
        seat(&mut cache, &graph, &[(0, 0), (2, 0), (1, 1), (3, 1)]);
        assert_eq!(cache.score, 0.0);

        let best = refine(cache, &graph, &AnnealParams::default(), 7);
        assert_eq!(best.score, 10.0);
        assert_eq!(best.seated_count(), 4);
    }

    #[test]
    fn never_seats_rivals_together() {
        let guests = vec![
            Guest::confirmed("a")
                .with_relationship("b", RelationshipKind::Friend, 1)
                .with_relationship("c", RelationshipKind::Avoid, 1),
            Guest::confirmed("b"),
            Guest::confirmed("c").with_relationship("b", RelationshipKind::Friend, 5),
        ];
        let graph = RelationGraph::build(&guests, &[], &OptimizerConfig::default());
        let mut cache = SeatingCache::new([3, 3]);
        seat(&mut cache, &graph, &[(0, 0), (1, 0), (2, 1)]);

        let best = refine(cache, &graph, &AnnealParams::default(), 1);
        for table in &best.tables {
            let ids = table.ids();
            assert!(!(ids.contains(&0) && ids.contains(&2)));
        }
        assert_eq!(best.score, 5.0);
    }

    #[test]
    fn flat_graph_is_left_alone() {
        let guests = vec![Guest::confirmed("a"), Guest::confirmed("b")];
        let graph = RelationGraph::build(&guests, &[], &OptimizerConfig::default());
        let mut cache = SeatingCache::new([2, 2]);
        seat(&mut cache, &graph, &[(0, 0), (1, 1)]);
        let best = refine(cache, &graph, &AnnealParams::default(), 3);
        assert_eq!(best.tables[0].ids(), vec![0]);
        assert_eq!(best.tables[1].ids(), vec![1]);
    }

    #[test]
    fn repairs_conflict_through_neutral_swap() {
        // a is avoided by b, c and d; a lands next to d at the larger table
        let guests = vec![
            Guest::confirmed("a")
                .with_relationship("c", RelationshipKind::Avoid, 1)
                .with_relationship("d", RelationshipKind::Avoid, 1),
            Guest::confirmed("b").with_relationship("a", RelationshipKind::Avoid, 1),
            Guest::confirmed("c"),
            Guest::confirmed("d"),
        ];
        let graph = RelationGraph::build(&guests, &[], &OptimizerConfig::default());
        let mut cache = SeatingCache::new([3, 2]);
        seat(&mut cache, &graph, &[(0, 0), (1, 1), (2, 1), (3, 0)]);
        assert_eq!(cache.conflicts(&graph), 1);

        let best = refine(cache, &graph, &AnnealParams::default(), 11);
        assert_eq!(best.conflicts(&graph), 0);
        assert_eq!(best.seated_count(), 4);
        assert_eq!(best.score, 0.0);
    }

    #[test]
    fn waiting_guest_replaces_conflicted_one() {
        // a, b and c all avoid each other; d avoids a and waits
        let guests = vec![
            Guest::confirmed("a")
                .with_relationship("b", RelationshipKind::Avoid, 1)
                .with_relationship("c", RelationshipKind::Avoid, 1)
                .with_relationship("d", RelationshipKind::Avoid, 1),
            Guest::confirmed("b").with_relationship("c", RelationshipKind::Avoid, 1),
            Guest::confirmed("c"),
            Guest::confirmed("d"),
        ];
        let graph = RelationGraph::build(&guests, &[], &OptimizerConfig::default());
        let mut cache = SeatingCache::new([2, 1]);
        seat(&mut cache, &graph, &[(0, 0), (2, 0), (1, 1)]);
        cache.bench = vec![3];

        let best = refine(cache, &graph, &AnnealParams::default(), 5);
        assert_eq!(best.conflicts(&graph), 0);
        assert_eq!(best.seated_count(), 3);
        assert_eq!(best.bench.len(), 1);
    }

    #[test]
    fn settle_returns_idle_guests() {
        let guests = vec![
            Guest::confirmed("a").with_relationship("b", RelationshipKind::Partner, 5),
            Guest::confirmed("b"),
            Guest::confirmed("y"),
        ];
        let graph = RelationGraph::build(&guests, &[], &OptimizerConfig::default());
        let mut cache = SeatingCache::new([2, 3]);
        seat(&mut cache, &graph, &[(1, 1), (0, 1), (2, 1)]);
        let home = HashMap::from([(0, 0), (1, 1), (2, 0)]);

        let settled = settle(cache, &home, &graph);
        assert_eq!(settled.tables[0].ids(), vec![2]);
        assert_eq!(settled.tables[1].ids(), vec![1, 0]);
        assert_eq!(settled.score, 5.0);
    }

    #[test]
    fn conflict_free_search_leaves_unrelated_guests() {
        let guests = vec![
            Guest::confirmed("a").with_relationship("b", RelationshipKind::Partner, 5),
            Guest::confirmed("b"),
            Guest::confirmed("x"),
            Guest::confirmed("y"),
            Guest::confirmed("z"),
        ];
        let graph = RelationGraph::build(&guests, &[], &OptimizerConfig::default());
        let mut cache = SeatingCache::new([2, 4]);
        seat(&mut cache, &graph, &[(0, 0), (2, 0), (1, 1), (3, 1), (4, 1)]);

        let best = refine(cache, &graph, &AnnealParams::default(), 9);
        assert_eq!(best.score, 5.0);
        let table_of = |id| best.seated().find(|(_, g)| *g == id).map(|(t, _)| t);
        assert_eq!(table_of(3), Some(1));
        assert_eq!(table_of(4), Some(1));
    }
}
