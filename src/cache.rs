use itertools::Itertools;

use crate::model::condition::{Id, RelationGraph, Score};
use crate::action::{Index, Action, ActionResult, ActionError, Position};

#[derive(Debug, Clone)]
pub(crate) struct CachedGuest {
    pub id: Id,
    /// Sum of pair scores against current tablemates.
    pub score: Score,
}

impl CachedGuest {
    fn from_ids(id: Id, ids: &[Id], graph: &RelationGraph) -> CachedGuest {
        let score = ids.iter()
            .map(|other| graph.get_pair([id, *other]))
            .sum();
        CachedGuest { id, score }
    }
    fn broadcast_adding(&self, others: &mut [CachedGuest], graph: &RelationGraph) {
        others.iter_mut().for_each(|m| m.score += graph.get_pair([self.id, m.id]));
    }
    fn broadcast_removed(&self, others: &mut [CachedGuest], graph: &RelationGraph) {
        others.iter_mut().for_each(|m| m.score -= graph.get_pair([self.id, m.id]));
    }
}

/// One table with incrementally maintained pair scores.
#[derive(Debug, Clone)]
pub(crate) struct TableCache {
    pub capacity: usize,
    pub members: Vec<CachedGuest>,
    pub score: Score,
}

impl TableCache {
    fn new(capacity: usize) -> TableCache {
        TableCache { capacity, members: Vec::new(), score: 0.0 }
    }

    pub fn free_seats(&self) -> usize {
        self.capacity.saturating_sub(self.members.len())
    }

    pub fn ids(&self) -> Vec<Id> {
        self.members.iter().map(|m| m.id).collect()
    }

    fn score_with(&self, id: Id, except: Option<Id>, graph: &RelationGraph) -> Score {
        self.members.iter()
            .filter(|m| m.id != id && Some(m.id) != except)
            .map(|m| graph.get_pair([id, m.id]))
            .sum()
    }

    pub fn repels(&self, id: Id, except: Option<Id>, graph: &RelationGraph) -> bool {
        self.members.iter()
            .filter(|m| Some(m.id) != except)
            .any(|m| graph.is_repelled([id, m.id]))
    }

    /// Number of tablemates `id` repels, ignoring `except`.
    fn conflicts_with(&self, id: Id, except: Option<Id>, graph: &RelationGraph) -> isize {
        self.members.iter()
            .filter(|m| m.id != id && Some(m.id) != except)
            .filter(|m| graph.is_repelled([id, m.id]))
            .count() as isize
    }

    fn conflicts(&self, graph: &RelationGraph) -> usize {
        self.members.iter()
            .tuple_combinations()
            .filter(|(a, b)| graph.is_repelled([a.id, b.id]))
            .count()
    }

    fn simulate_seat(&self, index: Index, id: Id, graph: &RelationGraph) -> ActionResult {
        if self.free_seats() == 0 {
            return ActionResult::failed(ActionError::TableFull(index));
        }
        let score = self.score_with(id, None, graph);
        if self.repels(id, None, graph) {
            ActionResult::UnsatisfiedScoreDiff(score)
        } else {
            ActionResult::ScoreDiff(score)
        }
    }

    fn simulate_remove(&self, index: Index) -> ActionResult {
        match self.members.get(index) {
            Some(member) => ActionResult::ScoreDiff(-member.score),
            None => ActionResult::failed(ActionError::InvalidPosition),
        }
    }

    fn simulate_replace(&self, index: Index, id: Id, graph: &RelationGraph) -> ActionResult {
        if let Some(removed) = self.members.get(index) {
            let score = self.score_with(id, Some(removed.id), graph) - removed.score;
            if self.repels(id, Some(removed.id), graph) {
                ActionResult::UnsatisfiedScoreDiff(score)
            } else {
                ActionResult::ScoreDiff(score)
            }
        } else {
            ActionResult::failed(ActionError::InvalidPosition)
        }
    }

    fn seat(&mut self, index: Index, id: Id, graph: &RelationGraph) -> Result<(), ActionError> {
        if self.free_seats() == 0 {
            return Err(ActionError::TableFull(index));
        }
        let cache = CachedGuest::from_ids(id, &self.ids(), graph);
        cache.broadcast_adding(&mut self.members, graph);
        self.score += cache.score;
        self.members.push(cache);
        Ok(())
    }

    fn remove(&mut self, index: Index, graph: &RelationGraph) -> Result<Id, ActionError> {
        if self.members.len() <= index {
            return Err(ActionError::InvalidPosition);
        }
        let member = self.members.remove(index);
        member.broadcast_removed(&mut self.members, graph);
        self.score -= member.score;
        Ok(member.id)
    }

    fn replace(&mut self, index: Index, id: Id, graph: &RelationGraph) -> Result<Id, ActionError> {
        let removed = self.remove(index, graph)?;
        let cache = CachedGuest::from_ids(id, &self.ids(), graph);
        cache.broadcast_adding(&mut self.members, graph);
        self.score += cache.score;
        self.members.insert(index, cache);
        Ok(removed)
    }
}

/// Every table of a seating, with the running total score.
#[derive(Debug, Clone)]
pub(crate) struct SeatingCache {
    pub tables: Vec<TableCache>,
    /// Confirmed guests left without a seat.
    pub bench: Vec<Id>,
    pub score: Score,
}

impl SeatingCache {
    pub fn new(capacities: impl IntoIterator<Item = usize>) -> SeatingCache {
        let tables = capacities.into_iter().map(TableCache::new).collect();
        SeatingCache { tables, bench: Vec::new(), score: 0.0 }
    }

    pub fn get_member(&self, position: &Position) -> Option<&CachedGuest> {
        self.tables.get(position.table_index)?.members.get(position.member_index)
    }

    pub fn seated_count(&self) -> usize {
        self.tables.iter().map(|t| t.members.len()).sum()
    }

    pub fn free_seats(&self) -> usize {
        self.tables.iter().map(|t| t.free_seats()).sum()
    }

    /// `(table_index, guest)` for every seated guest.
    pub fn seated(&self) -> impl Iterator<Item = (Index, Id)> + '_ {
        self.tables.iter().enumerate()
            .flat_map(|(table_index, t)| t.members.iter().map(move |m| (table_index, m.id)))
    }

    /// Pairs of guests seated next to someone they repel.
    pub fn conflicts(&self, graph: &RelationGraph) -> usize {
        self.tables.iter().map(|t| t.conflicts(graph)).sum()
    }

    /// Change in [`SeatingCache::conflicts`] if `action` were taken. Actions
    /// that would fail count as zero.
    pub fn conflict_diff(&self, action: &Action, graph: &RelationGraph) -> isize {
        match action {
            Action::Seat { guest, table_index } => self.tables.get(*table_index)
                .map_or(0, |table| table.conflicts_with(*guest, None, graph)),
            Action::Move { from, to } => match (self.get_member(from), self.tables.get(*to)) {
                (Some(member), Some(table_to)) if from.table_index != *to => {
                    table_to.conflicts_with(member.id, None, graph)
                        - self.tables[from.table_index].conflicts_with(member.id, None, graph)
                }
                _ => 0,
            },
            Action::Swap(position1, position2) => match (self.get_member(position1), self.get_member(position2)) {
                (Some(member1), Some(member2)) if position1.table_index != position2.table_index => {
                    let table1 = &self.tables[position1.table_index];
                    let table2 = &self.tables[position2.table_index];
                    table1.conflicts_with(member2.id, Some(member1.id), graph)
                        + table2.conflicts_with(member1.id, Some(member2.id), graph)
                        - table1.conflicts_with(member1.id, None, graph)
                        - table2.conflicts_with(member2.id, None, graph)
                }
                _ => 0,
            },
            Action::Bench { from, bench_index } => match (self.get_member(from), self.bench.get(*bench_index)) {
                (Some(member), Some(waiting)) => {
                    let table = &self.tables[from.table_index];
                    table.conflicts_with(*waiting, Some(member.id), graph)
                        - table.conflicts_with(member.id, None, graph)
                }
                _ => 0,
            },
        }
    }

    pub fn simulate(&self, action: &Action, graph: &RelationGraph) -> ActionResult {
        match action {
            Action::Seat { guest, table_index } => {
                if let Some(table) = self.tables.get(*table_index) {
                    table.simulate_seat(*table_index, *guest, graph)
                } else {
                    ActionResult::failed(ActionError::InvalidPosition)
                }
            }
            Action::Move { from, to } => {
                if from.table_index == *to {
                    return ActionResult::failed(ActionError::SameTable(*to));
                }
                match (self.get_member(from), self.tables.get(*to)) {
                    (Some(member), Some(table_to)) => {
                        self.tables[from.table_index].simulate_remove(from.member_index)
                            + table_to.simulate_seat(*to, member.id, graph)
                    }
                    _ => ActionResult::failed(ActionError::InvalidPosition),
                }
            }
            Action::Swap(position1, position2) => {
                if position1.table_index == position2.table_index {
                    return ActionResult::failed(ActionError::SameTable(position1.table_index));
                }
                if let (Some(member1), Some(member2)) = (self.get_member(position1), self.get_member(position2)) {
                    self.tables[position1.table_index].simulate_replace(position1.member_index, member2.id, graph)
                        + self.tables[position2.table_index].simulate_replace(position2.member_index, member1.id, graph)
                } else {
                    ActionResult::failed(ActionError::InvalidPosition)
                }
            }
            Action::Bench { from, bench_index } => {
                match (self.tables.get(from.table_index), self.bench.get(*bench_index)) {
                    (Some(table), Some(waiting)) => table.simulate_replace(from.member_index, *waiting, graph),
                    _ => ActionResult::failed(ActionError::InvalidPosition),
                }
            }
        }
    }

    pub fn act(&mut self, action: Action, graph: &RelationGraph) -> Result<(), ActionError> {
        match action {
            Action::Seat { guest, table_index } => {
                let table = self.tables.get_mut(table_index).ok_or(ActionError::InvalidPosition)?;
                let prev_score = table.score;
                table.seat(table_index, guest, graph)?;
                self.score += table.score - prev_score;
                Ok(())
            }
            Action::Move { from, to } => {
                if from.table_index == to {
                    return Err(ActionError::SameTable(to));
                }
                if self.tables.get(to).ok_or(ActionError::InvalidPosition)?.free_seats() == 0 {
                    return Err(ActionError::TableFull(to));
                }
                let table_from = self.tables.get_mut(from.table_index).ok_or(ActionError::InvalidPosition)?;
                let mut score_diff = -table_from.score;
                let guest = table_from.remove(from.member_index, graph)?;
                score_diff += table_from.score;
                let table_to = &mut self.tables[to];
                score_diff -= table_to.score;
                table_to.seat(to, guest, graph)?;
                score_diff += table_to.score;
                self.score += score_diff;
                Ok(())
            }
            Action::Swap(position1, position2) => {
                if position1.table_index == position2.table_index {
                    return Err(ActionError::SameTable(position1.table_index));
                }
                let guest2 = self.get_member(&position2).ok_or(ActionError::InvalidPosition)?.id;
                let table1 = self.tables.get_mut(position1.table_index).ok_or(ActionError::InvalidPosition)?;
                let mut score_diff = -table1.score;
                let guest1 = table1.replace(position1.member_index, guest2, graph)?;
                score_diff += table1.score;
                let table2 = &mut self.tables[position2.table_index];
                score_diff -= table2.score;
                table2.replace(position2.member_index, guest1, graph)?;
                score_diff += table2.score;
                self.score += score_diff;
                Ok(())
            }
            Action::Bench { from, bench_index } => {
                let waiting = *self.bench.get(bench_index).ok_or(ActionError::InvalidPosition)?;
                let table = self.tables.get_mut(from.table_index).ok_or(ActionError::InvalidPosition)?;
                let prev_score = table.score;
                let unseated = table.replace(from.member_index, waiting, graph)?;
                self.score += table.score - prev_score;
                self.bench[bench_index] = unseated;
                Ok(())
            }
        }
    }
}
