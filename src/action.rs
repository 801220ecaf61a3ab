use std::ops::Add;
use thiserror::Error;
use crate::model::condition::{Id, Score};

pub type Index = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub table_index: Index,
    pub member_index: Index,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Seat { guest: Id, table_index: Index },
    Move { from: Position, to: Index },
    Swap(Position, Position),
    /// Unseats the guest at `from` and seats the waiting guest at
    /// `bench_index` in their place.
    Bench { from: Position, bench_index: Index },
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ActionError {
    #[error("Invalid position")]
    InvalidPosition,
    #[error("Table {0} has no free seat")]
    TableFull(Index),
    #[error("Both positions are at table {0}")]
    SameTable(Index),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ActionResult {
    ScoreDiff(Score),
    UnsatisfiedScoreDiff(Score),   // seats someone next to a guest they repel
    Failed(Vec<ActionError>),
}

impl ActionResult {
    pub fn failed(error: ActionError) -> Self {
        ActionResult::Failed(vec![error])
    }
}

impl Add for ActionResult {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        match (self, rhs) {
            (ActionResult::Failed(mut err1), ActionResult::Failed(err2)) => {
                err1.extend(err2);
                ActionResult::Failed(err1)
            }
            (failed @ ActionResult::Failed(_), _) | (_, failed @ ActionResult::Failed(_)) => failed,
            (ActionResult::ScoreDiff(s1), ActionResult::ScoreDiff(s2))
                => ActionResult::ScoreDiff(s1 + s2),
            (ActionResult::ScoreDiff(s1), ActionResult::UnsatisfiedScoreDiff(s2))
            | (ActionResult::UnsatisfiedScoreDiff(s1), ActionResult::ScoreDiff(s2))
            | (ActionResult::UnsatisfiedScoreDiff(s1), ActionResult::UnsatisfiedScoreDiff(s2))
                => ActionResult::UnsatisfiedScoreDiff(s1 + s2),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsatisfied_is_sticky() {
        let sum = ActionResult::ScoreDiff(2.0) + ActionResult::UnsatisfiedScoreDiff(-1.0);
        assert_eq!(sum, ActionResult::UnsatisfiedScoreDiff(1.0));
    }

    #[test]
    fn failures_win_and_accumulate() {
        let sum = ActionResult::failed(ActionError::TableFull(1)) + ActionResult::ScoreDiff(3.0);
        assert_eq!(sum, ActionResult::failed(ActionError::TableFull(1)));
        let sum = ActionResult::failed(ActionError::InvalidPosition) + ActionResult::failed(ActionError::SameTable(0));
        assert_eq!(
            sum,
            ActionResult::Failed(vec![ActionError::InvalidPosition, ActionError::SameTable(0)])
        );
    }
}
