use std::collections::BTreeMap;

use itertools::Itertools;

use crate::config::OptimizerConfig;
use crate::model::condition::{Id, RelationGraph, Score};
use crate::model::entity::{Guest, TableId};
use crate::model::group::Arrangement;

impl RelationGraph {
    /// Scores an arrangement: every co-seated pair of roster guests adds its
    /// bond score. Guests off the roster and unassigned guests add nothing.
    pub fn score(&self, arrangement: &Arrangement) -> Score {
        let mut by_table: BTreeMap<&TableId, Vec<Id>> = BTreeMap::new();
        for (id, guest_id) in self.roster.iter() {
            if let Some(table_id) = arrangement.table_of(guest_id) {
                by_table.entry(table_id).or_default().push(id);
            }
        }
        by_table.values().map(|ids| {
            ids.iter().combinations(2).map(|pair| self.get_pair([*pair[0], *pair[1]])).sum::<Score>()
        }).sum()
    }
}

/// Scores `arrangement` using the guests' own relationships and the default
/// configuration.
pub fn score_arrangement(guests: &[Guest], arrangement: &Arrangement) -> Score {
    RelationGraph::build(guests, &[], &OptimizerConfig::default()).score(arrangement)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::entity::{RelationshipKind, RsvpStatus};

    fn guests() -> Vec<Guest> {
        vec![
            Guest::confirmed("a")
                .with_relationship("b", RelationshipKind::Partner, 5)
                .with_relationship("c", RelationshipKind::Avoid, 3),
            Guest::confirmed("b").with_relationship("a", RelationshipKind::Partner, 5),
            Guest::confirmed("c"),
            Guest::new("d", RsvpStatus::Declined).with_relationship("a", RelationshipKind::Family, 4),
            Guest::confirmed("e"),
        ]
    }

    #[test]
    fn empty_input_scores_zero() {
        assert_eq!(score_arrangement(&[], &Arrangement::new()), 0.0);
        assert_eq!(score_arrangement(&guests(), &Arrangement::new()), 0.0);
    }

    #[test]
    fn affinity_adds_and_repulsion_subtracts() {
        let mut arrangement = Arrangement::new();
        arrangement.assign("a", "t1");
        arrangement.assign("b", "t1");
        assert_eq!(score_arrangement(&guests(), &arrangement), 5.0);

        arrangement.assign("c", "t1");
        assert_eq!(score_arrangement(&guests(), &arrangement), 2.0);

        arrangement.assign("c", "t2");
        assert_eq!(score_arrangement(&guests(), &arrangement), 5.0);
    }

    #[test]
    fn ineligible_and_unrelated_guests_add_nothing() {
        let mut arrangement = Arrangement::new();
        arrangement.assign("a", "t1");
        arrangement.assign("d", "t1");
        arrangement.assign("e", "t1");
        assert_eq!(score_arrangement(&guests(), &arrangement), 0.0);

        let config = OptimizerConfig { unrelated_pair_score: 0.5, ..OptimizerConfig::default() };
        let graph = RelationGraph::build(&guests(), &[], &config);
        assert_eq!(graph.score(&arrangement), 0.5);
    }

    #[test]
    fn scoring_is_deterministic() {
        let guests = guests();
        let arrangement = Arrangement::from_guests(&[
            Guest::confirmed("a").seated_at("t1"),
            Guest::confirmed("b").seated_at("t2"),
            Guest::confirmed("c").seated_at("t1"),
        ]);
        let first = score_arrangement(&guests, &arrangement);
        assert_eq!(first, -3.0);
        assert_eq!(score_arrangement(&guests, &arrangement), first);
    }
}
