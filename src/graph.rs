use std::collections::HashMap;

use itertools::Itertools;
use tracing::{debug, trace};

use crate::config::OptimizerConfig;
use crate::model::condition::{pair_key, Bond, Id, Polarity, RelationGraph, Roster};
use crate::model::entity::{Constraint, Guest};

impl RelationGraph {
    /// Builds the bond graph over confirmed guests. Relationships to guests
    /// that are missing or not confirmed are dropped, as are constraint kinds
    /// without a pairwise meaning.
    pub fn build(guests: &[Guest], constraints: &[Constraint], config: &OptimizerConfig) -> RelationGraph {
        let mut roster = Roster::default();
        for guest in guests.iter().filter(|g| g.is_confirmed()) {
            if roster.push(&guest.id).is_none() {
                debug!(guest_id = %guest.id, "duplicate guest id ignored");
            }
        }

        let mut bonds: HashMap<(Id, Id), Bond> = HashMap::new();
        let mut add = |ids: [Id; 2], bond: Bond| {
            bonds
                .entry(pair_key(ids))
                .and_modify(|existing| *existing = existing.merge(bond))
                .or_insert(bond);
        };

        for guest in guests.iter().filter(|g| g.is_confirmed()) {
            let Some(from) = roster.id_of(&guest.id) else { continue };
            for relationship in &guest.relationships {
                let Some(polarity) = relationship.kind.polarity() else {
                    trace!(guest_id = %guest.id, "relationship of unknown kind ignored");
                    continue;
                };
                match roster.id_of(&relationship.guest_id) {
                    Some(to) if to != from => add([from, to], Bond::new(polarity, relationship.strength.max(1))),
                    Some(_) => trace!(guest_id = %guest.id, "self relationship ignored"),
                    None => trace!(
                        guest_id = %guest.id,
                        target = %relationship.guest_id,
                        "relationship to unseatable guest ignored"
                    ),
                }
            }
        }

        for constraint in constraints {
            let Some(polarity) = constraint.kind.polarity() else {
                debug!(constraint_id = %constraint.id, kind = ?constraint.kind, "constraint has no pairwise form");
                continue;
            };
            let weight = config.constraint_weights.weight(constraint.priority).max(1);
            let members = constraint
                .guest_ids
                .iter()
                .filter_map(|guest_id| roster.id_of(guest_id))
                .unique()
                .collect_vec();
            for pair in members.iter().combinations(2) {
                add([*pair[0], *pair[1]], Bond::new(polarity, weight));
            }
        }

        debug!(guests = roster.len(), bonds = bonds.len(), "relation graph built");
        RelationGraph {
            roster,
            bonds,
            default: config.unrelated_pair_score,
        }
    }

    /// Groups the roster into affinity clusters. Affinity bonds are merged
    /// heaviest first, and two clusters are never merged across a repulsion
    /// bond. Each cluster is sorted; clusters are ordered by first member.
    pub fn clusters(&self) -> Vec<Vec<Id>> {
        let n = self.roster.len();
        let mut root: Vec<usize> = (0..n).collect();
        let mut members: Vec<Vec<Id>> = (0..n as Id).map(|id| vec![id]).collect();

        let edges = self
            .bonds
            .iter()
            .filter(|(_, bond)| bond.polarity == Polarity::Affinity)
            .sorted_by(|(ka, a), (kb, b)| b.weight.cmp(&a.weight).then(ka.cmp(kb)))
            .map(|(key, _)| *key)
            .collect_vec();

        for (a, b) in edges {
            let (ra, rb) = (root[a as usize], root[b as usize]);
            if ra == rb {
                continue;
            }
            let conflict = members[ra]
                .iter()
                .cartesian_product(members[rb].iter())
                .any(|(x, y)| self.is_repelled([*x, *y]));
            if conflict {
                trace!(a, b, "affinity bond crosses a repulsion, clusters kept apart");
                continue;
            }
            let moved = std::mem::take(&mut members[rb]);
            for id in &moved {
                root[*id as usize] = ra;
            }
            members[ra].extend(moved);
        }

        members
            .into_iter()
            .filter(|cluster| !cluster.is_empty())
            .map(|mut cluster| {
                cluster.sort_unstable();
                cluster
            })
            .sorted_by_key(|cluster| cluster[0])
            .collect()
    }

    /// Total affinity weight among the given guests.
    pub(crate) fn internal_affinity(&self, ids: &[Id]) -> u64 {
        ids.iter()
            .tuple_combinations()
            .filter_map(|(a, b)| self.bond([*a, *b]))
            .filter(|bond| bond.polarity == Polarity::Affinity)
            .map(|bond| u64::from(bond.weight))
            .sum()
    }
}
