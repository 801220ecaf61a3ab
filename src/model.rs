pub mod entity {
    use serde::{Deserialize, Serialize};

    use super::condition::Polarity;

    pub type GuestId = String;
    pub type TableId = String;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum RsvpStatus {
        #[default]
        Pending,
        Confirmed,
        Declined,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum RelationshipKind {
        Partner,
        Family,
        Friend,
        Colleague,
        #[serde(alias = "seat_together")]
        Prefer,
        #[serde(alias = "keep_apart")]
        Avoid,
        #[serde(other)]
        Unknown,
    }

    impl RelationshipKind {
        /// `None` for kinds the optimizer does not understand.
        pub fn polarity(&self) -> Option<Polarity> {
            match self {
                Self::Partner | Self::Family | Self::Friend | Self::Colleague | Self::Prefer => {
                    Some(Polarity::Affinity)
                }
                Self::Avoid => Some(Polarity::Repulsion),
                Self::Unknown => None,
            }
        }
    }

    fn default_strength() -> u32 {
        1
    }

    /// A link from the owning guest to `guest_id`.
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Relationship {
        pub guest_id: GuestId,
        #[serde(rename = "type")]
        pub kind: RelationshipKind,
        #[serde(default = "default_strength")]
        pub strength: u32,
    }

    impl Relationship {
        pub fn new(guest_id: impl Into<GuestId>, kind: RelationshipKind, strength: u32) -> Self {
            Self {
                guest_id: guest_id.into(),
                kind,
                strength,
            }
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Guest {
        pub id: GuestId,
        #[serde(default)]
        pub rsvp_status: RsvpStatus,
        #[serde(default)]
        pub relationships: Vec<Relationship>,
        #[serde(default)]
        pub table_id: Option<TableId>,
        #[serde(default)]
        pub seat_index: Option<u32>,
    }

    impl Guest {
        pub fn new(id: impl Into<GuestId>, rsvp_status: RsvpStatus) -> Self {
            Self {
                id: id.into(),
                rsvp_status,
                relationships: Vec::new(),
                table_id: None,
                seat_index: None,
            }
        }

        pub fn confirmed(id: impl Into<GuestId>) -> Self {
            Self::new(id, RsvpStatus::Confirmed)
        }

        pub fn with_relationship(mut self, guest_id: impl Into<GuestId>, kind: RelationshipKind, strength: u32) -> Self {
            self.relationships.push(Relationship::new(guest_id, kind, strength));
            self
        }

        pub fn seated_at(mut self, table_id: impl Into<TableId>) -> Self {
            self.table_id = Some(table_id.into());
            self
        }

        pub fn is_confirmed(&self) -> bool {
            self.rsvp_status == RsvpStatus::Confirmed
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Table {
        pub id: TableId,
        pub capacity: u32,
    }

    impl Table {
        pub fn new(id: impl Into<TableId>, capacity: u32) -> Self {
            Self { id: id.into(), capacity }
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum ConstraintKind {
        SameTable,
        DifferentTable,
        NearFront,
        #[serde(other)]
        Unsupported,
    }

    impl ConstraintKind {
        /// Only pairwise kinds feed the relation graph.
        pub fn polarity(&self) -> Option<Polarity> {
            match self {
                Self::SameTable => Some(Polarity::Affinity),
                Self::DifferentTable => Some(Polarity::Repulsion),
                Self::NearFront | Self::Unsupported => None,
            }
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum ConstraintPriority {
        Required,
        #[default]
        Preferred,
    }

    /// An explicit seating rule over a set of guests, independent of their
    /// per-guest relationships.
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Constraint {
        pub id: String,
        #[serde(rename = "type")]
        pub kind: ConstraintKind,
        #[serde(default)]
        pub guest_ids: Vec<GuestId>,
        #[serde(default)]
        pub priority: ConstraintPriority,
    }

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Event {
        #[serde(default)]
        pub guests: Vec<Guest>,
        #[serde(default)]
        pub tables: Vec<Table>,
        #[serde(default)]
        pub constraints: Vec<Constraint>,
    }
}


pub mod group {
    use std::collections::BTreeMap;

    use super::entity::{Guest, GuestId, TableId};

    /// Guest to table mapping at one point in time. Guests without an entry
    /// are unassigned.
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct Arrangement {
        seats: BTreeMap<GuestId, TableId>,
    }

    impl Arrangement {
        pub fn new() -> Self {
            Self::default()
        }

        /// Reads the current `table_id` of every guest. Later duplicates of an
        /// id do not override the first one.
        pub fn from_guests(guests: &[Guest]) -> Self {
            let mut seats = BTreeMap::new();
            for guest in guests {
                if let Some(table_id) = &guest.table_id {
                    seats.entry(guest.id.clone()).or_insert_with(|| table_id.clone());
                }
            }
            Self { seats }
        }

        pub fn assign(&mut self, guest_id: impl Into<GuestId>, table_id: impl Into<TableId>) {
            self.seats.insert(guest_id.into(), table_id.into());
        }

        pub fn table_of(&self, guest_id: &str) -> Option<&TableId> {
            self.seats.get(guest_id)
        }

        pub fn occupancy(&self, table_id: &str) -> usize {
            self.seats.values().filter(|t| t.as_str() == table_id).count()
        }
    }
}

pub mod condition {
    use std::collections::HashMap;

    use super::entity::GuestId;

    /// Dense index of a guest inside a [`Roster`].
    pub type Id = u32;
    pub type Score = f64;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub enum Polarity {
        Affinity,
        Repulsion,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Bond {
        pub polarity: Polarity,
        pub weight: u32,
    }

    impl Bond {
        pub fn new(polarity: Polarity, weight: u32) -> Self {
            Self { polarity, weight }
        }

        /// Repulsion dominates affinity; equal polarities keep the heavier weight.
        pub fn merge(self, other: Bond) -> Bond {
            match (self.polarity, other.polarity) {
                (a, b) if a == b => Bond::new(a, self.weight.max(other.weight)),
                (Polarity::Repulsion, _) => self,
                _ => other,
            }
        }

        pub fn score(&self) -> Score {
            match self.polarity {
                Polarity::Affinity => self.weight as Score,
                Polarity::Repulsion => -(self.weight as Score),
            }
        }
    }

    /// The guests eligible for seating, in input order.
    #[derive(Debug, Clone, Default)]
    pub struct Roster {
        ids: Vec<GuestId>,
        index: HashMap<GuestId, Id>,
    }

    impl Roster {
        /// Returns `None` if the id is already on the roster.
        pub fn push(&mut self, guest_id: &str) -> Option<Id> {
            if self.index.contains_key(guest_id) {
                return None;
            }
            let id = self.ids.len() as Id;
            self.ids.push(guest_id.to_string());
            self.index.insert(guest_id.to_string(), id);
            Some(id)
        }

        pub fn id_of(&self, guest_id: &str) -> Option<Id> {
            self.index.get(guest_id).copied()
        }

        pub fn guest_id(&self, id: Id) -> Option<&GuestId> {
            self.ids.get(id as usize)
        }

        pub fn len(&self) -> usize {
            self.ids.len()
        }

        pub fn is_empty(&self) -> bool {
            self.ids.is_empty()
        }

        pub fn iter(&self) -> impl Iterator<Item = (Id, &GuestId)> {
            self.ids.iter().enumerate().map(|(id, guest_id)| (id as Id, guest_id))
        }
    }

    pub(crate) fn pair_key(ids: [Id; 2]) -> (Id, Id) {
        if ids[0] <= ids[1] {
            (ids[0], ids[1])
        } else {
            (ids[1], ids[0])
        }
    }

    /// Undirected bonds between roster guests.
    #[derive(Debug, Clone, Default)]
    pub struct RelationGraph {
        pub roster: Roster,
        pub(crate) bonds: HashMap<(Id, Id), Bond>,
        pub default: Score,
    }

    impl RelationGraph {
        pub fn bond(&self, ids: [Id; 2]) -> Option<Bond> {
            self.bonds.get(&pair_key(ids)).copied()
        }

        pub fn get_pair(&self, ids: [Id; 2]) -> Score {
            if ids[0] == ids[1] {
                return 0.0;
            }
            self.bond(ids).map(|bond| bond.score()).unwrap_or(self.default)
        }

        pub fn is_repelled(&self, ids: [Id; 2]) -> bool {
            matches!(self.bond(ids), Some(Bond { polarity: Polarity::Repulsion, .. }))
        }

        /// Whether any seating change could alter the score.
        pub fn is_flat(&self) -> bool {
            self.bonds.is_empty() && self.default == 0.0
        }

        pub fn bond_count(&self) -> usize {
            self.bonds.len()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::condition::{Bond, Polarity, Roster};
    use super::entity::{Event, Guest, RelationshipKind, RsvpStatus};
    use super::group::Arrangement;

    #[test]
    fn repulsion_dominates_merge() {
        let affinity = Bond::new(Polarity::Affinity, 5);
        let repulsion = Bond::new(Polarity::Repulsion, 2);
        assert_eq!(affinity.merge(repulsion), repulsion);
        assert_eq!(repulsion.merge(affinity), repulsion);
        assert_eq!(affinity.merge(Bond::new(Polarity::Affinity, 3)).weight, 5);
    }

    #[test]
    fn deserializes_host_event() {
        let event: Event = serde_json::from_str(
            r#"{
                "guests": [
                    {"id": "a", "rsvpStatus": "confirmed", "tableId": "t1", "seatIndex": 0,
                     "relationships": [{"guestId": "b", "type": "keep_apart", "strength": 4}]},
                    {"id": "b", "rsvpStatus": "declined",
                     "relationships": [{"guestId": "a", "type": "nemesis"}]},
                    {"id": "c"}
                ],
                "tables": [{"id": "t1", "capacity": 8}],
                "constraints": [{"id": "k1", "type": "near_exit", "guestIds": ["a"]}]
            }"#,
        )
        .unwrap();

        assert_eq!(event.guests[0].relationships[0].kind, RelationshipKind::Avoid);
        assert_eq!(event.guests[1].relationships[0].kind, RelationshipKind::Unknown);
        assert_eq!(event.guests[1].relationships[0].strength, 1);
        assert_eq!(event.guests[2].rsvp_status, RsvpStatus::Pending);
        assert!(event.constraints[0].kind.polarity().is_none());
    }

    #[test]
    fn arrangement_keeps_first_duplicate() {
        let guests = vec![
            Guest::confirmed("a").seated_at("t1"),
            Guest::confirmed("a").seated_at("t2"),
            Guest::confirmed("b"),
        ];
        let arrangement = Arrangement::from_guests(&guests);
        assert_eq!(arrangement.table_of("a").map(String::as_str), Some("t1"));
        assert_eq!(arrangement.table_of("b"), None);
        assert_eq!(arrangement.occupancy("t1"), 1);
    }

    #[test]
    fn roster_lookups_are_total() {
        let mut roster = Roster::default();
        assert_eq!(roster.push("a"), Some(0));
        assert_eq!(roster.push("a"), None);
        assert_eq!(roster.guest_id(0).map(String::as_str), Some("a"));
        assert_eq!(roster.guest_id(7), None);
        assert_eq!(roster.id_of("z"), None);
    }
}
