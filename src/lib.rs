//! Seating optimizer for event guest lists.
//!
//! Places RSVP-confirmed guests at tables so that relationship bonds are
//! rewarded (partners, family, friends, colleagues, preferences) or avoided
//! ("keep apart"), never exceeding a table's capacity.
//!
//! The optimizer is a pure function of its inputs: it reads a snapshot of
//! guests, tables and constraints and returns an [`OptimizationResult`]
//! describing the new seating. Applying the result is left to the caller.
//!
//! ```
//! use seating_optimizer::{optimize, Guest, RelationshipKind, Table};
//!
//! let mut guests = vec![
//!     Guest::confirmed("ana").with_relationship("ben", RelationshipKind::Partner, 5),
//!     Guest::confirmed("ben"),
//! ];
//! let tables = vec![Table::new("t1", 8), Table::new("t2", 8)];
//!
//! let result = optimize(&guests, &tables);
//! assert_eq!(result.newly_seated, 2);
//! assert!(result.after_score > result.before_score);
//!
//! result.apply(&mut guests);
//! assert_eq!(guests[0].table_id, guests[1].table_id);
//! ```

mod action;
mod anneal;
mod cache;
mod config;
mod graph;
mod model;
mod optimizer;
mod placement;
mod score;

pub use config::{AnnealParams, ConstraintWeights, OptimizerConfig};
pub use model::condition::{Bond, Id, Polarity, RelationGraph, Roster, Score};
pub use model::entity::{
    Constraint, ConstraintKind, ConstraintPriority, Event, Guest, GuestId, Relationship, RelationshipKind,
    RsvpStatus, Table, TableId,
};
pub use model::group::Arrangement;
pub use optimizer::{optimize, optimize_event, OptimizationResult, Optimizer, SeatAssignment};
pub use score::score_arrangement;
