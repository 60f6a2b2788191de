//! Snapshot model for remote-authoritative party combat.
//!
//! The rules engine lives elsewhere; this crate only describes what the client
//! can observe about an encounter and the pure functions it runs over those
//! observations:
//!
//! - [`snapshot`] holds the immutable [`Snapshot`] and its rosters
//! - [`action`] describes the actions a hero may submit and their costs
//! - [`targeting`] decides which combatants are legal targets
//! - [`diff`] reconstructs "what happened" between two snapshots
//! - [`wire`] (feature `serde`) strictly decodes remote combat accounts
//!
//! Nothing in here computes damage, rolls randomness or mutates a snapshot.
pub mod action;
pub mod combatant;
pub mod diff;
pub mod snapshot;
pub mod status;
pub mod targeting;
pub mod types;

#[cfg(feature = "serde")]
pub mod wire;

pub use action::{ActionIntent, ActionKind, TargetRule};
pub use combatant::Combatant;
pub use diff::{DiffEngine, InferredAction, InferredEffect};
pub use snapshot::{InitiativeSlot, Resolution, Roster, RoundMarker, Snapshot, Turn};
pub use status::{StatusEffect, StatusInstance, format_statuses};
pub use targeting::{StaleTarget, TargetError, TargetResolution};
pub use types::{BattlerId, HERO_AP_MAX, MAX_INITIATIVE, MAX_ROSTER, MAX_STATUSES, Side};

#[cfg(feature = "serde")]
pub use wire::{DecodeError, RawCombat};
