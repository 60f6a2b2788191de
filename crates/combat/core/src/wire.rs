//! Strict decoding of the authority's combat account.
//!
//! The authority exposes its combat state as a JSON document. Decoding is
//! all-or-nothing: unknown fields, unknown status codes, out-of-range HP and
//! dangling initiative entries are rejected instead of being patched up, so a
//! shape change on the remote side fails loudly at the boundary.
use arrayvec::ArrayVec;
use serde::{Deserialize, Serialize};

use crate::combatant::Combatant;
use crate::snapshot::{InitiativeSlot, Resolution, Roster, RoundMarker, Snapshot, Turn};
use crate::status::{StatusEffect, StatusInstance};
use crate::types::{MAX_INITIATIVE, MAX_ROSTER, MAX_STATUSES, Side};

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("malformed combat document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{side} roster has {len} entries, at most {} allowed", MAX_ROSTER)]
    RosterOverflow { side: Side, len: usize },

    #[error("{side}#{index} has hp {hp} above max {max_hp}")]
    HpOutOfRange {
        side: Side,
        index: u8,
        hp: u16,
        max_hp: u16,
    },

    #[error("{side}#{index} carries more than {} statuses", MAX_STATUSES)]
    StatusOverflow { side: Side, index: u8 },

    #[error("{side}#{index} carries unknown status code {code}")]
    UnknownStatus { side: Side, index: u8, code: u8 },

    #[error("initiative has {len} slots, at most {} allowed", MAX_INITIATIVE)]
    InitiativeOverflow { len: usize },

    #[error("initiative slot points at {side}#{index} which is not on the roster")]
    InitiativeIndex { side: Side, index: u8 },

    #[error("encounter is pending but no initiative slot can act")]
    NoActor,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RawCombat {
    pub round: u32,
    pub turn_cursor: u8,
    pub rng_state: u64,
    pub heroes: Vec<RawCombatant>,
    pub enemies: Vec<RawCombatant>,
    pub initiative: Vec<RawInitiativeSlot>,
    pub resolution: RawResolution,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RawCombatant {
    pub alive: bool,
    pub hp: u16,
    pub max_hp: u16,
    pub ap: u8,
    pub max_ap: u8,
    #[serde(default)]
    pub statuses: Vec<RawStatus>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RawStatus {
    pub effect: u8,
    pub duration: i16,
    pub stacks: u8,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RawInitiativeSlot {
    pub occupant: RawOccupant,
    pub index: u8,
    pub active: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RawOccupant {
    Hero,
    Enemy,
    None,
}

impl RawOccupant {
    const fn side(self) -> Option<Side> {
        match self {
            RawOccupant::Hero => Some(Side::Heroes),
            RawOccupant::Enemy => Some(Side::Enemies),
            RawOccupant::None => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RawResolution {
    Active,
    Victory,
    Defeat,
    Escape,
}

impl From<RawResolution> for Resolution {
    fn from(raw: RawResolution) -> Self {
        match raw {
            RawResolution::Active => Resolution::PENDING,
            RawResolution::Victory => Resolution::victory(),
            RawResolution::Defeat | RawResolution::Escape => Resolution::defeat(),
        }
    }
}

impl Snapshot {
    pub fn from_json(bytes: &[u8]) -> Result<Self, DecodeError> {
        let raw: RawCombat = serde_json::from_slice(bytes)?;
        Snapshot::try_from(raw)
    }
}

impl TryFrom<RawCombat> for Snapshot {
    type Error = DecodeError;

    fn try_from(raw: RawCombat) -> Result<Self, Self::Error> {
        let heroes = decode_roster(Side::Heroes, raw.heroes)?;
        let enemies = decode_roster(Side::Enemies, raw.enemies)?;

        if raw.initiative.len() > MAX_INITIATIVE {
            return Err(DecodeError::InitiativeOverflow {
                len: raw.initiative.len(),
            });
        }
        for slot in &raw.initiative {
            if let Some(side) = slot.occupant.side() {
                let roster_len = match side {
                    Side::Heroes => heroes.len(),
                    Side::Enemies => enemies.len(),
                };
                if usize::from(slot.index) >= roster_len {
                    return Err(DecodeError::InitiativeIndex {
                        side,
                        index: slot.index,
                    });
                }
            }
        }

        let resolution = Resolution::from(raw.resolution);
        let turn = match derive_turn(&raw.initiative, raw.turn_cursor) {
            Some(turn) => turn,
            None if resolution.pending => return Err(DecodeError::NoActor),
            None => Turn::local(0),
        };

        let initiative: ArrayVec<InitiativeSlot, MAX_INITIATIVE> = raw
            .initiative
            .iter()
            .filter_map(|slot| {
                let side = slot.occupant.side()?;
                Some(InitiativeSlot::new(side, slot.index, slot.active))
            })
            .collect();

        Ok(Snapshot {
            heroes,
            enemies,
            turn,
            resolution,
            initiative,
            marker: RoundMarker::new(raw.round, raw.rng_state, raw.turn_cursor),
        })
    }
}

/// The actor is the first active, occupied slot at or after the cursor,
/// wrapping around the end of the queue.
fn derive_turn(initiative: &[RawInitiativeSlot], cursor: u8) -> Option<Turn> {
    if initiative.is_empty() {
        return None;
    }
    let start = usize::from(cursor).min(initiative.len() - 1);

    initiative
        .iter()
        .cycle()
        .skip(start)
        .take(initiative.len())
        .find_map(|slot| match slot.occupant.side() {
            Some(side) if slot.active => Some(Turn {
                is_local_side: side.is_local(),
                actor_index: slot.index,
            }),
            _ => None,
        })
}

fn decode_roster(side: Side, raw: Vec<RawCombatant>) -> Result<Roster, DecodeError> {
    if raw.len() > MAX_ROSTER {
        return Err(DecodeError::RosterOverflow {
            side,
            len: raw.len(),
        });
    }

    let mut roster = Roster::new();
    for (position, combatant) in raw.into_iter().enumerate() {
        // Bounded by MAX_ROSTER above.
        let index = position as u8;
        roster.push(decode_combatant(side, index, combatant)?);
    }
    Ok(roster)
}

fn decode_combatant(side: Side, index: u8, raw: RawCombatant) -> Result<Combatant, DecodeError> {
    if raw.hp > raw.max_hp {
        return Err(DecodeError::HpOutOfRange {
            side,
            index,
            hp: raw.hp,
            max_hp: raw.max_hp,
        });
    }

    let mut statuses = ArrayVec::<StatusInstance, MAX_STATUSES>::new();
    for status in raw.statuses {
        let effect = StatusEffect::from_code(status.effect).ok_or(DecodeError::UnknownStatus {
            side,
            index,
            code: status.effect,
        })?;
        let Some(effect) = effect else {
            continue;
        };
        statuses
            .try_push(StatusInstance::new(effect, status.duration, status.stacks))
            .map_err(|_| DecodeError::StatusOverflow { side, index })?;
    }

    Ok(Combatant {
        index,
        alive: raw.alive,
        hp: raw.hp,
        max_hp: raw.max_hp,
        ap: raw.ap,
        max_ap: raw.max_ap,
        statuses,
    })
}
