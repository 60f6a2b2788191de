//! Target legality and stale-target substitution.
use crate::snapshot::Snapshot;
use crate::types::{BattlerId, Side};

/// The chosen target is no longer alive or no longer scheduled.
///
/// Resolved locally by substitution; never shown to the player.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[error("target {target} is no longer a legal target")]
pub struct StaleTarget {
    pub target: BattlerId,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TargetError {
    #[error("no legal target remains on the {side} side")]
    NoLegalTarget { side: Side },
}

/// Outcome of resolving a desired target against a fresh snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TargetResolution {
    Kept(BattlerId),
    Substituted { stale: StaleTarget, target: BattlerId },
}

impl TargetResolution {
    pub const fn target(&self) -> BattlerId {
        match self {
            TargetResolution::Kept(target) => *target,
            TargetResolution::Substituted { target, .. } => *target,
        }
    }

    pub const fn stale(&self) -> Option<StaleTarget> {
        match self {
            TargetResolution::Kept(_) => None,
            TargetResolution::Substituted { stale, .. } => Some(*stale),
        }
    }
}

pub fn check_target(snapshot: &Snapshot, id: BattlerId) -> Result<BattlerId, StaleTarget> {
    if snapshot.is_legal_target(id) {
        Ok(id)
    } else {
        Err(StaleTarget { target: id })
    }
}

/// Keeps `desired` when it is still legal, otherwise falls back to the first
/// legal target on `side` in initiative order.
///
/// With no desired index the fallback is used directly.
pub fn resolve_target(
    snapshot: &Snapshot,
    side: Side,
    desired: Option<u8>,
) -> Result<TargetResolution, TargetError> {
    let stale = match desired.map(|index| check_target(snapshot, BattlerId::new(side, index))) {
        Some(Ok(target)) => return Ok(TargetResolution::Kept(target)),
        Some(Err(stale)) => Some(stale),
        None => None,
    };

    let fallback = snapshot
        .legal_targets(side)
        .next()
        .ok_or(TargetError::NoLegalTarget { side })?;

    Ok(match stale {
        Some(stale) => TargetResolution::Substituted {
            stale,
            target: fallback,
        },
        None => TargetResolution::Kept(fallback),
    })
}
