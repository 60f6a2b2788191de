//! Per-combatant view carried in every snapshot.
use arrayvec::ArrayVec;

use crate::action::ActionKind;
use crate::status::{StatusEffect, StatusInstance};
use crate::types::MAX_STATUSES;

/// A hero or enemy as last reported by the authority.
///
/// Invariant: `hp <= max_hp`. Enforced by the wire decoder; constructors clamp.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Combatant {
    pub index: u8,
    pub alive: bool,
    pub hp: u16,
    pub max_hp: u16,
    pub ap: u8,
    pub max_ap: u8,
    pub statuses: ArrayVec<StatusInstance, MAX_STATUSES>,
}

impl Combatant {
    pub fn new(index: u8, hp: u16, max_hp: u16) -> Self {
        let hp = hp.min(max_hp);
        Self {
            index,
            alive: hp > 0,
            hp,
            max_hp,
            ap: 0,
            max_ap: 0,
            statuses: ArrayVec::new(),
        }
    }

    pub fn with_ap(mut self, ap: u8, max_ap: u8) -> Self {
        self.max_ap = max_ap;
        self.ap = ap.min(max_ap);
        self
    }

    /// Adds a status slot. Slots beyond [`MAX_STATUSES`] are dropped.
    pub fn with_status(mut self, status: StatusInstance) -> Self {
        let _ = self.statuses.try_push(status);
        self
    }

    pub fn defeated(mut self) -> Self {
        self.alive = false;
        self.hp = 0;
        self
    }

    pub fn active_statuses(&self) -> impl Iterator<Item = &StatusInstance> {
        self.statuses.iter().filter(|s| s.is_active())
    }

    pub fn has_status(&self, effect: StatusEffect) -> bool {
        self.active_statuses().any(|s| s.effect == effect)
    }

    pub fn is_guarded(&self) -> bool {
        self.has_status(StatusEffect::Guard)
    }

    /// AP the authority will grant at the start of this combatant's turn.
    ///
    /// Chill suppresses regeneration; the dead never regain AP.
    pub fn pending_ap_gain(&self) -> u8 {
        if !self.alive || self.ap >= self.max_ap || self.has_status(StatusEffect::Chill) {
            0
        } else {
            1
        }
    }

    /// Current AP plus pending regeneration, capped at the maximum.
    pub fn effective_ap(&self) -> u8 {
        self.ap
            .saturating_add(self.pending_ap_gain())
            .min(self.max_ap)
    }

    pub fn can_afford(&self, action: ActionKind) -> bool {
        action.cost() <= self.effective_ap()
    }
}
