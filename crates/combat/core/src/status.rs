//! Status effects as reported by the remote authority.
//!
//! The client never ticks statuses itself. It only needs to know which ones are
//! currently in force (for display and the AP regen rule) and whether Guard
//! flipped on between two snapshots.
use core::fmt::Write;

/// Status effect kinds the authority can report.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display, strum::IntoStaticStr)]
pub enum StatusEffect {
    Poison,
    Bleed,
    Burn,
    Chill,
    Guard,
}

impl StatusEffect {
    /// Decodes the authority's numeric effect code.
    ///
    /// `0` is an empty slot and decodes to `None`; unknown codes are rejected
    /// by the caller.
    pub const fn from_code(code: u8) -> Option<Option<Self>> {
        match code {
            0 => Some(None),
            1 => Some(Some(StatusEffect::Poison)),
            2 => Some(Some(StatusEffect::Bleed)),
            3 => Some(Some(StatusEffect::Burn)),
            4 => Some(Some(StatusEffect::Chill)),
            5 => Some(Some(StatusEffect::Guard)),
            _ => None,
        }
    }

    pub const fn is_negative(self) -> bool {
        !matches!(self, StatusEffect::Guard)
    }
}

/// One status slot on a combatant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StatusInstance {
    pub effect: StatusEffect,
    pub duration: i16,
    pub stacks: u8,
}

impl StatusInstance {
    pub const fn new(effect: StatusEffect, duration: i16, stacks: u8) -> Self {
        Self {
            effect,
            duration,
            stacks,
        }
    }

    /// Expired or empty instances are kept by the authority but mean nothing.
    pub const fn is_active(&self) -> bool {
        self.duration > 0 && self.stacks > 0
    }
}

/// Human-readable summary of the active statuses, e.g. `"Poison x2, Guard"`.
pub fn format_statuses<'a>(statuses: impl IntoIterator<Item = &'a StatusInstance>) -> String {
    let mut out = String::new();
    for status in statuses.into_iter().filter(|s| s.is_active()) {
        if !out.is_empty() {
            out.push_str(", ");
        }
        let _ = write!(out, "{}", status.effect);
        if status.stacks > 1 {
            let _ = write!(out, " x{}", status.stacks);
        }
    }
    if out.is_empty() {
        out.push_str("None");
    }
    out
}
