//! Identity types shared across the snapshot model.
use core::fmt;

/// Maximum combatants per side.
pub const MAX_ROSTER: usize = 4;

/// Maximum entries in the initiative order (both sides).
pub const MAX_INITIATIVE: usize = MAX_ROSTER * 2;

/// Maximum status slots tracked per combatant.
pub const MAX_STATUSES: usize = 8;

/// Action point ceiling for heroes.
pub const HERO_AP_MAX: u8 = 3;

/// Which roster a combatant belongs to.
///
/// The local party is always [`Side::Heroes`].
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, strum::Display, strum::IntoStaticStr,
)]
#[strum(serialize_all = "lowercase")]
pub enum Side {
    Heroes,
    Enemies,
}

impl Side {
    /// The side driven by the local player.
    pub const LOCAL: Side = Side::Heroes;

    pub const fn opposite(self) -> Self {
        match self {
            Side::Heroes => Side::Enemies,
            Side::Enemies => Side::Heroes,
        }
    }

    pub const fn is_local(self) -> bool {
        matches!(self, Side::Heroes)
    }

    /// Single-letter prefix used in animation keys ("H0", "E2").
    pub const fn prefix(self) -> char {
        match self {
            Side::Heroes => 'H',
            Side::Enemies => 'E',
        }
    }
}

/// Stable identity of a combatant for the lifetime of an encounter.
///
/// Roster indices never shift between polls, so `(side, index)` is safe to use
/// as an arena key even though every snapshot is a fresh value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BattlerId {
    pub side: Side,
    pub index: u8,
}

impl BattlerId {
    pub const fn new(side: Side, index: u8) -> Self {
        Self { side, index }
    }

    pub const fn hero(index: u8) -> Self {
        Self::new(Side::Heroes, index)
    }

    pub const fn enemy(index: u8) -> Self {
        Self::new(Side::Enemies, index)
    }
}

impl fmt::Display for BattlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.side.prefix(), self.index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn battler_id_display_uses_side_prefix() {
        assert_eq!(BattlerId::hero(0).to_string(), "H0");
        assert_eq!(BattlerId::enemy(3).to_string(), "E3");
    }

    #[test]
    fn side_names_and_opposites() {
        assert_eq!(Side::Heroes.to_string(), "heroes");
        assert_eq!(Side::Enemies.opposite(), Side::Heroes);
        assert!(Side::LOCAL.is_local());
        assert!(!Side::Enemies.is_local());
    }
}
