//! The immutable encounter snapshot.
//!
//! A [`Snapshot`] is replaced wholesale on every poll. Nothing in the client
//! mutates one after it has been decoded; derived views (legal targets, the
//! current actor) are computed on demand.
use arrayvec::ArrayVec;

use crate::combatant::Combatant;
use crate::types::{BattlerId, MAX_INITIATIVE, MAX_ROSTER, Side};

pub type Roster = ArrayVec<Combatant, MAX_ROSTER>;

/// Whose turn it is.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Turn {
    pub is_local_side: bool,
    pub actor_index: u8,
}

impl Turn {
    pub const fn local(actor_index: u8) -> Self {
        Self {
            is_local_side: true,
            actor_index,
        }
    }

    pub const fn remote(actor_index: u8) -> Self {
        Self {
            is_local_side: false,
            actor_index,
        }
    }

    pub const fn side(&self) -> Side {
        if self.is_local_side {
            Side::LOCAL
        } else {
            Side::LOCAL.opposite()
        }
    }

    pub const fn actor(&self) -> BattlerId {
        BattlerId::new(self.side(), self.actor_index)
    }
}

/// Encounter outcome. `pending` stays true until the authority resolves it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Resolution {
    pub pending: bool,
    pub victory: bool,
}

impl Resolution {
    pub const PENDING: Self = Self {
        pending: true,
        victory: false,
    };

    pub const fn victory() -> Self {
        Self {
            pending: false,
            victory: true,
        }
    }

    pub const fn defeat() -> Self {
        Self {
            pending: false,
            victory: false,
        }
    }
}

/// One entry of the turn queue.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InitiativeSlot {
    pub side: Side,
    pub index: u8,
    pub active: bool,
}

impl InitiativeSlot {
    pub const fn new(side: Side, index: u8, active: bool) -> Self {
        Self {
            side,
            index,
            active,
        }
    }

    pub const fn battler(&self) -> BattlerId {
        BattlerId::new(self.side, self.index)
    }
}

/// Opaque change marker derived from the authority's round counter, RNG state
/// and turn cursor. Two snapshots with equal markers are treated as unchanged.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct RoundMarker {
    round: u32,
    rng: u64,
    cursor: u8,
}

impl RoundMarker {
    pub const fn new(round: u32, rng: u64, cursor: u8) -> Self {
        Self { round, rng, cursor }
    }

    pub const fn round(&self) -> u32 {
        self.round
    }
}

/// Full observable state of an encounter at one instant.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Snapshot {
    pub heroes: Roster,
    pub enemies: Roster,
    pub turn: Turn,
    pub resolution: Resolution,
    pub initiative: ArrayVec<InitiativeSlot, MAX_INITIATIVE>,
    pub marker: RoundMarker,
}

impl Snapshot {
    /// Builds a pending snapshot whose initiative lists heroes then enemies,
    /// with every living combatant active. Rosters beyond [`MAX_ROSTER`] are
    /// truncated.
    pub fn new(
        heroes: impl IntoIterator<Item = Combatant>,
        enemies: impl IntoIterator<Item = Combatant>,
        turn: Turn,
    ) -> Self {
        let heroes: Roster = heroes.into_iter().take(MAX_ROSTER).collect();
        let enemies: Roster = enemies.into_iter().take(MAX_ROSTER).collect();
        let initiative = heroes
            .iter()
            .map(|c| InitiativeSlot::new(Side::Heroes, c.index, c.alive))
            .chain(
                enemies
                    .iter()
                    .map(|c| InitiativeSlot::new(Side::Enemies, c.index, c.alive)),
            )
            .collect();

        Self {
            heroes,
            enemies,
            turn,
            resolution: Resolution::PENDING,
            initiative,
            marker: RoundMarker::default(),
        }
    }

    pub fn with_marker(mut self, marker: RoundMarker) -> Self {
        self.marker = marker;
        self
    }

    pub fn with_resolution(mut self, resolution: Resolution) -> Self {
        self.resolution = resolution;
        self
    }

    pub fn roster(&self, side: Side) -> &[Combatant] {
        match side {
            Side::Heroes => &self.heroes,
            Side::Enemies => &self.enemies,
        }
    }

    pub fn combatant(&self, id: BattlerId) -> Option<&Combatant> {
        self.roster(id.side).get(usize::from(id.index))
    }

    pub fn is_resolved(&self) -> bool {
        !self.resolution.pending
    }

    /// The single legal actor, if the encounter is still pending.
    pub fn actor(&self) -> Option<BattlerId> {
        if self.is_resolved() {
            return None;
        }
        let id = self.turn.actor();
        self.combatant(id).map(|_| id)
    }

    pub fn is_local_turn(&self) -> bool {
        self.actor().is_some_and(|id| id.side.is_local())
    }

    /// The local combatant whose input should be open, if any.
    pub fn local_actor(&self) -> Option<&Combatant> {
        let id = self.actor().filter(|id| id.side.is_local())?;
        self.combatant(id).filter(|c| c.alive)
    }

    /// Whether `side` may submit an action right now.
    pub fn may_submit(&self, side: Side) -> bool {
        self.actor().is_some_and(|id| id.side == side)
    }

    pub fn initiative_slot(&self, id: BattlerId) -> Option<&InitiativeSlot> {
        self.initiative.iter().find(|slot| slot.battler() == id)
    }

    pub fn is_initiative_active(&self, id: BattlerId) -> bool {
        self.initiative_slot(id).is_some_and(|slot| slot.active)
    }

    /// Alive and still scheduled in the initiative order.
    pub fn is_legal_target(&self, id: BattlerId) -> bool {
        self.combatant(id).is_some_and(|c| c.alive) && self.is_initiative_active(id)
    }

    /// Legal targets on `side`, in initiative order.
    pub fn legal_targets(&self, side: Side) -> impl Iterator<Item = BattlerId> + '_ {
        self.initiative
            .iter()
            .filter(move |slot| slot.side == side)
            .map(InitiativeSlot::battler)
            .filter(|id| self.is_legal_target(*id))
    }

    /// Living combatants on `side`, in roster order.
    pub fn alive(&self, side: Side) -> impl Iterator<Item = &Combatant> {
        self.roster(side).iter().filter(|c| c.alive)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster(hps: &[u16]) -> Vec<Combatant> {
        hps.iter()
            .enumerate()
            .map(|(i, hp)| Combatant::new(i as u8, *hp, 30).with_ap(1, 3))
            .collect()
    }

    #[test]
    fn exactly_one_actor_while_pending() {
        let snapshot = Snapshot::new(roster(&[30, 30]), roster(&[30, 30, 30]), Turn::remote(2));

        let actors: Vec<_> = [Side::Heroes, Side::Enemies]
            .into_iter()
            .flat_map(|side| {
                snapshot
                    .roster(side)
                    .iter()
                    .map(move |c| BattlerId::new(side, c.index))
            })
            .filter(|id| snapshot.actor() == Some(*id))
            .collect();

        assert_eq!(actors, vec![BattlerId::enemy(2)]);
        assert!(snapshot.may_submit(Side::Enemies));
        assert!(!snapshot.may_submit(Side::Heroes));
        assert!(!snapshot.is_local_turn());
    }

    #[test]
    fn no_actor_once_resolved() {
        let snapshot = Snapshot::new(roster(&[30]), roster(&[0]), Turn::local(0))
            .with_resolution(Resolution::victory());
        assert_eq!(snapshot.actor(), None);
        assert!(!snapshot.may_submit(Side::Heroes));
        assert!(snapshot.local_actor().is_none());
    }

    #[test]
    fn dead_local_actor_does_not_open_input() {
        let mut heroes = roster(&[30, 30]);
        heroes[1] = heroes[1].clone().defeated();
        let snapshot = Snapshot::new(heroes, roster(&[30]), Turn::local(1));
        assert!(snapshot.is_local_turn());
        assert!(snapshot.local_actor().is_none());
    }

    #[test]
    fn legal_targets_follow_initiative_order() {
        let mut snapshot = Snapshot::new(roster(&[30]), roster(&[30, 0, 30, 30]), Turn::local(0));
        // Initiative order puts E3 before E0.
        snapshot.initiative = [
            InitiativeSlot::new(Side::Enemies, 3, true),
            InitiativeSlot::new(Side::Heroes, 0, true),
            InitiativeSlot::new(Side::Enemies, 0, true),
            InitiativeSlot::new(Side::Enemies, 1, false),
            InitiativeSlot::new(Side::Enemies, 2, false),
        ]
        .into_iter()
        .collect();

        let targets: Vec<_> = snapshot.legal_targets(Side::Enemies).collect();
        assert_eq!(targets, vec![BattlerId::enemy(3), BattlerId::enemy(0)]);
        assert!(!snapshot.is_legal_target(BattlerId::enemy(2)));
    }
}
