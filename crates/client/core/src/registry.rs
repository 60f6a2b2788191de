//! Stable battler identity to presentation handle mapping.
//!
//! Handles live in one slot array per side, indexed by the roster index the
//! authority keeps stable for the whole encounter. Snapshot churn never
//! touches the arena: a handle is created the first time its `(side, index)`
//! is seen and destroyed only by [`BattlerRegistry::destroy_all`].
use std::time::Duration;

use combat_core::{BattlerId, Side, Snapshot};
use tracing::debug;

use crate::presentation::{AnimationKey, BattlerHandle, Clip, Placement, Presentation};

pub struct BattlerRegistry<P: Presentation> {
    presentation: P,
    heroes: Vec<Option<P::Handle>>,
    enemies: Vec<Option<P::Handle>>,
}

impl<P: Presentation> BattlerRegistry<P> {
    pub fn new(presentation: P) -> Self {
        Self {
            presentation,
            heroes: Vec::new(),
            enemies: Vec::new(),
        }
    }

    pub fn presentation(&self) -> &P {
        &self.presentation
    }

    fn slots(&self, side: Side) -> &Vec<Option<P::Handle>> {
        match side {
            Side::Heroes => &self.heroes,
            Side::Enemies => &self.enemies,
        }
    }

    pub fn contains(&self, id: BattlerId) -> bool {
        self.slots(id.side)
            .get(usize::from(id.index))
            .is_some_and(Option::is_some)
    }

    pub fn len(&self) -> usize {
        self.heroes
            .iter()
            .chain(self.enemies.iter())
            .filter(|slot| slot.is_some())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Handle for `id`, spawning it on first access.
    ///
    /// Indices beyond the current roster are not validated here.
    pub fn get(&mut self, id: BattlerId) -> &mut P::Handle {
        let slots = match id.side {
            Side::Heroes => &mut self.heroes,
            Side::Enemies => &mut self.enemies,
        };
        let index = usize::from(id.index);
        if slots.len() <= index {
            slots.resize_with(index + 1, || None);
        }

        let presentation = &mut self.presentation;
        slots[index].get_or_insert_with(|| {
            debug!(battler = %id, "Spawning battler handle");
            let mut handle = presentation.spawn(id);
            let idle = AnimationKey::new(id, Clip::Idle);
            if presentation.exists(idle) {
                handle.play(idle, true);
            }
            handle
        })
    }

    /// Makes sure every combatant in `snapshot` has a handle.
    pub fn ensure_roster(&mut self, snapshot: &Snapshot) {
        for side in [Side::Heroes, Side::Enemies] {
            for combatant in snapshot.roster(side) {
                self.get(BattlerId::new(side, combatant.index));
            }
        }
    }

    /// Plays `clip` on `id` if the presentation has it. Returns whether it
    /// played.
    pub fn play(&mut self, id: BattlerId, clip: Clip, restart_if_playing: bool) -> bool {
        let key = AnimationKey::new(id, clip);
        if !self.presentation.exists(key) {
            return false;
        }
        self.get(id).play(key, restart_if_playing);
        true
    }

    pub fn place(&mut self, id: BattlerId, placement: Placement, duration: Duration) {
        self.get(id).place(placement, duration);
    }

    /// Destroys every handle. Only called on encounter teardown.
    pub fn destroy_all(&mut self) {
        let mut destroyed = 0usize;
        for mut handle in self.heroes.drain(..).chain(self.enemies.drain(..)).flatten() {
            handle.destroy();
            destroyed += 1;
        }
        debug!(destroyed, "Battler handles destroyed");
    }
}
