//! Action inference from consecutive snapshots.
//!
//! The authority publishes state, not events. [`DiffEngine::infer`] looks at
//! what changed between two snapshots and reconstructs the most plausible
//! remote action so the client has something to animate. The result drives
//! presentation only and is never fed back into game state.
use crate::action::ActionKind;
use crate::snapshot::Snapshot;
use crate::types::{BattlerId, Side};

/// What the inferred action visibly did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InferredEffect {
    /// Target lost `amount` HP. `lethal` when the target is dead afterwards.
    Damage { amount: u16, lethal: bool },
    /// Target died without a visible HP change.
    Defeat,
    /// Actor raised a guard. No target.
    Guard,
    /// A locally submitted action whose outcome the next poll will show.
    Submitted,
}

/// A reconstructed (or locally known) action, queued for playback.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InferredAction {
    pub actor: BattlerId,
    pub target: Option<BattlerId>,
    pub effect: InferredEffect,
    /// Known only for local actions; remote ones play the basic attack.
    pub action: Option<ActionKind>,
}

impl InferredAction {
    /// A local action that settled remotely.
    pub const fn submitted(
        actor: BattlerId,
        action: ActionKind,
        target: Option<BattlerId>,
    ) -> Self {
        Self {
            actor,
            target,
            effect: InferredEffect::Submitted,
            action: Some(action),
        }
    }

    pub const fn is_lethal(&self) -> bool {
        matches!(
            self.effect,
            InferredEffect::Damage { lethal: true, .. } | InferredEffect::Defeat
        )
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct DiffEngine;

impl DiffEngine {
    /// Infers the remote action that turned `prev` into `next`.
    ///
    /// Only turns taken by the remote side are inferred. When several
    /// combatants lost HP in the same step the largest loss wins and ties go
    /// to the lowest index.
    pub fn infer(prev: &Snapshot, next: &Snapshot) -> Option<InferredAction> {
        if prev.turn.is_local_side {
            return None;
        }

        let acting = prev.turn.side();
        let actor = BattlerId::new(acting, prev.turn.actor_index);
        let opposing = acting.opposite();

        Self::largest_hp_loss(prev, next, opposing)
            .or_else(|| Self::first_defeat(prev, next, opposing))
            .map(|(target, effect)| InferredAction {
                actor,
                target: Some(target),
                effect,
                action: None,
            })
            .or_else(|| Self::guard_raised(prev, next, acting))
    }

    fn largest_hp_loss(
        prev: &Snapshot,
        next: &Snapshot,
        side: Side,
    ) -> Option<(BattlerId, InferredEffect)> {
        let mut best: Option<(BattlerId, u16, bool)> = None;

        for before in prev.roster(side) {
            let id = BattlerId::new(side, before.index);
            let Some(after) = next.combatant(id) else {
                continue;
            };
            let delta = before.hp.saturating_sub(after.hp);
            if delta == 0 {
                continue;
            }
            if best.is_none_or(|(_, amount, _)| delta > amount) {
                best = Some((id, delta, !after.alive));
            }
        }

        best.map(|(id, amount, lethal)| (id, InferredEffect::Damage { amount, lethal }))
    }

    fn first_defeat(
        prev: &Snapshot,
        next: &Snapshot,
        side: Side,
    ) -> Option<(BattlerId, InferredEffect)> {
        prev.roster(side)
            .iter()
            .filter(|before| before.alive)
            .map(|before| BattlerId::new(side, before.index))
            .find(|id| next.combatant(*id).is_some_and(|after| !after.alive))
            .map(|id| (id, InferredEffect::Defeat))
    }

    fn guard_raised(prev: &Snapshot, next: &Snapshot, side: Side) -> Option<InferredAction> {
        prev.roster(side).iter().find_map(|before| {
            let id = BattlerId::new(side, before.index);
            let after = next.combatant(id)?;
            let raised = !before.is_guarded() && after.is_guarded();
            let order_unchanged = prev.is_initiative_active(id) == next.is_initiative_active(id);

            (raised && order_unchanged).then_some(InferredAction {
                actor: id,
                target: None,
                effect: InferredEffect::Guard,
                action: Some(ActionKind::Defend),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combatant::Combatant;
    use crate::snapshot::Turn;
    use crate::status::{StatusEffect, StatusInstance};

    fn side(hps: &[u16]) -> Vec<Combatant> {
        hps.iter()
            .enumerate()
            .map(|(i, hp)| Combatant::new(i as u8, *hp, 30))
            .collect()
    }

    fn snapshot(heroes: &[u16], enemies: &[u16], turn: Turn) -> Snapshot {
        Snapshot::new(side(heroes), side(enemies), turn)
    }

    #[test]
    fn single_hp_drop_identifies_target() {
        let prev = snapshot(&[30, 30], &[30], Turn::remote(0));
        let next = snapshot(&[30, 22], &[30], Turn::local(0));

        let inferred = DiffEngine::infer(&prev, &next).unwrap();
        assert_eq!(inferred.actor, BattlerId::enemy(0));
        assert_eq!(inferred.target, Some(BattlerId::hero(1)));
        assert_eq!(
            inferred.effect,
            InferredEffect::Damage {
                amount: 8,
                lethal: false
            }
        );
    }

    #[test]
    fn any_single_delta_is_found_regardless_of_position() {
        for target in 0..4u8 {
            for delta in [1u16, 7, 30] {
                let before = [30u16; 4];
                let mut after = before;
                after[usize::from(target)] -= delta;

                let prev = snapshot(&before, &[30, 30], Turn::remote(1));
                let next = snapshot(&after, &[30, 30], Turn::remote(0));
                let inferred = DiffEngine::infer(&prev, &next).unwrap();
                assert_eq!(inferred.target, Some(BattlerId::hero(target)));
                assert_eq!(inferred.actor, BattlerId::enemy(1));
            }
        }
    }

    #[test]
    fn area_effect_picks_largest_delta() {
        let prev = snapshot(&[30, 30, 30], &[30], Turn::remote(0));
        let next = snapshot(&[25, 18, 18], &[30], Turn::local(0));

        let inferred = DiffEngine::infer(&prev, &next).unwrap();
        assert_eq!(inferred.target, Some(BattlerId::hero(1)));
    }

    #[test]
    fn lethal_hit_is_flagged() {
        let prev = snapshot(&[5, 30], &[30], Turn::remote(0));
        let next = snapshot(&[0, 30], &[30], Turn::local(1));

        let inferred = DiffEngine::infer(&prev, &next).unwrap();
        assert!(inferred.is_lethal());
    }

    #[test]
    fn defeat_without_hp_change() {
        let prev = snapshot(&[30, 30], &[30], Turn::remote(0));
        let mut next = snapshot(&[30, 30], &[30], Turn::local(0));
        next.heroes[0].alive = false;

        let inferred = DiffEngine::infer(&prev, &next).unwrap();
        assert_eq!(inferred.target, Some(BattlerId::hero(0)));
        assert_eq!(inferred.effect, InferredEffect::Defeat);
    }

    #[test]
    fn guard_toggle_is_targetless() {
        let prev = snapshot(&[30], &[30, 30], Turn::remote(1));
        let mut enemies = side(&[30, 30]);
        enemies[1] = enemies[1]
            .clone()
            .with_status(StatusInstance::new(StatusEffect::Guard, 1, 1));
        let next = Snapshot::new(side(&[30]), enemies, Turn::local(0));

        let inferred = DiffEngine::infer(&prev, &next).unwrap();
        assert_eq!(inferred.actor, BattlerId::enemy(1));
        assert_eq!(inferred.target, None);
        assert_eq!(inferred.effect, InferredEffect::Guard);
    }

    #[test]
    fn local_turns_and_quiet_turns_infer_nothing() {
        let prev = snapshot(&[30], &[30], Turn::local(0));
        let next = snapshot(&[30], &[20], Turn::remote(0));
        assert_eq!(DiffEngine::infer(&prev, &next), None);

        let prev = snapshot(&[30], &[30], Turn::remote(0));
        let next = snapshot(&[30], &[30], Turn::local(0));
        assert_eq!(DiffEngine::infer(&prev, &next), None);
    }

    #[test]
    fn healing_is_not_damage() {
        let prev = snapshot(&[10, 30], &[30], Turn::remote(0));
        let next = snapshot(&[20, 30], &[30], Turn::local(0));
        assert_eq!(DiffEngine::infer(&prev, &next), None);
    }
}
