//! Player input state machine.
//!
//! ```text
//!            local turn, queue idle                 action needs target
//!   Idle ───────────────────────────▶ SelectingAction ─────────────────▶ SelectingTarget
//!    ▲  ▲                                   │  ▲                               │
//!    │  └──────────── cancel ───────────────┘  └───────────── back ────────────┤
//!    │                                      │ self-only action                 │ confirm
//!    │                                      ▼                                  ▼
//!    └──────────── submission settled ─ Processing ◀───────────────────────────┘
//! ```
//!
//! The controller never talks to the network. It turns snapshots and player
//! commands into mode changes and hands confirmed intents back to the engine.
use bitflags::bitflags;
use combat_core::{
    ActionIntent, ActionKind, BattlerId, RoundMarker, Side, Snapshot, TargetRule,
};
use tracing::debug;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, strum::Display)]
pub enum TurnMode {
    #[default]
    Idle,
    SelectingAction,
    SelectingTarget,
    Processing,
}

impl TurnMode {
    pub const fn is_selecting(self) -> bool {
        matches!(self, TurnMode::SelectingAction | TurnMode::SelectingTarget)
    }
}

bitflags! {
    /// Input affordances the host should currently expose.
    ///
    /// Cleared in one step when entering `Processing` so no hover indicator or
    /// click handler can trigger a second submission.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct Affordances: u8 {
        /// Action menu is open.
        const ACTION_MENU  = 0b0001;

        /// Hover indicators on target candidates.
        const TARGET_HOVER = 0b0010;

        /// Click handlers on target candidates.
        const TARGET_CLICK = 0b0100;

        /// Cancel / back key.
        const CANCEL       = 0b1000;

        const TARGETING = Self::TARGET_HOVER.bits() | Self::TARGET_CLICK.bits();
    }
}

impl Default for Affordances {
    fn default() -> Self {
        Self::empty()
    }
}

/// Player input the controller refused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum InputError {
    #[error("no input accepted while {mode}")]
    WrongMode { mode: TurnMode },

    #[error("{action} costs {cost} AP, only {available} available")]
    Unaffordable {
        action: ActionKind,
        cost: u8,
        available: u8,
    },

    #[error("no {side} can be targeted")]
    NoTargets { side: Side },

    #[error("{target} is not a target candidate")]
    NotACandidate { target: BattlerId },

    #[error("acting hero is no longer on the roster")]
    ActorMissing,
}

impl InputError {
    /// Errors the player caused directly and should feel (menu shake).
    pub const fn is_rejection(&self) -> bool {
        matches!(
            self,
            InputError::Unaffordable { .. } | InputError::NoTargets { .. }
        )
    }
}

/// Mode change produced by [`TurnController::observe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TurnSignal {
    Unchanged,
    /// Input opened for this hero.
    Opened { actor: u8 },
    /// Local turn started while animations are still draining.
    Deferred { actor: u8 },
    /// Input closed without a submission (turn moved on or encounter ended).
    Closed,
}

/// Result of a successful [`TurnController::choose_action`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ActionStep {
    /// Target selection opened with these candidates.
    SelectTarget { side: Side, candidates: Vec<BattlerId> },
    /// Self-only action; ready to submit.
    Submit(ActionIntent),
}

#[derive(Clone, Copy, Debug)]
struct PendingAction {
    kind: ActionKind,
    side: Side,
    item_key: Option<u8>,
}

#[derive(Debug, Default)]
pub struct TurnController {
    mode: TurnMode,
    affordances: Affordances,
    actor: Option<u8>,
    deferred: Option<u8>,
    pending: Option<PendingAction>,
    candidates: Vec<BattlerId>,
    hovered: Option<usize>,
    /// Marker of the snapshot the last settled action was built against.
    /// Input stays closed until a newer snapshot arrives.
    spent: Option<RoundMarker>,
}

impl TurnController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> TurnMode {
        self.mode
    }

    pub fn affordances(&self) -> Affordances {
        self.affordances
    }

    pub fn actor(&self) -> Option<u8> {
        self.actor
    }

    pub fn deferred(&self) -> Option<u8> {
        self.deferred
    }

    pub fn candidates(&self) -> &[BattlerId] {
        &self.candidates
    }

    pub fn hovered(&self) -> Option<BattlerId> {
        self.hovered.and_then(|i| self.candidates.get(i).copied())
    }

    /// Reacts to a freshly applied snapshot.
    pub fn observe(&mut self, snapshot: &Snapshot, queue_busy: bool) -> TurnSignal {
        if self.mode == TurnMode::Processing {
            return TurnSignal::Unchanged;
        }
        if self.spent.is_some_and(|spent| spent == snapshot.marker) {
            return TurnSignal::Unchanged;
        }
        self.spent = None;

        let local = snapshot.local_actor().map(|c| c.index);

        match local {
            Some(actor) if self.mode.is_selecting() && self.actor == Some(actor) => {
                TurnSignal::Unchanged
            }
            Some(actor) => {
                if self.mode.is_selecting() {
                    self.reset();
                }
                if queue_busy {
                    debug!(actor, "Local turn deferred until animations drain");
                    self.deferred = Some(actor);
                    TurnSignal::Deferred { actor }
                } else {
                    self.open(actor);
                    TurnSignal::Opened { actor }
                }
            }
            None => {
                self.deferred = None;
                if self.mode.is_selecting() {
                    debug!("Turn moved on while selecting, closing input");
                    self.reset();
                    TurnSignal::Closed
                } else {
                    TurnSignal::Unchanged
                }
            }
        }
    }

    /// Opens a deferred turn once the animation queue has drained, provided
    /// `snapshot` still agrees it is that hero's turn.
    pub fn resume_deferred(&mut self, snapshot: &Snapshot) -> TurnSignal {
        let Some(actor) = self.deferred.take() else {
            return TurnSignal::Unchanged;
        };
        if self.mode != TurnMode::Idle {
            return TurnSignal::Unchanged;
        }
        if snapshot.local_actor().map(|c| c.index) != Some(actor) {
            debug!(actor, "Deferred turn no longer current, dropping");
            return TurnSignal::Unchanged;
        }
        self.open(actor);
        TurnSignal::Opened { actor }
    }

    pub fn choose_action(
        &mut self,
        kind: ActionKind,
        snapshot: &Snapshot,
    ) -> Result<ActionStep, InputError> {
        self.choose(kind, kind.target_rule(), None, snapshot)
    }

    /// Like [`choose_action`](Self::choose_action) with an explicit targeting
    /// rule, e.g. a support `Skill2` aimed at heroes.
    pub fn choose_action_with(
        &mut self,
        kind: ActionKind,
        rule: TargetRule,
        snapshot: &Snapshot,
    ) -> Result<ActionStep, InputError> {
        self.choose(kind, rule, None, snapshot)
    }

    pub fn choose_item(
        &mut self,
        item_key: u8,
        snapshot: &Snapshot,
    ) -> Result<ActionStep, InputError> {
        let kind = ActionKind::UseItem;
        self.choose(kind, kind.target_rule(), Some(item_key), snapshot)
    }

    fn choose(
        &mut self,
        kind: ActionKind,
        rule: TargetRule,
        item_key: Option<u8>,
        snapshot: &Snapshot,
    ) -> Result<ActionStep, InputError> {
        self.expect_mode(TurnMode::SelectingAction)?;
        let actor = self.actor.ok_or(InputError::ActorMissing)?;
        let combatant = snapshot
            .combatant(BattlerId::hero(actor))
            .ok_or(InputError::ActorMissing)?;

        if !combatant.can_afford(kind) {
            return Err(InputError::Unaffordable {
                action: kind,
                cost: kind.cost(),
                available: combatant.effective_ap(),
            });
        }

        match rule {
            TargetRule::SelfOnly => {
                let mut intent = ActionIntent::self_only(actor, kind);
                intent.item_key = item_key;
                self.enter_processing();
                Ok(ActionStep::Submit(intent))
            }
            TargetRule::Side(side) => {
                // Initiative order. The first candidate is the fallback target.
                let candidates: Vec<_> = snapshot.legal_targets(side).collect();
                if candidates.is_empty() {
                    return Err(InputError::NoTargets { side });
                }

                self.pending = Some(PendingAction {
                    kind,
                    side,
                    item_key,
                });
                self.candidates = candidates.clone();
                self.hovered = Some(0);
                self.set_mode(TurnMode::SelectingTarget);
                self.affordances = Affordances::TARGETING | Affordances::CANCEL;
                Ok(ActionStep::SelectTarget { side, candidates })
            }
        }
    }

    pub fn hover(&mut self, target: BattlerId) -> Result<(), InputError> {
        self.expect_mode(TurnMode::SelectingTarget)?;
        let position = self
            .candidates
            .iter()
            .position(|id| *id == target)
            .ok_or(InputError::NotACandidate { target })?;
        self.hovered = Some(position);
        Ok(())
    }

    /// Moves the hover by `step` candidates, wrapping around.
    pub fn cycle_target(&mut self, step: i32) -> Result<BattlerId, InputError> {
        self.expect_mode(TurnMode::SelectingTarget)?;
        let len = i32::try_from(self.candidates.len()).unwrap_or(i32::MAX);
        let current = self
            .hovered
            .and_then(|i| i32::try_from(i).ok())
            .unwrap_or(0);
        let next = (current + step).rem_euclid(len.max(1));
        let next = usize::try_from(next).unwrap_or(0);
        self.hovered = Some(next);
        self.candidates
            .get(next)
            .copied()
            .ok_or(InputError::WrongMode { mode: self.mode })
    }

    /// Confirms the hovered target, or `index` on the pending side when
    /// given. Enters `Processing` and returns the intent to submit.
    pub fn confirm_target(&mut self, index: Option<u8>) -> Result<ActionIntent, InputError> {
        self.expect_mode(TurnMode::SelectingTarget)?;
        let pending = self.pending.ok_or(InputError::WrongMode { mode: self.mode })?;
        let actor = self.actor.ok_or(InputError::ActorMissing)?;

        let target = match index {
            Some(index) => BattlerId::new(pending.side, index),
            None => self.hovered().ok_or(InputError::WrongMode { mode: self.mode })?,
        };
        if !self.candidates.contains(&target) {
            return Err(InputError::NotACandidate { target });
        }

        let mut intent = ActionIntent::targeted(actor, pending.kind, pending.side, target.index);
        intent.item_key = pending.item_key;
        self.enter_processing();
        Ok(intent)
    }

    /// Steps back from target selection to the action menu.
    pub fn back(&mut self) -> Result<(), InputError> {
        self.expect_mode(TurnMode::SelectingTarget)?;
        self.pending = None;
        self.candidates.clear();
        self.hovered = None;
        self.set_mode(TurnMode::SelectingAction);
        self.affordances = Affordances::ACTION_MENU | Affordances::CANCEL;
        Ok(())
    }

    /// Abandons selection. Nothing was sent, so nothing is undone remotely.
    pub fn cancel(&mut self) -> Result<(), InputError> {
        if !self.mode.is_selecting() {
            return Err(InputError::WrongMode { mode: self.mode });
        }
        self.reset();
        Ok(())
    }

    /// Leaves `Processing`. Always called once the submission settles,
    /// whatever its outcome.
    ///
    /// `spent` is the marker of the snapshot the settled action was built
    /// against; input will not reopen on that snapshot.
    pub fn finish_processing(&mut self, spent: Option<RoundMarker>) {
        if self.mode != TurnMode::Processing {
            return;
        }
        self.spent = spent;
        self.reset();
    }

    fn open(&mut self, actor: u8) {
        self.actor = Some(actor);
        self.deferred = None;
        self.set_mode(TurnMode::SelectingAction);
        self.affordances = Affordances::ACTION_MENU | Affordances::CANCEL;
    }

    fn enter_processing(&mut self) {
        self.affordances = Affordances::empty();
        self.candidates.clear();
        self.hovered = None;
        self.pending = None;
        self.set_mode(TurnMode::Processing);
    }

    fn reset(&mut self) {
        self.actor = None;
        self.pending = None;
        self.candidates.clear();
        self.hovered = None;
        self.affordances = Affordances::empty();
        self.set_mode(TurnMode::Idle);
    }

    fn set_mode(&mut self, mode: TurnMode) {
        if self.mode != mode {
            debug!(from = %self.mode, to = %mode, "Turn mode changed");
            self.mode = mode;
        }
    }

    fn expect_mode(&self, mode: TurnMode) -> Result<(), InputError> {
        if self.mode == mode {
            Ok(())
        } else {
            Err(InputError::WrongMode { mode: self.mode })
        }
    }
}

#[cfg(test)]
mod tests {
    use combat_core::{Combatant, InitiativeSlot, StatusEffect, StatusInstance, Turn, targeting};

    use super::*;

    fn snapshot(hero_ap: u8, turn: Turn) -> Snapshot {
        Snapshot::new(
            [
                Combatant::new(0, 30, 30).with_ap(hero_ap, 3),
                Combatant::new(1, 30, 30).with_ap(hero_ap, 3),
            ],
            [
                Combatant::new(0, 20, 20),
                Combatant::new(1, 0, 20),
                Combatant::new(2, 20, 20),
            ],
            turn,
        )
    }

    fn opened(snapshot: &Snapshot) -> TurnController {
        let mut turn = TurnController::new();
        assert_eq!(turn.observe(snapshot, false), TurnSignal::Opened { actor: 0 });
        turn
    }

    #[test]
    fn local_turn_opens_input() {
        let turn = opened(&snapshot(1, Turn::local(0)));
        assert_eq!(turn.mode(), TurnMode::SelectingAction);
        assert!(turn.affordances().contains(Affordances::ACTION_MENU));
    }

    #[test]
    fn remote_turn_keeps_idle() {
        let mut turn = TurnController::new();
        assert_eq!(turn.observe(&snapshot(1, Turn::remote(0)), false), TurnSignal::Unchanged);
        assert_eq!(turn.mode(), TurnMode::Idle);
    }

    #[test]
    fn busy_queue_defers_then_resumes() {
        let snap = snapshot(1, Turn::local(1));
        let mut turn = TurnController::new();

        assert_eq!(turn.observe(&snap, true), TurnSignal::Deferred { actor: 1 });
        assert_eq!(turn.mode(), TurnMode::Idle);

        assert_eq!(turn.resume_deferred(&snap), TurnSignal::Opened { actor: 1 });
        assert_eq!(turn.mode(), TurnMode::SelectingAction);
        assert_eq!(turn.deferred(), None);
    }

    #[test]
    fn deferred_turn_dropped_if_stale() {
        let mut turn = TurnController::new();
        turn.observe(&snapshot(1, Turn::local(1)), true);
        assert_eq!(turn.resume_deferred(&snapshot(1, Turn::remote(0))), TurnSignal::Unchanged);
        assert_eq!(turn.mode(), TurnMode::Idle);
    }

    #[test]
    fn attack_opens_targeting_over_living_enemies() {
        let snap = snapshot(1, Turn::local(0));
        let mut turn = opened(&snap);

        let step = turn.choose_action(ActionKind::Attack, &snap).unwrap();
        assert_eq!(
            step,
            ActionStep::SelectTarget {
                side: Side::Enemies,
                candidates: vec![BattlerId::enemy(0), BattlerId::enemy(2)],
            }
        );
        assert_eq!(turn.mode(), TurnMode::SelectingTarget);
        assert!(turn.affordances().contains(Affordances::TARGETING));
    }

    #[test]
    fn candidates_follow_initiative_order() {
        let mut snap = snapshot(1, Turn::local(0));
        snap.initiative = [
            InitiativeSlot::new(Side::Enemies, 2, true),
            InitiativeSlot::new(Side::Heroes, 0, true),
            InitiativeSlot::new(Side::Enemies, 0, true),
            InitiativeSlot::new(Side::Heroes, 1, true),
        ]
        .into_iter()
        .collect();
        let mut turn = opened(&snap);

        let ActionStep::SelectTarget { candidates, .. } =
            turn.choose_action(ActionKind::Attack, &snap).unwrap()
        else {
            panic!("attack needs a target");
        };
        assert_eq!(candidates, vec![BattlerId::enemy(2), BattlerId::enemy(0)]);

        // Default hover matches what a stale target falls back to.
        let fallback = targeting::resolve_target(&snap, Side::Enemies, None).unwrap();
        assert_eq!(turn.hovered(), Some(fallback.target()));
        let intent = turn.confirm_target(None).unwrap();
        assert_eq!(intent.target_index, Some(2));
    }

    #[test]
    fn confirm_clears_affordances_and_enters_processing() {
        let snap = snapshot(1, Turn::local(0));
        let mut turn = opened(&snap);
        turn.choose_action(ActionKind::Attack, &snap).unwrap();
        turn.cycle_target(1).unwrap();

        let intent = turn.confirm_target(None).unwrap();

        assert_eq!(intent, ActionIntent::targeted(0, ActionKind::Attack, Side::Enemies, 2));
        assert_eq!(turn.mode(), TurnMode::Processing);
        assert!(turn.affordances().is_empty());
        assert!(matches!(
            turn.confirm_target(None),
            Err(InputError::WrongMode { mode: TurnMode::Processing })
        ));
    }

    #[test]
    fn defend_skips_targeting() {
        let snap = snapshot(0, Turn::local(0));
        let mut turn = opened(&snap);

        let step = turn.choose_action(ActionKind::Defend, &snap).unwrap();
        assert_eq!(step, ActionStep::Submit(ActionIntent::self_only(0, ActionKind::Defend)));
        assert_eq!(turn.mode(), TurnMode::Processing);
    }

    #[test]
    fn unaffordable_action_stays_in_menu() {
        // 1 AP, chilled: no regen this turn.
        let mut snap = snapshot(1, Turn::local(0));
        snap.heroes[0] = snap.heroes[0]
            .clone()
            .with_status(StatusInstance::new(StatusEffect::Chill, 2, 1));
        let mut turn = opened(&snap);

        let err = turn.choose_action(ActionKind::Skill1, &snap).unwrap_err();
        assert_eq!(
            err,
            InputError::Unaffordable {
                action: ActionKind::Skill1,
                cost: 2,
                available: 1
            }
        );
        assert!(err.is_rejection());
        assert_eq!(turn.mode(), TurnMode::SelectingAction);
    }

    #[test]
    fn support_skill_targets_heroes() {
        let snap = snapshot(3, Turn::local(0));
        let mut turn = opened(&snap);
        let step = turn
            .choose_action_with(ActionKind::Skill2, TargetRule::Side(Side::Heroes), &snap)
            .unwrap();
        assert!(matches!(step, ActionStep::SelectTarget { side: Side::Heroes, .. }));
    }

    #[test]
    fn item_intent_carries_key() {
        let snap = snapshot(1, Turn::local(0));
        let mut turn = opened(&snap);
        turn.choose_item(7, &snap).unwrap();
        let intent = turn.confirm_target(Some(1)).unwrap();
        assert_eq!(intent.item_key, Some(7));
        assert_eq!(intent.target_side, Side::Heroes);
    }

    #[test]
    fn cycling_wraps_both_ways() {
        let snap = snapshot(1, Turn::local(0));
        let mut turn = opened(&snap);
        turn.choose_action(ActionKind::Attack, &snap).unwrap();

        assert_eq!(turn.cycle_target(-1).unwrap(), BattlerId::enemy(2));
        assert_eq!(turn.cycle_target(1).unwrap(), BattlerId::enemy(0));
        assert_eq!(turn.cycle_target(3).unwrap(), BattlerId::enemy(2));
    }

    #[test]
    fn dead_enemy_is_not_hoverable() {
        let snap = snapshot(1, Turn::local(0));
        let mut turn = opened(&snap);
        turn.choose_action(ActionKind::Attack, &snap).unwrap();
        assert_eq!(
            turn.hover(BattlerId::enemy(1)),
            Err(InputError::NotACandidate {
                target: BattlerId::enemy(1)
            })
        );
    }

    #[test]
    fn back_and_cancel() {
        let snap = snapshot(1, Turn::local(0));
        let mut turn = opened(&snap);
        turn.choose_action(ActionKind::Attack, &snap).unwrap();

        turn.back().unwrap();
        assert_eq!(turn.mode(), TurnMode::SelectingAction);
        assert!(turn.candidates().is_empty());

        turn.cancel().unwrap();
        assert_eq!(turn.mode(), TurnMode::Idle);
        assert!(turn.affordances().is_empty());
        assert!(turn.cancel().is_err());
    }

    #[test]
    fn remote_advance_closes_selection() {
        let mut turn = opened(&snapshot(1, Turn::local(0)));
        assert_eq!(turn.observe(&snapshot(1, Turn::remote(2)), false), TurnSignal::Closed);
        assert_eq!(turn.mode(), TurnMode::Idle);
    }

    #[test]
    fn processing_ignores_snapshots_until_finished() {
        let snap = snapshot(1, Turn::local(0));
        let mut turn = opened(&snap);
        turn.choose_action(ActionKind::Defend, &snap).unwrap();

        assert_eq!(turn.observe(&snapshot(1, Turn::remote(0)), false), TurnSignal::Unchanged);
        assert_eq!(turn.mode(), TurnMode::Processing);

        turn.finish_processing(Some(snap.marker));
        assert_eq!(turn.mode(), TurnMode::Idle);
        // Same snapshot the action was spent on: stays closed.
        assert_eq!(turn.observe(&snap, false), TurnSignal::Unchanged);

        let newer = snapshot(1, Turn::local(1)).with_marker(RoundMarker::new(1, 7, 1));
        assert_eq!(turn.observe(&newer, false), TurnSignal::Opened { actor: 1 });
    }

    #[test]
    fn failed_submission_reopens_on_same_snapshot() {
        let snap = snapshot(1, Turn::local(0));
        let mut turn = opened(&snap);
        turn.choose_action(ActionKind::Defend, &snap).unwrap();

        turn.finish_processing(None);
        assert_eq!(turn.observe(&snap, false), TurnSignal::Opened { actor: 0 });
    }
}
