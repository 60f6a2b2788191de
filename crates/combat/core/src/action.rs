//! Hero actions and the intents the client builds from them.
use crate::types::Side;

/// Actions a hero may submit on its turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display, strum::IntoStaticStr)]
pub enum ActionKind {
    Attack,
    Skill1,
    Skill2,
    Defend,
    UseItem,
}

/// Who an action may be aimed at.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TargetRule {
    /// Affects only the actor; no target selection step.
    SelfOnly,
    /// Requires a target on the given side.
    Side(Side),
}

impl ActionKind {
    /// AP charged by the authority.
    pub const fn cost(self) -> u8 {
        match self {
            ActionKind::Attack => 1,
            ActionKind::Skill1 => 2,
            ActionKind::Skill2 => 3,
            ActionKind::Defend => 0,
            ActionKind::UseItem => 1,
        }
    }

    /// Default targeting. Support variants of `Skill2` override this with
    /// [`TargetRule::Side`]`(Side::Heroes)`.
    pub const fn target_rule(self) -> TargetRule {
        match self {
            ActionKind::Attack | ActionKind::Skill1 | ActionKind::Skill2 => {
                TargetRule::Side(Side::Enemies)
            }
            ActionKind::Defend => TargetRule::SelfOnly,
            ActionKind::UseItem => TargetRule::Side(Side::Heroes),
        }
    }
}

/// A locally built description of a proposed action.
///
/// Intents are never mutated once handed to the submitter; target
/// substitution produces a new intent via [`ActionIntent::retargeted`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActionIntent {
    pub actor_index: u8,
    pub action: ActionKind,
    pub target_index: Option<u8>,
    pub target_side: Side,
    pub item_key: Option<u8>,
}

impl ActionIntent {
    /// Intent against a target on `target_side`.
    pub const fn targeted(
        actor_index: u8,
        action: ActionKind,
        target_side: Side,
        target_index: u8,
    ) -> Self {
        Self {
            actor_index,
            action,
            target_index: Some(target_index),
            target_side,
            item_key: None,
        }
    }

    /// Intent for an action that affects only the actor.
    pub const fn self_only(actor_index: u8, action: ActionKind) -> Self {
        Self {
            actor_index,
            action,
            target_index: None,
            target_side: Side::LOCAL,
            item_key: None,
        }
    }

    pub const fn with_item(mut self, item_key: u8) -> Self {
        self.item_key = Some(item_key);
        self
    }

    pub const fn requires_target(&self) -> bool {
        self.target_index.is_some()
    }

    pub fn retargeted(&self, target_index: u8) -> Self {
        Self {
            target_index: Some(target_index),
            ..self.clone()
        }
    }
}
