//! Commands into and events out of a running encounter.
use combat_core::{ActionKind, BattlerId, InferredAction, RoundMarker, TargetRule};

use crate::message::MessageEntry;
use crate::turn::{Affordances, TurnMode};

/// Player input forwarded to the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    ChooseAction(ActionKind),
    /// Action with an explicit targeting rule (support skills).
    ChooseActionOn(ActionKind, TargetRule),
    ChooseItem { item_key: u8 },
    Hover(BattlerId),
    /// Move the hover by this many candidates.
    CycleTarget(i32),
    /// Confirm the hovered target, or the given index on the pending side.
    ConfirmTarget(Option<u8>),
    Back,
    Cancel,
}

/// Transient error affordance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Feedback {
    /// Shake the action menu.
    Shake,
    /// Flash the battle view.
    Flash,
}

/// Presentation-facing notifications broadcast by the engine.
#[derive(Clone, Debug, PartialEq)]
pub enum EngineEvent {
    /// `true` while no snapshot is available.
    Waiting(bool),
    SnapshotApplied { marker: RoundMarker },
    ModeChanged {
        mode: TurnMode,
        affordances: Affordances,
        actor: Option<u8>,
    },
    TargetsOffered { candidates: Vec<BattlerId> },
    Hovered(BattlerId),
    AnimationStarted(InferredAction),
    /// Hit reaction fired; a resync poll was requested.
    Impact(InferredAction),
    Feedback(Feedback),
    Message(MessageEntry),
    Settled {
        action: ActionKind,
        target: Option<BattlerId>,
        slot: u64,
    },
    Concluded { victory: bool },
    Stopped,
}
