//! Action submission pipeline.
//!
//! resync → re-verify actor → resolve target → affordability → compose & send.
//! Every local check runs against a snapshot fetched for this submission, so
//! nothing is sent on the strength of a stale view.
use std::sync::Arc;

use client_remote_core::{
    CombatAuthority, ComposeAndSend, EncounterContext, RemoteError, SettlementHandle,
    SubmissionRejected,
};
use combat_core::{
    ActionIntent, ActionKind, BattlerId, RoundMarker, Snapshot, StaleTarget, TargetError,
    TargetResolution, targeting,
};
use tracing::{debug, info};

use crate::event::Feedback;

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SubmitError {
    #[error("no active encounter")]
    NoEncounter,

    #[error("it is no longer hero {actor}'s turn")]
    NotActorsTurn { actor: u8 },

    #[error(transparent)]
    NoLegalTarget(#[from] TargetError),

    #[error("{action} costs {cost} AP, only {available} available")]
    Unaffordable {
        action: ActionKind,
        cost: u8,
        available: u8,
    },

    #[error("submission rejected: {0}")]
    Rejected(SubmissionRejected),

    #[error(transparent)]
    Remote(RemoteError),
}

impl From<RemoteError> for SubmitError {
    fn from(error: RemoteError) -> Self {
        match error {
            RemoteError::Rejected(rejected) => SubmitError::Rejected(rejected),
            other => SubmitError::Remote(other),
        }
    }
}

impl SubmitError {
    /// Local view is known to be behind the authority.
    pub const fn forces_resync(&self) -> bool {
        matches!(self, SubmitError::NotActorsTurn { .. } | SubmitError::Remote(_))
    }

    pub const fn feedback(&self) -> Option<Feedback> {
        match self {
            SubmitError::Rejected(_) => Some(Feedback::Shake),
            SubmitError::Unaffordable { .. } => Some(Feedback::Shake),
            SubmitError::NoLegalTarget(_) => Some(Feedback::Flash),
            SubmitError::Remote(_) => Some(Feedback::Flash),
            SubmitError::NoEncounter | SubmitError::NotActorsTurn { .. } => None,
        }
    }
}

/// An intent that passed every local check.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Prepared {
    pub intent: ActionIntent,
    pub substituted: Option<StaleTarget>,
    /// Marker of the snapshot the checks ran against.
    pub marker: RoundMarker,
}

/// A submission the authority accepted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settlement {
    /// The intent actually sent, after target substitution.
    pub intent: ActionIntent,
    pub handle: SettlementHandle,
    pub substituted: Option<StaleTarget>,
    pub marker: RoundMarker,
}

impl Settlement {
    pub fn target(&self) -> Option<BattlerId> {
        self.intent
            .target_index
            .map(|index| BattlerId::new(self.intent.target_side, index))
    }
}

#[derive(Clone)]
pub struct ActionSubmitter {
    authority: Arc<dyn CombatAuthority>,
    composer: Arc<dyn ComposeAndSend>,
}

impl ActionSubmitter {
    pub fn new(authority: Arc<dyn CombatAuthority>, composer: Arc<dyn ComposeAndSend>) -> Self {
        Self {
            authority,
            composer,
        }
    }

    pub async fn submit(
        &self,
        ctx: &EncounterContext,
        intent: ActionIntent,
    ) -> Result<Settlement, SubmitError> {
        let snapshot = self
            .authority
            .poll(ctx)
            .await?
            .ok_or(SubmitError::NoEncounter)?;

        let prepared = Self::prepare(&snapshot, &intent)?;

        debug!(
            actor = prepared.intent.actor_index,
            action = %prepared.intent.action,
            target = ?prepared.intent.target_index,
            "Submitting action"
        );
        let handle = self
            .authority
            .submit(ctx, &prepared.intent, self.composer.as_ref())
            .await?;
        info!(slot = handle.slot, action = %prepared.intent.action, "Action settled");

        Ok(Settlement {
            intent: prepared.intent,
            handle,
            substituted: prepared.substituted,
            marker: prepared.marker,
        })
    }

    /// Local checks against a fresh snapshot. Pure; performs no I/O.
    pub fn prepare(snapshot: &Snapshot, intent: &ActionIntent) -> Result<Prepared, SubmitError> {
        let actor = snapshot
            .local_actor()
            .filter(|c| c.index == intent.actor_index)
            .ok_or(SubmitError::NotActorsTurn {
                actor: intent.actor_index,
            })?;

        let (intent, substituted) = if intent.requires_target() {
            match targeting::resolve_target(snapshot, intent.target_side, intent.target_index)? {
                TargetResolution::Kept(_) => (intent.clone(), None),
                TargetResolution::Substituted { stale, target } => {
                    debug!(stale = %stale.target, substitute = %target, "Stale target replaced");
                    (intent.retargeted(target.index), Some(stale))
                }
            }
        } else {
            (intent.clone(), None)
        };

        if !actor.can_afford(intent.action) {
            return Err(SubmitError::Unaffordable {
                action: intent.action,
                cost: intent.action.cost(),
                available: actor.effective_ap(),
            });
        }

        Ok(Prepared {
            intent,
            substituted,
            marker: snapshot.marker,
        })
    }
}
