//! Sequential playback of inferred actions.
//!
//! The queue is a timed state machine rather than a set of callbacks: the
//! engine asks for [`AnimationQueue::next_deadline`], sleeps until then and
//! calls [`AnimationQueue::advance`]. Exactly one action is active at a time;
//! everything else waits in FIFO order.
use std::collections::VecDeque;
use std::time::Duration;

use combat_core::{ActionKind, BattlerId, InferredAction};
use tokio::time::Instant;
use tracing::{debug, trace};

use crate::config::AnimationConfig;
use crate::presentation::{AnimationKey, Clip, Placement, Presentation};
use crate::registry::BattlerRegistry;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    /// Actor tweening toward the staging position.
    Approach,
    /// Attack clip playing, hit reaction not yet triggered.
    Windup,
    /// Hit reaction triggered, attack clip finishing.
    FollowThrough,
    /// Actor tweening back to base.
    Return,
    /// Pause before the next action.
    Gap,
}

#[derive(Debug)]
struct Swing {
    action: InferredAction,
    phase: Phase,
    deadline: Instant,
    /// Remainder of the swing after the impact point.
    follow_through: Duration,
}

/// What happened during one [`AnimationQueue::advance`] call.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Progress {
    /// Actions whose hit reaction fired.
    pub impacts: Vec<InferredAction>,
    /// Actions that began playing.
    pub started: Vec<InferredAction>,
    /// Actions that finished playing.
    pub completed: usize,
    /// The queue became idle.
    pub drained: bool,
}

#[derive(Debug)]
pub struct AnimationQueue {
    config: AnimationConfig,
    pending: VecDeque<InferredAction>,
    active: Option<Swing>,
}

impl AnimationQueue {
    pub fn new(config: AnimationConfig) -> Self {
        Self {
            config,
            pending: VecDeque::new(),
            active: None,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.active.is_some() || !self.pending.is_empty()
    }

    pub fn queued(&self) -> usize {
        self.pending.len()
    }

    pub fn active(&self) -> Option<&InferredAction> {
        self.active.as_ref().map(|swing| &swing.action)
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.active.as_ref().map(|swing| swing.deadline)
    }

    /// Plays `action` now if idle, otherwise queues it. Returns whether it
    /// started immediately.
    pub fn enqueue<P: Presentation>(
        &mut self,
        action: InferredAction,
        now: Instant,
        registry: &mut BattlerRegistry<P>,
    ) -> bool {
        if self.active.is_some() {
            trace!(actor = %action.actor, queued = self.pending.len() + 1, "Animation queued");
            self.pending.push_back(action);
            return false;
        }
        self.start(action, now, registry);
        true
    }

    /// Runs every phase transition due at `now`.
    pub fn advance<P: Presentation>(
        &mut self,
        now: Instant,
        registry: &mut BattlerRegistry<P>,
    ) -> Progress {
        let mut progress = Progress::default();

        while let Some(swing) = self.active.as_mut() {
            if swing.deadline > now {
                break;
            }
            let at = swing.deadline;
            let actor = swing.action.actor;

            match swing.phase {
                Phase::Approach => {
                    let clip = attack_clip(registry.presentation(), actor, swing.action.action);
                    let frames = clip
                        .map(|clip| {
                            registry
                                .presentation()
                                .frame_count(AnimationKey::new(actor, clip))
                        })
                        .unwrap_or(0);
                    let length = self.config.swing_duration(frames);
                    let impact = self.config.impact_delay(length);

                    if let Some(clip) = clip {
                        registry.play(actor, clip, true);
                    }
                    swing.phase = Phase::Windup;
                    swing.deadline = at + impact;
                    swing.follow_through = length.saturating_sub(impact);
                }
                Phase::Windup => {
                    if let Some(target) = swing.action.target {
                        hit_reaction(registry, target, swing.action.is_lethal());
                    }
                    progress.impacts.push(swing.action);
                    swing.phase = Phase::FollowThrough;
                    swing.deadline = at + swing.follow_through;
                }
                Phase::FollowThrough => {
                    registry.place(actor, Placement::Base, self.config.recover);
                    swing.phase = Phase::Return;
                    swing.deadline = at + self.config.recover;
                }
                Phase::Return => {
                    registry.play(actor, Clip::Idle, true);
                    swing.phase = Phase::Gap;
                    swing.deadline = at + self.config.gap;
                }
                Phase::Gap => {
                    debug!(actor = %actor, "Animation finished");
                    self.active = None;
                    progress.completed += 1;

                    match self.pending.pop_front() {
                        Some(next) => {
                            self.start(next, at, registry);
                            progress.started.push(next);
                        }
                        None => progress.drained = true,
                    }
                }
            }
        }

        progress
    }

    /// Drops everything without playing it. Used on teardown.
    pub fn clear(&mut self) {
        self.pending.clear();
        self.active = None;
    }

    fn start<P: Presentation>(
        &mut self,
        action: InferredAction,
        now: Instant,
        registry: &mut BattlerRegistry<P>,
    ) {
        debug!(
            actor = %action.actor,
            target = ?action.target,
            effect = ?action.effect,
            "Animation started"
        );

        let swing = if action.target.is_some() {
            registry.place(action.actor, Placement::Staging, self.config.approach);
            Swing {
                action,
                phase: Phase::Approach,
                deadline: now + self.config.approach,
                follow_through: Duration::ZERO,
            }
        } else {
            // Targetless actions (guard, defend) have no swing.
            Swing {
                action,
                phase: Phase::Gap,
                deadline: now + self.config.gap,
                follow_through: Duration::ZERO,
            }
        };
        self.active = Some(swing);
    }
}

/// First attack clip available for `action`, falling back to idle.
fn attack_clip<P: Presentation>(
    presentation: &P,
    actor: BattlerId,
    action: Option<ActionKind>,
) -> Option<Clip> {
    let preferred: &[Clip] = match action {
        Some(ActionKind::Skill1) => &[Clip::Atk2, Clip::Atk1],
        Some(ActionKind::Skill2) => &[Clip::Atk3, Clip::Atk2],
        Some(ActionKind::Attack | ActionKind::UseItem) => &[Clip::Atk1],
        Some(ActionKind::Defend) => &[],
        None => &[Clip::Atk1, Clip::Atk2, Clip::Atk3],
    };

    preferred
        .iter()
        .chain(std::iter::once(&Clip::Idle))
        .copied()
        .find(|clip| presentation.exists(AnimationKey::new(actor, *clip)))
}

fn hit_reaction<P: Presentation>(
    registry: &mut BattlerRegistry<P>,
    target: BattlerId,
    lethal: bool,
) {
    if lethal && registry.play(target, Clip::Death, true) {
        return;
    }
    registry.play(target, Clip::Hurt, true);
}
