//! Rendering collaborator seam.
//!
//! The engine never touches sprites directly. A host implements
//! [`Presentation`] to create per-battler handles and answer clip queries;
//! [`RecordingPresentation`] is a headless implementation that only records
//! what it was asked to do.
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use combat_core::BattlerId;

/// Animation clips a battler may carry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display, strum::IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum Clip {
    Idle,
    Hurt,
    Death,
    Atk1,
    Atk2,
    Atk3,
}

/// A clip on a specific battler, rendered as `"H0:atk1"`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AnimationKey {
    pub battler: BattlerId,
    pub clip: Clip,
}

impl AnimationKey {
    pub const fn new(battler: BattlerId, clip: Clip) -> Self {
        Self { battler, clip }
    }
}

impl fmt::Display for AnimationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.battler, self.clip)
    }
}

/// Where a handle should move to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Placement {
    /// Forward position used while swinging.
    Staging,
    /// Resting slot in the formation.
    Base,
}

/// Per-battler presentation handle.
pub trait BattlerHandle: Send {
    fn play(&mut self, key: AnimationKey, restart_if_playing: bool);

    /// Tween toward `placement` over `duration`.
    fn place(&mut self, placement: Placement, duration: Duration);

    fn destroy(&mut self);
}

pub trait Presentation: Send {
    type Handle: BattlerHandle;

    fn spawn(&mut self, battler: BattlerId) -> Self::Handle;

    fn exists(&self, key: AnimationKey) -> bool;

    /// Frames in the clip, or zero when unknown.
    fn frame_count(&self, key: AnimationKey) -> u32;
}

// ============================================================================
// Headless recorder
// ============================================================================

/// One call observed by [`RecordingPresentation`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PresentationCall {
    Spawn(BattlerId),
    Play { key: AnimationKey, restart: bool },
    Place { battler: BattlerId, placement: Placement },
    Destroy(BattlerId),
}

type CallLog = Arc<Mutex<Vec<PresentationCall>>>;

/// Presentation without any rendering. Clips exist only when registered
/// through [`RecordingPresentation::with_clip`].
#[derive(Clone, Default)]
pub struct RecordingPresentation {
    clips: HashMap<AnimationKey, u32>,
    calls: CallLog,
}

impl RecordingPresentation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_clip(mut self, key: AnimationKey, frames: u32) -> Self {
        self.clips.insert(key, frames);
        self
    }

    /// Shared view of the call log; stays valid after the presentation has
    /// been moved into an engine.
    pub fn calls(&self) -> RecordedCalls {
        RecordedCalls(Arc::clone(&self.calls))
    }

    fn record(calls: &CallLog, call: PresentationCall) {
        if let Ok(mut calls) = calls.lock() {
            calls.push(call);
        }
    }
}

impl Presentation for RecordingPresentation {
    type Handle = RecordingHandle;

    fn spawn(&mut self, battler: BattlerId) -> Self::Handle {
        Self::record(&self.calls, PresentationCall::Spawn(battler));
        RecordingHandle {
            battler,
            calls: Arc::clone(&self.calls),
        }
    }

    fn exists(&self, key: AnimationKey) -> bool {
        self.clips.contains_key(&key)
    }

    fn frame_count(&self, key: AnimationKey) -> u32 {
        self.clips.get(&key).copied().unwrap_or(0)
    }
}

pub struct RecordingHandle {
    battler: BattlerId,
    calls: CallLog,
}

impl BattlerHandle for RecordingHandle {
    fn play(&mut self, key: AnimationKey, restart: bool) {
        RecordingPresentation::record(&self.calls, PresentationCall::Play { key, restart });
    }

    fn place(&mut self, placement: Placement, _duration: Duration) {
        RecordingPresentation::record(
            &self.calls,
            PresentationCall::Place {
                battler: self.battler,
                placement,
            },
        );
    }

    fn destroy(&mut self) {
        RecordingPresentation::record(&self.calls, PresentationCall::Destroy(self.battler));
    }
}

/// Read access to a [`RecordingPresentation`] call log.
#[derive(Clone)]
pub struct RecordedCalls(CallLog);

impl RecordedCalls {
    pub fn snapshot(&self) -> Vec<PresentationCall> {
        self.0.lock().map(|calls| calls.clone()).unwrap_or_default()
    }

    /// Clips played, in order, as `"H0:atk1"` strings.
    pub fn plays(&self) -> Vec<String> {
        self.snapshot()
            .into_iter()
            .filter_map(|call| match call {
                PresentationCall::Play { key, .. } => Some(key.to_string()),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        if let Ok(mut calls) = self.0.lock() {
            calls.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn animation_key_display() {
        let key = AnimationKey::new(BattlerId::enemy(2), Clip::Atk3);
        assert_eq!(key.to_string(), "E2:atk3");
    }

    #[test]
    fn recorder_tracks_handle_calls() {
        let hurt = AnimationKey::new(BattlerId::hero(0), Clip::Hurt);
        let mut presentation = RecordingPresentation::new().with_clip(hurt, 4);
        let calls = presentation.calls();

        let mut handle = presentation.spawn(BattlerId::hero(0));
        handle.play(hurt, true);
        handle.destroy();

        assert!(presentation.exists(hurt));
        assert_eq!(presentation.frame_count(hurt), 4);
        assert_eq!(
            calls.snapshot(),
            vec![
                PresentationCall::Spawn(BattlerId::hero(0)),
                PresentationCall::Play {
                    key: hurt,
                    restart: true
                },
                PresentationCall::Destroy(BattlerId::hero(0)),
            ]
        );
    }
}
