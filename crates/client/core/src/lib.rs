//! Client-side encounter engine.
//!
//! The remote authority owns combat rules and state. This crate keeps a local
//! view in step with it: polling snapshots, inferring what happened between
//! two of them, replaying that as sprite animation and gating player input so
//! only one action is ever in flight.
//!
//! [`EncounterEngine`] wires the pieces into one task; each piece is usable
//! (and tested) on its own.
pub mod animation;
pub mod config;
pub mod engine;
pub mod event;
pub mod message;
pub mod poller;
pub mod presentation;
pub mod registry;
pub mod submitter;
pub mod turn;

pub use animation::{AnimationQueue, Progress};
pub use config::{AnimationConfig, ChannelConfig, EngineConfig, MessageConfig, PollConfig};
pub use engine::{EncounterEngine, EncounterHandle, EngineError};
pub use event::{Command, EngineEvent, Feedback};
pub use message::{MessageEntry, MessageLevel, MessageLog};
pub use poller::{PollResult, PollTicket, SnapshotClient};
pub use presentation::{
    AnimationKey, BattlerHandle, Clip, Placement, Presentation, PresentationCall, RecordedCalls,
    RecordingHandle, RecordingPresentation,
};
pub use registry::BattlerRegistry;
pub use submitter::{ActionSubmitter, Prepared, Settlement, SubmitError};
pub use turn::{ActionStep, Affordances, InputError, TurnController, TurnMode, TurnSignal};
