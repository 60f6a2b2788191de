//! Encounter engine: one cooperative task that owns every piece of client
//! combat state.
//!
//! Poll ticks, poll responses, animation deadlines, player commands and
//! submission settlement all arrive through a single `tokio::select!` loop, so
//! nothing here ever runs in parallel against the encounter state. Network
//! calls run on spawned tasks and report back into the loop.
use std::sync::Arc;

use client_remote_core::{
    CombatAuthority, ComposeAndSend, EncounterContext, RemoteError, SettlementHandle,
};
use combat_core::{BattlerId, DiffEngine, InferredAction, Snapshot};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, error, info, trace, warn};

use crate::animation::AnimationQueue;
use crate::config::EngineConfig;
use crate::event::{Command, EngineEvent, Feedback};
use crate::message::{MessageEntry, MessageLevel, MessageLog};
use crate::poller::{PollResult, SnapshotClient};
use crate::presentation::Presentation;
use crate::registry::BattlerRegistry;
use crate::submitter::{ActionSubmitter, Settlement, SubmitError};
use crate::turn::{ActionStep, Affordances, InputError, TurnController, TurnMode, TurnSignal};

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("encounter engine command channel closed")]
    CommandChannelClosed,

    #[error("encounter engine task join failed")]
    Join(#[source] JoinError),
}

type Disposer = Box<dyn FnOnce() + Send>;
type SubmissionTask = JoinHandle<Result<Settlement, SubmitError>>;
type ConclusionTask = JoinHandle<Result<SettlementHandle, RemoteError>>;

/// Unstarted engine. [`EncounterEngine::start`] spawns the event loop.
pub struct EncounterEngine<P: Presentation> {
    config: EngineConfig,
    authority: Arc<dyn CombatAuthority>,
    composer: Arc<dyn ComposeAndSend>,
    presentation: P,
    events: broadcast::Sender<EngineEvent>,
}

impl<P> EncounterEngine<P>
where
    P: Presentation + 'static,
{
    pub fn new(
        config: EngineConfig,
        authority: Arc<dyn CombatAuthority>,
        composer: Arc<dyn ComposeAndSend>,
        presentation: P,
    ) -> Self {
        let (events, _) = broadcast::channel(config.channels.event_buffer);
        Self {
            config,
            authority,
            composer,
            presentation,
            events,
        }
    }

    /// Subscribe before starting to observe the very first events.
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }

    pub fn start(self, ctx: EncounterContext) -> EncounterHandle {
        let (command_tx, command_rx) = mpsc::channel(self.config.channels.command_buffer);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let events = self.events.clone();

        let encounter = Encounter::new(
            ctx,
            self.config,
            self.authority,
            self.composer,
            self.presentation,
            self.events,
        );
        let task = tokio::spawn(encounter.run(command_rx, shutdown_rx));
        info!("Encounter engine started");

        let mut handle = EncounterHandle {
            command_tx,
            events,
            disposers: Vec::new(),
            task: Some(task),
        };
        handle.on_stop(move || {
            if shutdown_tx.send(()).is_err() {
                debug!("Encounter loop already exited before shutdown");
            }
        });
        handle
    }
}

/// Running encounter.
///
/// Teardown closures registered with [`on_stop`](Self::on_stop) run exactly
/// once, on [`stop`](Self::stop) or on drop, whichever comes first.
pub struct EncounterHandle {
    command_tx: mpsc::Sender<Command>,
    events: broadcast::Sender<EngineEvent>,
    disposers: Vec<Disposer>,
    task: Option<JoinHandle<MessageLog>>,
}

impl EncounterHandle {
    pub async fn send(&self, command: Command) -> Result<(), EngineError> {
        self.command_tx
            .send(command)
            .await
            .map_err(|_| EngineError::CommandChannelClosed)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }

    /// Registers a teardown closure (timer, listener) run on stop.
    pub fn on_stop(&mut self, disposer: impl FnOnce() + Send + 'static) {
        self.disposers.push(Box::new(disposer));
    }

    /// Runs every disposer, waits for the loop to tear down and returns the
    /// message log.
    ///
    /// A submission already handed to the authority is not cancelled; its
    /// result is simply no longer observed.
    pub async fn stop(mut self) -> Result<MessageLog, EngineError> {
        self.dispose();
        match self.task.take() {
            Some(task) => task.await.map_err(EngineError::Join),
            None => Ok(MessageLog::new(1)),
        }
    }

    fn dispose(&mut self) {
        let disposers = std::mem::take(&mut self.disposers);
        debug!(count = disposers.len(), "Running encounter disposers");
        for disposer in disposers {
            disposer();
        }
    }
}

impl Drop for EncounterHandle {
    fn drop(&mut self) {
        self.dispose();
    }
}

// ============================================================================
// Event loop state
// ============================================================================

struct Encounter<P: Presentation> {
    ctx: EncounterContext,
    config: EngineConfig,
    authority: Arc<dyn CombatAuthority>,
    composer: Arc<dyn ComposeAndSend>,
    poller: SnapshotClient,
    submitter: ActionSubmitter,
    previous: Option<Snapshot>,
    registry: BattlerRegistry<P>,
    animations: AnimationQueue,
    turn: TurnController,
    messages: MessageLog,
    events: broadcast::Sender<EngineEvent>,
    /// First snapshot presented; poll cadence relaxes.
    initialized: bool,
    waiting: bool,
    polling: bool,
    /// Final outcome, once the authority resolved the encounter.
    outcome: Option<bool>,
    conclude_started: bool,
    last_mode: (TurnMode, Affordances, Option<u8>),
}

impl<P: Presentation> Encounter<P> {
    fn new(
        ctx: EncounterContext,
        config: EngineConfig,
        authority: Arc<dyn CombatAuthority>,
        composer: Arc<dyn ComposeAndSend>,
        presentation: P,
        events: broadcast::Sender<EngineEvent>,
    ) -> Self {
        Self {
            poller: SnapshotClient::new(Arc::clone(&authority)),
            submitter: ActionSubmitter::new(Arc::clone(&authority), Arc::clone(&composer)),
            animations: AnimationQueue::new(config.animation.clone()),
            messages: MessageLog::new(config.messages.capacity),
            registry: BattlerRegistry::new(presentation),
            turn: TurnController::new(),
            previous: None,
            initialized: false,
            waiting: false,
            polling: true,
            outcome: None,
            conclude_started: false,
            last_mode: (TurnMode::Idle, Affordances::empty(), None),
            ctx,
            config,
            authority,
            composer,
            events,
        }
    }

    async fn run(
        mut self,
        mut commands: mpsc::Receiver<Command>,
        mut shutdown: oneshot::Receiver<()>,
    ) -> MessageLog {
        let mut polls: JoinSet<PollResult> = JoinSet::new();
        let mut submission: Option<SubmissionTask> = None;
        let mut conclusion: Option<ConclusionTask> = None;

        let mut ticker = time::interval(self.config.poll.interval(false));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut steady = false;

        loop {
            if self.initialized && !steady {
                let period = self.config.poll.interval(true);
                ticker = time::interval_at(Instant::now() + period, period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                steady = true;
                debug!(?period, "Poll cadence relaxed");
            }

            let deadline = self.animations.next_deadline();

            tokio::select! {
                _ = &mut shutdown => {
                    debug!("Shutdown requested");
                    break;
                }

                command = commands.recv() => match command {
                    Some(command) => self.handle_command(command, &mut submission),
                    None => {
                        debug!("Command channel closed");
                        break;
                    }
                },

                _ = ticker.tick(), if self.polling => self.spawn_poll(&mut polls),

                Some(joined) = polls.join_next(), if !polls.is_empty() => match joined {
                    Ok(result) => self.on_poll_result(result),
                    Err(e) => warn!("Poll task failed: {}", e),
                },

                _ = time::sleep_until(deadline.unwrap_or_else(Instant::now)),
                    if deadline.is_some() =>
                {
                    self.on_animation_deadline(&mut polls);
                }

                joined = join_opt(&mut submission) => {
                    submission = None;
                    self.on_submission(joined, &mut polls);
                }

                joined = join_opt(&mut conclusion) => {
                    conclusion = None;
                    self.on_conclusion(joined);
                }
            }

            if self.outcome.is_some() && !self.conclude_started {
                self.conclude_started = true;
                conclusion = Some(self.spawn_conclude());
            }
        }

        polls.abort_all();
        if submission.is_some() {
            info!("Stopping with a submission in flight; its result will not be observed");
        }
        if conclusion.is_some() {
            info!("Stopping with conclusion in flight; its result will not be observed");
        }

        self.animations.clear();
        self.registry.destroy_all();
        self.emit(EngineEvent::Stopped);
        info!("Encounter engine stopped");

        self.messages
    }

    // ------------------------------------------------------------------------
    // Polling
    // ------------------------------------------------------------------------

    fn spawn_poll(&mut self, polls: &mut JoinSet<PollResult>) {
        trace!(in_flight = polls.len(), "Polling snapshot");
        polls.spawn(self.poller.request(self.ctx.clone()));
    }

    fn on_poll_result(&mut self, PollResult { ticket, result }: PollResult) {
        match result {
            Err(e) => {
                warn!("Snapshot poll failed, retrying next tick: {}", e);
                if self.previous.is_none() {
                    self.set_waiting(true);
                }
            }
            Ok(snapshot) => {
                if !self.poller.accept(ticket) {
                    trace!(?ticket, "Discarding out-of-order poll response");
                    return;
                }
                match snapshot {
                    Some(snapshot) => {
                        self.set_waiting(false);
                        self.apply_snapshot(snapshot);
                    }
                    None => self.set_waiting(true),
                }
            }
        }
    }

    fn apply_snapshot(&mut self, next: Snapshot) {
        self.registry.ensure_roster(&next);

        let changed = self
            .previous
            .as_ref()
            .is_none_or(|previous| previous.marker != next.marker);

        if changed {
            if let Some(action) = self
                .previous
                .as_ref()
                .and_then(|previous| DiffEngine::infer(previous, &next))
            {
                self.enqueue_animation(action);
            }
            self.emit(EngineEvent::SnapshotApplied { marker: next.marker });
        }

        if !self.initialized {
            self.initialized = true;
            info!(
                heroes = next.heroes.len(),
                enemies = next.enemies.len(),
                "Encounter presented"
            );
        }

        if next.is_resolved() && self.outcome.is_none() {
            let victory = next.resolution.victory;
            info!(victory, "Encounter resolved, polling stopped");
            self.outcome = Some(victory);
            self.polling = false;
            self.say(
                MessageLevel::Info,
                if victory { "Victory!" } else { "Defeat." },
            );
        }

        let signal = self.turn.observe(&next, self.animations.is_busy());
        self.previous = Some(next);
        self.on_turn_signal(signal);
    }

    fn set_waiting(&mut self, waiting: bool) {
        if self.waiting != waiting {
            self.waiting = waiting;
            self.emit(EngineEvent::Waiting(waiting));
        }
    }

    // ------------------------------------------------------------------------
    // Animation
    // ------------------------------------------------------------------------

    fn enqueue_animation(&mut self, action: InferredAction) {
        if self
            .animations
            .enqueue(action, Instant::now(), &mut self.registry)
        {
            self.emit(EngineEvent::AnimationStarted(action));
        }
    }

    fn on_animation_deadline(&mut self, polls: &mut JoinSet<PollResult>) {
        let progress = self.animations.advance(Instant::now(), &mut self.registry);

        for action in progress.impacts {
            self.emit(EngineEvent::Impact(action));
            if self.polling {
                self.spawn_poll(polls);
            }
        }
        for action in progress.started {
            self.emit(EngineEvent::AnimationStarted(action));
        }

        if progress.drained
            && let Some(previous) = self.previous.as_ref()
        {
            let signal = self.turn.resume_deferred(previous);
            self.on_turn_signal(signal);
        }
    }

    // ------------------------------------------------------------------------
    // Input
    // ------------------------------------------------------------------------

    fn handle_command(&mut self, command: Command, submission: &mut Option<SubmissionTask>) {
        let Some(snapshot) = self.previous.as_ref() else {
            debug!(?command, "Ignoring input before the first snapshot");
            return;
        };

        let outcome = match command {
            Command::ChooseAction(kind) => self.turn.choose_action(kind, snapshot).map(Some),
            Command::ChooseActionOn(kind, rule) => {
                self.turn.choose_action_with(kind, rule, snapshot).map(Some)
            }
            Command::ChooseItem { item_key } => self.turn.choose_item(item_key, snapshot).map(Some),
            Command::Hover(target) => self.turn.hover(target).map(|_| None),
            Command::CycleTarget(step) => self.turn.cycle_target(step).map(|_| None),
            Command::ConfirmTarget(index) => self
                .turn
                .confirm_target(index)
                .map(|intent| Some(ActionStep::Submit(intent))),
            Command::Back => self.turn.back().map(|_| None),
            Command::Cancel => self.turn.cancel().map(|_| None),
        };

        match outcome {
            Ok(step) => {
                self.sync_mode();
                match step {
                    Some(ActionStep::SelectTarget { candidates, .. }) => {
                        self.emit(EngineEvent::TargetsOffered { candidates });
                        self.emit_hover();
                    }
                    Some(ActionStep::Submit(intent)) => {
                        debug!(?intent, "Intent confirmed");
                        let submitter = self.submitter.clone();
                        let ctx = self.ctx.clone();
                        *submission =
                            Some(tokio::spawn(async move { submitter.submit(&ctx, intent).await }));
                    }
                    None if matches!(command, Command::Hover(_) | Command::CycleTarget(_)) => {
                        self.emit_hover();
                    }
                    None => {}
                }
            }
            Err(e) => self.on_input_error(e),
        }
    }

    fn on_input_error(&mut self, error: InputError) {
        if error.is_rejection() {
            self.emit(EngineEvent::Feedback(Feedback::Shake));
            self.say(MessageLevel::Warning, error.to_string());
        } else {
            debug!("Input ignored: {}", error);
        }
    }

    fn emit_hover(&self) {
        if let Some(target) = self.turn.hovered() {
            self.emit(EngineEvent::Hovered(target));
        }
    }

    fn on_turn_signal(&mut self, signal: TurnSignal) {
        match signal {
            TurnSignal::Opened { actor } => debug!(actor, "Input opened"),
            TurnSignal::Deferred { actor } => debug!(actor, "Input deferred"),
            TurnSignal::Closed => debug!("Input closed"),
            TurnSignal::Unchanged => {}
        }
        self.sync_mode();
    }

    fn sync_mode(&mut self) {
        let current = (
            self.turn.mode(),
            self.turn.affordances(),
            self.turn.actor(),
        );
        if current != self.last_mode {
            self.last_mode = current;
            self.emit(EngineEvent::ModeChanged {
                mode: current.0,
                affordances: current.1,
                actor: current.2,
            });
        }
    }

    // ------------------------------------------------------------------------
    // Submission
    // ------------------------------------------------------------------------

    fn on_submission(
        &mut self,
        joined: Result<Result<Settlement, SubmitError>, JoinError>,
        polls: &mut JoinSet<PollResult>,
    ) {
        // Cleanup first, whatever happened.
        let spent = match &joined {
            Ok(Ok(settlement)) => Some(settlement.marker),
            _ => None,
        };
        self.turn.finish_processing(spent);
        self.sync_mode();

        let resync = match joined {
            Ok(Ok(settlement)) => {
                // Responses to fetches issued before settlement predate the action.
                self.poller.invalidate();
                self.on_settled(settlement);
                true
            }
            Ok(Err(e)) => {
                warn!("Submission failed: {}", e);
                if let Some(feedback) = e.feedback() {
                    self.emit(EngineEvent::Feedback(feedback));
                }
                self.say(MessageLevel::Error, e.to_string());
                e.forces_resync()
            }
            Err(e) => {
                error!("Submission task failed: {}", e);
                self.emit(EngineEvent::Feedback(Feedback::Flash));
                self.say(MessageLevel::Error, "Action could not be submitted.");
                true
            }
        };

        if resync && self.polling {
            self.spawn_poll(polls);
        }

        // Only a failure that leaves the view current reopens input here.
        // Otherwise the resync poll decides.
        if !resync && let Some(previous) = self.previous.as_ref() {
            let signal = self.turn.observe(previous, self.animations.is_busy());
            self.on_turn_signal(signal);
        }
    }

    fn on_settled(&mut self, settlement: Settlement) {
        if let Some(stale) = settlement.substituted {
            debug!(stale = %stale.target, "Submitted against a substitute target");
        }

        let actor = BattlerId::hero(settlement.intent.actor_index);
        let target = settlement.target();
        let text = match target {
            Some(target) => format!("{} used {} on {}", actor, settlement.intent.action, target),
            None => format!("{} used {}", actor, settlement.intent.action),
        };
        self.say(MessageLevel::Info, text);

        self.emit(EngineEvent::Settled {
            action: settlement.intent.action,
            target,
            slot: settlement.handle.slot,
        });
        self.enqueue_animation(InferredAction::submitted(
            actor,
            settlement.intent.action,
            target,
        ));
    }

    // ------------------------------------------------------------------------
    // Conclusion
    // ------------------------------------------------------------------------

    fn spawn_conclude(&self) -> ConclusionTask {
        let authority = Arc::clone(&self.authority);
        let composer = Arc::clone(&self.composer);
        let ctx = self.ctx.clone();
        info!("Concluding encounter");
        tokio::spawn(async move { authority.conclude(&ctx, composer.as_ref()).await })
    }

    fn on_conclusion(&mut self, joined: Result<Result<SettlementHandle, RemoteError>, JoinError>) {
        let victory = self.outcome.unwrap_or(false);
        match joined {
            Ok(Ok(handle)) => {
                info!(slot = handle.slot, victory, "Encounter concluded");
                self.emit(EngineEvent::Concluded { victory });
            }
            Ok(Err(e)) => {
                warn!("Conclude failed: {}", e);
                self.emit(EngineEvent::Feedback(Feedback::Flash));
                self.say(MessageLevel::Error, format!("Could not claim rewards: {}", e));
            }
            Err(e) => {
                error!("Conclude task failed: {}", e);
                self.say(MessageLevel::Error, "Could not claim rewards.");
            }
        }
    }

    // ------------------------------------------------------------------------
    // Output
    // ------------------------------------------------------------------------

    fn say(&mut self, level: MessageLevel, text: impl Into<String>) {
        let round = self.previous.as_ref().map(|s| s.marker.round());
        let entry = self
            .messages
            .record(MessageEntry::new(text, round, level))
            .clone();
        self.emit(EngineEvent::Message(entry));
    }

    fn emit(&self, event: EngineEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

/// Awaits an optional task, pending forever when there is none.
async fn join_opt<T>(task: &mut Option<JoinHandle<T>>) -> Result<T, JoinError> {
    match task {
        Some(task) => task.await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use client_remote_core::{AccountId, Composer, MockAuthority, MockLedger, MockSigner, Signer};
    use combat_core::{Combatant, Turn};

    use super::*;
    use crate::presentation::{PresentationCall, RecordingPresentation};

    fn ctx() -> EncounterContext {
        EncounterContext::new(AccountId::from_bytes(vec![1]), AccountId::from_bytes(vec![2]))
    }

    fn engine(presentation: RecordingPresentation) -> EncounterEngine<RecordingPresentation> {
        let snapshot = Snapshot::new(
            [Combatant::new(0, 30, 30)],
            [Combatant::new(0, 20, 20)],
            Turn::remote(0),
        );
        let composer = Composer::new(
            Arc::new(MockLedger::new()),
            Signer::SignOnly(Arc::new(MockSigner::new())),
        );
        EncounterEngine::new(
            EngineConfig::default(),
            Arc::new(MockAuthority::with_snapshot(snapshot)),
            Arc::new(composer),
            presentation,
        )
    }

    fn counting_disposer(handle: &mut EncounterHandle) -> Arc<AtomicU32> {
        let disposed = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&disposed);
        handle.on_stop(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        disposed
    }

    #[tokio::test(start_paused = true)]
    async fn stop_runs_disposers_once_and_tears_down() {
        let presentation = RecordingPresentation::new();
        let calls = presentation.calls();
        let engine = engine(presentation);
        let mut events = engine.subscribe();
        let mut handle = engine.start(ctx());
        let disposed = counting_disposer(&mut handle);

        while !matches!(events.recv().await.unwrap(), EngineEvent::SnapshotApplied { .. }) {}

        handle.stop().await.unwrap();
        assert_eq!(disposed.load(Ordering::SeqCst), 1);

        let destroyed = calls
            .snapshot()
            .into_iter()
            .filter(|call| matches!(call, PresentationCall::Destroy(_)))
            .count();
        assert_eq!(destroyed, 2);

        let mut last = None;
        while let Ok(event) = events.try_recv() {
            last = Some(event);
        }
        assert_eq!(last, Some(EngineEvent::Stopped));
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_handle_disposes() {
        let engine = engine(RecordingPresentation::new());
        let mut events = engine.subscribe();
        let mut handle = engine.start(ctx());
        let disposed = counting_disposer(&mut handle);

        drop(handle);
        assert_eq!(disposed.load(Ordering::SeqCst), 1);
        while events.recv().await.unwrap() != EngineEvent::Stopped {}
    }

    #[tokio::test(start_paused = true)]
    async fn commands_before_first_snapshot_are_ignored() {
        let engine = engine(RecordingPresentation::new());
        let mut events = engine.subscribe();
        let handle = engine.start(ctx());

        handle.send(Command::Cancel).await.unwrap();

        // First observable event is the snapshot, not a mode change or shake.
        let first = loop {
            match events.recv().await.unwrap() {
                EngineEvent::Waiting(_) => continue,
                other => break other,
            }
        };
        assert!(matches!(first, EngineEvent::SnapshotApplied { .. }));
        handle.stop().await.unwrap();
    }
}
