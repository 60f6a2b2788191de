//! In-memory doubles for the remote collaborators.
//!
//! Simulates the authority, ledger and wallet without a network so the engine
//! can be driven deterministically from tests.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use combat_core::{ActionIntent, ActionKind, Snapshot};

use crate::traits::{
    CombatAuthority, ComposeAndSend, Ledger, RemoteError, SignAndSend, SignTransaction,
    SignerError, TransportError,
};
use crate::types::{
    EncounterContext, Sequencing, SettlementHandle, SignedTransaction, Transaction, TransactionId,
};

// ============================================================================
// Authority
// ============================================================================

/// Mock combat authority.
///
/// Holds either a decoded snapshot or a raw combat document, which every
/// poll decodes strictly. Tests script failures, latency and the snapshot
/// installed after a successful submission.
///
/// Like the live authority, submissions are refused with
/// [`RemoteError::InvalidIntent`] when the intent's actor is not on turn or
/// an item action carries no item, and with
/// [`TransportError::AccountNotFound`] when no encounter exists.
#[derive(Default)]
pub struct MockAuthority {
    snapshot: Mutex<Option<Snapshot>>,
    document: Mutex<Option<Vec<u8>>>,
    after_submit: Mutex<Option<Snapshot>>,
    poll_failures: Mutex<u32>,
    poll_latency: Mutex<Option<Duration>>,
    polls: Mutex<u64>,
    submissions: Mutex<Vec<ActionIntent>>,
    reject_next: Mutex<Option<RemoteError>>,
    panic_next: Mutex<bool>,
    conclusions: Mutex<u32>,
}

impl MockAuthority {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        let authority = Self::new();
        authority.set_snapshot(Some(snapshot));
        authority
    }

    pub fn set_snapshot(&self, snapshot: Option<Snapshot>) {
        *self.document.lock().unwrap() = None;
        *self.snapshot.lock().unwrap() = snapshot;
    }

    /// Serve a raw combat document instead of a decoded snapshot.
    pub fn set_document(&self, json: impl Into<Vec<u8>>) {
        *self.snapshot.lock().unwrap() = None;
        *self.document.lock().unwrap() = Some(json.into());
    }

    /// Snapshot to publish once the next submission settles.
    pub fn set_snapshot_after_submit(&self, snapshot: Snapshot) {
        *self.after_submit.lock().unwrap() = Some(snapshot);
    }

    pub fn fail_next_polls(&self, count: u32) {
        *self.poll_failures.lock().unwrap() = count;
    }

    pub fn set_poll_latency(&self, latency: Option<Duration>) {
        *self.poll_latency.lock().unwrap() = latency;
    }

    pub fn reject_next_submit(&self, error: RemoteError) {
        *self.reject_next.lock().unwrap() = Some(error);
    }

    pub fn panic_next_submit(&self) {
        *self.panic_next.lock().unwrap() = true;
    }

    pub fn poll_count(&self) -> u64 {
        *self.polls.lock().unwrap()
    }

    pub fn submissions(&self) -> Vec<ActionIntent> {
        self.submissions.lock().unwrap().clone()
    }

    pub fn conclusions(&self) -> u32 {
        *self.conclusions.lock().unwrap()
    }

    fn current(&self) -> Result<Option<Snapshot>, RemoteError> {
        let document = self.document.lock().unwrap().clone();
        match document {
            Some(bytes) => Ok(Some(Snapshot::from_json(&bytes)?)),
            None => Ok(self.snapshot.lock().unwrap().clone()),
        }
    }

    fn validate(current: &Snapshot, intent: &ActionIntent) -> Result<(), RemoteError> {
        if current.local_actor().map(|c| c.index) != Some(intent.actor_index) {
            return Err(RemoteError::InvalidIntent(format!(
                "hero {} is not on turn",
                intent.actor_index
            )));
        }
        if intent.action == ActionKind::UseItem && intent.item_key.is_none() {
            return Err(RemoteError::InvalidIntent("item action without an item".into()));
        }
        Ok(())
    }

    fn encode(intent: &ActionIntent) -> Transaction {
        let label: &'static str = intent.action.into();
        Transaction::new(
            format!("combat_{}", label.to_lowercase()),
            vec![
                intent.actor_index,
                intent.target_index.unwrap_or(u8::MAX),
                intent.item_key.unwrap_or(0),
            ],
        )
    }
}

#[async_trait]
impl CombatAuthority for MockAuthority {
    async fn poll(&self, _ctx: &EncounterContext) -> Result<Option<Snapshot>, RemoteError> {
        let latency = *self.poll_latency.lock().unwrap();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        *self.polls.lock().unwrap() += 1;

        {
            let mut failures = self.poll_failures.lock().unwrap();
            if *failures > 0 {
                *failures -= 1;
                return Err(TransportError::NetworkError("mock poll failure".into()).into());
            }
        }

        self.current()
    }

    async fn submit(
        &self,
        _ctx: &EncounterContext,
        intent: &ActionIntent,
        composer: &dyn ComposeAndSend,
    ) -> Result<SettlementHandle, RemoteError> {
        self.submissions.lock().unwrap().push(intent.clone());

        if std::mem::take(&mut *self.panic_next.lock().unwrap()) {
            panic!("mock authority panicked during submit");
        }
        let rejection = self.reject_next.lock().unwrap().take();
        if let Some(error) = rejection {
            return Err(error);
        }

        let Some(current) = self.current()? else {
            return Err(TransportError::AccountNotFound("combat account".into()).into());
        };
        Self::validate(&current, intent)?;

        let handle = composer.compose_and_send(Self::encode(intent)).await?;

        let next = self.after_submit.lock().unwrap().take();
        if let Some(next) = next {
            self.set_snapshot(Some(next));
        }
        Ok(handle)
    }

    async fn conclude(
        &self,
        _ctx: &EncounterContext,
        composer: &dyn ComposeAndSend,
    ) -> Result<SettlementHandle, RemoteError> {
        *self.conclusions.lock().unwrap() += 1;
        Ok(composer
            .compose_and_send(Transaction::new("conclude_combat", Vec::new()))
            .await?)
    }
}

// ============================================================================
// Ledger
// ============================================================================

/// Ledger calls in the order they were made.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerStep {
    Sequencing,
    Simulate,
    Broadcast,
    AwaitInclusion,
}

/// Mock ledger that records every call.
#[derive(Default)]
pub struct MockLedger {
    steps: Mutex<Vec<LedgerStep>>,
    sequencing_failure: Mutex<Option<TransportError>>,
    simulation_failure: Mutex<Option<String>>,
    broadcast_failure: Mutex<Option<TransportError>>,
    inclusion_failure: Mutex<Option<String>>,
    slot: Mutex<u64>,
}

impl MockLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_sequencing(&self, error: TransportError) {
        *self.sequencing_failure.lock().unwrap() = Some(error);
    }

    pub fn fail_simulation(&self, log: impl Into<String>) {
        *self.simulation_failure.lock().unwrap() = Some(log.into());
    }

    pub fn fail_broadcast(&self, error: TransportError) {
        *self.broadcast_failure.lock().unwrap() = Some(error);
    }

    /// The next transaction lands but its program aborts.
    pub fn fail_inclusion(&self, reason: impl Into<String>) {
        *self.inclusion_failure.lock().unwrap() = Some(reason.into());
    }

    pub fn steps(&self) -> Vec<LedgerStep> {
        self.steps.lock().unwrap().clone()
    }

    fn record(&self, step: LedgerStep) {
        self.steps.lock().unwrap().push(step);
    }
}

#[async_trait]
impl Ledger for MockLedger {
    async fn sequencing(&self) -> Result<Sequencing, TransportError> {
        self.record(LedgerStep::Sequencing);
        if let Some(error) = self.sequencing_failure.lock().unwrap().take() {
            return Err(error);
        }
        Ok(Sequencing {
            recent_block: vec![0xAB; 32],
            fee_per_unit: 5_000,
        })
    }

    async fn simulate(&self, _tx: &Transaction) -> Result<(), String> {
        self.record(LedgerStep::Simulate);
        match self.simulation_failure.lock().unwrap().take() {
            Some(log) => Err(log),
            None => Ok(()),
        }
    }

    async fn broadcast(&self, tx: SignedTransaction) -> Result<TransactionId, TransportError> {
        self.record(LedgerStep::Broadcast);
        if let Some(error) = self.broadcast_failure.lock().unwrap().take() {
            return Err(error);
        }
        Ok(TransactionId::from_bytes(tx.signature))
    }

    async fn await_inclusion(&self, _id: &TransactionId) -> Result<u64, TransportError> {
        self.record(LedgerStep::AwaitInclusion);
        if let Some(reason) = self.inclusion_failure.lock().unwrap().take() {
            return Err(TransportError::TransactionFailed(reason));
        }
        let mut slot = self.slot.lock().unwrap();
        *slot += 1;
        Ok(*slot)
    }
}

// ============================================================================
// Signer
// ============================================================================

/// Mock wallet implementing both signer shapes.
#[derive(Default)]
pub struct MockSigner {
    failure: Option<SignerError>,
    signed: Mutex<u32>,
}

impl MockSigner {
    pub fn new() -> Self {
        Self::default()
    }

    /// A wallet whose user declines every prompt.
    pub fn rejecting() -> Self {
        Self {
            failure: Some(SignerError::UserRejected),
            ..Self::default()
        }
    }

    /// A wallet that is locked or disconnected.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            failure: Some(SignerError::Unavailable(reason.into())),
            ..Self::default()
        }
    }

    pub fn signed(&self) -> u32 {
        *self.signed.lock().unwrap()
    }

    fn next_signature(&self) -> Result<Vec<u8>, SignerError> {
        if let Some(error) = &self.failure {
            return Err(error.clone());
        }
        let mut signed = self.signed.lock().unwrap();
        *signed += 1;
        Ok(signed.to_le_bytes().to_vec())
    }
}

#[async_trait]
impl SignTransaction for MockSigner {
    async fn sign(&self, transaction: Transaction) -> Result<SignedTransaction, SignerError> {
        let signature = self.next_signature()?;
        Ok(SignedTransaction {
            transaction,
            signature,
        })
    }
}

#[async_trait]
impl SignAndSend for MockSigner {
    async fn sign_and_send(&self, _tx: Transaction) -> Result<TransactionId, SignerError> {
        self.next_signature().map(TransactionId::from_bytes)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use combat_core::{ActionKind, Combatant, Side, Turn};

    use super::*;
    use crate::composer::Composer;
    use crate::traits::Signer;
    use crate::types::AccountId;

    fn ctx() -> EncounterContext {
        EncounterContext::new(AccountId::from_bytes(vec![1]), AccountId::from_bytes(vec![2]))
    }

    fn snapshot(turn: Turn) -> Snapshot {
        Snapshot::new(
            [Combatant::new(0, 30, 30).with_ap(2, 3)],
            [Combatant::new(0, 20, 20)],
            turn,
        )
    }

    #[tokio::test]
    async fn poll_returns_scripted_snapshot_after_failures() {
        let authority = MockAuthority::with_snapshot(snapshot(Turn::local(0)));
        authority.fail_next_polls(1);

        assert!(authority.poll(&ctx()).await.is_err());
        assert!(authority.poll(&ctx()).await.unwrap().is_some());
        assert_eq!(authority.poll_count(), 2);
    }

    #[tokio::test]
    async fn submit_installs_follow_up_snapshot() {
        let authority = MockAuthority::with_snapshot(snapshot(Turn::local(0)));
        authority.set_snapshot_after_submit(snapshot(Turn::remote(0)));
        let composer = Composer::new(
            Arc::new(MockLedger::new()),
            Signer::SignOnly(Arc::new(MockSigner::new())),
        );

        let intent = ActionIntent::targeted(0, ActionKind::Attack, Side::Enemies, 0);
        authority.submit(&ctx(), &intent, &composer).await.unwrap();

        assert_eq!(authority.submissions(), vec![intent]);
        let next = authority.poll(&ctx()).await.unwrap().unwrap();
        assert!(!next.is_local_turn());
    }

    const DOCUMENT: &str = r#"{
        "round": 2,
        "turnCursor": 0,
        "rngState": 7,
        "heroes": [{ "alive": true, "hp": 30, "maxHp": 30, "ap": 2, "maxAp": 3 }],
        "enemies": [{ "alive": true, "hp": 20, "maxHp": 20, "ap": 1, "maxAp": 2 }],
        "initiative": [
            { "occupant": "hero", "index": 0, "active": true },
            { "occupant": "enemy", "index": 0, "active": true }
        ],
        "resolution": "active"
    }"#;

    #[tokio::test]
    async fn document_is_decoded_on_every_poll() {
        let authority = MockAuthority::new();
        authority.set_document(DOCUMENT);

        let snapshot = authority.poll(&ctx()).await.unwrap().unwrap();
        assert!(snapshot.is_local_turn());
        assert_eq!(snapshot.marker.round(), 2);
    }

    #[tokio::test]
    async fn malformed_document_surfaces_as_decode_error() {
        let authority = MockAuthority::new();
        authority.set_document(DOCUMENT.replace(r#""hp": 20"#, r#""hp": 45"#));

        let err = authority.poll(&ctx()).await.unwrap_err();
        let RemoteError::Decode(reason) = err else {
            panic!("expected decode error, got {err:?}");
        };
        assert!(reason.contains("above max"));

        // A shape the decoder does not know is refused too.
        authority.set_document(DOCUMENT.replace(r#""rngState""#, r#""seed""#));
        assert!(matches!(
            authority.poll(&ctx()).await,
            Err(RemoteError::Decode(_))
        ));
    }

    fn composer() -> Composer {
        Composer::new(
            Arc::new(MockLedger::new()),
            Signer::SignOnly(Arc::new(MockSigner::new())),
        )
    }

    #[tokio::test]
    async fn submit_without_encounter_reports_missing_account() {
        let authority = MockAuthority::new();
        let intent = ActionIntent::targeted(0, ActionKind::Attack, Side::Enemies, 0);

        let err = authority.submit(&ctx(), &intent, &composer()).await.unwrap_err();
        assert!(matches!(
            err,
            RemoteError::Transport(TransportError::AccountNotFound(_))
        ));
    }

    #[tokio::test]
    async fn submit_refuses_intents_the_rules_reject() {
        let authority = MockAuthority::with_snapshot(snapshot(Turn::remote(0)));
        let attack = ActionIntent::targeted(0, ActionKind::Attack, Side::Enemies, 0);
        let err = authority.submit(&ctx(), &attack, &composer()).await.unwrap_err();
        assert!(matches!(err, RemoteError::InvalidIntent(_)));

        authority.set_snapshot(Some(snapshot(Turn::local(0))));
        let no_item = ActionIntent::targeted(0, ActionKind::UseItem, Side::Heroes, 0);
        let err = authority.submit(&ctx(), &no_item, &composer()).await.unwrap_err();
        assert_eq!(
            err,
            RemoteError::InvalidIntent("item action without an item".into())
        );

        let potion = no_item.with_item(3);
        authority.submit(&ctx(), &potion, &composer()).await.unwrap();
    }
}
