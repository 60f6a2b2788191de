//! Remote collaborator traits.
//!
//! This module defines the layered remote abstraction:
//! - Layer 0: Ledger, SignAndSend, SignTransaction (pure infrastructure)
//! - Layer 1: ComposeAndSend (sequencing → simulate → sign → broadcast → inclusion)
//! - Layer 2: CombatAuthority (combat domain: poll, submit, conclude)

use std::sync::Arc;

use async_trait::async_trait;
use combat_core::{ActionIntent, DecodeError, Snapshot};

use crate::types::{
    EncounterContext, Sequencing, SettlementHandle, SignedTransaction, Transaction, TransactionId,
};

// ============================================================================
// Error Types
// ============================================================================

/// Transport layer errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    #[error("Account not found: {0}")]
    AccountNotFound(String),

    #[error("Backend-specific error: {0}")]
    BackendError(String),
}

/// Signer errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignerError {
    #[error("Signature request rejected by user")]
    UserRejected,

    #[error("Signer unavailable: {0}")]
    Unavailable(String),
}

/// Failure of one compose-and-send step. All of these reach the player as a
/// transient rejection.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmissionRejected {
    #[error("Could not fetch sequencing metadata: {0}")]
    Metadata(TransportError),

    #[error("Simulation failed: {0}")]
    Simulation(String),

    #[error("Signing failed: {0}")]
    Signing(#[from] SignerError),

    #[error("Broadcast failed: {0}")]
    Broadcast(TransportError),

    #[error("Transaction not included: {0}")]
    Inclusion(String),
}

/// Errors surfaced by the combat authority.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Submission rejected: {0}")]
    Rejected(#[from] SubmissionRejected),

    #[error("Malformed combat state: {0}")]
    Decode(String),

    #[error("Authority refused intent: {0}")]
    InvalidIntent(String),
}

impl From<DecodeError> for RemoteError {
    fn from(error: DecodeError) -> Self {
        RemoteError::Decode(error.to_string())
    }
}

// ============================================================================
// Layer 0: Pure Infrastructure
// ============================================================================

/// Ledger RPC without any combat knowledge.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Fetch the current sequencing and fee metadata.
    async fn sequencing(&self) -> Result<Sequencing, TransportError>;

    /// Dry-run a transaction. `Err` carries the simulation log.
    async fn simulate(&self, tx: &Transaction) -> Result<(), String>;

    /// Broadcast an already signed transaction.
    async fn broadcast(&self, tx: SignedTransaction) -> Result<TransactionId, TransportError>;

    /// Wait until the transaction is included. Returns the slot.
    async fn await_inclusion(&self, id: &TransactionId) -> Result<u64, TransportError>;
}

/// Wallets that sign and broadcast in one step.
#[async_trait]
pub trait SignAndSend: Send + Sync {
    async fn sign_and_send(&self, tx: Transaction) -> Result<TransactionId, SignerError>;
}

/// Wallets that only sign; broadcast goes through the [`Ledger`].
#[async_trait]
pub trait SignTransaction: Send + Sync {
    async fn sign(&self, tx: Transaction) -> Result<SignedTransaction, SignerError>;
}

/// The two signer shapes a wallet may expose.
#[derive(Clone)]
pub enum Signer {
    SignAndSend(Arc<dyn SignAndSend>),
    SignOnly(Arc<dyn SignTransaction>),
}

impl std::fmt::Debug for Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Signer::SignAndSend(_) => f.write_str("Signer::SignAndSend"),
            Signer::SignOnly(_) => f.write_str("Signer::SignOnly"),
        }
    }
}

// ============================================================================
// Layer 1: Composition
// ============================================================================

/// Caller-supplied compose-and-send step handed to the authority.
///
/// Implementations attach sequencing metadata, simulate before asking for a
/// signature, sign and broadcast, then wait for inclusion.
#[async_trait]
pub trait ComposeAndSend: Send + Sync {
    async fn compose_and_send(
        &self,
        tx: Transaction,
    ) -> Result<SettlementHandle, SubmissionRejected>;
}

// ============================================================================
// Layer 2: Combat Domain
// ============================================================================

/// The remote rules authority.
#[async_trait]
pub trait CombatAuthority: Send + Sync {
    /// Latest snapshot, or `None` when no encounter is active for `ctx`.
    async fn poll(&self, ctx: &EncounterContext) -> Result<Option<Snapshot>, RemoteError>;

    /// Build the instruction for `intent` and settle it through `composer`.
    async fn submit(
        &self,
        ctx: &EncounterContext,
        intent: &ActionIntent,
        composer: &dyn ComposeAndSend,
    ) -> Result<SettlementHandle, RemoteError>;

    /// Apply end-of-encounter rewards once the resolution is final.
    async fn conclude(
        &self,
        ctx: &EncounterContext,
        composer: &dyn ComposeAndSend,
    ) -> Result<SettlementHandle, RemoteError>;
}
