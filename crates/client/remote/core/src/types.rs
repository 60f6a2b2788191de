//! Common types for talking to the remote combat authority.

use serde::{Deserialize, Serialize};

/// Generic account address (ledger-specific public key or object id).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountId(pub Vec<u8>);

impl AccountId {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

/// Identifies one encounter on the authority.
///
/// Every authority call carries this so the client never has to hold
/// ledger-specific addresses elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EncounterContext {
    /// Adventure account the combat lives in
    pub adventure: AccountId,

    /// Wallet that owns the party
    pub owner: AccountId,
}

impl EncounterContext {
    pub fn new(adventure: AccountId, owner: AccountId) -> Self {
        Self { adventure, owner }
    }
}

/// Generic transaction identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionId(pub Vec<u8>);

impl TransactionId {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

/// Network metadata attached before simulation (recent block hash, fee).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sequencing {
    pub recent_block: Vec<u8>,
    pub fee_per_unit: u64,
}

/// An unsigned authority instruction ready to be composed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Instruction name, for logs
    pub label: String,

    /// Authority-specific instruction bytes
    pub payload: Vec<u8>,

    /// Filled in by the composer before simulation
    pub sequencing: Option<Sequencing>,
}

impl Transaction {
    pub fn new(label: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            label: label.into(),
            payload,
            sequencing: None,
        }
    }

    pub fn with_sequencing(mut self, sequencing: Sequencing) -> Self {
        self.sequencing = Some(sequencing);
        self
    }
}

/// A transaction plus the signer's signature, ready for raw broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTransaction {
    pub transaction: Transaction,
    pub signature: Vec<u8>,
}

/// Settlement confirmation returned by the authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementHandle {
    /// Transaction ID on the ledger
    pub transaction_id: TransactionId,

    /// Slot the transaction was included in
    pub slot: u64,
}
