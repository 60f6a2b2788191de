//! Remote abstraction layer for the combat client.
//!
//! # Architecture
//!
//! ```text
//! Layer 2: CombatAuthority (poll / submit / conclude)
//!          └── takes a &dyn ComposeAndSend per call
//!
//! Layer 1: ComposeAndSend
//!          └── Composer (Ledger + Signer)
//!
//! Layer 0: Ledger, SignAndSend, SignTransaction (pure infrastructure)
//! ```
//!
//! The authority owns the rules; the client only ever reads snapshots from it
//! and hands it intents. Ledger and wallet specifics stay behind layer 0 so the
//! engine can run against the in-memory doubles in [`mock`].
//!
//! # Usage
//!
//! ```ignore
//! use client_remote_core::{CombatAuthority, Composer, Signer};
//!
//! let composer = Composer::new(ledger, Signer::SignOnly(wallet));
//! if let Some(snapshot) = authority.poll(&ctx).await? {
//!     authority.submit(&ctx, &intent, &composer).await?;
//! }
//! ```

pub mod composer;
pub mod traits;
pub mod types;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use composer::Composer;

// Re-export all traits
pub use traits::{
    CombatAuthority, ComposeAndSend, Ledger, RemoteError, SignAndSend, SignTransaction, Signer,
    SignerError, SubmissionRejected, TransportError,
};

// Re-export all types
pub use types::{
    AccountId, EncounterContext, Sequencing, SettlementHandle, SignedTransaction, Transaction,
    TransactionId,
};

#[cfg(any(test, feature = "mock"))]
pub use mock::{LedgerStep, MockAuthority, MockLedger, MockSigner};
