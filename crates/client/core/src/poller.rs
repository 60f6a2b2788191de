//! Snapshot fetching with latest-wins ordering.
//!
//! Fetches may overlap: a slow response can arrive after a newer one has
//! already been applied. Each fetch carries a [`PollTicket`] and
//! [`SnapshotClient::accept`] admits a response only when its ticket is newer
//! than the last one admitted, so state never rolls backward.
use std::future::Future;
use std::sync::Arc;

use client_remote_core::{CombatAuthority, EncounterContext, RemoteError};
use combat_core::Snapshot;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PollTicket(u64);

/// A completed fetch tagged with the ticket it was issued under.
#[derive(Debug)]
pub struct PollResult {
    pub ticket: PollTicket,
    pub result: Result<Option<Snapshot>, RemoteError>,
}

pub struct SnapshotClient {
    authority: Arc<dyn CombatAuthority>,
    issued: u64,
    applied: u64,
}

impl SnapshotClient {
    pub fn new(authority: Arc<dyn CombatAuthority>) -> Self {
        Self {
            authority,
            issued: 0,
            applied: 0,
        }
    }

    /// Single untracked fetch. `None` means no active encounter.
    pub async fn fetch(&self, ctx: &EncounterContext) -> Result<Option<Snapshot>, RemoteError> {
        self.authority.poll(ctx).await
    }

    pub fn issue(&mut self) -> PollTicket {
        self.issued += 1;
        PollTicket(self.issued)
    }

    /// Issues a ticket and returns a detached fetch future for it, suitable
    /// for spawning.
    pub fn request(
        &mut self,
        ctx: EncounterContext,
    ) -> impl Future<Output = PollResult> + Send + 'static {
        let ticket = self.issue();
        let authority = Arc::clone(&self.authority);
        async move {
            let result = authority.poll(&ctx).await;
            PollResult { ticket, result }
        }
    }

    /// Admits `ticket` if it is newer than every ticket admitted so far.
    pub fn accept(&mut self, ticket: PollTicket) -> bool {
        if ticket.0 <= self.applied {
            return false;
        }
        self.applied = ticket.0;
        true
    }

    /// Discards every fetch issued so far; only later requests can apply.
    pub fn invalidate(&mut self) {
        self.applied = self.issued;
    }

    /// Fetches still outstanding or discarded since the last admitted one.
    pub fn in_flight(&self) -> u64 {
        self.issued - self.applied
    }
}
