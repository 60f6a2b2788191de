//! Default compose-and-send pipeline.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::traits::{ComposeAndSend, Ledger, Signer, SubmissionRejected};
use crate::types::{SettlementHandle, Transaction, TransactionId};

/// Ledger plus signer, composed into the five-step send pipeline:
/// sequencing metadata, simulation, signing, broadcast, inclusion.
///
/// Simulation runs before the wallet is asked for a signature so a doomed
/// transaction never reaches the player's signing prompt.
#[derive(Clone)]
pub struct Composer {
    ledger: Arc<dyn Ledger>,
    signer: Signer,
}

impl Composer {
    pub fn new(ledger: Arc<dyn Ledger>, signer: Signer) -> Self {
        Self { ledger, signer }
    }

    async fn sign_and_broadcast(
        &self,
        tx: Transaction,
    ) -> Result<TransactionId, SubmissionRejected> {
        match &self.signer {
            Signer::SignAndSend(wallet) => Ok(wallet.sign_and_send(tx).await?),
            Signer::SignOnly(wallet) => {
                let signed = wallet.sign(tx).await?;
                self.ledger
                    .broadcast(signed)
                    .await
                    .map_err(SubmissionRejected::Broadcast)
            }
        }
    }
}

impl std::fmt::Debug for Composer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Composer")
            .field("signer", &self.signer)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ComposeAndSend for Composer {
    async fn compose_and_send(
        &self,
        tx: Transaction,
    ) -> Result<SettlementHandle, SubmissionRejected> {
        let sequencing = self
            .ledger
            .sequencing()
            .await
            .map_err(SubmissionRejected::Metadata)?;
        let tx = tx.with_sequencing(sequencing);

        if let Err(log) = self.ledger.simulate(&tx).await {
            warn!(label = %tx.label, %log, "Simulation failed, not asking for a signature");
            return Err(SubmissionRejected::Simulation(log));
        }

        let label = tx.label.clone();
        let transaction_id = self.sign_and_broadcast(tx).await?;
        debug!(%label, "Broadcast accepted, awaiting inclusion");

        let slot = self
            .ledger
            .await_inclusion(&transaction_id)
            .await
            .map_err(|e| SubmissionRejected::Inclusion(e.to_string()))?;

        debug!(%label, slot, "Transaction included");
        Ok(SettlementHandle {
            transaction_id,
            slot,
        })
    }
}
