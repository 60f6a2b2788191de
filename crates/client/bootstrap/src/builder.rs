//! Assembles an encounter engine from host-provided collaborators.
use std::sync::Arc;

use anyhow::{Result, anyhow};
use client_core::{EncounterEngine, EncounterHandle, EngineConfig, Presentation};
use client_remote_core::{
    CombatAuthority, ComposeAndSend, Composer, EncounterContext, Ledger, Signer,
};

/// Builder that wires authority, wallet and presentation into an engine.
///
/// The transaction pipeline is either a ready [`ComposeAndSend`] or a ledger
/// plus signer, from which a [`Composer`] is built.
pub struct EncounterBuilder<P> {
    config: EngineConfig,
    authority: Option<Arc<dyn CombatAuthority>>,
    composer: Option<Arc<dyn ComposeAndSend>>,
    wallet: Option<(Arc<dyn Ledger>, Signer)>,
    presentation: Option<P>,
}

impl<P> Default for EncounterBuilder<P> {
    fn default() -> Self {
        Self {
            config: EngineConfig::default(),
            authority: None,
            composer: None,
            wallet: None,
            presentation: None,
        }
    }
}

impl<P> EncounterBuilder<P>
where
    P: Presentation + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn authority(mut self, authority: Arc<dyn CombatAuthority>) -> Self {
        self.authority = Some(authority);
        self
    }

    /// Use a ready transaction pipeline. Takes precedence over [`wallet`](Self::wallet).
    pub fn composer(mut self, composer: Arc<dyn ComposeAndSend>) -> Self {
        self.composer = Some(composer);
        self
    }

    pub fn wallet(mut self, ledger: Arc<dyn Ledger>, signer: Signer) -> Self {
        self.wallet = Some((ledger, signer));
        self
    }

    pub fn presentation(mut self, presentation: P) -> Self {
        self.presentation = Some(presentation);
        self
    }

    pub fn build(self) -> Result<EncounterEngine<P>> {
        let authority = self
            .authority
            .ok_or_else(|| anyhow!("combat authority not configured"))?;

        let composer = match (self.composer, self.wallet) {
            (Some(composer), _) => composer,
            (None, Some((ledger, signer))) => {
                tracing::debug!(?signer, "Building transaction composer");
                Arc::new(Composer::new(ledger, signer))
            }
            (None, None) => return Err(anyhow!("neither composer nor wallet configured")),
        };

        let presentation = self
            .presentation
            .ok_or_else(|| anyhow!("presentation not configured"))?;

        Ok(EncounterEngine::new(
            self.config,
            authority,
            composer,
            presentation,
        ))
    }

    /// Builds and starts the engine. Must be called inside a tokio runtime.
    pub fn start(self, ctx: EncounterContext) -> Result<EncounterHandle> {
        Ok(self.build()?.start(ctx))
    }
}
