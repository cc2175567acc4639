use std::sync::Arc;

use async_channel::Sender;

use crate::{
    config::OutreachConfig,
    error::Result,
    service::{DraftGenerator, MailProvider, ProfileEnricher},
    store::Store,
    task::{BoundedRunner, RunEvent},
};

/// Entry point of the orchestration layer.
///
/// Holds the collaborators and the runner every batch operation fans out through. Campaign
/// operations live in [`crate::campaign`], contact operations in [`crate::contact`].
#[derive(Clone)]
pub struct Outreach {
    pub(crate) store: Arc<dyn Store>,
    pub(crate) mail: Arc<dyn MailProvider>,
    pub(crate) generator: Arc<dyn DraftGenerator>,
    pub(crate) enricher: Arc<dyn ProfileEnricher>,
    pub(crate) config: OutreachConfig,
    pub(crate) runner: BoundedRunner,
}

impl Outreach {
    pub fn new(
        config: OutreachConfig,
        store: Arc<dyn Store>,
        mail: Arc<dyn MailProvider>,
        generator: Arc<dyn DraftGenerator>,
        enricher: Arc<dyn ProfileEnricher>,
    ) -> Result<Self> {
        config.validate()?;
        let runner = BoundedRunner::new(config.concurrency)?;

        Ok(Self {
            store,
            mail,
            generator,
            enricher,
            config,
            runner,
        })
    }

    /// Report per-item progress of every batch operation on `sender`.
    ///
    /// Batches wait on a full bounded channel until it is read, so a bounded receiver must
    /// be drained while operations run. See [`BoundedRunner::with_events`].
    pub fn with_events(mut self, sender: Sender<RunEvent>) -> Self {
        self.runner = self.runner.with_events(sender);
        self
    }

    pub fn config(&self) -> &OutreachConfig {
        &self.config
    }

    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }
}
