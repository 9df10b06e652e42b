use crate::concurrency::{UpdateGuard, UpdateOutcome};
use crate::config::DocketConfig;
use crate::core::{Clock, DocketError, EntityId, Result, SystemClock};
use crate::domain::DocumentService;
use crate::sequence::{SequenceDefinition, SequenceService, SequenceStore};
use crate::storage::{MemoryStore, TransactionalStore};
use crate::tracking::ChangeTracked;
use crate::transaction::scope::finish;
use std::sync::Arc;

/// Entry point bundling a store with the numbering and update services.
///
/// The `*_in` methods join a transaction the caller already holds. The
/// others open, commit and, on failure, roll back a transaction of their own.
///
/// # Examples
///
/// ```
/// use docket::Docket;
///
/// # tokio_test::block_on(async {
/// let docket = Docket::in_memory();
/// docket.define_sequence("PO", "PO-#####", 10).await.unwrap();
///
/// assert_eq!(docket.next_number("PO").await.unwrap(), "PO-00011");
/// # });
/// ```
#[derive(Clone)]
pub struct Docket<S> {
    store: S,
    config: DocketConfig,
    sequences: SequenceService,
    documents: DocumentService,
    guard: UpdateGuard,
}

impl Docket<MemoryStore> {
    /// An empty in-memory store with the default configuration.
    pub fn in_memory() -> Self {
        let config = DocketConfig::default();
        Self::assemble(MemoryStore::with_config(&config), config, Arc::new(SystemClock))
    }
}

impl<S: TransactionalStore> Docket<S> {
    /// Fails with `DocketError::Config` when `config` does not validate.
    pub fn new(store: S, config: DocketConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate().map_err(DocketError::Config)?;
        Ok(Self::assemble(store, config, clock))
    }

    fn assemble(store: S, config: DocketConfig, clock: Arc<dyn Clock>) -> Self {
        let sequences = SequenceService::new(SequenceStore::with_config(&config, Arc::clone(&clock)));
        Self {
            store,
            documents: DocumentService::new(sequences.clone(), Arc::clone(&clock)),
            sequences,
            guard: UpdateGuard::new(clock),
            config,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &DocketConfig {
        &self.config
    }

    pub fn sequences(&self) -> &SequenceService {
        &self.sequences
    }

    pub fn documents(&self) -> &DocumentService {
        &self.documents
    }

    pub async fn begin(&self) -> Result<S::Tx> {
        self.store.begin().await
    }

    pub async fn define_sequence(
        &self,
        module: &str,
        template: &str,
        last_number: u64,
    ) -> Result<SequenceDefinition> {
        let mut tx = self.store.begin().await?;
        let actor = self.config.system_actor.clone();
        let defined = self
            .sequences
            .store()
            .define(&mut tx, module, template, last_number, &actor)
            .await;
        finish(tx, defined).await
    }

    /// Issue one number in a transaction of its own.
    pub async fn next_number(&self, module: &str) -> Result<String> {
        let mut tx = self.store.begin().await?;
        let issued = self.sequences.next_number_by_module(&mut tx, module).await;
        finish(tx, issued).await
    }

    pub async fn next_number_in(&self, tx: &mut S::Tx, module: &str) -> Result<String> {
        self.sequences.next_number_by_module(tx, module).await
    }

    pub async fn update<E: ChangeTracked>(
        &self,
        id: EntityId,
        partial: &E,
        actor: &str,
    ) -> Result<UpdateOutcome<E>> {
        let mut tx = self.store.begin().await?;
        let outcome = self.guard.update(&mut tx, id, partial, actor).await;
        finish(tx, outcome).await
    }

    pub async fn update_in<E: ChangeTracked>(
        &self,
        tx: &mut S::Tx,
        id: EntityId,
        partial: &E,
        actor: &str,
    ) -> Result<UpdateOutcome<E>> {
        self.guard.update(tx, id, partial, actor).await
    }
}
