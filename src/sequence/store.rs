use super::definition::{SEQUENCE_TABLE, SequenceDefinition};
use super::format::Template;
use crate::config::{DEFAULT_PLACEHOLDER, DocketConfig};
use crate::core::{AuditFields, Clock, DocketError, Result, SystemClock};
use crate::storage::{Row, RowKey, StoreTransaction};
use std::sync::Arc;
use tracing::{debug, info};

/// Counter rows, one per module, mutated only under the row lock.
///
/// Every operation runs inside the caller's transaction and never commits.
#[derive(Clone)]
pub struct SequenceStore {
    clock: Arc<dyn Clock>,
    placeholder: char,
}

impl SequenceStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            placeholder: DEFAULT_PLACEHOLDER,
        }
    }

    pub fn with_config(config: &DocketConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            placeholder: config.placeholder,
        }
    }

    pub fn placeholder(&self) -> char {
        self.placeholder
    }

    /// Lock the module's row, increment its counter and write it back.
    ///
    /// Returns the definition carrying the newly reserved `last_number`.
    /// The lock is held until the caller's transaction ends, so concurrent
    /// reservations on one module are serialized and a rollback leaves a
    /// gap, never a duplicate.
    pub async fn reserve<T: StoreTransaction>(
        &self,
        tx: &mut T,
        module: &str,
    ) -> Result<SequenceDefinition> {
        let key = RowKey::from(module);
        let mut definition = lock_definition(tx, module, &key).await?;

        let next = definition.next_number().ok_or_else(|| {
            DocketError::InvalidDefinition(format!("counter for module '{module}' is exhausted"))
        })?;
        definition.last_number = next;

        write_definition(tx, &key, &definition).await?;
        debug!(txn = %tx.id(), module, number = next, "sequence number reserved");
        Ok(definition)
    }

    pub async fn define<T: StoreTransaction>(
        &self,
        tx: &mut T,
        module: &str,
        template: &str,
        last_number: u64,
        actor: &str,
    ) -> Result<SequenceDefinition> {
        let module = module.trim();
        if module.is_empty() {
            return Err(DocketError::InvalidDefinition(
                "module name cannot be empty".to_string(),
            ));
        }
        Template::parse_with(template, self.placeholder)?;

        let definition = SequenceDefinition {
            module: module.to_string(),
            template: template.to_string(),
            last_number,
            audit: AuditFields::created(actor, self.clock.now()),
        };
        tx.insert(SEQUENCE_TABLE, RowKey::from(module), encode(&definition)?)
            .await?;

        info!(module, template, last_number, actor, "sequence defined");
        Ok(definition)
    }

    pub async fn get<T: StoreTransaction>(
        &self,
        tx: &mut T,
        module: &str,
    ) -> Result<SequenceDefinition> {
        let row = tx
            .fetch(SEQUENCE_TABLE, &RowKey::from(module))
            .await?
            .ok_or_else(|| DocketError::not_found("sequence module", module))?;
        decode(row)
    }

    pub async fn list<T: StoreTransaction>(&self, tx: &mut T) -> Result<Vec<SequenceDefinition>> {
        tx.scan(SEQUENCE_TABLE)
            .await?
            .into_iter()
            .map(|(_, row)| decode(row))
            .collect()
    }

    /// Replace the module's template. The counter is untouched.
    pub async fn retemplate<T: StoreTransaction>(
        &self,
        tx: &mut T,
        module: &str,
        template: &str,
        actor: &str,
    ) -> Result<SequenceDefinition> {
        Template::parse_with(template, self.placeholder)?;

        let key = RowKey::from(module);
        let mut definition = lock_definition(tx, module, &key).await?;
        definition.template = template.to_string();
        definition.audit.stamp_modified(actor, self.clock.now());

        write_definition(tx, &key, &definition).await?;
        info!(module, template, actor, "sequence template changed");
        Ok(definition)
    }

    /// Move the counter forward, e.g. after importing documents numbered
    /// elsewhere. Moving it backwards would reissue numbers and is refused.
    pub async fn fast_forward<T: StoreTransaction>(
        &self,
        tx: &mut T,
        module: &str,
        last_number: u64,
        actor: &str,
    ) -> Result<SequenceDefinition> {
        let key = RowKey::from(module);
        let mut definition = lock_definition(tx, module, &key).await?;
        if last_number < definition.last_number {
            return Err(DocketError::InvalidDefinition(format!(
                "counter for '{module}' cannot move back from {} to {last_number}",
                definition.last_number
            )));
        }

        definition.last_number = last_number;
        definition.audit.stamp_modified(actor, self.clock.now());
        write_definition(tx, &key, &definition).await?;
        info!(module, last_number, actor, "sequence fast-forwarded");
        Ok(definition)
    }

    /// Delete the module's definition.
    ///
    /// Takes the row lock first, so it waits for in-flight reservations to
    /// finish. Documents already carrying numbers from this series are not
    /// checked.
    pub async fn remove<T: StoreTransaction>(
        &self,
        tx: &mut T,
        module: &str,
    ) -> Result<SequenceDefinition> {
        let key = RowKey::from(module);
        let definition = lock_definition(tx, module, &key).await?;
        if tx.delete(SEQUENCE_TABLE, &key).await? == 0 {
            return Err(DocketError::not_found("sequence module", module));
        }
        info!(module, last_number = definition.last_number, "sequence removed");
        Ok(definition)
    }
}

impl Default for SequenceStore {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

async fn lock_definition<T: StoreTransaction>(
    tx: &mut T,
    module: &str,
    key: &RowKey,
) -> Result<SequenceDefinition> {
    let row = tx
        .fetch_for_update(SEQUENCE_TABLE, key)
        .await?
        .ok_or_else(|| DocketError::not_found("sequence module", module))?;
    decode(row)
}

async fn write_definition<T: StoreTransaction>(
    tx: &mut T,
    key: &RowKey,
    definition: &SequenceDefinition,
) -> Result<()> {
    if tx.update(SEQUENCE_TABLE, key, encode(definition)?).await? == 0 {
        return Err(DocketError::not_found("sequence module", &definition.module));
    }
    Ok(())
}

fn encode(definition: &SequenceDefinition) -> Result<Row> {
    Ok(serde_json::to_value(definition)?)
}

fn decode(row: Row) -> Result<SequenceDefinition> {
    Ok(serde_json::from_value(row)?)
}
