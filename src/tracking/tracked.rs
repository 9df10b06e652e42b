use crate::core::{AuditFields, EntityId};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Field-level merge and diff for a persisted entity type.
///
/// Usually derived with `#[derive(ChangeTracked)]`, which generates one
/// explicit statement per field; a field added to the struct is picked up
/// by the derive or rejected at compile time if its type has no sentinel.
///
/// Identity and audit fields are never merged or diffed.
pub trait ChangeTracked: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {
    /// Table the entity is stored in.
    const TABLE: &'static str;

    fn id(&self) -> EntityId;

    fn set_id(&mut self, id: EntityId);

    fn audit(&self) -> &AuditFields;

    fn audit_mut(&mut self) -> &mut AuditFields;

    /// Adopt every field of `partial` that is present (not at its absent
    /// sentinel) and differs from the current value. Returns the names of
    /// the adopted fields.
    fn merge_fields(&mut self, partial: &Self) -> Vec<&'static str>;

    /// Names of tracked fields whose value differs from `baseline`.
    fn diff_fields(&self, baseline: &Self) -> Vec<&'static str>;
}

/// An entity together with the baseline captured when it was fetched.
///
/// Lives for a single fetch -> merge -> update cycle. Entities returned by
/// list or search queries are plain values without a baseline.
#[derive(Debug, Clone)]
pub struct Tracked<E> {
    current: E,
    baseline: E,
}

impl<E: ChangeTracked> Tracked<E> {
    /// Wrap a freshly fetched entity, capturing its baseline.
    pub fn capture(entity: E) -> Self {
        Self {
            baseline: entity.clone(),
            current: entity,
        }
    }

    /// Re-baseline on the current values.
    pub fn recapture(&mut self) {
        self.baseline = self.current.clone();
    }

    /// Apply a partial update. See `ChangeTracked::merge_fields`.
    ///
    /// `created_by`/`created_at` and the modification stamps of `partial`
    /// are ignored; stamps are set only after a confirmed write.
    pub fn merge_from(&mut self, partial: &E) -> Vec<&'static str> {
        self.current.merge_fields(partial)
    }

    pub fn is_changed(&self) -> bool {
        !self.changed_fields().is_empty()
    }

    pub fn changed_fields(&self) -> Vec<&'static str> {
        self.current.diff_fields(&self.baseline)
    }

    pub fn get(&self) -> &E {
        &self.current
    }

    pub fn baseline(&self) -> &E {
        &self.baseline
    }

    pub(crate) fn current_mut(&mut self) -> &mut E {
        &mut self.current
    }

    pub fn into_inner(self) -> E {
        self.current
    }
}

impl<E> std::ops::Deref for Tracked<E> {
    type Target = E;

    fn deref(&self) -> &E {
        &self.current
    }
}
