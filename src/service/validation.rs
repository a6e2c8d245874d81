//! Pre-write checks: referenced rows must exist and unique columns must stay unique.

use crate::error::AppError;
use crate::model::{EntityKind, Id, Reference, UniqueKey};
use crate::store::Transaction;

pub struct ReferenceValidator;

impl ReferenceValidator {
    /// Every reference field of `kind` must be supplied and resolve to an existing row.
    pub async fn validate_create(
        tx: &mut dyn Transaction,
        kind: EntityKind,
        refs: &[Reference],
    ) -> Result<(), AppError> {
        for fk in kind.foreign_keys() {
            if !refs.iter().any(|r| std::ptr::eq(r.fk, fk)) {
                return Err(AppError::Validation(format!("{} is required", fk.column)));
            }
        }
        check_exists(tx, kind, refs).await
    }

    /// Only the references a partial update supplied are checked.
    pub async fn validate_update(
        tx: &mut dyn Transaction,
        kind: EntityKind,
        refs: &[Reference],
    ) -> Result<(), AppError> {
        check_exists(tx, kind, refs).await
    }

    /// Rejects a unique value already held by a row other than `current`.
    pub async fn validate_unique(
        tx: &mut dyn Transaction,
        key: Option<UniqueKey>,
        current: Option<Id>,
    ) -> Result<(), AppError> {
        let Some(key) = key else {
            return Ok(());
        };
        match tx.find_unique(&key).await? {
            Some(holder) if Some(holder) != current => {
                tracing::debug!(kind = %key.kind, column = key.column, "unique value taken");
                Err(AppError::Conflict(format!(
                    "{} '{}' is already used by {} {}",
                    key.column, key.value, key.kind, holder
                )))
            }
            _ => Ok(()),
        }
    }
}

/// Fail-fast in field-declaration order: only the first missing reference is reported.
async fn check_exists(
    tx: &mut dyn Transaction,
    kind: EntityKind,
    refs: &[Reference],
) -> Result<(), AppError> {
    let mut ordered: Vec<&Reference> = refs.iter().collect();
    ordered.sort_by_key(|r| r.fk.position());
    for r in ordered {
        if r.fk.owner != kind {
            return Err(AppError::Validation(format!(
                "{} is not a field of {}",
                r.fk.column, kind
            )));
        }
        if !tx.exists(r.fk.target, r.id).await? {
            tracing::debug!(kind = %kind, column = r.fk.column, id = r.id, "dangling reference");
            return Err(AppError::Reference {
                column: r.fk.column,
                kind: r.fk.target,
                id: r.id,
            });
        }
    }
    Ok(())
}
