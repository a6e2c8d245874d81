//! Generic CRUD over the four resources. Every operation runs inside the caller's transaction;
//! nothing here commits.

use super::{DeletionPlan, ReferenceValidator};
use crate::error::AppError;
use crate::model::{EntityKind, Id, Resource};
use crate::store::Transaction;

pub struct CrudService;

impl CrudService {
    /// All rows of `R` ordered by id.
    pub async fn list<R: Resource>(tx: &mut dyn Transaction) -> Result<Vec<R>, AppError> {
        tx.list(R::KIND)
            .await?
            .into_iter()
            .map(|record| R::from_record(record).ok_or_else(|| kind_mismatch::<R>()))
            .collect()
    }

    /// Fetch one row by id, or NotFound.
    pub async fn read<R: Resource>(tx: &mut dyn Transaction, id: Id) -> Result<R, AppError> {
        let record = tx
            .get(R::KIND, id)
            .await?
            .ok_or(AppError::NotFound { kind: R::KIND, id })?;
        R::from_record(record).ok_or_else(|| kind_mismatch::<R>())
    }

    /// Shape check, then reference and uniqueness checks, then insert. Nothing is written when a
    /// check fails.
    pub async fn create<R: Resource>(tx: &mut dyn Transaction, input: R::Input) -> Result<R, AppError> {
        let draft = R::draft(input)?;
        ReferenceValidator::validate_create(tx, R::KIND, &draft.references()).await?;
        ReferenceValidator::validate_unique(tx, draft.unique_key(), None).await?;
        let record = tx.insert(draft).await?;
        tracing::info!(kind = %R::KIND, id = record.id(), "created");
        R::from_record(record).ok_or_else(|| kind_mismatch::<R>())
    }

    /// Partial update: only supplied fields change and only supplied references are re-validated.
    pub async fn update<R: Resource>(
        tx: &mut dyn Transaction,
        id: Id,
        patch: R::Patch,
    ) -> Result<R, AppError> {
        let mut current: R = Self::read(tx, id).await?;
        let refs = current.apply(patch)?;
        ReferenceValidator::validate_update(tx, R::KIND, &refs).await?;
        let record = current.into_record();
        ReferenceValidator::validate_unique(tx, record.unique_key(), Some(id)).await?;
        if !tx.update(&record).await? {
            return Err(AppError::NotFound { kind: R::KIND, id });
        }
        tracing::info!(kind = %R::KIND, id, "updated");
        Self::read(tx, id).await
    }

    /// Deletes the row and its cascade closure. Returns the applied plan. The root is locked
    /// before the closure is read, so no dependent can be added mid-cascade.
    pub async fn delete<R: Resource>(tx: &mut dyn Transaction, id: Id) -> Result<DeletionPlan, AppError> {
        if !tx.lock(R::KIND, id).await? {
            return Err(AppError::NotFound { kind: R::KIND, id });
        }
        let plan = DeletionPlan::compute(&mut *tx, R::KIND, id).await?;
        plan.apply(tx).await?;
        tracing::info!(
            kind = %R::KIND,
            id,
            users = plan.count(EntityKind::User),
            categories = plan.count(EntityKind::Category),
            articles = plan.count(EntityKind::Article),
            comments = plan.count(EntityKind::Comment),
            "deleted"
        );
        Ok(plan)
    }
}

fn kind_mismatch<R: Resource>() -> AppError {
    AppError::Storage(format!("storage returned a row of the wrong kind for {}", R::KIND))
}
