//! Storage engine seam. Every core operation runs against a [`Transaction`] handle; dropping the
//! handle without [`Transaction::commit`] discards its writes.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use crate::error::AppError;
use crate::model::{Draft, EntityKind, ForeignKey, Id, Record, UniqueKey};
use async_trait::async_trait;

/// Foreign-key -> dependent-ids index used to walk "owns" edges.
#[async_trait]
pub trait ReferenceIndex: Send {
    /// Ids of `fk.owner` rows whose `fk.column` equals `target_id`, ascending.
    async fn referencing(&mut self, fk: &'static ForeignKey, target_id: Id) -> Result<Vec<Id>, AppError>;
}

#[async_trait]
pub trait Transaction: ReferenceIndex {
    /// Inserts a row; storage assigns the id and creation timestamp.
    async fn insert(&mut self, draft: Draft) -> Result<Record, AppError>;

    async fn get(&mut self, kind: EntityKind, id: Id) -> Result<Option<Record>, AppError>;

    /// All rows of a kind ordered by id.
    async fn list(&mut self, kind: EntityKind) -> Result<Vec<Record>, AppError>;

    /// Writes the mutable columns of `record`. Returns false when the row is absent.
    async fn update(&mut self, record: &Record) -> Result<bool, AppError>;

    /// Removes one row. Deleting an absent row is a no-op and returns false.
    async fn delete(&mut self, kind: EntityKind, id: Id) -> Result<bool, AppError>;

    /// Id of the row holding `key.value` in `key.column`, if any.
    async fn find_unique(&mut self, key: &UniqueKey) -> Result<Option<Id>, AppError>;

    async fn exists(&mut self, kind: EntityKind, id: Id) -> Result<bool, AppError> {
        Ok(self.get(kind, id).await?.is_some())
    }

    /// Holds `kind`/`id` until the transaction ends so no new row can reference it. Returns
    /// false when the row is absent. Engines that serialize whole transactions only check
    /// existence.
    async fn lock(&mut self, kind: EntityKind, id: Id) -> Result<bool, AppError> {
        self.exists(kind, id).await
    }

    async fn commit(self: Box<Self>) -> Result<(), AppError>;
}

#[async_trait]
pub trait Storage: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn Transaction>, AppError>;

    /// Cheap liveness probe for readiness checks.
    async fn ping(&self) -> Result<(), AppError>;
}
