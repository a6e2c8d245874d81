//! In-process storage engine. A transaction holds the table lock for its whole lifetime, so
//! writers are serialized, and works on a private copy that only replaces the shared tables on commit.

use super::{ReferenceIndex, Storage, Transaction};
use crate::error::AppError;
use crate::model::{Draft, EntityKind, ForeignKey, Id, Record, UniqueKey};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Clone, Debug, Default)]
struct Tables {
    rows: BTreeMap<EntityKind, BTreeMap<Id, Record>>,
    /// Last id handed out per kind; ids are never reused.
    sequences: BTreeMap<EntityKind, Id>,
}

impl Tables {
    fn table(&self, kind: EntityKind) -> impl Iterator<Item = &Record> {
        self.rows.get(&kind).into_iter().flat_map(|t| t.values())
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Committed row count for a kind.
    pub async fn count(&self, kind: EntityKind) -> usize {
        self.tables.lock().await.table(kind).count()
    }
}

struct MemoryTx {
    committed: OwnedMutexGuard<Tables>,
    work: Tables,
}

#[async_trait]
impl Storage for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn Transaction>, AppError> {
        let committed = self.tables.clone().lock_owned().await;
        let work = committed.clone();
        Ok(Box::new(MemoryTx { committed, work }))
    }

    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }
}

#[async_trait]
impl ReferenceIndex for MemoryTx {
    async fn referencing(&mut self, fk: &'static ForeignKey, target_id: Id) -> Result<Vec<Id>, AppError> {
        Ok(self
            .work
            .table(fk.owner)
            .filter(|r| r.reference(fk) == Some(target_id))
            .map(Record::id)
            .collect())
    }
}

#[async_trait]
impl Transaction for MemoryTx {
    async fn insert(&mut self, draft: Draft) -> Result<Record, AppError> {
        let kind = draft.kind();
        let seq = self.work.sequences.entry(kind).or_insert(0);
        *seq += 1;
        let record = draft.into_record(*seq, chrono::Utc::now());
        self.work
            .rows
            .entry(kind)
            .or_default()
            .insert(record.id(), record.clone());
        Ok(record)
    }

    async fn get(&mut self, kind: EntityKind, id: Id) -> Result<Option<Record>, AppError> {
        Ok(self.work.rows.get(&kind).and_then(|t| t.get(&id)).cloned())
    }

    async fn list(&mut self, kind: EntityKind) -> Result<Vec<Record>, AppError> {
        Ok(self.work.table(kind).cloned().collect())
    }

    async fn update(&mut self, record: &Record) -> Result<bool, AppError> {
        let Some(row) = self
            .work
            .rows
            .get_mut(&record.kind())
            .and_then(|t| t.get_mut(&record.id()))
        else {
            return Ok(false);
        };
        let mut next = record.clone();
        // Creation timestamps stay as stored.
        match (&mut next, &*row) {
            (Record::Article(n), Record::Article(old)) => n.published_at = old.published_at,
            (Record::Comment(n), Record::Comment(old)) => n.commented_at = old.commented_at,
            _ => {}
        }
        *row = next;
        Ok(true)
    }

    async fn delete(&mut self, kind: EntityKind, id: Id) -> Result<bool, AppError> {
        Ok(self
            .work
            .rows
            .get_mut(&kind)
            .and_then(|t| t.remove(&id))
            .is_some())
    }

    async fn find_unique(&mut self, key: &UniqueKey) -> Result<Option<Id>, AppError> {
        Ok(self
            .work
            .table(key.kind)
            .find(|r| r.unique_key().as_ref() == Some(key))
            .map(Record::id))
    }

    async fn commit(self: Box<Self>) -> Result<(), AppError> {
        let MemoryTx { mut committed, work } = *self;
        *committed = work;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CategoryDraft, UserDraft};

    fn user(email: &str) -> Draft {
        Draft::User(UserDraft {
            name: "A".into(),
            email: email.into(),
        })
    }

    #[tokio::test]
    async fn uncommitted_writes_are_discarded() {
        let store = MemoryStore::new();
        {
            let mut tx = store.begin().await.unwrap();
            tx.insert(user("a@x.com")).await.unwrap();
        }
        assert_eq!(store.count(EntityKind::User).await, 0);

        let mut tx = store.begin().await.unwrap();
        tx.insert(user("a@x.com")).await.unwrap();
        tx.commit().await.unwrap();
        assert_eq!(store.count(EntityKind::User).await, 1);
    }

    #[tokio::test]
    async fn ids_are_not_reused_after_delete() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        let first = tx.insert(user("a@x.com")).await.unwrap();
        assert!(tx.delete(EntityKind::User, first.id()).await.unwrap());
        let second = tx.insert(user("b@x.com")).await.unwrap();
        assert!(second.id() > first.id());
    }

    #[tokio::test]
    async fn deleting_an_absent_row_is_a_no_op() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        assert!(!tx.delete(EntityKind::Comment, 99).await.unwrap());
    }

    #[tokio::test]
    async fn finds_rows_by_unique_key() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        let c = tx
            .insert(Draft::Category(CategoryDraft {
                name: "C".into(),
                description: None,
            }))
            .await
            .unwrap();
        let key = UniqueKey {
            kind: EntityKind::Category,
            column: "nom",
            value: "C".into(),
        };
        assert_eq!(tx.find_unique(&key).await.unwrap(), Some(c.id()));
    }
}
