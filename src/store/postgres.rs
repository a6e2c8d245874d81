//! PostgreSQL storage engine. One `sqlx::Transaction` per core operation.

use super::{ReferenceIndex, Storage, Transaction};
use crate::error::AppError;
use crate::model::{Draft, EntityKind, ForeignKey, Id, Record, UniqueKey};
use crate::sql::{self, PgBindValue, QueryBuf};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::{Postgres, Row};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        PgStore { pool }
    }
}

struct PgTx {
    tx: sqlx::Transaction<'static, Postgres>,
}

#[async_trait]
impl Storage for PgStore {
    async fn begin(&self) -> Result<Box<dyn Transaction>, AppError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgTx { tx }))
    }

    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").fetch_optional(&self.pool).await?;
        Ok(())
    }
}

impl PgTx {
    async fn fetch_optional(&mut self, q: &QueryBuf) -> Result<Option<PgRow>, AppError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query (tx)");
        let mut query = sqlx::query(&q.sql);
        for p in &q.params {
            query = query.bind(PgBindValue::from_json(p)?);
        }
        query.fetch_optional(&mut *self.tx).await.map_err(AppError::from_db)
    }

    async fn fetch_all(&mut self, q: &QueryBuf) -> Result<Vec<PgRow>, AppError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query (tx)");
        let mut query = sqlx::query(&q.sql);
        for p in &q.params {
            query = query.bind(PgBindValue::from_json(p)?);
        }
        query.fetch_all(&mut *self.tx).await.map_err(AppError::from_db)
    }
}

#[async_trait]
impl ReferenceIndex for PgTx {
    async fn referencing(&mut self, fk: &'static ForeignKey, target_id: Id) -> Result<Vec<Id>, AppError> {
        let rows = self.fetch_all(&sql::select_referencing_ids(fk, target_id)).await?;
        rows.iter()
            .map(|r| r.try_get::<i64, _>("id").map_err(AppError::Db))
            .collect()
    }
}

#[async_trait]
impl Transaction for PgTx {
    async fn insert(&mut self, draft: Draft) -> Result<Record, AppError> {
        let kind = draft.kind();
        let row = self
            .fetch_optional(&sql::insert(&draft))
            .await?
            .ok_or_else(|| AppError::Db(sqlx::Error::RowNotFound))?;
        decode(kind, &row)
    }

    async fn get(&mut self, kind: EntityKind, id: Id) -> Result<Option<Record>, AppError> {
        let row = self.fetch_optional(&sql::select_by_id(kind, id)).await?;
        row.map(|r| decode(kind, &r)).transpose()
    }

    async fn list(&mut self, kind: EntityKind) -> Result<Vec<Record>, AppError> {
        let rows = self.fetch_all(&sql::select_list(kind)).await?;
        rows.iter().map(|r| decode(kind, r)).collect()
    }

    async fn update(&mut self, record: &Record) -> Result<bool, AppError> {
        Ok(self.fetch_optional(&sql::update(record)).await?.is_some())
    }

    async fn delete(&mut self, kind: EntityKind, id: Id) -> Result<bool, AppError> {
        Ok(self.fetch_optional(&sql::delete(kind, id)).await?.is_some())
    }

    async fn lock(&mut self, kind: EntityKind, id: Id) -> Result<bool, AppError> {
        Ok(self.fetch_optional(&sql::lock_by_id(kind, id)).await?.is_some())
    }

    async fn find_unique(&mut self, key: &UniqueKey) -> Result<Option<Id>, AppError> {
        let row = self.fetch_optional(&sql::select_id_by_unique(key)).await?;
        row.map(|r| r.try_get::<i64, _>("id").map_err(AppError::Db))
            .transpose()
    }

    async fn commit(self: Box<Self>) -> Result<(), AppError> {
        let PgTx { tx } = *self;
        tx.commit().await?;
        Ok(())
    }
}

fn decode(kind: EntityKind, row: &PgRow) -> Result<Record, AppError> {
    Record::from_row(kind, row_to_json(row))
        .map_err(|e| AppError::Storage(format!("malformed {} row: {}", kind, e)))
}

fn row_to_json(row: &PgRow) -> Value {
    use sqlx::Column;
    let mut map = serde_json::Map::new();
    for col in row.columns() {
        let name = col.name();
        map.insert(name.to_string(), cell_to_value(row, name));
    }
    Value::Object(map)
}

fn cell_to_value(row: &PgRow, name: &str) -> Value {
    if let Ok(Some(n)) = row.try_get::<Option<i64>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<i32>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(name) {
        return Value::String(d.to_rfc3339());
    }
    if let Ok(Some(s)) = row.try_get::<Option<String>, _>(name) {
        return Value::String(s);
    }
    Value::Null
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore = "needs a running Postgres at DATABASE_URL"]
    async fn decodes_null_text_and_timestamptz_columns() {
        let url = std::env::var("DATABASE_URL").unwrap();
        let pool = PgPool::connect(&url).await.unwrap();
        let row = sqlx::query(
            "SELECT 7::bigint AS id, 'T'::text AS titre, NULL::text AS contenu, \
             NOW() AS date_publication, 2::bigint AS categorie_id, 3::bigint AS auteur_id",
        )
        .fetch_one(&pool)
        .await
        .unwrap();

        assert_eq!(row_to_json(&row)["contenu"], Value::Null);
        match decode(EntityKind::Article, &row).unwrap() {
            Record::Article(a) => {
                assert_eq!(a.id, 7);
                assert_eq!(a.title, "T");
                assert_eq!(a.body, None);
                assert!(a.published_at.is_some());
                assert_eq!((a.category_id, a.author_id), (2, 3));
            }
            other => panic!("decoded as {:?}", other),
        }
    }

    #[tokio::test]
    #[ignore = "needs a running Postgres at DATABASE_URL"]
    async fn null_timestamp_decodes_as_none() {
        let url = std::env::var("DATABASE_URL").unwrap();
        let pool = PgPool::connect(&url).await.unwrap();
        let row = sqlx::query(
            "SELECT 1::bigint AS id, 'hi'::text AS contenu, NULL::timestamptz AS date_commentaire, \
             4::bigint AS article_id, 5::bigint AS auteur_id",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        match decode(EntityKind::Comment, &row).unwrap() {
            Record::Comment(c) => assert!(c.commented_at.is_none()),
            other => panic!("decoded as {:?}", other),
        }
    }
}
