//! Builds parameterized INSERT, SELECT, UPDATE, DELETE for the four blog tables.

use crate::model::{Draft, EntityKind, ForeignKey, Id, Record, UniqueKey};
use crate::schema::{column_type, columns, quote};
use serde_json::Value;

pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<Value>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    /// Pushes a value and returns its typed placeholder, e.g. `$2::bigint`.
    fn push_param(&mut self, kind: EntityKind, column: &str, v: Value) -> String {
        self.params.push(v);
        format!("${}::{}", self.params.len(), column_type(kind, column))
    }
}

/// SELECT list: id followed by every catalog column.
fn select_column_list(kind: EntityKind) -> String {
    std::iter::once(quote("id"))
        .chain(columns(kind).iter().map(|c| quote(c.name)))
        .collect::<Vec<_>>()
        .join(", ")
}

/// SELECT all rows ORDER BY id.
pub fn select_list(kind: EntityKind) -> QueryBuf {
    let mut q = QueryBuf::new();
    q.sql = format!(
        "SELECT {} FROM {} ORDER BY {}",
        select_column_list(kind),
        quote(kind.table()),
        quote("id")
    );
    q
}

/// SELECT by primary key.
pub fn select_by_id(kind: EntityKind, id: Id) -> QueryBuf {
    let mut q = QueryBuf::new();
    let ph = q.push_param(kind, "id", Value::from(id));
    q.sql = format!(
        "SELECT {} FROM {} WHERE {} = {}",
        select_column_list(kind),
        quote(kind.table()),
        quote("id"),
        ph
    );
    q
}

/// Locks one row against concurrent writes and against new rows referencing it.
pub fn lock_by_id(kind: EntityKind, id: Id) -> QueryBuf {
    let mut q = QueryBuf::new();
    let ph = q.push_param(kind, "id", Value::from(id));
    q.sql = format!(
        "SELECT {} FROM {} WHERE {} = {} FOR UPDATE",
        quote("id"),
        quote(kind.table()),
        quote("id"),
        ph
    );
    q
}

/// Ids of rows whose foreign key points at `target_id`, locked until the transaction ends.
/// Backs the cascade's reverse index.
pub fn select_referencing_ids(fk: &ForeignKey, target_id: Id) -> QueryBuf {
    let mut q = QueryBuf::new();
    let ph = q.push_param(fk.owner, fk.column, Value::from(target_id));
    q.sql = format!(
        "SELECT {} FROM {} WHERE {} = {} ORDER BY {} FOR UPDATE",
        quote("id"),
        quote(fk.owner.table()),
        quote(fk.column),
        ph,
        quote("id")
    );
    q
}

/// Id of the row holding a unique value.
pub fn select_id_by_unique(key: &UniqueKey) -> QueryBuf {
    let mut q = QueryBuf::new();
    let ph = q.push_param(key.kind, key.column, Value::from(key.value.clone()));
    q.sql = format!(
        "SELECT {} FROM {} WHERE {} = {} LIMIT 1",
        quote("id"),
        quote(key.kind.table()),
        quote(key.column),
        ph
    );
    q
}

/// INSERT the draft's columns; id and timestamps come from column defaults. Returns the full row.
pub fn insert(draft: &Draft) -> QueryBuf {
    let kind = draft.kind();
    let mut q = QueryBuf::new();
    let mut cols = Vec::new();
    let mut placeholders = Vec::new();
    for (col, val) in draft.columns() {
        cols.push(quote(col));
        placeholders.push(q.push_param(kind, col, val));
    }
    q.sql = format!(
        "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
        quote(kind.table()),
        cols.join(", "),
        placeholders.join(", "),
        select_column_list(kind)
    );
    q
}

/// UPDATE the record's mutable columns by id.
pub fn update(record: &Record) -> QueryBuf {
    let kind = record.kind();
    let mut q = QueryBuf::new();
    let sets: Vec<String> = record
        .mutable_columns()
        .into_iter()
        .map(|(col, val)| format!("{} = {}", quote(col), q.push_param(kind, col, val)))
        .collect();
    let ph = q.push_param(kind, "id", Value::from(record.id()));
    q.sql = format!(
        "UPDATE {} SET {} WHERE {} = {} RETURNING {}",
        quote(kind.table()),
        sets.join(", "),
        quote("id"),
        ph,
        quote("id")
    );
    q
}

/// DELETE by id. Returns the id when a row was removed.
pub fn delete(kind: EntityKind, id: Id) -> QueryBuf {
    let mut q = QueryBuf::new();
    let ph = q.push_param(kind, "id", Value::from(id));
    q.sql = format!(
        "DELETE FROM {} WHERE {} = {} RETURNING {}",
        quote(kind.table()),
        quote("id"),
        ph,
        quote("id")
    );
    q
}
