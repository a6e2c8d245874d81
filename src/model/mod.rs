//! Entity model: the four blog record types, their request payloads and the foreign-key graph.
//!
//! The model only checks shape (required fields present and non-empty). Whether a referenced row
//! exists is decided by [`crate::service::ReferenceValidator`] inside a storage transaction.

mod article;
mod category;
mod comment;
mod user;

pub use article::{Article, ArticleDraft, ArticlePatch, NewArticle};
pub use category::{Category, CategoryDraft, CategoryPatch, NewCategory};
pub use comment::{Comment, CommentDraft, CommentPatch, NewComment};
pub use user::{NewUser, User, UserDraft, UserPatch};

use crate::error::AppError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

/// Storage-assigned primary key.
pub type Id = i64;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    User,
    Category,
    Article,
    Comment,
}

impl EntityKind {
    /// All kinds in dependency order, leaves first.
    pub const ALL: [EntityKind; 4] = [
        EntityKind::User,
        EntityKind::Category,
        EntityKind::Article,
        EntityKind::Comment,
    ];

    /// Table name, also used as the HTTP path segment.
    pub fn table(self) -> &'static str {
        match self {
            EntityKind::User => "utilisateurs",
            EntityKind::Category => "categories",
            EntityKind::Article => "articles",
            EntityKind::Comment => "commentaires",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            EntityKind::User => "user",
            EntityKind::Category => "category",
            EntityKind::Article => "article",
            EntityKind::Comment => "comment",
        }
    }

    /// Longest path from a root owner along "owns" edges. Deeper kinds are deleted first.
    pub fn depth(self) -> u8 {
        match self {
            EntityKind::User | EntityKind::Category => 0,
            EntityKind::Article => 1,
            EntityKind::Comment => 2,
        }
    }

    /// Foreign keys declared on this kind, in declaration order.
    pub fn foreign_keys(self) -> impl Iterator<Item = &'static ForeignKey> {
        FOREIGN_KEYS.iter().copied().filter(move |fk| fk.owner == self)
    }

    /// Foreign keys on other kinds that point at this kind (the "owns" edges).
    pub fn referenced_by(self) -> impl Iterator<Item = &'static ForeignKey> {
        FOREIGN_KEYS.iter().copied().filter(move |fk| fk.target == self)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A foreign-key column: `owner.column` references `target.id`.
#[derive(Debug, PartialEq, Eq)]
pub struct ForeignKey {
    pub owner: EntityKind,
    pub column: &'static str,
    pub target: EntityKind,
}

impl ForeignKey {
    /// Declaration index, used to order validation.
    pub fn position(&self) -> usize {
        FOREIGN_KEYS
            .iter()
            .position(|fk| std::ptr::eq(*fk, self))
            .unwrap_or(usize::MAX)
    }
}

pub static ARTICLE_CATEGORY: ForeignKey = ForeignKey {
    owner: EntityKind::Article,
    column: "categorie_id",
    target: EntityKind::Category,
};

pub static ARTICLE_AUTHOR: ForeignKey = ForeignKey {
    owner: EntityKind::Article,
    column: "auteur_id",
    target: EntityKind::User,
};

pub static COMMENT_ARTICLE: ForeignKey = ForeignKey {
    owner: EntityKind::Comment,
    column: "article_id",
    target: EntityKind::Article,
};

pub static COMMENT_AUTHOR: ForeignKey = ForeignKey {
    owner: EntityKind::Comment,
    column: "auteur_id",
    target: EntityKind::User,
};

/// Every foreign key, in field-declaration order per owning kind.
pub static FOREIGN_KEYS: [&ForeignKey; 4] = [
    &ARTICLE_CATEGORY,
    &ARTICLE_AUTHOR,
    &COMMENT_ARTICLE,
    &COMMENT_AUTHOR,
];

/// A foreign-key value supplied by a create or update.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Reference {
    pub fk: &'static ForeignKey,
    pub id: Id,
}

impl Reference {
    pub fn new(fk: &'static ForeignKey, id: Id) -> Self {
        Reference { fk, id }
    }
}

/// Column value that must be unique across all rows of a kind.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UniqueKey {
    pub kind: EntityKind,
    pub column: &'static str,
    pub value: String,
}

/// A shape-validated create payload. Id and timestamps are assigned by storage.
#[derive(Clone, Debug, PartialEq)]
pub enum Draft {
    User(UserDraft),
    Category(CategoryDraft),
    Article(ArticleDraft),
    Comment(CommentDraft),
}

impl Draft {
    pub fn kind(&self) -> EntityKind {
        match self {
            Draft::User(_) => EntityKind::User,
            Draft::Category(_) => EntityKind::Category,
            Draft::Article(_) => EntityKind::Article,
            Draft::Comment(_) => EntityKind::Comment,
        }
    }

    /// Every reference the new row will hold, in declaration order.
    pub fn references(&self) -> Vec<Reference> {
        match self {
            Draft::User(_) | Draft::Category(_) => Vec::new(),
            Draft::Article(a) => vec![
                Reference::new(&ARTICLE_CATEGORY, a.category_id),
                Reference::new(&ARTICLE_AUTHOR, a.author_id),
            ],
            Draft::Comment(c) => vec![
                Reference::new(&COMMENT_ARTICLE, c.article_id),
                Reference::new(&COMMENT_AUTHOR, c.author_id),
            ],
        }
    }

    pub fn unique_key(&self) -> Option<UniqueKey> {
        match self {
            Draft::User(u) => Some(UniqueKey {
                kind: EntityKind::User,
                column: "email",
                value: u.email.clone(),
            }),
            Draft::Category(c) => Some(UniqueKey {
                kind: EntityKind::Category,
                column: "nom",
                value: c.name.clone(),
            }),
            Draft::Article(_) | Draft::Comment(_) => None,
        }
    }

    /// Column/value pairs written by INSERT.
    pub fn columns(&self) -> Vec<(&'static str, Value)> {
        match self {
            Draft::User(u) => vec![
                ("nom", Value::from(u.name.clone())),
                ("email", Value::from(u.email.clone())),
            ],
            Draft::Category(c) => vec![
                ("nom", Value::from(c.name.clone())),
                ("description", Value::from(c.description.clone())),
            ],
            Draft::Article(a) => vec![
                ("titre", Value::from(a.title.clone())),
                ("contenu", Value::from(a.body.clone())),
                ("categorie_id", Value::from(a.category_id)),
                ("auteur_id", Value::from(a.author_id)),
            ],
            Draft::Comment(c) => vec![
                ("contenu", Value::from(c.body.clone())),
                ("article_id", Value::from(c.article_id)),
                ("auteur_id", Value::from(c.author_id)),
            ],
        }
    }

    /// Materializes the row once storage has assigned the id and creation time.
    pub fn into_record(self, id: Id, now: chrono::DateTime<chrono::Utc>) -> Record {
        match self {
            Draft::User(u) => Record::User(User {
                id,
                name: u.name,
                email: u.email,
            }),
            Draft::Category(c) => Record::Category(Category {
                id,
                name: c.name,
                description: c.description,
            }),
            Draft::Article(a) => Record::Article(Article {
                id,
                title: a.title,
                body: a.body,
                published_at: Some(now),
                category_id: a.category_id,
                author_id: a.author_id,
            }),
            Draft::Comment(c) => Record::Comment(Comment {
                id,
                body: c.body,
                commented_at: Some(now),
                article_id: c.article_id,
                author_id: c.author_id,
            }),
        }
    }
}

/// A stored row of any kind.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Record {
    User(User),
    Category(Category),
    Article(Article),
    Comment(Comment),
}

impl Record {
    pub fn kind(&self) -> EntityKind {
        match self {
            Record::User(_) => EntityKind::User,
            Record::Category(_) => EntityKind::Category,
            Record::Article(_) => EntityKind::Article,
            Record::Comment(_) => EntityKind::Comment,
        }
    }

    pub fn id(&self) -> Id {
        match self {
            Record::User(u) => u.id,
            Record::Category(c) => c.id,
            Record::Article(a) => a.id,
            Record::Comment(c) => c.id,
        }
    }

    /// Value held in `fk.column`, or None when this row does not own that key.
    pub fn reference(&self, fk: &ForeignKey) -> Option<Id> {
        if fk.owner != self.kind() {
            return None;
        }
        match (self, fk.column) {
            (Record::Article(a), "categorie_id") => Some(a.category_id),
            (Record::Article(a), "auteur_id") => Some(a.author_id),
            (Record::Comment(c), "article_id") => Some(c.article_id),
            (Record::Comment(c), "auteur_id") => Some(c.author_id),
            _ => None,
        }
    }

    pub fn unique_key(&self) -> Option<UniqueKey> {
        match self {
            Record::User(u) => Some(UniqueKey {
                kind: EntityKind::User,
                column: "email",
                value: u.email.clone(),
            }),
            Record::Category(c) => Some(UniqueKey {
                kind: EntityKind::Category,
                column: "nom",
                value: c.name.clone(),
            }),
            Record::Article(_) | Record::Comment(_) => None,
        }
    }

    /// Mutable columns written by UPDATE. Creation timestamps are never part of it.
    pub fn mutable_columns(&self) -> Vec<(&'static str, Value)> {
        match self {
            Record::User(u) => vec![
                ("nom", Value::from(u.name.clone())),
                ("email", Value::from(u.email.clone())),
            ],
            Record::Category(c) => vec![
                ("nom", Value::from(c.name.clone())),
                ("description", Value::from(c.description.clone())),
            ],
            Record::Article(a) => vec![
                ("titre", Value::from(a.title.clone())),
                ("contenu", Value::from(a.body.clone())),
                ("categorie_id", Value::from(a.category_id)),
                ("auteur_id", Value::from(a.author_id)),
            ],
            Record::Comment(c) => vec![
                ("contenu", Value::from(c.body.clone())),
                ("article_id", Value::from(c.article_id)),
                ("auteur_id", Value::from(c.author_id)),
            ],
        }
    }

    /// Decodes a row fetched as a JSON object keyed by column name.
    pub fn from_row(kind: EntityKind, row: Value) -> Result<Record, serde_json::Error> {
        Ok(match kind {
            EntityKind::User => Record::User(serde_json::from_value(row)?),
            EntityKind::Category => Record::Category(serde_json::from_value(row)?),
            EntityKind::Article => Record::Article(serde_json::from_value(row)?),
            EntityKind::Comment => Record::Comment(serde_json::from_value(row)?),
        })
    }
}

/// Ties a record type to its kind and request payloads so the CRUD service and handlers stay generic.
pub trait Resource: Clone + Serialize + Send + Sync + Sized + 'static {
    const KIND: EntityKind;
    /// Create payload as received.
    type Input: DeserializeOwned + Send + 'static;
    /// Partial-update payload as received.
    type Patch: DeserializeOwned + Send + 'static;

    /// Checks required fields and builds the insertable draft.
    fn draft(input: Self::Input) -> Result<Draft, AppError>;

    /// Applies the supplied fields in place. Returns the references the patch supplied, which the
    /// caller must validate before writing.
    fn apply(&mut self, patch: Self::Patch) -> Result<Vec<Reference>, AppError>;

    fn from_record(record: Record) -> Option<Self>;

    fn into_record(self) -> Record;
}

/// Distinguishes an explicit `null` (`Some(None)`) from an absent field (`None`) in patch payloads.
pub(crate) fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

pub(crate) fn required_text(field: &str, value: Option<String>) -> Result<String, AppError> {
    match value {
        Some(s) if !s.is_empty() => Ok(s),
        _ => Err(AppError::Validation(format!("{} is required", field))),
    }
}

pub(crate) fn required_id(field: &str, value: Option<Id>) -> Result<Id, AppError> {
    value.ok_or_else(|| AppError::Validation(format!("{} is required", field)))
}

/// A supplied replacement for a required text field: may not be null or empty.
pub(crate) fn replacement_text(field: &str, value: Option<String>) -> Result<String, AppError> {
    match value {
        Some(s) if !s.is_empty() => Ok(s),
        Some(_) => Err(AppError::Validation(format!("{} must not be empty", field))),
        None => Err(AppError::Validation(format!("{} must not be null", field))),
    }
}

/// A supplied replacement for a reference field: may not be null.
pub(crate) fn replacement_id(field: &str, value: Option<Id>) -> Result<Id, AppError> {
    value.ok_or_else(|| AppError::Validation(format!("{} must not be null", field)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn foreign_keys_keep_declaration_order() {
        let article: Vec<_> = EntityKind::Article.foreign_keys().map(|fk| fk.column).collect();
        assert_eq!(article, vec!["categorie_id", "auteur_id"]);
        let comment: Vec<_> = EntityKind::Comment.foreign_keys().map(|fk| fk.column).collect();
        assert_eq!(comment, vec!["article_id", "auteur_id"]);
        assert!(ARTICLE_CATEGORY.position() < ARTICLE_AUTHOR.position());
        assert!(COMMENT_ARTICLE.position() < COMMENT_AUTHOR.position());
    }

    #[test]
    fn owners_are_shallower_than_dependents() {
        for fk in FOREIGN_KEYS.iter() {
            assert!(fk.target.depth() < fk.owner.depth(), "{} -> {}", fk.owner, fk.target);
        }
    }

    #[test]
    fn users_own_articles_and_comments() {
        let owned: Vec<_> = EntityKind::User.referenced_by().map(|fk| fk.owner).collect();
        assert_eq!(owned, vec![EntityKind::Article, EntityKind::Comment]);
        assert_eq!(EntityKind::Comment.referenced_by().count(), 0);
    }

    #[test]
    fn record_reads_its_references() {
        let row = serde_json::json!({
            "id": 7,
            "contenu": "hi",
            "date_commentaire": null,
            "article_id": 3,
            "auteur_id": 1
        });
        let record = Record::from_row(EntityKind::Comment, row).unwrap();
        assert_eq!(record.reference(&COMMENT_ARTICLE), Some(3));
        assert_eq!(record.reference(&COMMENT_AUTHOR), Some(1));
        assert_eq!(record.reference(&ARTICLE_AUTHOR), None);
    }
}
