use super::{
    present, replacement_id, replacement_text, required_id, required_text, Draft, EntityKind, Id,
    Record, Reference, Resource, COMMENT_ARTICLE, COMMENT_AUTHOR,
};
use crate::error::AppError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: Id,
    #[serde(rename = "contenu")]
    pub body: String,
    #[serde(rename = "date_commentaire")]
    pub commented_at: Option<DateTime<Utc>>,
    pub article_id: Id,
    #[serde(rename = "auteur_id")]
    pub author_id: Id,
}

#[derive(Debug, Default, Deserialize)]
pub struct NewComment {
    #[serde(rename = "contenu")]
    pub body: Option<String>,
    pub article_id: Option<Id>,
    #[serde(rename = "auteur_id")]
    pub author_id: Option<Id>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CommentPatch {
    #[serde(rename = "contenu", default, deserialize_with = "present")]
    pub body: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub article_id: Option<Option<Id>>,
    #[serde(rename = "auteur_id", default, deserialize_with = "present")]
    pub author_id: Option<Option<Id>>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CommentDraft {
    pub body: String,
    pub article_id: Id,
    pub author_id: Id,
}

impl Resource for Comment {
    const KIND: EntityKind = EntityKind::Comment;
    type Input = NewComment;
    type Patch = CommentPatch;

    fn draft(input: NewComment) -> Result<Draft, AppError> {
        Ok(Draft::Comment(CommentDraft {
            body: required_text("contenu", input.body)?,
            article_id: required_id("article_id", input.article_id)?,
            author_id: required_id("auteur_id", input.author_id)?,
        }))
    }

    fn apply(&mut self, patch: CommentPatch) -> Result<Vec<Reference>, AppError> {
        let mut refs = Vec::new();
        if let Some(body) = patch.body {
            self.body = replacement_text("contenu", body)?;
        }
        if let Some(article_id) = patch.article_id {
            self.article_id = replacement_id("article_id", article_id)?;
            refs.push(Reference::new(&COMMENT_ARTICLE, self.article_id));
        }
        if let Some(author_id) = patch.author_id {
            self.author_id = replacement_id("auteur_id", author_id)?;
            refs.push(Reference::new(&COMMENT_AUTHOR, self.author_id));
        }
        Ok(refs)
    }

    fn from_record(record: Record) -> Option<Self> {
        match record {
            Record::Comment(c) => Some(c),
            _ => None,
        }
    }

    fn into_record(self) -> Record {
        Record::Comment(self)
    }
}
