use super::{
    present, replacement_id, replacement_text, required_id, required_text, Draft, EntityKind, Id,
    Record, Reference, Resource, ARTICLE_AUTHOR, ARTICLE_CATEGORY,
};
use crate::error::AppError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub id: Id,
    #[serde(rename = "titre")]
    pub title: String,
    #[serde(rename = "contenu")]
    pub body: Option<String>,
    /// Set by storage at creation, never written afterwards.
    #[serde(rename = "date_publication")]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(rename = "categorie_id")]
    pub category_id: Id,
    #[serde(rename = "auteur_id")]
    pub author_id: Id,
}

#[derive(Debug, Default, Deserialize)]
pub struct NewArticle {
    #[serde(rename = "titre")]
    pub title: Option<String>,
    #[serde(rename = "contenu")]
    pub body: Option<String>,
    #[serde(rename = "categorie_id")]
    pub category_id: Option<Id>,
    #[serde(rename = "auteur_id")]
    pub author_id: Option<Id>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ArticlePatch {
    #[serde(rename = "titre", default, deserialize_with = "present")]
    pub title: Option<Option<String>>,
    #[serde(rename = "contenu", default, deserialize_with = "present")]
    pub body: Option<Option<String>>,
    #[serde(rename = "categorie_id", default, deserialize_with = "present")]
    pub category_id: Option<Option<Id>>,
    #[serde(rename = "auteur_id", default, deserialize_with = "present")]
    pub author_id: Option<Option<Id>>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ArticleDraft {
    pub title: String,
    pub body: Option<String>,
    pub category_id: Id,
    pub author_id: Id,
}

impl Resource for Article {
    const KIND: EntityKind = EntityKind::Article;
    type Input = NewArticle;
    type Patch = ArticlePatch;

    fn draft(input: NewArticle) -> Result<Draft, AppError> {
        Ok(Draft::Article(ArticleDraft {
            title: required_text("titre", input.title)?,
            body: input.body,
            category_id: required_id("categorie_id", input.category_id)?,
            author_id: required_id("auteur_id", input.author_id)?,
        }))
    }

    fn apply(&mut self, patch: ArticlePatch) -> Result<Vec<Reference>, AppError> {
        let mut refs = Vec::new();
        if let Some(title) = patch.title {
            self.title = replacement_text("titre", title)?;
        }
        if let Some(body) = patch.body {
            self.body = body;
        }
        if let Some(category_id) = patch.category_id {
            self.category_id = replacement_id("categorie_id", category_id)?;
            refs.push(Reference::new(&ARTICLE_CATEGORY, self.category_id));
        }
        if let Some(author_id) = patch.author_id {
            self.author_id = replacement_id("auteur_id", author_id)?;
            refs.push(Reference::new(&ARTICLE_AUTHOR, self.author_id));
        }
        Ok(refs)
    }

    fn from_record(record: Record) -> Option<Self> {
        match record {
            Record::Article(a) => Some(a),
            _ => None,
        }
    }

    fn into_record(self) -> Record {
        Record::Article(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article() -> Article {
        Article {
            id: 1,
            title: "T".into(),
            body: Some("B".into()),
            published_at: None,
            category_id: 2,
            author_id: 3,
        }
    }

    #[test]
    fn references_are_required_on_create() {
        let err = Article::draft(NewArticle {
            title: Some("T".into()),
            body: None,
            category_id: None,
            author_id: Some(1),
        })
        .unwrap_err();
        assert_eq!(err.to_string(), "validation: categorie_id is required");
    }

    #[test]
    fn title_only_patch_leaves_other_fields() {
        let mut a = article();
        let patch: ArticlePatch = serde_json::from_value(serde_json::json!({ "titre": "New" })).unwrap();
        let refs = a.apply(patch).unwrap();
        assert!(refs.is_empty());
        assert_eq!(a.title, "New");
        assert_eq!(a.body.as_deref(), Some("B"));
        assert_eq!((a.category_id, a.author_id), (2, 3));
    }

    #[test]
    fn patch_reports_supplied_references() {
        let mut a = article();
        let patch: ArticlePatch =
            serde_json::from_value(serde_json::json!({ "auteur_id": 9, "categorie_id": 8 })).unwrap();
        let refs = a.apply(patch).unwrap();
        assert_eq!(
            refs,
            vec![
                Reference::new(&ARTICLE_CATEGORY, 8),
                Reference::new(&ARTICLE_AUTHOR, 9)
            ]
        );
    }

    #[test]
    fn publish_timestamp_is_not_patchable() {
        let mut a = article();
        let patch: ArticlePatch = serde_json::from_value(serde_json::json!({
            "date_publication": "2020-01-01T00:00:00Z"
        }))
        .unwrap();
        a.apply(patch).unwrap();
        assert_eq!(a.published_at, None);
    }
}
