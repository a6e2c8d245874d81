use super::{present, replacement_text, required_text, Draft, EntityKind, Id, Record, Reference, Resource};
use crate::error::AppError;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: Id,
    #[serde(rename = "nom")]
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct NewCategory {
    #[serde(rename = "nom")]
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CategoryPatch {
    #[serde(rename = "nom", default, deserialize_with = "present")]
    pub name: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub description: Option<Option<String>>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CategoryDraft {
    pub name: String,
    pub description: Option<String>,
}

impl Resource for Category {
    const KIND: EntityKind = EntityKind::Category;
    type Input = NewCategory;
    type Patch = CategoryPatch;

    fn draft(input: NewCategory) -> Result<Draft, AppError> {
        Ok(Draft::Category(CategoryDraft {
            name: required_text("nom", input.name)?,
            description: input.description,
        }))
    }

    fn apply(&mut self, patch: CategoryPatch) -> Result<Vec<Reference>, AppError> {
        if let Some(name) = patch.name {
            self.name = replacement_text("nom", name)?;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        Ok(Vec::new())
    }

    fn from_record(record: Record) -> Option<Self> {
        match record {
            Record::Category(c) => Some(c),
            _ => None,
        }
    }

    fn into_record(self) -> Record {
        Record::Category(self)
    }
}
