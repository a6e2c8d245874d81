use super::{present, replacement_text, required_text, Draft, EntityKind, Id, Record, Reference, Resource};
use crate::error::AppError;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Id,
    #[serde(rename = "nom")]
    pub name: String,
    pub email: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct NewUser {
    #[serde(rename = "nom")]
    pub name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UserPatch {
    #[serde(rename = "nom", default, deserialize_with = "present")]
    pub name: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub email: Option<Option<String>>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct UserDraft {
    pub name: String,
    pub email: String,
}

impl Resource for User {
    const KIND: EntityKind = EntityKind::User;
    type Input = NewUser;
    type Patch = UserPatch;

    fn draft(input: NewUser) -> Result<Draft, AppError> {
        let name = required_text("nom", input.name)?;
        let email = required_text("email", input.email)?;
        Ok(Draft::User(UserDraft { name, email }))
    }

    fn apply(&mut self, patch: UserPatch) -> Result<Vec<Reference>, AppError> {
        if let Some(name) = patch.name {
            self.name = replacement_text("nom", name)?;
        }
        if let Some(email) = patch.email {
            self.email = replacement_text("email", email)?;
        }
        Ok(Vec::new())
    }

    fn from_record(record: Record) -> Option<Self> {
        match record {
            Record::User(u) => Some(u),
            _ => None,
        }
    }

    fn into_record(self) -> Record {
        Record::User(self)
    }
}
