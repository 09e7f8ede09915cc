//! Person response types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::persons::Person;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonDto {
    pub id: Option<Uuid>,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub email: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<Person> for PersonDto {
    fn from(person: Person) -> Self {
        Self {
            full_name: person.full_name(),
            id: person.id,
            first_name: person.first_name,
            last_name: person.last_name,
            email: person.email,
            created_at: person.created_at,
            updated_at: person.updated_at,
        }
    }
}
