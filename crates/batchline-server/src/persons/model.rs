//! Person records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Domain every derived email address belongs to
pub const EMAIL_DOMAIN: &str = "example.com";

/// Maximum length of a first or last name
pub const MAX_NAME_LENGTH: usize = 100;

/// Maximum length of an email address
pub const MAX_EMAIL_LENGTH: usize = 255;

/// One raw line of the input file
///
/// Empty fields are `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonRow {
    /// 1-based line number in the source file
    pub line: u64,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl PersonRow {
    /// Row for a line without any content
    pub fn blank(line: u64) -> Self {
        Self {
            line,
            first_name: None,
            last_name: None,
        }
    }
}

/// A person as processed and persisted
///
/// `id` and the timestamps are assigned by the store on first write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub id: Option<Uuid>,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Person {
    pub fn new(first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            id: None,
            first_name: first_name.into(),
            last_name: last_name.into(),
            email: None,
            created_at: None,
            updated_at: None,
        }
    }

    /// `first.last@example.com`, lowercased
    pub fn derived_email(first_name: &str, last_name: &str) -> String {
        format!(
            "{}.{}@{}",
            first_name.to_lowercase(),
            last_name.to_lowercase(),
            EMAIL_DOMAIN
        )
    }

    pub fn with_derived_email(mut self) -> Self {
        self.email = Some(Self::derived_email(&self.first_name, &self.last_name));
        self
    }

    /// `"first last"`, trimmed
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }

    /// Email present and not blank
    pub fn has_valid_email(&self) -> bool {
        self.email.as_deref().is_some_and(|email| !email.trim().is_empty())
    }

    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    /// Store-side constraints: names present and short enough, email short enough
    pub fn check_constraints(&self) -> Result<(), String> {
        for (field, value) in [("first_name", &self.first_name), ("last_name", &self.last_name)] {
            if value.trim().is_empty() {
                return Err(format!("{} must not be empty", field));
            }
            if value.chars().count() > MAX_NAME_LENGTH {
                return Err(format!(
                    "{} exceeds {} characters",
                    field, MAX_NAME_LENGTH
                ));
            }
        }
        if let Some(email) = &self.email {
            if email.chars().count() > MAX_EMAIL_LENGTH {
                return Err(format!("email exceeds {} characters", MAX_EMAIL_LENGTH));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_email_is_lowercase() {
        let person = Person::new("John", "DOE").with_derived_email();
        assert_eq!(person.email.as_deref(), Some("john.doe@example.com"));
        assert!(person.has_valid_email());
        assert_eq!(person.full_name(), "John DOE");
        assert!(!person.is_persisted());
    }

    #[test]
    fn test_email_presence() {
        let mut person = Person::new("a", "b");
        assert!(!person.has_valid_email());
        person.email = Some("   ".to_string());
        assert!(!person.has_valid_email());
        person.email = Some("no-at-sign".to_string());
        assert!(person.has_valid_email());
    }

    #[test]
    fn test_full_name_is_trimmed() {
        assert_eq!(Person::new("", "Roe").full_name(), "Roe");
        assert_eq!(Person::new("Jane", "").full_name(), "Jane");
    }

    #[test]
    fn test_constraints() {
        assert!(Person::new("Jane", "Roe").with_derived_email().check_constraints().is_ok());
        assert!(Person::new(" ", "Roe").check_constraints().is_err());

        let long = "x".repeat(MAX_NAME_LENGTH + 1);
        let err = Person::new(long, "Roe").check_constraints().unwrap_err();
        assert!(err.contains("first_name"));
    }
}
