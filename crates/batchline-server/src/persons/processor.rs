//! Person row validation and email derivation

use tracing::debug;

use super::model::{Person, PersonRow};
use crate::batch::{ItemError, ItemProcessor};

/// Turns rows into persons with a derived `first.last@example.com` address
///
/// Rows missing a name are filtered out. A name containing `@`, whitespace
/// or a control character cannot form an address and is a recoverable
/// fault.
#[derive(Debug, Clone, Copy, Default)]
pub struct PersonItemProcessor;

fn unusable_char(name: &str) -> Option<char> {
    name.chars()
        .find(|c| *c == '@' || c.is_whitespace() || c.is_control())
}

impl ItemProcessor<PersonRow, Person> for PersonItemProcessor {
    fn process(&self, row: PersonRow) -> Result<Option<Person>, ItemError> {
        let (Some(first_name), Some(last_name)) = (row.first_name, row.last_name) else {
            debug!(line = row.line, "Skipping row with missing name");
            return Ok(None);
        };

        for name in [&first_name, &last_name] {
            if let Some(c) = unusable_char(name) {
                return Err(ItemError::recoverable(format!(
                    "line {}: name {:?} contains {:?} and cannot form an email address",
                    row.line, name, c
                )));
            }
        }

        let person = Person::new(first_name, last_name).with_derived_email();
        debug!(
            line = row.line,
            email = person.email.as_deref().unwrap_or(""),
            "Processed person"
        );
        Ok(Some(person))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(first: Option<&str>, last: Option<&str>) -> PersonRow {
        PersonRow {
            line: 2,
            first_name: first.map(str::to_string),
            last_name: last.map(str::to_string),
        }
    }

    #[test]
    fn test_derives_lowercase_email() {
        let person = PersonItemProcessor
            .process(row(Some("John"), Some("Doe")))
            .unwrap()
            .unwrap();
        assert_eq!(person.email.as_deref(), Some("john.doe@example.com"));
        assert_eq!(person.first_name, "John");
        assert!(person.id.is_none());
    }

    #[test]
    fn test_missing_names_are_filtered() {
        assert_eq!(PersonItemProcessor.process(row(None, Some("Smith"))).unwrap(), None);
        assert_eq!(PersonItemProcessor.process(row(Some("John"), None)).unwrap(), None);
        assert_eq!(PersonItemProcessor.process(row(None, None)).unwrap(), None);
    }

    #[test]
    fn test_unusable_characters_are_recoverable_faults() {
        for (first, last) in [("jo@hn", "Doe"), ("Mary Ann", "Lee"), ("Tab", "Ro\te")] {
            let err = PersonItemProcessor
                .process(row(Some(first), Some(last)))
                .unwrap_err();
            assert!(!err.is_fatal());
            assert!(err.to_string().contains("line 2"));
        }
    }

    #[test]
    fn test_non_ascii_names_are_accepted() {
        let person = PersonItemProcessor
            .process(row(Some("Zoë"), Some("Ölund")))
            .unwrap()
            .unwrap();
        assert_eq!(person.email.as_deref(), Some("zoë.ölund@example.com"));
    }
}
