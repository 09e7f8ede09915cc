//! Persons feature module
//!
//! Read-only queries over imported persons.

pub mod queries;
pub mod routes;
pub mod types;

pub use routes::persons_routes;
pub use types::PersonDto;
