//! Service layer for organizations.
//! - `organization::repository` is the data-access contract (SeaORM and in-memory implementations).
//! - `organization::service` holds the business rules: existence checks and balance arithmetic.
//! - Errors are structured (`ServiceError`); HTTP semantics live in the server crate.

pub mod errors;
pub mod organization;
#[cfg(test)]
pub mod test_support;
