//! Domain error types.
//!
//! These errors represent contract breaches at the domain boundary. Expected,
//! user-correctable validation failures are not errors; they are returned as
//! [`Violation`](super::Violation) data.

/// Domain-level errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    /// Input had the wrong shape (e.g. running days not an array of booleans).
    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// A candidate was converted into a schedule without passing validation.
    #[error("candidate is not valid: {0}")]
    NotValidated(&'static str),
}
