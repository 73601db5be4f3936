//! The unified error handling system for the application.

// 1. Core Types
pub use auth::{AuthError, AuthErrorKind};
pub use types::AppError;

/// A unified `Result` type for the entire application.
///
/// Repository methods are the exception: they return `sea_orm::DbErr`
/// unchanged so callers can inspect store-level failures directly.
pub type Result<T> = std::result::Result<T, AppError>;

/// `Result` alias for identity-provider operations.
pub type AuthResult<T> = std::result::Result<T, AuthError>;

// 2. Module declarations
pub mod auth;
pub mod macros;
pub mod types;

// 3. Context Trait for adding context to errors.
/// Wraps any convertible error in [`AppError::Context`].
pub trait Context<T, E> {
    /// Attaches a fixed context message.
    #[track_caller]
    fn context<C>(self, context: C) -> Result<T>
    where
        C: std::fmt::Display;

    /// Attaches a lazily built context message.
    #[track_caller]
    fn with_context<C, F>(self, context: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: std::fmt::Display;
}

impl<T, E> Context<T, E> for std::result::Result<T, E>
where
    E: Into<AppError>,
{
    #[track_caller]
    fn context<C>(self, context: C) -> Result<T>
    where
        C: std::fmt::Display,
    {
        self.with_context(|| context)
    }

    #[track_caller]
    fn with_context<C, F>(self, context: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: std::fmt::Display,
    {
        match self {
            Ok(value) => Ok(value),
            Err(error) => Err(AppError::Context {
                context: context().to_string(),
                source: Box::new(error.into()),
            }),
        }
    }
}

#[cfg(test)]
mod tests;
