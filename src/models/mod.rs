pub mod choice;
pub mod student;

use std::fmt;

use thiserror::Error;

pub use choice::{Department, Gender};
pub use student::{NewStudent, RawInput, StudentId, StudentRecord, validate};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FieldError {
    #[error("First Name is required.")]
    MissingFirstName,
    #[error("Last Name is required.")]
    MissingLastName,
    #[error("Email is required.")]
    MissingEmail,
    #[error("Email addresses must match.")]
    EmailMismatch,
    #[error("Email format is invalid (e.g., must contain @ and .).")]
    InvalidEmail,
    #[error("Passwords must match.")]
    PasswordMismatch,
    #[error("Password must be between 8 and 20 characters.")]
    PasswordLength,
    #[error("Password must contain at least one letter and one digit.")]
    WeakPassword,
    #[error("Gender selection is required.")]
    MissingGender,
    #[error("Department selection is required.")]
    MissingDepartment,
    #[error("Valid Date of Birth selection is required.")]
    InvalidDateOfBirth,
    #[error("Student must be at least 16 years old to register.")]
    Underage,
}

/// Every check that failed for one submission, in evaluation order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    pub fn push(&mut self, error: FieldError) {
        self.0.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn contains(&self, error: FieldError) -> bool {
        self.0.contains(&error)
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.0
    }

    pub fn messages(&self) -> Vec<String> {
        self.0.iter().map(ToString::to_string).collect()
    }

    /// Keeps the failing side of each check, in order.
    pub(crate) fn collect<I>(checks: I) -> Self
    where
        I: IntoIterator<Item = Result<(), FieldError>>,
    {
        Self(checks.into_iter().filter_map(Result::err).collect())
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, err) in self.0.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{err}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

impl From<FieldError> for ValidationErrors {
    fn from(error: FieldError) -> Self {
        Self(vec![error])
    }
}

pub type ValidationResult<T> = Result<T, ValidationErrors>;
