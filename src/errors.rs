use std::error::Error as StdError;

use thiserror::Error;

use crate::config::ConfigError;
use crate::models::ValidationErrors;
use crate::store::PersistenceError;

/// Centralized error type for everything a registration run can hit.
#[derive(Debug, Error)]
pub enum AppError {
    // Rejected submissions
    #[error("validation failed:\n{0}")]
    Validation(#[from] ValidationErrors),

    #[error("invalid input on line {line}: {reason}")]
    InvalidInput { line: usize, reason: String },

    // Store errors
    #[error("could not save registration: {0}")]
    Persistence(#[from] PersistenceError),

    // Setup errors
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// Process exit code for this error
    pub fn exit_code(&self) -> u8 {
        match self {
            // Caller can fix these by changing the input
            AppError::Validation(_) => 2,
            AppError::InvalidInput { .. } => 2,

            AppError::Persistence(_) => 1,
            AppError::Config(_) => 1,
            AppError::Io(_) => 1,
        }
    }

    pub fn is_user_error(&self) -> bool {
        self.exit_code() == 2
    }

    /// Text shown to the person filling in the form.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Validation(errors) => {
                let mut message = String::from("Validation Errors:");
                for line in errors.messages() {
                    message.push('\n');
                    message.push_str(&line);
                }
                message
            }
            other => other.to_string(),
        }
    }

    /// Logs the error at a level matching who has to act on it.
    pub fn log_error(&self) {
        if self.is_user_error() {
            tracing::debug!(error = %self, "Submission rejected");
        } else {
            tracing::error!(
                error = %self,
                exit_code = self.exit_code(),
                source = ?self.source(),
                "Registration failed"
            );
        }
    }
}
