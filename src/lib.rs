//! Student registration: validate a form, give it the next sequential id and
//! append it to a CSV store.

pub mod cli;
pub mod clock;
pub mod config;
pub mod errors;
pub mod logging;
pub mod models;
pub mod registration;
pub mod store;

pub use errors::AppError;
pub use models::{RawInput, StudentRecord, validate};
pub use registration::{Registrar, Registration};
