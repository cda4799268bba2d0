use chrono::{Datelike, NaiveDate};

use crate::clock::Clock;
use crate::config::{Config, PersistencePolicy};
use crate::errors::AppError;
use crate::logging::{LoggableStudentId, RegistrationEvent, SanitizedEmail, SanitizedName};
use crate::models::{RawInput, StudentRecord};
use crate::store::{CsvFileSink, RecordSink, RecordStore, SequentialIds};

/// An accepted registration. `saved` is false when the record was accepted
/// but the store write failed under [`PersistencePolicy::Report`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub record: StudentRecord,
    pub saved: bool,
}

pub struct Registrar<S> {
    store: RecordStore<S>,
    policy: PersistencePolicy,
}

impl Registrar<CsvFileSink> {
    /// File-backed registrar for `config`. With `resume_sequence` set the
    /// counter continues after the highest id already stored for this year.
    pub fn from_config(config: &Config, clock: impl Clock + 'static) -> Result<Self, AppError> {
        let sink = CsvFileSink::new(&config.store_path);
        let mut store = RecordStore::new(sink).with_clock(clock);

        if config.resume_sequence {
            let year = store.today().year();
            let last = store.sink()?.last_sequence(year)?;
            store = store.with_ids(SequentialIds::starting_after(last));

            crate::log_registration_event!(
                RegistrationEvent::SequenceResumed,
                year = year,
                last_sequence = last,
                store_path = %config.store_path.display(),
                "Resuming id sequence from store"
            );
        }

        Ok(Self::new(store, config.on_write_failure))
    }
}

impl<S: RecordSink> Registrar<S> {
    pub fn new(store: RecordStore<S>, policy: PersistencePolicy) -> Self {
        Self { store, policy }
    }

    pub fn store(&self) -> &RecordStore<S> {
        &self.store
    }

    pub fn today(&self) -> NaiveDate {
        self.store.today()
    }

    /// Validate, assign an id, append. A rejected submission leaves the
    /// counter and the store untouched.
    #[tracing::instrument(
        name = "register_student",
        skip(self, input),
        fields(student_name, email, student_id)
    )]
    pub fn register(&self, input: &RawInput) -> Result<Registration, AppError> {
        let name = SanitizedName::new(&input.first_name, &input.last_name);
        let email = SanitizedEmail::new(&input.email);

        tracing::Span::current().record("student_name", tracing::field::display(&name));
        tracing::Span::current().record("email", tracing::field::display(&email));

        let student = input.validate(self.store.today()).map_err(|errors| {
            crate::log_registration_event!(
                RegistrationEvent::Rejected,
                student_name = %name,
                email = %email,
                error_count = errors.len(),
                "Registration rejected"
            );
            AppError::Validation(errors)
        })?;

        let record = self.store.submit(student);
        let student_id = LoggableStudentId(record.id);
        tracing::Span::current().record("student_id", tracing::field::display(student_id));

        crate::log_registration_event!(
            RegistrationEvent::Accepted,
            student_id = %student_id,
            student_name = %name,
            email = %email,
            "Registration accepted"
        );

        match self.store.append(&record) {
            Ok(()) => {
                crate::log_registration_event!(
                    RegistrationEvent::Persisted,
                    student_id = %student_id,
                    "Registration saved to store"
                );
                Ok(Registration { record, saved: true })
            }
            Err(err) => {
                crate::log_registration_event!(
                    RegistrationEvent::PersistenceFailed,
                    student_id = %student_id,
                    error = %err,
                    policy = ?self.policy,
                    "Registration accepted but not saved"
                );
                match self.policy {
                    PersistencePolicy::Report => Ok(Registration { record, saved: false }),
                    PersistencePolicy::Fail => Err(AppError::Persistence(err)),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use tempfile::TempDir;

    use super::*;
    use crate::clock::FixedClock;
    use crate::models::{Department, FieldError, Gender};
    use crate::store::{MemorySink, PersistenceError};

    struct BrokenSink;

    impl RecordSink for BrokenSink {
        fn append(&mut self, _record: &StudentRecord) -> Result<(), PersistenceError> {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only volume").into())
        }
    }

    fn clock() -> FixedClock {
        FixedClock(NaiveDate::from_ymd_opt(2024, 6, 15).unwrap())
    }

    fn registrar<S: RecordSink>(sink: S, policy: PersistencePolicy) -> Registrar<S> {
        Registrar::new(RecordStore::new(sink).with_clock(clock()), policy)
    }

    fn input(first: &str) -> RawInput {
        RawInput {
            first_name: first.to_string(),
            last_name: "Hamilton".to_string(),
            email: "margaret@mit.edu".to_string(),
            confirm_email: "margaret@mit.edu".to_string(),
            password: "apollo11".to_string(),
            confirm_password: "apollo11".to_string(),
            dob_year: 2005,
            dob_month: 8,
            dob_day: 17,
            gender: Some(Gender::Female),
            department: Some(Department::Cse),
        }
    }

    #[test]
    fn test_successful_registrations_get_increasing_ids() {
        let registrar = registrar(MemorySink::new(), PersistencePolicy::Report);

        let first = registrar.register(&input("Margaret")).unwrap();
        let second = registrar.register(&input("Mary")).unwrap();

        assert!(first.saved && second.saved);
        assert_eq!(first.record.id.to_string(), "2024-00001");
        assert_eq!(second.record.id.to_string(), "2024-00002");
        assert!(second.record.id > first.record.id);

        let sink = registrar.store().sink().unwrap();
        assert_eq!(sink.lines().len(), 2);
        assert!(sink.lines()[1].starts_with("2024-00002,Mary Hamilton,F,CSE,2005-08-17,"));
    }

    #[test]
    fn test_rejection_leaves_state_untouched() {
        let registrar = registrar(MemorySink::new(), PersistencePolicy::Report);
        let mut bad = input("Margaret");
        bad.email.clear();

        let errors = match registrar.register(&bad) {
            Err(AppError::Validation(errors)) => errors,
            other => panic!("expected a validation error, got {other:?}"),
        };
        assert!(errors.contains(FieldError::MissingEmail));
        assert_eq!(registrar.store().current_sequence(), 0);
        assert!(registrar.store().sink().unwrap().lines().is_empty());

        let accepted = registrar.register(&input("Margaret")).unwrap();
        assert_eq!(accepted.record.id.sequence, 1);
    }

    #[test]
    fn test_write_failure_is_reported_not_fatal_by_default() {
        let registrar = registrar(BrokenSink, PersistencePolicy::Report);
        let registration = registrar.register(&input("Margaret")).unwrap();
        assert!(!registration.saved);
        assert_eq!(registration.record.id.to_string(), "2024-00001");
    }

    #[test]
    fn test_write_failure_is_fatal_when_configured() {
        let registrar = registrar(BrokenSink, PersistencePolicy::Fail);
        let err = registrar.register(&input("Margaret")).unwrap_err();
        assert!(matches!(err, AppError::Persistence(PersistenceError::Io(_))));
        assert_eq!(err.exit_code(), 1);
        // the id was already handed out
        assert_eq!(registrar.store().current_sequence(), 1);
    }

    #[test]
    fn test_from_config_writes_to_store_path() {
        let dir = TempDir::new().unwrap();
        let config = Config {
            store_path: dir.path().join("students.csv"),
            ..Config::default()
        };

        let registrar = Registrar::from_config(&config, clock()).unwrap();
        registrar.register(&input("Margaret")).unwrap();

        let stored = CsvFileSink::new(&config.store_path).read_all().unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].full_name, "Margaret Hamilton");
    }

    #[test]
    fn test_restart_resets_counter_unless_resuming() {
        let dir = TempDir::new().unwrap();
        let mut config = Config {
            store_path: dir.path().join("students.csv"),
            ..Config::default()
        };

        let first_run = Registrar::from_config(&config, clock()).unwrap();
        first_run.register(&input("Margaret")).unwrap();
        first_run.register(&input("Mary")).unwrap();

        let fresh = Registrar::from_config(&config, clock()).unwrap();
        assert_eq!(fresh.register(&input("Ada")).unwrap().record.id.sequence, 1);

        config.resume_sequence = true;
        let resumed = Registrar::from_config(&config, clock()).unwrap();
        assert_eq!(resumed.register(&input("Grace")).unwrap().record.id.sequence, 3);
    }
}
