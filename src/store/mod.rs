pub mod file;
pub mod ids;

use std::sync::{Mutex, MutexGuard};

use chrono::{Datelike, NaiveDate};
use thiserror::Error;

use crate::clock::{Clock, SystemClock};
use crate::models::{NewStudent, StudentId, StudentRecord};

pub use self::file::{CsvFileSink, MemorySink, StoredStudent};
pub use self::ids::{IdAllocator, SequentialIds};

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("store CSV encoding failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("store lock poisoned by an earlier panic")]
    Poisoned,

    #[error("malformed store line {line}: {reason}")]
    Malformed { line: u64, reason: String },
}

/// Destination for accepted records.
pub trait RecordSink: Send {
    fn append(&mut self, record: &StudentRecord) -> Result<(), PersistenceError>;
}

/// Assigns ids and appends records. Id allocation is atomic and appends are
/// serialized, so one store can be shared between threads.
pub struct RecordStore<S> {
    ids: Box<dyn IdAllocator>,
    clock: Box<dyn Clock>,
    sink: Mutex<S>,
}

impl<S: RecordSink> RecordStore<S> {
    pub fn new(sink: S) -> Self {
        Self {
            ids: Box::new(SequentialIds::new()),
            clock: Box::new(SystemClock),
            sink: Mutex::new(sink),
        }
    }

    pub fn with_ids(mut self, ids: impl IdAllocator + 'static) -> Self {
        self.ids = Box::new(ids);
        self
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    /// Last sequence handed out by this store.
    pub fn current_sequence(&self) -> u32 {
        self.ids.current()
    }

    pub fn assign_id(&self) -> StudentId {
        let year = self.clock.today().year();
        StudentId::new(year, self.ids.next_sequence())
    }

    /// Gives a validated registration its id. Nothing is written yet.
    pub fn submit(&self, student: NewStudent) -> StudentRecord {
        let record = student.with_id(self.assign_id());
        tracing::debug!(student_id = %record.id, "Student id assigned");
        record
    }

    pub fn append(&self, record: &StudentRecord) -> Result<(), PersistenceError> {
        self.sink()?.append(record)
    }

    pub fn sink(&self) -> Result<MutexGuard<'_, S>, PersistenceError> {
        self.sink.lock().map_err(|_| PersistenceError::Poisoned)
    }
}
