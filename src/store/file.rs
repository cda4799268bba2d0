use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord, Terminator, WriterBuilder};

use crate::models::{Department, Gender, StudentId, StudentRecord};

use super::{PersistenceError, RecordSink};

pub const DEFAULT_STORE_PATH: &str = "students.csv";
const FIELD_COUNT: usize = 6;

/// Columns in store order: id, full name, gender code, department code, ISO date, email.
fn csv_fields(record: &StudentRecord) -> [String; FIELD_COUNT] {
    [
        record.id.to_string(),
        record.full_name(),
        record.gender.code().to_string(),
        record.department.code().to_string(),
        record.date_of_birth.format("%Y-%m-%d").to_string(),
        record.email.clone(),
    ]
}

fn write_line<W: Write>(out: W, record: &StudentRecord) -> Result<W, PersistenceError> {
    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(out);
    writer.write_record(csv_fields(record))?;
    writer
        .into_inner()
        .map_err(|err| PersistenceError::Io(err.into_error()))
}

/// One newline-terminated store line. Fields holding a comma, quote or
/// newline are quoted; everything else is written bare.
pub fn encode_line(record: &StudentRecord) -> Result<String, PersistenceError> {
    let bytes = write_line(Vec::new(), record)?;
    String::from_utf8(bytes)
        .map_err(|err| PersistenceError::Io(io::Error::new(io::ErrorKind::InvalidData, err)))
}

/// A row read back from the store. The name comes back combined since
/// the store only keeps "first last".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredStudent {
    pub id: StudentId,
    pub full_name: String,
    pub gender: Gender,
    pub department: Department,
    pub date_of_birth: NaiveDate,
    pub email: String,
}

impl From<&StudentRecord> for StoredStudent {
    fn from(record: &StudentRecord) -> Self {
        Self {
            id: record.id,
            full_name: record.full_name(),
            gender: record.gender,
            department: record.department,
            date_of_birth: record.date_of_birth,
            email: record.email.clone(),
        }
    }
}

impl fmt::Display for StoredStudent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ID: {} | {} | {} | {} | {} | {}",
            self.id, self.full_name, self.gender, self.department, self.date_of_birth, self.email
        )
    }
}

fn parse_row(row: &StringRecord) -> Result<StoredStudent, PersistenceError> {
    let line = row.position().map(|pos| pos.line()).unwrap_or_default();
    let malformed = |reason: String| PersistenceError::Malformed { line, reason };

    if row.len() != FIELD_COUNT {
        return Err(malformed(format!("expected {FIELD_COUNT} fields, found {}", row.len())));
    }

    Ok(StoredStudent {
        id: row[0].parse::<StudentId>().map_err(|err| malformed(format!("{err}")))?,
        full_name: row[1].to_string(),
        gender: row[2].parse::<Gender>().map_err(|err| malformed(format!("{err}")))?,
        department: row[3].parse::<Department>().map_err(|err| malformed(format!("{err}")))?,
        date_of_birth: NaiveDate::parse_from_str(&row[4], "%Y-%m-%d")
            .map_err(|err| malformed(format!("date of birth {:?}: {err}", &row[4])))?,
        email: row[5].to_string(),
    })
}

fn store_reader<R: Read>(input: R) -> csv::Reader<R> {
    ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(input)
}

/// Parses store lines from any reader, in file order. The first bad row
/// fails the whole read.
pub fn decode_lines<R: Read>(input: R) -> Result<Vec<StoredStudent>, PersistenceError> {
    store_reader(input)
        .records()
        .map(|row| row.map_err(PersistenceError::from).and_then(|row| parse_row(&row)))
        .collect()
}

/// Rows recovered from a store that may hold damaged lines: rows written
/// before fields were quoted, or a write cut off halfway.
#[derive(Debug, Default)]
pub struct StoreScan {
    pub students: Vec<StoredStudent>,
    pub malformed: Vec<PersistenceError>,
}

/// Like [`decode_lines`] but keeps going past bad rows, collecting them in
/// [`StoreScan::malformed`]. Only read failures abort.
pub fn scan_lines<R: Read>(input: R) -> Result<StoreScan, PersistenceError> {
    let mut scan = StoreScan::default();

    for row in store_reader(input).records() {
        let parsed = match row {
            Ok(row) => parse_row(&row),
            Err(err) if err.is_io_error() => return Err(err.into()),
            Err(err) => Err(PersistenceError::Malformed {
                line: err.position().map(|pos| pos.line()).unwrap_or_default(),
                reason: err.to_string(),
            }),
        };

        match parsed {
            Ok(student) => scan.students.push(student),
            Err(err) => {
                if let PersistenceError::Malformed { line, reason } = &err {
                    tracing::warn!(line = *line, reason = %reason, "Skipping malformed store line");
                }
                scan.malformed.push(err);
            }
        }
    }

    Ok(scan)
}

/// Append-only file store; the file is opened (and created if absent) on
/// every write.
#[derive(Debug, Clone)]
pub struct CsvFileSink {
    path: PathBuf,
}

impl CsvFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every stored row. A store that was never written to is empty.
    pub fn read_all(&self) -> Result<Vec<StoredStudent>, PersistenceError> {
        match File::open(&self.path) {
            Ok(file) => decode_lines(file),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(err) => Err(err.into()),
        }
    }

    /// Every readable row, with the damaged ones set aside.
    pub fn scan(&self) -> Result<StoreScan, PersistenceError> {
        match File::open(&self.path) {
            Ok(file) => scan_lines(file),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(StoreScan::default()),
            Err(err) => Err(err.into()),
        }
    }

    /// Highest sequence stored for `year`, 0 if there is none. Damaged rows
    /// are skipped.
    pub fn last_sequence(&self, year: i32) -> Result<u32, PersistenceError> {
        Ok(self
            .scan()?
            .students
            .iter()
            .filter(|stored| stored.id.year == year)
            .map(|stored| stored.id.sequence)
            .max()
            .unwrap_or(0))
    }
}

/// Terminates a last line left without its newline by an interrupted write,
/// so the next record starts on a line of its own.
fn end_torn_line(file: &mut File) -> io::Result<()> {
    if file.metadata()?.len() == 0 {
        return Ok(());
    }
    let mut last = [0u8; 1];
    file.seek(SeekFrom::End(-1))?;
    file.read_exact(&mut last)?;
    if last[0] != b'\n' {
        tracing::warn!("Store ends mid-line; starting a new line");
        file.write_all(b"\n")?;
    }
    Ok(())
}

impl RecordSink for CsvFileSink {
    fn append(&mut self, record: &StudentRecord) -> Result<(), PersistenceError> {
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)?;
        end_torn_line(&mut file)?;
        let mut file = write_line(file, record)?;
        file.flush()?;

        tracing::debug!(path = %self.path.display(), "Record appended to store");
        Ok(())
    }
}

/// Keeps encoded lines in memory; stands in for the file in tests.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    lines: Vec<String>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn contents(&self) -> String {
        self.lines.concat()
    }
}

impl RecordSink for MemorySink {
    fn append(&mut self, record: &StudentRecord) -> Result<(), PersistenceError> {
        self.lines.push(encode_line(record)?);
        Ok(())
    }
}
