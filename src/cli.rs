//! Command-line front end: collects form values, hands them to the
//! [`Registrar`] and renders the outcome.

use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use serde::Deserialize;

use crate::clock::Clock;
use crate::config::{Config, PersistencePolicy};
use crate::errors::AppError;
use crate::models::{Department, Gender, RawInput};
use crate::registration::{Registrar, Registration};
use crate::store::{CsvFileSink, RecordSink};

pub const SUCCESS_MESSAGE: &str = "Registration Successful!";
const NOT_SAVED_WARNING: &str =
    "Warning: the registration was accepted but could not be saved to the store.";

/// Student registration form.
///
/// Validates a registration, gives it the next sequential id and appends it
/// to the CSV store.
#[derive(Parser, Debug)]
#[command(name = "enrol", version, about)]
pub struct Cli {
    /// CSV store to append to. Overrides ENROL_STORE_PATH
    #[arg(long, global = true, value_name = "PATH")]
    pub store: Option<PathBuf>,

    /// What to do when a record cannot be written. Overrides
    /// ENROL_ON_WRITE_FAILURE
    #[arg(long, global = true, value_enum)]
    pub on_write_failure: Option<PersistencePolicy>,

    /// Continue numbering after the highest id stored for this year. Also
    /// enabled by ENROL_RESUME_SEQUENCE
    #[arg(long, global = true)]
    pub resume_sequence: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Flags given on the command line win over the environment.
    pub fn apply_overrides(&self, mut config: Config) -> Config {
        if let Some(path) = &self.store {
            config.store_path = path.clone();
        }
        if let Some(policy) = self.on_write_failure {
            config.on_write_failure = policy;
        }
        if self.resume_sequence {
            config.resume_sequence = true;
        }
        config
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Submit one registration.
    Register(FormArgs),
    /// Submit registrations from JSON lines, one form per line.
    Batch(BatchArgs),
    /// Print every stored registration.
    List,
}

#[derive(Args, Debug, Default)]
pub struct FormArgs {
    #[arg(long, default_value = "")]
    pub first_name: String,
    #[arg(long, default_value = "")]
    pub last_name: String,
    #[arg(long, default_value = "")]
    pub email: String,
    #[arg(long, default_value = "")]
    pub confirm_email: String,
    #[arg(long, default_value = "")]
    pub password: String,
    #[arg(long, default_value = "")]
    pub confirm_password: String,
    /// Defaults to sixteen years before the current year
    #[arg(long)]
    pub dob_year: Option<i32>,
    #[arg(long)]
    pub dob_month: Option<u32>,
    #[arg(long)]
    pub dob_day: Option<u32>,
    /// M or F
    #[arg(long)]
    pub gender: Option<Gender>,
    /// Civil, CSE, Electrical, E&C or Mechanical
    #[arg(long)]
    pub department: Option<Department>,
}

impl From<FormArgs> for FormPatch {
    fn from(args: FormArgs) -> Self {
        Self {
            first_name: Some(args.first_name),
            last_name: Some(args.last_name),
            email: Some(args.email),
            confirm_email: Some(args.confirm_email),
            password: Some(args.password),
            confirm_password: Some(args.confirm_password),
            dob_year: args.dob_year,
            dob_month: args.dob_month,
            dob_day: args.dob_day,
            gender: args.gender,
            department: args.department,
        }
    }
}

#[derive(Args, Debug, Default)]
pub struct BatchArgs {
    /// JSON-lines file to read instead of stdin
    #[arg(long, value_name = "FILE")]
    pub input: Option<PathBuf>,
}

/// Field edits applied to the form before a submit. Fields left out keep
/// their current value, so a rejected form can be corrected by sending only
/// the fields that were wrong.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FormPatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub confirm_email: Option<String>,
    pub password: Option<String>,
    pub confirm_password: Option<String>,
    pub dob_year: Option<i32>,
    pub dob_month: Option<u32>,
    pub dob_day: Option<u32>,
    pub gender: Option<Gender>,
    pub department: Option<Department>,
}

impl FormPatch {
    pub fn apply(self, form: &mut RawInput) {
        fn set<T>(field: &mut T, value: Option<T>) {
            if let Some(value) = value {
                *field = value;
            }
        }

        set(&mut form.first_name, self.first_name);
        set(&mut form.last_name, self.last_name);
        set(&mut form.email, self.email);
        set(&mut form.confirm_email, self.confirm_email);
        set(&mut form.password, self.password);
        set(&mut form.confirm_password, self.confirm_password);
        set(&mut form.dob_year, self.dob_year);
        set(&mut form.dob_month, self.dob_month);
        set(&mut form.dob_day, self.dob_day);
        if self.gender.is_some() {
            form.gender = self.gender;
        }
        if self.department.is_some() {
            form.department = self.department;
        }
    }
}

/// Runs one command and returns the process exit code.
pub fn run<C, R, W>(cli: Cli, config: Config, clock: C, stdin: R, out: &mut W) -> Result<u8, AppError>
where
    C: Clock + 'static,
    R: BufRead,
    W: Write,
{
    let config = cli.apply_overrides(config);
    tracing::debug!(store_path = %config.store_path.display(), "Running command");

    match cli.command {
        Command::Register(args) => {
            let registrar = Registrar::from_config(&config, clock)?;
            let mut form = RawInput::blank(registrar.today());
            FormPatch::from(args).apply(&mut form);

            let registration = registrar.register(&form)?;
            render_success(out, &registration)?;
            Ok(0)
        }
        Command::Batch(args) => {
            let registrar = Registrar::from_config(&config, clock)?;
            let rejected = match args.input {
                Some(path) => run_batch(&registrar, BufReader::new(File::open(path)?), out)?,
                None => run_batch(&registrar, stdin, out)?,
            };
            Ok(if rejected > 0 { 2 } else { 0 })
        }
        Command::List => {
            let scan = CsvFileSink::new(&config.store_path).scan()?;
            for stored in &scan.students {
                writeln!(out, "{stored}")?;
            }
            if !scan.malformed.is_empty() {
                writeln!(out, "---")?;
                for err in &scan.malformed {
                    writeln!(out, "Skipped {err}")?;
                }
            }
            Ok(0)
        }
    }
}

/// Feeds each JSON line into one long-lived form, resetting it after every
/// accepted submission. Returns how many lines were rejected.
pub fn run_batch<S, R, W>(registrar: &Registrar<S>, input: R, out: &mut W) -> Result<usize, AppError>
where
    S: RecordSink,
    R: BufRead,
    W: Write,
{
    let mut form = RawInput::blank(registrar.today());
    let mut rejected = 0;

    for (idx, line) in input.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let line_no = idx + 1;

        let patch: FormPatch = match serde_json::from_str(&line) {
            Ok(patch) => patch,
            Err(err) => {
                let error = AppError::InvalidInput {
                    line: line_no,
                    reason: err.to_string(),
                };
                error.log_error();
                writeln!(out, "{error}")?;
                rejected += 1;
                continue;
            }
        };
        patch.apply(&mut form);

        match registrar.register(&form) {
            Ok(registration) => {
                render_success(out, &registration)?;
                form.reset(registrar.today());
            }
            Err(err) if err.is_user_error() => {
                err.log_error();
                writeln!(out, "line {line_no}: {}", err.user_message())?;
                rejected += 1;
            }
            Err(err) => return Err(err),
        }
    }

    Ok(rejected)
}

fn render_success<W: Write>(out: &mut W, registration: &Registration) -> Result<(), AppError> {
    writeln!(out, "{}", registration.record)?;
    writeln!(out, "---")?;
    if !registration.saved {
        writeln!(out, "{NOT_SAVED_WARNING}")?;
    }
    writeln!(out, "{SUCCESS_MESSAGE}")?;
    Ok(())
}
