use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate};
use regex::Regex;
use thiserror::Error;

use super::{Department, FieldError, Gender, ValidationErrors, ValidationResult};

pub const MINIMUM_AGE_YEARS: u32 = 16;
pub const PASSWORD_MIN_CHARS: usize = 8;
pub const PASSWORD_MAX_CHARS: usize = 20;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9_+&*-]+(?:\.[a-zA-Z0-9_+&*-]+)*@(?:[a-zA-Z0-9-]+\.)+[a-zA-Z]{2,7}$")
        .expect("email regex")
});

/// One submission attempt exactly as the front end captured it.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct RawInput {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub confirm_email: String,
    pub password: String,
    pub confirm_password: String,
    pub dob_year: i32,
    pub dob_month: u32,
    pub dob_day: u32,
    pub gender: Option<Gender>,
    pub department: Option<Department>,
}

impl fmt::Debug for RawInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawInput")
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("email", &self.email)
            .field("confirm_email", &self.confirm_email)
            .field("password", &"<redacted>")
            .field("confirm_password", &"<redacted>")
            .field("dob_year", &self.dob_year)
            .field("dob_month", &self.dob_month)
            .field("dob_day", &self.dob_day)
            .field("gender", &self.gender)
            .field("department", &self.department)
            .finish()
    }
}

impl RawInput {
    /// Form defaults: empty fields, nothing selected, born 1 January sixteen years ago.
    pub fn blank(today: NaiveDate) -> Self {
        Self {
            dob_year: today.year() - MINIMUM_AGE_YEARS as i32,
            dob_month: 1,
            dob_day: 1,
            ..Self::default()
        }
    }

    /// Clears the form after an accepted submission. Only the birth year is
    /// put back; month and day keep whatever was last selected.
    pub fn reset(&mut self, today: NaiveDate) {
        self.first_name.clear();
        self.last_name.clear();
        self.email.clear();
        self.confirm_email.clear();
        self.password.clear();
        self.confirm_password.clear();
        self.gender = None;
        self.department = None;
        self.dob_year = today.year() - MINIMUM_AGE_YEARS as i32;
    }

    pub fn date_of_birth(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.dob_year, self.dob_month, self.dob_day)
    }

    /// Runs every rule against the input; failures accumulate instead of
    /// stopping at the first one.
    pub fn validate(&self, today: NaiveDate) -> ValidationResult<NewStudent> {
        let first_name = self.first_name.trim();
        let last_name = self.last_name.trim();
        let email = self.email.trim();
        let confirm_email = self.confirm_email.trim();
        let dob = self.date_of_birth();

        let errors = ValidationErrors::collect([
            ensure_present(first_name, FieldError::MissingFirstName),
            ensure_present(last_name, FieldError::MissingLastName),
            ensure_present(email, FieldError::MissingEmail),
            ensure_matching(email, confirm_email, FieldError::EmailMismatch),
            ensure_valid_email(email),
            ensure_matching(&self.password, &self.confirm_password, FieldError::PasswordMismatch),
            ensure_password_length(&self.password),
            ensure_password_mix(&self.password),
            self.gender.map(|_| ()).ok_or(FieldError::MissingGender),
            self.department.map(|_| ()).ok_or(FieldError::MissingDepartment),
            ensure_old_enough(dob, today),
        ]);

        match (self.gender, self.department, dob) {
            (Some(gender), Some(department), Some(date_of_birth)) if errors.is_empty() => {
                Ok(NewStudent {
                    first_name: first_name.to_string(),
                    last_name: last_name.to_string(),
                    gender,
                    department,
                    date_of_birth,
                    email: email.to_string(),
                })
            }
            _ => Err(errors),
        }
    }
}

pub fn validate(input: &RawInput, today: NaiveDate) -> ValidationResult<NewStudent> {
    input.validate(today)
}

fn ensure_present(value: &str, missing: FieldError) -> Result<(), FieldError> {
    if value.is_empty() {
        tracing::debug!(error = %missing, "Required field is empty");
        Err(missing)
    } else {
        Ok(())
    }
}

fn ensure_matching(value: &str, confirmation: &str, mismatch: FieldError) -> Result<(), FieldError> {
    if value == confirmation {
        Ok(())
    } else {
        tracing::debug!(
            value_empty = value.is_empty(),
            confirmation_empty = confirmation.is_empty(),
            "Confirmation field does not match"
        );
        Err(mismatch)
    }
}

/// Empty addresses are reported by the required-field check instead.
pub(crate) fn ensure_valid_email(value: &str) -> Result<(), FieldError> {
    if value.is_empty() || EMAIL_RE.is_match(value) {
        Ok(())
    } else {
        tracing::debug!(
            length = value.len(),
            has_at = value.contains('@'),
            "Email validation failed: address does not match the expected format"
        );
        Err(FieldError::InvalidEmail)
    }
}

pub(crate) fn ensure_password_length(password: &str) -> Result<(), FieldError> {
    let len = password.chars().count();
    if password.is_empty() || (PASSWORD_MIN_CHARS..=PASSWORD_MAX_CHARS).contains(&len) {
        Ok(())
    } else {
        tracing::debug!(length = len, "Password validation failed: length out of range");
        Err(FieldError::PasswordLength)
    }
}

pub(crate) fn ensure_password_mix(password: &str) -> Result<(), FieldError> {
    if password.is_empty() {
        return Ok(());
    }

    let has_letter = password.chars().any(|c| c.is_ascii_alphabetic());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());

    if has_letter && has_digit {
        Ok(())
    } else {
        tracing::debug!(
            has_letter = has_letter,
            has_digit = has_digit,
            "Password validation failed: missing required character types"
        );
        Err(FieldError::WeakPassword)
    }
}

fn ensure_old_enough(dob: Option<NaiveDate>, today: NaiveDate) -> Result<(), FieldError> {
    let Some(dob) = dob else {
        tracing::debug!("Date of birth is not a calendar date");
        return Err(FieldError::InvalidDateOfBirth);
    };

    // `None` means the birth date lies in the future.
    match today.years_since(dob) {
        Some(age) if age >= MINIMUM_AGE_YEARS => Ok(()),
        age => {
            tracing::debug!(age = ?age, "Applicant is below the minimum age");
            Err(FieldError::Underage)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StudentIdError {
    #[error("student id {0:?} must look like YEAR-SEQUENCE")]
    Malformed(String),
}

/// `<year>-<sequence>` with the sequence padded to five digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StudentId {
    pub year: i32,
    pub sequence: u32,
}

impl StudentId {
    pub fn new(year: i32, sequence: u32) -> Self {
        Self { year, sequence }
    }
}

impl fmt::Display for StudentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{:05}", self.year, self.sequence)
    }
}

impl FromStr for StudentId {
    type Err = StudentIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || StudentIdError::Malformed(s.to_string());
        let (year, sequence) = s.rsplit_once('-').ok_or_else(malformed)?;
        if sequence.len() < 5 || !sequence.bytes().all(|b| b.is_ascii_digit()) {
            return Err(malformed());
        }

        Ok(Self {
            year: year.parse().map_err(|_| malformed())?,
            sequence: sequence.parse().map_err(|_| malformed())?,
        })
    }
}

/// A registration that passed validation and is waiting for its id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewStudent {
    pub first_name: String,
    pub last_name: String,
    pub gender: Gender,
    pub department: Department,
    pub date_of_birth: NaiveDate,
    pub email: String,
}

impl NewStudent {
    pub fn with_id(self, id: StudentId) -> StudentRecord {
        StudentRecord {
            id,
            first_name: self.first_name,
            last_name: self.last_name,
            gender: self.gender,
            department: self.department,
            date_of_birth: self.date_of_birth,
            email: self.email,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentRecord {
    pub id: StudentId,
    pub first_name: String,
    pub last_name: String,
    pub gender: Gender,
    pub department: Department,
    pub date_of_birth: NaiveDate,
    pub email: String,
}

impl StudentRecord {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

impl fmt::Display for StudentRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ID: {} | {} {} | {} | {} | {} | {}",
            self.id,
            self.first_name,
            self.last_name,
            self.gender,
            self.department,
            self.date_of_birth,
            self.email
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    fn valid_input() -> RawInput {
        RawInput {
            first_name: "  Ada ".to_string(),
            last_name: "Lovelace".to_string(),
            email: "ada@example.com ".to_string(),
            confirm_email: " ada@example.com".to_string(),
            password: "abc12345".to_string(),
            confirm_password: "abc12345".to_string(),
            dob_year: 2000,
            dob_month: 12,
            dob_day: 10,
            gender: Some(Gender::Female),
            department: Some(Department::Cse),
        }
    }

    fn errors_for(input: &RawInput) -> ValidationErrors {
        input.validate(today()).unwrap_err()
    }

    #[test]
    fn test_valid_input_is_trimmed_into_new_student() {
        let student = valid_input().validate(today()).unwrap();
        assert_eq!(student.first_name, "Ada");
        assert_eq!(student.last_name, "Lovelace");
        assert_eq!(student.email, "ada@example.com");
        assert_eq!(student.gender, Gender::Female);
        assert_eq!(student.department, Department::Cse);
        assert_eq!(student.date_of_birth, NaiveDate::from_ymd_opt(2000, 12, 10).unwrap());
    }

    #[test]
    fn test_validate_is_repeatable() {
        let input = valid_input();
        assert_eq!(input.validate(today()), input.validate(today()));
        assert_eq!(validate(&input, today()), input.validate(today()));
    }

    #[test]
    fn test_required_fields_reported_in_order() {
        let mut input = valid_input();
        input.first_name = "   ".to_string();
        input.last_name.clear();

        let errors = errors_for(&input);
        assert_eq!(
            errors.errors(),
            &[FieldError::MissingFirstName, FieldError::MissingLastName]
        );
    }

    #[test]
    fn test_empty_email_with_confirmation_is_a_mismatch() {
        let mut input = valid_input();
        input.email.clear();

        let errors = errors_for(&input);
        assert_eq!(
            errors.errors(),
            &[FieldError::MissingEmail, FieldError::EmailMismatch]
        );
    }

    #[test]
    fn test_email_mismatch() {
        let mut input = valid_input();
        input.email = "a@b.com".to_string();
        input.confirm_email = "a@b.co".to_string();
        assert_eq!(errors_for(&input).errors(), &[FieldError::EmailMismatch]);

        input.confirm_email = "a@b.com".to_string();
        assert!(input.validate(today()).is_ok());
    }

    #[test]
    fn test_email_format() {
        for good in ["a@b.com", "first.last+tag@mail.example.org", "x_y&z*w-1@d-1.io", "a@b.example"] {
            assert!(ensure_valid_email(good).is_ok(), "{good} should be accepted");
        }
        for bad in ["plainaddress", "a@b", "a@b.c", "a@b.toolongtld", "a@b.abcdefgh", ".a@b.com", "a..b@c.com", "a@b.c0m"] {
            assert_eq!(
                ensure_valid_email(bad),
                Err(FieldError::InvalidEmail),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_password_rules() {
        assert!(ensure_password_length("abc12345").is_ok());
        assert!(ensure_password_mix("abc12345").is_ok());

        assert!(ensure_password_length("abcdefgh").is_ok());
        assert_eq!(ensure_password_mix("abcdefgh"), Err(FieldError::WeakPassword));

        assert_eq!(ensure_password_length("short1"), Err(FieldError::PasswordLength));
        assert!(ensure_password_mix("short1").is_ok());

        assert_eq!(
            ensure_password_length("a1a1a1a1a1a1a1a1a1a1a"),
            Err(FieldError::PasswordLength)
        );
        assert!(ensure_password_length("a1a1a1a1a1a1a1a1a1a1").is_ok());
    }

    #[test]
    fn test_empty_password_is_not_required() {
        let mut input = valid_input();
        input.password.clear();
        input.confirm_password.clear();
        assert!(input.validate(today()).is_ok());

        input.confirm_password = "abc12345".to_string();
        assert_eq!(errors_for(&input).errors(), &[FieldError::PasswordMismatch]);
    }

    #[test]
    fn test_passwords_are_compared_untrimmed() {
        let mut input = valid_input();
        input.password = " abc12345".to_string();
        input.confirm_password = "abc12345".to_string();
        assert_eq!(errors_for(&input).errors(), &[FieldError::PasswordMismatch]);
    }

    #[test]
    fn test_length_and_mix_are_both_reported() {
        let mut input = valid_input();
        input.password = "abc".to_string();
        input.confirm_password = "abc".to_string();
        assert_eq!(
            errors_for(&input).errors(),
            &[FieldError::PasswordLength, FieldError::WeakPassword]
        );
    }

    #[test]
    fn test_missing_gender_and_department_accumulate() {
        let mut input = valid_input();
        input.gender = None;
        input.department = None;

        let errors = errors_for(&input);
        assert_eq!(
            errors.errors(),
            &[FieldError::MissingGender, FieldError::MissingDepartment]
        );
    }

    #[test]
    fn test_exactly_sixteen_today_passes() {
        let mut input = valid_input();
        input.dob_year = 2008;
        input.dob_month = 6;
        input.dob_day = 15;
        assert!(input.validate(today()).is_ok());
    }

    #[test]
    fn test_one_day_short_of_sixteen_fails() {
        let mut input = valid_input();
        input.dob_year = 2008;
        input.dob_month = 6;
        input.dob_day = 16;
        assert_eq!(errors_for(&input).errors(), &[FieldError::Underage]);
    }

    #[test]
    fn test_future_birth_date_is_underage() {
        let mut input = valid_input();
        input.dob_year = 2030;
        assert_eq!(errors_for(&input).errors(), &[FieldError::Underage]);
    }

    #[test]
    fn test_impossible_date_skips_age_check() {
        let mut input = valid_input();
        input.dob_year = 2000;
        input.dob_month = 2;
        input.dob_day = 30;

        let errors = errors_for(&input);
        assert_eq!(errors.errors(), &[FieldError::InvalidDateOfBirth]);
        assert!(!errors.contains(FieldError::Underage));
    }

    #[test]
    fn test_everything_wrong_at_once() {
        let input = RawInput::default();
        let errors = errors_for(&input);
        assert_eq!(
            errors.errors(),
            &[
                FieldError::MissingFirstName,
                FieldError::MissingLastName,
                FieldError::MissingEmail,
                FieldError::MissingGender,
                FieldError::MissingDepartment,
                FieldError::InvalidDateOfBirth,
            ]
        );
    }

    #[test]
    fn test_blank_and_reset_defaults() {
        let blank = RawInput::blank(today());
        assert_eq!((blank.dob_year, blank.dob_month, blank.dob_day), (2008, 1, 1));

        let mut input = valid_input();
        input.dob_month = 7;
        input.reset(today());
        assert!(input.first_name.is_empty());
        assert!(input.password.is_empty());
        assert_eq!(input.gender, None);
        assert_eq!(input.department, None);
        assert_eq!((input.dob_year, input.dob_month, input.dob_day), (2008, 7, 10));
    }

    #[test]
    fn test_debug_redacts_passwords() {
        let rendered = format!("{:?}", valid_input());
        assert!(!rendered.contains("abc12345"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_student_id_format_and_parse() {
        let id = StudentId::new(2024, 7);
        assert_eq!(id.to_string(), "2024-00007");
        assert_eq!("2024-00007".parse::<StudentId>().unwrap(), id);
        assert_eq!(StudentId::new(2024, 123456).to_string(), "2024-123456");
        assert!("2024-7".parse::<StudentId>().is_err());
        assert!("nonsense".parse::<StudentId>().is_err());
    }

    #[test]
    fn test_record_display() {
        let record = valid_input()
            .validate(today())
            .unwrap()
            .with_id(StudentId::new(2024, 7));
        assert_eq!(
            record.to_string(),
            "ID: 2024-00007 | Ada Lovelace | F | CSE | 2000-12-10 | ada@example.com"
        );
    }
}
