use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChoiceError {
    #[error("{0:?} is not a valid gender (expected M or F)")]
    UnknownGender(String),
    #[error("{0:?} is not a valid department (expected Civil, CSE, Electrical, E&C or Mechanical)")]
    UnknownDepartment(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub const ALL: [Gender; 2] = [Gender::Male, Gender::Female];

    /// Single-letter code written to the store.
    pub fn code(&self) -> &'static str {
        match self {
            Gender::Male => "M",
            Gender::Female => "F",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Gender {
    type Err = ChoiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Gender::ALL
            .into_iter()
            .find(|g| g.code().eq_ignore_ascii_case(wanted) || g.label().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ChoiceError::UnknownGender(s.to_string()))
    }
}

impl TryFrom<String> for Gender {
    type Error = ChoiceError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub enum Department {
    Civil,
    Cse,
    Electrical,
    ElectronicsComm,
    Mechanical,
}

impl Department {
    pub const ALL: [Department; 5] = [
        Department::Civil,
        Department::Cse,
        Department::Electrical,
        Department::ElectronicsComm,
        Department::Mechanical,
    ];

    /// Short code written to the store.
    pub fn code(&self) -> &'static str {
        match self {
            Department::Civil => "Civil",
            Department::Cse => "CSE",
            Department::Electrical => "Electrical",
            Department::ElectronicsComm => "E&C",
            Department::Mechanical => "Mechanical",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Department::Civil => "Civil",
            Department::Cse => "Computer Science and Engineering",
            Department::Electrical => "Electrical",
            Department::ElectronicsComm => "Electronics and Communication",
            Department::Mechanical => "Mechanical",
        }
    }

    fn variant_name(&self) -> &'static str {
        match self {
            Department::Civil => "Civil",
            Department::Cse => "Cse",
            Department::Electrical => "Electrical",
            Department::ElectronicsComm => "ElectronicsComm",
            Department::Mechanical => "Mechanical",
        }
    }
}

impl fmt::Display for Department {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Department {
    type Err = ChoiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Department::ALL
            .into_iter()
            .find(|d| {
                [d.code(), d.label(), d.variant_name()]
                    .iter()
                    .any(|name| name.eq_ignore_ascii_case(wanted))
            })
            .ok_or_else(|| ChoiceError::UnknownDepartment(s.to_string()))
    }
}

impl TryFrom<String> for Department {
    type Error = ChoiceError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
