use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Teacher,
    Student,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Capability {
    ViewCriteria,
    ManageCriteria,
    ViewGrades,
    EditGrades,
    FinalizeGrades,
}

const ADMIN: &[Capability] = &[
    Capability::ViewCriteria,
    Capability::ManageCriteria,
    Capability::ViewGrades,
    Capability::EditGrades,
    Capability::FinalizeGrades,
];

const TEACHER: &[Capability] = &[
    Capability::ViewCriteria,
    Capability::ViewGrades,
    Capability::EditGrades,
    Capability::FinalizeGrades,
];

const STUDENT: &[Capability] = &[Capability::ViewCriteria, Capability::ViewGrades];

impl Role {
    pub fn capabilities(self) -> &'static [Capability] {
        match self {
            Role::Admin => ADMIN,
            Role::Teacher => TEACHER,
            Role::Student => STUDENT,
        }
    }

    pub fn can(self, capability: Capability) -> bool {
        self.capabilities().contains(&capability)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Admin => "admin",
            Role::Teacher => "teacher",
            Role::Student => "student",
        };
        f.write_str(name)
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Capability::ViewCriteria => "view criteria",
            Capability::ManageCriteria => "manage criteria",
            Capability::ViewGrades => "view grades",
            Capability::EditGrades => "edit grades",
            Capability::FinalizeGrades => "finalize grades",
        };
        f.write_str(name)
    }
}
