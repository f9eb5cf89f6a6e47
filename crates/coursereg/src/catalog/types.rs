//! Catalog records submitted by staff and students
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Role of a user account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum UserType {
    Student,
    Instructor,
    Staff,
}

impl UserType {
    pub fn as_code(&self) -> &'static str {
        match self {
            UserType::Student => "STUDENT",
            UserType::Instructor => "INSTRUCTOR",
            UserType::Staff => "STAFF",
        }
    }
}

impl fmt::Display for UserType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_code())
    }
}

impl FromStr for UserType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "STUDENT" => Ok(UserType::Student),
            "INSTRUCTOR" => Ok(UserType::Instructor),
            "STAFF" => Ok(UserType::Staff),
            other => Err(format!("unknown user type '{other}'")),
        }
    }
}

/// Academic term within a year. `3` is the summer session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Term {
    First,
    Second,
    Summer,
}

impl TryFrom<u8> for Term {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Term::First),
            2 => Ok(Term::Second),
            3 => Ok(Term::Summer),
            other => Err(format!("term must be 1, 2 or 3 (got {other})")),
        }
    }
}

impl From<Term> for u8 {
    fn from(term: Term) -> Self {
        match term {
            Term::First => 1,
            Term::Second => 2,
            Term::Summer => 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewFaculty {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDepartment {
    pub name: String,
    pub faculty_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBranch {
    pub name: String,
    pub department_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSemester {
    /// Buddhist-era year, e.g. 2567
    pub year: u16,
    pub term: Term,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRoom {
    pub building: String,
    pub room_number: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCourse {
    pub code: String,
    pub name: String,
    #[serde(default = "default_credits")]
    pub credits: u8,
    #[serde(default)]
    pub department_id: Option<i64>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_credits() -> u8 {
    3
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSection {
    pub course_id: i64,
    pub semester_id: i64,
    pub section_number: String,
    #[serde(default = "default_capacity")]
    pub capacity: u32,
    #[serde(default)]
    pub room_id: Option<i64>,
    #[serde(default)]
    pub instructor_ids: Vec<i64>,
}

fn default_capacity() -> u32 {
    30
}

/// Section fields staff may change after creation. The course stays fixed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionUpdate {
    pub semester_id: i64,
    pub section_number: String,
    #[serde(default = "default_capacity")]
    pub capacity: u32,
    #[serde(default)]
    pub room_id: Option<i64>,
    #[serde(default)]
    pub instructor_ids: Vec<i64>,
}

impl SectionUpdate {
    /// The same fields as a creation record for `course_id`, for shared validation.
    pub fn for_course(&self, course_id: i64) -> NewSection {
        NewSection {
            course_id,
            semester_id: self.semester_id,
            section_number: self.section_number.clone(),
            capacity: self.capacity,
            room_id: self.room_id,
            instructor_ids: self.instructor_ids.clone(),
        }
    }
}

/// Study status of a student account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StudentStatus {
    #[default]
    Studying,
    OnLeave,
    Graduated,
}

impl StudentStatus {
    pub fn as_code(&self) -> &'static str {
        match self {
            StudentStatus::Studying => "STUDYING",
            StudentStatus::OnLeave => "ON_LEAVE",
            StudentStatus::Graduated => "GRADUATED",
        }
    }
}

impl FromStr for StudentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "STUDYING" => Ok(StudentStatus::Studying),
            "ON_LEAVE" => Ok(StudentStatus::OnLeave),
            "GRADUATED" => Ok(StudentStatus::Graduated),
            other => Err(format!("unknown student status '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub user_type: UserType,
    /// Thai given name; empty or absent means not recorded
    #[serde(default)]
    pub first_name_th: Option<String>,
    #[serde(default)]
    pub last_name_th: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default)]
    pub student_id: Option<String>,
    #[serde(default)]
    pub student_status: StudentStatus,
    #[serde(default)]
    pub branch_id: Option<i64>,
    #[serde(default)]
    pub department_id: Option<i64>,
}

impl NewUser {
    /// A user with only a name and role; every profile field left empty.
    pub fn new(username: impl Into<String>, user_type: UserType) -> Self {
        Self {
            username: username.into(),
            user_type,
            first_name_th: None,
            last_name_th: None,
            date_of_birth: None,
            student_id: None,
            student_status: StudentStatus::default(),
            branch_id: None,
            department_id: None,
        }
    }

    pub fn with_student_id(mut self, student_id: impl Into<String>) -> Self {
        self.student_id = Some(student_id.into());
        self
    }
}
