//! Error types for catalog rules and enrollment.

use chrono::NaiveDate;
use thiserror::Error;

/// A catalog field failed its rule.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// Course code is not six digits
    #[error("course code must be 6 digits")]
    InvalidCourseCode,

    /// Course name contains characters outside the allowed set
    #[error("course name may only contain Thai or English letters, digits, spaces and -(),")]
    InvalidCourseName,

    /// Description contains characters outside the allowed set
    #[error("description may only contain Thai or English letters, digits, spaces and -(),.")]
    InvalidDescription,

    #[error("credits must be between 1 and 9 (got {0})")]
    CreditsOutOfRange(u8),

    #[error("section number must be a number from 1 to 99")]
    InvalidSectionNumber,

    #[error("capacity must be between 1 and 200 (got {0})")]
    CapacityOutOfRange(u32),

    #[error("academic year must not be earlier than 2560 (got {0})")]
    YearTooEarly(u16),

    #[error("semester end date must not be before its start date")]
    SemesterEndsBeforeStart,

    #[error("student id must be 8 digits")]
    InvalidStudentId,

    /// Thai name field contains non-Thai characters
    #[error("{field} may only contain Thai characters")]
    InvalidThaiName { field: &'static str },

    #[error("date of birth {0} is in the future")]
    DateOfBirthInFuture(NaiveDate),

    /// A section with the same number already exists for this course and semester
    #[error("section {section_number} already exists for this course and semester")]
    DuplicateSection { section_number: String },

    /// A record with the same unique key already exists
    #[error("{entity} already exists")]
    Duplicate { entity: &'static str },

    /// User is not an instructor and cannot be assigned to a section
    #[error("user {user_id} is not an instructor")]
    NotAnInstructor { user_id: i64 },

    #[error("{field} must not be empty")]
    Blank { field: &'static str },
}

impl CatalogError {
    /// Input field the error should be displayed next to.
    pub fn field(&self) -> &'static str {
        match self {
            CatalogError::InvalidCourseCode => "code",
            CatalogError::InvalidCourseName => "name",
            CatalogError::InvalidDescription => "description",
            CatalogError::CreditsOutOfRange(_) => "credits",
            CatalogError::InvalidSectionNumber | CatalogError::DuplicateSection { .. } => {
                "section_number"
            }
            CatalogError::CapacityOutOfRange(_) => "capacity",
            CatalogError::YearTooEarly(_) => "year",
            CatalogError::SemesterEndsBeforeStart => "end_date",
            CatalogError::InvalidStudentId => "student_id",
            CatalogError::InvalidThaiName { field } => field,
            CatalogError::DateOfBirthInFuture(_) => "date_of_birth",
            CatalogError::NotAnInstructor { .. } => "instructors",
            CatalogError::Blank { field } => field,
            CatalogError::Duplicate { .. } => "__all__",
        }
    }

    /// Returns true if the error comes from a uniqueness constraint rather than a field format.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            CatalogError::DuplicateSection { .. } | CatalogError::Duplicate { .. }
        )
    }
}

/// Reasons a student cannot enroll in a section.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EnrollmentError {
    #[error("only students can enroll in sections")]
    NotAStudent,

    /// Already holds a seat in some section of the same course
    #[error("already enrolled in course {course_code}")]
    AlreadyEnrolledInCourse { course_code: String },

    #[error("course {course_code} section {section_number} is full")]
    SectionFull {
        course_code: String,
        section_number: String,
    },
}
