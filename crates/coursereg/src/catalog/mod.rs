//! Field rules for catalog records and admission rules for enrollment.

mod error;
mod types;

pub use error::{CatalogError, EnrollmentError};
pub use types::*;

use chrono::NaiveDate;
use regex::Regex;
use std::sync::LazyLock;

// Thai block is U+0E01..U+0E4C
static COURSE_CODE_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{6}$").unwrap());
static COURSE_NAME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\x{0E01}-\x{0E4C}A-Za-z0-9\s\-(),]+$").unwrap());
static DESCRIPTION_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\x{0E01}-\x{0E4C}A-Za-z0-9\s\-(),.]+$").unwrap());
static SECTION_NUMBER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[1-9][0-9]?$").unwrap());
static STUDENT_ID_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{8}$").unwrap());
static THAI_NAME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\x{0E00}-\x{0E7F}]+$").unwrap());

pub const MIN_CREDITS: u8 = 1;
pub const MAX_CREDITS: u8 = 9;
pub const MIN_CAPACITY: u32 = 1;
pub const MAX_CAPACITY: u32 = 200;
pub const EARLIEST_YEAR: u16 = 2560;

fn require(field: &'static str, value: &str) -> Result<(), CatalogError> {
    if value.trim().is_empty() {
        Err(CatalogError::Blank { field })
    } else {
        Ok(())
    }
}

pub fn validate_faculty(faculty: &NewFaculty) -> Result<(), CatalogError> {
    require("name", &faculty.name)
}

pub fn validate_department(department: &NewDepartment) -> Result<(), CatalogError> {
    require("name", &department.name)
}

pub fn validate_branch(branch: &NewBranch) -> Result<(), CatalogError> {
    require("name", &branch.name)
}

pub fn validate_room(room: &NewRoom) -> Result<(), CatalogError> {
    require("building", &room.building)?;
    require("room_number", &room.room_number)
}

pub fn validate_course(course: &NewCourse) -> Result<(), CatalogError> {
    if !COURSE_CODE_REGEX.is_match(&course.code) {
        return Err(CatalogError::InvalidCourseCode);
    }
    require("name", &course.name)?;
    if !COURSE_NAME_REGEX.is_match(&course.name) {
        return Err(CatalogError::InvalidCourseName);
    }
    if !(MIN_CREDITS..=MAX_CREDITS).contains(&course.credits) {
        return Err(CatalogError::CreditsOutOfRange(course.credits));
    }
    // An empty description is treated as absent
    if let Some(description) = course.description.as_deref().filter(|d| !d.is_empty()) {
        if !DESCRIPTION_REGEX.is_match(description) {
            return Err(CatalogError::InvalidDescription);
        }
    }
    Ok(())
}

pub fn validate_section(section: &NewSection) -> Result<(), CatalogError> {
    if !SECTION_NUMBER_REGEX.is_match(&section.section_number) {
        return Err(CatalogError::InvalidSectionNumber);
    }
    if !(MIN_CAPACITY..=MAX_CAPACITY).contains(&section.capacity) {
        return Err(CatalogError::CapacityOutOfRange(section.capacity));
    }
    Ok(())
}

pub fn validate_semester(semester: &NewSemester) -> Result<(), CatalogError> {
    if semester.year < EARLIEST_YEAR {
        return Err(CatalogError::YearTooEarly(semester.year));
    }
    if semester.end_date < semester.start_date {
        return Err(CatalogError::SemesterEndsBeforeStart);
    }
    Ok(())
}

/// Checks a user profile. `today` bounds the date of birth.
pub fn validate_user(user: &NewUser, today: NaiveDate) -> Result<(), CatalogError> {
    require("username", &user.username)?;
    for (field, value) in [
        ("first_name_th", &user.first_name_th),
        ("last_name_th", &user.last_name_th),
    ] {
        // Blank names are allowed
        if let Some(name) = value.as_deref().filter(|n| !n.is_empty()) {
            if !THAI_NAME_REGEX.is_match(name) {
                return Err(CatalogError::InvalidThaiName { field });
            }
        }
    }
    if let Some(date_of_birth) = user.date_of_birth {
        if date_of_birth > today {
            return Err(CatalogError::DateOfBirthInFuture(date_of_birth));
        }
    }
    if let Some(student_id) = &user.student_id {
        if !STUDENT_ID_REGEX.is_match(student_id) {
            return Err(CatalogError::InvalidStudentId);
        }
    }
    Ok(())
}

/// Returns true if `today` falls within the semester's dates (inclusive).
pub fn is_current_semester(start_date: NaiveDate, end_date: NaiveDate, today: NaiveDate) -> bool {
    start_date <= today && today <= end_date
}

/// Seat usage of a section, as needed by the enrollment rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeatStatus {
    pub course_code: String,
    pub section_number: String,
    pub capacity: u32,
    pub enrolled: u32,
}

impl SeatStatus {
    pub fn is_full(&self) -> bool {
        self.enrolled >= self.capacity
    }

    pub fn available_seats(&self) -> i64 {
        i64::from(self.capacity) - i64::from(self.enrolled)
    }
}

/// Decides whether a user may take a seat in a section.
///
/// # Arguments
/// * `user_type` - Role of the user asking to enroll
/// * `enrolled_in_course` - Whether the user already holds a seat in any section of the course
/// * `seats` - Seat usage of the requested section
pub fn check_enrollment(
    user_type: UserType,
    enrolled_in_course: bool,
    seats: &SeatStatus,
) -> Result<(), EnrollmentError> {
    if user_type != UserType::Student {
        return Err(EnrollmentError::NotAStudent);
    }
    if enrolled_in_course {
        return Err(EnrollmentError::AlreadyEnrolledInCourse {
            course_code: seats.course_code.clone(),
        });
    }
    if seats.is_full() {
        return Err(EnrollmentError::SectionFull {
            course_code: seats.course_code.clone(),
            section_number: seats.section_number.clone(),
        });
    }
    Ok(())
}
