//! Error types for class-time validation.

use super::types::{ConflictingSlot, TimeRange};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Form field an error is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldId {
    #[serde(rename = "end_time")]
    EndTime,
    /// Form-level error not tied to a single input.
    #[serde(rename = "__all__")]
    NonField,
}

impl FieldId {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldId::EndTime => "end_time",
            FieldId::NonField => "__all__",
        }
    }
}

/// Stable machine-readable name of a validation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidRange,
    DurationExceeded,
    SectionOverlap,
    RoomConflict,
    InstructorConflict,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidRange => "invalid_range",
            ErrorKind::DurationExceeded => "duration_exceeded",
            ErrorKind::SectionOverlap => "section_overlap",
            ErrorKind::RoomConflict => "room_conflict",
            ErrorKind::InstructorConflict => "instructor_conflict",
        }
    }
}

/// A single reason a class-time slot was rejected.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// End time is not after start time
    #[error("end time must be after start time (got {range})")]
    InvalidRange { range: TimeRange },

    /// Slot is longer than the configured cap
    #[error("class time must not exceed {max_minutes} minutes (got {actual_minutes})")]
    DurationExceeded { max_minutes: i64, actual_minutes: i64 },

    /// Collides with another slot of the same section
    #[error(
        "overlaps another class time of this section ({} {})",
        .conflict.day,
        .conflict.time
    )]
    SectionOverlap { conflict: ConflictingSlot },

    /// Room is already booked at this time in the same semester
    #[error(
        "room {room} is already in use at this time by course {} section {}",
        .conflict.course_code,
        .conflict.section_number
    )]
    RoomConflict {
        room: String,
        conflict: ConflictingSlot,
    },

    /// One of the section's instructors already teaches at this time
    #[error(
        "an instructor of this section already teaches course {} section {} at this time",
        .conflict.course_code,
        .conflict.section_number
    )]
    InstructorConflict {
        instructor_ids: Vec<i64>,
        conflict: ConflictingSlot,
    },
}

impl ValidationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ValidationError::InvalidRange { .. } => ErrorKind::InvalidRange,
            ValidationError::DurationExceeded { .. } => ErrorKind::DurationExceeded,
            ValidationError::SectionOverlap { .. } => ErrorKind::SectionOverlap,
            ValidationError::RoomConflict { .. } => ErrorKind::RoomConflict,
            ValidationError::InstructorConflict { .. } => ErrorKind::InstructorConflict,
        }
    }

    /// Range problems belong to `end_time`; overlaps are form-level.
    pub fn field(&self) -> FieldId {
        match self {
            ValidationError::InvalidRange { .. } | ValidationError::DurationExceeded { .. } => {
                FieldId::EndTime
            }
            _ => FieldId::NonField,
        }
    }

    pub fn conflict(&self) -> Option<&ConflictingSlot> {
        match self {
            ValidationError::SectionOverlap { conflict }
            | ValidationError::RoomConflict { conflict, .. }
            | ValidationError::InstructorConflict { conflict, .. } => Some(conflict),
            _ => None,
        }
    }

    pub fn to_record(&self) -> ValidationErrorRecord {
        ValidationErrorRecord {
            field: self.field(),
            kind: self.kind(),
            message: self.to_string(),
            conflict: self.conflict().cloned(),
        }
    }
}

/// Serializable view of a [`ValidationError`] for API responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationErrorRecord {
    pub field: FieldId,
    pub kind: ErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub conflict: Option<ConflictingSlot>,
}

/// Ordered, non-empty list of validation failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationErrors(Vec<ValidationError>);

impl ValidationErrors {
    pub(crate) fn new(errors: Vec<ValidationError>) -> Option<Self> {
        if errors.is_empty() {
            None
        } else {
            Some(Self(errors))
        }
    }

    pub fn single(error: ValidationError) -> Self {
        Self(vec![error])
    }

    /// The highest-priority failure (checks run in a fixed order).
    pub fn first(&self) -> &ValidationError {
        &self.0[0]
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn kinds(&self) -> Vec<ErrorKind> {
        self.0.iter().map(ValidationError::kind).collect()
    }

    pub fn records(&self) -> Vec<ValidationErrorRecord> {
        self.0.iter().map(ValidationError::to_record).collect()
    }

    pub fn into_inner(self) -> Vec<ValidationError> {
        self.0
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}: {}", error.field().as_str(), error)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}
