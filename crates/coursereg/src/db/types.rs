//! Database types for the registration store
use chrono::{NaiveDate, NaiveTime};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::Serialize;
use thiserror::Error;

use crate::catalog::{CatalogError, EnrollmentError, StudentStatus, Term, UserType};
use crate::conflict::{ClassSlot, ValidationErrors, Weekday};

#[derive(Debug, Error)]
pub enum DbError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Enrollment(#[from] EnrollmentError),

    #[error("database lock poisoned")]
    LockPoisoned,
}

impl DbError {
    pub(crate) fn not_found(entity: &'static str, id: i64) -> Self {
        DbError::NotFound { entity, id }
    }
}

impl ToSql for Weekday {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_code()))
    }
}

impl FromSql for Weekday {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

impl ToSql for UserType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_code()))
    }
}

impl FromSql for UserType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: String| FromSqlError::Other(e.into()))
    }
}

impl ToSql for StudentStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_code()))
    }
}

impl FromSql for StudentStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: String| FromSqlError::Other(e.into()))
    }
}

impl ToSql for Term {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(i64::from(u8::from(*self))))
    }
}

impl FromSql for Term {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let raw = value.as_i64()?;
        let raw = u8::try_from(raw).map_err(|_| FromSqlError::OutOfRange(raw))?;
        Term::try_from(raw).map_err(|e| FromSqlError::Other(e.into()))
    }
}

/// Filter for [`super::ScheduleDbManager::existing_slots_for`].
///
/// Semester and day always apply. When any of `section_id`, `room_id` or `instructor_ids` is
/// set, only slots matching at least one of them are returned.
#[derive(Debug, Clone, Default)]
pub struct SlotQuery {
    pub semester_id: i64,
    pub day: Option<Weekday>,
    pub section_id: Option<i64>,
    pub room_id: Option<i64>,
    pub instructor_ids: Vec<i64>,
    pub exclude_slot_id: Option<i64>,
}

impl SlotQuery {
    pub fn new(semester_id: i64, day: Weekday) -> Self {
        Self {
            semester_id,
            day: Some(day),
            ..Default::default()
        }
    }

    /// Slots that could conflict with `candidate`.
    pub fn for_candidate(candidate: &ClassSlot) -> Self {
        Self {
            semester_id: candidate.section.semester_id,
            day: Some(candidate.day),
            section_id: Some(candidate.section.section_id),
            room_id: candidate.section.room_id(),
            instructor_ids: candidate.section.instructor_ids.iter().copied().collect(),
            exclude_slot_id: candidate.slot_id,
        }
    }

    fn has_subject_filter(&self) -> bool {
        self.section_id.is_some() || self.room_id.is_some() || !self.instructor_ids.is_empty()
    }

    pub(crate) fn matches(&self, slot: &ClassSlot) -> bool {
        if slot.slot_id.is_some() && slot.slot_id == self.exclude_slot_id {
            return false;
        }
        if !self.has_subject_filter() {
            return true;
        }
        let facts = &slot.section;
        self.section_id == Some(facts.section_id)
            || (self.room_id.is_some() && self.room_id == facts.room_id())
            || self
                .instructor_ids
                .iter()
                .any(|id| facts.instructor_ids.contains(id))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DbSemester {
    pub semester_id: i64,
    pub year: u16,
    pub term: Term,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Debug, Clone, Serialize)]
pub struct DbCourse {
    pub course_id: i64,
    pub code: String,
    pub name: String,
    pub credits: u8,
    pub department_id: Option<i64>,
    pub description: Option<String>,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct DbSection {
    pub section_id: i64,
    pub course_id: i64,
    pub course_code: String,
    pub course_name: String,
    pub semester_id: i64,
    pub section_number: String,
    pub capacity: u32,
    pub enrolled: u32,
    pub room_id: Option<i64>,
    pub room: Option<String>,
    pub instructor_ids: Vec<i64>,
}

impl DbSection {
    pub fn available_seats(&self) -> i64 {
        i64::from(self.capacity) - i64::from(self.enrolled)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DbClassTime {
    pub class_time_id: i64,
    pub section_id: i64,
    pub day: Weekday,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conflict::{RoomRef, SectionFacts, TimeRange};

    fn slot(section_id: i64, room: Option<i64>, instructors: &[i64], id: i64) -> ClassSlot {
        let facts = SectionFacts {
            section_id,
            course_code: "123456".to_string(),
            section_number: "1".to_string(),
            semester_id: 1,
            room: room.map(|room_id| RoomRef {
                room_id,
                label: "A-101".to_string(),
            }),
            instructor_ids: instructors.iter().copied().collect(),
        };
        let t = |h| NaiveTime::from_hms_opt(h, 0, 0).unwrap();
        ClassSlot::new(facts, Weekday::Mon, TimeRange::new(t(9), t(11))).with_id(id)
    }

    #[test]
    fn test_unfiltered_query_matches_everything_but_excluded() {
        let mut query = SlotQuery::new(1, Weekday::Mon);
        assert!(query.matches(&slot(1, None, &[], 1)));
        query.exclude_slot_id = Some(1);
        assert!(!query.matches(&slot(1, None, &[], 1)));
    }

    #[test]
    fn test_subject_filters_are_a_union() {
        let query = SlotQuery {
            section_id: Some(1),
            room_id: Some(5),
            instructor_ids: vec![7],
            ..SlotQuery::new(1, Weekday::Mon)
        };
        assert!(query.matches(&slot(1, None, &[], 1)));
        assert!(query.matches(&slot(2, Some(5), &[], 2)));
        assert!(query.matches(&slot(3, None, &[7, 8], 3)));
        assert!(!query.matches(&slot(4, Some(6), &[8], 4)));
    }
}
