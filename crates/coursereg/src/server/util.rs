use axum::extract::rejection::JsonRejection;
use axum::Json;
use chrono::NaiveTime;
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;

use crate::conflict::{TimeRange, Weekday};
use crate::db::{DbClassTime, DbSection};
use crate::server::types::ApiErrorType;

/// Request body could not be turned into a class-time candidate.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FormError {
    #[error("{field} is required")]
    Missing { field: &'static str },

    #[error("'{value}' is not a day (expected MON..SUN)")]
    InvalidDay { value: String },

    #[error("{field} must be a time in HH:MM format (got '{value}')")]
    InvalidTime { field: &'static str, value: String },
}

impl FormError {
    pub fn field(&self) -> &'static str {
        match self {
            FormError::Missing { field } | FormError::InvalidTime { field, .. } => field,
            FormError::InvalidDay { .. } => "day",
        }
    }
}

/// Unwraps a JSON request body, rendering extractor rejections like every other error.
pub fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiErrorType> {
    payload.map(|Json(body)| body).map_err(ApiErrorType::from)
}

/// Class-time form as submitted by staff.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClassTimeForm {
    #[serde(default)]
    pub day: Option<String>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
}

impl ClassTimeForm {
    /// Parses the day and times. Range checks are left to the validator.
    pub fn parse(&self) -> Result<(Weekday, TimeRange), FormError> {
        let day = required("day", &self.day)?;
        let day = day.parse::<Weekday>().map_err(|_| FormError::InvalidDay {
            value: day.to_string(),
        })?;
        let start = parse_time("start_time", required("start_time", &self.start_time)?)?;
        let end = parse_time("end_time", required("end_time", &self.end_time)?)?;
        Ok((day, TimeRange::new(start, end)))
    }
}

fn required<'a>(field: &'static str, value: &'a Option<String>) -> Result<&'a str, FormError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(FormError::Missing { field })
}

/// Parses `HH:MM`, also accepting `HH:MM:SS` as sent by some time inputs.
pub fn parse_time(field: &'static str, value: &str) -> Result<NaiveTime, FormError> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .map_err(|_| FormError::InvalidTime {
            field,
            value: value.to_string(),
        })
}

pub fn class_time_json(class_time: &DbClassTime) -> Value {
    json!({
        "class_time_id": class_time.class_time_id,
        "section_id": class_time.section_id,
        "day": class_time.day,
        "start_time": class_time.start_time.format("%H:%M").to_string(),
        "end_time": class_time.end_time.format("%H:%M").to_string(),
    })
}

pub fn section_json(section: &DbSection, class_times: &[DbClassTime]) -> Value {
    json!({
        "section_id": section.section_id,
        "course_id": section.course_id,
        "course_code": section.course_code,
        "course_name": section.course_name,
        "semester_id": section.semester_id,
        "section_number": section.section_number,
        "capacity": section.capacity,
        "enrolled": section.enrolled,
        "available_seats": section.available_seats(),
        "room": section.room,
        "instructor_ids": section.instructor_ids,
        "class_times": class_times.iter().map(class_time_json).collect::<Vec<_>>(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(day: Option<&str>, start: Option<&str>, end: Option<&str>) -> ClassTimeForm {
        ClassTimeForm {
            day: day.map(str::to_string),
            start_time: start.map(str::to_string),
            end_time: end.map(str::to_string),
        }
    }

    #[test]
    fn test_parse_valid_form() {
        let (day, range) = form(Some("mon"), Some("09:00"), Some("11:30:00"))
            .parse()
            .unwrap();
        assert_eq!(day, Weekday::Mon);
        assert_eq!(range.to_string(), "09:00-11:30");
    }

    #[test]
    fn test_missing_fields_are_reported_in_order() {
        assert_eq!(
            form(None, Some("09:00"), Some("10:00")).parse(),
            Err(FormError::Missing { field: "day" })
        );
        assert_eq!(
            form(Some("MON"), Some(" "), Some("10:00")).parse().unwrap_err().field(),
            "start_time"
        );
        assert_eq!(
            form(Some("MON"), Some("09:00"), None).parse().unwrap_err().field(),
            "end_time"
        );
    }

    #[test]
    fn test_invalid_values() {
        assert_eq!(
            form(Some("XYZ"), Some("09:00"), Some("10:00")).parse().unwrap_err().field(),
            "day"
        );
        assert!(matches!(
            form(Some("MON"), Some("9am"), Some("10:00")).parse(),
            Err(FormError::InvalidTime { field: "start_time", .. })
        ));
        assert!(parse_time("end_time", "24:00").is_err());
    }

    #[test]
    fn test_reversed_times_still_parse() {
        // InvalidRange is the validator's call, not the form's
        let (_, range) = form(Some("TUE"), Some("11:00"), Some("09:00")).parse().unwrap();
        assert!(range.end < range.start);
    }
}
