//! Types describing class-time slots and the section facts they are checked against
use chrono::{NaiveTime, TimeDelta, Timelike};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Day of the week a slot recurs on, stored and transmitted as `MON`..`SUN`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Weekday {
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
    Sun,
}

impl Weekday {
    pub const ALL: [Weekday; 7] = [
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
        Weekday::Sat,
        Weekday::Sun,
    ];

    /// The three-letter code used in storage and request bodies.
    pub fn as_code(&self) -> &'static str {
        match self {
            Weekday::Mon => "MON",
            Weekday::Tue => "TUE",
            Weekday::Wed => "WED",
            Weekday::Thu => "THU",
            Weekday::Fri => "FRI",
            Weekday::Sat => "SAT",
            Weekday::Sun => "SUN",
        }
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_code())
    }
}

/// Returned when a day code is not one of `MON`..`SUN`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownWeekday(pub String);

impl fmt::Display for UnknownWeekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown day '{}'", self.0)
    }
}

impl std::error::Error for UnknownWeekday {}

impl FromStr for Weekday {
    type Err = UnknownWeekday;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().to_ascii_uppercase();
        Weekday::ALL
            .iter()
            .copied()
            .find(|day| day.as_code() == code)
            .ok_or_else(|| UnknownWeekday(s.to_string()))
    }
}

/// A time-of-day interval. Not guaranteed to be well-formed; the validator reports
/// `end <= start` rather than refusing to construct it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawTimeRange")]
pub struct TimeRange {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

#[derive(Deserialize)]
struct RawTimeRange {
    start: NaiveTime,
    end: NaiveTime,
}

impl From<RawTimeRange> for TimeRange {
    fn from(raw: RawTimeRange) -> Self {
        TimeRange::new(raw.start, raw.end)
    }
}

impl TimeRange {
    /// Builds a range, dropping seconds so both ends have minute precision.
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self {
            start: truncate_to_minute(start),
            end: truncate_to_minute(end),
        }
    }

    pub fn duration(&self) -> TimeDelta {
        self.end - self.start
    }

    /// Inclusive overlap: touching endpoints count as overlapping.
    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.start <= other.end && other.start <= self.end
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}",
            self.start.format("%H:%M"),
            self.end.format("%H:%M")
        )
    }
}

fn truncate_to_minute(t: NaiveTime) -> NaiveTime {
    t.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(t)
}

/// A room as seen by the validator: its id for comparison and a label for messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomRef {
    pub room_id: i64,
    pub label: String,
}

/// Everything the validator needs to know about the section owning a slot.
///
/// Resolved once by the caller (section -> course, semester, room, instructors) so the
/// validator itself never touches storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionFacts {
    pub section_id: i64,
    pub course_code: String,
    pub section_number: String,
    pub semester_id: i64,
    pub room: Option<RoomRef>,
    pub instructor_ids: BTreeSet<i64>,
}

impl SectionFacts {
    pub fn room_id(&self) -> Option<i64> {
        self.room.as_ref().map(|r| r.room_id)
    }

    pub fn shares_instructor_with(&self, other: &SectionFacts) -> bool {
        !self.instructor_ids.is_disjoint(&other.instructor_ids)
    }
}

/// One weekly class-time slot, either a candidate under validation or an existing one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassSlot {
    /// `None` for a slot that has not been stored yet.
    pub slot_id: Option<i64>,
    pub section: SectionFacts,
    pub day: Weekday,
    pub time: TimeRange,
}

impl ClassSlot {
    pub fn new(section: SectionFacts, day: Weekday, time: TimeRange) -> Self {
        Self {
            slot_id: None,
            section,
            day,
            time,
        }
    }

    pub fn with_id(mut self, slot_id: i64) -> Self {
        self.slot_id = Some(slot_id);
        self
    }

    /// True when both slots refer to the same stored record.
    pub fn is_same_record(&self, other: &ClassSlot) -> bool {
        matches!((self.slot_id, other.slot_id), (Some(a), Some(b)) if a == b)
    }
}

/// Summary of the slot a candidate collided with, carried inside conflict errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictingSlot {
    pub slot_id: Option<i64>,
    pub course_code: String,
    pub section_number: String,
    pub day: Weekday,
    pub time: TimeRange,
}

impl From<&ClassSlot> for ConflictingSlot {
    fn from(slot: &ClassSlot) -> Self {
        Self {
            slot_id: slot.slot_id,
            course_code: slot.section.course_code.clone(),
            section_number: slot.section.section_number.clone(),
            day: slot.day,
            time: slot.time,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_weekday_parse_is_case_insensitive() {
        assert_eq!("mon".parse::<Weekday>(), Ok(Weekday::Mon));
        assert_eq!(" SUN ".parse::<Weekday>(), Ok(Weekday::Sun));
        assert!("MONDAY".parse::<Weekday>().is_err());
    }

    #[test]
    fn test_weekday_serde_uses_codes() {
        let json = serde_json::to_string(&Weekday::Thu).unwrap();
        assert_eq!(json, "\"THU\"");
        let day: Weekday = serde_json::from_str("\"FRI\"").unwrap();
        assert_eq!(day, Weekday::Fri);
    }

    #[test]
    fn test_deserialized_range_drops_seconds() {
        let range: TimeRange =
            serde_json::from_str(r#"{"start":"09:00:45","end":"10:59:59.500"}"#).unwrap();
        assert_eq!(range, TimeRange::new(t(9, 0), t(10, 59)));
        assert_eq!(range.start, t(9, 0));
        assert_eq!(range.end, t(10, 59));
    }

    #[test]
    fn test_touching_ranges_overlap() {
        let a = TimeRange::new(t(9, 0), t(11, 0));
        let b = TimeRange::new(t(11, 0), t(12, 0));
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
    }

    #[test]
    fn test_disjoint_ranges_do_not_overlap() {
        let a = TimeRange::new(t(9, 0), t(10, 59));
        let b = TimeRange::new(t(11, 0), t(12, 0));
        assert!(!a.overlaps(&b));
        assert!(!b.overlaps(&a));
    }

    #[test]
    fn test_contained_range_overlaps() {
        let outer = TimeRange::new(t(8, 0), t(12, 0));
        let inner = TimeRange::new(t(9, 30), t(10, 30));
        assert!(outer.overlaps(&inner));
        assert!(inner.overlaps(&outer));
    }

    #[test]
    fn test_new_truncates_seconds() {
        let range = TimeRange::new(
            NaiveTime::from_hms_opt(9, 0, 42).unwrap(),
            NaiveTime::from_hms_milli_opt(10, 15, 5, 250).unwrap(),
        );
        assert_eq!(range.start, t(9, 0));
        assert_eq!(range.end, t(10, 15));
        assert_eq!(range.duration().num_minutes(), 75);
        assert_eq!(range.to_string(), "09:00-10:15");
    }
}
