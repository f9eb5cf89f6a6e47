//! Class-time conflict validation.
//!
//! [`validate`] decides whether a candidate slot may be stored, given the other slots of the
//! same semester. It is a pure function: the caller resolves section facts and supplies the
//! existing slots, and persists the candidate only when validation succeeds.

mod config;
mod error;
mod types;

pub use config::{CheckSet, ReportMode, ValidationPolicy, DEFAULT_MAX_DURATION_MINUTES};
pub use error::{ErrorKind, FieldId, ValidationError, ValidationErrorRecord, ValidationErrors};
pub use types::{
    ClassSlot, ConflictingSlot, RoomRef, SectionFacts, TimeRange, UnknownWeekday, Weekday,
};

/// Overlap checks in the order they are applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Check {
    SectionOverlap,
    RoomConflict,
    InstructorConflict,
}

impl Check {
    fn enabled(checks: &CheckSet) -> Vec<Check> {
        let mut out = Vec::with_capacity(3);
        if checks.section_overlap {
            out.push(Check::SectionOverlap);
        }
        if checks.room_conflict {
            out.push(Check::RoomConflict);
        }
        if checks.instructor_conflict {
            out.push(Check::InstructorConflict);
        }
        out
    }

    /// Evaluates this check against a slot already known to overlap the candidate on the
    /// same day.
    fn evaluate(&self, candidate: &ClassSlot, existing: &ClassSlot) -> Option<ValidationError> {
        let ours = &candidate.section;
        let theirs = &existing.section;
        match self {
            Check::SectionOverlap => (ours.section_id == theirs.section_id).then(|| {
                ValidationError::SectionOverlap {
                    conflict: existing.into(),
                }
            }),
            Check::RoomConflict => {
                let room = ours.room.as_ref()?;
                if ours.semester_id != theirs.semester_id || theirs.room_id() != Some(room.room_id)
                {
                    return None;
                }
                Some(ValidationError::RoomConflict {
                    room: room.label.clone(),
                    conflict: existing.into(),
                })
            }
            Check::InstructorConflict => {
                if ours.semester_id != theirs.semester_id || !ours.shares_instructor_with(theirs) {
                    return None;
                }
                Some(ValidationError::InstructorConflict {
                    instructor_ids: ours
                        .instructor_ids
                        .intersection(&theirs.instructor_ids)
                        .copied()
                        .collect(),
                    conflict: existing.into(),
                })
            }
        }
    }
}

/// Checks that a range is well-formed and within the policy's duration cap.
pub fn check_range(range: &TimeRange, policy: &ValidationPolicy) -> Result<(), ValidationError> {
    if range.end <= range.start {
        return Err(ValidationError::InvalidRange { range: *range });
    }

    let duration = range.duration();
    if duration > policy.max_duration() {
        return Err(ValidationError::DurationExceeded {
            max_minutes: policy.max_duration().num_minutes(),
            actual_minutes: duration.num_minutes(),
        });
    }

    Ok(())
}

/// Validates a candidate slot against existing slots.
///
/// Existing slots on other days, or carrying the candidate's own id, are ignored, so callers
/// may pass a semester-wide list and re-validating a stored slot against a list containing
/// itself succeeds. Range failures short-circuit the overlap checks.
///
/// # Returns
/// * `Ok(())` - The candidate may be stored
/// * `Err(ValidationErrors)` - Failures in check order; one entry under
///   [`ReportMode::FirstError`], one per conflicting slot under [`ReportMode::CollectAll`]
pub fn validate(
    candidate: &ClassSlot,
    existing: &[ClassSlot],
    policy: &ValidationPolicy,
) -> Result<(), ValidationErrors> {
    check_range(&candidate.time, policy).map_err(ValidationErrors::single)?;

    let overlapping: Vec<&ClassSlot> = existing
        .iter()
        .filter(|slot| !candidate.is_same_record(slot))
        .filter(|slot| slot.day == candidate.day && slot.time.overlaps(&candidate.time))
        .collect();

    let mut errors = Vec::new();
    let mut reported = vec![false; overlapping.len()];

    for check in Check::enabled(&policy.checks) {
        for (i, slot) in overlapping.iter().enumerate() {
            if reported[i] {
                continue;
            }
            if let Some(error) = check.evaluate(candidate, slot) {
                if policy.report == ReportMode::FirstError {
                    return Err(ValidationErrors::single(error));
                }
                reported[i] = true;
                errors.push(error);
            }
        }
    }

    match ValidationErrors::new(errors) {
        Some(errors) => Err(errors),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn section(section_id: i64, room: Option<i64>, semester_id: i64, instructors: &[i64]) -> SectionFacts {
        SectionFacts {
            section_id,
            course_code: format!("{:06}", 100000 + section_id),
            section_number: "1".to_string(),
            semester_id,
            room: room.map(|room_id| RoomRef {
                room_id,
                label: format!("R{room_id}"),
            }),
            instructor_ids: instructors.iter().copied().collect(),
        }
    }

    fn slot(facts: SectionFacts, day: Weekday, from: (u32, u32), to: (u32, u32)) -> ClassSlot {
        ClassSlot::new(facts, day, TimeRange::new(t(from.0, from.1), t(to.0, to.1)))
    }

    fn first_kind(result: Result<(), ValidationErrors>) -> ErrorKind {
        result.expect_err("expected rejection").first().kind()
    }

    fn existing_mon_9_to_11() -> Vec<ClassSlot> {
        vec![slot(section(1, Some(1), 1, &[1]), Weekday::Mon, (9, 0), (11, 0)).with_id(10)]
    }

    #[test]
    fn test_accepts_when_nothing_exists() {
        let candidate = slot(section(1, Some(1), 1, &[7]), Weekday::Mon, (9, 0), (11, 0));
        assert!(validate(&candidate, &[], &ValidationPolicy::default()).is_ok());
    }

    #[test]
    fn test_end_before_start_is_invalid_range() {
        let candidate = slot(section(1, Some(1), 1, &[1]), Weekday::Mon, (11, 0), (9, 0));
        let errors = validate(&candidate, &existing_mon_9_to_11(), &ValidationPolicy::default())
            .unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.first().kind(), ErrorKind::InvalidRange);
        assert_eq!(errors.first().field(), FieldId::EndTime);
    }

    #[test]
    fn test_equal_start_and_end_is_invalid_range() {
        let candidate = slot(section(2, None, 1, &[]), Weekday::Mon, (9, 0), (9, 0));
        assert_eq!(
            first_kind(validate(&candidate, &[], &ValidationPolicy::default())),
            ErrorKind::InvalidRange
        );
    }

    #[test]
    fn test_duration_cap() {
        let policy = ValidationPolicy::default().with_max_duration_minutes(120);
        let at_cap = slot(section(2, None, 1, &[]), Weekday::Mon, (8, 0), (10, 0));
        assert!(validate(&at_cap, &[], &policy).is_ok());

        let over_cap = slot(section(2, None, 1, &[]), Weekday::Mon, (8, 0), (10, 1));
        let errors = validate(&over_cap, &[], &policy).unwrap_err();
        assert_eq!(
            errors.first(),
            &ValidationError::DurationExceeded {
                max_minutes: 120,
                actual_minutes: 121
            }
        );
        assert_eq!(errors.first().field(), FieldId::EndTime);
    }

    #[test]
    fn test_default_cap_is_four_hours() {
        let policy = ValidationPolicy::default();
        let four = slot(section(2, None, 1, &[]), Weekday::Mon, (8, 0), (12, 0));
        let more = slot(section(2, None, 1, &[]), Weekday::Mon, (8, 0), (12, 30));
        assert!(validate(&four, &[], &policy).is_ok());
        assert_eq!(first_kind(validate(&more, &[], &policy)), ErrorKind::DurationExceeded);
    }

    #[test]
    fn test_same_section_overlap_rejected() {
        let candidate = slot(section(1, Some(1), 1, &[1]), Weekday::Mon, (10, 0), (12, 0));
        let errors = validate(&candidate, &existing_mon_9_to_11(), &ValidationPolicy::default())
            .unwrap_err();
        assert_eq!(errors.first().kind(), ErrorKind::SectionOverlap);
        assert_eq!(errors.first().field(), FieldId::NonField);
        assert_eq!(errors.first().conflict().and_then(|c| c.slot_id), Some(10));
    }

    #[test]
    fn test_room_conflict_names_course_and_section() {
        let candidate = slot(section(2, Some(1), 1, &[2]), Weekday::Mon, (10, 0), (12, 0));
        let errors = validate(&candidate, &existing_mon_9_to_11(), &ValidationPolicy::default())
            .unwrap_err();
        let error = errors.first();
        assert_eq!(error.kind(), ErrorKind::RoomConflict);
        let conflict = error.conflict().unwrap();
        assert_eq!(conflict.course_code, "100001");
        assert_eq!(conflict.section_number, "1");
        assert!(error.to_string().contains("R1"));
        assert!(error.to_string().contains("100001"));
    }

    #[test]
    fn test_shared_instructor_conflict() {
        let candidate = slot(section(2, Some(2), 1, &[1]), Weekday::Mon, (10, 0), (12, 0));
        let errors = validate(&candidate, &existing_mon_9_to_11(), &ValidationPolicy::default())
            .unwrap_err();
        match errors.first() {
            ValidationError::InstructorConflict {
                instructor_ids,
                conflict,
            } => {
                assert_eq!(instructor_ids, &vec![1]);
                assert_eq!(conflict.course_code, "100001");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_different_day_accepted() {
        let candidate = slot(section(1, Some(1), 1, &[1]), Weekday::Tue, (9, 0), (11, 0));
        assert!(validate(&candidate, &existing_mon_9_to_11(), &ValidationPolicy::default()).is_ok());
    }

    #[test]
    fn test_different_semester_accepted() {
        let candidate = slot(section(2, Some(1), 2, &[1]), Weekday::Mon, (9, 0), (11, 0));
        assert!(validate(&candidate, &existing_mon_9_to_11(), &ValidationPolicy::default()).is_ok());
    }

    #[test]
    fn test_touching_boundary_rejected() {
        let candidate = slot(section(1, Some(1), 1, &[1]), Weekday::Mon, (11, 0), (12, 0));
        assert_eq!(
            first_kind(validate(&candidate, &existing_mon_9_to_11(), &ValidationPolicy::default())),
            ErrorKind::SectionOverlap
        );

        let other_section = slot(section(2, Some(1), 1, &[2]), Weekday::Mon, (11, 0), (12, 0));
        assert_eq!(
            first_kind(validate(&other_section, &existing_mon_9_to_11(), &ValidationPolicy::default())),
            ErrorKind::RoomConflict
        );
    }

    #[test]
    fn test_candidate_without_room_skips_room_check() {
        let existing = vec![slot(section(1, None, 1, &[1]), Weekday::Mon, (9, 0), (11, 0)).with_id(10)];
        let candidate = slot(section(2, None, 1, &[2]), Weekday::Mon, (9, 0), (11, 0));
        assert!(validate(&candidate, &existing, &ValidationPolicy::default()).is_ok());
    }

    #[test]
    fn test_empty_instructor_sets_never_conflict() {
        let existing = vec![slot(section(1, Some(1), 1, &[]), Weekday::Mon, (9, 0), (11, 0)).with_id(10)];
        let candidate = slot(section(2, Some(2), 1, &[]), Weekday::Mon, (9, 0), (11, 0));
        assert!(validate(&candidate, &existing, &ValidationPolicy::default()).is_ok());
    }

    #[test]
    fn test_revalidating_stored_slot_is_idempotent() {
        let existing = existing_mon_9_to_11();
        let same = existing[0].clone();
        assert!(validate(&same, &existing, &ValidationPolicy::default()).is_ok());
    }

    #[test]
    fn test_editing_slot_ignores_its_old_version() {
        let existing = existing_mon_9_to_11();
        let edited = slot(section(1, Some(1), 1, &[1]), Weekday::Mon, (10, 0), (12, 0)).with_id(10);
        assert!(validate(&edited, &existing, &ValidationPolicy::default()).is_ok());
    }

    #[test]
    fn test_disabled_instructor_check() {
        let policy = ValidationPolicy::default().with_checks(CheckSet {
            instructor_conflict: false,
            ..CheckSet::default()
        });
        let candidate = slot(section(2, Some(2), 1, &[1]), Weekday::Mon, (10, 0), (12, 0));
        assert!(validate(&candidate, &existing_mon_9_to_11(), &policy).is_ok());
    }

    #[test]
    fn test_range_errors_ignore_disabled_checks() {
        let policy = ValidationPolicy::default().with_checks(CheckSet {
            section_overlap: false,
            room_conflict: false,
            instructor_conflict: false,
        });
        let candidate = slot(section(2, None, 1, &[]), Weekday::Mon, (12, 0), (10, 0));
        assert_eq!(first_kind(validate(&candidate, &[], &policy)), ErrorKind::InvalidRange);
    }

    #[test]
    fn test_collect_all_reports_each_conflicting_slot_once() {
        let existing = vec![
            // same section and room: reported as a section overlap only
            slot(section(1, Some(1), 1, &[1]), Weekday::Mon, (9, 0), (11, 0)).with_id(10),
            slot(section(2, Some(1), 1, &[2]), Weekday::Mon, (10, 0), (11, 0)).with_id(11),
            slot(section(3, Some(3), 1, &[1]), Weekday::Mon, (11, 30), (12, 0)).with_id(12),
            slot(section(4, Some(1), 1, &[1]), Weekday::Tue, (9, 0), (11, 0)).with_id(13),
        ];
        let policy = ValidationPolicy::default().with_report(ReportMode::CollectAll);
        let candidate = slot(section(1, Some(1), 1, &[1]), Weekday::Mon, (10, 30), (12, 0));

        let errors = validate(&candidate, &existing, &policy).unwrap_err();
        assert_eq!(
            errors.kinds(),
            vec![
                ErrorKind::SectionOverlap,
                ErrorKind::RoomConflict,
                ErrorKind::InstructorConflict
            ]
        );
        let ids: Vec<_> = errors
            .iter()
            .filter_map(|e| e.conflict().and_then(|c| c.slot_id))
            .collect();
        assert_eq!(ids, vec![10, 11, 12]);
    }

    #[test]
    fn test_records_serialize_with_field_keys() {
        let candidate = slot(section(2, Some(1), 1, &[2]), Weekday::Mon, (10, 0), (12, 0));
        let errors = validate(&candidate, &existing_mon_9_to_11(), &ValidationPolicy::default())
            .unwrap_err();
        let json = serde_json::to_value(errors.records()).unwrap();
        assert_eq!(json[0]["field"], "__all__");
        assert_eq!(json[0]["kind"], "room_conflict");
        assert_eq!(json[0]["conflict"]["day"], "MON");
    }
}
