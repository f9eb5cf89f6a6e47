use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::info;

use crate::db::DbSemester;
use crate::server::middleware::role_validator::CurrentUser;
use crate::server::types::ApiErrorType;
use crate::server::util::{class_time_json, section_json};
use crate::types::AppState;

#[derive(Debug, Deserialize)]
pub struct SectionSearchParams {
    /// Semester to list; defaults to the current one
    #[serde(default)]
    pub semester: Option<i64>,
    /// Case-insensitive substring of the course code or name
    #[serde(default)]
    pub q: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SemesterParams {
    #[serde(default)]
    pub semester: Option<i64>,
}

/// Resolves an explicit semester id, or the semester containing today.
fn resolve_semester(s: &AppState, semester: Option<i64>) -> Result<Option<DbSemester>, ApiErrorType> {
    match semester {
        Some(id) => Ok(Some(s.schedule_db.get_semester(id)?)),
        None => {
            let today = chrono::Local::now().date_naive();
            Ok(s.schedule_db.current_semester(today)?)
        }
    }
}

/// GET /semesters/current
pub async fn get_current_semester(State(s): State<Arc<AppState>>) -> Response {
    info!("GET /semesters/current");

    match resolve_semester(&s, None) {
        Ok(Some(semester)) => (StatusCode::OK, Json(semester)).into_response(),
        Ok(None) => ApiErrorType::from((
            StatusCode::NOT_FOUND,
            "No semester is currently running",
            None,
        ))
        .into_response(),
        Err(e) => e.into_response(),
    }
}

/// GET /semesters/:semester_id/schedule
/// Returns all sections with their class times for a semester
pub async fn get_semester_schedule(
    Path(semester_id): Path<i64>,
    State(s): State<Arc<AppState>>,
) -> Response {
    info!("GET /semesters/{}/schedule", semester_id);

    match s.schedule_db.get_semester_schedule(semester_id) {
        Ok(data) => {
            let response: Vec<_> = data
                .iter()
                .map(|(section, class_times)| section_json(section, class_times))
                .collect();
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => ApiErrorType::from(e).into_response(),
    }
}

/// GET /sections?semester=&q=
/// Lists sections of active courses open for registration
pub async fn get_open_sections(
    State(s): State<Arc<AppState>>,
    Query(params): Query<SectionSearchParams>,
) -> Response {
    info!(
        "GET /sections (semester={:?}, q={:?})",
        params.semester, params.q
    );

    let semester = match resolve_semester(&s, params.semester) {
        Ok(semester) => semester,
        Err(e) => return e.into_response(),
    };

    // Nothing is open outside a running semester
    let Some(semester) = semester else {
        return (
            StatusCode::OK,
            Json(json!({ "semester": null, "sections": [] })),
        )
            .into_response();
    };

    match s
        .schedule_db
        .search_open_sections(semester.semester_id, params.q.as_deref())
    {
        Ok(data) => {
            let sections: Vec<_> = data
                .iter()
                .map(|(section, class_times)| section_json(section, class_times))
                .collect();
            (
                StatusCode::OK,
                Json(json!({ "semester": semester, "sections": sections })),
            )
                .into_response()
        }
        Err(e) => ApiErrorType::from(e).into_response(),
    }
}

/// GET /sections/:section_id/class_times
pub async fn get_section_class_times(
    Path(section_id): Path<i64>,
    State(s): State<Arc<AppState>>,
) -> Response {
    info!("GET /sections/{}/class_times", section_id);

    match s.schedule_db.get_class_times_for_section(section_id) {
        Ok(class_times) => {
            let response: Vec<_> = class_times.iter().map(class_time_json).collect();
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => ApiErrorType::from(e).into_response(),
    }
}

/// GET /my_schedule?semester=
/// Sections the caller is enrolled in, for the given or current semester
pub async fn get_my_schedule(
    State(s): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Query(params): Query<SemesterParams>,
) -> Response {
    info!("GET /my_schedule (user={})", user.user_id);

    let semester = match resolve_semester(&s, params.semester) {
        Ok(semester) => semester,
        Err(e) => return e.into_response(),
    };
    let Some(semester) = semester else {
        return (
            StatusCode::OK,
            Json(json!({ "semester": null, "sections": [] })),
        )
            .into_response();
    };

    match s
        .schedule_db
        .student_schedule(user.user_id, semester.semester_id)
    {
        Ok(data) => {
            let sections: Vec<_> = data
                .iter()
                .map(|(section, class_times)| section_json(section, class_times))
                .collect();
            (
                StatusCode::OK,
                Json(json!({ "semester": semester, "sections": sections })),
            )
                .into_response()
        }
        Err(e) => ApiErrorType::from(e).into_response(),
    }
}
