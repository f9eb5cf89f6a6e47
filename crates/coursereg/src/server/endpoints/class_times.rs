//! Staff endpoints for creating, editing and removing class times.
//!
//! Every create and edit is checked by the conflict validator with the server's policy before
//! anything is written.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

use crate::conflict::{TimeRange, Weekday};
use crate::server::types::ApiErrorType;
use crate::server::util::{json_body, ClassTimeForm};
use crate::types::AppState;

/// Reads and parses a class-time body. Range checks are left to the validator.
fn parse_class_time(
    payload: Result<Json<ClassTimeForm>, JsonRejection>,
) -> Result<(Weekday, TimeRange), ApiErrorType> {
    let form = json_body(payload)?;
    Ok(form.parse()?)
}

/// POST /sections/:section_id/class_times
pub async fn post_add_class_time(
    Path(section_id): Path<i64>,
    State(s): State<Arc<AppState>>,
    payload: Result<Json<ClassTimeForm>, JsonRejection>,
) -> Response {
    info!("POST /sections/{}/class_times", section_id);

    let (day, time) = match parse_class_time(payload) {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!(
                "Malformed class time for section {}: {:?}",
                section_id, e.context
            );
            return e.into_response();
        }
    };

    match s.schedule_db.add_class_time(section_id, day, time, &s.policy) {
        Ok(class_time_id) => (
            StatusCode::CREATED,
            Json(json!({
                "class_time_id": class_time_id,
                "section_id": section_id,
                "day": day,
                "start_time": time.start.format("%H:%M").to_string(),
                "end_time": time.end.format("%H:%M").to_string(),
            })),
        )
            .into_response(),
        Err(e) => ApiErrorType::from(e).into_response(),
    }
}

/// POST /sections/:section_id/class_times/validate
///
/// Runs the same checks as a create without storing anything.
pub async fn post_validate_class_time(
    Path(section_id): Path<i64>,
    State(s): State<Arc<AppState>>,
    payload: Result<Json<ClassTimeForm>, JsonRejection>,
) -> Response {
    info!("POST /sections/{}/class_times/validate", section_id);

    let (day, time) = match parse_class_time(payload) {
        Ok(parsed) => parsed,
        Err(e) => return e.into_response(),
    };

    match s
        .schedule_db
        .check_class_time(section_id, day, time, None, &s.policy)
    {
        Ok(()) => (StatusCode::OK, Json(json!({ "valid": true }))).into_response(),
        Err(e) => ApiErrorType::from(e).into_response(),
    }
}

/// PUT /class_times/:class_time_id
pub async fn put_update_class_time(
    Path(class_time_id): Path<i64>,
    State(s): State<Arc<AppState>>,
    payload: Result<Json<ClassTimeForm>, JsonRejection>,
) -> Response {
    info!("PUT /class_times/{}", class_time_id);

    let (day, time) = match parse_class_time(payload) {
        Ok(parsed) => parsed,
        Err(e) => return e.into_response(),
    };

    match s
        .schedule_db
        .update_class_time(class_time_id, day, time, &s.policy)
    {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "class_time_id": class_time_id,
                "day": day,
                "start_time": time.start.format("%H:%M").to_string(),
                "end_time": time.end.format("%H:%M").to_string(),
            })),
        )
            .into_response(),
        Err(e) => ApiErrorType::from(e).into_response(),
    }
}

/// DELETE /class_times/:class_time_id
pub async fn delete_class_time(
    Path(class_time_id): Path<i64>,
    State(s): State<Arc<AppState>>,
) -> Response {
    info!("DELETE /class_times/{}", class_time_id);

    match s.schedule_db.delete_class_time(class_time_id) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => ApiErrorType::from(e).into_response(),
    }
}
