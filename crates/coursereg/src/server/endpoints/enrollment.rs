use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde_json::json;
use std::sync::Arc;
use tracing::info;

use crate::server::middleware::role_validator::CurrentUser;
use crate::server::types::ApiErrorType;
use crate::types::AppState;

/// POST /sections/:section_id/enroll
pub async fn post_enroll(
    Path(section_id): Path<i64>,
    State(s): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
) -> Response {
    info!("POST /sections/{}/enroll (user={})", section_id, user.user_id);

    match s.schedule_db.enroll(user.user_id, section_id) {
        Ok(()) => (
            StatusCode::CREATED,
            Json(json!({ "user_id": user.user_id, "section_id": section_id })),
        )
            .into_response(),
        Err(e) => ApiErrorType::from(e).into_response(),
    }
}
