use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::warn;

use crate::catalog::UserType;
use crate::server::types::ApiErrorType;
use crate::types::AppState;

/// Header carrying the id of the calling user.
pub const USER_ID_HEADER: &str = "x-user-id";

/// The identified caller, inserted into request extensions by [`identify_user`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser {
    pub user_id: i64,
    pub user_type: UserType,
}

/// Resolves the `X-User-Id` header to a known user.
///
/// # Parameters
/// - `s`: The app server state.
/// - `req`: The request.
/// - `next`: The next middleware or handler.
///
/// # Returns
/// The handler's response, or `401` if the header is missing or names no user.
pub async fn identify_user(State(s): State<Arc<AppState>>, mut req: Request, next: Next) -> Response {
    let user_id = req
        .headers()
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<i64>().ok());

    let Some(user_id) = user_id else {
        return ApiErrorType::from((
            StatusCode::UNAUTHORIZED,
            "Missing or malformed X-User-Id header",
            None,
        ))
        .into_response();
    };

    match s.schedule_db.user_type(user_id) {
        Ok(Some(user_type)) => {
            req.extensions_mut().insert(CurrentUser { user_id, user_type });
            next.run(req).await
        }
        Ok(None) => {
            warn!("Request from unknown user {}", user_id);
            ApiErrorType::from((
                StatusCode::UNAUTHORIZED,
                "Unknown user",
                Some(format!("No user with id {user_id}")),
            ))
            .into_response()
        }
        Err(e) => ApiErrorType::from(e).into_response(),
    }
}

/// Lets the request through only if [`identify_user`] found a staff member.
pub async fn require_staff(req: Request, next: Next) -> Response {
    match req.extensions().get::<CurrentUser>().copied() {
        Some(user) if user.user_type == UserType::Staff => next.run(req).await,
        Some(user) => {
            warn!(
                "User {} ({}) tried to reach a staff-only endpoint: {}",
                user.user_id,
                user.user_type,
                req.uri()
            );
            ApiErrorType::from((StatusCode::FORBIDDEN, "Staff only", None)).into_response()
        }
        None => ApiErrorType::from((StatusCode::UNAUTHORIZED, "Not identified", None))
            .into_response(),
    }
}
