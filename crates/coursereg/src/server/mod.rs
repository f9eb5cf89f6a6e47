use std::sync::Arc;

use axum::routing::{get, post, put};
use axum::{middleware as mw, Router};

use crate::server::endpoints::{catalog, class_times, enrollment, schedule, status};
use crate::server::middleware::*;
use crate::types::AppState;

mod endpoints;
pub mod middleware;
mod types;
mod util;

/// Creates a router that can be used by `axum`.
///
/// # Parameters
/// - `app_state`: The app server state.
///
/// # Returns
/// The router.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    // Router whose endpoints require a staff member
    let staff_router = Router::new()
        .route("/faculties", post(catalog::post_faculty))
        .route("/departments", post(catalog::post_department))
        .route("/branches", post(catalog::post_branch))
        .route("/semesters", post(catalog::post_semester))
        .route("/rooms", post(catalog::post_room))
        .route(
            "/courses",
            get(catalog::get_courses).post(catalog::post_course),
        )
        .route(
            "/courses/:course_id",
            put(catalog::put_course).delete(catalog::delete_course),
        )
        .route(
            "/courses/:course_id/sections",
            get(catalog::get_course_sections),
        )
        .route("/sections", post(catalog::post_section))
        .route(
            "/sections/:section_id",
            put(catalog::put_section).delete(catalog::delete_section),
        )
        .route("/users", post(catalog::post_user))
        .route(
            "/sections/:section_id/class_times",
            post(class_times::post_add_class_time),
        )
        .route(
            "/sections/:section_id/class_times/validate",
            post(class_times::post_validate_class_time),
        )
        .route(
            "/class_times/:class_time_id",
            put(class_times::put_update_class_time).delete(class_times::delete_class_time),
        )
        .layer(mw::from_fn(role_validator::require_staff));

    // Router whose endpoints need to know who is calling
    let user_router = Router::new()
        .route("/sections/:section_id/enroll", post(enrollment::post_enroll))
        .route("/my_schedule", get(schedule::get_my_schedule))
        .merge(staff_router)
        .layer(mw::from_fn_with_state(
            app_state.clone(),
            role_validator::identify_user,
        ));

    Router::new()
        .route("/health", get(status::get_health))
        .route("/semesters/current", get(schedule::get_current_semester))
        .route(
            "/semesters/:semester_id/schedule",
            get(schedule::get_semester_schedule),
        )
        .route("/sections", get(schedule::get_open_sections))
        .route(
            "/sections/:section_id/class_times",
            get(schedule::get_section_class_times),
        )
        .merge(user_router)
        .with_state(app_state)
}
