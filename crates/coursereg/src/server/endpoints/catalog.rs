use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use tracing::info;

use crate::catalog::{
    NewBranch, NewCourse, NewDepartment, NewFaculty, NewRoom, NewSection, NewSemester, NewUser,
    SectionUpdate,
};
use crate::db::DbError;
use crate::server::types::ApiErrorType;
use crate::server::util::{json_body, section_json};
use crate::types::AppState;

type Body<T> = Result<Json<T>, JsonRejection>;

/// Maps the id of a freshly inserted record to `201 Created`.
fn created(id_field: &str, result: Result<i64, DbError>) -> Response {
    match result {
        Ok(id) => (StatusCode::CREATED, Json(json!({ id_field: id }))).into_response(),
        Err(e) => ApiErrorType::from(e).into_response(),
    }
}

fn no_content(result: Result<(), DbError>) -> Response {
    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => ApiErrorType::from(e).into_response(),
    }
}

/// POST /faculties
pub async fn post_faculty(State(s): State<Arc<AppState>>, payload: Body<NewFaculty>) -> Response {
    let faculty = match json_body(payload) {
        Ok(faculty) => faculty,
        Err(e) => return e.into_response(),
    };
    info!("POST /faculties ({})", faculty.name);
    created("faculty_id", s.schedule_db.create_faculty(&faculty))
}

/// POST /departments
pub async fn post_department(
    State(s): State<Arc<AppState>>,
    payload: Body<NewDepartment>,
) -> Response {
    let department = match json_body(payload) {
        Ok(department) => department,
        Err(e) => return e.into_response(),
    };
    info!("POST /departments ({})", department.name);
    created("department_id", s.schedule_db.create_department(&department))
}

/// POST /branches
pub async fn post_branch(State(s): State<Arc<AppState>>, payload: Body<NewBranch>) -> Response {
    let branch = match json_body(payload) {
        Ok(branch) => branch,
        Err(e) => return e.into_response(),
    };
    info!("POST /branches ({})", branch.name);
    created("branch_id", s.schedule_db.create_branch(&branch))
}

/// POST /semesters
pub async fn post_semester(
    State(s): State<Arc<AppState>>,
    payload: Body<NewSemester>,
) -> Response {
    let semester = match json_body(payload) {
        Ok(semester) => semester,
        Err(e) => return e.into_response(),
    };
    info!("POST /semesters ({}/{})", u8::from(semester.term), semester.year);
    created("semester_id", s.schedule_db.create_semester(&semester))
}

/// POST /rooms
pub async fn post_room(State(s): State<Arc<AppState>>, payload: Body<NewRoom>) -> Response {
    let room = match json_body(payload) {
        Ok(room) => room,
        Err(e) => return e.into_response(),
    };
    info!("POST /rooms ({}-{})", room.building, room.room_number);
    created("room_id", s.schedule_db.create_room(&room))
}

/// GET /courses
pub async fn get_courses(State(s): State<Arc<AppState>>) -> Response {
    info!("GET /courses");

    match s.schedule_db.list_courses() {
        Ok(courses) => (StatusCode::OK, Json(courses)).into_response(),
        Err(e) => ApiErrorType::from(e).into_response(),
    }
}

/// POST /courses
pub async fn post_course(State(s): State<Arc<AppState>>, payload: Body<NewCourse>) -> Response {
    let course = match json_body(payload) {
        Ok(course) => course,
        Err(e) => return e.into_response(),
    };
    info!("POST /courses ({})", course.code);
    created("course_id", s.schedule_db.create_course(&course))
}

/// PUT /courses/:course_id
pub async fn put_course(
    Path(course_id): Path<i64>,
    State(s): State<Arc<AppState>>,
    payload: Body<NewCourse>,
) -> Response {
    info!("PUT /courses/{}", course_id);

    let course = match json_body(payload) {
        Ok(course) => course,
        Err(e) => return e.into_response(),
    };

    match s
        .schedule_db
        .update_course(course_id, &course)
        .and_then(|()| s.schedule_db.get_course(course_id))
    {
        Ok(course) => (StatusCode::OK, Json(course)).into_response(),
        Err(e) => ApiErrorType::from(e).into_response(),
    }
}

/// DELETE /courses/:course_id
pub async fn delete_course(
    Path(course_id): Path<i64>,
    State(s): State<Arc<AppState>>,
) -> Response {
    info!("DELETE /courses/{}", course_id);
    no_content(s.schedule_db.delete_course(course_id))
}

/// GET /courses/:course_id/sections
/// Returns every section of a course with its class times
pub async fn get_course_sections(
    Path(course_id): Path<i64>,
    State(s): State<Arc<AppState>>,
) -> Response {
    info!("GET /courses/{}/sections", course_id);

    match s.schedule_db.sections_for_course(course_id) {
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

/// POST /sections
pub async fn post_section(State(s): State<Arc<AppState>>, payload: Body<NewSection>) -> Response {
    let section = match json_body(payload) {
        Ok(section) => section,
        Err(e) => return e.into_response(),
    };
    info!(
        "POST /sections (course={}, semester={}, section={})",
        section.course_id, section.semester_id, section.section_number
    );
    created("section_id", s.schedule_db.create_section(&section))
}

/// PUT /sections/:section_id
///
/// Stored class times are re-checked against the new room, instructors and semester; a
/// collision rejects the whole edit with `422`.
pub async fn put_section(
    Path(section_id): Path<i64>,
    State(s): State<Arc<AppState>>,
    payload: Body<SectionUpdate>,
) -> Response {
    info!("PUT /sections/{}", section_id);

    let update = match json_body(payload) {
        Ok(update) => update,
        Err(e) => return e.into_response(),
    };

    let result = s
        .schedule_db
        .update_section(section_id, &update, &s.policy)
        .and_then(|()| s.schedule_db.get_section(section_id))
        .and_then(|section| {
            let class_times = s.schedule_db.get_class_times_for_section(section_id)?;
            Ok(section_json(&section, &class_times))
        });
    match result {
        Ok(section) => (StatusCode::OK, Json(section)).into_response(),
        Err(e) => ApiErrorType::from(e).into_response(),
    }
}

/// DELETE /sections/:section_id
pub async fn delete_section(
    Path(section_id): Path<i64>,
    State(s): State<Arc<AppState>>,
) -> Response {
    info!("DELETE /sections/{}", section_id);
    no_content(s.schedule_db.delete_section(section_id))
}

/// POST /users
pub async fn post_user(State(s): State<Arc<AppState>>, payload: Body<NewUser>) -> Response {
    let user = match json_body(payload) {
        Ok(user) => user,
        Err(e) => return e.into_response(),
    };
    info!("POST /users ({}, {})", user.username, user.user_type);
    created("user_id", s.schedule_db.create_user(&user))
}
