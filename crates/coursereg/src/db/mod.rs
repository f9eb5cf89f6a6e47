//! Database module for courses, sections, class times and enrollment

mod types;

pub use types::{DbClassTime, DbCourse, DbError, DbSection, DbSemester, SlotQuery};

use chrono::NaiveDate;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, TransactionBehavior};
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

use crate::catalog::{
    self, CatalogError, NewBranch, NewCourse, NewDepartment, NewFaculty, NewRoom, NewSection,
    NewSemester, NewUser, SeatStatus, SectionUpdate, UserType,
};
use crate::conflict::{self, ClassSlot, RoomRef, SectionFacts, TimeRange, ValidationPolicy, Weekday};

const SCHEMA_SQL: &str = include_str!("../../../../sql/init_schedules.sql");

const SECTION_COLUMNS: &str = "s.section_id, s.course_id, c.code, c.name, s.semester_id,
    s.section_number, s.capacity, s.room_id, r.building, r.room_number,
    (SELECT COUNT(*) FROM enrollments e WHERE e.section_id = s.section_id)";

const COURSE_COLUMNS: &str =
    "course_id, code, name, credits, department_id, description, is_active";

const SECTION_FROM: &str = "FROM sections s
    JOIN courses c ON s.course_id = c.course_id
    LEFT JOIN rooms r ON s.room_id = r.room_id";

pub struct ScheduleDbManager {
    db: Mutex<Connection>,
}

impl ScheduleDbManager {
    /// Opens (or creates) the database at `db_path` and initializes the schema
    pub fn open<P: AsRef<Path>>(db_path: P) -> Result<Self, DbError> {
        let conn = Connection::open(db_path.as_ref())?;
        info!("Opened schedule database at {}", db_path.as_ref().display());
        Self::with_connection(conn)
    }

    /// Creates a fresh in-memory database, mostly useful for tests
    pub fn open_in_memory() -> Result<Self, DbError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, DbError> {
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self {
            db: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, DbError> {
        self.db.lock().map_err(|_| DbError::LockPoisoned)
    }

    // ----- catalog -----

    pub fn create_faculty(&self, faculty: &NewFaculty) -> Result<i64, DbError> {
        catalog::validate_faculty(faculty)?;
        let db = self.conn()?;
        db.execute("INSERT INTO faculties (name) VALUES (?1)", [&faculty.name])
            .map_err(|e| unique_violation(e, "faculty"))?;
        Ok(db.last_insert_rowid())
    }

    pub fn create_department(&self, department: &NewDepartment) -> Result<i64, DbError> {
        catalog::validate_department(department)?;
        let db = self.conn()?;
        ensure_exists(&db, "faculty", "faculties", "faculty_id", department.faculty_id)?;
        db.execute(
            "INSERT INTO departments (name, faculty_id) VALUES (?1, ?2)",
            params![department.name, department.faculty_id],
        )
        .map_err(|e| unique_violation(e, "department"))?;
        Ok(db.last_insert_rowid())
    }

    pub fn create_branch(&self, branch: &NewBranch) -> Result<i64, DbError> {
        catalog::validate_branch(branch)?;
        let db = self.conn()?;
        ensure_exists(&db, "department", "departments", "department_id", branch.department_id)?;
        db.execute(
            "INSERT INTO branches (name, department_id) VALUES (?1, ?2)",
            params![branch.name, branch.department_id],
        )
        .map_err(|e| unique_violation(e, "branch"))?;
        Ok(db.last_insert_rowid())
    }

    pub fn create_semester(&self, semester: &NewSemester) -> Result<i64, DbError> {
        catalog::validate_semester(semester)?;
        let db = self.conn()?;
        db.execute(
            "INSERT INTO semesters (year, term, start_date, end_date) VALUES (?1, ?2, ?3, ?4)",
            params![
                semester.year,
                semester.term,
                semester.start_date,
                semester.end_date
            ],
        )
        .map_err(|e| unique_violation(e, "semester"))?;
        Ok(db.last_insert_rowid())
    }

    pub fn create_room(&self, room: &NewRoom) -> Result<i64, DbError> {
        catalog::validate_room(room)?;
        let db = self.conn()?;
        db.execute(
            "INSERT INTO rooms (building, room_number) VALUES (?1, ?2)",
            params![room.building, room.room_number],
        )
        .map_err(|e| unique_violation(e, "room"))?;
        Ok(db.last_insert_rowid())
    }

    pub fn create_course(&self, course: &NewCourse) -> Result<i64, DbError> {
        catalog::validate_course(course)?;
        let db = self.conn()?;
        if let Some(department_id) = course.department_id {
            ensure_exists(&db, "department", "departments", "department_id", department_id)?;
        }
        db.execute(
            "INSERT INTO courses (code, name, credits, department_id, description, is_active, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, datetime('now'))",
            params![
                course.code,
                course.name,
                course.credits,
                course.department_id,
                course.description.as_deref().filter(|d| !d.is_empty()),
                course.is_active
            ],
        )
        .map_err(|e| unique_violation(e, "course"))?;
        Ok(db.last_insert_rowid())
    }

    /// All courses ordered by code
    pub fn list_courses(&self) -> Result<Vec<DbCourse>, DbError> {
        let db = self.conn()?;
        let mut stmt = db.prepare(&format!("SELECT {COURSE_COLUMNS} FROM courses ORDER BY code"))?;
        let courses = stmt
            .query_map([], map_course)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(courses)
    }

    pub fn get_course(&self, course_id: i64) -> Result<DbCourse, DbError> {
        let db = self.conn()?;
        db.query_row(
            &format!("SELECT {COURSE_COLUMNS} FROM courses WHERE course_id = ?"),
            [course_id],
            map_course,
        )
        .optional()?
        .ok_or_else(|| DbError::not_found("course", course_id))
    }

    pub fn update_course(&self, course_id: i64, course: &NewCourse) -> Result<(), DbError> {
        catalog::validate_course(course)?;
        let db = self.conn()?;
        ensure_exists(&db, "course", "courses", "course_id", course_id)?;
        if let Some(department_id) = course.department_id {
            ensure_exists(&db, "department", "departments", "department_id", department_id)?;
        }
        db.execute(
            "UPDATE courses SET code = ?1, name = ?2, credits = ?3, department_id = ?4,
                                description = ?5, is_active = ?6
             WHERE course_id = ?7",
            params![
                course.code,
                course.name,
                course.credits,
                course.department_id,
                course.description.as_deref().filter(|d| !d.is_empty()),
                course.is_active,
                course_id
            ],
        )
        .map_err(|e| unique_violation(e, "course"))?;
        info!("Updated course {} ({})", course_id, course.code);
        Ok(())
    }

    /// Deletes a course with all of its sections, class times and enrollments
    pub fn delete_course(&self, course_id: i64) -> Result<(), DbError> {
        let db = self.conn()?;
        let removed = db.execute("DELETE FROM courses WHERE course_id = ?", [course_id])?;
        if removed == 0 {
            return Err(DbError::not_found("course", course_id));
        }
        info!("Deleted course {}", course_id);
        Ok(())
    }

    pub fn create_user(&self, user: &NewUser) -> Result<i64, DbError> {
        catalog::validate_user(user, chrono::Local::now().date_naive())?;
        let db = self.conn()?;
        if let Some(branch_id) = user.branch_id {
            ensure_exists(&db, "branch", "branches", "branch_id", branch_id)?;
        }
        if let Some(department_id) = user.department_id {
            ensure_exists(&db, "department", "departments", "department_id", department_id)?;
        }
        db.execute(
            "INSERT INTO users (username, user_type, first_name_th, last_name_th, date_of_birth,
                                student_id, student_status, branch_id, department_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, datetime('now'))",
            params![
                user.username,
                user.user_type,
                user.first_name_th.as_deref().filter(|n| !n.is_empty()),
                user.last_name_th.as_deref().filter(|n| !n.is_empty()),
                user.date_of_birth,
                user.student_id,
                user.student_status,
                user.branch_id,
                user.department_id
            ],
        )
        .map_err(|e| unique_violation(e, "user"))?;
        Ok(db.last_insert_rowid())
    }

    /// Returns the id of the user with this username, creating it if missing
    pub fn ensure_user(&self, user: &NewUser) -> Result<i64, DbError> {
        let existing: Option<i64> = {
            let db = self.conn()?;
            db.query_row(
                "SELECT user_id FROM users WHERE username = ?",
                [&user.username],
                |row| row.get(0),
            )
            .optional()?
        };
        match existing {
            Some(user_id) => Ok(user_id),
            None => self.create_user(user),
        }
    }

    /// Returns the role of a user, or `None` if the user does not exist
    pub fn user_type(&self, user_id: i64) -> Result<Option<UserType>, DbError> {
        let db = self.conn()?;
        Ok(db
            .query_row(
                "SELECT user_type FROM users WHERE user_id = ?",
                [user_id],
                |row| row.get(0),
            )
            .optional()?)
    }

    /// Creates a section and assigns its instructors in one transaction
    pub fn create_section(&self, section: &NewSection) -> Result<i64, DbError> {
        catalog::validate_section(section)?;

        let mut db = self.conn()?;
        let tx = db.transaction_with_behavior(TransactionBehavior::Immediate)?;

        ensure_exists(&tx, "course", "courses", "course_id", section.course_id)?;
        ensure_exists(&tx, "semester", "semesters", "semester_id", section.semester_id)?;
        if let Some(room_id) = section.room_id {
            ensure_exists(&tx, "room", "rooms", "room_id", room_id)?;
        }

        tx.execute(
            "INSERT INTO sections (course_id, semester_id, section_number, capacity, room_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, datetime('now'))",
            params![
                section.course_id,
                section.semester_id,
                section.section_number,
                section.capacity,
                section.room_id
            ],
        )
        .map_err(|e| match e {
            e if is_unique_violation(&e) => DbError::Catalog(CatalogError::DuplicateSection {
                section_number: section.section_number.clone(),
            }),
            e => DbError::Sqlite(e),
        })?;
        let section_id = tx.last_insert_rowid();

        replace_instructors(&tx, section_id, &section.instructor_ids)?;
        tx.commit()?;

        info!(
            "Created section {} (course {}, semester {})",
            section_id, section.course_id, section.semester_id
        );
        Ok(section_id)
    }

    /// Applies an edit to a section and re-validates its class times
    ///
    /// A new room, instructor set or semester can make stored class times collide with other
    /// sections. Every class time of the section is checked again under `policy` in the same
    /// transaction, and the edit is rolled back on the first rejection.
    pub fn update_section(
        &self,
        section_id: i64,
        update: &SectionUpdate,
        policy: &ValidationPolicy,
    ) -> Result<(), DbError> {
        let mut db = self.conn()?;
        let tx = db.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let course_id = load_section(&tx, section_id)?.course_id;
        catalog::validate_section(&update.for_course(course_id))?;
        ensure_exists(&tx, "semester", "semesters", "semester_id", update.semester_id)?;
        if let Some(room_id) = update.room_id {
            ensure_exists(&tx, "room", "rooms", "room_id", room_id)?;
        }

        tx.execute(
            "UPDATE sections SET semester_id = ?1, section_number = ?2, capacity = ?3, room_id = ?4
             WHERE section_id = ?5",
            params![
                update.semester_id,
                update.section_number,
                update.capacity,
                update.room_id,
                section_id
            ],
        )
        .map_err(|e| match e {
            e if is_unique_violation(&e) => DbError::Catalog(CatalogError::DuplicateSection {
                section_number: update.section_number.clone(),
            }),
            e => DbError::Sqlite(e),
        })?;
        replace_instructors(&tx, section_id, &update.instructor_ids)?;

        let facts = load_section_facts(&tx, section_id)?;
        for class_time in load_class_times(&tx, section_id)? {
            let candidate = ClassSlot::new(
                facts.clone(),
                class_time.day,
                TimeRange::new(class_time.start_time, class_time.end_time),
            )
            .with_id(class_time.class_time_id);
            validate_against_store(&tx, &candidate, policy)?;
        }
        tx.commit()?;

        info!("Updated section {} (course {})", section_id, course_id);
        Ok(())
    }

    /// Deletes a section; its class times, instructors and enrollments go with it
    pub fn delete_section(&self, section_id: i64) -> Result<(), DbError> {
        let db = self.conn()?;
        let removed = db.execute("DELETE FROM sections WHERE section_id = ?", [section_id])?;
        if removed == 0 {
            return Err(DbError::not_found("section", section_id));
        }
        info!("Deleted section {}", section_id);
        Ok(())
    }

    /// Sections of a course across all semesters, ordered by semester then section number
    pub fn sections_for_course(
        &self,
        course_id: i64,
    ) -> Result<Vec<(DbSection, Vec<DbClassTime>)>, DbError> {
        let db = self.conn()?;
        ensure_exists(&db, "course", "courses", "course_id", course_id)?;
        let sections = query_sections(
            &db,
            "WHERE s.course_id = ?1 ORDER BY s.semester_id, CAST(s.section_number AS INTEGER)",
            params![course_id],
        )?;
        with_class_times(&db, sections)
    }

    pub fn get_section(&self, section_id: i64) -> Result<DbSection, DbError> {
        let db = self.conn()?;
        load_section(&db, section_id)
    }

    // ----- class times -----

    /// Resolves section -> course, semester, room and instructors for validation
    pub fn get_section_facts(&self, section_id: i64) -> Result<SectionFacts, DbError> {
        let db = self.conn()?;
        load_section_facts(&db, section_id)
    }

    /// Existing slots of a semester that could conflict, see [`SlotQuery`]
    pub fn existing_slots_for(&self, query: &SlotQuery) -> Result<Vec<ClassSlot>, DbError> {
        let db = self.conn()?;
        query_slots(&db, query)
    }

    /// Validates a proposed class time without storing it
    ///
    /// # Arguments
    /// * `section_id` - Section the slot belongs to
    /// * `day`, `time` - Proposed weekly slot
    /// * `exclude_slot_id` - Id of the slot being edited, if any
    /// * `policy` - Duration cap and active checks
    pub fn check_class_time(
        &self,
        section_id: i64,
        day: Weekday,
        time: TimeRange,
        exclude_slot_id: Option<i64>,
        policy: &ValidationPolicy,
    ) -> Result<(), DbError> {
        let db = self.conn()?;
        let mut candidate = ClassSlot::new(load_section_facts(&db, section_id)?, day, time);
        candidate.slot_id = exclude_slot_id;
        validate_against_store(&db, &candidate, policy)
    }

    /// Validates and stores a new class time for a section
    ///
    /// The existing-slot read, validation and insert run in one immediate transaction, so a
    /// concurrent writer cannot slip a conflicting slot in between.
    pub fn add_class_time(
        &self,
        section_id: i64,
        day: Weekday,
        time: TimeRange,
        policy: &ValidationPolicy,
    ) -> Result<i64, DbError> {
        let mut db = self.conn()?;
        let tx = db.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let candidate = ClassSlot::new(load_section_facts(&tx, section_id)?, day, time);
        validate_against_store(&tx, &candidate, policy)?;

        tx.execute(
            "INSERT INTO class_times (section_id, day, start_time, end_time) VALUES (?1, ?2, ?3, ?4)",
            params![section_id, day, time.start, time.end],
        )?;
        let class_time_id = tx.last_insert_rowid();
        tx.commit()?;

        info!(
            "Added class time {} for section {} ({} {})",
            class_time_id, section_id, day, time
        );
        Ok(class_time_id)
    }

    /// Validates and applies an edit of a class time's day and times
    pub fn update_class_time(
        &self,
        class_time_id: i64,
        day: Weekday,
        time: TimeRange,
        policy: &ValidationPolicy,
    ) -> Result<(), DbError> {
        let mut db = self.conn()?;
        let tx = db.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let section_id: i64 = tx
            .query_row(
                "SELECT section_id FROM class_times WHERE class_time_id = ?",
                [class_time_id],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| DbError::not_found("class time", class_time_id))?;

        let candidate =
            ClassSlot::new(load_section_facts(&tx, section_id)?, day, time).with_id(class_time_id);
        validate_against_store(&tx, &candidate, policy)?;

        tx.execute(
            "UPDATE class_times SET day = ?1, start_time = ?2, end_time = ?3 WHERE class_time_id = ?4",
            params![day, time.start, time.end, class_time_id],
        )?;
        tx.commit()?;

        info!("Updated class time {} ({} {})", class_time_id, day, time);
        Ok(())
    }

    pub fn delete_class_time(&self, class_time_id: i64) -> Result<(), DbError> {
        let db = self.conn()?;
        let removed = db.execute(
            "DELETE FROM class_times WHERE class_time_id = ?",
            [class_time_id],
        )?;
        if removed == 0 {
            return Err(DbError::not_found("class time", class_time_id));
        }
        info!("Deleted class time {}", class_time_id);
        Ok(())
    }

    /// Gets all class times for a specific section
    pub fn get_class_times_for_section(&self, section_id: i64) -> Result<Vec<DbClassTime>, DbError> {
        let db = self.conn()?;
        ensure_exists(&db, "section", "sections", "section_id", section_id)?;
        load_class_times(&db, section_id)
    }

    /// Gets all sections with their class times for a semester
    pub fn get_semester_schedule(
        &self,
        semester_id: i64,
    ) -> Result<Vec<(DbSection, Vec<DbClassTime>)>, DbError> {
        let db = self.conn()?;
        ensure_exists(&db, "semester", "semesters", "semester_id", semester_id)?;
        let sections = query_sections(
            &db,
            "WHERE s.semester_id = ?1 ORDER BY c.code, s.section_number",
            params![semester_id],
        )?;
        with_class_times(&db, sections)
    }

    // ----- semesters -----

    pub fn get_semester(&self, semester_id: i64) -> Result<DbSemester, DbError> {
        let db = self.conn()?;
        db.query_row(
            "SELECT semester_id, year, term, start_date, end_date FROM semesters WHERE semester_id = ?",
            [semester_id],
            map_semester,
        )
        .optional()?
        .ok_or_else(|| DbError::not_found("semester", semester_id))
    }

    /// The semester whose dates contain `today`, if any
    pub fn current_semester(&self, today: NaiveDate) -> Result<Option<DbSemester>, DbError> {
        let db = self.conn()?;
        let mut stmt = db.prepare(
            "SELECT semester_id, year, term, start_date, end_date FROM semesters
             ORDER BY start_date",
        )?;
        let semesters = stmt
            .query_map([], map_semester)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(semesters
            .into_iter()
            .find(|s| catalog::is_current_semester(s.start_date, s.end_date, today)))
    }

    // ----- enrollment -----

    /// Sections of active courses in a semester, optionally filtered by a case-insensitive
    /// substring of the course code or name
    pub fn search_open_sections(
        &self,
        semester_id: i64,
        query: Option<&str>,
    ) -> Result<Vec<(DbSection, Vec<DbClassTime>)>, DbError> {
        let db = self.conn()?;
        let pattern = query
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(|q| format!("%{}%", escape_like(&q.to_lowercase())));

        let sections = match pattern {
            Some(pattern) => query_sections(
                &db,
                "WHERE s.semester_id = ?1 AND c.is_active = 1
                   AND (lower(c.code) LIKE ?2 ESCAPE '\\' OR lower(c.name) LIKE ?2 ESCAPE '\\')
                 ORDER BY c.code, s.section_number",
                params![semester_id, pattern],
            )?,
            None => query_sections(
                &db,
                "WHERE s.semester_id = ?1 AND c.is_active = 1 ORDER BY c.code, s.section_number",
                params![semester_id],
            )?,
        };
        with_class_times(&db, sections)
    }

    /// Enrolls a student in a section after applying the admission rules
    pub fn enroll(&self, user_id: i64, section_id: i64) -> Result<(), DbError> {
        let mut db = self.conn()?;
        let tx = db.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let user_type: UserType = tx
            .query_row(
                "SELECT user_type FROM users WHERE user_id = ?",
                [user_id],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| DbError::not_found("user", user_id))?;

        let section = load_section(&tx, section_id)?;
        let enrolled_in_course: bool = tx.query_row(
            "SELECT EXISTS(
                SELECT 1 FROM enrollments e
                JOIN sections s ON e.section_id = s.section_id
                WHERE e.user_id = ?1 AND s.course_id = ?2)",
            params![user_id, section.course_id],
            |row| row.get(0),
        )?;

        let seats = SeatStatus {
            course_code: section.course_code.clone(),
            section_number: section.section_number.clone(),
            capacity: section.capacity,
            enrolled: section.enrolled,
        };
        if let Err(e) = catalog::check_enrollment(user_type, enrolled_in_course, &seats) {
            warn!("Enrollment of user {} in section {} refused: {}", user_id, section_id, e);
            return Err(e.into());
        }

        tx.execute(
            "INSERT INTO enrollments (section_id, user_id, enrolled_at) VALUES (?1, ?2, datetime('now'))",
            params![section_id, user_id],
        )?;
        tx.commit()?;

        info!("Enrolled user {} in section {}", user_id, section_id);
        Ok(())
    }

    /// Sections a user is enrolled in for a semester, with their class times
    pub fn student_schedule(
        &self,
        user_id: i64,
        semester_id: i64,
    ) -> Result<Vec<(DbSection, Vec<DbClassTime>)>, DbError> {
        let db = self.conn()?;
        let sections = query_sections(
            &db,
            "WHERE s.semester_id = ?1
               AND s.section_id IN (SELECT section_id FROM enrollments WHERE user_id = ?2)
             ORDER BY c.code, s.section_number",
            params![semester_id, user_id],
        )?;
        with_class_times(&db, sections)
    }
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == ErrorCode::ConstraintViolation
                && e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

fn unique_violation(err: rusqlite::Error, entity: &'static str) -> DbError {
    if is_unique_violation(&err) {
        DbError::Catalog(CatalogError::Duplicate { entity })
    } else {
        DbError::Sqlite(err)
    }
}

/// Escapes `LIKE` wildcards so user input only matches literally (with `ESCAPE '\'`).
fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn ensure_exists(
    db: &Connection,
    entity: &'static str,
    table: &str,
    id_column: &str,
    id: i64,
) -> Result<(), DbError> {
    let found: bool = db.query_row(
        &format!("SELECT EXISTS(SELECT 1 FROM {table} WHERE {id_column} = ?)"),
        [id],
        |row| row.get(0),
    )?;
    if found {
        Ok(())
    } else {
        Err(DbError::not_found(entity, id))
    }
}

fn replace_instructors(
    db: &Connection,
    section_id: i64,
    instructor_ids: &[i64],
) -> Result<(), DbError> {
    for &user_id in instructor_ids {
        let user_type: UserType = db
            .query_row(
                "SELECT user_type FROM users WHERE user_id = ?",
                [user_id],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| DbError::not_found("user", user_id))?;
        if user_type != UserType::Instructor {
            return Err(CatalogError::NotAnInstructor { user_id }.into());
        }
    }

    db.execute(
        "DELETE FROM section_instructors WHERE section_id = ?",
        [section_id],
    )?;
    for user_id in instructor_ids.iter().collect::<BTreeSet<_>>() {
        db.execute(
            "INSERT INTO section_instructors (section_id, user_id) VALUES (?1, ?2)",
            params![section_id, user_id],
        )?;
    }
    Ok(())
}

fn load_instructor_ids(db: &Connection, section_id: i64) -> Result<Vec<i64>, DbError> {
    let mut stmt = db.prepare(
        "SELECT user_id FROM section_instructors WHERE section_id = ? ORDER BY user_id",
    )?;
    let ids = stmt
        .query_map([section_id], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<i64>>>()?;
    Ok(ids)
}

fn load_section_facts(db: &Connection, section_id: i64) -> Result<SectionFacts, DbError> {
    let facts = db
        .query_row(
            "SELECT s.section_id, c.code, s.section_number, s.semester_id,
                    s.room_id, r.building, r.room_number
             FROM sections s
             JOIN courses c ON s.course_id = c.course_id
             LEFT JOIN rooms r ON s.room_id = r.room_id
             WHERE s.section_id = ?",
            [section_id],
            |row| {
                let room_id: Option<i64> = row.get(4)?;
                let building: Option<String> = row.get(5)?;
                let room_number: Option<String> = row.get(6)?;
                Ok(SectionFacts {
                    section_id: row.get(0)?,
                    course_code: row.get(1)?,
                    section_number: row.get(2)?,
                    semester_id: row.get(3)?,
                    room: room_id.map(|room_id| RoomRef {
                        room_id,
                        label: room_label(building.as_deref(), room_number.as_deref()),
                    }),
                    instructor_ids: BTreeSet::new(),
                })
            },
        )
        .optional()?
        .ok_or_else(|| DbError::not_found("section", section_id))?;

    Ok(SectionFacts {
        instructor_ids: load_instructor_ids(db, section_id)?.into_iter().collect(),
        ..facts
    })
}

fn room_label(building: Option<&str>, room_number: Option<&str>) -> String {
    format!(
        "{}-{}",
        building.unwrap_or_default(),
        room_number.unwrap_or_default()
    )
}

fn query_slots(db: &Connection, query: &SlotQuery) -> Result<Vec<ClassSlot>, DbError> {
    let mut stmt = db.prepare(
        "SELECT ct.class_time_id, ct.section_id, ct.day, ct.start_time, ct.end_time
         FROM class_times ct
         JOIN sections s ON ct.section_id = s.section_id
         WHERE s.semester_id = ?1 AND (?2 IS NULL OR ct.day = ?2)
         ORDER BY ct.class_time_id",
    )?;

    let rows = stmt
        .query_map(params![query.semester_id, query.day], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, Weekday>(2)?,
                TimeRange::new(row.get(3)?, row.get(4)?),
            ))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut facts_cache: HashMap<i64, SectionFacts> = HashMap::new();
    let mut slots = Vec::with_capacity(rows.len());
    for (class_time_id, section_id, day, time) in rows {
        let facts = match facts_cache.get(&section_id) {
            Some(facts) => facts.clone(),
            None => {
                let facts = load_section_facts(db, section_id)?;
                facts_cache.insert(section_id, facts.clone());
                facts
            }
        };
        let slot = ClassSlot::new(facts, day, time).with_id(class_time_id);
        if query.matches(&slot) {
            slots.push(slot);
        }
    }

    Ok(slots)
}

fn validate_against_store(
    db: &Connection,
    candidate: &ClassSlot,
    policy: &ValidationPolicy,
) -> Result<(), DbError> {
    let existing = query_slots(db, &SlotQuery::for_candidate(candidate))?;
    debug!(
        "Validating section {} {} {} against {} existing slots",
        candidate.section.section_id,
        candidate.day,
        candidate.time,
        existing.len()
    );

    conflict::validate(candidate, &existing, policy).map_err(|errors| {
        warn!(
            "Rejected class time for section {}: {}",
            candidate.section.section_id, errors
        );
        DbError::Validation(errors)
    })
}

fn map_course(row: &rusqlite::Row<'_>) -> rusqlite::Result<DbCourse> {
    Ok(DbCourse {
        course_id: row.get(0)?,
        code: row.get(1)?,
        name: row.get(2)?,
        credits: row.get(3)?,
        department_id: row.get(4)?,
        description: row.get(5)?,
        is_active: row.get(6)?,
    })
}

fn map_semester(row: &rusqlite::Row<'_>) -> rusqlite::Result<DbSemester> {
    Ok(DbSemester {
        semester_id: row.get(0)?,
        year: row.get(1)?,
        term: row.get(2)?,
        start_date: row.get(3)?,
        end_date: row.get(4)?,
    })
}

fn query_sections(
    db: &Connection,
    clause: &str,
    params: &[&dyn rusqlite::ToSql],
) -> Result<Vec<DbSection>, DbError> {
    let mut stmt = db.prepare(&format!("SELECT {SECTION_COLUMNS} {SECTION_FROM} {clause}"))?;
    let sections = stmt
        .query_map(params, |row| {
            let building: Option<String> = row.get(8)?;
            let room_number: Option<String> = row.get(9)?;
            let room_id: Option<i64> = row.get(7)?;
            Ok(DbSection {
                section_id: row.get(0)?,
                course_id: row.get(1)?,
                course_code: row.get(2)?,
                course_name: row.get(3)?,
                semester_id: row.get(4)?,
                section_number: row.get(5)?,
                capacity: row.get(6)?,
                room_id,
                room: room_id.map(|_| room_label(building.as_deref(), room_number.as_deref())),
                enrolled: row.get(10)?,
                instructor_ids: Vec::new(),
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    sections
        .into_iter()
        .map(|section| {
            Ok(DbSection {
                instructor_ids: load_instructor_ids(db, section.section_id)?,
                ..section
            })
        })
        .collect()
}

fn load_section(db: &Connection, section_id: i64) -> Result<DbSection, DbError> {
    query_sections(db, "WHERE s.section_id = ?1", params![section_id])?
        .into_iter()
        .next()
        .ok_or_else(|| DbError::not_found("section", section_id))
}

fn load_class_times(db: &Connection, section_id: i64) -> Result<Vec<DbClassTime>, DbError> {
    let mut stmt = db.prepare(
        "SELECT class_time_id, section_id, day, start_time, end_time
         FROM class_times
         WHERE section_id = ?
         ORDER BY CASE day
             WHEN 'MON' THEN 1 WHEN 'TUE' THEN 2 WHEN 'WED' THEN 3 WHEN 'THU' THEN 4
             WHEN 'FRI' THEN 5 WHEN 'SAT' THEN 6 ELSE 7 END, start_time",
    )?;
    let class_times = stmt
        .query_map([section_id], |row| {
            Ok(DbClassTime {
                class_time_id: row.get(0)?,
                section_id: row.get(1)?,
                day: row.get(2)?,
                start_time: row.get(3)?,
                end_time: row.get(4)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(class_times)
}

fn with_class_times(
    db: &Connection,
    sections: Vec<DbSection>,
) -> Result<Vec<(DbSection, Vec<DbClassTime>)>, DbError> {
    sections
        .into_iter()
        .map(|section| {
            let class_times = load_class_times(db, section.section_id)?;
            Ok((section, class_times))
        })
        .collect()
}
