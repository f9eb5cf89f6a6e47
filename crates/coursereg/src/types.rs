use crate::conflict::ValidationPolicy;
use crate::db::ScheduleDbManager;

/// State shared by all request handlers.
pub struct AppState {
    /// Registration store.
    pub schedule_db: ScheduleDbManager,
    /// Policy applied to every class-time create, edit and dry run.
    pub policy: ValidationPolicy,
}

impl AppState {
    pub fn new(schedule_db: ScheduleDbManager, policy: ValidationPolicy) -> Self {
        Self {
            schedule_db,
            policy,
        }
    }
}
