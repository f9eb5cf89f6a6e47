pub mod catalog;
pub mod class_times;
pub mod enrollment;
pub mod schedule;
pub mod status;
