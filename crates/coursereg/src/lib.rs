pub mod catalog;
pub mod config;
pub mod conflict;
pub mod db;
pub mod server;
pub mod types;
