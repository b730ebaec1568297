//! BDD step definitions for healthdeck service

pub mod data_check_steps;
pub mod downtime_steps;
pub mod monitor_steps;
pub mod notification_steps;
pub mod scheduler_steps;
