pub mod config;
pub mod errors;
pub mod planner_utils;
