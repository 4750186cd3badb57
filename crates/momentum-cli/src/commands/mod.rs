pub mod character;
pub mod config;
pub mod habit;
pub mod mood;
pub mod plan;
pub mod task;
