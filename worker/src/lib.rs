pub mod config;
pub mod schedulers;
