pub mod calendar;
pub mod models;
pub mod progress;
pub mod schedule;
pub mod timeline;
