//! Data models for tapedeck-ad

pub mod file_entry;
pub mod job;

pub use file_entry::{Area, FileEntry};
pub use job::{Job, JobStatus};
