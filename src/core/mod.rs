//! Process-level plumbing: terminal reporting and the mirror directory lock.

pub mod lock;
pub mod output;
