//! Internal utilities shared by the mirror pipeline.

pub mod fs_utils;
pub mod hash;
pub mod progress;
pub mod url_utils;
