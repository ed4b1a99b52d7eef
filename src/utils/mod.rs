//! Developer utilities shared across modules.
pub mod devlog;
