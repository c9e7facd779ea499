//! API middleware stack.
//!
//! Execution order (outermost → innermost):
//! 1. Session validator: bearer token → `ActiveSession`
//! 2. Access logger: logs after the session is known

pub mod audit;
pub mod auth;
