//! API endpoint handlers.
//!
//! Each module corresponds to one area of the client. Handlers call into
//! the domain modules and translate their errors at this boundary.

pub mod assessments;
pub mod catalog;
pub mod health;
pub mod history;
pub mod session;
