//! Emailed candidate analysis reports built from completed jobs.

pub mod handlers;
pub mod mailer;
pub mod render;
