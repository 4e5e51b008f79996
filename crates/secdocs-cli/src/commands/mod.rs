//! CLI command handlers

pub mod ask;
pub mod build;
pub mod eval;
pub mod sources;
pub mod status;
