//! Shared library modules providing error types, file checks, command construction, and telemetry initialization.

pub mod command;
pub mod errors;
pub mod fs;
pub mod paths;
pub mod telemetry;
