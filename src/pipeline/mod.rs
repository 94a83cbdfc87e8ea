pub mod assembly;
pub mod lifecycle;
pub mod reader;
pub mod recognition;
pub mod runner;
pub mod schedule;
pub mod timestamp;
pub mod tokens;
pub mod validation;
