//! Persistence of appliance usage and processing events.

pub mod sqlite;
pub mod supabase;

pub use sqlite::*;
pub use supabase::*;

use thiserror::Error;

use crate::models::{ApplianceUsage, ProcessingEvent};

/// Table receiving one row per running appliance.
pub const APPLIANCES_USE_TABLE: &str = "appliances_use";
/// Table receiving one row per examined screenshot.
pub const TIME_UPDATES_TABLE: &str = "time_updates";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Migration failed at version {version}: {reason}")]
    MigrationFailed { version: i64, reason: String },

    #[error("Invalid enum value for {field}: {value}")]
    InvalidEnum { field: String, value: String },

    #[error("Cannot connect to Supabase at {0}")]
    Connection(String),

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Supabase sign-in failed: {0}")]
    SignIn(String),

    #[error("Supabase returned error (status {status}): {body}")]
    Api { status: u16, body: String },

    #[error("Failed to parse Supabase response: {0}")]
    ResponseParsing(String),
}

/// Persistence collaborator. An insert either succeeds or returns an error;
/// callers do not retry.
pub trait UsageStore: Send {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    fn insert_appliance_use(&self, usage: &ApplianceUsage) -> Result<(), StoreError>;

    fn insert_time_update(&self, event: &ProcessingEvent) -> Result<(), StoreError>;
}
