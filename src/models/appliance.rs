use chrono::NaiveDateTime;
use serde::Serialize;

use super::enums::{ApplianceType, OccupancyStatus};

/// Serialization used for `date_collected` and `update_time`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One appliance as reconstructed from a single screenshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApplianceRecord {
    pub appliance_type: ApplianceType,
    pub status: OccupancyStatus,
    pub external_id: String,
    /// Elapsed time literal as shown on the display (`H:MM:SS` or `HH:MM:SS`).
    pub running_for: Option<String>,
}

impl ApplianceRecord {
    pub fn is_in_use(&self) -> bool {
        self.status.is_in_use()
    }

    /// Attach the originating file and its capture time for persistence.
    pub fn stamp(&self, file_name: &str, collected_at: NaiveDateTime) -> ApplianceUsage {
        ApplianceUsage {
            appliance_type: self.appliance_type,
            running_for: self.running_for.clone(),
            external_id: self.external_id.clone(),
            file_name: file_name.to_string(),
            collected_at,
        }
    }
}

/// Row of the `appliances_use` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplianceUsage {
    pub appliance_type: ApplianceType,
    pub running_for: Option<String>,
    pub external_id: String,
    pub file_name: String,
    pub collected_at: NaiveDateTime,
}

impl ApplianceUsage {
    pub fn date_collected(&self) -> String {
        self.collected_at.format(TIMESTAMP_FORMAT).to_string()
    }
}

/// Row of the `time_updates` table. Written once per examined screenshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessingEvent {
    pub file_name: String,
    pub collected_at: NaiveDateTime,
}

impl ProcessingEvent {
    pub fn new(file_name: &str, collected_at: NaiveDateTime) -> Self {
        Self {
            file_name: file_name.to_string(),
            collected_at,
        }
    }

    pub fn update_time(&self) -> String {
        self.collected_at.format(TIMESTAMP_FORMAT).to_string()
    }
}
