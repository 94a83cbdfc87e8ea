use crate::store::StoreError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $s)] $variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = StoreError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(StoreError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

// The string forms are the labels the laundry display shows and the values
// written to the `type` column of `appliances_use`.
str_enum!(ApplianceType {
    WashingMachine => "Waschmaschine",
    Dryer => "Trockner",
});

str_enum!(OccupancyStatus {
    Occupied => "belegt",
    Free => "frei",
    RunningPrefix => "Laufzeit:",
});

impl OccupancyStatus {
    /// `belegt` and `Laufzeit:` both mean the machine is currently running.
    pub fn is_in_use(&self) -> bool {
        matches!(self, Self::Occupied | Self::RunningPrefix)
    }
}

/// Where a screenshot currently lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScreenshotState {
    Pending,
    Processed,
    Failed,
}

impl ScreenshotState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn appliance_type_round_trips_display_labels() {
        assert_eq!(ApplianceType::WashingMachine.as_str(), "Waschmaschine");
        assert_eq!(ApplianceType::Dryer.as_str(), "Trockner");
        assert_eq!(
            ApplianceType::from_str("Trockner").unwrap(),
            ApplianceType::Dryer
        );
    }

    #[test]
    fn serde_uses_display_labels() {
        assert_eq!(
            serde_json::to_value(ApplianceType::WashingMachine).unwrap(),
            serde_json::json!("Waschmaschine")
        );
        assert_eq!(
            serde_json::to_value(OccupancyStatus::RunningPrefix).unwrap(),
            serde_json::json!("Laufzeit:")
        );
        let parsed: OccupancyStatus = serde_json::from_str("\"belegt\"").unwrap();
        assert_eq!(parsed, OccupancyStatus::Occupied);
    }

    #[test]
    fn unknown_label_is_invalid_enum() {
        let err = ApplianceType::from_str("Spülmaschine").unwrap_err();
        assert!(matches!(err, StoreError::InvalidEnum { .. }));
    }

    #[test]
    fn in_use_statuses() {
        assert!(OccupancyStatus::Occupied.is_in_use());
        assert!(OccupancyStatus::RunningPrefix.is_in_use());
        assert!(!OccupancyStatus::Free.is_in_use());
    }

    #[test]
    fn only_pending_is_not_terminal() {
        assert!(!ScreenshotState::Pending.is_terminal());
        assert!(ScreenshotState::Processed.is_terminal());
        assert!(ScreenshotState::Failed.is_terminal());
    }
}
