//! Whole-screenshot plausibility check.
//!
//! The display layout is fixed per bank: four washing machines or two
//! dryers. A record count that does not match the bank of the first record is
//! taken as a sign of a bad recognition.

use serde::{Deserialize, Serialize};

use crate::models::{ApplianceRecord, ApplianceType};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Slots shown on a washing-machine screenshot. 0 disables the bank.
    pub washing_machine_bank: usize,
    /// Slots shown on a dryer screenshot. 0 disables the bank.
    pub dryer_bank: usize,
    /// Reject screenshots where a running appliance has no elapsed time.
    pub require_running_time: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            washing_machine_bank: 4,
            dryer_bank: 2,
            require_running_time: true,
        }
    }
}

/// Why a screenshot was routed to the failed directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Rejection {
    NoAppliances,
    UnknownBank {
        appliance_type: ApplianceType,
    },
    BankSizeMismatch {
        appliance_type: ApplianceType,
        expected: usize,
        found: usize,
    },
    MissingRunningTime {
        external_id: String,
    },
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoAppliances => write!(f, "no appliances recognized"),
            Self::UnknownBank { appliance_type } => {
                write!(f, "no bank size configured for {appliance_type}")
            }
            Self::BankSizeMismatch {
                appliance_type,
                expected,
                found,
            } => write!(
                f,
                "{appliance_type} bank has {expected} slots, recognized {found}"
            ),
            Self::MissingRunningTime { external_id } => {
                write!(f, "appliance {external_id} is in use but has no running time")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Accepted,
    Rejected(Rejection),
}

impl Verdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }
}

#[derive(Debug, Clone, Default)]
pub struct RecordValidator {
    config: ValidationConfig,
}

impl RecordValidator {
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    fn bank_size(&self, kind: ApplianceType) -> Option<usize> {
        let size = match kind {
            ApplianceType::WashingMachine => self.config.washing_machine_bank,
            ApplianceType::Dryer => self.config.dryer_bank,
        };
        (size > 0).then_some(size)
    }

    /// Accept or reject the records of one screenshot as a whole.
    /// Only the first record's type selects the expected bank size.
    pub fn validate(&self, records: &[ApplianceRecord]) -> Verdict {
        let Some(first) = records.first() else {
            return Verdict::Rejected(Rejection::NoAppliances);
        };

        let Some(expected) = self.bank_size(first.appliance_type) else {
            return Verdict::Rejected(Rejection::UnknownBank {
                appliance_type: first.appliance_type,
            });
        };

        if records.len() != expected {
            return Verdict::Rejected(Rejection::BankSizeMismatch {
                appliance_type: first.appliance_type,
                expected,
                found: records.len(),
            });
        }

        if self.config.require_running_time {
            if let Some(missing) = records
                .iter()
                .find(|r| r.is_in_use() && r.running_for.is_none())
            {
                return Verdict::Rejected(Rejection::MissingRunningTime {
                    external_id: missing.external_id.clone(),
                });
            }
        }

        Verdict::Accepted
    }
}
