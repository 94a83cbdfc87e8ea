use std::collections::HashMap;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::VocabularyError;
use crate::models::{ApplianceType, OccupancyStatus};

/// Words the status display uses, as written in the config file.
///
/// Defaults are the German labels of the laundry app the screenshots come from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VocabularyConfig {
    pub washing_machine_labels: Vec<String>,
    pub dryer_labels: Vec<String>,
    pub occupied_labels: Vec<String>,
    pub free_labels: Vec<String>,
    pub running_prefix_labels: Vec<String>,
    /// Whole-token pattern for the machine number printed on the display.
    pub external_id_pattern: String,
    /// Whole-token pattern for the elapsed running time.
    pub elapsed_time_pattern: String,
}

impl Default for VocabularyConfig {
    fn default() -> Self {
        Self {
            washing_machine_labels: vec![ApplianceType::WashingMachine.as_str().into()],
            dryer_labels: vec![ApplianceType::Dryer.as_str().into()],
            occupied_labels: vec![OccupancyStatus::Occupied.as_str().into()],
            free_labels: vec![OccupancyStatus::Free.as_str().into()],
            running_prefix_labels: vec![OccupancyStatus::RunningPrefix.as_str().into()],
            external_id_pattern: r"^\d{5}$".into(),
            elapsed_time_pattern: r"^\d{1,2}:\d{2}:\d{2}$".into(),
        }
    }
}

/// Compiled, immutable vocabulary handed to the classifier.
#[derive(Debug, Clone)]
pub struct Vocabulary {
    appliance_labels: HashMap<String, ApplianceType>,
    status_labels: HashMap<String, OccupancyStatus>,
    external_id: Regex,
    elapsed_time: Regex,
}

impl Vocabulary {
    /// Compile and check a vocabulary. Labels must be unique across both label
    /// sets and must not match either pattern, so every token has at most one
    /// category.
    pub fn from_config(config: &VocabularyConfig) -> Result<Self, VocabularyError> {
        let external_id = compile("external_id", &config.external_id_pattern)?;
        let elapsed_time = compile("elapsed_time", &config.elapsed_time_pattern)?;

        let mut appliance_labels = HashMap::new();
        let mut status_labels = HashMap::new();

        let appliance_sets = [
            ("washing machine", &config.washing_machine_labels, ApplianceType::WashingMachine),
            ("dryer", &config.dryer_labels, ApplianceType::Dryer),
        ];
        for (what, labels, kind) in appliance_sets {
            if labels.is_empty() {
                return Err(VocabularyError::EmptyLabels(what));
            }
            for label in labels {
                if appliance_labels.insert(label.clone(), kind).is_some() {
                    return Err(VocabularyError::DuplicateLabel(label.clone()));
                }
            }
        }

        let status_sets = [
            ("occupied", &config.occupied_labels, OccupancyStatus::Occupied),
            ("free", &config.free_labels, OccupancyStatus::Free),
            ("running prefix", &config.running_prefix_labels, OccupancyStatus::RunningPrefix),
        ];
        for (what, labels, status) in status_sets {
            if labels.is_empty() {
                return Err(VocabularyError::EmptyLabels(what));
            }
            for label in labels {
                if appliance_labels.contains_key(label)
                    || status_labels.insert(label.clone(), status).is_some()
                {
                    return Err(VocabularyError::DuplicateLabel(label.clone()));
                }
            }
        }

        for label in appliance_labels.keys().chain(status_labels.keys()) {
            if external_id.is_match(label) {
                return Err(VocabularyError::LabelMatchesPattern {
                    label: label.clone(),
                    pattern: "external_id",
                });
            }
            if elapsed_time.is_match(label) {
                return Err(VocabularyError::LabelMatchesPattern {
                    label: label.clone(),
                    pattern: "elapsed_time",
                });
            }
        }

        Ok(Self {
            appliance_labels,
            status_labels,
            external_id,
            elapsed_time,
        })
    }

    pub fn appliance_type(&self, value: &str) -> Option<ApplianceType> {
        self.appliance_labels.get(value).copied()
    }

    pub fn status(&self, value: &str) -> Option<OccupancyStatus> {
        self.status_labels.get(value).copied()
    }

    pub fn is_external_id(&self, value: &str) -> bool {
        self.external_id.is_match(value)
    }

    pub fn is_elapsed_time(&self, value: &str) -> bool {
        self.elapsed_time.is_match(value)
    }
}

fn compile(field: &'static str, pattern: &str) -> Result<Regex, VocabularyError> {
    Regex::new(pattern).map_err(|source| VocabularyError::InvalidPattern { field, source })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_vocabulary_compiles() {
        let vocab = Vocabulary::from_config(&VocabularyConfig::default()).unwrap();
        assert_eq!(vocab.appliance_type("Waschmaschine"), Some(ApplianceType::WashingMachine));
        assert_eq!(vocab.appliance_type("Trockner"), Some(ApplianceType::Dryer));
        assert_eq!(vocab.status("belegt"), Some(OccupancyStatus::Occupied));
        assert_eq!(vocab.status("frei"), Some(OccupancyStatus::Free));
        assert_eq!(vocab.status("Laufzeit:"), Some(OccupancyStatus::RunningPrefix));
    }

    #[test]
    fn patterns_match_whole_tokens_only() {
        let vocab = Vocabulary::from_config(&VocabularyConfig::default()).unwrap();
        assert!(vocab.is_external_id("12345"));
        assert!(!vocab.is_external_id("123456"));
        assert!(!vocab.is_external_id("Nr.12345"));
        assert!(vocab.is_elapsed_time("1:02:03"));
        assert!(vocab.is_elapsed_time("10:20:30"));
        assert!(!vocab.is_elapsed_time("100:20:30"));
        assert!(!vocab.is_elapsed_time("Laufzeit:01:02:03"));
    }

    #[test]
    fn alternate_labels_can_be_configured() {
        let config = VocabularyConfig {
            washing_machine_labels: vec!["Washer".into()],
            dryer_labels: vec!["Dryer".into()],
            occupied_labels: vec!["busy".into()],
            free_labels: vec!["free".into(), "available".into()],
            running_prefix_labels: vec!["Runtime:".into()],
            ..VocabularyConfig::default()
        };
        let vocab = Vocabulary::from_config(&config).unwrap();
        assert_eq!(vocab.appliance_type("Washer"), Some(ApplianceType::WashingMachine));
        assert_eq!(vocab.status("available"), Some(OccupancyStatus::Free));
        assert_eq!(vocab.appliance_type("Waschmaschine"), None);
    }

    #[test]
    fn label_shared_between_sets_is_rejected() {
        let config = VocabularyConfig {
            free_labels: vec!["Trockner".into()],
            ..VocabularyConfig::default()
        };
        assert!(matches!(
            Vocabulary::from_config(&config),
            Err(VocabularyError::DuplicateLabel(l)) if l == "Trockner"
        ));
    }

    #[test]
    fn label_matching_a_pattern_is_rejected() {
        let config = VocabularyConfig {
            occupied_labels: vec!["00000".into()],
            ..VocabularyConfig::default()
        };
        assert!(matches!(
            Vocabulary::from_config(&config),
            Err(VocabularyError::LabelMatchesPattern { pattern: "external_id", .. })
        ));
    }

    #[test]
    fn empty_label_set_is_rejected() {
        let config = VocabularyConfig {
            dryer_labels: vec![],
            ..VocabularyConfig::default()
        };
        assert!(matches!(
            Vocabulary::from_config(&config),
            Err(VocabularyError::EmptyLabels("dryer"))
        ));
    }

    #[test]
    fn invalid_pattern_is_reported() {
        let config = VocabularyConfig {
            elapsed_time_pattern: "(".into(),
            ..VocabularyConfig::default()
        };
        assert!(matches!(
            Vocabulary::from_config(&config),
            Err(VocabularyError::InvalidPattern { field: "elapsed_time", .. })
        ));
    }
}
