use serde::Serialize;

use super::vocabulary::Vocabulary;
use crate::models::{ApplianceType, OccupancyStatus};

/// What a single recognized word means on the status display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TokenCategory {
    ApplianceType(ApplianceType),
    OccupancyStatus(OccupancyStatus),
    ExternalId,
    ElapsedTime,
    Unclassified,
}

/// A recognized word together with its category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    pub value: &'a str,
    pub category: TokenCategory,
}

/// Classifies words against an injected vocabulary. Pure; never fails.
#[derive(Debug, Clone)]
pub struct TokenClassifier {
    vocabulary: Vocabulary,
}

impl TokenClassifier {
    pub fn new(vocabulary: Vocabulary) -> Self {
        Self { vocabulary }
    }

    pub fn classify(&self, value: &str) -> TokenCategory {
        if let Some(kind) = self.vocabulary.appliance_type(value) {
            TokenCategory::ApplianceType(kind)
        } else if let Some(status) = self.vocabulary.status(value) {
            TokenCategory::OccupancyStatus(status)
        } else if self.vocabulary.is_external_id(value) {
            TokenCategory::ExternalId
        } else if self.vocabulary.is_elapsed_time(value) {
            TokenCategory::ElapsedTime
        } else {
            TokenCategory::Unclassified
        }
    }

    pub fn token<'a>(&self, value: &'a str) -> Token<'a> {
        Token {
            value,
            category: self.classify(value),
        }
    }
}
